//! Crawl units: one village seen through one phase

use std::fmt;

/// Phases every village is archived in
pub const PHASES: [u8; 3] = [1, 2, 3];

/// One (village, phase) pair archived as a distinct section
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrawlUnit {
    village: String,
    phase: u8,
}

impl CrawlUnit {
    /// Creates a unit for `village` in `phase`
    pub fn new(village: impl Into<String>, phase: u8) -> Self {
        Self {
            village: village.into(),
            phase,
        }
    }

    /// The village name as displayed by the application
    pub fn village(&self) -> &str {
        &self.village
    }

    /// The phase number (1..=3)
    pub fn phase(&self) -> u8 {
        self.phase
    }

    /// Filename stem of the unit's entry page, also the target of its
    /// rewritten "home" links
    pub fn slug(&self) -> String {
        unit_slug(&self.village, self.phase)
    }
}

impl fmt::Display for CrawlUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, phase {}", self.village, self.phase)
    }
}

/// Builds the slug `index-{village}-phase-{phase}`
///
/// The village name is lowercased, whitespace becomes `-`, and runs of `-`,
/// `–` or `|` collapse to a single `-`.
///
/// # Examples
///
/// ```
/// use village_archiver::state::unit_slug;
///
/// assert_eq!(unit_slug("France – Canada", 2), "index-france-canada-phase-2");
/// ```
pub fn unit_slug(village: &str, phase: u8) -> String {
    let mut name = String::with_capacity(village.len());
    let mut previous_dash = false;

    for c in village.to_lowercase().chars() {
        let c = if c.is_whitespace() { '-' } else { c };
        if matches!(c, '-' | '–' | '|') {
            if !previous_dash {
                name.push('-');
            }
            previous_dash = true;
        } else {
            name.push(c);
            previous_dash = false;
        }
    }

    format!("index-{}-phase-{}", name, phase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_slug() {
        assert_eq!(unit_slug("Canada", 1), "index-canada-phase-1");
    }

    #[test]
    fn test_slug_collapses_separators() {
        assert_eq!(
            unit_slug("Village Monde - France | Canada", 3),
            "index-village-monde-france-canada-phase-3"
        );
        assert_eq!(unit_slug("France – Canada", 1), "index-france-canada-phase-1");
    }

    #[test]
    fn test_slug_keeps_accents() {
        assert_eq!(unit_slug("Québec Été", 2), "index-québec-été-phase-2");
    }

    #[test]
    fn test_unit_accessors() {
        let unit = CrawlUnit::new("France", 2);
        assert_eq!(unit.village(), "France");
        assert_eq!(unit.phase(), 2);
        assert_eq!(unit.slug(), "index-france-phase-2");
        assert_eq!(unit.to_string(), "France, phase 2");
    }
}
