//! Run statistics
//!
//! Counters collected while archiving, printed once the run ends.

use crate::cache::ResourceCache;
use crate::rewrite::StylesheetReport;
use std::sync::atomic::Ordering;

/// Page counters of one unit walk (or the sum of several)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageCounts {
    /// Pages rewritten and handed to the writer
    pub archived: usize,

    /// Pages given up on (navigation failure, still rate-limited, rewrite error)
    pub lost: usize,

    /// Rate-limited renders, including the one that triggered a re-visit
    pub rate_limited: usize,
}

impl PageCounts {
    pub fn add(&mut self, other: &PageCounts) {
        self.archived += other.archived;
        self.lost += other.lost;
        self.rate_limited += other.rate_limited;
    }
}

/// Archive run summary
#[derive(Debug, Default, Clone)]
pub struct ArchiveStats {
    /// Villages selected and archived, in order
    pub villages: Vec<String>,

    /// Villages that could not be selected
    pub villages_skipped: usize,

    /// Village × phase walks that completed
    pub units_completed: usize,

    /// Village × phase walks aborted at their entry page
    pub units_failed: usize,

    pub pages: PageCounts,

    pub stylesheets: StylesheetReport,

    /// Resource map entries at the end of the run
    pub resources: usize,

    /// Resources fetched over HTTP from stylesheet references
    pub resources_fetched: u64,

    /// Resources skipped for lack of a known file type
    pub resources_unresolved: u64,
}

impl ArchiveStats {
    /// Copies the resource counters of `cache`
    pub fn record_cache(&mut self, cache: &ResourceCache) {
        self.resources = cache.len();
        self.resources_fetched = cache.counters().fetched.load(Ordering::Relaxed);
        self.resources_unresolved = cache.counters().unresolved.load(Ordering::Relaxed);
    }

    /// Share of attempted pages that were archived, in percent
    pub fn success_rate(&self) -> f64 {
        let attempted = self.pages.archived + self.pages.lost;
        if attempted == 0 {
            return 0.0;
        }
        (self.pages.archived as f64 / attempted as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &ArchiveStats) {
    println!("=== Archive Statistics ===\n");

    println!("Villages ({}):", stats.villages.len());
    for village in &stats.villages {
        println!("  - {}", village);
    }
    if stats.villages_skipped > 0 {
        println!("  ({} could not be selected)", stats.villages_skipped);
    }
    println!();

    println!("Units:");
    println!("  Completed: {}", stats.units_completed);
    println!("  Aborted at entry page: {}", stats.units_failed);
    println!();

    println!("Pages:");
    println!("  Archived: {}", stats.pages.archived);
    println!("  Lost: {}", stats.pages.lost);
    println!("  Rate limited renders: {}", stats.pages.rate_limited);
    println!();

    println!("Resources:");
    println!("  Mapped: {}", stats.resources);
    println!("  Fetched from stylesheets: {}", stats.resources_fetched);
    println!("  Unknown type: {}", stats.resources_unresolved);
    println!(
        "  Stylesheets rewritten: {} ({} failed)",
        stats.stylesheets.rewritten, stats.stylesheets.failed
    );
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} pages archived)",
        stats.success_rate(),
        stats.pages.archived,
        stats.pages.archived + stats.pages.lost
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_counts_add() {
        let mut total = PageCounts::default();
        total.add(&PageCounts {
            archived: 3,
            lost: 1,
            rate_limited: 2,
        });
        total.add(&PageCounts {
            archived: 1,
            lost: 0,
            rate_limited: 0,
        });
        assert_eq!(
            total,
            PageCounts {
                archived: 4,
                lost: 1,
                rate_limited: 2
            }
        );
    }

    #[test]
    fn test_success_rate() {
        let mut stats = ArchiveStats::default();
        assert_eq!(stats.success_rate(), 0.0);

        stats.pages.archived = 3;
        stats.pages.lost = 1;
        assert_eq!(stats.success_rate(), 75.0);
    }
}
