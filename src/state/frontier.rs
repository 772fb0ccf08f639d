//! Per-unit traversal state
//!
//! A unit is walked depth-first from its entry page (`""`). Each path moves
//! through `Queued -> Visited`; the only way back is [`Frontier::requeue`],
//! granted once per path for rate-limit recovery.

use std::collections::HashMap;
use std::fmt;

/// How many times one path may be re-queued after a rate-limited render
pub const MAX_REVISITS: u32 = 1;

/// Traversal state of one path inside a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitState {
    /// Discovered and waiting on the stack
    Queued,

    /// Rendered (or being rendered)
    Visited,
}

impl fmt::Display for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Visited => write!(f, "visited"),
        }
    }
}

/// Path → visit state for one unit's traversal
#[derive(Debug, Default, Clone)]
pub struct VisitedSet {
    states: HashMap<String, VisitState>,
    revisits: HashMap<String, u32>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once `path` has been marked visited
    pub fn is_visited(&self, path: &str) -> bool {
        matches!(self.states.get(path), Some(VisitState::Visited))
    }

    /// Returns true if `path` was ever queued or visited
    pub fn is_known(&self, path: &str) -> bool {
        self.states.contains_key(path)
    }

    pub fn state(&self, path: &str) -> Option<VisitState> {
        self.states.get(path).copied()
    }

    /// Records `path` as queued; returns false if it was already known
    fn enqueue(&mut self, path: &str) -> bool {
        if self.states.contains_key(path) {
            return false;
        }
        self.states.insert(path.to_string(), VisitState::Queued);
        true
    }

    /// Marks `path` visited; must happen before rendering it
    pub fn mark_visited(&mut self, path: &str) {
        self.states.insert(path.to_string(), VisitState::Visited);
    }

    /// Flips a visited path back to queued, at most [`MAX_REVISITS`] times
    fn reset(&mut self, path: &str) -> bool {
        let count = self.revisits.entry(path.to_string()).or_insert(0);
        if *count >= MAX_REVISITS {
            return false;
        }
        *count += 1;
        self.states.insert(path.to_string(), VisitState::Queued);
        true
    }

    /// Number of paths marked visited
    pub fn visited_count(&self) -> usize {
        self.states
            .values()
            .filter(|s| matches!(s, VisitState::Visited))
            .count()
    }
}

/// Depth-first worklist of unit-relative paths
///
/// Replaces recursive page visitation: the most recently discovered batch of
/// links is explored first, and within a batch links are visited in document
/// order.
#[derive(Debug, Clone)]
pub struct Frontier {
    stack: Vec<String>,
    visited: VisitedSet,
}

impl Frontier {
    /// Creates a frontier holding only the unit entry path (`""`)
    pub fn new() -> Self {
        let mut visited = VisitedSet::new();
        visited.enqueue("");
        Self {
            stack: vec![String::new()],
            visited,
        }
    }

    /// Pops the next path to render, skipping anything already visited
    pub fn pop(&mut self) -> Option<String> {
        while let Some(path) = self.stack.pop() {
            if !self.visited.is_visited(&path) {
                return Some(path);
            }
        }
        None
    }

    /// Pushes links discovered on a page, each path at most once per unit
    ///
    /// Returns the number of paths actually queued.
    pub fn push_discovered(&mut self, paths: &[String]) -> usize {
        let fresh: Vec<&String> = paths
            .iter()
            .filter(|p| self.visited.enqueue(p.as_str()))
            .collect();

        // Reverse so the first link in the document is popped first.
        for path in fresh.iter().rev() {
            self.stack.push((*path).clone());
        }

        fresh.len()
    }

    /// Puts a rate-limited path back on top of the stack
    ///
    /// Returns false when the path already used its re-visit.
    pub fn requeue(&mut self, path: &str) -> bool {
        if !self.visited.reset(path) {
            return false;
        }
        self.stack.push(path.to_string());
        true
    }

    pub fn mark_visited(&mut self, path: &str) {
        self.visited.mark_visited(path);
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    pub fn pending(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new()
    }
}
