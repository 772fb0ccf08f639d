//! State module for tracking archive progress
//!
//! # Components
//!
//! - `CrawlUnit`: one village × phase section of the archive and its slug
//! - `Frontier`: depth-first worklist of the pages of one unit
//! - `VisitedSet`: per-unit visit guard with the rate-limit re-visit allowance

mod frontier;
mod unit;

// Re-export main types
pub use frontier::{Frontier, VisitState, VisitedSet, MAX_REVISITS};
pub use unit::{unit_slug, CrawlUnit, PHASES};
