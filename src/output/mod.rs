//! Output module for the archive file tree and run reports
//!
//! This module handles:
//! - The on-disk layout of an archive year and its public paths
//! - Writing the top-level index of archived villages
//! - Recording and printing run statistics

mod index;
mod layout;
pub mod stats;

pub use index::{render_index, write_index, DEFAULT_TEMPLATE};
pub use layout::{ArchiveLayout, ACTIVITY_DIR, RESOURCES_DIR};
pub use stats::{print_statistics, ArchiveStats, PageCounts};
