//! URL handling module for Village-Archiver
//!
//! This module provides resource URL canonicalization (the resource cache key)
//! and construction of the live URLs the browser is sent to.

mod normalize;

// Re-export main functions
pub use normalize::{archive_url, canonicalize, is_capturable};
