//! Resource cache module
//!
//! Maps every asset URL seen during the crawl to the file that archives it,
//! and persists that map between runs.

mod extension;
mod resource_cache;

pub use extension::{extension_for_mime, resolve_extension};
pub use resource_cache::{
    persist_bytes, CacheCounters, NetworkResponse, Reservation, ResourceCache, ResourceKind,
};
