//! Browser module: the page abstraction the crawl drives
//!
//! This module handles:
//! - The `BrowserPage` trait every traversal step goes through
//! - Retrying navigation, clicks and selector waits
//! - Launching Chromium over CDP and capturing its network responses
//! - Acquiring an authenticated session

mod chromium;
mod page;
mod retry;
mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use chromium::{launch_browser, spawn_resource_capture, ChromiumPage};
pub use page::BrowserPage;
pub use retry::{Navigator, RetryPolicy};
pub use session::acquire_session;

use thiserror::Error;

/// Errors raised by browser operations
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("DevTools protocol error: {0}")]
    Cdp(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("{action} timed out after {millis}ms")]
    Timeout { action: String, millis: u64 },

    #[error("No element matches selector: {0}")]
    SelectorNotFound(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        Self::Cdp(e.to_string())
    }
}

/// Result type alias for browser operations
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;
