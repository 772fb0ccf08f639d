use crate::browser::BrowserResult;
use async_trait::async_trait;
use std::time::Duration;

/// One controllable browser tab
///
/// Navigation completes on DOM content loaded, not on network idle. Every
/// call yields to the runtime while waiting on the browser.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigates to `url` and waits for the DOM content to be loaded
    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<()>;

    /// Reloads the current document
    async fn reload(&self, timeout: Duration) -> BrowserResult<()>;

    /// Clicks the first element matching `selector`
    async fn click(&self, selector: &str) -> BrowserResult<()>;

    /// Waits until an element matches `selector`
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> BrowserResult<()>;

    /// Focuses the first element matching `selector` and types `text`
    async fn type_text(&self, selector: &str, text: &str) -> BrowserResult<()>;

    /// Waits for an in-flight navigation to finish
    async fn wait_for_navigation(&self, timeout: Duration) -> BrowserResult<()>;

    /// Sets a cookie scoped to `url`
    async fn set_cookie(&self, name: &str, value: &str, url: &str) -> BrowserResult<()>;

    /// Evaluates a JavaScript expression in the page
    ///
    /// Promises are awaited; the result is returned by value.
    async fn evaluate(&self, expression: &str) -> BrowserResult<serde_json::Value>;

    /// Serialized HTML of the current document
    async fn document_html(&self) -> BrowserResult<String>;

    /// HTTP status of the last main document response, when known
    fn last_document_status(&self) -> Option<u16> {
        None
    }
}
