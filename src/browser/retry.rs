//! Retry ladder for browser actions
//!
//! Navigation, clicks and selector waits are attempted up to
//! `max_attempts` times with a fixed delay between attempts. A failed click
//! or selector wait reloads the page before the next attempt. When the ladder
//! is exhausted the last error is returned.

use crate::browser::{BrowserPage, BrowserResult};
use crate::config::RetryConfig;
use std::future::Future;
use std::time::Duration;

/// Attempt ceiling, inter-attempt delay and per-attempt timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub navigation_timeout: Duration,
    pub selector_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_millis(config.delay_ms),
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
            selector_timeout: Duration::from_millis(config.selector_timeout_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// What to do between two failed attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recovery {
    Wait,
    ReloadThenWait,
}

/// A page wrapped with the retry ladder
pub struct Navigator<'a, P: BrowserPage + ?Sized> {
    page: &'a P,
    policy: RetryPolicy,
}

impl<'a, P: BrowserPage + ?Sized> Navigator<'a, P> {
    pub fn new(page: &'a P, policy: RetryPolicy) -> Self {
        Self { page, policy }
    }

    pub fn page(&self) -> &'a P {
        self.page
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Navigates to `url`, retrying on failure
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL to open
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The DOM content of `url` was loaded
    /// * `Err(BrowserError)` - Every attempt failed; the last error
    pub async fn goto(&self, url: &str) -> BrowserResult<()> {
        let timeout = self.policy.navigation_timeout;
        self.with_retry("goto", url, Recovery::Wait, || self.page.goto(url, timeout))
            .await
    }

    /// Clicks `selector`, reloading and retrying on failure
    pub async fn click(&self, selector: &str) -> BrowserResult<()> {
        self.with_retry("click", selector, Recovery::ReloadThenWait, || {
            self.page.click(selector)
        })
        .await
    }

    /// Waits for `selector`, reloading and retrying on failure
    pub async fn wait_for_selector(&self, selector: &str) -> BrowserResult<()> {
        let timeout = self.policy.selector_timeout;
        self.with_retry("wait for", selector, Recovery::ReloadThenWait, || {
            self.page.wait_for_selector(selector, timeout)
        })
        .await
    }

    /// Reloads once, without retrying
    pub async fn reload(&self) -> BrowserResult<()> {
        self.page.reload(self.policy.navigation_timeout).await
    }

    async fn with_retry<F, Fut, T>(
        &self,
        action: &str,
        target: &str,
        recovery: Recovery,
        mut attempt: F,
    ) -> BrowserResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BrowserResult<T>>,
    {
        let mut tries = 0;
        loop {
            tries += 1;
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) if tries >= self.policy.max_attempts => {
                    tracing::error!(
                        "Failed to {} {} after {} attempts: {}",
                        action,
                        target,
                        tries,
                        e
                    );
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to {} {} (attempt {}/{}): {}, retrying in {:?}",
                        action,
                        target,
                        tries,
                        self.policy.max_attempts,
                        e,
                        self.policy.delay
                    );

                    if recovery == Recovery::ReloadThenWait {
                        if let Err(e) = self.reload().await {
                            tracing::debug!("Reload before retry failed: {}", e);
                        }
                    }

                    tokio::time::sleep(self.policy.delay).await;
                }
            }
        }
    }
}
