//! Politeness delays between browser actions
//!
//! Every page is preceded by a fixed delay, phases of one village are
//! separated by a cool-down, and a rate-limited page is re-visited only after
//! a back-off.

use crate::config::TimingConfig;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Before every page navigation
    pub page_delay: Duration,

    /// Between two phases of the same village
    pub phase_cooldown: Duration,

    /// Before re-visiting a rate-limited page
    pub rate_limit_backoff: Duration,

    /// Before reloading an entry page to pick its phase
    pub phase_select_delay: Duration,

    /// After clicking a phase button
    pub phase_settle_delay: Duration,

    pub scroll_step_px: u32,
    pub scroll_interval: Duration,
}

impl Pacing {
    pub fn from_config(config: &TimingConfig) -> Self {
        Self {
            page_delay: Duration::from_millis(config.page_delay_ms),
            phase_cooldown: Duration::from_millis(config.phase_cooldown_ms),
            rate_limit_backoff: Duration::from_millis(config.rate_limit_backoff_ms),
            phase_select_delay: Duration::from_millis(config.phase_select_delay_ms),
            phase_settle_delay: Duration::from_millis(500),
            scroll_step_px: config.scroll_step_px.max(1),
            scroll_interval: Duration::from_millis(config.scroll_interval_ms.max(1)),
        }
    }

    /// No waiting at all; scrolling still advances in large steps
    pub fn immediate() -> Self {
        Self {
            page_delay: Duration::ZERO,
            phase_cooldown: Duration::ZERO,
            rate_limit_backoff: Duration::ZERO,
            phase_select_delay: Duration::ZERO,
            phase_settle_delay: Duration::ZERO,
            scroll_step_px: 10_000,
            scroll_interval: Duration::from_millis(1),
        }
    }

    /// Sleeps for `delay`, skipping the timer entirely when it is zero
    pub async fn pause(delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::from_config(&TimingConfig::default())
    }
}
