use serde::Deserialize;

/// Main configuration structure for Village-Archiver
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// The application being archived
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Origin of the live application (e.g., "https://1v.parlemonde.org")
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// School year the archive is built for (e.g., "2023-2024")
    pub year: String,

    /// Path prefix of content detail pages that are followed during traversal
    #[serde(rename = "detail-prefix", default = "default_detail_prefix")]
    pub detail_prefix: String,
}

/// Output locations
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    /// Directory the archive tree is written under
    #[serde(rename = "output-root", default = "default_output_root")]
    pub output_root: String,

    /// JSON snapshot of the resource map, reused across runs
    #[serde(rename = "resource-map-path", default = "default_resource_map_path")]
    pub resource_map_path: String,

    /// Optional HTML template for the top-level index page
    #[serde(rename = "index-template", default)]
    pub index_template: Option<String>,
}

/// Browser launch options
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(rename = "window-width", default = "default_window_width")]
    pub window_width: u32,

    #[serde(rename = "window-height", default = "default_window_height")]
    pub window_height: u32,

    /// Chrome/Chromium binary; auto-detected when absent
    #[serde(default)]
    pub executable: Option<String>,
}

/// Retry ladder applied to navigations, clicks and selector waits
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between two attempts (milliseconds)
    #[serde(rename = "delay-ms", default = "default_retry_delay_ms")]
    pub delay_ms: u64,

    #[serde(rename = "navigation-timeout-ms", default = "default_timeout_ms")]
    pub navigation_timeout_ms: u64,

    #[serde(rename = "selector-timeout-ms", default = "default_timeout_ms")]
    pub selector_timeout_ms: u64,
}

/// Pacing of the traversal (all durations in milliseconds)
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    /// Pause before every page visit
    #[serde(rename = "page-delay-ms", default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Cool-down before each phase of a village
    #[serde(rename = "phase-cooldown-ms", default = "default_phase_cooldown_ms")]
    pub phase_cooldown_ms: u64,

    /// Wait before re-visiting a rate-limited page
    #[serde(rename = "rate-limit-backoff-ms", default = "default_rate_limit_backoff_ms")]
    pub rate_limit_backoff_ms: u64,

    /// Wait on a unit's entry page before selecting the phase
    #[serde(rename = "phase-select-delay-ms", default = "default_phase_select_delay_ms")]
    pub phase_select_delay_ms: u64,

    #[serde(rename = "scroll-step-px", default = "default_scroll_step_px")]
    pub scroll_step_px: u32,

    #[serde(rename = "scroll-interval-ms", default = "default_scroll_interval_ms")]
    pub scroll_interval_ms: u64,
}

/// Credentials used to open the authenticated session
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "access-token", default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            resource_map_path: default_resource_map_path(),
            index_template: None,
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: default_window_width(),
            window_height: default_window_height(),
            executable: None,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_retry_delay_ms(),
            navigation_timeout_ms: default_timeout_ms(),
            selector_timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: default_page_delay_ms(),
            phase_cooldown_ms: default_phase_cooldown_ms(),
            rate_limit_backoff_ms: default_rate_limit_backoff_ms(),
            phase_select_delay_ms: default_phase_select_delay_ms(),
            scroll_step_px: default_scroll_step_px(),
            scroll_interval_ms: default_scroll_interval_ms(),
        }
    }
}

fn default_detail_prefix() -> String {
    "/activite/".to_string()
}

fn default_output_root() -> String {
    "archive".to_string()
}

fn default_resource_map_path() -> String {
    "resources.json".to_string()
}

fn default_true() -> bool {
    true
}

fn default_window_width() -> u32 {
    1440
}

fn default_window_height() -> u32 {
    2000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    30_000
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_page_delay_ms() -> u64 {
    2_000
}

fn default_phase_cooldown_ms() -> u64 {
    20_000
}

fn default_rate_limit_backoff_ms() -> u64 {
    5_000
}

fn default_phase_select_delay_ms() -> u64 {
    4_000
}

fn default_scroll_step_px() -> u32 {
    300
}

fn default_scroll_interval_ms() -> u64 {
    200
}
