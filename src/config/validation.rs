use crate::config::types::{
    ArchiveConfig, BrowserSettings, Config, RetryConfig, SiteConfig, TimingConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_archive_config(&config.archive)?;
    validate_browser_settings(&config.browser)?;
    validate_retry_config(&config.retry)?;
    validate_timing_config(&config.timing)?;
    Ok(())
}

/// Validates the site section
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            config.base_url
        )));
    }

    // Canonical URLs are computed by stripping this origin, so it must not
    // carry a path of its own.
    if url.path() != "/" || url.query().is_some() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must be a bare origin without path or query, got '{}'",
            config.base_url
        )));
    }

    validate_year(&config.year)?;

    if !config.detail_prefix.starts_with('/') || !config.detail_prefix.ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "detail_prefix must start and end with '/', got '{}'",
            config.detail_prefix
        )));
    }

    if config.detail_prefix == "/" {
        return Err(ConfigError::Validation(
            "detail_prefix cannot be the site root".to_string(),
        ));
    }

    Ok(())
}

/// Validates the archive year (e.g., "2023-2024" or "2023/2024")
fn validate_year(year: &str) -> Result<(), ConfigError> {
    if year.trim().is_empty() {
        return Err(ConfigError::Validation("year cannot be empty".to_string()));
    }

    if !year
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '/' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "year must contain only letters, digits, '-', '_' or '/', got '{}'",
            year
        )));
    }

    Ok(())
}

/// Validates output locations
fn validate_archive_config(config: &ArchiveConfig) -> Result<(), ConfigError> {
    if config.output_root.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output_root cannot be empty".to_string(),
        ));
    }

    if config.resource_map_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "resource_map_path cannot be empty".to_string(),
        ));
    }

    if let Some(template) = &config.index_template {
        if template.trim().is_empty() {
            return Err(ConfigError::Validation(
                "index_template cannot be an empty path".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates browser launch options
fn validate_browser_settings(config: &BrowserSettings) -> Result<(), ConfigError> {
    if config.window_width == 0 || config.window_height == 0 {
        return Err(ConfigError::Validation(format!(
            "window size must be non-zero, got {}x{}",
            config.window_width, config.window_height
        )));
    }

    Ok(())
}

/// Validates the retry ladder
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 20 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 20, got {}",
            config.max_attempts
        )));
    }

    if config.navigation_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "navigation_timeout_ms must be >= 100ms, got {}ms",
            config.navigation_timeout_ms
        )));
    }

    if config.selector_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "selector_timeout_ms must be >= 100ms, got {}ms",
            config.selector_timeout_ms
        )));
    }

    Ok(())
}

/// Validates traversal pacing
fn validate_timing_config(config: &TimingConfig) -> Result<(), ConfigError> {
    if config.scroll_step_px == 0 {
        return Err(ConfigError::Validation(
            "scroll_step_px must be >= 1".to_string(),
        ));
    }

    if config.scroll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "scroll_interval_ms must be >= 1".to_string(),
        ));
    }

    Ok(())
}
