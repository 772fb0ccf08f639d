use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variables that take precedence over the `[auth]` section
const ENV_ACCESS_TOKEN: &str = "ACCESS_TOKEN";
const ENV_USERNAME: &str = "ADMIN_USERNAME";
const ENV_PASSWORD: &str = "ADMIN_PASSWORD";

/// Loads and parses a configuration file from the given path
///
/// Credentials found in the `ACCESS_TOKEN`, `ADMIN_USERNAME` and
/// `ADMIN_PASSWORD` environment variables override the `[auth]` section.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use village_archiver::config::load_config;
///
/// let config = load_config(Path::new("archiver.toml")).unwrap();
/// println!("Archiving year: {}", config.site.year);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let mut config: Config = toml::from_str(&content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate(&config)?;

    Ok(config)
}

/// Overrides credentials with values returned by `lookup`
///
/// Empty values are ignored so that an exported-but-blank variable does not
/// wipe a credential from the file.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(token) = non_empty(ENV_ACCESS_TOKEN) {
        config.auth.access_token = Some(token);
    }
    if let Some(username) = non_empty(ENV_USERNAME) {
        config.auth.username = Some(username);
    }
    if let Some(password) = non_empty(ENV_PASSWORD) {
        config.auth.password = Some(password);
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so two archive runs can be matched to the settings they
/// used.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok((Config, String))` - Successfully loaded configuration and its hash
/// * `Err(ConfigError)` - Failed to load or parse the configuration
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
