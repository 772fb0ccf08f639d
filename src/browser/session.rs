//! Authenticated session acquisition

use crate::browser::{BrowserError, BrowserPage, Navigator};
use crate::config::Config;
use crate::{ArchiveError, Result};

/// Cookie carrying the platform session
pub const ACCESS_TOKEN_COOKIE: &str = "access-token";

const LOGIN_PATH: &str = "/connexion";
const USERNAME_INPUT: &str = r#"input[name="username"]"#;
const PASSWORD_INPUT: &str = "#password";
const SUBMIT_BUTTON: &str = r#"button[type="submit"]"#;

/// Puts `navigator`'s page into an authenticated session
///
/// With an access token the session cookie is set directly; otherwise the
/// login form is submitted with the configured credentials, retried up to the
/// retry ceiling.
///
/// # Returns
///
/// * `Ok(())` - The page is authenticated and on the base URL
/// * `Err(ArchiveError::Session)` - No usable credentials or every login failed
pub async fn acquire_session<P: BrowserPage + ?Sized>(
    navigator: &Navigator<'_, P>,
    config: &Config,
) -> Result<()> {
    let base_url = config.site.base_url.trim_end_matches('/');

    if let Some(token) = config.auth.access_token.as_deref() {
        tracing::info!("Using access token session");
        navigator
            .page()
            .set_cookie(ACCESS_TOKEN_COOKIE, token, base_url)
            .await?;
        navigator.goto(base_url).await?;
        return Ok(());
    }

    let (Some(username), Some(password)) = (
        config.auth.username.as_deref(),
        config.auth.password.as_deref(),
    ) else {
        return Err(ArchiveError::Session(
            "no access token or username/password configured".to_string(),
        ));
    };

    let policy = *navigator.policy();
    let login_url = format!("{}{}", base_url, LOGIN_PATH);
    let mut last_error = None;

    for attempt in 1..=policy.max_attempts {
        match submit_login(navigator, &login_url, username, password).await {
            Ok(()) => {
                tracing::info!("Logged in as {}", username);
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(
                    "Login attempt {}/{} failed: {}",
                    attempt,
                    policy.max_attempts,
                    e
                );
                last_error = Some(e);
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }

    Err(ArchiveError::Session(
        last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "login never attempted".to_string()),
    ))
}

async fn submit_login<P: BrowserPage + ?Sized>(
    navigator: &Navigator<'_, P>,
    login_url: &str,
    username: &str,
    password: &str,
) -> std::result::Result<(), BrowserError> {
    let page = navigator.page();
    let timeout = navigator.policy().navigation_timeout;

    page.goto(login_url, timeout).await?;
    page.type_text(USERNAME_INPUT, username).await?;
    page.type_text(PASSWORD_INPUT, password).await?;
    page.click(SUBMIT_BUTTON).await?;
    page.wait_for_navigation(timeout).await
}
