//! HTTP client for on-demand asset fetches
//!
//! Pages are always rendered by the browser; this client only downloads
//! assets referenced from stylesheets that the browser never requested.

use crate::config::RetryConfig;
use reqwest::Client;
use std::time::Duration;

/// Builds the HTTP client used for asset downloads
///
/// # Arguments
///
/// * `retry` - Supplies the request timeout (the navigation timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use village_archiver::config::RetryConfig;
/// use village_archiver::crawler::build_http_client;
///
/// let client = build_http_client(&RetryConfig::default()).unwrap();
/// ```
pub fn build_http_client(retry: &RetryConfig) -> Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_millis(retry.navigation_timeout_ms))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&RetryConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_user_agent_sent() {
        let server = MockServer::start().await;
        let expected = format!("village-archiver/{}", env!("CARGO_PKG_VERSION"));
        Mock::given(method("GET"))
            .and(path("/a.css"))
            .and(header("user-agent", expected.as_str()))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = build_http_client(&RetryConfig::default()).unwrap();
        let response = client
            .get(format!("{}/a.css", server.uri()))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
    }
}
