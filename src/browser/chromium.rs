//! Chromium over the DevTools protocol

use crate::browser::{BrowserError, BrowserPage, BrowserResult};
use crate::cache::{persist_bytes, NetworkResponse, Reservation, ResourceCache, ResourceKind};
use crate::config::BrowserSettings;
use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, EnableParams, EventLoadingFailed, EventLoadingFinished, EventResponseReceived,
    GetResponseBodyParams, RequestId, ResourceType, SetCacheDisabledParams,
};
use chromiumoxide::cdp::browser_protocol::page::{NavigateParams, ReloadParams};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Interval between two DOM/selector polls
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Attempts at reading a finished response body
const BODY_ATTEMPTS: u32 = 3;

/// Launches Chromium and drives its CDP connection on a background task
///
/// # Arguments
///
/// * `settings` - Window size, headless mode and executable override
///
/// # Returns
///
/// The browser and the handle of the task pumping its event loop.
pub async fn launch_browser(settings: &BrowserSettings) -> BrowserResult<(Browser, JoinHandle<()>)> {
    let mut builder = BrowserConfig::builder().window_size(settings.window_width, settings.window_height);

    if !settings.headless {
        builder = builder.with_head();
    }
    if let Some(executable) = &settings.executable {
        builder = builder.chrome_executable(executable);
    }

    let config = builder.build().map_err(BrowserError::Launch)?;
    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| BrowserError::Launch(e.to_string()))?;

    let handle = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                tracing::debug!("Browser handler stopped: {}", e);
                break;
            }
        }
    });

    tracing::info!(
        "Launched browser ({}x{}, headless: {})",
        settings.window_width,
        settings.window_height,
        settings.headless
    );

    Ok((browser, handle))
}

/// A Chromium tab
#[derive(Debug, Clone)]
pub struct ChromiumPage {
    page: Page,
    document_status: Arc<AtomicU16>,
}

impl ChromiumPage {
    /// Opens a blank tab with the Network domain enabled
    pub async fn open(browser: &Browser) -> BrowserResult<Self> {
        let page = browser.new_page("about:blank").await?;
        page.execute(EnableParams::default()).await?;
        // Cached responses carry no body to capture.
        page.execute(SetCacheDisabledParams::new(true)).await?;

        Ok(Self {
            page,
            document_status: Arc::new(AtomicU16::new(0)),
        })
    }

    pub fn inner(&self) -> &Page {
        &self.page
    }

    async fn ready_state(&self) -> BrowserResult<String> {
        let result = self.page.evaluate("document.readyState").await?;
        Ok(result
            .value()
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }

    /// Polls until the current document is past `loading`
    async fn wait_for_dom_content(&self, action: &str, timeout: Duration) -> BrowserResult<()> {
        let wait = async {
            loop {
                match self.ready_state().await.as_deref() {
                    Ok("interactive") | Ok("complete") => return,
                    Ok(_) => {}
                    Err(e) => tracing::trace!("readyState unavailable: {}", e),
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| BrowserError::Timeout {
                action: action.to_string(),
                millis: timeout.as_millis() as u64,
            })
    }
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<()> {
        self.document_status.store(0, Ordering::Relaxed);

        let navigate = self.page.execute(NavigateParams::new(url));
        let response = tokio::time::timeout(timeout, navigate)
            .await
            .map_err(|_| BrowserError::Timeout {
                action: format!("Navigation to {}", url),
                millis: timeout.as_millis() as u64,
            })??;

        if let Some(reason) = response.result.error_text.clone() {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason,
            });
        }

        self.wait_for_dom_content(&format!("Loading {}", url), timeout)
            .await
    }

    async fn reload(&self, timeout: Duration) -> BrowserResult<()> {
        self.document_status.store(0, Ordering::Relaxed);
        self.page.execute(ReloadParams::default()).await?;
        self.wait_for_dom_content("Reload", timeout).await
    }

    async fn click(&self, selector: &str) -> BrowserResult<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;
        element.click().await?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        let wait = async {
            while self.page.find_element(selector).await.is_err() {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| BrowserError::Timeout {
                action: format!("Waiting for {}", selector),
                millis: timeout.as_millis() as u64,
            })
    }

    async fn type_text(&self, selector: &str, text: &str) -> BrowserResult<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;
        element.click().await?.type_str(text).await?;
        Ok(())
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> BrowserResult<()> {
        tokio::time::timeout(timeout, self.page.wait_for_navigation())
            .await
            .map_err(|_| BrowserError::Timeout {
                action: "Navigation".to_string(),
                millis: timeout.as_millis() as u64,
            })??;
        Ok(())
    }

    async fn set_cookie(&self, name: &str, value: &str, url: &str) -> BrowserResult<()> {
        let cookie = CookieParam::builder()
            .name(name)
            .value(value)
            .url(url)
            .build()
            .map_err(BrowserError::Cdp)?;
        self.page.set_cookie(cookie).await?;
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> BrowserResult<serde_json::Value> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(BrowserError::Script)?;

        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;

        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn document_html(&self) -> BrowserResult<String> {
        Ok(self.page.content().await?)
    }

    fn last_document_status(&self) -> Option<u16> {
        match self.document_status.load(Ordering::Relaxed) {
            0 => None,
            status => Some(status),
        }
    }
}

fn resource_kind(resource_type: &ResourceType) -> ResourceKind {
    match resource_type {
        ResourceType::Document => ResourceKind::Document,
        ResourceType::Stylesheet => ResourceKind::Stylesheet,
        ResourceType::Image => ResourceKind::Image,
        ResourceType::Media => ResourceKind::Media,
        ResourceType::Font => ResourceKind::Font,
        ResourceType::Script => ResourceKind::Script,
        _ => ResourceKind::Other,
    }
}

/// A reserved response whose body is still loading
struct PendingBody {
    url: String,
    public_path: String,
    disk_path: PathBuf,
}

/// Feeds every response the tab receives into the resource cache
///
/// The reservation is made as the response headers arrive. The body is read
/// once the request has finished loading, then written on its own task; a
/// request that fails to load gives its reservation back. The returned task
/// ends when the tab closes.
pub async fn spawn_resource_capture(
    page: &ChromiumPage,
    cache: Arc<ResourceCache>,
) -> BrowserResult<JoinHandle<()>> {
    let mut responses = page.page.event_listener::<EventResponseReceived>().await?;
    let mut finished = page.page.event_listener::<EventLoadingFinished>().await?;
    let mut failed = page.page.event_listener::<EventLoadingFailed>().await?;
    let tab = page.page.clone();
    let document_status = Arc::clone(&page.document_status);

    let handle = tokio::spawn(async move {
        let mut pending: HashMap<String, PendingBody> = HashMap::new();

        loop {
            tokio::select! {
                // Headers always precede the end of their own request
                biased;

                Some(event) = responses.next() => {
                    let kind = resource_kind(&event.r#type);
                    let status = u16::try_from(event.response.status).unwrap_or_default();

                    if kind == ResourceKind::Document {
                        document_status.store(status, Ordering::Relaxed);
                        continue;
                    }

                    let response = NetworkResponse {
                        url: event.response.url.clone(),
                        kind,
                        content_type: Some(event.response.mime_type.clone()).filter(|m| !m.is_empty()),
                        status,
                    };

                    if let Some(Reservation::Reserved { public_path, disk_path }) = cache.capture(&response) {
                        pending.insert(
                            event.request_id.inner().clone(),
                            PendingBody { url: response.url, public_path, disk_path },
                        );
                    }
                }

                Some(event) = finished.next() => {
                    let Some(body) = pending.remove(event.request_id.inner()) else {
                        continue;
                    };
                    let tab = tab.clone();
                    let cache = Arc::clone(&cache);
                    let request_id = event.request_id.clone();
                    tokio::spawn(async move {
                        match read_body(&tab, request_id).await {
                            Ok(bytes) => persist_bytes(&body.disk_path, &bytes).await,
                            Err(e) => {
                                tracing::warn!("Lost body of {}: {}", body.url, e);
                                cache.release(&body.url, &body.public_path);
                            }
                        }
                    });
                }

                Some(event) = failed.next() => {
                    if let Some(body) = pending.remove(event.request_id.inner()) {
                        tracing::warn!("Failed to load {}: {}", body.url, event.error_text);
                        cache.release(&body.url, &body.public_path);
                    }
                }

                else => break,
            }
        }
        tracing::debug!("Response capture stopped");
    });

    Ok(handle)
}

async fn read_body(page: &Page, request_id: RequestId) -> BrowserResult<Vec<u8>> {
    let mut last_error = None;

    for attempt in 0..BODY_ATTEMPTS {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_millis(250)).await;
        }

        match page
            .execute(GetResponseBodyParams::new(request_id.clone()))
            .await
        {
            Ok(response) => {
                let body = &response.result;
                if body.base64_encoded {
                    return base64::engine::general_purpose::STANDARD
                        .decode(&body.body)
                        .map_err(|e| BrowserError::Cdp(e.to_string()));
                }
                return Ok(body.body.clone().into_bytes());
            }
            Err(e) => last_error = Some(BrowserError::from(e)),
        }
    }

    Err(last_error.unwrap_or_else(|| BrowserError::Cdp("no response body".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_kind_mapping() {
        assert_eq!(resource_kind(&ResourceType::Stylesheet), ResourceKind::Stylesheet);
        assert_eq!(resource_kind(&ResourceType::Font), ResourceKind::Font);
        assert_eq!(resource_kind(&ResourceType::Xhr), ResourceKind::Other);
        assert!(!resource_kind(&ResourceType::Document).is_archivable());
    }
}
