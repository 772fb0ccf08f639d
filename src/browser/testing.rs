//! In-memory page used by unit tests

use crate::browser::{BrowserError, BrowserPage, BrowserResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Records every call and serves canned documents per URL
///
/// A URL registered with several documents serves them in order, then keeps
/// serving the last one.
#[derive(Default)]
pub struct ScriptedPage {
    calls: Mutex<Vec<String>>,
    current_url: Mutex<String>,
    documents: Mutex<HashMap<String, VecDeque<String>>>,
    evaluations: Vec<(String, Value)>,
    failing_selectors: HashSet<String>,
    failing_urls: HashSet<String>,
    statuses: HashMap<String, u16>,
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, url: &str, html: &str) -> Self {
        self.documents
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(html.to_string());
        self
    }

    /// Answers evaluations whose expression contains `needle`
    pub fn on_evaluate(mut self, needle: &str, value: Value) -> Self {
        self.evaluations.push((needle.to_string(), value));
        self
    }

    pub fn fail_selector(mut self, selector: &str) -> Self {
        self.failing_selectors.insert(selector.to_string());
        self
    }

    pub fn fail_url(mut self, url: &str) -> Self {
        self.failing_urls.insert(url.to_string());
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.statuses.insert(url.to_string(), status);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// URLs navigated to, in order
    pub fn visits(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix("goto ").map(str::to_string))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_selector(&self, selector: &str) -> BrowserResult<()> {
        if self.failing_selectors.contains(selector) {
            return Err(BrowserError::SelectorNotFound(selector.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserPage for ScriptedPage {
    async fn goto(&self, url: &str, _timeout: Duration) -> BrowserResult<()> {
        self.record(format!("goto {}", url));
        if self.failing_urls.contains(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }
        *self.current_url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn reload(&self, _timeout: Duration) -> BrowserResult<()> {
        self.record("reload".to_string());
        Ok(())
    }

    async fn click(&self, selector: &str) -> BrowserResult<()> {
        self.record(format!("click {}", selector));
        self.check_selector(selector)
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> BrowserResult<()> {
        self.record(format!("wait {}", selector));
        self.check_selector(selector)
    }

    async fn type_text(&self, selector: &str, _text: &str) -> BrowserResult<()> {
        self.record(format!("type {}", selector));
        self.check_selector(selector)
    }

    async fn wait_for_navigation(&self, _timeout: Duration) -> BrowserResult<()> {
        self.record("navigation".to_string());
        Ok(())
    }

    async fn set_cookie(&self, name: &str, value: &str, _url: &str) -> BrowserResult<()> {
        self.record(format!("cookie {}={}", name, value));
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> BrowserResult<Value> {
        self.record("eval".to_string());
        Ok(self
            .evaluations
            .iter()
            .find(|(needle, _)| expression.contains(needle.as_str()))
            .map(|(_, value)| value.clone())
            .unwrap_or(Value::Null))
    }

    async fn document_html(&self) -> BrowserResult<String> {
        let url = self.current_url.lock().unwrap().clone();
        let mut documents = self.documents.lock().unwrap();
        let html = match documents.get_mut(&url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => "<html><head></head><body></body></html>".to_string(),
        };
        Ok(html)
    }

    fn last_document_status(&self) -> Option<u16> {
        let url = self.current_url.lock().unwrap();
        self.statuses.get(url.as_str()).copied()
    }
}
