//! Integration tests for the archiver
//!
//! These tests drive the walker and the coordinator through an in-memory
//! browser page that serves canned documents and reports the responses a
//! real page would load. On-demand stylesheet fetches go to a wiremock server.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use village_archiver::browser::{BrowserError, BrowserPage, Navigator, RetryPolicy};
use village_archiver::cache::{
    persist_bytes, NetworkResponse, Reservation, ResourceCache, ResourceKind,
};
use village_archiver::config::{ArchiveConfig, Config, SiteConfig};
use village_archiver::crawler::{Coordinator, FrontierWalker, Pacing};
use village_archiver::output::ArchiveLayout;
use village_archiver::rewrite::MarkupRewriter;
use village_archiver::{archive_url, ArchiveError, CrawlUnit};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RATE_LIMITED: &str =
    "<html><head><style></style></head><body>Too many requests, please try again later.</body></html>";

/// A browser page over a fixed site
///
/// Documents registered several times for one URL are served in order, the
/// last one repeating. Assets registered for a URL are reported to the cache
/// on every navigation to it, as the response listener would.
#[derive(Default)]
struct SitePage {
    documents: Mutex<HashMap<String, VecDeque<String>>>,
    assets: HashMap<String, Vec<(String, &'static str)>>,
    evaluations: Vec<(&'static str, Value)>,
    failing_urls: HashSet<String>,
    cache: Option<Arc<ResourceCache>>,
    current_url: Mutex<String>,
    visits: Mutex<Vec<String>>,
}

impl SitePage {
    fn new() -> Self {
        Self::default()
    }

    fn document(self, url: &str, html: &str) -> Self {
        self.documents
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(html.to_string());
        self
    }

    fn asset(mut self, page_url: &str, asset_url: &str, mime: &'static str) -> Self {
        self.assets
            .entry(page_url.to_string())
            .or_default()
            .push((asset_url.to_string(), mime));
        self
    }

    fn evaluates(mut self, needle: &'static str, value: Value) -> Self {
        self.evaluations.push((needle, value));
        self
    }

    fn failing(mut self, url: &str) -> Self {
        self.failing_urls.insert(url.to_string());
        self
    }

    fn capturing(mut self, cache: Arc<ResourceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserPage for SitePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<(), BrowserError> {
        self.visits.lock().unwrap().push(url.to_string());
        if self.failing_urls.contains(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_TIMED_OUT".to_string(),
            });
        }
        *self.current_url.lock().unwrap() = url.to_string();

        if let (Some(cache), Some(assets)) = (&self.cache, self.assets.get(url)) {
            for (asset_url, mime) in assets {
                let response = NetworkResponse {
                    url: asset_url.clone(),
                    kind: ResourceKind::Image,
                    content_type: Some(mime.to_string()),
                    status: 200,
                };
                if let Some(Reservation::Reserved { disk_path, .. }) = cache.capture(&response) {
                    persist_bytes(&disk_path, b"asset bytes").await;
                }
            }
        }
        Ok(())
    }

    async fn reload(&self, _timeout: Duration) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn click(&self, _selector: &str) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn wait_for_selector(&self, _selector: &str, _timeout: Duration) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn type_text(&self, _selector: &str, _text: &str) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn wait_for_navigation(&self, _timeout: Duration) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn set_cookie(&self, _name: &str, _value: &str, _url: &str) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError> {
        Ok(self
            .evaluations
            .iter()
            .find(|(needle, _)| expression.contains(needle))
            .map(|(_, value)| value.clone())
            .unwrap_or(Value::Null))
    }

    async fn document_html(&self) -> Result<String, BrowserError> {
        let url = self.current_url.lock().unwrap().clone();
        let mut documents = self.documents.lock().unwrap();
        Ok(match documents.get_mut(&url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => "<html><head></head><body></body></html>".to_string(),
        })
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        delay: Duration::from_millis(1),
        navigation_timeout: Duration::from_millis(50),
        selector_timeout: Duration::from_millis(50),
    }
}

fn page_url(base: &str, path: &str) -> String {
    archive_url(base, path).unwrap().to_string()
}

fn test_config(base_url: &str, root: &Path) -> Config {
    Config {
        site: SiteConfig {
            base_url: base_url.to_string(),
            year: "2023".to_string(),
            detail_prefix: "/activite/".to_string(),
        },
        archive: ArchiveConfig {
            output_root: root.to_string_lossy().into_owned(),
            resource_map_path: root.join("resources.json").to_string_lossy().into_owned(),
            index_template: None,
        },
        browser: Default::default(),
        retry: Default::default(),
        timing: Default::default(),
        auth: Default::default(),
    }
}

#[tokio::test]
async fn test_full_archive_single_village() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/fonts/f.woff"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"wOFF".to_vec())
                .insert_header("content-type", "font/woff"),
        )
        .mount(&server)
        .await;

    let temp = tempfile::tempdir().unwrap();
    let config = test_config(&base, temp.path());
    let layout = ArchiveLayout::from_config(&config);
    layout.ensure_dirs().await.unwrap();

    // A stylesheet captured by an earlier run
    let css_public = layout.resource_public_path("app.css");
    std::fs::write(
        layout.disk_path(&css_public),
        ".card{background:url('/fonts/f.woff')} .pagination{display:flex}",
    )
    .unwrap();
    let entries = HashMap::from([("/_next/static/css/app.css".to_string(), css_public.clone())]);
    let cache = Arc::new(ResourceCache::with_entries(
        layout.clone(),
        &base,
        reqwest::Client::new(),
        entries,
    ));

    let entry = page_url(&base, "");
    let page = SitePage::new()
        .evaluates("querySelectorAll", json!(1))
        .evaluates("innerText", json!("Liban"))
        .document(
            &entry,
            r#"<html><head><link rel="stylesheet" href="/_next/static/css/app.css"><script src="/app.js"></script></head>
<body><header><button>Accueil</button></header>
<img src="/img/a.jpg&w=640&q=75" srcset="/img/a.jpg&w=1080&q=75 2x">
<a href="/activite/1">Activité</a><a href="/">Accueil</a></body></html>"#,
        )
        .document(
            &page_url(&base, "activite/1"),
            r#"<html><body><p>Activité</p><a href="/activite/1">self</a></body></html>"#,
        )
        .asset(&entry, &format!("{}/img/a.jpg&w=640&q=75", base), "image/jpeg")
        .capturing(Arc::clone(&cache));

    let stats = Coordinator::new(&page, &config, Arc::clone(&cache))
        .with_pacing(Pacing::immediate())
        .with_policy(fast_policy())
        .run()
        .await
        .unwrap();

    assert_eq!(stats.villages, vec!["Liban".to_string()]);
    assert_eq!(stats.units_completed, 3);
    assert_eq!(stats.units_failed, 0);
    assert_eq!(stats.pages.archived, 6);
    assert_eq!(stats.stylesheets.rewritten, 1);

    // Entry page of phase 1
    let html = std::fs::read_to_string(layout.page_file("index-liban-phase-1")).unwrap();
    let image = cache.lookup("/img/a.jpg").unwrap();
    assert!(image.starts_with("/api/archives/2023/ressources/"));
    assert!(html.contains(&format!(r#"<img src="{}">"#, image)));
    assert!(html.contains(&format!(r#"href="{}""#, css_public)));
    assert!(html.contains(r#"href="/api/archives/2023/activite/1""#));
    assert!(html.contains(r#"href="/api/archives/2023/index-liban-phase-1""#));
    assert!(html.contains(r#"<a href="/api/archives/2023/" rel="noreferrer">Accueil</a>"#));
    assert!(!html.contains("<script"));
    assert!(layout.disk_path(&image).is_file());

    assert!(layout.page_file("activite/1").is_file());

    // Stylesheet pass
    let font = cache.lookup("/fonts/f.woff").unwrap();
    assert!(font.ends_with(".woff"));
    let css = std::fs::read_to_string(layout.disk_path(&css_public)).unwrap();
    assert!(css.contains(&format!("url({})", font)));
    assert!(!css.contains(".pagination"));
    assert_eq!(std::fs::read(layout.disk_path(&font)).unwrap(), b"wOFF");

    // Index
    let index = std::fs::read_to_string(layout.index_file()).unwrap();
    assert!(index.contains(
        r#"<li><a class="text" href="/api/archives/2023/index-liban-phase-1" rel="noreferrer">Liban</a></li>"#
    ));
    assert!(index.contains("Archives 1Village 2023"));
}

#[tokio::test]
async fn test_walker_visits_once_and_revisits_rate_limited_page_first() {
    let base = "https://1v.example.org";
    let temp = tempfile::tempdir().unwrap();
    let layout = ArchiveLayout::new(temp.path(), "2023");
    let cache = Arc::new(ResourceCache::new(layout.clone(), base, reqwest::Client::new()));
    let rewriter = MarkupRewriter::new(cache, layout.clone(), "/activite/");

    let page = SitePage::new()
        .document(
            &page_url(base, ""),
            r#"<a href="/activite/1">1</a><a href="/activite/2">2</a><a href="/activite/1">1 again</a>"#,
        )
        .document(&page_url(base, "activite/1"), RATE_LIMITED)
        .document(
            &page_url(base, "activite/1"),
            r#"<a href="/activite/2">2</a><a href="/activite/1?tab=comments">comments</a>"#,
        )
        .document(&page_url(base, "activite/2"), r#"<a href="/activite/1">1</a><a href="/">home</a>"#);

    let navigator = Navigator::new(&page, fast_policy());
    let walker = FrontierWalker::new(&navigator, &rewriter, Pacing::immediate(), base);
    let counts = walker.walk(&CrawlUnit::new("Liban", 1)).await.unwrap();

    assert_eq!(
        page.visits(),
        vec![
            page_url(base, ""),
            page_url(base, "activite/1"),
            page_url(base, "activite/1"),
            page_url(base, "activite/2"),
        ]
    );
    assert_eq!(counts.archived, 3);
    assert_eq!(counts.rate_limited, 1);
    assert_eq!(counts.lost, 0);

    let archived = std::fs::read_to_string(layout.page_file("activite/1")).unwrap();
    assert!(!archived.contains("Too many requests"));
}

#[tokio::test]
async fn test_entry_failure_aborts_unit_only() {
    let base = "https://1v.example.org";
    let temp = tempfile::tempdir().unwrap();
    let config = test_config(base, temp.path());
    let layout = ArchiveLayout::from_config(&config);
    let cache = Arc::new(ResourceCache::new(layout.clone(), base, reqwest::Client::new()));

    let page = SitePage::new()
        .evaluates("querySelectorAll", json!(1))
        .evaluates("innerText", json!("Liban"))
        .failing(&page_url(base, ""));

    let stats = Coordinator::new(&page, &config, cache)
        .with_pacing(Pacing::immediate())
        .with_policy(fast_policy())
        .run()
        .await
        .unwrap();

    assert_eq!(stats.units_failed, 3);
    assert_eq!(stats.units_completed, 0);
    assert_eq!(stats.pages.archived, 0);

    // Two attempts per phase at the entry page
    let entry_visits = page
        .visits()
        .into_iter()
        .filter(|u| *u == page_url(base, ""))
        .count();
    assert_eq!(entry_visits, 6);

    // The village is still listed
    let index = std::fs::read_to_string(layout.index_file()).unwrap();
    assert!(index.contains("index-liban-phase-1"));
}

#[tokio::test]
async fn test_walker_reports_entry_failure() {
    let base = "https://1v.example.org";
    let temp = tempfile::tempdir().unwrap();
    let layout = ArchiveLayout::new(temp.path(), "2023");
    let cache = Arc::new(ResourceCache::new(layout.clone(), base, reqwest::Client::new()));
    let rewriter = MarkupRewriter::new(cache, layout, "/activite/");

    let page = SitePage::new().failing(&page_url(base, ""));
    let navigator = Navigator::new(&page, fast_policy());
    let walker = FrontierWalker::new(&navigator, &rewriter, Pacing::immediate(), base);

    let err = walker.walk(&CrawlUnit::new("Liban", 3)).await.unwrap_err();
    match err {
        ArchiveError::UnitEntry { unit, .. } => assert_eq!(unit, "Liban, phase 3"),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_resource_map_survives_restart() {
    let base = "https://1v.example.org";
    let temp = tempfile::tempdir().unwrap();
    let layout = ArchiveLayout::new(temp.path(), "2023");
    let map_path = temp.path().join("state").join("resources.json");

    let first = ResourceCache::new(layout.clone(), base, reqwest::Client::new());
    let response = NetworkResponse {
        url: format!("{}/img/a.jpg&w=300&q=80", base),
        kind: ResourceKind::Image,
        content_type: Some("image/jpeg".to_string()),
        status: 200,
    };
    let public_path = match first.capture(&response) {
        Some(Reservation::Reserved { public_path, .. }) => public_path,
        other => panic!("expected a reservation, got {:?}", other),
    };
    first.save(&map_path).await.unwrap();

    let second = ResourceCache::load(&map_path, layout, base, reqwest::Client::new()).await;
    assert_eq!(second.len(), 1);
    assert_eq!(second.lookup("/img/a.jpg").as_deref(), Some(public_path.as_str()));
    assert_eq!(
        second.capture(&response),
        Some(Reservation::Existing(public_path))
    );
}
