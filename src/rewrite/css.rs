//! Stylesheet rewriting
//!
//! Runs once after traversal over every archived stylesheet. Each
//! root-relative `url(...)` reference is resolved through the resource cache,
//! fetching assets the browser never requested (fonts and backgrounds only
//! used by unvisited states), and pagination rules are stripped.

use crate::cache::ResourceCache;
use crate::Result;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// `url(/x)`, `url('/x')` and `url("/x")`
static URL_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*['"]?(/[^'")\s]+)['"]?\s*\)"#).expect("static regex")
});

/// Rule blocks styling the pagination widgets deleted from the pages
static PAGINATION_RULES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"\.pagination\s*\{[^}]*\}").expect("static regex"),
        Regex::new(r"\.pagination\s[^{]*\{[^}]*\}").expect("static regex"),
        Regex::new(r"\.MuiPagination[^{]*\{[^}]*\}").expect("static regex"),
    ]
});

/// Outcome of a stylesheet pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StylesheetReport {
    pub rewritten: usize,
    pub failed: usize,
    pub references_resolved: usize,
    pub references_missing: usize,
}

pub struct StylesheetRewriter {
    cache: Arc<ResourceCache>,
}

impl StylesheetRewriter {
    pub fn new(cache: Arc<ResourceCache>) -> Self {
        Self { cache }
    }

    /// Rewrites every archived stylesheet in place
    ///
    /// A stylesheet that cannot be read or written is logged and skipped.
    pub async fn rewrite_all(&self) -> StylesheetReport {
        let paths = self.cache.stylesheet_paths();
        tracing::info!("Rewriting {} stylesheets", paths.len());

        let mut report = StylesheetReport::default();
        for public_path in paths {
            match self.rewrite_file(&public_path, &mut report).await {
                Ok(()) => report.rewritten += 1,
                Err(e) => {
                    tracing::warn!("Failed to rewrite stylesheet {}: {}", public_path, e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "Stylesheets: {} rewritten, {} failed, {} references resolved, {} missing",
            report.rewritten,
            report.failed,
            report.references_resolved,
            report.references_missing
        );
        report
    }

    async fn rewrite_file(&self, public_path: &str, report: &mut StylesheetReport) -> Result<()> {
        let file = self.cache.layout().disk_path(public_path);
        let css = tokio::fs::read_to_string(&file).await?;

        let rewritten = strip_pagination_rules(&self.rewrite_text(&css, report).await);
        if rewritten != css {
            tokio::fs::write(&file, rewritten).await?;
        }
        Ok(())
    }

    /// Substitutes archived paths for the `url(/...)` references of `css`
    ///
    /// References are resolved one after the other, in order of appearance.
    /// Unresolvable references are left untouched.
    pub async fn rewrite_text(&self, css: &str, report: &mut StylesheetReport) -> String {
        let references: Vec<(std::ops::Range<usize>, String)> = URL_REFERENCE
            .captures_iter(css)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let target = caps.get(1)?;
                Some((whole.range(), target.as_str().to_string()))
            })
            .collect();

        let mut resolved: HashMap<String, Option<String>> = HashMap::new();
        let mut output = String::with_capacity(css.len());
        let mut cursor = 0;

        for (range, target) in references {
            if !resolved.contains_key(&target) {
                let local = self.resolve(&target).await;
                match &local {
                    Some(_) => report.references_resolved += 1,
                    None => report.references_missing += 1,
                }
                resolved.insert(target.clone(), local);
            }

            output.push_str(&css[cursor..range.start]);
            match resolved.get(&target).and_then(|local| local.as_deref()) {
                Some(local) => output.push_str(&format!("url({})", local)),
                None => output.push_str(&css[range.clone()]),
            }
            cursor = range.end;
        }
        output.push_str(&css[cursor..]);

        output
    }

    async fn resolve(&self, reference: &str) -> Option<String> {
        // Already rewritten by an earlier run
        let public_base = format!("{}/", self.cache.layout().public_base());
        if reference.starts_with(&public_base) {
            return Some(reference.to_string());
        }

        let canonical = self.cache.canonical(reference);
        if let Some(local) = self.cache.get(&canonical) {
            return Some(local);
        }

        let local = self.cache.fetch_and_record(&canonical).await;
        if local.is_none() {
            tracing::debug!("Stylesheet reference {} left unresolved", reference);
        }
        local
    }
}

/// Removes `.pagination…{…}` and `.MuiPagination…{…}` rule blocks
pub fn strip_pagination_rules(css: &str) -> String {
    PAGINATION_RULES
        .iter()
        .fold(css.to_string(), |text, rule| rule.replace_all(&text, "").into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ArchiveLayout;
    use reqwest::Client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cache_for(server_uri: &str, root: &std::path::Path) -> Arc<ResourceCache> {
        Arc::new(ResourceCache::new(
            ArchiveLayout::new(root, "2023"),
            server_uri,
            Client::new(),
        ))
    }

    #[test]
    fn test_strip_pagination_rules() {
        let css = ".a{color:red}.pagination{display:flex}.pagination li{margin:0}.MuiPagination-ul{gap:2px}.b{color:blue}";
        assert_eq!(strip_pagination_rules(css), ".a{color:red}.b{color:blue}");
    }

    #[tokio::test]
    async fn test_mapped_reference_rewritten() {
        let temp = tempfile::tempdir().unwrap();
        let cache = cache_for("https://1v.example.org", temp.path());
        cache.record_if_absent("/img/bg.png", "png");
        let local = cache.get("/img/bg.png").unwrap();

        let rewriter = StylesheetRewriter::new(Arc::clone(&cache));
        let mut report = StylesheetReport::default();
        let css = rewriter
            .rewrite_text(r#"body{background:url("/img/bg.png")} a{background:url(https://cdn.example.com/x.png)}"#, &mut report)
            .await;

        assert_eq!(
            css,
            format!("body{{background:url({})}} a{{background:url(https://cdn.example.com/x.png)}}", local)
        );
        assert_eq!(report.references_resolved, 1);
    }

    #[tokio::test]
    async fn test_unmapped_reference_fetched_on_demand() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fonts/f.woff"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "font/woff")
                    .set_body_bytes(b"wOFF".to_vec()),
            )
            .mount(&server)
            .await;

        let temp = tempfile::tempdir().unwrap();
        let cache = cache_for(&server.uri(), temp.path());
        let rewriter = StylesheetRewriter::new(Arc::clone(&cache));
        let mut report = StylesheetReport::default();

        let css = rewriter
            .rewrite_text("@font-face{src:url(/fonts/f.woff)}", &mut report)
            .await;

        let local = cache.get("/fonts/f.woff").expect("fetched font is recorded");
        assert!(local.ends_with(".woff"));
        assert_eq!(css, format!("@font-face{{src:url({})}}", local));
        assert_eq!(
            std::fs::read(cache.layout().disk_path(&local)).unwrap(),
            b"wOFF"
        );
    }

    #[tokio::test]
    async fn test_archived_reference_not_fetched_again() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"wOFF".to_vec()))
            .expect(0)
            .mount(&server)
            .await;

        let temp = tempfile::tempdir().unwrap();
        let cache = cache_for(&server.uri(), temp.path());
        cache.record_if_absent("/fonts/f.woff", "woff");
        let local = cache.get("/fonts/f.woff").unwrap();

        let rewriter = StylesheetRewriter::new(Arc::clone(&cache));
        let mut report = StylesheetReport::default();
        let original = format!("@font-face{{src:url({})}}", local);
        let css = rewriter.rewrite_text(&original, &mut report).await;

        assert_eq!(css, original);
        assert_eq!(cache.len(), 1);
        assert_eq!(report.references_missing, 0);
    }

    #[tokio::test]
    async fn test_unreadable_stylesheet_does_not_stop_others() {
        let server = MockServer::start().await;
        let temp = tempfile::tempdir().unwrap();
        let cache = cache_for(&server.uri(), temp.path());

        let broken = cache.record_if_absent("/static/a.css", "css");
        std::fs::create_dir_all(cache.layout().disk_path(broken.public_path())).unwrap();

        let good = cache.record_if_absent("/static/b.css", "css");
        let good_file = cache.layout().disk_path(good.public_path());
        std::fs::write(&good_file, ".MuiPagination-ul{gap:2px}.y{color:blue}").unwrap();

        let report = StylesheetRewriter::new(Arc::clone(&cache)).rewrite_all().await;

        assert_eq!(report.rewritten, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(std::fs::read_to_string(&good_file).unwrap(), ".y{color:blue}");
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_text_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fonts/gone.woff"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let temp = tempfile::tempdir().unwrap();
        let cache = cache_for(&server.uri(), temp.path());
        let rewriter = StylesheetRewriter::new(Arc::clone(&cache));
        let mut report = StylesheetReport::default();

        let original = "@font-face{src:url('/fonts/gone.woff')}";
        let css = rewriter.rewrite_text(original, &mut report).await;

        assert_eq!(css, original);
        assert!(cache.is_empty());
        assert_eq!(report.references_missing, 1);
    }

    #[tokio::test]
    async fn test_rewrite_all_in_place() {
        let server = MockServer::start().await;
        let temp = tempfile::tempdir().unwrap();
        let cache = cache_for(&server.uri(), temp.path());

        let good = cache.record_if_absent("/static/app.css", "css");
        let good_file = cache.layout().disk_path(good.public_path());
        std::fs::create_dir_all(good_file.parent().unwrap()).unwrap();
        std::fs::write(&good_file, ".pagination{display:flex}.x{color:red}").unwrap();

        // Reserved but never written: logged and skipped
        cache.record_if_absent("/static/lost.css", "css");

        let report = StylesheetRewriter::new(Arc::clone(&cache)).rewrite_all().await;

        assert_eq!(report.rewritten, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(std::fs::read_to_string(&good_file).unwrap(), ".x{color:red}");
    }
}
