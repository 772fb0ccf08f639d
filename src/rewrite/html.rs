//! Markup rewriting of rendered pages
//!
//! Two streaming passes over the serialized document. The first drops
//! scripts and pagination widgets, so nothing inside them is rewritten or
//! followed. The second:
//! - forces activity cards visible
//! - images and stylesheets are pointed at their archived copies
//! - root-relative links are moved under the archive base, and links to
//!   content detail pages are collected as traversal candidates

use crate::cache::ResourceCache;
use crate::output::ArchiveLayout;
use crate::state::VisitedSet;
use crate::{ArchiveError, Result};
use lol_html::{element, HtmlRewriter, Settings};
use std::cell::{Cell, RefCell};
use std::sync::Arc;

/// Inline style appended to activity cards hidden behind client-side toggles
const FORCE_VISIBLE: &str = "display: block; margin-bottom: 1rem";

/// A rewritten page and the same-unit paths it links to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenPage {
    pub html: String,

    /// Unit-relative paths (`activite/42`), in document order, not yet visited
    pub next_paths: Vec<String>,
}

/// Outcome of archiving one rendered page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedPage {
    /// Whether the page file is on disk
    pub written: bool,

    /// Traversal candidates, followed even when the write failed
    pub next_paths: Vec<String>,
}

/// Rewrites rendered pages against the resource cache
#[derive(Debug, Clone)]
pub struct MarkupRewriter {
    cache: Arc<ResourceCache>,
    layout: ArchiveLayout,
    detail_prefix: String,
}

impl MarkupRewriter {
    /// Creates a rewriter
    ///
    /// # Arguments
    ///
    /// * `cache` - Resource cache consulted for `img` and stylesheet links
    /// * `layout` - Archive layout providing the public base and page files
    /// * `detail_prefix` - Root-relative prefix of content detail pages (`/activite/`)
    pub fn new(cache: Arc<ResourceCache>, layout: ArchiveLayout, detail_prefix: &str) -> Self {
        Self {
            cache,
            layout,
            detail_prefix: detail_prefix.to_string(),
        }
    }

    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    /// Rewrites `html` for the unit whose entry page is `unit_slug`
    ///
    /// # Arguments
    ///
    /// * `unit_slug` - Slug of the unit being archived, target of `/` links
    /// * `html` - Serialized document as read from the browser
    /// * `visited` - The unit's visit state; visited paths are not returned
    ///
    /// # Returns
    ///
    /// * `Ok(RewrittenPage)` - Rewritten markup plus the traversal candidates
    /// * `Err(ArchiveError::Rewrite)` - The markup could not be streamed
    pub fn rewrite(&self, unit_slug: &str, html: &str, visited: &VisitedSet) -> Result<RewrittenPage> {
        let html = strip_removed_elements(html)?;
        let public_base = self.layout.public_base();
        let candidates: RefCell<Vec<String>> = RefCell::new(Vec::new());
        let home_button_done = Cell::new(false);
        let mut output = Vec::with_capacity(html.len());

        let mut rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: vec![
                    element!(
                        r#".activity, [class*="activity-"], [id*="activity-"]"#,
                        |el| {
                            let style = append_style(el.get_attribute("style").as_deref());
                            el.set_attribute("style", &style)?;
                            Ok(())
                        }
                    ),
                    element!("img[src]", |el| {
                        if let Some(src) = el.get_attribute("src") {
                            if let Some(local) = self.cache.lookup(&src) {
                                el.set_attribute("src", &local)?;
                                el.remove_attribute("srcset");
                            } else {
                                tracing::trace!("No archived copy of image {}", src);
                            }
                        }
                        Ok(())
                    }),
                    element!("link[rel=stylesheet][href], link[as=style][href]", |el| {
                        if let Some(href) = el.get_attribute("href") {
                            if let Some(local) = self.cache.lookup(&href) {
                                el.set_attribute("href", &local)?;
                            } else {
                                tracing::debug!("No archived copy of stylesheet {}", href);
                            }
                        }
                        Ok(())
                    }),
                    element!("a[href]", |el| {
                        let Some(href) = el.get_attribute("href") else {
                            return Ok(());
                        };

                        if href == "/" {
                            el.set_attribute("href", &format!("{}/{}", public_base, unit_slug))?;
                            return Ok(());
                        }

                        if let Some(path) = self.detail_path(&href) {
                            candidates.borrow_mut().push(path);
                        }

                        if is_root_relative(&href) {
                            el.set_attribute("href", &format!("{}{}", public_base, href))?;
                        }
                        Ok(())
                    }),
                    element!("header button", |el| {
                        if home_button_done.replace(true) {
                            return Ok(());
                        }
                        el.set_tag_name("a")?;
                        el.set_attribute("href", &format!("{}/", public_base))?;
                        el.set_attribute("rel", "noreferrer")?;
                        Ok(())
                    }),
                ],
                ..Settings::default()
            },
            |c: &[u8]| output.extend_from_slice(c),
        );

        rewriter
            .write(html.as_bytes())
            .map_err(|e| ArchiveError::Rewrite(e.to_string()))?;
        rewriter
            .end()
            .map_err(|e| ArchiveError::Rewrite(e.to_string()))?;

        let html = String::from_utf8(output)
            .map_err(|e| ArchiveError::Rewrite(format!("Invalid UTF-8 in rewritten page: {}", e)))?;

        let mut next_paths = Vec::new();
        for path in candidates.into_inner() {
            if !visited.is_visited(&path) && !next_paths.contains(&path) {
                next_paths.push(path);
            }
        }

        Ok(RewrittenPage { html, next_paths })
    }

    /// Rewrites a page, writes it, and returns its traversal candidates
    ///
    /// `path` is the unit-relative path of the page; the entry page (`""`) is
    /// written as `{unit_slug}.html`. A rewrite failure is logged and yields
    /// `None`. A write failure is logged and reported as unwritten, with the
    /// links already found.
    pub async fn archive_page(
        &self,
        unit_slug: &str,
        path: &str,
        html: &str,
        visited: &VisitedSet,
    ) -> Option<ArchivedPage> {
        let page = match self.rewrite(unit_slug, html, visited) {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Failed to rewrite {}: {}", display_path(path), e);
                return None;
            }
        };

        let stem = if path.is_empty() { unit_slug } else { path };
        let file = self.layout.page_file(stem);

        let written = async {
            if let Some(parent) = file.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&file, page.html.as_bytes()).await
        };

        let written = match written.await {
            Ok(()) => {
                tracing::info!("Archived {} -> {}", display_path(path), file.display());
                true
            }
            Err(e) => {
                tracing::warn!("Failed to write {}: {}", file.display(), e);
                false
            }
        };

        Some(ArchivedPage {
            written,
            next_paths: page.next_paths,
        })
    }

    /// Unit-relative path of a content detail link, if `href` is one
    fn detail_path(&self, href: &str) -> Option<String> {
        if !href.starts_with(&self.detail_prefix) {
            return None;
        }
        let path = href
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_start_matches('/')
            .trim_end_matches('/');

        // `/activite/?page=2` is the listing, not a detail page
        let listing = self.detail_prefix.trim_matches('/');
        (!path.is_empty() && path != listing).then(|| path.to_string())
    }
}

/// Removes scripts and pagination widgets with everything they contain
fn strip_removed_elements(html: &str) -> Result<String> {
    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("script, link[as=script]", |el| {
                    el.remove();
                    Ok(())
                }),
                element!(".pagination, .MuiPagination-root, [data-pagination]", |el| {
                    el.remove();
                    Ok(())
                }),
            ],
            ..Settings::default()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    rewriter
        .write(html.as_bytes())
        .map_err(|e| ArchiveError::Rewrite(e.to_string()))?;
    rewriter
        .end()
        .map_err(|e| ArchiveError::Rewrite(e.to_string()))?;

    String::from_utf8(output)
        .map_err(|e| ArchiveError::Rewrite(format!("Invalid UTF-8 in stripped page: {}", e)))
}

/// Root-relative and not protocol-relative
fn is_root_relative(href: &str) -> bool {
    href.starts_with('/') && !href.starts_with("//")
}

fn append_style(existing: Option<&str>) -> String {
    match existing.map(str::trim).filter(|s| !s.is_empty()) {
        None => FORCE_VISIBLE.to_string(),
        Some(style) if style.ends_with(';') => format!("{} {}", style, FORCE_VISIBLE),
        Some(style) => format!("{}; {}", style, FORCE_VISIBLE),
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "entry page"
    } else {
        path
    }
}
