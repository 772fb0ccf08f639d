//! Depth-first traversal of one crawl unit
//!
//! The walk starts at the unit's entry page, which is switched to the unit's
//! phase, and follows content detail links until nothing is pending. Every
//! path is rendered at most once, except for a single re-visit after a
//! rate-limited render.

use crate::browser::{BrowserError, BrowserPage, Navigator};
use crate::crawler::parser::{is_rate_limited, parse_html};
use crate::crawler::prepare::{auto_scroll, phase_button_selector, prepare_page};
use crate::crawler::Pacing;
use crate::output::PageCounts;
use crate::rewrite::MarkupRewriter;
use crate::state::{CrawlUnit, Frontier};
use crate::url::archive_url;
use crate::{ArchiveError, Result};

/// Walks the pages of one unit through a single browser page
pub struct FrontierWalker<'a, P: BrowserPage + ?Sized> {
    navigator: &'a Navigator<'a, P>,
    rewriter: &'a MarkupRewriter,
    pacing: Pacing,
    base_url: &'a str,
}

impl<'a, P: BrowserPage + ?Sized> FrontierWalker<'a, P> {
    pub fn new(
        navigator: &'a Navigator<'a, P>,
        rewriter: &'a MarkupRewriter,
        pacing: Pacing,
        base_url: &'a str,
    ) -> Self {
        Self {
            navigator,
            rewriter,
            pacing,
            base_url,
        }
    }

    /// Archives every page of `unit` reachable from its entry page
    ///
    /// # Returns
    ///
    /// * `Ok(PageCounts)` - Traversal finished; lost pages are counted, not fatal
    /// * `Err(ArchiveError::UnitEntry)` - The entry page could not be loaded or
    ///   switched to the unit's phase
    pub async fn walk(&self, unit: &CrawlUnit) -> Result<PageCounts> {
        let slug = unit.slug();
        let mut frontier = Frontier::new();
        let mut counts = PageCounts::default();

        while let Some(path) = frontier.pop() {
            frontier.mark_visited(&path);
            tracing::info!("Archiving {}, page: \"/{}\"", unit, path);

            Pacing::pause(self.pacing.page_delay).await;

            if let Err(e) = self.open(unit, &path).await {
                if path.is_empty() {
                    return Err(e);
                }
                tracing::warn!("Lost page \"/{}\" of {}: {}", path, unit, e);
                counts.lost += 1;
                continue;
            }

            let page = self.navigator.page();
            auto_scroll(page, &self.pacing).await;
            prepare_page(page, unit).await;

            let html = match page.document_html().await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!("Failed to read \"/{}\" of {}: {}", path, unit, e);
                    counts.lost += 1;
                    continue;
                }
            };

            let parsed = parse_html(&html);
            if is_rate_limited(&parsed, page.last_document_status()) {
                counts.rate_limited += 1;
                if frontier.requeue(&path) {
                    tracing::info!(
                        "Too many requests for \"/{}\". Retrying after {:?}",
                        path,
                        self.pacing.rate_limit_backoff
                    );
                    Pacing::pause(self.pacing.rate_limit_backoff).await;
                } else {
                    tracing::warn!("Still rate limited on \"/{}\", page lost", path);
                    counts.lost += 1;
                }
                continue;
            }

            match self
                .rewriter
                .archive_page(&slug, &path, &html, frontier.visited())
                .await
            {
                Some(archived) => {
                    if archived.written {
                        counts.archived += 1;
                    } else {
                        counts.lost += 1;
                    }
                    let queued = frontier.push_discovered(&archived.next_paths);
                    tracing::debug!(
                        "\"/{}\" ({}) queued {} new pages, {} pending",
                        path,
                        parsed.title.as_deref().unwrap_or("untitled"),
                        queued,
                        frontier.pending()
                    );
                }
                None => counts.lost += 1,
            }
        }

        tracing::info!(
            "{} archived: {} pages, {} lost",
            unit,
            counts.archived,
            counts.lost
        );
        Ok(counts)
    }

    /// Navigates to `path`; the entry page is also switched to the unit's phase
    async fn open(&self, unit: &CrawlUnit, path: &str) -> Result<()> {
        let url = archive_url(self.base_url, path)?;
        let entry_error = |source: BrowserError| ArchiveError::UnitEntry {
            unit: unit.to_string(),
            source,
        };

        if !path.is_empty() {
            return Ok(self.navigator.goto(url.as_str()).await?);
        }

        self.navigator.goto(url.as_str()).await.map_err(entry_error)?;

        Pacing::pause(self.pacing.phase_select_delay).await;
        if let Err(e) = self.navigator.reload().await {
            tracing::debug!("Reload of entry page failed: {}", e);
        }
        self.navigator
            .click(&phase_button_selector(unit.phase()))
            .await
            .map_err(entry_error)?;
        Pacing::pause(self.pacing.phase_settle_delay).await;

        Ok(())
    }
}
