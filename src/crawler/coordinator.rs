//! Archive coordinator - main orchestration logic
//!
//! This module drives a whole archive run over one authenticated page:
//! - Enumerating and selecting villages
//! - Walking each village × phase unit with the frontier walker
//! - Rewriting the captured stylesheets once every unit is done
//! - Writing the top-level index

use crate::browser::{BrowserPage, Navigator, RetryPolicy};
use crate::cache::ResourceCache;
use crate::config::Config;
use crate::crawler::village::{count_units, select_unit};
use crate::crawler::walker::FrontierWalker;
use crate::crawler::Pacing;
use crate::output::{write_index, ArchiveStats};
use crate::rewrite::{MarkupRewriter, StylesheetRewriter};
use crate::state::{CrawlUnit, PHASES};
use crate::Result;
use std::path::Path;
use std::sync::Arc;

/// Main archive coordinator structure
pub struct Coordinator<'a, P: BrowserPage + ?Sized> {
    config: &'a Config,
    navigator: Navigator<'a, P>,
    cache: Arc<ResourceCache>,
    rewriter: MarkupRewriter,
    pacing: Pacing,
    stats: ArchiveStats,
}

impl<'a, P: BrowserPage + ?Sized> Coordinator<'a, P> {
    /// Creates a coordinator for an already authenticated page
    ///
    /// # Arguments
    ///
    /// * `page` - The page every navigation goes through
    /// * `config` - The archiver configuration
    /// * `cache` - Resource cache shared with the response listener
    pub fn new(page: &'a P, config: &'a Config, cache: Arc<ResourceCache>) -> Self {
        let rewriter = MarkupRewriter::new(
            Arc::clone(&cache),
            cache.layout().clone(),
            &config.site.detail_prefix,
        );

        Self {
            config,
            navigator: Navigator::new(page, RetryPolicy::from_config(&config.retry)),
            cache,
            rewriter,
            pacing: Pacing::from_config(&config.timing),
            stats: ArchiveStats::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.navigator = Navigator::new(self.navigator.page(), policy);
        self
    }

    /// Runs the archive
    ///
    /// This is the core logic that:
    /// 1. Counts the villages offered to the session
    /// 2. Selects each village in turn (unselectable villages are skipped)
    /// 3. Walks every phase of the village, after a cool-down
    /// 4. Rewrites every captured stylesheet
    /// 5. Writes the index of archived villages
    ///
    /// A unit whose entry page fails is logged and counted; the run goes on.
    pub async fn run(&mut self) -> Result<ArchiveStats> {
        let config = self.config;
        let base_url = config.site.base_url.as_str();
        let start_time = std::time::Instant::now();

        let count = count_units(&self.navigator, base_url).await;
        if count == 0 {
            tracing::warn!("No villages available to this session, nothing to archive");
            self.stats.record_cache(&self.cache);
            return Ok(self.stats.clone());
        }

        for index in 1..=count {
            let Some(village) = select_unit(&self.navigator, base_url, index).await else {
                self.stats.villages_skipped += 1;
                continue;
            };
            self.stats.villages.push(village.clone());

            for &phase in PHASES.iter() {
                let unit = CrawlUnit::new(village.clone(), phase);

                tracing::info!("Waiting {:?} before {}", self.pacing.phase_cooldown, unit);
                Pacing::pause(self.pacing.phase_cooldown).await;

                let walker = FrontierWalker::new(&self.navigator, &self.rewriter, self.pacing, base_url);
                match walker.walk(&unit).await {
                    Ok(counts) => {
                        self.stats.pages.add(&counts);
                        self.stats.units_completed += 1;
                    }
                    Err(e) => {
                        tracing::error!("Aborted {}: {}", unit, e);
                        self.stats.units_failed += 1;
                    }
                }
            }

            tracing::info!(
                "Progress: {} / {} villages, {} pages archived, {} resources mapped",
                index,
                count,
                self.stats.pages.archived,
                self.cache.len()
            );
        }

        tracing::info!("Rewriting captured stylesheets");
        self.stats.stylesheets = StylesheetRewriter::new(Arc::clone(&self.cache))
            .rewrite_all()
            .await;

        let template = config.archive.index_template.as_deref().map(Path::new);
        if let Err(e) = write_index(
            self.rewriter.layout(),
            template,
            &config.site.year,
            &self.stats.villages,
        )
        .await
        {
            tracing::warn!("Failed to write the index page: {}", e);
        }

        self.stats.record_cache(&self.cache);

        tracing::info!(
            "Archive completed: {} villages, {} pages in {:?}",
            self.stats.villages.len(),
            self.stats.pages.archived,
            start_time.elapsed()
        );

        Ok(self.stats.clone())
    }

    pub fn stats(&self) -> &ArchiveStats {
        &self.stats
    }
}
