//! Crawler module for browser-driven archiving
//!
//! This module contains the core archiving logic, including:
//! - Village enumeration and selection
//! - In-page preparation and rate-limit detection
//! - Depth-first traversal of each village × phase
//! - Overall run coordination

mod coordinator;
mod fetcher;
mod pacing;
mod parser;
mod prepare;
mod village;
mod walker;

pub use coordinator::Coordinator;
pub use fetcher::build_http_client;
pub use pacing::Pacing;
pub use parser::{is_rate_limited, parse_html, ParsedPage, RATE_LIMIT_MESSAGE};
pub use prepare::{auto_scroll, phase_button_selector, prepare_page};
pub use village::{count_units, select_unit};
pub use walker::FrontierWalker;

use crate::browser::{
    acquire_session, launch_browser, spawn_resource_capture, ChromiumPage, Navigator, RetryPolicy,
};
use crate::cache::ResourceCache;
use crate::config::Config;
use crate::output::{ArchiveLayout, ArchiveStats};
use crate::{ArchiveError, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options of one archive run that do not come from the configuration file
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Remove the previous archive output and resource map first
    pub fresh: bool,
}

/// Runs a complete archive operation
///
/// This is the main entry point for starting an archive. It will:
/// 1. Prepare the output directories
/// 2. Load the resource map of a previous run
/// 3. Launch the browser and start capturing responses
/// 4. Acquire an authenticated session
/// 5. Archive every village × phase, then stylesheets and the index
/// 6. Save the resource map, whatever the outcome (Ctrl-C included)
///
/// # Arguments
///
/// * `config` - The archiver configuration
/// * `options` - Run options from the command line
///
/// # Returns
///
/// * `Ok(ArchiveStats)` - Archive completed
/// * `Err(ArchiveError)` - Archive failed or was interrupted
pub async fn run_archive(config: Config, options: RunOptions) -> Result<ArchiveStats> {
    let layout = ArchiveLayout::from_config(&config);
    let map_path = PathBuf::from(&config.archive.resource_map_path);

    if options.fresh {
        remove_previous_output(&layout, &map_path).await?;
    }
    layout.ensure_dirs().await?;

    let client = build_http_client(&config.retry)?;
    let cache = Arc::new(ResourceCache::load(&map_path, layout, &config.site.base_url, client).await);

    save_regardless(
        archive_in_browser(&config, Arc::clone(&cache)),
        &cache,
        &map_path,
    )
    .await
}

/// Drives `run` until it ends or Ctrl-C, then saves the resource map
///
/// The map is saved whatever the outcome; an interrupted run returns
/// `ArchiveError::Interrupted`.
async fn save_regardless<F>(run: F, cache: &ResourceCache, map_path: &Path) -> Result<ArchiveStats>
where
    F: Future<Output = Result<ArchiveStats>>,
{
    let outcome = tokio::select! {
        result = run => result,
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, saving the resource map before exiting");
            Err(ArchiveError::Interrupted)
        }
    };

    if let Err(e) = cache.save(map_path).await {
        tracing::error!("Failed to save resource map {}: {}", map_path.display(), e);
    }

    outcome
}

async fn archive_in_browser(config: &Config, cache: Arc<ResourceCache>) -> Result<ArchiveStats> {
    let (mut browser, handler) = launch_browser(&config.browser).await?;

    let outcome = async {
        let page = ChromiumPage::open(&browser).await?;
        let capture = spawn_resource_capture(&page, Arc::clone(&cache)).await?;

        let session = Navigator::new(&page, RetryPolicy::from_config(&config.retry));
        let result = match acquire_session(&session, config).await {
            Ok(()) => Coordinator::new(&page, config, cache).run().await,
            Err(e) => Err(e),
        };

        capture.abort();
        result
    }
    .await;

    if let Err(e) = browser.close().await {
        tracing::debug!("Failed to close browser: {}", e);
    }
    handler.abort();

    outcome
}

/// Deletes the archive directory of the configured year and the resource map
async fn remove_previous_output(layout: &ArchiveLayout, map_path: &Path) -> Result<()> {
    for (path, is_dir) in [(layout.archive_dir(), true), (map_path.to_path_buf(), false)] {
        let removed = if is_dir {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };

        match removed {
            Ok(()) => tracing::info!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
