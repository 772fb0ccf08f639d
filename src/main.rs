//! Village-Archiver main entry point
//!
//! This is the command-line interface for the Village-Archiver static mirror builder.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use village_archiver::config::{load_config_with_hash, Config};
use village_archiver::crawler::{run_archive, RunOptions};
use village_archiver::output::{print_statistics, ArchiveLayout};

/// Village-Archiver: a static mirror builder for 1Village
///
/// Village-Archiver drives a browser through every page of every village and
/// phase, captures the resources the pages load, and writes a file tree that
/// can be served without the application.
#[derive(Parser, Debug)]
#[command(name = "village-archiver")]
#[command(version = "1.0.0")]
#[command(about = "A static mirror builder for 1Village", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Remove the previous archive and resource map before archiving
    #[arg(long)]
    fresh: bool,

    /// Validate config and show where the archive would be written without archiving
    #[arg(long)]
    dry_run: bool,

    /// Show the browser window, overriding the configuration
    #[arg(long)]
    headful: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.headful {
        config.browser.headless = false;
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_archive(config, cli.fresh).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("village_archiver=info,warn"),
            1 => EnvFilter::new("village_archiver=debug,info"),
            2 => EnvFilter::new("village_archiver=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the archive layout
fn handle_dry_run(config: &Config) {
    let layout = ArchiveLayout::from_config(config);

    println!("=== Village-Archiver Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Year: {}", config.site.year);
    println!("  Detail pages: {}*", config.site.detail_prefix);

    println!("\nArchive:");
    println!("  Pages: {}", layout.archive_dir().display());
    println!("  Resources: {}", layout.resources_dir().display());
    println!("  Public base: {}", layout.public_base());
    println!("  Resource map: {}", config.archive.resource_map_path);
    println!(
        "  Index template: {}",
        config.archive.index_template.as_deref().unwrap_or("(built-in)")
    );

    println!("\nBrowser:");
    println!("  Headless: {}", config.browser.headless);
    println!(
        "  Window: {}x{}",
        config.browser.window_width, config.browser.window_height
    );
    if let Some(executable) = &config.browser.executable {
        println!("  Executable: {}", executable);
    }

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!("  Delay: {}ms", config.retry.delay_ms);
    println!("  Navigation timeout: {}ms", config.retry.navigation_timeout_ms);

    println!("\nTiming:");
    println!("  Page delay: {}ms", config.timing.page_delay_ms);
    println!("  Phase cool-down: {}ms", config.timing.phase_cooldown_ms);
    println!("  Rate limit backoff: {}ms", config.timing.rate_limit_backoff_ms);

    let session = if config.auth.access_token.is_some() {
        "access token"
    } else {
        "login form"
    };

    println!("\n✓ Configuration is valid");
    println!("✓ Would open the session with: {}", session);
}

/// Handles the main archive operation
async fn handle_archive(config: Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh archive (removing previous output)");
    } else {
        tracing::info!("Starting archive (reusing the previous resource map)");
    }

    tracing::info!(
        "Archiving {} for year {}",
        config.site.base_url,
        config.site.year
    );

    match run_archive(config, RunOptions { fresh }).await {
        Ok(stats) => {
            tracing::info!("Archive completed successfully");
            println!();
            print_statistics(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Archive failed: {}", e);
            Err(e.into())
        }
    }
}
