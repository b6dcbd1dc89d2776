//! work24 crawler CLI
//!
//! Local execution entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use crawler::{
    error::Result,
    models::{Config, MergePolicy, ReportScope},
    pipeline,
    storage::{LocalStorage, StateStorage},
    utils::http::HttpFetcher,
};

/// work24 - incremental bulletin board crawler
#[derive(Parser, Debug)]
#[command(name = "work24-crawler", version, about = "Incremental work24 board crawler")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl boards, record new posts, and write the report
    Crawl {
        /// Only crawl these boards (repeatable)
        #[arg(short, long = "board")]
        boards: Vec<String>,

        /// State file (default: paths.state_file)
        #[arg(long)]
        state: Option<PathBuf>,

        /// Report file (default: paths.report_file)
        #[arg(long)]
        report: Option<PathBuf>,

        /// skip-known or refresh-attachments
        #[arg(long)]
        policy: Option<MergePolicy>,

        /// Report only new posts or everything recorded: new or all
        #[arg(long)]
        scope: Option<ReportScope>,
    },

    /// Render the report from saved state without crawling
    Report {
        #[arg(short, long = "board")]
        boards: Vec<String>,

        #[arg(long)]
        state: Option<PathBuf>,

        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Validate the configuration file
    Validate,

    /// Show what the state file holds
    Info {
        #[arg(long)]
        state: Option<PathBuf>,
    },
}

/// Initialize logging based on verbosity flags.
fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn local_storage(config: &Config, state: Option<PathBuf>, report: Option<PathBuf>) -> LocalStorage {
    LocalStorage::new(
        state.unwrap_or_else(|| PathBuf::from(&config.paths.state_file)),
        report.unwrap_or_else(|| PathBuf::from(&config.paths.report_file)),
    )
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let mut config = Config::load_or_default(&cli.config);
    log::info!("Configuration: {}", cli.config.display());

    match cli.command {
        Command::Crawl {
            boards,
            state,
            report,
            policy,
            scope,
        } => {
            if let Some(policy) = policy {
                config.merge.policy = policy;
            }
            if let Some(scope) = scope {
                config.report.scope = scope;
            }
            config.validate()?;

            let selected = config.select_boards(&boards)?;
            let storage = local_storage(&config, state, report);
            let fetcher = Arc::new(HttpFetcher::new(&config.crawler)?);

            let summary = pipeline::run_crawler(
                Arc::new(config),
                &storage,
                fetcher,
                pipeline::system_clock(),
                &selected,
            )
            .await?;

            log::info!(
                "Crawl complete: {} new post(s) across {} board(s)",
                summary.new_posts,
                summary.boards
            );
        }

        Command::Report {
            boards,
            state,
            report,
        } => {
            config.validate()?;
            let selected = config.select_boards(&boards)?;
            let storage = local_storage(&config, state, report);
            pipeline::run_report(&config, &storage, pipeline::system_clock(), &selected).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
            log::info!(
                "  user agent: {}, timeouts: {}s list / {}s detail, delay: {}ms",
                config.crawler.user_agent,
                config.crawler.list_timeout_secs,
                config.crawler.detail_timeout_secs,
                config.crawler.request_delay_ms
            );
            log::info!(
                "  policy: {}, save per board: {}",
                config.merge.policy,
                config.merge.save_per_board
            );
            for board in &config.boards {
                log::info!(
                    "  board '{}' → {}{}",
                    board.name,
                    config.site.base_url,
                    board.list_path
                );
            }
        }

        Command::Info { state } => {
            let storage = local_storage(&config, state, None);
            let state = storage.load_state().await?;

            log::info!("State file: {}", storage.state_location());
            if state.is_empty() {
                log::info!("No posts recorded yet.");
            }
            for (board, posts) in state.boards() {
                log::info!("  {}: {} post(s)", board, posts.len());
            }
            if let Some(latest) = state.latest_detection() {
                log::info!("Last new post detected: {}", latest);
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
