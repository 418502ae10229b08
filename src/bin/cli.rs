//! skogen CLI
//!
//! Local execution entry point.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use skogen::{
    error::Result,
    models::{Config, Seed},
    pipeline,
    services::FeedFetcher,
    storage::LocalStorage,
    utils::{http::HttpTransport, report},
};
use tokio_util::sync::CancellationToken;

/// skogen - air alert channel follower
#[derive(Parser, Debug)]
#[command(
    name = "skogen",
    version,
    about = "Keeps regional air alert state in sync with a public channel"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the backlog, then poll the channel until Ctrl+C
    Run,

    /// Fetch the backlog once, apply it and exit
    Once,

    /// Validate configuration and seed data
    Validate,

    /// Print the stored alert states as JSON
    Status,

    /// Print the region hierarchy as a tree
    Regions,
}

/// Initialize logging from the configured level or the verbosity flag.
fn init_logging(level: &str, verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        report::parse_level(level)
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str()))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The logger level comes from the config; a broken file is reported once logging runs.
    let loaded = Config::load(&cli.config);
    let level = loaded
        .as_ref()
        .map(|config| config.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(&level, cli.verbose);

    let config = match (loaded, &cli.command) {
        (Ok(config), _) => {
            log::info!("Loaded configuration from {}", cli.config.display());
            config
        }
        // Polling commands never fall back to defaults.
        (Err(_), Command::Run | Command::Once) => Config::load_required(&cli.config)?,
        (Err(_), _) => Config::load_or_default(&cli.config),
    };

    let base = Path::new(".");
    let storage = LocalStorage::new(config.storage.states_path(base));

    match cli.command {
        Command::Run => {
            config.validate()?;
            let shutdown = CancellationToken::new();
            pipeline::cancel_on_ctrl_c(shutdown.clone());

            let mut synchronizer = pipeline::open_synchronizer(&config, base).await?;
            let transport = HttpTransport::from_config(&config.feed)?;
            let mut fetcher =
                FeedFetcher::new(transport, config.feed.clone()).with_shutdown(shutdown.clone());

            pipeline::run_poller(&config, &mut fetcher, &mut synchronizer, &shutdown).await?;
        }

        Command::Once => {
            config.validate()?;
            let shutdown = CancellationToken::new();
            pipeline::cancel_on_ctrl_c(shutdown.clone());

            let mut synchronizer = pipeline::open_synchronizer(&config, base).await?;
            let transport = HttpTransport::from_config(&config.feed)?;
            let mut fetcher =
                FeedFetcher::new(transport, config.feed.clone()).with_shutdown(shutdown.clone());

            let stats = pipeline::run_cycle(&mut fetcher, &mut synchronizer, &shutdown).await?;
            if let Some(error) = fetcher.last_error() {
                log::error!("Last fetch failed: {}", error);
            }
            report::summary(
                "Single cycle",
                &[
                    ("Fetched", stats.fetched.to_string()),
                    ("Applied", stats.applied.to_string()),
                    ("Changed", stats.changed.to_string()),
                    ("Last message ID", stats.last_message_id.to_string()),
                    (
                        "Alerting regions",
                        synchronizer.hierarchy().alerting_count().to_string(),
                    ),
                ],
            );
        }

        Command::Validate => {
            pipeline::run_validate(&config, base)?;
            log::info!("All validations passed!");
        }

        Command::Status => {
            let json = pipeline::run_status(&storage).await?;
            println!("{}", json);
        }

        Command::Regions => {
            let seed = Seed::load_or_bundled(config.storage.seed_path(base).as_deref())?;
            let hierarchy = pipeline::load_hierarchy(&storage, seed).await?;
            print!("{}", pipeline::render_tree(&hierarchy));
        }
    }

    Ok(())
}
