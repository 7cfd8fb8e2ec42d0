use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use bidwatch::api::ApiClient;
use bidwatch::config::{AppConfig, CONFIG_PATH};
use bidwatch::poller::{self, Snapshot};
use bidwatch::reporter;
use bidwatch::tui;

#[derive(Parser)]
#[command(name = "bidwatch", about = "Freelance marketplace bid dashboard")]
struct Args {
    /// Path to the config file
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Write a starter config file and exit
    #[arg(long)]
    init: bool,

    /// Run a single poll cycle, print the snapshot as JSON, and exit
    #[arg(long)]
    once: bool,

    /// Override the configured poll interval (seconds)
    #[arg(long)]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();
    let args = Args::parse();

    if args.init {
        if args.config.exists() {
            anyhow::bail!("{} already exists", args.config.display());
        }
        AppConfig::default().save(&args.config)?;
        println!("Wrote starter config to {}", args.config.display());
        println!("Fill in [account] access_token and user_id before running.");
        return Ok(());
    }

    let mut config = AppConfig::load(&args.config)?;
    info!("Loaded config from {}", args.config.display());

    if let Some(interval) = args.interval {
        config.settings.poll_interval_secs = interval;
    }
    if config.settings.poll_interval_secs == 0 {
        anyhow::bail!("poll interval must be at least 1 second");
    }
    if config.account.user_id == 0 {
        anyhow::bail!("[account] user_id is not set in {}", args.config.display());
    }
    let access_token = config.access_token()?;
    let client = ApiClient::new(&access_token)?;

    if args.once {
        let rows = poller::poll_cycle(&client, &config).await?;
        let snapshot = Snapshot {
            rows,
            updated_at: poller::now_stamp(),
        };
        reporter::report_snapshot(&snapshot);
        return Ok(());
    }

    info!(
        "Starting dashboard — user={} skills={:?} poll={}s limit={}",
        config.account.user_id,
        config.filters.skills,
        config.settings.poll_interval_secs,
        config.filters.limit,
    );

    let (tx, rx) = watch::channel(Snapshot::default());
    let poller = tokio::spawn(poller::run(client.clone(), config.clone(), tx));

    let result = tui::run(client, config, rx).await;

    // The poller stops on its own once the watch receiver is dropped; don't
    // leave it sleeping out its interval first.
    poller.abort();
    result
}
