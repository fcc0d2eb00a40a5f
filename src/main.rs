use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use feedmill::config::Config;
use feedmill::ingest::{Scheduler, SchedulerConfig};
use feedmill::storage::Database;

#[derive(Parser, Debug)]
#[command(name = "feedmill", about = "Feed aggregation backend with a background ingestion scheduler")]
struct Args {
    /// Path to the TOML config file (optional, defaults apply when missing)
    #[arg(long, value_name = "FILE", default_value = "feedmill.toml")]
    config: PathBuf,

    /// Override the database path from the config file
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Run a single ingestion tick and exit (operational/backfill use)
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config).context("Failed to load configuration")?;

    let db_path = match &args.db {
        Some(path) => path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?
            .to_string(),
        None => config.database_path.clone(),
    };

    let db = Database::open(&db_path)
        .await
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("feedmill/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let scheduler = Scheduler::new(
        db,
        client,
        SchedulerConfig {
            concurrency: config.concurrency,
            interval: config.interval(),
            fetch_timeout: config.fetch_timeout(),
        },
    );

    if args.once {
        let outcomes = scheduler.run_tick().await;
        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        tracing::info!(batch = outcomes.len(), failed = failed, "Single tick finished");
        return Ok(());
    }

    let handle = scheduler.spawn();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown requested, draining in-flight batch");
    handle.shutdown().await;

    Ok(())
}
