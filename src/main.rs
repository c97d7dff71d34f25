use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod config;
mod ctftime;
mod error;
mod notify;
mod rank;
mod store;
mod watcher;

use config::Config;
use ctftime::{CtftimeClient, CtftimeRankSource};
use notify::WebhookNotifier;
use store::SnapshotStore;
use watcher::RunOptions;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    info!(
        "Checking national rank for CTFtime team {} (state file: {})",
        config.team,
        config.state_path.display()
    );

    let timeout = Duration::from_secs(config.http_timeout_secs);
    let client = CtftimeClient::new(&config.api_url, timeout)?;
    let source = CtftimeRankSource::new(client, config.team, config.country.clone());
    let store = SnapshotStore::new(&config.state_path);
    let notifier = WebhookNotifier::new(config.validated_webhook_url()?, timeout)?;

    let options = RunOptions {
        notify_first_observation: config.notify_first_observation,
        include_points: config.include_points,
    };

    let change = watcher::run_once(config.team, &source, &store, &notifier, options).await?;
    info!("Run complete: {:?}", change);
    Ok(())
}
