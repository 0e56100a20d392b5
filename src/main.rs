mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
#[cfg(not(feature = "browser"))]
use tracing::warn;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use golf_buddy::config::Config;

use crate::cli::Cli;

const DEFAULT_LOG_FILTER: &str = "golf_buddy=info";

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = Config::from_env().context("invalid configuration")?;

    let shutdown_token = CancellationToken::new();
    {
        let shutdown_token = shutdown_token.clone();
        tokio::spawn(async move {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                return;
            }
            info!("Received interrupt, cancelling");
            shutdown_token.cancel();
        });
    }

    #[cfg(feature = "browser")]
    let fetcher = golf_buddy::fetcher::BrowserFetcher::launch(config.headless())
        .await
        .context("failed to launch browser (build with --no-default-features to fetch over plain HTTP)")?;
    #[cfg(not(feature = "browser"))]
    let fetcher = {
        warn!("built without the browser feature; pages are fetched without running scripts");
        golf_buddy::fetcher::HttpFetcher::new().context("failed to build HTTP client")?
    };

    let result = commands::run(cli.command, &config, &fetcher, &shutdown_token).await;

    #[cfg(feature = "browser")]
    fetcher.shutdown().await;

    result
}
