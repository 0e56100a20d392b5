//! Subcommand implementations. Results go to stdout, diagnostics to stderr.

use anyhow::{Context, Result, bail};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use url::Url;

use golf_buddy::config::Config;
use golf_buddy::fetcher::Fetch;
use golf_buddy::inference::OpenAiClient;
use golf_buddy::reducer::Reducer;
use golf_buddy::session::{Outcome, Session, SessionError, StopReason};

use crate::cli::Command;

pub async fn run(
    command: Command,
    config: &Config,
    fetcher: &dyn Fetch,
    token: &CancellationToken,
) -> Result<()> {
    let follow_links = command.follow_links();
    match command {
        Command::AnalyzeTeeTimes { max_hops, urls, .. } => {
            let config = match max_hops {
                Some(hops) => config.clone().with_max_hops(hops),
                None => config.clone(),
            };
            analyze_tee_times(&urls, follow_links, &config, fetcher, token).await
        }
        Command::ConvertToMarkdown { url, output } => {
            convert_to_markdown(&url, output.as_deref(), config, fetcher, token).await
        }
    }
}

async fn analyze_tee_times(
    urls: &[String],
    follow_links: bool,
    config: &Config,
    fetcher: &dyn Fetch,
    token: &CancellationToken,
) -> Result<()> {
    let inferer = OpenAiClient::from_config(config).context("cannot reach the language model")?;
    let session = Session::from_config(fetcher, &inferer, config);

    let mut failures = 0;
    for raw in urls {
        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(e) => {
                eprintln!("Error processing URL {}: {}", raw, e);
                failures += 1;
                continue;
            }
        };

        match session
            .extract_with_cancel(&url, follow_links, config.max_hops(), token)
            .await
        {
            Ok(outcome) => print_outcome(&url, &outcome),
            Err(SessionError::Cancelled) => bail!("cancelled"),
            Err(e) => {
                error!(url = %url, error = %e, "session failed");
                eprintln!("Error processing URL {}: {}", url, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} URLs failed", failures, urls.len());
    }
    Ok(())
}

fn print_outcome(url: &Url, outcome: &Outcome) {
    println!("== {} ==", url);
    println!("{}", outcome.result);

    if outcome.chain.hops() > 0 {
        let path: Vec<&str> = outcome.chain.urls().iter().map(Url::as_str).collect();
        println!("(followed {})", path.join(" -> "));
    }
    if outcome.stop != StopReason::Answered {
        println!("(stopped: {})", outcome.stop);
    }
    println!();
}

async fn convert_to_markdown(
    raw: &str,
    output: Option<&Path>,
    config: &Config,
    fetcher: &dyn Fetch,
    token: &CancellationToken,
) -> Result<()> {
    let url = Url::parse(raw).with_context(|| format!("Error processing URL {}", raw))?;
    let page = tokio::select! {
        biased;
        _ = token.cancelled() => bail!("cancelled"),
        page = fetcher.fetch(&url, config.fetch_timeout()) => {
            page.with_context(|| format!("Error processing URL {}", url))?
        }
    };

    let reducer = Reducer::new(config.rules().clone(), config.reduction_budget());
    let (text, report) = reducer.render(&page.markup, &page.url_final);
    info!(
        url = %page.url_final,
        removed = report.removed,
        chars = text.len(),
        "converted page"
    );

    match output {
        Some(path) => {
            tokio::fs::write(path, format!("{}\n", text))
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Wrote {} bytes to {}", text.len() + 1, path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}
