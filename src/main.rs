//! Auction Aggregator: binary entrypoint.
//! Loads the source registry, runs every source concurrently, prints a summary,
//! saves the merged report and (optionally) publishes it.
//!
//! No flags. Configuration comes from `config/sources.toml` (or
//! `$AUCTIONS_CONFIG_PATH`) plus `AUCTIONS_*` env vars, see `ingest::config`.

use std::process::ExitCode;

use auction_aggregator::ingest::config::load_config_default;
use auction_aggregator::ingest::providers::build_sources;
use auction_aggregator::metrics::Metrics;
use auction_aggregator::publish::{publish_best_effort, GitPublisher};
use auction_aggregator::summary::render_summary;
use auction_aggregator::{collect_and_build, persist, RunClock};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Conventional exit status for SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

/// Compact logs on stderr so stdout carries only the summary.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("auction_aggregator=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}

async fn run() -> anyhow::Result<ExitCode> {
    let cfg = load_config_default()?;

    let metrics = match &cfg.metrics_path {
        Some(_) => match Metrics::init() {
            Ok(m) => Some(m),
            Err(e) => {
                warn!(error = ?e, "metrics disabled");
                None
            }
        },
        None => None,
    };

    let sources = build_sources(&cfg)?;
    let clock = RunClock::now();
    info!(sources = sources.len(), "launching all sources in parallel");

    let result = tokio::select! {
        r = collect_and_build(&sources, clock) => r,
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("interrupted; nothing saved, run again to get complete results");
            return Ok(ExitCode::from(EXIT_INTERRUPTED));
        }
    };

    print!(
        "{}",
        render_summary(&result.aggregation, &result.output)
    );

    persist(&result, &cfg.output_path)?;
    println!("\nSaved to {}", cfg.output_path.display());

    if let (Some(m), Some(path)) = (&metrics, &cfg.metrics_path) {
        if let Err(e) = m.write_snapshot(path) {
            warn!(error = ?e, "metrics snapshot not written");
        }
    }

    if cfg.publish {
        let publisher = GitPublisher::for_artifact(&cfg.output_path, cfg.publish_url.clone());
        publish_best_effort(&publisher, &cfg.output_path).await;
    }

    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env if present; no-op otherwise.
    let _ = dotenvy::dotenv();
    init_tracing();

    match run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = ?e, "run failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
