//! newsrank: fetch news, rank it against a topic, publish a summarized digest.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newsrank::cli::Cli;
use newsrank::config::AppConfig;
use newsrank::pipeline::Pipeline;

/// Compact logs by default, JSON lines with `NEWSRANK_LOG_FORMAT=json`.
/// `RUST_LOG` overrides the default `info` filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("NEWSRANK_LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = AppConfig::load(cli.config.as_deref())?;
    let pipeline = Pipeline::from_config(&cfg, &cli.run_options())?;
    let report = pipeline.run().await?;
    println!("Digest written to {}", report.html.display());
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!(error = ?e, "run failed");
        std::process::exit(1);
    }
}
