use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use newswire::api::{self, AppState};
use newswire::cache::ArticleCache;
use newswire::config::{self, Config};
use newswire::feed::{build_client, Aggregator};

#[derive(Parser, Debug)]
#[command(name = "newswire", about = "Aggregates RSS/Atom news feeds behind a JSON API")]
struct Args {
    /// Path to the TOML config file (a missing file uses defaults)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the listen port from the config
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_path = args
        .config
        .unwrap_or_else(|| Path::new("newswire.toml").to_path_buf());
    let cfg = Config::load(&config_path).context("Failed to load configuration")?;
    let port = args.port.unwrap_or(cfg.port);

    let sources = config::feed_sources();
    if sources.is_empty() {
        tracing::warn!("No valid feed sources configured; the API will serve empty lists");
    }

    let client = build_client().context("Failed to build HTTP client")?;
    let aggregator = Aggregator::new(client, sources, cfg.fetch_timeout(), cfg.per_feed_limit);
    let cache = Arc::new(ArticleCache::new(aggregator, cfg.cache_ttl()));

    // Prime the cache before accepting requests, like a fresh deploy should
    tracing::info!("Fetching initial feed data...");
    let snapshot = cache.force_refresh().await;
    tracing::info!(articles = snapshot.articles.len(), "Initial aggregation complete");

    let app = api::router(AppState { cache });
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "Serving articles");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
