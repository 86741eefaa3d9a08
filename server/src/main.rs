use anyhow::Result;
use axum::Router;
use clap::Parser;
use smartkeep_core::scoring::TfWeighting;
use smartkeep_core::{DocumentStore, EngineConfig, MemoryStore, SledStore};
use smartkeep_server::{build_app, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Document store directory
    #[arg(long, default_value = "./data/documents")]
    store: String,
    /// Keep documents in memory only
    #[arg(long, default_value_t = false, conflicts_with = "store")]
    in_memory: bool,
    /// Engine configuration JSON file
    #[arg(long)]
    config: Option<String>,
    /// BM25 term-frequency saturation
    #[arg(long)]
    k1: Option<f64>,
    /// BM25 length normalization
    #[arg(long)]
    b: Option<f64>,
    /// TF-IDF term-frequency weighting: raw or log
    #[arg(long)]
    tf: Option<TfWeighting>,
    /// Drop English stop words at index and query time
    #[arg(long, default_value_t = false)]
    stopwords: bool,
    /// Apply English stemming at index and query time
    #[arg(long, default_value_t = false)]
    stem: bool,
    /// Timeout for URL ingestion fetches
    #[arg(long, default_value_t = 10)]
    fetch_timeout_secs: u64,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8000)]
    port: u16,
}

impl Args {
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_json_file(path)?,
            None => EngineConfig::default(),
        };
        if let Some(k1) = self.k1 { config.bm25.k1 = k1; }
        if let Some(b) = self.b { config.bm25.b = b; }
        if let Some(tf) = self.tf { config.tfidf.tf = tf; }
        if self.stopwords { config.tokenizer.stopwords = true; }
        if self.stem { config.tokenizer.stem = true; }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = args.engine_config()?;
    tracing::info!(?config, "engine configuration");

    let store: Arc<dyn DocumentStore> = if args.in_memory {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(SledStore::open(&args.store)?)
    };
    let state = AppState::new(config, store, Duration::from_secs(args.fetch_timeout_secs))?;
    let app: Router = build_app(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
