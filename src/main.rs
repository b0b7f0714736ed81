//! linkpulse server binary
//!
//! Serves the crawl job REST API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use linkpulse::config::{Config, LogFormat};
use linkpulse::server::{HttpServer, JobManager, ServerMetrics};

#[derive(Parser)]
#[command(name = "linkpulse")]
#[command(about = "Polite, bounded web-link checker")]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address override (e.g. "127.0.0.1:9090")
    #[arg(short, long)]
    listen: Option<String>,

    /// Verbosity level (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(config: &Config, verbose: u8) {
    let level = match verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("linkpulse={level},tower_http=warn")));

    match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(listen) = cli.listen {
        config.http.listen_addr = listen;
    }
    config.validate()?;

    init_tracing(&config, cli.verbose);
    info!(
        listen = %config.http.listen_addr,
        user_agent = %config.crawl.user_agent,
        "starting linkpulse"
    );

    let metrics = Arc::new(ServerMetrics::new());
    let jobs = Arc::new(JobManager::new(config.crawl.clone(), metrics));
    let server = HttpServer::new(config.http.clone(), Arc::clone(&jobs));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, shutting down");
            let _ = shutdown_tx.send(());
        }
    });

    server.run(shutdown_rx).await
}
