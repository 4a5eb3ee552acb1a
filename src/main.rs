//! pipspeed - PyPI mirror speed test service
//!
//! Serves the speed test web UI and the JSON API that probes every configured
//! mirror, ranks them and hands out pip configuration commands.
//!
//! Environment Variables:
//!   PORT               - HTTP port (default: 3000)
//!   PIPSPEED_CONFIG    - Path to TOML config file (sources + probe settings)
//!   STATIC_DIR         - Web UI root (default: frontend/public or frontend/dist)
//!   PROBE_CONCURRENCY  - Max sources probed in parallel (default: 5)
//!   PROBE_TIMEOUT_MS   - Per-attempt timeout (default: 3000)
//!   PROBE_RETRY_COUNT  - Measured attempts per source (default: 3)
//!   RUST_LOG           - tracing filter

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pipspeed_backend::api::{self, AppState};
use pipspeed_backend::probe::{
    EndpointEvaluator, ProbeCoordinator, Prober, ReqwestTransport, ResultCache, SpeedTestConfig,
    SweepMetrics, SweepRunner,
};

#[derive(Parser, Debug)]
#[command(name = "pipspeed")]
#[command(about = "PyPI mirror speed test service")]
struct Args {
    /// HTTP port
    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Path to TOML configuration file
    #[arg(short, long, env = "PIPSPEED_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the web UI
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Max sources probed in parallel
    #[arg(long, env = "PROBE_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Per-attempt timeout in milliseconds
    #[arg(long, env = "PROBE_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Measured attempts per source
    #[arg(long, env = "PROBE_RETRY_COUNT")]
    retry_count: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let args = Args::parse();
    let config = load_config(&args)?;

    info!(
        sources = config.sources.len(),
        concurrency = config.probe.concurrency,
        retry_count = config.probe.retry_count,
        timeout_ms = config.probe.timeout.as_millis() as u64,
        "Starting pipspeed"
    );

    let transport = Arc::new(ReqwestTransport::new(&config.probe)?);
    let evaluator = EndpointEvaluator::new(Prober::new(transport), (&config.probe).into());
    let coordinator = ProbeCoordinator::new(evaluator, config.probe.concurrency);
    let runner = Arc::new(SweepRunner::new(
        coordinator,
        config.sources.into(),
        Arc::new(ResultCache::new(config.probe.cache_retention_buckets)),
        Arc::new(SweepMetrics::new()),
    ));

    let mut app = api::create_router(AppState::new(runner));
    match resolve_static_root(args.static_dir) {
        Some(root) => {
            info!("Serving web UI from {}", root.display());
            app = api::with_static_assets(app, &root);
        }
        None => warn!("No web UI directory found, serving API only"),
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn load_config(args: &Args) -> Result<SpeedTestConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            SpeedTestConfig::from_file(path)?
        }
        None => SpeedTestConfig::default(),
    };

    if let Some(concurrency) = args.concurrency {
        config.probe.concurrency = concurrency;
    }
    if let Some(ms) = args.timeout_ms {
        config.probe.timeout = Duration::from_millis(ms);
    }
    if let Some(retry_count) = args.retry_count {
        config.probe.retry_count = retry_count;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn resolve_static_root(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(dir) = explicit {
        return Some(dir);
    }
    ["frontend/public", "frontend/dist"]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_dir())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipspeed_backend=info,pipspeed=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // 2) Also try the crate root .env when launched from elsewhere
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
