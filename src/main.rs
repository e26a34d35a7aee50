//! Turbine Sentinel - wind-turbine fault classification server
//!
//! Serves the dashboard API, runs the Sampling Loop on demand and forwards
//! scoring to a remote service when one is configured.
//!
//! # Usage
//!
//! ```bash
//! # Local scoring only, sampling started from the dashboard
//! cargo run --release
//!
//! # Remote scorer with local fallback, sampling from boot
//! ./turbine-sentinel --remote-url http://localhost:8000 --autostart
//!
//! # Reproducible run seeded from recorded telemetry
//! ./turbine-sentinel --seed 42 --csv telemetry.csv
//! ```
//!
//! # Environment Variables
//!
//! - `TURBINE_CONFIG`: Path to a TOML config file
//! - `TURBINE_SERVER_ADDR`: HTTP bind address (default: 0.0.0.0:8080)
//! - `TURBINE_REMOTE_URL`: Base URL of the remote scoring service
//! - `TURBINE_CORS_ORIGINS`: Comma-separated extra CORS origins
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use turbine_sentinel::api::{self, create_app, DashboardState};
use turbine_sentinel::config::{self, SentinelConfig};
use turbine_sentinel::dispatch::Dispatcher;
use turbine_sentinel::pipeline::{AppState, SamplingLoop};
use turbine_sentinel::telemetry_csv;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "turbine-sentinel")]
#[command(about = "Wind-turbine telemetry fault classification server")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default: "0.0.0.0:8080")
    #[arg(short, long)]
    addr: Option<String>,

    /// Base URL of the remote scoring service (e.g., http://localhost:8000)
    #[arg(long, value_name = "URL")]
    remote_url: Option<String>,

    /// Seed for perturbation and scoring noise
    #[arg(long)]
    seed: Option<u64>,

    /// Start the Sampling Loop at boot instead of waiting for the dashboard
    #[arg(long)]
    autostart: bool,

    /// Seed current telemetry from the last valid row of a telemetry CSV
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Load configuration from this TOML file instead of the search order
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Load config from file/env, then apply CLI overrides on top.
fn resolve_config(args: &CliArgs) -> Result<SentinelConfig> {
    let mut cfg = match &args.config {
        Some(path) => SentinelConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SentinelConfig::load(),
    };

    if let Some(addr) = &args.addr {
        cfg.server.addr = addr.clone();
    }
    if let Some(url) = &args.remote_url {
        cfg.remote.base_url = Some(url.clone());
    }
    if args.seed.is_some() {
        cfg.sampling.seed = args.seed;
    }

    cfg.validate().context("Invalid configuration")?;
    Ok(cfg)
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    config::init(resolve_config(&args)?);
    let cfg = config::get();

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Turbine Sentinel");
    info!("  Wind-Turbine Fault Classification");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("");

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    // Shared state, optionally seeded from recorded telemetry
    let mut state = AppState::new(&cfg.history);
    if let Some(path) = &args.csv {
        let import = telemetry_csv::read_csv_file(path)
            .with_context(|| format!("Failed to import telemetry from {}", path.display()))?;
        match import.last() {
            Some(record) => {
                info!("📂 Initial telemetry: last of {} CSV rows", import.records.len());
                state = state.with_telemetry(record.clone());
            }
            None => warn!(
                skipped = import.skipped,
                "CSV had no valid rows, using nominal telemetry"
            ),
        }
    }
    let app_state = Arc::new(RwLock::new(state));

    let dispatcher = Arc::new(
        Dispatcher::from_config(&cfg.remote, cfg.sampling.seed)
            .context("Failed to build remote scoring client")?,
    );
    match dispatcher.remote_endpoint() {
        Some(endpoint) => info!(
            "🛰️  Remote scorer: {} (timeout {}ms, fallback delay {}ms)",
            endpoint, cfg.remote.timeout_ms, cfg.remote.fallback_delay_ms
        ),
        None => info!("🧮 Remote scorer: none (local engine only)"),
    }

    let sampling = Arc::new(SamplingLoop::new(
        Arc::clone(&app_state),
        Arc::clone(&dispatcher),
        &cfg.sampling,
        cancel_token.clone(),
    ));
    if args.autostart {
        sampling.start();
    } else {
        info!("⏸️  Sampling idle; start it with POST /api/sampling/start");
    }

    let app = create_app(DashboardState::new(
        Arc::clone(&app_state),
        dispatcher,
        Arc::clone(&sampling),
    ));

    let listener = tokio::net::TcpListener::bind(&cfg.server.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", cfg.server.addr))?;

    info!("✓ HTTP server listening on {}", cfg.server.addr);
    info!("");

    let outcome = api::serve(listener, app, cancel_token.clone()).await;
    // Stops the loop too if the server exited on its own.
    cancel_token.cancel();
    sampling.stop().await;

    match outcome {
        Ok(()) => {
            info!("");
            info!("✓ Turbine Sentinel shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("[HttpServer] Server error: {}", e);
            Err(anyhow::Error::new(e).context("HTTP server error"))
        }
    }
}
