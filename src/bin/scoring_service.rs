//! Scoring Service - stand-alone remote scorer for Turbine Sentinel
//!
//! Serves `POST /predict`, `POST /explain` and `GET /health` backed by the
//! local Scoring Engine, so the sentinel's remote path can be run end to end:
//!
//! ```bash
//! ./scoring-service --port 8000 --seed 7
//! ./turbine-sentinel --remote-url http://localhost:8000
//! ```

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tower_http::trace::TraceLayer;
use tracing::info;
use turbine_sentinel::api::scoring_service::scoring_service_routes;

#[derive(Parser, Debug)]
#[command(name = "scoring-service", about = "Remote scoring service for Turbine Sentinel")]
struct CliArgs {
    /// Port to listen on (default: 8000)
    #[arg(long, short, default_value = "8000")]
    port: u16,

    /// Bind address (overrides --port)
    #[arg(long, env = "SCORING_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Seed for scoring noise
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    let bind_address = args
        .bind_address
        .unwrap_or_else(|| format!("0.0.0.0:{}", args.port));

    let rng = match args.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let app = scoring_service_routes(rng).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!(bind = %bind_address, "Scoring service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Received Ctrl+C, shutting down");
        })
        .await
        .context("Scoring service error")?;

    Ok(())
}
