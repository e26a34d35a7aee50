//! REST API module using Axum
//!
//! HTTP back end for the turbine dashboard. JSON endpoints live under `/api`
//! and share the envelope in [`envelope`]; `/health` is a bare liveness probe.
//! [`scoring_service`] is the separate router served by the `scoring-service`
//! binary.

pub mod envelope;
pub mod handlers;
mod routes;
pub mod scoring_service;

pub use handlers::DashboardState;

use axum::http::{header, Method};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Environment variable holding extra allowed CORS origins.
pub const CORS_ORIGINS_ENV: &str = "TURBINE_CORS_ORIGINS";

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Set `TURBINE_CORS_ORIGINS` to a comma-separated list of allowed origins
/// when the dashboard is served from elsewhere (e.g., `http://localhost:5173`).
fn build_cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    match std::env::var(CORS_ORIGINS_ENV) {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            base.allow_origin(allowed)
        }
        // No cross-origin allowed
        Err(_) => base,
    }
}

/// Create the complete application router.
pub fn create_app(state: DashboardState) -> Router {
    let cors = build_cors_layer();

    Router::new()
        .nest("/api", routes::api_routes(state.clone()))
        // Legacy health endpoint at /health
        .merge(routes::legacy_routes(state))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}

/// Serve `app` on `listener` until `shutdown` is cancelled, then drain
/// in-flight connections.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            tracing::info!("[HttpServer] Received shutdown signal");
        })
        .await
}
