//! API route definitions
//!
//! Organizes endpoints for the turbine dashboard:
//! - /api/status - Sampling, history and remote scorer status
//! - /api/telemetry - Current record, CSV import/export
//! - /api/predict, /api/prediction, /api/explain - Scoring
//! - /api/sampling/start, /api/sampling/stop - Loop control
//! - /api/history - Verdict log, CSV export

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, DashboardState};

/// Create all API routes for the dashboard
pub fn api_routes(state: DashboardState) -> Router {
    Router::new()
        .route("/status", get(handlers::get_status))
        // Telemetry
        .route(
            "/telemetry",
            get(handlers::get_telemetry).put(handlers::put_telemetry),
        )
        .route("/telemetry/import", post(handlers::import_telemetry))
        .route("/telemetry/export", get(handlers::export_telemetry))
        // Scoring
        .route("/predict", post(handlers::predict))
        .route("/prediction", get(handlers::get_prediction))
        .route("/explain", post(handlers::explain))
        // Sampling Loop control
        .route("/sampling/start", post(handlers::start_sampling))
        .route("/sampling/stop", post(handlers::stop_sampling))
        // History
        .route(
            "/history",
            get(handlers::get_history).delete(handlers::clear_history),
        )
        .route("/history/export", get(handlers::export_history))
        .with_state(state)
}

/// Legacy health endpoint at root level
pub fn legacy_routes(state: DashboardState) -> Router {
    Router::new()
        .route("/health", get(handlers::legacy_health_check))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamplingConfig;
    use crate::dispatch::Dispatcher;
    use crate::pipeline::{AppState, SamplingLoop};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::RwLock;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    fn create_test_state() -> DashboardState {
        let app_state = Arc::new(RwLock::new(AppState::default()));
        let dispatcher = Arc::new(Dispatcher::local_only(
            Duration::ZERO,
            StdRng::seed_from_u64(7),
        ));
        let sampling = Arc::new(SamplingLoop::new(
            Arc::clone(&app_state),
            Arc::clone(&dispatcher),
            &SamplingConfig::default(),
            CancellationToken::new(),
        ));
        DashboardState::new(app_state, dispatcher, sampling)
    }

    async fn get_status_code(app: Router, uri: &str) -> StatusCode {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_api_routes_status() {
        let app = api_routes(create_test_state());
        assert_eq!(get_status_code(app, "/status").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_routes_telemetry() {
        let app = api_routes(create_test_state());
        assert_eq!(get_status_code(app, "/telemetry").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_routes_history_export() {
        let app = api_routes(create_test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/history/export")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/csv; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_legacy_health() {
        let app = legacy_routes(create_test_state());
        assert_eq!(get_status_code(app, "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_predict_requires_post() {
        let app = api_routes(create_test_state());
        assert_eq!(
            get_status_code(app, "/predict").await,
            StatusCode::METHOD_NOT_ALLOWED
        );
    }
}
