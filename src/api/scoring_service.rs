//! Stand-alone scoring service
//!
//! The HTTP surface the [`Dispatcher`](crate::dispatch::Dispatcher) expects from
//! a remote scorer, backed by the local Scoring Engine:
//! - `POST /predict` - Telemetry record in, verdict out
//! - `POST /explain` - Telemetry record in, rule attribution out
//! - `GET /health` - Liveness

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rand::rngs::StdRng;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::scoring::{self, PROBABILITY_NOISE};
use crate::types::{Explanation, RecordError, TelemetryRecord};

#[derive(Clone)]
struct ServiceState {
    rng: Arc<Mutex<StdRng>>,
}

/// Build the scoring service router.
pub fn scoring_service_routes(rng: StdRng) -> Router {
    let state = ServiceState {
        rng: Arc::new(Mutex::new(rng)),
    };
    Router::new()
        .route("/predict", post(predict))
        .route("/explain", post(explain))
        .route("/health", get(health))
        .with_state(state)
}

async fn predict(State(state): State<ServiceState>, Json(body): Json<Value>) -> Response {
    let record = match TelemetryRecord::from_json(body) {
        Ok(record) => record,
        Err(e) => return reject(e),
    };

    let verdict = {
        let mut rng = state.rng.lock().unwrap_or_else(|e| {
            warn!("Scoring RNG mutex poisoned, recovering");
            e.into_inner()
        });
        scoring::score(&record, &mut *rng)
    };

    match verdict {
        Ok(verdict) => {
            debug!(label = %verdict.label, "Scored record");
            Json(verdict).into_response()
        }
        Err(e) => reject_message(e.to_string()),
    }
}

async fn explain(Json(body): Json<Value>) -> Response {
    let record = match TelemetryRecord::from_json(body) {
        Ok(record) => record,
        Err(e) => return reject(e),
    };

    match scoring::evaluate_rules(&record) {
        Ok(evaluation) => Json(Explanation {
            attribution: evaluation.attribution,
            // Expected probability of a record on which no rule fires.
            base_value: PROBABILITY_NOISE / 2.0,
        })
        .into_response(),
        Err(e) => reject_message(e.to_string()),
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn reject(err: RecordError) -> Response {
    reject_message(err.to_string())
}

fn reject_message(message: String) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": message })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use rand::SeedableRng;
    use tower::ServiceExt;

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_predict_nominal_record() {
        let app = scoring_service_routes(StdRng::seed_from_u64(1));
        let record = serde_json::to_value(TelemetryRecord::default()).unwrap();

        let resp = app.oneshot(post_json("/predict", &record)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = body_json(resp).await;
        assert_eq!(v["prediction"], "normal");
        assert!(v["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_predict_rejects_partial_record() {
        let app = scoring_service_routes(StdRng::seed_from_u64(1));
        let resp = app
            .oneshot(post_json("/predict", &json!({ "windSpeed": 12.0 })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_explain_signs_follow_rules() {
        let app = scoring_service_routes(StdRng::seed_from_u64(1));
        let record = TelemetryRecord {
            vibration_levels: 80.0,
            ..TelemetryRecord::default()
        };
        let resp = app
            .oneshot(post_json("/explain", &serde_json::to_value(record).unwrap()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let v = body_json(resp).await;
        assert!(v["attribution"]["vibrationLevels"].as_f64().unwrap() > 0.0);
        assert!(v["attribution"]["windSpeed"].as_f64().unwrap() < 0.0);
    }
}
