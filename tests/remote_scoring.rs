//! Remote Scoring Integration Tests
//!
//! Runs the scoring service router on a loopback port and drives it through
//! the sentinel's `Dispatcher`, covering the remote path, explanations and
//! the fallback when the service is unreachable. Also checks that the shared
//! `api::serve` helper stops on its shutdown token.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use turbine_sentinel::api::scoring_service::scoring_service_routes;
use turbine_sentinel::dispatch::{DispatchError, Dispatcher, HttpRemoteScorer, RemoteScorer};
use turbine_sentinel::types::{FaultLabel, TelemetryRecord};

/// Serve the scoring service on an ephemeral port and return its base URL.
async fn spawn_scoring_service() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = scoring_service_routes(StdRng::seed_from_u64(9));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn remote_dispatcher(base_url: &str, fallback_delay: Duration) -> Dispatcher {
    let scorer: Arc<dyn RemoteScorer> =
        Arc::new(HttpRemoteScorer::new(base_url, Duration::from_secs(2)).unwrap());
    Dispatcher::new(
        Some(scorer),
        Duration::from_secs(2),
        fallback_delay,
        StdRng::seed_from_u64(1),
    )
}

#[tokio::test]
async fn test_remote_verdict_skips_fallback_delay() {
    let base_url = spawn_scoring_service().await;
    // A delay this long would dominate the timing if the fallback ran.
    let dispatcher = remote_dispatcher(&base_url, Duration::from_secs(5));

    let record = TelemetryRecord {
        vibration_levels: 80.0,
        ..TelemetryRecord::default()
    };
    let started = Instant::now();
    let verdict = dispatcher.predict(&record).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(verdict.label, FaultLabel::Normal);
    assert_eq!(verdict.affected_components, vec!["Gearbox", "Bearings"]);
    assert!(dispatcher.remote_healthy().await);
}

#[tokio::test]
async fn test_remote_explanation() {
    let base_url = spawn_scoring_service().await;
    let dispatcher = remote_dispatcher(&base_url, Duration::ZERO);

    let record = TelemetryRecord {
        component_temperatures: 95.0,
        ..TelemetryRecord::default()
    };
    let explanation = dispatcher.explain(&record).await.unwrap();

    assert!(explanation.attribution["componentTemperatures"] > 0.0);
    assert!(explanation.attribution["vibrationLevels"] < 0.0);
}

#[tokio::test]
async fn test_unreachable_service_falls_back_locally() {
    let dispatcher = remote_dispatcher("http://127.0.0.1:9", Duration::from_millis(50));

    let started = Instant::now();
    let verdict = dispatcher.predict(&TelemetryRecord::default()).await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(verdict.label, FaultLabel::Normal);
    assert!(!dispatcher.remote_healthy().await);

    let err = dispatcher
        .explain(&TelemetryRecord::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::ExplanationUnavailable(_)));
}

#[tokio::test]
async fn test_serve_drains_on_shutdown_token() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let server = tokio::spawn(turbine_sentinel::api::serve(
        listener,
        scoring_service_routes(StdRng::seed_from_u64(3)),
        shutdown.clone(),
    ));

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    drop(client);

    shutdown.cancel();
    let outcome = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop after shutdown")
        .unwrap();
    assert!(outcome.is_ok());
}
