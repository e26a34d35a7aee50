//! Remote/Local Dispatcher
//!
//! Remote-first scoring entry point. [`Dispatcher::predict`] tries the remote
//! scoring service under a bounded timeout; on any [`RemoteError`] it waits out
//! an artificial delay and answers from the local scoring engine instead. The
//! caller only ever sees a verdict or an invalid-record error, and every call
//! settles within `remote timeout + fallback delay`.
//!
//! Explanations have no local counterpart: when the remote cannot explain, the
//! failure is surfaced as [`DispatchError::ExplanationUnavailable`].

pub mod remote;

pub use remote::{HttpRemoteScorer, RemoteError, RemoteScorer};

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::defaults::HEALTH_PROBE_TIMEOUT_MS;
use crate::config::RemoteConfig;
use crate::scoring::{self, ScoringError};
use crate::types::{Explanation, TelemetryRecord, Verdict};

/// Errors surfaced by the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    InvalidRecord(#[from] ScoringError),

    #[error("explanation unavailable: {0}")]
    ExplanationUnavailable(String),
}

/// Routes scoring calls to the remote service or the local engine.
pub struct Dispatcher {
    remote: Option<Arc<dyn RemoteScorer>>,
    remote_timeout: Duration,
    fallback_delay: Duration,
    /// Noise source for local scoring.
    rng: Mutex<StdRng>,
}

impl Dispatcher {
    pub fn new(
        remote: Option<Arc<dyn RemoteScorer>>,
        remote_timeout: Duration,
        fallback_delay: Duration,
        rng: StdRng,
    ) -> Self {
        Self {
            remote,
            remote_timeout,
            fallback_delay,
            rng: Mutex::new(rng),
        }
    }

    /// A dispatcher with no remote; every call scores locally after the delay.
    pub fn local_only(fallback_delay: Duration, rng: StdRng) -> Self {
        Self::new(None, Duration::ZERO, fallback_delay, rng)
    }

    /// Build from the `[remote]` config section.
    pub fn from_config(config: &RemoteConfig, seed: Option<u64>) -> Result<Self, RemoteError> {
        let remote: Option<Arc<dyn RemoteScorer>> = match &config.base_url {
            Some(url) => Some(Arc::new(HttpRemoteScorer::new(url, config.timeout())?)),
            None => None,
        };
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Ok(Self::new(
            remote,
            config.timeout(),
            config.fallback_delay(),
            rng,
        ))
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn remote_endpoint(&self) -> Option<&str> {
        self.remote.as_deref().map(|r| r.endpoint())
    }

    /// Score a record, remote first, local on any remote failure.
    pub async fn predict(&self, record: &TelemetryRecord) -> Result<Verdict, DispatchError> {
        // An invalid record fails the same way on either path; skip the round trip.
        record.validate().map_err(ScoringError::from)?;

        match self.try_remote(record).await {
            Ok(verdict) => {
                debug!(label = %verdict.label, "Verdict from remote scorer");
                Ok(verdict)
            }
            Err(e) => {
                if !matches!(e, RemoteError::Disabled) {
                    warn!(error = %e, "Remote scoring unavailable, falling back to local engine");
                }
                tokio::time::sleep(self.fallback_delay).await;
                Ok(self.score_locally(record)?)
            }
        }
    }

    /// Ask the remote service for a feature attribution. No local fallback.
    pub async fn explain(&self, record: &TelemetryRecord) -> Result<Explanation, DispatchError> {
        record.validate().map_err(ScoringError::from)?;

        let Some(remote) = &self.remote else {
            return Err(DispatchError::ExplanationUnavailable(
                RemoteError::Disabled.to_string(),
            ));
        };
        match tokio::time::timeout(self.remote_timeout, remote.explain(record)).await {
            Ok(Ok(explanation)) => Ok(explanation),
            Ok(Err(e)) => {
                warn!(error = %e, "Remote explanation failed");
                Err(DispatchError::ExplanationUnavailable(e.to_string()))
            }
            Err(_) => Err(DispatchError::ExplanationUnavailable(
                RemoteError::Timeout(self.remote_timeout).to_string(),
            )),
        }
    }

    /// Probe the remote health endpoint. `false` when no remote is configured.
    ///
    /// Bounded by the shorter of the remote timeout and
    /// [`HEALTH_PROBE_TIMEOUT_MS`], so a status poll never waits out a full
    /// scoring timeout.
    pub async fn remote_healthy(&self) -> bool {
        let Some(remote) = &self.remote else {
            return false;
        };
        let bound = self
            .remote_timeout
            .min(Duration::from_millis(HEALTH_PROBE_TIMEOUT_MS));
        matches!(
            tokio::time::timeout(bound, remote.health()).await,
            Ok(Ok(()))
        )
    }

    async fn try_remote(&self, record: &TelemetryRecord) -> Result<Verdict, RemoteError> {
        let remote = self.remote.as_ref().ok_or(RemoteError::Disabled)?;
        tokio::time::timeout(self.remote_timeout, remote.predict(record))
            .await
            .map_err(|_| RemoteError::Timeout(self.remote_timeout))?
    }

    fn score_locally(&self, record: &TelemetryRecord) -> Result<Verdict, ScoringError> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| {
            warn!("Scoring RNG mutex poisoned, recovering");
            e.into_inner()
        });
        scoring::score(record, &mut *rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FaultLabel, RecordError};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Remote that fails every call.
    struct DownRemote {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteScorer for DownRemote {
        async fn predict(&self, _: &TelemetryRecord) -> Result<Verdict, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(RemoteError::Status(reqwest::StatusCode::BAD_GATEWAY))
        }
        async fn explain(&self, _: &TelemetryRecord) -> Result<Explanation, RemoteError> {
            Err(RemoteError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE))
        }
        async fn health(&self) -> Result<(), RemoteError> {
            Err(RemoteError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE))
        }
        fn endpoint(&self) -> &str {
            "down"
        }
    }

    /// Remote that never answers.
    struct HangingRemote;

    #[async_trait]
    impl RemoteScorer for HangingRemote {
        async fn predict(&self, _: &TelemetryRecord) -> Result<Verdict, RemoteError> {
            std::future::pending().await
        }
        async fn explain(&self, _: &TelemetryRecord) -> Result<Explanation, RemoteError> {
            std::future::pending().await
        }
        async fn health(&self) -> Result<(), RemoteError> {
            std::future::pending().await
        }
        fn endpoint(&self) -> &str {
            "hanging"
        }
    }

    /// Remote with a fixed answer.
    struct FixedRemote(Verdict);

    #[async_trait]
    impl RemoteScorer for FixedRemote {
        async fn predict(&self, _: &TelemetryRecord) -> Result<Verdict, RemoteError> {
            Ok(self.0.clone())
        }
        async fn explain(&self, _: &TelemetryRecord) -> Result<Explanation, RemoteError> {
            Ok(Explanation {
                attribution: self.0.attribution.clone(),
                base_value: 0.1,
            })
        }
        async fn health(&self) -> Result<(), RemoteError> {
            Ok(())
        }
        fn endpoint(&self) -> &str {
            "fixed"
        }
    }

    /// Virtual-time elapsed check with timer-wheel rounding slack.
    fn assert_elapsed(started: tokio::time::Instant, expected_ms: u64) {
        let elapsed = started.elapsed();
        assert!(
            elapsed >= Duration::from_millis(expected_ms)
                && elapsed < Duration::from_millis(expected_ms + 50),
            "elapsed {elapsed:?}, expected ~{expected_ms}ms"
        );
    }

    fn warning_record() -> TelemetryRecord {
        TelemetryRecord {
            vibration_levels: 80.0,
            ..TelemetryRecord::default()
        }
    }

    fn dispatcher_with(remote: Arc<dyn RemoteScorer>, seed: u64) -> Dispatcher {
        Dispatcher::new(
            Some(remote),
            Duration::from_millis(10_000),
            Duration::from_millis(1_500),
            StdRng::seed_from_u64(seed),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_remote_falls_back_to_local_engine() {
        let remote = Arc::new(DownRemote {
            calls: AtomicUsize::new(0),
        });
        let dispatcher = dispatcher_with(remote.clone(), 42);
        let record = warning_record();

        let started = tokio::time::Instant::now();
        let verdict = dispatcher.predict(&record).await.unwrap();
        assert_elapsed(started, 1_500);
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);

        let expected = scoring::score(&record, &mut StdRng::seed_from_u64(42)).unwrap();
        assert!(verdict.same_outcome(&expected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_remote_settles_within_bound() {
        let dispatcher = dispatcher_with(Arc::new(HangingRemote), 5);

        let started = tokio::time::Instant::now();
        let verdict = dispatcher.predict(&warning_record()).await.unwrap();
        assert_elapsed(started, 11_500);
        assert_eq!(verdict.label, FaultLabel::Normal);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_probe_uses_short_bound() {
        let dispatcher = dispatcher_with(Arc::new(HangingRemote), 5);

        let started = tokio::time::Instant::now();
        assert!(!dispatcher.remote_healthy().await);
        assert_elapsed(started, HEALTH_PROBE_TIMEOUT_MS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_only_waits_fallback_delay() {
        let dispatcher =
            Dispatcher::local_only(Duration::from_millis(1_500), StdRng::seed_from_u64(1));
        let started = tokio::time::Instant::now();
        dispatcher.predict(&TelemetryRecord::default()).await.unwrap();
        assert_elapsed(started, 1_500);
        assert!(!dispatcher.has_remote());
        assert!(!dispatcher.remote_healthy().await);
    }

    #[tokio::test]
    async fn test_remote_verdict_passes_through() {
        let remote_verdict = Verdict {
            label: FaultLabel::Fault,
            probability: 0.93,
            confidence: 0.88,
            attribution: BTreeMap::from([("vibrationLevels".to_string(), 0.4)]),
            affected_components: vec!["Bearings".to_string()],
            timestamp: chrono::Utc::now(),
        };
        let dispatcher = dispatcher_with(Arc::new(FixedRemote(remote_verdict.clone())), 1);

        let verdict = dispatcher.predict(&TelemetryRecord::default()).await.unwrap();
        assert_eq!(verdict, remote_verdict);
        assert!(dispatcher.remote_healthy().await);

        let explanation = dispatcher.explain(&TelemetryRecord::default()).await.unwrap();
        assert_eq!(explanation.attribution["vibrationLevels"], 0.4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_record_is_surfaced_without_remote_call() {
        let remote = Arc::new(DownRemote {
            calls: AtomicUsize::new(0),
        });
        let dispatcher = dispatcher_with(remote.clone(), 1);
        let record = TelemetryRecord {
            power_factor: f64::NAN,
            ..TelemetryRecord::default()
        };

        let err = dispatcher.predict(&record).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::InvalidRecord(ScoringError::InvalidRecord(RecordError::NonFinite {
                field: "powerFactor",
                ..
            }))
        ));
        assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explain_has_no_local_fallback() {
        let down = dispatcher_with(
            Arc::new(DownRemote {
                calls: AtomicUsize::new(0),
            }),
            1,
        );
        assert!(matches!(
            down.explain(&TelemetryRecord::default()).await,
            Err(DispatchError::ExplanationUnavailable(_))
        ));

        let hanging = dispatcher_with(Arc::new(HangingRemote), 1);
        assert!(matches!(
            hanging.explain(&TelemetryRecord::default()).await,
            Err(DispatchError::ExplanationUnavailable(_))
        ));

        let local = Dispatcher::local_only(Duration::ZERO, StdRng::seed_from_u64(1));
        assert!(matches!(
            local.explain(&TelemetryRecord::default()).await,
            Err(DispatchError::ExplanationUnavailable(_))
        ));
    }

    #[test]
    fn test_from_config_without_url_is_local_only() {
        let dispatcher = Dispatcher::from_config(&RemoteConfig::default(), Some(3)).unwrap();
        assert!(!dispatcher.has_remote());
    }
}
