//! Shared application state
//!
//! One [`AppState`] lives behind an `Arc<RwLock<_>>` and is shared by the
//! Sampling Loop and the HTTP handlers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

use crate::config::HistoryConfig;
use crate::storage::HistoryStore;
use crate::types::{TelemetryRecord, Verdict};

/// Mutable state of a running sentinel.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Telemetry the next cycle perturbs and scores.
    pub telemetry: TelemetryRecord,

    /// Latest verdict, from the loop or a manual prediction.
    pub prediction: Option<Verdict>,

    pub history: HistoryStore,

    pub sampling: SamplingStats,

    /// Process start time for uptime reporting
    pub uptime: Instant,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(&HistoryConfig::default())
    }
}

impl AppState {
    pub fn new(history: &HistoryConfig) -> Self {
        Self {
            telemetry: TelemetryRecord::default(),
            prediction: None,
            history: HistoryStore::with_capacity(history.capacity),
            sampling: SamplingStats::default(),
            uptime: Instant::now(),
        }
    }

    /// Start from the given record instead of the nominal defaults.
    pub fn with_telemetry(mut self, telemetry: TelemetryRecord) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn uptime_secs(&self) -> u64 {
        self.uptime.elapsed().as_secs()
    }
}

/// Counters kept by the Sampling Loop across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingStats {
    /// Cycles whose verdict landed in history.
    pub cycles_completed: u64,
    /// Cycles whose prediction failed.
    pub cycles_failed: u64,
    /// Verdicts that arrived after the loop was stopped.
    pub discarded_after_stop: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_default() {
        let state = AppState::default();

        assert_eq!(state.telemetry, TelemetryRecord::default());
        assert!(state.prediction.is_none());
        assert!(state.history.is_empty());
        assert_eq!(state.history.capacity(), 50);
        assert_eq!(state.sampling, SamplingStats::default());
    }

    #[test]
    fn test_history_capacity_from_config() {
        let state = AppState::new(&HistoryConfig { capacity: 5 });
        assert_eq!(state.history.capacity(), 5);
    }
}
