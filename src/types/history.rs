//! History entry type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{TelemetryRecord, Verdict};

/// Last id handed out by [`HistoryEntry::capture`].
static LAST_ENTRY_ID: AtomicU64 = AtomicU64::new(0);

/// A verdict together with a private copy of the telemetry that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: u64,
    #[serde(flatten)]
    pub verdict: Verdict,
    pub telemetry: TelemetryRecord,
}

impl HistoryEntry {
    /// Capture a verdict and snapshot the record by value.
    ///
    /// Ids derive from the verdict timestamp in microseconds and are strictly
    /// increasing across the process, even for captures within the same tick.
    pub fn capture(verdict: &Verdict, record: &TelemetryRecord) -> Self {
        let stamp = u64::try_from(verdict.timestamp.timestamp_micros()).unwrap_or(0);
        let id = match LAST_ENTRY_ID.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(stamp.max(last + 1))
        }) {
            Ok(last) | Err(last) => stamp.max(last + 1),
        };

        Self {
            id,
            verdict: verdict.clone(),
            telemetry: record.clone(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.verdict.timestamp
    }
}
