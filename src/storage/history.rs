//! Verdict History Storage
//!
//! Bounded, in-memory log of past verdicts. Appends evict the oldest entry once
//! the store is at capacity (strict FIFO), and the whole log exports as a
//! fixed-column CSV table.

use chrono::SecondsFormat;
use std::collections::VecDeque;

use crate::config::defaults::HISTORY_CAPACITY;
use crate::types::HistoryEntry;

/// Column order of [`HistoryStore::export`].
pub const EXPORT_COLUMNS: [&str; 8] = [
    "timestamp",
    "prediction",
    "probability",
    "confidence",
    "windSpeed",
    "generatorPower",
    "vibrationLevels",
    "componentTemperatures",
];

/// Error type for history operations
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("export failed: {0}")]
    Export(String),
}

impl From<csv::Error> for HistoryError {
    fn from(err: csv::Error) -> Self {
        HistoryError::Export(err.to_string())
    }
}

/// Ring buffer of [`HistoryEntry`] values, oldest first.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl HistoryStore {
    /// Create a store holding at most `capacity` entries (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest when full.
    pub fn append(&mut self, entry: HistoryEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Drop every entry at once.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Render the store as CSV, oldest row first.
    ///
    /// Probability and confidence carry 3 decimals, telemetry columns 1.
    /// An empty store yields just the header row.
    pub fn export(&self) -> Result<String, HistoryError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(EXPORT_COLUMNS)?;

        for entry in &self.entries {
            let verdict = &entry.verdict;
            let telemetry = &entry.telemetry;
            writer.write_record([
                verdict
                    .timestamp
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
                verdict.label.to_string(),
                format!("{:.3}", verdict.probability),
                format!("{:.3}", verdict.confidence),
                format!("{:.1}", telemetry.wind_speed),
                format!("{:.1}", telemetry.generator_power),
                format!("{:.1}", telemetry.vibration_levels),
                format!("{:.1}", telemetry.component_temperatures),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| HistoryError::Export(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| HistoryError::Export(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FaultLabel, TelemetryRecord, Verdict};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn entry_with_wind(wind_speed: f64) -> HistoryEntry {
        let verdict = Verdict {
            label: FaultLabel::Normal,
            probability: 0.05,
            confidence: 0.9,
            attribution: BTreeMap::new(),
            affected_components: Vec::new(),
            timestamp: Utc::now(),
        };
        let record = TelemetryRecord {
            wind_speed,
            ..TelemetryRecord::default()
        };
        HistoryEntry::capture(&verdict, &record)
    }

    #[test]
    fn test_fifo_eviction() {
        let mut store = HistoryStore::default();
        for i in 0..60 {
            store.append(entry_with_wind(f64::from(i)));
        }

        assert_eq!(store.len(), 50);
        let winds: Vec<f64> = store.entries().map(|e| e.telemetry.wind_speed).collect();
        let expected: Vec<f64> = (10..60).map(f64::from).collect();
        assert_eq!(winds, expected);
        assert_eq!(store.latest().unwrap().telemetry.wind_speed, 59.0);
    }

    #[test]
    fn test_small_capacity() {
        let mut store = HistoryStore::with_capacity(2);
        store.append(entry_with_wind(1.0));
        store.append(entry_with_wind(2.0));
        store.append(entry_with_wind(3.0));
        let winds: Vec<f64> = store.entries().map(|e| e.telemetry.wind_speed).collect();
        assert_eq!(winds, vec![2.0, 3.0]);
        assert_eq!(HistoryStore::with_capacity(0).capacity(), 1);
    }

    #[test]
    fn test_clear() {
        let mut store = HistoryStore::default();
        store.append(entry_with_wind(5.0));
        store.append(entry_with_wind(6.0));
        store.clear();
        assert!(store.is_empty());
        assert!(store.latest().is_none());
    }

    #[test]
    fn test_export_empty_is_header_only() {
        let csv = HistoryStore::default().export().unwrap();
        assert_eq!(
            csv,
            "timestamp,prediction,probability,confidence,windSpeed,generatorPower,vibrationLevels,componentTemperatures\n"
        );
    }

    #[test]
    fn test_export_single_entry() {
        let verdict = Verdict {
            label: FaultLabel::Warning,
            probability: 0.45678,
            confidence: 0.9,
            attribution: BTreeMap::new(),
            affected_components: vec!["Gearbox".to_string()],
            timestamp: Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
        };
        let record = TelemetryRecord {
            wind_speed: 14.26,
            generator_power: 2100.04,
            vibration_levels: 75.0,
            component_temperatures: 88.96,
            ..TelemetryRecord::default()
        };
        let mut store = HistoryStore::default();
        store.append(HistoryEntry::capture(&verdict, &record));

        let csv = store.export().unwrap();
        let rows: Vec<&str> = csv.lines().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1],
            "2026-03-14T09:26:53.000Z,warning,0.457,0.900,14.3,2100.0,75.0,89.0"
        );
    }
}
