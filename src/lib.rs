//! Turbine Sentinel: wind-turbine fault classification back end
//!
//! Scores simulated turbine telemetry into `normal` / `warning` / `fault`
//! verdicts and keeps a bounded history of them.
//!
//! ## Architecture
//!
//! - **Scoring Engine**: deterministic weighted rule table plus bounded noise
//! - **Dispatcher**: remote scoring service first, local engine on any failure
//! - **Sampling Loop**: periodic perturb -> score -> record
//! - **History Store**: bounded FIFO of verdicts, CSV export
//! - **API**: Axum router serving the dashboard

pub mod api;
pub mod config;
pub mod dispatch;
pub mod pipeline;
pub mod scoring;
pub mod storage;
pub mod telemetry_csv;
pub mod types;

// Re-export configuration
pub use config::SentinelConfig;

// Re-export commonly used types
pub use types::{
    Explanation, FaultLabel, HistoryEntry, RecordError, TelemetryRecord, Verdict,
};

// Re-export components
pub use dispatch::{DispatchError, Dispatcher, RemoteError, RemoteScorer};
pub use pipeline::{AppState, SamplingLoop};
pub use scoring::ScoringError;
pub use storage::HistoryStore;
