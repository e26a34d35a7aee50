//! Shared data structures for turbine fault scoring
//!
//! - [`TelemetryRecord`]: one snapshot of every turbine parameter
//! - [`Verdict`]: classification, probability, confidence and attribution
//! - [`HistoryEntry`]: a verdict plus the telemetry that produced it

mod history;
mod telemetry;
mod verdict;

pub use history::*;
pub use telemetry::*;
pub use verdict::*;
