//! Fault verdict types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Fault-score boundary above which a record is classified as a fault.
pub const FAULT_THRESHOLD: f64 = 0.6;

/// Fault-score boundary above which a record is classified as a warning.
pub const WARNING_THRESHOLD: f64 = 0.3;

/// Classification tier of a scored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultLabel {
    Normal,
    Warning,
    Fault,
}

impl FaultLabel {
    /// Classify a fault score. Both boundaries are strict, so a score sitting
    /// exactly on a threshold falls to the lower tier.
    pub fn from_score(fault_score: f64) -> Self {
        if fault_score > FAULT_THRESHOLD {
            FaultLabel::Fault
        } else if fault_score > WARNING_THRESHOLD {
            FaultLabel::Warning
        } else {
            FaultLabel::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FaultLabel::Normal => "normal",
            FaultLabel::Warning => "warning",
            FaultLabel::Fault => "fault",
        }
    }
}

impl fmt::Display for FaultLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one scoring call. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    #[serde(rename = "prediction")]
    pub label: FaultLabel,
    pub probability: f64,
    pub confidence: f64,
    /// Signed per-parameter contribution; positive pushes toward fault.
    pub attribution: BTreeMap<String, f64>,
    pub affected_components: Vec<String>,
    /// Remote scorers may omit this; it is then stamped on receipt.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Verdict {
    /// Check the invariants a verdict from any source must satisfy.
    pub fn check_bounds(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(format!("probability {} outside [0, 1]", self.probability));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!("confidence {} outside [0, 1]", self.confidence));
        }
        if let Some((name, value)) = self.attribution.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("attribution for {name} is not finite ({value})"));
        }
        Ok(())
    }

    /// True when everything but the timestamp matches.
    pub fn same_outcome(&self, other: &Verdict) -> bool {
        self.label == other.label
            && self.probability == other.probability
            && self.confidence == other.confidence
            && self.attribution == other.attribution
            && self.affected_components == other.affected_components
    }
}

/// Feature attribution returned by the remote explainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    pub attribution: BTreeMap<String, f64>,
    #[serde(default)]
    pub base_value: f64,
}
