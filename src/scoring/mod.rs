//! Fault Scoring & Attribution Engine
//!
//! Deterministic, rule-based fault scoring for a single [`TelemetryRecord`].
//! Each rule watches one parameter; when it fires it adds a fixed weight to the
//! fault score and implicates one or more drivetrain components.
//!
//! | parameter               | fires when          | weight | components                   |
//! |-------------------------|---------------------|--------|------------------------------|
//! | `vibrationLevels`       | > 70                | 0.30   | Gearbox, Bearings            |
//! | `componentTemperatures` | > 90                | 0.25   | Generator, Power Electronics |
//! | `windSpeed`             | > 25 or < 3         | 0.20   | Rotor, Control System        |
//! | `powerFactor`           | < 0.85              | 0.15   | Power Electronics            |
//! | `gearboxOilCondition`   | < 30                | 0.10   | Gearbox                      |
//!
//! Weights are summed in hundredths so the 0.3 / 0.6 classification boundaries
//! compare exactly.
//!
//! The only non-determinism is the noise drawn from the caller's RNG, always in
//! this order: probability noise, confidence, `generatorPower` residual,
//! `frequency` residual. Seed the RNG to pin a verdict.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::types::{FaultLabel, RecordError, TelemetryRecord, Verdict};

/// Errors from the scoring engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("invalid telemetry record: {0}")]
    InvalidRecord(#[from] RecordError),
}

/// A single threshold rule.
struct Rule {
    parameter: &'static str,
    /// Weight in hundredths of fault score.
    weight: u32,
    components: &'static [&'static str],
    /// Attribution when the rule fires.
    fired_attribution: f64,
    /// Attribution when it does not.
    idle_attribution: f64,
    triggered: fn(&TelemetryRecord) -> bool,
}

const RULES: [Rule; 5] = [
    Rule {
        parameter: "vibrationLevels",
        weight: 30,
        components: &["Gearbox", "Bearings"],
        fired_attribution: 0.15,
        idle_attribution: -0.05,
        triggered: |r| r.vibration_levels > 70.0,
    },
    Rule {
        parameter: "componentTemperatures",
        weight: 25,
        components: &["Generator", "Power Electronics"],
        fired_attribution: 0.12,
        idle_attribution: -0.03,
        triggered: |r| r.component_temperatures > 90.0,
    },
    Rule {
        parameter: "windSpeed",
        weight: 20,
        components: &["Rotor", "Control System"],
        fired_attribution: 0.10,
        idle_attribution: -0.02,
        triggered: |r| r.wind_speed > 25.0 || r.wind_speed < 3.0,
    },
    Rule {
        parameter: "powerFactor",
        weight: 15,
        components: &["Power Electronics"],
        fired_attribution: 0.08,
        idle_attribution: -0.01,
        triggered: |r| r.power_factor < 0.85,
    },
    Rule {
        parameter: "gearboxOilCondition",
        weight: 10,
        components: &["Gearbox"],
        fired_attribution: 0.06,
        idle_attribution: -0.01,
        triggered: |r| r.gearbox_oil_condition < 30.0,
    },
];

/// Upper bound (exclusive) of the noise added on top of the fault score.
pub const PROBABILITY_NOISE: f64 = 0.1;

/// Confidence is drawn uniformly from this half-open range.
const CONFIDENCE_RANGE: std::ops::Range<f64> = 0.85..0.95;

/// Magnitude of the residual attribution given to parameters no rule reads.
const RESIDUAL_ATTRIBUTION: f64 = 0.02;

/// Deterministic part of a score: which rules fired and what they add up to.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleEvaluation {
    pub fault_score: f64,
    pub fired: Vec<&'static str>,
    pub affected_components: Vec<String>,
    pub attribution: BTreeMap<String, f64>,
}

/// Apply every rule to a validated record.
pub fn evaluate_rules(record: &TelemetryRecord) -> Result<RuleEvaluation, ScoringError> {
    record.validate()?;

    let mut points = 0u32;
    let mut fired = Vec::new();
    let mut affected_components: Vec<String> = Vec::new();
    let mut attribution = BTreeMap::new();

    for rule in &RULES {
        let hit = (rule.triggered)(record);
        if hit {
            points += rule.weight;
            fired.push(rule.parameter);
            for component in rule.components {
                if !affected_components.iter().any(|c| c == component) {
                    affected_components.push((*component).to_string());
                }
            }
        }
        let contribution = if hit {
            rule.fired_attribution
        } else {
            rule.idle_attribution
        };
        attribution.insert(rule.parameter.to_string(), contribution);
    }

    Ok(RuleEvaluation {
        fault_score: f64::from(points) / 100.0,
        fired,
        affected_components,
        attribution,
    })
}

/// Score a record, stamping the verdict with the current time.
pub fn score<R: Rng>(record: &TelemetryRecord, rng: &mut R) -> Result<Verdict, ScoringError> {
    score_at(record, rng, Utc::now())
}

/// Score a record with an explicit timestamp.
pub fn score_at<R: Rng>(
    record: &TelemetryRecord,
    rng: &mut R,
    timestamp: DateTime<Utc>,
) -> Result<Verdict, ScoringError> {
    let RuleEvaluation {
        fault_score,
        affected_components,
        mut attribution,
        ..
    } = evaluate_rules(record)?;

    let label = FaultLabel::from_score(fault_score);
    let probability = (fault_score + rng.gen_range(0.0..PROBABILITY_NOISE)).min(1.0);
    let confidence = rng.gen_range(CONFIDENCE_RANGE);

    for residual in ["generatorPower", "frequency"] {
        attribution.insert(
            residual.to_string(),
            rng.gen_range(-RESIDUAL_ATTRIBUTION..RESIDUAL_ATTRIBUTION),
        );
    }

    Ok(Verdict {
        label,
        probability,
        confidence,
        attribution,
        affected_components,
        timestamp,
    })
}
