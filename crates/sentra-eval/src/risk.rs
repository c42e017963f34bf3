//! Composite risk scoring.
//!
//! Combines six weighted access signals into a single 0-100 score, then
//! folds in externally-supplied anomaly findings. The anomaly *detector* is
//! an external collaborator with a `score(event) -> [0,1]` contract; this
//! module only consumes its output as confidence-weighted severities.
//!
//! Pure function of its inputs: no I/O, no clock, no shared state.

use sentra_types::Severity;
use serde::{Deserialize, Serialize};

/// Default factor weights. Sum to 1.0 so a fully-risky signal set maps to
/// exactly 100 before anomalies.
const WEIGHT_TIME_OF_ACCESS: f64 = 0.15;
const WEIGHT_LOCATION: f64 = 0.20;
const WEIGHT_DEVICE: f64 = 0.10;
const WEIGHT_PRIVILEGE_LEVEL: f64 = 0.25;
const WEIGHT_ACCESS_FREQUENCY: f64 = 0.15;
const WEIGHT_RESOURCE_SENSITIVITY: f64 = 0.15;

// ============================================================================
// Inputs
// ============================================================================

/// Normalized access-context signals, each in `[0, 1]` where 1 is riskiest.
///
/// Out-of-range or non-finite inputs are clamped before scoring, so
/// adversarial extremes cannot push the result outside `[0, 100]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskSignals {
    /// Unusual time of access (off-hours, atypical for the subject).
    pub time_of_access: f64,
    /// Untrusted or unusual network location.
    pub location: f64,
    /// Unmanaged or unknown device.
    pub device: f64,
    /// Privilege level of the requested operation.
    pub privilege_level: f64,
    /// Recent access frequency relative to the subject's baseline.
    pub access_frequency: f64,
    /// Sensitivity classification of the target resource.
    pub resource_sensitivity: f64,
}

/// An anomaly reported by an external detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    /// Detector-assigned severity.
    pub severity: Severity,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f64,
}

impl Anomaly {
    pub fn new(severity: Severity, confidence: f64) -> Self {
        Self {
            severity,
            confidence,
        }
    }
}

// ============================================================================
// Scoring
// ============================================================================

/// Computes the composite risk score in `[0, 100]`.
///
/// Weighted sum of the six factors (normalized to 0-100) plus
/// `severity.score() * confidence` per anomaly, clamped to the output
/// range. Monotonic in every factor and in every anomaly's confidence.
pub fn risk_score(signals: &RiskSignals, anomalies: &[Anomaly]) -> f64 {
    let base = WEIGHT_TIME_OF_ACCESS * clamp_unit(signals.time_of_access)
        + WEIGHT_LOCATION * clamp_unit(signals.location)
        + WEIGHT_DEVICE * clamp_unit(signals.device)
        + WEIGHT_PRIVILEGE_LEVEL * clamp_unit(signals.privilege_level)
        + WEIGHT_ACCESS_FREQUENCY * clamp_unit(signals.access_frequency)
        + WEIGHT_RESOURCE_SENSITIVITY * clamp_unit(signals.resource_sensitivity);

    let anomaly_total: f64 = anomalies
        .iter()
        .map(|a| a.severity.score() * clamp_unit(a.confidence))
        .sum();

    (base * 100.0 + anomaly_total).clamp(0.0, 100.0)
}

/// Clamps to `[0, 1]`, mapping NaN to 0.
fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
