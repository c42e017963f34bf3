//! Watch rule definitions and per-rule statistics.

use chrono::{DateTime, Utc};
use sentra_eval::{evaluate_conditions, Condition};
use sentra_types::{Attributes, Severity};
use serde::{Deserialize, Serialize};

use crate::findings::MonitorError;

// ============================================================================
// Rules
// ============================================================================

/// What a rule watches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Operational monitoring; triggers raise alerts.
    Monitoring,
    /// Regulatory/policy compliance; triggers raise violations.
    Compliance,
}

/// Automated response attached to a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleAction {
    /// Notify the operations channel.
    Alert,
    /// Block the subject's further access until reviewed.
    Block,
    /// Force a fresh MFA challenge on the next request.
    RequireMfa,
    /// Route the subject's next grant through an approval workflow.
    RequireApproval,
    /// Terminate the subject's active sessions.
    TerminateSession,
    /// Record only; no active response.
    LogOnly,
}

/// A monitoring or compliance rule evaluated against each event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchRule {
    /// Unique rule name.
    pub name: String,
    pub kind: RuleKind,
    /// Severity of the findings this rule raises.
    pub severity: Severity,
    /// Weighted conditions over the event's attribute record.
    pub conditions: Vec<Condition>,
    /// Weighted-score threshold. When set, the rule triggers if the summed
    /// weight of matched conditions reaches it; when absent, any single
    /// match triggers.
    pub threshold: Option<f64>,
    /// Observation window in minutes for rate-style conditions. The event
    /// supplier aggregates over this window (e.g. `failures_last_hour`);
    /// the engine records it for operators but does not aggregate itself.
    pub window_minutes: Option<u32>,
    /// Responses dispatched when the rule triggers.
    #[serde(default)]
    pub actions: Vec<RuleAction>,
    /// Inactive rules are skipped during evaluation.
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl WatchRule {
    /// Creates an active rule with no threshold (any match triggers).
    pub fn new(name: impl Into<String>, kind: RuleKind, severity: Severity) -> Self {
        Self {
            name: name.into(),
            kind,
            severity,
            conditions: Vec::new(),
            threshold: None,
            window_minutes: None,
            actions: Vec::new(),
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_window_minutes(mut self, minutes: u32) -> Self {
        self.window_minutes = Some(minutes);
        self
    }

    pub fn with_action(mut self, action: RuleAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Returns whether the event trips this rule.
    ///
    /// With a threshold: the weighted score of matched conditions must
    /// reach it. Without: at least one condition must match.
    pub fn is_triggered_by(&self, event: &Attributes) -> bool {
        let report = evaluate_conditions(event, &self.conditions);
        match self.threshold {
            Some(threshold) => report.score >= threshold,
            None => report.any_matched(),
        }
    }

    /// A rule with no conditions can never trigger and is almost certainly
    /// a configuration mistake, so creation rejects it.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.name.trim().is_empty() {
            return Err(MonitorError::Validation(
                "rule name must not be empty".to_string(),
            ));
        }
        if self.conditions.is_empty() {
            return Err(MonitorError::Validation(format!(
                "rule '{}' must declare at least one condition",
                self.name
            )));
        }
        if self.threshold.is_some_and(|t| !t.is_finite() || t < 0.0) {
            return Err(MonitorError::Validation(format!(
                "rule '{}' has a non-finite or negative threshold",
                self.name
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Per-rule trigger and resolution counters.
///
/// `true_positives + false_positives <= times_triggered`; the difference is
/// findings still open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleStats {
    pub times_triggered: u64,
    pub true_positives: u64,
    pub false_positives: u64,
    pub last_triggered: Option<DateTime<Utc>>,
}

impl RuleStats {
    /// Fraction of resolved findings that were real, in `[0, 1]`.
    /// `None` until at least one finding has been resolved.
    pub fn effectiveness(&self) -> Option<f64> {
        let resolved = self.true_positives + self.false_positives;
        if resolved == 0 {
            return None;
        }
        Some(self.true_positives as f64 / resolved as f64)
    }

    /// Fraction of resolved findings that were noise, in `[0, 1]`.
    pub fn false_positive_rate(&self) -> Option<f64> {
        self.effectiveness().map(|e| 1.0 - e)
    }
}

// ============================================================================
// Tests
// ============================================================================
