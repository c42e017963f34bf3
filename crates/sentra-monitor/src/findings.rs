//! Findings raised by triggered rules, with a validated status lifecycle.

use chrono::{DateTime, Utc};
use sentra_types::{Attributes, Severity};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::rules::RuleAction;

/// Errors from rule management and finding transitions.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Malformed rule or finding input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No rule registered under this name.
    #[error("unknown rule: {0}")]
    UnknownRule(String),

    /// A rule with this name already exists.
    #[error("duplicate rule: {0}")]
    DuplicateRule(String),

    /// No finding with this id.
    #[error("unknown finding: {0}")]
    UnknownFinding(Uuid),

    /// The requested status change is not a legal lifecycle step.
    #[error("invalid finding transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: FindingStatus,
        to: FindingStatus,
    },
}

/// Whether a finding is an operational alert or a compliance violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Alert,
    Violation,
}

/// Lifecycle status. Legal transitions:
/// `Open -> Investigating`, and `Open | Investigating -> Resolved |
/// FalsePositive`. Terminal states accept nothing further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Open,
    Investigating,
    Resolved,
    FalsePositive,
}

impl FindingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FindingStatus::Resolved | FindingStatus::FalsePositive)
    }

    fn can_transition_to(self, to: FindingStatus) -> bool {
        match self {
            FindingStatus::Open => to != FindingStatus::Open,
            FindingStatus::Investigating => to.is_terminal(),
            FindingStatus::Resolved | FindingStatus::FalsePositive => false,
        }
    }
}

/// How a finding was closed; feeds rule statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// The finding reflected a real problem.
    Confirmed,
    /// The rule fired on benign activity.
    FalsePositive,
}

/// Supporting material attached to a finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub description: String,
    /// Snapshot of the event attributes that triggered the rule.
    pub attributes: Attributes,
    pub captured_at: DateTime<Utc>,
}

/// An alert or violation raised by a rule (or manually by an operator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: Uuid,
    /// Name of the rule that fired; manual findings use a synthetic name.
    pub rule_name: String,
    pub kind: FindingKind,
    pub severity: Severity,
    /// Subject whose activity triggered the rule, when known.
    pub subject: Option<String>,
    pub status: FindingStatus,
    pub evidence: Vec<Evidence>,
    /// Responses automatically dispatched when the rule fired.
    pub actions_taken: Vec<RuleAction>,
    /// Times the finding has been escalated.
    pub escalation_level: u32,
    /// Analyst notes accumulated during investigation.
    pub notes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Finding {
    pub fn new(
        rule_name: impl Into<String>,
        kind: FindingKind,
        severity: Severity,
        subject: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            rule_name: rule_name.into(),
            kind,
            severity,
            subject,
            status: FindingStatus::Open,
            evidence: Vec::new(),
            actions_taken: Vec::new(),
            escalation_level: 0,
            notes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_evidence(mut self, description: &str, attributes: Attributes) -> Self {
        self.evidence.push(Evidence {
            description: description.to_string(),
            attributes,
            captured_at: Utc::now(),
        });
        self
    }

    /// Moves the finding through its lifecycle, rejecting illegal steps.
    pub fn transition(&mut self, to: FindingStatus) -> Result<(), MonitorError> {
        if !self.status.can_transition_to(to) {
            return Err(MonitorError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Raises the severity one step (Critical stays Critical) and bumps
    /// the escalation level.
    pub fn escalate(&mut self) {
        self.severity = match self.severity {
            Severity::Low => Severity::Medium,
            Severity::Medium => Severity::High,
            Severity::High | Severity::Critical => Severity::Critical,
        };
        self.escalation_level += 1;
        self.updated_at = Utc::now();
    }

    pub fn add_note(&mut self, note: &str) {
        self.notes.push(note.to_string());
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// Tests
// ============================================================================
