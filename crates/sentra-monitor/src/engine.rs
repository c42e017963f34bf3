//! The rule engine: registration, event evaluation, and finding management.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use sentra_types::{Attributes, Severity};
use tracing::{debug, info};
use uuid::Uuid;

use crate::findings::{Finding, FindingKind, FindingStatus, MonitorError, Resolution};
use crate::rules::{RuleAction, RuleKind, RuleStats, WatchRule};

/// Receives the actions of a triggered rule. Implementations hook into the
/// surrounding system (session manager, notifier); the engine itself only
/// records findings.
pub trait ActionDispatcher: Send + Sync {
    fn dispatch(&self, action: RuleAction, finding: &Finding);
}

/// No-op dispatcher used when no integration is wired up.
struct NullDispatcher;

impl ActionDispatcher for NullDispatcher {
    fn dispatch(&self, _action: RuleAction, _finding: &Finding) {}
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Evaluates events against registered rules and tracks the findings they
/// raise.
pub struct RuleEngine {
    rules: RwLock<HashMap<String, WatchRule>>,
    stats: RwLock<HashMap<String, RuleStats>>,
    findings: RwLock<HashMap<Uuid, Finding>>,
    dispatcher: Arc<dyn ActionDispatcher>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
            stats: RwLock::new(HashMap::new()),
            findings: RwLock::new(HashMap::new()),
            dispatcher: Arc::new(NullDispatcher),
        }
    }

    /// Wires up an action dispatcher.
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn ActionDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    // ------------------------------------------------------------------------
    // Rule management
    // ------------------------------------------------------------------------

    /// Registers a rule. Fails on validation or a duplicate name.
    pub fn create_rule(&self, rule: WatchRule) -> Result<(), MonitorError> {
        rule.validate()?;
        let mut rules = write_lock(&self.rules);
        if rules.contains_key(&rule.name) {
            return Err(MonitorError::DuplicateRule(rule.name));
        }
        debug!(name = %rule.name, kind = ?rule.kind, "watch rule created");
        rules.insert(rule.name.clone(), rule);
        Ok(())
    }

    /// Replaces an existing rule in full. Its statistics are kept.
    pub fn update_rule(&self, rule: WatchRule) -> Result<(), MonitorError> {
        rule.validate()?;
        let mut rules = write_lock(&self.rules);
        if !rules.contains_key(&rule.name) {
            return Err(MonitorError::UnknownRule(rule.name));
        }
        rules.insert(rule.name.clone(), rule);
        Ok(())
    }

    pub fn get_rule(&self, name: &str) -> Option<WatchRule> {
        read_lock(&self.rules).get(name).cloned()
    }

    pub fn rule_stats(&self, name: &str) -> RuleStats {
        read_lock(&self.stats).get(name).copied().unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------------

    /// Evaluates one event against every active rule.
    ///
    /// Each triggered rule raises a finding (alert for monitoring rules,
    /// violation for compliance rules) carrying the event attributes as
    /// evidence, dispatches the rule's actions, and bumps its counters.
    /// Returns the findings raised, sorted by rule name for determinism.
    pub fn evaluate_event(&self, subject: Option<&str>, event: &Attributes) -> Vec<Finding> {
        let rules = read_lock(&self.rules);
        let mut triggered: Vec<&WatchRule> = rules
            .values()
            .filter(|rule| rule.active)
            .filter(|rule| rule.is_triggered_by(event))
            .collect();
        triggered.sort_by(|a, b| a.name.cmp(&b.name));

        let mut raised = Vec::with_capacity(triggered.len());
        for rule in triggered {
            let kind = match rule.kind {
                RuleKind::Monitoring => FindingKind::Alert,
                RuleKind::Compliance => FindingKind::Violation,
            };
            let mut finding = Finding::new(
                rule.name.clone(),
                kind,
                rule.severity,
                subject.map(ToString::to_string),
            )
            .with_evidence("triggering event", event.clone());
            finding.actions_taken = rule.actions.clone();

            info!(
                rule = %rule.name,
                kind = ?kind,
                severity = %rule.severity,
                "rule triggered"
            );
            for action in &rule.actions {
                self.dispatcher.dispatch(*action, &finding);
            }

            let mut stats = write_lock(&self.stats);
            let entry = stats.entry(rule.name.clone()).or_default();
            entry.times_triggered += 1;
            entry.last_triggered = Some(Utc::now());
            drop(stats);

            write_lock(&self.findings).insert(finding.id, finding.clone());
            raised.push(finding);
        }
        raised
    }

    /// Raises a finding outside rule evaluation (operator escalation,
    /// integrity failure). No rule statistics are touched.
    pub fn raise_finding(
        &self,
        source: &str,
        kind: FindingKind,
        severity: Severity,
        evidence: &str,
        attributes: Attributes,
    ) -> Finding {
        let finding =
            Finding::new(source, kind, severity, None).with_evidence(evidence, attributes);
        info!(source, ?kind, %severity, "finding raised manually");
        write_lock(&self.findings).insert(finding.id, finding.clone());
        finding
    }

    // ------------------------------------------------------------------------
    // Finding lifecycle
    // ------------------------------------------------------------------------

    pub fn get_finding(&self, id: Uuid) -> Option<Finding> {
        read_lock(&self.findings).get(&id).cloned()
    }

    /// Findings not yet in a terminal state, newest first.
    pub fn open_findings(&self) -> Vec<Finding> {
        let mut open: Vec<Finding> = read_lock(&self.findings)
            .values()
            .filter(|f| !f.status.is_terminal())
            .cloned()
            .collect();
        open.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        open
    }

    /// Moves a finding to `Investigating`.
    pub fn start_investigation(&self, id: Uuid) -> Result<(), MonitorError> {
        let mut findings = write_lock(&self.findings);
        let finding = findings.get_mut(&id).ok_or(MonitorError::UnknownFinding(id))?;
        finding.transition(FindingStatus::Investigating)
    }

    /// Closes a finding, feeding its rule's effectiveness counters.
    pub fn resolve_finding(
        &self,
        id: Uuid,
        resolution: Resolution,
        note: &str,
    ) -> Result<(), MonitorError> {
        let mut findings = write_lock(&self.findings);
        let finding = findings.get_mut(&id).ok_or(MonitorError::UnknownFinding(id))?;
        let status = match resolution {
            Resolution::Confirmed => FindingStatus::Resolved,
            Resolution::FalsePositive => FindingStatus::FalsePositive,
        };
        finding.transition(status)?;
        if !note.is_empty() {
            finding.add_note(note);
        }

        let mut stats = write_lock(&self.stats);
        let entry = stats.entry(finding.rule_name.clone()).or_default();
        match resolution {
            Resolution::Confirmed => entry.true_positives += 1,
            Resolution::FalsePositive => entry.false_positives += 1,
        }
        Ok(())
    }

    /// Escalates a finding's severity one step.
    pub fn escalate_finding(&self, id: Uuid) -> Result<Severity, MonitorError> {
        let mut findings = write_lock(&self.findings);
        let finding = findings.get_mut(&id).ok_or(MonitorError::UnknownFinding(id))?;
        finding.escalate();
        Ok(finding.severity)
    }
}

// ============================================================================
// Tests
// ============================================================================
