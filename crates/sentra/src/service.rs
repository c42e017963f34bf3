//! The Sentra service: one struct wiring the decision engine, rule engine,
//! and audit log behind the caller-facing API.
//!
//! Every administrative mutation validates first, applies atomically, and
//! writes an `Admin` audit event. Every freshly computed decision writes an
//! `Authorization` audit event; cache hits do not (the original event
//! already covers them). Integrity failures raise a CRITICAL violation and
//! are forwarded to the event sink -- detection is loud by construction.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use sentra_audit::{
    AuditError, AuditEvent, AuditEventDraft, AuditLog, AuditTrail, EventFilter, IntegrityReport,
    Operation,
};
use sentra_eval::{risk_score, Anomaly};
use sentra_monitor::{Finding, FindingKind, MonitorError, Resolution, RuleEngine, WatchRule};
use sentra_policy::engine::signals_from_attributes;
use sentra_policy::{
    AccessRequest, AttributeResolver, Decision, DecisionEngine, Permission, Policy, PolicyError,
    RequestError, RequestKind, RequestStatus, Role, Urgency,
};
use sentra_types::{Attributes, Outcome, ResourceId, Severity, SubjectId};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::collaborators::{EventSink, NullSink, SinkEvent};

/// Risk score at or above which a permitted decision is still forwarded to
/// the event sink.
const HIGH_RISK_THRESHOLD: f64 = 75.0;

/// Errors surfaced by the service API.
#[derive(Debug, Error)]
pub enum SentraError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("unknown access request: {0}")]
    UnknownRequest(Uuid),
}

pub type Result<T> = std::result::Result<T, SentraError>;

/// The assembled access-decision and audit-integrity core.
pub struct Sentra {
    engine: DecisionEngine,
    monitor: RuleEngine,
    audit: AuditLog,
    resolver: Arc<dyn AttributeResolver>,
    sink: Arc<dyn EventSink>,
    requests: RwLock<HashMap<Uuid, AccessRequest>>,
}

impl Sentra {
    pub fn new(resolver: Arc<dyn AttributeResolver>) -> Self {
        Self {
            engine: DecisionEngine::new(Arc::clone(&resolver)),
            monitor: RuleEngine::new(),
            audit: AuditLog::new(),
            resolver,
            sink: Arc::new(NullSink),
            requests: RwLock::new(HashMap::new()),
        }
    }

    /// Wires up the event sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn monitor(&self) -> &RuleEngine {
        &self.monitor
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    // ------------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------------

    pub fn create_permission(&self, actor: &str, permission: Permission) -> Result<()> {
        let name = permission.name.clone();
        self.engine.create_permission(permission)?;
        self.audit_admin(actor, "create_permission", &name);
        Ok(())
    }

    pub fn create_role(&self, actor: &str, role: Role) -> Result<()> {
        let name = role.name.clone();
        self.engine.create_role(role)?;
        self.audit_admin(actor, "create_role", &name);
        Ok(())
    }

    pub fn assign_role(&self, actor: &str, role_name: &str, subject: &str) -> Result<()> {
        self.engine.assign_role(role_name, subject)?;
        self.audit_admin(actor, "assign_role", &format!("{role_name}->{subject}"));
        Ok(())
    }

    pub fn create_policy(&self, actor: &str, policy: Policy) -> Result<()> {
        let name = policy.name.clone();
        self.engine.create_policy(policy)?;
        self.audit_admin(actor, "create_policy", &name);
        Ok(())
    }

    pub fn create_rule(&self, actor: &str, rule: WatchRule) -> Result<()> {
        let name = rule.name.clone();
        self.monitor.create_rule(rule)?;
        self.audit_admin(actor, "create_rule", &name);
        Ok(())
    }

    /// Admin mutations are audited best-effort: the mutation already
    /// applied, so an audit write failure is logged, not unwound.
    fn audit_admin(&self, actor: &str, action: &str, target: &str) {
        let draft = AuditEvent::draft(
            sentra_audit::AuditCategory::Admin,
            "administration",
            action,
            Outcome::Success,
        )
        .with_subject(actor)
        .with_details(serde_json::json!({ "target": target }));
        if let Err(err) = self.audit.append(draft) {
            warn!(actor, action, error = %err, "admin audit write failed");
        }
    }

    // ------------------------------------------------------------------------
    // Decisions
    // ------------------------------------------------------------------------

    /// Evaluates an access request and audits the outcome.
    pub fn evaluate_access(
        &self,
        subject: &SubjectId,
        resource: &ResourceId,
        action: &str,
    ) -> Decision {
        self.evaluate_access_with_anomalies(subject, resource, action, &[])
    }

    /// Evaluates an access request with detector-supplied anomalies folded
    /// into the risk score.
    pub fn evaluate_access_with_anomalies(
        &self,
        subject: &SubjectId,
        resource: &ResourceId,
        action: &str,
        anomalies: &[Anomaly],
    ) -> Decision {
        let decision =
            self.engine
                .evaluate_access_with_anomalies(subject, resource, action, anomalies);

        if !decision.cached {
            self.audit_decision(subject, resource, action, &decision);
        }
        if decision.effect == sentra_policy::Effect::Deny
            || decision.risk_score >= HIGH_RISK_THRESHOLD
        {
            self.sink.emit(SinkEvent {
                category: "decision".to_string(),
                severity: if decision.degraded {
                    Severity::High
                } else {
                    Severity::Medium
                },
                title: format!("{:?} {subject} -> {resource} ({action})", decision.effect),
                description: decision.reason.clone(),
                metadata: serde_json::json!({
                    "decision_id": decision.id,
                    "risk_score": decision.risk_score,
                }),
            });
        }
        decision
    }

    fn audit_decision(
        &self,
        subject: &SubjectId,
        resource: &ResourceId,
        action: &str,
        decision: &Decision,
    ) {
        let (event_type, outcome, severity) = if decision.degraded {
            ("degraded_decision", Outcome::Failure, Severity::High)
        } else if decision.is_permit() {
            ("access_decision", Outcome::Success, Severity::Low)
        } else {
            ("access_decision", Outcome::Failure, Severity::Medium)
        };
        let draft = AuditEvent::draft(
            sentra_audit::AuditCategory::Authorization,
            event_type,
            action,
            outcome,
        )
        .with_subject(subject.as_str())
        .with_resource(resource.as_str())
        .with_severity(severity)
        .with_correlation(decision.id)
        .with_details(serde_json::json!({
            "effect": format!("{:?}", decision.effect),
            "reason": decision.reason,
            "risk_score": decision.risk_score,
            "policies_evaluated": decision.policies_evaluated,
        }));
        if let Err(err) = self.audit.append(draft) {
            warn!(%subject, %resource, action, error = %err, "decision audit write failed");
        }
    }

    // ------------------------------------------------------------------------
    // Access requests
    // ------------------------------------------------------------------------

    /// Opens an access request, computing its risk score from the
    /// requester's current attributes. Temporary elevations are capped by
    /// the target role's `max_temporary_hours`.
    #[allow(clippy::too_many_arguments)]
    pub fn create_access_request(
        &self,
        kind: RequestKind,
        subject: &str,
        target: &str,
        justification: &str,
        urgency: Urgency,
        duration_hours: Option<u32>,
        required_approvers: Vec<String>,
    ) -> Result<AccessRequest> {
        let max_hours = if kind == RequestKind::TemporaryElevation {
            self.engine
                .store()
                .get_role(target)
                .and_then(|r| r.constraints.max_temporary_hours)
        } else {
            None
        };

        let mut request = AccessRequest::new(
            kind,
            subject,
            target,
            justification,
            urgency,
            duration_hours,
            max_hours,
            required_approvers,
        )?;
        request.risk_score = self.request_risk(subject);

        self.requests
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(request.id, request.clone());
        self.audit_admin(subject, "create_access_request", target);
        Ok(request)
    }

    /// Risk context for a request; `None` when the resolver is down.
    fn request_risk(&self, subject: &str) -> Option<f64> {
        let subject_attrs = self
            .resolver
            .subject_attributes(&SubjectId::new(subject))
            .ok()?;
        let environment = self.resolver.environment_attributes().ok()?;
        let merged = Attributes::new()
            .with_nested("subject", subject_attrs)
            .with_nested("environment", environment);
        Some(risk_score(&signals_from_attributes(&merged), &[]))
    }

    /// Records an approver's vote. An approved role assignment is applied
    /// immediately.
    pub fn approve_request(
        &self,
        id: Uuid,
        approver: &str,
        approved: bool,
        comment: &str,
    ) -> Result<RequestStatus> {
        let mut requests = self.requests.write().unwrap_or_else(PoisonError::into_inner);
        let request = requests.get_mut(&id).ok_or(SentraError::UnknownRequest(id))?;
        let status = request.record_approval(approver, approved, comment)?;
        let (kind, subject, target) =
            (request.kind.clone(), request.subject.clone(), request.target.clone());
        drop(requests);

        if status == RequestStatus::Approved && kind == RequestKind::RoleAssignment {
            self.engine.assign_role(&target, &subject)?;
            self.audit_admin(approver, "apply_approved_request", &target);
        }
        Ok(status)
    }

    pub fn get_request(&self, id: Uuid) -> Option<AccessRequest> {
        self.requests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    // ------------------------------------------------------------------------
    // Monitoring
    // ------------------------------------------------------------------------

    /// Runs an event through the monitoring/compliance rules, forwarding
    /// every finding to the event sink.
    pub fn analyze_event(&self, subject: Option<&str>, event: &Attributes) -> Vec<Finding> {
        let findings = self.monitor.evaluate_event(subject, event);
        for finding in &findings {
            self.sink.emit(SinkEvent {
                category: match finding.kind {
                    FindingKind::Alert => "alert".to_string(),
                    FindingKind::Violation => "violation".to_string(),
                },
                severity: finding.severity,
                title: finding.rule_name.clone(),
                description: format!("rule '{}' triggered", finding.rule_name),
                metadata: serde_json::json!({ "finding_id": finding.id }),
            });
        }
        findings
    }

    /// Closes a finding, feeding the originating rule's statistics.
    pub fn resolve_finding(&self, id: Uuid, resolution: Resolution, note: &str) -> Result<()> {
        self.monitor.resolve_finding(id, resolution, note)?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Audit
    // ------------------------------------------------------------------------

    pub fn log_audit_event(&self, draft: AuditEventDraft) -> Result<AuditEvent> {
        Ok(self.audit.append(draft)?)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_audit_trail(
        &self,
        entity_type: &str,
        entity_id: &str,
        operation: Operation,
        before: serde_json::Value,
        after: serde_json::Value,
        actor: &str,
        reason: &str,
    ) -> Result<AuditTrail> {
        Ok(self
            .audit
            .create_trail(entity_type, entity_id, operation, before, after, actor, reason)?)
    }

    pub fn query_audit_events(&self, filter: &EventFilter) -> Vec<AuditEvent> {
        self.audit.query(filter)
    }

    /// Verifies event integrity. Any mismatch raises a CRITICAL violation
    /// finding, emits to the sink, and writes a Security audit event --
    /// the failure is reported on every channel, never corrected.
    pub fn verify_integrity(&self, ids: &[Uuid]) -> IntegrityReport {
        let report = self.audit.verify_integrity(ids);
        if !report.failed.is_empty() {
            let finding = self.monitor.raise_finding(
                "audit-integrity",
                FindingKind::Violation,
                Severity::Critical,
                "stored audit events failed hash verification",
                Attributes::new().with(
                    "failed_event_ids",
                    report
                        .failed
                        .iter()
                        .map(|id| id.to_string())
                        .collect::<Vec<_>>(),
                ),
            );
            self.sink.emit(SinkEvent {
                category: "violation".to_string(),
                severity: Severity::Critical,
                title: "audit integrity failure".to_string(),
                description: format!("{} event(s) failed verification", report.failed.len()),
                metadata: serde_json::json!({ "finding_id": finding.id }),
            });
            let draft = AuditEvent::draft(
                sentra_audit::AuditCategory::Security,
                "integrity_check",
                "verify",
                Outcome::Failure,
            )
            .with_severity(Severity::Critical)
            .with_details(serde_json::json!({
                "failed": report.failed,
                "missing": report.missing,
            }));
            if let Err(err) = self.audit.append(draft) {
                warn!(error = %err, "integrity-failure audit write failed");
            }
        }
        report
    }
}

// ============================================================================
// Tests
// ============================================================================
