//! Append-only audit log with integrity verification.

use chrono::{DateTime, Utc};
use sentra_types::Outcome;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use crate::event::{AuditCategory, AuditEvent, AuditEventDraft, ContextField};
use crate::hash::{event_hash, trail_hash};
use crate::trail::{AuditTrail, Operation};

/// Errors from writing to or verifying the audit log.
#[derive(Debug, Error)]
pub enum AuditError {
    /// A category-required context field is absent; nothing was written.
    #[error("category {category:?} requires context field {field:?}")]
    MissingContext {
        category: AuditCategory,
        field: ContextField,
    },

    /// The digest could not be serialized.
    #[error("integrity hashing failed: {0}")]
    Hashing(String),

    /// Export serialization failed.
    #[error("export failed: {0}")]
    Export(#[from] serde_json::Error),
}

// ============================================================================
// Query Filter
// ============================================================================

/// Filter for [`AuditLog::query`]. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub category: Option<AuditCategory>,
    pub subject: Option<String>,
    pub outcome: Option<Outcome>,
    pub correlation_id: Option<Uuid>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Cap on returned events; newest are kept when truncating.
    pub limit: Option<usize>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: AuditCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    pub fn outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn correlation(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    pub fn between(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, event: &AuditEvent) -> bool {
        self.category.map_or(true, |c| event.category == c)
            && self
                .subject
                .as_ref()
                .map_or(true, |s| event.subject.as_deref() == Some(s.as_str()))
            && self.outcome.map_or(true, |o| event.outcome == o)
            && self
                .correlation_id
                .map_or(true, |id| event.correlation_id == Some(id))
            && self.since.map_or(true, |t| event.timestamp >= t)
            && self.until.map_or(true, |t| event.timestamp < t)
    }
}

// ============================================================================
// Integrity Report
// ============================================================================

/// Outcome of an integrity verification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Events whose recomputed hash matched.
    pub verified: Vec<Uuid>,
    /// Events whose recomputed hash did NOT match the stored hash.
    pub failed: Vec<Uuid>,
    /// Requested ids with no stored event.
    pub missing: Vec<Uuid>,
}

impl IntegrityReport {
    /// Whether every requested event verified cleanly.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.missing.is_empty()
    }
}

// ============================================================================
// Audit Log
// ============================================================================

/// Append-only in-memory audit store. Durable persistence is an external
/// collaborator; this log is the integrity-bearing working set.
#[derive(Debug, Default)]
pub struct AuditLog {
    events: RwLock<Vec<AuditEvent>>,
    trails: RwLock<Vec<AuditTrail>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seals and appends an event. At-most-once: validation and hashing
    /// happen before the write lock, and the append is a single push.
    pub fn append(&self, draft: AuditEventDraft) -> Result<AuditEvent, AuditError> {
        let event = draft.seal(Utc::now())?;
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(event)
    }

    pub fn get(&self, id: Uuid) -> Option<AuditEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    /// Events matching the filter, oldest first. With a limit, the newest
    /// matching events are returned.
    pub fn query(&self, filter: &EventFilter) -> Vec<AuditEvent> {
        let events = self.events.read().unwrap_or_else(PoisonError::into_inner);
        let mut matched: Vec<AuditEvent> = events
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        if let Some(limit) = filter.limit {
            if matched.len() > limit {
                matched.drain(..matched.len() - limit);
            }
        }
        matched
    }

    /// Serializes matching events as pretty JSON for export.
    pub fn export_json(&self, filter: &EventFilter) -> Result<String, AuditError> {
        Ok(serde_json::to_string_pretty(&self.query(filter))?)
    }

    /// Recomputes each requested event's hash and compares it to the
    /// stored hash. Mismatches are reported, never repaired; each is also
    /// logged at error level so the failure cannot pass silently.
    pub fn verify_integrity(&self, ids: &[Uuid]) -> IntegrityReport {
        let events = self.events.read().unwrap_or_else(PoisonError::into_inner);
        let mut report = IntegrityReport::default();
        for id in ids {
            let Some(event) = events.iter().find(|e| e.id == *id) else {
                report.missing.push(*id);
                continue;
            };
            match event_hash(event) {
                Ok(recomputed) if recomputed == event.integrity_hash => {
                    report.verified.push(*id);
                }
                Ok(_) => {
                    error!(event_id = %id, "audit event integrity hash mismatch");
                    report.failed.push(*id);
                }
                Err(err) => {
                    error!(event_id = %id, error = %err, "audit event could not be rehashed");
                    report.failed.push(*id);
                }
            }
        }
        report
    }

    /// Verifies every stored event.
    pub fn verify_all(&self) -> IntegrityReport {
        let ids: Vec<Uuid> = self
            .events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|e| e.id)
            .collect();
        self.verify_integrity(&ids)
    }

    /// Records an entity mutation: builds the hashed trail and emits a
    /// correlated `DataModification` event carrying the change summary.
    pub fn create_trail(
        &self,
        entity_type: &str,
        entity_id: &str,
        operation: Operation,
        before: Value,
        after: Value,
        actor: &str,
        reason: &str,
    ) -> Result<AuditTrail, AuditError> {
        let mut trail = AuditTrail::new(
            entity_type,
            entity_id,
            operation,
            before,
            after,
            reason,
            Utc::now(),
        )?;

        let event = self.append(
            AuditEvent::draft(
                AuditCategory::DataModification,
                "entity_change",
                format!("{operation:?}").to_lowercase(),
                Outcome::Success,
            )
            .with_subject(actor)
            .with_resource(&format!("{entity_type}/{entity_id}"))
            .with_details(serde_json::json!({
                "trail_id": trail.id,
                "changed_fields": trail.changes.iter().map(|c| c.field.clone()).collect::<Vec<_>>(),
            }))
            .with_correlation(trail.id),
        )?;

        trail.event_id = Some(event.id);
        self.trails
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(trail.clone());
        Ok(trail)
    }

    /// Trails recorded for one entity, oldest first.
    pub fn trails_for(&self, entity_type: &str, entity_id: &str) -> Vec<AuditTrail> {
        self.trails
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|t| t.entity_type == entity_type && t.entity_id == entity_id)
            .cloned()
            .collect()
    }

    /// Verifies every stored trail's hash; returns ids of corrupted trails.
    pub fn verify_trails(&self) -> Vec<Uuid> {
        self.trails
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|t| {
                trail_hash(t).map_or(true, |recomputed| recomputed != t.integrity_hash)
            })
            .map(|t| t.id)
            .collect()
    }

    /// Marks events past their retention date as archived. Archival is the
    /// only permitted post-seal mutation and is outside the hash.
    pub fn archive_expired(&self, now: DateTime<Utc>) -> usize {
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        let mut archived = 0;
        for event in events.iter_mut() {
            if !event.archived && event.retention_until <= now {
                event.archived = true;
                archived += 1;
            }
        }
        archived
    }

    pub fn len(&self) -> usize {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Test hook: corrupts a stored event's field in place to exercise
    /// integrity detection.
    #[cfg(test)]
    fn tamper_subject(&self, id: Uuid, subject: &str) {
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(event) = events.iter_mut().find(|e| e.id == id) {
            event.subject = Some(subject.to_string());
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trail::ChangeKind;
    use sentra_types::Severity;
    use serde_json::json;

    fn login_draft(subject: &str, outcome: Outcome) -> AuditEventDraft {
        AuditEvent::draft(AuditCategory::Authentication, "login", "authenticate", outcome)
            .with_subject(subject)
            .with_ip_address("10.0.0.7")
    }

    #[test]
    fn test_append_rejects_missing_context_without_writing() {
        let log = AuditLog::new();
        let draft = AuditEvent::draft(
            AuditCategory::Authorization,
            "decision",
            "read",
            Outcome::Success,
        )
        .with_subject("alice");
        // no resource
        assert!(log.append(draft).is_err());
        assert!(log.is_empty(), "a rejected event must not be written");
    }

    #[test]
    fn test_query_filters() {
        let log = AuditLog::new();
        log.append(login_draft("alice", Outcome::Success)).unwrap();
        log.append(login_draft("alice", Outcome::Failure)).unwrap();
        log.append(login_draft("bob", Outcome::Success)).unwrap();

        let alice = log.query(&EventFilter::new().subject("alice"));
        assert_eq!(alice.len(), 2);

        let failures = log.query(
            &EventFilter::new()
                .category(AuditCategory::Authentication)
                .outcome(Outcome::Failure),
        );
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].subject.as_deref(), Some("alice"));

        let limited = log.query(&EventFilter::new().limit(2));
        assert_eq!(limited.len(), 2);
        assert_eq!(
            limited[1].subject.as_deref(),
            Some("bob"),
            "limit keeps the newest events"
        );
    }

    #[test]
    fn test_untouched_events_verify_clean() {
        let log = AuditLog::new();
        let a = log.append(login_draft("alice", Outcome::Success)).unwrap();
        let b = log.append(login_draft("bob", Outcome::Success)).unwrap();

        let report = log.verify_integrity(&[a.id, b.id]);
        assert!(report.is_clean());
        assert_eq!(report.verified.len(), 2);
    }

    #[test]
    fn test_tampering_is_detected() {
        let log = AuditLog::new();
        let clean = log.append(login_draft("alice", Outcome::Success)).unwrap();
        let dirty = log.append(login_draft("bob", Outcome::Success)).unwrap();
        log.tamper_subject(dirty.id, "mallory");

        let report = log.verify_integrity(&[clean.id, dirty.id]);
        assert!(!report.is_clean());
        assert_eq!(report.verified, vec![clean.id]);
        assert_eq!(report.failed, vec![dirty.id]);
    }

    #[test]
    fn test_unknown_ids_reported_missing() {
        let log = AuditLog::new();
        let ghost = Uuid::new_v4();
        let report = log.verify_integrity(&[ghost]);
        assert_eq!(report.missing, vec![ghost]);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_create_trail_emits_correlated_event() {
        let log = AuditLog::new();
        let trail = log
            .create_trail(
                "user",
                "u-1",
                Operation::Update,
                json!({ "email": "a" }),
                json!({ "email": "b" }),
                "admin",
                "support ticket 4411",
            )
            .unwrap();

        assert_eq!(trail.changes.len(), 1);
        assert_eq!(trail.changes[0].kind, ChangeKind::Updated);

        let event = log.get(trail.event_id.unwrap()).unwrap();
        assert_eq!(event.category, AuditCategory::DataModification);
        assert_eq!(event.correlation_id, Some(trail.id));
        assert_eq!(event.resource.as_deref(), Some("user/u-1"));

        // Queryable by correlation id.
        let correlated = log.query(&EventFilter::new().correlation(trail.id));
        assert_eq!(correlated.len(), 1);

        assert!(log.verify_trails().is_empty());
    }

    #[test]
    fn test_archive_expired_only_past_retention() {
        let log = AuditLog::new();
        log.append(login_draft("alice", Outcome::Success)).unwrap();

        assert_eq!(log.archive_expired(Utc::now()), 0);
        let far_future = Utc::now() + chrono::Duration::days(400);
        assert_eq!(log.archive_expired(far_future), 1);
        // Archival does not break integrity.
        assert!(log.verify_all().is_clean());
        // Idempotent.
        assert_eq!(log.archive_expired(far_future), 0);
    }

    #[test]
    fn test_export_json_round_trips() {
        let log = AuditLog::new();
        let event = log.append(
            login_draft("alice", Outcome::Success)
                .with_severity(Severity::Medium)
                .with_session("sess-9"),
        )
        .unwrap();

        let json = log.export_json(&EventFilter::new()).unwrap();
        let parsed: Vec<AuditEvent> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, vec![event]);
    }
}
