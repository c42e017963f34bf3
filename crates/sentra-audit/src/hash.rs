//! Integrity hashing for audit events and trails.
//!
//! The digest covers exactly the immutable fields, serialized with
//! postcard. Postcard is canonical for a given digest struct -- no field
//! reordering, no whitespace, no optional-field ambiguity -- so equal
//! content always produces equal bytes, and therefore equal hashes.
//! `serde_json::Value` maps are ordered (BTreeMap-backed), keeping the
//! detail payload canonical too.

use chrono::{DateTime, Utc};
use sentra_types::Outcome;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::event::{AuditCategory, AuditEvent};
use crate::log::AuditError;
use crate::trail::{AuditTrail, FieldChange, Operation};

/// The hashed fields of an event, in fixed order. The id, retention date,
/// and archived flag are deliberately outside the digest: ids are random,
/// retention is derived, and archival is mutable bookkeeping.
#[derive(Serialize)]
struct EventDigest<'a> {
    category: AuditCategory,
    event_type: &'a str,
    timestamp: &'a DateTime<Utc>,
    subject: Option<&'a str>,
    resource: Option<&'a str>,
    action: &'a str,
    outcome: Outcome,
    details: &'a serde_json::Value,
}

/// Computes the hex SHA-256 integrity hash of an event's immutable fields.
pub fn event_hash(event: &AuditEvent) -> Result<String, AuditError> {
    let digest = EventDigest {
        category: event.category,
        event_type: &event.event_type,
        timestamp: &event.timestamp,
        subject: event.subject.as_deref(),
        resource: event.resource.as_deref(),
        action: &event.action,
        outcome: event.outcome,
        details: &event.details,
    };
    hash_canonical(&digest)
}

/// The hashed fields of a trail record.
#[derive(Serialize)]
struct TrailDigest<'a> {
    entity_type: &'a str,
    entity_id: &'a str,
    operation: Operation,
    changes: &'a [FieldChange],
    reason: &'a str,
    created_at: &'a DateTime<Utc>,
}

/// Computes the hex SHA-256 integrity hash of a trail's immutable fields.
pub fn trail_hash(trail: &AuditTrail) -> Result<String, AuditError> {
    let digest = TrailDigest {
        entity_type: &trail.entity_type,
        entity_id: &trail.entity_id,
        operation: trail.operation,
        changes: &trail.changes,
        reason: &trail.reason,
        created_at: &trail.created_at,
    };
    hash_canonical(&digest)
}

fn hash_canonical<T: Serialize>(digest: &T) -> Result<String, AuditError> {
    let bytes =
        postcard::to_allocvec(digest).map_err(|e| AuditError::Hashing(e.to_string()))?;
    let hash = Sha256::digest(&bytes);
    Ok(hash.iter().map(|b| format!("{b:02x}")).collect())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use sentra_types::Severity;
    use uuid::Uuid;

    fn event() -> AuditEvent {
        AuditEvent::draft(
            AuditCategory::DataAccess,
            "read",
            "read",
            Outcome::Success,
        )
        .with_subject("alice")
        .with_resource("content/articles/1")
        .with_severity(Severity::Low)
        .seal(Utc::now())
        .unwrap()
    }

    #[test]
    fn test_hash_is_stable_under_recompute() {
        let event = event();
        assert_eq!(event_hash(&event).unwrap(), event.integrity_hash);
        assert_eq!(event_hash(&event).unwrap(), event_hash(&event).unwrap());
    }

    #[test]
    fn test_hashed_field_changes_hash() {
        let sealed = event();
        let mut tampered = sealed.clone();
        tampered.subject = Some("mallory".to_string());
        assert_ne!(event_hash(&tampered).unwrap(), sealed.integrity_hash);

        let mut tampered = sealed.clone();
        tampered.outcome = Outcome::Failure;
        assert_ne!(event_hash(&tampered).unwrap(), sealed.integrity_hash);

        let mut tampered = sealed.clone();
        tampered.details = serde_json::json!({ "injected": true });
        assert_ne!(event_hash(&tampered).unwrap(), sealed.integrity_hash);
    }

    #[test]
    fn test_unhashed_metadata_does_not_change_hash() {
        let sealed = event();
        let mut touched = sealed.clone();
        touched.archived = true;
        touched.id = Uuid::new_v4();
        touched.correlation_id = Some(Uuid::new_v4());
        assert_eq!(event_hash(&touched).unwrap(), sealed.integrity_hash);
    }
}
