//! Entity change trails: field-level before/after diffs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::hash::trail_hash;
use crate::log::AuditError;

/// The mutation a trail records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// How one field changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// One field's before/after delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub kind: ChangeKind,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

/// Computes the field-level diff between two entity states.
///
/// `Create`: every after-field is `Created`. `Delete`: every before-field
/// is `Deleted`. `Update`: fields present only after are `Created`, only
/// before are `Deleted`, and fields whose serialized value differs are
/// `Updated`. Unchanged fields produce no entry. Non-object states are
/// treated as empty. Output is sorted by field name.
pub fn compute_changes(operation: Operation, before: &Value, after: &Value) -> Vec<FieldChange> {
    let empty = serde_json::Map::new();
    let before = before.as_object().unwrap_or(&empty);
    let after = after.as_object().unwrap_or(&empty);

    let mut changes = Vec::new();
    match operation {
        Operation::Create => {
            for (field, value) in after {
                changes.push(FieldChange {
                    field: field.clone(),
                    kind: ChangeKind::Created,
                    old_value: None,
                    new_value: Some(value.clone()),
                });
            }
        }
        Operation::Delete => {
            for (field, value) in before {
                changes.push(FieldChange {
                    field: field.clone(),
                    kind: ChangeKind::Deleted,
                    old_value: Some(value.clone()),
                    new_value: None,
                });
            }
        }
        Operation::Update => {
            for (field, old) in before {
                match after.get(field) {
                    None => changes.push(FieldChange {
                        field: field.clone(),
                        kind: ChangeKind::Deleted,
                        old_value: Some(old.clone()),
                        new_value: None,
                    }),
                    Some(new) if new != old => changes.push(FieldChange {
                        field: field.clone(),
                        kind: ChangeKind::Updated,
                        old_value: Some(old.clone()),
                        new_value: Some(new.clone()),
                    }),
                    Some(_) => {}
                }
            }
            for (field, new) in after {
                if !before.contains_key(field) {
                    changes.push(FieldChange {
                        field: field.clone(),
                        kind: ChangeKind::Created,
                        old_value: None,
                        new_value: Some(new.clone()),
                    });
                }
            }
        }
    }
    changes.sort_by(|a, b| a.field.cmp(&b.field));
    changes
}

/// A hashed record of one entity mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditTrail {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: String,
    pub operation: Operation,
    pub before: Value,
    pub after: Value,
    pub changes: Vec<FieldChange>,
    /// Why the mutation happened (ticket, approval, operator note).
    pub reason: String,
    pub created_at: DateTime<Utc>,
    /// Id of the correlated `DataModification` event, once emitted.
    pub event_id: Option<Uuid>,
    /// Hex SHA-256 over the trail's immutable fields.
    pub integrity_hash: String,
}

impl AuditTrail {
    /// Builds a trail, computing the change list and integrity hash.
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        operation: Operation,
        before: Value,
        after: Value,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, AuditError> {
        let changes = compute_changes(operation, &before, &after);
        let mut trail = Self {
            id: Uuid::new_v4(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            operation,
            before,
            after,
            changes,
            reason: reason.into(),
            created_at: now,
            event_id: None,
            integrity_hash: String::new(),
        };
        trail.integrity_hash = trail_hash(&trail)?;
        Ok(trail)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_single_field() {
        let changes = compute_changes(
            Operation::Update,
            &json!({ "email": "a" }),
            &json!({ "email": "b" }),
        );
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "email");
        assert_eq!(changes[0].kind, ChangeKind::Updated);
        assert_eq!(changes[0].old_value, Some(json!("a")));
        assert_eq!(changes[0].new_value, Some(json!("b")));
    }

    #[test]
    fn test_create_from_empty() {
        let changes = compute_changes(Operation::Create, &Value::Null, &json!({ "x": 1 }));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Created);
        assert_eq!(changes[0].new_value, Some(json!(1)));
        assert_eq!(changes[0].old_value, None);
    }

    #[test]
    fn test_delete_lists_every_field() {
        let changes = compute_changes(
            Operation::Delete,
            &json!({ "a": 1, "b": "two" }),
            &Value::Null,
        );
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.kind == ChangeKind::Deleted));
    }

    #[test]
    fn test_update_mixed_added_removed_unchanged() {
        let changes = compute_changes(
            Operation::Update,
            &json!({ "kept": 1, "removed": 2, "edited": "x" }),
            &json!({ "kept": 1, "edited": "y", "added": true }),
        );
        let kinds: Vec<(&str, ChangeKind)> = changes
            .iter()
            .map(|c| (c.field.as_str(), c.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("added", ChangeKind::Created),
                ("edited", ChangeKind::Updated),
                ("removed", ChangeKind::Deleted),
            ]
        );
    }

    #[test]
    fn test_identical_states_yield_no_changes() {
        let state = json!({ "a": 1, "b": [1, 2] });
        assert!(compute_changes(Operation::Update, &state, &state).is_empty());
    }

    #[test]
    fn test_trail_hash_covers_changes() {
        let now = Utc::now();
        let trail = AuditTrail::new(
            "user",
            "u-1",
            Operation::Update,
            json!({ "email": "a" }),
            json!({ "email": "b" }),
            "profile update",
            now,
        )
        .unwrap();
        assert_eq!(trail.integrity_hash, trail_hash(&trail).unwrap());

        let mut tampered = trail.clone();
        tampered.changes[0].new_value = Some(json!("c"));
        assert_ne!(trail_hash(&tampered).unwrap(), trail.integrity_hash);
    }
}
