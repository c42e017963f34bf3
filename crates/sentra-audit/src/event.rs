//! Audit event model with per-category required context and retention.

use chrono::{DateTime, Duration, Utc};
use sentra_types::{Outcome, Severity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::event_hash;
use crate::log::AuditError;

// ============================================================================
// Categories
// ============================================================================

/// Audit event category. Each category statically fixes which context
/// fields an event must carry and how long it is retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditCategory {
    Authentication,
    Authorization,
    DataAccess,
    DataModification,
    Admin,
    Security,
    Compliance,
}

/// A context field an event category may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextField {
    /// `subject` must be set.
    Subject,
    /// `ip_address` must be set.
    Network,
    /// `resource` must be set.
    Resource,
}

impl AuditCategory {
    /// Context fields an event of this category must carry. Static
    /// configuration; a missing field is a hard validation error.
    pub fn required_context(&self) -> &'static [ContextField] {
        match self {
            AuditCategory::Authentication => &[ContextField::Subject, ContextField::Network],
            AuditCategory::Authorization => &[ContextField::Subject, ContextField::Resource],
            AuditCategory::DataAccess | AuditCategory::DataModification => {
                &[ContextField::Subject, ContextField::Resource]
            }
            AuditCategory::Admin => &[ContextField::Subject],
            // Security and compliance events may originate from the system
            // itself (integrity checks, scheduled scans) with no subject.
            AuditCategory::Security | AuditCategory::Compliance => &[],
        }
    }

    /// Retention period in days, from the per-category retention table.
    pub fn retention_days(&self) -> i64 {
        match self {
            AuditCategory::Authentication
            | AuditCategory::Authorization
            | AuditCategory::DataAccess => 365,
            AuditCategory::DataModification | AuditCategory::Admin => 730,
            AuditCategory::Security => 730,
            // Seven years for regulated compliance records.
            AuditCategory::Compliance => 2555,
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// A sealed audit event.
///
/// Immutable after creation except for the `archived` flag; every other
/// field listed in the digest is covered by `integrity_hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub category: AuditCategory,
    /// Free-form event type within the category (e.g. `login`, `decision`).
    pub event_type: String,
    pub severity: Severity,
    pub subject: Option<String>,
    pub session_id: Option<String>,
    pub ip_address: Option<String>,
    pub resource: Option<String>,
    pub action: String,
    pub outcome: Outcome,
    /// Structured detail payload.
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    /// Links related events (a decision and its trail, for example).
    pub correlation_id: Option<Uuid>,
    /// Derived from the category's retention table at seal time.
    pub retention_until: DateTime<Utc>,
    /// Set once the retention period has lapsed; excluded from the hash.
    pub archived: bool,
    /// Hex SHA-256 over the event's immutable fields.
    pub integrity_hash: String,
}

impl AuditEvent {
    /// Starts building an event.
    pub fn draft(
        category: AuditCategory,
        event_type: impl Into<String>,
        action: impl Into<String>,
        outcome: Outcome,
    ) -> AuditEventDraft {
        AuditEventDraft {
            category,
            event_type: event_type.into(),
            severity: Severity::Low,
            subject: None,
            session_id: None,
            ip_address: None,
            resource: None,
            action: action.into(),
            outcome,
            details: serde_json::Value::Null,
            correlation_id: None,
        }
    }
}

/// An unsealed event under construction.
#[derive(Debug, Clone)]
pub struct AuditEventDraft {
    pub category: AuditCategory,
    pub event_type: String,
    pub severity: Severity,
    pub subject: Option<String>,
    pub session_id: Option<String>,
    pub ip_address: Option<String>,
    pub resource: Option<String>,
    pub action: String,
    pub outcome: Outcome,
    pub details: serde_json::Value,
    pub correlation_id: Option<Uuid>,
}

impl AuditEventDraft {
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    pub fn with_session(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    pub fn with_ip_address(mut self, ip: &str) -> Self {
        self.ip_address = Some(ip.to_string());
        self
    }

    pub fn with_resource(mut self, resource: &str) -> Self {
        self.resource = Some(resource.to_string());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_correlation(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Validates required context, stamps the timestamp and retention
    /// date, and computes the integrity hash. The returned event is final.
    pub fn seal(self, now: DateTime<Utc>) -> Result<AuditEvent, AuditError> {
        for field in self.category.required_context() {
            let present = match field {
                ContextField::Subject => self.subject.is_some(),
                ContextField::Network => self.ip_address.is_some(),
                ContextField::Resource => self.resource.is_some(),
            };
            if !present {
                return Err(AuditError::MissingContext {
                    category: self.category,
                    field: *field,
                });
            }
        }

        let mut event = AuditEvent {
            id: Uuid::new_v4(),
            category: self.category,
            event_type: self.event_type,
            severity: self.severity,
            subject: self.subject,
            session_id: self.session_id,
            ip_address: self.ip_address,
            resource: self.resource,
            action: self.action,
            outcome: self.outcome,
            details: self.details,
            timestamp: now,
            correlation_id: self.correlation_id,
            retention_until: now + Duration::days(self.category.retention_days()),
            archived: false,
            integrity_hash: String::new(),
        };
        event.integrity_hash = event_hash(&event)?;
        Ok(event)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_seal_stamps_hash_and_retention() {
        let now = Utc::now();
        let event = AuditEvent::draft(
            AuditCategory::Authentication,
            "login",
            "authenticate",
            Outcome::Success,
        )
        .with_subject("alice")
        .with_ip_address("10.0.0.7")
        .seal(now)
        .unwrap();

        assert_eq!(event.integrity_hash.len(), 64, "hex sha-256");
        assert_eq!(event.retention_until, now + Duration::days(365));
        assert!(!event.archived);
    }

    #[test]
    fn test_missing_required_context_rejected() {
        let err = AuditEvent::draft(
            AuditCategory::Authentication,
            "login",
            "authenticate",
            Outcome::Failure,
        )
        .with_subject("alice")
        // no ip_address
        .seal(Utc::now())
        .unwrap_err();
        assert!(matches!(
            err,
            AuditError::MissingContext {
                category: AuditCategory::Authentication,
                field: ContextField::Network,
            }
        ));
    }

    #[test]
    fn test_security_category_needs_no_context() {
        let event = AuditEvent::draft(
            AuditCategory::Security,
            "integrity_check",
            "verify",
            Outcome::Failure,
        )
        .with_severity(Severity::Critical)
        .seal(Utc::now())
        .unwrap();
        assert!(event.subject.is_none());
    }

    #[test_case(AuditCategory::Authentication, 365)]
    #[test_case(AuditCategory::DataModification, 730)]
    #[test_case(AuditCategory::Compliance, 2555)]
    fn test_retention_table(category: AuditCategory, days: i64) {
        assert_eq!(category.retention_days(), days);
    }

    #[test]
    fn test_identical_drafts_hash_identically_at_same_instant() {
        let now = Utc::now();
        let draft = || {
            AuditEvent::draft(
                AuditCategory::DataAccess,
                "read",
                "read",
                Outcome::Success,
            )
            .with_subject("alice")
            .with_resource("content/articles/1")
        };
        let a = draft().seal(now).unwrap();
        let b = draft().seal(now).unwrap();
        // The id is not part of the digest; content decides the hash.
        assert_eq!(a.integrity_hash, b.integrity_hash);
    }
}
