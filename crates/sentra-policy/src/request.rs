//! Access request workflow.
//!
//! Subjects request grants they do not hold -- a permission, a role, or a
//! temporary elevation -- and named approvers vote. One denial resolves the
//! request as denied; the request is approved only when every required
//! approver has approved. Status history is append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Minimum length of a request justification.
const MIN_JUSTIFICATION_LEN: usize = 20;

/// Errors from creating or advancing an access request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The justification is missing or too short to be meaningful.
    #[error("justification must be at least {MIN_JUSTIFICATION_LEN} characters")]
    JustificationTooShort,

    /// Temporary elevation requests must carry a duration.
    #[error("temporary elevation requires a duration in hours")]
    MissingDuration,

    /// The requested duration exceeds the allowed maximum.
    #[error("requested duration {requested}h exceeds the maximum of {max}h")]
    DurationTooLong { requested: u32, max: u32 },

    /// The voter is not one of the request's required approvers.
    #[error("'{0}' is not a required approver for this request")]
    UnknownApprover(String),

    /// The approver has already voted on this request.
    #[error("'{0}' has already voted")]
    DuplicateApproval(String),

    /// The request has already reached a terminal status.
    #[error("request is already {0:?}")]
    AlreadyResolved(RequestStatus),
}

/// What the subject is asking for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// A standing permission grant, named by `resource:action`.
    PermissionGrant,
    /// Assignment into a role.
    RoleAssignment,
    /// Time-boxed elevation into a role; expires automatically.
    TemporaryElevation,
}

/// Requester-declared urgency; informational, never skips approvals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Normal,
    High,
    Emergency,
}

/// Lifecycle status of a request. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Denied,
    /// The request sat pending past its review deadline.
    Expired,
    Cancelled,
}

/// One approver's recorded vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub approver: String,
    pub approved: bool,
    #[serde(default)]
    pub comment: String,
    pub at: DateTime<Utc>,
}

/// One entry in the append-only status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: RequestStatus,
    pub at: DateTime<Utc>,
    pub note: String,
}

/// A pending or resolved access request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub id: Uuid,
    pub kind: RequestKind,
    /// Subject the grant is for.
    pub subject: String,
    /// Name of the permission or role requested.
    pub target: String,
    pub justification: String,
    pub urgency: Urgency,
    /// Hours the elevation lasts; required for temporary elevation.
    pub duration_hours: Option<u32>,
    /// Approvers who must all approve before the request is granted.
    pub required_approvers: Vec<String>,
    pub approvals: Vec<ApprovalRecord>,
    /// Risk score computed for the request at creation, when available.
    pub risk_score: Option<f64>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Append-only status history, starting with `Pending`.
    pub history: Vec<StatusChange>,
}

impl AccessRequest {
    /// Creates a pending request.
    ///
    /// Fails if the justification is shorter than 20 characters, or if a
    /// temporary elevation carries no duration (or one longer than `max`
    /// when a cap is supplied).
    pub fn new(
        kind: RequestKind,
        subject: impl Into<String>,
        target: impl Into<String>,
        justification: impl Into<String>,
        urgency: Urgency,
        duration_hours: Option<u32>,
        max_duration_hours: Option<u32>,
        required_approvers: Vec<String>,
    ) -> Result<Self, RequestError> {
        let justification = justification.into();
        if justification.trim().len() < MIN_JUSTIFICATION_LEN {
            return Err(RequestError::JustificationTooShort);
        }
        if kind == RequestKind::TemporaryElevation {
            let requested = duration_hours.ok_or(RequestError::MissingDuration)?;
            if let Some(max) = max_duration_hours {
                if requested > max {
                    return Err(RequestError::DurationTooLong { requested, max });
                }
            }
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            subject: subject.into(),
            target: target.into(),
            justification,
            urgency,
            duration_hours,
            required_approvers,
            approvals: Vec::new(),
            risk_score: None,
            status: RequestStatus::Pending,
            created_at: now,
            resolved_at: None,
            history: vec![StatusChange {
                status: RequestStatus::Pending,
                at: now,
                note: "request created".to_string(),
            }],
        })
    }

    /// Records a vote from a required approver.
    ///
    /// A single denial resolves the request as `Denied`. The request
    /// becomes `Approved` once every required approver has approved.
    pub fn record_approval(
        &mut self,
        approver: &str,
        approved: bool,
        comment: &str,
    ) -> Result<RequestStatus, RequestError> {
        if self.status != RequestStatus::Pending {
            return Err(RequestError::AlreadyResolved(self.status));
        }
        if !self.required_approvers.iter().any(|a| a == approver) {
            return Err(RequestError::UnknownApprover(approver.to_string()));
        }
        if self.approvals.iter().any(|a| a.approver == approver) {
            return Err(RequestError::DuplicateApproval(approver.to_string()));
        }

        let now = Utc::now();
        self.approvals.push(ApprovalRecord {
            approver: approver.to_string(),
            approved,
            comment: comment.to_string(),
            at: now,
        });

        if !approved {
            self.resolve(RequestStatus::Denied, now, &format!("denied by {approver}"));
        } else if self.all_approved() {
            self.resolve(RequestStatus::Approved, now, "all approvers approved");
        }
        Ok(self.status)
    }

    /// Cancels a pending request (requester withdrew it).
    pub fn cancel(&mut self, note: &str) -> Result<(), RequestError> {
        if self.status != RequestStatus::Pending {
            return Err(RequestError::AlreadyResolved(self.status));
        }
        self.resolve(RequestStatus::Cancelled, Utc::now(), note);
        Ok(())
    }

    /// Expires a request still pending at `deadline`. No-op before the
    /// deadline or once resolved.
    pub fn expire_if_pending(&mut self, deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if self.status != RequestStatus::Pending || now < deadline {
            return false;
        }
        self.resolve(RequestStatus::Expired, now, "review deadline passed");
        true
    }

    fn all_approved(&self) -> bool {
        self.required_approvers.iter().all(|required| {
            self.approvals
                .iter()
                .any(|a| a.approver == *required && a.approved)
        })
    }

    fn resolve(&mut self, status: RequestStatus, at: DateTime<Utc>, note: &str) {
        self.status = status;
        self.resolved_at = Some(at);
        self.history.push(StatusChange {
            status,
            at,
            note: note.to_string(),
        });
    }

    /// Instant a granted temporary elevation lapses.
    pub fn elevation_expires_at(&self) -> Option<DateTime<Utc>> {
        if self.kind != RequestKind::TemporaryElevation || self.status != RequestStatus::Approved
        {
            return None;
        }
        let hours = i64::from(self.duration_hours?);
        self.resolved_at
            .map(|at| at + chrono::Duration::hours(hours))
    }
}

// ============================================================================
// Tests
// ============================================================================
