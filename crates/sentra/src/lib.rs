//! # Sentra: access-decision and audit-integrity core
//!
//! Sentra computes access decisions, risk scores, and integrity proofs;
//! the surrounding system enforces them. Three engines behind one facade:
//!
//! - **Decisions** ([`sentra_policy`]): combined RBAC/ABAC evaluation with
//!   combining algorithms, a TTL decision cache, and fail-closed handling
//!   of attribute-resolution failures.
//! - **Monitoring** ([`sentra_monitor`]): weighted-condition rules over the
//!   event stream raising alerts and compliance violations.
//! - **Audit** ([`sentra_audit`]): per-event integrity hashes, verification,
//!   and entity change trails.
//!
//! ```
//! use std::sync::Arc;
//! use sentra::{Sentra, StaticAttributeResolver};
//! use sentra_policy::{Permission, Role};
//! use sentra_types::{ResourceId, SubjectId};
//!
//! let svc = Sentra::new(Arc::new(StaticAttributeResolver::new()));
//! svc.create_permission("root", Permission::new("content", "read")).unwrap();
//! svc.create_role("root", Role::new("viewer").with_permission("content:read")).unwrap();
//! svc.assign_role("root", "viewer", "alice").unwrap();
//!
//! let decision = svc.evaluate_access(
//!     &SubjectId::new("alice"),
//!     &ResourceId::new("content"),
//!     "read",
//! );
//! assert!(decision.is_permit());
//! ```

pub mod collaborators;
pub mod service;

pub use collaborators::{CollectingSink, EventSink, NullSink, SinkEvent, StaticAttributeResolver};
pub use service::{Result, Sentra, SentraError};

pub use sentra_audit;
pub use sentra_eval;
pub use sentra_monitor;
pub use sentra_policy;
pub use sentra_types;
