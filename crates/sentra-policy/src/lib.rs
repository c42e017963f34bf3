//! # sentra-policy: RBAC/ABAC policy model and decision engine
//!
//! Owns the Permission/Role/Policy data model and computes access decisions.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  evaluate_access(subject, resource, action)  │
//! └─────────────────┬───────────────────────────┘
//!                   │ cache miss
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  DecisionEngine                              │
//! │  ├─ Resolve subject/resource attributes      │
//! │  ├─ RBAC: effective permissions via roles    │
//! │  ├─ ABAC: applicable policies by target      │
//! │  ├─ Evaluate rules (priority order)          │
//! │  ├─ Combine effects per algorithm            │
//! │  └─ Attach composite risk score              │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Decision                                    │
//! │  - Permit/Deny (fail-closed)                 │
//! │  - Obligations from winning rules            │
//! │  - Risk score, policies evaluated            │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Decisions are cached by `(subject, resource, action)` with a TTL; any
//! permission/role/policy mutation through the engine clears the cache so a
//! stale PERMIT can never survive a tightening change.
//!
//! Attribute resolution failures never surface as errors from
//! `evaluate_access` -- the engine fails closed (DENY) and marks the
//! decision degraded.

pub mod cache;
pub mod engine;
pub mod error;
pub mod permission;
pub mod policy;
pub mod request;
pub mod role;
pub mod store;

pub use cache::DecisionCache;
pub use engine::{AttributeResolver, Decision, DecisionEngine, ResolveError};
pub use error::{PolicyError, Result};
pub use permission::{Effect, Permission};
pub use policy::{
    CombiningAlgorithm, MatchedRule, Obligation, ObligationKind, Policy, PolicyOutcome,
    PolicyRule, RuleExpr, Target,
};
pub use request::{
    AccessRequest, ApprovalRecord, RequestError, RequestKind, RequestStatus, Urgency,
};
pub use role::{Role, RoleConstraints, TimeWindow};
pub use store::PolicyStore;
