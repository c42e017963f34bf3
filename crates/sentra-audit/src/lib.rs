//! # sentra-audit: tamper-evident audit log
//!
//! Every audit event carries an integrity hash computed at write time over
//! its immutable fields; verification recomputes and compares, so any
//! post-hoc edit to a hashed field is detectable. Detection, not repair: a
//! mismatch is reported, never corrected.
//!
//! Hashing is per-event. Events are not chained to their predecessors, so
//! wholesale deletion of an event is not detectable by hash alone --
//! a known limitation of the current format, kept because chaining changes
//! the observable hash of every subsequent event.
//!
//! Entity mutations additionally produce an [`AuditTrail`]: a field-level
//! before/after diff, hashed the same way and linked to a correlated
//! `DataModification` event.

pub mod event;
pub mod hash;
pub mod log;
pub mod trail;

pub use event::{AuditCategory, AuditEvent, AuditEventDraft, ContextField};
pub use hash::{event_hash, trail_hash};
pub use log::{AuditError, AuditLog, EventFilter, IntegrityReport};
pub use trail::{AuditTrail, ChangeKind, FieldChange, Operation};
