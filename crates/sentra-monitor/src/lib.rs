//! # sentra-monitor: monitoring and compliance rule engine
//!
//! Watches the event stream for conditions worth acting on. Two rule kinds
//! share one engine:
//!
//! - **Monitoring** rules raise operational *alerts* (unusual access
//!   patterns, failed-login bursts).
//! - **Compliance** rules raise *violations* that feed the compliance
//!   posture (access outside retention policy, missing MFA on privileged
//!   operations).
//!
//! A triggered rule produces a [`Finding`], dispatches its configured
//! [`RuleAction`]s through the caller's [`ActionDispatcher`], and bumps the
//! rule's statistics. Resolving a finding as real or false-positive feeds
//! per-rule effectiveness, so noisy rules become visible.

pub mod engine;
pub mod findings;
pub mod rules;

pub use engine::{ActionDispatcher, RuleEngine};
pub use findings::{Evidence, Finding, FindingKind, FindingStatus, MonitorError, Resolution};
pub use rules::{RuleAction, RuleKind, RuleStats, WatchRule};
