//! # sentra-eval: Pure evaluation primitives
//!
//! The two leaf evaluators everything above reuses:
//!
//! - [`conditions`]: weighted condition matching over attribute records.
//!   The single primitive behind ABAC rule evaluation and the
//!   monitoring/compliance rule engine.
//! - [`risk`]: the composite risk score attached to decisions, access
//!   requests, and alerts.
//!
//! Both are total, deterministic, side-effect-free functions: safe to call
//! from any number of concurrent evaluations with no shared state.

pub mod conditions;
pub mod risk;

pub use conditions::{
    Condition, ConditionOperator, ConditionReport, condition_matches, evaluate_conditions,
};
pub use risk::{Anomaly, RiskSignals, risk_score};
