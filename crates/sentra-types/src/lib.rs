//! # sentra-types: Core types for Sentra
//!
//! This crate contains shared types used across the Sentra system:
//! - Attribute records ([`AttributeValue`], [`Attributes`]) -- the nested
//!   key/value data every evaluator operates on
//! - Severity and outcome enums ([`Severity`], [`Outcome`])
//! - Entity IDs ([`SubjectId`], [`ResourceId`])
//!
//! Attribute records are deliberately schema-free: subject, resource, and
//! environment attributes arrive from external resolvers and are addressed
//! by dot-separated paths (e.g. `subject.department`). Lookup is total --
//! a missing path resolves to nothing, never an error.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

// ============================================================================
// Attribute Values
// ============================================================================

/// A single attribute value in a subject/resource/environment record.
///
/// Closed sum over the value shapes the evaluators understand. Maps use
/// `BTreeMap` so serialization is deterministic -- the audit integrity
/// digest depends on a canonical byte form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Absent or explicitly null.
    Null,
    /// Boolean flag (e.g. `subject.mfa_verified`).
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Ordered collection, used by the `in`/`not_in` operators.
    List(Vec<AttributeValue>),
    /// Nested record, addressed by dot-path segments.
    Map(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Numeric view of this value, if it has one.
    ///
    /// Only `Int` and `Float` are numeric; `Bool` and numeric-looking
    /// strings are not. Comparison operators require both operands numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// String form used by the `contains` and `regex` operators.
    ///
    /// Scalars render naturally; `Null` renders empty; collections render
    /// as compact JSON so substring checks against them remain meaningful.
    pub fn string_form(&self) -> String {
        match self {
            AttributeValue::Null => String::new(),
            AttributeValue::Bool(b) => b.to_string(),
            AttributeValue::Int(i) => i.to_string(),
            AttributeValue::Float(f) => f.to_string(),
            AttributeValue::Str(s) => s.clone(),
            AttributeValue::List(_) | AttributeValue::Map(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }

    /// Returns whether this value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl From<serde_json::Value> for AttributeValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AttributeValue::Null,
            serde_json::Value::Bool(b) => AttributeValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    AttributeValue::Int(i)
                } else {
                    AttributeValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => AttributeValue::Str(s),
            serde_json::Value::Array(items) => {
                AttributeValue::List(items.into_iter().map(AttributeValue::from).collect())
            }
            serde_json::Value::Object(map) => AttributeValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, AttributeValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Int(i)
    }
}

impl From<f64> for AttributeValue {
    fn from(f: f64) -> Self {
        AttributeValue::Float(f)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Str(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Str(s)
    }
}

impl<T: Into<AttributeValue>> From<Vec<T>> for AttributeValue {
    fn from(items: Vec<T>) -> Self {
        AttributeValue::List(items.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// Attribute Records
// ============================================================================

/// A nested attribute record with dot-path lookup.
///
/// The merged subject/resource/environment record that condition evaluation
/// runs against. Typically namespaced at the top level:
///
/// ```
/// use sentra_types::Attributes;
///
/// let attrs = Attributes::new()
///     .with("department", "engineering")
///     .with_nested("subject", Attributes::new().with("clearance", 3_i64));
///
/// assert!(attrs.get_path("subject.clearance").is_some());
/// assert!(attrs.get_path("subject.missing.deeper").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(flatten)]
    entries: BTreeMap<String, AttributeValue>,
}

impl Attributes {
    /// Creates an empty attribute record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: sets a top-level attribute.
    pub fn with(mut self, key: &str, value: impl Into<AttributeValue>) -> Self {
        self.entries.insert(key.to_string(), value.into());
        self
    }

    /// Builder: nests another record under `key`.
    pub fn with_nested(mut self, key: &str, nested: Attributes) -> Self {
        self.entries
            .insert(key.to_string(), AttributeValue::Map(nested.entries));
        self
    }

    /// Sets a top-level attribute in place.
    pub fn set(&mut self, key: &str, value: impl Into<AttributeValue>) {
        self.entries.insert(key.to_string(), value.into());
    }

    /// Resolves a dot-separated path, walking nested maps.
    ///
    /// Total: a missing segment (or a path into a non-map value) resolves
    /// to `None`, never an error. An empty path resolves to `None`.
    pub fn get_path(&self, path: &str) -> Option<&AttributeValue> {
        let mut segments = path.split('.');
        let first = segments.next().filter(|s| !s.is_empty())?;
        let mut current = self.entries.get(first)?;
        for segment in segments {
            match current {
                AttributeValue::Map(map) => current = map.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Overlays `other` on top of this record. Top-level keys from `other`
    /// win on conflict.
    pub fn merge(mut self, other: Attributes) -> Self {
        self.entries.extend(other.entries);
        self
    }

    /// Returns whether the record has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over top-level entries.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.entries.iter()
    }
}

impl From<serde_json::Value> for Attributes {
    /// Converts a JSON object to an attribute record. Non-object values
    /// produce an empty record.
    fn from(value: serde_json::Value) -> Self {
        match AttributeValue::from(value) {
            AttributeValue::Map(entries) => Self { entries },
            _ => Self::default(),
        }
    }
}

// ============================================================================
// Severity
// ============================================================================

/// Severity level shared by alerts, violations, anomalies, and audit events.
///
/// Ordered from least to most severe: Low < Medium < High < Critical.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Risk contribution of an anomaly at this severity, before confidence
    /// weighting. Feeds the composite risk score.
    pub fn score(&self) -> f64 {
        match self {
            Severity::Low => 5.0,
            Severity::Medium => 15.0,
            Severity::High => 25.0,
            Severity::Critical => 40.0,
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{label}")
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Outcome of an audited operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// The operation completed as requested.
    Success,
    /// The operation failed or was refused.
    Failure,
    /// The operation completed with reduced effect (e.g. partial results).
    Partial,
}

impl Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Partial => "partial",
        };
        write!(f, "{label}")
    }
}

// ============================================================================
// Entity IDs
// ============================================================================

/// Identifier of the subject (user, service account) requesting access.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of the resource being accessed (path-like, e.g.
/// `content/articles/1`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_path_nested() {
        let attrs = Attributes::new().with_nested(
            "a",
            Attributes::new().with_nested("b", Attributes::new().with("c", 5_i64)),
        );
        assert_eq!(attrs.get_path("a.b.c"), Some(&AttributeValue::Int(5)));
    }

    #[test]
    fn test_get_path_missing_is_none() {
        let attrs = Attributes::new().with("a", 1_i64);
        assert_eq!(attrs.get_path("a.b"), None, "path into scalar");
        assert_eq!(attrs.get_path("missing"), None);
        assert_eq!(attrs.get_path(""), None, "empty path");
        assert_eq!(attrs.get_path("a..b"), None, "empty segment");
    }

    #[test]
    fn test_merge_overlays() {
        let base = Attributes::new().with("x", 1_i64).with("y", 2_i64);
        let over = Attributes::new().with("y", 9_i64).with("z", 3_i64);
        let merged = base.merge(over);
        assert_eq!(merged.get_path("x"), Some(&AttributeValue::Int(1)));
        assert_eq!(merged.get_path("y"), Some(&AttributeValue::Int(9)));
        assert_eq!(merged.get_path("z"), Some(&AttributeValue::Int(3)));
    }

    #[test]
    fn test_as_f64_numeric_only() {
        assert_eq!(AttributeValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(AttributeValue::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(AttributeValue::Str("3".into()).as_f64(), None);
        assert_eq!(AttributeValue::Bool(true).as_f64(), None);
        assert_eq!(AttributeValue::Null.as_f64(), None);
    }

    #[test]
    fn test_string_form() {
        assert_eq!(AttributeValue::Str("abc".into()).string_form(), "abc");
        assert_eq!(AttributeValue::Int(42).string_form(), "42");
        assert_eq!(AttributeValue::Bool(false).string_form(), "false");
        assert_eq!(AttributeValue::Null.string_form(), "");
    }

    #[test]
    fn test_from_json_object() {
        let json = serde_json::json!({
            "subject": { "department": "engineering", "clearance": 2 },
            "flags": [true, false],
        });
        let attrs = Attributes::from(json);
        assert_eq!(
            attrs.get_path("subject.department"),
            Some(&AttributeValue::Str("engineering".into()))
        );
        assert_eq!(
            attrs.get_path("subject.clearance"),
            Some(&AttributeValue::Int(2))
        );
        assert!(matches!(
            attrs.get_path("flags"),
            Some(AttributeValue::List(_))
        ));
    }

    #[test]
    fn test_severity_ordering_and_score() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
        assert_eq!(Severity::Low.score(), 5.0);
        assert_eq!(Severity::Medium.score(), 15.0);
        assert_eq!(Severity::High.score(), 25.0);
        assert_eq!(Severity::Critical.score(), 40.0);
    }

    #[test]
    fn test_ids_display() {
        assert_eq!(SubjectId::new("alice").to_string(), "alice");
        assert_eq!(
            ResourceId::new("content/articles/1").to_string(),
            "content/articles/1"
        );
    }
}
