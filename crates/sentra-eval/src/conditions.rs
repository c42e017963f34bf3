//! Weighted condition evaluation over attribute records.
//!
//! A [`Condition`] names a dot-path field, an operator, a comparison value,
//! and an optional weight. [`evaluate_conditions`] resolves each field
//! against the record and reports how many conditions matched and their
//! combined weight.
//!
//! Evaluation is total: missing paths, type mismatches, malformed regex
//! patterns, and non-collection `in` values all evaluate to "no match" --
//! a malformed condition can never grant anything, and evaluation never
//! fails.

use regex::Regex;
use sentra_types::{AttributeValue, Attributes};
use serde::{Deserialize, Serialize};

// ============================================================================
// Condition
// ============================================================================

/// Comparison operator applied between a resolved field and the condition
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    /// Strict structural equality.
    Equals,
    /// Negation of `Equals`.
    NotEquals,
    /// Numeric `field > value`; non-numeric operands do not match.
    GreaterThan,
    /// Numeric `field < value`; non-numeric operands do not match.
    LessThan,
    /// Membership: the condition value must be a list containing the field.
    In,
    /// Non-membership: the condition value must be a list not containing
    /// the field.
    NotIn,
    /// Substring test on the string form of the field value.
    Contains,
    /// Regex search on the string form of the field value. The condition
    /// value is the pattern; an invalid pattern does not match.
    Regex,
}

/// A single weighted condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Dot-path into the attribute record (e.g. `subject.department`).
    pub field: String,
    /// Comparison operator.
    pub operator: ConditionOperator,
    /// Value the operator compares against.
    pub value: AttributeValue,
    /// Weight contributed to the score when this condition matches.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl Condition {
    /// Creates a condition with the default weight of 1.
    pub fn new(
        field: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<AttributeValue>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            weight: default_weight(),
        }
    }

    /// Sets the weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Result of evaluating a condition list against one attribute record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionReport {
    /// Number of conditions that matched.
    pub matched: usize,
    /// Total number of conditions evaluated.
    pub total: usize,
    /// Sum of the weights of matched conditions.
    pub score: f64,
}

impl ConditionReport {
    /// Returns whether every condition matched. An empty list matches
    /// vacuously.
    pub fn all_matched(&self) -> bool {
        self.matched == self.total
    }

    /// Returns whether at least one condition matched.
    pub fn any_matched(&self) -> bool {
        self.matched > 0
    }
}

/// Evaluates an ordered condition list against an attribute record.
///
/// Deterministic and side-effect free. Unweighted conditions count as
/// weight 1 toward the score.
pub fn evaluate_conditions(attrs: &Attributes, conditions: &[Condition]) -> ConditionReport {
    let mut report = ConditionReport {
        matched: 0,
        total: conditions.len(),
        score: 0.0,
    };
    for condition in conditions {
        if condition_matches(attrs, condition) {
            report.matched += 1;
            report.score += condition.weight;
        }
    }
    report
}

/// Evaluates one condition against an attribute record.
///
/// A missing field resolves to [`AttributeValue::Null`] rather than
/// aborting, so `not_equals` against an absent field still behaves
/// sensibly.
pub fn condition_matches(attrs: &Attributes, condition: &Condition) -> bool {
    let resolved = attrs
        .get_path(&condition.field)
        .unwrap_or(&AttributeValue::Null);

    match condition.operator {
        ConditionOperator::Equals => *resolved == condition.value,
        ConditionOperator::NotEquals => *resolved != condition.value,
        ConditionOperator::GreaterThan => match (resolved.as_f64(), condition.value.as_f64()) {
            (Some(field), Some(value)) => field > value,
            _ => false,
        },
        ConditionOperator::LessThan => match (resolved.as_f64(), condition.value.as_f64()) {
            (Some(field), Some(value)) => field < value,
            _ => false,
        },
        ConditionOperator::In => match &condition.value {
            AttributeValue::List(items) => items.contains(resolved),
            _ => false,
        },
        ConditionOperator::NotIn => match &condition.value {
            AttributeValue::List(items) => !items.contains(resolved),
            // A malformed membership list never grants a match.
            _ => false,
        },
        ConditionOperator::Contains => resolved
            .string_form()
            .contains(&condition.value.string_form()),
        ConditionOperator::Regex => match Regex::new(&condition.value.string_form()) {
            Ok(re) => re.is_match(&resolved.string_form()),
            Err(_) => false,
        },
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn attrs() -> Attributes {
        Attributes::from(serde_json::json!({
            "a": { "b": 5 },
            "subject": {
                "department": "engineering",
                "roles": ["editor", "reviewer"],
                "email": "alice@example.com",
            },
            "count": 12.5,
        }))
    }

    #[test]
    fn test_greater_than_on_nested_path() {
        let cond = Condition::new("a.b", ConditionOperator::GreaterThan, 3_i64);
        assert!(condition_matches(&attrs(), &cond));

        let cond = Condition::new("a.b", ConditionOperator::GreaterThan, 5_i64);
        assert!(!condition_matches(&attrs(), &cond), "5 > 5 is false");
    }

    #[test]
    fn test_less_than_mixed_int_float() {
        let cond = Condition::new("count", ConditionOperator::LessThan, 13_i64);
        assert!(condition_matches(&attrs(), &cond));
    }

    #[test_case(ConditionOperator::GreaterThan ; "greater_than")]
    #[test_case(ConditionOperator::LessThan ; "less_than")]
    fn test_numeric_operator_rejects_non_numeric(op: ConditionOperator) {
        let cond = Condition::new("subject.department", op, 3_i64);
        assert!(
            !condition_matches(&attrs(), &cond),
            "non-numeric field must not match a numeric comparison"
        );
    }

    #[test]
    fn test_equals_and_not_equals() {
        let eq = Condition::new("subject.department", ConditionOperator::Equals, "engineering");
        assert!(condition_matches(&attrs(), &eq));

        let ne = Condition::new("subject.department", ConditionOperator::NotEquals, "sales");
        assert!(condition_matches(&attrs(), &ne));
    }

    #[test]
    fn test_equals_is_strict() {
        // Int 5 is not Str "5"
        let cond = Condition::new("a.b", ConditionOperator::Equals, "5");
        assert!(!condition_matches(&attrs(), &cond));
    }

    #[test]
    fn test_missing_field_resolves_to_null() {
        let eq_null = Condition::new("no.such.path", ConditionOperator::Equals, AttributeValue::Null);
        assert!(condition_matches(&attrs(), &eq_null));

        let ne = Condition::new("no.such.path", ConditionOperator::NotEquals, "x");
        assert!(condition_matches(&attrs(), &ne), "absent != \"x\"");
    }

    #[test]
    fn test_in_membership() {
        let cond = Condition::new(
            "subject.department",
            ConditionOperator::In,
            vec!["engineering", "compliance"],
        );
        assert!(condition_matches(&attrs(), &cond));

        let cond = Condition::new(
            "subject.department",
            ConditionOperator::NotIn,
            vec!["sales", "marketing"],
        );
        assert!(condition_matches(&attrs(), &cond));
    }

    #[test]
    fn test_in_requires_collection() {
        let cond = Condition::new("subject.department", ConditionOperator::In, "engineering");
        assert!(!condition_matches(&attrs(), &cond), "non-list `in` value");

        // not_in with a malformed value also refuses to match -- a broken
        // condition must never widen access.
        let cond = Condition::new("subject.department", ConditionOperator::NotIn, "sales");
        assert!(!condition_matches(&attrs(), &cond));
    }

    #[test]
    fn test_contains_on_string_form() {
        let cond = Condition::new("subject.email", ConditionOperator::Contains, "@example.");
        assert!(condition_matches(&attrs(), &cond));

        let cond = Condition::new("a.b", ConditionOperator::Contains, "5");
        assert!(condition_matches(&attrs(), &cond), "int renders as \"5\"");
    }

    #[test]
    fn test_regex_search() {
        let cond = Condition::new(
            "subject.email",
            ConditionOperator::Regex,
            r"^[a-z]+@example\.com$",
        );
        assert!(condition_matches(&attrs(), &cond));

        let cond = Condition::new("subject.email", ConditionOperator::Regex, r"\d{4}");
        assert!(!condition_matches(&attrs(), &cond));
    }

    #[test]
    fn test_invalid_regex_never_matches() {
        let cond = Condition::new("subject.email", ConditionOperator::Regex, "[unclosed");
        assert!(!condition_matches(&attrs(), &cond));
    }

    #[test]
    fn test_report_counts_and_weights() {
        let conditions = vec![
            Condition::new("a.b", ConditionOperator::GreaterThan, 3_i64).with_weight(2.5),
            Condition::new("subject.department", ConditionOperator::Equals, "engineering"),
            Condition::new("subject.department", ConditionOperator::Equals, "sales"),
        ];
        let report = evaluate_conditions(&attrs(), &conditions);
        assert_eq!(report.matched, 2);
        assert_eq!(report.total, 3);
        assert!((report.score - 3.5).abs() < f64::EPSILON);
        assert!(!report.all_matched());
        assert!(report.any_matched());
    }

    #[test]
    fn test_empty_condition_list() {
        let report = evaluate_conditions(&attrs(), &[]);
        assert_eq!(report.matched, 0);
        assert_eq!(report.total, 0);
        assert_eq!(report.score, 0.0);
        assert!(report.all_matched(), "empty list matches vacuously");
        assert!(!report.any_matched());
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let conditions = vec![
            Condition::new("a.b", ConditionOperator::GreaterThan, 3_i64),
            Condition::new("subject.roles", ConditionOperator::Contains, "editor"),
        ];
        let first = evaluate_conditions(&attrs(), &conditions);
        let second = evaluate_conditions(&attrs(), &conditions);
        assert_eq!(first, second);
    }
}
