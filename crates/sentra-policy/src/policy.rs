//! ABAC policy model: targets, rule expressions, and combining algorithms.
//!
//! A [`Policy`] applies to requests matched by its [`Target`] and holds an
//! ordered list of [`PolicyRule`]s. Rule conditions are a small tagged AST
//! ([`RuleExpr`]) of boolean connectives over typed comparisons, evaluated
//! against the merged subject/resource/environment attribute record --
//! no string interpreter, exhaustiveness checked at compile time.
//!
//! When several rules (or several policies) match, a
//! [`CombiningAlgorithm`] resolves them into a single effect.

use chrono::{DateTime, Utc};
use sentra_eval::{Condition, condition_matches};
use sentra_types::Attributes;
use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, Result};
use crate::permission::Effect;

// ============================================================================
// Rule Expressions
// ============================================================================

/// Boolean expression over attribute conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuleExpr {
    /// A single typed comparison.
    Cond(Condition),
    /// All sub-expressions must hold. `All(vec![])` is vacuously true.
    All(Vec<RuleExpr>),
    /// At least one sub-expression must hold.
    Any(Vec<RuleExpr>),
    /// Negation.
    Not(Box<RuleExpr>),
}

impl RuleExpr {
    /// Evaluates the expression against an attribute record. Total --
    /// missing attributes simply fail the enclosing comparison.
    pub fn eval(&self, attrs: &Attributes) -> bool {
        match self {
            RuleExpr::Cond(condition) => condition_matches(attrs, condition),
            RuleExpr::All(subs) => subs.iter().all(|e| e.eval(attrs)),
            RuleExpr::Any(subs) => subs.iter().any(|e| e.eval(attrs)),
            RuleExpr::Not(sub) => !sub.eval(attrs),
        }
    }
}

// ============================================================================
// Obligations
// ============================================================================

/// Kind of side-effect instruction attached to a winning rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObligationKind {
    /// The caller must require a fresh MFA challenge before honoring the
    /// decision.
    RequireMfa,
    /// The caller must log the access in detail.
    LogAccess,
    /// The resource owner must be notified.
    NotifyOwner,
    /// The response payload must be re-encrypted for the requester.
    ReencryptResponse,
}

/// A side-effect instruction the caller must enforce alongside the effect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Obligation {
    pub kind: ObligationKind,
    /// Free-form argument (e.g. a notification channel).
    #[serde(default)]
    pub value: String,
}

impl Obligation {
    pub fn new(kind: ObligationKind) -> Self {
        Self {
            kind,
            value: String::new(),
        }
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }
}

// ============================================================================
// Policy Rules
// ============================================================================

/// One rule inside a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Stable identifier used in audit records.
    pub id: String,
    /// Condition under which the rule applies.
    pub condition: RuleExpr,
    /// Effect produced when the condition holds.
    pub effect: Effect,
    /// Priority; higher evaluates first, ties broken by declaration order.
    #[serde(default)]
    pub priority: i32,
    /// Obligations attached to this rule.
    #[serde(default)]
    pub obligations: Vec<Obligation>,
}

impl PolicyRule {
    pub fn new(id: impl Into<String>, condition: RuleExpr, effect: Effect) -> Self {
        Self {
            id: id.into(),
            condition,
            effect,
            priority: 0,
            obligations: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_obligation(mut self, obligation: Obligation) -> Self {
        self.obligations.push(obligation);
        self
    }
}

// ============================================================================
// Target
// ============================================================================

/// Match filters selecting the requests a policy applies to.
///
/// Each filter is a glob pattern (`*` and `?` wildcards). `None`, empty, or
/// `"*"` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub subject: Option<String>,
    pub resource: Option<String>,
    pub action: Option<String>,
    pub environment: Option<String>,
}

impl Target {
    /// A target matching every request.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_subject(mut self, pattern: &str) -> Self {
        self.subject = Some(pattern.to_string());
        self
    }

    pub fn with_resource(mut self, pattern: &str) -> Self {
        self.resource = Some(pattern.to_string());
        self
    }

    pub fn with_action(mut self, pattern: &str) -> Self {
        self.action = Some(pattern.to_string());
        self
    }

    pub fn with_environment(mut self, pattern: &str) -> Self {
        self.environment = Some(pattern.to_string());
        self
    }

    /// Returns whether all filters match (wildcard/empty filters match all).
    pub fn matches(&self, subject: &str, resource: &str, action: &str, environment: &str) -> bool {
        filter_matches(self.subject.as_deref(), subject)
            && filter_matches(self.resource.as_deref(), resource)
            && filter_matches(self.action.as_deref(), action)
            && filter_matches(self.environment.as_deref(), environment)
    }
}

fn filter_matches(pattern: Option<&str>, value: &str) -> bool {
    match pattern {
        None | Some("") | Some("*") => true,
        Some(p) => glob_matches(p, value),
    }
}

/// Simple glob matching supporting `*` (zero or more characters) and `?`
/// (exactly one character).
///
/// Iterative two-pointer scan: only the most recent `*` is ever revisited,
/// so matching is linear in `pattern.len() * value.len()` even for
/// multi-`*` patterns.
pub(crate) fn glob_matches(pattern: &str, value: &str) -> bool {
    let pattern = pattern.as_bytes();
    let value = value.as_bytes();
    let (mut p, mut v) = (0, 0);
    // Position of the last `*` seen and the value index it was tried at.
    let mut star: Option<(usize, usize)> = None;

    while v < value.len() {
        if p < pattern.len() && (pattern[p] == b'?' || pattern[p] == value[v]) {
            p += 1;
            v += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            star = Some((p, v));
            p += 1;
        } else if let Some((star_p, star_v)) = star {
            // Widen the last `*` by one character and rescan from there.
            star = Some((star_p, star_v + 1));
            p = star_p + 1;
            v = star_v + 1;
        } else {
            return false;
        }
    }
    // Only trailing `*`s may remain unconsumed.
    pattern[p..].iter().all(|&b| b == b'*')
}

// ============================================================================
// Combining Algorithms
// ============================================================================

/// Strategy for resolving multiple matched rules (or multiple policy
/// outcomes) into one effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombiningAlgorithm {
    /// Any matched DENY wins; otherwise any matched PERMIT; otherwise not
    /// applicable.
    DenyOverrides,
    /// Any matched PERMIT wins; otherwise any matched DENY; otherwise not
    /// applicable.
    PermitOverrides,
    /// The first matched rule in priority order decides.
    FirstApplicable,
    /// The highest-priority matched rule decides; DENY wins a priority tie
    /// (conservative default).
    PriorityOrdered,
}

/// A rule (or policy outcome) that matched, as input to combining.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedRule {
    pub effect: Effect,
    pub priority: i32,
    pub obligations: Vec<Obligation>,
}

/// The combined outcome of one policy (or of the outer policy set).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolicyOutcome {
    /// `None` means not applicable (no rule matched).
    pub effect: Option<Effect>,
    /// Union of obligations from rules contributing to the winning effect.
    pub obligations: Vec<Obligation>,
    /// Highest priority among contributing rules; used when outcomes are
    /// themselves combined at the outer level.
    pub priority: i32,
}

impl CombiningAlgorithm {
    /// Combines matched rules (already sorted by priority descending,
    /// declaration order within a tie) into a single outcome.
    pub fn combine(&self, matched: &[MatchedRule]) -> PolicyOutcome {
        if matched.is_empty() {
            return PolicyOutcome::default();
        }
        match self {
            CombiningAlgorithm::DenyOverrides => Self::overriding(matched, Effect::Deny),
            CombiningAlgorithm::PermitOverrides => Self::overriding(matched, Effect::Permit),
            CombiningAlgorithm::FirstApplicable => {
                let first = &matched[0];
                PolicyOutcome {
                    effect: Some(first.effect),
                    obligations: dedup_obligations(first.obligations.clone()),
                    priority: first.priority,
                }
            }
            CombiningAlgorithm::PriorityOrdered => {
                let top = matched.iter().map(|m| m.priority).max().unwrap_or(0);
                let at_top: Vec<&MatchedRule> =
                    matched.iter().filter(|m| m.priority == top).collect();
                // DENY wins an exact priority tie.
                let effect = if at_top.iter().any(|m| m.effect == Effect::Deny) {
                    Effect::Deny
                } else {
                    Effect::Permit
                };
                let obligations = at_top
                    .iter()
                    .filter(|m| m.effect == effect)
                    .flat_map(|m| m.obligations.iter().cloned())
                    .collect();
                PolicyOutcome {
                    effect: Some(effect),
                    obligations: dedup_obligations(obligations),
                    priority: top,
                }
            }
        }
    }

    /// Shared body of deny-overrides / permit-overrides: `winner` beats the
    /// other effect; obligations come from every rule with the winning
    /// effect.
    fn overriding(matched: &[MatchedRule], winner: Effect) -> PolicyOutcome {
        let effect = if matched.iter().any(|m| m.effect == winner) {
            winner
        } else {
            // All matched rules carry the other effect.
            matched[0].effect
        };
        let obligations = matched
            .iter()
            .filter(|m| m.effect == effect)
            .flat_map(|m| m.obligations.iter().cloned())
            .collect();
        let priority = matched
            .iter()
            .filter(|m| m.effect == effect)
            .map(|m| m.priority)
            .max()
            .unwrap_or(0);
        PolicyOutcome {
            effect: Some(effect),
            obligations: dedup_obligations(obligations),
            priority,
        }
    }
}

fn dedup_obligations(mut obligations: Vec<Obligation>) -> Vec<Obligation> {
    let mut seen = std::collections::HashSet::new();
    obligations.retain(|o| seen.insert(o.clone()));
    obligations
}

// ============================================================================
// Policy
// ============================================================================

/// An ABAC policy: target filters, ordered rules, and a combining algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Unique policy name.
    pub name: String,
    /// Request filters; empty target matches everything.
    #[serde(default)]
    pub target: Target,
    /// Ordered rule list.
    pub rules: Vec<PolicyRule>,
    /// How matched rules combine into one effect.
    pub combining: CombiningAlgorithm,
    /// Inactive policies never contribute to a decision.
    #[serde(default = "default_active")]
    pub active: bool,
    /// The policy only applies at or after this instant.
    pub effective_from: Option<DateTime<Utc>>,
    /// The policy stops applying at this instant.
    pub expires_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl Policy {
    /// Creates an active, always-effective policy with no rules.
    pub fn new(name: impl Into<String>, combining: CombiningAlgorithm) -> Self {
        Self {
            name: name.into(),
            target: Target::any(),
            rules: Vec::new(),
            combining,
            active: true,
            effective_from: None,
            expires_at: None,
        }
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn with_rule(mut self, rule: PolicyRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_effective_window(
        mut self,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Self {
        self.effective_from = from;
        self.expires_at = until;
        self
    }

    /// Returns whether the policy may contribute to decisions at `now`.
    pub fn is_in_effect(&self, now: DateTime<Utc>) -> bool {
        self.active
            && self.effective_from.map_or(true, |from| now >= from)
            && self.expires_at.map_or(true, |until| now < until)
    }

    /// Evaluates this policy's rules against a merged attribute record.
    ///
    /// Rules are visited in priority order (descending, declaration order
    /// within a tie); unmatched rules are skipped; matched rules combine
    /// per the policy's algorithm.
    pub fn evaluate(&self, attrs: &Attributes) -> PolicyOutcome {
        let mut ordered: Vec<&PolicyRule> = self.rules.iter().collect();
        // Stable sort preserves declaration order within equal priorities.
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

        let matched: Vec<MatchedRule> = ordered
            .iter()
            .filter(|rule| rule.condition.eval(attrs))
            .map(|rule| MatchedRule {
                effect: rule.effect,
                priority: rule.priority,
                obligations: rule.obligations.clone(),
            })
            .collect();

        self.combining.combine(&matched)
    }

    /// Validates the policy shape: non-empty name, at least one rule,
    /// unique rule ids, and a coherent effective window.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PolicyError::Validation(
                "policy name must not be empty".to_string(),
            ));
        }
        if self.rules.is_empty() {
            return Err(PolicyError::Validation(format!(
                "policy '{}' must declare at least one rule",
                self.name
            )));
        }
        let mut ids: Vec<&str> = self.rules.iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != self.rules.len() {
            return Err(PolicyError::Validation(format!(
                "policy '{}' has duplicate rule ids",
                self.name
            )));
        }
        if let (Some(from), Some(until)) = (self.effective_from, self.expires_at) {
            if from >= until {
                return Err(PolicyError::Validation(format!(
                    "policy '{}' expires before it becomes effective",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use sentra_eval::ConditionOperator;

    fn cond(field: &str, value: &str) -> RuleExpr {
        RuleExpr::Cond(Condition::new(field, ConditionOperator::Equals, value))
    }

    fn attrs() -> Attributes {
        Attributes::from(serde_json::json!({
            "subject": { "department": "engineering", "clearance": 2 },
            "resource": { "type": "content" },
        }))
    }

    #[test]
    fn test_rule_expr_connectives() {
        let expr = RuleExpr::All(vec![
            cond("subject.department", "engineering"),
            RuleExpr::Not(Box::new(cond("resource.type", "billing"))),
            RuleExpr::Any(vec![
                cond("resource.type", "content"),
                cond("resource.type", "media"),
            ]),
        ]);
        assert!(expr.eval(&attrs()));

        let expr = RuleExpr::All(vec![cond("subject.department", "sales")]);
        assert!(!expr.eval(&attrs()));
    }

    #[test]
    fn test_empty_all_is_vacuously_true() {
        assert!(RuleExpr::All(vec![]).eval(&attrs()));
        assert!(!RuleExpr::Any(vec![]).eval(&attrs()));
    }

    #[test]
    fn test_target_wildcards() {
        let target = Target::any();
        assert!(target.matches("anyone", "anything", "anyhow", ""));

        let target = Target::default()
            .with_resource("content/*")
            .with_action("create");
        assert!(target.matches("alice", "content/articles/1", "create", ""));
        assert!(!target.matches("alice", "billing/1", "create", ""));
        assert!(!target.matches("alice", "content/articles/1", "delete", ""));
    }

    #[test]
    fn test_glob_matches() {
        assert!(glob_matches("*", "anything"));
        assert!(glob_matches("content/*", "content/"));
        assert!(glob_matches("c?ntent", "content"));
        assert!(!glob_matches("content", "content/articles"));
        assert!(glob_matches("*a*a*", "banana"));
        assert!(glob_matches("a*b*c", "axxbxxc"));
        assert!(!glob_matches("a*b*c", "axxbxx"));
    }

    #[test]
    fn test_glob_multi_star_stays_fast() {
        // A pattern with many stars against a long non-matching value must
        // not blow up combinatorially.
        let pattern = format!("{}b", "a*".repeat(30));
        let value = "a".repeat(3000);
        assert!(!glob_matches(&pattern, &value));
        assert!(glob_matches(&"a*".repeat(30), &value));
    }

    fn matched(effect: Effect, priority: i32) -> MatchedRule {
        MatchedRule {
            effect,
            priority,
            obligations: Vec::new(),
        }
    }

    #[test]
    fn test_deny_overrides() {
        let outcome = CombiningAlgorithm::DenyOverrides.combine(&[
            matched(Effect::Permit, 100),
            matched(Effect::Deny, 1),
        ]);
        assert_eq!(outcome.effect, Some(Effect::Deny));

        let outcome = CombiningAlgorithm::DenyOverrides
            .combine(&[matched(Effect::Permit, 1), matched(Effect::Permit, 2)]);
        assert_eq!(outcome.effect, Some(Effect::Permit));

        let outcome = CombiningAlgorithm::DenyOverrides.combine(&[]);
        assert_eq!(outcome.effect, None, "no match is not applicable");
    }

    #[test]
    fn test_permit_overrides() {
        let outcome = CombiningAlgorithm::PermitOverrides.combine(&[
            matched(Effect::Deny, 100),
            matched(Effect::Permit, 1),
        ]);
        assert_eq!(outcome.effect, Some(Effect::Permit));

        let outcome =
            CombiningAlgorithm::PermitOverrides.combine(&[matched(Effect::Deny, 100)]);
        assert_eq!(outcome.effect, Some(Effect::Deny));
    }

    #[test]
    fn test_first_applicable_uses_priority_order() {
        // Input is pre-sorted: priority 10 first.
        let outcome = CombiningAlgorithm::FirstApplicable.combine(&[
            matched(Effect::Deny, 10),
            matched(Effect::Permit, 1),
        ]);
        assert_eq!(outcome.effect, Some(Effect::Deny));
    }

    #[test]
    fn test_priority_ordered_deny_wins_ties() {
        let outcome = CombiningAlgorithm::PriorityOrdered.combine(&[
            matched(Effect::Permit, 10),
            matched(Effect::Deny, 10),
            matched(Effect::Permit, 50),
        ]);
        assert_eq!(outcome.effect, Some(Effect::Permit), "50 beats the tie at 10");

        let outcome = CombiningAlgorithm::PriorityOrdered.combine(&[
            matched(Effect::Permit, 50),
            matched(Effect::Deny, 50),
        ]);
        assert_eq!(outcome.effect, Some(Effect::Deny), "deny wins the tie");
    }

    #[test]
    fn test_obligations_from_winning_rules_only() {
        let deny_rule = MatchedRule {
            effect: Effect::Deny,
            priority: 5,
            obligations: vec![Obligation::new(ObligationKind::LogAccess)],
        };
        let permit_rule = MatchedRule {
            effect: Effect::Permit,
            priority: 50,
            obligations: vec![Obligation::new(ObligationKind::RequireMfa)],
        };
        let outcome =
            CombiningAlgorithm::DenyOverrides.combine(&[permit_rule, deny_rule]);
        assert_eq!(outcome.effect, Some(Effect::Deny));
        assert_eq!(
            outcome.obligations,
            vec![Obligation::new(ObligationKind::LogAccess)],
            "obligations come only from rules contributing the winning effect"
        );
    }

    #[test]
    fn test_obligation_union_dedups() {
        let a = MatchedRule {
            effect: Effect::Permit,
            priority: 1,
            obligations: vec![
                Obligation::new(ObligationKind::RequireMfa),
                Obligation::new(ObligationKind::LogAccess),
            ],
        };
        let b = MatchedRule {
            effect: Effect::Permit,
            priority: 2,
            obligations: vec![Obligation::new(ObligationKind::RequireMfa)],
        };
        let outcome = CombiningAlgorithm::PermitOverrides.combine(&[a, b]);
        assert_eq!(outcome.obligations.len(), 2);
    }

    #[test]
    fn test_policy_evaluate_priority_and_skip() {
        let policy = Policy::new("content-policy", CombiningAlgorithm::FirstApplicable)
            .with_rule(
                PolicyRule::new("low-permit", cond("resource.type", "content"), Effect::Permit)
                    .with_priority(1),
            )
            .with_rule(
                PolicyRule::new(
                    "high-deny",
                    cond("subject.department", "contractors"),
                    Effect::Deny,
                )
                .with_priority(100),
            );
        // The high-priority rule does not match and is skipped.
        let outcome = policy.evaluate(&attrs());
        assert_eq!(outcome.effect, Some(Effect::Permit));
    }

    #[test]
    fn test_policy_effective_window() {
        let now = Utc::now();
        let mut policy = Policy::new("p", CombiningAlgorithm::DenyOverrides)
            .with_rule(PolicyRule::new("r", RuleExpr::All(vec![]), Effect::Permit));
        assert!(policy.is_in_effect(now));

        policy.active = false;
        assert!(!policy.is_in_effect(now));

        policy.active = true;
        policy.effective_from = Some(now + chrono::Duration::hours(1));
        assert!(!policy.is_in_effect(now), "not yet effective");

        policy.effective_from = None;
        policy.expires_at = Some(now - chrono::Duration::hours(1));
        assert!(!policy.is_in_effect(now), "expired");
    }

    mod combining_laws {
        use super::*;
        use proptest::prelude::*;

        fn arb_matched() -> impl Strategy<Value = MatchedRule> {
            (any::<bool>(), -100i32..100).prop_map(|(deny, priority)| MatchedRule {
                effect: if deny { Effect::Deny } else { Effect::Permit },
                priority,
                obligations: Vec::new(),
            })
        }

        proptest! {
            #[test]
            fn deny_overrides_law(rules in proptest::collection::vec(arb_matched(), 0..12)) {
                let outcome = CombiningAlgorithm::DenyOverrides.combine(&rules);
                if rules.is_empty() {
                    prop_assert_eq!(outcome.effect, None);
                } else if rules.iter().any(|r| r.effect == Effect::Deny) {
                    prop_assert_eq!(outcome.effect, Some(Effect::Deny));
                } else {
                    prop_assert_eq!(outcome.effect, Some(Effect::Permit));
                }
            }

            #[test]
            fn permit_overrides_law(rules in proptest::collection::vec(arb_matched(), 0..12)) {
                let outcome = CombiningAlgorithm::PermitOverrides.combine(&rules);
                if rules.is_empty() {
                    prop_assert_eq!(outcome.effect, None);
                } else if rules.iter().any(|r| r.effect == Effect::Permit) {
                    prop_assert_eq!(outcome.effect, Some(Effect::Permit));
                } else {
                    prop_assert_eq!(outcome.effect, Some(Effect::Deny));
                }
            }

            #[test]
            fn priority_ordered_deny_wins_at_top(
                rules in proptest::collection::vec(arb_matched(), 1..12),
            ) {
                let outcome = CombiningAlgorithm::PriorityOrdered.combine(&rules);
                let top = rules.iter().map(|r| r.priority).max().unwrap();
                let deny_at_top = rules
                    .iter()
                    .any(|r| r.priority == top && r.effect == Effect::Deny);
                let expected = if deny_at_top { Effect::Deny } else { Effect::Permit };
                prop_assert_eq!(outcome.effect, Some(expected));
            }
        }
    }

    #[test]
    fn test_policy_validate() {
        let policy = Policy::new("empty", CombiningAlgorithm::DenyOverrides);
        assert!(policy.validate().is_err(), "no rules");

        let policy = Policy::new("dup", CombiningAlgorithm::DenyOverrides)
            .with_rule(PolicyRule::new("r1", RuleExpr::All(vec![]), Effect::Permit))
            .with_rule(PolicyRule::new("r1", RuleExpr::All(vec![]), Effect::Deny));
        assert!(policy.validate().is_err(), "duplicate rule ids");

        let now = Utc::now();
        let policy = Policy::new("window", CombiningAlgorithm::DenyOverrides)
            .with_rule(PolicyRule::new("r", RuleExpr::All(vec![]), Effect::Permit))
            .with_effective_window(Some(now), Some(now - chrono::Duration::hours(1)));
        assert!(policy.validate().is_err(), "inverted window");
    }
}
