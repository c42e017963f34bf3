//! The access decision engine.
//!
//! Combines RBAC (effective permissions via role inheritance) and ABAC
//! (targeted policies over resolved attributes) into a single cached
//! decision, annotated with a composite risk score.
//!
//! Fail-closed: if attribute resolution fails, the engine returns DENY with
//! the decision marked degraded rather than surfacing an error. Degraded
//! decisions are never cached, so recovery is immediate once the resolver
//! heals.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sentra_eval::{evaluate_conditions, risk_score, Anomaly, RiskSignals};
use sentra_types::{AttributeValue, Attributes, ResourceId, SubjectId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::DecisionCache;
use crate::error::Result;
use crate::permission::{Effect, Permission};
use crate::policy::{glob_matches, CombiningAlgorithm, MatchedRule, Obligation, Policy};
use crate::role::Role;
use crate::store::PolicyStore;

// ============================================================================
// Attribute Resolution
// ============================================================================

/// Failure to fetch attributes from an external source.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The attribute source is unreachable or returned an error.
    #[error("attribute source unavailable: {0}")]
    Unavailable(String),

    /// The attribute source did not answer within its deadline. Resolvers
    /// enforce their own timeout and report it through this variant.
    #[error("attribute resolution timed out after {0:?}")]
    Timeout(Duration),

    /// The subject or resource is unknown to the attribute source.
    #[error("no attributes for '{0}'")]
    NotFound(String),
}

/// Source of subject, resource, and environment attributes.
///
/// Implementations typically wrap a directory service or metadata store.
/// Any error from any method fails the whole decision closed.
pub trait AttributeResolver: Send + Sync {
    fn subject_attributes(
        &self,
        subject: &SubjectId,
    ) -> std::result::Result<Attributes, ResolveError>;

    fn resource_attributes(
        &self,
        resource: &ResourceId,
    ) -> std::result::Result<Attributes, ResolveError>;

    /// Ambient request context (network, time-derived flags). Defaults to
    /// an empty record for resolvers that have none.
    fn environment_attributes(&self) -> std::result::Result<Attributes, ResolveError> {
        Ok(Attributes::new())
    }
}

// ============================================================================
// Decision
// ============================================================================

/// The outcome of one access evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Unique id, correlating the decision with its audit event.
    pub id: Uuid,
    /// PERMIT or DENY. Absent any applicable policy or permission the
    /// effect is DENY.
    pub effect: Effect,
    /// Human-readable explanation of how the effect was reached.
    pub reason: String,
    /// Obligations the caller must enforce alongside the effect.
    pub obligations: Vec<Obligation>,
    /// Composite risk score in `[0, 100]`.
    pub risk_score: f64,
    /// Names of the policies that contributed.
    pub policies_evaluated: Vec<String>,
    /// Names of the effective permissions that matched.
    pub permissions_matched: Vec<String>,
    /// Whether this decision was served from the cache.
    pub cached: bool,
    /// Whether the engine failed closed due to a resolution failure.
    pub degraded: bool,
    /// When the decision was computed.
    pub evaluated_at: DateTime<Utc>,
}

impl Default for Decision {
    /// The conservative zero value: a fresh DENY.
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            effect: Effect::Deny,
            reason: String::new(),
            obligations: Vec::new(),
            risk_score: 0.0,
            policies_evaluated: Vec::new(),
            permissions_matched: Vec::new(),
            cached: false,
            degraded: false,
            evaluated_at: Utc::now(),
        }
    }
}

impl Decision {
    pub fn is_permit(&self) -> bool {
        self.effect == Effect::Permit
    }
}

// ============================================================================
// Risk Signal Extraction
// ============================================================================

/// Derives the six risk signals from well-known paths in the merged
/// attribute record. Missing or mistyped attributes fall back to a neutral
/// 0.5 -- absence of telemetry is treated as moderate risk, not as safety.
pub fn signals_from_attributes(attrs: &Attributes) -> RiskSignals {
    RiskSignals {
        time_of_access: inverted_flag(attrs, "environment.business_hours"),
        location: inverted_flag(attrs, "environment.trusted_network"),
        device: inverted_flag(attrs, "subject.managed_device"),
        privilege_level: unit_number(attrs, "subject.privilege_level"),
        access_frequency: scaled_count(attrs, "environment.requests_last_hour", 100.0),
        resource_sensitivity: sensitivity(attrs),
    }
}

/// Boolean flag where `true` means safe; returns risk contribution.
fn inverted_flag(attrs: &Attributes, path: &str) -> f64 {
    match attrs.get_path(path) {
        Some(AttributeValue::Bool(true)) => 0.0,
        Some(AttributeValue::Bool(false)) => 1.0,
        _ => 0.5,
    }
}

fn unit_number(attrs: &Attributes, path: &str) -> f64 {
    attrs
        .get_path(path)
        .and_then(AttributeValue::as_f64)
        .map_or(0.5, |v| v.clamp(0.0, 1.0))
}

fn scaled_count(attrs: &Attributes, path: &str, full_scale: f64) -> f64 {
    attrs
        .get_path(path)
        .and_then(AttributeValue::as_f64)
        .map_or(0.5, |v| (v / full_scale).clamp(0.0, 1.0))
}

/// Resource sensitivity: numeric `[0,1]` directly, or a classification
/// label.
fn sensitivity(attrs: &Attributes) -> f64 {
    match attrs.get_path("resource.sensitivity") {
        Some(AttributeValue::Str(label)) => match label.as_str() {
            "public" => 0.0,
            "internal" => 0.3,
            "confidential" => 0.7,
            "restricted" => 1.0,
            _ => 0.5,
        },
        Some(value) => value.as_f64().map_or(0.5, |v| v.clamp(0.0, 1.0)),
        None => 0.5,
    }
}

// ============================================================================
// Decision Engine
// ============================================================================

/// Orchestrates resolution, RBAC, ABAC, combining, risk scoring, and the
/// decision cache.
///
/// All policy-model mutations go through the engine so every write clears
/// the cache.
pub struct DecisionEngine {
    store: Arc<PolicyStore>,
    cache: DecisionCache,
    resolver: Arc<dyn AttributeResolver>,
}

impl DecisionEngine {
    pub fn new(resolver: Arc<dyn AttributeResolver>) -> Self {
        Self {
            store: Arc::new(PolicyStore::new()),
            cache: DecisionCache::default(),
            resolver,
        }
    }

    /// Overrides the decision cache (e.g. to shorten the TTL).
    pub fn with_cache(mut self, cache: DecisionCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn store(&self) -> &PolicyStore {
        &self.store
    }

    // ------------------------------------------------------------------------
    // Mutating passthroughs -- every write invalidates the cache
    // ------------------------------------------------------------------------

    pub fn create_permission(&self, permission: Permission) -> Result<()> {
        self.store.create_permission(permission)?;
        self.cache.clear();
        Ok(())
    }

    pub fn update_permission(&self, permission: Permission) -> Result<()> {
        self.store.update_permission(permission)?;
        self.cache.clear();
        Ok(())
    }

    pub fn create_role(&self, role: Role) -> Result<()> {
        self.store.create_role(role)?;
        self.cache.clear();
        Ok(())
    }

    pub fn update_role(&self, role: Role) -> Result<()> {
        self.store.update_role(role)?;
        self.cache.clear();
        Ok(())
    }

    pub fn assign_role(&self, role_name: &str, subject: &str) -> Result<()> {
        self.store.assign_role(role_name, subject)?;
        self.cache.clear();
        Ok(())
    }

    pub fn unassign_role(&self, role_name: &str, subject: &str) -> Result<()> {
        self.store.unassign_role(role_name, subject)?;
        self.cache.clear();
        Ok(())
    }

    pub fn create_policy(&self, policy: Policy) -> Result<()> {
        self.store.create_policy(policy)?;
        self.cache.clear();
        Ok(())
    }

    pub fn update_policy(&self, policy: Policy) -> Result<()> {
        self.store.update_policy(policy)?;
        self.cache.clear();
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------------

    /// Evaluates an access request with no external anomaly findings.
    pub fn evaluate_access(
        &self,
        subject: &SubjectId,
        resource: &ResourceId,
        action: &str,
    ) -> Decision {
        self.evaluate_access_with_anomalies(subject, resource, action, &[])
    }

    /// Evaluates an access request, folding detector-supplied anomalies
    /// into the risk score.
    ///
    /// Total: never returns an error. Resolution failure yields a degraded
    /// DENY that bypasses the cache in both directions.
    pub fn evaluate_access_with_anomalies(
        &self,
        subject: &SubjectId,
        resource: &ResourceId,
        action: &str,
        anomalies: &[Anomaly],
    ) -> Decision {
        if let Some(hit) = self.cache.get(subject.as_str(), resource.as_str(), action) {
            debug!(%subject, %resource, action, "decision served from cache");
            return hit;
        }

        let attrs = match self.resolve_context(subject, resource, action) {
            Ok(attrs) => attrs,
            Err(err) => {
                warn!(%subject, %resource, action, error = %err, "attribute resolution failed; denying");
                return Decision {
                    id: Uuid::new_v4(),
                    effect: Effect::Deny,
                    reason: format!("attribute resolution failed: {err}"),
                    degraded: true,
                    ..Decision::default()
                };
            }
        };

        let mut decision = self.decide(subject, resource, action, &attrs);
        decision.risk_score = risk_score(&signals_from_attributes(&attrs), anomalies);

        self.cache
            .insert(subject.as_str(), resource.as_str(), action, decision.clone());
        decision
    }

    /// Merges resolver output into one namespaced record. The request
    /// coordinates are injected as `subject.id`/`resource.id` so conditions
    /// can reference them; a resolver that supplies its own `id` attribute
    /// (a directory key, say) keeps it.
    fn resolve_context(
        &self,
        subject: &SubjectId,
        resource: &ResourceId,
        action: &str,
    ) -> std::result::Result<Attributes, ResolveError> {
        let mut subject_attrs = self.resolver.subject_attributes(subject)?;
        if subject_attrs.get_path("id").is_none() {
            subject_attrs.set("id", subject.as_str());
        }
        let mut resource_attrs = self.resolver.resource_attributes(resource)?;
        if resource_attrs.get_path("id").is_none() {
            resource_attrs.set("id", resource.as_str());
        }
        let environment = self.resolver.environment_attributes()?;

        Ok(Attributes::new()
            .with_nested("subject", subject_attrs)
            .with_nested("resource", resource_attrs)
            .with_nested("environment", environment)
            .with("action", action))
    }

    fn decide(
        &self,
        subject: &SubjectId,
        resource: &ResourceId,
        action: &str,
        attrs: &Attributes,
    ) -> Decision {
        let now = Utc::now();

        // RBAC: effective permissions that cover this resource/action and
        // whose narrowing conditions all hold.
        let mut permissions_matched = Vec::new();
        let rbac_matches: Vec<MatchedRule> = self
            .store
            .effective_permissions(subject.as_str(), now)
            .into_iter()
            .filter(|p| permission_covers(p, resource.as_str(), action))
            .filter(|p| evaluate_conditions(attrs, &p.conditions).all_matched())
            .map(|p| {
                permissions_matched.push(p.name);
                MatchedRule {
                    effect: p.effect,
                    priority: p.priority,
                    obligations: Vec::new(),
                }
            })
            .collect();
        let rbac_outcome = CombiningAlgorithm::PriorityOrdered.combine(&rbac_matches);

        // ABAC: evaluate every in-effect policy whose target matches.
        let environment = attrs
            .get_path("environment.name")
            .map(AttributeValue::string_form)
            .unwrap_or_default();
        let policies = self.store.applicable_policies(
            subject.as_str(),
            resource.as_str(),
            action,
            &environment,
            now,
        );

        let mut policies_evaluated = Vec::new();
        let mut outer: Vec<MatchedRule> = Vec::new();
        for policy in &policies {
            let outcome = policy.evaluate(attrs);
            self.store.record_evaluation(&policy.name);
            policies_evaluated.push(policy.name.clone());
            if let Some(effect) = outcome.effect {
                outer.push(MatchedRule {
                    effect,
                    priority: outcome.priority,
                    obligations: outcome.obligations,
                });
            }
        }
        if let Some(effect) = rbac_outcome.effect {
            outer.push(MatchedRule {
                effect,
                priority: rbac_outcome.priority,
                obligations: rbac_outcome.obligations,
            });
        }

        // Outer combining: if every applicable policy agrees on an
        // algorithm use it, otherwise fall back to deny-overrides.
        let algorithm = outer_algorithm(&policies);
        outer.sort_by(|a, b| b.priority.cmp(&a.priority));
        let combined = algorithm.combine(&outer);

        let (effect, reason) = match combined.effect {
            Some(Effect::Permit) => (
                Effect::Permit,
                format!(
                    "permitted by {} matched source(s)",
                    outer.iter().filter(|m| m.effect == Effect::Permit).count()
                ),
            ),
            Some(Effect::Deny) => (
                Effect::Deny,
                format!(
                    "denied by {} matched source(s)",
                    outer.iter().filter(|m| m.effect == Effect::Deny).count()
                ),
            ),
            None => (
                Effect::Deny,
                "no applicable policy or permission; default deny".to_string(),
            ),
        };
        debug!(%subject, %resource, action, ?effect, "decision computed");

        Decision {
            id: Uuid::new_v4(),
            effect,
            reason,
            obligations: combined.obligations,
            risk_score: 0.0,
            policies_evaluated,
            permissions_matched,
            cached: false,
            degraded: false,
            evaluated_at: now,
        }
    }
}

/// Whether a permission's resource pattern and action cover the request.
fn permission_covers(permission: &Permission, resource: &str, action: &str) -> bool {
    permission.action == action && glob_matches(&permission.resource, resource)
}

/// Consensus combining algorithm for the policy-set level.
fn outer_algorithm(policies: &[Policy]) -> CombiningAlgorithm {
    let mut algorithms = policies.iter().map(|p| p.combining);
    match algorithms.next() {
        Some(first) if algorithms.all(|a| a == first) => first,
        _ => CombiningAlgorithm::DenyOverrides,
    }
}

// ============================================================================
// Tests
// ============================================================================
