//! Permission types for access control.
//!
//! A [`Permission`] grants or denies one `resource:action` pair, optionally
//! narrowed by attribute conditions. Permissions are referenced by name from
//! roles; once a cached decision depends on one, any update must invalidate
//! the decision cache (the engine enforces this).

use std::collections::BTreeMap;

use sentra_eval::Condition;
use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, Result};

// ============================================================================
// Effect
// ============================================================================

/// The effect a permission or rule produces when it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// Access is granted.
    Permit,
    /// Access is refused.
    Deny,
}

// ============================================================================
// Permission
// ============================================================================

/// A named grant (or denial) of one action on one resource.
///
/// The name follows the `resource:action[:qualifier]` pattern and must agree
/// with the `resource` and `action` fields -- [`Permission::validate`]
/// rejects anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    /// Unique name, `resource:action` or `resource:action:qualifier`.
    pub name: String,
    /// Resource pattern this permission covers (glob, e.g. `content/*`).
    pub resource: String,
    /// Action this permission covers.
    pub action: String,
    /// Attribute conditions narrowing the grant; all must match.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Whether a match permits or denies.
    pub effect: Effect,
    /// Priority for tie-breaking; higher wins.
    #[serde(default)]
    pub priority: i32,
    /// Inactive permissions never contribute to a decision.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Free-form metadata (owner, ticket, description).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

fn default_active() -> bool {
    true
}

impl Permission {
    /// Creates an active PERMIT permission named `resource:action`.
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        let resource = resource.into();
        let action = action.into();
        Self {
            name: format!("{resource}:{action}"),
            resource,
            action,
            conditions: Vec::new(),
            effect: Effect::Permit,
            priority: 0,
            active: true,
            metadata: BTreeMap::new(),
        }
    }

    /// Appends a qualifier segment to the name (`resource:action:qualifier`).
    pub fn with_qualifier(mut self, qualifier: &str) -> Self {
        self.name = format!("{}:{}:{qualifier}", self.resource, self.action);
        self
    }

    /// Sets the effect.
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Adds a narrowing condition.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Validates the name pattern and field agreement.
    ///
    /// The name must be 2 or 3 non-empty colon-separated segments, and the
    /// first two must equal `resource` and `action`.
    pub fn validate(&self) -> Result<()> {
        let segments: Vec<&str> = self.name.split(':').collect();
        if !(2..=3).contains(&segments.len()) || segments.iter().any(|s| s.is_empty()) {
            return Err(PolicyError::Validation(format!(
                "permission name '{}' must match resource:action[:qualifier]",
                self.name
            )));
        }
        if segments[0] != self.resource || segments[1] != self.action {
            return Err(PolicyError::Validation(format!(
                "permission name '{}' does not agree with resource '{}' and action '{}'",
                self.name, self.resource, self.action
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
