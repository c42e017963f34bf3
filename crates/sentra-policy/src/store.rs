//! In-memory policy store with creation-time reference checking.
//!
//! Holds the permission, role, and policy registries behind interior
//! `RwLock`s so a shared store can serve concurrent evaluations. All
//! referential integrity is enforced at write time: a role may only name
//! permissions and parents that exist, and the inheritance graph is checked
//! for cycles before any write lands. Reads during evaluation never fail.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{PolicyError, Result};
use crate::permission::Permission;
use crate::policy::Policy;
use crate::role::Role;

// ============================================================================
// Policy Store
// ============================================================================

/// Registry of permissions, roles, and policies.
///
/// Evaluation counters are tracked per policy so operators can see which
/// policies actually fire.
#[derive(Debug, Default)]
pub struct PolicyStore {
    permissions: RwLock<HashMap<String, Permission>>,
    roles: RwLock<HashMap<String, Role>>,
    policies: RwLock<HashMap<String, Policy>>,
    eval_counts: RwLock<HashMap<String, u64>>,
    /// Bumped on every mutation; lets the engine detect staleness cheaply.
    generation: AtomicU64,
}

// Lock poisoning only happens if a writer panicked mid-update; the data is
// plain-old-data, so recovering the guard is safe.
fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic mutation counter. Any change to any registry bumps it.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    // ------------------------------------------------------------------------
    // Permissions
    // ------------------------------------------------------------------------

    /// Registers a permission. Fails on validation or a duplicate name.
    pub fn create_permission(&self, permission: Permission) -> Result<()> {
        permission.validate()?;
        let mut permissions = write_lock(&self.permissions);
        if permissions.contains_key(&permission.name) {
            return Err(PolicyError::Duplicate(permission.name));
        }
        debug!(name = %permission.name, "permission created");
        permissions.insert(permission.name.clone(), permission);
        drop(permissions);
        self.bump_generation();
        Ok(())
    }

    /// Replaces an existing permission in full.
    pub fn update_permission(&self, permission: Permission) -> Result<()> {
        permission.validate()?;
        let mut permissions = write_lock(&self.permissions);
        if !permissions.contains_key(&permission.name) {
            return Err(PolicyError::UnknownPermission(permission.name));
        }
        permissions.insert(permission.name.clone(), permission);
        drop(permissions);
        self.bump_generation();
        Ok(())
    }

    pub fn get_permission(&self, name: &str) -> Option<Permission> {
        read_lock(&self.permissions).get(name).cloned()
    }

    pub fn list_permissions(&self) -> Vec<Permission> {
        let mut all: Vec<Permission> = read_lock(&self.permissions).values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    // ------------------------------------------------------------------------
    // Roles
    // ------------------------------------------------------------------------

    /// Registers a role after checking every permission and parent reference
    /// and rejecting inheritance cycles.
    pub fn create_role(&self, role: Role) -> Result<()> {
        role.validate()?;
        self.check_role_references(&role)?;
        let mut roles = write_lock(&self.roles);
        if roles.contains_key(&role.name) {
            return Err(PolicyError::Duplicate(role.name));
        }
        Self::check_no_cycle(&roles, &role)?;
        debug!(name = %role.name, parents = role.inherits_from.len(), "role created");
        roles.insert(role.name.clone(), role);
        drop(roles);
        self.bump_generation();
        Ok(())
    }

    /// Replaces an existing role in full, re-running reference and cycle
    /// checks against the current graph.
    pub fn update_role(&self, role: Role) -> Result<()> {
        role.validate()?;
        self.check_role_references(&role)?;
        let mut roles = write_lock(&self.roles);
        if !roles.contains_key(&role.name) {
            return Err(PolicyError::UnknownRole(role.name));
        }
        Self::check_no_cycle(&roles, &role)?;
        roles.insert(role.name.clone(), role);
        drop(roles);
        self.bump_generation();
        Ok(())
    }

    pub fn get_role(&self, name: &str) -> Option<Role> {
        read_lock(&self.roles).get(name).cloned()
    }

    pub fn list_roles(&self) -> Vec<Role> {
        let mut all: Vec<Role> = read_lock(&self.roles).values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Assigns a role to a subject, honoring the role's assignment cap.
    pub fn assign_role(&self, role_name: &str, subject: &str) -> Result<()> {
        let mut roles = write_lock(&self.roles);
        let role = roles
            .get_mut(role_name)
            .ok_or_else(|| PolicyError::UnknownRole(role_name.to_string()))?;
        role.assign_user(subject)?;
        drop(roles);
        self.bump_generation();
        Ok(())
    }

    /// Removes a role assignment. Unassigning a subject that does not hold
    /// the role is a no-op.
    pub fn unassign_role(&self, role_name: &str, subject: &str) -> Result<()> {
        let mut roles = write_lock(&self.roles);
        let role = roles
            .get_mut(role_name)
            .ok_or_else(|| PolicyError::UnknownRole(role_name.to_string()))?;
        role.unassign_user(subject);
        drop(roles);
        self.bump_generation();
        Ok(())
    }

    fn check_role_references(&self, role: &Role) -> Result<()> {
        let permissions = read_lock(&self.permissions);
        for perm_name in &role.permissions {
            if !permissions.contains_key(perm_name) {
                return Err(PolicyError::UnknownPermission(perm_name.clone()));
            }
        }
        drop(permissions);
        let roles = read_lock(&self.roles);
        for parent in &role.inherits_from {
            if *parent != role.name && !roles.contains_key(parent) {
                return Err(PolicyError::UnknownRole(parent.clone()));
            }
        }
        Ok(())
    }

    /// Depth-first walk from the candidate role's parents; visiting the
    /// candidate again means the insertion would close a cycle.
    fn check_no_cycle(roles: &HashMap<String, Role>, candidate: &Role) -> Result<()> {
        let mut stack: Vec<&str> = candidate.inherits_from.iter().map(String::as_str).collect();
        let mut visited: HashSet<&str> = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == candidate.name {
                return Err(PolicyError::InheritanceCycle(candidate.name.clone()));
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(role) = roles.get(current) {
                stack.extend(role.inherits_from.iter().map(String::as_str));
            }
        }
        Ok(())
    }

    /// Resolves the subject's effective permissions: direct roles plus the
    /// transitive closure of role inheritance, deduplicated by name.
    ///
    /// Traversal-order independent -- the result is sorted by permission
    /// name. Roles dormant outside their time window at `now` contribute
    /// nothing.
    pub fn effective_permissions(&self, subject: &str, now: DateTime<Utc>) -> Vec<Permission> {
        let roles = read_lock(&self.roles);
        let mut stack: Vec<&Role> = roles
            .values()
            .filter(|r| r.assigned_users.iter().any(|u| u == subject))
            .collect();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut perm_names: HashSet<&str> = HashSet::new();

        while let Some(role) = stack.pop() {
            if !visited.insert(role.name.as_str()) {
                continue;
            }
            if let Some(window) = &role.constraints.time_window {
                if !window.contains(now) {
                    continue;
                }
            }
            perm_names.extend(role.permissions.iter().map(String::as_str));
            for parent in &role.inherits_from {
                if let Some(parent_role) = roles.get(parent) {
                    stack.push(parent_role);
                }
            }
        }

        let permissions = read_lock(&self.permissions);
        let mut effective: Vec<Permission> = perm_names
            .into_iter()
            .filter_map(|name| permissions.get(name))
            .filter(|p| p.active)
            .cloned()
            .collect();
        effective.sort_by(|a, b| a.name.cmp(&b.name));
        effective
    }

    /// Names of the roles a subject holds directly (not transitively).
    pub fn roles_of(&self, subject: &str) -> Vec<String> {
        let mut names: Vec<String> = read_lock(&self.roles)
            .values()
            .filter(|r| r.assigned_users.iter().any(|u| u == subject))
            .map(|r| r.name.clone())
            .collect();
        names.sort();
        names
    }

    // ------------------------------------------------------------------------
    // Policies
    // ------------------------------------------------------------------------

    /// Registers a policy. Fails on validation or a duplicate name.
    pub fn create_policy(&self, policy: Policy) -> Result<()> {
        policy.validate()?;
        let mut policies = write_lock(&self.policies);
        if policies.contains_key(&policy.name) {
            return Err(PolicyError::Duplicate(policy.name));
        }
        debug!(name = %policy.name, rules = policy.rules.len(), "policy created");
        policies.insert(policy.name.clone(), policy);
        drop(policies);
        self.bump_generation();
        Ok(())
    }

    /// Replaces an existing policy in full.
    pub fn update_policy(&self, policy: Policy) -> Result<()> {
        policy.validate()?;
        let mut policies = write_lock(&self.policies);
        if !policies.contains_key(&policy.name) {
            return Err(PolicyError::UnknownPolicy(policy.name));
        }
        policies.insert(policy.name.clone(), policy);
        drop(policies);
        self.bump_generation();
        Ok(())
    }

    pub fn get_policy(&self, name: &str) -> Option<Policy> {
        read_lock(&self.policies).get(name).cloned()
    }

    /// Policies in effect at `now` whose target matches the request,
    /// sorted by name for deterministic evaluation order.
    pub fn applicable_policies(
        &self,
        subject: &str,
        resource: &str,
        action: &str,
        environment: &str,
        now: DateTime<Utc>,
    ) -> Vec<Policy> {
        let mut applicable: Vec<Policy> = read_lock(&self.policies)
            .values()
            .filter(|p| p.is_in_effect(now))
            .filter(|p| p.target.matches(subject, resource, action, environment))
            .cloned()
            .collect();
        applicable.sort_by(|a, b| a.name.cmp(&b.name));
        applicable
    }

    /// Records that a policy contributed to a decision.
    pub fn record_evaluation(&self, policy_name: &str) {
        *write_lock(&self.eval_counts)
            .entry(policy_name.to_string())
            .or_insert(0) += 1;
    }

    /// Times the named policy has contributed to a decision.
    pub fn evaluation_count(&self, policy_name: &str) -> u64 {
        read_lock(&self.eval_counts)
            .get(policy_name)
            .copied()
            .unwrap_or(0)
    }
}

// ============================================================================
// Tests
// ============================================================================
