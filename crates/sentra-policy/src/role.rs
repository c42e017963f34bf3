//! Role definitions with multiple inheritance and assignment constraints.
//!
//! A role grants a set of named permissions and may inherit from any number
//! of parent roles. The inheritance graph must stay acyclic -- the store
//! rejects a cyclic `inherits_from` at creation time, and effective
//! permission resolution is traversal-order independent.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, Result};

// ============================================================================
// Time Window
// ============================================================================

/// Time-of-day/day-of-week window in which a role may be exercised.
///
/// Days use ISO numbering (1 = Monday .. 7 = Sunday). The window is
/// evaluated in the configured UTC offset, so "09:00-17:00 in UTC+2" works
/// without a timezone database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// First hour (inclusive, 0-23) in local time.
    pub start_hour: u8,
    /// End hour (exclusive, 1-24) in local time.
    pub end_hour: u8,
    /// Allowed ISO weekdays (1 = Monday .. 7 = Sunday).
    pub days: Vec<u8>,
    /// Offset from UTC in minutes (e.g. 120 for UTC+2).
    pub utc_offset_minutes: i32,
}

impl TimeWindow {
    /// Standard business hours: 09:00-17:00, Monday-Friday, at the given
    /// UTC offset.
    pub fn business_hours(utc_offset_minutes: i32) -> Self {
        Self {
            start_hour: 9,
            end_hour: 17,
            days: vec![1, 2, 3, 4, 5],
            utc_offset_minutes,
        }
    }

    /// Returns whether `ts` falls inside the window.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        let local = ts + chrono::Duration::minutes(i64::from(self.utc_offset_minutes));
        let day = local.weekday().number_from_monday() as u8;
        let hour = local.hour() as u8;
        self.days.contains(&day) && hour >= self.start_hour && hour < self.end_hour
    }
}

// ============================================================================
// Constraints
// ============================================================================

/// Assignment and exercise constraints attached to a role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleConstraints {
    /// Maximum number of users that may hold this role at once.
    pub max_assigned_users: Option<usize>,
    /// Whether granting this role requires an approval workflow.
    #[serde(default)]
    pub requires_approval: bool,
    /// Optional time window outside which the role is dormant.
    pub time_window: Option<TimeWindow>,
    /// Maximum duration in hours for temporary elevation into this role.
    pub max_temporary_hours: Option<u32>,
    /// Source IPs from which the role may be exercised (exact or CIDR-style
    /// prefix strings; matching is the caller's concern).
    pub ip_allowlist: Option<Vec<String>>,
}

// ============================================================================
// Role
// ============================================================================

/// A named bundle of permissions with optional parent roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    /// Unique role name.
    pub name: String,
    /// Names of permissions granted directly by this role.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Parent roles whose effective permissions this role inherits.
    #[serde(default)]
    pub inherits_from: Vec<String>,
    /// Assignment and exercise constraints.
    #[serde(default)]
    pub constraints: RoleConstraints,
    /// Subjects currently assigned this role.
    #[serde(default)]
    pub assigned_users: Vec<String>,
}

impl Role {
    /// Creates an empty role.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: Vec::new(),
            inherits_from: Vec::new(),
            constraints: RoleConstraints::default(),
            assigned_users: Vec::new(),
        }
    }

    /// Grants a permission by name.
    pub fn with_permission(mut self, permission_name: &str) -> Self {
        self.permissions.push(permission_name.to_string());
        self
    }

    /// Adds a parent role.
    pub fn inheriting(mut self, parent: &str) -> Self {
        self.inherits_from.push(parent.to_string());
        self
    }

    /// Sets the constraints.
    pub fn with_constraints(mut self, constraints: RoleConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Assigns a user, honoring `max_assigned_users`.
    pub fn assign_user(&mut self, user: &str) -> Result<()> {
        if self.assigned_users.iter().any(|u| u == user) {
            return Ok(()); // idempotent
        }
        if let Some(max) = self.constraints.max_assigned_users {
            if self.assigned_users.len() >= max {
                return Err(PolicyError::ConstraintViolated(format!(
                    "role '{}' is capped at {max} assigned users",
                    self.name
                )));
            }
        }
        self.assigned_users.push(user.to_string());
        Ok(())
    }

    /// Removes a user assignment.
    pub fn unassign_user(&mut self, user: &str) {
        self.assigned_users.retain(|u| u != user);
    }

    /// Basic shape validation (name non-empty, no self-inheritance, no
    /// duplicate parents). Reference existence and cycle checks live in the
    /// store, which can see the whole graph.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PolicyError::Validation(
                "role name must not be empty".to_string(),
            ));
        }
        if self.inherits_from.iter().any(|p| *p == self.name) {
            return Err(PolicyError::InheritanceCycle(self.name.clone()));
        }
        let mut parents = self.inherits_from.clone();
        parents.sort();
        parents.dedup();
        if parents.len() != self.inherits_from.len() {
            return Err(PolicyError::Validation(format!(
                "role '{}' lists a duplicate parent",
                self.name
            )));
        }
        if let Some(window) = &self.constraints.time_window {
            if window.start_hour >= window.end_hour
                || window.end_hour > 24
                || window.days.iter().any(|d| !(1..=7).contains(d))
            {
                return Err(PolicyError::Validation(format!(
                    "role '{}' has a malformed time window",
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
