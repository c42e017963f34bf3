//! Decision cache keyed by `(subject, resource, action)`.
//!
//! Positive and negative decisions are both cached with a TTL. Invalidation
//! is deliberately coarse: any permission/role/policy mutation clears the
//! whole cache. Per-entry dependency tracking would invalidate less, but a
//! stale PERMIT after a policy tightening is a security hole, so the engine
//! trades hit rate for correctness.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::engine::Decision;

/// Default time-to-live for cached decisions.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    subject: String,
    resource: String,
    action: String,
}

#[derive(Debug, Clone)]
struct CachedDecision {
    decision: Decision,
    expires_at: Instant,
}

/// TTL cache of access decisions.
#[derive(Debug)]
pub struct DecisionCache {
    entries: RwLock<HashMap<CacheKey, CachedDecision>>,
    ttl: Duration,
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl DecisionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Looks up a live cached decision. Expired entries miss (and are left
    /// for the next insert or clear to reap).
    pub fn get(&self, subject: &str, resource: &str, action: &str) -> Option<Decision> {
        let key = CacheKey {
            subject: subject.to_string(),
            resource: resource.to_string(),
            action: action.to_string(),
        };
        let entries = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let cached = entries.get(&key)?;
        if cached.expires_at <= Instant::now() {
            return None;
        }
        let mut decision = cached.decision.clone();
        decision.cached = true;
        Some(decision)
    }

    /// Caches a decision for the TTL. Expired entries are reaped on the way
    /// in so the map does not grow unbounded under a churning key set.
    pub fn insert(&self, subject: &str, resource: &str, action: &str, decision: Decision) {
        let key = CacheKey {
            subject: subject.to_string(),
            resource: resource.to_string(),
            action: action.to_string(),
        };
        let now = Instant::now();
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, cached| cached.expires_at > now);
        entries.insert(
            key,
            CachedDecision {
                decision,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Drops every cached decision. Called on any policy-model mutation.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of entries currently held (live or expired-but-unreaped).
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::Effect;

    fn decision(effect: Effect) -> Decision {
        Decision {
            effect,
            ..Decision::default()
        }
    }

    #[test]
    fn test_hit_sets_cached_flag() {
        let cache = DecisionCache::default();
        let fresh = decision(Effect::Permit);
        assert!(!fresh.cached);
        cache.insert("alice", "content/1", "read", fresh);

        let hit = cache.get("alice", "content/1", "read").unwrap();
        assert!(hit.cached, "a served entry must be marked cached");
        assert_eq!(hit.effect, Effect::Permit);
    }

    #[test]
    fn test_miss_on_different_key() {
        let cache = DecisionCache::default();
        cache.insert("alice", "content/1", "read", decision(Effect::Permit));
        assert!(cache.get("alice", "content/1", "write").is_none());
        assert!(cache.get("alice", "content/2", "read").is_none());
        assert!(cache.get("bob", "content/1", "read").is_none());
    }

    #[test]
    fn test_expired_entry_misses() {
        let cache = DecisionCache::new(Duration::ZERO);
        cache.insert("alice", "content/1", "read", decision(Effect::Permit));
        assert!(cache.get("alice", "content/1", "read").is_none());
    }

    #[test]
    fn test_clear_drops_everything() {
        let cache = DecisionCache::default();
        cache.insert("alice", "content/1", "read", decision(Effect::Permit));
        cache.insert("bob", "content/2", "read", decision(Effect::Deny));
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("alice", "content/1", "read").is_none());
    }

    #[test]
    fn test_insert_reaps_expired() {
        let cache = DecisionCache::new(Duration::ZERO);
        cache.insert("a", "r", "x", decision(Effect::Permit));
        cache.insert("b", "r", "x", decision(Effect::Permit));
        // Both prior entries were already expired when the last insert ran.
        assert_eq!(cache.len(), 1);
    }
}
