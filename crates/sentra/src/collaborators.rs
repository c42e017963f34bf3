//! External collaborator seams and in-memory reference implementations.
//!
//! The core consumes attributes and emits structured events; both cross a
//! trait boundary so deployments can plug in their directory service and
//! event pipeline. The in-memory implementations here back tests and
//! single-process embedding.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use sentra_policy::{AttributeResolver, ResolveError};
use sentra_types::{Attributes, ResourceId, Severity, SubjectId};

// ============================================================================
// Event Sink
// ============================================================================

/// A structured event forwarded to the surrounding system (notification
/// pipeline, SIEM forwarder).
#[derive(Debug, Clone, PartialEq)]
pub struct SinkEvent {
    pub category: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub metadata: serde_json::Value,
}

/// Receives significant decisions and findings.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SinkEvent);
}

/// Discards everything; the default when no pipeline is wired up.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: SinkEvent) {}
}

/// Buffers emitted events for inspection. Test/demo collaborator.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<SinkEvent> {
        std::mem::take(
            &mut *self
                .events
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: SinkEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

// ============================================================================
// Static Attribute Resolver
// ============================================================================

/// Attribute resolver backed by fixed in-memory records.
///
/// Unknown subjects and resources resolve to empty records rather than
/// erroring: with no attributes, no policy target or condition can match,
/// so evaluation falls through to the default DENY.
#[derive(Default)]
pub struct StaticAttributeResolver {
    subjects: HashMap<String, Attributes>,
    resources: HashMap<String, Attributes>,
    environment: Attributes,
}

impl StaticAttributeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subject(mut self, id: &str, attrs: Attributes) -> Self {
        self.subjects.insert(id.to_string(), attrs);
        self
    }

    pub fn with_resource(mut self, id: &str, attrs: Attributes) -> Self {
        self.resources.insert(id.to_string(), attrs);
        self
    }

    pub fn with_environment(mut self, attrs: Attributes) -> Self {
        self.environment = attrs;
        self
    }
}

impl AttributeResolver for StaticAttributeResolver {
    fn subject_attributes(&self, subject: &SubjectId) -> Result<Attributes, ResolveError> {
        Ok(self
            .subjects
            .get(subject.as_str())
            .cloned()
            .unwrap_or_default())
    }

    fn resource_attributes(&self, resource: &ResourceId) -> Result<Attributes, ResolveError> {
        Ok(self
            .resources
            .get(resource.as_str())
            .cloned()
            .unwrap_or_default())
    }

    fn environment_attributes(&self) -> Result<Attributes, ResolveError> {
        Ok(self.environment.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================
