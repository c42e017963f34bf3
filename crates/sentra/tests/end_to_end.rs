//! End-to-end flows through the assembled service: grant a permission via
//! a role, permit it under policy, observe caching and auditing, and check
//! the combining laws hold at the facade level.

use std::sync::Arc;

use sentra::{CollectingSink, Sentra, StaticAttributeResolver};
use sentra_audit::{AuditCategory, EventFilter, Operation};
use sentra_eval::{Condition, ConditionOperator};
use sentra_monitor::{FindingKind, RuleKind, WatchRule};
use sentra_policy::{
    CombiningAlgorithm, Effect, Permission, Policy, PolicyRule, Role, RuleExpr, Target,
};
use sentra_types::{Attributes, ResourceId, Severity, SubjectId};

fn editorial_service() -> (Sentra, Arc<CollectingSink>) {
    let resolver = StaticAttributeResolver::new()
        .with_subject(
            "alice",
            Attributes::new()
                .with("department", "editorial")
                .with("managed_device", true),
        )
        .with_subject(
            "mallory",
            Attributes::new().with("department", "contractors"),
        )
        .with_resource(
            "content",
            Attributes::new().with("sensitivity", "internal"),
        )
        .with_environment(
            Attributes::new()
                .with("business_hours", true)
                .with("trusted_network", true),
        );
    let sink = Arc::new(CollectingSink::new());
    let svc = Sentra::new(Arc::new(resolver)).with_sink(sink.clone());
    (svc, sink)
}

fn grant_article_creation(svc: &Sentra) -> anyhow::Result<()> {
    svc.create_permission(
        "root",
        Permission::new("content", "create").with_qualifier("article"),
    )?;
    svc.create_role(
        "root",
        Role::new("editor").with_permission("content:create:article"),
    )?;
    svc.assign_role("root", "editor", "alice")?;
    svc.create_policy(
        "root",
        Policy::new("editorial-access", CombiningAlgorithm::DenyOverrides)
            .with_target(Target::default().with_resource("content*"))
            .with_rule(PolicyRule::new(
                "editorial-only",
                RuleExpr::Cond(Condition::new(
                    "subject.department",
                    ConditionOperator::Equals,
                    "editorial",
                )),
                Effect::Permit,
            )),
    )?;
    Ok(())
}

#[test]
fn permission_role_policy_grant_permits() -> anyhow::Result<()> {
    let (svc, _sink) = editorial_service();
    grant_article_creation(&svc)?;

    let decision = svc.evaluate_access(
        &SubjectId::new("alice"),
        &ResourceId::new("content"),
        "create",
    );
    assert!(decision.is_permit());
    assert!(!decision.cached);
    assert_eq!(decision.permissions_matched, vec!["content:create:article"]);
    assert_eq!(decision.policies_evaluated, vec!["editorial-access"]);
    assert!((0.0..=100.0).contains(&decision.risk_score));

    // Policy evaluation counter moved.
    assert_eq!(svc.engine().store().evaluation_count("editorial-access"), 1);
    Ok(())
}

#[test]
fn second_evaluation_is_served_from_cache() -> anyhow::Result<()> {
    let (svc, _sink) = editorial_service();
    grant_article_creation(&svc)?;
    let subject = SubjectId::new("alice");
    let resource = ResourceId::new("content");

    let first = svc.evaluate_access(&subject, &resource, "create");
    let second = svc.evaluate_access(&subject, &resource, "create");
    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(second.effect, first.effect);

    // Only the fresh computation is audited.
    let audited = svc.query_audit_events(
        &EventFilter::new()
            .category(AuditCategory::Authorization)
            .subject("alice"),
    );
    assert_eq!(audited.len(), 1);
    Ok(())
}

#[test]
fn deny_overrides_beats_lower_priority_permits() -> anyhow::Result<()> {
    let (svc, sink) = editorial_service();
    grant_article_creation(&svc)?;
    svc.create_policy(
        "root",
        Policy::new("contractor-lockout", CombiningAlgorithm::DenyOverrides).with_rule(
            PolicyRule::new(
                "no-contractors",
                RuleExpr::Cond(Condition::new(
                    "subject.department",
                    ConditionOperator::Equals,
                    "contractors",
                )),
                Effect::Deny,
            )
            .with_priority(1),
        ),
    )?;

    let decision = svc.evaluate_access(
        &SubjectId::new("mallory"),
        &ResourceId::new("content"),
        "create",
    );
    assert_eq!(decision.effect, Effect::Deny);

    // Denials are forwarded to the event sink.
    let emitted = sink.drain();
    assert!(emitted.iter().any(|e| e.category == "decision"));
    Ok(())
}

#[test]
fn permit_overrides_lets_a_permit_win() -> anyhow::Result<()> {
    let (svc, _sink) = editorial_service();
    svc.create_policy(
        "root",
        Policy::new("lenient", CombiningAlgorithm::PermitOverrides)
            .with_rule(PolicyRule::new(
                "deny-all",
                RuleExpr::All(vec![]),
                Effect::Deny,
            ))
            .with_rule(PolicyRule::new(
                "permit-editorial",
                RuleExpr::Cond(Condition::new(
                    "subject.department",
                    ConditionOperator::Equals,
                    "editorial",
                )),
                Effect::Permit,
            )),
    )?;

    let decision = svc.evaluate_access(
        &SubjectId::new("alice"),
        &ResourceId::new("content"),
        "read",
    );
    assert_eq!(decision.effect, Effect::Permit);
    Ok(())
}

#[test]
fn policy_mutation_invalidates_cached_permit() -> anyhow::Result<()> {
    let (svc, _sink) = editorial_service();
    grant_article_creation(&svc)?;
    let subject = SubjectId::new("alice");
    let resource = ResourceId::new("content");

    svc.evaluate_access(&subject, &resource, "create");
    assert!(svc.evaluate_access(&subject, &resource, "create").cached);

    svc.create_policy(
        "root",
        Policy::new("freeze", CombiningAlgorithm::DenyOverrides).with_rule(PolicyRule::new(
            "deny-all",
            RuleExpr::All(vec![]),
            Effect::Deny,
        )),
    )?;

    let after = svc.evaluate_access(&subject, &resource, "create");
    assert!(!after.cached, "a stale PERMIT must not survive the change");
    assert_eq!(after.effect, Effect::Deny);
    Ok(())
}

#[test]
fn monitoring_rule_raises_and_forwards_alert() -> anyhow::Result<()> {
    let (svc, sink) = editorial_service();
    svc.create_rule(
        "root",
        WatchRule::new("failed-login-burst", RuleKind::Monitoring, Severity::Medium)
            .with_condition(Condition::new(
                "failures_last_hour",
                ConditionOperator::GreaterThan,
                5_i64,
            )),
    )?;

    let findings = svc.analyze_event(
        Some("mallory"),
        &Attributes::new().with("failures_last_hour", 12_i64),
    );
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].kind, FindingKind::Alert);

    let emitted = sink.drain();
    assert!(emitted.iter().any(|e| e.category == "alert"));
    Ok(())
}

#[test]
fn audit_trail_diff_and_integrity() -> anyhow::Result<()> {
    let (svc, _sink) = editorial_service();

    let trail = svc.create_audit_trail(
        "user",
        "u-1",
        Operation::Update,
        serde_json::json!({ "email": "a" }),
        serde_json::json!({ "email": "b" }),
        "root",
        "support ticket",
    )?;
    assert_eq!(trail.changes.len(), 1);
    assert_eq!(trail.changes[0].field, "email");

    // The correlated DataModification event exists and verifies cleanly.
    let events = svc.query_audit_events(
        &EventFilter::new().category(AuditCategory::DataModification),
    );
    assert_eq!(events.len(), 1);
    let report = svc.verify_integrity(&[events[0].id]);
    assert!(report.is_clean());
    assert!(svc.monitor().open_findings().is_empty());
    Ok(())
}
