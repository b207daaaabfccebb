/// Integration tests for billing plan synchronization
///
/// These verify idempotent event consumption and that a team's plan,
/// derived prompt limit, and billing reference move together.
mod common;

use common::TestContext;
use promptdeck_engine::plan_sync::{PlanChangeEvent, PlanSubject, PlanSyncError, SyncOutcome};
use promptdeck_shared::audit::AuditAction;
use promptdeck_shared::models::{Plan, Role, TeamId};
use promptdeck_shared::store::Store;

#[tokio::test]
async fn test_team_upgrade_applies_plan_limit_and_ref() {
    let ctx = TestContext::new();
    let owner = ctx.seed_user("owner@example.com");
    let team_id = ctx.seed_team(vec![(owner, Role::Owner)]);

    let event = PlanChangeEvent {
        event_id: "evt_001".to_string(),
        subject: PlanSubject::Team(team_id),
        new_plan: Plan::Pro,
        subscription_ref: Some("sub_abc123".to_string()),
    };
    let outcome = ctx.plan_sync.apply(&event).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Applied);

    let team = ctx.store.get_team(team_id).await.unwrap();
    assert_eq!(team.plan, Plan::Pro);
    assert_eq!(team.prompt_limit, u32::MAX);
    assert_eq!(team.billing_ref.as_deref(), Some("sub_abc123"));

    let events = ctx.audit.events_for(AuditAction::PlanSync);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].actor_id, None);
}

#[tokio::test]
async fn test_redelivered_event_is_a_noop() {
    let ctx = TestContext::new();
    let owner = ctx.seed_user("owner@example.com");
    let team_id = ctx.seed_team(vec![(owner, Role::Owner)]);

    let upgrade = PlanChangeEvent {
        event_id: "evt_up".to_string(),
        subject: PlanSubject::Team(team_id),
        new_plan: Plan::Pro,
        subscription_ref: None,
    };
    assert_eq!(
        ctx.plan_sync.apply(&upgrade).await.unwrap(),
        SyncOutcome::Applied
    );

    // A later event moves the team back to Free...
    let downgrade = PlanChangeEvent {
        event_id: "evt_down".to_string(),
        subject: PlanSubject::Team(team_id),
        new_plan: Plan::Free,
        subscription_ref: None,
    };
    ctx.plan_sync.apply(&downgrade).await.unwrap();

    // ...and the provider redelivering the old upgrade must not resurrect it
    assert_eq!(
        ctx.plan_sync.apply(&upgrade).await.unwrap(),
        SyncOutcome::Duplicate
    );

    let team = ctx.store.get_team(team_id).await.unwrap();
    assert_eq!(team.plan, Plan::Free);

    let events = ctx.audit.events_for(AuditAction::PlanSync);
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn test_user_plan_event() {
    let ctx = TestContext::new();
    let user_id = ctx.seed_user("solo@example.com");

    let event = PlanChangeEvent {
        event_id: "evt_user".to_string(),
        subject: PlanSubject::User(user_id),
        new_plan: Plan::Pro,
        subscription_ref: None,
    };
    ctx.plan_sync.apply(&event).await.unwrap();

    let user = ctx.store.get_user(user_id).await.unwrap();
    assert_eq!(user.plan, Plan::Pro);
}

#[tokio::test]
async fn test_failed_apply_releases_claim_for_redelivery() {
    let ctx = TestContext::new();
    let team_id = TeamId::new();

    // First delivery arrives before the team record is visible and fails.
    let event = PlanChangeEvent {
        event_id: "evt_early".to_string(),
        subject: PlanSubject::Team(team_id),
        new_plan: Plan::Pro,
        subscription_ref: None,
    };
    let err = ctx.plan_sync.apply(&event).await.unwrap_err();
    assert!(matches!(err, PlanSyncError::SubjectNotFound));

    // The provider redelivers the identical event after the team exists; it
    // must apply, not be skipped as a duplicate of the failed attempt.
    let owner = ctx.seed_user("owner@example.com");
    ctx.seed_team_with_id(team_id, vec![(owner, Role::Owner)]);
    assert_eq!(
        ctx.plan_sync.apply(&event).await.unwrap(),
        SyncOutcome::Applied
    );

    let team = ctx.store.get_team(team_id).await.unwrap();
    assert_eq!(team.plan, Plan::Pro);
}

#[tokio::test]
async fn test_unknown_subject() {
    let ctx = TestContext::new();

    let event = PlanChangeEvent {
        event_id: "evt_ghost".to_string(),
        subject: PlanSubject::Team(TeamId::new()),
        new_plan: Plan::Pro,
        subscription_ref: None,
    };
    let err = ctx.plan_sync.apply(&event).await.unwrap_err();
    assert!(matches!(err, PlanSyncError::SubjectNotFound));
}
