/// Billing-driven plan synchronization
///
/// The billing provider delivers plan-change events out-of-band, with no
/// ordering or exactly-once guarantee. Each event carries the provider's
/// own event id; before applying anything the adapter claims that id in the
/// store's billing-event ledger, and an id that was already claimed makes
/// the whole call a no-op. Redelivered events therefore never double-apply,
/// and out-of-order delivery degrades to last-applied-wins on the plan
/// field, which the provider's own state will reconcile on its next event.
///
/// Applying a team event rewrites the team's plan, its derived prompt
/// limit, and the subscription reference in one store call, so QuotaGuard
/// reads never observe a Pro plan with a Free limit.
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use promptdeck_shared::audit::{AuditAction, AuditEvent, AuditSink, AuditTargetType};
use promptdeck_shared::models::{Plan, TeamId, UserId};
use promptdeck_shared::quota::QuotaConfig;
use promptdeck_shared::store::{Store, StoreError};

/// Who a plan-change event applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSubject {
    Team(TeamId),
    User(UserId),
}

/// A plan-change notification from the billing provider
#[derive(Debug, Clone)]
pub struct PlanChangeEvent {
    /// Provider-assigned event id, the idempotency key
    pub event_id: String,
    pub subject: PlanSubject,
    pub new_plan: Plan,
    /// Opaque subscription/customer reference, stored on teams for support
    /// lookups
    pub subscription_ref: Option<String>,
}

/// How a delivered event was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// First delivery; the plan change was applied
    Applied,
    /// Event id was already in the ledger; nothing was touched
    Duplicate,
}

/// Plan sync errors
#[derive(Debug, Error)]
pub enum PlanSyncError {
    /// Event named a team or user that does not exist
    #[error("plan-change subject not found")]
    SubjectNotFound,

    /// Underlying storage failed
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for PlanSyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => PlanSyncError::SubjectNotFound,
            other => PlanSyncError::Store(other),
        }
    }
}

/// Consumes billing plan-change events idempotently
pub struct PlanSyncAdapter {
    store: Arc<dyn Store>,
    audit: Arc<dyn AuditSink>,
    config: QuotaConfig,
}

impl PlanSyncAdapter {
    /// Creates a new adapter
    pub fn new(store: Arc<dyn Store>, audit: Arc<dyn AuditSink>, config: QuotaConfig) -> Self {
        PlanSyncAdapter {
            store,
            audit,
            config,
        }
    }

    /// Applies one plan-change event
    ///
    /// Safe to call any number of times with the same event. A failed apply
    /// releases the ledger claim, so the provider's retry of the same event
    /// is processed again instead of skipped.
    pub async fn apply(&self, event: &PlanChangeEvent) -> Result<SyncOutcome, PlanSyncError> {
        if !self.store.record_billing_event(&event.event_id).await? {
            info!(event_id = %event.event_id, "billing event already processed, skipping");
            return Ok(SyncOutcome::Duplicate);
        }

        let (target_type, target_id) = match self.apply_plan(event).await {
            Ok(target) => target,
            Err(err) => {
                if let Err(release_err) = self.store.remove_billing_event(&event.event_id).await {
                    warn!(
                        event_id = %event.event_id,
                        error = %release_err,
                        "could not release billing event claim after failed apply"
                    );
                }
                return Err(err);
            }
        };

        info!(
            event_id = %event.event_id,
            target = %target_id,
            plan = event.new_plan.as_str(),
            "plan change applied"
        );
        self.audit.record(AuditEvent::new(
            None,
            AuditAction::PlanSync,
            target_type,
            target_id,
            json!({
                "event_id": event.event_id,
                "plan": event.new_plan.as_str(),
                "subscription_ref": event.subscription_ref,
            }),
        ));
        Ok(SyncOutcome::Applied)
    }

    async fn apply_plan(
        &self,
        event: &PlanChangeEvent,
    ) -> Result<(AuditTargetType, String), PlanSyncError> {
        match event.subject {
            PlanSubject::Team(team_id) => {
                let limit = self.config.team_limit_for(event.new_plan);
                self.store
                    .set_team_plan(
                        team_id,
                        event.new_plan,
                        limit,
                        event.subscription_ref.as_deref(),
                    )
                    .await?;
                Ok((AuditTargetType::Team, team_id.to_string()))
            }
            PlanSubject::User(user_id) => {
                self.store.set_user_plan(user_id, event.new_plan).await?;
                Ok((AuditTargetType::User, user_id.to_string()))
            }
        }
    }
}
