/// Quota enforcement for prompt creation
///
/// Plan-based limits on how many prompts a user or team may hold. The rule is
/// a single comparison: creation is allowed iff the plan is Pro or the current
/// count is strictly below the limit, so a Free user at exactly the limit is
/// denied the next create and the limit is the maximum resident count.
///
/// The guard re-reads the live count from the store on every check; counts
/// are never cached across calls, so one guard instance stays correct under
/// concurrent creates. For the create itself to not overshoot by one, the
/// caller runs check-and-insert under the store's per-owner serialization.
///
/// Denial is a decision, not an error: `check` returns a `QuotaDecision`
/// carrying current/limit/remaining for UI display. `enforce` is the
/// convenience that turns a denial into a typed error and reports it to the
/// audit sink.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use promptdeck_shared::quota::{QuotaConfig, QuotaGuard, QuotaScope};
/// use promptdeck_shared::models::UserId;
/// # use promptdeck_shared::audit::TracingAuditSink;
/// # use promptdeck_shared::store::MemoryStore;
///
/// # async fn example(user_id: UserId) -> Result<(), Box<dyn std::error::Error>> {
/// # let store = Arc::new(MemoryStore::new());
/// # let sink = Arc::new(TracingAuditSink);
/// let guard = QuotaGuard::new(store, sink, QuotaConfig::default());
///
/// let decision = guard.check(QuotaScope::Personal { user_id }).await?;
/// if !decision.allowed {
///     println!("at limit: {}/{:?}", decision.current, decision.limit);
/// }
/// # Ok(())
/// # }
/// ```
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::audit::{AuditAction, AuditEvent, AuditSink, AuditTargetType};
use crate::models::{Plan, TeamId, UserId};
use crate::store::{Store, StoreError};

/// Free-plan limits, independently configurable per scope
///
/// Whether personal and team corpora share one constant was left open by the
/// product; they are kept separate here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Maximum prompts a Free-plan user may own
    pub free_user_prompt_limit: u32,

    /// Maximum prompts a Free-plan team may hold
    pub free_team_prompt_limit: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        QuotaConfig {
            free_user_prompt_limit: 10,
            free_team_prompt_limit: 25,
        }
    }
}

impl QuotaConfig {
    /// Derived team prompt limit for a plan
    ///
    /// Pro teams keep a limit value for display but it is never enforced.
    pub fn team_limit_for(&self, plan: Plan) -> u32 {
        match plan {
            Plan::Free => self.free_team_prompt_limit,
            Plan::Pro => u32::MAX,
        }
    }
}

/// Whose prompt count a creation is charged against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaScope {
    /// Personal prompt, counted against the user's own plan
    Personal { user_id: UserId },

    /// Team prompt, counted against the team's plan
    Team { team_id: TeamId },
}

/// Result of a quota check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaDecision {
    /// Whether the creation may proceed
    pub allowed: bool,

    /// Live count at decision time
    pub current: u32,

    /// Applicable limit; `None` means unbounded (Pro)
    pub limit: Option<u32>,

    /// Remaining headroom for UI display; `None` means unbounded
    pub remaining: Option<u32>,
}

impl QuotaDecision {
    fn allowed(current: u32, limit: Option<u32>) -> Self {
        QuotaDecision {
            allowed: true,
            current,
            limit,
            remaining: limit.map(|l| l.saturating_sub(current)),
        }
    }

    fn denied(current: u32, limit: u32) -> Self {
        QuotaDecision {
            allowed: false,
            current,
            limit: Some(limit),
            remaining: Some(0),
        }
    }
}

/// Quota error
#[derive(Debug, Error)]
pub enum QuotaError {
    /// Plan limit reached; reason for callers is always `plan_limit`
    #[error("plan_limit reached ({current}/{limit})")]
    Denied { limit: u32, current: u32 },

    /// Could not read the subject or its counts
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Plan-limit rule, shared by both scopes
///
/// Strict `<`: a subject at exactly the limit is denied the next creation.
fn permits(plan: Plan, current: u32, limit: u32) -> bool {
    plan.is_unlimited() || current < limit
}

/// Quota guard service
pub struct QuotaGuard {
    store: Arc<dyn Store>,
    audit: Arc<dyn AuditSink>,
    config: QuotaConfig,
}

impl QuotaGuard {
    /// Creates a new guard
    pub fn new(store: Arc<dyn Store>, audit: Arc<dyn AuditSink>, config: QuotaConfig) -> Self {
        QuotaGuard {
            store,
            audit,
            config,
        }
    }

    /// Decides whether one more prompt may be created in `scope`
    ///
    /// Reads the plan and a fresh count; never caches either.
    pub async fn check(&self, scope: QuotaScope) -> Result<QuotaDecision, QuotaError> {
        let (plan, current, limit) = match scope {
            QuotaScope::Personal { user_id } => {
                let user = self.store.get_user(user_id).await?;
                let current = self.store.count_prompts_owned_by(user_id).await?;
                (user.plan, current, self.config.free_user_prompt_limit)
            }
            QuotaScope::Team { team_id } => {
                let team = self.store.get_team(team_id).await?;
                let current = self.store.count_team_prompts(team_id).await?;
                (team.plan, current, team.prompt_limit)
            }
        };

        if plan.is_unlimited() {
            return Ok(QuotaDecision::allowed(current, None));
        }

        if permits(plan, current, limit) {
            Ok(QuotaDecision::allowed(current, Some(limit)))
        } else {
            Ok(QuotaDecision::denied(current, limit))
        }
    }

    /// Like `check`, but a denial becomes `QuotaError::Denied` and is audited
    pub async fn enforce(&self, scope: QuotaScope) -> Result<QuotaDecision, QuotaError> {
        let decision = self.check(scope).await?;

        if !decision.allowed {
            let limit = decision.limit.unwrap_or(0);
            let (actor, target_type, target_id) = match scope {
                QuotaScope::Personal { user_id } => {
                    (Some(user_id), AuditTargetType::User, user_id.to_string())
                }
                QuotaScope::Team { team_id } => (None, AuditTargetType::Team, team_id.to_string()),
            };

            self.audit.record(AuditEvent::new(
                actor,
                AuditAction::QuotaDenied,
                target_type,
                target_id,
                json!({
                    "reason": "plan_limit",
                    "limit": limit,
                    "current": decision.current,
                }),
            ));

            return Err(QuotaError::Denied {
                limit,
                current: decision.current,
            });
        }

        Ok(decision)
    }
}
