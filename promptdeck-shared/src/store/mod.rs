/// Storage abstraction
///
/// The engine services depend on this trait rather than a concrete database so
/// the same logic runs against Postgres in production and the in-memory
/// backend in tests. The contract mirrors what the document store must
/// provide:
///
/// - atomic, version-checked replacement of one team's membership set
/// - a query for all prompts whose tag set intersects a given set
/// - per-prompt atomic update of the `tags` field only
/// - an insert-once ledger for billing event ids
///
/// Membership writes use optimistic concurrency: `update_team_members` takes
/// the `version` the caller read and fails with `StoreError::Conflict` if the
/// team has moved on, so two concurrent mutations can never both succeed from
/// the same stale snapshot.
use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Membership, Plan, Prompt, PromptId, Team, TeamId, User, UserId};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Uniform error type for all storage backends
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record does not exist
    #[error("not found")]
    NotFound,

    /// Versioned write lost a race; re-read and retry
    #[error("version conflict")]
    Conflict,

    /// Anything the backend itself failed on
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Which prompts a taxonomy operation may touch
///
/// Scope is always explicit: the policy of who may run a global operation
/// belongs to the caller, not this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagScope {
    /// Entire corpus
    Global,

    /// Prompts owned by one user
    OwnedBy(UserId),

    /// Prompts belonging to one team
    Team(TeamId),
}

/// The storage trait the engine services depend on
#[async_trait]
pub trait Store: Send + Sync {
    // Teams

    /// Reads a team snapshot, membership set included
    async fn get_team(&self, team_id: TeamId) -> Result<Team, StoreError>;

    /// Replaces a team's membership set if `expected_version` still matches
    ///
    /// Bumps the version on success; fails with `Conflict` when another
    /// writer got there first.
    async fn update_team_members(
        &self,
        team_id: TeamId,
        expected_version: i64,
        members: &[Membership],
    ) -> Result<(), StoreError>;

    /// Updates a team's plan, derived prompt limit, and billing reference
    async fn set_team_plan(
        &self,
        team_id: TeamId,
        plan: Plan,
        prompt_limit: u32,
        billing_ref: Option<&str>,
    ) -> Result<(), StoreError>;

    // Users

    /// Reads a user by id
    async fn get_user(&self, user_id: UserId) -> Result<User, StoreError>;

    /// Looks up a user by email (case-insensitive), `None` if absent
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Updates a user's personal plan
    async fn set_user_plan(&self, user_id: UserId, plan: Plan) -> Result<(), StoreError>;

    // Prompts

    /// Live count of prompts owned by a user
    async fn count_prompts_owned_by(&self, user_id: UserId) -> Result<u32, StoreError>;

    /// Live count of prompts belonging to a team
    async fn count_team_prompts(&self, team_id: TeamId) -> Result<u32, StoreError>;

    /// All prompts in scope whose tag set intersects `tags` (normalized form)
    async fn prompts_tagged(
        &self,
        scope: TagScope,
        tags: &[String],
    ) -> Result<Vec<Prompt>, StoreError>;

    /// Atomically replaces one prompt's tag set, touching no other field
    async fn set_prompt_tags(
        &self,
        prompt_id: PromptId,
        tags: &[String],
    ) -> Result<(), StoreError>;

    // Billing ledger

    /// Records a billing event id; returns false if it was already processed
    async fn record_billing_event(&self, event_id: &str) -> Result<bool, StoreError>;

    /// Releases a claimed billing event id so the provider's retry can
    /// reprocess it
    async fn remove_billing_event(&self, event_id: &str) -> Result<(), StoreError>;
}
