/// Team membership lifecycle
///
/// Owns adding members, changing roles, and removing members (including
/// self-removal, "leaving"). Every operation re-reads the team, authorizes
/// the actor against that snapshot, and writes the new membership set through
/// the store's version check, so two concurrent mutations of the same team
/// can never both land from the same stale read. A lost race is retried from
/// a fresh snapshot a bounded number of times.
///
/// Owner rules, enforced on every path:
///
/// - the owner cannot be removed, not even by themselves
/// - the owner's role cannot be changed through `update_role`
/// - `owner` cannot be assigned through `add_member` or `update_role`
/// - before any write the resulting set is checked to hold exactly one owner
///   (`OwnerInvariantViolation` is a defensive error; no normal sequence of
///   these operations can trigger it)
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use promptdeck_engine::membership::MembershipService;
/// use promptdeck_shared::models::{Role, TeamId, UserId};
/// # use promptdeck_engine::directory::StoreDirectory;
/// # use promptdeck_shared::audit::TracingAuditSink;
/// # use promptdeck_shared::store::MemoryStore;
///
/// # async fn example(team_id: TeamId, admin: UserId) -> anyhow::Result<()> {
/// # let store = Arc::new(MemoryStore::new());
/// # let directory = Arc::new(StoreDirectory::new(store.clone()));
/// # let audit = Arc::new(TracingAuditSink);
/// let service = MembershipService::new(store, directory, audit);
/// service
///     .add_member(team_id, admin, "new.colleague@example.com", Role::Member)
///     .await?;
/// # Ok(())
/// # }
/// ```
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use validator::ValidateEmail;

use promptdeck_shared::audit::{AuditAction, AuditEvent, AuditSink, AuditTargetType};
use promptdeck_shared::authz::{self, AuthzError};
use promptdeck_shared::models::{Membership, Role, TeamId, UserId};
use promptdeck_shared::store::{Store, StoreError};

use crate::directory::DirectoryLookup;

/// Retries for a versioned membership write that lost a race
const MAX_WRITE_ATTEMPTS: usize = 5;

/// Membership operation errors
#[derive(Debug, Error)]
pub enum MembershipError {
    /// Target has no membership in the team
    #[error("user is not a member of this team")]
    NotAMember,

    /// Target already has a membership
    #[error("user is already a member of this team")]
    AlreadyMember,

    /// No account exists for the invited email (accounts are never
    /// auto-created on invite)
    #[error("no account found for {0}")]
    UserNotFound(String),

    /// Invite email is not a valid address
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// Actor lacks the required role, or the operation touches the owner
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    /// Write would leave the team with zero or more than one owner
    #[error("team must have exactly one owner")]
    OwnerInvariantViolation,

    /// Concurrent modifications kept winning the version race
    #[error("team was concurrently modified; giving up after retries")]
    Contention,

    /// Underlying storage failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AuthzError> for MembershipError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotAMember(_) => MembershipError::NotAMember,
            AuthzError::Forbidden { .. } => MembershipError::Forbidden("insufficient role"),
        }
    }
}

/// Membership mutation service
pub struct MembershipService {
    store: Arc<dyn Store>,
    directory: Arc<dyn DirectoryLookup>,
    audit: Arc<dyn AuditSink>,
}

impl MembershipService {
    /// Creates a new service
    pub fn new(
        store: Arc<dyn Store>,
        directory: Arc<dyn DirectoryLookup>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        MembershipService {
            store,
            directory,
            audit,
        }
    }

    /// Adds a user to a team by email
    ///
    /// Requires the actor to be admin-or-above. Only `admin` and `member`
    /// are assignable here.
    pub async fn add_member(
        &self,
        team_id: TeamId,
        actor_id: UserId,
        target_email: &str,
        role: Role,
    ) -> Result<Membership, MembershipError> {
        if !role.is_assignable() {
            return Err(MembershipError::Forbidden(
                "ownership cannot be granted through member management",
            ));
        }

        if !target_email.validate_email() {
            return Err(MembershipError::InvalidEmail(target_email.to_string()));
        }

        let target_id = self
            .directory
            .resolve_email(target_email)
            .await?
            .ok_or_else(|| MembershipError::UserNotFound(target_email.to_string()))?;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let team = self.store.get_team(team_id).await?;
            authz::authorize(&team, actor_id, Role::Admin)?;

            if team.membership_of(target_id).is_some() {
                return Err(MembershipError::AlreadyMember);
            }

            let membership = Membership::new(target_id, role);
            let mut members = team.members.clone();
            members.push(membership.clone());
            check_owner_invariant(&members)?;

            match self
                .store
                .update_team_members(team_id, team.version, &members)
                .await
            {
                Ok(()) => {
                    info!(team = %team_id, user = %target_id, role = role.as_str(), "member added");
                    self.audit.record(AuditEvent::new(
                        Some(actor_id),
                        AuditAction::MemberAdd,
                        AuditTargetType::Team,
                        team_id.to_string(),
                        json!({ "user_id": target_id, "role": role.as_str() }),
                    ));
                    return Ok(membership);
                }
                Err(StoreError::Conflict) => {
                    debug!(team = %team_id, "membership write lost version race, retrying");
                    continue;
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(MembershipError::Contention)
    }

    /// Changes a member's role between `admin` and `member`
    ///
    /// The owner's role is untouchable here, and `owner` cannot be assigned.
    pub async fn update_role(
        &self,
        team_id: TeamId,
        actor_id: UserId,
        target_id: UserId,
        new_role: Role,
    ) -> Result<(), MembershipError> {
        if !new_role.is_assignable() {
            return Err(MembershipError::Forbidden(
                "ownership cannot be granted through member management",
            ));
        }

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let team = self.store.get_team(team_id).await?;
            authz::authorize(&team, actor_id, Role::Admin)?;

            let current = team
                .membership_of(target_id)
                .ok_or(MembershipError::NotAMember)?;
            if current.role == Role::Owner {
                return Err(MembershipError::Forbidden("the owner's role cannot be changed"));
            }

            let old_role = current.role;
            if old_role == new_role {
                // Converged already; idempotent success.
                return Ok(());
            }

            let mut members = team.members.clone();
            for m in members.iter_mut() {
                if m.user_id == target_id {
                    m.role = new_role;
                }
            }
            check_owner_invariant(&members)?;

            match self
                .store
                .update_team_members(team_id, team.version, &members)
                .await
            {
                Ok(()) => {
                    info!(
                        team = %team_id,
                        user = %target_id,
                        from = old_role.as_str(),
                        to = new_role.as_str(),
                        "member role changed"
                    );
                    self.audit.record(AuditEvent::new(
                        Some(actor_id),
                        AuditAction::MemberRoleChange,
                        AuditTargetType::Team,
                        team_id.to_string(),
                        json!({
                            "user_id": target_id,
                            "from": old_role.as_str(),
                            "to": new_role.as_str(),
                        }),
                    ));
                    return Ok(());
                }
                Err(StoreError::Conflict) => continue,
                Err(other) => return Err(other.into()),
            }
        }

        Err(MembershipError::Contention)
    }

    /// Removes a member from a team
    ///
    /// Admin-or-above may remove any non-owner; any non-owner may remove
    /// themselves. Removing the owner always fails.
    pub async fn remove_member(
        &self,
        team_id: TeamId,
        actor_id: UserId,
        target_id: UserId,
    ) -> Result<(), MembershipError> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let team = self.store.get_team(team_id).await?;
            authz::authorize_self_or(&team, actor_id, Role::Admin, target_id)?;

            let target = team
                .membership_of(target_id)
                .ok_or(MembershipError::NotAMember)?;
            if target.role == Role::Owner {
                return Err(MembershipError::Forbidden("the owner cannot be removed"));
            }

            let removed_role = target.role;
            let members: Vec<Membership> = team
                .members
                .iter()
                .filter(|m| m.user_id != target_id)
                .cloned()
                .collect();
            check_owner_invariant(&members)?;

            match self
                .store
                .update_team_members(team_id, team.version, &members)
                .await
            {
                Ok(()) => {
                    info!(team = %team_id, user = %target_id, "member removed");
                    self.audit.record(AuditEvent::new(
                        Some(actor_id),
                        AuditAction::MemberRemove,
                        AuditTargetType::Team,
                        team_id.to_string(),
                        json!({
                            "user_id": target_id,
                            "role": removed_role.as_str(),
                            "left_voluntarily": actor_id == target_id,
                        }),
                    ));
                    return Ok(());
                }
                Err(StoreError::Conflict) => continue,
                Err(other) => return Err(other.into()),
            }
        }

        Err(MembershipError::Contention)
    }
}

/// Defensive check that a membership set holds exactly one owner
fn check_owner_invariant(members: &[Membership]) -> Result<(), MembershipError> {
    let owners = members.iter().filter(|m| m.role == Role::Owner).count();
    if owners == 1 {
        Ok(())
    } else {
        Err(MembershipError::OwnerInvariantViolation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_owner_invariant() {
        let owner = Membership::new(UserId::new(), Role::Owner);
        let member = Membership::new(UserId::new(), Role::Member);

        assert!(check_owner_invariant(&[owner.clone(), member.clone()]).is_ok());
        assert!(matches!(
            check_owner_invariant(&[member.clone()]),
            Err(MembershipError::OwnerInvariantViolation)
        ));

        let second_owner = Membership {
            user_id: UserId::new(),
            role: Role::Owner,
            created_at: Utc::now(),
        };
        assert!(matches!(
            check_owner_invariant(&[owner, second_owner]),
            Err(MembershipError::OwnerInvariantViolation)
        ));
    }

    #[test]
    fn test_authz_error_mapping() {
        let err: MembershipError = AuthzError::NotAMember(UserId::new()).into();
        assert!(matches!(err, MembershipError::NotAMember));

        let err: MembershipError = AuthzError::Forbidden {
            required: Role::Admin,
            actual: Role::Member,
        }
        .into();
        assert!(matches!(err, MembershipError::Forbidden(_)));
    }
}
