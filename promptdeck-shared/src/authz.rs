/// Role resolution and privilege checks
///
/// Pure authorization logic over a `Team` snapshot: no I/O, no caching. The
/// services load a team, ask these functions whether the caller may act, and
/// only then mutate. A missing membership is an authorization failure, never
/// "lowest privilege".
///
/// # Example
///
/// ```
/// use promptdeck_shared::authz::{self, AuthzError};
/// use promptdeck_shared::models::{Membership, Role, Team, TeamId, UserId, Plan};
/// # use chrono::Utc;
///
/// # fn example(team: &Team, actor: UserId) -> Result<(), AuthzError> {
/// // Admins and the owner pass; members and strangers do not.
/// let role = authz::authorize(team, actor, Role::Admin)?;
/// # Ok(())
/// # }
/// ```
use thiserror::Error;

use crate::models::{Role, Team, UserId};

/// Error type for authorization checks
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthzError {
    /// Caller has no membership in the team
    #[error("user {0} is not a member of this team")]
    NotAMember(UserId),

    /// Caller's role ranks below the required privilege level
    #[error("insufficient role: requires {required:?}, has {actual:?}")]
    Forbidden { required: Role, actual: Role },
}

/// Resolves a user's role from a team snapshot
///
/// Returns `None` for non-members. Callers must treat `None` as an
/// authorization failure.
pub fn role_of(team: &Team, user_id: UserId) -> Option<Role> {
    team.membership_of(user_id).map(|m| m.role)
}

/// Requires the actor to hold `required` or rank above it
///
/// Returns the actor's resolved role on success so callers can audit it.
pub fn authorize(team: &Team, actor_id: UserId, required: Role) -> Result<Role, AuthzError> {
    let actual = role_of(team, actor_id).ok_or(AuthzError::NotAMember(actor_id))?;

    if !actual.satisfies(required) {
        return Err(AuthzError::Forbidden { required, actual });
    }

    Ok(actual)
}

/// Requires `required` rank, or that the action targets the actor themselves
///
/// Member-level self-targeted actions (leaving a team, for instance) always
/// pass for any member regardless of rank. The actor must still be a member.
pub fn authorize_self_or(
    team: &Team,
    actor_id: UserId,
    required: Role,
    target_id: UserId,
) -> Result<Role, AuthzError> {
    let actual = role_of(team, actor_id).ok_or(AuthzError::NotAMember(actor_id))?;

    if actor_id == target_id || actual.satisfies(required) {
        return Ok(actual);
    }

    Err(AuthzError::Forbidden { required, actual })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Membership, Plan, Team, TeamId};
    use chrono::Utc;

    fn team_with(members: Vec<Membership>) -> Team {
        Team {
            id: TeamId::new(),
            name: "Acme".to_string(),
            description: String::new(),
            plan: Plan::Free,
            prompt_limit: 25,
            members,
            billing_ref: None,
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_of() {
        let owner = UserId::new();
        let member = UserId::new();
        let team = team_with(vec![
            Membership::new(owner, Role::Owner),
            Membership::new(member, Role::Member),
        ]);

        assert_eq!(role_of(&team, owner), Some(Role::Owner));
        assert_eq!(role_of(&team, member), Some(Role::Member));
        assert_eq!(role_of(&team, UserId::new()), None);
    }

    #[test]
    fn test_authorize_rank() {
        let owner = UserId::new();
        let admin = UserId::new();
        let member = UserId::new();
        let team = team_with(vec![
            Membership::new(owner, Role::Owner),
            Membership::new(admin, Role::Admin),
            Membership::new(member, Role::Member),
        ]);

        assert_eq!(authorize(&team, owner, Role::Admin), Ok(Role::Owner));
        assert_eq!(authorize(&team, admin, Role::Admin), Ok(Role::Admin));
        assert_eq!(
            authorize(&team, member, Role::Admin),
            Err(AuthzError::Forbidden {
                required: Role::Admin,
                actual: Role::Member,
            })
        );
    }

    #[test]
    fn test_non_member_is_never_lowest_privilege() {
        let owner = UserId::new();
        let stranger = UserId::new();
        let team = team_with(vec![Membership::new(owner, Role::Owner)]);

        assert_eq!(
            authorize(&team, stranger, Role::Member),
            Err(AuthzError::NotAMember(stranger))
        );
        assert_eq!(
            authorize_self_or(&team, stranger, Role::Member, stranger),
            Err(AuthzError::NotAMember(stranger))
        );
    }

    #[test]
    fn test_self_targeted_bypasses_rank() {
        let owner = UserId::new();
        let member = UserId::new();
        let team = team_with(vec![
            Membership::new(owner, Role::Owner),
            Membership::new(member, Role::Member),
        ]);

        // A plain member may act on themselves even when admin is required.
        assert_eq!(
            authorize_self_or(&team, member, Role::Admin, member),
            Ok(Role::Member)
        );
        // But not on someone else.
        assert!(authorize_self_or(&team, member, Role::Admin, owner).is_err());
    }
}
