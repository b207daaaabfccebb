/// Team model, memberships, and roles
///
/// Teams are the collaboration unit in Promptdeck. Users belong to teams via
/// `Membership` entries, each carrying a `Role`. Every team has **exactly one**
/// owner at all times; the membership-management operations are written so
/// that no sequence of them can violate that invariant.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE teams (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     plan VARCHAR(50) NOT NULL DEFAULT 'free',
///     prompt_limit INTEGER NOT NULL,
///     billing_ref VARCHAR(255),
///     version BIGINT NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE memberships (
///     team_id UUID NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role VARCHAR(20) NOT NULL DEFAULT 'member'
///         CHECK (role IN ('owner', 'admin', 'member')),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (team_id, user_id)
/// );
/// ```
///
/// `teams.version` is bumped on every membership write and checked by the
/// storage layer so concurrent membership mutations on the same team cannot
/// both succeed from a stale read.
///
/// # Roles
///
/// - **owner**: Full control, billing, delete team. Unique per team.
/// - **admin**: Manage members and team prompts.
/// - **member**: Create and manage own prompts.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{TeamId, UserId};

/// Subscription plans
///
/// Plans determine prompt quotas. Free caps the number of resident prompts;
/// Pro is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Free plan (limited prompt count)
    Free,

    /// Professional plan (unlimited prompts)
    Pro,
}

impl Plan {
    /// Converts plan to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
        }
    }

    /// Parses plan from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Plan::Free),
            "pro" => Some(Plan::Pro),
            _ => None,
        }
    }

    /// Whether this plan has no prompt-count ceiling
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Plan::Pro)
    }
}

/// Membership roles within a team
///
/// Variants are declared lowest-to-highest so privilege checks reduce to a
/// numeric comparison instead of string equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Can create and manage own prompts
    Member,

    /// Can manage members and team prompts
    Admin,

    /// Full control: billing, delete team. Exactly one per team.
    Owner,
}

impl Role {
    /// Converts role to string for display and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    /// Parses role from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(Role::Owner),
            "admin" => Some(Role::Admin),
            "member" => Some(Role::Member),
            _ => None,
        }
    }

    /// Checks if this role meets or exceeds the required privilege level
    ///
    /// Hierarchy: Owner > Admin > Member.
    pub fn satisfies(&self, required: Role) -> bool {
        *self >= required
    }

    /// Roles that may be handed out through member management
    ///
    /// Ownership is only transferable via a dedicated (future) operation,
    /// never through `add_member` or `update_role`.
    pub fn is_assignable(&self) -> bool {
        !matches!(self, Role::Owner)
    }
}

/// A user's membership in one team
///
/// Value object: one entry per `(team, user)` pair, carried inside the
/// `Team` snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Member's user ID
    pub user_id: UserId,

    /// Role within the team
    pub role: Role,

    /// When the membership was created
    pub created_at: DateTime<Utc>,
}

impl Membership {
    /// Creates a membership entry dated now
    pub fn new(user_id: UserId, role: Role) -> Self {
        Membership {
            user_id,
            role,
            created_at: Utc::now(),
        }
    }
}

/// Team snapshot as read from the store
///
/// `version` is the optimistic-concurrency token for the membership set:
/// writes pass the version they read, and the store rejects the write if the
/// team has moved on since.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    /// Unique team ID
    pub id: TeamId,

    /// Team display name
    pub name: String,

    /// Free-form description
    pub description: String,

    /// Current subscription plan
    pub plan: Plan,

    /// Maximum resident team prompts (derived from plan)
    pub prompt_limit: u32,

    /// Membership set, insertion-ordered
    pub members: Vec<Membership>,

    /// Opaque billing customer/subscription reference
    pub billing_ref: Option<String>,

    /// Optimistic-concurrency version of the membership set
    pub version: i64,

    /// When the team was created
    pub created_at: DateTime<Utc>,

    /// When the team was last updated
    pub updated_at: DateTime<Utc>,
}

impl Team {
    /// Finds the membership entry for a user, if any
    pub fn membership_of(&self, user_id: UserId) -> Option<&Membership> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    /// The team owner's membership entry
    ///
    /// Every persisted team has one; `None` only shows up on corrupt data.
    pub fn owner(&self) -> Option<&Membership> {
        self.members.iter().find(|m| m.role == Role::Owner)
    }

    /// Counts members holding the owner role
    pub fn owner_count(&self) -> usize {
        self.members.iter().filter(|m| m.role == Role::Owner).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_roundtrip() {
        assert_eq!(Plan::from_str("free"), Some(Plan::Free));
        assert_eq!(Plan::from_str("pro"), Some(Plan::Pro));
        assert_eq!(Plan::from_str("enterprise"), None);
        assert_eq!(Plan::Free.as_str(), "free");
        assert_eq!(Plan::Pro.as_str(), "pro");
    }

    #[test]
    fn test_plan_unlimited() {
        assert!(!Plan::Free.is_unlimited());
        assert!(Plan::Pro.is_unlimited());
    }

    #[test]
    fn test_role_ordering() {
        assert!(Role::Owner > Role::Admin);
        assert!(Role::Admin > Role::Member);
    }

    #[test]
    fn test_role_satisfies() {
        assert!(Role::Owner.satisfies(Role::Admin));
        assert!(Role::Owner.satisfies(Role::Member));
        assert!(Role::Admin.satisfies(Role::Admin));
        assert!(Role::Admin.satisfies(Role::Member));
        assert!(!Role::Member.satisfies(Role::Admin));
        assert!(!Role::Admin.satisfies(Role::Owner));
    }

    #[test]
    fn test_role_assignable() {
        assert!(Role::Admin.is_assignable());
        assert!(Role::Member.is_assignable());
        assert!(!Role::Owner.is_assignable());
    }

    #[test]
    fn test_role_roundtrip() {
        for role in [Role::Owner, Role::Admin, Role::Member] {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_str("viewer"), None);
    }

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
    fn test_membership_lookup() {
        let u1 = UserId::new();
        let u2 = UserId::new();
        let team = team_with(vec![
            Membership::new(u1, Role::Owner),
            Membership::new(u2, Role::Member),
        ]);

        assert_eq!(team.membership_of(u1).unwrap().role, Role::Owner);
        assert_eq!(team.membership_of(u2).unwrap().role, Role::Member);
        assert!(team.membership_of(UserId::new()).is_none());
        assert_eq!(team.owner().unwrap().user_id, u1);
        assert_eq!(team.owner_count(), 1);
    }
}
