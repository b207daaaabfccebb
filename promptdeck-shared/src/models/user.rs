/// User model
///
/// User accounts are created at signup by the identity provider integration
/// and never hard-deleted. The `plan` field is the authoritative personal
/// subscription tier; `prompt_count` is a denormalized cache maintained by the
/// prompt lifecycle and used only for display. Quota decisions always re-read
/// live counts from the store.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL UNIQUE,
///     name VARCHAR(255),
///     plan VARCHAR(50) NOT NULL DEFAULT 'free',
///     prompt_count INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::UserId;
use super::team::Plan;

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID
    pub id: UserId,

    /// Email address (case-insensitive, unique)
    pub email: String,

    /// Optional display name
    pub name: Option<String>,

    /// Personal subscription plan
    pub plan: Plan,

    /// Cached count of owned prompts (display only, never authoritative)
    pub prompt_count: i64,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new Free-plan account dated now
    pub fn new(email: impl Into<String>, name: Option<String>) -> Self {
        let now = Utc::now();
        User {
            id: UserId::new(),
            email: email.into(),
            name,
            plan: Plan::Free,
            prompt_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
