/// Prompt model and tag normalization
///
/// Prompts are the authored records of the library. Tags are plain
/// case-normalized strings living inside each prompt's tag set; a tag has no
/// stored identity of its own, which is why taxonomy operations are bulk
/// updates over every matching prompt.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE prompts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES users(id),
///     team_id UUID REFERENCES teams(id),
///     title VARCHAR(512) NOT NULL,
///     content TEXT NOT NULL,
///     tags TEXT[] NOT NULL DEFAULT '{}',
///     visibility VARCHAR(20) NOT NULL DEFAULT 'private',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE INDEX prompts_tags_idx ON prompts USING GIN (tags);
/// ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::ids::{PromptId, TeamId, UserId};

/// Who can see a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Listed publicly
    Public,

    /// Visible to the owner only
    Private,

    /// Visible to the owning team
    Team,

    /// Reachable by link, not listed
    Unlisted,
}

impl Visibility {
    /// Converts visibility to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Team => "team",
            Visibility::Unlisted => "unlisted",
        }
    }

    /// Parses visibility from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Visibility::Public),
            "private" => Some(Visibility::Private),
            "team" => Some(Visibility::Team),
            "unlisted" => Some(Visibility::Unlisted),
            _ => None,
        }
    }
}

/// Normalizes a single tag: trimmed and lowercased
///
/// All tag matching in the taxonomy operations happens on normalized form, so
/// `"Writing"`, `" writing "`, and `"writing"` are the same tag.
pub fn normalize_tag(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalizes a collection of tags into a sorted, deduplicated set
///
/// Empty tags (after trimming) are dropped. Insertion order is irrelevant by
/// contract, so the canonical form is sorted.
pub fn normalize_tags<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .map(|t| normalize_tag(t.as_ref()))
        .filter(|t| !t.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Prompt record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    /// Unique prompt ID
    pub id: PromptId,

    /// Owning user
    pub owner_id: UserId,

    /// Owning team, if team-scoped
    pub team_id: Option<TeamId>,

    /// Short title
    pub title: String,

    /// Prompt body
    pub content: String,

    /// Normalized tag set (sorted, deduplicated)
    pub tags: Vec<String>,

    /// Visibility tier
    pub visibility: Visibility,

    /// When the prompt was created
    pub created_at: DateTime<Utc>,

    /// When the prompt was last updated
    pub updated_at: DateTime<Utc>,
}

impl Prompt {
    /// Whether this prompt carries the given (already normalized) tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Whether this prompt carries any of the given (normalized) tags
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        self.tags.iter().any(|t| tags.contains(t))
    }
}
