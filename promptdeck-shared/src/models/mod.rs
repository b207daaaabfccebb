/// Domain models for Promptdeck
///
/// This module contains the core data types shared by the authorization,
/// quota, and taxonomy services.
///
/// # Models
///
/// - `ids`: Strongly-typed identifiers (never compare raw UUIDs)
/// - `user`: User accounts and their subscription plan
/// - `team`: Teams, memberships, and roles
/// - `prompt`: Prompt records and tag normalization
pub mod ids;
pub mod prompt;
pub mod team;
pub mod user;

pub use ids::{PromptId, TeamId, UserId};
pub use prompt::{normalize_tag, normalize_tags, Prompt, Visibility};
pub use team::{Membership, Plan, Role, Team};
pub use user::User;
