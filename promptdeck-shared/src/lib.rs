//! # Promptdeck Shared Library
//!
//! Shared types and core guard logic for the Promptdeck prompt-library
//! backend: domain models, role-based authorization, plan-based quota
//! enforcement, the audit trail, and the storage abstraction the engine
//! services run against.
//!
//! ## Module Organization
//!
//! - `models`: Domain models (users, teams, memberships, prompts) and ids
//! - `authz`: Role resolution and privilege checks
//! - `quota`: Plan-based quota guard
//! - `audit`: Audit event types and sinks
//! - `store`: Storage trait with Postgres and in-memory backends
//! - `db`: Connection pooling and migrations
//! - `config`: Environment-driven configuration

pub mod audit;
pub mod authz;
pub mod config;
pub mod db;
pub mod models;
pub mod quota;
pub mod store;

/// Current version of the Promptdeck shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
