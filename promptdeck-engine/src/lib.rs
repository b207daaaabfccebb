//! # Promptdeck Engine
//!
//! The mutation services of the Promptdeck backend: team membership
//! lifecycle, bulk tag-taxonomy operations, and billing plan synchronization.
//! Each service runs against the `Store` abstraction from
//! `promptdeck-shared` and reports every privileged mutation to the audit
//! sink.
//!
//! ## Modules
//!
//! - `membership`: Add/remove members and change roles, owner invariant included
//! - `taxonomy`: Bulk tag rename, merge, and delete across the prompt corpus
//! - `plan_sync`: Idempotent consumption of billing plan-change events
//! - `directory`: Email-to-account lookup collaborator

pub mod directory;
pub mod membership;
pub mod plan_sync;
pub mod taxonomy;
