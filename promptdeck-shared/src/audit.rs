/// Audit trail for privileged mutations
///
/// Every membership mutation, quota denial, and taxonomy operation is reported
/// to an `AuditSink`. Recording is fire-and-forget by contract: a sink must
/// never block and can never fail the primary operation, which is why
/// `record` is synchronous and infallible. Sinks that do real I/O are
/// expected to hand the event off internally (channel, spawned task) rather
/// than wait.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Mutex;
use tracing::info;

use crate::models::UserId;

/// Categories of auditable actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // Membership operations
    MemberAdd,
    MemberRoleChange,
    MemberRemove,

    // Taxonomy operations
    TagRename,
    TagMerge,
    TagDelete,

    // Guard outcomes
    QuotaDenied,

    // Billing sync
    PlanSync,
}

impl AuditAction {
    /// Dotted action name used in log lines and stored records
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::MemberAdd => "member.add",
            AuditAction::MemberRoleChange => "member.role_change",
            AuditAction::MemberRemove => "member.remove",
            AuditAction::TagRename => "tag.rename",
            AuditAction::TagMerge => "tag.merge",
            AuditAction::TagDelete => "tag.delete",
            AuditAction::QuotaDenied => "quota.denied",
            AuditAction::PlanSync => "plan.sync",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the action touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditTargetType {
    Team,
    User,
    Tag,
}

/// One structured audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Who performed the action (None for system-originated events
    /// such as billing callbacks)
    pub actor_id: Option<UserId>,

    /// What was done
    pub action: AuditAction,

    /// Kind of target
    pub target_type: AuditTargetType,

    /// Identifier of the target (team id, user id, or tag name)
    pub target_id: String,

    /// When it happened
    pub at: DateTime<Utc>,

    /// Action-specific details
    pub details: JsonValue,
}

impl AuditEvent {
    /// Creates an event timestamped now
    pub fn new(
        actor_id: Option<UserId>,
        action: AuditAction,
        target_type: AuditTargetType,
        target_id: impl Into<String>,
        details: JsonValue,
    ) -> Self {
        AuditEvent {
            actor_id,
            action,
            target_type,
            target_id: target_id.into(),
            at: Utc::now(),
            details,
        }
    }
}

/// Sink receiving audit events
///
/// Implementations must not block the caller and must swallow their own
/// failures (logging them is fine).
pub trait AuditSink: Send + Sync {
    /// Records one event
    fn record(&self, event: AuditEvent);
}

/// Sink that emits one structured log line per event
///
/// The default production sink: downstream log shipping owns durability.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        info!(
            actor = event.actor_id.map(|id| id.to_string()).as_deref().unwrap_or("system"),
            action = event.action.as_str(),
            target_type = ?event.target_type,
            target_id = %event.target_id,
            details = %event.details,
            "audit"
        );
    }
}

/// In-memory sink collecting events for assertions in tests
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit sink poisoned").clone()
    }

    /// Events matching a given action
    pub fn events_for(&self, action: AuditAction) -> Vec<AuditEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.action == action)
            .collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().expect("audit sink poisoned").push(event);
    }
}
