/// Bulk tag operations across the prompt corpus
///
/// Tags have no stored identity of their own; they exist only as strings
/// inside `Prompt.tags`. Renaming, merging, or deleting a tag therefore
/// means rewriting the tag set of every prompt that carries it, within a
/// caller-chosen [`TagScope`]. Authorization is the caller's job: this
/// layer assumes the actor is entitled to the scope it was handed.
///
/// Every operation is set-based and idempotent: each affected prompt is
/// rewritten to its converged tag set in a single store write, so re-running
/// an operation over an already-converged corpus changes nothing and
/// succeeds. Per-record write failures do not abort the batch; the remaining
/// prompts are still processed and the outcome is reported as a
/// [`TaxonomyError::PartialFailure`] listing which prompt ids landed and
/// which did not, so the caller can retry just the failed subset.
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use promptdeck_shared::audit::{AuditAction, AuditEvent, AuditSink, AuditTargetType};
use promptdeck_shared::models::{normalize_tag, normalize_tags, PromptId, UserId};
use promptdeck_shared::store::{Store, StoreError, TagScope};

/// Outcome of a completed taxonomy operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyReport {
    /// Prompts that matched the operation's tag filter
    pub matched: usize,
    /// Prompts whose tag set was rewritten (already-converged prompts are
    /// matched but not updated)
    pub updated: Vec<PromptId>,
}

impl TaxonomyReport {
    fn empty() -> Self {
        TaxonomyReport {
            matched: 0,
            updated: Vec::new(),
        }
    }
}

/// Taxonomy operation errors
#[derive(Debug, Error)]
pub enum TaxonomyError {
    /// The merge target was listed among its own sources
    #[error("merge target {0:?} appears in the source tag list")]
    InvalidMerge(String),

    /// Some matching prompts were rewritten and some were not
    #[error("taxonomy update applied to {} of {} prompts", succeeded.len(), succeeded.len() + failed.len())]
    PartialFailure {
        succeeded: Vec<PromptId>,
        failed: Vec<PromptId>,
    },

    /// The corpus could not even be queried
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Bulk tag mutation service
pub struct TaxonomyService {
    store: Arc<dyn Store>,
    audit: Arc<dyn AuditSink>,
}

impl TaxonomyService {
    /// Creates a new service
    pub fn new(store: Arc<dyn Store>, audit: Arc<dyn AuditSink>) -> Self {
        TaxonomyService { store, audit }
    }

    /// Renames `old_tag` to `new_tag` on every matching prompt in scope
    ///
    /// Both tags are case-normalized first; a rename that normalizes to
    /// itself (e.g. "Writing" -> "writing" when the corpus already stores
    /// lowercase) converges in one pass and is a no-op thereafter.
    pub async fn rename(
        &self,
        actor_id: UserId,
        scope: TagScope,
        old_tag: &str,
        new_tag: &str,
    ) -> Result<TaxonomyReport, TaxonomyError> {
        let old = normalize_tag(old_tag);
        let new = normalize_tag(new_tag);
        if old.is_empty() || new.is_empty() || old == new {
            return Ok(TaxonomyReport::empty());
        }

        let report = self
            .apply(scope, &[old.clone()], |tags| {
                if tags.remove(&old) {
                    tags.insert(new.clone());
                }
            })
            .await;

        self.audit.record(AuditEvent::new(
            Some(actor_id),
            AuditAction::TagRename,
            AuditTargetType::Tag,
            old.clone(),
            json!({ "from": old, "to": new, "scope": scope_label(&scope) }),
        ));
        report.into_result()
    }

    /// Removes every source tag and ensures `target_tag` on every prompt
    /// whose tags intersect the sources
    pub async fn merge(
        &self,
        actor_id: UserId,
        scope: TagScope,
        source_tags: &[String],
        target_tag: &str,
    ) -> Result<TaxonomyReport, TaxonomyError> {
        let target = normalize_tag(target_tag);
        let sources = normalize_tags(source_tags);
        if target.is_empty() || sources.is_empty() {
            return Ok(TaxonomyReport::empty());
        }
        if sources.contains(&target) {
            return Err(TaxonomyError::InvalidMerge(target));
        }

        let source_set: BTreeSet<String> = sources.iter().cloned().collect();
        let report = self
            .apply(scope, &sources, |tags| {
                let had_source = tags.iter().any(|t| source_set.contains(t));
                tags.retain(|t| !source_set.contains(t));
                if had_source {
                    tags.insert(target.clone());
                }
            })
            .await;

        self.audit.record(AuditEvent::new(
            Some(actor_id),
            AuditAction::TagMerge,
            AuditTargetType::Tag,
            target.clone(),
            json!({ "sources": sources, "target": target, "scope": scope_label(&scope) }),
        ));
        report.into_result()
    }

    /// Strips `tag` from every prompt in scope that carries it
    ///
    /// Prompts themselves are never deleted, only the tag reference.
    pub async fn delete(
        &self,
        actor_id: UserId,
        scope: TagScope,
        tag: &str,
    ) -> Result<TaxonomyReport, TaxonomyError> {
        let tag = normalize_tag(tag);
        if tag.is_empty() {
            return Ok(TaxonomyReport::empty());
        }

        let report = self
            .apply(scope, std::slice::from_ref(&tag), |tags| {
                tags.remove(&tag);
            })
            .await;

        self.audit.record(AuditEvent::new(
            Some(actor_id),
            AuditAction::TagDelete,
            AuditTargetType::Tag,
            tag.clone(),
            json!({ "tag": tag, "scope": scope_label(&scope) }),
        ));
        report.into_result()
    }

    /// Fetches every prompt in scope matching `filter_tags`, rewrites each
    /// tag set through `transform`, and persists the ones that changed.
    ///
    /// Writes are applied per prompt; a failed write is recorded and the
    /// batch continues, so already-applied records are never rolled back.
    async fn apply<F>(
        &self,
        scope: TagScope,
        filter_tags: &[String],
        transform: F,
    ) -> BatchOutcome
    where
        F: Fn(&mut BTreeSet<String>),
    {
        let prompts = match self.store.prompts_tagged(scope, filter_tags).await {
            Ok(prompts) => prompts,
            Err(err) => return BatchOutcome::Unreadable(err),
        };

        let matched = prompts.len();
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        let mut updated = Vec::new();

        for prompt in prompts {
            let mut tags: BTreeSet<String> = prompt.tags.iter().cloned().collect();
            transform(&mut tags);
            let next: Vec<String> = tags.into_iter().collect();
            if next == prompt.tags {
                succeeded.push(prompt.id);
                continue;
            }

            match self.store.set_prompt_tags(prompt.id, &next).await {
                Ok(()) => {
                    succeeded.push(prompt.id);
                    updated.push(prompt.id);
                }
                Err(err) => {
                    warn!(prompt = %prompt.id, error = %err, "tag rewrite failed, continuing batch");
                    failed.push(prompt.id);
                }
            }
        }

        info!(matched, updated = updated.len(), failed = failed.len(), "taxonomy batch complete");
        BatchOutcome::Done {
            matched,
            succeeded,
            failed,
            updated,
        }
    }
}

/// Result of one batch pass over matching prompts
enum BatchOutcome {
    /// The corpus query itself failed; nothing was touched
    Unreadable(StoreError),
    Done {
        matched: usize,
        succeeded: Vec<PromptId>,
        failed: Vec<PromptId>,
        updated: Vec<PromptId>,
    },
}

impl BatchOutcome {
    fn into_result(self) -> Result<TaxonomyReport, TaxonomyError> {
        match self {
            BatchOutcome::Unreadable(err) => Err(err.into()),
            BatchOutcome::Done {
                matched,
                succeeded,
                failed,
                updated,
            } => {
                if failed.is_empty() {
                    Ok(TaxonomyReport { matched, updated })
                } else {
                    Err(TaxonomyError::PartialFailure { succeeded, failed })
                }
            }
        }
    }
}

fn scope_label(scope: &TagScope) -> String {
    match scope {
        TagScope::Global => "global".to_string(),
        TagScope::OwnedBy(user_id) => format!("user:{user_id}"),
        TagScope::Team(team_id) => format!("team:{team_id}"),
    }
}
