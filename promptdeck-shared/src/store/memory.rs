/// In-memory storage backend
///
/// Mutex-protected maps implementing the full `Store` contract, including the
/// version check on membership writes. Used by the engine's integration tests
/// and handy for embedding; nothing here survives a restart.
///
/// Write failures can be injected per prompt to exercise the taxonomy
/// partial-failure path.
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::{Store, StoreError, TagScope};
use crate::models::{Membership, Plan, Prompt, PromptId, Team, TeamId, User, UserId};

#[derive(Debug, Default)]
struct Inner {
    teams: HashMap<TeamId, Team>,
    users: HashMap<UserId, User>,
    prompts: HashMap<PromptId, Prompt>,
    billing_events: HashSet<String>,
    failing_prompt_writes: HashSet<PromptId>,
}

/// In-process `Store` implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a user
    pub fn insert_user(&self, user: User) {
        self.lock().users.insert(user.id, user);
    }

    /// Seeds a team
    pub fn insert_team(&self, team: Team) {
        self.lock().teams.insert(team.id, team);
    }

    /// Seeds a prompt
    pub fn insert_prompt(&self, prompt: Prompt) {
        self.lock().prompts.insert(prompt.id, prompt);
    }

    /// Reads a prompt back (tests)
    pub fn get_prompt(&self, prompt_id: PromptId) -> Option<Prompt> {
        self.lock().prompts.get(&prompt_id).cloned()
    }

    /// Makes `set_prompt_tags` fail for one prompt until cleared
    pub fn fail_writes_for(&self, prompt_id: PromptId) {
        self.lock().failing_prompt_writes.insert(prompt_id);
    }

    /// Clears an injected write failure
    pub fn heal_writes_for(&self, prompt_id: PromptId) {
        self.lock().failing_prompt_writes.remove(&prompt_id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store poisoned")
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_team(&self, team_id: TeamId) -> Result<Team, StoreError> {
        self.lock()
            .teams
            .get(&team_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_team_members(
        &self,
        team_id: TeamId,
        expected_version: i64,
        members: &[Membership],
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let team = inner.teams.get_mut(&team_id).ok_or(StoreError::NotFound)?;

        if team.version != expected_version {
            return Err(StoreError::Conflict);
        }

        team.members = members.to_vec();
        team.version += 1;
        team.updated_at = Utc::now();
        Ok(())
    }

    async fn set_team_plan(
        &self,
        team_id: TeamId,
        plan: Plan,
        prompt_limit: u32,
        billing_ref: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let team = inner.teams.get_mut(&team_id).ok_or(StoreError::NotFound)?;

        team.plan = plan;
        team.prompt_limit = prompt_limit;
        if let Some(r) = billing_ref {
            team.billing_ref = Some(r.to_string());
        }
        team.updated_at = Utc::now();
        Ok(())
    }

    async fn get_user(&self, user_id: UserId) -> Result<User, StoreError> {
        self.lock()
            .users
            .get(&user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let needle = email.to_lowercase();
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.email.to_lowercase() == needle)
            .cloned())
    }

    async fn set_user_plan(&self, user_id: UserId, plan: Plan) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let user = inner.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.plan = plan;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn count_prompts_owned_by(&self, user_id: UserId) -> Result<u32, StoreError> {
        Ok(self
            .lock()
            .prompts
            .values()
            .filter(|p| p.owner_id == user_id)
            .count() as u32)
    }

    async fn count_team_prompts(&self, team_id: TeamId) -> Result<u32, StoreError> {
        Ok(self
            .lock()
            .prompts
            .values()
            .filter(|p| p.team_id == Some(team_id))
            .count() as u32)
    }

    async fn prompts_tagged(
        &self,
        scope: TagScope,
        tags: &[String],
    ) -> Result<Vec<Prompt>, StoreError> {
        let inner = self.lock();
        let mut matched: Vec<Prompt> = inner
            .prompts
            .values()
            .filter(|p| match scope {
                TagScope::Global => true,
                TagScope::OwnedBy(user_id) => p.owner_id == user_id,
                TagScope::Team(team_id) => p.team_id == Some(team_id),
            })
            .filter(|p| p.has_any_tag(tags))
            .cloned()
            .collect();

        // Deterministic order for callers and tests.
        matched.sort_by_key(|p| (p.created_at, p.id.0));
        Ok(matched)
    }

    async fn set_prompt_tags(
        &self,
        prompt_id: PromptId,
        tags: &[String],
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();

        if inner.failing_prompt_writes.contains(&prompt_id) {
            return Err(StoreError::Backend("injected write failure".to_string()));
        }

        let prompt = inner
            .prompts
            .get_mut(&prompt_id)
            .ok_or(StoreError::NotFound)?;
        prompt.tags = tags.to_vec();
        prompt.updated_at = Utc::now();
        Ok(())
    }

    async fn record_billing_event(&self, event_id: &str) -> Result<bool, StoreError> {
        Ok(self.lock().billing_events.insert(event_id.to_string()))
    }

    async fn remove_billing_event(&self, event_id: &str) -> Result<(), StoreError> {
        self.lock().billing_events.remove(event_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn seed_team(store: &MemoryStore, owner: UserId) -> TeamId {
        let team = Team {
            id: TeamId::new(),
            name: "Acme".to_string(),
            description: String::new(),
            plan: Plan::Free,
            prompt_limit: 25,
            members: vec![Membership::new(owner, Role::Owner)],
            billing_ref: None,
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let id = team.id;
        store.insert_team(team);
        id
    }

    #[tokio::test]
    async fn test_versioned_member_write() {
        let store = MemoryStore::new();
        let owner = UserId::new();
        let team_id = seed_team(&store, owner);

        let team = store.get_team(team_id).await.unwrap();
        let mut members = team.members.clone();
        members.push(Membership::new(UserId::new(), Role::Member));

        store
            .update_team_members(team_id, team.version, &members)
            .await
            .unwrap();

        // The old version is now stale.
        let err = store
            .update_team_members(team_id, team.version, &members)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict));

        let reread = store.get_team(team_id).await.unwrap();
        assert_eq!(reread.members.len(), 2);
        assert_eq!(reread.version, team.version + 1);
    }

    #[tokio::test]
    async fn test_billing_event_ledger_is_insert_once() {
        let store = MemoryStore::new();
        assert!(store.record_billing_event("evt_1").await.unwrap());
        assert!(!store.record_billing_event("evt_1").await.unwrap());
        assert!(store.record_billing_event("evt_2").await.unwrap());

        // A released id can be claimed again.
        store.remove_billing_event("evt_1").await.unwrap();
        assert!(store.record_billing_event("evt_1").await.unwrap());
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_insensitive() {
        let store = MemoryStore::new();
        let user = User::new("Ada@Example.com", None);
        let id = user.id;
        store.insert_user(user);

        let found = store.find_user_by_email("ada@example.COM").await.unwrap();
        assert_eq!(found.unwrap().id, id);
        assert!(store
            .find_user_by_email("nobody@example.com")
            .await
            .unwrap()
            .is_none());
    }
}
