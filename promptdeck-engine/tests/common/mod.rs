/// Common test utilities for engine integration tests
///
/// Builds every service against the in-memory store with a capturing audit
/// sink, and provides seed helpers for teams, users, and tagged prompts.
use std::sync::Arc;

use chrono::Utc;
use promptdeck_engine::directory::StoreDirectory;
use promptdeck_engine::membership::MembershipService;
use promptdeck_engine::plan_sync::PlanSyncAdapter;
use promptdeck_engine::taxonomy::TaxonomyService;
use promptdeck_shared::audit::MemoryAuditSink;
use promptdeck_shared::models::{
    normalize_tags, Membership, Plan, Prompt, PromptId, Role, Team, TeamId, User, UserId,
    Visibility,
};
use promptdeck_shared::quota::QuotaConfig;
use promptdeck_shared::store::MemoryStore;

/// Everything a test needs, wired against one shared in-memory store
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub audit: Arc<MemoryAuditSink>,
    pub membership: MembershipService,
    pub taxonomy: TaxonomyService,
    pub plan_sync: PlanSyncAdapter,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let audit = Arc::new(MemoryAuditSink::new());
        let directory = Arc::new(StoreDirectory::new(store.clone()));

        let membership = MembershipService::new(store.clone(), directory, audit.clone());
        let taxonomy = TaxonomyService::new(store.clone(), audit.clone());
        let plan_sync = PlanSyncAdapter::new(store.clone(), audit.clone(), QuotaConfig::default());

        TestContext {
            store,
            audit,
            membership,
            taxonomy,
            plan_sync,
        }
    }

    /// Seeds a user with the given email and returns its id
    pub fn seed_user(&self, email: &str) -> UserId {
        let user = User::new(email, None);
        let id = user.id;
        self.store.insert_user(user);
        id
    }

    /// Seeds a Free-plan team with the given memberships and returns its id
    pub fn seed_team(&self, members: Vec<(UserId, Role)>) -> TeamId {
        self.seed_team_with_id(TeamId::new(), members)
    }

    /// Seeds a Free-plan team under a caller-chosen id
    pub fn seed_team_with_id(&self, id: TeamId, members: Vec<(UserId, Role)>) -> TeamId {
        let now = Utc::now();
        let team = Team {
            id,
            name: "test team".to_string(),
            description: String::new(),
            plan: Plan::Free,
            prompt_limit: QuotaConfig::default().free_team_prompt_limit,
            members: members
                .into_iter()
                .map(|(user_id, role)| Membership::new(user_id, role))
                .collect(),
            billing_ref: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        let id = team.id;
        self.store.insert_team(team);
        id
    }

    /// Seeds a public prompt owned by `owner_id` carrying `tags`
    pub fn seed_prompt(&self, owner_id: UserId, tags: &[&str]) -> PromptId {
        let now = Utc::now();
        let prompt = Prompt {
            id: PromptId::new(),
            owner_id,
            team_id: None,
            title: "test prompt".to_string(),
            content: "say something useful".to_string(),
            tags: normalize_tags(tags.iter().map(|t| t.to_string())),
            visibility: Visibility::Public,
            created_at: now,
            updated_at: now,
        };
        let id = prompt.id;
        self.store.insert_prompt(prompt);
        id
    }

    /// Sorted tag set of a seeded prompt
    pub fn tags_of(&self, prompt_id: PromptId) -> Vec<String> {
        self.store
            .get_prompt(prompt_id)
            .map(|p| p.tags)
            .unwrap_or_default()
    }
}
