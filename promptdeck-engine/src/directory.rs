/// User directory lookup
///
/// Collaborator contract for resolving an invitee's email to an existing
/// account. Resolution never creates accounts: an unknown email is simply
/// "not found" and `MembershipService` turns that into `UserNotFound`.
use async_trait::async_trait;
use std::sync::Arc;

use promptdeck_shared::models::UserId;
use promptdeck_shared::store::{Store, StoreError};

/// Resolves emails to user ids
#[async_trait]
pub trait DirectoryLookup: Send + Sync {
    /// Looks up an account by email; `None` when no account exists
    async fn resolve_email(&self, email: &str) -> Result<Option<UserId>, StoreError>;
}

/// Directory backed by the primary store's user records
pub struct StoreDirectory {
    store: Arc<dyn Store>,
}

impl StoreDirectory {
    pub fn new(store: Arc<dyn Store>) -> Self {
        StoreDirectory { store }
    }
}

#[async_trait]
impl DirectoryLookup for StoreDirectory {
    async fn resolve_email(&self, email: &str) -> Result<Option<UserId>, StoreError> {
        Ok(self.store.find_user_by_email(email).await?.map(|u| u.id))
    }
}
