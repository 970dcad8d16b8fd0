/// In-memory user store, used by tests and single-process deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::users::model::{normalise_email, UserChanges, UserRecord};
use crate::users::store::UserStore;

#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, UserRecord>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let email = normalise_email(email);
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn create(&self, mut user: UserRecord) -> Result<UserRecord, StoreError> {
        user.email = normalise_email(&user.email);
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("user".to_string()));
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: UserChanges,
    ) -> Result<Option<UserRecord>, StoreError> {
        let mut users = self.users.write().await;

        if let Some(email) = changes.email.as_deref().map(normalise_email) {
            if users.values().any(|u| u.id != id && u.email == email) {
                return Err(StoreError::Conflict("user".to_string()));
            }
        }

        Ok(users.get_mut(&id).map(|record| {
            changes.apply(record);
            record.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        Ok(users.remove(&id).is_some())
    }
}
