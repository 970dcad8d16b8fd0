use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::users::model::{UserChanges, UserRecord};

/// Persistence collaborator for user records.
///
/// Implementations must tolerate concurrent callers. Any backend failure is
/// reported as `StoreError::Unavailable`; absence is `Ok(None)`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError>;

    /// Insert a new record. Fails with `StoreError::Conflict` if the email
    /// is already taken.
    async fn create(&self, user: UserRecord) -> Result<UserRecord, StoreError>;

    /// Apply `changes` and return the updated record, or `None` if no user
    /// has this id.
    async fn update(&self, id: Uuid, changes: UserChanges)
        -> Result<Option<UserRecord>, StoreError>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}
