use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::data::document_store::{
    DocumentStore, Query, SnapshotReceiver, StoreError, to_document_data,
};
use crate::domain::donor::DonorProfilePatch;
use crate::domain::error::DomainError;
use crate::domain::user::{UserAccount, UserDataPatch};

pub const USERS: &str = "users";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: UserAccount) -> Result<UserAccount, DomainError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<UserAccount>, DomainError>;
    /// Merge-sets account fields. A missing document is first created for
    /// `email` with the current time as `createdAt`.
    async fn merge_user_data(
        &self,
        id: &str,
        email: &str,
        patch: &UserDataPatch,
    ) -> Result<UserAccount, DomainError>;
    /// Merge-patches an existing donor document.
    async fn update_donor(&self, id: &str, patch: &DonorProfilePatch) -> Result<(), DomainError>;
    /// Live query over accounts flagged as donors.
    async fn subscribe_donors(&self) -> Result<SnapshotReceiver, DomainError>;
}

#[derive(Clone)]
pub struct StoreUserRepository<S: DocumentStore + 'static> {
    store: Arc<S>,
}

impl<S> StoreUserRepository<S>
where
    S: DocumentStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S> UserRepository for StoreUserRepository<S>
where
    S: DocumentStore + 'static,
{
    async fn create(&self, user: UserAccount) -> Result<UserAccount, DomainError> {
        let data = to_document_data(&user)?;
        self.store
            .set(USERS, &user.id, data, false)
            .await
            .map_err(|e| {
                error!("failed to create user {}: {}", user.id, e);
                DomainError::from(e)
            })?;

        info!(user_id = %user.id, email = %user.email, "user created");
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserAccount>, DomainError> {
        let document = self.store.get(USERS, id).await.map_err(|e| {
            error!("failed to find user by id {}: {}", id, e);
            DomainError::from(e)
        })?;
        Ok(document.map(|d| d.decode::<UserAccount>()).transpose()?)
    }

    async fn merge_user_data(
        &self,
        id: &str,
        email: &str,
        patch: &UserDataPatch,
    ) -> Result<UserAccount, DomainError> {
        let seed = UserAccount::new(
            id.to_string(),
            email.to_string(),
            patch.full_name.clone().unwrap_or_default(),
        );
        match self.store.create(USERS, id, to_document_data(&seed)?).await {
            Ok(()) => info!(user_id = %id, "missing account document created"),
            Err(StoreError::AlreadyExists { .. }) => {}
            Err(e) => {
                error!("failed to create user {}: {}", id, e);
                return Err(e.into());
            }
        }

        let data = to_document_data(patch)?;
        self.store.set(USERS, id, data, true).await.map_err(|e| {
            error!("failed to update user {}: {}", id, e);
            DomainError::from(e)
        })?;

        info!(user_id = %id, "user data updated");
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound(id.to_string()))
    }

    async fn update_donor(&self, id: &str, patch: &DonorProfilePatch) -> Result<(), DomainError> {
        let data = to_document_data(patch)?;
        self.store
            .update(USERS, id, data)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => DomainError::UserNotFound(id.to_string()),
                other => {
                    error!("failed to update donor {}: {}", id, other);
                    DomainError::from(other)
                }
            })?;

        info!(user_id = %id, "donor profile updated");
        Ok(())
    }

    async fn subscribe_donors(&self) -> Result<SnapshotReceiver, DomainError> {
        let query = Query::collection(USERS).where_eq("isDonor", true);
        Ok(self.store.subscribe(query).await?)
    }
}
