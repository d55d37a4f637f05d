use std::sync::Arc;

use tracing::{instrument, warn};

use crate::application::live_collection::LiveCollection;
use crate::data::user_repository::UserRepository;
use crate::domain::donor::{Availability, DonorProfile, DonorProfilePatch};
use crate::domain::error::DomainError;
use crate::domain::matching::{DonorFilter, filter_donors};

/// Donor-profile mutations, usable without holding a live list.
pub struct DonorService<R: UserRepository + 'static> {
    repo: Arc<R>,
}

impl<R> Clone for DonorService<R>
where
    R: UserRepository + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R> DonorService<R>
where
    R: UserRepository + 'static,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self))]
    pub async fn update_donor_profile(
        &self,
        user_id: &str,
        patch: DonorProfilePatch,
    ) -> Result<(), DomainError> {
        self.repo.update_donor(user_id, &patch).await
    }

    /// Flips a donor's availability. Accounts that never became donors are
    /// rejected.
    #[instrument(skip(self))]
    pub async fn set_availability(
        &self,
        user_id: &str,
        status: Availability,
    ) -> Result<(), DomainError> {
        let account = self
            .repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound(user_id.to_string()))?;
        if !account.is_donor {
            warn!(user_id = %user_id, "availability change for non-donor rejected");
            return Err(DomainError::NotADonor(user_id.to_string()));
        }

        self.update_donor_profile(
            user_id,
            DonorProfilePatch {
                status: Some(status),
                ..DonorProfilePatch::default()
            },
        )
        .await
    }
}

/// Live list of donors plus the donor-profile mutations.
pub struct DonorDirectory<R: UserRepository + 'static> {
    service: DonorService<R>,
    donors: LiveCollection<DonorProfile>,
}

impl<R> DonorDirectory<R>
where
    R: UserRepository + 'static,
{
    pub async fn subscribe(repo: Arc<R>) -> Result<Self, DomainError> {
        let snapshots = repo.subscribe_donors().await?;
        Ok(Self {
            service: DonorService::new(repo),
            donors: LiveCollection::spawn("donors", snapshots),
        })
    }

    pub fn service(&self) -> &DonorService<R> {
        &self.service
    }

    pub fn donors(&self) -> Vec<DonorProfile> {
        self.donors.items()
    }

    pub fn is_loading(&self) -> bool {
        self.donors.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.donors.error()
    }

    pub fn live(&mut self) -> &mut LiveCollection<DonorProfile> {
        &mut self.donors
    }

    pub async fn ready(&mut self) -> Result<(), DomainError> {
        Ok(self.donors.ready().await?)
    }

    /// Available donors matching `filter`, in list order.
    pub fn filtered(&self, filter: &DonorFilter) -> Vec<DonorProfile> {
        self.donors
            .with_items(|donors| filter_donors(donors, filter).into_iter().cloned().collect())
    }

    pub async fn update_donor_profile(
        &self,
        user_id: &str,
        patch: DonorProfilePatch,
    ) -> Result<(), DomainError> {
        self.service.update_donor_profile(user_id, patch).await
    }

    pub async fn set_availability(
        &self,
        user_id: &str,
        status: Availability,
    ) -> Result<(), DomainError> {
        self.service.set_availability(user_id, status).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory_store::InMemoryDocumentStore;
    use crate::data::user_repository::StoreUserRepository;
    use crate::domain::user::UserAccount;
    use rstest::{fixture, rstest};

    type Repo = StoreUserRepository<InMemoryDocumentStore>;

    #[fixture]
    fn repo() -> Arc<Repo> {
        Arc::new(StoreUserRepository::new(Arc::new(InMemoryDocumentStore::new())))
    }

    async fn account(repo: &Repo, id: &str, is_donor: bool) {
        let mut account = UserAccount::new(id.into(), format!("{id}@example.com"), id.into());
        account.is_donor = is_donor;
        repo.create(account).await.unwrap();
    }

    #[rstest]
    #[tokio::test]
    async fn availability_is_only_set_on_donors(repo: Arc<Repo>) {
        account(&repo, "donor", true).await;
        account(&repo, "plain", false).await;
        let service = DonorService::new(Arc::clone(&repo));

        service
            .set_availability("donor", Availability::Available)
            .await
            .unwrap();

        let err = service
            .set_availability("plain", Availability::Available)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotADonor(id) if id == "plain"));

        let err = service
            .set_availability("ghost", Availability::Available)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::UserNotFound(_)));
    }

    #[rstest]
    #[tokio::test]
    async fn rejected_change_leaves_account_untouched(repo: Arc<Repo>) {
        account(&repo, "plain", false).await;
        let before = repo.find_by_id("plain").await.unwrap();

        let _ = DonorService::new(Arc::clone(&repo))
            .set_availability("plain", Availability::Available)
            .await;

        assert_eq!(repo.find_by_id("plain").await.unwrap(), before);
    }
}
