use std::sync::Arc;

use tracing::{info, instrument};

use crate::application::live_collection::LiveCollection;
use crate::data::request_repository::RequestRepository;
use crate::domain::donor::DonorProfile;
use crate::domain::error::DomainError;
use crate::domain::matching::{RequestFilter, filter_requests, match_donors_for_request, user_requests};
use crate::domain::request::{NewOrganRequest, OrganRequest, RequestPatch, RequestStatus};

/// Request mutations, usable without holding a live feed.
pub struct RequestService<R: RequestRepository + 'static> {
    repo: Arc<R>,
}

impl<R> Clone for RequestService<R>
where
    R: RequestRepository + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R> RequestService<R>
where
    R: RequestRepository + 'static,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, id: &str) -> Result<OrganRequest, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::RequestNotFound(id.to_string()))
    }

    /// Submits a new request as pending, stamped with the current time.
    #[instrument(skip(self, new), fields(user_id = %new.user_id))]
    pub async fn create_request(&self, new: NewOrganRequest) -> Result<OrganRequest, DomainError> {
        self.repo.create(OrganRequest::submit(new)).await
    }

    /// Merge-patches a request. Last writer wins; status moves are not checked.
    #[instrument(skip(self))]
    pub async fn update_request(&self, id: &str, patch: RequestPatch) -> Result<(), DomainError> {
        self.repo.update(id, &patch).await
    }

    /// Moves a request's status forward; backward or repeated moves fail.
    #[instrument(skip(self))]
    pub async fn advance_request_status(
        &self,
        id: &str,
        next: RequestStatus,
    ) -> Result<OrganRequest, DomainError> {
        let mut request = self.get(id).await?;

        if !request.status.can_advance_to(next) {
            return Err(DomainError::InvalidStatusTransition {
                from: request.status,
                to: next,
            });
        }

        let patch = RequestPatch {
            status: Some(next),
            ..RequestPatch::default()
        };
        self.repo.update(id, &patch).await?;

        info!(request_id = %id, from = %request.status, to = %next, "request status advanced");
        request.status = next;
        Ok(request)
    }
}

/// Live feed of organ requests, newest first, plus the request mutations.
pub struct RequestBoard<R: RequestRepository + 'static> {
    service: RequestService<R>,
    requests: LiveCollection<OrganRequest>,
}

impl<R> RequestBoard<R>
where
    R: RequestRepository + 'static,
{
    pub async fn subscribe(repo: Arc<R>) -> Result<Self, DomainError> {
        let snapshots = repo.subscribe_feed().await?;
        Ok(Self {
            service: RequestService::new(repo),
            requests: LiveCollection::spawn("requests", snapshots),
        })
    }

    pub fn service(&self) -> &RequestService<R> {
        &self.service
    }

    pub fn requests(&self) -> Vec<OrganRequest> {
        self.requests.items()
    }

    pub fn is_loading(&self) -> bool {
        self.requests.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.requests.error()
    }

    pub fn live(&mut self) -> &mut LiveCollection<OrganRequest> {
        &mut self.requests
    }

    pub async fn ready(&mut self) -> Result<(), DomainError> {
        Ok(self.requests.ready().await?)
    }

    pub fn find(&self, id: &str) -> Option<OrganRequest> {
        self.requests
            .with_items(|requests| requests.iter().find(|r| r.id == id).cloned())
    }

    pub fn filtered(&self, filter: &RequestFilter) -> Vec<OrganRequest> {
        self.requests
            .with_items(|requests| filter_requests(requests, filter).into_iter().cloned().collect())
    }

    pub fn user_requests(&self, user_id: &str) -> Vec<OrganRequest> {
        self.requests
            .with_items(|requests| user_requests(requests, user_id).into_iter().cloned().collect())
    }

    /// Donors able to serve the request with `id`. Never changes its status.
    pub fn matching_donors(
        &self,
        id: &str,
        donors: &[DonorProfile],
    ) -> Result<Vec<DonorProfile>, DomainError> {
        let request = self
            .find(id)
            .ok_or_else(|| DomainError::RequestNotFound(id.to_string()))?;
        Ok(match_donors_for_request(&request, donors)
            .into_iter()
            .cloned()
            .collect())
    }

    pub async fn create_request(&self, new: NewOrganRequest) -> Result<OrganRequest, DomainError> {
        self.service.create_request(new).await
    }

    pub async fn update_request(&self, id: &str, patch: RequestPatch) -> Result<(), DomainError> {
        self.service.update_request(id, patch).await
    }

    pub async fn advance_request_status(
        &self,
        id: &str,
        next: RequestStatus,
    ) -> Result<OrganRequest, DomainError> {
        self.service.advance_request_status(id, next).await
    }
}
