use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::data::document_store::{
    Direction, DocumentStore, Query, SnapshotReceiver, StoreError, to_document_data,
};
use crate::domain::error::DomainError;
use crate::domain::request::{OrganRequest, RequestPatch};

pub const REQUESTS: &str = "requests";

#[async_trait]
pub trait RequestRepository: Send + Sync {
    /// Stores a new request under a generated id and returns it with the id set.
    async fn create(&self, request: OrganRequest) -> Result<OrganRequest, DomainError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<OrganRequest>, DomainError>;
    async fn update(&self, id: &str, patch: &RequestPatch) -> Result<(), DomainError>;
    /// Live query over all requests, newest first.
    async fn subscribe_feed(&self) -> Result<SnapshotReceiver, DomainError>;
}

#[derive(Clone)]
pub struct StoreRequestRepository<S: DocumentStore + 'static> {
    store: Arc<S>,
}

impl<S> StoreRequestRepository<S>
where
    S: DocumentStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S> RequestRepository for StoreRequestRepository<S>
where
    S: DocumentStore + 'static,
{
    async fn create(&self, mut request: OrganRequest) -> Result<OrganRequest, DomainError> {
        let data = to_document_data(&request)?;
        let id = self.store.add(REQUESTS, data).await.map_err(|e| {
            error!("failed to create request: {}", e);
            DomainError::from(e)
        })?;

        request.id = id;
        info!(
            request_id = %request.id,
            user_id = %request.user_id,
            organ_type = %request.organ_type,
            "request created"
        );
        Ok(request)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<OrganRequest>, DomainError> {
        let document = self.store.get(REQUESTS, id).await.map_err(|e| {
            error!("failed to find request {}: {}", id, e);
            DomainError::from(e)
        })?;
        Ok(document.map(|d| d.decode::<OrganRequest>()).transpose()?)
    }

    async fn update(&self, id: &str, patch: &RequestPatch) -> Result<(), DomainError> {
        let data = to_document_data(patch)?;
        self.store
            .update(REQUESTS, id, data)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => DomainError::RequestNotFound(id.to_string()),
                other => {
                    error!("failed to update request {}: {}", id, other);
                    DomainError::from(other)
                }
            })?;

        info!(request_id = %id, "request updated");
        Ok(())
    }

    async fn subscribe_feed(&self) -> Result<SnapshotReceiver, DomainError> {
        let query = Query::collection(REQUESTS).order_by("createdAt", Direction::Descending);
        Ok(self.store.subscribe(query).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory_store::InMemoryDocumentStore;
    use crate::domain::request::{NewOrganRequest, RequestStatus, Urgency};
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn store() -> Arc<InMemoryDocumentStore> {
        Arc::new(InMemoryDocumentStore::new())
    }

    fn new_request() -> NewOrganRequest {
        NewOrganRequest {
            user_id: "u1".into(),
            full_name: "Sam Roe".into(),
            age: 41,
            contact_number: "555-0100".into(),
            hospital_name: "St. Mary".into(),
            hospital_address: "1 Main St".into(),
            organ_type: "Kidney".into(),
            blood_type: "O+".into(),
            urgency_level: Urgency::High,
            is_urgent: true,
            additional_info: None,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn create_assigns_id_and_stores_camel_case(store: Arc<InMemoryDocumentStore>) {
        let repo = StoreRequestRepository::new(Arc::clone(&store));
        let created = repo.create(OrganRequest::submit(new_request())).await.unwrap();
        assert!(!created.id.is_empty());

        let raw = store.get(REQUESTS, &created.id).await.unwrap().unwrap();
        assert_eq!(raw.data.get("status"), Some(&json!("pending")));
        assert_eq!(raw.data.get("organType"), Some(&json!("Kidney")));
        assert!(raw.data.get("createdAt").is_some_and(|v| v.is_i64()));
        assert!(!raw.data.contains_key("id"));

        let found = repo.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(found, created);
    }

    #[rstest]
    #[tokio::test]
    async fn stored_timestamp_is_never_before_submission(store: Arc<InMemoryDocumentStore>) {
        let repo = StoreRequestRepository::new(store);
        for _ in 0..50 {
            let before = chrono::Utc::now();
            let created = repo.create(OrganRequest::submit(new_request())).await.unwrap();
            let stored = repo.find_by_id(&created.id).await.unwrap().unwrap();

            assert!(stored.created_at >= before);
            assert_eq!(stored.created_at, created.created_at);
            assert_eq!(stored.status, RequestStatus::Pending);
        }
    }

    #[rstest]
    #[tokio::test]
    async fn update_merges_top_level_fields(store: Arc<InMemoryDocumentStore>) {
        let repo = StoreRequestRepository::new(store);
        let created = repo.create(OrganRequest::submit(new_request())).await.unwrap();

        let patch = RequestPatch {
            status: Some(RequestStatus::Matched),
            ..RequestPatch::default()
        };
        repo.update(&created.id, &patch).await.unwrap();

        let found = repo.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(found.status, RequestStatus::Matched);
        assert_eq!(found.hospital_name, "St. Mary");
        assert_eq!(found.created_at, created.created_at);
    }

    #[rstest]
    #[tokio::test]
    async fn update_missing_request_is_not_found(store: Arc<InMemoryDocumentStore>) {
        let repo = StoreRequestRepository::new(store);
        let err = repo.update("ghost", &RequestPatch::default()).await.unwrap_err();
        assert!(matches!(err, DomainError::RequestNotFound(id) if id == "ghost"));
    }
}
