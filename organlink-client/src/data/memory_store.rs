use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::data::document_store::{
    Document, DocumentData, DocumentStore, Query, Snapshot, SnapshotReceiver, StoreError,
    merge_into,
};

pub type Collections = BTreeMap<String, BTreeMap<String, DocumentData>>;

struct Subscriber {
    query: Query,
    tx: mpsc::UnboundedSender<Snapshot>,
}

#[derive(Default)]
struct StoreState {
    collections: Collections,
    subscribers: Vec<Subscriber>,
}

impl StoreState {
    fn snapshot(&self, query: &Query) -> Vec<Document> {
        match self.collections.get(&query.collection) {
            Some(documents) => query.apply(documents.iter()),
            None => Vec::new(),
        }
    }

    /// Pushes a fresh snapshot to every live query on `collection` and drops
    /// subscribers whose receiver is gone.
    fn notify(&mut self, collection: &str) {
        let mut pending = Vec::new();
        for (index, subscriber) in self.subscribers.iter().enumerate() {
            if subscriber.query.collection == collection {
                pending.push((index, self.snapshot(&subscriber.query)));
            }
        }

        let mut closed = Vec::new();
        for (index, snapshot) in pending {
            if self.subscribers[index].tx.send(Ok(snapshot)).is_err() {
                closed.push(index);
            }
        }

        for index in closed.into_iter().rev() {
            self.subscribers.swap_remove(index);
        }
    }
}

/// Process-local document store with live queries.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collections(collections: Collections) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                collections,
                subscribers: Vec::new(),
            })),
        }
    }

    pub async fn export(&self) -> Collections {
        self.state.lock().await.collections.clone()
    }

    /// Ends every live query with `error`, as the service does when it revokes
    /// a listener.
    pub async fn revoke_subscriptions(&self, error: StoreError) {
        let mut state = self.state.lock().await;
        warn!(count = state.subscribers.len(), error = %error, "revoking live queries");
        for subscriber in state.subscribers.drain(..) {
            let _ = subscriber.tx.send(Err(error.clone()));
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .map(|data| Document::new(id, data.clone())))
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: DocumentData,
        merge: bool,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let documents = state.collections.entry(collection.to_string()).or_default();
        match documents.get_mut(id) {
            Some(existing) if merge => merge_into(existing, data),
            _ => {
                documents.insert(id.to_string(), data);
            }
        }
        debug!(collection, id, merge, "document set");
        state.notify(collection);
        Ok(())
    }

    async fn create(&self, collection: &str, id: &str, data: DocumentData) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let documents = state.collections.entry(collection.to_string()).or_default();
        if documents.contains_key(id) {
            return Err(StoreError::AlreadyExists {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        documents.insert(id.to_string(), data);
        debug!(collection, id, "document created");
        state.notify(collection);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: DocumentData) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let existing = state
            .collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        merge_into(existing, patch);
        debug!(collection, id, "document updated");
        state.notify(collection);
        Ok(())
    }

    async fn add(&self, collection: &str, data: DocumentData) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        let mut state = self.state.lock().await;
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), data);
        debug!(collection, id = %id, "document added");
        state.notify(collection);
        Ok(id)
    }

    async fn subscribe(&self, query: Query) -> Result<SnapshotReceiver, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock().await;
        tx.send(Ok(state.snapshot(&query)))
            .map_err(|_| StoreError::SubscriptionClosed(query.collection.clone()))?;
        info!(collection = %query.collection, filters = query.filters.len(), "live query started");
        state.subscribers.push(Subscriber { query, tx });
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::document_store::Direction;
    use serde_json::{Value, json};

    fn data(value: Value) -> DocumentData {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn ids(snapshot: Snapshot) -> Vec<String> {
        snapshot.unwrap().into_iter().map(|d| d.id).collect()
    }

    #[tokio::test]
    async fn subscription_receives_initial_and_follow_up_snapshots() {
        let store = InMemoryDocumentStore::new();
        store
            .set("requests", "old", data(json!({"createdAt": 1})), false)
            .await
            .unwrap();

        let query = Query::collection("requests").order_by("createdAt", Direction::Descending);
        let mut rx = store.subscribe(query).await.unwrap();
        assert_eq!(ids(rx.recv().await.unwrap()), ["old"]);

        store
            .set("requests", "new", data(json!({"createdAt": 2})), false)
            .await
            .unwrap();
        assert_eq!(ids(rx.recv().await.unwrap()), ["new", "old"]);
    }

    #[tokio::test]
    async fn writes_to_other_collections_do_not_notify() {
        let store = InMemoryDocumentStore::new();
        let mut rx = store.subscribe(Query::collection("users")).await.unwrap();
        rx.recv().await.unwrap().unwrap();

        store.add("requests", DocumentData::new()).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn merge_set_keeps_existing_fields_and_plain_set_replaces() {
        let store = InMemoryDocumentStore::new();
        store
            .set("users", "u1", data(json!({"a": 1, "b": 1})), false)
            .await
            .unwrap();
        store
            .set("users", "u1", data(json!({"b": 2})), true)
            .await
            .unwrap();
        let doc = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(Value::Object(doc.data), json!({"a": 1, "b": 2}));

        store
            .set("users", "u1", data(json!({"c": 3})), false)
            .await
            .unwrap();
        let doc = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(Value::Object(doc.data), json!({"c": 3}));
    }

    #[tokio::test]
    async fn create_refuses_to_overwrite() {
        let store = InMemoryDocumentStore::new();
        store
            .create("credentials", "ana@example.com", data(json!({"uid": "u1"})))
            .await
            .unwrap();

        let err = store
            .create("credentials", "ana@example.com", data(json!({"uid": "u2"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));

        let doc = store.get("credentials", "ana@example.com").await.unwrap().unwrap();
        assert_eq!(Value::Object(doc.data), json!({"uid": "u1"}));
    }

    #[tokio::test]
    async fn concurrent_creates_admit_exactly_one() {
        let store = InMemoryDocumentStore::new();
        let attempts = (0..8).map(|n| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .create("credentials", "same@example.com", data(json!({"n": n})))
                    .await
            })
        });

        let mut created = 0;
        for attempt in attempts.collect::<Vec<_>>() {
            if attempt.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn update_requires_existing_document() {
        let store = InMemoryDocumentStore::new();
        let err = store
            .update("users", "missing", DocumentData::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn revoked_subscription_receives_terminal_error() {
        let store = InMemoryDocumentStore::new();
        let mut rx = store.subscribe(Query::collection("users")).await.unwrap();
        rx.recv().await.unwrap().unwrap();

        store
            .revoke_subscriptions(StoreError::SubscriptionClosed("permission denied".into()))
            .await;

        assert!(rx.recv().await.unwrap().is_err());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn dropped_receivers_are_pruned() {
        let store = InMemoryDocumentStore::new();
        drop(store.subscribe(Query::collection("users")).await.unwrap());

        store.add("users", DocumentData::new()).await.unwrap();
        assert!(store.state.lock().await.subscribers.is_empty());
    }
}
