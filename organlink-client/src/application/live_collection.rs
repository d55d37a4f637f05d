use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::data::document_store::{Document, SnapshotReceiver, StoreError};

/// State mirrored from a live query.
#[derive(Debug, Clone)]
pub struct LiveState<T> {
    pub items: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for LiveState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: true,
            error: None,
        }
    }
}

/// A locally cached list kept in step with a live query.
///
/// Every pushed snapshot replaces the whole list. The first delivery clears
/// the loading flag. A subscription error is kept as a terminal error string
/// and ends the subscription; nothing is retried. Dropping the collection
/// stops the listener task.
pub struct LiveCollection<T> {
    name: &'static str,
    state: watch::Receiver<LiveState<T>>,
    task: JoinHandle<()>,
}

impl<T> LiveCollection<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn spawn(name: &'static str, mut snapshots: SnapshotReceiver) -> Self {
        let (tx, state) = watch::channel(LiveState::default());

        let task = tokio::spawn(async move {
            while let Some(snapshot) = snapshots.recv().await {
                match snapshot {
                    Ok(documents) => {
                        let items = decode_all::<T>(name, &documents);
                        debug!(collection = name, count = items.len(), "snapshot applied");
                        tx.send_replace(LiveState {
                            items,
                            loading: false,
                            error: None,
                        });
                    }
                    Err(err) => {
                        error!(collection = name, error = %err, "live query failed");
                        tx.send_modify(|state| {
                            state.loading = false;
                            state.error = Some(err.to_string());
                        });
                        return;
                    }
                }
            }
            debug!(collection = name, "live query closed");
        });

        Self { name, state, task }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn items(&self) -> Vec<T> {
        self.state.borrow().items.clone()
    }

    /// Runs `f` against the current items without cloning them.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.state.borrow().items)
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    /// Waits for the first snapshot. Fails if the query errored or closed
    /// before delivering one.
    pub async fn ready(&mut self) -> Result<(), StoreError> {
        self.wait_until(|_| true).await
    }

    /// Waits until a delivered snapshot satisfies `predicate`.
    pub async fn wait_until(
        &mut self,
        mut predicate: impl FnMut(&[T]) -> bool,
    ) -> Result<(), StoreError> {
        let name = self.name;
        let state = self
            .state
            .wait_for(|state| state.error.is_some() || (!state.loading && predicate(&state.items)))
            .await
            .map_err(|_| StoreError::SubscriptionClosed(name.to_string()))?;

        match &state.error {
            Some(message) => Err(StoreError::SubscriptionClosed(message.clone())),
            None => Ok(()),
        }
    }
}

impl<T> Drop for LiveCollection<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn decode_all<T: DeserializeOwned>(name: &str, documents: &[Document]) -> Vec<T> {
    documents
        .iter()
        .filter_map(|document| match document.decode::<T>() {
            Ok(item) => Some(item),
            Err(err) => {
                warn!(collection = name, error = %err, "skipping malformed document");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::document_store::{Document, DocumentData};
    use serde::Deserialize;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Item {
        id: String,
        n: u32,
    }

    fn doc(id: &str, value: Value) -> Document {
        match value {
            Value::Object(map) => Document::new(id, map),
            _ => Document::new(id, DocumentData::new()),
        }
    }

    #[tokio::test]
    async fn starts_loading_and_replaces_list_on_each_snapshot() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut live = LiveCollection::<Item>::spawn("items", rx);
        assert!(live.is_loading());
        assert!(live.items().is_empty());

        tx.send(Ok(vec![doc("a", json!({"n": 1})), doc("b", json!({"n": 2}))]))
            .unwrap();
        timeout(Duration::from_secs(1), live.wait_until(|items| items.len() == 2))
            .await
            .unwrap()
            .unwrap();
        assert!(!live.is_loading());

        tx.send(Ok(vec![doc("c", json!({"n": 3}))])).unwrap();
        timeout(Duration::from_secs(1), live.wait_until(|items| items.len() == 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            live.items(),
            vec![Item {
                id: "c".into(),
                n: 3
            }]
        );
    }

    #[tokio::test]
    async fn malformed_documents_are_skipped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut live = LiveCollection::<Item>::spawn("items", rx);

        tx.send(Ok(vec![doc("a", json!({"n": "x"})), doc("b", json!({"n": 2}))]))
            .unwrap();
        timeout(Duration::from_secs(1), live.ready()).await.unwrap().unwrap();

        assert_eq!(live.with_items(|items| items.len()), 1);
    }

    #[tokio::test]
    async fn error_is_terminal() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut live = LiveCollection::<Item>::spawn("items", rx);

        tx.send(Ok(vec![doc("a", json!({"n": 1}))])).unwrap();
        tx.send(Err(StoreError::SubscriptionClosed("permission denied".into())))
            .unwrap();
        let _ = tx.send(Ok(Vec::new()));

        let err = timeout(Duration::from_secs(1), live.wait_until(|items| items.is_empty()))
            .await
            .unwrap()
            .unwrap_err();
        assert!(err.to_string().contains("permission denied"));
        assert!(!live.is_loading());
        assert_eq!(live.items().len(), 1);
        assert!(live.error().is_some());
    }

    #[tokio::test]
    async fn closing_before_first_snapshot_fails_ready() {
        let (tx, rx) = mpsc::unbounded_channel::<crate::data::document_store::Snapshot>();
        let mut live = LiveCollection::<Item>::spawn("items", rx);
        drop(tx);

        let result = timeout(Duration::from_secs(1), live.ready()).await.unwrap();
        assert!(result.is_err());
        assert!(live.is_loading());
    }
}
