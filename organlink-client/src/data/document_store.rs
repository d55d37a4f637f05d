use std::cmp::Ordering;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::mpsc;

pub type DocumentData = Map<String, Value>;

/// One full result set pushed by a live query.
pub type Snapshot = Result<Vec<Document>, StoreError>;

pub type SnapshotReceiver = mpsc::UnboundedReceiver<Snapshot>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
    #[error("document already exists: {collection}/{id}")]
    AlreadyExists { collection: String, id: String },
    #[error("invalid document data: {0}")]
    InvalidData(String),
    #[error("failed to decode document {id}: {message}")]
    Decode { id: String, message: String },
    #[error("storage error: {0}")]
    Io(String),
    #[error("subscription closed: {0}")]
    SubscriptionClosed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: DocumentData,
}

impl Document {
    pub fn new(id: impl Into<String>, data: DocumentData) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Decodes the document with its key exposed as an `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut data = self.data.clone();
        data.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(data)).map_err(|e| StoreError::Decode {
            id: self.id.clone(),
            message: e.to_string(),
        })
    }
}

/// Serializes a record into document fields. The `id` key is dropped since it
/// lives in the document path.
pub fn to_document_data<T: Serialize>(value: &T) -> Result<DocumentData, StoreError> {
    match serde_json::to_value(value).map_err(|e| StoreError::InvalidData(e.to_string()))? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        other => Err(StoreError::InvalidData(format!(
            "expected an object, got {other}"
        ))),
    }
}

/// Shallow merge: top-level keys of `patch` overwrite those of `target`.
pub fn merge_into(target: &mut DocumentData, patch: DocumentData) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, Direction)>,
}

impl Query {
    pub fn collection(name: &str) -> Self {
        Self {
            collection: name.to_string(),
            filters: Vec::new(),
            order_by: None,
        }
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn matches(&self, data: &DocumentData) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| data.get(field) == Some(expected))
    }

    /// Filters and orders `documents`. Without an order-by the input order is kept.
    pub fn apply<'a>(&self, documents: impl IntoIterator<Item = (&'a String, &'a DocumentData)>) -> Vec<Document> {
        let mut result: Vec<Document> = documents
            .into_iter()
            .filter(|(_, data)| self.matches(data))
            .map(|(id, data)| Document::new(id.clone(), data.clone()))
            .collect();

        if let Some((field, direction)) = &self.order_by {
            result.sort_by(|a, b| {
                let ordering = compare_values(a.data.get(field), b.data.get(field));
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        result
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// A document database with live queries.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Writes a document. With `merge` the fields are merged into any existing
    /// document, otherwise the document is replaced.
    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: DocumentData,
        merge: bool,
    ) -> Result<(), StoreError>;

    /// Inserts a document under `id` only if no document has that key yet.
    /// The check and the write happen atomically.
    async fn create(&self, collection: &str, id: &str, data: DocumentData) -> Result<(), StoreError>;

    /// Merges `patch` into an existing document.
    async fn update(&self, collection: &str, id: &str, patch: DocumentData) -> Result<(), StoreError>;

    /// Adds a document under a generated id and returns the id.
    async fn add(&self, collection: &str, data: DocumentData) -> Result<String, StoreError>;

    /// Starts a live query. The current result set is delivered immediately
    /// and a fresh full snapshot follows every change to the collection.
    async fn subscribe(&self, query: Query) -> Result<SnapshotReceiver, StoreError>;
}
