use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::data::document_store::{
    Document, DocumentData, DocumentStore, Query, SnapshotReceiver, StoreError,
};
use crate::data::memory_store::{Collections, InMemoryDocumentStore};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    collections: Collections,
}

/// In-memory store that writes every committed change to a JSON file, so a
/// local database survives between CLI invocations.
#[derive(Clone)]
pub struct JsonFileStore {
    inner: InMemoryDocumentStore,
    path: PathBuf,
}

impl JsonFileStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let file = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<StoreFile>(&bytes).map_err(|e| {
                error!(path = %path.display(), "corrupt store file: {}", e);
                StoreError::InvalidData(format!("{}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreFile::default(),
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };

        info!(path = %path.display(), collections = file.collections.len(), "store opened");
        Ok(Self {
            inner: InMemoryDocumentStore::with_collections(file.collections),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let file = StoreFile {
            collections: self.inner.export().await,
        };
        let bytes =
            serde_json::to_vec_pretty(&file).map_err(|e| StoreError::InvalidData(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            error!(path = %self.path.display(), "failed to persist store: {}", e);
            StoreError::Io(e.to_string())
        })
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: DocumentData,
        merge: bool,
    ) -> Result<(), StoreError> {
        self.inner.set(collection, id, data, merge).await?;
        self.persist().await
    }

    async fn create(&self, collection: &str, id: &str, data: DocumentData) -> Result<(), StoreError> {
        self.inner.create(collection, id, data).await?;
        self.persist().await
    }

    async fn update(&self, collection: &str, id: &str, patch: DocumentData) -> Result<(), StoreError> {
        self.inner.update(collection, id, patch).await?;
        self.persist().await
    }

    async fn add(&self, collection: &str, data: DocumentData) -> Result<String, StoreError> {
        let id = self.inner.add(collection, data).await?;
        self.persist().await?;
        Ok(id)
    }

    async fn subscribe(&self, query: Query) -> Result<SnapshotReceiver, StoreError> {
        self.inner.subscribe(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn documents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        let mut data = DocumentData::new();
        data.insert("fullName".into(), json!("Ana Diaz"));
        let id = store.add("requests", data).await.unwrap();

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let doc = reopened.get("requests", &id).await.unwrap().unwrap();
        assert_eq!(Value::Object(doc.data), json!({"fullName": "Ana Diaz"}));
    }

    #[tokio::test]
    async fn corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, b"not json").unwrap();

        let err = JsonFileStore::open(&path).await.err().unwrap();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }
}
