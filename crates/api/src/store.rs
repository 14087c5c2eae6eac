//! Blob store for notebook documents.
//!
//! Uploaded notebooks and executed results live outside the relational
//! store, keyed by notebook ID. The filesystem implementation keeps one
//! file per blob under the configured notebook directory.

use std::path::PathBuf;

use async_trait::async_trait;

use nbrelay_core::types::NotebookId;

/// Errors from the notebook blob store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No blob exists for the requested key.
    #[error("no blob stored under {key}")]
    NotFound { key: String },

    /// An I/O failure while reading or writing a blob.
    #[error("blob store I/O failure for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Key of the uploaded notebook document.
pub fn notebook_key(notebook_id: NotebookId) -> String {
    format!("{notebook_id}.ipynb")
}

/// Key of the executed result notebook.
pub fn result_key(notebook_id: NotebookId) -> String {
    format!("{notebook_id}_result.ipynb")
}

/// Storage abstraction for notebook blobs.
///
/// Keys are always derived from server-generated notebook IDs, never from
/// client input.
#[async_trait]
pub trait NotebookStore: Send + Sync {
    /// Persist a blob under the given key, replacing any previous content.
    async fn save(&self, key: &str, content: &[u8]) -> Result<(), StoreError>;

    /// Load the blob stored under the given key.
    async fn load(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Remove the blob stored under the given key. Removing a missing
    /// blob is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Filesystem-backed notebook store writing one file per blob.
#[derive(Debug, Clone)]
pub struct FsNotebookStore {
    root: PathBuf,
}

impl FsNotebookStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl NotebookStore for FsNotebookStore {
    async fn save(&self, key: &str, content: &[u8]) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StoreError::Io {
                key: key.to_string(),
                source,
            })?;
        tokio::fs::write(self.path_for(key), content)
            .await
            .map_err(|source| StoreError::Io {
                key: key.to_string(),
                source,
            })
    }

    async fn load(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                key: key.to_string(),
            }),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_key_layout() {
        let id = Uuid::nil();
        assert_eq!(
            notebook_key(id),
            "00000000-0000-0000-0000-000000000000.ipynb"
        );
        assert_eq!(
            result_key(id),
            "00000000-0000-0000-0000-000000000000_result.ipynb"
        );
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = FsNotebookStore::new(dir.path().join("notebooks"));

        store
            .save("a.ipynb", b"{\"cells\": []}")
            .await
            .expect("save should succeed");
        let loaded = store.load("a.ipynb").await.expect("load should succeed");

        assert_eq!(loaded, b"{\"cells\": []}");
    }

    #[tokio::test]
    async fn test_load_missing_blob_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = FsNotebookStore::new(dir.path());

        let err = store.load("missing.ipynb").await.unwrap_err();
        assert_matches!(err, StoreError::NotFound { .. });
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = FsNotebookStore::new(dir.path());

        store.save("a.ipynb", b"x").await.expect("save should succeed");
        store.remove("a.ipynb").await.expect("first remove should succeed");
        store
            .remove("a.ipynb")
            .await
            .expect("removing a missing blob should be a no-op");
    }
}
