pub mod local;
pub mod memory;

use std::sync::Arc;

use crate::types::Workspace;

/// Fixed key the workspace document is stored under.
pub const STORAGE_KEY: &str = "notaboard.workspace";

/// Opaque get/set-by-key string store.
/// Implementations: MemoryStore (in-process), FileStore (one file per key).
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` if nothing was stored yet.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored document is not valid JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Read and decode the workspace stored under `key`.
pub fn load_workspace<S: KeyValueStore + ?Sized>(
    store: &S,
    key: &str,
) -> Result<Option<Workspace>, StorageError> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode and write the workspace under `key`.
pub fn save_workspace<S: KeyValueStore + ?Sized>(
    store: &S,
    key: &str,
    workspace: &Workspace,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(workspace)?;
    store.set(key, &raw)
}
