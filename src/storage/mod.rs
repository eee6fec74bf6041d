/// Object storage module
///
/// The gallery treats storage as an external collaborator behind the
/// `ObjectStore` trait:
/// - Local directory bucket with a SQLite object catalog (local.rs)
/// - In-memory store for tests (memory.rs)

pub mod local;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Errors reported by an object store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid object key: {0:?}")]
    InvalidKey(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object catalog error: {0}")]
    Catalog(#[from] rusqlite::Error),

    #[error("storage task failed: {0}")]
    Task(String),
}

/// Opaque reference to a stored object, addressed by its full key
/// (e.g. "images/6f1c...").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle {
    key: String,
}

impl ObjectHandle {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// A new handle under `prefix` with a random v4 UUID as its name
    pub fn fresh(prefix: &str) -> Self {
        Self::new(join_key(prefix, &uuid::Uuid::new_v4().to_string()))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Last path segment of the key
    pub fn name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Metadata the gallery needs from a stored object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Creation time of the current object generation
    pub created_at: DateTime<Utc>,
    /// Size in bytes
    pub size: u64,
}

/// An object store addressable by string key.
///
/// Calls are independent and not transactional; callers re-list after a
/// mutation instead of trusting local bookkeeping.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Handles of the objects directly under `prefix` (no recursion)
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectHandle>, StorageError>;

    async fn metadata(&self, handle: &ObjectHandle) -> Result<ObjectMetadata, StorageError>;

    /// URL the object's current content can be displayed from
    async fn download_url(&self, handle: &ObjectHandle) -> Result<String, StorageError>;

    /// Create or overwrite the object. Overwriting starts a new generation.
    async fn upload_bytes(&self, handle: &ObjectHandle, content: &[u8]) -> Result<(), StorageError>;

    async fn delete_object(&self, handle: &ObjectHandle) -> Result<(), StorageError>;
}

/// Join a prefix and a name into an object key
pub fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Whether `key` sits directly under `prefix`
pub fn is_direct_child(prefix: &str, key: &str) -> bool {
    let prefix = prefix.trim_matches('/');
    let rest = if prefix.is_empty() {
        key
    } else {
        match key.strip_prefix(prefix).and_then(|r| r.strip_prefix('/')) {
            Some(rest) => rest,
            None => return false,
        }
    };
    !rest.is_empty() && !rest.contains('/')
}
