use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::Mutex;

use super::{is_direct_child, ObjectHandle, ObjectMetadata, ObjectStore, StorageError};

/// Store operations a failure can be injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Metadata,
    Upload,
    Delete,
}

#[derive(Debug, Clone)]
struct StoredObject {
    content: Vec<u8>,
    created_at: DateTime<Utc>,
    generation: u64,
}

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<String, StoredObject>,
    clock: Option<DateTime<Utc>>,
    generation: u64,
    failures: HashSet<Op>,
}

impl Inner {
    /// Strictly increasing timestamps so upload order is always observable
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.clock {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.clock = Some(next);
        next
    }

    fn check(&mut self, op: Op) -> Result<(), StorageError> {
        if self.failures.remove(&op) {
            Err(StorageError::Task(format!("injected failure during {op:?}")))
        } else {
            Ok(())
        }
    }
}

/// In-memory object store for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object with an explicit creation time
    pub async fn insert_at(&self, key: &str, content: &[u8], created_at: DateTime<Utc>) {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        let generation = inner.generation;
        inner.objects.insert(
            key.to_string(),
            StoredObject {
                content: content.to_vec(),
                created_at,
                generation,
            },
        );
    }

    /// Make the next call of `op` fail
    pub async fn fail_next(&self, op: Op) {
        self.inner.lock().await.failures.insert(op);
    }

    pub async fn content(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.lock().await.objects.get(key).map(|o| o.content.clone())
    }

    pub async fn keys(&self) -> Vec<String> {
        self.inner.lock().await.objects.keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectHandle>, StorageError> {
        let mut inner = self.inner.lock().await;
        inner.check(Op::List)?;
        Ok(inner
            .objects
            .keys()
            .filter(|key| is_direct_child(prefix, key))
            .map(ObjectHandle::new)
            .collect())
    }

    async fn metadata(&self, handle: &ObjectHandle) -> Result<ObjectMetadata, StorageError> {
        let mut inner = self.inner.lock().await;
        inner.check(Op::Metadata)?;
        let object = inner
            .objects
            .get(handle.key())
            .ok_or_else(|| StorageError::NotFound(handle.to_string()))?;
        Ok(ObjectMetadata {
            created_at: object.created_at,
            size: object.content.len() as u64,
        })
    }

    async fn download_url(&self, handle: &ObjectHandle) -> Result<String, StorageError> {
        let inner = self.inner.lock().await;
        let object = inner
            .objects
            .get(handle.key())
            .ok_or_else(|| StorageError::NotFound(handle.to_string()))?;
        Ok(format!("memory://{}?generation={}", handle.key(), object.generation))
    }

    async fn upload_bytes(&self, handle: &ObjectHandle, content: &[u8]) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        inner.check(Op::Upload)?;
        let created_at = inner.tick();
        inner.generation += 1;
        let generation = inner.generation;
        inner.objects.insert(
            handle.key().to_string(),
            StoredObject {
                content: content.to_vec(),
                created_at,
                generation,
            },
        );
        Ok(())
    }

    async fn delete_object(&self, handle: &ObjectHandle) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        inner.check(Op::Delete)?;
        inner
            .objects
            .remove(handle.key())
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(handle.to_string()))
    }
}
