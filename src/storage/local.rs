use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task;

use super::{is_direct_child, ObjectHandle, ObjectMetadata, ObjectStore, StorageError};

/// Directory (under the bucket root) holding object blobs
const OBJECTS_DIR: &str = "objects";
/// Catalog database file name (under the bucket root)
const CATALOG_FILE: &str = "catalog.db";

/// A directory acting as an object-storage bucket.
///
/// Object bytes live under `<root>/objects/` as one file per generation
/// (`<key>.<generation>`); a SQLite catalog maps each key to its current
/// generation, creation time and size. Writing a new generation changes the
/// blob path, so download URLs of overwritten objects change too.
pub struct LocalBucket {
    root: PathBuf,
    db_path: PathBuf,
}

impl LocalBucket {
    /// Open the bucket at `root`, creating the directory and catalog if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        fs::create_dir_all(root.as_ref().join(OBJECTS_DIR))?;
        // Download URLs are built from absolute paths
        let root = fs::canonicalize(root.as_ref())?;
        let db_path = root.join(CATALOG_FILE);

        let conn = open_catalog(&db_path)?;
        init_schema(&conn)?;

        tracing::info!("Object catalog initialized at: {}", db_path.display());

        Ok(LocalBucket { root, db_path })
    }

    /// Get the bucket root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run blocking catalog work on tokio's blocking pool.
    /// rusqlite::Connection is not Send, so each call opens its own connection.
    async fn with_catalog<T, F>(&self, work: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection, &Path) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let db_path = self.db_path.clone();
        let root = self.root.clone();

        task::spawn_blocking(move || {
            let conn = open_catalog(&db_path)?;
            work(&conn, &root)
        })
        .await
        .map_err(|e| StorageError::Task(format!("catalog task join error: {e}")))?
    }
}

impl std::fmt::Debug for LocalBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBucket")
            .field("root", &self.root)
            .finish()
    }
}

#[async_trait]
impl ObjectStore for LocalBucket {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectHandle>, StorageError> {
        let prefix = prefix.to_string();
        self.with_catalog(move |conn, _| {
            let mut stmt = conn.prepare("SELECT key FROM objects ORDER BY key")?;
            let keys = stmt.query_map([], |row| row.get::<_, String>(0))?;

            let mut handles = Vec::new();
            for key in keys {
                let key = key?;
                if is_direct_child(&prefix, &key) {
                    handles.push(ObjectHandle::new(key));
                }
            }
            Ok(handles)
        })
        .await
    }

    async fn metadata(&self, handle: &ObjectHandle) -> Result<ObjectMetadata, StorageError> {
        let key = handle.key().to_string();
        self.with_catalog(move |conn, _| {
            let row: Option<(i64, i64)> = conn
                .query_row(
                    "SELECT created_at, size FROM objects WHERE key = ?1",
                    [&key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let (created_at, size) = row.ok_or_else(|| StorageError::NotFound(key.clone()))?;
            Ok(ObjectMetadata {
                created_at: from_micros(created_at),
                size: u64::try_from(size).unwrap_or_default(),
            })
        })
        .await
    }

    async fn download_url(&self, handle: &ObjectHandle) -> Result<String, StorageError> {
        let key = handle.key().to_string();
        self.with_catalog(move |conn, root| {
            let generation = current_generation(conn, &key)?
                .ok_or_else(|| StorageError::NotFound(key.clone()))?;
            Ok(format!("file://{}", blob_path(root, &key, generation).display()))
        })
        .await
    }

    async fn upload_bytes(&self, handle: &ObjectHandle, content: &[u8]) -> Result<(), StorageError> {
        let key = handle.key().to_string();
        validate_key(&key)?;
        let content = content.to_vec();

        self.with_catalog(move |conn, root| {
            // Generation lookup and upsert must see the same catalog state.
            // Immediate so concurrent writers wait on the busy timeout.
            let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
            let previous = current_generation(&tx, &key)?;

            // Generation doubles as the creation time (unix micros) and must grow per key
            let now = Utc::now().timestamp_micros();
            let generation = previous.map_or(now, |prev| now.max(prev + 1));

            let path = blob_path(root, &key, generation);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            // Write then rename so readers never see a partial blob
            let partial = path.with_extension(format!("{generation}.part"));
            fs::write(&partial, &content)?;
            fs::rename(&partial, &path)?;

            let stored = upsert_object(&tx, &key, generation, content.len())
                .and_then(|()| tx.commit().map_err(StorageError::from));
            if let Err(e) = stored {
                // The catalog still points at the previous generation
                remove_blob(&path);
                return Err(e);
            }

            if let Some(prev) = previous {
                remove_blob(&blob_path(root, &key, prev));
            }

            tracing::debug!(key = %key, generation, bytes = content.len(), "Stored object");
            Ok(())
        })
        .await
    }

    async fn delete_object(&self, handle: &ObjectHandle) -> Result<(), StorageError> {
        let key = handle.key().to_string();
        self.with_catalog(move |conn, root| {
            let generation = current_generation(conn, &key)?
                .ok_or_else(|| StorageError::NotFound(key.clone()))?;

            conn.execute("DELETE FROM objects WHERE key = ?1", [&key])?;
            remove_blob(&blob_path(root, &key, generation));

            tracing::debug!(key = %key, "Deleted object");
            Ok(())
        })
        .await
    }
}

fn open_catalog(db_path: &Path) -> Result<Connection, StorageError> {
    let conn = Connection::open(db_path)?;
    // Uploads and deletes may run concurrently on separate connections
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(conn)
}

/// Create the catalog tables and indexes if they don't exist
fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS objects (
            key             TEXT PRIMARY KEY,
            generation      INTEGER NOT NULL,
            created_at      INTEGER NOT NULL,
            size            INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_objects_created_at
         ON objects(created_at DESC)",
        [],
    )?;

    Ok(())
}

fn current_generation(conn: &Connection, key: &str) -> Result<Option<i64>, StorageError> {
    let generation = conn
        .query_row(
            "SELECT generation FROM objects WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(generation)
}

fn upsert_object(
    conn: &Connection,
    key: &str,
    generation: i64,
    size: usize,
) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO objects (key, generation, created_at, size) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(key) DO UPDATE SET
             generation = excluded.generation,
             created_at = excluded.created_at,
             size = excluded.size",
        rusqlite::params![key, generation, generation, size as i64],
    )?;
    Ok(())
}

fn blob_path(root: &Path, key: &str, generation: i64) -> PathBuf {
    let mut path = root.join(OBJECTS_DIR);
    for segment in key.split('/') {
        path.push(segment);
    }
    let name = format!(
        "{}.{generation}",
        path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    );
    path.set_file_name(name);
    path
}

/// Remove a superseded blob. The catalog is already updated, so a leftover
/// file is only wasted space.
fn remove_blob(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove blob {}: {e}", path.display()),
    }
}

/// Reject keys that could escape the objects directory
fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && !key.contains('\\')
        && key
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

fn from_micros(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket() -> (tempfile::TempDir, LocalBucket) {
        let dir = tempfile::tempdir().unwrap();
        let bucket = LocalBucket::open(dir.path().join("bucket")).unwrap();
        (dir, bucket)
    }

    fn url_to_path(url: &str) -> PathBuf {
        PathBuf::from(url.strip_prefix("file://").unwrap())
    }

    #[tokio::test]
    async fn test_upload_list_and_read_back() {
        let (_dir, bucket) = bucket();
        let handle = ObjectHandle::new("images/cat");

        bucket.upload_bytes(&handle, b"meow").await.unwrap();

        let listed = bucket.list_objects("images").await.unwrap();
        assert_eq!(listed, vec![handle.clone()]);

        let meta = bucket.metadata(&handle).await.unwrap();
        assert_eq!(meta.size, 4);

        let url = bucket.download_url(&handle).await.unwrap();
        assert!(url.starts_with("file://"));
        assert_eq!(fs::read(url_to_path(&url)).unwrap(), b"meow");
    }

    #[tokio::test]
    async fn test_list_only_direct_children_of_prefix() {
        let (_dir, bucket) = bucket();
        bucket.upload_bytes(&ObjectHandle::new("images/a"), b"a").await.unwrap();
        bucket.upload_bytes(&ObjectHandle::new("images/thumbs/a"), b"t").await.unwrap();
        bucket.upload_bytes(&ObjectHandle::new("other/b"), b"b").await.unwrap();

        let listed = bucket.list_objects("images").await.unwrap();
        assert_eq!(listed, vec![ObjectHandle::new("images/a")]);
    }

    #[tokio::test]
    async fn test_overwrite_keeps_key_and_changes_url() {
        let (_dir, bucket) = bucket();
        let handle = ObjectHandle::new("images/dog");

        bucket.upload_bytes(&handle, b"woof").await.unwrap();
        let first_url = bucket.download_url(&handle).await.unwrap();
        let first_meta = bucket.metadata(&handle).await.unwrap();

        bucket.upload_bytes(&handle, b"WOOF WOOF").await.unwrap();
        let second_url = bucket.download_url(&handle).await.unwrap();
        let second_meta = bucket.metadata(&handle).await.unwrap();

        assert_ne!(first_url, second_url);
        assert!(second_meta.created_at > first_meta.created_at);
        assert_eq!(second_meta.size, 9);
        assert_eq!(fs::read(url_to_path(&second_url)).unwrap(), b"WOOF WOOF");
        // The superseded generation is cleaned up
        assert!(!url_to_path(&first_url).exists());
        assert_eq!(bucket.list_objects("images").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_row_and_blob() {
        let (_dir, bucket) = bucket();
        let handle = ObjectHandle::new("images/gone");
        bucket.upload_bytes(&handle, b"bye").await.unwrap();
        let url = bucket.download_url(&handle).await.unwrap();

        bucket.delete_object(&handle).await.unwrap();

        assert!(bucket.list_objects("images").await.unwrap().is_empty());
        assert!(!url_to_path(&url).exists());
        assert!(matches!(
            bucket.metadata(&handle).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            bucket.delete_object(&handle).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_keys_are_rejected() {
        let (_dir, bucket) = bucket();
        for key in ["", "/abs", "images/../escape", "images//x", "a\\b"] {
            let result = bucket.upload_bytes(&ObjectHandle::new(key), b"x").await;
            assert!(
                matches!(result, Err(StorageError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_catalog_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("bucket");
        {
            let bucket = LocalBucket::open(&root).unwrap();
            bucket.upload_bytes(&ObjectHandle::new("images/kept"), b"1").await.unwrap();
        }

        let reopened = LocalBucket::open(&root).unwrap();
        assert_eq!(
            reopened.list_objects("images").await.unwrap(),
            vec![ObjectHandle::new("images/kept")]
        );
    }

    /// Make every catalog insert and update fail
    fn reject_catalog_writes(bucket: &LocalBucket) {
        let conn = Connection::open(bucket.root().join(CATALOG_FILE)).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_insert BEFORE INSERT ON objects
             BEGIN SELECT RAISE(ABORT, 'catalog is read-only'); END;
             CREATE TRIGGER reject_update BEFORE UPDATE ON objects
             BEGIN SELECT RAISE(ABORT, 'catalog is read-only'); END;",
        )
        .unwrap();
    }

    fn blobs_in(bucket: &LocalBucket, dir: &str) -> Vec<PathBuf> {
        match fs::read_dir(bucket.root().join(OBJECTS_DIR).join(dir)) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_failed_catalog_write_leaves_no_blob() {
        let (_dir, bucket) = bucket();
        reject_catalog_writes(&bucket);

        let result = bucket.upload_bytes(&ObjectHandle::new("images/new"), b"x").await;

        assert!(matches!(result, Err(StorageError::Catalog(_))));
        assert!(blobs_in(&bucket, "images").is_empty());
        assert!(bucket.list_objects("images").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_overwrite_keeps_previous_generation() {
        let (_dir, bucket) = bucket();
        let handle = ObjectHandle::new("images/kept");
        bucket.upload_bytes(&handle, b"original").await.unwrap();
        let url = bucket.download_url(&handle).await.unwrap();
        reject_catalog_writes(&bucket);

        assert!(bucket.upload_bytes(&handle, b"replacement").await.is_err());

        assert_eq!(bucket.download_url(&handle).await.unwrap(), url);
        assert_eq!(fs::read(url_to_path(&url)).unwrap(), b"original");
        assert_eq!(blobs_in(&bucket, "images"), vec![url_to_path(&url)]);
    }

    #[test]
    fn test_blob_path_appends_generation() {
        let path = blob_path(Path::new("/b"), "images/x", 42);
        assert_eq!(path, PathBuf::from("/b/objects/images/x.42"));
    }
}
