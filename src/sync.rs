/// Storage sync
///
/// Async glue between the gallery's requests and an `ObjectStore`. The
/// gallery never updates its entries optimistically: every mutation is
/// followed by a full `fetch_entries`.

use futures::future::try_join_all;
use std::sync::Arc;

use crate::state::data::ImageEntry;
use crate::state::gallery::UploadRequest;
use crate::storage::{ObjectHandle, ObjectStore, StorageError};

/// List every object under `prefix` and resolve its metadata and URL.
/// Objects are resolved concurrently; any failure fails the whole fetch,
/// so partial lists are never returned.
pub async fn fetch_entries(
    store: Arc<dyn ObjectStore>,
    prefix: String,
) -> Result<Vec<ImageEntry>, StorageError> {
    let handles = store.list_objects(&prefix).await?;

    let resolves = handles.into_iter().map(|handle| {
        let store = Arc::clone(&store);
        async move {
            let metadata = store.metadata(&handle).await?;
            let display_url = store.download_url(&handle).await?;
            tracing::trace!(key = %handle, size = metadata.size, "Resolved object");
            Ok::<_, StorageError>(ImageEntry {
                display_url,
                handle,
                created_at: metadata.created_at,
            })
        }
    });

    let entries = try_join_all(resolves).await?;
    tracing::debug!(prefix = %prefix, count = entries.len(), "Fetched object list");
    Ok(entries)
}

/// Upload the staged file's bytes to the request's handle
pub async fn upload(store: Arc<dyn ObjectStore>, request: UploadRequest) -> Result<(), StorageError> {
    store
        .upload_bytes(&request.handle, &request.file.content)
        .await?;
    tracing::info!(
        key = %request.handle,
        bytes = request.file.content.len(),
        replaced = request.replaces_existing,
        "Upload complete"
    );
    Ok(())
}

pub async fn delete(store: Arc<dyn ObjectStore>, handle: ObjectHandle) -> Result<(), StorageError> {
    store.delete_object(&handle).await?;
    tracing::info!(key = %handle, "Delete complete");
    Ok(())
}
