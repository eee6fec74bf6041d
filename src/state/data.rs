/// Shared data structures for the gallery state
///
/// These structs represent the data model that flows between
/// the storage layer and the UI layer.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

use super::preview::PreviewHandle;
use crate::storage::ObjectHandle;

/// Represents a single image in the gallery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    /// Resolved download URL of the object's current content
    pub display_url: String,
    /// Reference to the backing object
    pub handle: ObjectHandle,
    /// Creation time of the backing object
    pub created_at: DateTime<Utc>,
}

impl ImageEntry {
    /// Local filesystem path for `file://` URLs (None for any other scheme)
    pub fn local_path(&self) -> Option<PathBuf> {
        self.display_url.strip_prefix("file://").map(PathBuf::from)
    }
}

/// A file picked for upload but not yet sent to storage
#[derive(Debug)]
pub struct StagedFile {
    /// File name as picked (e.g., "IMG_0042.jpg")
    pub name: String,
    /// Bytes that will be uploaded
    pub content: Vec<u8>,
    /// Downscaled preview shown in the upload modal
    pub preview: Option<PreviewHandle>,
}
