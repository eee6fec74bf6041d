use std::sync::Arc;

use super::data::{ImageEntry, StagedFile};
use crate::storage::ObjectHandle;

/// Identifies one list refresh. Tokens are issued in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshToken(u64);

/// Identifies one opening of a modal. A file picked while the upload or
/// edit modal was open is only staged into that same opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSession(u64);

/// The modal currently shown over the grid. Exactly one at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Modal {
    #[default]
    Closed,
    /// Enlarged view of the entry at `index`
    Zoom { index: usize },
    /// Pick and upload a new image
    Upload,
    /// Pick a file to replace `target`'s content
    Edit { target: ImageEntry },
    /// Confirmation before deleting `handle`
    ConfirmDelete { handle: ObjectHandle },
}

impl Modal {
    /// Whether this modal takes a staged file
    pub fn accepts_file(&self) -> bool {
        matches!(self, Modal::Upload | Modal::Edit { .. })
    }
}

/// Storage mutation currently in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Upload,
    Delete,
}

/// Everything needed to run one upload against the store
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub handle: ObjectHandle,
    pub file: Arc<StagedFile>,
    /// True when overwriting an existing object in place
    pub replaces_existing: bool,
}

/// Gallery state: the known images and the active modal.
///
/// All methods are synchronous state transitions. Methods that need storage
/// work return a request for the caller to run and take its result back
/// through the matching `*_finished` / `apply_refresh` method.
#[derive(Debug)]
pub struct Gallery {
    prefix: String,
    entries: Vec<ImageEntry>,
    modal: Modal,
    staged: Option<Arc<StagedFile>>,
    pending: Option<Pending>,
    session: u64,
    last_issued: u64,
    last_applied: u64,
    notice: Option<String>,
}

impl Gallery {
    /// Create an empty gallery for objects under `prefix`
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            entries: Vec::new(),
            modal: Modal::Closed,
            staged: None,
            pending: None,
            session: 0,
            last_issued: 0,
            last_applied: 0,
            notice: None,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Entries, newest first
    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    pub fn staged(&self) -> Option<&StagedFile> {
        self.staged.as_deref()
    }

    /// Last error shown to the user
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Surface an error from outside the storage flow (e.g., an unreadable pick)
    pub fn report(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    /// Session of the modal open now. Pass it back to `stage_upload`.
    pub fn upload_session(&self) -> UploadSession {
        UploadSession(self.session)
    }

    /// Whether an upload or delete is in flight
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Label of the active modal's primary button
    pub fn primary_label(&self) -> Option<&'static str> {
        match self.modal {
            Modal::Upload => Some("Upload"),
            Modal::Edit { .. } => Some("Update"),
            Modal::ConfirmDelete { .. } => Some("Confirm"),
            Modal::Closed | Modal::Zoom { .. } => None,
        }
    }

    /// Whether the primary action of the active modal can run now
    pub fn can_commit(&self) -> bool {
        if self.pending.is_some() {
            return false;
        }
        match self.modal {
            Modal::Upload | Modal::Edit { .. } => self.staged.is_some(),
            Modal::ConfirmDelete { .. } => true,
            Modal::Closed | Modal::Zoom { .. } => false,
        }
    }

    // ========== Refresh ==========

    /// Start a list refresh. Pass the token back to `apply_refresh`.
    pub fn begin_refresh(&mut self) -> RefreshToken {
        self.last_issued += 1;
        RefreshToken(self.last_issued)
    }

    /// Replace the entries with a refresh result.
    ///
    /// Results older than the last applied refresh are discarded. On error
    /// the current entries stay as they are. Returns whether the entries
    /// were replaced.
    pub fn apply_refresh(
        &mut self,
        token: RefreshToken,
        result: Result<Vec<ImageEntry>, String>,
    ) -> bool {
        if token.0 <= self.last_applied {
            tracing::debug!(
                token = token.0,
                applied = self.last_applied,
                "Discarding stale refresh"
            );
            return false;
        }

        match result {
            Ok(mut entries) => {
                sort_newest_first(&mut entries);
                self.entries = entries;
                self.last_applied = token.0;

                // Zoom refers to a position that may no longer exist
                if let Modal::Zoom { index } = self.modal {
                    if index >= self.entries.len() {
                        self.modal = Modal::Closed;
                    }
                }

                tracing::debug!(count = self.entries.len(), "Gallery refreshed");
                true
            }
            Err(error) => {
                tracing::error!("Error listing images: {error}");
                self.notice = Some(format!("Could not load images: {error}"));
                false
            }
        }
    }

    // ========== Modals ==========

    pub fn open_zoom(&mut self, index: usize) -> bool {
        if index >= self.entries.len() {
            return false;
        }
        self.set_modal(Modal::Zoom { index });
        true
    }

    pub fn open_upload(&mut self) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.set_modal(Modal::Upload);
        true
    }

    pub fn open_edit(&mut self, target: ImageEntry) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.set_modal(Modal::Edit { target });
        true
    }

    /// Close whatever modal is open. In-flight requests are not cancelled.
    pub fn close_modal(&mut self) {
        self.set_modal(Modal::Closed);
    }

    /// Switch modals, releasing the staged file when leaving an upload flow.
    /// Every switch starts a new session, so picks made earlier go stale.
    fn set_modal(&mut self, modal: Modal) {
        if self.modal.accepts_file() {
            self.staged = None;
        }
        self.modal = modal;
        self.session += 1;
    }

    // ========== Upload / Edit ==========

    /// Stage a picked file. Replaces (and releases) any previously staged
    /// file. Ignored unless the upload or edit modal that asked for it is
    /// still open and idle.
    pub fn stage_upload(&mut self, session: UploadSession, file: Arc<StagedFile>) -> bool {
        if !self.modal.accepts_file() || session.0 != self.session {
            tracing::debug!(file = %file.name, "Dropping file picked for another modal");
            return false;
        }
        if self.pending.is_some() {
            tracing::debug!(file = %file.name, "Dropping file picked during an upload");
            return false;
        }
        self.staged = Some(file);
        true
    }

    /// Build the upload for the staged file.
    ///
    /// Editing reuses the target's key (overwrite in place); a new upload
    /// gets a fresh random key distinct from every known entry.
    pub fn commit_upload(&mut self) -> Option<UploadRequest> {
        if self.pending.is_some() {
            return None;
        }
        let file = self.staged.clone()?;

        let (handle, replaces_existing) = match &self.modal {
            Modal::Edit { target } => (target.handle.clone(), true),
            Modal::Upload => (self.fresh_handle(), false),
            _ => return None,
        };

        self.pending = Some(Pending::Upload);
        tracing::info!(key = %handle, replaces_existing, "Uploading {}", file.name);

        Some(UploadRequest {
            handle,
            file,
            replaces_existing,
        })
    }

    /// Record the outcome of an upload. Returns true when the caller should
    /// refresh the list.
    pub fn upload_finished(&mut self, result: Result<(), String>) -> bool {
        if self.pending != Some(Pending::Upload) {
            tracing::warn!("Upload result arrived with no upload in flight");
        }
        self.pending = None;

        match result {
            Ok(()) => {
                if self.modal.accepts_file() {
                    self.set_modal(Modal::Closed);
                }
                true
            }
            Err(error) => {
                tracing::error!("Error uploading image: {error}");
                self.notice = Some(format!("Upload failed: {error}"));
                false
            }
        }
    }

    fn fresh_handle(&self) -> ObjectHandle {
        loop {
            let handle = ObjectHandle::fresh(&self.prefix);
            if !self.entries.iter().any(|e| e.handle == handle) {
                return handle;
            }
        }
    }

    // ========== Delete ==========

    /// Ask for confirmation before deleting the entry at `index`.
    /// The entry's handle is captured now, so a later refresh cannot
    /// redirect the delete to another object.
    pub fn request_delete(&mut self, index: usize) -> bool {
        if self.pending.is_some() {
            return false;
        }
        let Some(entry) = self.entries.get(index) else {
            return false;
        };
        let handle = entry.handle.clone();
        self.set_modal(Modal::ConfirmDelete { handle });
        true
    }

    /// Handle to delete, if the confirmation modal is open and idle
    pub fn confirm_delete(&mut self) -> Option<ObjectHandle> {
        if self.pending.is_some() {
            return None;
        }
        let Modal::ConfirmDelete { handle, .. } = &self.modal else {
            return None;
        };
        let handle = handle.clone();

        self.pending = Some(Pending::Delete);
        tracing::info!(key = %handle, "Deleting image");
        Some(handle)
    }

    /// Record the outcome of a delete. Returns true when the caller should
    /// refresh the list.
    pub fn delete_finished(&mut self, result: Result<(), String>) -> bool {
        if self.pending != Some(Pending::Delete) {
            tracing::warn!("Delete result arrived with no delete in flight");
        }
        self.pending = None;

        match result {
            Ok(()) => {
                if matches!(self.modal, Modal::ConfirmDelete { .. }) {
                    self.set_modal(Modal::Closed);
                }
                true
            }
            Err(error) => {
                tracing::error!("Error deleting image: {error}");
                self.notice = Some(format!("Delete failed: {error}"));
                false
            }
        }
    }
}

/// Newest first. Stable, so equal timestamps keep the listing order.
pub fn sort_newest_first(entries: &mut [ImageEntry]) {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
