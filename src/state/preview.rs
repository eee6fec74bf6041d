/// Upload previews
///
/// Picking a file reads its bytes, checks that they decode as an image and
/// writes a downscaled copy into the preview cache. The copy is owned by a
/// `PreviewHandle` and removed from disk when the handle is dropped, i.e.
/// when the upload modal closes or another file replaces the staged one.

use image::GenericImageView;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::data::StagedFile;

/// Extensions offered by the file picker
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "tiff"];

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a supported image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("preview task failed: {0}")]
    Task(String),
}

/// A preview image on disk, deleted when dropped
#[derive(Debug)]
pub struct PreviewHandle {
    path: PathBuf,
}

impl PreviewHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Released preview {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to release preview {}: {e}", self.path.display()),
        }
    }
}

/// Read `source` and render its preview into `preview_dir`.
/// Runs on the blocking pool because decoding is CPU-bound.
pub async fn stage_file(
    source: PathBuf,
    preview_dir: PathBuf,
    preview_size: u32,
) -> Result<StagedFile, PreviewError> {
    tokio::task::spawn_blocking(move || stage_file_blocking(&source, &preview_dir, preview_size))
        .await
        .map_err(|e| PreviewError::Task(format!("Task join error: {e}")))?
}

fn stage_file_blocking(
    source: &Path,
    preview_dir: &Path,
    preview_size: u32,
) -> Result<StagedFile, PreviewError> {
    let content = fs::read(source)?;
    let preview = render_preview(&content, preview_dir, preview_size)?;

    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    tracing::info!(file = %name, bytes = content.len(), "Staged file for upload");

    Ok(StagedFile {
        name,
        content,
        preview: Some(preview),
    })
}

/// Decode `content` and save a thumbnail no larger than `size` on either side
pub fn render_preview(
    content: &[u8],
    preview_dir: &Path,
    size: u32,
) -> Result<PreviewHandle, PreviewError> {
    let img = image::load_from_memory(content)?;
    let (width, height) = img.dimensions();

    // Only shrink; small images are kept as they are
    let preview = if width > size || height > size {
        img.thumbnail(size, size)
    } else {
        img
    };

    fs::create_dir_all(preview_dir)?;
    let path = preview_dir.join(format!("{}.png", uuid::Uuid::new_v4()));
    preview.save(&path)?;

    tracing::debug!("Generated preview: {}", path.display());
    Ok(PreviewHandle { path })
}
