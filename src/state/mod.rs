/// State management module
///
/// This module handles all gallery state, including:
/// - Shared data structures (data.rs)
/// - The gallery controller: entries, modals, refresh sequencing (gallery.rs)
/// - Upload previews and their release (preview.rs)

pub mod data;
pub mod gallery;
pub mod preview;
