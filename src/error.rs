use thiserror::Error;

use crate::config::ConfigError;
use crate::storage::StorageError;

/// Errors that stop the application before or while the window runs
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to open bucket: {0}")]
    Storage(#[from] StorageError),

    #[error("UI error: {0}")]
    Ui(#[from] iced::Error),
}
