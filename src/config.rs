use std::path::PathBuf;
use thiserror::Error;

/// Application directory name under the platform data/cache directories
const APP_DIR: &str = "cloud-gallery";
const DEFAULT_PREFIX: &str = "images";
const DEFAULT_PREVIEW_SIZE: u32 = 640;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the user {0} directory")]
    MissingDir(&'static str),
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Root of the local bucket (objects + catalog)
    pub bucket_dir: PathBuf,
    /// Prefix ("folder") the gallery lists and uploads into
    pub prefix: String,
    /// Where upload previews are rendered
    pub preview_dir: PathBuf,
    /// Longest side of an upload preview in pixels
    pub preview_size: u32,
}

impl Config {
    /// Defaults from the platform directories:
    /// - Linux: ~/.local/share/cloud-gallery/bucket and ~/.cache/cloud-gallery/previews
    /// - macOS: ~/Library/Application Support/cloud-gallery/bucket and ~/Library/Caches/cloud-gallery/previews
    /// - Windows: %APPDATA%\cloud-gallery\bucket and %LOCALAPPDATA%\cloud-gallery\previews
    pub fn defaults() -> Result<Self, ConfigError> {
        let data = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or(ConfigError::MissingDir("data"))?;
        let cache = dirs::cache_dir()
            .or_else(dirs::home_dir)
            .ok_or(ConfigError::MissingDir("cache"))?;

        Ok(Self {
            bucket_dir: data.join(APP_DIR).join("bucket"),
            prefix: DEFAULT_PREFIX.to_string(),
            preview_dir: cache.join(APP_DIR).join("previews"),
            preview_size: DEFAULT_PREVIEW_SIZE,
        })
    }

    /// Defaults overridden by `GALLERY_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::defaults()?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = var("GALLERY_BUCKET_DIR") {
            self.bucket_dir = PathBuf::from(dir);
        }
        if let Some(prefix) = var("GALLERY_PREFIX") {
            self.prefix = prefix.trim_matches('/').to_string();
        }
        if let Some(dir) = var("GALLERY_PREVIEW_DIR") {
            self.preview_dir = PathBuf::from(dir);
        }
        if let Some(size) = var("GALLERY_PREVIEW_SIZE") {
            match size.parse::<u32>() {
                Ok(size) if size > 0 => self.preview_size = size,
                _ => tracing::warn!("Ignoring invalid GALLERY_PREVIEW_SIZE {size:?}"),
            }
        }
    }
}
