use std::path::PathBuf;

use card_core::ConfigError;
use card_detect::DetectError;
use card_features::FeatureError;

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
    #[error("No .jpg, .png or .tif files in {0}")]
    NoImages(PathBuf),
    #[error("File index {index} out of range ({count} image(s) found)")]
    FileIndexOutOfRange { index: usize, count: usize },
    #[error("Cannot load {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid detector setup: {0}")]
    Detector(#[from] DetectError),
    #[error("Invalid matcher setup: {0}")]
    Matcher(#[from] FeatureError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BatchError {
    /// Errors caused by the input location rather than by processing
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            BatchError::PathNotFound(_) | BatchError::NoImages(_) | BatchError::FileIndexOutOfRange { .. }
        )
    }
}

pub type BatchResult<T> = Result<T, BatchError>;
