use card_core::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid card size range: min {min}, max {max} (need 0 < min <= max)")]
    InvalidCardSizes { min: u32, max: u32 },
    #[error("Invalid target dimension {0} (must be > 0)")]
    InvalidTargetDim(u32),
    #[error("Invalid edge thresholds: low {low}, high {high} (need 0 <= low <= high)")]
    InvalidEdgeThresholds { low: f32, high: f32 },
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

pub type DetectResult<T> = Result<T, DetectError>;
