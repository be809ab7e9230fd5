#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureError {
    #[error("Invalid FAST arc length: {0} (must be 1-16)")]
    InvalidArcLength(u8),
    #[error("Invalid threshold: {0} (must be 1-127)")]
    InvalidThreshold(u8),
    #[error("Invalid descriptor window: {0} (must be a positive multiple of 4)")]
    InvalidWindow(u32),
    #[error("Invalid good distance: {0} (must be finite and > 0)")]
    InvalidGoodDistance(f32),
    #[error("Invalid good matches limit: {0} (must be >= 1)")]
    InvalidMatchLimit(usize),
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

pub type FeatureResult<T> = Result<T, FeatureError>;
