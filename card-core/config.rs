#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors raised while building or loading a configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid card size range: min {min}, max {max} (need 0 < min <= max)")]
    InvalidCardSizes { min: u32, max: u32 },
    #[error("Invalid good distance {0} (must be finite and > 0)")]
    InvalidGoodDistance(f32),
    #[error("Invalid good matches limit {0} (must be >= 1)")]
    InvalidMatchLimit(usize),
    #[error("Invalid working resolution {0} (must be >= 32)")]
    InvalidWorkingResolution(u32),
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Config I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "serde")]
    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[cfg(feature = "serde")]
    #[error("Invalid TOML config: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[cfg(feature = "serde")]
    #[error("Cannot encode TOML config: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Default cap on the larger image side before card localization
pub const DEFAULT_WORKING_RESOLUTION: u32 = 700;

/// Parameters threaded through the whole card pipeline
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// Smallest expected card diameter in working-resolution pixels
    pub min_card_size: u32,
    /// Largest expected card diameter in working-resolution pixels
    pub max_card_size: u32,
    /// Descriptor distance below which a pair counts as a good match
    pub good_distance: f32,
    /// Good pairs needed before two symbols are declared identical
    pub good_matches_min_limit: usize,
    /// Enables debug rendering of intermediate results
    pub verbose: bool,
    /// Larger image side is downscaled to at most this many pixels
    pub working_resolution: u32,
    pub n_threads: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_card_size: 100,
            max_card_size: 400,
            good_distance: 0.25,
            good_matches_min_limit: 10,
            verbose: false,
            working_resolution: DEFAULT_WORKING_RESOLUTION,
            n_threads: num_cpus::get().max(1),
        }
    }
}

impl PipelineConfig {
    pub fn new(min_card_size: u32, max_card_size: u32) -> Self {
        Self {
            min_card_size,
            max_card_size,
            ..Self::default()
        }
    }

    /// Canonical side length every located card is rescaled to
    pub fn uniform_dim(&self) -> u32 {
        ((self.min_card_size as u64 + self.max_card_size as u64) / 2) as u32
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_good_distance(mut self, good_distance: f32) -> Self {
        self.good_distance = good_distance;
        self
    }

    pub fn with_good_matches_min_limit(mut self, limit: usize) -> Self {
        self.good_matches_min_limit = limit;
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> ConfigResult<()> {
        if self.min_card_size == 0 || self.min_card_size > self.max_card_size {
            return Err(ConfigError::InvalidCardSizes {
                min: self.min_card_size,
                max: self.max_card_size,
            });
        }
        if !self.good_distance.is_finite() || self.good_distance <= 0.0 {
            return Err(ConfigError::InvalidGoodDistance(self.good_distance));
        }
        if self.good_matches_min_limit == 0 {
            return Err(ConfigError::InvalidMatchLimit(self.good_matches_min_limit));
        }
        if self.working_resolution < 32 {
            return Err(ConfigError::InvalidWorkingResolution(self.working_resolution));
        }
        if self.n_threads == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "n_threads",
                reason: "must be >= 1".to_string(),
            });
        }
        Ok(())
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "PipelineConfig: cards {}..{} px (uniform {}), good distance {:.3}, min good matches {}, working resolution {}, threads {}, verbose {}",
            self.min_card_size,
            self.max_card_size,
            self.uniform_dim(),
            self.good_distance,
            self.good_matches_min_limit,
            self.working_resolution,
            self.n_threads,
            self.verbose
        )
    }

    /// Serialize to JSON string
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON string
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML string
    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Deserialize from TOML string
    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> ConfigResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> ConfigResult<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load a `.json` or `.toml` file, picking the format from the extension
    #[cfg(feature = "serde")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::load_json(path),
            _ => Self::load_toml(path),
        }
    }
}
