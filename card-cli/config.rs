use std::path::Path;
use std::time::Duration;

use card_core::{ConfigError, PipelineConfig};
use card_detect::{LocatorConfig, SegmenterConfig};
use card_features::MatcherConfig;
use serde::{Deserialize, Serialize};

/// When the comparison loop stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    /// Stop at the first matching card pair of the batch
    #[default]
    FirstMatch,
    /// Visit every card pair and report every matching one
    Exhaustive,
}

/// Which card pairs are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairScope {
    /// Every unordered pair `(i, j)` with `i < j`
    #[default]
    AllPairs,
    /// Only neighbours `(i, i + 1)` in card order
    Adjacent,
}

/// Which cards form one comparison batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchScope {
    /// Cards of each image are compared among themselves
    #[default]
    PerImage,
    /// Cards of all selected images are pooled into one batch
    AcrossImages,
}

/// Which files of the directory listing are processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSelection {
    #[default]
    All,
    /// One file by its position in the sorted listing
    Single(usize),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub stop_policy: StopPolicy,
    pub pair_scope: PairScope,
    pub batch_scope: BatchScope,
    pub file_selection: FileSelection,
    /// Compare card pairs on the rayon pool
    pub parallel: bool,
    /// Wall-clock budget per comparison batch, in seconds
    pub deadline_secs: Option<f64>,
    /// Directory for debug overlays, written only when verbose
    pub debug_dir: Option<std::path::PathBuf>,
}

impl OrchestratorConfig {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs_f64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(secs) = self.deadline_secs {
            if !secs.is_finite() || secs < 0.0 {
                return Err(ConfigError::InvalidParameter {
                    name: "deadline_secs",
                    reason: format!("must be finite and >= 0, got {}", secs),
                });
            }
        }
        Ok(())
    }
}

/// Everything one `cardmatch` run needs, loadable from TOML or JSON
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub pipeline: PipelineConfig,
    pub locator: LocatorConfig,
    pub segmenter: SegmenterConfig,
    /// Feature tuning; the decision thresholds come from `pipeline`
    pub matcher: MatcherConfig,
    pub orchestrator: OrchestratorConfig,
}

impl RunConfig {
    /// Matcher tuning with `pipeline`'s good distance and match limit applied
    pub fn matcher_config(&self) -> MatcherConfig {
        MatcherConfig {
            good_distance: self.pipeline.good_distance,
            good_matches_min_limit: self.pipeline.good_matches_min_limit,
            ..self.matcher.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()?;
        self.orchestrator.validate()
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load a `.json` or `.toml` file, picking the format from the extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json(&content),
            _ => Self::from_toml(&content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = RunConfig::from_toml(
            r#"
            [pipeline]
            min_card_size = 120
            max_card_size = 220

            [orchestrator]
            stop_policy = "exhaustive"
            pair_scope = "adjacent"
            file_selection = { single = 3 }
            deadline_secs = 2.5
            "#,
        )
        .unwrap();

        assert_eq!(cfg.pipeline.uniform_dim(), 170);
        assert_eq!(cfg.pipeline.good_matches_min_limit, 10);
        assert_eq!(cfg.orchestrator.stop_policy, StopPolicy::Exhaustive);
        assert_eq!(cfg.orchestrator.pair_scope, PairScope::Adjacent);
        assert_eq!(cfg.orchestrator.batch_scope, BatchScope::PerImage);
        assert_eq!(cfg.orchestrator.file_selection, FileSelection::Single(3));
        assert_eq!(cfg.orchestrator.deadline(), Some(Duration::from_millis(2500)));
        assert_eq!(cfg.segmenter, SegmenterConfig::default());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut cfg = RunConfig::default();
        cfg.orchestrator.batch_scope = BatchScope::AcrossImages;
        cfg.orchestrator.parallel = true;
        let text = cfg.to_toml().unwrap();
        assert_eq!(RunConfig::from_toml(&text).unwrap(), cfg);
    }

    #[test]
    fn test_json_config() {
        let cfg = RunConfig::from_json(r#"{"pipeline": {"good_distance": 0.2}, "orchestrator": {"parallel": true}}"#)
            .unwrap();
        assert_eq!(cfg.pipeline.good_distance, 0.2);
        assert!(cfg.orchestrator.parallel);
    }

    #[test]
    fn test_matcher_thresholds_follow_pipeline() {
        let mut cfg = RunConfig::default();
        cfg.pipeline.good_distance = 0.4;
        cfg.pipeline.good_matches_min_limit = 4;
        cfg.matcher.good_distance = 0.1;
        let matcher = cfg.matcher_config();
        assert_eq!(matcher.good_distance, 0.4);
        assert_eq!(matcher.good_matches_min_limit, 4);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(RunConfig::from_toml("[pipeline]\nmin_card_size = 0").is_err());
        assert!(RunConfig::from_toml("[orchestrator]\ndeadline_secs = -1.0").is_err());
    }
}
