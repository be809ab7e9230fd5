use crate::error::{DetectError, DetectResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tuning for circular card localization
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LocatorConfig {
    /// Canny hysteresis thresholds for the edge map that votes
    pub canny_low: f32,
    pub canny_high: f32,
    /// Gaussian sigma applied to the center accumulator
    pub accum_sigma: f32,
    /// Accumulator peaks below this fraction of the strongest peak are ignored
    pub min_vote_frac: f32,
    /// Fraction of the rim that must carry edge pixels to accept a circle
    pub min_rim_coverage: f32,
    /// Maximum number of accumulator peaks verified per image
    pub max_candidates: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            accum_sigma: 2.0,
            min_vote_frac: 0.3,
            min_rim_coverage: 0.6,
            max_candidates: 64,
        }
    }
}

impl LocatorConfig {
    pub fn validate(&self) -> DetectResult<()> {
        validate_edge_thresholds(self.canny_low, self.canny_high)?;
        if !(self.accum_sigma > 0.0) {
            return Err(invalid("accum_sigma", "must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.min_vote_frac) {
            return Err(invalid("min_vote_frac", "must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.min_rim_coverage) {
            return Err(invalid("min_rim_coverage", "must be within [0, 1]"));
        }
        if self.max_candidates == 0 {
            return Err(invalid("max_candidates", "must be >= 1"));
        }
        Ok(())
    }
}

/// Tuning for per-card symbol segmentation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SegmenterConfig {
    pub canny_low: f32,
    pub canny_high: f32,
    /// Radius of the cross-shaped closing element (1 = 3x3)
    pub closing_radius: u8,
    /// Noise floor on bounding-rectangle area (exclusive)
    pub min_area: i64,
    /// Region-of-interest radius as a fraction of the card width
    pub roi_factor: f32,
    /// Area ceiling as a fraction of `width * height` (0.25·π by default)
    pub max_area_factor: f32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            canny_low: 40.0,
            canny_high: 120.0,
            closing_radius: 1,
            min_area: 30,
            roi_factor: 0.45,
            max_area_factor: 0.25 * std::f32::consts::PI,
        }
    }
}

impl SegmenterConfig {
    pub fn validate(&self) -> DetectResult<()> {
        validate_edge_thresholds(self.canny_low, self.canny_high)?;
        if self.min_area < 0 {
            return Err(invalid("min_area", "must be >= 0"));
        }
        if !(self.roi_factor > 0.0 && self.roi_factor <= 1.0) {
            return Err(invalid("roi_factor", "must be within (0, 1]"));
        }
        if !(self.max_area_factor > 0.0) {
            return Err(invalid("max_area_factor", "must be > 0"));
        }
        Ok(())
    }
}

fn validate_edge_thresholds(low: f32, high: f32) -> DetectResult<()> {
    if !(low >= 0.0 && low <= high) {
        return Err(DetectError::InvalidEdgeThresholds { low, high });
    }
    Ok(())
}

fn invalid(name: &'static str, reason: &str) -> DetectError {
    DetectError::InvalidParameter {
        name,
        reason: reason.to_string(),
    }
}
