use card_core::resample::resize_bilinear;
use image::GrayImage;

use crate::error::{FeatureError, FeatureResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PyramidConfig {
    /// Size ratio between consecutive levels
    pub scale_factor: f32,
    /// Levels whose shorter side would drop below this are not built
    pub min_size: u32,
    pub max_levels: usize,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            scale_factor: 1.2,
            min_size: 24,
            max_levels: 4,
        }
    }
}

impl PyramidConfig {
    pub fn validate(&self) -> FeatureResult<()> {
        if !(self.scale_factor > 1.0) || !self.scale_factor.is_finite() {
            return Err(FeatureError::InvalidParameter {
                name: "scale_factor",
                reason: "must be finite and > 1".to_string(),
            });
        }
        if self.max_levels == 0 {
            return Err(FeatureError::InvalidParameter {
                name: "max_levels",
                reason: "must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

/// One pyramid level; `scale` maps level coordinates back to the base image
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    pub level: usize,
    pub scale: f32,
    pub image: GrayImage,
}

/// Build the pyramid for `img`. Level 0 is the image itself, even when it is
/// smaller than `min_size`.
pub fn build_pyramid(img: &GrayImage, cfg: &PyramidConfig) -> Vec<PyramidLevel> {
    let (width, height) = img.dimensions();
    let mut levels = vec![PyramidLevel {
        level: 0,
        scale: 1.0,
        image: img.clone(),
    }];

    let mut scale = cfg.scale_factor;
    while levels.len() < cfg.max_levels {
        let w = (width as f32 / scale).round() as u32;
        let h = (height as f32 / scale).round() as u32;
        if w < cfg.min_size || h < cfg.min_size {
            break;
        }
        levels.push(PyramidLevel {
            level: levels.len(),
            scale,
            image: resize_bilinear(img, w, h),
        });
        scale *= cfg.scale_factor;
    }
    levels
}
