//! Rotation-aligned gradient descriptor.
//!
//! A `window x window` grid of samples is laid over the keypoint, rotated by
//! its orientation and split into 4x4 cells. Each cell sums the Gaussian
//! weighted gradient responses `dx`, `dy`, `|dx|`, `|dy|` (measured along the
//! rotated axes), giving 64 values which are then L2-normalised.

use card_core::resample::bilinear_sample;
use card_core::{DESCRIPTOR_LEN, Descriptor, Keypoint};
use image::GrayImage;

use crate::error::{FeatureError, FeatureResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const CELLS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DescriptorConfig {
    /// Samples per side of the grid; one sample per pixel
    pub window: u32,
    /// Gaussian weighting sigma in samples
    pub sigma: f32,
    /// Radius of the patch used for orientation
    pub orientation_radius: i32,
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self {
            window: 20,
            sigma: 5.0,
            orientation_radius: 7,
        }
    }
}

impl DescriptorConfig {
    pub fn validate(&self) -> FeatureResult<()> {
        if self.window == 0 || self.window % CELLS as u32 != 0 {
            return Err(FeatureError::InvalidWindow(self.window));
        }
        if !(self.sigma > 0.0) {
            return Err(FeatureError::InvalidParameter {
                name: "sigma",
                reason: "must be > 0".to_string(),
            });
        }
        if self.orientation_radius < 1 {
            return Err(FeatureError::InvalidParameter {
                name: "orientation_radius",
                reason: "must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DescriptorExtractor {
    cfg: DescriptorConfig,
    /// Gaussian weight per grid sample, row-major
    weights: Vec<f32>,
}

impl DescriptorExtractor {
    pub fn new(cfg: DescriptorConfig) -> FeatureResult<Self> {
        cfg.validate()?;
        let n = cfg.window as usize;
        let half = (cfg.window as f32 - 1.0) * 0.5;
        let denom = 2.0 * cfg.sigma * cfg.sigma;
        let weights = (0..n * n)
            .map(|i| {
                let u = (i % n) as f32 - half;
                let v = (i / n) as f32 - half;
                (-(u * u + v * v) / denom).exp()
            })
            .collect();
        Ok(Self { cfg, weights })
    }

    pub fn config(&self) -> &DescriptorConfig {
        &self.cfg
    }

    /// Descriptor for `kp` on `img`, or `None` when the neighbourhood is flat
    pub fn compute(&self, img: &GrayImage, kp: &Keypoint) -> Option<Descriptor> {
        let n = self.cfg.window as usize;
        let cell = n / CELLS;
        let half = (self.cfg.window as f32 - 1.0) * 0.5;
        let (s, c) = kp.angle.sin_cos();

        let mut desc: Descriptor = [0.0; DESCRIPTOR_LEN];
        for j in 0..n {
            let v = j as f32 - half;
            for i in 0..n {
                let u = i as f32 - half;
                let x = kp.x + c * u - s * v;
                let y = kp.y + s * u + c * v;

                // Central differences along the rotated axes
                let dx = bilinear_sample(img, x + c, y + s) - bilinear_sample(img, x - c, y - s);
                let dy = bilinear_sample(img, x - s, y + c) - bilinear_sample(img, x + s, y - c);

                let w = self.weights[j * n + i];
                let base = ((j / cell) * CELLS + i / cell) * 4;
                desc[base] += w * dx;
                desc[base + 1] += w * dy;
                desc[base + 2] += w * dx.abs();
                desc[base + 3] += w * dy.abs();
            }
        }

        let norm = desc.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm < 1e-6 {
            return None;
        }
        for v in desc.iter_mut() {
            *v /= norm;
        }
        Some(desc)
    }
}

/// Euclidean distance between two descriptors
pub fn descriptor_distance(a: &Descriptor, b: &Descriptor) -> f32 {
    squared_distance(a, b).sqrt()
}

#[inline]
pub(crate) fn squared_distance(a: &Descriptor, b: &Descriptor) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use image::Luma;
    use std::f32::consts::FRAC_PI_2;

    /// An L-shaped bright region, asymmetric under rotation
    fn create_l_image() -> GrayImage {
        GrayImage::from_fn(60, 60, |x, y| {
            let vertical = (24..30).contains(&x) && (20..40).contains(&y);
            let horizontal = (24..40).contains(&x) && (34..40).contains(&y);
            if vertical || horizontal {
                Luma([220])
            } else {
                Luma([30])
            }
        })
    }

    fn create_extractor() -> DescriptorExtractor {
        DescriptorExtractor::new(DescriptorConfig::default()).unwrap()
    }

    #[test]
    fn test_descriptor_is_unit_length() {
        let kp = Keypoint { angle: 0.3, ..Keypoint::new(27.0, 34.0) };
        let desc = create_extractor().compute(&create_l_image(), &kp).unwrap();
        let norm = desc.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_flat_patch_has_no_descriptor() {
        let img = GrayImage::from_pixel(40, 40, Luma([100]));
        assert!(create_extractor().compute(&img, &Keypoint::new(20.0, 20.0)).is_none());
    }

    #[test]
    fn test_rotation_covariance() {
        let img = create_l_image();
        let rotated = image::imageops::rotate90(&img);
        let extractor = create_extractor();

        let kp = Keypoint { angle: 0.4, ..Keypoint::new(27.0, 34.0) };
        // rotate90 sends (x, y) to (h - 1 - y, x) and turns directions by +90°
        let kp_rot = Keypoint {
            angle: 0.4 + FRAC_PI_2,
            ..Keypoint::new(59.0 - 34.0, 27.0)
        };

        let a = extractor.compute(&img, &kp).unwrap();
        let b = extractor.compute(&rotated, &kp_rot).unwrap();
        assert!(descriptor_distance(&a, &b) < 1e-3);
    }

    #[test]
    fn test_different_places_differ() {
        let img = create_l_image();
        let extractor = create_extractor();
        let a = extractor.compute(&img, &Keypoint::new(24.0, 20.0)).unwrap();
        let b = extractor.compute(&img, &Keypoint::new(39.0, 34.0)).unwrap();
        assert!(descriptor_distance(&a, &b) > 0.1);
    }

    #[test]
    fn test_invalid_window() {
        let cfg = DescriptorConfig { window: 18, ..DescriptorConfig::default() };
        assert_eq!(DescriptorExtractor::new(cfg).unwrap_err(), FeatureError::InvalidWindow(18));
    }
}
