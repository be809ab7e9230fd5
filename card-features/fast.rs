use card_core::Keypoint;
use image::GrayImage;
use rayon::prelude::*;

use crate::error::{FeatureError, FeatureResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Bresenham circle of radius 3 around the candidate pixel
const CIRCLE: [(i32, i32); 16] = [
    (-3, 0), (-3, 1), (-2, 2), (-1, 3),
    (0, 3), (1, 3), (2, 2), (3, 1),
    (3, 0), (3, -1), (2, -2), (1, -3),
    (0, -3), (-1, -3), (-2, -2), (-3, -1),
];

const BORDER: u32 = 3;

/// FAST segment-test parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FastConfig {
    /// Minimum intensity difference between the center and an arc pixel
    pub threshold: u8,
    /// Contiguous arc length required on the 16-pixel circle (FAST-N)
    pub arc_length: u8,
    /// Keypoints closer than this to a stronger one are dropped
    pub nms_distance: f32,
}

impl Default for FastConfig {
    fn default() -> Self {
        Self {
            threshold: 20,
            arc_length: 9,
            nms_distance: 3.0,
        }
    }
}

impl FastConfig {
    pub fn validate(&self) -> FeatureResult<()> {
        if self.threshold == 0 || self.threshold > 127 {
            return Err(FeatureError::InvalidThreshold(self.threshold));
        }
        if self.arc_length == 0 || self.arc_length > 16 {
            return Err(FeatureError::InvalidArcLength(self.arc_length));
        }
        if !(self.nms_distance >= 0.0) {
            return Err(FeatureError::InvalidParameter {
                name: "nms_distance",
                reason: "must be >= 0".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FastDetector {
    cfg: FastConfig,
}

impl FastDetector {
    pub fn new(cfg: FastConfig) -> FeatureResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &FastConfig {
        &self.cfg
    }

    /// Corners after non-maximum suppression, strongest first
    pub fn detect(&self, img: &GrayImage) -> Vec<Keypoint> {
        let scored = self.detect_with_response(img);
        non_maximum_suppression(scored, self.cfg.nms_distance)
    }

    /// Every pixel passing the segment test, in row-major order
    pub fn detect_with_response(&self, img: &GrayImage) -> Vec<Keypoint> {
        let (w, h) = img.dimensions();
        if w <= 2 * BORDER || h <= 2 * BORDER {
            return Vec::new();
        }

        let t = self.cfg.threshold as i16;
        let n = self.cfg.arc_length as u32;
        (BORDER..h - BORDER)
            .into_par_iter()
            .flat_map_iter(|y| {
                let mut row = Vec::new();
                for x in BORDER..w - BORDER {
                    let p = img.get_pixel(x, y)[0] as i16;
                    let mut bright = 0u16;
                    let mut dark = 0u16;
                    let mut bright_sum = 0i32;
                    let mut dark_sum = 0i32;

                    for (i, &(dx, dy)) in CIRCLE.iter().enumerate() {
                        let q = img.get_pixel((x as i32 + dx) as u32, (y as i32 + dy) as u32)[0] as i16;
                        if q >= p + t {
                            bright |= 1 << i;
                            bright_sum += (q - p) as i32;
                        } else if q <= p - t {
                            dark |= 1 << i;
                            dark_sum += (p - q) as i32;
                        }
                    }

                    let response = if has_consecutive_bits(bright, n) {
                        bright_sum as f32 / bright.count_ones() as f32
                    } else if has_consecutive_bits(dark, n) {
                        dark_sum as f32 / dark.count_ones() as f32
                    } else {
                        continue;
                    };

                    row.push(Keypoint {
                        response,
                        ..Keypoint::new(x as f32, y as f32)
                    });
                }
                row
            })
            .collect()
    }
}

/// True when the circular 16-bit `mask` holds a run of at least `n` set bits
pub fn has_consecutive_bits(mask: u16, n: u32) -> bool {
    if n == 0 || n > 16 {
        return false;
    }
    let mut run = mask;
    for i in 1..n {
        run &= mask.rotate_left(i);
        if run == 0 {
            return false;
        }
    }
    run != 0
}

/// Keep the strongest keypoints at least `min_distance` apart. Ties keep
/// input order.
pub fn non_maximum_suppression(mut keypoints: Vec<Keypoint>, min_distance: f32) -> Vec<Keypoint> {
    keypoints.sort_by(|a, b| b.response.total_cmp(&a.response));

    let min_distance_sq = min_distance * min_distance;
    let mut kept: Vec<Keypoint> = Vec::new();
    for candidate in keypoints {
        let too_close = kept.iter().any(|k| {
            let dx = candidate.x - k.x;
            let dy = candidate.y - k.y;
            dx * dx + dy * dy < min_distance_sq
        });
        if !too_close {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn create_square_image(size: u32, lo: u32, hi: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            if (lo..hi).contains(&x) && (lo..hi).contains(&y) {
                Luma([230])
            } else {
                Luma([40])
            }
        })
    }

    fn create_detector() -> FastDetector {
        FastDetector::new(FastConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config() {
        let cfg = FastConfig { threshold: 0, ..FastConfig::default() };
        assert_eq!(FastDetector::new(cfg).unwrap_err(), FeatureError::InvalidThreshold(0));

        let cfg = FastConfig { arc_length: 17, ..FastConfig::default() };
        assert_eq!(FastDetector::new(cfg).unwrap_err(), FeatureError::InvalidArcLength(17));
    }

    #[test]
    fn test_uniform_image_has_no_corners() {
        let img = GrayImage::from_pixel(40, 40, Luma([128]));
        assert!(create_detector().detect(&img).is_empty());
    }

    #[test]
    fn test_tiny_image() {
        let img = GrayImage::from_pixel(6, 6, Luma([128]));
        assert!(create_detector().detect(&img).is_empty());
    }

    #[test]
    fn test_square_corners_detected() {
        let img = create_square_image(40, 12, 28);
        let keypoints = create_detector().detect(&img);

        for &(cx, cy) in &[(12.0, 12.0), (27.0, 12.0), (12.0, 27.0), (27.0, 27.0)] {
            assert!(
                keypoints.iter().any(|k| (k.x - cx).abs() <= 2.0 && (k.y - cy).abs() <= 2.0),
                "missing corner near ({}, {})",
                cx,
                cy
            );
        }
        // Straight edges are not corners
        assert!(!keypoints.iter().any(|k| (k.x - 20.0).abs() < 1.0 && (k.y - 12.0).abs() < 1.0));
        assert!(keypoints.iter().all(|k| k.response > 0.0 && k.response.is_finite()));
    }

    #[test]
    fn test_nms_keeps_distance() {
        let img = create_square_image(60, 20, 40);
        let detector = create_detector();
        let raw = detector.detect_with_response(&img);
        let kept = non_maximum_suppression(raw.clone(), 5.0);

        assert!(kept.len() <= raw.len());
        for i in 0..kept.len() {
            for j in (i + 1)..kept.len() {
                let dx = kept[i].x - kept[j].x;
                let dy = kept[i].y - kept[j].y;
                assert!((dx * dx + dy * dy).sqrt() >= 5.0);
            }
        }
    }

    #[test]
    fn test_detection_is_deterministic() {
        let img = create_square_image(64, 10, 50);
        let detector = create_detector();
        let first = detector.detect(&img);
        for _ in 0..5 {
            assert_eq!(detector.detect(&img), first);
        }
    }

    #[test]
    fn test_consecutive_bits() {
        assert!(has_consecutive_bits(0b0000_0001_1111_1111, 9));
        assert!(!has_consecutive_bits(0b0000_0001_1111_1111, 10));
        // Run wrapping from bit 12 through bit 4
        assert!(has_consecutive_bits(0b1111_0000_0001_1111, 9));
        assert!(!has_consecutive_bits(0b0101_0101_0101_0101, 2));
        assert!(has_consecutive_bits(u16::MAX, 16));
        assert!(!has_consecutive_bits(u16::MAX, 0));
    }
}
