use card_core::resample::pad_replicate;
use card_core::{Descriptor, Keypoint, PipelineConfig};
use image::GrayImage;
use log::debug;
use rayon::prelude::*;

use crate::descriptor::{DescriptorConfig, DescriptorExtractor};
use crate::error::{FeatureError, FeatureResult};
use crate::fast::{FastConfig, FastDetector};
use crate::index::{DescriptorIndex, DescriptorMatch};
use crate::orientation::intensity_centroid_angle;
use crate::pyramid::{PyramidConfig, build_pyramid};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MatcherConfig {
    pub fast: FastConfig,
    pub pyramid: PyramidConfig,
    pub descriptor: DescriptorConfig,
    /// Replicated border added around a symbol so corners on its enclosing
    /// rectangle clear the FAST ring
    pub border_padding: u32,
    /// Euclidean distance below which a descriptor pair is good
    pub good_distance: f32,
    /// Good pairs required for a match verdict
    pub good_matches_min_limit: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            fast: FastConfig::default(),
            pyramid: PyramidConfig::default(),
            descriptor: DescriptorConfig::default(),
            border_padding: 3,
            good_distance: 0.25,
            good_matches_min_limit: 10,
        }
    }
}

impl MatcherConfig {
    /// Default tuning with the decision thresholds taken from `pipeline`
    pub fn from_pipeline(pipeline: &PipelineConfig) -> Self {
        Self {
            good_distance: pipeline.good_distance,
            good_matches_min_limit: pipeline.good_matches_min_limit,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> FeatureResult<()> {
        if !self.good_distance.is_finite() || self.good_distance <= 0.0 {
            return Err(FeatureError::InvalidGoodDistance(self.good_distance));
        }
        if self.good_matches_min_limit == 0 {
            return Err(FeatureError::InvalidMatchLimit(self.good_matches_min_limit));
        }
        self.fast.validate()?;
        self.pyramid.validate()?;
        self.descriptor.validate()
    }
}

/// Keypoints of one symbol image with their descriptors, index-aligned
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorSet {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl DescriptorSet {
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Outcome of comparing two symbols
#[derive(Debug, Clone, PartialEq)]
pub struct MatchVerdict {
    pub is_match: bool,
    /// Candidates closer than the good distance
    pub good_matches: usize,
    /// One candidate per query keypoint, ascending by distance
    pub candidates: Vec<DescriptorMatch>,
}

impl MatchVerdict {
    pub fn no_match() -> Self {
        Self {
            is_match: false,
            good_matches: 0,
            candidates: Vec::new(),
        }
    }
}

/// Number of candidates strictly closer than `good_distance`
pub fn count_good_matches(candidates: &[DescriptorMatch], good_distance: f32) -> usize {
    candidates.iter().filter(|m| m.distance < good_distance).count()
}

#[derive(Debug, Clone)]
pub struct SymbolMatcher {
    cfg: MatcherConfig,
    fast: FastDetector,
    extractor: DescriptorExtractor,
}

impl SymbolMatcher {
    pub fn new(cfg: MatcherConfig) -> FeatureResult<Self> {
        cfg.validate()?;
        let fast = FastDetector::new(cfg.fast.clone())?;
        let extractor = DescriptorExtractor::new(cfg.descriptor.clone())?;
        Ok(Self {
            cfg,
            fast,
            extractor,
        })
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.cfg
    }

    /// Keypoints and descriptors over every pyramid level of `symbol`.
    /// Keypoint coordinates are in `symbol`'s frame; corners found in the
    /// replicated border are dropped.
    pub fn describe(&self, symbol: &GrayImage) -> DescriptorSet {
        let mut set = DescriptorSet::default();
        let pad = self.cfg.border_padding as f32;
        let (width, height) = (symbol.width() as f32, symbol.height() as f32);
        let padded = pad_replicate(symbol, self.cfg.border_padding);
        for level in build_pyramid(&padded, &self.cfg.pyramid) {
            let corners = self.fast.detect(&level.image);
            let described: Vec<(Keypoint, Descriptor)> = corners
                .par_iter()
                .filter_map(|corner| {
                    let (x, y) = (corner.x * level.scale - pad, corner.y * level.scale - pad);
                    if x < 0.0 || y < 0.0 || x >= width || y >= height {
                        return None;
                    }
                    let angle = intensity_centroid_angle(
                        &level.image,
                        corner.x,
                        corner.y,
                        self.cfg.descriptor.orientation_radius,
                    );
                    let oriented = Keypoint { angle, ..*corner };
                    let desc = self.extractor.compute(&level.image, &oriented)?;
                    let kp = Keypoint {
                        x,
                        y,
                        scale: level.scale,
                        ..oriented
                    };
                    Some((kp, desc))
                })
                .collect();

            for (kp, desc) in described {
                set.keypoints.push(kp);
                set.descriptors.push(desc);
            }
        }
        debug!(
            "Described {}x{} symbol: {} keypoints",
            symbol.width(),
            symbol.height(),
            set.len()
        );
        set
    }

    /// Query every descriptor of `desc_b` against an index built over
    /// `desc_a`. The direction matters: counts are per `desc_b` keypoint.
    pub fn match_descriptors(&self, desc_a: &DescriptorSet, desc_b: &DescriptorSet) -> MatchVerdict {
        self.match_with_threshold(desc_a, desc_b, self.cfg.good_distance)
    }

    pub fn match_with_threshold(
        &self,
        desc_a: &DescriptorSet,
        desc_b: &DescriptorSet,
        good_distance: f32,
    ) -> MatchVerdict {
        if desc_a.is_empty() || desc_b.is_empty() {
            return MatchVerdict::no_match();
        }

        let index = DescriptorIndex::build(&desc_a.descriptors);
        let mut candidates = index.query_all(&desc_b.descriptors);
        candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let good_matches = count_good_matches(&candidates, good_distance);
        MatchVerdict {
            is_match: good_matches >= self.cfg.good_matches_min_limit,
            good_matches,
            candidates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use card_core::DESCRIPTOR_LEN;
    use image::Luma;
    use proptest::prelude::*;

    /// Dark comb on a bright background: a bar with six teeth, 24 corners
    fn create_comb_image() -> GrayImage {
        GrayImage::from_fn(72, 52, |x, y| {
            let (x, y) = (x as i32 - 8, y as i32 - 10);
            let base = (0..56).contains(&x) && (22..32).contains(&y);
            let tooth = (0..56).contains(&x) && (0..22).contains(&y) && x % 10 < 6;
            if base || tooth {
                Luma([30])
            } else {
                Luma([220])
            }
        })
    }

    fn create_disk_image() -> GrayImage {
        GrayImage::from_fn(48, 48, |x, y| {
            let dx = x as f32 - 23.5;
            let dy = y as f32 - 23.5;
            if dx * dx + dy * dy <= 14.0 * 14.0 {
                Luma([30])
            } else {
                Luma([220])
            }
        })
    }

    fn create_matcher() -> SymbolMatcher {
        SymbolMatcher::new(MatcherConfig::default()).unwrap()
    }

    fn arbitrary_set(max_len: usize) -> impl Strategy<Value = DescriptorSet> {
        prop::collection::vec(prop::collection::vec(-1.0f32..1.0, DESCRIPTOR_LEN), 0..max_len).prop_map(|vs| {
            let descriptors: Vec<Descriptor> = vs
                .into_iter()
                .map(|v| {
                    let mut d = [0.0; DESCRIPTOR_LEN];
                    d.copy_from_slice(&v);
                    d
                })
                .collect();
            DescriptorSet {
                keypoints: vec![Keypoint::new(0.0, 0.0); descriptors.len()],
                descriptors,
            }
        })
    }

    #[test]
    fn test_invalid_config() {
        let cfg = MatcherConfig { good_distance: 0.0, ..MatcherConfig::default() };
        assert_eq!(SymbolMatcher::new(cfg).unwrap_err(), FeatureError::InvalidGoodDistance(0.0));

        let cfg = MatcherConfig { good_matches_min_limit: 0, ..MatcherConfig::default() };
        assert_eq!(SymbolMatcher::new(cfg).unwrap_err(), FeatureError::InvalidMatchLimit(0));
    }

    #[test]
    fn test_from_pipeline() {
        let pipeline = PipelineConfig::default()
            .with_good_distance(0.4)
            .with_good_matches_min_limit(3);
        let cfg = MatcherConfig::from_pipeline(&pipeline);
        assert_eq!(cfg.good_distance, 0.4);
        assert_eq!(cfg.good_matches_min_limit, 3);
    }

    #[test]
    fn test_describe_comb() {
        let set = create_matcher().describe(&create_comb_image());
        assert!(set.len() >= 10, "only {} keypoints", set.len());
        assert_eq!(set.keypoints.len(), set.descriptors.len());
        for kp in &set.keypoints {
            assert!(kp.x >= 0.0 && kp.x < 72.0 && kp.y >= 0.0 && kp.y < 52.0);
            assert!(kp.scale >= 1.0);
        }
    }

    #[test]
    fn test_tight_crop_keeps_keypoints_inside() {
        // Enclosing rectangle of the comb ink, no background around it
        let tight = image::imageops::crop_imm(&create_comb_image(), 8, 10, 56, 32).to_image();
        let matcher = create_matcher();
        let set = matcher.describe(&tight);

        assert!(set.len() >= 5, "only {} keypoints", set.len());
        for kp in &set.keypoints {
            assert!(kp.x >= 0.0 && kp.x < 56.0 && kp.y >= 0.0 && kp.y < 32.0, "{:?}", kp);
        }
    }

    #[test]
    fn test_self_match_succeeds() {
        let matcher = create_matcher();
        let a = matcher.describe(&create_comb_image());
        let b = matcher.describe(&create_comb_image());
        let verdict = matcher.match_descriptors(&a, &b);

        assert!(verdict.is_match);
        assert!(verdict.good_matches >= matcher.config().good_matches_min_limit);
        assert_eq!(verdict.candidates.len(), b.len());
    }

    #[test]
    fn test_candidates_sorted_and_one_per_query() {
        let matcher = create_matcher();
        let a = matcher.describe(&create_comb_image());
        let b = matcher.describe(&create_disk_image());
        let verdict = matcher.match_descriptors(&a, &b);

        assert_eq!(verdict.candidates.len(), b.len());
        for pair in verdict.candidates.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[test]
    fn test_empty_symbol_never_matches() {
        let matcher = create_matcher();
        let flat = GrayImage::from_pixel(40, 40, Luma([200]));
        let empty = matcher.describe(&flat);
        assert!(empty.is_empty());

        let comb = matcher.describe(&create_comb_image());
        assert_eq!(matcher.match_descriptors(&empty, &comb), MatchVerdict::no_match());
        assert_eq!(matcher.match_descriptors(&comb, &empty), MatchVerdict::no_match());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_good_matches_monotonic_in_threshold(
            a in arbitrary_set(12),
            b in arbitrary_set(12),
            t1 in 0.01f32..3.0,
            t2 in 0.01f32..3.0,
        ) {
            let matcher = create_matcher();
            let (lo, hi) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
            let strict = matcher.match_with_threshold(&a, &b, lo);
            let loose = matcher.match_with_threshold(&a, &b, hi);
            prop_assert!(strict.good_matches <= loose.good_matches);
            prop_assert_eq!(strict.candidates.len(), loose.candidates.len());
        }
    }
}
