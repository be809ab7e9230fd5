use card_core::PipelineConfig;

use crate::config::{LocatorConfig, SegmenterConfig};
use crate::detector::CardDetector;
use crate::error::DetectResult;
use crate::locator::CardLocator;
use crate::normalizer::CardNormalizer;
use crate::segmenter::ObjectSegmenter;

/// Default growth around a contour's enclosing rectangle when cropping; the
/// bare rectangle
pub const DEFAULT_CROP_MARGIN: u32 = 0;

/// Builder for creating a `CardDetector`
#[derive(Debug, Clone)]
pub struct CardDetectorBuilder {
    pipeline: PipelineConfig,
    locator: LocatorConfig,
    segmenter: SegmenterConfig,
    crop_margin: u32,
}

impl Default for CardDetectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CardDetectorBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::from_config(PipelineConfig::default())
    }

    /// Start from an existing pipeline configuration
    pub fn from_config(pipeline: PipelineConfig) -> Self {
        Self {
            pipeline,
            locator: LocatorConfig::default(),
            segmenter: SegmenterConfig::default(),
            crop_margin: DEFAULT_CROP_MARGIN,
        }
    }

    /// Set the expected card diameter range in working-resolution pixels
    pub fn card_sizes(mut self, min: u32, max: u32) -> Self {
        self.pipeline.min_card_size = min;
        self.pipeline.max_card_size = max;
        self
    }

    /// Set the working resolution images are downscaled to
    pub fn working_resolution(mut self, limit: u32) -> Self {
        self.pipeline.working_resolution = limit;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.pipeline.verbose = verbose;
        self
    }

    /// Replace the locator tuning
    pub fn locator(mut self, cfg: LocatorConfig) -> Self {
        self.locator = cfg;
        self
    }

    /// Replace the segmenter tuning
    pub fn segmenter(mut self, cfg: SegmenterConfig) -> Self {
        self.segmenter = cfg;
        self
    }

    /// Set the Canny thresholds used while locating cards
    pub fn locator_edge_thresholds(mut self, low: f32, high: f32) -> Self {
        self.locator.canny_low = low;
        self.locator.canny_high = high;
        self
    }

    /// Set the Canny thresholds used while segmenting symbols
    pub fn segmenter_edge_thresholds(mut self, low: f32, high: f32) -> Self {
        self.segmenter.canny_low = low;
        self.segmenter.canny_high = high;
        self
    }

    /// Set the minimum fraction of the rim that must show edges
    pub fn min_rim_coverage(mut self, coverage: f32) -> Self {
        self.locator.min_rim_coverage = coverage;
        self
    }

    /// Set the noise floor on symbol bounding-rectangle area
    pub fn min_object_area(mut self, area: i64) -> Self {
        self.segmenter.min_area = area;
        self
    }

    /// Set the radius of the closing structuring element
    pub fn closing_radius(mut self, radius: u8) -> Self {
        self.segmenter.closing_radius = radius;
        self
    }

    /// Set the margin added around symbol crops (0 = bare enclosing rectangle)
    pub fn crop_margin(mut self, margin: u32) -> Self {
        self.crop_margin = margin;
        self
    }

    /// Build the `CardDetector`
    pub fn build(self) -> DetectResult<CardDetector> {
        self.pipeline.validate()?;
        let locator = CardLocator::new(
            self.pipeline.min_card_size,
            self.pipeline.max_card_size,
            self.locator,
        )?
        .with_working_resolution(self.pipeline.working_resolution)?;
        let normalizer = CardNormalizer::new(self.pipeline.uniform_dim())?;
        let segmenter = ObjectSegmenter::new(self.segmenter)?;

        Ok(CardDetector {
            pipeline: self.pipeline,
            locator,
            normalizer,
            segmenter,
            crop_margin: self.crop_margin,
        })
    }
}
