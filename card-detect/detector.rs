use card_core::PipelineConfig;
use image::GrayImage;
use log::info;

use crate::locator::CardLocator;
use crate::normalizer::CardNormalizer;
use crate::segmenter::{crop_object, ObjectSegmenter};
use crate::types::{Card, ContourRegion, NormalizedCard};

/// Card-side half of the pipeline: locate, normalize, segment and crop.
///
/// Built by [`crate::CardDetectorBuilder`].
#[derive(Debug, Clone)]
pub struct CardDetector {
    pub(crate) pipeline: PipelineConfig,
    pub(crate) locator: CardLocator,
    pub(crate) normalizer: CardNormalizer,
    pub(crate) segmenter: ObjectSegmenter,
    pub(crate) crop_margin: u32,
}

impl CardDetector {
    /// Locate every card in a grayscale photograph
    pub fn detect_cards(&self, image: &GrayImage) -> Vec<Card> {
        self.locator.locate(image)
    }

    /// Rescale cards onto the shared `uniform_dim` frame
    pub fn uniform_size(&self, cards: &[Card]) -> Vec<NormalizedCard> {
        info!("Uniform size : {}", self.uniform_dim());
        self.normalizer.normalize(cards)
    }

    /// Symbol regions on one normalized card
    pub fn extract_objects(&self, card: &NormalizedCard) -> Vec<ContourRegion> {
        self.segmenter.segment(card)
    }

    /// Sub-image of one symbol, ready for description
    pub fn get_object(&self, card: &NormalizedCard, region: &ContourRegion) -> Option<GrayImage> {
        crop_object(card, region, self.crop_margin)
    }

    pub fn uniform_dim(&self) -> u32 {
        self.normalizer.target_dim()
    }

    pub fn crop_margin(&self) -> u32 {
        self.crop_margin
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.pipeline
    }

    pub fn locator(&self) -> &CardLocator {
        &self.locator
    }

    pub fn segmenter(&self) -> &ObjectSegmenter {
        &self.segmenter
    }

    /// Get performance summary
    pub fn summary(&self) -> String {
        let loc = self.locator.config();
        let seg = self.segmenter.config();
        format!(
            "CardDetector: cards {}..{} px -> {} px, working resolution {}, \
             locator canny {:.0}/{:.0} rim coverage {:.2}, \
             segmenter canny {:.0}/{:.0} closing {} min area {}, crop margin {}",
            self.pipeline.min_card_size,
            self.pipeline.max_card_size,
            self.uniform_dim(),
            self.locator.working_resolution(),
            loc.canny_low,
            loc.canny_high,
            loc.min_rim_coverage,
            seg.canny_low,
            seg.canny_high,
            seg.closing_radius,
            seg.min_area,
            self.crop_margin
        )
    }
}
