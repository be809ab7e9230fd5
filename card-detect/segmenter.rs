//! Foreground symbol segmentation on normalized cards.

use card_core::BoundingRect;
use image::GrayImage;
use imageproc::contours::find_contours;
use imageproc::distance_transform::Norm;
use log::debug;

use crate::config::SegmenterConfig;
use crate::error::DetectResult;
use crate::types::{ContourRegion, NormalizedCard};

/// Why a contour was not accepted as a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Bounding area at or below the noise floor
    TooSmall,
    /// Bounding area at or above a quarter of the inscribed disk
    TooLarge,
    /// Center outside the region of interest disk
    OutsideRoi,
    /// Longer side spans at least the ROI radius
    TooElongated,
}

#[derive(Debug, Clone)]
pub struct ObjectSegmenter {
    cfg: SegmenterConfig,
}

impl ObjectSegmenter {
    pub fn new(cfg: SegmenterConfig) -> DetectResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.cfg
    }

    /// Plausible symbol regions on `card`, in contour discovery order
    pub fn segment(&self, card: &NormalizedCard) -> Vec<ContourRegion> {
        let regions = self.segment_image(&card.image);
        debug!("Card {}: {} object(s)", card.index, regions.len());
        regions
    }

    pub fn segment_image(&self, img: &GrayImage) -> Vec<ContourRegion> {
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return Vec::new();
        }

        let edges = imageproc::edges::canny(img, self.cfg.canny_low, self.cfg.canny_high);
        let closed = if self.cfg.closing_radius > 0 {
            imageproc::morphology::close(&edges, Norm::L1, self.cfg.closing_radius)
        } else {
            edges
        };

        let contours = find_contours::<i32>(&closed);
        let total = contours.len();
        let mut accepted = Vec::new();
        for contour in contours {
            let Some(region) = ContourRegion::from_points(contour.points) else {
                continue;
            };
            match self.check_bounds(&region.bounds, w, h) {
                Ok(()) => accepted.push(region),
                Err(reason) => debug!("Rejected contour {:?}: {:?}", region.bounds, reason),
            }
        }
        debug!("{} of {} contours kept", accepted.len(), total);
        accepted
    }

    /// Geometric acceptance test for a contour's bounding rectangle on a
    /// `width x height` card
    pub fn check_bounds(&self, bounds: &BoundingRect, width: u32, height: u32) -> Result<(), Rejection> {
        let area = bounds.area();
        let max_area = self.max_area(width, height);
        if area <= self.cfg.min_area {
            return Err(Rejection::TooSmall);
        }
        if area as f64 >= max_area {
            return Err(Rejection::TooLarge);
        }

        let roi = self.roi_radius(width);
        let (bx, by) = bounds.center();
        let dx = bx - width as f32 * 0.5;
        let dy = by - height as f32 * 0.5;
        if (dx * dx + dy * dy).sqrt() >= roi {
            return Err(Rejection::OutsideRoi);
        }
        if bounds.max_side() as f32 >= roi {
            return Err(Rejection::TooElongated);
        }
        Ok(())
    }

    pub fn roi_radius(&self, width: u32) -> f32 {
        self.cfg.roi_factor * width as f32
    }

    pub fn max_area(&self, width: u32, height: u32) -> f64 {
        self.cfg.max_area_factor as f64 * width as f64 * height as f64
    }
}

/// Crop the enclosing rectangle of `region` from its card, grown by `margin`
/// and clipped to the card. `None` when the rectangle misses the card.
pub fn crop_object(card: &NormalizedCard, region: &ContourRegion, margin: u32) -> Option<GrayImage> {
    let (w, h) = card.image.dimensions();
    let rect = region.bounds.expanded_within(margin as i32, w, h)?;
    Some(
        image::imageops::crop_imm(
            &card.image,
            rect.x as u32,
            rect.y as u32,
            rect.width as u32,
            rect.height as u32,
        )
        .to_image(),
    )
}
