use card_core::{BoundingRect, Circle};
use image::GrayImage;
use imageproc::point::Point;

/// One located card: a square sub-grid of the working image with everything
/// outside the card disk zeroed.
#[derive(Debug, Clone)]
pub struct Card {
    /// Masked pixels of the bounding square
    pub image: GrayImage,
    /// Disk mask relative to `image`
    pub mask: Circle,
    /// Detected circle in working-resolution coordinates
    pub circle: Circle,
    /// Detected circle mapped back to source-image coordinates
    pub source_circle: Circle,
    /// Top-left corner of `image` inside the working image
    pub offset: (u32, u32),
}

impl Card {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// A card rescaled to the canonical `dim x dim` frame
#[derive(Debug, Clone)]
pub struct NormalizedCard {
    /// Position of the card in the locator's output
    pub index: usize,
    pub image: GrayImage,
    /// Disk mask in the normalized frame
    pub mask: Circle,
    pub source_circle: Circle,
}

impl NormalizedCard {
    pub fn dim(&self) -> u32 {
        self.image.width()
    }

    /// Geometric center of the normalized frame
    pub fn center(&self) -> (f32, f32) {
        let (w, h) = self.image.dimensions();
        (w as f32 * 0.5, h as f32 * 0.5)
    }
}

/// Boundary of one candidate foreground object on a normalized card
#[derive(Debug, Clone, PartialEq)]
pub struct ContourRegion {
    pub points: Vec<Point<i32>>,
    pub bounds: BoundingRect,
}

impl ContourRegion {
    /// Build from boundary points; `None` for an empty contour
    pub fn from_points(points: Vec<Point<i32>>) -> Option<Self> {
        let bounds = BoundingRect::from_points(points.iter().map(|p| (p.x, p.y)))?;
        Some(Self { points, bounds })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
