use std::path::{Path, PathBuf};

use card_detect::{Card, ContourRegion, NormalizedCard};
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use log::{debug, warn};

const CARD_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const RECT_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
const CONTOUR_COLOR: Rgb<u8> = Rgb([0, 120, 255]);

/// Debug rendering of intermediate results. Implementations must not
/// influence any decision.
pub trait Visualizer: Send + Sync {
    /// Located cards over the photograph they came from
    fn show_cards(&self, _label: &str, _image: &GrayImage, _cards: &[Card]) {}

    /// Accepted symbol contours over a normalized card
    fn show_objects(&self, _label: &str, _card: &NormalizedCard, _objects: &[ContourRegion]) {}
}

/// Renders nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullVisualizer;

impl Visualizer for NullVisualizer {}

/// Writes PNG overlays into a directory
#[derive(Debug, Clone)]
pub struct OverlayVisualizer {
    dir: PathBuf,
}

impl OverlayVisualizer {
    pub fn new<P: AsRef<Path>>(dir: P) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    fn save(&self, label: &str, suffix: &str, img: &RgbImage) {
        let path = self.dir.join(format!("{}_{}.png", sanitize(label), suffix));
        match img.save(&path) {
            Ok(()) => debug!("Wrote {}", path.display()),
            Err(e) => warn!("Cannot write {}: {}", path.display(), e),
        }
    }
}

impl Visualizer for OverlayVisualizer {
    fn show_cards(&self, label: &str, image: &GrayImage, cards: &[Card]) {
        self.save(label, "cards", &render_cards(image, cards));
    }

    fn show_objects(&self, label: &str, card: &NormalizedCard, objects: &[ContourRegion]) {
        self.save(label, "objects", &render_objects(card, objects));
    }
}

pub fn render_cards(image: &GrayImage, cards: &[Card]) -> RgbImage {
    let mut out = DynamicImage::ImageLuma8(image.clone()).into_rgb8();
    for card in cards {
        let c = card.source_circle;
        let center = (c.cx.round() as i32, c.cy.round() as i32);
        draw_hollow_circle_mut(&mut out, center, c.radius.round() as i32, CARD_COLOR);
        draw_hollow_circle_mut(&mut out, center, 2, CARD_COLOR);
    }
    out
}

pub fn render_objects(card: &NormalizedCard, objects: &[ContourRegion]) -> RgbImage {
    let mut out = DynamicImage::ImageLuma8(card.image.clone()).into_rgb8();
    let (w, h) = out.dimensions();
    for region in objects {
        let b = region.bounds;
        if b.width > 0 && b.height > 0 {
            let rect = Rect::at(b.x, b.y).of_size(b.width as u32, b.height as u32);
            draw_hollow_rect_mut(&mut out, rect, RECT_COLOR);
        }
        for p in &region.points {
            if p.x >= 0 && p.y >= 0 && (p.x as u32) < w && (p.y as u32) < h {
                out.put_pixel(p.x as u32, p.y as u32, CONTOUR_COLOR);
            }
        }
    }
    out
}

fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
