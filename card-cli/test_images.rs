//! Synthetic card photographs shared by the comparison and batch tests.

use image::{GrayImage, Luma};

pub const BACKGROUND: u8 = 40;
pub const CARD: u8 = 220;
pub const INK: u8 = 30;
pub const CARD_RADIUS: f32 = 60.0;
const SPACING: u32 = 200;
const MARGIN: u32 = 80;
const HEIGHT: u32 = 220;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    /// Bar with four teeth, rich in corners
    Comb,
    /// Solid round blob
    Disk,
    Blank,
}

impl Symbol {
    /// Whether the card-local offset `(dx, dy)` is inked
    fn covers(self, dx: i32, dy: i32) -> bool {
        match self {
            Symbol::Comb => {
                let base = (-24..24).contains(&dx) && (4..12).contains(&dy);
                let tooth = (-24..24).contains(&dx) && (-12..4).contains(&dy) && (dx + 24) % 14 < 6;
                base || tooth
            }
            Symbol::Disk => dx * dx + dy * dy <= 14 * 14,
            Symbol::Blank => false,
        }
    }
}

/// Integer center of the `i`-th card of a row
pub fn card_center(i: usize) -> (f32, f32) {
    ((MARGIN + SPACING * i as u32) as f32, (HEIGHT / 2) as f32)
}

/// One card per symbol, left to right, on a dark table
pub fn card_row(symbols: &[Symbol]) -> GrayImage {
    let n = symbols.len().max(1) as u32;
    let width = 2 * MARGIN + SPACING * (n - 1);
    let mut img = GrayImage::from_pixel(width, HEIGHT, Luma([BACKGROUND]));

    for (i, &symbol) in symbols.iter().enumerate() {
        let (cx, cy) = card_center(i);
        let (cx, cy) = (cx as i32, cy as i32);
        for (x, y, p) in img.enumerate_pixels_mut() {
            let dx = x as i32 - cx;
            let dy = y as i32 - cy;
            if ((dx * dx + dy * dy) as f32) <= CARD_RADIUS * CARD_RADIUS {
                *p = Luma([if symbol.covers(dx, dy) { INK } else { CARD }]);
            }
        }
    }
    img
}

/// A lone disk well below any accepted card size
pub fn small_disk_image() -> GrayImage {
    GrayImage::from_fn(300, 300, |x, y| {
        let dx = x as f32 - 150.0;
        let dy = y as f32 - 150.0;
        if dx * dx + dy * dy <= 15.0 * 15.0 {
            Luma([CARD])
        } else {
            Luma([BACKGROUND])
        }
    })
}
