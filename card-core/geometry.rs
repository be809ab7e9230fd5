//! Small geometric helpers shared by every stage.

use image::{GrayImage, Luma};

/// Euclidean distance between two points
#[inline]
pub fn point_distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

/// Axis-aligned integer rectangle; `width`/`height` count pixels, so a single
/// point has a 1x1 rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Smallest rectangle enclosing every point, `None` for an empty set
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (i32, i32)>,
    {
        let mut iter = points.into_iter();
        let (x0, y0) = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);
        for (x, y) in iter {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        })
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 * 0.5,
            self.y as f32 + self.height as f32 * 0.5,
        )
    }

    pub fn max_side(&self) -> i32 {
        self.width.max(self.height)
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn intersection(&self, other: &BoundingRect) -> Option<BoundingRect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x || bottom <= y {
            return None;
        }
        Some(BoundingRect::new(x, y, right - x, bottom - y))
    }

    /// Area shared by both rectangles
    pub fn overlap_area(&self, other: &BoundingRect) -> i64 {
        self.intersection(other).map_or(0, |r| r.area())
    }

    /// Grow by `margin` on every side, then clip to `[0, width) x [0, height)`
    pub fn expanded_within(&self, margin: i32, width: u32, height: u32) -> Option<BoundingRect> {
        let grown = BoundingRect::new(
            self.x - margin,
            self.y - margin,
            self.width + 2 * margin,
            self.height + 2 * margin,
        );
        grown.intersection(&BoundingRect::new(0, 0, width as i32, height as i32))
    }
}

/// Circle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Circle {
    pub cx: f32,
    pub cy: f32,
    pub radius: f32,
}

impl Circle {
    pub fn new(cx: f32, cy: f32, radius: f32) -> Self {
        Self { cx, cy, radius }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.cx, self.cy)
    }

    pub fn center_distance(&self, other: &Circle) -> f32 {
        point_distance(self.center(), other.center())
    }

    /// Distance from the circle's center to a point
    pub fn distance_to_point(&self, x: f32, y: f32) -> f32 {
        point_distance(self.center(), (x, y))
    }

    /// Distance from the rim; negative inside
    pub fn rim_distance(&self, x: f32, y: f32) -> f32 {
        self.distance_to_point(x, y) - self.radius
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        self.distance_to_point(x, y) <= self.radius
    }

    /// Same circle in a frame scaled by `factor`
    pub fn scaled(&self, factor: f32) -> Circle {
        Circle::new(self.cx * factor, self.cy * factor, self.radius * factor)
    }
}

/// Binary disk mask (255 inside, 0 outside) of the given size
pub fn disk_mask(width: u32, height: u32, circle: &Circle) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        if circle.contains(x as f32, y as f32) {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Zero every pixel of `img` where `mask` is zero
pub fn apply_mask(img: &mut GrayImage, mask: &GrayImage) {
    for (p, m) in img.pixels_mut().zip(mask.pixels()) {
        if m[0] == 0 {
            p[0] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_bounding_rect_from_points() {
        let rect = BoundingRect::from_points([(3, 4), (10, 2), (5, 9)]).unwrap();
        assert_eq!(rect, BoundingRect::new(3, 2, 8, 8));
        assert_eq!(rect.area(), 64);
        assert_eq!(rect.max_side(), 8);
        assert_relative_eq!(rect.center().0, 7.0);
        assert_relative_eq!(rect.center().1, 6.0);
    }

    #[test]
    fn test_bounding_rect_empty() {
        assert!(BoundingRect::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_overlap_area() {
        let a = BoundingRect::new(0, 0, 10, 10);
        let b = BoundingRect::new(5, 5, 10, 10);
        let c = BoundingRect::new(20, 20, 2, 2);
        assert_eq!(a.overlap_area(&b), 25);
        assert_eq!(a.overlap_area(&c), 0);
        // Touching edges share no pixels
        assert_eq!(a.overlap_area(&BoundingRect::new(10, 0, 5, 5)), 0);
    }

    #[test]
    fn test_expanded_within_clips() {
        let rect = BoundingRect::new(2, 3, 4, 4);
        let grown = rect.expanded_within(5, 20, 20).unwrap();
        assert_eq!(grown, BoundingRect::new(0, 0, 11, 12));
    }

    #[test]
    fn test_circle_distances() {
        let c = Circle::new(10.0, 10.0, 5.0);
        assert_relative_eq!(c.distance_to_point(13.0, 14.0), 5.0);
        assert_relative_eq!(c.rim_distance(10.0, 10.0), -5.0);
        assert!(c.contains(12.0, 12.0));
        assert!(!c.contains(16.0, 10.0));
        assert_relative_eq!(c.center_distance(&Circle::new(13.0, 14.0, 1.0)), 5.0);
        assert_relative_eq!(c.scaled(2.0).radius, 10.0);
    }

    #[test]
    fn test_disk_mask_and_apply() {
        let circle = Circle::new(5.0, 5.0, 3.0);
        let mask = disk_mask(11, 11, &circle);
        assert_eq!(mask.get_pixel(5, 5)[0], 255);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);

        let mut img = GrayImage::from_pixel(11, 11, Luma([200]));
        apply_mask(&mut img, &mask);
        assert_eq!(img.get_pixel(5, 5)[0], 200);
        assert_eq!(img.get_pixel(10, 10)[0], 0);
    }

    proptest! {
        #[test]
        fn prop_bounding_rect_contains_all_points(
            points in prop::collection::vec((-500i32..500, -500i32..500), 1..64)
        ) {
            let rect = BoundingRect::from_points(points.iter().copied()).unwrap();
            for &(x, y) in &points {
                prop_assert!(rect.contains_point(x, y));
            }
            prop_assert!(rect.area() >= 1);
        }

        #[test]
        fn prop_overlap_is_symmetric_and_bounded(
            a in (-50i32..50, -50i32..50, 1i32..40, 1i32..40),
            b in (-50i32..50, -50i32..50, 1i32..40, 1i32..40),
        ) {
            let ra = BoundingRect::new(a.0, a.1, a.2, a.3);
            let rb = BoundingRect::new(b.0, b.1, b.2, b.3);
            prop_assert_eq!(ra.overlap_area(&rb), rb.overlap_area(&ra));
            prop_assert!(ra.overlap_area(&rb) <= ra.area().min(rb.area()));
        }
    }
}
