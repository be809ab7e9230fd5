//! Circular card localization.
//!
//! Edge pixels vote along their gradient direction (both ways) for every
//! radius in `[size_min / 2, size_max / 2]`. Card centers show up as peaks of
//! the smoothed accumulator. Peaks are taken strongest first; a peak closer
//! than `size_min` to an already accepted card is dropped, the rest are
//! verified by how much of the rim carries edge pixels, which also fixes the
//! radius.

use std::f32::consts::{PI, TAU};

use card_core::geometry::{apply_mask, disk_mask};
use card_core::resample::downscale_to_limit;
use card_core::{Circle, DEFAULT_WORKING_RESOLUTION};
use image::{GrayImage, ImageBuffer, Luma};
use log::{debug, info};
use rayon::prelude::*;

use crate::config::LocatorConfig;
use crate::error::{DetectError, DetectResult};
use crate::types::Card;

/// Angular resolution of the rim coverage test
const RIM_SECTORS: u32 = 128;
const MIN_IMAGE_SIDE: u32 = 8;

/// Accumulator peak
#[derive(Debug, Clone, Copy)]
struct CenterProposal {
    x: u32,
    y: u32,
    score: f32,
}

#[derive(Debug, Clone)]
pub struct CardLocator {
    size_min: u32,
    size_max: u32,
    working_resolution: u32,
    cfg: LocatorConfig,
}

impl CardLocator {
    pub fn new(size_min: u32, size_max: u32, cfg: LocatorConfig) -> DetectResult<Self> {
        if size_min < 2 || size_min > size_max {
            return Err(DetectError::InvalidCardSizes {
                min: size_min,
                max: size_max,
            });
        }
        cfg.validate()?;
        Ok(Self {
            size_min,
            size_max,
            working_resolution: DEFAULT_WORKING_RESOLUTION,
            cfg,
        })
    }

    /// Cap the larger image side before voting; geometry is mapped back to
    /// source coordinates
    pub fn with_working_resolution(mut self, limit: u32) -> DetectResult<Self> {
        if limit < 32 {
            return Err(DetectError::InvalidParameter {
                name: "working_resolution",
                reason: format!("must be >= 32, got {}", limit),
            });
        }
        self.working_resolution = limit;
        Ok(self)
    }

    pub fn working_resolution(&self) -> u32 {
        self.working_resolution
    }

    /// Accepted radius interval in working-resolution pixels
    pub fn radius_range(&self) -> (f32, f32) {
        (self.size_min as f32 * 0.5, self.size_max as f32 * 0.5)
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.cfg
    }

    /// Find every card in `image`. An empty result means nothing matched the
    /// size constraints.
    pub fn locate(&self, image: &GrayImage) -> Vec<Card> {
        let (working, scale) = downscale_to_limit(image, self.working_resolution);
        if scale < 1.0 {
            debug!(
                "Working image {}x{} (scale {:.3})",
                working.width(),
                working.height(),
                scale
            );
        }

        let cards: Vec<Card> = self
            .detect_circles(&working)
            .par_iter()
            .filter_map(|circle| extract_card(&working, circle, scale))
            .collect();

        info!("Located {} card(s)", cards.len());
        cards
    }

    /// Circles in the coordinates of `img`, in accumulator ranking order
    pub fn detect_circles(&self, img: &GrayImage) -> Vec<Circle> {
        let (w, h) = img.dimensions();
        if w < MIN_IMAGE_SIDE || h < MIN_IMAGE_SIDE {
            return Vec::new();
        }

        let edges = imageproc::edges::canny(img, self.cfg.canny_low, self.cfg.canny_high);
        let edge_points: Vec<(u32, u32)> = edges
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 0)
            .map(|(x, y, _)| (x, y))
            .collect();
        if edge_points.is_empty() {
            debug!("No edges, no cards");
            return Vec::new();
        }

        let proposals = self.find_center_proposals(img, &edge_points);
        debug!(
            "{} edge pixels, {} center proposals",
            edge_points.len(),
            proposals.len()
        );

        let min_distance = self.size_min as f32;
        let mut accepted: Vec<Circle> = Vec::new();
        for proposal in proposals.iter().take(self.cfg.max_candidates) {
            let (cx, cy) = (proposal.x as f32, proposal.y as f32);
            if accepted
                .iter()
                .any(|c| c.distance_to_point(cx, cy) < min_distance)
            {
                continue;
            }

            match self.estimate_radius(&edge_points, cx, cy) {
                Some((radius, coverage)) if coverage >= self.cfg.min_rim_coverage => {
                    debug!(
                        "Card at ({}, {}) r={:.1} votes={:.1} coverage={:.2}",
                        cx, cy, radius, proposal.score, coverage
                    );
                    accepted.push(Circle::new(cx, cy, radius));
                }
                Some((radius, coverage)) => {
                    debug!(
                        "Rejected peak ({}, {}) r={:.1}: rim coverage {:.2}",
                        cx, cy, radius, coverage
                    );
                }
                None => {}
            }
        }
        accepted
    }

    fn find_center_proposals(&self, img: &GrayImage, edge_points: &[(u32, u32)]) -> Vec<CenterProposal> {
        let (w, h) = img.dimensions();
        let gx = imageproc::gradients::horizontal_scharr(img);
        let gy = imageproc::gradients::vertical_scharr(img);
        let (r_min, r_max) = self.radius_range();

        let stride = w as usize;
        let mut accum = vec![0.0f32; stride * h as usize];
        let x_limit = (w - 1) as f32;
        let y_limit = (h - 1) as f32;

        for &(x, y) in edge_points {
            let gxv = gx.get_pixel(x, y)[0] as f32;
            let gyv = gy.get_pixel(x, y)[0] as f32;
            let mag = (gxv * gxv + gyv * gyv).sqrt();
            if mag < 1e-6 {
                continue;
            }
            let dx = gxv / mag;
            let dy = gyv / mag;
            let (xf, yf) = (x as f32, y as f32);

            // Cards may be brighter or darker than the table
            let mut r = r_min;
            while r <= r_max {
                for sign in [1.0f32, -1.0] {
                    let vx = xf + sign * dx * r;
                    let vy = yf + sign * dy * r;
                    if vx >= 0.0 && vx < x_limit && vy >= 0.0 && vy < y_limit {
                        bilinear_add_in_bounds(&mut accum, stride, vx, vy, 1.0);
                    }
                }
                r += 1.0;
            }
        }

        let Some(accum_img) = ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(w, h, accum) else {
            return Vec::new();
        };
        let smoothed = imageproc::filter::gaussian_blur_f32(&accum_img, self.cfg.accum_sigma);
        let data = smoothed.as_raw();

        let max_val = data.iter().copied().fold(0.0f32, f32::max);
        if max_val < 1e-6 {
            return Vec::new();
        }
        let vote_threshold = self.cfg.min_vote_frac * max_val;

        let nms_radius = (r_min * 0.5).max(2.0);
        let nms_r = nms_radius.ceil() as i32;
        let mut nms_offsets = Vec::new();
        for dy in -nms_r..=nms_r {
            for dx in -nms_r..=nms_r {
                if (dx == 0 && dy == 0) || (dx * dx + dy * dy) as f32 > nms_radius * nms_radius {
                    continue;
                }
                nms_offsets.push((dx, dy));
            }
        }

        let mut proposals = Vec::new();
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                let idx = y as usize * stride + x as usize;
                let val = data[idx];
                if val < vote_threshold {
                    continue;
                }
                let is_max = nms_offsets.iter().all(|&(dx, dy)| {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                        return true;
                    }
                    let nidx = ny as usize * stride + nx as usize;
                    !(data[nidx] > val || (data[nidx] == val && nidx < idx))
                });
                if is_max {
                    proposals.push(CenterProposal {
                        x: x as u32,
                        y: y as u32,
                        score: val,
                    });
                }
            }
        }

        proposals.sort_by(|a, b| b.score.total_cmp(&a.score));
        proposals
    }

    /// Best radius around `(cx, cy)` and the fraction of rim sectors holding an
    /// edge pixel within one pixel of it.
    fn estimate_radius(&self, edge_points: &[(u32, u32)], cx: f32, cy: f32) -> Option<(f32, f32)> {
        let (r_min, r_max) = self.radius_range();
        let r_lo = r_min.ceil() as i32;
        let r_hi = r_max.floor() as i32;
        if r_lo > r_hi {
            return None;
        }

        let n = (r_hi - r_lo + 1) as usize;
        let mut sectors = vec![0u128; n];
        let mut counts = vec![0u32; n];

        for &(x, y) in edge_points {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let d = (dx * dx + dy * dy).sqrt();
            if d < r_min - 1.5 || d > r_max + 1.5 {
                continue;
            }
            let sector = (((dy.atan2(dx) + PI) / TAU * RIM_SECTORS as f32) as u32).min(RIM_SECTORS - 1);
            let bin = d.round() as i32;
            for r in (bin - 1)..=(bin + 1) {
                if r >= r_lo && r <= r_hi {
                    sectors[(r - r_lo) as usize] |= 1u128 << sector;
                }
            }
            if bin >= r_lo && bin <= r_hi {
                counts[(bin - r_lo) as usize] += 1;
            }
        }

        let best = (0..n).max_by(|&a, &b| {
            sectors[a]
                .count_ones()
                .cmp(&sectors[b].count_ones())
                .then(counts[a].cmp(&counts[b]))
                .then(b.cmp(&a))
        })?;
        if sectors[best] == 0 {
            return None;
        }
        let coverage = sectors[best].count_ones() as f32 / RIM_SECTORS as f32;

        // Refine to the mean distance of the supporting rim pixels
        let best_r = (r_lo + best as i32) as f32;
        let (sum, count) = edge_points
            .iter()
            .map(|&(x, y)| {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                (dx * dx + dy * dy).sqrt()
            })
            .filter(|d| (d - best_r).abs() <= 1.5)
            .fold((0.0f32, 0u32), |(s, c), d| (s + d, c + 1));
        let radius = if count > 0 { sum / count as f32 } else { best_r };

        Some((radius.clamp(r_min, r_max), coverage))
    }
}

/// Deposit a weighted vote into the accumulator using bilinear interpolation.
#[inline]
fn bilinear_add_in_bounds(accum: &mut [f32], stride: usize, x: f32, y: f32, weight: f32) {
    let x0 = x as usize;
    let y0 = y as usize;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let base = y0 * stride + x0;
    accum[base] += weight * (1.0 - fx) * (1.0 - fy);
    accum[base + 1] += weight * fx * (1.0 - fy);
    accum[base + stride] += weight * (1.0 - fx) * fy;
    accum[base + stride + 1] += weight * fx * fy;
}

/// Crop the bounding square of `circle` and zero everything off the disk.
/// The mask radius is shrunk when the square is clipped by the image border.
fn extract_card(img: &GrayImage, circle: &Circle, scale: f32) -> Option<Card> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    let x0 = (circle.cx - circle.radius).floor().max(0.0) as u32;
    let y0 = (circle.cy - circle.radius).floor().max(0.0) as u32;
    let x1 = ((circle.cx + circle.radius).ceil().max(0.0) as u32).min(w - 1);
    let y1 = ((circle.cy + circle.radius).ceil().max(0.0) as u32).min(h - 1);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    let (cw, ch) = (x1 - x0 + 1, y1 - y0 + 1);

    let lcx = circle.cx - x0 as f32;
    let lcy = circle.cy - y0 as f32;
    let radius = circle
        .radius
        .min(lcx)
        .min(lcy)
        .min((cw - 1) as f32 - lcx)
        .min((ch - 1) as f32 - lcy);
    if radius < 1.0 {
        return None;
    }
    let mask = Circle::new(lcx, lcy, radius);

    let mut sub = image::imageops::crop_imm(img, x0, y0, cw, ch).to_image();
    apply_mask(&mut sub, &disk_mask(cw, ch, &mask));

    Some(Card {
        image: sub,
        mask,
        circle: *circle,
        source_circle: circle.scaled(1.0 / scale),
        offset: (x0, y0),
    })
}
