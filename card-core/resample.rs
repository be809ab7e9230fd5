use image::{GrayImage, Luma, imageops::FilterType};

/// Resize with bilinear interpolation, independently in x and y.
///
/// Pixel centers are aligned, so a same-size resize returns the input
/// unchanged.
pub fn resize_bilinear(img: &GrayImage, target_width: u32, target_height: u32) -> GrayImage {
    let (src_width, src_height) = img.dimensions();
    if src_width == 0 || src_height == 0 || target_width == 0 || target_height == 0 {
        return GrayImage::new(target_width, target_height);
    }
    if (src_width, src_height) == (target_width, target_height) {
        return img.clone();
    }

    let x_ratio = src_width as f32 / target_width as f32;
    let y_ratio = src_height as f32 / target_height as f32;

    GrayImage::from_fn(target_width, target_height, |x, y| {
        let src_x = ((x as f32 + 0.5) * x_ratio - 0.5).max(0.0);
        let src_y = ((y as f32 + 0.5) * y_ratio - 0.5).max(0.0);
        let value = bilinear_sample(img, src_x, src_y);
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Sample image at fractional coordinates using bilinear interpolation.
/// Coordinates outside the image are clamped to the border.
pub fn bilinear_sample(img: &GrayImage, x: f32, y: f32) -> f32 {
    let (width, height) = img.dimensions();
    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x1 = x.floor() as u32;
    let y1 = y.floor() as u32;
    let x2 = (x1 + 1).min(width - 1);
    let y2 = (y1 + 1).min(height - 1);

    let fx = x - x1 as f32;
    let fy = y - y1 as f32;

    let p11 = img.get_pixel(x1, y1)[0] as f32;
    let p12 = img.get_pixel(x2, y1)[0] as f32;
    let p21 = img.get_pixel(x1, y2)[0] as f32;
    let p22 = img.get_pixel(x2, y2)[0] as f32;

    let interpolated_top = p11 * (1.0 - fx) + p12 * fx;
    let interpolated_bottom = p21 * (1.0 - fx) + p22 * fx;

    interpolated_top * (1.0 - fy) + interpolated_bottom * fy
}

/// Grow `img` by `pad` pixels on every side, repeating the outermost row or
/// column into the new border.
pub fn pad_replicate(img: &GrayImage, pad: u32) -> GrayImage {
    let (width, height) = img.dimensions();
    if pad == 0 || width == 0 || height == 0 {
        return img.clone();
    }
    GrayImage::from_fn(width + 2 * pad, height + 2 * pad, |x, y| {
        let sx = x.saturating_sub(pad).min(width - 1);
        let sy = y.saturating_sub(pad).min(height - 1);
        *img.get_pixel(sx, sy)
    })
}

/// Downscale so the larger side does not exceed `limit`, keeping aspect ratio.
///
/// Returns the working image and the factor applied (1.0 when untouched);
/// divide working coordinates by the factor to get source coordinates.
pub fn downscale_to_limit(img: &GrayImage, limit: u32) -> (GrayImage, f32) {
    let (width, height) = img.dimensions();
    let dim = width.max(height);
    if dim <= limit || dim == 0 {
        return (img.clone(), 1.0);
    }
    let factor = limit as f32 / dim as f32;
    let new_width = ((width as f32 * factor).round() as u32).max(1);
    let new_height = ((height as f32 * factor).round() as u32).max(1);
    let resized = image::imageops::resize(img, new_width, new_height, FilterType::Triangle);
    (resized, factor)
}
