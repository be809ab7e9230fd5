use image::GrayImage;

/// Intensity-centroid orientation of the square patch of radius `half`
/// around `(x, y)`, in radians. Patch pixels outside the image are skipped.
pub fn intensity_centroid_angle(img: &GrayImage, x: f32, y: f32, half: i32) -> f32 {
    let (w, h) = img.dimensions();
    let (cx, cy) = (x.round() as i32, y.round() as i32);

    let mut m10 = 0i64;
    let mut m01 = 0i64;
    for dy in -half..=half {
        let yy = cy + dy;
        if yy < 0 || yy >= h as i32 {
            continue;
        }
        for dx in -half..=half {
            let xx = cx + dx;
            if xx < 0 || xx >= w as i32 {
                continue;
            }
            let val = img.get_pixel(xx as u32, yy as u32)[0] as i64;
            m10 += dx as i64 * val;
            m01 += dy as i64 * val;
        }
    }

    (m01 as f32).atan2(m10 as f32)
}
