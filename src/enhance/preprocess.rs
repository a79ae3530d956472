use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::exposure::color::{hsv_to_rgb, rgb_to_hsv};

/// Parameters for the trail-emphasis pass run before upscaling.
#[derive(Debug, Clone, Copy)]
pub struct TrailEmphasis {
    /// CLAHE clip limit for the value channel
    pub clip_limit: f32,
    /// CLAHE tiles per side
    pub tiles: u32,
    /// Saturation multiplier
    pub saturation_boost: f32,
}

impl Default for TrailEmphasis {
    fn default() -> Self {
        Self {
            clip_limit: 3.0,
            tiles: 8,
            saturation_boost: 1.5,
        }
    }
}

/// Makes light trails stand out before upscaling.
///
/// Works in HSV: local contrast equalization (CLAHE) on V brings out detail
/// in bright areas, and S is multiplied so coloured trails pop. Hue is kept.
pub fn emphasize_trails(img: &RgbImage, params: &TrailEmphasis) -> RgbImage {
    let (width, height) = img.dimensions();
    let hsv: Vec<[f32; 3]> = img.pixels().map(|p| rgb_to_hsv(p.0)).collect();

    let value = GrayImage::from_fn(width, height, |x, y| {
        let v = hsv[(y * width + x) as usize][2];
        Luma([(v * 255.0).round() as u8])
    });
    let equalized = clahe(&value, params.clip_limit, params.tiles);

    RgbImage::from_fn(width, height, |x, y| {
        let [h, s, _] = hsv[(y * width + x) as usize];
        let v = equalized.get_pixel(x, y)[0] as f32 / 255.0;
        Rgb(hsv_to_rgb([h, s * params.saturation_boost, v]))
    })
}

/// Multiplies the HSV value channel by `gain` (clipped), after upscaling.
pub fn boost_highlights(img: &RgbImage, gain: f32) -> RgbImage {
    let mut output = img.clone();
    for pixel in output.pixels_mut() {
        let [h, s, v] = rgb_to_hsv(pixel.0);
        pixel.0 = hsv_to_rgb([h, s, v * gain]);
    }
    output
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into `tiles`×`tiles` regions; each gets a clipped,
/// redistributed histogram turned into a lookup table, and every pixel is
/// bilinearly interpolated between the four nearest tile tables.
pub fn clahe(img: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }

    let tile_w = width.div_ceil(tiles.max(1)).max(1);
    let tile_h = height.div_ceil(tiles.max(1)).max(1);
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            luts.push(tile_lut(img, x0, y0, x1, y1, clip_limit));
        }
    }

    // Position of a pixel between tile centres: (index of left/top tile, weight of the other)
    let axis = |p: u32, tile: u32, count: u32| -> (u32, u32, f32) {
        let f = (p as f32 + 0.5) / tile as f32 - 0.5;
        if f <= 0.0 {
            return (0, 0, 0.0);
        }
        let i0 = (f.floor() as u32).min(count - 1);
        let i1 = (i0 + 1).min(count - 1);
        (i0, i1, f - f.floor())
    };

    GrayImage::from_fn(width, height, |x, y| {
        let v = img.get_pixel(x, y)[0] as usize;
        let (tx0, tx1, wx) = axis(x, tile_w, tiles_x);
        let (ty0, ty1, wy) = axis(y, tile_h, tiles_y);

        let lut = |tx: u32, ty: u32| luts[(ty * tiles_x + tx) as usize][v] as f32;
        let top = lut(tx0, ty0) * (1.0 - wx) + lut(tx1, ty0) * wx;
        let bottom = lut(tx0, ty1) * (1.0 - wx) + lut(tx1, ty1) * wx;
        Luma([(top * (1.0 - wy) + bottom * wy).round().clamp(0.0, 255.0) as u8])
    })
}

fn tile_lut(img: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[img.get_pixel(x, y)[0] as usize] += 1;
        }
    }
    let area = (x1 - x0) * (y1 - y0);

    // Clip and spread the excess evenly over all bins
    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
        let mut excess = 0u32;
        for bin in hist.iter_mut() {
            if *bin > limit {
                excess += *bin - limit;
                *bin = limit;
            }
        }
        let per_bin = excess / 256;
        let residual = (excess % 256) as usize;
        for bin in hist.iter_mut() {
            *bin += per_bin;
        }
        if residual > 0 {
            let step = (256 / residual).max(1);
            for bin in hist.iter_mut().step_by(step).take(residual) {
                *bin += 1;
            }
        }
    }

    let mut lut = [0u8; 256];
    let scale = 255.0 / area as f32;
    let mut cdf = 0u32;
    for (i, &count) in hist.iter().enumerate() {
        cdf += count;
        lut[i] = (cdf as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spread(img: &GrayImage) -> u8 {
        let max = img.pixels().map(|p| p[0]).max().unwrap();
        let min = img.pixels().map(|p| p[0]).min().unwrap();
        max - min
    }

    #[test]
    fn test_clahe_keeps_dimensions() {
        let img = GrayImage::from_fn(37, 21, |x, y| Luma([(x + y) as u8]));
        assert_eq!(clahe(&img, 3.0, 8).dimensions(), (37, 21));
    }

    #[test]
    fn test_clahe_flat_image_stays_flat() {
        let img = GrayImage::from_pixel(32, 32, Luma([90]));
        let out = clahe(&img, 3.0, 8);
        assert_eq!(spread(&out), 0);
    }

    #[test]
    fn test_clahe_stretches_low_contrast() {
        let img = GrayImage::from_fn(64, 64, |x, y| Luma([100 + ((x + y) % 8) as u8]));
        let out = clahe(&img, 3.0, 8);
        assert!(spread(&out) > spread(&img), "{} vs {}", spread(&out), spread(&img));
    }

    #[test]
    fn test_clahe_tiny_image() {
        let img = GrayImage::from_fn(3, 2, |x, _| Luma([x as u8 * 50]));
        assert_eq!(clahe(&img, 3.0, 8).dimensions(), (3, 2));
    }

    #[test]
    fn test_boost_highlights() {
        let img = RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgb([100, 50, 50])
            } else {
                Rgb([250, 250, 250])
            }
        });
        let out = boost_highlights(&img, 1.2);

        assert_eq!(out.get_pixel(0, 0).0, [120, 60, 60]);
        assert_eq!(out.get_pixel(1, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_emphasize_trails_boosts_saturation() {
        let img = RgbImage::from_pixel(16, 16, Rgb([200, 120, 120]));
        let out = emphasize_trails(&img, &TrailEmphasis::default());

        let before = rgb_to_hsv(img.get_pixel(8, 8).0);
        let after = rgb_to_hsv(out.get_pixel(8, 8).0);
        assert!(after[1] > before[1]);
        assert!((after[0] - before[0]).abs() < 2.0);
    }
}
