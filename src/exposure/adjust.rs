//! Exposure (EV) adjustment in L*a*b*.
//!
//! Only lightness is scaled, so brightness changes do not shift hue or
//! saturation. `+1` EV doubles lightness, `-1` halves it.

use image::{Rgb, RgbImage};

use super::color::{lab_to_rgb, rgb_to_lab};

/// Returns a copy of `image` with lightness multiplied by `2^ev`.
pub fn adjust_exposure(image: &RgbImage, ev: f64) -> RgbImage {
    let factor = 2f64.powf(ev) as f32;

    let mut output = RgbImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let [l, a, b] = rgb_to_lab(pixel.0);
        let l = (l * factor).clamp(0.0, 100.0);
        output.put_pixel(x, y, Rgb(lab_to_rgb([l, a, b])));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> RgbImage {
        RgbImage::from_fn(16, 16, |x, y| {
            Rgb([40 + (x * 6) as u8, 50 + (y * 5) as u8, 60 + ((x + y) * 2) as u8])
        })
    }

    fn max_channel_diff(a: &RgbImage, b: &RgbImage) -> u8 {
        a.as_raw()
            .iter()
            .zip(b.as_raw())
            .map(|(x, y)| x.abs_diff(*y))
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn test_zero_ev_is_identity() {
        let img = sample_image();
        let adjusted = adjust_exposure(&img, 0.0);
        assert_eq!(adjusted.dimensions(), img.dimensions());
        assert!(max_channel_diff(&img, &adjusted) <= 1);
    }

    #[test]
    fn test_round_trip_is_approximately_invertible() {
        let img = sample_image();
        let ev = 0.5;
        let back = adjust_exposure(&adjust_exposure(&img, ev), -ev);
        assert!(max_channel_diff(&img, &back) <= 3);
    }

    #[test]
    fn test_positive_ev_brightens() {
        let img = sample_image();
        let brighter = adjust_exposure(&img, 1.0);

        let before = rgb_to_lab(img.get_pixel(4, 4).0)[0];
        let after = rgb_to_lab(brighter.get_pixel(4, 4).0)[0];
        assert!((after / before - 2.0).abs() < 0.1, "{} -> {}", before, after);
    }

    #[test]
    fn test_lightness_clips_at_white() {
        let img = RgbImage::from_pixel(2, 2, Rgb([200, 200, 200]));
        let adjusted = adjust_exposure(&img, 3.0);
        assert!(adjusted.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn test_grey_stays_neutral() {
        let img = RgbImage::from_pixel(1, 1, Rgb([80, 80, 80]));
        let p = adjust_exposure(&img, 0.7).get_pixel(0, 0).0;
        assert!(p[0].abs_diff(p[1]) <= 1 && p[1].abs_diff(p[2]) <= 1);
        assert!(p[0] > 80);
    }
}
