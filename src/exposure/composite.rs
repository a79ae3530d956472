//! Long-exposure compositing.
//!
//! Frames are reduced per pixel and per channel in `f64`, the result is
//! stretched so its global minimum maps to 0 and maximum to 255, and a
//! gamma curve is applied before truncating back to 8 bits.

use image::RgbImage;

use super::CompositeMethod;
use crate::capture::Frame;

/// Gamma exponent applied to normalized samples.
pub const DEFAULT_GAMMA: f64 = 0.95;

/// Per-pixel reduction result before tone mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedImage {
    pub width: u32,
    pub height: u32,
    /// Interleaved RGB samples in [0, 255]
    pub samples: Vec<f64>,
}

impl ReducedImage {
    /// Global (min, max) over every sample.
    pub fn range(&self) -> (f64, f64) {
        self.samples
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}

/// Reduces frames into one higher-precision image.
///
/// Returns `None` for an empty slice. Frames whose size differs from the
/// first one are skipped.
pub fn reduce(frames: &[Frame], method: CompositeMethod) -> Option<ReducedImage> {
    let first = frames.first()?;
    let (width, height) = first.dimensions();

    let mut samples: Vec<f64> = first.as_raw().iter().map(|&v| v as f64).collect();
    let mut used = 1usize;

    for frame in &frames[1..] {
        if frame.dimensions() != (width, height) {
            crate::log(&format!(
                "Skipping frame of size {:?} (expected {:?})",
                frame.dimensions(),
                (width, height)
            ));
            continue;
        }
        let raw = frame.as_raw();
        match method {
            CompositeMethod::Max => {
                for (acc, &v) in samples.iter_mut().zip(raw) {
                    *acc = acc.max(v as f64);
                }
            }
            CompositeMethod::Mean => {
                for (acc, &v) in samples.iter_mut().zip(raw) {
                    *acc += v as f64;
                }
            }
        }
        used += 1;
    }

    if method == CompositeMethod::Mean && used > 1 {
        let n = used as f64;
        for acc in samples.iter_mut() {
            *acc /= n;
        }
    }

    Some(ReducedImage {
        width,
        height,
        samples,
    })
}

/// Stretches the reduced image to the full range and applies `gamma`.
///
/// A flat image (min == max) is not stretched: its samples are used as-is,
/// so the output is the gamma-mapped input value instead of a division by zero.
pub fn tone_map(reduced: &ReducedImage, gamma: f64) -> RgbImage {
    let (min, max) = reduced.range();
    let span = max - min;

    let pixels: Vec<u8> = reduced
        .samples
        .iter()
        .map(|&v| {
            let normalized = if span > 0.0 {
                (v - min) / span
            } else {
                v / 255.0
            };
            let mapped = normalized.clamp(0.0, 1.0).powf(gamma) * 255.0;
            // Truncates, like an unsigned cast of the clipped value
            mapped.clamp(0.0, 255.0) as u8
        })
        .collect();

    RgbImage::from_raw(reduced.width, reduced.height, pixels)
        .unwrap_or_else(|| RgbImage::new(reduced.width, reduced.height))
}

/// Builds the long-exposure composite.
///
/// Returns `None` if `frames` is empty.
pub fn composite_with_gamma(
    frames: &[Frame],
    method: CompositeMethod,
    gamma: f64,
) -> Option<RgbImage> {
    let reduced = reduce(frames, method)?;
    Some(tone_map(&reduced, gamma))
}
