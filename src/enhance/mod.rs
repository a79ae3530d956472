//! Image enhancement.
//!
//! This module provides:
//! - The `Enhancer` abstraction consumed by the pipeline
//! - A Real-ESRGAN backend that provisions its executable on first use
//! - A Lanczos backend that needs nothing beyond the `image` crate
//! - Trail emphasis and highlight boosting shared by both backends

pub mod engine;
pub mod preprocess;
pub mod setup;

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::config::{EnhancerBackend, EnhancerConfig};
use crate::log;

use preprocess::{boost_highlights, emphasize_trails, TrailEmphasis};
use setup::{ensure_upscaler, UpscalerPaths};

/// Turns a composite into a larger, punchier version of itself.
pub trait Enhancer {
    fn name(&self) -> &str;
    fn enhance(&mut self, img: &RgbImage) -> Result<RgbImage>;
}

fn emphasis_for(config: &EnhancerConfig) -> TrailEmphasis {
    TrailEmphasis {
        clip_limit: config.clahe_clip_limit,
        tiles: config.clahe_tiles,
        saturation_boost: config.saturation_boost,
    }
}

/// Real-ESRGAN via the ncnn-vulkan executable.
///
/// The executable is located (or downloaded) on the first call to `enhance`
/// and reused afterwards.
pub struct RealEsrganEnhancer {
    config: EnhancerConfig,
    paths: Option<UpscalerPaths>,
}

impl RealEsrganEnhancer {
    pub fn new(config: EnhancerConfig) -> Self {
        Self {
            config,
            paths: None,
        }
    }

    fn upscaler(&mut self) -> Result<UpscalerPaths> {
        if let Some(paths) = &self.paths {
            return Ok(paths.clone());
        }
        let paths = ensure_upscaler(&self.config).context("Upscaler setup failed")?;
        self.paths = Some(paths.clone());
        Ok(paths)
    }
}

impl Enhancer for RealEsrganEnhancer {
    fn name(&self) -> &str {
        "realesrgan"
    }

    fn enhance(&mut self, img: &RgbImage) -> Result<RgbImage> {
        let paths = self.upscaler()?;
        let prepared = emphasize_trails(img, &emphasis_for(&self.config));

        log(&format!(
            "Upscaling {}x{} with {} (x{})",
            img.width(),
            img.height(),
            self.config.model,
            self.config.scale
        ));
        let upscaled = engine::run_upscaler(&paths, &prepared, &self.config)?;

        Ok(boost_highlights(&upscaled, self.config.highlight_gain))
    }
}

/// Lanczos3 resampling with the same pre/post processing as the AI backend.
pub struct LanczosEnhancer {
    config: EnhancerConfig,
}

impl LanczosEnhancer {
    pub fn new(config: EnhancerConfig) -> Self {
        Self { config }
    }
}

impl Enhancer for LanczosEnhancer {
    fn name(&self) -> &str {
        "lanczos"
    }

    fn enhance(&mut self, img: &RgbImage) -> Result<RgbImage> {
        let prepared = emphasize_trails(img, &emphasis_for(&self.config));

        let scale = self.config.scale.max(1);
        let upscaled = imageops::resize(
            &prepared,
            img.width() * scale,
            img.height() * scale,
            FilterType::Lanczos3,
        );

        Ok(boost_highlights(&upscaled, self.config.highlight_gain))
    }
}

/// Builds the enhancer selected in config.
pub fn build_enhancer(config: &EnhancerConfig) -> Box<dyn Enhancer> {
    match config.backend {
        EnhancerBackend::RealEsrgan => Box::new(RealEsrganEnhancer::new(config.clone())),
        EnhancerBackend::Lanczos => Box::new(LanczosEnhancer::new(config.clone())),
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use anyhow::anyhow;

    /// Doubles the image size with nearest-neighbour sampling; no files or processes.
    #[derive(Default)]
    pub struct DoublingEnhancer {
        pub calls: usize,
    }

    impl Enhancer for DoublingEnhancer {
        fn name(&self) -> &str {
            "doubling"
        }

        fn enhance(&mut self, img: &RgbImage) -> Result<RgbImage> {
            self.calls += 1;
            Ok(imageops::resize(
                img,
                img.width() * 2,
                img.height() * 2,
                FilterType::Nearest,
            ))
        }
    }

    /// Always fails, like a model download with no network.
    pub struct FailingEnhancer;

    impl Enhancer for FailingEnhancer {
        fn name(&self) -> &str {
            "failing"
        }

        fn enhance(&mut self, _img: &RgbImage) -> Result<RgbImage> {
            Err(anyhow!("model download failed"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_lanczos_scales_dimensions() {
        let img = RgbImage::from_fn(10, 6, |x, y| Rgb([(x * 20) as u8, (y * 30) as u8, 90]));
        let mut enhancer = LanczosEnhancer::new(EnhancerConfig::default());

        let out = enhancer.enhance(&img).unwrap();
        assert_eq!(out.dimensions(), (40, 24));
    }

    #[test]
    fn test_lanczos_scale_zero_keeps_size() {
        let img = RgbImage::new(5, 5);
        let config = EnhancerConfig {
            scale: 0,
            ..Default::default()
        };
        let out = LanczosEnhancer::new(config).enhance(&img).unwrap();
        assert_eq!(out.dimensions(), (5, 5));
    }

    #[test]
    fn test_build_enhancer_by_backend() {
        let lanczos = build_enhancer(&EnhancerConfig {
            backend: EnhancerBackend::Lanczos,
            ..Default::default()
        });
        assert_eq!(lanczos.name(), "lanczos");

        let ai = build_enhancer(&EnhancerConfig::default());
        assert_eq!(ai.name(), "realesrgan");
    }
}
