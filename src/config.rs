//! Application configuration.
//!
//! Loads settings from config.json at startup. Every field has a default,
//! so a partial file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::exposure::{CompositeMethod, DEFAULT_GAMMA};

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub capture: CaptureConfig,
    pub composite: CompositeConfig,
    pub selection: SelectionConfig,
    pub enhancer: EnhancerConfig,
    pub output: OutputConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Target frames per second (best effort)
    pub fps: f64,
    /// Requested durations are clamped to this many seconds
    pub max_duration_secs: f64,
    /// Capture stops once this many frames are held in memory
    pub max_frames: usize,
    /// Capture stops once the held frames would exceed this many megabytes
    pub max_buffer_mb: u64,
    /// Pause between region selection and the first frame (milliseconds)
    pub start_delay_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            max_duration_secs: 120.0,
            max_frames: 3600,
            max_buffer_mb: 4096,
            start_delay_ms: 1000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeConfig {
    /// Per-pixel reduction across frames
    pub method: CompositeMethod,
    /// Exponent applied to normalized samples
    pub gamma: f64,
    /// Brightness adjustment applied to the composite in stops (0 = skip)
    pub exposure_ev: f64,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            method: CompositeMethod::Mean,
            gamma: DEFAULT_GAMMA,
            exposure_ev: 0.0,
        }
    }
}

/// How a selection with zero width or height is handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroAreaPolicy {
    /// Report an invalid region and stop.
    #[default]
    Reject,
    /// Capture the whole screen instead.
    FullScreen,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub zero_area: ZeroAreaPolicy,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnhancerBackend {
    /// Real-ESRGAN ncnn-vulkan executable, downloaded on first use.
    #[default]
    #[serde(rename = "realesrgan")]
    RealEsrgan,
    /// Plain Lanczos resampling, no model required.
    #[serde(rename = "lanczos")]
    Lanczos,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    pub backend: EnhancerBackend,
    /// Upscale factor
    pub scale: u32,
    /// Model name passed to the upscaler
    pub model: String,
    /// GPU index passed to the upscaler (None = let it choose)
    pub gpu_id: Option<i32>,
    /// Release archive containing the upscaler executable and models
    pub download_url: String,
    /// Saturation multiplier applied before upscaling
    pub saturation_boost: f32,
    /// CLAHE clip limit for the value channel
    pub clahe_clip_limit: f32,
    /// CLAHE tile grid size (tiles per side)
    pub clahe_tiles: u32,
    /// Value multiplier applied after upscaling
    pub highlight_gain: f32,
}

fn default_download_url() -> String {
    let platform = if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else {
        "ubuntu"
    };
    format!(
        "https://github.com/xinntao/Real-ESRGAN/releases/download/v0.2.5.0/realesrgan-ncnn-vulkan-20220424-{}.zip",
        platform
    )
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            backend: EnhancerBackend::RealEsrgan,
            scale: 4,
            model: "realesrgan-x4plus".to_string(),
            gpu_id: None,
            download_url: default_download_url(),
            saturation_boost: 1.5,
            clahe_clip_limit: 3.0,
            clahe_tiles: 8,
            highlight_gain: 1.2,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpg,
    Png,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the images are written to (created if absent)
    pub dir: String,
    pub format: ImageFormat,
    /// Keep the composite on disk even when enhancement fails
    pub save_original_on_enhance_failure: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
            format: ImageFormat::Jpg,
            save_original_on_enhance_failure: true,
        }
    }
}

impl AppConfig {
    /// Loads configuration from `path`, or returns defaults if it is missing or invalid.
    pub fn load(config_path: &Path) -> Self {
        crate::log(&format!("Looking for config at: {}", config_path.display()));

        if !config_path.exists() {
            crate::log("config.json not found. Using default config.");
            return Self::default();
        }

        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    crate::log(&format!("Config loaded from {}", config_path.display()));
                    config
                }
                Err(e) => {
                    crate::log(&format!(
                        "Failed to parse {}: {}. Using defaults.",
                        config_path.display(),
                        e
                    ));
                    Self::default()
                }
            },
            Err(e) => {
                crate::log(&format!(
                    "Failed to read {}: {}. Using defaults.",
                    config_path.display(),
                    e
                ));
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let json = r#"{ "composite": { "method": "max" }, "output": { "format": "png" } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.composite.method, CompositeMethod::Max);
        assert_eq!(config.composite.gamma, 0.95);
        assert_eq!(config.output.format, ImageFormat::Png);
        assert_eq!(config.output.dir, "output");
        assert_eq!(config.capture.fps, 30.0);
        assert_eq!(config.enhancer.scale, 4);
    }

    #[test]
    fn test_enum_spellings() {
        let json = r#"{
            "selection": { "zero_area": "full_screen" },
            "enhancer": { "backend": "lanczos", "gpu_id": 0 }
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.selection.zero_area, ZeroAreaPolicy::FullScreen);
        assert_eq!(config.enhancer.backend, EnhancerBackend::Lanczos);
        assert_eq!(config.enhancer.gpu_id, Some(0));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("missing.json"));

        assert_eq!(config.composite.method, CompositeMethod::Mean);
        assert!(config.output.save_original_on_enhance_failure);
    }

    #[test]
    fn test_load_invalid_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = AppConfig::load(&path);
        assert_eq!(config.capture.max_frames, 3600);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let shipped: AppConfig = serde_json::from_str(include_str!("../config.json")).unwrap();
        assert_eq!(
            serde_json::to_value(&shipped).unwrap(),
            serde_json::to_value(AppConfig::default()).unwrap()
        );
    }

    #[test]
    fn test_default_download_url_points_at_release() {
        let url = EnhancerConfig::default().download_url;
        assert!(url.starts_with("https://github.com/xinntao/Real-ESRGAN/releases/download/"));
        assert!(url.ends_with(".zip"));
    }
}
