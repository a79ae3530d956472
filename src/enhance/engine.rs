use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::UpscalerPaths;
use crate::config::EnhancerConfig;

/// Runs the upscaler executable on `img` and returns the upscaled image.
///
/// The image goes through temporary PNG files on both sides.
pub fn run_upscaler(
    paths: &UpscalerPaths,
    img: &RgbImage,
    config: &EnhancerConfig,
) -> Result<RgbImage> {
    let temp_input = NamedTempFile::with_suffix(".png")?;
    img.save(temp_input.path())
        .context("Failed to write upscaler input")?;

    let temp_output = NamedTempFile::with_suffix(".png")?;

    let output = Command::new(&paths.executable)
        .args(build_args(
            temp_input.path(),
            temp_output.path(),
            paths.models.as_deref(),
            config,
        ))
        .output()
        .with_context(|| format!("Failed to start {}", paths.executable.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("Upscaler failed ({}): {}", output.status, stderr.trim()));
    }

    let upscaled = image::open(temp_output.path())
        .map_err(|e| anyhow!("Failed to read upscaler output: {}", e))?;

    Ok(upscaled.to_rgb8())
}

/// Command-line arguments for one upscaler run.
pub fn build_args(
    input: &Path,
    output: &Path,
    models: Option<&Path>,
    config: &EnhancerConfig,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-i".into(),
        input.into(),
        "-o".into(),
        output.into(),
        "-n".into(),
        config.model.as_str().into(),
        "-s".into(),
        config.scale.to_string().into(),
    ];
    if let Some(gpu) = config.gpu_id {
        args.push("-g".into());
        args.push(gpu.to_string().into());
    }
    if let Some(models) = models {
        args.push("-m".into());
        args.push(models.into());
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn as_strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().to_string()).collect()
    }

    #[test]
    fn test_build_args_defaults() {
        let config = EnhancerConfig::default();
        let args = build_args(Path::new("in.png"), Path::new("out.png"), None, &config);

        assert_eq!(
            as_strings(&args),
            vec!["-i", "in.png", "-o", "out.png", "-n", "realesrgan-x4plus", "-s", "4"]
        );
    }

    #[test]
    fn test_build_args_with_gpu_and_models() {
        let config = EnhancerConfig {
            gpu_id: Some(1),
            scale: 2,
            model: "realesrgan-x4plus-anime".to_string(),
            ..Default::default()
        };
        let models = PathBuf::from("models");
        let args = build_args(Path::new("a.png"), Path::new("b.png"), Some(&models), &config);

        let args = as_strings(&args);
        assert_eq!(&args[4..8], ["-n", "realesrgan-x4plus-anime", "-s", "2"]);
        assert_eq!(&args[8..], ["-g", "1", "-m", "models"]);
    }

    #[test]
    fn test_missing_executable_is_error() {
        let paths = UpscalerPaths {
            executable: PathBuf::from("definitely-not-an-upscaler-binary"),
            models: None,
        };
        let img = RgbImage::new(4, 4);
        let err = run_upscaler(&paths, &img, &EnhancerConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Failed to start"));
    }
}
