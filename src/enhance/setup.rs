use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::config::EnhancerConfig;
use crate::log;
use crate::paths;

/// Locations of a ready-to-run upscaler.
#[derive(Debug, Clone)]
pub struct UpscalerPaths {
    pub executable: PathBuf,
    /// Model directory passed with `-m`, when one sits next to the executable
    pub models: Option<PathBuf>,
}

/// Executable name inside the release archive.
pub fn executable_name() -> &'static str {
    if cfg!(windows) {
        "realesrgan-ncnn-vulkan.exe"
    } else {
        "realesrgan-ncnn-vulkan"
    }
}

/// Ensures the upscaler is installed. Downloads if necessary.
///
/// Looks in the per-user data directory, then the temp fallback, then `PATH`.
/// Only downloads when none of them has it.
pub fn ensure_upscaler(config: &EnhancerConfig) -> Result<UpscalerPaths> {
    let primary = paths::get_enhancer_dir();
    let fallback = paths::get_fallback_enhancer_dir();

    for dir in [&primary, &fallback] {
        if let Some(executable) = find_executable(dir) {
            log(&format!("Upscaler found at: {}", executable.display()));
            return Ok(upscaler_paths(executable));
        }
    }

    if let Some(executable) = find_in_path() {
        log(&format!("Upscaler found in PATH: {}", executable.display()));
        return Ok(upscaler_paths(executable));
    }

    log("Upscaler not found locally, downloading...");

    let install_dir = if paths::is_writable(&primary) {
        primary
    } else {
        log(&format!(
            "{} is not writable, using {}",
            primary.display(),
            fallback.display()
        ));
        fallback
    };

    download_and_extract(&config.download_url, &install_dir)?;

    let executable = find_executable(&install_dir).ok_or_else(|| {
        anyhow!(
            "{} not found in downloaded archive ({})",
            executable_name(),
            install_dir.display()
        )
    })?;
    make_executable(&executable)?;

    log(&format!("Upscaler ready at: {}", executable.display()));
    Ok(upscaler_paths(executable))
}

fn upscaler_paths(executable: PathBuf) -> UpscalerPaths {
    let models = executable
        .parent()
        .map(|dir| dir.join("models"))
        .filter(|dir| dir.is_dir());
    UpscalerPaths { executable, models }
}

/// Downloads the release archive and unpacks it into `dest`.
fn download_and_extract(url: &str, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create {}", dest.display()))?;

    log(&format!("Downloading {}", url));

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(url)
        .header("User-Agent", "screen-long-exposure")
        .send()
        .context("Failed to download upscaler")?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download upscaler: HTTP {}",
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    log(&format!("Downloaded upscaler archive ({} bytes)", bytes.len()));

    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).context("Upscaler archive is not a valid zip")?;
    archive
        .extract(dest)
        .with_context(|| format!("Failed to extract upscaler into {}", dest.display()))?;

    Ok(())
}

/// Finds the executable in `dir` or up to two levels below it.
///
/// Release archives unpack either flat or into a versioned subfolder.
pub fn find_executable(dir: &Path) -> Option<PathBuf> {
    find_executable_at_depth(dir, 2)
}

fn find_executable_at_depth(dir: &Path, depth: usize) -> Option<PathBuf> {
    let candidate = dir.join(executable_name());
    if candidate.is_file() {
        return Some(candidate);
    }
    if depth == 0 {
        return None;
    }

    let mut subdirs: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    subdirs.sort();

    subdirs
        .iter()
        .find_map(|sub| find_executable_at_depth(sub, depth - 1))
}

fn find_in_path() -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(executable_name()))
        .find(|candidate| candidate.is_file())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    fs::set_permissions(path, permissions)
        .with_context(|| format!("Failed to mark {} executable", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_executable_name_matches_platform() {
        assert!(executable_name().starts_with("realesrgan-ncnn-vulkan"));
        assert_eq!(executable_name().ends_with(".exe"), cfg!(windows));
    }

    #[test]
    fn test_find_executable_flat() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(executable_name()), b"bin").unwrap();

        assert_eq!(
            find_executable(dir.path()),
            Some(dir.path().join(executable_name()))
        );
    }

    #[test]
    fn test_find_executable_in_release_subfolder() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("realesrgan-ncnn-vulkan-20220424-ubuntu");
        fs::create_dir_all(nested.join("models")).unwrap();
        fs::write(nested.join(executable_name()), b"bin").unwrap();

        let found = find_executable(dir.path()).unwrap();
        assert_eq!(found, nested.join(executable_name()));

        let paths = upscaler_paths(found);
        assert_eq!(paths.models, Some(nested.join("models")));
    }

    #[test]
    fn test_find_executable_depth_limit() {
        let dir = tempdir().unwrap();
        let deep = dir.path().join("a").join("b").join("c");
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join(executable_name()), b"bin").unwrap();

        assert!(find_executable(dir.path()).is_none());
    }

    #[test]
    fn test_missing_models_dir_is_none() {
        let dir = tempdir().unwrap();
        let exe = dir.path().join(executable_name());
        fs::write(&exe, b"bin").unwrap();

        assert!(upscaler_paths(exe).models.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_make_executable_sets_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let exe = dir.path().join(executable_name());
        fs::write(&exe, b"bin").unwrap();
        make_executable(&exe).unwrap();

        let mode = fs::metadata(&exe).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}
