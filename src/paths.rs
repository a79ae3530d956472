use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the default config file: `<exe_dir>/config.json`
pub fn get_config_path() -> PathBuf {
    get_exe_dir().join("config.json")
}

/// Returns the per-user directory for the upscaler: `<data_local>/screen-long-exposure/realesrgan/`
pub fn get_enhancer_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("screen-long-exposure")
        .join("realesrgan")
}

/// Fallback location used when the per-user directory cannot be written.
pub fn get_fallback_enhancer_dir() -> PathBuf {
    std::env::temp_dir().join("screen_long_exposure_models")
}

/// Resolves the output directory. Relative paths are taken from the working directory.
pub fn resolve_output_dir(dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(dir))
            .unwrap_or_else(|_| dir.to_path_buf())
    }
}

/// Ensures the logs directory exists. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    Ok(())
}

/// Returns true if a file can be created inside `dir`.
pub fn is_writable(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let marker = dir.join("test_write.tmp");
    match std::fs::write(&marker, b"test") {
        Ok(()) => {
            let _ = std::fs::remove_file(&marker);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_is_writable_creates_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        assert!(is_writable(&nested));
        assert!(nested.exists());
        assert!(!nested.join("test_write.tmp").exists());
    }

    #[test]
    fn test_resolve_output_dir_keeps_absolute() {
        let dir = tempdir().unwrap();
        assert_eq!(resolve_output_dir(dir.path()), dir.path().to_path_buf());
    }
}
