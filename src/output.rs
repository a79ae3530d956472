//! Persisting results.
//!
//! Each run writes two files that share a timestamp:
//! `original_<stamp>.<ext>` (the composite) and `ai_enhanced_<stamp>.<ext>`.

use anyhow::{Context, Result};
use chrono::Local;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::config::ImageFormat;
use crate::log;

const JPEG_QUALITY: u8 = 95;

/// Which of the two run results is being saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Original,
    Enhanced,
}

impl OutputKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Enhanced => "ai_enhanced",
        }
    }
}

/// Timestamp shared by both files of one run.
pub fn run_stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

pub trait OutputSink {
    /// Persists `img` and returns where it went.
    fn save(&mut self, kind: OutputKind, stamp: &str, img: &RgbImage) -> Result<PathBuf>;
}

/// Writes images into a directory, creating it on first save.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    format: ImageFormat,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>, format: ImageFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(&self, kind: OutputKind, stamp: &str) -> String {
        format!("{}_{}.{}", kind.prefix(), stamp, self.format.extension())
    }
}

impl OutputSink for DirectorySink {
    fn save(&mut self, kind: OutputKind, stamp: &str, img: &RgbImage) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let path = self.dir.join(self.file_name(kind, stamp));
        match self.format {
            ImageFormat::Jpg => {
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), JPEG_QUALITY);
                img.write_with_encoder(encoder)
                    .with_context(|| format!("Failed to encode {}", path.display()))?;
            }
            ImageFormat::Png => {
                img.save(&path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
        }

        log(&format!("Saved to {}", path.display()));
        Ok(path)
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Keeps what would have been written, in memory.
    #[derive(Default)]
    pub struct RecordingSink {
        pub saved: Vec<(OutputKind, RgbImage)>,
    }

    impl OutputSink for RecordingSink {
        fn save(&mut self, kind: OutputKind, stamp: &str, img: &RgbImage) -> Result<PathBuf> {
            self.saved.push((kind, img.clone()));
            Ok(PathBuf::from(format!("{}_{}", kind.prefix(), stamp)))
        }
    }
}
