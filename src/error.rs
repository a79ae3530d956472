//! Failure kinds reported by the pipeline.

use thiserror::Error;

use crate::selection::Rect;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The user aborted region selection. Not a system failure.
    #[error("region selection cancelled")]
    SelectionCancelled,

    #[error("region selection failed: {0:#}")]
    Selection(anyhow::Error),

    #[error("selected region {0} has zero area")]
    InvalidRegion(Rect),

    #[error("selected region {0} lies outside the {1}x{2} screen")]
    RegionOffScreen(Rect, u32, u32),

    #[error("no frames were captured")]
    EmptyCapture,

    #[error("capture failed: {0:#}")]
    Capture(anyhow::Error),

    #[error("image enhancement failed: {0:#}")]
    Enhancement(anyhow::Error),

    #[error("failed to write output: {0:#}")]
    Output(anyhow::Error),
}
