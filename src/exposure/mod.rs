//! Long-exposure image processing.
//!
//! This module provides:
//! - Frame compositing (`composite_with_gamma`) with max or mean reduction
//! - EV adjustment in L*a*b* (`adjust_exposure`)
//! - Colour-space helpers shared with the enhancer

pub mod adjust;
pub mod color;
pub mod composite;

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

pub use adjust::adjust_exposure;
pub use composite::{composite_with_gamma, DEFAULT_GAMMA};

/// Per-pixel reduction used to merge frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositeMethod {
    /// Brightest value wins; keeps light trails on dark backgrounds.
    Max,
    /// Arithmetic mean; smooth averaged exposure.
    #[default]
    Mean,
}

impl fmt::Display for CompositeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Max => write!(f, "max"),
            Self::Mean => write!(f, "mean"),
        }
    }
}

impl FromStr for CompositeMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "max" => Ok(Self::Max),
            "mean" => Ok(Self::Mean),
            other => Err(anyhow!("unknown composite method \"{}\"", other)),
        }
    }
}
