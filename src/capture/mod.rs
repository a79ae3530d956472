//! Screen capture.
//!
//! This module provides:
//! - The `ScreenSource` abstraction over screenshot providers
//! - A desktop grabber (`DesktopSource`)
//! - The timed multi-frame capture loop (`capture_frames`)

pub mod screen;
pub mod session;

use anyhow::Result;
use image::RgbImage;

use crate::selection::Rect;

pub use screen::DesktopSource;
pub use session::{capture_frames, CaptureSchedule, Clock, SystemClock};

/// One captured screenshot: 3-channel 8-bit RGB.
pub type Frame = RgbImage;

/// Returns the current screen contents of `region`, or the whole screen for `None`.
pub trait ScreenSource {
    fn grab(&mut self, region: Option<Rect>) -> Result<Frame>;

    /// Full screen size in pixels, when the source knows it.
    fn screen_size(&self) -> Option<(u32, u32)> {
        None
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use anyhow::anyhow;
    use image::Rgb;
    use std::time::{Duration, Instant};

    /// Returns a solid-colour frame on every call.
    pub struct SolidSource {
        pub color: [u8; 3],
        pub full_size: (u32, u32),
        pub calls: usize,
    }

    impl SolidSource {
        pub fn new(color: [u8; 3], full_size: (u32, u32)) -> Self {
            Self {
                color,
                full_size,
                calls: 0,
            }
        }
    }

    impl ScreenSource for SolidSource {
        fn grab(&mut self, region: Option<Rect>) -> Result<Frame> {
            self.calls += 1;
            let (w, h) = region
                .map(|r| (r.width, r.height))
                .unwrap_or(self.full_size);
            Ok(RgbImage::from_pixel(w, h, Rgb(self.color)))
        }

        fn screen_size(&self) -> Option<(u32, u32)> {
            Some(self.full_size)
        }
    }

    /// Virtual clock: `sleep` advances time instantly.
    pub struct ManualClock {
        base: Instant,
        offset: Duration,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: Duration::ZERO,
            }
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + self.offset
        }

        fn sleep(&mut self, duration: Duration) {
            self.offset += duration;
        }
    }

    /// Fails on every call.
    pub struct BrokenSource;

    impl ScreenSource for BrokenSource {
        fn grab(&mut self, _region: Option<Rect>) -> Result<Frame> {
            Err(anyhow!("screen unavailable"))
        }
    }
}
