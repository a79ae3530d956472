//! Timed multi-frame capture loop.
//!
//! Grabs frames until the requested duration has elapsed, sleeping a fixed
//! interval between grabs. The cadence is best effort: real spacing is the
//! interval plus the grab latency. Time is read through [`Clock`] so the loop
//! can be driven with virtual time.

use anyhow::{anyhow, Result};
use std::time::{Duration, Instant};

use super::{Frame, ScreenSource};
use crate::config::CaptureConfig;
use crate::selection::Rect;

/// Source of time for the capture loop.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&mut self, duration: Duration);
}

/// Wall-clock time with real sleeps.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Fixed-interval scheduling policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureSchedule {
    /// Pause after each grab
    pub interval: Duration,
    /// Capture stops once this many frames are held
    pub max_frames: usize,
    /// Capture stops once held frames would exceed this many bytes
    pub max_buffer_bytes: u64,
}

const DEFAULT_FPS: f64 = 30.0;

impl CaptureSchedule {
    pub fn from_config(config: &CaptureConfig) -> Self {
        let fallback = Duration::from_secs_f64(1.0 / DEFAULT_FPS);
        let interval = if config.fps > 0.0 {
            Duration::try_from_secs_f64(1.0 / config.fps).unwrap_or_else(|_| {
                crate::log(&format!(
                    "fps {} is out of range, using {}",
                    config.fps, DEFAULT_FPS
                ));
                fallback
            })
        } else {
            fallback
        };

        Self {
            interval,
            max_frames: config.max_frames.max(1),
            max_buffer_bytes: config.max_buffer_mb.saturating_mul(1024 * 1024),
        }
    }

    /// Frames allowed for frames of `size`: the tighter of the count and byte limits.
    ///
    /// Always at least one, so a single oversized frame is still captured.
    pub fn frame_limit(&self, size: Option<(u32, u32)>) -> usize {
        let Some((width, height)) = size else {
            return self.max_frames;
        };
        let frame_bytes = (width as u64 * height as u64 * 3).max(1);
        let by_bytes = (self.max_buffer_bytes / frame_bytes).max(1);
        self.max_frames.min(usize::try_from(by_bytes).unwrap_or(usize::MAX))
    }
}

impl Default for CaptureSchedule {
    fn default() -> Self {
        Self::from_config(&CaptureConfig::default())
    }
}

/// Frames captured in one session, in capture order. All frames share one size.
#[derive(Debug, Default)]
pub struct FrameSequence {
    frames: Vec<Frame>,
}

impl FrameSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a frame. Fails if its size differs from the first frame.
    pub fn push(&mut self, frame: Frame) -> Result<()> {
        if let Some(first) = self.frames.first() {
            if first.dimensions() != frame.dimensions() {
                return Err(anyhow!(
                    "frame size {:?} does not match session size {:?}",
                    frame.dimensions(),
                    first.dimensions()
                ));
            }
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Size shared by every frame, if any were captured.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.frames.first().map(|f| f.dimensions())
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

/// Captures frames of `region` (whole screen for `None`) for `duration`.
///
/// The loop checks the elapsed time before each grab, so it may overrun by
/// at most one grab plus one interval. Failed grabs are logged and skipped;
/// if every grab fails the returned sequence is empty.
pub fn capture_frames(
    source: &mut dyn ScreenSource,
    clock: &mut dyn Clock,
    duration: Duration,
    region: Option<Rect>,
    schedule: &CaptureSchedule,
) -> FrameSequence {
    let mut frames = FrameSequence::new();
    let mut failed = 0usize;

    crate::log(&format!(
        "Capturing {} for {:.2}s (interval {}ms)",
        region.map_or_else(|| "full screen".to_string(), |r| r.to_string()),
        duration.as_secs_f64(),
        schedule.interval.as_millis()
    ));

    let start = clock.now();
    while clock.now().duration_since(start) < duration {
        let limit = schedule.frame_limit(frames.dimensions());
        if frames.len() >= limit {
            crate::log(&format!(
                "Frame limit reached ({} frames, {} MB budget), stopping capture early",
                limit,
                schedule.max_buffer_bytes / (1024 * 1024)
            ));
            break;
        }

        match source.grab(region).and_then(|frame| frames.push(frame)) {
            Ok(()) => {}
            Err(e) => {
                if failed == 0 {
                    crate::log(&format!("Frame capture failed: {:#}", e));
                }
                failed += 1;
            }
        }

        clock.sleep(schedule.interval);
    }

    crate::log(&format!(
        "Capture finished: {} frames in {:.2}s ({} failed)",
        frames.len(),
        clock.now().duration_since(start).as_secs_f64(),
        failed
    ));

    frames
}
