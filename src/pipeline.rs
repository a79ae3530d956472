//! End-to-end long-exposure run.
//!
//! Select region → capture → composite → (adjust) → enhance → save.
//! Every stage failure is caught here and turned into a [`RunOutcome`];
//! nothing propagates out of [`Pipeline::run`].

use anyhow::anyhow;
use image::RgbImage;
use std::path::PathBuf;
use std::time::Duration;

use crate::capture::{capture_frames, CaptureSchedule, Clock, ScreenSource};
use crate::config::{AppConfig, CaptureConfig, ZeroAreaPolicy};
use crate::enhance::Enhancer;
use crate::error::PipelineError;
use crate::exposure::{adjust_exposure, composite_with_gamma};
use crate::log;
use crate::output::{run_stamp, OutputKind, OutputSink};
use crate::selection::{Rect, RegionProvider};

/// Result of one run, as reported to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed {
        original: PathBuf,
        enhanced: PathBuf,
    },
    /// The user backed out of region selection.
    Cancelled,
    Failed {
        message: String,
        /// Composite saved before the failure, if any
        original: Option<PathBuf>,
    },
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn message(&self) -> String {
        match self {
            Self::Completed { original, enhanced } => format!(
                "Saved {} and {}",
                original.display(),
                enhanced.display()
            ),
            Self::Cancelled => "Cancelled".to_string(),
            Self::Failed {
                message,
                original: Some(path),
            } => format!("{} (composite kept at {})", message, path.display()),
            Self::Failed { message, .. } => message.clone(),
        }
    }

    /// Process exit code: 0 completed, 1 failed, 2 cancelled.
    pub fn exit_code(&self) -> u8 {
        match self {
            _ if self.succeeded() => 0,
            Self::Cancelled => 2,
            _ => 1,
        }
    }
}

/// Clamps the requested duration to the configured maximum.
///
/// Rejects durations that are not positive finite numbers.
pub fn capture_duration(requested_secs: f64, config: &CaptureConfig) -> Result<Duration, PipelineError> {
    if !requested_secs.is_finite() || requested_secs <= 0.0 {
        return Err(PipelineError::Capture(anyhow!(
            "capture duration must be a positive number of seconds, got {}",
            requested_secs
        )));
    }

    let mut secs = requested_secs;
    if config.max_duration_secs > 0.0 && secs > config.max_duration_secs {
        log(&format!(
            "Duration {:.2}s exceeds the limit, clamping to {:.2}s",
            secs, config.max_duration_secs
        ));
        secs = config.max_duration_secs;
    }

    Duration::try_from_secs_f64(secs).map_err(|e| PipelineError::Capture(e.into()))
}

/// The collaborators for one run, borrowed from the caller.
pub struct Pipeline<'a> {
    pub selector: &'a mut dyn RegionProvider,
    pub source: &'a mut dyn ScreenSource,
    pub clock: &'a mut dyn Clock,
    pub enhancer: &'a mut dyn Enhancer,
    pub sink: &'a mut dyn OutputSink,
    pub config: &'a AppConfig,
}

impl Pipeline<'_> {
    /// Runs every stage once. Never panics on stage failure.
    pub fn run(&mut self, duration_secs: f64) -> RunOutcome {
        let mut saved_original = None;

        match self.execute(duration_secs, &mut saved_original) {
            Ok((original, enhanced)) => {
                log("Long exposure completed");
                RunOutcome::Completed { original, enhanced }
            }
            Err(PipelineError::SelectionCancelled) => {
                log("Region selection cancelled, nothing captured");
                RunOutcome::Cancelled
            }
            Err(e) => {
                log(&format!("Long exposure failed: {}", e));
                RunOutcome::Failed {
                    message: e.to_string(),
                    original: saved_original,
                }
            }
        }
    }

    fn execute(
        &mut self,
        duration_secs: f64,
        saved_original: &mut Option<PathBuf>,
    ) -> Result<(PathBuf, PathBuf), PipelineError> {
        let region = self.select()?;
        let duration = capture_duration(duration_secs, &self.config.capture)?;

        let delay = Duration::from_millis(self.config.capture.start_delay_ms);
        if !delay.is_zero() {
            log(&format!("Starting capture in {}ms", delay.as_millis()));
            self.clock.sleep(delay);
        }

        let schedule = CaptureSchedule::from_config(&self.config.capture);
        let frames = capture_frames(&mut *self.source, &mut *self.clock, duration, region, &schedule);
        if frames.is_empty() {
            return Err(PipelineError::EmptyCapture);
        }
        if let Some((width, height)) = frames.dimensions() {
            log(&format!("Captured {} frames of {}x{}", frames.len(), width, height));
        }

        let composite = self.build_composite(frames.into_frames())?;

        let stamp = run_stamp();
        log(&format!("Enhancing with {}", self.enhancer.name()));
        let enhanced = match self.enhancer.enhance(&composite) {
            Ok(img) => img,
            Err(e) => {
                if self.config.output.save_original_on_enhance_failure {
                    match self.sink.save(OutputKind::Original, &stamp, &composite) {
                        Ok(path) => *saved_original = Some(path),
                        Err(save_err) => {
                            log(&format!("Could not keep composite: {:#}", save_err))
                        }
                    }
                }
                return Err(PipelineError::Enhancement(e));
            }
        };

        let original = self
            .sink
            .save(OutputKind::Original, &stamp, &composite)
            .map_err(PipelineError::Output)?;
        *saved_original = Some(original.clone());

        let enhanced = self
            .sink
            .save(OutputKind::Enhanced, &stamp, &enhanced)
            .map_err(PipelineError::Output)?;

        Ok((original, enhanced))
    }

    /// Returns the capture region, `None` meaning the whole screen.
    fn select(&mut self) -> Result<Option<Rect>, PipelineError> {
        log("Waiting for region selection");
        let rect = match self.selector.select_region() {
            Ok(Some(rect)) => rect,
            Ok(None) => return Err(PipelineError::SelectionCancelled),
            Err(e) => return Err(PipelineError::Selection(e)),
        };

        if !rect.is_empty() {
            log(&format!("Selected region: {}", rect));
            return self.fit_to_screen(rect).map(Some);
        }

        match self.config.selection.zero_area {
            ZeroAreaPolicy::Reject => Err(PipelineError::InvalidRegion(rect)),
            ZeroAreaPolicy::FullScreen => {
                log(&format!("Selected region {} is empty, capturing full screen", rect));
                Ok(None)
            }
        }
    }

    /// Clips a region to the screen so a grab never exceeds the screen size.
    fn fit_to_screen(&self, rect: Rect) -> Result<Rect, PipelineError> {
        let Some((width, height)) = self.source.screen_size() else {
            return Ok(rect);
        };

        let clipped = rect.clip_to(width, height);
        if clipped.is_empty() {
            return Err(PipelineError::RegionOffScreen(rect, width, height));
        }
        if clipped != rect {
            log(&format!("Region {} clipped to screen: {}", rect, clipped));
        }
        Ok(clipped)
    }

    /// Consumes the frames; they are released as soon as the composite exists.
    fn build_composite(&self, frames: Vec<RgbImage>) -> Result<RgbImage, PipelineError> {
        let settings = &self.config.composite;
        log(&format!(
            "Compositing {} frames ({}, gamma {})",
            frames.len(),
            settings.method,
            settings.gamma
        ));

        let composite = composite_with_gamma(&frames, settings.method, settings.gamma)
            .ok_or(PipelineError::EmptyCapture)?;
        drop(frames);

        if settings.exposure_ev != 0.0 {
            log(&format!("Adjusting exposure by {:+.2} EV", settings.exposure_ev));
            return Ok(adjust_exposure(&composite, settings.exposure_ev));
        }
        Ok(composite)
    }
}
