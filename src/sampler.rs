//! The frame-sampling state machine.
//!
//! A [`Sampler`] moves through
//! `AwaitingProgress → AwaitingPlayable → Sampling → Done`:
//!
//! - `AwaitingProgress` exists only with [`StartupStrategy::NudgePlayback`]:
//!   the first buffering progress triggers a play command.
//! - `AwaitingPlayable` waits until the element can play through, then seeks
//!   to `start`.
//! - In `Sampling`, every `CanPlayThrough` advances the position by
//!   `interval` and every `TimeUpdate` captures the current frame. A capture
//!   at or past the end (the duration, or `end` when set) settles the run
//!   without appending that frame.
//!
//! Thumbnails are labelled `start + interval * index`, not with the position
//! the decoder actually landed on, so labels stay evenly spaced even when
//! seeks snap to nearby frames.

use std::mem;
use std::sync::Arc;

use crate::capture::{Canvas, FrameEncoder, MAX_CANVAS_SIDE, encoder_for};
use crate::config::{SamplingOptions, StartupStrategy};
use crate::error::ThumbnailError;
use crate::machine::{EventMachine, Step};
use crate::media::{MediaElement, MediaEvent, ReadyState};
use crate::progress::{OperationType, ProgressCallback, ProgressTracker};
use crate::thumbnail::Thumbnail;

/// Output side for a frame dimension, truncated to whole pixels.
fn scaled_side(side: f64, scale: f64) -> Result<u32, ThumbnailError> {
    let scaled = side * scale;
    if scaled.is_nan() || scaled >= f64::from(MAX_CANVAS_SIDE) + 1.0 {
        return Err(ThumbnailError::Capture(format!(
            "scaled frame side {scaled} exceeds the {MAX_CANVAS_SIDE} px limit"
        )));
    }
    Ok(scaled as u32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SamplerState {
    AwaitingProgress,
    AwaitingPlayable,
    Sampling,
    Done,
}

/// Samples one thumbnail per interval from a media element.
pub struct Sampler<'a> {
    options: SamplingOptions,
    startup: StartupStrategy,
    state: SamplerState,
    started: bool,
    count: u64,
    thumbnails: Vec<Thumbnail>,
    canvas: &'a mut Canvas,
    encoder: Option<Box<dyn FrameEncoder>>,
    progress: Option<(Arc<dyn ProgressCallback>, u64)>,
    tracker: Option<ProgressTracker>,
}

impl<'a> Sampler<'a> {
    /// A sampler rendering through `canvas` with the given options.
    pub fn new(options: SamplingOptions, canvas: &'a mut Canvas) -> Self {
        Self {
            options,
            startup: StartupStrategy::Direct,
            state: SamplerState::AwaitingPlayable,
            started: false,
            count: 0,
            thumbnails: Vec::new(),
            canvas,
            encoder: None,
            progress: None,
            tracker: None,
        }
    }

    /// Choose how the run reaches a playable state.
    #[must_use]
    pub fn with_startup(mut self, startup: StartupStrategy) -> Self {
        self.startup = startup;
        self
    }

    /// Use a specific encoder instead of picking one from the element's
    /// capabilities.
    #[must_use]
    pub fn with_encoder(mut self, encoder: Box<dyn FrameEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// Report every `batch_size` appended thumbnails to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>, batch_size: u64) -> Self {
        self.progress = Some((callback, batch_size));
        self
    }

    /// Thumbnails captured so far.
    pub fn thumbnails(&self) -> &[Thumbnail] {
        &self.thumbnails
    }

    /// `true` once the run has resolved or failed.
    pub fn is_settled(&self) -> bool {
        self.state == SamplerState::Done
    }

    fn start_sampling<M: MediaElement>(&mut self, element: &mut M) {
        if let Some((callback, batch_size)) = &self.progress {
            self.tracker = Some(ProgressTracker::new(
                Arc::clone(callback),
                OperationType::Sampling,
                self.options.expected_count(element.duration()),
                *batch_size,
            ));
        }
        log::debug!(
            "Sampling every {}s from {}s (end: {:?}, duration: {}s)",
            self.options.interval,
            self.options.start,
            self.options.end,
            element.duration()
        );
        self.state = SamplerState::Sampling;
        self.started = true;
        element.set_current_time(self.options.start);
    }

    fn advance<M: MediaElement>(&mut self, element: &mut M) {
        let next = element.current_time() + self.options.interval;
        log::trace!("Advancing to {next}s");
        element.set_current_time(next);
    }

    fn capture<M: MediaElement>(
        &mut self,
        element: &M,
    ) -> Result<Step<Vec<Thumbnail>>, ThumbnailError> {
        let position = element.current_time();
        let duration = element.duration();
        let end = self.options.end.unwrap_or(duration);
        let is_ended = position >= duration || position >= end;

        let width = scaled_side(element.video_width(), self.options.scale)?;
        let height = scaled_side(element.video_height(), self.options.scale)?;
        self.canvas.set_size(width, height)?;
        if let Some(frame) = element.current_frame() {
            self.canvas.draw_image(frame, 0, 0, width, height);
        }

        let encoder = self
            .encoder
            .get_or_insert_with(|| encoder_for(element.capabilities()));
        let blob = encoder.encode(&*self.canvas, self.options.quality)?;
        self.canvas.clear();

        if is_ended {
            self.state = SamplerState::Done;
            if let Some(tracker) = self.tracker.as_mut() {
                tracker.finish();
            }
            log::info!(
                "Sampled {} thumbnails (stopped at {position}s)",
                self.thumbnails.len()
            );
            return Ok(Step::Done(mem::take(&mut self.thumbnails)));
        }

        let current_time = self.options.start + self.options.interval * self.count as f64;
        self.thumbnails.push(Thumbnail::new(current_time, blob));
        self.count += 1;
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.advance(Some(current_time));
        }
        Ok(Step::Pending)
    }

    fn dispatch<M: MediaElement>(
        &mut self,
        event: MediaEvent,
        element: &mut M,
    ) -> Result<Step<Vec<Thumbnail>>, ThumbnailError> {
        match (self.state, event) {
            (SamplerState::Done, _) => Ok(Step::Pending),
            (_, MediaEvent::Error) => Err(ThumbnailError::from_media_error(element.error())),
            (_, MediaEvent::Ended) => {
                self.state = SamplerState::Done;
                log::warn!(
                    "Playback ended before the sampler reached its end; keeping {} thumbnails",
                    self.thumbnails.len()
                );
                if let Some(tracker) = self.tracker.as_mut() {
                    tracker.finish();
                }
                Ok(Step::Done(mem::take(&mut self.thumbnails)))
            }
            (SamplerState::AwaitingProgress, MediaEvent::Progress) => {
                log::debug!("Nudging playback after buffering progress");
                element.play()?;
                self.state = SamplerState::AwaitingPlayable;
                Ok(Step::Pending)
            }
            (SamplerState::AwaitingPlayable, MediaEvent::CanPlayThrough) => {
                self.start_sampling(element);
                Ok(Step::Pending)
            }
            (SamplerState::Sampling, MediaEvent::CanPlayThrough) => {
                self.advance(element);
                Ok(Step::Pending)
            }
            (SamplerState::Sampling, MediaEvent::TimeUpdate) => self.capture(element),
            _ => Ok(Step::Pending),
        }
    }
}

impl<M: MediaElement> EventMachine<M> for Sampler<'_> {
    type Output = Vec<Thumbnail>;

    fn begin(&mut self, element: &mut M) -> Result<Step<Vec<Thumbnail>>, ThumbnailError> {
        if self.started || self.state == SamplerState::Done {
            return Ok(Step::Pending);
        }
        if let Err(error) = self.options.validate() {
            self.state = SamplerState::Done;
            return Err(error);
        }

        let ready_state = element.ready_state();
        self.state = match self.startup {
            StartupStrategy::Direct => SamplerState::AwaitingPlayable,
            StartupStrategy::NudgePlayback if ready_state >= ReadyState::HaveFutureData => {
                log::debug!("Data already buffered; nudging playback immediately");
                if let Err(error) = element.play() {
                    self.state = SamplerState::Done;
                    return Err(error);
                }
                SamplerState::AwaitingPlayable
            }
            StartupStrategy::NudgePlayback => SamplerState::AwaitingProgress,
        };

        if self.state == SamplerState::AwaitingPlayable
            && ready_state >= ReadyState::HaveEnoughData
        {
            self.start_sampling(element);
        }
        Ok(Step::Pending)
    }

    fn handle(
        &mut self,
        event: MediaEvent,
        element: &mut M,
    ) -> Result<Step<Vec<Thumbnail>>, ThumbnailError> {
        let step = self.dispatch(event, element);
        if step.is_err() {
            self.state = SamplerState::Done;
        }
        step
    }
}
