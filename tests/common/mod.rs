//! A scripted media element for driving the probe and sampler in tests.
//!
//! `ScriptedElement` behaves like a browser video element with every frame
//! already buffered: loading emits the usual lifecycle events, every seek
//! answers with `TimeUpdate` then `CanPlayThrough`, and failures can be
//! injected at a given position.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::pending;

use image::{DynamicImage, Rgb, RgbImage};
use vidthumb::{
    HostCapabilities, MediaElement, MediaErrorInfo, MediaEvent, ReadyState, ThumbnailError,
};

#[derive(Debug)]
pub struct ScriptedElement {
    width: f64,
    height: f64,
    duration: f64,
    real_duration: f64,
    current_time: f64,
    frame: DynamicImage,
    ready_state: ReadyState,
    error: Option<MediaErrorInfo>,
    lifecycle: VecDeque<MediaEvent>,
    pending: VecDeque<MediaEvent>,
    capabilities: HostCapabilities,
    requires_nudge: bool,
    error_at: Option<f64>,
    ended_after_seeks: Option<usize>,
    stall_when_idle: bool,

    pub seeks: Vec<f64>,
    pub plays: u32,
    pub releases: u32,
    /// When set, `play` is refused by the host.
    pub reject_play: bool,
}

/// The solid colour every frame at `seconds` is painted with.
pub fn frame_color(seconds: f64) -> [u8; 3] {
    [((seconds * 20.0) as u64 % 256) as u8, 64, 128]
}

fn frame_at(width: f64, height: f64, seconds: f64) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(
        width.max(1.0) as u32,
        height.max(1.0) as u32,
        Rgb(frame_color(seconds)),
    ))
}

impl ScriptedElement {
    /// A finite-duration video that loads normally.
    pub fn new(width: f64, height: f64, duration: f64) -> Self {
        Self {
            width,
            height,
            duration,
            real_duration: duration,
            current_time: 0.0,
            frame: frame_at(width, height, 0.0),
            ready_state: ReadyState::HaveNothing,
            error: None,
            lifecycle: VecDeque::from([
                MediaEvent::LoadedMetadata,
                MediaEvent::Progress,
                MediaEvent::CanPlayThrough,
            ]),
            pending: VecDeque::new(),
            capabilities: HostCapabilities::default(),
            requires_nudge: false,
            error_at: None,
            ended_after_seeks: None,
            stall_when_idle: false,
            seeks: Vec::new(),
            plays: 0,
            releases: 0,
            reject_play: false,
        }
    }

    /// Reports an infinite duration until a seek reveals `real_duration`.
    pub fn with_unknown_duration(mut self) -> Self {
        self.duration = f64::INFINITY;
        self
    }

    /// Never reports `CanPlayThrough` until playback is started.
    pub fn requiring_nudge(mut self) -> Self {
        self.requires_nudge = true;
        self.lifecycle.retain(|event| *event != MediaEvent::CanPlayThrough);
        self
    }

    /// Seeks to `seconds` or later fail with a decode error.
    pub fn failing_at(mut self, seconds: f64) -> Self {
        self.error_at = Some(seconds);
        self
    }

    /// The `count`-th seek reports `Ended` instead of a position update.
    pub fn ending_after_seeks(mut self, count: usize) -> Self {
        self.ended_after_seeks = Some(count);
        self
    }

    /// Loading fails with `code` before any metadata arrives.
    pub fn failing_to_load(mut self, code: Option<u16>) -> Self {
        self.error = code.map(|code| MediaErrorInfo::new(code, "scripted load failure"));
        self.lifecycle = VecDeque::from([MediaEvent::Error]);
        self
    }

    /// Playback ends before metadata is reported.
    pub fn ending_immediately(mut self) -> Self {
        self.lifecycle = VecDeque::from([MediaEvent::Ended]);
        self
    }

    /// Delivers no lifecycle events at all.
    pub fn silent(mut self) -> Self {
        self.lifecycle.clear();
        self
    }

    /// Wait forever instead of closing the event stream when idle.
    pub fn stalling(mut self) -> Self {
        self.stall_when_idle = true;
        self
    }

    pub fn without_blob_encoding(mut self) -> Self {
        self.capabilities = HostCapabilities {
            blob_encoding: false,
        };
        self
    }

    /// Queue an event as if it fired while nobody was listening.
    pub fn inject(&mut self, event: MediaEvent) {
        self.pending.push_back(event);
    }
}

impl MediaElement for ScriptedElement {
    fn video_width(&self) -> f64 {
        self.width
    }

    fn video_height(&self) -> f64 {
        self.height
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.seeks.push(seconds);

        if self.ended_after_seeks == Some(self.seeks.len()) {
            self.pending.push_back(MediaEvent::Ended);
            return;
        }
        if self.error_at.is_some_and(|at| seconds >= at) {
            self.error = Some(MediaErrorInfo::new(
                MediaErrorInfo::DECODE,
                format!("scripted decode failure at {seconds}s"),
            ));
            self.pending.push_back(MediaEvent::Error);
            return;
        }

        if !self.duration.is_finite() {
            self.duration = self.real_duration;
        }
        self.current_time = seconds.clamp(0.0, self.duration);
        self.frame = frame_at(self.width, self.height, self.current_time);
        self.pending.extend([MediaEvent::TimeUpdate, MediaEvent::CanPlayThrough]);
    }

    fn play(&mut self) -> Result<(), ThumbnailError> {
        self.plays += 1;
        if self.reject_play {
            return Err(ThumbnailError::Decode(MediaErrorInfo::new(
                MediaErrorInfo::ABORTED,
                "scripted play rejection",
            )));
        }
        if self.requires_nudge {
            self.pending.push_back(MediaEvent::CanPlayThrough);
        }
        Ok(())
    }

    fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    fn error(&self) -> Option<MediaErrorInfo> {
        self.error.clone()
    }

    fn current_frame(&self) -> Option<&DynamicImage> {
        Some(&self.frame)
    }

    fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    fn release_source(&mut self) {
        self.releases += 1;
    }

    fn clear_pending_events(&mut self) {
        self.pending.clear();
    }

    async fn next_event(&mut self) -> Option<MediaEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        if let Some(event) = self.lifecycle.pop_front() {
            self.ready_state = match event {
                MediaEvent::LoadedMetadata => ReadyState::HaveMetadata,
                MediaEvent::Progress => ReadyState::HaveFutureData,
                MediaEvent::CanPlayThrough => ReadyState::HaveEnoughData,
                _ => self.ready_state,
            };
            return Some(event);
        }
        if self.stall_when_idle {
            pending::<()>().await;
        }
        None
    }
}
