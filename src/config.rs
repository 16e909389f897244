//! Sampling and session configuration.
//!
//! [`SamplingOptions`] controls which timestamps are sampled and how each
//! frame is rendered. A session keeps one set of options and merges every
//! call's [`SamplingOverrides`] into it, so values set once stick for later
//! calls on the same session.
//!
//! [`SessionOptions`] threads host-integration settings (progress callbacks,
//! cancellation, startup strategy) through a session without growing every
//! method signature.
//!
//! # Example
//!
//! ```no_run
//! use vidthumb::{SamplingOverrides, Session, SessionOptions, StartupStrategy};
//!
//! # async fn example() -> Result<(), vidthumb::ThumbnailError> {
//! let mut session = Session::open("input.mp4")?
//!     .with_session_options(SessionOptions::new().with_startup(StartupStrategy::NudgePlayback));
//!
//! let overrides = SamplingOverrides::new().interval(2.0).end(10.0);
//! let thumbnails = session.thumbnails(Some(overrides)).await?;
//! # Ok(())
//! # }
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::error::ThumbnailError;
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Sampling options for a thumbnail run.
///
/// Defaults: `quality = 0.7`, `interval = 1.0`, `scale = 0.7`, `start = 0.0`,
/// `end = None` (the full duration).
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct SamplingOptions {
    /// Encoder quality between 0 and 1.
    pub quality: f64,
    /// Seconds between samples.
    pub interval: f64,
    /// Output size multiplier applied to the video dimensions.
    pub scale: f64,
    /// Timestamp of the first sample, in seconds.
    pub start: f64,
    /// Timestamp at which sampling stops. `None` samples to the end.
    pub end: Option<f64>,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            quality: 0.7,
            interval: 1.0,
            scale: 0.7,
            start: 0.0,
            end: None,
        }
    }
}

impl SamplingOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the encoder quality (0–1).
    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality = quality;
        self
    }

    /// Set the seconds between samples.
    pub fn with_interval(mut self, interval: f64) -> Self {
        self.interval = interval;
        self
    }

    /// Set the output size multiplier.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Set the first sample timestamp.
    pub fn with_start(mut self, start: f64) -> Self {
        self.start = start;
        self
    }

    /// Set the timestamp at which sampling stops.
    pub fn with_end(mut self, end: f64) -> Self {
        self.end = Some(end);
        self
    }

    /// Shallow-merge `overrides` into these options. Only the values the
    /// overrides carry are replaced.
    pub fn merge(&mut self, overrides: &SamplingOverrides) {
        if let Some(quality) = overrides.quality {
            self.quality = quality;
        }
        if let Some(interval) = overrides.interval {
            self.interval = interval;
        }
        if let Some(scale) = overrides.scale {
            self.scale = scale;
        }
        if let Some(start) = overrides.start {
            self.start = start;
        }
        if overrides.end.is_some() {
            self.end = overrides.end;
        }
    }

    /// Check every value before a run starts.
    ///
    /// # Errors
    ///
    /// [`ThumbnailError::InvalidInterval`] for a non-positive interval,
    /// [`ThumbnailError::InvalidOption`] for an out-of-range quality, scale
    /// or start, and [`ThumbnailError::InvalidRange`] when `end <= start`.
    pub fn validate(&self) -> Result<(), ThumbnailError> {
        if !self.interval.is_finite() || self.interval <= 0.0 {
            return Err(ThumbnailError::InvalidInterval);
        }
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(ThumbnailError::InvalidOption {
                name: "quality",
                reason: format!("{} is outside 0..=1", self.quality),
            });
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(ThumbnailError::InvalidOption {
                name: "scale",
                reason: format!("{} must be a finite number greater than zero", self.scale),
            });
        }
        if !self.start.is_finite() || self.start < 0.0 {
            return Err(ThumbnailError::InvalidOption {
                name: "start",
                reason: format!("{} must be a finite, non-negative timestamp", self.start),
            });
        }
        if let Some(end) = self.end {
            if end.is_nan() || end <= self.start {
                return Err(ThumbnailError::InvalidRange {
                    start: self.start,
                    end,
                });
            }
        }
        Ok(())
    }

    /// Expected number of thumbnails for a video of `duration` seconds, when
    /// that duration is known.
    pub(crate) fn expected_count(&self, duration: f64) -> Option<u64> {
        let end = self.end.map_or(duration, |end| end.min(duration));
        if !end.is_finite() || self.interval <= 0.0 {
            return None;
        }
        Some(((end - self.start) / self.interval).ceil().max(0.0) as u64)
    }
}

/// Per-call overrides merged into a session's [`SamplingOptions`].
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct SamplingOverrides {
    /// Replacement encoder quality.
    pub quality: Option<f64>,
    /// Replacement interval.
    pub interval: Option<f64>,
    /// Replacement scale.
    pub scale: Option<f64>,
    /// Replacement first sample timestamp.
    pub start: Option<f64>,
    /// Replacement stop timestamp.
    pub end: Option<f64>,
}

impl SamplingOverrides {
    /// No overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the encoder quality.
    pub fn quality(mut self, quality: f64) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Override the interval.
    pub fn interval(mut self, interval: f64) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Override the scale.
    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Override the first sample timestamp.
    pub fn start(mut self, start: f64) -> Self {
        self.start = Some(start);
        self
    }

    /// Override the stop timestamp.
    pub fn end(mut self, end: f64) -> Self {
        self.end = Some(end);
        self
    }
}

impl From<SamplingOptions> for SamplingOverrides {
    fn from(options: SamplingOptions) -> Self {
        Self {
            quality: Some(options.quality),
            interval: Some(options.interval),
            scale: Some(options.scale),
            start: Some(options.start),
            end: options.end,
        }
    }
}

/// How a sampling run gets the element to a playable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartupStrategy {
    /// Wait for the element to report it can play through.
    #[default]
    Direct,
    /// Wait for buffering progress, issue a play command, then wait for the
    /// element to report it can play through. For hosts that never report
    /// playability without a playback nudge.
    NudgePlayback,
}

/// Host-integration settings for a [`Session`](crate::Session).
#[derive(Clone)]
pub struct SessionOptions {
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) startup: StartupStrategy,
    pub(crate) batch_size: u64,
}

impl Debug for SessionOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SessionOptions")
            .field("has_cancellation", &self.cancellation.is_some())
            .field("startup", &self.startup)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionOptions {
    /// No progress callback, no cancellation, direct startup, batch size 1.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            startup: StartupStrategy::Direct,
            batch_size: 1,
        }
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Choose how sampling runs reach a playable state.
    #[must_use]
    pub fn with_startup(mut self, startup: StartupStrategy) -> Self {
        self.startup = startup;
        self
    }

    /// Report progress every `size` thumbnails. Clamped to at least 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// The configured startup strategy.
    pub fn startup(&self) -> StartupStrategy {
        self.startup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let options = SamplingOptions::default();
        assert_eq!(options.quality, 0.7);
        assert_eq!(options.interval, 1.0);
        assert_eq!(options.scale, 0.7);
        assert_eq!(options.start, 0.0);
        assert_eq!(options.end, None);
    }

    #[test]
    fn merge_replaces_only_present_values() {
        let mut options = SamplingOptions::default();
        options.merge(&SamplingOverrides::new().interval(2.5).end(10.0));
        assert_eq!(options.interval, 2.5);
        assert_eq!(options.end, Some(10.0));
        assert_eq!(options.quality, 0.7);

        options.merge(&SamplingOverrides::new().start(1.0));
        assert_eq!(options.start, 1.0);
        assert_eq!(options.interval, 2.5, "earlier override persists");
        assert_eq!(options.end, Some(10.0));
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(matches!(
            SamplingOptions::new().with_interval(0.0).validate(),
            Err(ThumbnailError::InvalidInterval)
        ));
        assert!(matches!(
            SamplingOptions::new().with_interval(f64::NAN).validate(),
            Err(ThumbnailError::InvalidInterval)
        ));
        assert!(matches!(
            SamplingOptions::new().with_quality(1.5).validate(),
            Err(ThumbnailError::InvalidOption { name: "quality", .. })
        ));
        assert!(matches!(
            SamplingOptions::new().with_scale(0.0).validate(),
            Err(ThumbnailError::InvalidOption { name: "scale", .. })
        ));
        assert!(matches!(
            SamplingOptions::new().with_start(-1.0).validate(),
            Err(ThumbnailError::InvalidOption { name: "start", .. })
        ));
        assert!(matches!(
            SamplingOptions::new().with_start(5.0).with_end(5.0).validate(),
            Err(ThumbnailError::InvalidRange { .. })
        ));
        assert!(SamplingOptions::new().with_start(2.0).with_end(5.0).validate().is_ok());
    }

    #[test]
    fn expected_count_uses_end_or_duration() {
        let options = SamplingOptions::new();
        assert_eq!(options.expected_count(5.0), Some(5));
        assert_eq!(options.expected_count(4.5), Some(5));
        assert_eq!(options.expected_count(f64::INFINITY), None);

        let bounded = SamplingOptions::new().with_start(2.0).with_end(5.0);
        assert_eq!(bounded.expected_count(10.0), Some(3));
    }

    #[test]
    fn session_options_debug_and_clamp() {
        let options = SessionOptions::new().with_batch_size(0);
        let debug = format!("{options:?}");
        assert!(debug.contains("has_cancellation: false"));
        assert!(debug.contains("batch_size: 1"));
        assert!(debug.contains("Direct"));
    }
}
