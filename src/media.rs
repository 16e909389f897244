//! The host media element abstraction.
//!
//! A [`MediaElement`] is anything that decodes a video and reports what it is
//! doing through [`MediaEvent`]s: metadata arriving, buffering progress,
//! enough data to play through, position updates after seeks or during
//! playback, natural end, and terminal errors. The probe and the sampler only
//! ever talk to the decoder through this trait, so they run unchanged against
//! the FFmpeg backend, a scripted test double, or an integration that forwards
//! events from some other player.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::future::Future;

use image::DynamicImage;

use crate::error::ThumbnailError;

/// Events a media element delivers while loading, seeking and playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaEvent {
    /// Dimensions and duration are known.
    LoadedMetadata,
    /// More media data was buffered.
    Progress,
    /// The element can play to the end without stalling.
    CanPlayThrough,
    /// The current playback position changed (after a seek or during
    /// playback) and the frame at that position is decoded.
    TimeUpdate,
    /// Playback reached the end of the media.
    Ended,
    /// A terminal error occurred; details are available from
    /// [`MediaElement::error`].
    Error,
}

/// How much of the media the element has available, in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ReadyState {
    /// Nothing is known about the media yet.
    #[default]
    HaveNothing,
    /// Dimensions and duration are known.
    HaveMetadata,
    /// The frame at the current position is decoded.
    HaveCurrentData,
    /// Data beyond the current position is buffered.
    HaveFutureData,
    /// Enough data is buffered to play through.
    HaveEnoughData,
}

/// Error details reported by a media element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaErrorInfo {
    /// Numeric error code (see the associated constants).
    pub code: u16,
    /// Human-readable details.
    pub message: String,
}

impl MediaErrorInfo {
    /// Fetching the media was aborted.
    pub const ABORTED: u16 = 1;
    /// A network error interrupted fetching.
    pub const NETWORK: u16 = 2;
    /// The media could not be decoded.
    pub const DECODE: u16 = 3;
    /// The source is not supported or could not be opened.
    pub const SRC_NOT_SUPPORTED: u16 = 4;

    /// Create error details from a code and message.
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl Display for MediaErrorInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "error {}; details: {}", self.code, self.message)
    }
}

/// Optional features of the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    /// Whether the host can encode a surface straight to an image blob.
    /// When `false` captures go through the data-URL fallback.
    pub blob_encoding: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            blob_encoding: true,
        }
    }
}

/// A decodable media resource driven by seek and play commands.
///
/// Positions and durations are floating-point seconds; dimensions are
/// floating-point pixels. A duration may be non-finite when the decoder does
/// not know it yet.
pub trait MediaElement {
    /// Width of the decoded video in pixels.
    fn video_width(&self) -> f64;

    /// Height of the decoded video in pixels.
    fn video_height(&self) -> f64;

    /// Duration in seconds. May be `f64::INFINITY` or NaN until a seek forces
    /// the decoder to recalculate it.
    fn duration(&self) -> f64;

    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    /// Seek to `seconds`. Completion is reported later through
    /// [`MediaEvent::TimeUpdate`].
    fn set_current_time(&mut self, seconds: f64);

    /// Start playback.
    fn play(&mut self) -> Result<(), ThumbnailError>;

    /// How much data is available.
    fn ready_state(&self) -> ReadyState;

    /// Details of the last terminal error, if the element has any.
    fn error(&self) -> Option<MediaErrorInfo>;

    /// The decoded frame at the current position.
    fn current_frame(&self) -> Option<&DynamicImage>;

    /// Optional host features.
    fn capabilities(&self) -> HostCapabilities {
        HostCapabilities::default()
    }

    /// Release any temporary resource created for the source. Called once
    /// playback ends or a terminal error is reported; must be idempotent.
    fn release_source(&mut self) {}

    /// Drop events that already fired but were never consumed.
    ///
    /// Called at the start of every operation so a new run does not react to
    /// events that fired while nothing was listening.
    fn clear_pending_events(&mut self) {}

    /// Wait for the next event. `None` means the element will never deliver
    /// another event.
    fn next_event(&mut self) -> impl Future<Output = Option<MediaEvent>>;
}
