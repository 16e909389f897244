//! Error types for the `vidthumb` crate.
//!
//! This module defines [`ThumbnailError`], the unified error type returned by
//! every fallible operation in the crate. Decode failures carry the media
//! element's own error code and message so callers can tell a network failure
//! from a broken stream without extra logging.

use std::io::Error as IoError;

use image::ImageError;
use thiserror::Error;

use crate::media::MediaErrorInfo;

/// The unified error type for all `vidthumb` operations.
///
/// Every future returned by [`Session`](crate::Session) settles exactly once
/// with either a value or one of these variants.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ThumbnailError {
    /// The source passed to a session was missing or unusable.
    ///
    /// Returned synchronously, before any media element is created.
    #[error("Invalid video source: {0}")]
    InvalidSource(String),

    /// The media element reported a terminal error with details.
    #[error("Media {0}")]
    Decode(MediaErrorInfo),

    /// The media element reported a terminal error without any details.
    #[error("Unknown media error")]
    UnknownDecode,

    /// Drawing a frame onto the canvas or encoding it failed.
    #[error("Failed to capture frame: {0}")]
    Capture(String),

    /// A sampling interval of zero, a negative value, or a non-finite value.
    #[error("Interval must be a finite number greater than zero")]
    InvalidInterval,

    /// A sampling option is outside its accepted range.
    #[error("Invalid option `{name}`: {reason}")]
    InvalidOption {
        /// Name of the offending option.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The sampling range is empty.
    #[error("Invalid range: start ({start}) must be less than end ({end})")]
    InvalidRange {
        /// Requested first sample timestamp, in seconds.
        start: f64,
        /// Requested last sample timestamp, in seconds.
        end: f64,
    },

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// The media element stopped delivering events before the operation
    /// settled.
    #[error("Media event stream closed before the operation completed")]
    EventStreamClosed,

    /// Playback ended before decode metadata became available.
    #[error("Playback ended before metadata was available")]
    EndedBeforeMetadata,

    /// An I/O error occurred while staging or writing data.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while decoding or compositing
    /// thumbnails.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// An error originating from the FFmpeg libraries.
    #[cfg(feature = "ffmpeg")]
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),
}

impl ThumbnailError {
    /// Build the error for a terminal media event from whatever details the
    /// element exposes.
    pub(crate) fn from_media_error(info: Option<MediaErrorInfo>) -> Self {
        match info {
            Some(info) => ThumbnailError::Decode(info),
            None => ThumbnailError::UnknownDecode,
        }
    }
}

#[cfg(feature = "ffmpeg")]
impl From<ffmpeg_next::Error> for ThumbnailError {
    fn from(error: ffmpeg_next::Error) -> Self {
        ThumbnailError::FfmpegError(error.to_string())
    }
}
