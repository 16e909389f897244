//! # vidthumb
//!
//! Probe video metadata and sample evenly spaced JPEG thumbnails.
//!
//! A [`Session`] binds one [`MediaElement`] (a decoder that answers seek and
//! play commands with [`MediaEvent`]s) to an offscreen [`Canvas`]. Two
//! event-driven state machines run against it:
//!
//! - [`MetadataProbe`] waits for decode metadata and returns dimensions and
//!   a duration truncated to hundredths of a second. Containers that do not
//!   carry a duration are recovered with a seek far past the end.
//! - [`Sampler`] seeks to `start`, then steps forward by `interval`,
//!   capturing the frame after every seek until the position reaches the
//!   duration or `end`.
//!
//! Frames are scaled onto the canvas and encoded as JPEG, either straight to
//! a [`Blob`] or, on hosts without blob encoding, through a base64 data URL
//! that is decoded back to the same bytes.
//!
//! With the default `ffmpeg` feature, [`FfmpegElement`] provides a media
//! element backed by [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next).
//!
//! ## Quick Start
//!
//! ```no_run
//! use vidthumb::SamplingOverrides;
//!
//! # async fn example() -> Result<(), vidthumb::ThumbnailError> {
//! let metadata = vidthumb::get_metadata("input.mp4").await?;
//! println!("{}x{} {}s", metadata.width, metadata.height, metadata.duration);
//!
//! let thumbnails = vidthumb::get_thumbnails(
//!     "input.mp4",
//!     Some(SamplingOverrides::new().interval(2.0).scale(0.5)),
//! )
//! .await?;
//! for thumbnail in &thumbnails {
//!     println!("{:.2}s", thumbnail.current_time);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom hosts
//!
//! Anything implementing [`MediaElement`] can be sampled:
//! `Session::new(element)` works without the `ffmpeg` feature.
//!
//! ## Requirements
//!
//! The `ffmpeg` feature needs the FFmpeg development libraries installed.

pub mod capture;
pub mod config;
#[cfg(feature = "ffmpeg")]
mod conversion;
#[cfg(feature = "ffmpeg")]
pub mod decoder;
pub mod error;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod machine;
pub mod media;
pub mod metadata;
pub mod probe;
pub mod progress;
pub mod sampler;
pub mod session;
pub mod source;
pub mod thumbnail;

pub use capture::{
    Blob, BlobEncoder, Canvas, DataUrlEncoder, FrameEncoder, JPEG_MIME, MAX_CANVAS_SIDE,
    decode_data_url, encoder_for,
};
pub use config::{SamplingOptions, SamplingOverrides, SessionOptions, StartupStrategy};
#[cfg(feature = "ffmpeg")]
pub use decoder::FfmpegElement;
pub use error::ThumbnailError;
#[cfg(feature = "ffmpeg")]
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use machine::{EventMachine, Step, drive};
pub use media::{HostCapabilities, MediaElement, MediaErrorInfo, MediaEvent, ReadyState};
pub use metadata::Metadata;
pub use probe::{MetadataProbe, RECOVERY_SEEK_TARGET};
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use sampler::Sampler;
pub use session::Session;
#[cfg(feature = "ffmpeg")]
pub use session::{get_metadata, get_thumbnails};
pub use source::{ObjectUrl, VideoSource};
pub use thumbnail::{Thumbnail, sprite_sheet};
