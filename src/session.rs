//! Core [`Session`] implementation.
//!
//! A `Session` owns one media element and one offscreen canvas. It runs the
//! metadata probe and the sampler against that element, one operation at a
//! time, and remembers merged sampling options between calls.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::capture::Canvas;
use crate::config::{SamplingOptions, SamplingOverrides, SessionOptions};
use crate::error::ThumbnailError;
use crate::machine::drive;
use crate::media::MediaElement;
use crate::metadata::Metadata;
use crate::probe::MetadataProbe;
use crate::progress::{OperationType, ProgressTracker};
use crate::sampler::Sampler;
use crate::thumbnail::Thumbnail;

#[cfg(feature = "ffmpeg")]
use crate::{decoder::FfmpegElement, source::VideoSource};

/// A video bound to a media element, ready for probing and sampling.
///
/// Every operation takes `&mut self`, so a session never runs two operations
/// at once.
///
/// # Example
///
/// ```no_run
/// use vidthumb::{SamplingOverrides, Session};
///
/// # async fn example() -> Result<(), vidthumb::ThumbnailError> {
/// let mut session = Session::open("input.mp4")?;
/// let metadata = session.metadata().await?;
/// let thumbnails = session
///     .thumbnails(Some(SamplingOverrides::new().interval(metadata.duration / 10.0)))
///     .await?;
/// for thumbnail in &thumbnails {
///     if let Some(blob) = &thumbnail.blob {
///         blob.save(format!("thumb_{:.2}.jpg", thumbnail.current_time))?;
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Session<M: MediaElement> {
    element: M,
    canvas: Canvas,
    options: SamplingOptions,
    config: SessionOptions,
}

impl<M: MediaElement> Debug for Session<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Session")
            .field("options", &self.options)
            .field("config", &self.config)
            .field("canvas", &(self.canvas.width(), self.canvas.height()))
            .finish_non_exhaustive()
    }
}

impl<M: MediaElement> Session<M> {
    /// Bind a session to an existing media element.
    pub fn new(element: M) -> Self {
        Self {
            element,
            canvas: Canvas::new(),
            options: SamplingOptions::default(),
            config: SessionOptions::default(),
        }
    }

    /// Replace the host-integration settings.
    #[must_use]
    pub fn with_session_options(mut self, config: SessionOptions) -> Self {
        self.config = config;
        self
    }

    /// Replace the stored sampling options.
    #[must_use]
    pub fn with_sampling_options(mut self, options: SamplingOptions) -> Self {
        self.options = options;
        self
    }

    /// The sampling options later calls merge into.
    pub fn options(&self) -> &SamplingOptions {
        &self.options
    }

    /// The underlying media element.
    pub fn element(&self) -> &M {
        &self.element
    }

    /// Mutable access to the underlying media element.
    pub fn element_mut(&mut self) -> &mut M {
        &mut self.element
    }

    /// Give up the session, returning its element.
    pub fn into_element(self) -> M {
        self.element
    }

    /// Wait for decode metadata and resolve dimensions and duration.
    ///
    /// # Errors
    ///
    /// [`ThumbnailError::Decode`] / [`ThumbnailError::UnknownDecode`] if the
    /// element reports a terminal error, [`ThumbnailError::Cancelled`] if the
    /// session's token fires, [`ThumbnailError::EventStreamClosed`] if the
    /// element goes quiet first.
    pub async fn metadata(&mut self) -> Result<Metadata, ThumbnailError> {
        let mut probe = MetadataProbe::new();
        let metadata = drive(
            &mut self.element,
            &mut probe,
            self.config.cancellation.as_ref(),
        )
        .await?;

        let mut tracker = ProgressTracker::new(
            Arc::clone(&self.config.progress),
            OperationType::MetadataProbe,
            Some(1),
            1,
        );
        tracker.advance(None);
        Ok(metadata)
    }

    /// Sample thumbnails. `overrides` are merged into the stored options
    /// first and stay merged for later calls. Rejected overrides leave the
    /// stored options untouched.
    ///
    /// # Errors
    ///
    /// Option validation errors before anything is awaited; otherwise the
    /// same errors as [`metadata`](Session::metadata) plus
    /// [`ThumbnailError::Capture`] if a frame cannot be encoded.
    pub async fn thumbnails(
        &mut self,
        overrides: Option<SamplingOverrides>,
    ) -> Result<Vec<Thumbnail>, ThumbnailError> {
        let mut options = self.options.clone();
        if let Some(overrides) = &overrides {
            options.merge(overrides);
        }
        options.validate()?;
        self.options = options;

        let mut sampler = Sampler::new(self.options.clone(), &mut self.canvas)
            .with_startup(self.config.startup)
            .with_progress(Arc::clone(&self.config.progress), self.config.batch_size);

        drive(
            &mut self.element,
            &mut sampler,
            self.config.cancellation.as_ref(),
        )
        .await
    }
}

#[cfg(feature = "ffmpeg")]
impl Session<FfmpegElement> {
    /// Open a session on `source` using the FFmpeg backend.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::InvalidSource`] for an empty location or
    /// blob, or [`ThumbnailError::IoError`] if blob bytes cannot be staged.
    /// Failures to open or decode the media itself are reported later, by the
    /// first operation, as decode errors.
    pub fn open(source: impl Into<VideoSource>) -> Result<Self, ThumbnailError> {
        Ok(Self::new(FfmpegElement::open(source.into())?))
    }
}

/// Probe a source once and discard the session.
///
/// # Errors
///
/// See [`Session::open`] and [`Session::metadata`].
#[cfg(feature = "ffmpeg")]
pub async fn get_metadata(source: impl Into<VideoSource>) -> Result<Metadata, ThumbnailError> {
    let mut session = Session::open(source)?;
    session.metadata().await
}

/// Sample a source once and discard the session.
///
/// # Errors
///
/// See [`Session::open`] and [`Session::thumbnails`].
#[cfg(feature = "ffmpeg")]
pub async fn get_thumbnails(
    source: impl Into<VideoSource>,
    overrides: Option<SamplingOverrides>,
) -> Result<Vec<Thumbnail>, ThumbnailError> {
    let mut session = Session::open(source)?;
    session.thumbnails(overrides).await
}
