//! FFmpeg-backed media element.
//!
//! [`FfmpegElement`] implements [`MediaElement`] on top of `ffmpeg-next`,
//! behaving the way a browser video element does from the outside:
//!
//! - loading reports `LoadedMetadata`, `Progress` and `CanPlayThrough`;
//! - a seek clamps to the duration, decodes the first frame at or after the
//!   target and reports `TimeUpdate` followed by `CanPlayThrough`;
//! - playback decodes ahead in 250 ms ticks, reporting `TimeUpdate` for each
//!   and `Ended` at the end of the stream;
//! - failures to open the source or decode a frame are reported as `Error`
//!   events, never as construction failures.
//!
//! Containers that carry no duration report `f64::INFINITY` until a seek
//! decodes through to the end of the stream.

use std::collections::VecDeque;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::mem;

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::DynamicImage;

use crate::conversion::{
    container_duration_seconds, pts_to_seconds, rgb_frame_to_image, seconds_to_seek_timestamp,
};
use crate::error::ThumbnailError;
use crate::media::{HostCapabilities, MediaElement, MediaErrorInfo, MediaEvent, ReadyState};
use crate::source::{ObjectUrl, VideoSource};

/// Media time covered by one playback tick.
const PLAYBACK_TICK: f64 = 0.25;

/// Frames whose timestamp is this close below a seek target count as "at"
/// the target.
const FRAME_EPSILON: f64 = 1e-3;

/// Result of decoding forward towards a target time.
enum Decoded {
    /// First frame at or after the target.
    Frame(f64, DynamicImage),
    /// The stream ended first; carries the last frame decoded, if any.
    EndOfStream(Option<(f64, DynamicImage)>),
}

/// The opened input plus the decoder for its best video stream.
struct Demuxer {
    input: Input,
    decoder: VideoDecoder,
    stream_index: usize,
    time_base: Rational,
    start_offset: f64,
    frame_duration: f64,
}

struct OpenedMedia {
    demuxer: Demuxer,
    width: f64,
    height: f64,
    duration: f64,
}

impl Demuxer {
    fn open(location: &str) -> Result<OpenedMedia, String> {
        ffmpeg_next::init().map_err(|error| format!("FFmpeg initialisation failed: {error}"))?;

        let input = ffmpeg_next::format::input(location)
            .map_err(|error| format!("failed to open {location}: {error}"))?;

        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or_else(|| format!("no video stream in {location}"))?;
        let stream_index = stream.index();
        let time_base = stream.time_base();

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| format!("failed to create video decoder: {error}"))?;

        let start_offset = match stream.start_time() {
            start if start > 0 => pts_to_seconds(start, time_base),
            _ => 0.0,
        };

        let frame_rate = stream.avg_frame_rate();
        let frame_duration = if frame_rate.numerator() > 0 && frame_rate.denominator() > 0 {
            frame_rate.denominator() as f64 / frame_rate.numerator() as f64
        } else {
            0.0
        };

        let stream_duration = match stream.duration() {
            duration if duration > 0 => Some(pts_to_seconds(duration, time_base)),
            _ => None,
        };
        let duration = container_duration_seconds(input.duration())
            .or(stream_duration)
            .unwrap_or(f64::INFINITY);

        let (width, height) = (decoder.width() as f64, decoder.height() as f64);

        log::info!(
            "Opened {location}: {width}x{height}, duration {duration}s, stream {stream_index}"
        );

        Ok(OpenedMedia {
            demuxer: Demuxer {
                input,
                decoder,
                stream_index,
                time_base,
                start_offset,
                frame_duration,
            },
            width,
            height,
            duration,
        })
    }

    /// Seek to the keyframe before `seconds` and decode forward to it.
    fn seek_and_decode(&mut self, seconds: f64) -> Result<Decoded, ThumbnailError> {
        let timestamp = seconds_to_seek_timestamp(seconds + self.start_offset);
        self.input.seek(timestamp, ..timestamp)?;
        self.decoder.flush();
        self.decode_until(seconds)
    }

    /// Decode forward from the current position until a frame at or after
    /// `target` appears or the stream ends.
    fn decode_until(&mut self, target: f64) -> Result<Decoded, ThumbnailError> {
        let Demuxer {
            input,
            decoder,
            stream_index,
            time_base,
            start_offset,
            ..
        } = self;

        let frame_seconds = |frame: &VideoFrame| {
            frame
                .timestamp()
                .or(frame.pts())
                .map_or(0.0, |pts| pts_to_seconds(pts, *time_base) - *start_offset)
        };

        let mut last: Option<(f64, VideoFrame)> = None;
        let mut decoded = VideoFrame::empty();

        for (stream, packet) in input.packets() {
            if stream.index() != *stream_index {
                continue;
            }
            decoder.send_packet(&packet)?;

            while decoder.receive_frame(&mut decoded).is_ok() {
                let seconds = frame_seconds(&decoded);
                if seconds + FRAME_EPSILON >= target {
                    return Ok(Decoded::Frame(seconds, convert_frame(&decoded)?));
                }
                last = Some((seconds, mem::replace(&mut decoded, VideoFrame::empty())));
            }
        }

        decoder.send_eof()?;
        while decoder.receive_frame(&mut decoded).is_ok() {
            let seconds = frame_seconds(&decoded);
            if seconds + FRAME_EPSILON >= target {
                return Ok(Decoded::Frame(seconds, convert_frame(&decoded)?));
            }
            last = Some((seconds, mem::replace(&mut decoded, VideoFrame::empty())));
        }

        match last {
            Some((seconds, frame)) => Ok(Decoded::EndOfStream(Some((
                seconds,
                convert_frame(&frame)?,
            )))),
            None => Ok(Decoded::EndOfStream(None)),
        }
    }
}

/// Convert a decoded frame of any pixel format to an RGB image.
fn convert_frame(frame: &VideoFrame) -> Result<DynamicImage, ThumbnailError> {
    let mut scaler = ScalingContext::get(
        frame.format(),
        frame.width(),
        frame.height(),
        Pixel::RGB24,
        frame.width(),
        frame.height(),
        ScalingFlags::BILINEAR,
    )?;
    let mut rgb_frame = VideoFrame::empty();
    scaler.run(frame, &mut rgb_frame)?;
    rgb_frame_to_image(&rgb_frame)
}

/// A [`MediaElement`] decoding through FFmpeg.
///
/// # Example
///
/// ```no_run
/// use vidthumb::{FfmpegElement, HostCapabilities, Session, VideoSource};
///
/// # async fn example() -> Result<(), vidthumb::ThumbnailError> {
/// let bytes = std::fs::read("clip.webm")?;
/// let element = FfmpegElement::open(VideoSource::Blob(bytes))?
///     .with_capabilities(HostCapabilities { blob_encoding: false });
/// let thumbnails = Session::new(element).thumbnails(None).await?;
/// # Ok(())
/// # }
/// ```
pub struct FfmpegElement {
    demuxer: Option<Demuxer>,
    object_url: Option<ObjectUrl>,
    width: f64,
    height: f64,
    duration: f64,
    current_time: f64,
    frame: Option<DynamicImage>,
    ready_state: ReadyState,
    error: Option<MediaErrorInfo>,
    playing: bool,
    lifecycle: VecDeque<MediaEvent>,
    pending: VecDeque<MediaEvent>,
    capabilities: HostCapabilities,
}

impl Debug for FfmpegElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FfmpegElement")
            .field("loaded", &self.demuxer.is_some())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("duration", &self.duration)
            .field("current_time", &self.current_time)
            .field("ready_state", &self.ready_state)
            .field("error", &self.error)
            .field("playing", &self.playing)
            .finish_non_exhaustive()
    }
}

impl FfmpegElement {
    /// Open `source`.
    ///
    /// Blob sources are staged in a temporary file first. If FFmpeg cannot
    /// open the media, the element is still returned and reports the failure
    /// through its first event.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::InvalidSource`] for an empty source or
    /// [`ThumbnailError::IoError`] if blob bytes cannot be staged.
    pub fn open(source: VideoSource) -> Result<Self, ThumbnailError> {
        source.validate()?;

        let (location, object_url) = match source {
            VideoSource::Url(location) => (location, None),
            VideoSource::Blob(bytes) => {
                let url = ObjectUrl::create(&bytes)?;
                (url.location().display().to_string(), Some(url))
            }
        };

        let mut element = Self {
            demuxer: None,
            object_url,
            width: 0.0,
            height: 0.0,
            duration: f64::NAN,
            current_time: 0.0,
            frame: None,
            ready_state: ReadyState::HaveNothing,
            error: None,
            playing: false,
            lifecycle: VecDeque::new(),
            pending: VecDeque::new(),
            capabilities: HostCapabilities::default(),
        };

        match Demuxer::open(&location) {
            Ok(opened) => {
                element.demuxer = Some(opened.demuxer);
                element.width = opened.width;
                element.height = opened.height;
                element.duration = opened.duration;
                element.lifecycle.extend([
                    MediaEvent::LoadedMetadata,
                    MediaEvent::Progress,
                    MediaEvent::CanPlayThrough,
                ]);
            }
            Err(reason) => {
                log::warn!("Cannot load media: {reason}");
                element.error = Some(MediaErrorInfo::new(
                    MediaErrorInfo::SRC_NOT_SUPPORTED,
                    reason,
                ));
                element.lifecycle.push_back(MediaEvent::Error);
            }
        }

        Ok(element)
    }

    /// Override the reported host capabilities.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: HostCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// `true` once a staged blob has been released (always `true` for
    /// location sources).
    pub fn source_released(&self) -> bool {
        self.object_url.as_ref().is_none_or(ObjectUrl::is_revoked)
    }

    /// `true` while simulated playback is running.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    fn fail(&mut self, code: u16, message: String) {
        log::warn!("Media error {code}: {message}");
        self.error = Some(MediaErrorInfo::new(code, message));
        self.playing = false;
        self.pending.push_back(MediaEvent::Error);
    }

    fn advance_playback(&mut self) -> MediaEvent {
        let Some(demuxer) = self.demuxer.as_mut() else {
            self.playing = false;
            return MediaEvent::Ended;
        };
        let frame_duration = demuxer.frame_duration;

        match demuxer.decode_until(self.current_time + PLAYBACK_TICK) {
            Ok(Decoded::Frame(seconds, image)) => {
                self.current_time = seconds.max(self.current_time);
                self.frame = Some(image);
            }
            Ok(Decoded::EndOfStream(last)) => {
                if let Some((seconds, image)) = last {
                    if !self.duration.is_finite() {
                        self.duration = seconds + frame_duration;
                    }
                    self.frame = Some(image);
                }
                if self.duration.is_finite() {
                    self.current_time = self.duration;
                }
                self.playing = false;
                log::debug!("Playback reached the end at {}s", self.current_time);
                self.pending.push_back(MediaEvent::Ended);
            }
            Err(error) => {
                self.fail(MediaErrorInfo::DECODE, error.to_string());
                return self.pending.pop_front().unwrap_or(MediaEvent::Error);
            }
        }
        MediaEvent::TimeUpdate
    }
}

impl MediaElement for FfmpegElement {
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
        let Some(demuxer) = self.demuxer.as_mut() else {
            log::debug!("Ignoring seek on an element without media");
            return;
        };
        let frame_duration = demuxer.frame_duration;

        let mut target = if seconds.is_nan() { 0.0 } else { seconds.max(0.0) };
        let decoded = if self.duration.is_finite() {
            target = target.min(self.duration);
            demuxer.seek_and_decode(target)
        } else {
            // Unknown duration: decode from the start so the end is found.
            demuxer
                .seek_and_decode(0.0)
                .and_then(|decoded| match decoded {
                    Decoded::Frame(seconds, image) if target > 0.0 => {
                        match demuxer.decode_until(target)? {
                            Decoded::EndOfStream(None) => {
                                Ok(Decoded::EndOfStream(Some((seconds, image))))
                            }
                            other => Ok(other),
                        }
                    }
                    other => Ok(other),
                })
        };

        match decoded {
            Ok(Decoded::Frame(_, image)) => {
                self.frame = Some(image);
            }
            Ok(Decoded::EndOfStream(Some((seconds, image)))) => {
                if !self.duration.is_finite() {
                    self.duration = seconds + frame_duration;
                    log::debug!("Duration resolved to {}s after seeking", self.duration);
                }
                target = target.min(self.duration);
                self.frame = Some(image);
            }
            Ok(Decoded::EndOfStream(None)) => {
                self.fail(MediaErrorInfo::DECODE, "no decodable video frames".to_string());
                return;
            }
            Err(error) => {
                self.fail(MediaErrorInfo::DECODE, error.to_string());
                return;
            }
        }

        log::trace!("Seeked to {target}s");
        self.current_time = target;
        self.ready_state = ReadyState::HaveEnoughData;
        self.lifecycle.clear();
        self.pending.extend([MediaEvent::TimeUpdate, MediaEvent::CanPlayThrough]);
    }

    fn play(&mut self) -> Result<(), ThumbnailError> {
        if self.demuxer.is_none() {
            log::debug!("Ignoring play on an element without media");
            return Ok(());
        }
        self.playing = true;
        Ok(())
    }

    fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    fn error(&self) -> Option<MediaErrorInfo> {
        self.error.clone()
    }

    fn current_frame(&self) -> Option<&DynamicImage> {
        self.frame.as_ref()
    }

    fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    fn release_source(&mut self) {
        if let Some(url) = self.object_url.as_mut() {
            url.revoke();
        }
    }

    fn clear_pending_events(&mut self) {
        self.pending.clear();
    }

    async fn next_event(&mut self) -> Option<MediaEvent> {
        tokio::task::yield_now().await;

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
        if self.playing {
            return Some(self.advance_playback());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unopenable_source_reports_one_error() {
        let mut element =
            FfmpegElement::open(VideoSource::from("does/not/exist.mp4")).expect("construction");

        element.set_current_time(3.0);
        assert_eq!(element.current_time(), 0.0);
        assert!(element.play().is_ok());
        assert!(!element.is_playing());

        assert_eq!(element.next_event().await, Some(MediaEvent::Error));
        assert_eq!(element.next_event().await, None);
        let error = element.error().expect("error details");
        assert_eq!(error.code, MediaErrorInfo::SRC_NOT_SUPPORTED);
        assert_eq!(element.ready_state(), ReadyState::HaveNothing);
    }

    #[test]
    fn blob_staging_is_released_once() {
        let mut element =
            FfmpegElement::open(VideoSource::Blob(b"not a video".to_vec())).expect("construction");
        assert!(!element.source_released());

        element.release_source();
        element.release_source();
        assert!(element.source_released());
    }
}
