//! Internal conversion helpers for the FFmpeg backend.
//!
//! Pixel-plane copying and timestamp rescaling shared by
//! [`FfmpegElement`](crate::FfmpegElement).

use ffmpeg_next::{Rational, frame::Video as VideoFrame};
use image::{DynamicImage, RgbImage};

use crate::error::ThumbnailError;

/// `AV_TIME_BASE`: container-level seeks are expressed in microseconds.
const MICROSECONDS_PER_SECOND: f64 = 1_000_000.0;

/// Copy an RGB24 frame into a tightly-packed buffer, dropping row padding.
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_bytes = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == row_bytes {
        data[..row_bytes * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_bytes]);
        }
        buffer
    }
}

/// Wrap an RGB24 frame as an image.
pub(crate) fn rgb_frame_to_image(rgb_frame: &VideoFrame) -> Result<DynamicImage, ThumbnailError> {
    let (width, height) = (rgb_frame.width(), rgb_frame.height());
    let buffer = frame_to_rgb_buffer(rgb_frame, width, height);
    RgbImage::from_raw(width, height, buffer)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| {
            ThumbnailError::FfmpegError(format!(
                "decoded frame buffer does not match {width}x{height}"
            ))
        })
}

/// Rescale a timestamp from a stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Convert seconds to a container-level seek timestamp.
pub(crate) fn seconds_to_seek_timestamp(seconds: f64) -> i64 {
    (seconds.max(0.0) * MICROSECONDS_PER_SECOND) as i64
}

/// Convert a container duration (microseconds) to seconds; `None` when the
/// container does not know it.
pub(crate) fn container_duration_seconds(duration: i64) -> Option<f64> {
    (duration > 0).then(|| duration as f64 / MICROSECONDS_PER_SECOND)
}
