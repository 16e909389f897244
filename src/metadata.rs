//! Video metadata.
//!
//! [`Metadata`] is produced once per probe call by
//! [`MetadataProbe`](crate::MetadataProbe) and never changes afterwards.

use crate::media::MediaElement;

/// Dimensions and duration of a video.
///
/// Every value is truncated (floored) to two decimal places.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> Result<(), vidthumb::ThumbnailError> {
/// let metadata = vidthumb::get_metadata("input.mp4").await?;
/// println!("{}x{}, {:.2}s", metadata.width, metadata.height, metadata.duration);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[must_use]
pub struct Metadata {
    /// Frame width in pixels.
    pub width: f64,
    /// Frame height in pixels.
    pub height: f64,
    /// Duration in seconds.
    pub duration: f64,
}

impl Metadata {
    /// Build metadata from raw values, truncating each to two decimals.
    pub fn new(width: f64, height: f64, duration: f64) -> Self {
        Self {
            width: truncate_hundredths(width),
            height: truncate_hundredths(height),
            duration: truncate_hundredths(duration),
        }
    }

    /// Read the current values of a media element.
    pub(crate) fn read<M: MediaElement>(element: &M) -> Self {
        Self::new(
            element.video_width(),
            element.video_height(),
            element.duration(),
        )
    }
}

/// Floor `value` to two decimal places. Non-finite values pass through.
pub(crate) fn truncate_hundredths(value: f64) -> f64 {
    (value * 100.0).floor() / 100.0
}
