//! Frame capture: the offscreen canvas and the two encoding paths.
//!
//! A captured frame is drawn onto a [`Canvas`] at the requested output size
//! and then encoded to a JPEG [`Blob`] by a [`FrameEncoder`]:
//!
//! - [`BlobEncoder`] encodes the canvas pixels straight to bytes.
//! - [`DataUrlEncoder`] renders a base64 `data:` URL first, decodes the
//!   payload locally and builds the blob from it. Hosts without direct blob
//!   encoding use this path.
//!
//! Both produce identical bytes; the sampler only sees "frame in, bytes out".

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::Path;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{
    DynamicImage, RgbaImage,
    codecs::jpeg::JpegEncoder,
    imageops::{self, FilterType},
};

use crate::error::ThumbnailError;
use crate::media::HostCapabilities;

/// MIME type of every captured image.
pub const JPEG_MIME: &str = "image/jpeg";

const DEFAULT_CANVAS_WIDTH: u32 = 300;
const DEFAULT_CANVAS_HEIGHT: u32 = 150;

/// Largest canvas side, in pixels. JPEG cannot encode anything wider or taller.
pub const MAX_CANVAS_SIDE: u32 = u16::MAX as u32;

/// Encoded image bytes plus their MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    bytes: Vec<u8>,
    mime: String,
}

impl Debug for Blob {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Blob")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Blob {
    /// Wrap encoded bytes.
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    /// The encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the blob, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// MIME type of the encoded bytes.
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// `true` when the blob holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Render as a `data:` URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    /// Write the encoded bytes to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::IoError`] if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ThumbnailError> {
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}

/// Offscreen raster surface used to render frames before encoding.
///
/// Starts at 300×150 and transparent. Resizing clears it.
#[derive(Debug, Clone)]
pub struct Canvas {
    pixels: RgbaImage,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    /// A transparent 300×150 canvas.
    pub fn new() -> Self {
        Self {
            pixels: RgbaImage::new(DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT),
        }
    }

    /// Current width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Current height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Resize and clear.
    ///
    /// # Errors
    ///
    /// [`ThumbnailError::Capture`] if either side exceeds [`MAX_CANVAS_SIDE`].
    /// The canvas is left untouched in that case.
    pub fn set_size(&mut self, width: u32, height: u32) -> Result<(), ThumbnailError> {
        if width > MAX_CANVAS_SIDE || height > MAX_CANVAS_SIDE {
            return Err(ThumbnailError::Capture(format!(
                "canvas of {width}x{height} exceeds the {MAX_CANVAS_SIDE} px limit"
            )));
        }
        self.pixels = RgbaImage::new(width, height);
        Ok(())
    }

    /// Draw `image` scaled to `width`×`height` with its top-left corner at
    /// (`x`, `y`). Parts outside the canvas are clipped.
    pub fn draw_image(&mut self, image: &DynamicImage, x: i64, y: i64, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let scaled = if image.width() == width && image.height() == height {
            image.to_rgba8()
        } else {
            image
                .resize_exact(width, height, FilterType::Triangle)
                .to_rgba8()
        };
        imageops::overlay(&mut self.pixels, &scaled, x, y);
    }

    /// Reset a rectangle to transparent black.
    pub fn clear_rect(&mut self, x: u32, y: u32, width: u32, height: u32) {
        let width = width.min(self.width().saturating_sub(x));
        let height = height.min(self.height().saturating_sub(y));
        if width == 0 || height == 0 {
            return;
        }
        imageops::replace(
            &mut self.pixels,
            &RgbaImage::new(width, height),
            i64::from(x),
            i64::from(y),
        );
    }

    /// Reset the whole canvas to transparent black.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Encode the canvas as JPEG. `None` for a canvas with no area.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::Capture`] if encoding fails.
    pub fn to_blob(&self, quality: f64) -> Result<Option<Blob>, ThumbnailError> {
        if self.width() == 0 || self.height() == 0 {
            return Ok(None);
        }
        let rgb = DynamicImage::ImageRgba8(self.pixels.clone()).to_rgb8();
        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut bytes, jpeg_quality(quality));
        DynamicImage::ImageRgb8(rgb)
            .write_with_encoder(encoder)
            .map_err(|error| ThumbnailError::Capture(format!("JPEG encoding failed: {error}")))?;
        Ok(Some(Blob::new(bytes, JPEG_MIME)))
    }

    /// Encode the canvas as a JPEG `data:` URL. A canvas with no area yields
    /// the empty URL `data:,`.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::Capture`] if encoding fails.
    pub fn to_data_url(&self, quality: f64) -> Result<String, ThumbnailError> {
        Ok(match self.to_blob(quality)? {
            Some(blob) => blob.to_data_url(),
            None => "data:,".to_string(),
        })
    }
}

/// Map a 0–1 quality to the JPEG encoder's 1–100 scale.
pub(crate) fn jpeg_quality(quality: f64) -> u8 {
    (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8
}

/// Turns the rendered canvas into image bytes.
pub trait FrameEncoder {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Encode the canvas at `quality` (0–1). `None` when the canvas has no
    /// area.
    fn encode(&self, canvas: &Canvas, quality: f64) -> Result<Option<Blob>, ThumbnailError>;
}

/// Encodes the canvas directly to a blob.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlobEncoder;

impl FrameEncoder for BlobEncoder {
    fn name(&self) -> &'static str {
        "blob"
    }

    fn encode(&self, canvas: &Canvas, quality: f64) -> Result<Option<Blob>, ThumbnailError> {
        canvas.to_blob(quality)
    }
}

/// Encodes through a base64 `data:` URL and rebuilds the blob from it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataUrlEncoder;

impl FrameEncoder for DataUrlEncoder {
    fn name(&self) -> &'static str {
        "data-url"
    }

    fn encode(&self, canvas: &Canvas, quality: f64) -> Result<Option<Blob>, ThumbnailError> {
        let url = canvas.to_data_url(quality)?;
        decode_data_url(&url)
    }
}

/// Decode a base64 `data:` URL into a blob. The empty URL `data:,` decodes
/// to `None`.
///
/// # Errors
///
/// Returns [`ThumbnailError::Capture`] if the URL is malformed or not base64.
pub fn decode_data_url(url: &str) -> Result<Option<Blob>, ThumbnailError> {
    let (header, payload) = url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(|| ThumbnailError::Capture(format!("malformed data URL: {url:.32}")))?;
    if payload.is_empty() {
        return Ok(None);
    }
    let mime = header.strip_suffix(";base64").ok_or_else(|| {
        ThumbnailError::Capture(format!("data URL is not base64 encoded: {header}"))
    })?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|error| ThumbnailError::Capture(format!("invalid base64 payload: {error}")))?;
    Ok(Some(Blob::new(bytes, mime)))
}

/// Pick the encoder the host supports, preferring direct blob encoding.
pub fn encoder_for(capabilities: HostCapabilities) -> Box<dyn FrameEncoder> {
    if capabilities.blob_encoding {
        Box::new(BlobEncoder)
    } else {
        log::warn!("Host cannot encode blobs directly; capturing through data URLs");
        Box::new(DataUrlEncoder)
    }
}
