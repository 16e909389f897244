//! Video sources and temporary source handles.
//!
//! A session is created from a [`VideoSource`]: either a location string
//! (file path or URL) handed to the decoder as-is, or inline bytes. Inline
//! bytes are staged behind an [`ObjectUrl`], a temporary file the decoder can
//! open by path. The handle is released once playback ends or fails, and in
//! any case when it is dropped.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::ThumbnailError;

/// Where a session's video comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// A file path or URL the decoder opens directly.
    Url(String),
    /// Encoded video bytes held in memory.
    Blob(Vec<u8>),
}

impl VideoSource {
    /// Reject empty locations and empty blobs.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::InvalidSource`] when there is nothing to
    /// open.
    pub fn validate(&self) -> Result<(), ThumbnailError> {
        match self {
            VideoSource::Url(location) if location.trim().is_empty() => Err(
                ThumbnailError::InvalidSource("location is empty".to_string()),
            ),
            VideoSource::Blob(bytes) if bytes.is_empty() => Err(ThumbnailError::InvalidSource(
                "blob contains no data".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// `true` for inline bytes.
    pub fn is_blob(&self) -> bool {
        matches!(self, VideoSource::Blob(_))
    }
}

impl From<&str> for VideoSource {
    fn from(location: &str) -> Self {
        VideoSource::Url(location.to_string())
    }
}

impl From<String> for VideoSource {
    fn from(location: String) -> Self {
        VideoSource::Url(location)
    }
}

impl From<&Path> for VideoSource {
    fn from(path: &Path) -> Self {
        VideoSource::Url(path.display().to_string())
    }
}

impl From<PathBuf> for VideoSource {
    fn from(path: PathBuf) -> Self {
        VideoSource::from(path.as_path())
    }
}

impl From<Vec<u8>> for VideoSource {
    fn from(bytes: Vec<u8>) -> Self {
        VideoSource::Blob(bytes)
    }
}

impl From<&[u8]> for VideoSource {
    fn from(bytes: &[u8]) -> Self {
        VideoSource::Blob(bytes.to_vec())
    }
}

/// A temporary, path-addressable copy of inline video bytes.
///
/// Released at most once: either explicitly through
/// [`revoke`](ObjectUrl::revoke) or when dropped.
#[derive(Debug)]
pub struct ObjectUrl {
    file: Option<NamedTempFile>,
    location: PathBuf,
}

impl ObjectUrl {
    /// Stage `bytes` in a new temporary file.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::IoError`] if the file cannot be created or
    /// written.
    pub fn create(bytes: &[u8]) -> Result<Self, ThumbnailError> {
        let mut file = tempfile::Builder::new()
            .prefix("vidthumb-")
            .suffix(".blob")
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;
        let location = file.path().to_path_buf();
        log::debug!(
            "Staged {} bytes of video at {}",
            bytes.len(),
            location.display()
        );
        Ok(Self {
            file: Some(file),
            location,
        })
    }

    /// Path of the staged data. Stays valid until the handle is revoked.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Delete the staged data. Returns `true` the first time only.
    pub fn revoke(&mut self) -> bool {
        let Some(file) = self.file.take() else {
            return false;
        };
        if let Err(error) = file.close() {
            log::warn!(
                "Failed to remove staged video {}: {error}",
                self.location.display()
            );
        } else {
            log::debug!("Revoked staged video {}", self.location.display());
        }
        true
    }

    /// `true` once the staged data has been released.
    pub fn is_revoked(&self) -> bool {
        self.file.is_none()
    }
}
