//! Thumbnails and contact sheets.
//!
//! A [`Thumbnail`] pairs a synthetic timestamp with the encoded frame
//! captured for it. [`sprite_sheet`] composites a run's thumbnails into a
//! single grid image.

use image::{DynamicImage, GenericImage, imageops::FilterType};

use crate::capture::Blob;
use crate::error::ThumbnailError;

/// One sampled frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    /// Timestamp label in seconds: `start + interval * index`.
    pub current_time: f64,
    /// Encoded frame. `None` when the frame had no area to encode.
    pub blob: Option<Blob>,
}

impl Thumbnail {
    /// Pair a timestamp label with an encoded frame.
    pub fn new(current_time: f64, blob: Option<Blob>) -> Self {
        Self { current_time, blob }
    }

    /// The encoded frame as a `data:` URL.
    pub fn to_data_url(&self) -> Option<String> {
        self.blob.as_ref().map(Blob::to_data_url)
    }

    /// Decode the encoded frame back into pixels.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::ImageError`] if the bytes cannot be decoded.
    pub fn decode(&self) -> Result<Option<DynamicImage>, ThumbnailError> {
        self.blob
            .as_ref()
            .map(|blob| image::load_from_memory(blob.as_bytes()))
            .transpose()
            .map_err(ThumbnailError::from)
    }
}

/// Composite thumbnails into a grid with `columns` cells per row.
///
/// Cells take the size of the first decodable thumbnail; frames of another
/// size are scaled to fit. Thumbnails without an image leave their cell
/// black. Returns `None` when there is nothing to draw.
///
/// # Errors
///
/// Returns [`ThumbnailError::InvalidOption`] for zero columns, or
/// [`ThumbnailError::ImageError`] if a thumbnail cannot be decoded.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> Result<(), vidthumb::ThumbnailError> {
/// let thumbnails = vidthumb::get_thumbnails("input.mp4", None).await?;
/// if let Some(sheet) = vidthumb::sprite_sheet(&thumbnails, 5)? {
///     sheet.save("sheet.jpg")?;
/// }
/// # Ok(())
/// # }
/// ```
pub fn sprite_sheet(
    thumbnails: &[Thumbnail],
    columns: u32,
) -> Result<Option<DynamicImage>, ThumbnailError> {
    if columns == 0 {
        return Err(ThumbnailError::InvalidOption {
            name: "columns",
            reason: "a sprite sheet needs at least one column".to_string(),
        });
    }

    let frames = thumbnails
        .iter()
        .map(Thumbnail::decode)
        .collect::<Result<Vec<_>, _>>()?;

    let Some((cell_width, cell_height)) = frames
        .iter()
        .flatten()
        .map(|frame| (frame.width(), frame.height()))
        .next()
    else {
        return Ok(None);
    };

    let count = frames.len() as u32;
    let rows = count.div_ceil(columns);
    let used_columns = count.min(columns);
    let mut sheet = DynamicImage::new_rgb8(cell_width * used_columns, cell_height * rows);

    for (index, frame) in frames.iter().enumerate() {
        let Some(frame) = frame else {
            continue;
        };
        let column = index as u32 % columns;
        let row = index as u32 / columns;
        let cell = if frame.width() == cell_width && frame.height() == cell_height {
            frame.clone()
        } else {
            frame.resize_exact(cell_width, cell_height, FilterType::Triangle)
        };
        sheet.copy_from(&cell, column * cell_width, row * cell_height)?;
    }

    log::debug!(
        "Composited {count} thumbnails into a {}x{} sprite sheet",
        sheet.width(),
        sheet.height()
    );
    Ok(Some(sheet))
}

#[cfg(test)]
mod tests {
    use image::{GenericImageView, Rgb, RgbImage};

    use super::*;
    use crate::capture::Canvas;

    fn solid(width: u32, height: u32, color: [u8; 3]) -> Thumbnail {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
        let mut canvas = Canvas::new();
        canvas.set_size(width, height).unwrap();
        canvas.draw_image(&image, 0, 0, width, height);
        Thumbnail::new(0.0, canvas.to_blob(1.0).unwrap())
    }

    #[test]
    fn sheet_lays_out_row_major() {
        let thumbnails = vec![
            solid(16, 8, [250, 0, 0]),
            solid(16, 8, [0, 250, 0]),
            solid(16, 8, [0, 0, 250]),
        ];
        let sheet = sprite_sheet(&thumbnails, 2).unwrap().unwrap();
        assert_eq!((sheet.width(), sheet.height()), (32, 16));

        let second = sheet.get_pixel(16 + 8, 4);
        assert!(second[1] > 200 && second[0] < 50, "green cell: {second:?}");
        let third = sheet.get_pixel(8, 8 + 4);
        assert!(third[2] > 200 && third[0] < 50, "blue cell: {third:?}");
    }

    #[test]
    fn sheet_narrower_than_columns() {
        let thumbnails = vec![solid(10, 10, [0, 0, 0])];
        let sheet = sprite_sheet(&thumbnails, 4).unwrap().unwrap();
        assert_eq!((sheet.width(), sheet.height()), (10, 10));
    }

    #[test]
    fn empty_input_has_no_sheet() {
        assert!(sprite_sheet(&[], 3).unwrap().is_none());
        assert!(
            sprite_sheet(&[Thumbnail::new(0.0, None)], 3)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn zero_columns_is_rejected() {
        assert!(matches!(
            sprite_sheet(&[], 0),
            Err(ThumbnailError::InvalidOption { name: "columns", .. })
        ));
    }

    #[test]
    fn data_url_round_trips_through_blob() {
        let thumbnail = solid(4, 4, [10, 20, 30]);
        let url = thumbnail.to_data_url().unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert!(Thumbnail::new(1.0, None).to_data_url().is_none());
    }
}
