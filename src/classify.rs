//! Per-pixel classification of annotation buffers.
//!
//! The drawing surface encodes erase marks as red paint and restore marks as
//! green paint. Classification reads channel values only; alpha is ignored, so
//! a faint red rectangle fill still counts as an erase mark.
//!
//! Precedence is `Restore > Erase > Untouched`.

use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::error::{Error, Result};
use crate::geometry::Dimensions;

/// Category of a single annotation pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaskLabel {
    /// Nothing drawn; the original alpha is kept.
    #[default]
    Untouched,
    /// Red paint; the pixel becomes fully transparent.
    Erase,
    /// Green paint; the pixel becomes fully opaque, overriding any erase mark.
    Restore,
}

/// Classify one annotation pixel.
///
/// Erase requires `red > 0 && green == 0`; any non-zero green is Restore,
/// regardless of red.
#[must_use]
pub fn classify_pixel(pixel: &Rgba<u8>) -> MaskLabel {
    let [r, g, _, _] = pixel.0;
    let mut label = MaskLabel::Untouched;
    if r > 0 && g == 0 {
        label = MaskLabel::Erase;
    }
    // Evaluated last so it overrides.
    if g > 0 {
        label = MaskLabel::Restore;
    }
    label
}

/// A grid of [`MaskLabel`]s with the geometry of the buffer it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    dimensions: Dimensions,
    labels: Vec<MaskLabel>,
}

impl Classification {
    /// Classify every pixel of an annotation buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] for an empty buffer.
    pub fn from_annotation(buffer: &RgbaImage) -> Result<Self> {
        let dimensions = Dimensions::new(buffer.width(), buffer.height())?;

        #[cfg(feature = "parallel")]
        let labels: Vec<MaskLabel> = {
            use rayon::prelude::*;
            buffer
                .as_raw()
                .par_chunks_exact(4)
                .map(|px| classify_pixel(&Rgba([px[0], px[1], px[2], px[3]])))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let labels: Vec<MaskLabel> = buffer.pixels().map(classify_pixel).collect();

        let classification = Self { dimensions, labels };
        debug!(
            width = dimensions.width,
            height = dimensions.height,
            erase = classification.count(MaskLabel::Erase),
            restore = classification.count(MaskLabel::Restore),
            "classified annotation buffer"
        );
        Ok(classification)
    }

    /// Build a classification from raw row-major labels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] for a zero-sized grid and
    /// [`Error::DimensionMismatch`] when `labels` does not hold exactly
    /// `width * height` entries.
    pub fn from_labels(width: u32, height: u32, labels: Vec<MaskLabel>) -> Result<Self> {
        let dimensions = Dimensions::new(width, height)?;
        if labels.len() != dimensions.area() {
            let actual_height = u32::try_from(labels.len() / width as usize).unwrap_or(u32::MAX);
            return Err(Error::DimensionMismatch {
                expected: dimensions.as_tuple(),
                actual: (width, actual_height),
            });
        }
        Ok(Self { dimensions, labels })
    }

    /// A grid where every cell is [`MaskLabel::Untouched`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] for a zero-sized grid.
    pub fn untouched(width: u32, height: u32) -> Result<Self> {
        let dimensions = Dimensions::new(width, height)?;
        Ok(Self {
            dimensions,
            labels: vec![MaskLabel::Untouched; dimensions.area()],
        })
    }

    /// Grid geometry.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Grid width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.dimensions.width
    }

    /// Grid height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.dimensions.height
    }

    /// Label at `(x, y)`, or `None` outside the grid.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<MaskLabel> {
        if x >= self.dimensions.width || y >= self.dimensions.height {
            return None;
        }
        self.labels
            .get(y as usize * self.dimensions.width as usize + x as usize)
            .copied()
    }

    /// Row-major labels.
    #[must_use]
    pub fn labels(&self) -> &[MaskLabel] {
        &self.labels
    }

    /// Number of cells carrying `label`.
    #[must_use]
    pub fn count(&self, label: MaskLabel) -> usize {
        self.labels.iter().filter(|&&l| l == label).count()
    }

    /// Whether no cell carries an erase or restore mark.
    #[must_use]
    pub fn is_untouched(&self) -> bool {
        self.labels.iter().all(|&l| l == MaskLabel::Untouched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_red_is_erase() {
        assert_eq!(classify_pixel(&Rgba([255, 0, 0, 255])), MaskLabel::Erase);
        assert_eq!(classify_pixel(&Rgba([1, 0, 200, 0])), MaskLabel::Erase);
    }

    #[test]
    fn faint_red_fill_is_still_erase() {
        assert_eq!(classify_pixel(&Rgba([255, 0, 0, 77])), MaskLabel::Erase);
        assert_eq!(classify_pixel(&Rgba([255, 0, 0, 1])), MaskLabel::Erase);
    }

    #[test]
    fn any_green_is_restore() {
        assert_eq!(classify_pixel(&Rgba([0, 255, 0, 255])), MaskLabel::Restore);
        assert_eq!(classify_pixel(&Rgba([0, 1, 0, 255])), MaskLabel::Restore);
    }

    #[test]
    fn restore_wins_when_red_and_green_are_both_present() {
        assert_eq!(
            classify_pixel(&Rgba([255, 255, 0, 255])),
            MaskLabel::Restore
        );
        assert_eq!(classify_pixel(&Rgba([200, 3, 0, 40])), MaskLabel::Restore);
    }

    #[test]
    fn empty_and_blue_pixels_are_untouched() {
        assert_eq!(classify_pixel(&Rgba([0, 0, 0, 0])), MaskLabel::Untouched);
        assert_eq!(classify_pixel(&Rgba([0, 0, 0, 255])), MaskLabel::Untouched);
        assert_eq!(classify_pixel(&Rgba([0, 0, 255, 255])), MaskLabel::Untouched);
    }

    #[test]
    fn buffer_classification_is_row_major() {
        let mut buf = RgbaImage::new(3, 2);
        buf.put_pixel(2, 0, Rgba([255, 0, 0, 255]));
        buf.put_pixel(0, 1, Rgba([0, 255, 0, 255]));

        let c = Classification::from_annotation(&buf).unwrap();
        assert_eq!(c.dimensions().as_tuple(), (3, 2));
        assert_eq!(c.get(2, 0), Some(MaskLabel::Erase));
        assert_eq!(c.get(0, 1), Some(MaskLabel::Restore));
        assert_eq!(c.get(1, 1), Some(MaskLabel::Untouched));
        assert_eq!(c.get(3, 0), None);
        assert_eq!(c.count(MaskLabel::Erase), 1);
        assert_eq!(c.count(MaskLabel::Restore), 1);
        assert_eq!(c.count(MaskLabel::Untouched), 4);
        assert!(!c.is_untouched());
    }

    #[test]
    fn blank_buffer_is_untouched() {
        let c = Classification::from_annotation(&RgbaImage::new(8, 8)).unwrap();
        assert!(c.is_untouched());
        assert_eq!(c, Classification::untouched(8, 8).unwrap());
    }

    #[test]
    fn empty_buffer_is_rejected() {
        assert!(matches!(
            Classification::from_annotation(&RgbaImage::new(0, 4)),
            Err(Error::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn from_labels_checks_length() {
        assert!(Classification::from_labels(2, 2, vec![MaskLabel::Erase; 4]).is_ok());
        assert!(matches!(
            Classification::from_labels(2, 2, vec![MaskLabel::Erase; 3]),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}
