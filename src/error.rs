//! Error types for the hybrid-cutout crate.

/// Errors that can occur while mapping, classifying, upscaling or compositing masks.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A width or height of zero was supplied to a geometry operation.
    #[error("invalid dimensions {width}x{height}: width and height must be positive")]
    InvalidDimensions {
        /// Offending width in pixels.
        width: u32,
        /// Offending height in pixels.
        height: u32,
    },

    /// A grid does not have the geometry of the image it is applied to.
    #[error(
        "dimension mismatch: expected {}x{}, got {}x{}",
        expected.0, expected.1, actual.0, actual.1
    )]
    DimensionMismatch {
        /// Required `(width, height)`.
        expected: (u32, u32),
        /// Supplied `(width, height)`.
        actual: (u32, u32),
    },

    /// The input cannot be decoded and normalized to RGBA, or the output format is not lossless.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error occurred while encoding or saving an image.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Check a `(width, height)` pair against an expected geometry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] when the pairs differ.
    pub fn check_dimensions(expected: (u32, u32), actual: (u32, u32)) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Error::DimensionMismatch { expected, actual })
        }
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let io_err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io_err.to_string().contains("gone"));

        let unsupported = Error::UnsupportedFormat("tiff".to_string());
        assert!(unsupported.to_string().contains("tiff"));

        let invalid = Error::InvalidDimensions {
            width: 0,
            height: 20,
        };
        assert!(invalid.to_string().contains("0x20"));

        let mismatch = Error::DimensionMismatch {
            expected: (800, 450),
            actual: (640, 480),
        };
        let msg = mismatch.to_string();
        assert!(msg.contains("800x450"));
        assert!(msg.contains("640x480"));
    }

    #[test]
    fn check_dimensions_accepts_equal_pairs_only() {
        assert!(Error::check_dimensions((3, 4), (3, 4)).is_ok());
        assert!(matches!(
            Error::check_dimensions((3, 4), (4, 3)),
            Err(Error::DimensionMismatch {
                expected: (3, 4),
                actual: (4, 3)
            })
        ));
    }
}
