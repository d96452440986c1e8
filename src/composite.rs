//! Alpha compositing of a classification onto the original image.
//!
//! Only the alpha channel is written:
//! - `Erase` sets alpha to 0
//! - `Restore` sets alpha to 255, and always wins over `Erase`
//! - `Untouched` keeps the original alpha
//!
//! The transform is pure and idempotent. Compositing an all-`Untouched`
//! classification returns the input unchanged.

use image::RgbaImage;
use tracing::{debug, instrument};

use crate::classify::{Classification, MaskLabel};
use crate::error::{Error, Result};

/// Alpha written for erased pixels.
pub const ERASED_ALPHA: u8 = 0;

/// Alpha written for restored pixels.
pub const RESTORED_ALPHA: u8 = 255;

/// Per-label pixel counts of one compositing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositeStats {
    /// Pixels made fully transparent.
    pub erased: usize,
    /// Pixels forced fully opaque.
    pub restored: usize,
    /// Pixels whose alpha was left as is.
    pub untouched: usize,
}

impl CompositeStats {
    /// Count the labels of a classification.
    #[must_use]
    pub fn from_classification(classification: &Classification) -> Self {
        classification
            .labels()
            .iter()
            .fold(Self::default(), |mut stats, label| {
                match label {
                    MaskLabel::Erase => stats.erased += 1,
                    MaskLabel::Restore => stats.restored += 1,
                    MaskLabel::Untouched => stats.untouched += 1,
                }
                stats
            })
    }

    /// Total number of pixels visited.
    #[must_use]
    pub fn total(&self) -> usize {
        self.erased + self.restored + self.untouched
    }
}

/// New alpha value for a pixel with the given label.
#[must_use]
pub fn apply_label(alpha: u8, label: MaskLabel) -> u8 {
    match label {
        MaskLabel::Untouched => alpha,
        MaskLabel::Erase => ERASED_ALPHA,
        MaskLabel::Restore => RESTORED_ALPHA,
    }
}

/// Write classification-derived alpha values onto a copy of `original`.
///
/// `classification` must already be at the original resolution; upscale it
/// (or the annotation it came from) first.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if the classification grid and the
/// image differ in size. Nothing is composited in that case.
pub fn composite(original: &RgbaImage, classification: &Classification) -> Result<RgbaImage> {
    composite_with_stats(original, classification).map(|(image, _)| image)
}

/// Like [`composite`], also reporting how many pixels each label touched.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] on a size mismatch.
#[instrument(
    skip(original, classification),
    fields(dimensions = %format!("{}x{}", original.width(), original.height()))
)]
pub fn composite_with_stats(
    original: &RgbaImage,
    classification: &Classification,
) -> Result<(RgbaImage, CompositeStats)> {
    Error::check_dimensions(
        original.dimensions(),
        classification.dimensions().as_tuple(),
    )?;

    let mut output = original.clone();
    let labels = classification.labels();

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        output
            .par_chunks_exact_mut(4)
            .zip(labels.par_iter())
            .for_each(|(px, &label)| px[3] = apply_label(px[3], label));
    }

    #[cfg(not(feature = "parallel"))]
    {
        for (px, &label) in output.pixels_mut().zip(labels) {
            px[3] = apply_label(px[3], label);
        }
    }

    let stats = CompositeStats::from_classification(classification);
    debug!(
        erased = stats.erased,
        restored = stats.restored,
        untouched = stats.untouched,
        "composited alpha channel"
    );
    Ok((output, stats))
}
