//! Nearest-neighbor resampling of annotation buffers and classifications.
//!
//! Annotation data is categorical, so no output pixel may ever be a blend of
//! two source pixels. Output `(x, y)` copies source
//! `(floor(x * src_w / dst_w), floor(y * src_h / dst_h))`, clamped to the
//! source bounds.
//!
//! At non-integer scale factors a mark can shift by up to one proxy pixel's
//! worth of original pixels. That precision loss is inherent to drawing on a
//! proxy and is accepted; interpolating instead would invent mixed colors at
//! mark boundaries and corrupt the erase/restore decision there.

use image::RgbaImage;
use tracing::debug;

use crate::classify::Classification;
use crate::error::{Error, Result};
use crate::geometry::Dimensions;

/// Source coordinate sampled by target coordinate `t` along one axis.
#[must_use]
pub fn source_coordinate(t: u32, src_len: u32, dst_len: u32) -> u32 {
    if dst_len == 0 || src_len == 0 {
        return 0;
    }
    let s = u64::from(t) * u64::from(src_len) / u64::from(dst_len);
    u32::try_from(s).unwrap_or(u32::MAX).min(src_len - 1)
}

/// Per-axis lookup table from target index to source index.
fn axis_map(src_len: u32, dst_len: u32) -> Vec<usize> {
    (0..dst_len)
        .map(|t| source_coordinate(t, src_len, dst_len) as usize)
        .collect()
}

/// Resample a row-major grid of `channels`-wide cells.
fn resample<T: Copy + Send + Sync>(
    src: &[T],
    src_dims: Dimensions,
    channels: usize,
    dst_dims: Dimensions,
) -> Vec<T> {
    let xs = axis_map(src_dims.width, dst_dims.width);
    let ys = axis_map(src_dims.height, dst_dims.height);
    let src_row = src_dims.width as usize * channels;
    let dst_row = dst_dims.width as usize * channels;

    let fill_row = |y: usize, row: &mut [T]| {
        let src_start = ys[y] * src_row;
        let src_line = &src[src_start..src_start + src_row];
        for (x, &sx) in xs.iter().enumerate() {
            row[x * channels..(x + 1) * channels]
                .copy_from_slice(&src_line[sx * channels..(sx + 1) * channels]);
        }
    };

    let Some(&seed) = src.first() else {
        return Vec::new();
    };
    let mut out = vec![seed; dst_row * dst_dims.height as usize];

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        out.par_chunks_mut(dst_row)
            .enumerate()
            .for_each(|(y, row)| fill_row(y, row));
    }

    #[cfg(not(feature = "parallel"))]
    {
        out.chunks_mut(dst_row)
            .enumerate()
            .for_each(|(y, row)| fill_row(y, row));
    }

    out
}

/// Resample an RGBA annotation buffer to `target_width x target_height`.
///
/// Same-size requests return an identical copy.
///
/// # Errors
///
/// Returns [`Error::InvalidDimensions`] if the target or the source has a
/// zero-sized axis.
pub fn upscale_annotation(
    buffer: &RgbaImage,
    target_width: u32,
    target_height: u32,
) -> Result<RgbaImage> {
    let target = Dimensions::new(target_width, target_height)?;
    let source = Dimensions::new(buffer.width(), buffer.height())?;
    if source == target {
        return Ok(buffer.clone());
    }

    debug!(
        from_width = source.width,
        from_height = source.height,
        to_width = target.width,
        to_height = target.height,
        "nearest-neighbor upscale of annotation buffer"
    );
    let raw = resample(buffer.as_raw(), source, 4, target);
    RgbaImage::from_raw(target.width, target.height, raw).ok_or(Error::DimensionMismatch {
        expected: target.as_tuple(),
        actual: source.as_tuple(),
    })
}

/// Resample a classification grid to `target_width x target_height`.
///
/// # Errors
///
/// Returns [`Error::InvalidDimensions`] if the target has a zero-sized axis.
pub fn upscale_classification(
    classification: &Classification,
    target_width: u32,
    target_height: u32,
) -> Result<Classification> {
    let target = Dimensions::new(target_width, target_height)?;
    let source = classification.dimensions();
    if source == target {
        return Ok(classification.clone());
    }

    let labels = resample(classification.labels(), source, 1, target);
    Classification::from_labels(target.width, target.height, labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::MaskLabel;
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);

    fn patterned(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            let r = u8::try_from(x * 7 % 256).unwrap();
            let g = u8::try_from(y * 13 % 256).unwrap();
            Rgba([r, g, 9, 255])
        })
    }

    #[test]
    fn source_coordinate_floors_and_clamps() {
        assert_eq!(source_coordinate(0, 800, 1920), 0);
        assert_eq!(source_coordinate(2, 800, 1920), 0);
        assert_eq!(source_coordinate(3, 800, 1920), 1);
        assert_eq!(source_coordinate(1919, 800, 1920), 799);
        assert_eq!(source_coordinate(5000, 800, 1920), 799);
        assert_eq!(source_coordinate(3, 10, 0), 0);
    }

    #[test]
    fn same_size_is_identity() {
        let buf = patterned(17, 9);
        let out = upscale_annotation(&buf, 17, 9).unwrap();
        assert_eq!(out, buf);
    }

    #[test]
    fn integer_factor_replicates_blocks() {
        let mut buf = RgbaImage::new(2, 2);
        buf.put_pixel(0, 0, RED);
        buf.put_pixel(1, 1, GREEN);

        let out = upscale_annotation(&buf, 6, 6).unwrap();
        for y in 0..6 {
            for x in 0..6 {
                let expected = *buf.get_pixel(x / 3, y / 3);
                assert_eq!(*out.get_pixel(x, y), expected, "at ({x},{y})");
            }
        }
    }

    #[test]
    fn no_new_colors_are_introduced() {
        let mut buf = RgbaImage::new(5, 3);
        buf.put_pixel(1, 1, RED);
        buf.put_pixel(2, 1, GREEN);
        buf.put_pixel(3, 2, Rgba([255, 0, 0, 77]));

        let out = upscale_annotation(&buf, 13, 11).unwrap();
        for px in out.pixels() {
            assert!(buf.pixels().any(|s| s == px), "invented color {px:?}");
        }
    }

    #[test]
    fn red_block_maps_exactly_at_non_integer_ratio() {
        let (sw, sh, tw, th) = (7u32, 5u32, 23u32, 17u32);
        let mut buf = RgbaImage::new(sw, sh);
        for y in 1..4 {
            for x in 2..5 {
                buf.put_pixel(x, y, RED);
            }
        }

        let out = upscale_annotation(&buf, tw, th).unwrap();
        let c = Classification::from_annotation(&out).unwrap();
        for y in 0..th {
            for x in 0..tw {
                let sx = source_coordinate(x, sw, tw);
                let sy = source_coordinate(y, sh, th);
                let inside = (2..5).contains(&sx) && (1..4).contains(&sy);
                let expected = if inside {
                    MaskLabel::Erase
                } else {
                    MaskLabel::Untouched
                };
                assert_eq!(c.get(x, y), Some(expected), "at ({x},{y})");
            }
        }
    }

    #[test]
    fn classification_upscale_matches_buffer_upscale() {
        let mut buf = RgbaImage::new(9, 4);
        buf.put_pixel(0, 0, RED);
        buf.put_pixel(4, 2, GREEN);
        buf.put_pixel(8, 3, RED);

        let via_buffer =
            Classification::from_annotation(&upscale_annotation(&buf, 31, 15).unwrap()).unwrap();
        let via_labels =
            upscale_classification(&Classification::from_annotation(&buf).unwrap(), 31, 15)
                .unwrap();
        assert_eq!(via_buffer, via_labels);
    }

    #[test]
    fn zero_target_is_rejected() {
        let buf = patterned(4, 4);
        assert!(matches!(
            upscale_annotation(&buf, 0, 4),
            Err(Error::InvalidDimensions { .. })
        ));
        let c = Classification::untouched(4, 4).unwrap();
        assert!(upscale_classification(&c, 4, 0).is_err());
    }
}
