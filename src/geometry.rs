//! Resolution mapping between the original image and its display proxy.
//!
//! Annotation happens on a proxy no wider than the configured display width;
//! compositing happens at the original resolution. Both sides must agree on
//! the exact proxy geometry, so the mapping here is a pure function of its
//! inputs.

use tracing::debug;

use crate::error::{Error, Result};

/// Default maximum width of the display proxy, in pixels.
pub const DEFAULT_MAX_DISPLAY_WIDTH: u32 = 800;

/// A positive `(width, height)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create a dimension pair, rejecting zero-sized axes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if either side is zero.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    /// Number of pixels covered.
    #[must_use]
    pub fn area(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// The pair as a tuple.
    #[must_use]
    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Derived geometry of the display proxy for one original image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProxyGeometry {
    /// Size of the original image.
    pub original: Dimensions,
    /// Size of the proxy shown to the user.
    pub proxy: Dimensions,
    /// `original.width / proxy.width`; exactly `1.0` when no downscaling happens.
    pub scale_factor: f64,
}

impl ProxyGeometry {
    /// Whether proxy and original share the same geometry.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.original == self.proxy
    }

    /// Map a proxy pixel coordinate to the original pixel it covers first.
    ///
    /// Uses the same integer mapping as the nearest-neighbor upscaler, inverted:
    /// the result is the smallest original coordinate whose source is `(x, y)`.
    #[must_use]
    pub fn proxy_to_original(&self, x: u32, y: u32) -> (u32, u32) {
        (
            first_target_for(x, self.proxy.width, self.original.width),
            first_target_for(y, self.proxy.height, self.original.height),
        )
    }

    /// Map an original pixel coordinate to the proxy pixel it samples from.
    #[must_use]
    pub fn original_to_proxy(&self, x: u32, y: u32) -> (u32, u32) {
        (
            crate::upscale::source_coordinate(x, self.proxy.width, self.original.width),
            crate::upscale::source_coordinate(y, self.proxy.height, self.original.height),
        )
    }
}

/// Smallest target coordinate `t` with `floor(t * src / dst) >= s`.
fn first_target_for(s: u32, src: u32, dst: u32) -> u32 {
    let t = (u64::from(s) * u64::from(dst)).div_ceil(u64::from(src));
    u32::try_from(t).unwrap_or(u32::MAX).min(dst.saturating_sub(1))
}

/// Compute the proxy size and scale factor for an original image.
///
/// Images no wider than `max_display_width` are shown at full size with a
/// scale factor of exactly `1.0`. Wider images are shrunk to
/// `max_display_width`, with the height rounded to the nearest pixel (and
/// never below one pixel).
///
/// # Errors
///
/// Returns [`Error::InvalidDimensions`] if any argument is zero.
pub fn derive_proxy_dimensions(
    original_width: u32,
    original_height: u32,
    max_display_width: u32,
) -> Result<ProxyGeometry> {
    let original = Dimensions::new(original_width, original_height)?;
    if max_display_width == 0 {
        return Err(Error::InvalidDimensions {
            width: max_display_width,
            height: original_height,
        });
    }

    if original_width <= max_display_width {
        return Ok(ProxyGeometry {
            original,
            proxy: original,
            scale_factor: 1.0,
        });
    }

    let scale_factor = f64::from(original_width) / f64::from(max_display_width);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let proxy_height = ((f64::from(original_height) / scale_factor).round() as u32).max(1);

    let geometry = ProxyGeometry {
        original,
        proxy: Dimensions {
            width: max_display_width,
            height: proxy_height,
        },
        scale_factor,
    };
    debug!(
        original_width,
        original_height,
        proxy_width = geometry.proxy.width,
        proxy_height,
        scale_factor,
        "derived proxy geometry"
    );
    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_images_keep_their_size() {
        let g = derive_proxy_dimensions(640, 480, 800).unwrap();
        assert_eq!(g.proxy, g.original);
        assert!((g.scale_factor - 1.0).abs() < f64::EPSILON);
        assert!(g.is_identity());

        let g = derive_proxy_dimensions(800, 3000, 800).unwrap();
        assert_eq!(g.proxy.as_tuple(), (800, 3000));
        assert!((g.scale_factor - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn full_hd_maps_to_800_by_450() {
        let g = derive_proxy_dimensions(1920, 1080, 800).unwrap();
        assert_eq!(g.proxy.as_tuple(), (800, 450));
        assert!((g.scale_factor - 2.4).abs() < 1e-12);
        assert!(!g.is_identity());
    }

    #[test]
    fn aspect_is_preserved_within_one_pixel() {
        for &(w, h) in &[(801, 601), (1000, 333), (4032, 3024), (3001, 7), (12345, 6789)] {
            let g = derive_proxy_dimensions(w, h, 800).unwrap();
            assert_eq!(g.proxy.width, 800);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let back = (f64::from(g.proxy.height) * g.scale_factor).round() as i64;
            assert!(
                (back - i64::from(h)).abs() <= 1,
                "{w}x{h} -> {:?}, rescaled height {back}",
                g.proxy
            );
        }
    }

    #[test]
    fn very_flat_images_keep_one_row() {
        let g = derive_proxy_dimensions(10_000, 1, 800).unwrap();
        assert_eq!(g.proxy.as_tuple(), (800, 1));
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(matches!(
            derive_proxy_dimensions(0, 10, 800),
            Err(Error::InvalidDimensions { width: 0, .. })
        ));
        assert!(matches!(
            derive_proxy_dimensions(10, 0, 800),
            Err(Error::InvalidDimensions { height: 0, .. })
        ));
        assert!(derive_proxy_dimensions(10, 10, 0).is_err());
    }

    #[test]
    fn derivation_is_stable() {
        let a = derive_proxy_dimensions(2999, 1777, 800).unwrap();
        let b = derive_proxy_dimensions(2999, 1777, 800).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn coordinate_mapping_round_trips_through_proxy() {
        let g = derive_proxy_dimensions(1920, 1080, 800).unwrap();
        assert_eq!(g.original_to_proxy(0, 0), (0, 0));
        assert_eq!(g.original_to_proxy(1919, 1079), (799, 449));
        for px in [0u32, 1, 100, 399, 799] {
            let (ox, _) = g.proxy_to_original(px, 0);
            assert_eq!(g.original_to_proxy(ox, 0).0, px);
            if ox > 0 {
                assert!(g.original_to_proxy(ox - 1, 0).0 < px);
            }
        }
    }
}
