//! Tool configuration and a minimal rasterizing annotation canvas.
//!
//! Interactive front ends bring their own drawing surface; all the core needs
//! is a proxy-sized RGBA buffer with red erase marks and green restore marks.
//! [`AnnotationCanvas`] produces such a buffer from rectangles and brush
//! strokes, which is enough for scripted use and tests.

use std::str::FromStr;

use image::{Rgba, RgbaImage};

use crate::classify::{classify_pixel, MaskLabel};
use crate::error::Result;
use crate::geometry::{Dimensions, ProxyGeometry};

/// Smallest allowed brush width.
pub const MIN_BRUSH_WIDTH: u32 = 1;
/// Largest allowed brush width.
pub const MAX_BRUSH_WIDTH: u32 = 50;
/// Default restore brush width.
pub const DEFAULT_RESTORE_WIDTH: u32 = 15;
/// Outline width of erase rectangles.
pub const ERASE_OUTLINE_WIDTH: u32 = 2;

/// Opaque red used for erase outlines.
pub const ERASE_STROKE: Rgba<u8> = Rgba([255, 0, 0, 255]);
/// Translucent red (about 30% alpha) used to fill erase rectangles.
pub const ERASE_FILL: Rgba<u8> = Rgba([255, 0, 0, 77]);
/// Opaque green used for restore strokes.
pub const RESTORE_STROKE: Rgba<u8> = Rgba([0, 255, 0, 255]);

/// What a mark does to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolMode {
    /// Rectangle tool; marked pixels become transparent.
    Erase,
    /// Freehand brush; marked pixels become opaque again.
    Restore,
}

/// Tool state handed to a drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolConfig {
    /// Erase or restore.
    pub mode: ToolMode,
    /// Line width in proxy pixels, within `MIN_BRUSH_WIDTH..=MAX_BRUSH_WIDTH`.
    pub brush_width: u32,
}

impl ToolConfig {
    /// The erase rectangle tool with its fixed thin outline.
    #[must_use]
    pub fn erase() -> Self {
        Self {
            mode: ToolMode::Erase,
            brush_width: ERASE_OUTLINE_WIDTH,
        }
    }

    /// The restore brush, with `brush_width` clamped to the allowed range.
    #[must_use]
    pub fn restore(brush_width: u32) -> Self {
        Self {
            mode: ToolMode::Restore,
            brush_width: brush_width.clamp(MIN_BRUSH_WIDTH, MAX_BRUSH_WIDTH),
        }
    }

    /// Line color for this mode.
    #[must_use]
    pub fn stroke_color(&self) -> Rgba<u8> {
        match self.mode {
            ToolMode::Erase => ERASE_STROKE,
            ToolMode::Restore => RESTORE_STROKE,
        }
    }

    /// Fill color for closed shapes, if the mode fills them.
    #[must_use]
    pub fn fill_color(&self) -> Option<Rgba<u8>> {
        match self.mode {
            ToolMode::Erase => Some(ERASE_FILL),
            ToolMode::Restore => None,
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self::restore(DEFAULT_RESTORE_WIDTH)
    }
}

/// An axis-aligned rectangle in proxy pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Create a rectangle.
    #[must_use]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanning two inclusive corners.
    #[must_use]
    pub fn from_corners(a: (u32, u32), b: (u32, u32)) -> Self {
        let (x0, x1) = (a.0.min(b.0), a.0.max(b.0));
        let (y0, y1) = (a.1.min(b.1), a.1.max(b.1));
        Self::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1)
    }
}

impl FromStr for Rect {
    type Err = String;

    /// Parse `"X,Y,W,H"`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<u32> = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| format!("invalid rectangle '{s}': {e}"))?;
        match parts.as_slice() {
            &[x, y, width, height] => Ok(Self::new(x, y, width, height)),
            _ => Err(format!("invalid rectangle '{s}': expected X,Y,W,H")),
        }
    }
}

/// Straight-alpha source-over blend of `src` onto `dst`.
fn blend_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = f32::from(src[3]) / 255.0;
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let to_u8 = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    let channel =
        |s: u8, d: u8| to_u8((f32::from(s) * sa + f32::from(d) * da * (1.0 - sa)) / out_a);

    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        to_u8(out_a * 255.0),
    ])
}

/// Squared distance from `p` to the segment `a..b`.
///
/// Computed in `f64` so segments spanning huge coordinates do not overflow.
fn segment_distance_sq(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f64 {
    let (px, py) = (f64::from(p.0), f64::from(p.1));
    let (ax, ay) = (f64::from(a.0), f64::from(a.1));
    let (dx, dy) = (f64::from(b.0) - ax, f64::from(b.1) - ay);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0.0 {
        (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    (px - cx) * (px - cx) + (py - cy) * (py - cy)
}

/// A proxy-sized RGBA annotation buffer that marks can be drawn onto.
///
/// Marks are blended source-over in drawing order, the way an HTML canvas
/// layer would rasterize them.
#[derive(Debug, Clone)]
pub struct AnnotationCanvas {
    buffer: RgbaImage,
}

impl AnnotationCanvas {
    /// A blank canvas.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidDimensions`] if either side is zero.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Dimensions::new(width, height)?;
        Ok(Self {
            buffer: RgbaImage::new(width, height),
        })
    }

    /// A blank canvas matching a proxy geometry.
    #[must_use]
    pub fn for_geometry(geometry: &ProxyGeometry) -> Self {
        Self {
            buffer: RgbaImage::new(geometry.proxy.width, geometry.proxy.height),
        }
    }

    /// Continue drawing on an existing buffer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidDimensions`] for an empty buffer.
    pub fn from_buffer(buffer: RgbaImage) -> Result<Self> {
        Dimensions::new(buffer.width(), buffer.height())?;
        Ok(Self { buffer })
    }

    /// The rasterized marks so far.
    #[must_use]
    pub fn buffer(&self) -> &RgbaImage {
        &self.buffer
    }

    /// Take the rasterized buffer.
    #[must_use]
    pub fn into_buffer(self) -> RgbaImage {
        self.buffer
    }

    /// Whether the buffer carries no erase or restore mark.
    ///
    /// Uses the classifier, so a zero-alpha red pixel still counts as a mark.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.buffer
            .pixels()
            .all(|px| classify_pixel(px) == MaskLabel::Untouched)
    }

    fn paint(
        &mut self,
        covered: impl Fn(u32, u32) -> bool,
        bounds: (i64, i64, i64, i64),
        color: Rgba<u8>,
    ) {
        let w = i64::from(self.buffer.width());
        let h = i64::from(self.buffer.height());
        let (x0, y0) = (bounds.0.max(0), bounds.1.max(0));
        let (x1, y1) = (bounds.2.min(w), bounds.3.min(h));
        for y in y0..y1 {
            for x in x0..x1 {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let (x, y) = (x as u32, y as u32);
                if covered(x, y) {
                    let px = self.buffer.get_pixel_mut(x, y);
                    *px = blend_over(*px, color);
                }
            }
        }
    }

    /// Draw a rectangle: the mode's fill (if any), then an outline of
    /// `brush_width` centered on the rectangle's edges. Clipped to the canvas.
    pub fn draw_rect(&mut self, tool: &ToolConfig, rect: Rect) {
        if rect.width == 0 || rect.height == 0 {
            return;
        }
        let x0 = i64::from(rect.x);
        let y0 = i64::from(rect.y);
        let x1 = x0 + i64::from(rect.width);
        let y1 = y0 + i64::from(rect.height);

        if let Some(fill) = tool.fill_color() {
            self.paint(|_, _| true, (x0, y0, x1, y1), fill);
        }

        let outer = i64::from(tool.brush_width / 2);
        let inner = i64::from(tool.brush_width) - outer;
        self.paint(
            |x, y| {
                let (x, y) = (i64::from(x), i64::from(y));
                x < x0 + inner || x >= x1 - inner || y < y0 + inner || y >= y1 - inner
            },
            (x0 - outer, y0 - outer, x1 + outer, y1 + outer),
            tool.stroke_color(),
        );
    }

    /// Draw a round-capped polyline through `points` with the tool's color and width.
    ///
    /// A single point draws a dot of diameter `brush_width`. Non-finite points
    /// are skipped.
    pub fn draw_stroke(&mut self, tool: &ToolConfig, points: &[(f32, f32)]) {
        let points: Vec<(f32, f32)> = points
            .iter()
            .copied()
            .filter(|p| p.0.is_finite() && p.1.is_finite())
            .collect();
        let Some(&first) = points.first() else {
            return;
        };
        let radius = f32::from(u16::try_from(tool.brush_width).unwrap_or(u16::MAX)) / 2.0;
        let radius_sq = f64::from(radius * radius);

        let segments: Vec<((f32, f32), (f32, f32))> = if points.len() == 1 {
            vec![(first, first)]
        } else {
            points.windows(2).map(|w| (w[0], w[1])).collect()
        };

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.0, first.1, first.0, first.1);
        for &(x, y) in &points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        // Clamp to one pixel past the canvas before converting.
        #[allow(clippy::cast_possible_truncation)]
        let clamp_to = |v: f32, len: u32| f64::from(v).clamp(-1.0, f64::from(len) + 1.0) as i64;
        let (w, h) = (self.buffer.width(), self.buffer.height());
        let bounds = (
            clamp_to((min_x - radius).floor(), w),
            clamp_to((min_y - radius).floor(), h),
            clamp_to((max_x + radius).ceil() + 1.0, w),
            clamp_to((max_y + radius).ceil() + 1.0, h),
        );

        #[allow(clippy::cast_precision_loss)]
        let covered = |x: u32, y: u32| {
            let p = (x as f32 + 0.5, y as f32 + 0.5);
            segments
                .iter()
                .any(|&(a, b)| segment_distance_sq(p, a, b) <= radius_sq)
        };
        self.paint(covered, bounds, tool.stroke_color());
    }

    /// Draw a filled dot of diameter `brush_width` centered at `(cx, cy)`.
    pub fn draw_dot(&mut self, tool: &ToolConfig, cx: f32, cy: f32) {
        self.draw_stroke(tool, &[(cx, cy)]);
    }
}
