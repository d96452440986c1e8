//! Session orchestration: load, proxy, annotate, composite, export.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use tracing::{debug, info};

use crate::annotate::AnnotationCanvas;
use crate::classify::{classify_pixel, Classification, MaskLabel};
use crate::composite::{composite_with_stats, CompositeStats};
use crate::error::{Error, Result};
use crate::geometry::{derive_proxy_dimensions, ProxyGeometry, DEFAULT_MAX_DISPLAY_WIDTH};
use crate::upscale::upscale_annotation;

/// Options controlling how a session builds its display proxy.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Widest proxy shown to the user, in pixels.
    pub max_display_width: u32,
    /// Resampling filter for the display proxy only. Masks always use nearest-neighbor.
    pub proxy_filter: FilterType,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_display_width: DEFAULT_MAX_DISPLAY_WIDTH,
            proxy_filter: FilterType::Triangle,
        }
    }
}

impl SessionConfig {
    /// Set the maximum display width.
    #[must_use]
    pub fn with_max_display_width(mut self, max_display_width: u32) -> Self {
        self.max_display_width = max_display_width;
        self
    }

    /// Set the proxy resampling filter.
    #[must_use]
    pub fn with_proxy_filter(mut self, proxy_filter: FilterType) -> Self {
        self.proxy_filter = proxy_filter;
        self
    }
}

/// One original image and its display proxy.
///
/// The original is never modified; every composite starts from it, so a
/// fresh annotation snapshot always renders from scratch.
#[derive(Debug, Clone)]
pub struct Session {
    original: RgbaImage,
    proxy: RgbaImage,
    geometry: ProxyGeometry,
}

impl Session {
    /// Start a session from a decoded image, normalizing it to RGBA.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] for an empty image or a zero
    /// display width.
    pub fn new(image: &DynamicImage, config: &SessionConfig) -> Result<Self> {
        let original = image.to_rgba8();
        let geometry = derive_proxy_dimensions(
            original.width(),
            original.height(),
            config.max_display_width,
        )?;

        let proxy = if geometry.is_identity() {
            original.clone()
        } else {
            imageops::resize(
                &original,
                geometry.proxy.width,
                geometry.proxy.height,
                config.proxy_filter,
            )
        };

        info!(
            width = geometry.original.width,
            height = geometry.original.height,
            proxy_width = geometry.proxy.width,
            proxy_height = geometry.proxy.height,
            "session loaded"
        );
        Ok(Self {
            original,
            proxy,
            geometry,
        })
    }

    /// Start a session from encoded image bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] if the bytes cannot be decoded.
    pub fn from_bytes(bytes: &[u8], config: &SessionConfig) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| Error::UnsupportedFormat(e.to_string()))?;
        Self::new(&image, config)
    }

    /// Start a session from an image file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and
    /// [`Error::UnsupportedFormat`] if it cannot be decoded.
    pub fn open(path: &Path, config: &SessionConfig) -> Result<Self> {
        let image = decode_file(path)?;
        Self::new(&image, config)
    }

    /// The original image, RGBA-normalized.
    #[must_use]
    pub fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// The display proxy to draw on.
    #[must_use]
    pub fn proxy(&self) -> &RgbaImage {
        &self.proxy
    }

    /// Original and proxy geometry.
    #[must_use]
    pub fn geometry(&self) -> &ProxyGeometry {
        &self.geometry
    }

    /// A blank annotation canvas with the proxy's geometry.
    #[must_use]
    pub fn annotation_canvas(&self) -> AnnotationCanvas {
        AnnotationCanvas::for_geometry(&self.geometry)
    }

    /// Upscale, classify and composite an annotation snapshot.
    ///
    /// Always runs the compositor, even for a blank annotation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `annotation` is not exactly
    /// proxy-sized.
    pub fn composite(&self, annotation: &RgbaImage) -> Result<(RgbaImage, CompositeStats)> {
        Error::check_dimensions(self.geometry.proxy.as_tuple(), annotation.dimensions())?;

        let original = self.geometry.original;
        let upscaled = upscale_annotation(annotation, original.width, original.height)?;
        let classification = Classification::from_annotation(&upscaled)?;
        let (output, stats) = composite_with_stats(&self.original, &classification)?;

        info!(
            erased = stats.erased,
            restored = stats.restored,
            "composited annotation onto original"
        );
        Ok((output, stats))
    }

    /// Render the current annotation state.
    ///
    /// Returns `Ok(None)` when there is nothing to composite: no annotation
    /// yet, or one without any erase or restore marks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `annotation` is not exactly
    /// proxy-sized.
    pub fn render(&self, annotation: Option<&RgbaImage>) -> Result<Option<RgbaImage>> {
        Ok(self.render_with_stats(annotation)?.map(|(output, _)| output))
    }

    /// Like [`Session::render`], also reporting per-label pixel counts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `annotation` is not exactly
    /// proxy-sized.
    pub fn render_with_stats(
        &self,
        annotation: Option<&RgbaImage>,
    ) -> Result<Option<(RgbaImage, CompositeStats)>> {
        let Some(annotation) = annotation else {
            debug!("no annotation yet, nothing to composite");
            return Ok(None);
        };
        Error::check_dimensions(self.geometry.proxy.as_tuple(), annotation.dimensions())?;

        if annotation
            .pixels()
            .all(|px| classify_pixel(px) == MaskLabel::Untouched)
        {
            debug!("annotation has no marks, nothing to composite");
            return Ok(None);
        }

        self.composite(annotation).map(Some)
    }
}

/// Read and decode an image file, sniffing the format from its contents.
fn decode_file(path: &Path) -> Result<DynamicImage> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| Error::UnsupportedFormat(format!("{}: {e}", path.display())))
}

/// Load an annotation buffer exported by a drawing surface.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read and
/// [`Error::UnsupportedFormat`] if it cannot be decoded.
pub fn load_annotation(path: &Path) -> Result<RgbaImage> {
    Ok(decode_file(path)?.to_rgba8())
}

/// Check if a file has a supported input image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Encode an RGBA image as PNG bytes.
///
/// # Errors
///
/// Returns [`Error::Image`] if encoding fails.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

/// Save an RGBA image as PNG, creating parent directories as needed.
///
/// Only PNG keeps the full 8-bit alpha channel losslessly, so any other
/// extension is rejected.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for a non-PNG path, or an I/O or
/// encoding error if writing fails.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;
    if format != ImageFormat::Png {
        return Err(Error::UnsupportedFormat(format!(
            "{format:?} output (only PNG keeps the alpha channel losslessly)"
        )));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    image.save_with_format(path, ImageFormat::Png)?;
    debug!(path = %path.display(), "saved PNG");
    Ok(())
}

/// Generate a default output path from an input path.
///
/// Example: `"photo.jpg"` becomes `"photo_cutout.png"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_cutout.png"))
}
