//! Bake erase/restore annotations into an image's alpha channel.
//!
//! The user draws on a downscaled *proxy* of the image: red marks erase,
//! green marks restore. This crate maps those marks back to the original
//! resolution with nearest-neighbor resampling, classifies every pixel, and
//! writes alpha values onto the original. Restore always wins over erase;
//! RGB channels are never touched.
//!
//! # Quick Start
//!
//! ```no_run
//! use hybrid_cutout::{Rect, Session, SessionConfig, ToolConfig};
//!
//! let session = Session::open("photo.jpg".as_ref(), &SessionConfig::default())
//!     .expect("failed to load image");
//!
//! // Normally the annotation comes from an interactive drawing surface.
//! let mut canvas = session.annotation_canvas();
//! canvas.draw_rect(&ToolConfig::erase(), Rect::new(0, 0, 300, 200));
//! canvas.draw_dot(&ToolConfig::restore(20), 150.0, 100.0);
//!
//! if let Some(cutout) = session.render(Some(canvas.buffer())).unwrap() {
//!     hybrid_cutout::save_png(&cutout, "cutout.png".as_ref()).unwrap();
//! }
//! ```
//!
//! # Pipeline
//!
//! Each stage is usable on its own:
//!
//! ```
//! use hybrid_cutout::{composite, derive_proxy_dimensions, upscale_annotation, Classification};
//! use image::{Rgba, RgbaImage};
//!
//! let geometry = derive_proxy_dimensions(1920, 1080, 800).unwrap();
//! assert_eq!(geometry.proxy.as_tuple(), (800, 450));
//!
//! let mut annotation = RgbaImage::new(800, 450);
//! annotation.put_pixel(10, 10, Rgba([255, 0, 0, 255]));
//!
//! let upscaled = upscale_annotation(&annotation, 1920, 1080).unwrap();
//! let labels = Classification::from_annotation(&upscaled).unwrap();
//! let original = RgbaImage::from_pixel(1920, 1080, Rgba([9, 9, 9, 255]));
//! let output = composite(&original, &labels).unwrap();
//! assert_eq!(output.get_pixel(24, 24)[3], 0);
//! ```

#![deny(missing_docs)]

pub mod annotate;
pub mod classify;
pub mod composite;
pub mod error;
pub mod geometry;
mod session;
pub mod upscale;

pub use annotate::{AnnotationCanvas, Rect, ToolConfig, ToolMode};
pub use classify::{classify_pixel, Classification, MaskLabel};
pub use composite::{composite, composite_with_stats, CompositeStats};
pub use error::{Error, Result};
pub use geometry::{derive_proxy_dimensions, Dimensions, ProxyGeometry};
pub use session::{
    default_output_path, encode_png, is_supported_image, load_annotation, save_png, Session,
    SessionConfig,
};
pub use upscale::{upscale_annotation, upscale_classification};
