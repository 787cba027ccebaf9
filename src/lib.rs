//! fastcanvas: a compact, self-contained 2D vector rasterizer
//!
//! The crate renders into an in-memory pixel buffer through an API modeled
//! on the W3C HTML5 2D canvas: paths with Bezier curves and arcs, stroking
//! with dashes, joins, caps and miter limits, solid/gradient/pattern paint,
//! Porter-Duff compositing, blurred shadows, clipping, TrueType text, and
//! image drawing with bicubic resampling.
//!
//! Rendering is fully analytic: pixel coverage comes from exact trapezoid
//! areas rather than supersampling, color math happens in linear
//! premultiplied space, and output is converted to straight sRGB8 with
//! ordered dither at the `get_image_data` boundary.
//!
//! A canvas is single-threaded and owns all of its state; independent
//! canvases can be used freely from different threads.
//!
//! ```
//! use fastcanvas::{BrushSlot, Canvas};
//!
//! let mut canvas = Canvas::new(32, 32);
//! canvas.set_color(BrushSlot::Fill, 1.0, 0.0, 0.0, 1.0);
//! canvas.fill_rectangle(8.0, 8.0, 16.0, 16.0);
//!
//! let mut out = vec![0u8; 32 * 32 * 4];
//! canvas.get_image_data(&mut out, 32, 32, 32 * 4, 0, 0);
//! assert_eq!(&out[(16 * 32 + 16) * 4..(16 * 32 + 16) * 4 + 4], &[255, 0, 0, 255]);
//! ```

mod color;
mod error;
mod path;
mod raster;

pub mod canvas;
pub mod geometry;
pub mod paint;
pub mod stroke;
pub mod text;

pub use canvas::Canvas;
pub use geometry::{Point, Transform};
pub use paint::{BrushSlot, CompositeOperation, Repetition};
pub use stroke::{LineCap, LineJoin};
pub use text::{TextAlign, TextBaseline};
