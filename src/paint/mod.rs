//! Paint sources and compositing
//!
//! A brush is a tagged union over the four paint kinds; sampling dispatches
//! on the tag and always returns linear premultiplied color for a device
//! pixel center. Fill and stroke each own an independent brush.

pub mod blur;
pub mod compose;
pub mod gradient;
pub mod pattern;

pub use compose::CompositeOperation;
pub use pattern::Repetition;

use crate::color::Rgba;
use crate::geometry::Point;
use gradient::{LinearGradient, RadialGradient};
use pattern::Pattern;

/// Which brush a styling call addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushSlot {
  Fill,
  Stroke,
}

/// One paint source
#[derive(Debug, Clone)]
pub(crate) enum Brush {
  Solid(Rgba),
  Linear(LinearGradient),
  Radial(RadialGradient),
  Pattern(Pattern),
}

impl Default for Brush {
  fn default() -> Self {
    // Fresh canvases paint opaque black, like their HTML counterpart.
    Brush::Solid(Rgba::new(0.0, 0.0, 0.0, 1.0))
  }
}

impl Brush {
  /// Paint color at a device-space position
  #[inline]
  pub fn sample(&self, device: Point) -> Rgba {
    match self {
      Brush::Solid(color) => *color,
      Brush::Linear(gradient) => gradient.sample(device),
      Brush::Radial(gradient) => gradient.sample(device),
      Brush::Pattern(pattern) => pattern.sample(device),
    }
  }
}
