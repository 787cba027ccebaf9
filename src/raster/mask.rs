//! Clip coverage masks
//!
//! A clip is an 8-bit per-pixel coverage plane the size of the canvas.
//! There is no geometric intersection of clip paths; each `clip()` call
//! rasterizes its path into a fresh plane and multiplies it into the
//! current mask, so clips only ever tighten. Save/restore snapshots the
//! whole mask by value.

use crate::path::Path;
use crate::raster::coverage::{FillRule, Rasterizer};

/// An 8-bit coverage mask covering the full canvas
#[derive(Debug, Clone)]
pub(crate) struct Mask {
  width: usize,
  data: Vec<u8>,
}

impl Mask {
  /// Rasterizes `path` into a new full-coverage-out-of-the-box mask
  pub fn from_path(
    raster: &mut Rasterizer,
    path: &Path,
    rule: FillRule,
    width: usize,
    height: usize,
  ) -> Self {
    let mut data = vec![0u8; width * height];
    raster.rasterize(path, rule, width, height, |y, x0, cover| {
      let row = &mut data[y * width..(y + 1) * width];
      for (i, &c) in cover.iter().enumerate() {
        row[x0 + i] = (c * 255.0 + 0.5) as u8;
      }
    });
    Self { width, data }
  }

  /// Multiplies another mask into this one, pixel by pixel
  pub fn intersect(&mut self, other: &Mask) {
    debug_assert_eq!(self.data.len(), other.data.len());
    for (a, &b) in self.data.iter_mut().zip(&other.data) {
      *a = ((*a as u16 * b as u16 + 127) / 255) as u8;
    }
  }

  /// Coverage at a pixel as [0, 1]
  #[inline]
  pub fn coverage_at(&self, x: usize, y: usize) -> f32 {
    self.data[y * self.width + x] as f32 / 255.0
  }
}
