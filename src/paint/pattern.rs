//! Image sources, wrap modes, and bicubic resampling
//!
//! Pattern pixels are copied and linearized up front, so the caller can
//! free its buffer as soon as the call returns and every tap during
//! sampling is already premultiplied linear. Resampling is a separable
//! 4x4 Mitchell-Netravali cubic; its slight overshoot is clamped back
//! into the valid premultiplied range.

use crate::color::Rgba;
use crate::geometry::{Point, Transform};

/// How texel lookups behave outside the source rectangle, per axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wrap {
  /// Coordinates wrap modulo the image size
  Repeat,
  /// Coordinates clamp to the border texel
  Clamp,
  /// Out-of-range taps read transparent black
  Transparent,
}

/// Pattern tiling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repetition {
  /// Tile in both directions
  #[default]
  Repeat,
  /// Tile horizontally only
  RepeatX,
  /// Tile vertically only
  RepeatY,
  /// Draw the image once
  NoRepeat,
}

impl Repetition {
  fn wrap_x(self) -> Wrap {
    match self {
      Repetition::Repeat | Repetition::RepeatX => Wrap::Repeat,
      _ => Wrap::Transparent,
    }
  }

  fn wrap_y(self) -> Wrap {
    match self {
      Repetition::Repeat | Repetition::RepeatY => Wrap::Repeat,
      _ => Wrap::Transparent,
    }
  }
}

/// An owned, linearized, premultiplied copy of caller pixel data
#[derive(Debug, Clone)]
pub(crate) struct Image {
  width: usize,
  height: usize,
  pixels: Vec<Rgba>,
}

impl Image {
  /// Copies straight sRGB8 rows into linear premultiplied storage
  ///
  /// Returns `None` for empty dimensions or a buffer too short for the
  /// requested stride, which callers treat as a no-op.
  pub fn from_srgb8(data: &[u8], width: usize, height: usize, stride: usize) -> Option<Self> {
    if width == 0 || height == 0 || stride < width * 4 {
      return None;
    }
    if data.len() < (height - 1) * stride + width * 4 {
      return None;
    }
    let mut pixels = Vec::with_capacity(width * height);
    for y in 0..height {
      let row = &data[y * stride..];
      for x in 0..width {
        let p = &row[x * 4..x * 4 + 4];
        pixels.push(Rgba::from_srgb8(p[0], p[1], p[2], p[3]));
      }
    }
    Some(Self {
      width,
      height,
      pixels,
    })
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn height(&self) -> usize {
    self.height
  }

  #[inline]
  fn texel(&self, x: i64, y: i64, wrap_x: Wrap, wrap_y: Wrap) -> Rgba {
    let Some(x) = resolve(x, self.width, wrap_x) else {
      return Rgba::TRANSPARENT;
    };
    let Some(y) = resolve(y, self.height, wrap_y) else {
      return Rgba::TRANSPARENT;
    };
    self.pixels[y * self.width + x]
  }

  /// Separable 4x4 bicubic sample at image-space coordinates
  ///
  /// `x` and `y` are measured in texels with centers at half-integers.
  pub fn sample_bicubic(&self, x: f32, y: f32, wrap_x: Wrap, wrap_y: Wrap) -> Rgba {
    let u = x - 0.5;
    let v = y - 0.5;
    let base_x = u.floor();
    let base_y = v.floor();
    let fx = u - base_x;
    let fy = v - base_y;
    let wx = [
      mitchell(fx + 1.0),
      mitchell(fx),
      mitchell(1.0 - fx),
      mitchell(2.0 - fx),
    ];
    let wy = [
      mitchell(fy + 1.0),
      mitchell(fy),
      mitchell(1.0 - fy),
      mitchell(2.0 - fy),
    ];
    let mut accum = Rgba::TRANSPARENT;
    for (j, &row_weight) in wy.iter().enumerate() {
      let ty = base_y as i64 + j as i64 - 1;
      let mut row = Rgba::TRANSPARENT;
      for (i, &weight) in wx.iter().enumerate() {
        let tx = base_x as i64 + i as i64 - 1;
        row = row + self.texel(tx, ty, wrap_x, wrap_y) * weight;
      }
      accum = accum + row * row_weight;
    }
    accum.clamped()
  }
}

#[inline]
fn resolve(coord: i64, size: usize, wrap: Wrap) -> Option<usize> {
  let size = size as i64;
  match wrap {
    Wrap::Repeat => Some(coord.rem_euclid(size) as usize),
    Wrap::Clamp => Some(coord.clamp(0, size - 1) as usize),
    Wrap::Transparent => (0..size).contains(&coord).then_some(coord as usize),
  }
}

/// Mitchell-Netravali kernel with B = C = 1/3
#[inline]
fn mitchell(t: f32) -> f32 {
  let t = t.abs();
  if t < 1.0 {
    (21.0 * t * t * t - 36.0 * t * t + 16.0) / 18.0
  } else if t < 2.0 {
    (-7.0 * t * t * t + 36.0 * t * t - 60.0 * t + 32.0) / 18.0
  } else {
    0.0
  }
}

/// An image brush with per-axis wrap behavior
///
/// Captures the inverse transform mapping device space into image texel
/// space at construction, so pattern space stays pinned no matter how the
/// canvas transform changes afterwards.
#[derive(Debug, Clone)]
pub(crate) struct Pattern {
  image: Image,
  wrap_x: Wrap,
  wrap_y: Wrap,
  inverse: Option<Transform>,
}

impl Pattern {
  /// A pattern brush tiling per its repetition mode
  pub fn tiled(image: Image, repetition: Repetition, inverse: Option<Transform>) -> Self {
    Self {
      image,
      wrap_x: repetition.wrap_x(),
      wrap_y: repetition.wrap_y(),
      inverse,
    }
  }

  /// A single placed image whose edge texels extend outward
  ///
  /// Used by image drawing, where the destination rectangle bounds the
  /// paint and clamped taps keep the border rows from fading.
  pub fn clamped(image: Image, inverse: Option<Transform>) -> Self {
    Self {
      image,
      wrap_x: Wrap::Clamp,
      wrap_y: Wrap::Clamp,
      inverse,
    }
  }

  pub fn sample(&self, device: Point) -> Rgba {
    let Some(inverse) = self.inverse else {
      return Rgba::TRANSPARENT;
    };
    let p = inverse.apply(device);
    let width = self.image.width() as f32;
    let height = self.image.height() as f32;
    // Untiled axes cut off half a texel beyond the image rectangle.
    if self.wrap_x == Wrap::Transparent && !(-0.5..width + 0.5).contains(&p.x) {
      return Rgba::TRANSPARENT;
    }
    if self.wrap_y == Wrap::Transparent && !(-0.5..height + 0.5).contains(&p.y) {
      return Rgba::TRANSPARENT;
    }
    self.image.sample_bicubic(p.x, p.y, self.wrap_x, self.wrap_y)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  /// 2x2 checkerboard: white, black / black, white
  fn checker() -> Image {
    let mut data = Vec::new();
    for (r, g, b) in [
      (255u8, 255u8, 255u8),
      (0, 0, 0),
      (0, 0, 0),
      (255, 255, 255),
    ] {
      data.extend_from_slice(&[r, g, b, 255]);
    }
    Image::from_srgb8(&data, 2, 2, 8).unwrap()
  }

  #[test]
  fn rejects_short_buffers() {
    assert!(Image::from_srgb8(&[0; 8], 2, 2, 8).is_none());
    assert!(Image::from_srgb8(&[0; 16], 0, 2, 8).is_none());
    assert!(Image::from_srgb8(&[0; 16], 2, 2, 4).is_none());
  }

  #[test]
  fn accepts_padded_stride() {
    let data = vec![255u8; 2 * 12];
    assert!(Image::from_srgb8(&data, 2, 2, 12).is_some());
  }

  #[test]
  fn kernel_weights_sum_to_one() {
    for f in [0.0, 0.25, 0.5, 0.9] {
      let sum = mitchell(f + 1.0) + mitchell(f) + mitchell(1.0 - f) + mitchell(2.0 - f);
      assert!((sum - 1.0).abs() < 1e-5, "f={f} sum={sum}");
    }
  }

  #[test]
  fn sample_at_texel_center_recovers_texel() {
    let img = checker();
    let white = img.sample_bicubic(0.5, 0.5, Wrap::Clamp, Wrap::Clamp);
    let black = img.sample_bicubic(1.5, 0.5, Wrap::Clamp, Wrap::Clamp);
    assert!(white.r > 0.8, "white center {white:?}");
    assert!(black.r < 0.2, "black center {black:?}");
  }

  #[test]
  fn repeat_wraps_coordinates() {
    let img = checker();
    let a = img.sample_bicubic(0.5, 0.5, Wrap::Repeat, Wrap::Repeat);
    let b = img.sample_bicubic(4.5, 2.5, Wrap::Repeat, Wrap::Repeat);
    assert!((a.r - b.r).abs() < 1e-5);
  }

  #[test]
  fn pattern_no_repeat_is_transparent_outside() {
    let pattern = Pattern::tiled(checker(), Repetition::NoRepeat, Some(Transform::IDENTITY));
    assert_eq!(pattern.sample(Point::new(10.0, 0.5)), Rgba::TRANSPARENT);
    assert_eq!(pattern.sample(Point::new(0.5, -3.0)), Rgba::TRANSPARENT);
    assert!(pattern.sample(Point::new(0.5, 0.5)).a > 0.9);
  }

  #[test]
  fn pattern_repeat_x_tiles_one_axis() {
    let pattern = Pattern::tiled(checker(), Repetition::RepeatX, Some(Transform::IDENTITY));
    assert!(pattern.sample(Point::new(8.5, 0.5)).a > 0.9);
    assert_eq!(pattern.sample(Point::new(0.5, 8.5)), Rgba::TRANSPARENT);
  }

  #[test]
  fn pattern_space_ignores_later_transforms() {
    // The inverse captured at set time maps device x back by 10.
    let pattern = Pattern::tiled(
      checker(),
      Repetition::NoRepeat,
      Some(Transform::translation(-10.0, 0.0)),
    );
    assert!(pattern.sample(Point::new(10.5, 0.5)).a > 0.9);
    assert_eq!(pattern.sample(Point::new(0.5, 0.5)), Rgba::TRANSPARENT);
  }
}
