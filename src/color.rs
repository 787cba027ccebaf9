//! Color representation and the sRGB boundary
//!
//! All internal color math happens on linear-light, premultiplied-alpha
//! floats; sRGB enters the picture only at the pixel-buffer boundary
//! (`put_image_data`, `get_image_data`, pattern sources). Blending or
//! filtering gamma-encoded values darkens midtones, so the conversion is
//! confined to this module.
//!
//! The transfer curve is the official piecewise sRGB function, not a plain
//! 2.2 power. Byte-valued sources go through a 256-entry lookup table;
//! output quantization applies a 4x4 ordered (Bayer) dither so gradients
//! survive the trip down to 8 bits.

use std::ops::{Add, Mul};
use std::sync::OnceLock;

/// A linear-light, premultiplied-alpha RGBA color
///
/// `r`, `g`, `b` carry linearized sRGB values already multiplied by `a`;
/// `a` is straight alpha in [0, 1]. All compositing and sampling works on
/// these directly.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgba {
  pub r: f32,
  pub g: f32,
  pub b: f32,
  pub a: f32,
}

impl Rgba {
  /// Transparent black, the canvas clear color
  pub const TRANSPARENT: Self = Self {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 0.0,
  };

  pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
    Self { r, g, b, a }
  }

  /// Builds a premultiplied linear color from straight sRGB floats
  ///
  /// Channels are clamped to [0, 1]; callers pass whatever the client
  /// handed the public API.
  pub fn from_srgb(r: f32, g: f32, b: f32, a: f32) -> Self {
    let a = clamp_unit(a);
    Self {
      r: srgb_to_linear(clamp_unit(r)) * a,
      g: srgb_to_linear(clamp_unit(g)) * a,
      b: srgb_to_linear(clamp_unit(b)) * a,
      a,
    }
  }

  /// Builds a premultiplied linear color from one straight sRGB8 pixel
  pub fn from_srgb8(r: u8, g: u8, b: u8, a: u8) -> Self {
    let alpha = a as f32 / 255.0;
    Self {
      r: linearize_u8(r) * alpha,
      g: linearize_u8(g) * alpha,
      b: linearize_u8(b) * alpha,
      a: alpha,
    }
  }

  /// Converts back to straight sRGB8 with ordered dither
  ///
  /// `x` and `y` select the dither threshold; passing the pixel position
  /// keeps the pattern stable across reads.
  pub fn to_srgb8_dithered(self, x: u32, y: u32) -> [u8; 4] {
    if self.a <= 0.0 {
      return [0, 0, 0, 0];
    }
    let inv = 1.0 / self.a;
    [
      quantize(linear_to_srgb(clamp_unit(self.r * inv)), x, y),
      quantize(linear_to_srgb(clamp_unit(self.g * inv)), x, y),
      quantize(linear_to_srgb(clamp_unit(self.b * inv)), x, y),
      quantize(clamp_unit(self.a), x, y),
    ]
  }

  /// Linear interpolation in premultiplied space
  pub fn lerp(self, other: Rgba, t: f32) -> Rgba {
    self * (1.0 - t) + other * t
  }

  /// Clamps every component into the valid premultiplied range
  pub fn clamped(self) -> Rgba {
    let a = clamp_unit(self.a);
    Rgba {
      r: self.r.clamp(0.0, a),
      g: self.g.clamp(0.0, a),
      b: self.b.clamp(0.0, a),
      a,
    }
  }
}

impl Add for Rgba {
  type Output = Rgba;
  fn add(self, other: Rgba) -> Rgba {
    Rgba::new(
      self.r + other.r,
      self.g + other.g,
      self.b + other.b,
      self.a + other.a,
    )
  }
}

impl Mul<f32> for Rgba {
  type Output = Rgba;
  fn mul(self, factor: f32) -> Rgba {
    Rgba::new(
      self.r * factor,
      self.g * factor,
      self.b * factor,
      self.a * factor,
    )
  }
}

fn clamp_unit(value: f32) -> f32 {
  if value.is_nan() {
    0.0
  } else {
    value.clamp(0.0, 1.0)
  }
}

/// The sRGB electro-optical transfer function, [0,1] to [0,1]
pub fn srgb_to_linear(value: f32) -> f32 {
  if value <= 0.04045 {
    value / 12.92
  } else {
    ((value + 0.055) / 1.055).powf(2.4)
  }
}

/// Inverse of `srgb_to_linear`
pub fn linear_to_srgb(value: f32) -> f32 {
  if value <= 0.003_130_8 {
    value * 12.92
  } else {
    1.055 * value.powf(1.0 / 2.4) - 0.055
  }
}

/// Linearizes one 8-bit sRGB channel via a precomputed table
///
/// Pattern sampling and `put_image_data` hit this per texel, so the 256
/// entries are computed once and reused.
pub fn linearize_u8(value: u8) -> f32 {
  static TABLE: OnceLock<[f32; 256]> = OnceLock::new();
  let table = TABLE.get_or_init(|| {
    let mut table = [0.0; 256];
    for (i, slot) in table.iter_mut().enumerate() {
      *slot = srgb_to_linear(i as f32 / 255.0);
    }
    table
  });
  table[value as usize]
}

// 4x4 Bayer matrix; thresholds spread over [0, 16).
const BAYER: [[u8; 4]; 4] = [
  [0, 8, 2, 10],
  [12, 4, 14, 6],
  [3, 11, 1, 9],
  [15, 7, 13, 5],
];

fn quantize(value: f32, x: u32, y: u32) -> u8 {
  let threshold = (BAYER[(y & 3) as usize][(x & 3) as usize] as f32 + 0.5) / 16.0;
  let scaled = value * 255.0 + threshold;
  scaled.floor().clamp(0.0, 255.0) as u8
}
