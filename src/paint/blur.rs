//! Separable box-blur cascade for shadows
//!
//! Three successive box blurs per axis approximate a Gaussian: the combined
//! variance of the boxes matches the requested standard deviation, and by
//! the central limit theorem the cascade's transfer function is already
//! close to the real bell curve. Box sizes follow the SVG filter rule: for
//! `d = floor(3 * sigma * sqrt(2 * pi) / 4 + 0.5)`, an odd `d` gives three
//! centered boxes of size `d`, an even `d` gives two offset boxes of size
//! `d` and one of size `d + 1`.
//!
//! The blur operates on a single alpha plane; pixels outside the plane read
//! as zero, which is the right boundary condition for a shadow silhouette.

/// Box size the cascade derives from `sigma`
fn box_size(sigma: f32) -> usize {
  if !(sigma > 0.0) || !sigma.is_finite() {
    return 0;
  }
  (3.0 * sigma * (std::f32::consts::TAU).sqrt() / 4.0 + 0.5).floor() as usize
}

/// How far the cascade can spread a pixel in any direction
///
/// Sizes the working region a shadow needs around its silhouette.
pub(crate) fn blur_padding(sigma: f32) -> usize {
  let d = box_size(sigma);
  if d <= 1 {
    0
  } else {
    (3 * d) / 2 + 1
  }
}

/// Applies the three-pass cascade along both axes in place
///
/// `scratch` is a ping-pong buffer resized as needed; both buffers keep
/// their capacity across calls.
pub(crate) fn blur_alpha_plane(
  plane: &mut Vec<f32>,
  scratch: &mut Vec<f32>,
  width: usize,
  height: usize,
  sigma: f32,
) {
  if width == 0 || height == 0 {
    return;
  }
  let d = box_size(sigma);
  if d <= 1 {
    return;
  }
  scratch.clear();
  scratch.resize(width * height, 0.0);

  // (left, right) extents of each pass's window around the center pixel.
  let passes: [(usize, usize); 3] = if d % 2 == 1 {
    let r = (d - 1) / 2;
    [(r, r), (r, r), (r, r)]
  } else {
    [(d / 2, d / 2 - 1), (d / 2 - 1, d / 2), (d / 2, d / 2)]
  };

  for &(left, right) in &passes {
    box_blur_rows(plane, scratch, width, height, left, right);
    std::mem::swap(plane, scratch);
  }
  for &(left, right) in &passes {
    box_blur_columns(plane, scratch, width, height, left, right);
    std::mem::swap(plane, scratch);
  }
}

/// One horizontal box pass with a running-sum window
fn box_blur_rows(
  src: &[f32],
  dst: &mut [f32],
  width: usize,
  height: usize,
  left: usize,
  right: usize,
) {
  let norm = 1.0 / (left + right + 1) as f32;
  for y in 0..height {
    let row = &src[y * width..(y + 1) * width];
    let out = &mut dst[y * width..(y + 1) * width];
    let mut sum: f32 = row.iter().take(right + 1).sum();
    for x in 0..width {
      out[x] = sum * norm;
      if x + right + 1 < width {
        sum += row[x + right + 1];
      }
      if x >= left {
        sum -= row[x - left];
      }
    }
  }
}

/// One vertical box pass with a running-sum window per column
fn box_blur_columns(
  src: &[f32],
  dst: &mut [f32],
  width: usize,
  height: usize,
  left: usize,
  right: usize,
) {
  let norm = 1.0 / (left + right + 1) as f32;
  for x in 0..width {
    let mut sum = 0.0f32;
    for y in 0..=right.min(height - 1) {
      sum += src[y * width + x];
    }
    for y in 0..height {
      dst[y * width + x] = sum * norm;
      if y + right + 1 < height {
        sum += src[(y + right + 1) * width + x];
      }
      if y >= left {
        sum -= src[(y - left) * width + x];
      }
    }
  }
}
