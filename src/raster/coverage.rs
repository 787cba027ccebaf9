//! Scan conversion with analytic trapezoidal antialiasing
//!
//! Every subpath is treated as a closed ring of straight edges. Each edge is
//! clipped to the scanline rows it crosses; within a row the edge bounds a
//! trapezoid whose signed area is distributed exactly over the pixels it
//! touches. Summing those contributions left to right yields the fractional
//! winding number at every pixel center, and the winding rule turns that
//! into coverage. For straight edges the result is exact, which is what
//! makes the antialiasing analytic rather than sampled.
//!
//! The accumulation scheme follows the classic one-pass rasterizer: per-cell
//! area deltas followed by a running prefix sum. Edge storage and the row
//! accumulator are owned by the `Rasterizer` and retain their capacity, so
//! steady-state drawing allocates nothing.

use crate::geometry::Point;
use crate::path::Path;

/// Winding rule applied to the accumulated signed coverage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
  /// Any nonzero winding is inside
  NonZero,
  /// Odd winding is inside
  EvenOdd,
}

impl FillRule {
  /// Converts a fractional winding sum into [0, 1] coverage
  #[inline]
  pub(crate) fn coverage(self, winding: f32) -> f32 {
    match self {
      FillRule::NonZero => winding.abs().min(1.0),
      FillRule::EvenOdd => {
        let wrapped = winding.rem_euclid(2.0);
        1.0 - (1.0 - wrapped).abs()
      }
    }
  }
}

/// One path edge clipped to the visible row range
#[derive(Debug, Clone, Copy)]
struct Edge {
  /// X at `y_top`
  x: f32,
  dx_dy: f32,
  y_top: f32,
  y_bottom: f32,
  /// +1 for a downward edge, -1 for upward
  sign: f32,
}

/// Reusable scan converter
///
/// `rasterize` hands each covered row to the caller as a span of per-pixel
/// coverage values; the buffers behind it grow on demand and are reused
/// across calls.
#[derive(Debug, Default)]
pub(crate) struct Rasterizer {
  edges: Vec<Edge>,
  order: Vec<u32>,
  acc: Vec<f32>,
  cover: Vec<f32>,
}

impl Rasterizer {
  pub fn new() -> Self {
    Self::default()
  }

  /// Scan-converts `path` over a `width` x `height` grid
  ///
  /// `emit` receives `(y, x0, coverage)` for each row that has any
  /// coverage; `coverage[i]` belongs to pixel `x0 + i`.
  pub fn rasterize<F>(
    &mut self,
    path: &Path,
    rule: FillRule,
    width: usize,
    height: usize,
    mut emit: F,
  ) where
    F: FnMut(usize, usize, &[f32]),
  {
    if width == 0 || height == 0 {
      return;
    }
    self.collect_edges(path, height as f32);
    if self.edges.is_empty() {
      return;
    }

    self.order.clear();
    self.order.extend(0..self.edges.len() as u32);
    let edges = &self.edges;
    self
      .order
      .sort_unstable_by(|&a, &b| edges[a as usize].y_top.total_cmp(&edges[b as usize].y_top));

    self.acc.clear();
    self.acc.resize(width + 2, 0.0);
    self.cover.clear();
    self.cover.resize(width, 0.0);

    let first_row = self.edges[self.order[0] as usize].y_top as usize;
    let mut next = 0usize;
    let mut active: Vec<u32> = Vec::new();

    for y in first_row..height {
      while next < self.order.len() {
        let idx = self.order[next] as usize;
        if self.edges[idx].y_top < (y + 1) as f32 {
          active.push(self.order[next]);
          next += 1;
        } else {
          break;
        }
      }
      active.retain(|&idx| self.edges[idx as usize].y_bottom > y as f32);
      if active.is_empty() {
        if next >= self.order.len() {
          break;
        }
        continue;
      }

      let mut min_col = width;
      let mut max_col = 0usize;
      for &idx in &active {
        let edge = self.edges[idx as usize];
        let (lo, hi) = accumulate_row(&mut self.acc, &edge, y, width);
        min_col = min_col.min(lo);
        max_col = max_col.max(hi);
      }
      if min_col > max_col {
        continue;
      }

      // Prefix-sum the deltas into winding, then apply the rule.
      let mut winding = 0.0f32;
      let last_pixel = max_col.min(width - 1);
      for x in min_col..=last_pixel {
        winding += self.acc[x];
        self.cover[x - min_col] = rule.coverage(winding);
      }
      let mut span_end = last_pixel + 1;
      // Geometry clipped away at the right border leaves residual winding;
      // it covers everything out to the edge of the grid.
      winding += self.acc[last_pixel + 1];
      if winding.abs() > 1e-6 {
        let tail = rule.coverage(winding);
        for x in span_end..width {
          self.cover[x - min_col] = tail;
        }
        span_end = width;
      }

      emit(y, min_col, &self.cover[..span_end - min_col]);

      for slot in &mut self.acc[min_col..=(max_col + 1).min(width + 1)] {
        *slot = 0.0;
      }
    }
  }

  /// Convenience wrapper producing coverage into a dense `width * height`
  /// plane, adding onto whatever is already there
  pub fn rasterize_into(
    &mut self,
    path: &Path,
    rule: FillRule,
    width: usize,
    height: usize,
    plane: &mut [f32],
  ) {
    self.rasterize(path, rule, width, height, |y, x0, cover| {
      let row = &mut plane[y * width..(y + 1) * width];
      for (i, &c) in cover.iter().enumerate() {
        row[x0 + i] = (row[x0 + i] + c).min(1.0);
      }
    });
  }

  fn collect_edges(&mut self, path: &Path, height: f32) {
    self.edges.clear();
    for subpath in &path.subpaths {
      let points = &subpath.points;
      if points.len() < 2 {
        continue;
      }
      for i in 0..points.len() {
        let from = points[i];
        let to = points[(i + 1) % points.len()];
        self.push_edge(from, to, height);
      }
    }
  }

  fn push_edge(&mut self, from: Point, to: Point, height: f32) {
    if from.y == to.y || !from.y.is_finite() || !to.y.is_finite() {
      return;
    }
    if !from.x.is_finite() || !to.x.is_finite() {
      return;
    }
    let (sign, top, bottom) = if from.y < to.y {
      (1.0, from, to)
    } else {
      (-1.0, to, from)
    };
    let y_top = top.y.max(0.0);
    let y_bottom = bottom.y.min(height);
    if y_bottom <= y_top {
      return;
    }
    let dx_dy = (bottom.x - top.x) / (bottom.y - top.y);
    let x = top.x + (y_top - top.y) * dx_dy;
    self.edges.push(Edge {
      x,
      dx_dy,
      y_top,
      y_bottom,
      sign,
    });
  }
}

/// Accumulates one edge's trapezoid areas within scanline `y`
///
/// Returns the touched column range. Portions left of the grid collapse
/// onto column zero (full winding for every visible pixel); portions right
/// of the grid cannot influence visible pixels and are dropped.
fn accumulate_row(acc: &mut [f32], edge: &Edge, y: usize, width: usize) -> (usize, usize) {
  let ya = edge.y_top.max(y as f32);
  let yb = edge.y_bottom.min((y + 1) as f32);
  if yb <= ya {
    return (width, 0);
  }
  let x_at = |yy: f32| edge.x + (yy - edge.y_top) * edge.dx_dy;

  // Split the sub-segment where it crosses the side borders so every piece
  // lies fully inside, fully left, or fully right of the grid.
  let mut cuts = [ya, yb, yb, yb];
  let mut cut_count = 2;
  if edge.dx_dy != 0.0 {
    for border in [0.0, width as f32] {
      let yc = edge.y_top + (border - edge.x) / edge.dx_dy;
      if yc > ya && yc < yb {
        cuts[cut_count] = yc;
        cut_count += 1;
      }
    }
  }
  cuts[..cut_count].sort_unstable_by(f32::total_cmp);

  let mut min_col = width;
  let mut max_col = 0usize;
  for pair in cuts[..cut_count].windows(2) {
    let (y0, y1) = (pair[0], pair[1]);
    if y1 <= y0 {
      continue;
    }
    let d = edge.sign * (y1 - y0);
    let xm = x_at(0.5 * (y0 + y1));
    if xm >= width as f32 {
      continue;
    }
    if xm <= 0.0 {
      acc[0] += d;
      min_col = 0;
      max_col = max_col.max(0);
      continue;
    }
    let (lo, hi) = accumulate_span(
      acc,
      x_at(y0).clamp(0.0, width as f32),
      x_at(y1).clamp(0.0, width as f32),
      d,
    );
    min_col = min_col.min(lo);
    max_col = max_col.max(hi);
  }
  (min_col, max_col)
}

/// Distributes the signed area of one row trapezoid across its pixels
///
/// The x-profile runs from `x0` to `x1` over a y-extent whose signed height
/// is `d`. Pixels wholly right of the profile end up with the full delta
/// after the prefix sum; the crossing pixels receive the exact partial
/// areas.
fn accumulate_span(acc: &mut [f32], x0: f32, x1: f32, d: f32) -> (usize, usize) {
  let (x0, x1) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
  let x0_floor = x0.floor();
  let x0i = x0_floor as usize;
  let x1_ceil = x1.ceil();
  let x1i = x1_ceil as usize;

  if x1i <= x0i + 1 {
    // Contained in a single column.
    let mid_fraction = 0.5 * (x0 + x1) - x0_floor;
    acc[x0i] += d * (1.0 - mid_fraction);
    acc[x0i + 1] += d * mid_fraction;
    return (x0i, x0i + 1);
  }

  let inv_dx = 1.0 / (x1 - x0);
  let x0f = x0 - x0_floor;
  let a0 = 0.5 * inv_dx * (1.0 - x0f) * (1.0 - x0f);
  let x1f = x1 - x1_ceil + 1.0;
  let am = 0.5 * inv_dx * x1f * x1f;
  acc[x0i] += d * a0;
  if x1i == x0i + 2 {
    acc[x0i + 1] += d * (1.0 - a0 - am);
  } else {
    let a1 = inv_dx * (1.5 - x0f);
    acc[x0i + 1] += d * (a1 - a0);
    for cell in &mut acc[x0i + 2..x1i - 1] {
      *cell += d * inv_dx;
    }
    let a2 = a1 + (x1i - x0i - 3) as f32 * inv_dx;
    acc[x1i - 1] += d * (1.0 - a2 - am);
  }
  acc[x1i] += d * am;
  (x0i, x1i)
}
