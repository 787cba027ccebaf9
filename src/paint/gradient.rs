//! Linear and radial gradient sampling
//!
//! Stops live in linear premultiplied space and stay sorted by offset;
//! duplicate offsets are legal and produce a hard jump, with the stop added
//! last supplying the far side. Sampling below the first stop or above the
//! last clamps to the end colors rather than extrapolating.
//!
//! Both gradient kinds capture the inverse canvas transform at the time the
//! brush was set, so their appearance depends only on the brush state, never
//! on the path being filled.

use crate::color::Rgba;
use crate::geometry::{Point, Transform};

/// One gradient color stop in linear premultiplied space
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ColorStop {
  pub offset: f32,
  pub color: Rgba,
}

/// A sorted stop sequence shared by both gradient kinds
#[derive(Debug, Clone, Default)]
pub(crate) struct StopList {
  stops: Vec<ColorStop>,
}

impl StopList {
  /// Inserts a stop, keeping the list sorted
  ///
  /// Equal offsets keep insertion order, which is what makes later stops
  /// win on the far side of a hard jump. Offsets outside [0, 1] or not
  /// finite are ignored.
  pub fn add(&mut self, offset: f32, color: Rgba) {
    if !offset.is_finite() || !(0.0..=1.0).contains(&offset) {
      return;
    }
    let index = self.stops.partition_point(|s| s.offset <= offset);
    self.stops.insert(index, ColorStop { offset, color });
  }

  pub fn is_empty(&self) -> bool {
    self.stops.is_empty()
  }

  /// Color at parameter `t`, clamped to the end stops
  pub fn sample(&self, t: f32) -> Rgba {
    let stops = &self.stops;
    match stops.len() {
      0 => return Rgba::TRANSPARENT,
      1 => return stops[0].color,
      _ => {}
    }
    if !t.is_finite() || t <= stops[0].offset {
      return stops[0].color;
    }
    let last = stops[stops.len() - 1];
    if t >= last.offset {
      return last.color;
    }
    let hi = stops.partition_point(|s| s.offset < t);
    let (lo_stop, hi_stop) = (stops[hi - 1], stops[hi]);
    let span = hi_stop.offset - lo_stop.offset;
    if span <= 0.0 {
      return hi_stop.color;
    }
    let fraction = (t - lo_stop.offset) / span;
    lo_stop.color.lerp(hi_stop.color, fraction)
  }
}

/// Gradient along the line from `start` to `end`
#[derive(Debug, Clone)]
pub(crate) struct LinearGradient {
  pub start: Point,
  pub end: Point,
  pub stops: StopList,
  pub inverse: Option<Transform>,
}

impl LinearGradient {
  pub fn sample(&self, device: Point) -> Rgba {
    let Some(inverse) = self.inverse else {
      return Rgba::TRANSPARENT;
    };
    let p = inverse.apply(device);
    let axis = self.end - self.start;
    let denom = axis.dot(axis);
    if denom == 0.0 || self.stops.is_empty() {
      return Rgba::TRANSPARENT;
    }
    let t = (p - self.start).dot(axis) / denom;
    self.stops.sample(t)
  }
}

/// Gradient over the cone between two circles
#[derive(Debug, Clone)]
pub(crate) struct RadialGradient {
  pub start: Point,
  pub start_radius: f32,
  pub end: Point,
  pub end_radius: f32,
  pub stops: StopList,
  pub inverse: Option<Transform>,
}

impl RadialGradient {
  pub fn sample(&self, device: Point) -> Rgba {
    let Some(inverse) = self.inverse else {
      return Rgba::TRANSPARENT;
    };
    if self.stops.is_empty() {
      return Rgba::TRANSPARENT;
    }
    let p = inverse.apply(device);

    // Solve |p - c(t)| = r(t) for the interpolated circle c(t), r(t).
    let center_delta = self.end - self.start;
    let radius_delta = self.end_radius - self.start_radius;
    let offset = p - self.start;
    let a = center_delta.dot(center_delta) - radius_delta * radius_delta;
    let b = offset.dot(center_delta) + self.start_radius * radius_delta;
    let c = offset.dot(offset) - self.start_radius * self.start_radius;

    let t = if a.abs() < 1e-6 {
      if b.abs() < 1e-12 {
        return Rgba::TRANSPARENT;
      }
      c / (2.0 * b)
    } else {
      let disc = b * b - a * c;
      if disc < 0.0 {
        // Off the cone entirely; fall back to the closest-approach
        // parameter, which the stop clamp turns into an end color.
        b / a
      } else {
        let root = disc.sqrt();
        let t1 = (b + root) / a;
        let t2 = (b - root) / a;
        let (hi, lo) = if t1 >= t2 { (t1, t2) } else { (t2, t1) };
        // Prefer the larger root, but only where the cone radius is real.
        if self.start_radius + hi * radius_delta >= 0.0 {
          hi
        } else {
          lo
        }
      }
    };
    self.stops.sample(t)
  }
}
