//! Stroke outline generation
//!
//! Stroking turns a path plus line style into a new closed path that, when
//! area-filled with the non-zero rule, looks like the stroked input. The
//! work happens in user space, where the line width and dash lengths are
//! defined: the canvas back-projects its device-space path, the outline is
//! built here, and every emitted point goes back through the forward
//! transform.
//!
//! The pipeline per subpath is dash splitting, then offsetting each
//! resulting run by half the line width on both sides, closing the sides
//! with joins, caps, or a ring seam. Outer joins follow the join style with
//! the miter-limit fallback to bevel; inner joins connect directly, which
//! can self-overlap at tight corners and is accepted as slight overdraw.

use crate::geometry::{Point, Transform};
use crate::path::{Path, Subpath};

/// Line ending style for open stroke runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
  /// Flat edge through the endpoint
  #[default]
  Butt,
  /// Flat edge half a width past the endpoint
  Square,
  /// Half-disc around the endpoint
  Circle,
}

/// Corner style where two stroke segments meet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
  /// Sharp corner, limited by the miter limit
  #[default]
  Miter,
  /// Corner cut flat
  Bevel,
  /// Corner rounded at half the line width
  Rounded,
}

/// Everything the stroker needs besides the geometry
#[derive(Debug, Clone)]
pub(crate) struct StrokeStyle {
  pub width: f32,
  pub cap: LineCap,
  pub join: LineJoin,
  pub miter_limit: f32,
  /// Sanitized pattern: non-negative entries, even count, positive sum
  /// (empty means solid)
  pub dash: Vec<f32>,
  pub dash_offset: f32,
}

/// Reusable stroke-outline builder
#[derive(Debug, Default)]
pub(crate) struct Stroker {
  polyline: Vec<Point>,
  run: Vec<Point>,
  first_run: Vec<Point>,
  directions: Vec<Point>,
}

impl Stroker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builds the stroke outline of `path` into `out`
  ///
  /// `inverse` carries device points back to user space and `forward`
  /// returns outline points to device space. `tolerance` is the user-space
  /// flattening tolerance for round joins and caps.
  pub fn stroke(
    &mut self,
    path: &Path,
    style: &StrokeStyle,
    inverse: &Transform,
    forward: &Transform,
    tolerance: f32,
    out: &mut Path,
  ) {
    out.clear();
    let half = style.width * 0.5;
    if !(half > 0.0) {
      return;
    }
    let mut dasher = if style.dash.is_empty() {
      None
    } else {
      Some(DashState::new(&style.dash, style.dash_offset))
    };

    for subpath in &path.subpaths {
      self.polyline.clear();
      for &device_point in &subpath.points {
        let p = inverse.apply(device_point);
        if self.polyline.last() != Some(&p) {
          self.polyline.push(p);
        }
      }
      let closed = subpath.closed;
      if closed && self.polyline.len() > 1 && self.polyline.first() == self.polyline.last() {
        self.polyline.pop();
      }
      // Bare one-point subpaths (a move or a close reopening) stroke to
      // nothing; dots come only from dash runs that collapse to a point.
      if self.polyline.len() < 2 {
        continue;
      }

      match &mut dasher {
        None => {
          if closed {
            outline_ring(
              &self.polyline,
              &mut self.directions,
              style,
              half,
              tolerance,
              forward,
              out,
            );
          } else {
            outline_open(
              &self.polyline,
              &mut self.directions,
              style,
              half,
              tolerance,
              forward,
              out,
            );
          }
        }
        Some(dash) => {
          walk_dashes(
            &self.polyline,
            closed,
            dash,
            &mut self.run,
            &mut self.first_run,
            &mut self.directions,
            style,
            half,
            tolerance,
            forward,
            out,
          );
        }
      }
    }
  }
}

// ============================================================================
// Dashing
// ============================================================================

/// Walking state through the dash pattern, carried across subpaths
struct DashState<'a> {
  pattern: &'a [f32],
  index: usize,
  remaining: f32,
  on: bool,
}

impl<'a> DashState<'a> {
  fn new(pattern: &'a [f32], offset: f32) -> Self {
    let cycle: f32 = pattern.iter().sum();
    let mut position = if cycle > 0.0 && offset.is_finite() {
      offset.rem_euclid(cycle)
    } else {
      0.0
    };
    let mut index = 0;
    let mut on = true;
    while position >= pattern[index] {
      position -= pattern[index];
      index = (index + 1) % pattern.len();
      on = !on;
    }
    Self {
      pattern,
      index,
      remaining: pattern[index] - position,
      on,
    }
  }

  /// Moves to the next pattern entry; zero-length entries are consumed by
  /// the caller one at a time so it can observe the toggles
  fn advance(&mut self) {
    self.index = (self.index + 1) % self.pattern.len();
    self.on = !self.on;
    self.remaining = self.pattern[self.index];
  }
}

/// Splits one subpath into dash runs and outlines each
#[allow(clippy::too_many_arguments)]
fn walk_dashes(
  polyline: &[Point],
  closed: bool,
  dash: &mut DashState,
  run: &mut Vec<Point>,
  first_run: &mut Vec<Point>,
  directions: &mut Vec<Point>,
  style: &StrokeStyle,
  half: f32,
  tolerance: f32,
  forward: &Transform,
  out: &mut Path,
) {
  run.clear();
  first_run.clear();
  let started_on = dash.on;
  let mut seam_open = closed && started_on;
  let mut broke = false;
  let segment_count = if closed {
    polyline.len()
  } else {
    polyline.len() - 1
  };

  let mut flush =
    |run: &mut Vec<Point>, first_run: &mut Vec<Point>, seam_open: &mut bool, broke: &mut bool| {
      if *seam_open {
        // First run of a closed loop: hold it back for the seam merge.
        std::mem::swap(run, first_run);
        *seam_open = false;
      } else if run.len() >= 2 {
        outline_open(run, directions, style, half, tolerance, forward, out);
      } else if let Some(&p) = run.first() {
        outline_dot(p, style, half, tolerance, forward, out);
      }
      *broke = true;
      run.clear();
    };

  for i in 0..segment_count {
    let from = polyline[i];
    let to = polyline[(i + 1) % polyline.len()];
    let length = from.distance_to(to);
    if length == 0.0 {
      continue;
    }
    let direction = (to - from) * (1.0 / length);
    let mut travelled = 0.0f32;
    while travelled < length {
      let step = dash.remaining.min(length - travelled);
      if dash.on {
        let start = from + direction * travelled;
        if run.is_empty() {
          run.push(start);
        }
        let end = from + direction * (travelled + step);
        if run.last() != Some(&end) {
          run.push(end);
        }
      }
      travelled += step;
      dash.remaining -= step;
      while dash.remaining <= 0.0 {
        if dash.on {
          flush(run, first_run, &mut seam_open, &mut broke);
        }
        dash.advance();
        if dash.remaining == 0.0 && dash.on {
          // Zero-length on entry paints a dot at the current position.
          run.push(from + direction * travelled);
          flush(run, first_run, &mut seam_open, &mut broke);
        } else if dash.remaining > 0.0 {
          break;
        }
      }
    }
  }

  // End of subpath: resolve what the walk left open.
  if closed {
    if !broke && dash.on && seam_open {
      // The whole loop stayed on: a ring with joins all the way around.
      if run.len() >= 2 {
        run.pop();
        outline_ring(run, directions, style, half, tolerance, forward, out);
      }
      run.clear();
    } else {
      if dash.on && !run.is_empty() && !first_run.is_empty() {
        // Join the trailing run to the leading one across the seam.
        run.extend(first_run.iter().skip(1).copied());
        first_run.clear();
      }
      if run.len() >= 2 {
        outline_open(run, directions, style, half, tolerance, forward, out);
      }
      run.clear();
      if first_run.len() >= 2 {
        outline_open(first_run, directions, style, half, tolerance, forward, out);
      } else if let Some(&p) = first_run.first() {
        outline_dot(p, style, half, tolerance, forward, out);
      }
      first_run.clear();
    }
  } else {
    if run.len() >= 2 {
      outline_open(run, directions, style, half, tolerance, forward, out);
    } else if let Some(&p) = run.first() {
      outline_dot(p, style, half, tolerance, forward, out);
    }
    run.clear();
    debug_assert!(first_run.is_empty());
  }
}

// ============================================================================
// Outline construction
// ============================================================================

/// Collects device-space outline points, dropping consecutive duplicates
struct Emitter<'a> {
  out: &'a mut Path,
  forward: &'a Transform,
}

impl<'a> Emitter<'a> {
  fn begin(&mut self) {
    self.out.subpaths.push(Subpath {
      points: Vec::new(),
      closed: true,
    });
  }

  fn push(&mut self, user_point: Point) {
    let device = self.forward.apply(user_point);
    let points = &mut self.out.subpaths.last_mut().unwrap().points;
    if points.last() != Some(&device) {
      points.push(device);
    }
  }
}

fn segment_directions(points: &[Point], closed: bool, directions: &mut Vec<Point>) {
  directions.clear();
  let count = if closed { points.len() } else { points.len() - 1 };
  for i in 0..count {
    let from = points[i];
    let to = points[(i + 1) % points.len()];
    directions.push((to - from).normalized());
  }
}

/// Outline of an open run: left side out, end cap, right side back, start cap
fn outline_open(
  points: &[Point],
  directions: &mut Vec<Point>,
  style: &StrokeStyle,
  half: f32,
  tolerance: f32,
  forward: &Transform,
  out: &mut Path,
) {
  segment_directions(points, false, directions);
  let mut emit = Emitter { out, forward };
  emit.begin();

  let first_normal = directions[0].perpendicular();
  emit.push(points[0] + first_normal * half);
  for i in 1..directions.len() {
    let vertex = points[i];
    let turn = directions[i - 1].cross(directions[i]);
    emit_side_vertex(
      &mut emit,
      vertex,
      directions[i - 1].perpendicular(),
      directions[i].perpendicular(),
      turn < 0.0,
      style,
      half,
      tolerance,
    );
  }

  let last = *points.last().unwrap();
  let last_dir = *directions.last().unwrap();
  let last_normal = last_dir.perpendicular();
  emit.push(last + last_normal * half);
  emit_cap(&mut emit, last, last_normal, last_dir, style.cap, half, tolerance);
  emit.push(last - last_normal * half);

  for i in (1..directions.len()).rev() {
    let vertex = points[i];
    let turn = directions[i - 1].cross(directions[i]);
    emit_side_vertex(
      &mut emit,
      vertex,
      -directions[i].perpendicular(),
      -directions[i - 1].perpendicular(),
      turn > 0.0,
      style,
      half,
      tolerance,
    );
  }

  emit.push(points[0] - first_normal * half);
  emit_cap(
    &mut emit,
    points[0],
    -first_normal,
    -directions[0],
    style.cap,
    half,
    tolerance,
  );
}

/// Outline of a closed run: two concentric rings
fn outline_ring(
  points: &[Point],
  directions: &mut Vec<Point>,
  style: &StrokeStyle,
  half: f32,
  tolerance: f32,
  forward: &Transform,
  out: &mut Path,
) {
  segment_directions(points, true, directions);
  let count = directions.len();
  let mut emit = Emitter { out, forward };

  emit.begin();
  for i in 0..count {
    let previous = directions[(i + count - 1) % count];
    let turn = previous.cross(directions[i]);
    emit_side_vertex(
      &mut emit,
      points[i],
      previous.perpendicular(),
      directions[i].perpendicular(),
      turn < 0.0,
      style,
      half,
      tolerance,
    );
  }

  emit.begin();
  for i in (0..count).rev() {
    let previous = directions[(i + count - 1) % count];
    let turn = previous.cross(directions[i]);
    emit_side_vertex(
      &mut emit,
      points[i],
      -directions[i].perpendicular(),
      -previous.perpendicular(),
      turn > 0.0,
      style,
      half,
      tolerance,
    );
  }
}

/// A dot where a subpath or dash run collapsed to a point
fn outline_dot(
  center: Point,
  style: &StrokeStyle,
  half: f32,
  tolerance: f32,
  forward: &Transform,
  out: &mut Path,
) {
  let mut emit = Emitter { out, forward };
  match style.cap {
    LineCap::Butt => {}
    LineCap::Square => {
      emit.begin();
      emit.push(center + Point::new(-half, -half));
      emit.push(center + Point::new(half, -half));
      emit.push(center + Point::new(half, half));
      emit.push(center + Point::new(-half, half));
    }
    LineCap::Circle => {
      emit.begin();
      emit.push(center + Point::new(half, 0.0));
      emit_arc(
        &mut emit,
        center,
        Point::new(1.0, 0.0),
        std::f32::consts::PI,
        half,
        tolerance,
      );
      emit_arc(
        &mut emit,
        center,
        Point::new(-1.0, 0.0),
        std::f32::consts::PI,
        half,
        tolerance,
      );
    }
  }
}

/// Emits the outline points for one side of one interior vertex
#[allow(clippy::too_many_arguments)]
fn emit_side_vertex(
  emit: &mut Emitter,
  vertex: Point,
  from_offset: Point,
  to_offset: Point,
  outer: bool,
  style: &StrokeStyle,
  half: f32,
  tolerance: f32,
) {
  emit.push(vertex + from_offset * half);
  if outer {
    match style.join {
      LineJoin::Bevel => {}
      LineJoin::Miter => {
        let bisector = (from_offset + to_offset).normalized();
        let cos_half = bisector.dot(from_offset);
        if cos_half > 1e-4 {
          let ratio = 1.0 / cos_half;
          if ratio <= style.miter_limit {
            emit.push(vertex + bisector * (half * ratio));
          }
        }
      }
      LineJoin::Rounded => {
        let sweep = from_offset.cross(to_offset).atan2(from_offset.dot(to_offset));
        emit_arc(emit, vertex, from_offset, sweep, half, tolerance);
      }
    }
  }
  emit.push(vertex + to_offset * half);
}

/// Emits a cap between the two offset points at a run end
///
/// `normal` is the offset direction the side pass arrived on and `tangent`
/// points out of the run.
fn emit_cap(
  emit: &mut Emitter,
  endpoint: Point,
  normal: Point,
  tangent: Point,
  cap: LineCap,
  half: f32,
  tolerance: f32,
) {
  match cap {
    LineCap::Butt => {}
    LineCap::Square => {
      emit.push(endpoint + (normal + tangent) * half);
      emit.push(endpoint + (tangent - normal) * half);
    }
    LineCap::Circle => {
      let sweep = if normal.cross(tangent) >= 0.0 {
        std::f32::consts::PI
      } else {
        -std::f32::consts::PI
      };
      emit_arc(emit, endpoint, normal, sweep, half, tolerance);
    }
  }
}

/// Flattens a circular arc around `center` starting at unit direction
/// `from`, sweeping `sweep` radians at the given radius
fn emit_arc(
  emit: &mut Emitter,
  center: Point,
  from: Point,
  sweep: f32,
  radius: f32,
  tolerance: f32,
) {
  if sweep == 0.0 || radius <= 0.0 {
    return;
  }
  // Chord sagitta below tolerance bounds the step angle.
  let max_step = if tolerance < radius {
    2.0 * (1.0 - tolerance / radius).acos().max(1e-3)
  } else {
    std::f32::consts::FRAC_PI_2
  };
  let steps = (sweep.abs() / max_step).ceil().max(1.0) as usize;
  let delta = sweep / steps as f32;
  let start = from.y.atan2(from.x);
  for k in 1..=steps {
    let angle = start + delta * k as f32;
    emit.push(center + Point::new(angle.cos(), angle.sin()) * radius);
  }
}
