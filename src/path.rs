//! Path accumulation and curve flattening
//!
//! The canvas records geometry as a flat list of subpaths, each an ordered
//! run of device-space points plus a closed flag. Curves never survive past
//! this module: quadratics, cubics, and arcs are flattened to line segments
//! the moment they are appended, using adaptive subdivision with an explicit
//! work stack so degenerate control polygons cannot blow the call stack.
//!
//! Client coordinates are transformed into device space on append; the
//! transform in effect when a primitive is entered is the one that applies
//! to it. Arc geometry is constructed in user space (a circle stays a
//! circle there) and the cubic approximations are transformed control-point
//! by control-point, so the flattening tolerance holds in device space even
//! under rotation or anisotropic scale.

use crate::geometry::{Point, Transform};

/// Maximum device-space deviation of a flattened segment from the true curve
pub(crate) const FLATTEN_TOLERANCE: f32 = 0.25;

// Subdivision bail-out for pathological control polygons (NaN coordinates
// never converge).
const MAX_SUBDIVISIONS: usize = 1024;

/// One run of connected device-space points
#[derive(Debug, Clone, Default)]
pub(crate) struct Subpath {
  pub points: Vec<Point>,
  pub closed: bool,
}

/// An ordered sequence of subpaths in device space
#[derive(Debug, Clone, Default)]
pub(crate) struct Path {
  pub subpaths: Vec<Subpath>,
}

impl Path {
  pub fn clear(&mut self) {
    self.subpaths.clear();
  }

  pub fn is_empty(&self) -> bool {
    self.subpaths.iter().all(|s| s.points.len() < 2)
  }

  /// Axis-aligned bounding box over every subpath point
  pub fn bounds(&self) -> Option<(Point, Point)> {
    let mut min = Point::new(f32::INFINITY, f32::INFINITY);
    let mut max = Point::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
    let mut any = false;
    for subpath in &self.subpaths {
      for p in &subpath.points {
        if !p.x.is_finite() || !p.y.is_finite() {
          continue;
        }
        any = true;
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
      }
    }
    any.then_some((min, max))
  }
}

/// Records client path commands into a device-space `Path`
///
/// Tracks the pen position in both spaces: device points land in the path,
/// while arc construction needs the user-space pen.
#[derive(Debug, Clone, Default)]
pub(crate) struct PathBuilder {
  pub path: Path,
  current_user: Option<Point>,
  start_user: Option<Point>,
  flatten_stack: Vec<[Point; 4]>,
}

impl PathBuilder {
  pub fn begin(&mut self) {
    self.path.clear();
    self.current_user = None;
    self.start_user = None;
  }

  pub fn move_to(&mut self, p: Point, transform: &Transform) {
    self.path.subpaths.push(Subpath {
      points: vec![transform.apply(p)],
      closed: false,
    });
    self.current_user = Some(p);
    self.start_user = Some(p);
  }

  pub fn line_to(&mut self, p: Point, transform: &Transform) {
    if self.current_user.is_none() {
      self.move_to(p, transform);
      return;
    }
    self.push_device(transform.apply(p));
    self.current_user = Some(p);
  }

  pub fn close(&mut self) {
    let Some(subpath) = self.path.subpaths.last_mut() else {
      return;
    };
    if subpath.points.is_empty() {
      return;
    }
    subpath.closed = true;
    let start_device = subpath.points[0];
    self.path.subpaths.push(Subpath {
      points: vec![start_device],
      closed: false,
    });
    self.current_user = self.start_user;
  }

  pub fn quadratic_to(&mut self, control: Point, to: Point, transform: &Transform) {
    if self.current_user.is_none() {
      self.move_to(control, transform);
    }
    let from = self.current_user.unwrap();
    // Exact degree elevation; one flattener covers both curve orders.
    let c1 = from + (control - from) * (2.0 / 3.0);
    let c2 = to + (control - to) * (2.0 / 3.0);
    self.cubic_to(c1, c2, to, transform);
  }

  pub fn cubic_to(&mut self, c1: Point, c2: Point, to: Point, transform: &Transform) {
    if self.current_user.is_none() {
      self.move_to(c1, transform);
    }
    let from = self.current_user.unwrap();
    let device = [
      transform.apply(from),
      transform.apply(c1),
      transform.apply(c2),
      transform.apply(to),
    ];
    self.flatten_cubic(device);
    self.current_user = Some(to);
  }

  /// Appends a circular arc around `center` from `start_angle` to
  /// `end_angle`, connecting from the pen position with a line
  pub fn arc(
    &mut self,
    center: Point,
    radius: f32,
    start_angle: f32,
    end_angle: f32,
    anticlockwise: bool,
    transform: &Transform,
  ) {
    if !radius.is_finite() || radius <= 0.0 {
      self.line_to(center, transform);
      return;
    }
    let sweep = normalize_sweep(start_angle, end_angle, anticlockwise);
    let start = arc_point(center, radius, start_angle);
    self.line_to(start, transform);
    self.append_arc_sweep(center, radius, start_angle, sweep, transform);
  }

  /// Appends a line to the tangent point of the circle of the given radius
  /// touching rays `pen -> p1` and `p1 -> p2`, then the connecting arc
  pub fn arc_to(&mut self, p1: Point, p2: Point, radius: f32, transform: &Transform) {
    if self.current_user.is_none() {
      self.move_to(p1, transform);
      return;
    }
    let p0 = self.current_user.unwrap();
    let v0 = p0 - p1;
    let v2 = p2 - p1;
    let cross = v0.cross(v2);
    let l0 = v0.length();
    let l2 = v2.length();
    // Zero radius, coincident points, and collinear rays all degrade to a
    // straight segment through the corner.
    if !(radius > 0.0) || !radius.is_finite() || cross == 0.0 || l0 == 0.0 || l2 == 0.0 {
      self.line_to(p1, transform);
      return;
    }
    // tan of the half angle between the rays, in a form that stays stable
    // as they approach collinearity.
    let tan_half = cross.abs() / (l0 * l2 + v0.dot(v2));
    if !(tan_half > 0.0) || !tan_half.is_finite() {
      self.line_to(p1, transform);
      return;
    }
    let tangent_distance = radius / tan_half;
    let d0 = v0.normalized();
    let d2 = v2.normalized();
    let t0 = p1 + d0 * tangent_distance;
    let t2 = p1 + d2 * tangent_distance;
    let bisector = (d0 + d2).normalized();
    let sin_half = tan_half / (1.0 + tan_half * tan_half).sqrt();
    let center = p1 + bisector * (radius / sin_half);

    self.line_to(t0, transform);
    let a0 = (t0.y - center.y).atan2(t0.x - center.x);
    let a2 = (t2.y - center.y).atan2(t2.x - center.x);
    // The tangent arc always spans less than a half turn; pick the short way.
    let mut sweep = a2 - a0;
    const TAU: f32 = std::f32::consts::TAU;
    if sweep > std::f32::consts::PI {
      sweep -= TAU;
    } else if sweep < -std::f32::consts::PI {
      sweep += TAU;
    }
    self.append_arc_sweep(center, radius, a0, sweep, transform);
    self.current_user = Some(t2);
  }

  /// Adds a closed rectangular subpath and leaves the pen at its origin
  pub fn rectangle(&mut self, x: f32, y: f32, w: f32, h: f32, transform: &Transform) {
    self.move_to(Point::new(x, y), transform);
    self.line_to(Point::new(x + w, y), transform);
    self.line_to(Point::new(x + w, y + h), transform);
    self.line_to(Point::new(x, y + h), transform);
    self.close();
    self.move_to(Point::new(x, y), transform);
  }

  fn push_device(&mut self, p: Point) {
    if self.path.subpaths.is_empty() {
      self.path.subpaths.push(Subpath::default());
    }
    let points = &mut self.path.subpaths.last_mut().unwrap().points;
    if points.last() != Some(&p) {
      points.push(p);
    }
  }

  /// Emits one arc sweep as cubic approximations of at most a quarter turn
  fn append_arc_sweep(
    &mut self,
    center: Point,
    radius: f32,
    start_angle: f32,
    sweep: f32,
    transform: &Transform,
  ) {
    if sweep == 0.0 || !sweep.is_finite() {
      return;
    }
    let segments = (sweep.abs() / std::f32::consts::FRAC_PI_2).ceil().max(1.0) as usize;
    let step = sweep / segments as f32;
    // Control distance putting the curve through the arc midpoint.
    let kappa = 4.0 / 3.0 * (step / 4.0).tan();
    let mut angle = start_angle;
    let mut from = arc_point(center, radius, angle);
    for _ in 0..segments {
      let next_angle = angle + step;
      let to = arc_point(center, radius, next_angle);
      let tangent_from = Point::new(-angle.sin(), angle.cos()) * (radius * kappa);
      let tangent_to = Point::new(-next_angle.sin(), next_angle.cos()) * (radius * kappa);
      let device = [
        transform.apply(from),
        transform.apply(from + tangent_from),
        transform.apply(to - tangent_to),
        transform.apply(to),
      ];
      self.flatten_cubic(device);
      angle = next_angle;
      from = to;
    }
    self.current_user = Some(from);
  }

  /// Flattens a device-space cubic onto the current subpath
  ///
  /// Subdivides until both control points sit within the tolerance of the
  /// chord, using a work stack instead of recursion.
  fn flatten_cubic(&mut self, curve: [Point; 4]) {
    self.flatten_stack.clear();
    self.flatten_stack.push(curve);
    let mut splits = 0usize;
    while let Some(segment) = self.flatten_stack.pop() {
      if splits >= MAX_SUBDIVISIONS || cubic_is_flat(&segment, FLATTEN_TOLERANCE) {
        self.push_device(segment[3]);
        continue;
      }
      splits += 1;
      let (left, right) = split_cubic(&segment, 0.5);
      self.flatten_stack.push(right);
      self.flatten_stack.push(left);
    }
  }
}

fn arc_point(center: Point, radius: f32, angle: f32) -> Point {
  Point::new(
    center.x + radius * angle.cos(),
    center.y + radius * angle.sin(),
  )
}

/// Clamps an HTML-style start/end angle pair to one signed sweep
fn normalize_sweep(start: f32, end: f32, anticlockwise: bool) -> f32 {
  const TAU: f32 = std::f32::consts::TAU;
  let raw = end - start;
  if !raw.is_finite() {
    return 0.0;
  }
  if !anticlockwise {
    if raw >= TAU {
      TAU
    } else {
      raw.rem_euclid(TAU)
    }
  } else if raw <= -TAU {
    -TAU
  } else {
    -(-raw).rem_euclid(TAU)
  }
}

fn point_line_distance(p: Point, a: Point, b: Point) -> f32 {
  let ab = b - a;
  let len = ab.length();
  if len == 0.0 {
    return p.distance_to(a);
  }
  ((p - a).cross(ab) / len).abs()
}

fn cubic_is_flat(curve: &[Point; 4], tolerance: f32) -> bool {
  let d1 = point_line_distance(curve[1], curve[0], curve[3]);
  let d2 = point_line_distance(curve[2], curve[0], curve[3]);
  d1.max(d2) <= tolerance
}

fn split_cubic(curve: &[Point; 4], t: f32) -> ([Point; 4], [Point; 4]) {
  let ab = curve[0].lerp(curve[1], t);
  let bc = curve[1].lerp(curve[2], t);
  let cd = curve[2].lerp(curve[3], t);
  let abc = ab.lerp(bc, t);
  let bcd = bc.lerp(cd, t);
  let mid = abc.lerp(bcd, t);
  (
    [curve[0], ab, abc, mid],
    [mid, bcd, cd, curve[3]],
  )
}
