//! Core geometry types for path building and painting
//!
//! This module provides the 2D primitives the rasterizer is built on: a
//! `Point` with the usual vector operations and the 2x3 affine `Transform`
//! used by the canvas transform stack.
//!
//! # Coordinate System
//!
//! The coordinate system has its origin at the top-left corner:
//! - Positive X extends to the right
//! - Positive Y extends downward

use std::ops::{Add, Mul, Neg, Sub};

/// A 2D point (or vector) in device or user space
///
/// The same type serves as both a position and a direction; path building
/// and stroking lean heavily on the vector operations.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
  /// X coordinate (horizontal position, increases to the right)
  pub x: f32,
  /// Y coordinate (vertical position, increases downward)
  pub y: f32,
}

impl Point {
  /// The zero point at the origin (0, 0)
  pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

  /// Creates a new point at the given coordinates
  pub const fn new(x: f32, y: f32) -> Self {
    Self { x, y }
  }

  /// Dot product with another vector
  pub fn dot(self, other: Point) -> f32 {
    self.x * other.x + self.y * other.y
  }

  /// Z component of the cross product with another vector
  ///
  /// Positive when `other` lies clockwise of `self` on screen (y grows
  /// downward).
  pub fn cross(self, other: Point) -> f32 {
    self.x * other.y - self.y * other.x
  }

  /// Euclidean length
  pub fn length(self) -> f32 {
    self.x.hypot(self.y)
  }

  /// Distance to another point
  pub fn distance_to(self, other: Point) -> f32 {
    (other - self).length()
  }

  /// Unit vector in the same direction, or zero for a zero vector
  pub fn normalized(self) -> Point {
    let len = self.length();
    if len > 0.0 {
      Point::new(self.x / len, self.y / len)
    } else {
      Point::ZERO
    }
  }

  /// Perpendicular vector, rotated a quarter turn
  pub fn perpendicular(self) -> Point {
    Point::new(-self.y, self.x)
  }

  /// Linear interpolation between two points
  pub fn lerp(self, other: Point, t: f32) -> Point {
    Point::new(
      self.x + (other.x - self.x) * t,
      self.y + (other.y - self.y) * t,
    )
  }
}

impl Add for Point {
  type Output = Point;
  fn add(self, other: Point) -> Point {
    Point::new(self.x + other.x, self.y + other.y)
  }
}

impl Sub for Point {
  type Output = Point;
  fn sub(self, other: Point) -> Point {
    Point::new(self.x - other.x, self.y - other.y)
  }
}

impl Mul<f32> for Point {
  type Output = Point;
  fn mul(self, factor: f32) -> Point {
    Point::new(self.x * factor, self.y * factor)
  }
}

impl Neg for Point {
  type Output = Point;
  fn neg(self) -> Point {
    Point::new(-self.x, -self.y)
  }
}

/// A 2x3 affine transformation matrix
///
/// Maps `(x, y)` to `(a*x + c*y + e, b*x + d*y + f)`, the convention of the
/// HTML canvas `transform()` call. Composition is by right-multiplication:
/// concatenating `m` onto the current matrix makes `m` act on incoming
/// coordinates first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
  pub a: f32,
  pub b: f32,
  pub c: f32,
  pub d: f32,
  pub e: f32,
  pub f: f32,
}

impl Transform {
  /// The identity transform
  pub const IDENTITY: Self = Self {
    a: 1.0,
    b: 0.0,
    c: 0.0,
    d: 1.0,
    e: 0.0,
    f: 0.0,
  };

  /// Creates a transform from the six matrix entries
  pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
    Self { a, b, c, d, e, f }
  }

  /// Pure translation
  pub const fn translation(x: f32, y: f32) -> Self {
    Self::new(1.0, 0.0, 0.0, 1.0, x, y)
  }

  /// Pure scale about the origin
  pub const fn scaling(x: f32, y: f32) -> Self {
    Self::new(x, 0.0, 0.0, y, 0.0, 0.0)
  }

  /// Pure rotation about the origin, angle in radians
  pub fn rotation(angle: f32) -> Self {
    let (sin, cos) = angle.sin_cos();
    Self::new(cos, sin, -sin, cos, 0.0, 0.0)
  }

  /// Applies the transform to a point
  pub fn apply(&self, point: Point) -> Point {
    Point::new(
      self.a * point.x + self.c * point.y + self.e,
      self.b * point.x + self.d * point.y + self.f,
    )
  }

  /// Right-multiplies by another transform
  ///
  /// The returned matrix applies `other` to incoming coordinates first
  /// and `self` second.
  pub fn then(&self, other: &Transform) -> Transform {
    Transform::new(
      self.a * other.a + self.c * other.b,
      self.b * other.a + self.d * other.b,
      self.a * other.c + self.c * other.d,
      self.b * other.c + self.d * other.d,
      self.a * other.e + self.c * other.f + self.e,
      self.b * other.e + self.d * other.f + self.f,
    )
  }

  /// Determinant of the linear part
  pub fn determinant(&self) -> f32 {
    self.a * self.d - self.b * self.c
  }

  /// Inverse transform, or `None` when the matrix is degenerate
  ///
  /// Degenerate transforms still have to produce defined output further up
  /// the pipeline; callers treat `None` as "paints nothing".
  pub fn invert(&self) -> Option<Transform> {
    let det = self.determinant();
    if det == 0.0 || !det.is_finite() {
      return None;
    }
    let inv = 1.0 / det;
    Some(Transform::new(
      self.d * inv,
      -self.b * inv,
      -self.c * inv,
      self.a * inv,
      (self.c * self.f - self.d * self.e) * inv,
      (self.b * self.e - self.a * self.f) * inv,
    ))
  }

  /// Largest singular value of the linear part
  ///
  /// Bounds how much the transform can stretch a distance; the flattener
  /// uses it to carry a device-space tolerance back into user space.
  pub fn max_scale(&self) -> f32 {
    let t = self.a * self.a + self.b * self.b + self.c * self.c + self.d * self.d;
    let det = self.determinant().abs();
    let s = ((t + 2.0 * det).max(0.0)).sqrt() * 0.5 + ((t - 2.0 * det).max(0.0)).sqrt() * 0.5;
    if s.is_finite() && s > 0.0 {
      s
    } else {
      1.0
    }
  }
}

impl Default for Transform {
  fn default() -> Self {
    Self::IDENTITY
  }
}
