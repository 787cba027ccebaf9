//! The canvas facade
//!
//! `Canvas` owns the pixel plane and wires the pipeline together: path
//! commands run through the transform into the accumulator, drawing calls
//! stroke and scan-convert the result, paint is sampled per covered pixel,
//! shadows get their blurred pre-pass, and everything lands in the
//! destination through the selected composite operator. Pixels live as
//! linear premultiplied floats; sRGB8 appears only in `get_image_data`,
//! `put_image_data`, and image sources.
//!
//! The API is total: bad arguments degrade to no-ops, never errors. Styling
//! lives partly in plain public fields (cap, join, dash phase, composite
//! op, shadow offsets, text anchoring), partly behind validating setters,
//! mirroring the split between assignment and call in the HTML canvas
//! model. `save` snapshots all of it, the clip mask included; the current
//! path deliberately stays outside the state stack.
//!
//! # Example
//!
//! ```
//! use fastcanvas::Canvas;
//!
//! let mut canvas = Canvas::new(64, 64);
//! canvas.set_color(fastcanvas::BrushSlot::Fill, 0.9, 0.2, 0.1, 1.0);
//! canvas.begin_path();
//! canvas.arc(32.0, 32.0, 20.0, 0.0, std::f32::consts::TAU, false);
//! canvas.fill();
//!
//! let mut pixels = vec![0u8; 64 * 64 * 4];
//! canvas.get_image_data(&mut pixels, 64, 64, 64 * 4, 0, 0);
//! assert_eq!(pixels[(32 * 64 + 32) * 4 + 3], 255);
//! ```

use crate::color::Rgba;
use crate::geometry::{Point, Transform};
use crate::paint::blur::{blur_alpha_plane, blur_padding};
use crate::paint::gradient::{LinearGradient, RadialGradient, StopList};
use crate::paint::pattern::{Image, Pattern};
use crate::paint::{Brush, BrushSlot, CompositeOperation, Repetition};
use crate::path::{Path, PathBuilder, FLATTEN_TOLERANCE};
use crate::raster::{FillRule, Mask, Rasterizer};
use crate::stroke::{LineCap, LineJoin, StrokeStyle, Stroker};
use crate::text::{self, SelectedFont, TextAlign, TextBaseline};

/// A self-contained 2D rasterizing canvas
///
/// Follows the W3C 2D context model closely enough to port drawing code
/// directly. See the module documentation for the pipeline layout.
pub struct Canvas {
  width: usize,
  height: usize,
  pixels: Vec<Rgba>,

  /// Cap style for stroke endpoints
  pub line_cap: LineCap,
  /// Join style for stroke corners
  pub line_join: LineJoin,
  /// Phase shift into the dash pattern, in user units
  pub line_dash_offset: f32,
  /// Operator combining new paint with existing pixels
  pub global_composite_operation: CompositeOperation,
  /// Horizontal shadow displacement, in user units
  pub shadow_offset_x: f32,
  /// Vertical shadow displacement, in user units
  pub shadow_offset_y: f32,
  /// Horizontal anchor for text drawing
  pub text_align: TextAlign,
  /// Vertical anchor for text drawing
  pub text_baseline: TextBaseline,

  transform: Transform,
  fill_brush: Brush,
  stroke_brush: Brush,
  line_width: f32,
  miter_limit: f32,
  dash: Vec<f32>,
  global_alpha: f32,
  shadow_color: Rgba,
  shadow_blur: f32,
  font: Option<SelectedFont>,
  clip_mask: Option<Mask>,
  saved: Vec<SavedState>,

  builder: PathBuilder,
  scratch_builder: PathBuilder,
  scratch_path: Path,
  raster: Rasterizer,
  stroker: Stroker,
  coverage_plane: Vec<f32>,
  shadow_path: Path,
  shadow_plane: Vec<f32>,
  shadow_scratch: Vec<f32>,
}

/// Everything `save` captures; the path and pixels stay out
#[derive(Clone)]
struct SavedState {
  transform: Transform,
  fill_brush: Brush,
  stroke_brush: Brush,
  line_width: f32,
  line_cap: LineCap,
  line_join: LineJoin,
  miter_limit: f32,
  dash: Vec<f32>,
  line_dash_offset: f32,
  global_alpha: f32,
  global_composite_operation: CompositeOperation,
  shadow_color: Rgba,
  shadow_offset_x: f32,
  shadow_offset_y: f32,
  shadow_blur: f32,
  text_align: TextAlign,
  text_baseline: TextBaseline,
  font: Option<SelectedFont>,
  clip_mask: Option<Mask>,
}

impl Canvas {
  /// Creates a canvas of the given pixel size, cleared to transparent
  ///
  /// Dimensions are clamped to at least one pixel each; resizing means
  /// creating a new canvas.
  pub fn new(width: u32, height: u32) -> Self {
    let width = width.max(1) as usize;
    let height = height.max(1) as usize;
    Self {
      width,
      height,
      pixels: vec![Rgba::TRANSPARENT; width * height],
      line_cap: LineCap::default(),
      line_join: LineJoin::default(),
      line_dash_offset: 0.0,
      global_composite_operation: CompositeOperation::default(),
      shadow_offset_x: 0.0,
      shadow_offset_y: 0.0,
      text_align: TextAlign::default(),
      text_baseline: TextBaseline::default(),
      transform: Transform::IDENTITY,
      fill_brush: Brush::default(),
      stroke_brush: Brush::default(),
      line_width: 1.0,
      miter_limit: 10.0,
      dash: Vec::new(),
      global_alpha: 1.0,
      shadow_color: Rgba::TRANSPARENT,
      shadow_blur: 0.0,
      font: None,
      clip_mask: None,
      saved: Vec::new(),
      builder: PathBuilder::default(),
      scratch_builder: PathBuilder::default(),
      scratch_path: Path::default(),
      raster: Rasterizer::new(),
      stroker: Stroker::new(),
      coverage_plane: Vec::new(),
      shadow_path: Path::default(),
      shadow_plane: Vec::new(),
      shadow_scratch: Vec::new(),
    }
  }

  /// Canvas width in pixels
  pub fn width(&self) -> u32 {
    self.width as u32
  }

  /// Canvas height in pixels
  pub fn height(&self) -> u32 {
    self.height as u32
  }

  // ==========================================================================
  // Transform
  // ==========================================================================

  /// Scales subsequent drawing about the user-space origin
  pub fn scale(&mut self, x: f32, y: f32) {
    self.concatenate(Transform::scaling(x, y));
  }

  /// Rotates subsequent drawing about the user-space origin, in radians
  pub fn rotate(&mut self, angle: f32) {
    if angle.is_finite() {
      self.concatenate(Transform::rotation(angle));
    }
  }

  /// Translates subsequent drawing
  pub fn translate(&mut self, x: f32, y: f32) {
    self.concatenate(Transform::translation(x, y));
  }

  /// Right-multiplies an arbitrary matrix onto the current transform
  pub fn transform(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
    self.concatenate(Transform::new(a, b, c, d, e, f));
  }

  /// Replaces the current transform outright
  pub fn set_transform(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
    let matrix = Transform::new(a, b, c, d, e, f);
    if matrix_is_finite(&matrix) {
      self.transform = matrix;
    }
  }

  fn concatenate(&mut self, matrix: Transform) {
    if matrix_is_finite(&matrix) {
      self.transform = self.transform.then(&matrix);
    }
  }

  // ==========================================================================
  // Styling
  // ==========================================================================

  /// Sets the compositing alpha; values outside [0, 1] are ignored
  pub fn set_global_alpha(&mut self, alpha: f32) {
    if (0.0..=1.0).contains(&alpha) {
      self.global_alpha = alpha;
    }
  }

  /// Sets the shadow color as straight sRGB components
  pub fn set_shadow_color(&mut self, red: f32, green: f32, blue: f32, alpha: f32) {
    self.shadow_color = Rgba::from_srgb(red, green, blue, alpha);
  }

  /// Sets the shadow blur level; negative or non-finite values are ignored
  ///
  /// The level matches the HTML canvas `shadowBlur`: twice the Gaussian
  /// standard deviation the box cascade approximates.
  pub fn set_shadow_blur(&mut self, level: f32) {
    if level.is_finite() && level >= 0.0 {
      self.shadow_blur = level;
    }
  }

  /// Sets the stroke width in user units; non-positive values are ignored
  pub fn set_line_width(&mut self, width: f32) {
    if width.is_finite() && width > 0.0 {
      self.line_width = width;
    }
  }

  /// Sets the miter-to-bevel cutoff ratio; non-positive values are ignored
  pub fn set_miter_limit(&mut self, limit: f32) {
    if limit.is_finite() && limit > 0.0 {
      self.miter_limit = limit;
    }
  }

  /// Sets the dash pattern, in user units
  ///
  /// Negative and non-finite entries are skipped; an odd count is doubled
  /// to keep on/off phases aligned; a pattern that sums to zero disables
  /// dashing.
  pub fn set_line_dash(&mut self, segments: &[f32]) {
    self.dash.clear();
    self
      .dash
      .extend(segments.iter().copied().filter(|s| s.is_finite() && *s >= 0.0));
    if self.dash.iter().sum::<f32>() <= 0.0 {
      self.dash.clear();
      return;
    }
    if self.dash.len() % 2 == 1 {
      let doubled = self.dash.len();
      for i in 0..doubled {
        let value = self.dash[i];
        self.dash.push(value);
      }
    }
  }

  /// Sets a brush to a solid straight-sRGB color
  pub fn set_color(&mut self, slot: BrushSlot, red: f32, green: f32, blue: f32, alpha: f32) {
    *self.brush_mut(slot) = Brush::Solid(Rgba::from_srgb(red, green, blue, alpha));
  }

  /// Sets a brush to a fresh linear gradient along the given segment
  ///
  /// Coordinates are user-space at the time of the call; add stops with
  /// `add_color_stop`.
  pub fn set_linear_gradient(
    &mut self,
    slot: BrushSlot,
    start_x: f32,
    start_y: f32,
    end_x: f32,
    end_y: f32,
  ) {
    let inverse = self.transform.invert();
    *self.brush_mut(slot) = Brush::Linear(LinearGradient {
      start: Point::new(start_x, start_y),
      end: Point::new(end_x, end_y),
      stops: StopList::default(),
      inverse,
    });
  }

  /// Sets a brush to a fresh radial gradient between two circles
  pub fn set_radial_gradient(
    &mut self,
    slot: BrushSlot,
    start_x: f32,
    start_y: f32,
    start_radius: f32,
    end_x: f32,
    end_y: f32,
    end_radius: f32,
  ) {
    let inverse = self.transform.invert();
    *self.brush_mut(slot) = Brush::Radial(RadialGradient {
      start: Point::new(start_x, start_y),
      start_radius,
      end: Point::new(end_x, end_y),
      end_radius,
      stops: StopList::default(),
      inverse,
    });
  }

  /// Appends a color stop to a gradient brush
  ///
  /// Ignored when the brush is not currently a gradient or the offset is
  /// outside [0, 1].
  pub fn add_color_stop(
    &mut self,
    slot: BrushSlot,
    offset: f32,
    red: f32,
    green: f32,
    blue: f32,
    alpha: f32,
  ) {
    let color = Rgba::from_srgb(red, green, blue, alpha);
    match self.brush_mut(slot) {
      Brush::Linear(gradient) => gradient.stops.add(offset, color),
      Brush::Radial(gradient) => gradient.stops.add(offset, color),
      _ => {}
    }
  }

  /// Sets a brush to a tiled image pattern
  ///
  /// `image` is straight sRGB8 RGBA rows with the given byte stride; the
  /// pixels are copied. An empty or undersized buffer is a no-op.
  pub fn set_pattern(
    &mut self,
    slot: BrushSlot,
    image: &[u8],
    width: usize,
    height: usize,
    stride: usize,
    repetition: Repetition,
  ) {
    let Some(source) = Image::from_srgb8(image, width, height, stride) else {
      return;
    };
    let inverse = self.transform.invert();
    *self.brush_mut(slot) = Brush::Pattern(Pattern::tiled(source, repetition, inverse));
  }

  fn brush_mut(&mut self, slot: BrushSlot) -> &mut Brush {
    match slot {
      BrushSlot::Fill => &mut self.fill_brush,
      BrushSlot::Stroke => &mut self.stroke_brush,
    }
  }

  // ==========================================================================
  // Path building
  // ==========================================================================

  /// Discards the current path and starts an empty one
  pub fn begin_path(&mut self) {
    self.builder.begin();
  }

  /// Starts a new subpath at the given user-space point
  pub fn move_to(&mut self, x: f32, y: f32) {
    self.builder.move_to(Point::new(x, y), &self.transform);
  }

  /// Closes the current subpath and reopens at its start
  pub fn close_path(&mut self) {
    self.builder.close();
  }

  /// Extends the current subpath with a straight segment
  pub fn line_to(&mut self, x: f32, y: f32) {
    self.builder.line_to(Point::new(x, y), &self.transform);
  }

  /// Extends the current subpath with a quadratic Bezier curve
  pub fn quadratic_curve_to(&mut self, control_x: f32, control_y: f32, x: f32, y: f32) {
    self.builder.quadratic_to(
      Point::new(control_x, control_y),
      Point::new(x, y),
      &self.transform,
    );
  }

  /// Extends the current subpath with a cubic Bezier curve
  pub fn bezier_curve_to(
    &mut self,
    control_1_x: f32,
    control_1_y: f32,
    control_2_x: f32,
    control_2_y: f32,
    x: f32,
    y: f32,
  ) {
    self.builder.cubic_to(
      Point::new(control_1_x, control_1_y),
      Point::new(control_2_x, control_2_y),
      Point::new(x, y),
      &self.transform,
    );
  }

  /// Rounds the corner formed with the two given points at the given radius
  pub fn arc_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, radius: f32) {
    self
      .builder
      .arc_to(Point::new(x1, y1), Point::new(x2, y2), radius, &self.transform);
  }

  /// Appends a circular arc
  pub fn arc(
    &mut self,
    center_x: f32,
    center_y: f32,
    radius: f32,
    start_angle: f32,
    end_angle: f32,
    anticlockwise: bool,
  ) {
    self.builder.arc(
      Point::new(center_x, center_y),
      radius,
      start_angle,
      end_angle,
      anticlockwise,
      &self.transform,
    );
  }

  /// Adds a closed axis-aligned rectangle as its own subpath
  pub fn rectangle(&mut self, x: f32, y: f32, width: f32, height: f32) {
    self.builder.rectangle(x, y, width, height, &self.transform);
  }

  // ==========================================================================
  // Drawing
  // ==========================================================================

  /// Fills the current path with the fill brush, non-zero winding
  pub fn fill(&mut self) {
    let path = std::mem::take(&mut self.builder.path);
    self.render_shape(&path, FillRule::NonZero, BrushSlot::Fill, true);
    self.builder.path = path;
  }

  /// Strokes the current path with the stroke brush and line style
  pub fn stroke(&mut self) {
    let path = std::mem::take(&mut self.builder.path);
    self.stroke_path(&path);
    self.builder.path = path;
  }

  /// Intersects the clip mask with the current path's coverage
  ///
  /// Clips only ever tighten; `restore` is the sole way back out.
  pub fn clip(&mut self) {
    let path = std::mem::take(&mut self.builder.path);
    let mask = Mask::from_path(
      &mut self.raster,
      &path,
      FillRule::NonZero,
      self.width,
      self.height,
    );
    self.builder.path = path;
    match &mut self.clip_mask {
      Some(existing) => existing.intersect(&mask),
      None => self.clip_mask = Some(mask),
    }
  }

  /// Hit-tests a point against the current path
  ///
  /// The point enters through the current transform like every other
  /// coordinate, so the transform in effect at call time decides where it
  /// lands relative to the recorded path. Uses the even-odd rule and
  /// ignores the clip mask.
  pub fn is_point_in_path(&self, x: f32, y: f32) -> bool {
    let point = self.transform.apply(Point::new(x, y));
    let mut inside = false;
    for subpath in &self.builder.path.subpaths {
      let points = &subpath.points;
      if points.len() < 2 {
        continue;
      }
      for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        if (a.y > point.y) != (b.y > point.y) {
          let cross_x = a.x + (point.y - a.y) * (b.x - a.x) / (b.y - a.y);
          if cross_x > point.x {
            inside = !inside;
          }
        }
      }
    }
    inside
  }

  /// Fills an axis-aligned rectangle without touching the current path
  pub fn fill_rectangle(&mut self, x: f32, y: f32, width: f32, height: f32) {
    self.scratch_builder.begin();
    self
      .scratch_builder
      .rectangle(x, y, width, height, &self.transform);
    let path = std::mem::take(&mut self.scratch_builder.path);
    self.render_shape(&path, FillRule::NonZero, BrushSlot::Fill, true);
    self.scratch_builder.path = path;
  }

  /// Strokes an axis-aligned rectangle without touching the current path
  pub fn stroke_rectangle(&mut self, x: f32, y: f32, width: f32, height: f32) {
    self.scratch_builder.begin();
    self
      .scratch_builder
      .rectangle(x, y, width, height, &self.transform);
    let path = std::mem::take(&mut self.scratch_builder.path);
    self.stroke_path(&path);
    self.scratch_builder.path = path;
  }

  /// Erases an axis-aligned rectangle back to transparent
  ///
  /// Runs under the transform and clip with antialiasing, but ignores the
  /// composite op, global alpha, and shadows.
  pub fn clear_rectangle(&mut self, x: f32, y: f32, width: f32, height: f32) {
    self.scratch_builder.begin();
    self
      .scratch_builder
      .rectangle(x, y, width, height, &self.transform);
    let path = std::mem::take(&mut self.scratch_builder.path);
    Self::composite_pass(
      &mut self.pixels,
      self.width,
      self.height,
      &mut self.raster,
      &mut self.coverage_plane,
      &path,
      FillRule::NonZero,
      &Brush::Solid(Rgba::new(0.0, 0.0, 0.0, 1.0)),
      1.0,
      CompositeOperation::DestinationOut,
      self.clip_mask.as_ref(),
    );
    self.scratch_builder.path = path;
  }

  // ==========================================================================
  // Text
  // ==========================================================================

  /// Selects a TrueType font for subsequent text calls
  ///
  /// The bytes are copied. Returns whether the data parsed as a usable
  /// font; on failure no font is selected and text calls draw nothing.
  pub fn set_font(&mut self, font: &[u8], size: f32) -> bool {
    if !(size.is_finite() && size > 0.0) || crate::text::ttf::FontFace::parse(font).is_err() {
      self.font = None;
      return false;
    }
    self.font = Some(SelectedFont {
      data: font.to_vec(),
      size,
    });
    true
  }

  /// Fills text at the anchor position
  pub fn fill_text(&mut self, text: &str, x: f32, y: f32) {
    self.draw_text(text, x, y, None, BrushSlot::Fill);
  }

  /// Fills text, squeezing horizontally to fit `max_width`
  pub fn fill_text_with_max_width(&mut self, text: &str, x: f32, y: f32, max_width: f32) {
    self.draw_text(text, x, y, Some(max_width), BrushSlot::Fill);
  }

  /// Strokes text outlines at the anchor position
  pub fn stroke_text(&mut self, text: &str, x: f32, y: f32) {
    self.draw_text(text, x, y, None, BrushSlot::Stroke);
  }

  /// Strokes text outlines, squeezing horizontally to fit `max_width`
  pub fn stroke_text_with_max_width(&mut self, text: &str, x: f32, y: f32, max_width: f32) {
    self.draw_text(text, x, y, Some(max_width), BrushSlot::Stroke);
  }

  /// Total advance of `text` in user units; zero without a usable font
  pub fn measure_text(&self, text: &str) -> f32 {
    match &self.font {
      Some(font) => text::measure(&font.data, font.size, text),
      None => 0.0,
    }
  }

  fn draw_text(&mut self, text: &str, x: f32, y: f32, max_width: Option<f32>, slot: BrushSlot) {
    let Some(font) = &self.font else {
      return;
    };
    self.scratch_builder.begin();
    text::build_text_path(
      &font.data,
      font.size,
      text,
      x,
      y,
      max_width,
      self.text_align,
      self.text_baseline,
      &self.transform,
      &mut self.scratch_builder,
    );
    let path = std::mem::take(&mut self.scratch_builder.path);
    match slot {
      BrushSlot::Fill => self.render_shape(&path, FillRule::NonZero, BrushSlot::Fill, true),
      BrushSlot::Stroke => self.stroke_path(&path),
    }
    self.scratch_builder.path = path;
  }

  // ==========================================================================
  // Images
  // ==========================================================================

  /// Draws an sRGB8 image into a destination rectangle
  ///
  /// Runs the full pipeline: transform, clip, alpha, shadow, compositing,
  /// and bicubic resampling. Negative destination extents flip the image.
  /// An empty or undersized source buffer is a no-op.
  #[allow(clippy::too_many_arguments)]
  pub fn draw_image(
    &mut self,
    image: &[u8],
    width: usize,
    height: usize,
    stride: usize,
    to_x: f32,
    to_y: f32,
    to_width: f32,
    to_height: f32,
  ) {
    let Some(source) = Image::from_srgb8(image, width, height, stride) else {
      return;
    };
    if to_width == 0.0 || to_height == 0.0 || !to_width.is_finite() || !to_height.is_finite() {
      return;
    }
    // Map device space back to source texel space: undo the canvas
    // transform, shift to the rectangle corner, then scale into texels.
    // Negative extents fold the flip into the scale.
    let inverse = self.transform.invert().map(|canvas_inverse| {
      Transform::scaling(width as f32 / to_width, height as f32 / to_height)
        .then(&Transform::translation(-to_x, -to_y))
        .then(&canvas_inverse)
    });
    let brush = Brush::Pattern(Pattern::clamped(source, inverse));

    let corner_x = to_x.min(to_x + to_width);
    let corner_y = to_y.min(to_y + to_height);
    self.scratch_builder.begin();
    self.scratch_builder.rectangle(
      corner_x,
      corner_y,
      to_width.abs(),
      to_height.abs(),
      &self.transform,
    );
    let path = std::mem::take(&mut self.scratch_builder.path);
    if self.shadow_color.a > 0.0 {
      self.render_shadow(&path, FillRule::NonZero);
    }
    Self::composite_pass(
      &mut self.pixels,
      self.width,
      self.height,
      &mut self.raster,
      &mut self.coverage_plane,
      &path,
      FillRule::NonZero,
      &brush,
      self.global_alpha,
      self.global_composite_operation,
      self.clip_mask.as_ref(),
    );
    self.scratch_builder.path = path;
  }

  /// Copies canvas pixels out as straight sRGB8 with ordered dither
  ///
  /// Pixels outside the canvas leave the destination bytes untouched. An
  /// undersized destination buffer is a no-op.
  pub fn get_image_data(
    &self,
    image: &mut [u8],
    width: usize,
    height: usize,
    stride: usize,
    x: i32,
    y: i32,
  ) {
    if !image_bounds_ok(image.len(), width, height, stride) {
      return;
    }
    for row in 0..height {
      let source_y = y + row as i32;
      if source_y < 0 || source_y >= self.height as i32 {
        continue;
      }
      for column in 0..width {
        let source_x = x + column as i32;
        if source_x < 0 || source_x >= self.width as i32 {
          continue;
        }
        let pixel = self.pixels[source_y as usize * self.width + source_x as usize];
        let bytes = pixel.to_srgb8_dithered(source_x as u32, source_y as u32);
        image[row * stride + column * 4..row * stride + column * 4 + 4].copy_from_slice(&bytes);
      }
    }
  }

  /// Writes straight sRGB8 pixels directly into the canvas
  ///
  /// Bypasses the transform, clip, alpha, shadows, and compositing. An
  /// undersized source buffer is a no-op.
  pub fn put_image_data(
    &mut self,
    image: &[u8],
    width: usize,
    height: usize,
    stride: usize,
    x: i32,
    y: i32,
  ) {
    if !image_bounds_ok(image.len(), width, height, stride) {
      return;
    }
    for row in 0..height {
      let dest_y = y + row as i32;
      if dest_y < 0 || dest_y >= self.height as i32 {
        continue;
      }
      for column in 0..width {
        let dest_x = x + column as i32;
        if dest_x < 0 || dest_x >= self.width as i32 {
          continue;
        }
        let src = &image[row * stride + column * 4..row * stride + column * 4 + 4];
        self.pixels[dest_y as usize * self.width + dest_x as usize] =
          Rgba::from_srgb8(src[0], src[1], src[2], src[3]);
      }
    }
  }

  // ==========================================================================
  // State stack
  // ==========================================================================

  /// Pushes a deep copy of the graphics state, clip mask included
  pub fn save(&mut self) {
    self.saved.push(SavedState {
      transform: self.transform,
      fill_brush: self.fill_brush.clone(),
      stroke_brush: self.stroke_brush.clone(),
      line_width: self.line_width,
      line_cap: self.line_cap,
      line_join: self.line_join,
      miter_limit: self.miter_limit,
      dash: self.dash.clone(),
      line_dash_offset: self.line_dash_offset,
      global_alpha: self.global_alpha,
      global_composite_operation: self.global_composite_operation,
      shadow_color: self.shadow_color,
      shadow_offset_x: self.shadow_offset_x,
      shadow_offset_y: self.shadow_offset_y,
      shadow_blur: self.shadow_blur,
      text_align: self.text_align,
      text_baseline: self.text_baseline,
      font: self.font.clone(),
      clip_mask: self.clip_mask.clone(),
    });
  }

  /// Pops the most recent save; a no-op on an empty stack
  pub fn restore(&mut self) {
    let Some(state) = self.saved.pop() else {
      return;
    };
    self.transform = state.transform;
    self.fill_brush = state.fill_brush;
    self.stroke_brush = state.stroke_brush;
    self.line_width = state.line_width;
    self.line_cap = state.line_cap;
    self.line_join = state.line_join;
    self.miter_limit = state.miter_limit;
    self.dash = state.dash;
    self.line_dash_offset = state.line_dash_offset;
    self.global_alpha = state.global_alpha;
    self.global_composite_operation = state.global_composite_operation;
    self.shadow_color = state.shadow_color;
    self.shadow_offset_x = state.shadow_offset_x;
    self.shadow_offset_y = state.shadow_offset_y;
    self.shadow_blur = state.shadow_blur;
    self.text_align = state.text_align;
    self.text_baseline = state.text_baseline;
    self.font = state.font;
    self.clip_mask = state.clip_mask;
  }

  // ==========================================================================
  // Pipeline internals
  // ==========================================================================

  /// Expands a path into its stroke outline and paints it
  fn stroke_path(&mut self, path: &Path) {
    if !(self.line_width > 0.0) || !self.line_width.is_finite() {
      return;
    }
    let Some(inverse) = self.transform.invert() else {
      return;
    };
    let tolerance = FLATTEN_TOLERANCE / self.transform.max_scale();
    let style = StrokeStyle {
      width: self.line_width,
      cap: self.line_cap,
      join: self.line_join,
      miter_limit: self.miter_limit,
      dash: std::mem::take(&mut self.dash),
      dash_offset: if self.line_dash_offset.is_finite() {
        self.line_dash_offset
      } else {
        0.0
      },
    };
    let mut outline = std::mem::take(&mut self.scratch_path);
    self
      .stroker
      .stroke(path, &style, &inverse, &self.transform, tolerance, &mut outline);
    self.dash = style.dash;
    self.render_shape(&outline, FillRule::NonZero, BrushSlot::Stroke, true);
    self.scratch_path = outline;
  }

  /// The common paint pass: optional shadow, then composite the coverage
  fn render_shape(&mut self, path: &Path, rule: FillRule, slot: BrushSlot, with_shadow: bool) {
    // An empty path draws nothing at all, even under operators that
    // otherwise rewrite the whole clip region.
    if path.is_empty() {
      return;
    }
    if with_shadow && self.shadow_color.a > 0.0 {
      self.render_shadow(path, rule);
    }
    let brush = match slot {
      BrushSlot::Fill => &self.fill_brush,
      BrushSlot::Stroke => &self.stroke_brush,
    };
    Self::composite_pass(
      &mut self.pixels,
      self.width,
      self.height,
      &mut self.raster,
      &mut self.coverage_plane,
      path,
      rule,
      brush,
      self.global_alpha,
      self.global_composite_operation,
      self.clip_mask.as_ref(),
    );
  }

  /// Rasterizes `path` and blends the sampled paint into `pixels`
  ///
  /// Bounded operators touch covered pixels only. Unbounded operators
  /// rewrite the destination everywhere, so their coverage is gathered
  /// into a dense plane first and the result is bounded by lerping against
  /// the clip.
  #[allow(clippy::too_many_arguments)]
  fn composite_pass(
    pixels: &mut [Rgba],
    width: usize,
    height: usize,
    raster: &mut Rasterizer,
    coverage_plane: &mut Vec<f32>,
    path: &Path,
    rule: FillRule,
    brush: &Brush,
    alpha: f32,
    op: CompositeOperation,
    clip: Option<&Mask>,
  ) {
    if op.is_bounded() {
      raster.rasterize(path, rule, width, height, |y, x0, cover| {
        let row = &mut pixels[y * width..(y + 1) * width];
        for (i, &coverage) in cover.iter().enumerate() {
          let x = x0 + i;
          let clip_coverage = clip.map_or(1.0, |m| m.coverage_at(x, y));
          let weight = coverage * alpha * clip_coverage;
          if weight <= 0.0 {
            continue;
          }
          let source = brush.sample(Point::new(x as f32 + 0.5, y as f32 + 0.5)) * weight;
          row[x] = op.blend(source, row[x]);
        }
      });
    } else {
      coverage_plane.clear();
      coverage_plane.resize(width * height, 0.0);
      raster.rasterize_into(path, rule, width, height, coverage_plane);
      for y in 0..height {
        for x in 0..width {
          let clip_coverage = clip.map_or(1.0, |m| m.coverage_at(x, y));
          if clip_coverage <= 0.0 {
            continue;
          }
          let coverage = coverage_plane[y * width + x];
          let source = if coverage * alpha > 0.0 {
            brush.sample(Point::new(x as f32 + 0.5, y as f32 + 0.5)) * (coverage * alpha)
          } else {
            Rgba::TRANSPARENT
          };
          let dest = pixels[y * width + x];
          let blended = op.blend(source, dest);
          pixels[y * width + x] = dest.lerp(blended, clip_coverage);
        }
      }
    }
  }

  /// The shadow pre-pass: silhouette, box-cascade blur, composite
  fn render_shadow(&mut self, path: &Path, rule: FillRule) {
    let Some((min, max)) = path.bounds() else {
      return;
    };
    let offset_x = finite_or_zero(self.shadow_offset_x);
    let offset_y = finite_or_zero(self.shadow_offset_y);
    let sigma = self.shadow_blur * 0.5;
    let pad = blur_padding(sigma) as i32;

    // The working region: shape bounds displaced by the offset, grown by
    // the blur reach, clipped against the canvas grown the same way.
    let x0 = ((min.x + offset_x).floor() as i32 - pad).max(-pad);
    let y0 = ((min.y + offset_y).floor() as i32 - pad).max(-pad);
    let x1 = ((max.x + offset_x).ceil() as i32 + pad).min(self.width as i32 + pad);
    let y1 = ((max.y + offset_y).ceil() as i32 + pad).min(self.height as i32 + pad);
    if x0 >= x1 || y0 >= y1 {
      return;
    }
    let plane_width = (x1 - x0) as usize;
    let plane_height = (y1 - y0) as usize;

    // Silhouette of the shape, displaced into plane coordinates.
    self.shadow_path.clear();
    for subpath in &path.subpaths {
      let mut shifted = subpath.clone();
      for point in &mut shifted.points {
        point.x += offset_x - x0 as f32;
        point.y += offset_y - y0 as f32;
      }
      self.shadow_path.subpaths.push(shifted);
    }
    self.shadow_plane.clear();
    self.shadow_plane.resize(plane_width * plane_height, 0.0);
    self.raster.rasterize_into(
      &self.shadow_path,
      rule,
      plane_width,
      plane_height,
      &mut self.shadow_plane,
    );
    blur_alpha_plane(
      &mut self.shadow_plane,
      &mut self.shadow_scratch,
      plane_width,
      plane_height,
      sigma,
    );

    let op = self.global_composite_operation;
    for plane_y in 0..plane_height {
      let canvas_y = y0 + plane_y as i32;
      if canvas_y < 0 || canvas_y >= self.height as i32 {
        continue;
      }
      for plane_x in 0..plane_width {
        let canvas_x = x0 + plane_x as i32;
        if canvas_x < 0 || canvas_x >= self.width as i32 {
          continue;
        }
        let coverage = self.shadow_plane[plane_y * plane_width + plane_x];
        if coverage <= 0.0 {
          continue;
        }
        let clip_coverage = self
          .clip_mask
          .as_ref()
          .map_or(1.0, |m| m.coverage_at(canvas_x as usize, canvas_y as usize));
        let weight = coverage * self.global_alpha * clip_coverage;
        if weight <= 0.0 {
          continue;
        }
        let index = canvas_y as usize * self.width + canvas_x as usize;
        let source = self.shadow_color * weight;
        self.pixels[index] = op.blend(source, self.pixels[index]);
      }
    }
  }
}

fn matrix_is_finite(matrix: &Transform) -> bool {
  matrix.a.is_finite()
    && matrix.b.is_finite()
    && matrix.c.is_finite()
    && matrix.d.is_finite()
    && matrix.e.is_finite()
    && matrix.f.is_finite()
}

fn finite_or_zero(value: f32) -> f32 {
  if value.is_finite() {
    value
  } else {
    0.0
  }
}

fn image_bounds_ok(buffer_len: usize, width: usize, height: usize, stride: usize) -> bool {
  if width == 0 || height == 0 || stride < width * 4 {
    return false;
  }
  buffer_len >= (height - 1) * stride + width * 4
}
