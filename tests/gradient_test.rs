//! Gradient and pattern paint through the full canvas pipeline

mod common;

use common::{alpha_at, read_pixels, rgba_at};
use fastcanvas::{BrushSlot, Canvas, Repetition};

fn luminance(rgba: [u8; 4]) -> u32 {
  rgba[0] as u32 + rgba[1] as u32 + rgba[2] as u32
}

/// Equal up to the one-LSB wobble ordered dithering allows
fn nearly_equal(a: [u8; 4], b: [u8; 4]) -> bool {
  a.iter().zip(&b).all(|(&x, &y)| (x as i32 - y as i32).abs() <= 1)
}

#[test]
fn linear_gradient_ramps_monotonically() {
  let mut canvas = Canvas::new(10, 1);
  canvas.set_linear_gradient(BrushSlot::Fill, 0.0, 0.0, 10.0, 0.0);
  canvas.add_color_stop(BrushSlot::Fill, 0.0, 0.0, 0.0, 0.0, 1.0);
  canvas.add_color_stop(BrushSlot::Fill, 1.0, 1.0, 1.0, 1.0, 1.0);
  canvas.fill_rectangle(0.0, 0.0, 10.0, 1.0);
  let pixels = read_pixels(&canvas);
  let mut previous = luminance(rgba_at(&pixels, 10, 0, 0));
  for x in 1..10 {
    let current = luminance(rgba_at(&pixels, 10, x, 0));
    assert!(current > previous, "no increase at x={x}");
    previous = current;
  }
  assert_eq!(alpha_at(&pixels, 10, 0, 0), 255);
}

#[test]
fn gradient_without_stops_paints_nothing() {
  let mut canvas = Canvas::new(8, 8);
  canvas.set_linear_gradient(BrushSlot::Fill, 0.0, 0.0, 8.0, 0.0);
  canvas.fill_rectangle(0.0, 0.0, 8.0, 8.0);
  assert!(read_pixels(&canvas).iter().all(|&b| b == 0));
}

#[test]
fn gradient_clamps_before_first_and_after_last_stop() {
  let mut canvas = Canvas::new(30, 1);
  canvas.set_linear_gradient(BrushSlot::Fill, 10.0, 0.0, 20.0, 0.0);
  canvas.add_color_stop(BrushSlot::Fill, 0.0, 1.0, 0.0, 0.0, 1.0);
  canvas.add_color_stop(BrushSlot::Fill, 1.0, 0.0, 0.0, 1.0, 1.0);
  canvas.fill_rectangle(0.0, 0.0, 30.0, 1.0);
  let pixels = read_pixels(&canvas);
  assert_eq!(rgba_at(&pixels, 30, 2, 0), [255, 0, 0, 255]);
  assert_eq!(rgba_at(&pixels, 30, 28, 0), [0, 0, 255, 255]);
}

#[test]
fn duplicate_stop_offsets_make_a_hard_edge() {
  let mut canvas = Canvas::new(20, 1);
  canvas.set_linear_gradient(BrushSlot::Fill, 0.0, 0.0, 20.0, 0.0);
  canvas.add_color_stop(BrushSlot::Fill, 0.0, 1.0, 0.0, 0.0, 1.0);
  canvas.add_color_stop(BrushSlot::Fill, 0.5, 1.0, 0.0, 0.0, 1.0);
  canvas.add_color_stop(BrushSlot::Fill, 0.5, 0.0, 1.0, 0.0, 1.0);
  canvas.add_color_stop(BrushSlot::Fill, 1.0, 0.0, 1.0, 0.0, 1.0);
  canvas.fill_rectangle(0.0, 0.0, 20.0, 1.0);
  let pixels = read_pixels(&canvas);
  assert_eq!(rgba_at(&pixels, 20, 8, 0), [255, 0, 0, 255]);
  assert_eq!(rgba_at(&pixels, 20, 11, 0), [0, 255, 0, 255]);
}

#[test]
fn radial_gradient_rings_outward() {
  let mut canvas = Canvas::new(40, 40);
  canvas.set_radial_gradient(BrushSlot::Fill, 20.0, 20.0, 0.0, 20.0, 20.0, 15.0);
  canvas.add_color_stop(BrushSlot::Fill, 0.0, 1.0, 1.0, 1.0, 1.0);
  canvas.add_color_stop(BrushSlot::Fill, 1.0, 0.0, 0.0, 0.0, 1.0);
  canvas.fill_rectangle(0.0, 0.0, 40.0, 40.0);
  let pixels = read_pixels(&canvas);
  let center = luminance(rgba_at(&pixels, 40, 20, 20));
  let mid = luminance(rgba_at(&pixels, 40, 27, 20));
  let edge = luminance(rgba_at(&pixels, 40, 34, 20));
  assert!(center > mid, "{center} vs {mid}");
  assert!(mid > edge, "{mid} vs {edge}");
}

#[test]
fn radial_point_past_both_circles_gets_the_far_color() {
  // Two small circles along the x axis; sample far beyond the second.
  let mut canvas = Canvas::new(40, 8);
  canvas.set_radial_gradient(BrushSlot::Fill, 8.0, 4.0, 1.0, 16.0, 4.0, 1.0);
  canvas.add_color_stop(BrushSlot::Fill, 0.0, 1.0, 0.0, 0.0, 1.0);
  canvas.add_color_stop(BrushSlot::Fill, 1.0, 0.0, 0.0, 1.0, 1.0);
  canvas.fill_rectangle(0.0, 0.0, 40.0, 8.0);
  let pixels = read_pixels(&canvas);
  // Clamped, not extrapolated: far right is the t=1 stop.
  assert_eq!(rgba_at(&pixels, 40, 36, 4), [0, 0, 255, 255]);
  // And the far left mirrors to the t=0 stop.
  assert_eq!(rgba_at(&pixels, 40, 1, 4), [255, 0, 0, 255]);
}

#[test]
fn brush_space_is_fixed_when_the_brush_is_set() {
  // Same gradient, sampled through two different paths and a transform
  // changed after the brush was configured: the color at a device pixel
  // must depend only on the brush state.
  let mut canvas = Canvas::new(20, 20);
  canvas.set_linear_gradient(BrushSlot::Fill, 0.0, 0.0, 20.0, 0.0);
  canvas.add_color_stop(BrushSlot::Fill, 0.0, 0.0, 0.0, 0.0, 1.0);
  canvas.add_color_stop(BrushSlot::Fill, 1.0, 1.0, 1.0, 1.0, 1.0);
  canvas.fill_rectangle(0.0, 0.0, 20.0, 10.0);
  let first = read_pixels(&canvas);

  // New path, translated canvas; the gradient must not move.
  canvas.translate(5.0, 0.0);
  canvas.begin_path();
  canvas.move_to(-5.0, 10.0);
  canvas.line_to(15.0, 10.0);
  canvas.line_to(15.0, 20.0);
  canvas.line_to(-5.0, 20.0);
  canvas.close_path();
  canvas.fill();
  let second = read_pixels(&canvas);

  for x in 0..20 {
    assert!(
      nearly_equal(rgba_at(&first, 20, x, 5), rgba_at(&second, 20, x, 15)),
      "gradient moved at x={x}"
    );
  }
}

// ============================================================================
// Patterns
// ============================================================================

fn checker_bytes() -> Vec<u8> {
  let mut data = Vec::new();
  for color in [[255u8, 255, 255, 255], [0, 0, 0, 255], [0, 0, 0, 255], [
    255, 255, 255, 255,
  ]] {
    data.extend_from_slice(&color);
  }
  data
}

#[test]
fn repeating_pattern_tiles_the_fill() {
  let mut canvas = Canvas::new(8, 8);
  canvas.set_pattern(
    BrushSlot::Fill,
    &checker_bytes(),
    2,
    2,
    8,
    Repetition::Repeat,
  );
  canvas.fill_rectangle(0.0, 0.0, 8.0, 8.0);
  let pixels = read_pixels(&canvas);
  // Texel centers two tiles apart agree.
  assert!(nearly_equal(
    rgba_at(&pixels, 8, 0, 0),
    rgba_at(&pixels, 8, 4, 2)
  ));
  assert!(nearly_equal(
    rgba_at(&pixels, 8, 1, 0),
    rgba_at(&pixels, 8, 5, 4)
  ));
  // And everything is opaque.
  assert!(pixels.chunks_exact(4).all(|p| p[3] == 255));
}

#[test]
fn no_repeat_pattern_stops_at_the_image_edge() {
  let mut canvas = Canvas::new(12, 12);
  canvas.set_pattern(
    BrushSlot::Fill,
    &checker_bytes(),
    2,
    2,
    8,
    Repetition::NoRepeat,
  );
  canvas.fill_rectangle(0.0, 0.0, 12.0, 12.0);
  let pixels = read_pixels(&canvas);
  assert!(alpha_at(&pixels, 12, 0, 0) > 0);
  assert_eq!(alpha_at(&pixels, 12, 8, 8), 0);
  assert_eq!(alpha_at(&pixels, 12, 1, 8), 0);
}

#[test]
fn undersized_pattern_buffer_is_ignored() {
  let mut canvas = Canvas::new(8, 8);
  canvas.set_color(BrushSlot::Fill, 1.0, 0.0, 0.0, 1.0);
  canvas.set_pattern(BrushSlot::Fill, &[1, 2, 3], 2, 2, 8, Repetition::Repeat);
  canvas.fill_rectangle(0.0, 0.0, 8.0, 8.0);
  // The solid brush survives the rejected pattern call.
  assert_eq!(rgba_at(&read_pixels(&canvas), 8, 4, 4), [255, 0, 0, 255]);
}
