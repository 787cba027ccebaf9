//! End-to-end canvas behavior: fills, state, clipping, compositing, shadows

mod common;

use common::{alpha_at, read_pixels, rgba_at};
use fastcanvas::{BrushSlot, Canvas, CompositeOperation};

#[test]
fn opaque_fill_hits_exact_pixels() {
  let mut canvas = Canvas::new(32, 32);
  canvas.set_color(BrushSlot::Fill, 1.0, 0.0, 0.0, 1.0);
  canvas.fill_rectangle(8.0, 8.0, 16.0, 16.0);
  let pixels = read_pixels(&canvas);
  assert_eq!(rgba_at(&pixels, 32, 16, 16), [255, 0, 0, 255]);
  assert_eq!(rgba_at(&pixels, 32, 0, 0), [0, 0, 0, 0]);
  assert_eq!(rgba_at(&pixels, 32, 7, 16), [0, 0, 0, 0]);
}

#[test]
fn fresh_canvas_is_transparent_black() {
  let canvas = Canvas::new(4, 4);
  let pixels = read_pixels(&canvas);
  assert!(pixels.iter().all(|&b| b == 0));
}

#[test]
fn canvas_dimensions_clamp_to_one() {
  let canvas = Canvas::new(0, 0);
  assert_eq!(canvas.width(), 1);
  assert_eq!(canvas.height(), 1);
}

#[test]
fn fill_respects_transform() {
  let mut canvas = Canvas::new(32, 32);
  canvas.set_color(BrushSlot::Fill, 0.0, 1.0, 0.0, 1.0);
  canvas.translate(10.0, 10.0);
  canvas.scale(2.0, 1.0);
  canvas.fill_rectangle(0.0, 0.0, 5.0, 5.0);
  let pixels = read_pixels(&canvas);
  // Rectangle lands at (10, 10) sized 10x5.
  assert_eq!(alpha_at(&pixels, 32, 12, 12), 255);
  assert_eq!(alpha_at(&pixels, 32, 19, 12), 255);
  assert_eq!(alpha_at(&pixels, 32, 21, 12), 0);
  assert_eq!(alpha_at(&pixels, 32, 12, 16), 0);
}

#[test]
fn fill_rectangle_leaves_current_path_alone() {
  let mut canvas = Canvas::new(16, 16);
  canvas.begin_path();
  canvas.rectangle(2.0, 2.0, 4.0, 4.0);
  canvas.fill_rectangle(8.0, 8.0, 4.0, 4.0);
  assert!(canvas.is_point_in_path(4.0, 4.0));
  assert!(!canvas.is_point_in_path(10.0, 10.0));
}

// ============================================================================
// Path hit testing
// ============================================================================

#[test]
fn point_in_path_is_false_after_begin_path() {
  let mut canvas = Canvas::new(16, 16);
  canvas.rectangle(0.0, 0.0, 16.0, 16.0);
  assert!(canvas.is_point_in_path(8.0, 8.0));
  canvas.begin_path();
  assert!(!canvas.is_point_in_path(8.0, 8.0));
}

#[test]
fn point_in_path_uses_even_odd() {
  let mut canvas = Canvas::new(32, 32);
  canvas.begin_path();
  canvas.rectangle(2.0, 2.0, 20.0, 20.0);
  canvas.rectangle(8.0, 8.0, 8.0, 8.0);
  // Even-odd: the doubly-enclosed center is outside.
  assert!(!canvas.is_point_in_path(12.0, 12.0));
  assert!(canvas.is_point_in_path(4.0, 12.0));
  assert!(!canvas.is_point_in_path(30.0, 30.0));
}

#[test]
fn point_in_path_rides_the_current_transform() {
  let mut canvas = Canvas::new(64, 64);
  canvas.translate(20.0, 10.0);
  canvas.begin_path();
  canvas.rectangle(0.0, 0.0, 8.0, 8.0);
  // Queries are user-space coordinates under the same transform, so the
  // rectangle is hit at its user position, not its canvas position.
  assert!(canvas.is_point_in_path(4.0, 4.0));
  assert!(!canvas.is_point_in_path(24.0, 14.0));
}

#[test]
fn point_in_path_uses_the_transform_at_query_time() {
  let mut canvas = Canvas::new(64, 64);
  canvas.translate(32.0, 32.0);
  canvas.rotate(std::f32::consts::FRAC_PI_4);
  canvas.begin_path();
  canvas.rectangle(-8.0, -8.0, 16.0, 16.0);
  assert!(canvas.is_point_in_path(0.0, 0.0));
  assert!(!canvas.is_point_in_path(20.0, 0.0));
  // Resetting the transform re-frames the query coordinates while the
  // recorded path stays where it was built on the canvas.
  canvas.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
  assert!(canvas.is_point_in_path(32.0, 32.0));
  assert!(!canvas.is_point_in_path(4.0, 4.0));
}

#[test]
fn fill_uses_non_zero_winding() {
  let mut canvas = Canvas::new(32, 32);
  canvas.set_color(BrushSlot::Fill, 0.0, 0.0, 1.0, 1.0);
  canvas.begin_path();
  canvas.rectangle(2.0, 2.0, 20.0, 20.0);
  canvas.rectangle(8.0, 8.0, 8.0, 8.0);
  canvas.fill();
  let pixels = read_pixels(&canvas);
  // Non-zero: same-winding nesting stays filled.
  assert_eq!(alpha_at(&pixels, 32, 12, 12), 255);
}

// ============================================================================
// Save / restore
// ============================================================================

fn paint_probe(canvas: &mut Canvas) {
  canvas.fill_rectangle(0.0, 0.0, 24.0, 24.0);
  canvas.begin_path();
  canvas.move_to(2.0, 20.0);
  canvas.line_to(22.0, 20.0);
  canvas.stroke();
}

fn configure(canvas: &mut Canvas) {
  canvas.translate(3.0, 1.0);
  canvas.set_color(BrushSlot::Fill, 0.2, 0.8, 0.4, 0.9);
  canvas.set_linear_gradient(BrushSlot::Stroke, 0.0, 0.0, 20.0, 0.0);
  canvas.add_color_stop(BrushSlot::Stroke, 0.0, 1.0, 0.0, 0.0, 1.0);
  canvas.add_color_stop(BrushSlot::Stroke, 1.0, 0.0, 0.0, 1.0, 1.0);
  canvas.set_line_width(3.0);
  canvas.set_line_dash(&[4.0, 2.0]);
  canvas.line_dash_offset = 1.0;
  canvas.set_global_alpha(0.8);
  canvas.set_shadow_color(0.0, 0.0, 0.0, 0.5);
  canvas.shadow_offset_x = 2.0;
  canvas.set_shadow_blur(2.0);
}

#[test]
fn restore_returns_to_saved_rendering_state() {
  // Reference canvas: configured state, straight to painting.
  let mut reference = Canvas::new(24, 24);
  configure(&mut reference);
  paint_probe(&mut reference);

  // Subject canvas: same configuration, then save, scramble, restore.
  let mut subject = Canvas::new(24, 24);
  configure(&mut subject);
  subject.save();
  subject.set_transform(2.0, 0.0, 0.0, 2.0, 5.0, 5.0);
  subject.set_color(BrushSlot::Fill, 1.0, 1.0, 0.0, 0.3);
  subject.set_color(BrushSlot::Stroke, 1.0, 0.0, 1.0, 1.0);
  subject.set_line_width(9.0);
  subject.set_line_dash(&[]);
  subject.line_dash_offset = 0.0;
  subject.set_global_alpha(0.1);
  subject.set_shadow_color(1.0, 0.0, 0.0, 1.0);
  subject.shadow_offset_x = -4.0;
  subject.set_shadow_blur(6.0);
  subject.restore();
  paint_probe(&mut subject);

  assert_eq!(read_pixels(&reference), read_pixels(&subject));
}

#[test]
fn restore_on_empty_stack_is_a_no_op() {
  let mut canvas = Canvas::new(8, 8);
  canvas.restore();
  canvas.set_color(BrushSlot::Fill, 1.0, 0.0, 0.0, 1.0);
  canvas.restore();
  canvas.fill_rectangle(0.0, 0.0, 8.0, 8.0);
  assert_eq!(alpha_at(&read_pixels(&canvas), 8, 4, 4), 255);
}

#[test]
fn save_restore_does_not_snapshot_the_path() {
  let mut canvas = Canvas::new(16, 16);
  canvas.save();
  canvas.rectangle(2.0, 2.0, 8.0, 8.0);
  canvas.restore();
  assert!(canvas.is_point_in_path(4.0, 4.0));
}

// ============================================================================
// Clipping
// ============================================================================

#[test]
fn clip_bounds_subsequent_fills() {
  let mut canvas = Canvas::new(32, 32);
  canvas.set_color(BrushSlot::Fill, 1.0, 0.0, 0.0, 1.0);
  canvas.begin_path();
  canvas.rectangle(8.0, 8.0, 8.0, 8.0);
  canvas.clip();
  canvas.fill_rectangle(0.0, 0.0, 32.0, 32.0);
  let pixels = read_pixels(&canvas);
  assert_eq!(alpha_at(&pixels, 32, 12, 12), 255);
  assert_eq!(alpha_at(&pixels, 32, 4, 12), 0);
  assert_eq!(alpha_at(&pixels, 32, 20, 12), 0);
}

#[test]
fn clips_accumulate_and_restore_pops() {
  let mut canvas = Canvas::new(32, 32);
  canvas.set_color(BrushSlot::Fill, 1.0, 1.0, 1.0, 1.0);
  canvas.save();
  canvas.begin_path();
  canvas.rectangle(0.0, 0.0, 16.0, 32.0);
  canvas.clip();
  canvas.begin_path();
  canvas.rectangle(8.0, 0.0, 24.0, 32.0);
  canvas.clip();
  canvas.fill_rectangle(0.0, 0.0, 32.0, 32.0);
  let pixels = read_pixels(&canvas);
  // Intersection is columns 8..16.
  assert_eq!(alpha_at(&pixels, 32, 12, 16), 255);
  assert_eq!(alpha_at(&pixels, 32, 4, 16), 0);
  assert_eq!(alpha_at(&pixels, 32, 20, 16), 0);

  canvas.restore();
  canvas.fill_rectangle(0.0, 0.0, 32.0, 32.0);
  let pixels = read_pixels(&canvas);
  assert_eq!(alpha_at(&pixels, 32, 4, 16), 255);
}

// ============================================================================
// Compositing
// ============================================================================

#[test]
fn source_copy_clears_outside_the_shape() {
  let mut canvas = Canvas::new(16, 16);
  canvas.set_color(BrushSlot::Fill, 0.0, 1.0, 0.0, 1.0);
  canvas.fill_rectangle(0.0, 0.0, 16.0, 16.0);
  canvas.global_composite_operation = CompositeOperation::SourceCopy;
  canvas.set_color(BrushSlot::Fill, 1.0, 0.0, 0.0, 1.0);
  canvas.fill_rectangle(4.0, 4.0, 8.0, 8.0);
  let pixels = read_pixels(&canvas);
  assert_eq!(rgba_at(&pixels, 16, 8, 8), [255, 0, 0, 255]);
  // The green outside the copied shape is wiped.
  assert_eq!(alpha_at(&pixels, 16, 1, 1), 0);
}

#[test]
fn transparent_copy_then_source_over_leaves_destination() {
  let mut canvas = Canvas::new(16, 16);
  canvas.global_composite_operation = CompositeOperation::SourceCopy;
  canvas.set_color(BrushSlot::Fill, 1.0, 1.0, 1.0, 0.0);
  canvas.fill_rectangle(0.0, 0.0, 16.0, 16.0);
  canvas.global_composite_operation = CompositeOperation::SourceOver;
  canvas.fill_rectangle(0.0, 0.0, 16.0, 16.0);
  let pixels = read_pixels(&canvas);
  assert!(pixels.iter().all(|&b| b == 0));
}

#[test]
fn destination_out_erases_under_the_shape() {
  let mut canvas = Canvas::new(16, 16);
  canvas.set_color(BrushSlot::Fill, 0.0, 0.0, 1.0, 1.0);
  canvas.fill_rectangle(0.0, 0.0, 16.0, 16.0);
  canvas.global_composite_operation = CompositeOperation::DestinationOut;
  canvas.fill_rectangle(4.0, 4.0, 8.0, 8.0);
  let pixels = read_pixels(&canvas);
  assert_eq!(alpha_at(&pixels, 16, 8, 8), 0);
  assert_eq!(alpha_at(&pixels, 16, 1, 1), 255);
}

#[test]
fn destination_in_respects_the_clip() {
  let mut canvas = Canvas::new(16, 16);
  canvas.set_color(BrushSlot::Fill, 1.0, 1.0, 1.0, 1.0);
  canvas.fill_rectangle(0.0, 0.0, 16.0, 16.0);
  // Clip to the left half, then destination_in against a small square.
  canvas.begin_path();
  canvas.rectangle(0.0, 0.0, 8.0, 16.0);
  canvas.clip();
  canvas.global_composite_operation = CompositeOperation::DestinationIn;
  canvas.fill_rectangle(2.0, 2.0, 4.0, 4.0);
  let pixels = read_pixels(&canvas);
  // Inside clip, inside shape: kept. Inside clip, outside shape: cleared.
  assert_eq!(alpha_at(&pixels, 16, 4, 4), 255);
  assert_eq!(alpha_at(&pixels, 16, 4, 12), 0);
  // Outside the clip the op never applies.
  assert_eq!(alpha_at(&pixels, 16, 12, 4), 255);
}

#[test]
fn global_alpha_scales_paint() {
  let mut canvas = Canvas::new(8, 8);
  canvas.set_color(BrushSlot::Fill, 1.0, 1.0, 1.0, 1.0);
  canvas.set_global_alpha(0.5);
  canvas.fill_rectangle(0.0, 0.0, 8.0, 8.0);
  let alpha = alpha_at(&read_pixels(&canvas), 8, 4, 4);
  assert!((alpha as i32 - 128).abs() <= 2, "alpha {alpha}");
}

#[test]
fn clear_rectangle_ignores_alpha_and_op() {
  let mut canvas = Canvas::new(16, 16);
  canvas.set_color(BrushSlot::Fill, 1.0, 0.0, 0.0, 1.0);
  canvas.fill_rectangle(0.0, 0.0, 16.0, 16.0);
  canvas.set_global_alpha(0.25);
  canvas.global_composite_operation = CompositeOperation::Lighter;
  canvas.clear_rectangle(4.0, 4.0, 8.0, 8.0);
  let pixels = read_pixels(&canvas);
  assert_eq!(alpha_at(&pixels, 16, 8, 8), 0);
  assert_eq!(alpha_at(&pixels, 16, 2, 2), 255);
}

// ============================================================================
// Area accuracy
// ============================================================================

#[test]
fn convex_fill_area_matches_geometry() {
  let mut canvas = Canvas::new(64, 64);
  canvas.set_color(BrushSlot::Fill, 1.0, 1.0, 1.0, 1.0);
  canvas.begin_path();
  canvas.arc(32.0, 32.0, 20.0, 0.0, std::f32::consts::TAU, false);
  canvas.fill();
  let pixels = read_pixels(&canvas);
  let total: f64 = (0..64 * 64)
    .map(|i| pixels[i * 4 + 3] as f64 / 255.0)
    .sum();
  let expected = std::f64::consts::PI * 20.0 * 20.0;
  let relative = (total - expected).abs() / expected;
  assert!(relative < 0.01, "area {total} vs {expected}");
}

// ============================================================================
// Shadows
// ============================================================================

#[test]
fn shadow_lands_offset_and_fades() {
  let mut canvas = Canvas::new(64, 64);
  canvas.set_color(BrushSlot::Fill, 1.0, 1.0, 1.0, 1.0);
  canvas.set_shadow_color(0.0, 0.0, 0.0, 1.0);
  canvas.shadow_offset_x = 8.0;
  canvas.set_shadow_blur(4.0);
  canvas.fill_rectangle(8.0, 24.0, 16.0, 16.0);
  let pixels = read_pixels(&canvas);

  // The shape itself covers x in 8..24 on the scanline through y=32.
  assert_eq!(alpha_at(&pixels, 64, 20, 32), 255);
  // Shadow-only region to the right of the shape.
  assert!(alpha_at(&pixels, 64, 28, 32) > 100);
  // Alpha decreases monotonically walking right from the shadow center.
  let mut previous = alpha_at(&pixels, 64, 20, 32);
  for x in 21..44 {
    let current = alpha_at(&pixels, 64, x, 32);
    assert!(current <= previous.saturating_add(1), "rise at x={x}");
    previous = current;
  }
  // Far away there is nothing.
  assert_eq!(alpha_at(&pixels, 64, 50, 32), 0);
  assert_eq!(alpha_at(&pixels, 64, 2, 32), 0);
}

#[test]
fn zero_alpha_shadow_color_disables_the_pass() {
  let mut reference = Canvas::new(32, 32);
  reference.set_color(BrushSlot::Fill, 0.5, 0.5, 0.5, 1.0);
  reference.fill_rectangle(8.0, 8.0, 8.0, 8.0);

  let mut subject = Canvas::new(32, 32);
  subject.set_color(BrushSlot::Fill, 0.5, 0.5, 0.5, 1.0);
  subject.set_shadow_color(1.0, 0.0, 0.0, 0.0);
  subject.shadow_offset_x = 5.0;
  subject.set_shadow_blur(3.0);
  subject.fill_rectangle(8.0, 8.0, 8.0, 8.0);

  assert_eq!(read_pixels(&reference), read_pixels(&subject));
}

#[test]
fn shadow_respects_clip() {
  let mut canvas = Canvas::new(64, 64);
  canvas.set_color(BrushSlot::Fill, 1.0, 1.0, 1.0, 1.0);
  canvas.begin_path();
  canvas.rectangle(0.0, 0.0, 24.0, 64.0);
  canvas.clip();
  canvas.set_shadow_color(0.0, 0.0, 0.0, 1.0);
  canvas.shadow_offset_x = 12.0;
  canvas.fill_rectangle(8.0, 24.0, 16.0, 16.0);
  let pixels = read_pixels(&canvas);
  // Shadow would land at 20..36 but the clip cuts it at 24.
  assert!(alpha_at(&pixels, 64, 22, 32) > 0);
  assert_eq!(alpha_at(&pixels, 64, 30, 32), 0);
}
