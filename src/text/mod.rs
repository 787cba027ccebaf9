//! Text layout on top of the glyph extractor
//!
//! Layout is deliberately simple: accumulate advance widths left to right,
//! resolve the alignment and baseline origin, then emit each glyph outline
//! through the shared path machinery. There is no shaping, kerning, or bidi;
//! the canvas direction is treated as left-to-right, which makes `Start`
//! equal to `Leftward` and `Ending` equal to `Rightward`.
//!
//! Every font failure degrades the same way: `measure` returns zero and
//! path building emits nothing.

pub mod ttf;

use crate::geometry::Transform;
use crate::path::PathBuilder;
use ttf::FontFace;

/// Horizontal anchoring of a text run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
  /// Anchor at the left edge
  Leftward,
  /// Anchor at the right edge
  Rightward,
  /// Anchor at the center
  Center,
  /// Line-start edge; left, since layout is left-to-right
  #[default]
  Start,
  /// Line-end edge; right, since layout is left-to-right
  Ending,
}

/// Vertical anchoring of a text run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextBaseline {
  /// The latin baseline glyphs sit on
  #[default]
  Alphabetic,
  /// Top of the em box
  Top,
  /// Midpoint of the em box
  Middle,
  /// Bottom of the em box
  Bottom,
  /// Hanging baseline, near the top of the em box
  Hanging,
  /// Ideographic baseline, at the bottom of the em box
  Ideographic,
}

/// Total advance of `text` in user units, or zero for unusable fonts
pub(crate) fn measure(font_data: &[u8], size: f32, text: &str) -> f32 {
  let Ok(face) = FontFace::parse(font_data) else {
    return 0.0;
  };
  let scale = size / face.units_per_em;
  text
    .chars()
    .map(|ch| face.advance_width(face.glyph_index(ch as u32)) as f32 * scale)
    .sum()
}

/// Lays out `text` and emits every glyph outline into `builder`
///
/// The outlines land in device space under `canvas_transform`. A `max_width`
/// that the natural advance exceeds squeezes the run horizontally; a
/// non-positive `max_width` suppresses the run entirely.
#[allow(clippy::too_many_arguments)]
pub(crate) fn build_text_path(
  font_data: &[u8],
  size: f32,
  text: &str,
  x: f32,
  y: f32,
  max_width: Option<f32>,
  align: TextAlign,
  baseline: TextBaseline,
  canvas_transform: &Transform,
  builder: &mut PathBuilder,
) {
  let Ok(face) = FontFace::parse(font_data) else {
    return;
  };
  let scale = size / face.units_per_em;

  let total: f32 = text
    .chars()
    .map(|ch| face.advance_width(face.glyph_index(ch as u32)) as f32 * scale)
    .sum();

  let squeeze = match max_width {
    Some(limit) if !(limit > 0.0) => return,
    Some(limit) if total > limit => limit / total,
    _ => 1.0,
  };

  let squeezed_total = total * squeeze;
  let origin = match align {
    TextAlign::Leftward | TextAlign::Start => x,
    TextAlign::Center => x - squeezed_total * 0.5,
    TextAlign::Rightward | TextAlign::Ending => x - squeezed_total,
  };
  let baseline_y = y + baseline_shift(baseline, face.ascender, face.descender, scale);

  let mut pen_x = origin;
  for ch in text.chars() {
    let glyph = face.glyph_index(ch as u32);
    let placement = canvas_transform
      .then(&Transform::translation(pen_x, baseline_y))
      .then(&Transform::scaling(scale * squeeze, -scale));
    // A glyph that fails to extract is skipped; its advance still counts.
    let _ = face.emit_glyph(glyph, &placement, builder);
    pen_x += face.advance_width(glyph) as f32 * scale * squeeze;
  }
}

/// Offset from the requested `y` down to the alphabetic baseline
fn baseline_shift(baseline: TextBaseline, ascender: i16, descender: i16, scale: f32) -> f32 {
  let ascent = ascender as f32 * scale;
  let descent = descender as f32 * scale;
  match baseline {
    TextBaseline::Alphabetic => 0.0,
    TextBaseline::Top => ascent,
    TextBaseline::Hanging => ascent * 0.8,
    TextBaseline::Middle => (ascent + descent) * 0.5,
    TextBaseline::Bottom | TextBaseline::Ideographic => descent,
  }
}

/// One selected font: owned bytes plus the requested size
#[derive(Debug, Clone)]
pub(crate) struct SelectedFont {
  pub data: Vec<u8>,
  pub size: f32,
}
