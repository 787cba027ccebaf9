//! Shared helpers for the integration suites
//!
//! The interesting part is `build_test_font`: a handwritten TrueType file
//! small enough to audit byte by byte, with enough structure to exercise
//! the glyph extractor end to end. It carries:
//!
//! - glyph 0: empty `.notdef`
//! - glyph 1, mapped from 'A': a 500x700 filled square
//! - glyph 2, mapped from 'B': a 300x300 filled square
//! - glyph 3, mapped from 'C': a composite referencing glyph 1 shifted
//!   right by 100 font units
//! - a format-4 `cmap` with a real segment plus the 0xFFFF terminator
//! - three `hmtx` entries for four glyphs, so the last advance replicates
//!
//! Em square is 1000 units, ascender 800, descender -200.

#![allow(dead_code)]

use fastcanvas::Canvas;

pub const FONT_UPEM: f32 = 1000.0;
pub const FONT_ASCENDER: f32 = 800.0;
pub const ADVANCE_NOTDEF: f32 = 600.0;
pub const ADVANCE_A: f32 = 700.0;
pub const ADVANCE_B: f32 = 500.0;

fn push_u16(out: &mut Vec<u8>, value: u16) {
  out.extend_from_slice(&value.to_be_bytes());
}

fn push_i16(out: &mut Vec<u8>, value: i16) {
  out.extend_from_slice(&value.to_be_bytes());
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
  out.extend_from_slice(&value.to_be_bytes());
}

fn head_table() -> Vec<u8> {
  let mut t = Vec::new();
  push_u32(&mut t, 0x0001_0000); // version
  push_u32(&mut t, 0x0001_0000); // revision
  push_u32(&mut t, 0); // checksum adjustment
  push_u32(&mut t, 0x5F0F_3CF5); // magic
  push_u16(&mut t, 0); // flags
  push_u16(&mut t, FONT_UPEM as u16); // unitsPerEm
  t.extend_from_slice(&[0; 16]); // created + modified
  push_i16(&mut t, 0); // xMin
  push_i16(&mut t, -200); // yMin
  push_i16(&mut t, 700); // xMax
  push_i16(&mut t, 800); // yMax
  push_u16(&mut t, 0); // macStyle
  push_u16(&mut t, 8); // lowestRecPPEM
  push_i16(&mut t, 2); // fontDirectionHint
  push_i16(&mut t, 0); // indexToLocFormat: short
  push_i16(&mut t, 0); // glyphDataFormat
  t
}

fn hhea_table(metric_count: u16) -> Vec<u8> {
  let mut t = Vec::new();
  push_u32(&mut t, 0x0001_0000);
  push_i16(&mut t, FONT_ASCENDER as i16);
  push_i16(&mut t, -200);
  push_i16(&mut t, 0); // lineGap
  push_u16(&mut t, 700); // advanceWidthMax
  push_i16(&mut t, 0); // minLeftSideBearing
  push_i16(&mut t, 0); // minRightSideBearing
  push_i16(&mut t, 700); // xMaxExtent
  push_i16(&mut t, 1); // caretSlopeRise
  push_i16(&mut t, 0); // caretSlopeRun
  push_i16(&mut t, 0); // caretOffset
  t.extend_from_slice(&[0; 8]); // reserved
  push_i16(&mut t, 0); // metricDataFormat
  push_u16(&mut t, metric_count);
  t
}

fn maxp_table() -> Vec<u8> {
  let mut t = Vec::new();
  push_u32(&mut t, 0x0001_0000);
  push_u16(&mut t, 4); // numGlyphs
  t.resize(32, 0);
  t
}

fn hmtx_table() -> Vec<u8> {
  let mut t = Vec::new();
  for (advance, lsb) in [
    (ADVANCE_NOTDEF as u16, 0i16),
    (ADVANCE_A as u16, 100),
    (ADVANCE_B as u16, 100),
  ] {
    push_u16(&mut t, advance);
    push_i16(&mut t, lsb);
  }
  push_i16(&mut t, 100); // left side bearing for glyph 3
  t
}

fn cmap_table() -> Vec<u8> {
  let mut t = Vec::new();
  push_u16(&mut t, 0); // version
  push_u16(&mut t, 1); // one encoding record
  push_u16(&mut t, 3); // platform: windows
  push_u16(&mut t, 1); // encoding: unicode bmp
  push_u32(&mut t, 12); // subtable offset

  // Format 4, segments ['A'..'C'] -> glyphs 1..3 and the terminator.
  push_u16(&mut t, 4); // format
  push_u16(&mut t, 32); // length
  push_u16(&mut t, 0); // language
  push_u16(&mut t, 4); // segCountX2
  push_u16(&mut t, 4); // searchRange
  push_u16(&mut t, 1); // entrySelector
  push_u16(&mut t, 0); // rangeShift
  push_u16(&mut t, 'C' as u16); // end codes
  push_u16(&mut t, 0xFFFF);
  push_u16(&mut t, 0); // reserved pad
  push_u16(&mut t, 'A' as u16); // start codes
  push_u16(&mut t, 0xFFFF);
  push_i16(&mut t, 1 - 'A' as i16); // idDelta
  push_i16(&mut t, 1);
  push_u16(&mut t, 0); // idRangeOffsets
  push_u16(&mut t, 0);
  t
}

/// A one-contour axis-aligned square, all points on-curve
fn square_glyph(x0: i16, y0: i16, x1: i16, y1: i16) -> Vec<u8> {
  let mut g = Vec::new();
  push_i16(&mut g, 1); // contour count
  push_i16(&mut g, x0);
  push_i16(&mut g, y0);
  push_i16(&mut g, x1);
  push_i16(&mut g, y1);
  push_u16(&mut g, 3); // last point index
  push_u16(&mut g, 0); // no instructions
  g.extend_from_slice(&[0x01; 4]); // on-curve, full deltas
  for dx in [x0, x1 - x0, 0, x0 - x1] {
    push_i16(&mut g, dx);
  }
  for dy in [y0, 0, y1 - y0, 0] {
    push_i16(&mut g, dy);
  }
  g
}

/// A composite glyph: one component with a word offset, no scale
fn composite_glyph(component: u16, dx: i16, dy: i16) -> Vec<u8> {
  let mut g = Vec::new();
  push_i16(&mut g, -1);
  push_i16(&mut g, 200);
  push_i16(&mut g, 0);
  push_i16(&mut g, 700);
  push_i16(&mut g, 700);
  push_u16(&mut g, 0x0003); // words + xy values, no more components
  push_u16(&mut g, component);
  push_i16(&mut g, dx);
  push_i16(&mut g, dy);
  g
}

/// Builds the complete font file
pub fn build_test_font() -> Vec<u8> {
  let glyphs = [
    Vec::new(),
    square_glyph(100, 0, 600, 700),
    square_glyph(100, 0, 400, 300),
    composite_glyph(1, 100, 0),
  ];
  let mut glyf = Vec::new();
  let mut loca = Vec::new();
  push_u16(&mut loca, 0);
  for glyph in &glyphs {
    glyf.extend_from_slice(glyph);
    push_u16(&mut loca, (glyf.len() / 2) as u16);
  }

  let tables: [(&[u8; 4], Vec<u8>); 7] = [
    (b"cmap", cmap_table()),
    (b"glyf", glyf),
    (b"head", head_table()),
    (b"hhea", hhea_table(3)),
    (b"hmtx", hmtx_table()),
    (b"loca", loca),
    (b"maxp", maxp_table()),
  ];

  let mut font = Vec::new();
  push_u32(&mut font, 0x0001_0000); // sfnt version
  push_u16(&mut font, tables.len() as u16);
  push_u16(&mut font, 64); // searchRange
  push_u16(&mut font, 2); // entrySelector
  push_u16(&mut font, 48); // rangeShift

  let mut offset = 12 + tables.len() * 16;
  for (tag, data) in &tables {
    font.extend_from_slice(*tag);
    push_u32(&mut font, 0); // checksum, unchecked
    push_u32(&mut font, offset as u32);
    push_u32(&mut font, data.len() as u32);
    offset += data.len();
  }
  for (_, data) in &tables {
    font.extend_from_slice(data);
  }
  font
}

/// Reads the full canvas back as straight sRGB8
pub fn read_pixels(canvas: &Canvas) -> Vec<u8> {
  let width = canvas.width() as usize;
  let height = canvas.height() as usize;
  let mut out = vec![0u8; width * height * 4];
  canvas.get_image_data(&mut out, width, height, width * 4, 0, 0);
  out
}

/// One RGBA pixel out of a `read_pixels` buffer
pub fn rgba_at(data: &[u8], width: usize, x: usize, y: usize) -> [u8; 4] {
  let i = (y * width + x) * 4;
  [data[i], data[i + 1], data[i + 2], data[i + 3]]
}

/// Alpha channel only
pub fn alpha_at(data: &[u8], width: usize, x: usize, y: usize) -> u8 {
  rgba_at(data, width, x, y)[3]
}
