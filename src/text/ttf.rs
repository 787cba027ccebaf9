//! TrueType font parsing
//!
//! A deliberately small sfnt reader covering the tables glyph extraction
//! needs: `head`, `hhea`, `hmtx`, `maxp`, `cmap` (formats 0, 4, and 12),
//! `loca`, and `glyf` with both simple and composite glyph descriptions.
//! Nothing is cached: a `FontFace` is a validated view over the caller's
//! bytes, and every glyph is decoded on demand straight out of the table
//! data. Hinting, kerning, and every other sfnt table are ignored.
//!
//! All failure modes (truncation, missing tables, out-of-range offsets,
//! runaway composite recursion) surface as `FontError`; the text layer
//! turns any of them into "no glyph".

use crate::error::FontError;
use crate::geometry::{Point, Transform};
use crate::path::PathBuilder;

const SFNT_VERSION: u32 = 0x0001_0000;
const COMPOSITE_DEPTH_LIMIT: usize = 8;

// Simple glyph flag bits
const ON_CURVE: u8 = 0x01;
const X_SHORT: u8 = 0x02;
const Y_SHORT: u8 = 0x04;
const REPEAT: u8 = 0x08;
const X_SAME_OR_POSITIVE: u8 = 0x10;
const Y_SAME_OR_POSITIVE: u8 = 0x20;

// Composite glyph flag bits
const ARGS_ARE_WORDS: u16 = 0x0001;
const ARGS_ARE_XY_VALUES: u16 = 0x0002;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;

/// Bounds-checked big-endian reads over the raw font bytes
#[derive(Clone, Copy)]
struct Reader<'a> {
  data: &'a [u8],
}

impl<'a> Reader<'a> {
  fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8], FontError> {
    self
      .data
      .get(offset..offset + len)
      .ok_or(FontError::Truncated { offset })
  }

  fn u8(&self, offset: usize) -> Result<u8, FontError> {
    Ok(self.bytes(offset, 1)?[0])
  }

  fn u16(&self, offset: usize) -> Result<u16, FontError> {
    let b = self.bytes(offset, 2)?;
    Ok(u16::from_be_bytes([b[0], b[1]]))
  }

  fn i16(&self, offset: usize) -> Result<i16, FontError> {
    Ok(self.u16(offset)? as i16)
  }

  fn u32(&self, offset: usize) -> Result<u32, FontError> {
    let b = self.bytes(offset, 4)?;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
  }

  /// F2Dot14 fixed-point, used by composite transforms
  fn f2dot14(&self, offset: usize) -> Result<f32, FontError> {
    Ok(self.i16(offset)? as f32 / 16384.0)
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Table {
  offset: usize,
  length: usize,
}

/// A validated view over one TrueType font file
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FontFace<'a> {
  data: &'a [u8],
  glyf: Table,
  loca: Table,
  hmtx: Table,
  cmap_subtable: usize,
  cmap_format: u16,
  long_loca: bool,
  glyph_count: u16,
  hmetric_count: u16,
  pub units_per_em: f32,
  pub ascender: i16,
  pub descender: i16,
}

impl<'a> FontFace<'a> {
  /// Validates the sfnt structure and locates every required table
  pub fn parse(data: &'a [u8]) -> Result<Self, FontError> {
    let r = Reader { data };
    if r.u32(0)? != SFNT_VERSION {
      return Err(FontError::BadMagic);
    }
    let table_count = r.u16(4)? as usize;

    let find = |tag: &'static str| -> Result<Table, FontError> {
      for i in 0..table_count {
        let record = 12 + i * 16;
        if r.bytes(record, 4)? == tag.as_bytes() {
          let offset = r.u32(record + 8)? as usize;
          let length = r.u32(record + 12)? as usize;
          if offset.checked_add(length).map_or(true, |end| end > data.len()) {
            return Err(FontError::Truncated { offset });
          }
          return Ok(Table { offset, length });
        }
      }
      Err(FontError::MissingTable { table: tag })
    };

    let head = find("head")?;
    let hhea = find("hhea")?;
    let hmtx = find("hmtx")?;
    let maxp = find("maxp")?;
    let cmap = find("cmap")?;
    let glyf = find("glyf")?;
    let loca = find("loca")?;

    let units_per_em = r.u16(head.offset + 18)?;
    if units_per_em == 0 {
      return Err(FontError::Unsupported);
    }
    let long_loca = r.i16(head.offset + 50)? != 0;
    let glyph_count = r.u16(maxp.offset + 4)?;
    let ascender = r.i16(hhea.offset + 4)?;
    let descender = r.i16(hhea.offset + 6)?;
    let hmetric_count = r.u16(hhea.offset + 34)?;
    if hmetric_count == 0 || hmetric_count > glyph_count {
      return Err(FontError::Unsupported);
    }
    if hmtx.length < hmetric_count as usize * 4 {
      return Err(FontError::Truncated {
        offset: hmtx.offset,
      });
    }
    let entries = glyph_count as usize + 1;
    let needed = if long_loca { entries * 4 } else { entries * 2 };
    if loca.length < needed {
      return Err(FontError::Truncated {
        offset: loca.offset,
      });
    }

    let (cmap_subtable, cmap_format) = select_cmap_subtable(&r, cmap)?;

    Ok(Self {
      data,
      glyf,
      loca,
      hmtx,
      cmap_subtable,
      cmap_format,
      long_loca,
      glyph_count,
      hmetric_count,
      units_per_em: units_per_em as f32,
      ascender,
      descender,
    })
  }

  fn reader(&self) -> Reader<'a> {
    Reader { data: self.data }
  }

  /// Maps a code point to a glyph index; unmapped code points land on the
  /// missing-glyph index 0
  pub fn glyph_index(&self, code_point: u32) -> u16 {
    self.lookup_glyph(code_point).unwrap_or(0)
  }

  fn lookup_glyph(&self, code_point: u32) -> Option<u16> {
    let r = self.reader();
    let base = self.cmap_subtable;
    match self.cmap_format {
      0 => {
        if code_point > 0xFF {
          return None;
        }
        r.u8(base + 6 + code_point as usize).ok().map(u16::from)
      }
      4 => {
        if code_point > 0xFFFF {
          return None;
        }
        let c = code_point as u16;
        let seg_count = (r.u16(base + 6).ok()? / 2) as usize;
        let ends = base + 14;
        let starts = ends + seg_count * 2 + 2;
        let deltas = starts + seg_count * 2;
        let range_offsets = deltas + seg_count * 2;
        for seg in 0..seg_count {
          let end = r.u16(ends + seg * 2).ok()?;
          if c > end {
            continue;
          }
          let start = r.u16(starts + seg * 2).ok()?;
          if c < start {
            return None;
          }
          let delta = r.u16(deltas + seg * 2).ok()?;
          let range_offset = r.u16(range_offsets + seg * 2).ok()?;
          if range_offset == 0 {
            return Some(c.wrapping_add(delta));
          }
          let index_offset =
            range_offsets + seg * 2 + range_offset as usize + (c - start) as usize * 2;
          let glyph = r.u16(index_offset).ok()?;
          if glyph == 0 {
            return None;
          }
          return Some(glyph.wrapping_add(delta));
        }
        None
      }
      12 => {
        let group_count = r.u32(base + 12).ok()? as usize;
        for group in 0..group_count {
          let record = base + 16 + group * 12;
          let start = r.u32(record).ok()?;
          let end = r.u32(record + 4).ok()?;
          if code_point < start {
            return None;
          }
          if code_point <= end {
            let first = r.u32(record + 8).ok()?;
            return u16::try_from(first + (code_point - start)).ok();
          }
        }
        None
      }
      _ => None,
    }
  }

  /// Advance width in font units
  ///
  /// Fonts may carry fewer metrics than glyphs; the last advance is
  /// replicated for everything past the end of the table.
  pub fn advance_width(&self, glyph: u16) -> u16 {
    let metric = glyph.min(self.hmetric_count - 1) as usize;
    self
      .reader()
      .u16(self.hmtx.offset + metric * 4)
      .unwrap_or(0)
  }

  /// Emits the glyph outline into `builder` under `transform`
  ///
  /// The transform maps font units to the destination space; contours come
  /// out as move/quadratic/line/close commands and flatten on the way in.
  pub fn emit_glyph(
    &self,
    glyph: u16,
    transform: &Transform,
    builder: &mut PathBuilder,
  ) -> Result<(), FontError> {
    self.emit_glyph_at_depth(glyph, transform, builder, 0)
  }

  fn glyph_data(&self, glyph: u16) -> Result<Option<&'a [u8]>, FontError> {
    if glyph >= self.glyph_count {
      return Err(FontError::BadGlyph { glyph });
    }
    let r = self.reader();
    let index = glyph as usize;
    let (start, end) = if self.long_loca {
      (
        r.u32(self.loca.offset + index * 4)? as usize,
        r.u32(self.loca.offset + index * 4 + 4)? as usize,
      )
    } else {
      (
        r.u16(self.loca.offset + index * 2)? as usize * 2,
        r.u16(self.loca.offset + index * 2 + 2)? as usize * 2,
      )
    };
    if start == end {
      return Ok(None);
    }
    if start > end || end > self.glyf.length {
      return Err(FontError::BadGlyph { glyph });
    }
    Ok(Some(
      &self.data[self.glyf.offset + start..self.glyf.offset + end],
    ))
  }

  fn emit_glyph_at_depth(
    &self,
    glyph: u16,
    transform: &Transform,
    builder: &mut PathBuilder,
    depth: usize,
  ) -> Result<(), FontError> {
    if depth > COMPOSITE_DEPTH_LIMIT {
      return Err(FontError::CompositeTooDeep);
    }
    let Some(data) = self.glyph_data(glyph)? else {
      return Ok(());
    };
    let r = Reader { data };
    let contour_count = r.i16(0)?;
    if contour_count >= 0 {
      self.emit_simple_glyph(&r, contour_count as usize, transform, builder)
    } else {
      self.emit_composite_glyph(&r, transform, builder, depth)
    }
  }

  fn emit_simple_glyph(
    &self,
    r: &Reader,
    contour_count: usize,
    transform: &Transform,
    builder: &mut PathBuilder,
  ) -> Result<(), FontError> {
    // Header: contour count plus bounding box.
    let mut offset = 10;
    let mut contour_ends = Vec::with_capacity(contour_count);
    for _ in 0..contour_count {
      contour_ends.push(r.u16(offset)?);
      offset += 2;
    }
    let point_count = match contour_ends.last() {
      Some(&last) => last as usize + 1,
      None => return Ok(()),
    };
    // Hinting instructions sit between the header and the point data.
    let instruction_length = r.u16(offset)? as usize;
    offset += 2 + instruction_length;

    // Flags, compacted with the repeat bit.
    let mut flags = Vec::with_capacity(point_count);
    while flags.len() < point_count {
      let flag = r.u8(offset)?;
      offset += 1;
      flags.push(flag);
      if flag & REPEAT != 0 {
        let count = r.u8(offset)?;
        offset += 1;
        for _ in 0..count {
          if flags.len() < point_count {
            flags.push(flag);
          }
        }
      }
    }

    // Per-axis deltas: short (u8 with sign flag), same-as-previous, or i16.
    let mut points = Vec::with_capacity(point_count);
    let mut x = 0i32;
    for &flag in &flags {
      if flag & X_SHORT != 0 {
        let delta = r.u8(offset)? as i32;
        offset += 1;
        x += if flag & X_SAME_OR_POSITIVE != 0 {
          delta
        } else {
          -delta
        };
      } else if flag & X_SAME_OR_POSITIVE == 0 {
        x += r.i16(offset)? as i32;
        offset += 2;
      }
      points.push(GlyphPoint {
        position: Point::new(x as f32, 0.0),
        on_curve: flag & ON_CURVE != 0,
      });
    }
    let mut y = 0i32;
    for (i, &flag) in flags.iter().enumerate() {
      if flag & Y_SHORT != 0 {
        let delta = r.u8(offset)? as i32;
        offset += 1;
        y += if flag & Y_SAME_OR_POSITIVE != 0 {
          delta
        } else {
          -delta
        };
      } else if flag & Y_SAME_OR_POSITIVE == 0 {
        y += r.i16(offset)? as i32;
        offset += 2;
      }
      points[i].position.y = y as f32;
    }

    let mut start = 0usize;
    for &end in &contour_ends {
      let end = end as usize;
      if end < start || end >= point_count {
        return Err(FontError::Unsupported);
      }
      emit_contour(&points[start..=end], transform, builder);
      start = end + 1;
    }
    Ok(())
  }

  fn emit_composite_glyph(
    &self,
    r: &Reader,
    transform: &Transform,
    builder: &mut PathBuilder,
    depth: usize,
  ) -> Result<(), FontError> {
    // Header: -1 contour count plus bounding box.
    let mut offset = 10;
    loop {
      let flags = r.u16(offset)?;
      let component = r.u16(offset + 2)?;
      offset += 4;

      let (dx, dy) = if flags & ARGS_ARE_WORDS != 0 {
        let dx = r.i16(offset)?;
        let dy = r.i16(offset + 2)?;
        offset += 4;
        (dx as f32, dy as f32)
      } else {
        let dx = r.u8(offset)? as i8;
        let dy = r.u8(offset + 1)? as i8;
        offset += 2;
        (dx as f32, dy as f32)
      };
      if flags & ARGS_ARE_XY_VALUES == 0 {
        // Point-matching placement is outside the supported subset.
        return Err(FontError::Unsupported);
      }

      let (a, b, c, d) = if flags & WE_HAVE_A_SCALE != 0 {
        let s = r.f2dot14(offset)?;
        offset += 2;
        (s, 0.0, 0.0, s)
      } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
        let sx = r.f2dot14(offset)?;
        let sy = r.f2dot14(offset + 2)?;
        offset += 4;
        (sx, 0.0, 0.0, sy)
      } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
        let a = r.f2dot14(offset)?;
        let b = r.f2dot14(offset + 2)?;
        let c = r.f2dot14(offset + 4)?;
        let d = r.f2dot14(offset + 6)?;
        offset += 8;
        (a, b, c, d)
      } else {
        (1.0, 0.0, 0.0, 1.0)
      };

      let component_transform = transform.then(&Transform::new(a, b, c, d, dx, dy));
      self.emit_glyph_at_depth(component, &component_transform, builder, depth + 1)?;

      if flags & MORE_COMPONENTS == 0 {
        return Ok(());
      }
    }
  }
}

#[derive(Debug, Clone, Copy)]
struct GlyphPoint {
  position: Point,
  on_curve: bool,
}

/// Walks one contour's quadratic B-spline, inserting the implicit on-curve
/// midpoints between consecutive control points
fn emit_contour(points: &[GlyphPoint], transform: &Transform, builder: &mut PathBuilder) {
  if points.len() < 2 {
    return;
  }
  let count = points.len();
  let (start, first_index) = match points.iter().position(|p| p.on_curve) {
    Some(i) => (points[i].position, i + 1),
    // Every point off-curve: open on the midpoint of the closing pair.
    None => (
      points[count - 1].position.lerp(points[0].position, 0.5),
      0,
    ),
  };

  builder.move_to(start, transform);
  let mut control: Option<Point> = None;
  for k in 0..count {
    let point = points[(first_index + k) % count];
    if point.on_curve {
      match control.take() {
        None => builder.line_to(point.position, transform),
        Some(c) => builder.quadratic_to(c, point.position, transform),
      }
    } else {
      if let Some(c) = control.replace(point.position) {
        let implicit = c.lerp(point.position, 0.5);
        builder.quadratic_to(c, implicit, transform);
      }
    }
  }
  match control {
    None => {}
    Some(c) => builder.quadratic_to(c, start, transform),
  }
  builder.close();
}

/// Picks the most capable supported cmap subtable: 12 over 4 over 0
fn select_cmap_subtable(r: &Reader, cmap: Table) -> Result<(usize, u16), FontError> {
  let subtable_count = r.u16(cmap.offset + 2)? as usize;
  let mut best: Option<(usize, u16)> = None;
  for i in 0..subtable_count {
    let record = cmap.offset + 4 + i * 8;
    let offset = cmap.offset + r.u32(record + 4)? as usize;
    let Ok(format) = r.u16(offset) else {
      continue;
    };
    let rank = match format {
      12 => 3,
      4 => 2,
      0 => 1,
      _ => 0,
    };
    if rank == 0 {
      continue;
    }
    let best_rank = best.map_or(0, |(_, f)| match f {
      12 => 3,
      4 => 2,
      _ => 1,
    });
    if rank > best_rank {
      best = Some((offset, format));
    }
  }
  best.ok_or(FontError::NoCharacterMap)
}
