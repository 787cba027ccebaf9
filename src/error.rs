//! Error types for font parsing
//!
//! The public canvas API is total and never surfaces errors; these types
//! exist so the TrueType parser can report precisely why a font or glyph is
//! unusable, and the text pipeline degrades every failure to "no glyph".

use thiserror::Error;

/// Why a font file or glyph could not be used
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub(crate) enum FontError {
  /// A read ran past the end of the font data
  #[error("font data truncated at offset {offset}")]
  Truncated { offset: usize },

  /// The leading sfnt version is not the TrueType magic
  #[error("not a TrueType font (bad sfnt version)")]
  BadMagic,

  /// One of the required tables is absent
  #[error("required table '{table}' is missing")]
  MissingTable { table: &'static str },

  /// No cmap subtable in a supported format
  #[error("no usable character map subtable")]
  NoCharacterMap,

  /// A glyph index or loca offset points outside its table
  #[error("glyph {glyph} has no valid outline data")]
  BadGlyph { glyph: u16 },

  /// Composite glyphs nested past the recursion limit
  #[error("composite glyph nesting exceeds depth limit")]
  CompositeTooDeep,

  /// A glyph uses a feature outside the supported TrueType subset
  #[error("unsupported glyph description")]
  Unsupported,
}
