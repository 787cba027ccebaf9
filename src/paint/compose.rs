//! Porter-Duff compositing
//!
//! Every operator is a linear combination `S * fs + D * fd` on linear
//! premultiplied color, with the coefficients drawn from the classic
//! Porter-Duff table plus the WHATWG `lighter` extension. Source colors
//! arrive already multiplied by coverage and global alpha.

use crate::color::Rgba;

/// Compositing operator selecting how source paint combines with the
/// destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeOperation {
  /// S + D * (1 - Sa)
  #[default]
  SourceOver,
  /// D + S * (1 - Da)
  DestinationOver,
  /// S * Da
  SourceIn,
  /// D * Sa
  DestinationIn,
  /// S * (1 - Da)
  SourceOut,
  /// D * (1 - Sa)
  DestinationOut,
  /// S * Da + D * (1 - Sa)
  SourceAtop,
  /// D * Sa + S * (1 - Da)
  DestinationAtop,
  /// S + D
  Lighter,
  /// S
  SourceCopy,
  /// S * (1 - Da) + D * (1 - Sa)
  ExclusiveOr,
}

impl CompositeOperation {
  /// The (source, destination) blend factors for the given alphas
  #[inline]
  fn factors(self, source_alpha: f32, dest_alpha: f32) -> (f32, f32) {
    match self {
      CompositeOperation::SourceOver => (1.0, 1.0 - source_alpha),
      CompositeOperation::DestinationOver => (1.0 - dest_alpha, 1.0),
      CompositeOperation::SourceIn => (dest_alpha, 0.0),
      CompositeOperation::DestinationIn => (0.0, source_alpha),
      CompositeOperation::SourceOut => (1.0 - dest_alpha, 0.0),
      CompositeOperation::DestinationOut => (0.0, 1.0 - source_alpha),
      CompositeOperation::SourceAtop => (dest_alpha, 1.0 - source_alpha),
      CompositeOperation::DestinationAtop => (1.0 - dest_alpha, source_alpha),
      CompositeOperation::Lighter => (1.0, 1.0),
      CompositeOperation::SourceCopy => (1.0, 0.0),
      CompositeOperation::ExclusiveOr => (1.0 - dest_alpha, 1.0 - source_alpha),
    }
  }

  /// Blends a source color into a destination color
  #[inline]
  pub(crate) fn blend(self, source: Rgba, dest: Rgba) -> Rgba {
    let (fs, fd) = self.factors(source.a, dest.a);
    (source * fs + dest * fd).clamped()
  }

  /// Whether a transparent source leaves the destination untouched
  ///
  /// Bounded operators only need to visit covered pixels; the others
  /// rewrite the destination across the whole clip region even where the
  /// shape contributes nothing.
  #[inline]
  pub(crate) fn is_bounded(self) -> bool {
    !matches!(
      self,
      CompositeOperation::SourceIn
        | CompositeOperation::DestinationIn
        | CompositeOperation::SourceOut
        | CompositeOperation::DestinationAtop
        | CompositeOperation::SourceCopy
    )
  }
}
