//! Abstract font interface.
//!
//! The engine does not parse font files. A font provider (an external
//! collaborator) implements [`Font`], delivering glyph outlines at nominal
//! size 1 with the glyph origin on the baseline. Advances and kerning are in
//! the same units, so multiplying by the text height yields drawing units.

use glam::DVec2;

/// One outline path command. Curves are emitted by the provider and
/// flattened during triangulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(DVec2),
    LineTo(DVec2),
    QuadTo { control: DVec2, to: DVec2 },
    CubicTo { control1: DVec2, control2: DVec2, to: DVec2 },
    Close,
}

/// Glyph extents at nominal size 1, relative to the glyph origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl GlyphBounds {
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

/// A glyph outline with metrics.
///
/// Outer contours wind counter-clockwise, holes clockwise; the triangulator
/// relies on this for hole handling.
#[derive(Debug, Clone)]
pub struct CharPath {
    pub advance: f64,
    pub bounds: GlyphBounds,
    pub commands: Vec<PathCommand>,
}

/// The font contract the engine consumes.
pub trait Font {
    /// Identifying name, used in diagnostics only.
    fn name(&self) -> &str;

    /// Whether the font can provide a glyph for `c`.
    fn has_char(&self, c: char) -> bool;

    /// The glyph outline for `c`, or `None` when the font lacks it.
    fn char_path(&self, c: char) -> Option<CharPath>;

    /// Kerning adjustment between two characters, at nominal size 1.
    fn kerning(&self, _first: char, _second: char) -> f64 {
        0.0
    }
}
