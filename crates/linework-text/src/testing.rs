//! Deterministic font for tests.
//!
//! Every ASCII graphic character maps to the same rectangular outline with a
//! fixed advance, so layout results are exactly predictable. Kerning pairs
//! can be added per test.

use crate::{CharPath, Font, GlyphBounds, PathCommand};
use ahash::AHashMap;
use glam::DVec2;

/// Advance of every stub glyph, at nominal size 1.
pub const STUB_ADVANCE: f64 = 0.6;
/// Advance of the stub space.
pub const STUB_SPACE_ADVANCE: f64 = 0.3;
/// Width of the rectangular stub outline.
pub const STUB_GLYPH_WIDTH: f64 = 0.5;
/// Height of the rectangular stub outline.
pub const STUB_GLYPH_HEIGHT: f64 = 0.7;

/// A monospace-ish font with rectangular glyphs.
#[derive(Debug, Default)]
pub struct StubFont {
    kerning: AHashMap<(char, char), f64>,
}

impl StubFont {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a kerning pair.
    pub fn with_kerning(mut self, first: char, second: char, adjustment: f64) -> Self {
        self.kerning.insert((first, second), adjustment);
        self
    }
}

impl Font for StubFont {
    fn name(&self) -> &str {
        "stub"
    }

    fn has_char(&self, c: char) -> bool {
        c == ' ' || c.is_ascii_graphic()
    }

    fn char_path(&self, c: char) -> Option<CharPath> {
        if c == ' ' {
            return Some(CharPath {
                advance: STUB_SPACE_ADVANCE,
                bounds: GlyphBounds::default(),
                commands: Vec::new(),
            });
        }
        if !c.is_ascii_graphic() {
            return None;
        }
        Some(CharPath {
            advance: STUB_ADVANCE,
            bounds: GlyphBounds {
                x_min: 0.0,
                x_max: STUB_GLYPH_WIDTH,
                y_min: 0.0,
                y_max: STUB_GLYPH_HEIGHT,
            },
            commands: vec![
                PathCommand::MoveTo(DVec2::new(0.0, 0.0)),
                PathCommand::LineTo(DVec2::new(STUB_GLYPH_WIDTH, 0.0)),
                PathCommand::LineTo(DVec2::new(STUB_GLYPH_WIDTH, STUB_GLYPH_HEIGHT)),
                PathCommand::LineTo(DVec2::new(0.0, STUB_GLYPH_HEIGHT)),
                PathCommand::Close,
            ],
        })
    }

    fn kerning(&self, first: char, second: char) -> f64 {
        self.kerning.get(&(first, second)).copied().unwrap_or(0.0)
    }
}
