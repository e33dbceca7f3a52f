//! Lazy glyph cache.
//!
//! Glyphs are triangulated on first use, taking the first font in the list
//! that has the character. When no font can provide a glyph, the configured
//! fallback characters stand in and the missing-glyph flag latches; the flag
//! is surfaced at scene level after the build.

use crate::{Font, GlyphBounds, triangulate_glyph};
use ahash::AHashMap;
use glam::DVec2;
use std::sync::Arc;

/// Default fallback characters, tried in order.
pub const DEFAULT_FALLBACK: &str = "\u{FFFD}?";

/// A triangulated glyph ready for placement.
#[derive(Debug, Clone)]
pub struct CachedGlyph {
    /// Index of the providing font in the cache's font list.
    pub font_index: usize,
    pub vertices: Vec<DVec2>,
    pub indices: Vec<u32>,
    pub advance: f64,
    pub bounds: GlyphBounds,
}

/// Character → triangulated glyph cache over an ordered font list.
pub struct GlyphCache {
    fonts: Vec<Box<dyn Font>>,
    glyphs: AHashMap<char, Option<Arc<CachedGlyph>>>,
    fallback: Vec<char>,
    curve_subdivision: u32,
    missing: bool,
}

impl GlyphCache {
    pub fn new(fonts: Vec<Box<dyn Font>>, fallback: &str, curve_subdivision: u32) -> Self {
        Self {
            fonts,
            glyphs: AHashMap::with_capacity(128),
            fallback: fallback.chars().collect(),
            curve_subdivision,
            missing: false,
        }
    }

    /// Number of registered fonts.
    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    /// Whether any requested glyph could not be resolved, even via fallback.
    pub fn has_missing_chars(&self) -> bool {
        self.missing
    }

    /// Kerning between two characters, when one font provided both glyphs.
    pub fn kerning(&mut self, first: char, second: char) -> f64 {
        let Some(a) = self.get(first) else { return 0.0 };
        let font_index = a.font_index;
        let Some(b) = self.get(second) else { return 0.0 };
        if b.font_index != font_index {
            return 0.0;
        }
        self.fonts[font_index].kerning(first, second)
    }

    /// Resolve a character, triangulating and caching on first use.
    ///
    /// Returns `None` for characters no font (nor fallback) can provide.
    pub fn get(&mut self, c: char) -> Option<Arc<CachedGlyph>> {
        if let Some(entry) = self.glyphs.get(&c) {
            return entry.clone();
        }

        let mut resolved = self.build(c);
        if resolved.is_none() {
            self.missing = true;
            tracing::warn!(character = %c.escape_default(), "No font provides glyph");
            // Substitute the first available fallback character. The marker
            // entry breaks the cycle when a fallback char is itself missing.
            self.glyphs.insert(c, None);
            let fallback = self.fallback.clone();
            for fallback_char in fallback {
                if fallback_char == c {
                    continue;
                }
                if let Some(glyph) = self.get(fallback_char) {
                    resolved = Some(glyph);
                    break;
                }
            }
        }
        self.glyphs.insert(c, resolved.clone());
        resolved
    }

    /// Resolve every character of a string, latching misses.
    pub fn warm(&mut self, text: &str) {
        for c in text.chars() {
            if !c.is_control() {
                self.get(c);
            }
        }
    }

    fn build(&mut self, c: char) -> Option<Arc<CachedGlyph>> {
        // Spaces have no outline but still advance the pen.
        for (font_index, font) in self.fonts.iter().enumerate() {
            if !font.has_char(c) {
                continue;
            }
            let Some(path) = font.char_path(c) else {
                continue;
            };
            let mesh = triangulate_glyph(&path, self.curve_subdivision);
            return Some(Arc::new(CachedGlyph {
                font_index,
                vertices: mesh.vertices,
                indices: mesh.indices,
                advance: path.advance,
                bounds: path.bounds,
            }));
        }
        None
    }
}

impl std::fmt::Debug for GlyphCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphCache")
            .field("fonts", &self.fonts.len())
            .field("cached", &self.glyphs.len())
            .field("missing", &self.missing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubFont;

    fn cache() -> GlyphCache {
        GlyphCache::new(vec![Box::new(StubFont::new())], DEFAULT_FALLBACK, 2)
    }

    #[test]
    fn test_resolves_known_char() {
        let mut cache = cache();
        let glyph = cache.get('A').unwrap();
        assert!(!glyph.vertices.is_empty());
        assert!(glyph.advance > 0.0);
        assert!(!cache.has_missing_chars());
    }

    #[test]
    fn test_missing_char_latches_flag() {
        let mut cache = cache();
        // StubFont only covers ASCII graphics; '€' resolves via the '?' fallback.
        let glyph = cache.get('\u{20AC}');
        assert!(glyph.is_some());
        assert!(cache.has_missing_chars());
    }

    #[test]
    fn test_cache_reuses_entry() {
        let mut cache = cache();
        let a = cache.get('B').unwrap();
        let b = cache.get('B').unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_no_fonts_at_all() {
        let mut cache = GlyphCache::new(Vec::new(), DEFAULT_FALLBACK, 2);
        assert!(cache.get('A').is_none());
        assert!(cache.has_missing_chars());
    }

    #[test]
    fn test_warm_skips_control_chars() {
        let mut cache = cache();
        cache.warm("AB\nC");
        assert!(!cache.has_missing_chars());
    }
}
