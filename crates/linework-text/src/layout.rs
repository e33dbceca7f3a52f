//! Single-line and paragraph text layout.
//!
//! Glyphs are placed on the baseline with per-pair kerning. Single-line TEXT
//! is laid out in font units and scaled through its transform; MTEXT is laid
//! out directly in drawing units so wrapping widths and column heights
//! compare against entity values.

use crate::{
    CachedGlyph, DEFAULT_FALLBACK, Font, GlyphCache, LineSpacingStyle, MTextItem,
    ParagraphAlignment, expand_special,
};
use glam::DVec2;
use linework_core::Transform;
use std::sync::Arc;

/// Tab stops are at multiples of this factor times the font size.
const TAB_STOP_FACTOR: f64 = 4.0;
/// MTEXT line height is this factor times the spacing factors and font size.
const LINE_HEIGHT_FACTOR: f64 = 5.0 / 3.0;
/// Advance used for a space when no font provides one, at size 1.
const FALLBACK_SPACE_ADVANCE: f64 = 0.3;

/// Text rendering options.
#[derive(Debug, Clone)]
pub struct TextOptions {
    /// Segments per outline curve during glyph triangulation.
    pub curve_subdivision: u32,
    /// Characters substituted for unavailable glyphs, in preference order.
    pub fallback_chars: String,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            curve_subdivision: 2,
            fallback_chars: DEFAULT_FALLBACK.to_string(),
        }
    }
}

/// TEXT horizontal justification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizAlign {
    #[default]
    Left,
    Center,
    Right,
    /// Scale uniformly so the text spans the two alignment points.
    Aligned,
    Middle,
    /// Scale X only so the text spans the two alignment points.
    Fit,
}

/// TEXT vertical justification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VertAlign {
    #[default]
    Baseline,
    Bottom,
    Middle,
    Top,
}

/// MTEXT attachment point: where the content box hangs off the insertion
/// position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attachment {
    #[default]
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

/// One glyph transformed into drawing coordinates.
#[derive(Debug, Clone)]
pub struct RenderedGlyph {
    pub vertices: Vec<DVec2>,
    pub indices: Vec<u32>,
}

/// A single-line TEXT entity, pre-resolved by the caller.
#[derive(Debug, Clone)]
pub struct SingleLineText<'a> {
    pub text: &'a str,
    pub position: DVec2,
    pub end_position: Option<DVec2>,
    pub height: f64,
    /// Degrees; applied inverted, per the TEXT group-code convention.
    pub rotation: f64,
    pub h_align: HorizAlign,
    pub v_align: VertAlign,
}

/// Column flow description for MTEXT.
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    pub count: usize,
    pub width: f64,
    /// 0 means auto height.
    pub defined_height: f64,
    /// Per-column heights; empty means every column uses `defined_height`.
    pub heights: Vec<f64>,
    pub gutter_width: f64,
    pub total_width: f64,
    pub total_height: f64,
}

/// An MTEXT layout request.
#[derive(Debug, Clone)]
pub struct MTextLayout<'a> {
    pub items: &'a [MTextItem],
    pub position: DVec2,
    pub font_size: f64,
    /// Reference width for wrapping; `None` disables wrapping.
    pub width: Option<f64>,
    /// Degrees, counter-clockwise.
    pub rotation: f64,
    /// Overrides `rotation` when present.
    pub direction: Option<DVec2>,
    pub attachment: Attachment,
    /// Base line-spacing factor from the entity.
    pub line_spacing_factor: f64,
    pub columns: Option<ColumnLayout>,
}

/// Glyph placement and rendering over a font list.
#[derive(Debug)]
pub struct TextEngine {
    cache: GlyphCache,
}

impl TextEngine {
    pub fn new(fonts: Vec<Box<dyn Font>>, options: &TextOptions) -> Self {
        Self {
            cache: GlyphCache::new(fonts, &options.fallback_chars, options.curve_subdivision),
        }
    }

    /// Pre-resolve every glyph of a string, latching misses.
    pub fn warm(&mut self, text: &str) {
        self.cache.warm(&expand_special(text));
    }

    /// Whether any glyph anywhere failed to resolve.
    pub fn has_missing_chars(&self) -> bool {
        self.cache.has_missing_chars()
    }

    /// Lay out and render a single-line TEXT entity.
    pub fn render_single_line(&mut self, entity: &SingleLineText<'_>) -> Vec<RenderedGlyph> {
        let text = expand_special(entity.text);
        let line = self.layout_run(&text);
        if line.glyphs.is_empty() {
            return Vec::new();
        }

        let bounds = &line.bounds;
        let (scale, rotation, insertion) = match entity.h_align {
            HorizAlign::Aligned | HorizAlign::Fit => {
                let Some(end) = entity.end_position else {
                    tracing::warn!("Aligned/fit text without a second alignment point");
                    return Vec::new();
                };
                let span = end - entity.position;
                let length = span.length();
                let width = line.advance.max(f64::EPSILON);
                let x_scale = length / width;
                let scale = if entity.h_align == HorizAlign::Aligned {
                    DVec2::splat(x_scale)
                } else {
                    DVec2::new(x_scale, entity.height)
                };
                (scale, span.y.atan2(span.x), entity.position)
            }
            _ => {
                let insertion = if entity.h_align == HorizAlign::Left
                    && entity.v_align == VertAlign::Baseline
                {
                    entity.position
                } else {
                    entity.end_position.unwrap_or(entity.position)
                };
                (
                    DVec2::splat(entity.height),
                    -entity.rotation.to_radians(),
                    insertion,
                )
            }
        };

        let origin = DVec2::new(
            match entity.h_align {
                HorizAlign::Left | HorizAlign::Aligned | HorizAlign::Fit => 0.0,
                HorizAlign::Center => (bounds.0 + bounds.1) * 0.5,
                HorizAlign::Right => bounds.1,
                HorizAlign::Middle => (bounds.0 + bounds.1) * 0.5,
            },
            match (entity.h_align, entity.v_align) {
                (HorizAlign::Middle, _) => (bounds.2 + bounds.3) * 0.5,
                (_, VertAlign::Baseline) => 0.0,
                (_, VertAlign::Bottom) => bounds.2,
                (_, VertAlign::Middle) => (bounds.2 + bounds.3) * 0.5,
                (_, VertAlign::Top) => bounds.3,
            },
        );

        let transform = Transform::translate(-origin)
            .then_scale_xy(scale)
            .then_rotate(rotation)
            .then_translate(insertion);

        line.glyphs
            .iter()
            .filter(|placed| !placed.glyph.vertices.is_empty())
            .map(|placed| {
                let offset = DVec2::new(placed.x, 0.0);
                RenderedGlyph {
                    vertices: placed
                        .glyph
                        .vertices
                        .iter()
                        .map(|&v| transform.transform_point(v + offset))
                        .collect(),
                    indices: placed.glyph.indices.clone(),
                }
            })
            .collect()
    }

    /// Lay out and render an MTEXT entity.
    pub fn render_mtext(&mut self, layout: &MTextLayout<'_>) -> Vec<RenderedGlyph> {
        let paragraphs = self.build_paragraphs(layout.items, layout.font_size);
        let column_width = layout
            .columns
            .as_ref()
            .map(|c| c.width)
            .or(layout.width)
            .filter(|w| *w > 0.0);
        let lines = self.build_lines(&paragraphs, column_width, layout);
        if lines.is_empty() {
            return Vec::new();
        }

        let placed = place_into_columns(&lines, layout, column_width);
        let rotation = match layout.direction {
            Some(direction) => direction.y.atan2(direction.x),
            None => layout.rotation.to_radians(),
        };
        let origin = attachment_origin(layout.attachment, placed.box_width, placed.box_height);
        let transform = Transform::translate(-origin)
            .then_rotate(rotation)
            .then_translate(layout.position);

        let mut rendered = Vec::new();
        for glyph in &placed.glyphs {
            if glyph.glyph.vertices.is_empty() {
                continue;
            }
            let position = DVec2::new(glyph.x, glyph.y);
            rendered.push(RenderedGlyph {
                vertices: glyph
                    .glyph
                    .vertices
                    .iter()
                    .map(|&v| transform.transform_point(v * layout.font_size + position))
                    .collect(),
                indices: glyph.glyph.indices.clone(),
            });
        }
        rendered
    }

    /// Place one run of characters on a baseline at size 1.
    fn layout_run(&mut self, text: &str) -> LaidOutRun {
        let mut glyphs = Vec::new();
        let mut cursor = 0.0f64;
        let mut bounds = (f64::INFINITY, f64::NEG_INFINITY, 0.0f64, 0.0f64);
        let mut previous: Option<char> = None;

        for c in text.chars() {
            let Some(glyph) = self.cache.get(c) else {
                previous = None;
                continue;
            };
            if let Some(prev) = previous {
                cursor += self.cache.kerning(prev, c);
            }
            bounds.0 = bounds.0.min(cursor + glyph.bounds.x_min);
            bounds.1 = bounds.1.max(cursor + glyph.bounds.x_max);
            bounds.2 = bounds.2.min(glyph.bounds.y_min);
            bounds.3 = bounds.3.max(glyph.bounds.y_max);
            let advance = glyph.advance;
            glyphs.push(PlacedRunGlyph { glyph, x: cursor });
            cursor += advance;
            previous = Some(c);
        }
        if glyphs.is_empty() {
            bounds = (0.0, 0.0, 0.0, 0.0);
        }
        LaidOutRun {
            glyphs,
            advance: cursor,
            bounds,
        }
    }

    /// Convert the parsed item stream into paragraphs of chunks.
    fn build_paragraphs(&mut self, items: &[MTextItem], font_size: f64) -> Vec<ParagraphChunks> {
        let mut builder = ParagraphBuilder::new(font_size, self.space_advance() * font_size);
        self.collect_items(items, &mut builder);
        builder.finish()
    }

    fn collect_items(&mut self, items: &[MTextItem], builder: &mut ParagraphBuilder) {
        for item in items {
            match item {
                MTextItem::Text(text) => {
                    for c in text.chars() {
                        if c == ' ' {
                            builder.space();
                        } else {
                            self.append_glyph(builder, c);
                        }
                    }
                }
                MTextItem::Scope(content) => self.collect_items(content, builder),
                MTextItem::Paragraph => builder.paragraph_break(),
                MTextItem::NonBreakingSpace => {
                    // Joins its neighbors: a space glyph inside the word.
                    self.append_glyph(builder, ' ');
                }
                MTextItem::ParagraphAlignment(alignment) => builder.alignment = *alignment,
                MTextItem::ParagraphLineSpacing { style, factor } => {
                    builder.line_spacing = match style {
                        LineSpacingStyle::Reset => 1.0,
                        LineSpacingStyle::AtLeast
                        | LineSpacingStyle::Exactly
                        | LineSpacingStyle::Multiple => *factor,
                    };
                }
                MTextItem::Tab => builder.tab(),
            }
        }
    }

    fn append_glyph(&mut self, builder: &mut ParagraphBuilder, c: char) {
        let Some(glyph) = self.cache.get(c) else {
            return;
        };
        let kerning = builder
            .last_char()
            .map_or(0.0, |prev| self.cache.kerning(prev, c));
        builder.glyph(c, glyph, kerning);
    }

    fn space_advance(&mut self) -> f64 {
        self.cache
            .get(' ')
            .map_or(FALLBACK_SPACE_ADVANCE, |glyph| glyph.advance)
    }

    /// Break paragraph chunks into lines not exceeding `max_width`.
    fn build_lines(
        &mut self,
        paragraphs: &[ParagraphChunks],
        max_width: Option<f64>,
        layout: &MTextLayout<'_>,
    ) -> Vec<BuiltLine> {
        let font_size = layout.font_size;
        let tab_stop = TAB_STOP_FACTOR * font_size;
        let mut lines = Vec::new();

        for paragraph in paragraphs {
            let line_height = layout.line_spacing_factor
                * paragraph.line_spacing
                * LINE_HEIGHT_FACTOR
                * font_size;
            let mut line = BuiltLine::new(line_height, paragraph.alignment);
            let mut cursor = 0.0f64;

            for chunk in &paragraph.chunks {
                match &chunk.kind {
                    ChunkKind::Tab => {
                        cursor = (cursor / tab_stop).floor() * tab_stop + tab_stop;
                        line.chunk_count += 1;
                    }
                    ChunkKind::Word(word) => {
                        // The first chunk of a line drops its leading spaces.
                        let leading = if line.glyphs.is_empty() {
                            0.0
                        } else {
                            chunk.leading_space
                        };
                        if let Some(max) = max_width {
                            if !line.glyphs.is_empty()
                                && cursor + leading + word.width > max
                            {
                                line.width = cursor;
                                lines.push(std::mem::replace(
                                    &mut line,
                                    BuiltLine::new(line_height, paragraph.alignment),
                                ));
                                cursor = 0.0;
                            }
                        }
                        let leading = if line.glyphs.is_empty() {
                            0.0
                        } else {
                            chunk.leading_space
                        };
                        let base = cursor + leading;
                        let chunk_index = line.chunk_count;
                        for glyph in &word.glyphs {
                            line.glyphs.push(LineGlyph {
                                glyph: glyph.glyph.clone(),
                                x: base + glyph.x,
                                y: 0.0,
                                chunk_index,
                            });
                        }
                        cursor = base + word.width;
                        line.chunk_count += 1;
                    }
                }
            }
            line.width = cursor;
            lines.push(line);
        }
        lines
    }
}

#[derive(Debug)]
struct PlacedRunGlyph {
    glyph: Arc<CachedGlyph>,
    x: f64,
}

#[derive(Debug)]
struct LaidOutRun {
    glyphs: Vec<PlacedRunGlyph>,
    /// Pen advance over the whole run.
    advance: f64,
    /// (x_min, x_max, y_min, y_max).
    bounds: (f64, f64, f64, f64),
}

#[derive(Debug)]
struct WordChunk {
    glyphs: Vec<WordGlyph>,
    width: f64,
    last_char: Option<char>,
}

#[derive(Debug)]
struct WordGlyph {
    glyph: Arc<CachedGlyph>,
    /// Offset within the word, drawing units.
    x: f64,
}

#[derive(Debug)]
enum ChunkKind {
    Word(WordChunk),
    Tab,
}

#[derive(Debug)]
struct Chunk {
    kind: ChunkKind,
    /// Width of the spaces before this chunk, drawing units.
    leading_space: f64,
}

#[derive(Debug)]
struct ParagraphChunks {
    chunks: Vec<Chunk>,
    alignment: ParagraphAlignment,
    line_spacing: f64,
}

struct ParagraphBuilder {
    paragraphs: Vec<ParagraphChunks>,
    chunks: Vec<Chunk>,
    word: Option<WordChunk>,
    pending_space: f64,
    alignment: ParagraphAlignment,
    line_spacing: f64,
    font_size: f64,
    space_advance: f64,
}

impl ParagraphBuilder {
    fn new(font_size: f64, space_advance: f64) -> Self {
        Self {
            paragraphs: Vec::new(),
            chunks: Vec::new(),
            word: None,
            pending_space: 0.0,
            alignment: ParagraphAlignment::Left,
            line_spacing: 1.0,
            font_size,
            space_advance,
        }
    }

    fn last_char(&self) -> Option<char> {
        self.word.as_ref().and_then(|word| word.last_char)
    }

    fn glyph(&mut self, c: char, glyph: Arc<CachedGlyph>, kerning: f64) {
        let word = self.word.get_or_insert_with(|| WordChunk {
            glyphs: Vec::new(),
            width: 0.0,
            last_char: None,
        });
        word.width += kerning * self.font_size;
        word.glyphs.push(WordGlyph {
            glyph: glyph.clone(),
            x: word.width,
        });
        word.width += glyph.advance * self.font_size;
        word.last_char = Some(c);
    }

    fn space(&mut self) {
        self.flush_word();
        self.pending_space += self.space_advance;
    }

    fn tab(&mut self) {
        self.flush_word();
        self.chunks.push(Chunk {
            kind: ChunkKind::Tab,
            leading_space: std::mem::take(&mut self.pending_space),
        });
    }

    fn paragraph_break(&mut self) {
        self.flush_word();
        self.pending_space = 0.0;
        let chunks = std::mem::take(&mut self.chunks);
        self.paragraphs.push(ParagraphChunks {
            chunks,
            alignment: self.alignment,
            line_spacing: self.line_spacing,
        });
    }

    fn flush_word(&mut self) {
        if let Some(word) = self.word.take() {
            self.chunks.push(Chunk {
                kind: ChunkKind::Word(word),
                leading_space: std::mem::take(&mut self.pending_space),
            });
        }
    }

    fn finish(mut self) -> Vec<ParagraphChunks> {
        self.paragraph_break();
        self.paragraphs
    }
}

#[derive(Debug)]
struct LineGlyph {
    glyph: Arc<CachedGlyph>,
    x: f64,
    y: f64,
    chunk_index: usize,
}

#[derive(Debug)]
struct BuiltLine {
    glyphs: Vec<LineGlyph>,
    width: f64,
    chunk_count: usize,
    line_height: f64,
    alignment: ParagraphAlignment,
}

impl BuiltLine {
    fn new(line_height: f64, alignment: ParagraphAlignment) -> Self {
        Self {
            glyphs: Vec::new(),
            width: 0.0,
            chunk_count: 0,
            line_height,
            alignment,
        }
    }
}

struct PlacedContent {
    glyphs: Vec<LineGlyph>,
    box_width: f64,
    box_height: f64,
}

/// Distribute lines into columns and resolve per-line alignment offsets.
fn place_into_columns(
    lines: &[BuiltLine],
    layout: &MTextLayout<'_>,
    column_width: Option<f64>,
) -> PlacedContent {
    let font_size = layout.font_size;
    let natural_width = lines.iter().fold(0.0f64, |acc, line| acc.max(line.width));
    let slot_width = column_width.unwrap_or(natural_width);

    let (column_count, gutter) = match &layout.columns {
        Some(columns) => (columns.count.max(1), columns.gutter_width),
        None => (1, 0.0),
    };
    let column_height = |index: usize| -> f64 {
        match &layout.columns {
            Some(columns) => {
                let height = columns
                    .heights
                    .get(index)
                    .copied()
                    .unwrap_or(columns.defined_height);
                if height > 0.0 { height } else { f64::INFINITY }
            }
            None => f64::INFINITY,
        }
    };

    let mut glyphs = Vec::new();
    let mut column = 0usize;
    let mut used = 0.0f64;
    let mut max_used = 0.0f64;

    for line in lines {
        if used + font_size > column_height(column) && column + 1 < column_count {
            // The last column absorbs overflow.
            column += 1;
            used = 0.0;
        }
        let baseline = -(used + font_size);
        used += line.line_height;
        max_used = max_used.max(used);

        let column_x = column as f64 * (slot_width + gutter);
        let free = (slot_width - line.width).max(0.0);
        let (offset, distribute_step) = match line.alignment {
            ParagraphAlignment::Left | ParagraphAlignment::Justify => (0.0, 0.0),
            ParagraphAlignment::Center => (free * 0.5, 0.0),
            ParagraphAlignment::Right => (free, 0.0),
            ParagraphAlignment::Distribute => {
                if line.chunk_count > 1 {
                    (0.0, free / (line.chunk_count - 1) as f64)
                } else {
                    (0.0, 0.0)
                }
            }
        };

        for glyph in &line.glyphs {
            glyphs.push(LineGlyph {
                glyph: glyph.glyph.clone(),
                x: column_x + offset + glyph.x + distribute_step * glyph.chunk_index as f64,
                y: baseline,
                chunk_index: glyph.chunk_index,
            });
        }
    }

    let used_columns = column + 1;
    let box_width = match &layout.columns {
        Some(columns) if columns.total_width > 0.0 => columns.total_width,
        _ => used_columns as f64 * slot_width + (used_columns.saturating_sub(1)) as f64 * gutter,
    };
    let box_height = match &layout.columns {
        Some(columns) if columns.total_height > 0.0 => columns.total_height,
        Some(columns) if columns.defined_height > 0.0 => columns.defined_height,
        _ => max_used,
    };

    PlacedContent {
        glyphs,
        box_width,
        box_height,
    }
}

/// The content-box origin selected by an attachment point. The box spans
/// `x ∈ [0, width]`, `y ∈ [-height, 0]`.
fn attachment_origin(attachment: Attachment, width: f64, height: f64) -> DVec2 {
    let x = match attachment {
        Attachment::TopLeft | Attachment::MiddleLeft | Attachment::BottomLeft => 0.0,
        Attachment::TopCenter | Attachment::MiddleCenter | Attachment::BottomCenter => width * 0.5,
        Attachment::TopRight | Attachment::MiddleRight | Attachment::BottomRight => width,
    };
    let y = match attachment {
        Attachment::TopLeft | Attachment::TopCenter | Attachment::TopRight => 0.0,
        Attachment::MiddleLeft | Attachment::MiddleCenter | Attachment::MiddleRight => {
            -height * 0.5
        }
        Attachment::BottomLeft | Attachment::BottomCenter | Attachment::BottomRight => -height,
    };
    DVec2::new(x, y)
}
