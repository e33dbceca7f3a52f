//! Hatch pattern model and `.pat` file parsing.
//!
//! A pattern is a family of parallel line sets. Each [`PatternLine`] defines
//! one set by its angle, a base point on one member line and the offset to
//! the next line. `.pat` files give the offset in line space (x along the
//! line, y perpendicular); inline DXF definitions give it in pattern space.

use ahash::AHashMap;
use glam::DVec2;

/// One pattern line family.
#[derive(Debug, Clone)]
pub struct PatternLine {
    /// Radians.
    pub angle: f64,
    /// A point on one member line.
    pub base: DVec2,
    /// Offset between consecutive member lines.
    pub offset: DVec2,
    /// Dash lengths; empty means solid. Dashes are carried for completeness
    /// but rendered solid (lines have no dash pattern in the scene output).
    pub dashes: Vec<f64>,
}

/// A named hatch pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub name: String,
    pub lines: Vec<PatternLine>,
    /// Whether `offset` is expressed in the rotated line frame.
    pub offset_in_line_space: bool,
}

impl Pattern {
    /// A single solid line family at the given angle (degrees), unit spacing.
    fn simple(name: &str, angle_deg: f64, spacing: f64) -> Self {
        Self {
            name: name.to_string(),
            lines: vec![PatternLine {
                angle: angle_deg.to_radians(),
                base: DVec2::ZERO,
                offset: DVec2::new(0.0, spacing),
                dashes: Vec::new(),
            }],
            offset_in_line_space: true,
        }
    }

    /// A crossed pair of line families.
    fn crossed(name: &str, angle_deg: f64, spacing: f64) -> Self {
        let mut pattern = Self::simple(name, angle_deg, spacing);
        pattern.lines.push(PatternLine {
            angle: (angle_deg + 90.0).to_radians(),
            base: DVec2::ZERO,
            offset: DVec2::new(0.0, spacing),
            dashes: Vec::new(),
        });
        pattern
    }
}

/// Case-insensitive pattern lookup table.
#[derive(Debug, Default)]
pub struct PatternRegistry {
    patterns: AHashMap<String, Pattern>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry of stock imperial patterns.
    pub fn imperial() -> Self {
        let mut registry = Self::new();
        registry.add(Pattern::simple("LINE", 0.0, 0.125));
        registry.add(Pattern::simple("ANSI31", 45.0, 0.125));
        registry.add(Pattern::crossed("ANSI37", 45.0, 0.125));
        registry.add(Pattern::crossed("NET", 0.0, 0.125));
        registry
    }

    /// The registry of stock metric patterns (same families, metric spacing).
    pub fn metric() -> Self {
        let mut registry = Self::new();
        registry.add(Pattern::simple("LINE", 0.0, 3.175));
        registry.add(Pattern::simple("ANSI31", 45.0, 3.175));
        registry.add(Pattern::crossed("ANSI37", 45.0, 3.175));
        registry.add(Pattern::crossed("NET", 0.0, 3.175));
        registry
    }

    pub fn add(&mut self, pattern: Pattern) {
        self.patterns
            .insert(pattern.name.to_ascii_lowercase(), pattern);
    }

    pub fn get(&self, name: &str) -> Option<&Pattern> {
        self.patterns.get(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Parse `.pat` file content and add every pattern found.
    ///
    /// Returns the number of patterns added. Malformed lines are skipped
    /// with a warning.
    pub fn load_pat_file(&mut self, content: &str) -> usize {
        let mut added = 0;
        let mut current: Option<Pattern> = None;

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            if let Some(header) = line.strip_prefix('*') {
                if let Some(pattern) = current.take() {
                    self.add(pattern);
                    added += 1;
                }
                let name = header.split(',').next().unwrap_or("").trim();
                if name.is_empty() {
                    tracing::warn!("Pattern header without a name, skipping");
                    continue;
                }
                current = Some(Pattern {
                    name: name.to_string(),
                    lines: Vec::new(),
                    offset_in_line_space: true,
                });
                continue;
            }

            let Some(pattern) = current.as_mut() else {
                tracing::warn!("Pattern line outside a pattern definition, skipping");
                continue;
            };
            let values: Result<Vec<f64>, _> = line
                .split(',')
                .map(|field| field.trim().parse::<f64>())
                .collect();
            match values {
                Ok(values) if values.len() >= 5 => {
                    pattern.lines.push(PatternLine {
                        angle: values[0].to_radians(),
                        base: DVec2::new(values[1], values[2]),
                        offset: DVec2::new(values[3], values[4]),
                        dashes: values[5..].to_vec(),
                    });
                }
                _ => {
                    tracing::warn!(line = raw_line, "Malformed pattern line, skipping");
                }
            }
        }
        if let Some(pattern) = current.take() {
            self.add(pattern);
            added += 1;
        }
        added
    }
}
