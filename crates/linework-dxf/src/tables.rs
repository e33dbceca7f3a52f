//! Layer and line-type tables.

use indexmap::IndexMap;

/// A layer table record.
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    /// Resolved 24-bit `0xRRGGBB` layer color.
    pub color: i32,
    /// Frozen layers are skipped entirely during decomposition.
    pub frozen: bool,
}

impl Layer {
    pub fn new(name: impl Into<String>, color: i32) -> Self {
        Self {
            name: name.into(),
            color,
            frozen: false,
        }
    }
}

/// A line-type table record.
///
/// Dash rendering is not part of the scene output; line types only separate
/// batches, so the record carries just enough to identify the type.
#[derive(Debug, Clone)]
pub struct LineType {
    pub name: String,
    /// Dash/dot/space lengths from the LTYPE definition, if any.
    pub pattern: Vec<f64>,
}

impl LineType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: Vec::new(),
        }
    }
}

/// The drawing tables the engine reads.
///
/// Insertion order is preserved so the produced scene is deterministic for a
/// given input.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub layers: IndexMap<String, Layer>,
    pub line_types: IndexMap<String, LineType>,
}

impl Tables {
    /// Look up a layer's resolved color; 0 (black) when the layer is unknown.
    pub fn layer_color(&self, name: &str) -> i32 {
        self.layers.get(name).map(|layer| layer.color).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_color_fallback() {
        let mut tables = Tables::default();
        tables
            .layers
            .insert("walls".to_string(), Layer::new("walls", 0x00ff00));
        assert_eq!(tables.layer_color("walls"), 0x00ff00);
        assert_eq!(tables.layer_color("missing"), 0);
    }
}
