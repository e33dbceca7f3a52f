//! The parsed drawing handed to the scene builder.

use crate::{Entity, Header, Tables};
use glam::DVec2;
use indexmap::IndexMap;

/// A block definition: named, reusable entity group with a base point.
#[derive(Debug, Clone)]
pub struct BlockRecord {
    pub name: String,
    pub base_point: DVec2,
    pub entities: Vec<Entity>,
}

impl BlockRecord {
    pub fn new(name: impl Into<String>, base_point: DVec2) -> Self {
        Self {
            name: name.into(),
            base_point,
            entities: Vec::new(),
        }
    }
}

/// A fully parsed drawing: the input contract of the scene builder.
///
/// Block iteration preserves the order the parser inserted definitions in;
/// top-level entities keep file order. Both orders are observable in the
/// produced scene, so they are part of the contract.
#[derive(Debug, Clone, Default)]
pub struct Drawing {
    pub header: Header,
    pub tables: Tables,
    pub blocks: IndexMap<String, BlockRecord>,
    pub entities: Vec<Entity>,
}

impl Drawing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layer (test/builder convenience).
    pub fn add_layer(&mut self, layer: crate::Layer) -> &mut Self {
        self.tables.layers.insert(layer.name.clone(), layer);
        self
    }

    /// Register a block definition.
    pub fn add_block(&mut self, block: BlockRecord) -> &mut Self {
        self.blocks.insert(block.name.clone(), block);
        self
    }

    /// Append a top-level entity.
    pub fn push_entity(&mut self, entity: Entity) -> &mut Self {
        self.entities.push(entity);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntityKind, Layer, Line};

    #[test]
    fn test_block_insertion_order() {
        let mut drawing = Drawing::new();
        drawing.add_block(BlockRecord::new("zeta", DVec2::ZERO));
        drawing.add_block(BlockRecord::new("alpha", DVec2::ZERO));
        let names: Vec<&str> = drawing.blocks.keys().map(String::as_str).collect();
        assert_eq!(names, ["zeta", "alpha"]);
    }

    #[test]
    fn test_push_entity() {
        let mut drawing = Drawing::new();
        drawing.add_layer(Layer::new("0", 0xffffff));
        drawing.push_entity(Entity::new(EntityKind::Line(Line {
            start: DVec2::ZERO,
            end: DVec2::X,
        })));
        assert_eq!(drawing.entities.len(), 1);
    }
}
