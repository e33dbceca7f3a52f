//! Block records and contexts.
//!
//! Blocks are processed in two phases: a stats pass counts top-level
//! insertions, then each used block's definition is decomposed once in
//! DEFINITION context. Top-level INSERTs either merge the definition
//! geometry into the scene (flattening) or push one instance transform.

use crate::BatchKey;
use glam::DVec2;
use linework_core::Transform;
use linework_dxf::Insert;

/// Flattening threshold: a block is inlined when `useCount · verticesCount`
/// does not exceed this.
pub const FLATTEN_VERTEX_BUDGET: usize = 1024;

/// How a block context consumes vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockContextMode {
    /// Building the block's own definition batches.
    Definition,
    /// Inlining a nested block into an outer definition.
    NestedDefinition,
    /// Placing a top-level instance.
    Instantiation,
}

/// A block being assembled.
#[derive(Debug)]
pub struct Block {
    pub name: String,
    pub base_point: DVec2,
    /// Top-level INSERT references. Nested references do not count: a
    /// nested insert is inlined into its owner's definition, so only
    /// top-level placements weigh into the flatten decision.
    pub use_count: u32,
    /// Vertices accumulated by the definition.
    pub vertices_count: usize,
    /// Definition coordinate origin: the first vertex encountered. All
    /// definition vertices are stored relative to it to keep coordinates
    /// small within the block.
    pub offset: Option<DVec2>,
    /// Keys of this block's definition batches in the scene registry.
    pub batch_keys: Vec<BatchKey>,
    pub flatten: bool,
}

impl Block {
    pub fn new(name: impl Into<String>, base_point: DVec2) -> Self {
        Self {
            name: name.into(),
            base_point,
            use_count: 0,
            vertices_count: 0,
            offset: None,
            batch_keys: Vec::new(),
            flatten: false,
        }
    }

    pub fn has_geometry(&self) -> bool {
        self.vertices_count > 0
    }

    /// Decide the flattening policy from the usage statistics.
    pub fn decide_flatten(&mut self) {
        self.flatten = self.has_geometry()
            && (self.use_count == 1
                || self.use_count as usize * self.vertices_count <= FLATTEN_VERTEX_BUDGET);
    }

    /// Register a definition batch key once.
    pub fn add_batch_key(&mut self, key: &BatchKey) {
        if !self.batch_keys.contains(key) {
            self.batch_keys.push(key.clone());
        }
    }

    /// Take a definition vertex and return its stored (offset-relative)
    /// position, capturing the offset from the first vertex.
    pub fn store_vertex(&mut self, vertex: DVec2) -> DVec2 {
        let offset = *self.offset.get_or_insert(vertex);
        self.vertices_count += 1;
        vertex - offset
    }

    /// Build the insertion transform for an INSERT referencing this block.
    ///
    /// `translate(−basePoint) · scale · rotate(−deg) · translate(position)`,
    /// with the stored definition offset applied first in instantiation
    /// context and an X mirror appended for negative extrusions.
    pub fn insertion_transform(
        &self,
        insert: &Insert,
        mode: BlockContextMode,
        mirrored: bool,
    ) -> Transform {
        let base = Transform::translate(-self.base_point)
            .then_scale_xy(DVec2::new(insert.x_scale, insert.y_scale))
            .then_rotate(-insert.rotation.to_radians())
            .then_translate(insert.position);
        let base = if mode == BlockContextMode::Instantiation {
            match self.offset {
                Some(offset) => Transform::translate(offset).then(&base),
                None => base,
            }
        } else {
            base
        };
        if mirrored { base.then(&Transform::mirror_x()) } else { base }
    }
}
