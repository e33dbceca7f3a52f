//! The produced scene.
//!
//! Three contiguous byte regions plus batch descriptors. Offsets and sizes
//! in descriptors are element counts (f32 for vertices and transforms, u16
//! for indices), not byte counts.

use crate::BatchKey;
use glam::DVec2;
use linework_core::Bounds;

/// A layer surfaced to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneLayer {
    pub name: String,
    /// Resolved `0xRRGGBB`.
    pub color: i32,
}

/// One chunk of an indexed batch, addressing into the scene regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDescriptor {
    pub vertices_offset: u32,
    pub vertices_size: u32,
    pub indices_offset: u32,
    pub indices_size: u32,
}

/// Where a serialized batch's data lives.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneBatchData {
    Vertices { offset: u32, size: u32 },
    Chunks(Vec<ChunkDescriptor>),
    Transforms { offset: u32, size: u32 },
}

/// A serialized batch: its key plus region descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneBatch {
    pub key: BatchKey,
    pub data: SceneBatchData,
}

/// The self-contained scene description handed to the GPU front-end.
#[derive(Debug, Default)]
pub struct Scene {
    /// Interleaved x,y f32 vertices.
    pub vertices: Vec<u8>,
    /// u16 indices.
    pub indices: Vec<u8>,
    /// Row-major 3×2 f32 transforms, six floats per instance.
    pub transforms: Vec<u8>,
    /// Batches in key order.
    pub batches: Vec<SceneBatch>,
    pub layers: Vec<SceneLayer>,
    /// Subtracted from every stored vertex; add it back to recover drawing
    /// coordinates.
    pub origin: DVec2,
    pub bounds: Bounds,
    pub has_missing_chars: bool,
    /// The lazily built point-shape block includes a center dot.
    pub point_shape_has_dot: bool,
}

impl Scene {
    /// The vertex region as f32 elements.
    ///
    /// The byte regions carry no alignment guarantee, so these accessors
    /// copy into a typed vector instead of casting in place.
    pub fn vertices_f32(&self) -> Vec<f32> {
        bytemuck::pod_collect_to_vec(&self.vertices)
    }

    /// The index region as u16 elements.
    pub fn indices_u16(&self) -> Vec<u16> {
        bytemuck::pod_collect_to_vec(&self.indices)
    }

    /// The transform region as f32 elements.
    pub fn transforms_f32(&self) -> Vec<f32> {
        bytemuck::pod_collect_to_vec(&self.transforms)
    }
}
