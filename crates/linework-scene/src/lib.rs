//! Linework Scene
//!
//! Turns a parsed DXF drawing into a compact, GPU-ready scene: a small
//! number of rendering batches keyed by layer/block/geometry-kind/color/
//! line-type, three packed binary regions (f32 vertices, u16 indices, f32
//! per-instance transforms) and per-layer/per-scene metadata. The produced
//! [`Scene`] is self-contained and meant to be handed to a thin GPU
//! front-end that issues draw calls.

mod batch;
mod block;
mod builder;
mod color;
mod decompose;
mod entity;
mod error;
mod options;
mod scene;

pub use batch::*;
pub use block::*;
pub use builder::{POINT_SHAPE_BLOCK, SceneBuilder};
pub use color::*;
pub use decompose::*;
pub use entity::*;
pub use error::SceneError;
pub use options::{SceneOptions, TextOptions};
pub use scene::*;
