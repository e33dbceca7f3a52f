//! The internal entity set.
//!
//! The decomposer normalizes every DXF entity into these four shapes before
//! batching. Colors are resolved (or carry the BYLAYER/BYBLOCK sentinels
//! inside block definitions), layers are resolved outside block definitions.

use glam::DVec2;

/// Sentinel color: use the containing layer's color.
pub const BY_LAYER: i32 = -1;
/// Sentinel color: use the containing block instance's color.
pub const BY_BLOCK: i32 = -2;

/// Geometric shape of an internal entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEntityKind {
    /// Isolated points; no indices.
    Points,
    /// Independent segments; an even vertex count, two per segment.
    LineSegments,
    /// A connected vertex chain; `closed` joins last to first without
    /// duplicating it.
    Polyline,
    /// Triangles, indexed when `indices` is non-empty.
    Triangles,
}

/// One decomposed entity ready for batching.
#[derive(Debug, Clone)]
pub struct SceneEntity {
    pub kind: SceneEntityKind,
    pub vertices: Vec<DVec2>,
    /// Triangle indices; each fits a u16 after chunk rebasing.
    pub indices: Vec<u32>,
    /// `None` inside block definitions.
    pub layer: Option<String>,
    /// Resolved color, or a sentinel inside block definitions.
    pub color: i32,
    /// Interned line-type id.
    pub line_type: Option<u32>,
    /// Closed-polyline flag.
    pub closed: bool,
}

impl SceneEntity {
    pub fn new(kind: SceneEntityKind, vertices: Vec<DVec2>) -> Self {
        Self {
            kind,
            vertices,
            indices: Vec::new(),
            layer: None,
            color: BY_LAYER,
            line_type: None,
            closed: false,
        }
    }

    /// Check the structural invariants of the variant.
    pub fn is_well_formed(&self) -> bool {
        match self.kind {
            SceneEntityKind::Points => self.indices.is_empty(),
            SceneEntityKind::LineSegments => {
                self.vertices.len() % 2 == 0 && self.indices.is_empty()
            }
            SceneEntityKind::Polyline => self.indices.is_empty(),
            SceneEntityKind::Triangles => {
                self.indices.len() % 3 == 0
                    && self
                        .indices
                        .iter()
                        .all(|&i| (i as usize) < self.vertices.len())
            }
        }
    }
}
