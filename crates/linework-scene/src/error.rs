use linework_geometry::TessellationError;

/// Fatal scene-building errors.
///
/// These abort the build; no partial scene is observable afterwards.
/// Recoverable data anomalies (unresolved blocks, unknown entity types,
/// malformed format codes) are logged and skipped instead.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneError {
    /// A single indexed write requested at least the chunk vertex limit.
    ChunkVertexOverflow { requested: usize },

    /// An index referenced a vertex outside its chunk region.
    IndexOutOfRange { index: u32, vertex_count: usize },

    /// A chunk write delivered a different vertex count than it reserved.
    VertexCountMismatch { reserved: usize, written: usize },

    /// Batches of different storage layouts were merged.
    BatchMergeMismatch,

    /// An instanced batch cannot be merged.
    InstancedMerge,

    /// Invalid curve data (knots, degree) in the drawing.
    Tessellation(TessellationError),
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneError::ChunkVertexOverflow { requested } => {
                write!(f, "Indexed write of {} vertices exceeds the chunk limit", requested)
            }
            SceneError::IndexOutOfRange {
                index,
                vertex_count,
            } => write!(
                f,
                "Index {} out of range for a chunk of {} vertices",
                index, vertex_count
            ),
            SceneError::VertexCountMismatch { reserved, written } => write!(
                f,
                "Chunk write reserved {} vertices but delivered {}",
                reserved, written
            ),
            SceneError::BatchMergeMismatch => {
                write!(f, "Cannot merge batches with different storage layouts")
            }
            SceneError::InstancedMerge => write!(f, "Cannot merge an instanced batch"),
            SceneError::Tessellation(err) => write!(f, "Tessellation failed: {}", err),
        }
    }
}

impl std::error::Error for SceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SceneError::Tessellation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TessellationError> for SceneError {
    fn from(err: TessellationError) -> Self {
        SceneError::Tessellation(err)
    }
}
