//! Render batches and the 16-bit indexed chunk packer.
//!
//! Batches are keyed by `(layer, block, geometry kind, color, line type)`
//! under a total order and stored in an ordered map, so serialization walks
//! them deterministically. Indexed batches pack geometry into chunks whose
//! index space fits 16 bits; each chunk is self-contained and drawable on
//! its own.

use crate::SceneError;
use glam::DVec2;
use linework_core::{PackedBuffer, transform::InstanceTransform};

/// Vertex capacity of one indexed chunk. A single write requesting this
/// many vertices or more is an error.
pub const MAX_CHUNK_VERTICES: usize = 0x1_0000;

/// Indices preallocated per vertex in a fresh chunk.
const INDICES_PER_VERTEX: usize = 2;

/// Geometry kind component of a batch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GeometryKind {
    Points,
    Lines,
    IndexedLines,
    Triangles,
    IndexedTriangles,
    BlockInstance,
    PointInstance,
}

impl GeometryKind {
    /// Whether batches of this kind store indexed chunks.
    pub fn is_indexed(self) -> bool {
        matches!(self, GeometryKind::IndexedLines | GeometryKind::IndexedTriangles)
    }

    /// Whether batches of this kind store per-instance transforms.
    pub fn is_instanced(self) -> bool {
        matches!(self, GeometryKind::BlockInstance | GeometryKind::PointInstance)
    }
}

/// Composite batch key.
///
/// The derived order is component-lexicographic in field order with `None`
/// smallest, which is exactly the serialization order contract.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatchKey {
    pub layer: Option<String>,
    pub block: Option<String>,
    pub kind: GeometryKind,
    pub color: i32,
    pub line_type: Option<u32>,
}

impl BatchKey {
    pub fn new(
        layer: Option<String>,
        block: Option<String>,
        kind: GeometryKind,
        color: i32,
        line_type: Option<u32>,
    ) -> Self {
        Self {
            layer,
            block,
            kind,
            color,
            line_type,
        }
    }
}

/// One self-contained region of an indexed batch.
///
/// Indices are stored rebased to the chunk's vertex region, so `0` is the
/// chunk's first vertex.
#[derive(Debug)]
pub struct IndexedChunk {
    vertices: PackedBuffer<f32>,
    indices: PackedBuffer<u16>,
}

impl IndexedChunk {
    fn new(vertex_capacity: usize) -> Self {
        Self {
            vertices: PackedBuffer::new(vertex_capacity * 2),
            indices: PackedBuffer::new(vertex_capacity * INDICES_PER_VERTEX),
        }
    }

    /// Number of vertices stored.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 2
    }

    /// Number of indices stored.
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Vertex slack still available.
    fn remaining(&self) -> usize {
        MAX_CHUNK_VERTICES - self.vertex_count()
    }

    pub fn vertex_data(&self) -> &[f32] {
        self.vertices.as_slice()
    }

    pub fn index_data(&self) -> &[u16] {
        self.indices.as_slice()
    }

    /// Write a reserved region: `reserved` vertices and their indices.
    fn write(
        &mut self,
        reserved: usize,
        vertices: &[DVec2],
        indices: &[u32],
    ) -> Result<(), SceneError> {
        if vertices.len() != reserved {
            return Err(SceneError::VertexCountMismatch {
                reserved,
                written: vertices.len(),
            });
        }
        let base = self.vertex_count();
        for &index in indices {
            if index as usize >= reserved {
                return Err(SceneError::IndexOutOfRange {
                    index,
                    vertex_count: reserved,
                });
            }
            self.indices.push((index as usize + base) as u16);
        }
        for vertex in vertices {
            self.vertices.push(vertex.x as f32);
            self.vertices.push(vertex.y as f32);
        }
        Ok(())
    }
}

/// Batch payload, one variant per storage layout.
#[derive(Debug)]
pub enum BatchData {
    /// Interleaved x,y vertex stream.
    Vertices(PackedBuffer<f32>),
    /// 16-bit indexed chunks.
    Chunks(Vec<IndexedChunk>),
    /// Row-major 3×2 transforms, six floats per instance.
    Transforms(PackedBuffer<f32>),
}

/// A keyed accumulation of renderable geometry.
#[derive(Debug)]
pub struct RenderBatch {
    pub key: BatchKey,
    data: BatchData,
}

impl RenderBatch {
    pub fn new(key: BatchKey) -> Self {
        let data = if key.kind.is_indexed() {
            BatchData::Chunks(Vec::new())
        } else if key.kind.is_instanced() {
            // Six floats per instance.
            BatchData::Transforms(PackedBuffer::new(16 * 6))
        } else {
            BatchData::Vertices(PackedBuffer::new(16))
        };
        Self { key, data }
    }

    pub fn data(&self) -> &BatchData {
        &self.data
    }

    /// Append one vertex to a non-indexed, non-instanced batch.
    pub fn push_vertex(&mut self, vertex: DVec2) {
        match &mut self.data {
            BatchData::Vertices(buffer) => {
                buffer.push(vertex.x as f32);
                buffer.push(vertex.y as f32);
            }
            _ => unreachable!("push_vertex on a non-vertex batch"),
        }
    }

    /// Append one instance transform to an instanced batch.
    pub fn push_transform(&mut self, transform: InstanceTransform) {
        match &mut self.data {
            BatchData::Transforms(buffer) => {
                buffer.extend_from_slice(&transform.rows);
            }
            _ => unreachable!("push_transform on a non-instanced batch"),
        }
    }

    /// Append indexed geometry, selecting a chunk by best fit.
    ///
    /// Among existing chunks whose remaining capacity holds `vertices`, the
    /// one with the smallest slack wins; otherwise a new chunk is created.
    /// Indices are validated against the written region and rebased.
    pub fn push_indexed(
        &mut self,
        vertices: &[DVec2],
        indices: &[u32],
    ) -> Result<(), SceneError> {
        let count = vertices.len();
        if count >= MAX_CHUNK_VERTICES {
            return Err(SceneError::ChunkVertexOverflow { requested: count });
        }
        let BatchData::Chunks(chunks) = &mut self.data else {
            return Err(SceneError::BatchMergeMismatch);
        };

        let chunk = best_fit_chunk(chunks, count);
        chunk.write(count, vertices, indices)
    }

    /// Total vertex elements (f32 count) stored across the batch.
    pub fn vertex_elements(&self) -> usize {
        match &self.data {
            BatchData::Vertices(buffer) => buffer.len(),
            BatchData::Chunks(chunks) => chunks.iter().map(|c| c.vertices.len()).sum(),
            BatchData::Transforms(_) => 0,
        }
    }

    /// Total index elements stored across the batch.
    pub fn index_elements(&self) -> usize {
        match &self.data {
            BatchData::Chunks(chunks) => chunks.iter().map(|c| c.indices.len()).sum(),
            _ => 0,
        }
    }

    /// Total transform elements (f32 count) stored.
    pub fn transform_elements(&self) -> usize {
        match &self.data {
            BatchData::Transforms(buffer) => buffer.len(),
            _ => 0,
        }
    }

    /// Copy another batch's geometry into this one, mapping every vertex.
    ///
    /// Used when flattening blocks: the map applies the composed insertion
    /// transform and the scene's vertex finalization. Indexed sources
    /// reserve one fresh chunk per source chunk so rebased indices stay
    /// valid. Instanced batches cannot be merged.
    pub fn merge(
        &mut self,
        source: &RenderBatch,
        mut map: impl FnMut(DVec2) -> DVec2,
    ) -> Result<(), SceneError> {
        match (&mut self.data, &source.data) {
            (BatchData::Vertices(target), BatchData::Vertices(other)) => {
                let data = other.as_slice();
                for pair in data.chunks_exact(2) {
                    let mapped = map(DVec2::new(pair[0] as f64, pair[1] as f64));
                    target.push(mapped.x as f32);
                    target.push(mapped.y as f32);
                }
                Ok(())
            }
            (BatchData::Chunks(target), BatchData::Chunks(other)) => {
                for source_chunk in other {
                    let mut chunk = IndexedChunk::new(source_chunk.vertex_count());
                    for pair in source_chunk.vertex_data().chunks_exact(2) {
                        let mapped = map(DVec2::new(pair[0] as f64, pair[1] as f64));
                        chunk.vertices.push(mapped.x as f32);
                        chunk.vertices.push(mapped.y as f32);
                    }
                    for &index in source_chunk.index_data() {
                        chunk.indices.push(index);
                    }
                    target.push(chunk);
                }
                Ok(())
            }
            (BatchData::Transforms(_), _) | (_, BatchData::Transforms(_)) => {
                Err(SceneError::InstancedMerge)
            }
            _ => Err(SceneError::BatchMergeMismatch),
        }
    }
}

/// Pick the existing chunk with the least slack that still fits, or append
/// a fresh one.
fn best_fit_chunk(chunks: &mut Vec<IndexedChunk>, count: usize) -> &mut IndexedChunk {
    let mut best: Option<usize> = None;
    for (i, chunk) in chunks.iter().enumerate() {
        let remaining = chunk.remaining();
        if remaining < count {
            continue;
        }
        match best {
            Some(current) if chunks[current].remaining() <= remaining => {}
            _ => best = Some(i),
        }
    }
    match best {
        Some(i) => &mut chunks[i],
        None => {
            chunks.push(IndexedChunk::new(count.max(16)));
            chunks.last_mut().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(kind: GeometryKind) -> BatchKey {
        BatchKey::new(Some("0".into()), None, kind, 0xffffff, None)
    }

    #[test]
    fn test_key_order_null_smallest() {
        let a = BatchKey::new(None, None, GeometryKind::Lines, 0, None);
        let b = BatchKey::new(Some("".into()), None, GeometryKind::Lines, 0, None);
        let c = BatchKey::new(Some("0".into()), None, GeometryKind::Lines, 0, None);
        assert!(a < b && b < c);
    }

    #[test]
    fn test_key_order_component_precedence() {
        // Layer dominates kind; kind dominates color; color dominates line type.
        let a = BatchKey::new(Some("a".into()), None, GeometryKind::Triangles, 99, Some(5));
        let b = BatchKey::new(Some("b".into()), None, GeometryKind::Points, 0, None);
        assert!(a < b);

        let c = BatchKey::new(Some("a".into()), None, GeometryKind::Lines, 7, None);
        let d = BatchKey::new(Some("a".into()), None, GeometryKind::IndexedLines, 0, None);
        assert!(c < d);
    }

    #[test]
    fn test_indexed_push_and_rebase() {
        let mut batch = RenderBatch::new(key(GeometryKind::IndexedTriangles));
        let quad = [
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(0.0, 1.0),
        ];
        batch.push_indexed(&quad, &[0, 1, 2, 0, 2, 3]).unwrap();
        batch.push_indexed(&quad, &[0, 1, 2, 0, 2, 3]).unwrap();

        let BatchData::Chunks(chunks) = batch.data() else {
            panic!()
        };
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].vertex_count(), 8);
        // The second write is rebased past the first four vertices.
        assert_eq!(&chunks[0].index_data()[6..], &[4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn test_index_out_of_range() {
        let mut batch = RenderBatch::new(key(GeometryKind::IndexedTriangles));
        let triangle = [DVec2::ZERO, DVec2::X, DVec2::Y];
        let result = batch.push_indexed(&triangle, &[0, 1, 3]);
        assert_eq!(
            result,
            Err(SceneError::IndexOutOfRange {
                index: 3,
                vertex_count: 3
            })
        );
    }

    #[test]
    fn test_chunk_overflow() {
        let mut batch = RenderBatch::new(key(GeometryKind::IndexedLines));
        let too_many = vec![DVec2::ZERO; MAX_CHUNK_VERTICES];
        let result = batch.push_indexed(&too_many, &[]);
        assert_eq!(
            result,
            Err(SceneError::ChunkVertexOverflow {
                requested: MAX_CHUNK_VERTICES
            })
        );
    }

    #[test]
    fn test_new_chunk_when_full() {
        let mut batch = RenderBatch::new(key(GeometryKind::IndexedLines));
        let big = vec![DVec2::ZERO; MAX_CHUNK_VERTICES - 1];
        batch.push_indexed(&big, &[0, 1]).unwrap();
        // Slack is 1, so a 2-vertex write opens a second chunk.
        batch.push_indexed(&[DVec2::ZERO, DVec2::X], &[0, 1]).unwrap();
        let BatchData::Chunks(chunks) = batch.data() else {
            panic!()
        };
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].vertex_count(), 2);
        // Every chunk respects the limit and rebases into its own region.
        for chunk in chunks {
            assert!(chunk.vertex_count() <= MAX_CHUNK_VERTICES);
            for &index in chunk.index_data() {
                assert!((index as usize) < chunk.vertex_count());
            }
        }
    }

    #[test]
    fn test_best_fit_prefers_smallest_slack() {
        let mut batch = RenderBatch::new(key(GeometryKind::IndexedLines));
        // First chunk nearly full (slack 10), second chunk roomy.
        batch
            .push_indexed(&vec![DVec2::ZERO; MAX_CHUNK_VERTICES - 10], &[])
            .unwrap();
        batch.push_indexed(&vec![DVec2::ZERO; 100], &[]).unwrap();
        // A 5-vertex write fits the tight chunk and must land there.
        batch.push_indexed(&vec![DVec2::ZERO; 5], &[]).unwrap();
        let BatchData::Chunks(chunks) = batch.data() else {
            panic!()
        };
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].vertex_count(), MAX_CHUNK_VERTICES - 5);
        assert_eq!(chunks[1].vertex_count(), 100);
    }

    #[test]
    fn test_merge_vertices_with_transform() {
        let mut source = RenderBatch::new(key(GeometryKind::Lines));
        source.push_vertex(DVec2::new(0.0, 0.0));
        source.push_vertex(DVec2::new(1.0, 0.0));

        let mut target = RenderBatch::new(key(GeometryKind::Lines));
        target
            .merge(&source, |v| v + DVec2::new(10.0, 0.0))
            .unwrap();
        let BatchData::Vertices(buffer) = target.data() else {
            panic!()
        };
        assert_eq!(buffer.as_slice(), &[10.0, 0.0, 11.0, 0.0]);
    }

    #[test]
    fn test_merge_chunks_reserves_per_source_chunk() {
        let mut source = RenderBatch::new(key(GeometryKind::IndexedTriangles));
        source
            .push_indexed(&[DVec2::ZERO, DVec2::X, DVec2::Y], &[0, 1, 2])
            .unwrap();

        let mut target = RenderBatch::new(key(GeometryKind::IndexedTriangles));
        target
            .push_indexed(&[DVec2::ZERO, DVec2::X, DVec2::Y], &[0, 1, 2])
            .unwrap();
        target.merge(&source, |v| v).unwrap();

        let BatchData::Chunks(chunks) = target.data() else {
            panic!()
        };
        // The merge does not append into the existing chunk.
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].index_data(), &[0, 1, 2]);
    }

    #[test]
    fn test_merge_instanced_fails() {
        let source = RenderBatch::new(key(GeometryKind::BlockInstance));
        let mut target = RenderBatch::new(key(GeometryKind::BlockInstance));
        assert_eq!(target.merge(&source, |v| v), Err(SceneError::InstancedMerge));
    }

    #[test]
    fn test_vertex_count_mismatch() {
        let mut chunk = IndexedChunk::new(16);
        let result = chunk.write(3, &[DVec2::ZERO, DVec2::X], &[0, 1]);
        assert_eq!(
            result,
            Err(SceneError::VertexCountMismatch {
                reserved: 3,
                written: 2
            })
        );
    }
}
