//! Scene assembly.
//!
//! Two passes over the drawing: block usage statistics plus definition
//! building, then top-level entity processing. Vertices outside block
//! definitions are relocated against a lazily captured scene origin to keep
//! f32 coordinates precise; definition vertices are stored relative to
//! their block's own offset. Serialization walks the ordered batch map and
//! packs everything into three contiguous regions.

use crate::{
    BatchData, BatchKey, Block, BlockContextMode, ChunkDescriptor, Decomposed, Decomposer,
    GeometryKind, LineTypeInterner, RenderBatch, Scene, SceneBatch, SceneBatchData, SceneEntity,
    SceneEntityKind, SceneError, SceneLayer, SceneOptions, BY_BLOCK,
    color::{resolve_block_sentinel, resolve_color},
    decompose::point_shape_geometry,
};
use glam::DVec2;
use indexmap::IndexMap;
use linework_core::{Bounds, Transform};
use linework_dxf::{Drawing, Entity, EntityKind, Insert, Measurement};
use linework_geometry::PatternRegistry;
use linework_text::{Font, TextEngine, flatten_text, parse_mtext};
use std::collections::BTreeMap;

/// Name of the synthetic block holding `$PDMODE` shape markers.
pub const POINT_SHAPE_BLOCK: &str = "__point_shape";

/// Largest vertex count requested per indexed write; longer polylines are
/// split into connected pieces.
const MAX_INDEXED_REQUEST: usize = 0xffff;

/// Builds a [`Scene`] from a parsed drawing.
pub struct SceneBuilder {
    options: SceneOptions,
}

impl SceneBuilder {
    pub fn new(options: SceneOptions) -> Self {
        Self { options }
    }

    /// Consume the drawing and produce the packed scene.
    ///
    /// Fonts are tried in order for every glyph; pass an empty list to build
    /// without text (missing glyphs are reported, never fatal).
    pub fn build(
        self,
        drawing: &Drawing,
        fonts: Vec<Box<dyn Font>>,
    ) -> Result<Scene, SceneError> {
        let patterns = match drawing.header.measurement {
            Measurement::Imperial => PatternRegistry::imperial(),
            Measurement::Metric => PatternRegistry::metric(),
        };
        let mut state = BuildState {
            drawing,
            options: &self.options,
            patterns,
            text: TextEngine::new(fonts, &self.options.text),
            line_types: LineTypeInterner::new(),
            batches: BTreeMap::new(),
            blocks: IndexMap::new(),
            origin: None,
            bounds: Bounds::new(),
            point_shape_has_dot: false,
            point_shape_ready: false,
        };

        // Bad sampling parameters abort up front instead of surfacing as an
        // allocation failure deep inside tessellation.
        state.arc_context().validate()?;

        state.warm_fonts();
        state.collect_block_usage();
        state.build_block_definitions()?;
        state.process_entities()?;
        Ok(state.serialize())
    }
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self::new(SceneOptions::default())
    }
}

struct BuildState<'a> {
    drawing: &'a Drawing,
    options: &'a SceneOptions,
    patterns: PatternRegistry,
    text: TextEngine,
    line_types: LineTypeInterner,
    batches: BTreeMap<BatchKey, RenderBatch>,
    blocks: IndexMap<String, Block>,
    origin: Option<DVec2>,
    bounds: Bounds,
    point_shape_has_dot: bool,
    point_shape_ready: bool,
}

impl BuildState<'_> {
    /// Resolve every glyph of every string up front, latching misses.
    fn warm_fonts(&mut self) {
        let block_entities = self.drawing.blocks.values().flat_map(|b| b.entities.iter());
        for entity in self.drawing.entities.iter().chain(block_entities) {
            match &entity.kind {
                EntityKind::Text(text) => self.text.warm(&text.text),
                EntityKind::MText(mtext) => {
                    let flattened = flatten_text(&parse_mtext(&mtext.text));
                    self.text.warm(&flattened);
                }
                _ => {}
            }
        }
    }

    /// Stats pass: count top-level INSERT references per block.
    fn collect_block_usage(&mut self) {
        for entity in &self.drawing.entities {
            let EntityKind::Insert(insert) = &entity.kind else {
                continue;
            };
            let Some(record) = self.drawing.blocks.get(&insert.name) else {
                // Reported again (and skipped) during the entity pass.
                continue;
            };
            let block = self
                .blocks
                .entry(insert.name.clone())
                .or_insert_with(|| Block::new(&insert.name, record.base_point));
            block.use_count += 1;
        }
    }

    /// Build every referenced block's definition and decide flattening.
    fn build_block_definitions(&mut self) -> Result<(), SceneError> {
        let names: Vec<String> = self
            .drawing
            .blocks
            .keys()
            .filter(|name| {
                self.blocks
                    .get(name.as_str())
                    .is_some_and(|block| block.use_count > 0)
            })
            .cloned()
            .collect();
        for name in names {
            let mut stack = Vec::new();
            self.define_block_entities(&name, &name, Transform::IDENTITY, &mut stack)?;
        }
        for block in self.blocks.values_mut() {
            block.decide_flatten();
        }
        Ok(())
    }

    /// Decompose `record_name`'s entities into `owner`'s definition batches.
    ///
    /// Nested INSERTs are inlined recursively with the composed transform;
    /// recursive references are skipped with a warning.
    fn define_block_entities(
        &mut self,
        owner: &str,
        record_name: &str,
        transform: Transform,
        stack: &mut Vec<String>,
    ) -> Result<(), SceneError> {
        if stack.iter().any(|name| name == record_name) {
            tracing::warn!(block = %record_name, "Recursive block reference, skipping");
            return Ok(());
        }
        stack.push(record_name.to_string());

        let drawing = self.drawing;
        let Some(record) = drawing.blocks.get(record_name) else {
            stack.pop();
            return Ok(());
        };
        for entity in &record.entities {
            if let EntityKind::Insert(insert) = &entity.kind {
                self.define_nested_insert(owner, entity, insert, transform, stack)?;
                continue;
            }
            let mut out = Vec::new();
            {
                let mut decomposer = Decomposer {
                    tables: &self.drawing.tables,
                    header: &self.drawing.header,
                    options: self.options,
                    patterns: &self.patterns,
                    text: &mut self.text,
                    line_types: &mut self.line_types,
                    in_block: true,
                };
                decomposer.decompose(entity, &mut out)?;
            }
            for item in out {
                match item {
                    Decomposed::Entity(scene_entity) => {
                        self.store_definition_entity(owner, scene_entity, &transform)?;
                    }
                    Decomposed::PointInstance {
                        position, color, ..
                    } => {
                        // Inside a definition the marker is inlined rather
                        // than instanced.
                        self.inline_point_shape(owner, position, color, &transform)?;
                    }
                }
            }
        }

        stack.pop();
        Ok(())
    }

    fn define_nested_insert(
        &mut self,
        owner: &str,
        entity: &Entity,
        insert: &Insert,
        parent: Transform,
        stack: &mut Vec<String>,
    ) -> Result<(), SceneError> {
        let Some(record) = self.drawing.blocks.get(&insert.name) else {
            tracing::warn!(block = %insert.name, "Unresolved nested block reference, skipping");
            return Ok(());
        };
        // The nested block's entities are inlined into the owner, so only
        // its base point matters here; no usage stats are recorded and no
        // registry entry is created for nested-only blocks.
        let nested = Block::new(&insert.name, record.base_point);
        let insertion = nested.insertion_transform(
            insert,
            BlockContextMode::NestedDefinition,
            entity.common.is_mirrored(),
        );
        let composed = insertion.then(&parent);
        self.define_block_entities(owner, &insert.name, composed, stack)
    }

    /// Transform a decomposed definition entity into the owner's offset
    /// space and write it into the owner's definition batches.
    fn store_definition_entity(
        &mut self,
        owner: &str,
        mut entity: SceneEntity,
        transform: &Transform,
    ) -> Result<(), SceneError> {
        {
            let block = self
                .blocks
                .get_mut(owner)
                .expect("definition owner must be registered");
            for vertex in &mut entity.vertices {
                *vertex = block.store_vertex(transform.transform_point(*vertex));
            }
        }
        self.push_scene_entity(entity, Some(owner))
    }

    /// Inline the point-shape marker geometry into a block definition.
    fn inline_point_shape(
        &mut self,
        owner: &str,
        position: DVec2,
        color: i32,
        transform: &Transform,
    ) -> Result<(), SceneError> {
        let decomposer_ctx = self.arc_context();
        let (segments, circle, has_dot) = point_shape_geometry(
            self.drawing.header.pd_mode,
            self.point_display_size(),
            &decomposer_ctx,
        );
        self.point_shape_has_dot |= has_dot;
        let place = Transform::translate(position).then(transform);
        if !segments.is_empty() {
            let mut entity = SceneEntity::new(SceneEntityKind::LineSegments, segments);
            entity.color = color;
            self.store_definition_entity(owner, entity, &place)?;
        }
        if !circle.is_empty() {
            let mut entity = SceneEntity::new(SceneEntityKind::Polyline, circle);
            entity.color = color;
            entity.closed = true;
            self.store_definition_entity(owner, entity, &place)?;
        }
        Ok(())
    }

    /// Second pass: top-level entities in input order.
    fn process_entities(&mut self) -> Result<(), SceneError> {
        let drawing = self.drawing;
        for entity in &drawing.entities {
            if let EntityKind::Insert(insert) = &entity.kind {
                self.place_insert(entity, insert)?;
                continue;
            }
            let mut out = Vec::new();
            {
                let mut decomposer = Decomposer {
                    tables: &self.drawing.tables,
                    header: &self.drawing.header,
                    options: self.options,
                    patterns: &self.patterns,
                    text: &mut self.text,
                    line_types: &mut self.line_types,
                    in_block: false,
                };
                decomposer.decompose(entity, &mut out)?;
            }
            for item in out {
                match item {
                    Decomposed::Entity(mut scene_entity) => {
                        for vertex in &mut scene_entity.vertices {
                            *vertex = self.finalize_vertex(*vertex);
                        }
                        self.push_scene_entity(scene_entity, None)?;
                    }
                    Decomposed::PointInstance {
                        position,
                        layer,
                        color,
                    } => self.place_point_instance(position, layer, color)?,
                }
            }
        }
        Ok(())
    }

    /// Track bounds, capture the origin from the first top-level vertex and
    /// return the relocated position.
    fn finalize_vertex(&mut self, vertex: DVec2) -> DVec2 {
        let origin = *self.origin.get_or_insert(vertex);
        self.bounds.add_point(vertex);
        vertex - origin
    }

    /// Place a top-level INSERT: merge when flattened, instance otherwise.
    fn place_insert(&mut self, entity: &Entity, insert: &Insert) -> Result<(), SceneError> {
        if !self.blocks.contains_key(&insert.name) {
            tracing::warn!(block = %insert.name, "Unresolved block reference, skipping");
            return Ok(());
        }

        let layer_name = entity
            .common
            .layer
            .clone()
            .unwrap_or_else(|| "0".to_string());
        let layer_color = self.drawing.tables.layer_color(&layer_name);
        let instance_color =
            resolve_color(&entity.common, &self.drawing.tables, Some(&layer_name), false);
        let mirrored = entity.common.is_mirrored();

        let block = &self.blocks[&insert.name];
        let flatten = block.flatten;
        let insertion =
            block.insertion_transform(insert, BlockContextMode::Instantiation, mirrored);

        if flatten {
            let def_keys = block.batch_keys.clone();
            for def_key in def_keys {
                let target_key = BatchKey::new(
                    Some(layer_name.clone()),
                    None,
                    def_key.kind,
                    resolve_block_sentinel(def_key.color, instance_color, layer_color),
                    def_key.line_type,
                );
                let mut target = self
                    .batches
                    .remove(&target_key)
                    .unwrap_or_else(|| RenderBatch::new(target_key.clone()));
                let source = self
                    .batches
                    .get(&def_key)
                    .expect("definition batch must exist");
                let origin = &mut self.origin;
                let bounds = &mut self.bounds;
                target.merge(source, |vertex| {
                    let world = insertion.transform_point(vertex);
                    let origin = *origin.get_or_insert(world);
                    bounds.add_point(world);
                    world - origin
                })?;
                self.batches.insert(target_key, target);
            }
        } else {
            if block.batch_keys.is_empty() {
                // Nothing to draw for this block.
                return Ok(());
            }
            if self.origin.is_none() {
                self.origin = Some(insert.position);
            }
            let origin = self.origin.unwrap();
            let key = BatchKey::new(
                Some(layer_name),
                Some(insert.name.clone()),
                GeometryKind::BlockInstance,
                instance_color,
                None,
            );
            let transform = insertion.then_translate(-origin);
            self.batches
                .entry(key.clone())
                .or_insert_with(|| RenderBatch::new(key))
                .push_transform(transform.to_rows_3x2());
        }
        Ok(())
    }

    /// Place one instance of the synthetic point-shape block.
    fn place_point_instance(
        &mut self,
        position: DVec2,
        layer: Option<String>,
        color: i32,
    ) -> Result<(), SceneError> {
        self.ensure_point_shape_block()?;
        if self.origin.is_none() {
            self.origin = Some(position);
        }
        let origin = self.origin.unwrap();
        let offset = self.blocks[POINT_SHAPE_BLOCK].offset.unwrap_or(DVec2::ZERO);

        let key = BatchKey::new(
            layer,
            Some(POINT_SHAPE_BLOCK.to_string()),
            GeometryKind::PointInstance,
            color,
            None,
        );
        let transform = Transform::translate(offset + position - origin);
        self.batches
            .entry(key.clone())
            .or_insert_with(|| RenderBatch::new(key))
            .push_transform(transform.to_rows_3x2());
        Ok(())
    }

    /// Build the point-shape block definition once, from the current
    /// `$PDMODE`/`$PDSIZE`.
    fn ensure_point_shape_block(&mut self) -> Result<(), SceneError> {
        if self.point_shape_ready {
            return Ok(());
        }
        self.point_shape_ready = true;
        let (segments, circle, has_dot) = point_shape_geometry(
            self.drawing.header.pd_mode,
            self.point_display_size(),
            &self.arc_context(),
        );
        self.point_shape_has_dot = has_dot;
        self.blocks.insert(
            POINT_SHAPE_BLOCK.to_string(),
            Block::new(POINT_SHAPE_BLOCK, DVec2::ZERO),
        );
        if !segments.is_empty() {
            let mut entity = SceneEntity::new(SceneEntityKind::LineSegments, segments);
            entity.color = BY_BLOCK;
            self.store_definition_entity(POINT_SHAPE_BLOCK, entity, &Transform::IDENTITY)?;
        }
        if !circle.is_empty() {
            let mut entity = SceneEntity::new(SceneEntityKind::Polyline, circle);
            entity.color = BY_BLOCK;
            entity.closed = true;
            self.store_definition_entity(POINT_SHAPE_BLOCK, entity, &Transform::IDENTITY)?;
        }
        Ok(())
    }

    fn arc_context(&self) -> linework_geometry::ArcContext {
        linework_geometry::ArcContext {
            ang_base: self.drawing.header.ang_base,
            clockwise: self.drawing.header.ang_dir
                == linework_dxf::AngularDirection::Clockwise,
            tessellation_angle: self.options.arc_tessellation_angle,
            min_subdivisions: self.options.min_arc_tessellation_subdivisions,
        }
    }

    fn point_display_size(&self) -> f64 {
        if self.drawing.header.pd_size > 0.0 {
            self.drawing.header.pd_size
        } else {
            self.options.point_shape_size
        }
    }

    /// Write one finalized internal entity into its batch.
    fn push_scene_entity(
        &mut self,
        entity: SceneEntity,
        block: Option<&str>,
    ) -> Result<(), SceneError> {
        if entity.vertices.is_empty() {
            return Ok(());
        }
        let kind = batch_kind(&entity);
        let key = BatchKey::new(
            entity.layer.clone(),
            block.map(String::from),
            kind,
            entity.color,
            entity.line_type,
        );
        let batch = self
            .batches
            .entry(key.clone())
            .or_insert_with(|| RenderBatch::new(key.clone()));

        match kind {
            GeometryKind::Points | GeometryKind::Lines | GeometryKind::Triangles => {
                for &vertex in &entity.vertices {
                    batch.push_vertex(vertex);
                }
            }
            GeometryKind::IndexedLines => {
                push_polyline_pieces(batch, &entity.vertices, entity.closed)?;
            }
            GeometryKind::IndexedTriangles => {
                batch.push_indexed(&entity.vertices, &entity.indices)?;
            }
            GeometryKind::BlockInstance | GeometryKind::PointInstance => {
                unreachable!("instanced batches are not fed from entities")
            }
        }

        if let Some(name) = block {
            self.blocks
                .get_mut(name)
                .expect("definition owner must be registered")
                .add_batch_key(&key);
        }
        Ok(())
    }

    /// Pack everything into the final contiguous regions.
    fn serialize(self) -> Scene {
        let skip = |key: &BatchKey| -> bool {
            key.block
                .as_deref()
                .and_then(|name| self.blocks.get(name))
                .is_some_and(|block| block.flatten)
        };

        let mut vertex_total = 0usize;
        let mut index_total = 0usize;
        let mut transform_total = 0usize;
        for (key, batch) in &self.batches {
            if skip(key) {
                continue;
            }
            vertex_total += batch.vertex_elements();
            index_total += batch.index_elements();
            transform_total += batch.transform_elements();
        }

        let mut vertices = vec![0f32; vertex_total];
        let mut indices = vec![0u16; index_total];
        let mut transforms = vec![0f32; transform_total];
        let mut vertex_offset = 0usize;
        let mut index_offset = 0usize;
        let mut transform_offset = 0usize;
        let mut batches = Vec::new();

        for (key, batch) in &self.batches {
            if skip(key) {
                continue;
            }
            let data = match batch.data() {
                BatchData::Vertices(buffer) => {
                    buffer.copy_to(&mut vertices, vertex_offset);
                    let descriptor = SceneBatchData::Vertices {
                        offset: vertex_offset as u32,
                        size: buffer.len() as u32,
                    };
                    vertex_offset += buffer.len();
                    descriptor
                }
                BatchData::Chunks(chunks) => {
                    let mut descriptors = Vec::with_capacity(chunks.len());
                    for chunk in chunks {
                        let vertex_data = chunk.vertex_data();
                        let index_data = chunk.index_data();
                        vertices[vertex_offset..vertex_offset + vertex_data.len()]
                            .copy_from_slice(vertex_data);
                        indices[index_offset..index_offset + index_data.len()]
                            .copy_from_slice(index_data);
                        descriptors.push(ChunkDescriptor {
                            vertices_offset: vertex_offset as u32,
                            vertices_size: vertex_data.len() as u32,
                            indices_offset: index_offset as u32,
                            indices_size: index_data.len() as u32,
                        });
                        vertex_offset += vertex_data.len();
                        index_offset += index_data.len();
                    }
                    SceneBatchData::Chunks(descriptors)
                }
                BatchData::Transforms(buffer) => {
                    buffer.copy_to(&mut transforms, transform_offset);
                    let descriptor = SceneBatchData::Transforms {
                        offset: transform_offset as u32,
                        size: buffer.len() as u32,
                    };
                    transform_offset += buffer.len();
                    descriptor
                }
            };
            batches.push(SceneBatch {
                key: key.clone(),
                data,
            });
        }

        let layers = self
            .drawing
            .tables
            .layers
            .values()
            .map(|layer| SceneLayer {
                name: layer.name.clone(),
                color: layer.color,
            })
            .collect();

        Scene {
            vertices: bytemuck::cast_slice(&vertices).to_vec(),
            indices: bytemuck::cast_slice(&indices).to_vec(),
            transforms: bytemuck::cast_slice(&transforms).to_vec(),
            batches,
            layers,
            origin: self.origin.unwrap_or(DVec2::ZERO),
            bounds: self.bounds,
            has_missing_chars: self.text.has_missing_chars(),
            point_shape_has_dot: self.point_shape_has_dot,
        }
    }
}

/// Batch geometry kind for an internal entity.
fn batch_kind(entity: &SceneEntity) -> GeometryKind {
    match entity.kind {
        SceneEntityKind::Points => GeometryKind::Points,
        SceneEntityKind::LineSegments => GeometryKind::Lines,
        SceneEntityKind::Polyline => {
            if entity.vertices.len() <= 2 {
                GeometryKind::Lines
            } else {
                GeometryKind::IndexedLines
            }
        }
        SceneEntityKind::Triangles => {
            if entity.indices.is_empty() {
                GeometryKind::Triangles
            } else {
                GeometryKind::IndexedTriangles
            }
        }
    }
}

/// Write a polyline as indexed segment lists, splitting chains too long for
/// one chunk into connected pieces.
fn push_polyline_pieces(
    batch: &mut RenderBatch,
    vertices: &[DVec2],
    closed: bool,
) -> Result<(), SceneError> {
    let count = vertices.len();
    if count <= MAX_INDEXED_REQUEST {
        let mut indices = Vec::with_capacity(2 * count);
        for i in 0..count as u32 - 1 {
            indices.push(i);
            indices.push(i + 1);
        }
        if closed {
            indices.push(count as u32 - 1);
            indices.push(0);
        }
        return batch.push_indexed(vertices, &indices);
    }

    let mut start = 0usize;
    while start + 1 < count {
        let end = (start + MAX_INDEXED_REQUEST).min(count);
        let piece = &vertices[start..end];
        let mut indices = Vec::with_capacity(2 * piece.len());
        for i in 0..piece.len() as u32 - 1 {
            indices.push(i);
            indices.push(i + 1);
        }
        batch.push_indexed(piece, &indices)?;
        if end == count {
            break;
        }
        // Pieces share their joint vertex.
        start = end - 1;
    }
    if closed {
        batch.push_indexed(&[vertices[count - 1], vertices[0]], &[0, 1])?;
    }
    Ok(())
}
