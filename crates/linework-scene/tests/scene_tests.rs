//! End-to-end scene building tests over whole drawings.

use glam::DVec2;
use linework_dxf::{
    Arc as DxfArc, BlockRecord, BoundaryLoop, BoundaryPath, Circle, Drawing, Entity, EntityKind,
    Hatch, HatchDefinitionLine, HatchStyle, Insert, Layer, Line, MText, Point, Polyline,
    PolylineVertex, Text,
};
use linework_scene::{
    BatchKey, GeometryKind, POINT_SHAPE_BLOCK, Scene, SceneBatchData, SceneBuilder, SceneOptions,
};
use linework_text::Font;
use linework_text::testing::StubFont;
use std::f64::consts::FRAC_PI_4;

fn line_entity(start: DVec2, end: DVec2) -> Entity {
    Entity::new(EntityKind::Line(Line { start, end }))
}

fn build(drawing: &Drawing) -> Scene {
    SceneBuilder::default().build(drawing, Vec::new()).unwrap()
}

fn build_with_fonts(drawing: &Drawing, fonts: Vec<Box<dyn Font>>) -> Scene {
    SceneBuilder::default().build(drawing, fonts).unwrap()
}

fn vertices_of(scene: &Scene, batch_index: usize) -> Vec<f32> {
    match &scene.batches[batch_index].data {
        SceneBatchData::Vertices { offset, size } => {
            scene.vertices_f32()[*offset as usize..(*offset + *size) as usize].to_vec()
        }
        other => panic!("expected a vertex batch, got {other:?}"),
    }
}

#[test]
fn test_single_line_scene() {
    // S1: one LINE on layer "L" with ACI color 1.
    let mut drawing = Drawing::new();
    drawing.add_layer(Layer::new("L", 0x888888));
    drawing.push_entity(
        line_entity(DVec2::ZERO, DVec2::new(10.0, 0.0))
            .on_layer("L")
            .with_color_index(1),
    );
    let scene = build(&drawing);

    assert_eq!(scene.batches.len(), 1);
    let batch = &scene.batches[0];
    assert_eq!(
        batch.key,
        BatchKey::new(Some("L".into()), None, GeometryKind::Lines, 0xff0000, None)
    );
    assert_eq!(vertices_of(&scene, 0), vec![0.0, 0.0, 10.0, 0.0]);
    assert_eq!(scene.origin, DVec2::ZERO);
    assert_eq!(scene.bounds.min_x, 0.0);
    assert_eq!(scene.bounds.max_x, 10.0);
    assert_eq!(scene.bounds.min_y, 0.0);
    assert_eq!(scene.bounds.max_y, 0.0);
    assert_eq!(scene.layers.len(), 1);
    assert_eq!(scene.layers[0].name, "L");
}

#[test]
fn test_circle_tessellation_scene() {
    // S2: circle sampled at π/4 → exactly 8 vertices, first at (7, 5).
    let mut drawing = Drawing::new();
    drawing.push_entity(Entity::new(EntityKind::Circle(Circle {
        center: DVec2::new(5.0, 5.0),
        radius: 2.0,
    })));
    let options = SceneOptions {
        arc_tessellation_angle: FRAC_PI_4,
        ..Default::default()
    };
    let scene = SceneBuilder::new(options).build(&drawing, Vec::new()).unwrap();

    assert_eq!(scene.batches.len(), 1);
    let batch = &scene.batches[0];
    assert_eq!(batch.key.kind, GeometryKind::IndexedLines);
    let SceneBatchData::Chunks(chunks) = &batch.data else {
        panic!("expected chunks");
    };
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].vertices_size, 16); // 8 vertices
    assert_eq!(chunks[0].indices_size, 16); // 8 closed segments

    // First sample is on the +x axis; the origin captured it.
    assert_eq!(scene.origin, DVec2::new(7.0, 5.0));
    let stored = scene.vertices_f32();
    assert_eq!(&stored[0..2], &[0.0, 0.0]);
    assert!((scene.bounds.min_x - 3.0).abs() < 1e-9);
    assert!((scene.bounds.max_x - 7.0).abs() < 1e-9);
}

#[test]
fn test_invalid_tessellation_angle_is_an_error() {
    let mut drawing = Drawing::new();
    drawing.push_entity(Entity::new(EntityKind::Circle(Circle {
        center: DVec2::ZERO,
        radius: 1.0,
    })));
    let options = SceneOptions {
        arc_tessellation_angle: 0.0,
        ..Default::default()
    };
    let result = SceneBuilder::new(options).build(&drawing, Vec::new());
    assert!(matches!(
        result,
        Err(linework_scene::SceneError::Tessellation(
            linework_geometry::TessellationError::InvalidParameter {
                name: "arc_tessellation_angle",
                ..
            }
        ))
    ));
}

#[test]
fn test_flattened_block() {
    // S3: tiny block used twice is flattened into one LINES batch.
    let mut drawing = Drawing::new();
    drawing.add_layer(Layer::new("L", 0x123456));
    let mut block = BlockRecord::new("A", DVec2::ZERO);
    block
        .entities
        .push(line_entity(DVec2::ZERO, DVec2::new(1.0, 0.0)));
    drawing.add_block(block);
    drawing.push_entity(
        Entity::new(EntityKind::Insert(Insert::new("A", DVec2::new(10.0, 0.0)))).on_layer("L"),
    );
    drawing.push_entity(
        Entity::new(EntityKind::Insert(Insert::new("A", DVec2::new(20.0, 0.0)))).on_layer("L"),
    );
    let scene = build(&drawing);

    assert_eq!(scene.batches.len(), 1);
    let batch = &scene.batches[0];
    assert_eq!(batch.key.kind, GeometryKind::Lines);
    assert_eq!(batch.key.layer.as_deref(), Some("L"));
    assert_eq!(batch.key.block, None);
    // BYLAYER inside the block dereferences to the layer color.
    assert_eq!(batch.key.color, 0x123456);

    assert_eq!(scene.origin, DVec2::new(10.0, 0.0));
    let stored = vertices_of(&scene, 0);
    assert_eq!(stored, vec![0.0, 0.0, 1.0, 0.0, 10.0, 0.0, 11.0, 0.0]);
    // Recover world coordinates by adding the origin back.
    let world: Vec<f64> = stored
        .chunks(2)
        .flat_map(|v| [v[0] as f64 + scene.origin.x, v[1] as f64 + scene.origin.y])
        .collect();
    assert_eq!(world, vec![10.0, 0.0, 11.0, 0.0, 20.0, 0.0, 21.0, 0.0]);
}

#[test]
fn test_instanced_block() {
    // S4: a 2000-vertex block referenced 10 times stays instanced.
    let mut drawing = Drawing::new();
    let mut block = BlockRecord::new("B", DVec2::ZERO);
    let vertices: Vec<PolylineVertex> = (0..2000)
        .map(|i| PolylineVertex::new(DVec2::new(i as f64, (i % 7) as f64)))
        .collect();
    block.entities.push(Entity::new(EntityKind::Polyline(Polyline {
        vertices,
        closed: false,
    })));
    drawing.add_block(block);
    for i in 0..10 {
        drawing.push_entity(Entity::new(EntityKind::Insert(Insert::new(
            "B",
            DVec2::new(i as f64 * 100.0, 0.0),
        ))));
    }
    let scene = build(&drawing);

    let instance_batches: Vec<_> = scene
        .batches
        .iter()
        .filter(|b| b.key.kind == GeometryKind::BlockInstance)
        .collect();
    assert_eq!(instance_batches.len(), 1);
    let SceneBatchData::Transforms { size, .. } = instance_batches[0].data else {
        panic!("expected transforms");
    };
    // Ten instances, six floats each.
    assert_eq!(size, 60);

    let definition_batches: Vec<_> = scene
        .batches
        .iter()
        .filter(|b| b.key.block.as_deref() == Some("B") && b.key.kind == GeometryKind::IndexedLines)
        .collect();
    assert_eq!(definition_batches.len(), 1);

    // Transform of the first instance places the block at its insertion
    // point relative to the scene origin.
    let transforms = scene.transforms_f32();
    assert_eq!(transforms.len(), 60);
    assert_eq!(&transforms[0..6], &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    // Second instance is translated by 100 in x.
    assert_eq!(&transforms[6..12], &[1.0, 0.0, 100.0, 0.0, 1.0, 0.0]);
}

#[test]
fn test_recursive_block_skipped() {
    // S7: a block inserting itself contributes nothing from the recursion.
    let mut drawing = Drawing::new();
    let mut block = BlockRecord::new("A", DVec2::ZERO);
    block
        .entities
        .push(line_entity(DVec2::ZERO, DVec2::new(1.0, 0.0)));
    block
        .entities
        .push(Entity::new(EntityKind::Insert(Insert::new("A", DVec2::new(5.0, 5.0)))));
    drawing.add_block(block);
    drawing.push_entity(Entity::new(EntityKind::Insert(Insert::new(
        "A",
        DVec2::ZERO,
    ))));
    let scene = build(&drawing);

    // Only the direct line survives: one flattened segment, two vertices.
    assert_eq!(scene.vertices_f32().len(), 4);
}

#[test]
fn test_unresolved_block_skipped() {
    let mut drawing = Drawing::new();
    drawing.push_entity(Entity::new(EntityKind::Insert(Insert::new(
        "missing",
        DVec2::ZERO,
    ))));
    drawing.push_entity(line_entity(DVec2::ZERO, DVec2::new(1.0, 0.0)));
    let scene = build(&drawing);
    assert_eq!(scene.batches.len(), 1);
    assert_eq!(scene.vertices_f32().len(), 4);
}

#[test]
fn test_hatch_scene() {
    // A square boundary with one inline horizontal pattern line at y = 5.
    let mut drawing = Drawing::new();
    let square = vec![
        PolylineVertex::new(DVec2::new(0.0, 0.0)),
        PolylineVertex::new(DVec2::new(10.0, 0.0)),
        PolylineVertex::new(DVec2::new(10.0, 10.0)),
        PolylineVertex::new(DVec2::new(0.0, 10.0)),
    ];
    drawing.push_entity(Entity::new(EntityKind::Hatch(Hatch {
        pattern_name: "CUSTOM".into(),
        is_solid: false,
        pattern_angle: 0.0,
        pattern_scale: 1.0,
        style: HatchStyle::OddParity,
        boundary_loops: vec![BoundaryLoop {
            external: true,
            outermost: false,
            path: BoundaryPath::Polyline {
                vertices: square,
                closed: true,
            },
        }],
        definition_lines: vec![HatchDefinitionLine {
            angle: 0.0,
            base: DVec2::new(0.0, 5.0),
            offset: DVec2::new(0.0, 100.0),
            dashes: Vec::new(),
        }],
        seed_points: Vec::new(),
    })));
    let scene = build(&drawing);

    assert_eq!(scene.batches.len(), 1);
    let batch = &scene.batches[0];
    assert_eq!(batch.key.kind, GeometryKind::Lines);
    let stored = vertices_of(&scene, 0);
    assert_eq!(stored.len(), 4);
    // One full-width segment at y = 5.
    let y0 = stored[1] as f64 + scene.origin.y;
    let y1 = stored[3] as f64 + scene.origin.y;
    assert!((y0 - 5.0).abs() < 1e-6);
    assert!((y1 - 5.0).abs() < 1e-6);
    let x0 = stored[0] as f64 + scene.origin.x;
    let x1 = stored[2] as f64 + scene.origin.x;
    assert!((x0.min(x1) - 0.0).abs() < 1e-6);
    assert!((x0.max(x1) - 10.0).abs() < 1e-6);
}

#[test]
fn test_point_markers() {
    // Cross marker emits two segments directly.
    let mut drawing = Drawing::new();
    drawing.header.pd_mode = 3;
    drawing.header.pd_size = 2.0;
    drawing.push_entity(Entity::new(EntityKind::Point(Point {
        position: DVec2::new(5.0, 5.0),
    })));
    let scene = build(&drawing);
    assert_eq!(scene.batches.len(), 1);
    assert_eq!(scene.batches[0].key.kind, GeometryKind::Lines);
    assert_eq!(vertices_of(&scene, 0).len(), 8);
    assert!(!scene.point_shape_has_dot);
}

#[test]
fn test_point_shape_instancing() {
    // Square shape bit: the marker becomes a point-shape instance.
    let mut drawing = Drawing::new();
    drawing.header.pd_mode = 64;
    drawing.header.pd_size = 2.0;
    drawing.push_entity(Entity::new(EntityKind::Point(Point {
        position: DVec2::new(5.0, 5.0),
    })));
    drawing.push_entity(Entity::new(EntityKind::Point(Point {
        position: DVec2::new(9.0, 5.0),
    })));
    let scene = build(&drawing);

    // PDMODE 64 keeps the dot base marker.
    assert!(scene.point_shape_has_dot);
    let instance_batch = scene
        .batches
        .iter()
        .find(|b| b.key.kind == GeometryKind::PointInstance)
        .expect("point instance batch");
    assert_eq!(instance_batch.key.block.as_deref(), Some(POINT_SHAPE_BLOCK));
    let SceneBatchData::Transforms { size, .. } = instance_batch.data else {
        panic!("expected transforms");
    };
    assert_eq!(size, 12);

    // The square outline lives in the shape block's definition batches.
    assert!(scene
        .batches
        .iter()
        .any(|b| b.key.block.as_deref() == Some(POINT_SHAPE_BLOCK)
            && b.key.kind == GeometryKind::Lines));
}

#[test]
fn test_text_batches_and_missing_glyphs() {
    let mut drawing = Drawing::new();
    drawing.push_entity(Entity::new(EntityKind::Text(Text {
        text: "AB".into(),
        position: DVec2::ZERO,
        end_position: None,
        height: 2.0,
        rotation: 0.0,
        h_align: Default::default(),
        v_align: Default::default(),
    })));
    let scene = build_with_fonts(&drawing, vec![Box::new(StubFont::new())]);
    assert!(!scene.has_missing_chars);
    assert!(scene
        .batches
        .iter()
        .any(|b| b.key.kind == GeometryKind::IndexedTriangles));
    assert!(!scene.indices.is_empty());
}

#[test]
fn test_missing_glyph_latched() {
    let mut drawing = Drawing::new();
    drawing.push_entity(Entity::new(EntityKind::MText(MText {
        text: "caf\u{00E9}".into(),
        position: DVec2::ZERO,
        height: 1.0,
        width: None,
        rotation: 0.0,
        direction: None,
        attachment: Default::default(),
        line_spacing_factor: None,
        columns: None,
    })));
    let scene = build_with_fonts(&drawing, vec![Box::new(StubFont::new())]);
    // 'é' is outside the stub font; the miss latches scene-wide.
    assert!(scene.has_missing_chars);
}

#[test]
fn test_frozen_layer_skipped() {
    let mut drawing = Drawing::new();
    let mut layer = Layer::new("hidden", 0xffffff);
    layer.frozen = true;
    drawing.add_layer(layer);
    drawing.push_entity(line_entity(DVec2::ZERO, DVec2::X).on_layer("hidden"));
    let scene = build(&drawing);
    assert!(scene.batches.is_empty());
}

#[test]
fn test_serialized_sizes_match_descriptors() {
    // Invariant 3: region sizes equal the sums of descriptor sizes.
    let mut drawing = Drawing::new();
    drawing.push_entity(Entity::new(EntityKind::Circle(Circle {
        center: DVec2::ZERO,
        radius: 1.0,
    })));
    drawing.push_entity(line_entity(DVec2::ZERO, DVec2::new(4.0, 0.0)));
    drawing.push_entity(Entity::new(EntityKind::Arc(DxfArc {
        center: DVec2::new(10.0, 0.0),
        radius: 2.0,
        start_angle: Some(0.0),
        end_angle: Some(std::f64::consts::PI),
    })));
    let scene = build(&drawing);

    let mut vertex_sum = 0u32;
    let mut index_sum = 0u32;
    let mut transform_sum = 0u32;
    for batch in &scene.batches {
        match &batch.data {
            SceneBatchData::Vertices { size, .. } => vertex_sum += size,
            SceneBatchData::Transforms { size, .. } => transform_sum += size,
            SceneBatchData::Chunks(chunks) => {
                for chunk in chunks {
                    vertex_sum += chunk.vertices_size;
                    index_sum += chunk.indices_size;
                }
            }
        }
    }
    assert_eq!(scene.vertices_f32().len() as u32, vertex_sum);
    assert_eq!(scene.indices_u16().len() as u32, index_sum);
    assert_eq!(scene.transforms_f32().len() as u32, transform_sum);
}

#[test]
fn test_bounds_contain_all_vertices() {
    // Invariant 4: every stored vertex plus origin lies within bounds.
    let mut drawing = Drawing::new();
    drawing.push_entity(line_entity(DVec2::new(-5.0, 3.0), DVec2::new(8.0, -2.0)));
    drawing.push_entity(Entity::new(EntityKind::Circle(Circle {
        center: DVec2::new(20.0, 20.0),
        radius: 3.0,
    })));
    let scene = build(&drawing);

    for vertex in scene.vertices_f32().chunks(2) {
        let x = vertex[0] as f64 + scene.origin.x;
        let y = vertex[1] as f64 + scene.origin.y;
        assert!(x >= scene.bounds.min_x - 1e-6 && x <= scene.bounds.max_x + 1e-6);
        assert!(y >= scene.bounds.min_y - 1e-6 && y <= scene.bounds.max_y + 1e-6);
    }
}

#[test]
fn test_batch_order_strictly_ascending() {
    // Invariant 7: serialized batches are in strictly ascending key order.
    let mut drawing = Drawing::new();
    drawing.add_layer(Layer::new("a", 1));
    drawing.add_layer(Layer::new("b", 2));
    drawing.push_entity(line_entity(DVec2::ZERO, DVec2::X).on_layer("b").with_color_index(1));
    drawing.push_entity(line_entity(DVec2::ZERO, DVec2::X).on_layer("a").with_color_index(2));
    drawing.push_entity(line_entity(DVec2::ZERO, DVec2::X).on_layer("a").with_color_index(1));
    drawing.push_entity(Entity::new(EntityKind::Circle(Circle {
        center: DVec2::ZERO,
        radius: 1.0,
    })));
    let scene = build(&drawing);

    assert!(scene.batches.len() >= 4);
    for pair in scene.batches.windows(2) {
        assert!(pair[0].key < pair[1].key);
    }
}

#[test]
fn test_deterministic_output() {
    let mut drawing = Drawing::new();
    drawing.add_layer(Layer::new("L", 0xff00ff));
    let mut block = BlockRecord::new("A", DVec2::ZERO);
    block
        .entities
        .push(line_entity(DVec2::ZERO, DVec2::new(1.0, 1.0)));
    drawing.add_block(block);
    drawing.push_entity(Entity::new(EntityKind::Insert(Insert::new("A", DVec2::ZERO))));
    drawing.push_entity(
        line_entity(DVec2::new(3.0, 3.0), DVec2::new(4.0, 4.0)).on_layer("L"),
    );
    drawing.push_entity(Entity::new(EntityKind::Circle(Circle {
        center: DVec2::new(7.0, 7.0),
        radius: 1.5,
    })));

    let a = build(&drawing);
    let b = build(&drawing);
    assert_eq!(a.vertices, b.vertices);
    assert_eq!(a.indices, b.indices);
    assert_eq!(a.transforms, b.transforms);
    assert_eq!(a.batches, b.batches);
    assert_eq!(a.origin, b.origin);
}

#[test]
fn test_round_trip_precision() {
    // Invariant 8: positions survive decompose → pack → serialize to f32
    // precision once the origin shift is reversed.
    let base = DVec2::new(1.0e7, 5.0e6);
    let mut drawing = Drawing::new();
    drawing.push_entity(line_entity(base, base + DVec2::new(0.25, 0.125)));
    let scene = build(&drawing);

    let stored = scene.vertices_f32();
    let restored_x = stored[2] as f64 + scene.origin.x;
    let restored_y = stored[3] as f64 + scene.origin.y;
    // The origin relocation keeps the small offsets exact in f32.
    assert_eq!(restored_x, base.x + 0.25);
    assert_eq!(restored_y, base.y + 0.125);
}

#[test]
fn test_linear_dimension() {
    use linework_dxf::LinearDimension;
    let mut drawing = Drawing::new();
    drawing.push_entity(Entity::new(EntityKind::LinearDimension(LinearDimension {
        def_point: DVec2::new(0.0, 2.0),
        start: DVec2::new(0.0, 0.0),
        end: DVec2::new(10.0, 0.0),
        angle: 0.0,
        text: None,
        text_height: 0.5,
    })));
    let scene = build_with_fonts(&drawing, vec![Box::new(StubFont::new())]);

    // Extension and dimension lines.
    let lines = scene
        .batches
        .iter()
        .position(|b| b.key.kind == GeometryKind::Lines)
        .expect("dimension lines");
    let stored = vertices_of(&scene, lines);
    assert_eq!(stored.len(), 12);
    // The dimension line runs from (0,2) to (10,2).
    let x = stored[8] as f64 + scene.origin.x;
    let y = stored[9] as f64 + scene.origin.y;
    assert!((x - 0.0).abs() < 1e-6 && (y - 2.0).abs() < 1e-6);

    // Two arrowheads.
    let arrows = scene
        .batches
        .iter()
        .find(|b| b.key.kind == GeometryKind::Triangles)
        .expect("arrowheads");
    let SceneBatchData::Vertices { size, .. } = arrows.data else {
        panic!("expected plain triangles");
    };
    assert_eq!(size, 12);

    // Measurement text "10" was laid out with the stub font.
    assert!(scene
        .batches
        .iter()
        .any(|b| b.key.kind == GeometryKind::IndexedTriangles));
    assert!(!scene.has_missing_chars);
}

#[test]
fn test_line_type_separates_batches() {
    let mut drawing = Drawing::new();
    drawing.push_entity(line_entity(DVec2::ZERO, DVec2::X).with_line_type("DASHED"));
    drawing.push_entity(line_entity(DVec2::ZERO, DVec2::Y));
    let scene = build(&drawing);
    assert_eq!(scene.batches.len(), 2);
    // None sorts before the interned line type.
    assert_eq!(scene.batches[0].key.line_type, None);
    assert_eq!(scene.batches[1].key.line_type, Some(0));
}
