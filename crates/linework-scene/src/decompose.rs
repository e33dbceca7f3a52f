//! DXF entity decomposition.
//!
//! Normalizes every supported DXF entity type into the internal entity set,
//! tessellating curves, laying out text and clipping hatches on the way.
//! Entities on frozen layers and unhandled types are skipped with a
//! warning; INSERTs are handled by the block engine, not here.

use crate::{SceneEntity, SceneEntityKind, SceneError, color::resolve_color, options::SceneOptions};
use bitflags::bitflags;
use glam::DVec2;
use indexmap::IndexMap;
use linework_dxf as dxf;
use linework_dxf::{Entity, EntityCommon, EntityKind, Header, PolylineVertex, Tables};
use linework_geometry::{
    ArcContext, ArcParams, AreaFillStyle, ClipLoop, HatchClipper, Pattern, PatternLine,
    PatternRegistry, SplineCurve, pattern_fill_segments, tessellate_arc, tessellate_bulge,
};
use linework_text::{
    Attachment, ColumnLayout, HorizAlign, MTextLayout, RenderedGlyph, SingleLineText, TextEngine,
    VertAlign, parse_mtext,
};

/// Triangles with less than this doubled area are degenerate.
const TRIANGLE_AREA_EPS: f64 = 1e-12;

bitflags! {
    /// `$PDMODE` shape bits layered over the base marker.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PointShapeFlags: i32 {
        const CIRCLE = 32;
        const SQUARE = 64;
    }
}

/// `$PDMODE` base marker (the low bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointMarker {
    Dot,
    None,
    Plus,
    Cross,
    Tick,
}

impl PointMarker {
    pub fn from_mode(mode: i32) -> Self {
        match mode & !(PointShapeFlags::all().bits()) {
            0 => PointMarker::Dot,
            2 => PointMarker::Plus,
            3 => PointMarker::Cross,
            4 => PointMarker::Tick,
            _ => PointMarker::None,
        }
    }
}

/// Interns line-type names to small ids in first-use order.
#[derive(Debug, Default)]
pub struct LineTypeInterner {
    ids: IndexMap<String, u32>,
}

impl LineTypeInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.ids.len() as u32;
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One decomposition product.
#[derive(Debug)]
pub enum Decomposed {
    Entity(SceneEntity),
    /// A `$PDMODE` shape marker: one instance of the synthetic point-shape
    /// block at `position`.
    PointInstance {
        position: DVec2,
        layer: Option<String>,
        color: i32,
    },
}

/// Decomposition context shared by one pass.
pub struct Decomposer<'a> {
    pub tables: &'a Tables,
    pub header: &'a Header,
    pub options: &'a SceneOptions,
    pub patterns: &'a PatternRegistry,
    pub text: &'a mut TextEngine,
    pub line_types: &'a mut LineTypeInterner,
    /// Inside a block definition: layers stay unset and color sentinels are
    /// preserved.
    pub in_block: bool,
}

impl Decomposer<'_> {
    /// Angle conventions and sampling density for this drawing.
    pub fn arc_context(&self) -> ArcContext {
        ArcContext {
            ang_base: self.header.ang_base,
            clockwise: self.header.ang_dir == dxf::AngularDirection::Clockwise,
            tessellation_angle: self.options.arc_tessellation_angle,
            min_subdivisions: self.options.min_arc_tessellation_subdivisions,
        }
    }

    /// Decompose one entity, appending products to `out`.
    pub fn decompose(
        &mut self,
        entity: &Entity,
        out: &mut Vec<Decomposed>,
    ) -> Result<(), SceneError> {
        if self.layer_frozen(&entity.common) {
            return Ok(());
        }
        match &entity.kind {
            EntityKind::Line(line) => self.line(&entity.common, line, out),
            EntityKind::Polyline(polyline) => self.polyline(&entity.common, polyline, out),
            EntityKind::Arc(arc) => self.arc(&entity.common, arc, out),
            EntityKind::Circle(circle) => self.circle(&entity.common, circle, out),
            EntityKind::Ellipse(ellipse) => self.ellipse(&entity.common, ellipse, out),
            EntityKind::Point(point) => self.point(&entity.common, point, out),
            EntityKind::Spline(spline) => return self.spline(&entity.common, spline, out),
            EntityKind::Text(text) => self.text(&entity.common, text, out),
            EntityKind::MText(mtext) => self.mtext(&entity.common, mtext, out),
            EntityKind::Face3d(face) => self.face(&entity.common, &face.vertices, out),
            EntityKind::Solid(solid) => self.face(&entity.common, &solid.vertices, out),
            EntityKind::Hatch(hatch) => self.hatch(&entity.common, hatch, out),
            EntityKind::LinearDimension(dimension) => {
                self.linear_dimension(&entity.common, dimension, out)
            }
            EntityKind::Insert(_) => {
                // Placed by the block engine.
            }
            EntityKind::Unsupported(name) => {
                tracing::warn!(entity = %name, "Unhandled entity type, skipping");
            }
        }
        Ok(())
    }

    fn layer_frozen(&self, common: &EntityCommon) -> bool {
        common
            .layer
            .as_deref()
            .and_then(|name| self.tables.layers.get(name))
            .is_some_and(|layer| layer.frozen)
    }

    /// Resolved (layer, color, line type) for an entity.
    fn attributes(&mut self, common: &EntityCommon) -> (Option<String>, i32, Option<u32>) {
        let layer_name = common.layer.as_deref().unwrap_or("0");
        let color = resolve_color(common, self.tables, Some(layer_name), self.in_block);
        let layer = if self.in_block {
            None
        } else {
            Some(layer_name.to_string())
        };
        let line_type = common
            .line_type
            .as_deref()
            .map(|name| self.line_types.intern(name));
        (layer, color, line_type)
    }

    fn emit(
        &mut self,
        common: &EntityCommon,
        kind: SceneEntityKind,
        mut vertices: Vec<DVec2>,
        indices: Vec<u32>,
        closed: bool,
        out: &mut Vec<Decomposed>,
    ) {
        if vertices.is_empty() {
            return;
        }
        if common.is_mirrored() {
            for vertex in &mut vertices {
                vertex.x = -vertex.x;
            }
        }
        let (layer, color, line_type) = self.attributes(common);
        let entity = SceneEntity {
            kind,
            vertices,
            indices,
            layer,
            color,
            line_type,
            closed,
        };
        debug_assert!(entity.is_well_formed());
        out.push(Decomposed::Entity(entity));
    }

    fn line(&mut self, common: &EntityCommon, line: &dxf::Line, out: &mut Vec<Decomposed>) {
        self.emit(
            common,
            SceneEntityKind::LineSegments,
            vec![line.start, line.end],
            Vec::new(),
            false,
            out,
        );
    }

    fn polyline(
        &mut self,
        common: &EntityCommon,
        polyline: &dxf::Polyline,
        out: &mut Vec<Decomposed>,
    ) {
        let vertices: Vec<&PolylineVertex> = polyline
            .vertices
            .iter()
            .filter(|v| !v.spline_vertex && !v.curve_fitting_vertex)
            .collect();
        if vertices.len() < 2 {
            return;
        }
        let ctx = self.arc_context();

        let mut points = vec![vertices[0].position];
        for pair in vertices.windows(2) {
            expand_segment(pair[0], pair[1].position, &ctx, &mut points);
        }
        if polyline.closed {
            let last = vertices.last().unwrap();
            if last.bulge != 0.0 {
                // Arc back to the start; drop the duplicated first vertex.
                expand_segment(last, vertices[0].position, &ctx, &mut points);
                points.pop();
            }
        }
        self.emit(
            common,
            SceneEntityKind::Polyline,
            points,
            Vec::new(),
            polyline.closed,
            out,
        );
    }

    fn arc(&mut self, common: &EntityCommon, arc: &dxf::Arc, out: &mut Vec<Decomposed>) {
        let mut params = ArcParams::circle(arc.center, arc.radius);
        params.start_angle = arc.start_angle;
        params.end_angle = arc.end_angle;
        let sampled = tessellate_arc(&params, &self.arc_context());
        self.emit(
            common,
            SceneEntityKind::Polyline,
            sampled.vertices,
            Vec::new(),
            sampled.closed,
            out,
        );
    }

    fn circle(&mut self, common: &EntityCommon, circle: &dxf::Circle, out: &mut Vec<Decomposed>) {
        let sampled = tessellate_arc(
            &ArcParams::circle(circle.center, circle.radius),
            &self.arc_context(),
        );
        self.emit(
            common,
            SceneEntityKind::Polyline,
            sampled.vertices,
            Vec::new(),
            true,
            out,
        );
    }

    fn ellipse(
        &mut self,
        common: &EntityCommon,
        ellipse: &dxf::Ellipse,
        out: &mut Vec<Decomposed>,
    ) {
        let radius_x = ellipse.major_axis.length();
        let params = ArcParams {
            center: ellipse.center,
            radius_x,
            radius_y: Some(radius_x * ellipse.axis_ratio),
            start_angle: ellipse.start_angle,
            end_angle: ellipse.end_angle,
            rotation: ellipse.major_axis.y.atan2(ellipse.major_axis.x),
            transform: None,
        };
        let sampled = tessellate_arc(&params, &self.arc_context());
        self.emit(
            common,
            SceneEntityKind::Polyline,
            sampled.vertices,
            Vec::new(),
            sampled.closed,
            out,
        );
    }

    fn point(&mut self, common: &EntityCommon, point: &dxf::Point, out: &mut Vec<Decomposed>) {
        let marker = PointMarker::from_mode(self.header.pd_mode);
        let shape = PointShapeFlags::from_bits_truncate(self.header.pd_mode);
        let mut position = point.position;
        if common.is_mirrored() {
            position.x = -position.x;
        }

        if !shape.is_empty() {
            let (layer, color, _) = self.attributes(common);
            out.push(Decomposed::PointInstance {
                position,
                layer,
                color,
            });
            return;
        }

        let half = self.point_display_size() / 2.0;
        match marker {
            PointMarker::None => {}
            PointMarker::Dot => {
                self.emit(
                    common,
                    SceneEntityKind::Points,
                    vec![position],
                    Vec::new(),
                    false,
                    out,
                );
            }
            PointMarker::Plus => self.emit(
                common,
                SceneEntityKind::LineSegments,
                plus_marker(position, half),
                Vec::new(),
                false,
                out,
            ),
            PointMarker::Cross => self.emit(
                common,
                SceneEntityKind::LineSegments,
                cross_marker(position, half),
                Vec::new(),
                false,
                out,
            ),
            PointMarker::Tick => self.emit(
                common,
                SceneEntityKind::LineSegments,
                tick_marker(position, half),
                Vec::new(),
                false,
                out,
            ),
        }
    }

    /// `$PDSIZE`, or the configured fallback for non-positive values.
    pub fn point_display_size(&self) -> f64 {
        if self.header.pd_size > 0.0 {
            self.header.pd_size
        } else {
            self.options.point_shape_size
        }
    }

    fn spline(
        &mut self,
        common: &EntityCommon,
        spline: &dxf::Spline,
        out: &mut Vec<Decomposed>,
    ) -> Result<(), SceneError> {
        let curve = SplineCurve {
            degree: spline.degree,
            control_points: &spline.control_points,
            knots: spline.knots.as_deref(),
            weights: spline.weights.as_deref(),
        };
        let samples = curve.tessellate()?;
        self.emit(
            common,
            SceneEntityKind::Polyline,
            samples,
            Vec::new(),
            false,
            out,
        );
        Ok(())
    }

    fn text(&mut self, common: &EntityCommon, text: &dxf::Text, out: &mut Vec<Decomposed>) {
        let glyphs = self.text.render_single_line(&SingleLineText {
            text: &text.text,
            position: text.position,
            end_position: text.end_position,
            height: text.height,
            rotation: text.rotation,
            h_align: horiz_align(text.h_align),
            v_align: vert_align(text.v_align),
        });
        self.emit_glyphs(common, glyphs, out);
    }

    fn mtext(&mut self, common: &EntityCommon, mtext: &dxf::MText, out: &mut Vec<Decomposed>) {
        let items = parse_mtext(&mtext.text);
        let glyphs = self.text.render_mtext(&MTextLayout {
            items: &items,
            position: mtext.position,
            font_size: mtext.height,
            width: mtext.width.filter(|w| *w > 0.0),
            rotation: mtext.rotation,
            direction: mtext.direction,
            attachment: attachment(mtext.attachment),
            line_spacing_factor: mtext.line_spacing_factor.unwrap_or(1.0),
            columns: mtext.columns.as_ref().map(column_layout),
        });
        self.emit_glyphs(common, glyphs, out);
    }

    fn emit_glyphs(
        &mut self,
        common: &EntityCommon,
        glyphs: Vec<RenderedGlyph>,
        out: &mut Vec<Decomposed>,
    ) {
        for glyph in glyphs {
            self.emit(
                common,
                SceneEntityKind::Triangles,
                glyph.vertices,
                glyph.indices,
                false,
                out,
            );
        }
    }

    /// 3DFACE and SOLID: quad split into the `v0-v1-v2` / `v1-v3-v2`
    /// triangles, dropping degenerate ones.
    fn face(&mut self, common: &EntityCommon, corners: &[DVec2; 4], out: &mut Vec<Decomposed>) {
        if self.options.wireframe_mesh {
            // Perimeter order is 0-1-3-2; collapse duplicate corners.
            let mut outline: Vec<DVec2> = Vec::with_capacity(4);
            for &corner in &[corners[0], corners[1], corners[3], corners[2]] {
                if outline.last() != Some(&corner) {
                    outline.push(corner);
                }
            }
            if outline.len() > 1 && outline.first() == outline.last() {
                outline.pop();
            }
            if outline.len() < 2 {
                return;
            }
            self.emit(
                common,
                SceneEntityKind::Polyline,
                outline,
                Vec::new(),
                true,
                out,
            );
            return;
        }

        let mut indices = Vec::with_capacity(6);
        for triangle in [[0u32, 1, 2], [1, 3, 2]] {
            let a = corners[triangle[0] as usize];
            let b = corners[triangle[1] as usize];
            let c = corners[triangle[2] as usize];
            if (b - a).perp_dot(c - a).abs() > TRIANGLE_AREA_EPS {
                indices.extend_from_slice(&triangle);
            }
        }
        if indices.is_empty() {
            return;
        }
        self.emit(
            common,
            SceneEntityKind::Triangles,
            corners.to_vec(),
            indices,
            false,
            out,
        );
    }

    fn hatch(&mut self, common: &EntityCommon, hatch: &dxf::Hatch, out: &mut Vec<Decomposed>) {
        if hatch.is_solid {
            tracing::warn!("Solid hatch fill not supported, skipping");
            return;
        }
        let mirrored = common.is_mirrored();
        let ctx = self.arc_context();
        let loops: Vec<ClipLoop> = hatch
            .boundary_loops
            .iter()
            .filter_map(|l| {
                let mut points = resolve_boundary_path(&l.path, &ctx);
                if points.len() < 3 {
                    return None;
                }
                if mirrored {
                    for point in &mut points {
                        point.x = -point.x;
                    }
                }
                Some(ClipLoop {
                    points,
                    external: l.external,
                    outermost: l.outermost,
                })
            })
            .collect();
        if loops.is_empty() {
            tracing::warn!("Hatch without usable boundary loops, skipping");
            return;
        }

        let inline;
        let pattern: &Pattern = match self.patterns.get(&hatch.pattern_name) {
            Some(pattern) => pattern,
            None if !hatch.definition_lines.is_empty() => {
                inline = inline_pattern(hatch);
                &inline
            }
            None => {
                tracing::warn!(pattern = %hatch.pattern_name, "Unknown hatch pattern, skipping");
                return;
            }
        };

        let style = match hatch.style {
            dxf::HatchStyle::OddParity => AreaFillStyle::OddParity,
            dxf::HatchStyle::Outermost => AreaFillStyle::Outermost,
            dxf::HatchStyle::ThroughEntireArea => AreaFillStyle::ThroughEntireArea,
        };
        let clipper = HatchClipper::new(loops, style);
        let seed = hatch.seed_points.first().copied().unwrap_or(DVec2::ZERO);
        let scale = if hatch.pattern_scale > 0.0 {
            hatch.pattern_scale
        } else {
            1.0
        };
        let segments = pattern_fill_segments(
            &clipper,
            pattern,
            hatch.pattern_angle.to_radians(),
            scale,
            seed,
        );
        if segments.is_empty() {
            return;
        }
        let mut vertices = Vec::with_capacity(segments.len() * 2);
        for [a, b] in segments {
            vertices.push(a);
            vertices.push(b);
        }
        // Loop points were already mirrored; emit directly.
        let (layer, color, line_type) = self.attributes(common);
        out.push(Decomposed::Entity(SceneEntity {
            kind: SceneEntityKind::LineSegments,
            vertices,
            indices: Vec::new(),
            layer,
            color,
            line_type,
            closed: false,
        }));
    }
}

/// Arrowhead length relative to the dimension text height.
const DIM_ARROW_FACTOR: f64 = 0.8;
/// Extension line overshoot past the dimension line, relative to text height.
const DIM_EXTENSION_FACTOR: f64 = 0.25;
/// Gap between the dimension line and the measurement text baseline.
const DIM_TEXT_GAP_FACTOR: f64 = 0.3;

impl Decomposer<'_> {
    /// Linear dimension: two extension lines, the dimension line with
    /// arrowheads, and the measurement (or override) text above it.
    fn linear_dimension(
        &mut self,
        common: &EntityCommon,
        dimension: &dxf::LinearDimension,
        out: &mut Vec<Decomposed>,
    ) {
        let direction = DVec2::from_angle(dimension.angle.to_radians());
        let project = |p: DVec2| {
            dimension.def_point + direction * (p - dimension.def_point).dot(direction)
        };
        let near = project(dimension.start);
        let far = project(dimension.end);
        let span = far - near;
        let length = span.length();
        if length < 1e-12 {
            tracing::warn!("Degenerate linear dimension, skipping");
            return;
        }
        let along = span / length;
        let text_height = if dimension.text_height > 0.0 {
            dimension.text_height
        } else {
            1.0
        };
        let overshoot = text_height * DIM_EXTENSION_FACTOR;

        let mut segments = Vec::with_capacity(6);
        for (origin, anchor) in [(dimension.start, near), (dimension.end, far)] {
            let reach = anchor - origin;
            let reach_len = reach.length();
            if reach_len > 1e-12 {
                segments.push(origin);
                segments.push(anchor + reach / reach_len * overshoot);
            }
        }
        segments.push(near);
        segments.push(far);
        self.emit(
            common,
            SceneEntityKind::LineSegments,
            segments,
            Vec::new(),
            false,
            out,
        );

        // Arrowheads: apex on each end, body pointing inward.
        let arrow = text_height * DIM_ARROW_FACTOR;
        let half_width = arrow / 3.0;
        let perpendicular = DVec2::new(-along.y, along.x);
        let mut vertices = Vec::with_capacity(6);
        for (tip, inward) in [(near, along), (far, -along)] {
            let base = tip + inward * arrow;
            vertices.push(tip);
            vertices.push(base + perpendicular * half_width);
            vertices.push(base - perpendicular * half_width);
        }
        self.emit(
            common,
            SceneEntityKind::Triangles,
            vertices,
            Vec::new(),
            false,
            out,
        );

        let label = match &dimension.text {
            Some(text) => text.clone(),
            None => format_measurement(length),
        };
        let midpoint = (near + far) * 0.5 + perpendicular * text_height * DIM_TEXT_GAP_FACTOR;
        let glyphs = self.text.render_single_line(&SingleLineText {
            text: &label,
            position: midpoint,
            end_position: Some(midpoint),
            height: text_height,
            // The renderer inverts TEXT rotations; pre-negate so the label
            // runs along the dimension line.
            rotation: -dimension.angle,
            h_align: HorizAlign::Center,
            v_align: VertAlign::Baseline,
        });
        self.emit_glyphs(common, glyphs, out);
    }
}

/// Format a measured distance: four decimals with trailing zeros trimmed.
fn format_measurement(value: f64) -> String {
    let mut text = format!("{:.4}", value);
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    text
}

/// Expand one polyline segment, tessellating its bulge when present.
fn expand_segment(from: &PolylineVertex, to: DVec2, ctx: &ArcContext, points: &mut Vec<DVec2>) {
    if from.bulge != 0.0 {
        tessellate_bulge(from.position, to, from.bulge, ctx, points);
    } else {
        points.push(to);
    }
}

/// Resolve a hatch boundary path into a point loop.
fn resolve_boundary_path(path: &dxf::BoundaryPath, ctx: &ArcContext) -> Vec<DVec2> {
    let mut points = Vec::new();
    match path {
        dxf::BoundaryPath::Polyline { vertices, closed } => {
            if vertices.is_empty() {
                return points;
            }
            points.push(vertices[0].position);
            for pair in vertices.windows(2) {
                expand_segment(&pair[0], pair[1].position, ctx, &mut points);
            }
            if *closed {
                let last = vertices.last().unwrap();
                if last.bulge != 0.0 {
                    expand_segment(last, vertices[0].position, ctx, &mut points);
                    points.pop();
                }
            }
        }
        dxf::BoundaryPath::Edges(edges) => {
            for edge in edges {
                let mut piece = match edge {
                    dxf::BoundaryEdge::Line { start, end } => vec![*start, *end],
                    dxf::BoundaryEdge::Arc {
                        center,
                        radius,
                        start_angle,
                        end_angle,
                        ccw,
                    } => {
                        let sampled = tessellate_arc(
                            &ArcParams::arc(*center, *radius, *start_angle, *end_angle),
                            ctx,
                        );
                        let mut vertices = sampled.vertices;
                        if !ccw {
                            vertices.reverse();
                        }
                        vertices
                    }
                    dxf::BoundaryEdge::Ellipse {
                        center,
                        major_axis,
                        axis_ratio,
                        start_angle,
                        end_angle,
                        ccw,
                    } => {
                        let radius_x = major_axis.length();
                        let sampled = tessellate_arc(
                            &ArcParams {
                                center: *center,
                                radius_x,
                                radius_y: Some(radius_x * axis_ratio),
                                start_angle: Some(*start_angle),
                                end_angle: Some(*end_angle),
                                rotation: major_axis.y.atan2(major_axis.x),
                                transform: None,
                            },
                            ctx,
                        );
                        let mut vertices = sampled.vertices;
                        if !ccw {
                            vertices.reverse();
                        }
                        vertices
                    }
                };
                if let (Some(&last), Some(&first)) = (points.last(), piece.first()) {
                    if (last - first).length_squared() < 1e-18 {
                        piece.remove(0);
                    }
                }
                points.append(&mut piece);
            }
            if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
                if points.len() > 1 && (first - last).length_squared() < 1e-18 {
                    points.pop();
                }
            }
        }
    }
    points
}

/// Build a pattern from the hatch's inline definition lines.
///
/// Inline offsets are already in pattern space, not the rotated line frame.
fn inline_pattern(hatch: &dxf::Hatch) -> Pattern {
    Pattern {
        name: hatch.pattern_name.clone(),
        lines: hatch
            .definition_lines
            .iter()
            .map(|line| PatternLine {
                angle: line.angle.to_radians(),
                base: line.base,
                offset: line.offset,
                dashes: line.dashes.clone(),
            })
            .collect(),
        offset_in_line_space: false,
    }
}

/// Plus marker: horizontal and vertical strokes through the position.
pub fn plus_marker(position: DVec2, half: f64) -> Vec<DVec2> {
    vec![
        position - DVec2::new(half, 0.0),
        position + DVec2::new(half, 0.0),
        position - DVec2::new(0.0, half),
        position + DVec2::new(0.0, half),
    ]
}

/// Cross marker: both diagonals.
pub fn cross_marker(position: DVec2, half: f64) -> Vec<DVec2> {
    vec![
        position + DVec2::new(-half, -half),
        position + DVec2::new(half, half),
        position + DVec2::new(-half, half),
        position + DVec2::new(half, -half),
    ]
}

/// Tick marker: a short upward stroke.
pub fn tick_marker(position: DVec2, half: f64) -> Vec<DVec2> {
    vec![position, position + DVec2::new(0.0, half)]
}

fn horiz_align(align: dxf::HorizontalAlignment) -> HorizAlign {
    match align {
        dxf::HorizontalAlignment::Left => HorizAlign::Left,
        dxf::HorizontalAlignment::Center => HorizAlign::Center,
        dxf::HorizontalAlignment::Right => HorizAlign::Right,
        dxf::HorizontalAlignment::Aligned => HorizAlign::Aligned,
        dxf::HorizontalAlignment::Middle => HorizAlign::Middle,
        dxf::HorizontalAlignment::Fit => HorizAlign::Fit,
    }
}

fn vert_align(align: dxf::VerticalAlignment) -> VertAlign {
    match align {
        dxf::VerticalAlignment::Baseline => VertAlign::Baseline,
        dxf::VerticalAlignment::Bottom => VertAlign::Bottom,
        dxf::VerticalAlignment::Middle => VertAlign::Middle,
        dxf::VerticalAlignment::Top => VertAlign::Top,
    }
}

fn attachment(point: dxf::AttachmentPoint) -> Attachment {
    match point {
        dxf::AttachmentPoint::TopLeft => Attachment::TopLeft,
        dxf::AttachmentPoint::TopCenter => Attachment::TopCenter,
        dxf::AttachmentPoint::TopRight => Attachment::TopRight,
        dxf::AttachmentPoint::MiddleLeft => Attachment::MiddleLeft,
        dxf::AttachmentPoint::MiddleCenter => Attachment::MiddleCenter,
        dxf::AttachmentPoint::MiddleRight => Attachment::MiddleRight,
        dxf::AttachmentPoint::BottomLeft => Attachment::BottomLeft,
        dxf::AttachmentPoint::BottomCenter => Attachment::BottomCenter,
        dxf::AttachmentPoint::BottomRight => Attachment::BottomRight,
    }
}

fn column_layout(columns: &dxf::MTextColumns) -> ColumnLayout {
    ColumnLayout {
        count: columns.count,
        width: columns.width,
        defined_height: columns.defined_height,
        heights: columns.heights.clone(),
        gutter_width: columns.gutter_width,
        total_width: columns.total_width,
        total_height: columns.total_height,
    }
}

/// Build the marker geometry of the synthetic point-shape block.
///
/// Returns the line segments of the shape outline plus whether the mode
/// includes a center dot (surfaced as `point_shape_has_dot`).
pub fn point_shape_geometry(
    mode: i32,
    size: f64,
    arc_ctx: &ArcContext,
) -> (Vec<DVec2>, Vec<DVec2>, bool) {
    let marker = PointMarker::from_mode(mode);
    let shape = PointShapeFlags::from_bits_truncate(mode);
    let half = size / 2.0;
    let mut segments = Vec::new();
    let mut polyline = Vec::new();

    match marker {
        PointMarker::Plus => segments.extend(plus_marker(DVec2::ZERO, half)),
        PointMarker::Cross => segments.extend(cross_marker(DVec2::ZERO, half)),
        PointMarker::Tick => segments.extend(tick_marker(DVec2::ZERO, half)),
        PointMarker::Dot | PointMarker::None => {}
    }
    if shape.contains(PointShapeFlags::SQUARE) {
        let corners = [
            DVec2::new(-half, -half),
            DVec2::new(half, -half),
            DVec2::new(half, half),
            DVec2::new(-half, half),
        ];
        for i in 0..4 {
            segments.push(corners[i]);
            segments.push(corners[(i + 1) % 4]);
        }
    }
    if shape.contains(PointShapeFlags::CIRCLE) {
        let sampled = tessellate_arc(&ArcParams::circle(DVec2::ZERO, half), arc_ctx);
        polyline = sampled.vertices;
    }
    (segments, polyline, marker == PointMarker::Dot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_marker_from_mode() {
        assert_eq!(PointMarker::from_mode(0), PointMarker::Dot);
        assert_eq!(PointMarker::from_mode(1), PointMarker::None);
        assert_eq!(PointMarker::from_mode(2), PointMarker::Plus);
        assert_eq!(PointMarker::from_mode(34), PointMarker::Plus);
        assert_eq!(PointMarker::from_mode(96), PointMarker::Dot);
    }

    #[test]
    fn test_shape_flags() {
        let flags = PointShapeFlags::from_bits_truncate(35);
        assert!(flags.contains(PointShapeFlags::CIRCLE));
        assert!(!flags.contains(PointShapeFlags::SQUARE));
    }

    #[test]
    fn test_line_type_interner_stable_ids() {
        let mut interner = LineTypeInterner::new();
        assert_eq!(interner.intern("DASHED"), 0);
        assert_eq!(interner.intern("CENTER"), 1);
        assert_eq!(interner.intern("DASHED"), 0);
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_point_shape_geometry_square_with_dot() {
        let ctx = ArcContext::default();
        let (segments, circle, has_dot) = point_shape_geometry(64, 2.0, &ctx);
        assert!(has_dot);
        assert_eq!(segments.len(), 8);
        assert!(circle.is_empty());
    }

    #[test]
    fn test_format_measurement() {
        assert_eq!(format_measurement(10.0), "10");
        assert_eq!(format_measurement(2.5), "2.5");
        assert_eq!(format_measurement(0.12345), "0.1234");
    }

    #[test]
    fn test_point_shape_geometry_circle_plus() {
        let ctx = ArcContext::default();
        let (segments, circle, has_dot) = point_shape_geometry(32 + 2, 2.0, &ctx);
        assert!(!has_dot);
        // Plus marker: two strokes.
        assert_eq!(segments.len(), 4);
        assert!(!circle.is_empty());
    }
}
