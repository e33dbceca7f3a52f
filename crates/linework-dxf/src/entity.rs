//! Tagged entity records.
//!
//! Every drawing entity arrives as an [`Entity`]: shared attributes in
//! [`EntityCommon`], geometry in one [`EntityKind`] variant. The parser is
//! responsible for normalization — LWPOLYLINE and POLYLINE both land in
//! [`EntityKind::Polyline`], angles are radians unless noted, and optional
//! group codes become `Option`s instead of probed properties.

use glam::{DVec2, DVec3};

/// Attributes shared by all entity types.
#[derive(Debug, Clone, Default)]
pub struct EntityCommon {
    /// Owning layer; `None` falls back to layer `"0"`.
    pub layer: Option<String>,
    /// ACI color index (group 62). 0 means BYBLOCK, 256 means BYLAYER.
    pub color_index: Option<i32>,
    /// Resolved 24-bit true color (group 420), takes precedence over the index.
    pub color: Option<i32>,
    /// Line-type name (group 6).
    pub line_type: Option<String>,
    /// OCS extrusion direction (group 210/220/230).
    pub extrusion: Option<DVec3>,
}

impl EntityCommon {
    /// Whether the OCS extrusion flips the X axis (negative Z).
    pub fn is_mirrored(&self) -> bool {
        self.extrusion.is_some_and(|e| e.z < 0.0)
    }
}

/// A single drawing entity.
#[derive(Debug, Clone)]
pub struct Entity {
    pub common: EntityCommon,
    pub kind: EntityKind,
}

impl Entity {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            common: EntityCommon::default(),
            kind,
        }
    }

    pub fn on_layer(mut self, layer: impl Into<String>) -> Self {
        self.common.layer = Some(layer.into());
        self
    }

    pub fn with_color_index(mut self, index: i32) -> Self {
        self.common.color_index = Some(index);
        self
    }

    pub fn with_line_type(mut self, line_type: impl Into<String>) -> Self {
        self.common.line_type = Some(line_type.into());
        self
    }
}

/// Entity geometry, one variant per DXF entity type the engine handles.
#[derive(Debug, Clone)]
pub enum EntityKind {
    Line(Line),
    Polyline(Polyline),
    Arc(Arc),
    Circle(Circle),
    Ellipse(Ellipse),
    Point(Point),
    Spline(Spline),
    Text(Text),
    MText(MText),
    Face3d(Face3d),
    Solid(Solid),
    Hatch(Hatch),
    /// Rotated/aligned linear dimensions; other dimension subtypes arrive
    /// as [`EntityKind::Unsupported`].
    LinearDimension(LinearDimension),
    Insert(Insert),
    /// Anything the parser recognized but the engine does not handle.
    /// Decomposition warns and skips these.
    Unsupported(String),
}

impl EntityKind {
    /// Short type name used in skip warnings.
    pub fn type_name(&self) -> &str {
        match self {
            EntityKind::Line(_) => "LINE",
            EntityKind::Polyline(_) => "POLYLINE",
            EntityKind::Arc(_) => "ARC",
            EntityKind::Circle(_) => "CIRCLE",
            EntityKind::Ellipse(_) => "ELLIPSE",
            EntityKind::Point(_) => "POINT",
            EntityKind::Spline(_) => "SPLINE",
            EntityKind::Text(_) => "TEXT",
            EntityKind::MText(_) => "MTEXT",
            EntityKind::Face3d(_) => "3DFACE",
            EntityKind::Solid(_) => "SOLID",
            EntityKind::Hatch(_) => "HATCH",
            EntityKind::LinearDimension(_) => "DIMENSION",
            EntityKind::Insert(_) => "INSERT",
            EntityKind::Unsupported(name) => name,
        }
    }
}

/// LINE: a single segment.
#[derive(Debug, Clone)]
pub struct Line {
    pub start: DVec2,
    pub end: DVec2,
}

/// One polyline vertex.
#[derive(Debug, Clone, Copy)]
pub struct PolylineVertex {
    pub position: DVec2,
    /// Bulge (`tan(θ/4)`) of the arc to the next vertex; 0 for a straight segment.
    pub bulge: f64,
    /// Spline-frame control vertex, filtered out during decomposition.
    pub spline_vertex: bool,
    /// Curve-fit vertex, filtered out during decomposition.
    pub curve_fitting_vertex: bool,
}

impl PolylineVertex {
    pub fn new(position: DVec2) -> Self {
        Self {
            position,
            bulge: 0.0,
            spline_vertex: false,
            curve_fitting_vertex: false,
        }
    }

    pub fn with_bulge(position: DVec2, bulge: f64) -> Self {
        Self {
            position,
            bulge,
            spline_vertex: false,
            curve_fitting_vertex: false,
        }
    }
}

/// POLYLINE / LWPOLYLINE, normalized to one record.
#[derive(Debug, Clone)]
pub struct Polyline {
    pub vertices: Vec<PolylineVertex>,
    pub closed: bool,
}

/// ARC: circular arc. Angles are radians, counter-clockwise before
/// `$ANGBASE`/`$ANGDIR` normalization.
#[derive(Debug, Clone)]
pub struct Arc {
    pub center: DVec2,
    pub radius: f64,
    pub start_angle: Option<f64>,
    pub end_angle: Option<f64>,
}

/// CIRCLE.
#[derive(Debug, Clone)]
pub struct Circle {
    pub center: DVec2,
    pub radius: f64,
}

/// ELLIPSE: defined by center, major-axis endpoint vector and axis ratio.
#[derive(Debug, Clone)]
pub struct Ellipse {
    pub center: DVec2,
    /// Major axis endpoint relative to center.
    pub major_axis: DVec2,
    /// Minor/major axis ratio.
    pub axis_ratio: f64,
    /// Start parameter in radians (0 for full ellipse).
    pub start_angle: Option<f64>,
    /// End parameter in radians (2π for full ellipse).
    pub end_angle: Option<f64>,
}

/// POINT: rendered according to `$PDMODE`/`$PDSIZE`.
#[derive(Debug, Clone)]
pub struct Point {
    pub position: DVec2,
}

/// SPLINE: NURBS control-point form.
#[derive(Debug, Clone)]
pub struct Spline {
    pub degree: usize,
    pub control_points: Vec<DVec2>,
    /// Knot vector; `None` selects uniform integer knots.
    pub knots: Option<Vec<f64>>,
    /// Per-control-point weights; `None` means unweighted.
    pub weights: Option<Vec<f64>>,
}

/// TEXT horizontal justification (group 72).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
    Aligned,
    Middle,
    Fit,
}

/// TEXT vertical justification (group 73).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlignment {
    #[default]
    Baseline,
    Bottom,
    Middle,
    Top,
}

/// TEXT: single-line text.
#[derive(Debug, Clone)]
pub struct Text {
    pub text: String,
    /// First alignment point.
    pub position: DVec2,
    /// Second alignment point, required for Aligned/Fit and non-default
    /// justifications.
    pub end_position: Option<DVec2>,
    /// Nominal text height in drawing units.
    pub height: f64,
    /// Rotation in degrees.
    pub rotation: f64,
    pub h_align: HorizontalAlignment,
    pub v_align: VerticalAlignment,
}

/// MTEXT attachment point (group 71).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachmentPoint {
    #[default]
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

/// MTEXT column definition (embedded-object groups).
#[derive(Debug, Clone)]
pub struct MTextColumns {
    pub count: usize,
    pub width: f64,
    /// Defined column height; 0 means auto.
    pub defined_height: f64,
    /// Per-column heights for dynamic columns; empty means uniform.
    pub heights: Vec<f64>,
    pub gutter_width: f64,
    pub total_width: f64,
    pub total_height: f64,
}

/// MTEXT: multi-line formatted text.
#[derive(Debug, Clone)]
pub struct MText {
    /// Raw text including inline format codes.
    pub text: String,
    pub position: DVec2,
    /// Nominal font size in drawing units.
    pub height: f64,
    /// Reference rectangle width; `None` disables wrapping.
    pub width: Option<f64>,
    /// Rotation in degrees; overridden by `direction` when present.
    pub rotation: f64,
    /// X-axis direction vector (group 11).
    pub direction: Option<DVec2>,
    pub attachment: AttachmentPoint,
    /// Line spacing factor (group 44), 1.0 when absent.
    pub line_spacing_factor: Option<f64>,
    pub columns: Option<MTextColumns>,
}

/// 3DFACE: up to four corners projected to the drawing plane.
#[derive(Debug, Clone)]
pub struct Face3d {
    pub vertices: [DVec2; 4],
}

/// SOLID: filled quad/triangle, same corner layout as 3DFACE.
#[derive(Debug, Clone)]
pub struct Solid {
    pub vertices: [DVec2; 4],
}

/// Hatch area-fill style (group 75).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HatchStyle {
    /// Hatch alternating areas (odd parity).
    #[default]
    OddParity,
    /// Hatch the outermost area only.
    Outermost,
    /// Hatch through the entire area.
    ThroughEntireArea,
}

/// One edge of a hatch boundary path.
#[derive(Debug, Clone)]
pub enum BoundaryEdge {
    Line {
        start: DVec2,
        end: DVec2,
    },
    Arc {
        center: DVec2,
        radius: f64,
        /// Radians.
        start_angle: f64,
        /// Radians.
        end_angle: f64,
        ccw: bool,
    },
    Ellipse {
        center: DVec2,
        major_axis: DVec2,
        axis_ratio: f64,
        start_angle: f64,
        end_angle: f64,
        ccw: bool,
    },
}

/// A hatch boundary path: either a lightweight polyline or an edge list.
#[derive(Debug, Clone)]
pub enum BoundaryPath {
    Polyline {
        vertices: Vec<PolylineVertex>,
        closed: bool,
    },
    Edges(Vec<BoundaryEdge>),
}

/// One boundary loop with its path-type flags (group 92).
#[derive(Debug, Clone)]
pub struct BoundaryLoop {
    pub external: bool,
    pub outermost: bool,
    pub path: BoundaryPath,
}

/// An inline pattern definition line (groups 53/43/44/45/46/49/79).
#[derive(Debug, Clone)]
pub struct HatchDefinitionLine {
    /// Degrees.
    pub angle: f64,
    pub base: DVec2,
    pub offset: DVec2,
    pub dashes: Vec<f64>,
}

/// HATCH: pattern fill over boundary loops.
#[derive(Debug, Clone)]
pub struct Hatch {
    pub pattern_name: String,
    pub is_solid: bool,
    /// Degrees.
    pub pattern_angle: f64,
    pub pattern_scale: f64,
    pub style: HatchStyle,
    pub boundary_loops: Vec<BoundaryLoop>,
    /// Inline pattern definition; used when the named pattern is unknown.
    pub definition_lines: Vec<HatchDefinitionLine>,
    pub seed_points: Vec<DVec2>,
}

/// Linear DIMENSION: two measured points, a point on the dimension line
/// and its rotation.
#[derive(Debug, Clone)]
pub struct LinearDimension {
    /// A point on the dimension line (group 10).
    pub def_point: DVec2,
    /// First extension line origin (group 13).
    pub start: DVec2,
    /// Second extension line origin (group 14).
    pub end: DVec2,
    /// Dimension line rotation in degrees (group 50).
    pub angle: f64,
    /// Text override; `None` draws the measured distance.
    pub text: Option<String>,
    /// Dimension text height in drawing units.
    pub text_height: f64,
}

/// INSERT: places one instance of a block.
#[derive(Debug, Clone)]
pub struct Insert {
    pub name: String,
    pub position: DVec2,
    pub x_scale: f64,
    pub y_scale: f64,
    /// Degrees.
    pub rotation: f64,
}

impl Insert {
    pub fn new(name: impl Into<String>, position: DVec2) -> Self {
        Self {
            name: name.into(),
            position,
            x_scale: 1.0,
            y_scale: 1.0,
            rotation: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirrored_extrusion() {
        let mut common = EntityCommon::default();
        assert!(!common.is_mirrored());
        common.extrusion = Some(DVec3::new(0.0, 0.0, -1.0));
        assert!(common.is_mirrored());
        common.extrusion = Some(DVec3::Z);
        assert!(!common.is_mirrored());
    }

    #[test]
    fn test_entity_builder_helpers() {
        let entity = Entity::new(EntityKind::Line(Line {
            start: DVec2::ZERO,
            end: DVec2::X,
        }))
        .on_layer("walls")
        .with_color_index(1);
        assert_eq!(entity.common.layer.as_deref(), Some("walls"));
        assert_eq!(entity.common.color_index, Some(1));
        assert_eq!(entity.kind.type_name(), "LINE");
    }
}
