//! Scene-builder configuration.

pub use linework_text::TextOptions;

/// Options controlling scene construction, merged from defaults at build
/// time.
#[derive(Debug, Clone)]
pub struct SceneOptions {
    /// Target angular size of one arc segment, radians.
    pub arc_tessellation_angle: f64,
    /// Floor on arc segment counts.
    pub min_arc_tessellation_subdivisions: usize,
    /// Emit 3DFACE/SOLID as outlines instead of filled triangles.
    pub wireframe_mesh: bool,
    /// Point marker size when `$PDSIZE` is not positive, drawing units.
    pub point_shape_size: f64,
    /// Text rendering options.
    pub text: TextOptions,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            arc_tessellation_angle: 10.0_f64.to_radians(),
            min_arc_tessellation_subdivisions: 8,
            wireframe_mesh: false,
            point_shape_size: 1.0,
            text: TextOptions::default(),
        }
    }
}
