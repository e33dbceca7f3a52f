//! Arc, ellipse and bulge tessellation.
//!
//! Curves are sampled into polylines by a maximum segment angle. Angle
//! normalization follows the drawing conventions: `$ANGBASE` is added to the
//! start angle and `$ANGDIR = 1` (clockwise) swaps the direction.

use crate::TessellationError;
use glam::{DVec2, DMat2};
use linework_core::Transform;
use std::f64::consts::TAU;

/// Chords shorter than this are treated as degenerate in bulge expansion.
const MIN_CHORD: f64 = 1e-9;

/// Upper bound on the subdivision floor; anything larger is a broken
/// configuration rather than a sampling density.
const MAX_SUBDIVISIONS: usize = 0x1_0000;

/// Smallest accepted segment angle, radians.
const MIN_TESSELLATION_ANGLE: f64 = 1e-6;

/// Hard cap on segments per curve. Reached only by degenerate sweep values;
/// the curve is clamped with a warning.
const MAX_SEGMENTS: usize = 1 << 20;

/// Parameters for sampling an arc, circle or ellipse.
#[derive(Debug, Clone)]
pub struct ArcParams {
    pub center: DVec2,
    pub radius_x: f64,
    /// Y radius; `None` makes the curve circular.
    pub radius_y: Option<f64>,
    /// Start angle in radians; `None` means 0.
    pub start_angle: Option<f64>,
    /// End angle in radians; `None` closes the curve over a full turn.
    pub end_angle: Option<f64>,
    /// Major-axis rotation applied to samples about the center.
    pub rotation: f64,
    /// Transform applied last, after rotation.
    pub transform: Option<Transform>,
}

impl ArcParams {
    pub fn circle(center: DVec2, radius: f64) -> Self {
        Self {
            center,
            radius_x: radius,
            radius_y: None,
            start_angle: None,
            end_angle: None,
            rotation: 0.0,
            transform: None,
        }
    }

    pub fn arc(center: DVec2, radius: f64, start_angle: f64, end_angle: f64) -> Self {
        Self {
            center,
            radius_x: radius,
            radius_y: None,
            start_angle: Some(start_angle),
            end_angle: Some(end_angle),
            rotation: 0.0,
            transform: None,
        }
    }
}

/// Angle conventions and sampling density shared by one drawing.
#[derive(Debug, Clone, Copy)]
pub struct ArcContext {
    /// `$ANGBASE`, radians.
    pub ang_base: f64,
    /// `$ANGDIR = 1`: angles grow clockwise.
    pub clockwise: bool,
    /// Target angular size of one segment, radians.
    pub tessellation_angle: f64,
    /// Floor on the segment count.
    pub min_subdivisions: usize,
}

impl Default for ArcContext {
    fn default() -> Self {
        Self {
            ang_base: 0.0,
            clockwise: false,
            tessellation_angle: 10.0_f64.to_radians(),
            min_subdivisions: 8,
        }
    }
}

impl ArcContext {
    /// Check the sampling parameters.
    ///
    /// `tessellate_arc` and `tessellate_bulge` assume a validated context: a
    /// zero, negative or non-finite segment angle would otherwise send the
    /// segment count to `usize::MAX` and abort on allocation. Callers
    /// validate once per build and surface the error instead.
    pub fn validate(&self) -> Result<(), TessellationError> {
        if !(self.tessellation_angle.is_finite()
            && self.tessellation_angle >= MIN_TESSELLATION_ANGLE)
        {
            return Err(TessellationError::InvalidParameter {
                name: "arc_tessellation_angle",
                value: self.tessellation_angle,
            });
        }
        if self.min_subdivisions > MAX_SUBDIVISIONS {
            return Err(TessellationError::InvalidParameter {
                name: "min_arc_tessellation_subdivisions",
                value: self.min_subdivisions as f64,
            });
        }
        if !self.ang_base.is_finite() {
            return Err(TessellationError::InvalidParameter {
                name: "ang_base",
                value: self.ang_base,
            });
        }
        Ok(())
    }
}

/// An arc sampled into a vertex sequence.
#[derive(Debug, Clone)]
pub struct SampledArc {
    pub vertices: Vec<DVec2>,
    /// True when the curve spans a full turn; the duplicate closing vertex
    /// is suppressed and the consumer treats the polyline as closed.
    pub closed: bool,
}

/// Sample an arc/ellipse/circle into a polyline.
///
/// The segment count is `max(min_subdivisions, ⌊(end−start)/tess_angle⌋)`,
/// never below 1. `n + 1` samples are produced; the last one is dropped for
/// closed curves.
pub fn tessellate_arc(params: &ArcParams, ctx: &ArcContext) -> SampledArc {
    let radius_y = params.radius_y.unwrap_or(params.radius_x);

    let mut start = params.start_angle.unwrap_or(0.0) + ctx.ang_base;
    let (mut end, closed) = match params.end_angle {
        Some(end) => (end + ctx.ang_base, false),
        None => (start + TAU, true),
    };
    if ctx.clockwise {
        std::mem::swap(&mut start, &mut end);
    }
    // Normalize so the sweep is positive.
    while end <= start {
        end += TAU;
    }
    let sweep = end - start;

    let mut segments = (sweep / ctx.tessellation_angle).floor() as usize;
    segments = segments.max(ctx.min_subdivisions).max(1);
    if segments > MAX_SEGMENTS {
        tracing::warn!(segments, "Arc segment count clamped");
        segments = MAX_SEGMENTS;
    }

    let sample_count = if closed { segments } else { segments + 1 };
    let mut vertices = Vec::with_capacity(sample_count);

    let rotation = (params.rotation != 0.0).then(|| DMat2::from_angle(params.rotation));

    for i in 0..sample_count {
        let theta = start + sweep * i as f64 / segments as f64;
        let mut point = DVec2::new(
            params.radius_x * theta.cos(),
            radius_y * theta.sin(),
        );
        if let Some(rot) = &rotation {
            point = *rot * point;
        }
        let mut point = point + params.center;
        if let Some(transform) = &params.transform {
            point = transform.transform_point(point);
        }
        vertices.push(point);
    }

    SampledArc { vertices, closed }
}

/// Expand a bulged polyline segment.
///
/// `bulge` is `tan(θ/4)` for the arc's included angle θ. Appends the interior
/// samples and the end vertex to `out`; the start vertex is the caller's.
/// A chord below the degeneracy threshold appends nothing.
pub fn tessellate_bulge(
    start: DVec2,
    end: DVec2,
    bulge: f64,
    ctx: &ArcContext,
    out: &mut Vec<DVec2>,
) {
    let included = 4.0 * bulge.atan();
    if included.abs() < ctx.tessellation_angle {
        out.push(end);
        return;
    }

    let chord = end - start;
    let chord_len_sq = chord.length_squared();
    if chord_len_sq < MIN_CHORD * MIN_CHORD {
        return;
    }
    let chord_len = chord_len_sq.sqrt();

    // Arc center: perpendicular offset from the chord midpoint.
    let radius = chord_len / (2.0 * (included / 2.0).sin());
    let midpoint = (start + end) * 0.5;
    let perpendicular = DVec2::new(-chord.y, chord.x) / chord_len;
    let apothem = radius * (included / 2.0).cos();
    let center = midpoint - perpendicular * apothem;

    let segments = ((included.abs() / ctx.tessellation_angle).floor() as usize)
        .max(ctx.min_subdivisions)
        .min(MAX_SEGMENTS);

    let start_angle = (start - center).to_angle();
    let step = included / segments as f64;
    for i in 1..segments {
        let theta = start_angle + step * i as f64;
        out.push(center + radius.abs() * DVec2::new(theta.cos(), theta.sin()));
    }
    out.push(end);
}
