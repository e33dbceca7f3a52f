//! Hatch boundary clipping.
//!
//! Pattern lines are swept across the hatch boundary and each line is
//! clipped against the boundary loops under one of the three area-fill
//! styles. Clipping is parametric: the result is a list of `[t0, t1]`
//! sub-segments with t measured from the line start (0) to its end (1).

use crate::{Pattern, PatternLine};
use glam::{DMat2, DVec2};
use linework_core::{Bounds, Transform};

/// Edge-endpoint coalescing margin, in edge-parametric units.
pub const ENDPOINT_MARGIN: f64 = 1e-4;
/// Parallelism test threshold on the cross product of unit directions.
const PARALLEL_EPS: f64 = 1e-6;
/// Spans at or below this parametric length are discarded.
const SPAN_EPS: f64 = 1e-6;
/// Edges at or below this length are degenerate.
const ZERO_EDGE: f64 = 1e-9;
/// Upper bound on sweep lines per pattern family, to keep a bad
/// scale/boundary combination from exploding the output.
const MAX_SWEEP_LINES: i64 = 10_000;

/// Area-fill semantics selecting how nested boundary loops combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaFillStyle {
    /// Hatch alternating areas.
    OddParity,
    /// Hatch the outermost area only: clip against external/outermost loops.
    Outermost,
    /// Hatch through the entire area: a line is inside while any loop's
    /// signed winding counter is non-zero.
    ThroughEntireArea,
}

/// One closed boundary loop with its path-type flags.
#[derive(Debug, Clone)]
pub struct ClipLoop {
    pub points: Vec<DVec2>,
    pub external: bool,
    pub outermost: bool,
}

impl ClipLoop {
    pub fn external(points: Vec<DVec2>) -> Self {
        Self {
            points,
            external: true,
            outermost: false,
        }
    }
}

/// Build the OCS → pattern-space transform
/// `translate(−seed) · rotate(angle) · scale(1/scale)`.
pub fn ocs_to_pattern(seed: DVec2, angle: f64, scale: f64) -> Transform {
    Transform::translate(-seed)
        .then_rotate(angle)
        .then_scale(1.0 / scale)
}

#[derive(Debug, Clone, Copy)]
enum EdgeClass {
    /// Degenerate edge.
    Zero,
    /// Parallel to the clip line; `colinear` edges carry their projected
    /// parametric range on the line.
    Parallel {
        colinear: bool,
        t_start: f64,
        t_end: f64,
    },
    /// Proper crossing of the infinite clip line.
    Crossing { t_line: f64, t_edge: f64, side: i8 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum NodeKind {
    Toggle { side: i8 },
    Suppress,
    Unsuppress,
}

#[derive(Debug, Clone, Copy)]
struct Node {
    t: f64,
    loop_index: usize,
    kind: NodeKind,
}

impl NodeKind {
    /// Sort rank for equal-t nodes: suppression opens before toggles and
    /// closes after them.
    fn rank(&self) -> u8 {
        match self {
            NodeKind::Suppress => 0,
            NodeKind::Toggle { .. } => 1,
            NodeKind::Unsuppress => 2,
        }
    }
}

/// Clips lines against a fixed set of boundary loops.
#[derive(Debug)]
pub struct HatchClipper {
    loops: Vec<ClipLoop>,
    style: AreaFillStyle,
    /// Indices of the loops active under the style.
    active: Vec<usize>,
}

impl HatchClipper {
    pub fn new(loops: Vec<ClipLoop>, style: AreaFillStyle) -> Self {
        let active = loops
            .iter()
            .enumerate()
            .filter(|(_, l)| {
                if style == AreaFillStyle::Outermost {
                    l.external || l.outermost
                } else {
                    true
                }
            })
            .map(|(i, _)| i)
            .collect();
        Self {
            loops,
            style,
            active,
        }
    }

    pub fn loops(&self) -> &[ClipLoop] {
        &self.loops
    }

    /// Clip the segment `[p0, p1]` against the boundary.
    ///
    /// Returns ordered, non-overlapping `[t0, t1]` spans of positive length,
    /// clamped to `[0, 1]`.
    pub fn clip_line(&self, p0: DVec2, p1: DVec2) -> Vec<[f64; 2]> {
        let line_dir = p1 - p0;
        let line_len_sq = line_dir.length_squared();
        if line_len_sq < ZERO_EDGE * ZERO_EDGE {
            return Vec::new();
        }

        let mut nodes = Vec::new();
        for &loop_index in &self.active {
            self.collect_loop_nodes(loop_index, p0, line_dir, &mut nodes);
        }
        nodes.sort_by(|a, b| {
            a.t.partial_cmp(&b.t)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.kind.rank().cmp(&b.kind.rank()))
        });

        self.sweep(&nodes)
    }

    /// Classify every edge of a loop and emit intersection nodes.
    fn collect_loop_nodes(
        &self,
        loop_index: usize,
        p0: DVec2,
        line_dir: DVec2,
        nodes: &mut Vec<Node>,
    ) {
        let points = &self.loops[loop_index].points;
        let count = points.len();
        if count < 2 {
            return;
        }

        let classes: Vec<EdgeClass> = (0..count)
            .map(|i| classify_edge(points[i], points[(i + 1) % count], p0, line_dir))
            .collect();

        for i in 0..count {
            let EdgeClass::Crossing {
                t_line,
                t_edge,
                side,
            } = classes[i]
            else {
                continue;
            };
            if !(-ENDPOINT_MARGIN..=1.0 + ENDPOINT_MARGIN).contains(&t_edge) {
                continue;
            }
            if t_edge <= ENDPOINT_MARGIN {
                // Crossing at the edge start: already coalesced into the
                // predecessor's endpoint handling.
                continue;
            }
            if t_edge < 1.0 - ENDPOINT_MARGIN {
                nodes.push(Node {
                    t: t_line,
                    loop_index,
                    kind: NodeKind::Toggle { side },
                });
                continue;
            }

            // Endpoint crossing: coalesce with the next non-zero,
            // non-parallel edge along the loop, bridging colinear runs.
            let mut bridge: Option<(f64, f64)> = None;
            let mut partner: Option<i8> = None;
            for step in 1..count {
                match classes[(i + step) % count] {
                    EdgeClass::Zero => {}
                    EdgeClass::Parallel {
                        colinear,
                        t_start,
                        t_end,
                    } => {
                        if colinear {
                            let (lo, hi) = if t_start <= t_end {
                                (t_start, t_end)
                            } else {
                                (t_end, t_start)
                            };
                            bridge = Some(match bridge {
                                Some((a, b)) => (a.min(lo), b.max(hi)),
                                None => (lo, hi),
                            });
                        }
                    }
                    EdgeClass::Crossing {
                        side: next_side, ..
                    } => {
                        partner = Some(next_side);
                        break;
                    }
                }
            }

            // Same crossing side on both connected edges means the loop
            // passes through the line here: one toggle. Opposite sides mean
            // it only touches: none.
            if partner == Some(side) {
                nodes.push(Node {
                    t: t_line,
                    loop_index,
                    kind: NodeKind::Toggle { side },
                });
            }
            if let Some((lo, hi)) = bridge {
                nodes.push(Node {
                    t: lo,
                    loop_index,
                    kind: NodeKind::Suppress,
                });
                nodes.push(Node {
                    t: hi,
                    loop_index,
                    kind: NodeKind::Unsuppress,
                });
            }
        }
    }

    /// Sweep the sorted nodes into output spans.
    fn sweep(&self, nodes: &[Node]) -> Vec<[f64; 2]> {
        let mut segments = Vec::new();
        let mut counters = vec![0i32; self.loops.len()];
        let mut state = false;
        let mut suppress = 0i32;
        let mut seg_start = 0.0f64;

        let mut emit = |start: f64, end: f64, segments: &mut Vec<[f64; 2]>| {
            let start = start.max(0.0);
            let end = end.min(1.0);
            if end - start > SPAN_EPS {
                segments.push([start, end]);
            }
        };

        for node in nodes {
            match node.kind {
                NodeKind::Suppress => {
                    if state && suppress == 0 {
                        emit(seg_start, node.t, &mut segments);
                    }
                    suppress += 1;
                }
                NodeKind::Unsuppress => {
                    suppress = (suppress - 1).max(0);
                    if state && suppress == 0 {
                        seg_start = node.t;
                    }
                }
                NodeKind::Toggle { side } => {
                    let new_state = if self.style == AreaFillStyle::ThroughEntireArea {
                        counters[node.loop_index] += side as i32;
                        counters.iter().any(|c| *c != 0)
                    } else {
                        !state
                    };
                    if new_state != state {
                        if suppress == 0 {
                            if new_state {
                                seg_start = node.t;
                            } else {
                                emit(seg_start, node.t, &mut segments);
                            }
                        }
                        state = new_state;
                    }
                }
            }
        }
        segments
    }
}

fn classify_edge(a: DVec2, b: DVec2, p0: DVec2, line_dir: DVec2) -> EdgeClass {
    let edge_vec = b - a;
    let edge_len = edge_vec.length();
    if edge_len <= ZERO_EDGE {
        return EdgeClass::Zero;
    }

    let line_len_sq = line_dir.length_squared();
    let cross_unit = (edge_vec / edge_len).perp_dot(line_dir / line_len_sq.sqrt());
    if cross_unit.abs() <= PARALLEL_EPS {
        // Distance from the edge to the infinite line decides colinearity.
        let offset = a - p0;
        let distance = line_dir.perp_dot(offset).abs() / line_len_sq.sqrt();
        let t_start = offset.dot(line_dir) / line_len_sq;
        let t_end = (b - p0).dot(line_dir) / line_len_sq;
        return EdgeClass::Parallel {
            colinear: distance <= ENDPOINT_MARGIN,
            t_start,
            t_end,
        };
    }

    // Solve p0 + t·d = a + u·e.
    let denominator = line_dir.perp_dot(edge_vec);
    let offset = a - p0;
    let t_line = offset.perp_dot(edge_vec) / denominator;
    let t_edge = offset.perp_dot(line_dir) / denominator;
    EdgeClass::Crossing {
        t_line,
        t_edge,
        side: if edge_vec.perp_dot(line_dir) > 0.0 { 1 } else { -1 },
    }
}

/// Generate the clipped pattern-fill segments for a boundary.
///
/// `angle` (radians) and `scale` come from the hatch entity, `seed` from its
/// seed points. Returned segments are in the boundary's coordinate space.
pub fn pattern_fill_segments(
    clipper: &HatchClipper,
    pattern: &Pattern,
    angle: f64,
    scale: f64,
    seed: DVec2,
) -> Vec<[DVec2; 2]> {
    let mut segments = Vec::new();
    // Map boundary space into pattern space; pattern rotation maps back, so
    // the helper takes the negated hatch angle.
    let to_pattern = ocs_to_pattern(seed, -angle, scale);
    let Some(from_pattern) = to_pattern.inverse() else {
        tracing::warn!(scale, "Degenerate hatch pattern transform, skipping fill");
        return segments;
    };

    for line in &pattern.lines {
        sweep_pattern_line(
            clipper,
            line,
            pattern.offset_in_line_space,
            &to_pattern,
            &from_pattern,
            &mut segments,
        );
    }
    segments
}

/// Sweep one pattern line family across the boundary and clip each line.
fn sweep_pattern_line(
    clipper: &HatchClipper,
    line: &PatternLine,
    offset_in_line_space: bool,
    to_pattern: &Transform,
    from_pattern: &Transform,
    segments: &mut Vec<[DVec2; 2]>,
) {
    // Line space: the family is horizontal, members are separated along y.
    let to_line = to_pattern.then_rotate(-line.angle);
    let from_line = Transform::rotate(line.angle).then(from_pattern);

    let rotate = DMat2::from_angle(-line.angle);
    let base = rotate * line.base;
    let offset = if offset_in_line_space {
        line.offset
    } else {
        rotate * line.offset
    };
    if offset.y.abs() <= f64::EPSILON {
        tracing::warn!("Pattern line family with zero spacing, skipping");
        return;
    }

    let mut bounds = Bounds::new();
    for l in clipper.loops() {
        for &point in &l.points {
            bounds.add_point(to_line.transform_point(point));
        }
    }
    if bounds.is_empty() {
        return;
    }

    let dy = offset.y;
    let first = ((bounds.min_y - base.y) / dy).ceil() as i64;
    let last = ((bounds.max_y - base.y) / dy).floor() as i64;
    let (first, mut last) = if first <= last {
        (first, last)
    } else {
        (last, first)
    };
    if last - first > MAX_SWEEP_LINES {
        tracing::warn!(
            lines = last - first + 1,
            "Hatch sweep line count clamped"
        );
        last = first + MAX_SWEEP_LINES;
    }

    // Margin keeps the sweep endpoints strictly outside the boundary.
    let margin = (bounds.width() * 0.01).max(1e-6);
    for i in first..=last {
        let y = base.y + i as f64 * dy;
        let start = from_line.transform_point(DVec2::new(bounds.min_x - margin, y));
        let end = from_line.transform_point(DVec2::new(bounds.max_x + margin, y));
        for [t0, t1] in clipper.clip_line(start, end) {
            segments.push([start.lerp(end, t0), start.lerp(end, t1)]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> ClipLoop {
        ClipLoop::external(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(size, 0.0),
            DVec2::new(size, size),
            DVec2::new(0.0, size),
        ])
    }

    #[test]
    fn test_full_interior_span() {
        // Horizontal line through the middle of a 10x10 square.
        let clipper = HatchClipper::new(vec![square(10.0)], AreaFillStyle::OddParity);
        let spans = clipper.clip_line(DVec2::new(0.0, 5.0), DVec2::new(10.0, 5.0));
        assert_eq!(spans.len(), 1);
        assert!((spans[0][0] - 0.0).abs() < 1e-9);
        assert!((spans[0][1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_line_outside_is_empty() {
        let clipper = HatchClipper::new(vec![square(10.0)], AreaFillStyle::OddParity);
        let spans = clipper.clip_line(DVec2::new(0.0, 20.0), DVec2::new(10.0, 20.0));
        assert!(spans.is_empty());
    }

    #[test]
    fn test_hole_splits_span() {
        // Outer 10x10 square, inner 2x2 hole centered at (5,5).
        let outer = square(10.0);
        let inner = ClipLoop {
            points: vec![
                DVec2::new(4.0, 4.0),
                DVec2::new(6.0, 4.0),
                DVec2::new(6.0, 6.0),
                DVec2::new(4.0, 6.0),
            ],
            external: false,
            outermost: false,
        };
        let clipper = HatchClipper::new(vec![outer, inner], AreaFillStyle::OddParity);
        let spans = clipper.clip_line(DVec2::new(-1.0, 5.0), DVec2::new(11.0, 5.0));
        assert_eq!(spans.len(), 2);
        // Spans are ordered and non-overlapping.
        assert!(spans[0][1] <= spans[1][0]);
        // Gap corresponds to x in [4, 6].
        let to_x = |t: f64| -1.0 + t * 12.0;
        assert!((to_x(spans[0][1]) - 4.0).abs() < 1e-6);
        assert!((to_x(spans[1][0]) - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_through_entire_area_ignores_hole() {
        let outer = square(10.0);
        let inner = ClipLoop {
            points: vec![
                DVec2::new(4.0, 4.0),
                DVec2::new(6.0, 4.0),
                DVec2::new(6.0, 6.0),
                DVec2::new(4.0, 6.0),
            ],
            external: false,
            outermost: false,
        };
        let clipper = HatchClipper::new(vec![outer, inner], AreaFillStyle::ThroughEntireArea);
        let spans = clipper.clip_line(DVec2::new(0.0, 5.0), DVec2::new(10.0, 5.0));
        assert_eq!(spans.len(), 1);
        assert!((spans[0][0] - 0.0).abs() < 1e-9);
        assert!((spans[0][1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_outermost_filters_internal_loops() {
        let outer = square(10.0);
        let inner = ClipLoop {
            points: vec![
                DVec2::new(4.0, 4.0),
                DVec2::new(6.0, 4.0),
                DVec2::new(6.0, 6.0),
                DVec2::new(4.0, 6.0),
            ],
            external: false,
            outermost: false,
        };
        let clipper = HatchClipper::new(vec![outer, inner], AreaFillStyle::Outermost);
        let spans = clipper.clip_line(DVec2::new(0.0, 5.0), DVec2::new(10.0, 5.0));
        // The non-outermost hole does not clip.
        assert_eq!(spans.len(), 1);
        assert!((spans[0][1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_vertex_touch_does_not_toggle() {
        // Diamond touching the line y=0 only at its bottom vertex.
        let diamond = ClipLoop::external(vec![
            DVec2::new(5.0, 0.0),
            DVec2::new(8.0, 3.0),
            DVec2::new(5.0, 6.0),
            DVec2::new(2.0, 3.0),
        ]);
        let clipper = HatchClipper::new(vec![diamond], AreaFillStyle::OddParity);
        let spans = clipper.clip_line(DVec2::new(0.0, 0.0), DVec2::new(10.0, 0.0));
        assert!(spans.is_empty());
    }

    #[test]
    fn test_vertex_pass_through_toggles_once() {
        // Diamond whose left vertex sits exactly on the line y=3.
        let diamond = ClipLoop::external(vec![
            DVec2::new(5.0, 0.0),
            DVec2::new(8.0, 3.0),
            DVec2::new(5.0, 6.0),
            DVec2::new(2.0, 3.0),
        ]);
        let clipper = HatchClipper::new(vec![diamond], AreaFillStyle::OddParity);
        let spans = clipper.clip_line(DVec2::new(0.0, 3.0), DVec2::new(10.0, 3.0));
        // Interior span between the two side vertices.
        assert_eq!(spans.len(), 1);
        let to_x = |t: f64| t * 10.0;
        assert!((to_x(spans[0][0]) - 2.0).abs() < 1e-6);
        assert!((to_x(spans[0][1]) - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_colinear_bridge_suppressed() {
        // A square with a notch whose bottom edge lies on the clip line:
        // the overlap is bridged and stays off.
        let shape = ClipLoop::external(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(4.0, 0.0),
            DVec2::new(4.0, 2.0),
            DVec2::new(6.0, 2.0),
            DVec2::new(6.0, 0.0),
            DVec2::new(10.0, 0.0),
            DVec2::new(10.0, 5.0),
            DVec2::new(0.0, 5.0),
        ]);
        let clipper = HatchClipper::new(vec![shape], AreaFillStyle::OddParity);
        let spans = clipper.clip_line(DVec2::new(-1.0, 2.0), DVec2::new(11.0, 2.0));
        // Inside from x=0..4 and x=6..10; the notch floor (4..6) is a
        // colinear stretch along the line and is suppressed.
        assert_eq!(spans.len(), 2);
        let to_x = |t: f64| -1.0 + t * 12.0;
        assert!((to_x(spans[0][0]) - 0.0).abs() < 1e-6);
        assert!((to_x(spans[0][1]) - 4.0).abs() < 1e-6);
        assert!((to_x(spans[1][0]) - 6.0).abs() < 1e-6);
        assert!((to_x(spans[1][1]) - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_pattern_fill_counts() {
        use crate::PatternRegistry;
        let registry = PatternRegistry::imperial();
        let pattern = registry.get("LINE").unwrap();
        let clipper = HatchClipper::new(vec![square(1.0)], AreaFillStyle::OddParity);
        let segments =
            pattern_fill_segments(&clipper, pattern, 0.0, 1.0, DVec2::ZERO);
        // Spacing 0.125 over a unit square: interior rows at y = 0.125..0.875.
        assert_eq!(segments.len(), 7);
        for [a, b] in &segments {
            assert!((a.y - b.y).abs() < 1e-9);
            assert!((b.x - a.x).abs() > 0.9);
        }
    }
}
