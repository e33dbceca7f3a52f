//! Glyph outline triangulation using Lyon.

use crate::{CharPath, PathCommand};
use glam::DVec2;
use lyon::lyon_tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex as LyonFillVertex,
    VertexBuffers,
};
use lyon::path::PathEvent;

/// A triangulated glyph at nominal size 1.
#[derive(Debug, Clone, Default)]
pub struct GlyphMesh {
    pub vertices: Vec<DVec2>,
    pub indices: Vec<u32>,
}

impl GlyphMesh {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Triangulate a glyph outline.
///
/// Curves are flattened into `curve_subdivision` segments before filling.
/// Hole contours are resolved by the non-zero fill rule, relying on the
/// provider's winding (outer CCW, holes CW). A failed fill produces an empty
/// mesh and a warning; the glyph is then simply not drawn.
pub fn triangulate_glyph(path: &CharPath, curve_subdivision: u32) -> GlyphMesh {
    let events = flatten_outline(&path.commands, curve_subdivision.max(1));
    if events.is_empty() {
        return GlyphMesh::default();
    }

    let mut buffers: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
    let options = FillOptions::default().with_fill_rule(FillRule::NonZero);

    let mut tessellator = FillTessellator::new();
    let result = tessellator.tessellate(
        events.iter().copied(),
        &options,
        &mut BuffersBuilder::new(&mut buffers, |vertex: LyonFillVertex| {
            [vertex.position().x, vertex.position().y]
        }),
    );

    if result.is_err() {
        tracing::warn!("Glyph fill tessellation failed");
        return GlyphMesh::default();
    }

    GlyphMesh {
        vertices: buffers
            .vertices
            .iter()
            .map(|v| DVec2::new(v[0] as f64, v[1] as f64))
            .collect(),
        indices: buffers.indices,
    }
}

/// Flatten outline commands into line-only Lyon path events.
fn flatten_outline(commands: &[PathCommand], subdivision: u32) -> Vec<PathEvent> {
    let mut events = Vec::new();
    let mut current = lyon::math::point(0.0, 0.0);
    let mut subpath_start = current;
    let mut in_subpath = false;

    for command in commands {
        match *command {
            PathCommand::MoveTo(to) => {
                if in_subpath {
                    events.push(PathEvent::End {
                        last: current,
                        first: subpath_start,
                        close: false,
                    });
                }
                current = to_point(to);
                subpath_start = current;
                events.push(PathEvent::Begin { at: current });
                in_subpath = true;
            }
            PathCommand::LineTo(to) => {
                let from = current;
                current = to_point(to);
                events.push(PathEvent::Line { from, to: current });
            }
            PathCommand::QuadTo { control, to } => {
                let start = from_point(current);
                for i in 1..=subdivision {
                    let t = i as f64 / subdivision as f64;
                    let point = quad_at(start, control, to, t);
                    let from = current;
                    current = to_point(point);
                    events.push(PathEvent::Line { from, to: current });
                }
            }
            PathCommand::CubicTo {
                control1,
                control2,
                to,
            } => {
                let start = from_point(current);
                for i in 1..=subdivision {
                    let t = i as f64 / subdivision as f64;
                    let point = cubic_at(start, control1, control2, to, t);
                    let from = current;
                    current = to_point(point);
                    events.push(PathEvent::Line { from, to: current });
                }
            }
            PathCommand::Close => {
                events.push(PathEvent::End {
                    last: current,
                    first: subpath_start,
                    close: true,
                });
                current = subpath_start;
                in_subpath = false;
            }
        }
    }
    if in_subpath {
        events.push(PathEvent::End {
            last: current,
            first: subpath_start,
            close: true,
        });
    }
    events
}

fn to_point(p: DVec2) -> lyon::math::Point {
    lyon::math::point(p.x as f32, p.y as f32)
}

fn from_point(p: lyon::math::Point) -> DVec2 {
    DVec2::new(p.x as f64, p.y as f64)
}

fn quad_at(p0: DVec2, control: DVec2, p1: DVec2, t: f64) -> DVec2 {
    let u = 1.0 - t;
    p0 * (u * u) + control * (2.0 * u * t) + p1 * (t * t)
}

fn cubic_at(p0: DVec2, c1: DVec2, c2: DVec2, p1: DVec2, t: f64) -> DVec2 {
    let u = 1.0 - t;
    p0 * (u * u * u) + c1 * (3.0 * u * u * t) + c2 * (3.0 * u * t * t) + p1 * (t * t * t)
}
