//! B-spline sampling via de Boor's algorithm.

use crate::TessellationError;
use glam::{DVec2, DVec3};

/// Samples per control point when tessellating a spline.
pub const SPLINE_SUBDIVISION: usize = 4;

/// A NURBS curve in control-point form.
#[derive(Debug, Clone)]
pub struct SplineCurve<'a> {
    pub degree: usize,
    pub control_points: &'a [DVec2],
    /// Knot vector; `None` selects uniform integer knots.
    pub knots: Option<&'a [f64]>,
    /// Per-control-point weights; `None` means unweighted.
    pub weights: Option<&'a [f64]>,
}

impl<'a> SplineCurve<'a> {
    /// Sample the curve at `control_points · SPLINE_SUBDIVISION + 1` uniform
    /// parameter values over the valid domain.
    pub fn tessellate(&self) -> Result<Vec<DVec2>, TessellationError> {
        let n = self.control_points.len();
        if self.degree < 1 || self.degree + 1 > n {
            return Err(TessellationError::InvalidDegree {
                degree: self.degree,
                control_points: n,
            });
        }

        let knots: Vec<f64> = match self.knots {
            Some(knots) => {
                let expected = n + self.degree + 1;
                if knots.len() != expected {
                    return Err(TessellationError::InvalidKnotVector {
                        expected,
                        actual: knots.len(),
                    });
                }
                knots.to_vec()
            }
            None => (0..n + self.degree + 1).map(|i| i as f64).collect(),
        };

        // Homogeneous lift: (x·w, y·w, w). Unweighted curves use w = 1, which
        // makes the final division a no-op.
        let lifted: Vec<DVec3> = self
            .control_points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let w = self.weights.map_or(1.0, |weights| weights[i]);
                DVec3::new(p.x * w, p.y * w, w)
            })
            .collect();

        let domain_start = knots[self.degree];
        let domain_end = knots[n];
        let sample_count = n * SPLINE_SUBDIVISION + 1;

        let mut samples = Vec::with_capacity(sample_count);
        for i in 0..sample_count {
            let t = domain_start
                + (domain_end - domain_start) * i as f64 / (sample_count - 1) as f64;
            let point = de_boor(self.degree, &lifted, &knots, t);
            samples.push(DVec2::new(point.x / point.z, point.y / point.z));
        }
        Ok(samples)
    }
}

/// Evaluate the curve at parameter `t` by de Boor recursion.
fn de_boor(degree: usize, points: &[DVec3], knots: &[f64], t: f64) -> DVec3 {
    let n = points.len();

    // Knot span index k with knots[k] <= t < knots[k+1], clamped into the
    // valid range so the domain end evaluates on the last span.
    let mut k = n - 1;
    for i in degree..n {
        if t < knots[i + 1] {
            k = i;
            break;
        }
    }

    let mut d: Vec<DVec3> = (0..=degree).map(|j| points[j + k - degree]).collect();
    for r in 1..=degree {
        for j in (r..=degree).rev() {
            let i = j + k - degree;
            let denominator = knots[i + degree - r + 1] - knots[i];
            let alpha = if denominator.abs() < f64::EPSILON {
                0.0
            } else {
                (t - knots[i]) / denominator
            };
            d[j] = d[j - 1] * (1.0 - alpha) + d[j] * alpha;
        }
    }
    d[degree]
}
