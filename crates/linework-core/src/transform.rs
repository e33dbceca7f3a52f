//! 2D affine transformations for CAD coordinates.
//!
//! Wraps [`glam::DAffine2`] with an explicit left-to-right composition API:
//! `Transform::translate(a).then_rotate(r)` first translates, then rotates.
//! Drawing coordinates are f64 throughout; packed output is produced as f32
//! only at serialization time.

use bytemuck::{Pod, Zeroable};
use glam::{DAffine2, DMat2, DVec2};

/// A 2D affine transformation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    affine: DAffine2,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// Identity transform (no transformation).
    pub const IDENTITY: Self = Self {
        affine: DAffine2::IDENTITY,
    };

    /// Create from a raw affine.
    pub fn from_affine(affine: DAffine2) -> Self {
        Self { affine }
    }

    /// Create a translation transform.
    pub fn translate(offset: DVec2) -> Self {
        Self {
            affine: DAffine2::from_translation(offset),
        }
    }

    /// Create a rotation transform (angle in radians, counter-clockwise).
    pub fn rotate(angle: f64) -> Self {
        Self {
            affine: DAffine2::from_angle(angle),
        }
    }

    /// Create a uniform scale transform.
    pub fn scale(factor: f64) -> Self {
        Self {
            affine: DAffine2::from_scale(DVec2::splat(factor)),
        }
    }

    /// Create a non-uniform scale transform.
    pub fn scale_xy(scale: DVec2) -> Self {
        Self {
            affine: DAffine2::from_scale(scale),
        }
    }

    /// Mirror about the Y axis (negate x).
    ///
    /// Used for entities with a negative OCS extrusion Z.
    pub fn mirror_x() -> Self {
        Self::scale_xy(DVec2::new(-1.0, 1.0))
    }

    /// Combine two transforms: apply `self` first, then `other`.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            affine: other.affine * self.affine,
        }
    }

    /// Add a translation after this transform.
    pub fn then_translate(&self, offset: DVec2) -> Self {
        self.then(&Transform::translate(offset))
    }

    /// Add a rotation after this transform.
    pub fn then_rotate(&self, angle: f64) -> Self {
        self.then(&Transform::rotate(angle))
    }

    /// Add a uniform scale after this transform.
    pub fn then_scale(&self, factor: f64) -> Self {
        self.then(&Transform::scale(factor))
    }

    /// Add a non-uniform scale after this transform.
    pub fn then_scale_xy(&self, scale: DVec2) -> Self {
        self.then(&Transform::scale_xy(scale))
    }

    /// Transform a point.
    #[inline]
    pub fn transform_point(&self, point: DVec2) -> DVec2 {
        self.affine.transform_point2(point)
    }

    /// Transform a vector (ignores translation).
    #[inline]
    pub fn transform_vector(&self, vector: DVec2) -> DVec2 {
        self.affine.transform_vector2(vector)
    }

    /// The linear part of the transform.
    pub fn matrix2(&self) -> DMat2 {
        self.affine.matrix2
    }

    /// The translation component.
    pub fn translation(&self) -> DVec2 {
        self.affine.translation
    }

    /// The inverse transform, if the linear part is invertible.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.affine.matrix2.determinant();
        if det.abs() < f64::EPSILON {
            None
        } else {
            Some(Self {
                affine: self.affine.inverse(),
            })
        }
    }

    /// Export the 3×2 portion as six row-major f32 values.
    ///
    /// Layout is two 3-vectors: `[m00, m01, tx, m10, m11, ty]`, so
    /// `x' = m00·x + m01·y + tx` and `y' = m10·x + m11·y + ty`.
    pub fn to_rows_3x2(&self) -> InstanceTransform {
        let m = self.affine.matrix2;
        let t = self.affine.translation;
        InstanceTransform {
            rows: [
                m.x_axis.x as f32,
                m.y_axis.x as f32,
                t.x as f32,
                m.x_axis.y as f32,
                m.y_axis.y as f32,
                t.y as f32,
            ],
        }
    }
}

impl std::ops::Mul<DVec2> for Transform {
    type Output = DVec2;

    fn mul(self, rhs: DVec2) -> DVec2 {
        self.transform_point(rhs)
    }
}

/// Packed per-instance transform: a 3×2 affine as six row-major floats.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct InstanceTransform {
    pub rows: [f32; 6],
}

static_assertions::const_assert_eq!(std::mem::size_of::<InstanceTransform>(), 24);
