//! Linework Geometry
//!
//! Curve tessellation for the scene builder:
//! - Arc/ellipse/circle sampling by maximum segment angle
//! - Polyline bulge expansion
//! - B-spline evaluation (de Boor)
//! - Hatch pattern model, `.pat` parsing and boundary clipping

mod arc;
mod error;
mod hatch;
mod pattern;
mod spline;

pub use arc::*;
pub use error::TessellationError;
pub use hatch::*;
pub use pattern::*;
pub use spline::*;
