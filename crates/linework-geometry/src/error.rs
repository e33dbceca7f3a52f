/// Errors raised for invalid tessellation input.
///
/// These are configuration errors in the sense of the build contract: they
/// indicate malformed drawing data that cannot be skipped locally (the
/// caller decides whether to abort).
#[derive(Debug, Clone, PartialEq)]
pub enum TessellationError {
    /// Knot vector length does not match `control_points + degree + 1`.
    InvalidKnotVector { expected: usize, actual: usize },

    /// Spline degree out of the supported range for the control point count.
    InvalidDegree { degree: usize, control_points: usize },

    /// Out-of-range tessellation parameter (non-positive or non-finite
    /// segment angle, absurd subdivision floor).
    InvalidParameter { name: &'static str, value: f64 },
}

impl std::fmt::Display for TessellationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TessellationError::InvalidKnotVector { expected, actual } => {
                write!(f, "Invalid knot vector: expected {} knots, got {}", expected, actual)
            }
            TessellationError::InvalidDegree {
                degree,
                control_points,
            } => write!(
                f,
                "Invalid spline degree {} for {} control points",
                degree, control_points
            ),
            TessellationError::InvalidParameter { name, value } => {
                write!(f, "Invalid tessellation parameter {}: {}", name, value)
            }
        }
    }
}

impl std::error::Error for TessellationError {}
