//! Spline geometry kernel.
//!
//! Stateless functions that turn sparse control ("catmull") points into dense,
//! fixed-resolution serie polylines with per-sample frames, offset curves along
//! those frames, and decouple/recombine the altitude profile from the planar shape.
//!
//! Degenerate input (coincident consecutive control points, zero tangents,
//! non-increasing altitude stations) is rejected with [`GeometryError`].

pub mod altitude;
pub mod frame;
pub mod hermite;
pub mod offset;
pub mod tangent;
mod vector;

pub use altitude::{
    altitude_at, arc_lengths, catmull_stations, decouple_altitude, extend_altitude,
    follow_altitude, recombine_altitude, stretch_altitude, DecoupledAltitude, RecombinedCurve,
};
pub use frame::{compute_normals_and_tangents, pin_end_normals, SerieFrames};
pub use hermite::{hermite_segment, sample_hermite, span_lengths, SamplePolicy};
pub use offset::{
    offset_by_normal, offset_by_normal_each, resolve_catmull_indices, signed_offsets, PointOffset,
};
pub use tangent::{fit_altitude_tangents, fit_tangents};
pub use vector::{planar_distance, planar_length};

/// Distances below this are treated as zero.
pub const EPSILON: f64 = 1e-9;

/// Kernel failure.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Not enough control points for the operation
    TooFewPoints { needed: usize, got: usize },
    /// Two consecutive control points coincide in the plane
    DegenerateSegment { index: usize },
    /// A tangent (or finite-difference direction) has zero length
    ZeroTangent { index: usize },
    /// Requested sample count below two
    InvalidSampleCount(usize),
    /// Parallel arrays disagree in length
    LengthMismatch { expected: usize, got: usize },
    /// Sample index outside the serie
    IndexOutOfRange { index: usize, len: usize },
    /// Altitude stations must strictly increase
    NonIncreasingStation { index: usize },
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryError::TooFewPoints { needed, got } => {
                write!(f, "Need at least {} points, got {}", needed, got)
            }
            GeometryError::DegenerateSegment { index } => {
                write!(f, "Control points {} and {} coincide", index, index + 1)
            }
            GeometryError::ZeroTangent { index } => {
                write!(f, "Zero-length tangent at point {}", index)
            }
            GeometryError::InvalidSampleCount(n) => write!(f, "Invalid sample count: {}", n),
            GeometryError::LengthMismatch { expected, got } => {
                write!(f, "Length mismatch: expected {}, got {}", expected, got)
            }
            GeometryError::IndexOutOfRange { index, len } => {
                write!(f, "Index {} out of range for {} samples", index, len)
            }
            GeometryError::NonIncreasingStation { index } => {
                write!(f, "Altitude station {} does not increase", index)
            }
        }
    }
}

impl std::error::Error for GeometryError {}
