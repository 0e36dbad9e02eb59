//! Hermite interpolation and fixed-count arc-length resampling.
//!
//! Each span between consecutive control points is a cubic Hermite curve,
//! evaluated as the equivalent cubic Bézier `P0, P0 + T0/3, P1 - T1/3, P1`.
//! Height is interpolated linearly along each span; the altitude pass in
//! [`super::altitude`] replaces it afterwards.

use kurbo::{CubicBez, ParamCurve, ParamCurveArclen, Point, Vec2};
use shared::Point3D;

use super::tangent::fit_tangents;
use super::vector::{planar_distance, planar_length, to_point, to_vec2};
use super::{GeometryError, EPSILON};

const ARCLEN_ACCURACY: f64 = 1e-7;

/// How a curve is resampled to its serie points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplePolicy {
    /// Exactly `n` points spaced uniformly by arc length, so that derived curves
    /// index 1:1 against the reference line.
    AlignedNum(usize),
    /// For short connector spans between independently oriented roads: tangent
    /// magnitudes are clamped to the chord, every span is subdivided, and the
    /// refined polyline is resampled to `count` points.
    ControlRefine { count: usize, subdivisions: usize },
}

impl SamplePolicy {
    pub fn count(&self) -> usize {
        match *self {
            SamplePolicy::AlignedNum(n) => n,
            SamplePolicy::ControlRefine { count, .. } => count,
        }
    }
}

/// Planar Hermite span as a cubic Bézier.
pub fn hermite_segment(p0: Point, t0: Vec2, p1: Point, t1: Vec2) -> CubicBez {
    CubicBez::new(p0, p0 + t0 / 3.0, p1 - t1 / 3.0, p1)
}

/// Resample the Hermite curve through `points` / `tangents` according to `policy`.
///
/// The first and last output points equal the first and last control points
/// exactly (height included).
pub fn sample_hermite(
    points: &[Point3D],
    tangents: &[Point3D],
    policy: SamplePolicy,
) -> Result<Vec<Point3D>, GeometryError> {
    let count = policy.count();
    if count < 2 {
        return Err(GeometryError::InvalidSampleCount(count));
    }
    validate(points, tangents)?;

    match policy {
        SamplePolicy::AlignedNum(n) => Ok(sample_aligned(points, tangents, n)),
        SamplePolicy::ControlRefine {
            count,
            subdivisions,
        } => {
            let refined = refine(points, tangents, subdivisions.max(1));
            let refined_tangents = fit_tangents(&refined)?;
            Ok(sample_aligned(&refined, &refined_tangents, count))
        }
    }
}

/// Planar arc length of every Hermite span between consecutive control points.
pub fn span_lengths(points: &[Point3D], tangents: &[Point3D]) -> Result<Vec<f64>, GeometryError> {
    validate(points, tangents)?;
    Ok(segments(points, tangents)
        .iter()
        .map(|s| s.arclen(ARCLEN_ACCURACY))
        .collect())
}

fn validate(points: &[Point3D], tangents: &[Point3D]) -> Result<(), GeometryError> {
    if points.len() < 2 {
        return Err(GeometryError::TooFewPoints {
            needed: 2,
            got: points.len(),
        });
    }
    if tangents.len() != points.len() {
        return Err(GeometryError::LengthMismatch {
            expected: points.len(),
            got: tangents.len(),
        });
    }
    for (index, pair) in points.windows(2).enumerate() {
        if planar_distance(pair[0], pair[1]) < EPSILON {
            return Err(GeometryError::DegenerateSegment { index });
        }
    }
    if let Some(index) = tangents.iter().position(|t| planar_length(*t) < EPSILON) {
        return Err(GeometryError::ZeroTangent { index });
    }
    Ok(())
}

fn segments(points: &[Point3D], tangents: &[Point3D]) -> Vec<CubicBez> {
    (0..points.len() - 1)
        .map(|i| {
            hermite_segment(
                to_point(points[i]),
                to_vec2(tangents[i]),
                to_point(points[i + 1]),
                to_vec2(tangents[i + 1]),
            )
        })
        .collect()
}

fn sample_aligned(points: &[Point3D], tangents: &[Point3D], count: usize) -> Vec<Point3D> {
    let segs = segments(points, tangents);
    let lengths: Vec<f64> = segs.iter().map(|s| s.arclen(ARCLEN_ACCURACY)).collect();
    let total: f64 = lengths.iter().sum();
    let last = points.len() - 1;

    let mut out = Vec::with_capacity(count);
    let mut seg = 0;
    let mut start = 0.0;
    for k in 0..count {
        if k == 0 {
            out.push(points[0]);
            continue;
        }
        if k == count - 1 {
            out.push(points[last]);
            continue;
        }
        let target = total * k as f64 / (count - 1) as f64;
        while seg < segs.len() - 1 && start + lengths[seg] < target {
            start += lengths[seg];
            seg += 1;
        }
        let local = (target - start).clamp(0.0, lengths[seg]);
        let t = segs[seg].inv_arclen(local, ARCLEN_ACCURACY);
        let p = segs[seg].eval(t);
        let frac = if lengths[seg] > 0.0 {
            local / lengths[seg]
        } else {
            0.0
        };
        let z = points[seg].z + (points[seg + 1].z - points[seg].z) * frac;
        out.push(Point3D::new(p.x, p.y, z));
    }
    out
}

fn clamp_magnitude(v: Vec2, max: f64) -> Vec2 {
    let len = v.hypot();
    if len > max {
        v * (max / len)
    } else {
        v
    }
}

fn refine(points: &[Point3D], tangents: &[Point3D], subdivisions: usize) -> Vec<Point3D> {
    let mut refined = Vec::with_capacity((points.len() - 1) * subdivisions + 1);
    refined.push(points[0]);
    for i in 0..points.len() - 1 {
        let chord = planar_distance(points[i], points[i + 1]);
        let seg = hermite_segment(
            to_point(points[i]),
            clamp_magnitude(to_vec2(tangents[i]), chord),
            to_point(points[i + 1]),
            clamp_magnitude(to_vec2(tangents[i + 1]), chord),
        );
        for j in 1..=subdivisions {
            let u = j as f64 / subdivisions as f64;
            if j == subdivisions {
                refined.push(points[i + 1]);
                continue;
            }
            let p = seg.eval(u);
            let z = points[i].z + (points[i + 1].z - points[i].z) * u;
            refined.push(Point3D::new(p.x, p.y, z));
        }
    }
    refined
}
