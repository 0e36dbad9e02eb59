//! Altitude decoupling.
//!
//! The height profile of a curve is kept as a separate 1-D Hermite curve over
//! planar arc length (x = distance from the curve start, y = altitude). Planar
//! edits and altitude edits can then be applied independently and recombined by
//! evaluating the profile at the arc length of every serie point.

use kurbo::{ParamCurve, Vec2};
use shared::{Point2D, Point3D};

use super::hermite::{hermite_segment, span_lengths};
use super::tangent::fit_altitude_tangents;
use super::vector::{planar_distance, station_point};
use super::{GeometryError, EPSILON};

const BISECTION_STEPS: usize = 64;
/// Height differences below this do not lift a derived line off its reference.
const LIFT_TOLERANCE: f64 = 1e-6;
/// Profile stations closer than this to a control station are dropped.
const STATION_MERGE: f64 = 1e-6;

/// Altitude control points and tangents over arc length.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoupledAltitude {
    pub points: Vec<Point2D>,
    pub tangents: Vec<Point2D>,
}

/// Control and serie points after the altitude profile was substituted.
#[derive(Debug, Clone, PartialEq)]
pub struct RecombinedCurve {
    pub catmull_points: Vec<Point3D>,
    pub serie_points: Vec<Point3D>,
}

/// Cumulative planar arc length at every serie point (starts at 0).
pub fn arc_lengths(serie: &[Point3D]) -> Vec<f64> {
    let mut total = 0.0;
    let mut out = Vec::with_capacity(serie.len());
    for (i, p) in serie.iter().enumerate() {
        if i > 0 {
            total += planar_distance(serie[i - 1], *p);
        }
        out.push(total);
    }
    out
}

/// Arc-length station of every control point along its own planar curve.
///
/// Stations come from the exact Hermite span lengths, scaled so that the last
/// one equals the serie length. Distinct control points always get strictly
/// increasing stations, however densely they are placed.
pub fn catmull_stations(
    catmull: &[Point3D],
    tangents: &[Point3D],
    serie: &[Point3D],
) -> Result<Vec<f64>, GeometryError> {
    if serie.len() < 2 {
        return Err(GeometryError::TooFewPoints {
            needed: 2,
            got: serie.len(),
        });
    }
    let lengths = span_lengths(catmull, tangents)?;
    let total: f64 = lengths.iter().sum();
    let serie_total = arc_lengths(serie)[serie.len() - 1];
    if total < EPSILON || serie_total < EPSILON {
        return Err(GeometryError::DegenerateSegment { index: 0 });
    }

    let scale = serie_total / total;
    let mut stations = Vec::with_capacity(catmull.len());
    let mut s = 0.0;
    stations.push(s);
    for (i, length) in lengths.iter().enumerate() {
        s += length;
        stations.push(if i == lengths.len() - 1 {
            serie_total
        } else {
            s * scale
        });
    }
    Ok(stations)
}

/// Extract the altitude profile carried by the control points' heights.
pub fn decouple_altitude(
    catmull: &[Point3D],
    stations: &[f64],
) -> Result<DecoupledAltitude, GeometryError> {
    if stations.len() != catmull.len() {
        return Err(GeometryError::LengthMismatch {
            expected: catmull.len(),
            got: stations.len(),
        });
    }
    let points: Vec<Point2D> = catmull
        .iter()
        .zip(stations)
        .map(|(c, &s)| Point2D::new(s, c.z))
        .collect();
    let tangents = fit_altitude_tangents(&points)?;
    Ok(DecoupledAltitude { points, tangents })
}

/// Stretch a profile along its stations so that it spans `[0, length]`.
///
/// Heights and slopes relative to the stretched stations keep their shape: the
/// Hermite curve is scaled horizontally as a whole.
pub fn stretch_altitude(
    profile: &DecoupledAltitude,
    length: f64,
) -> Result<DecoupledAltitude, GeometryError> {
    let n = profile.points.len();
    if n < 2 {
        return Err(GeometryError::TooFewPoints { needed: 2, got: n });
    }
    if profile.tangents.len() != n {
        return Err(GeometryError::LengthMismatch {
            expected: n,
            got: profile.tangents.len(),
        });
    }
    let start = profile.points[0].x;
    let span = profile.points[n - 1].x - start;
    if span <= EPSILON {
        return Err(GeometryError::NonIncreasingStation { index: n - 1 });
    }

    let k = length / span;
    let mut points: Vec<Point2D> = profile
        .points
        .iter()
        .map(|p| Point2D::new((p.x - start) * k, p.y))
        .collect();
    points[n - 1].x = length;
    let tangents = profile
        .tangents
        .iter()
        .map(|t| Point2D::new(t.x * k, t.y))
        .collect();
    Ok(DecoupledAltitude { points, tangents })
}

/// Profile of a curve that gained one control point at its end.
///
/// The old profile is stretched to end at `old_end`, the station of the former
/// last control point, and one point at (`length`, `height`) is appended. Only
/// the trailing tangent pair is refitted.
pub fn extend_altitude(
    profile: &DecoupledAltitude,
    old_end: f64,
    length: f64,
    height: f64,
) -> Result<DecoupledAltitude, GeometryError> {
    let mut out = stretch_altitude(profile, old_end)?;
    out.points.push(Point2D::new(length, height));
    let fitted = fit_altitude_tangents(&out.points)?;
    let n = out.points.len();
    out.tangents[n - 2] = fitted[n - 2];
    out.tangents.push(fitted[n - 1]);
    Ok(out)
}

/// Profile of a line running alongside a curve whose profile is `profile`.
///
/// The reference profile is stretched to the line's length (`stations` last
/// value). Where the line's control heights sit off that profile, the
/// difference is interpolated linearly between the line's control stations
/// and added on top, and the line's control stations become profile points.
pub fn follow_altitude(
    profile: &DecoupledAltitude,
    catmull: &[Point3D],
    stations: &[f64],
) -> Result<DecoupledAltitude, GeometryError> {
    if stations.len() != catmull.len() {
        return Err(GeometryError::LengthMismatch {
            expected: catmull.len(),
            got: stations.len(),
        });
    }
    let Some(&length) = stations.last() else {
        return Err(GeometryError::TooFewPoints { needed: 2, got: 0 });
    };
    let stretched = stretch_altitude(profile, length)?;
    let lift = catmull
        .iter()
        .zip(stations)
        .map(|(c, &s)| altitude_at(&stretched.points, &stretched.tangents, s).map(|z| c.z - z))
        .collect::<Result<Vec<_>, _>>()?;
    if lift.iter().all(|d| d.abs() < LIFT_TOLERANCE) {
        return Ok(stretched);
    }

    let mut merged: Vec<f64> = stretched
        .points
        .iter()
        .map(|p| p.x)
        .filter(|x| stations.iter().all(|s| (s - x).abs() > STATION_MERGE))
        .chain(stations.iter().copied())
        .collect();
    merged.sort_by(f64::total_cmp);
    let points = merged
        .iter()
        .map(|&s| {
            altitude_at(&stretched.points, &stretched.tangents, s)
                .map(|z| Point2D::new(s, z + interpolate(stations, &lift, s)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let tangents = fit_altitude_tangents(&points)?;
    Ok(DecoupledAltitude { points, tangents })
}

/// Piecewise-linear value at `s`, clamped outside the stations.
fn interpolate(stations: &[f64], values: &[f64], s: f64) -> f64 {
    let n = stations.len().min(values.len());
    if n == 0 {
        return 0.0;
    }
    if n == 1 || s <= stations[0] {
        return values[0];
    }
    if s >= stations[n - 1] {
        return values[n - 1];
    }
    let i = stations[..n].partition_point(|&x| x <= s).saturating_sub(1).min(n - 2);
    let width = stations[i + 1] - stations[i];
    if width <= EPSILON {
        return values[i];
    }
    values[i] + (values[i + 1] - values[i]) * (s - stations[i]) / width
}

/// Evaluate the altitude profile at arc length `s`; `s` outside the stations clamps.
pub fn altitude_at(points: &[Point2D], tangents: &[Point2D], s: f64) -> Result<f64, GeometryError> {
    let n = points.len();
    if n < 2 {
        return Err(GeometryError::TooFewPoints { needed: 2, got: n });
    }
    if tangents.len() != n {
        return Err(GeometryError::LengthMismatch {
            expected: n,
            got: tangents.len(),
        });
    }

    let s = s.clamp(points[0].x, points[n - 1].x);
    let span = points
        .partition_point(|p| p.x <= s)
        .saturating_sub(1)
        .min(n - 2);
    let (p0, p1) = (points[span], points[span + 1]);
    if s == p0.x {
        return Ok(p0.y);
    }
    if s == p1.x {
        return Ok(p1.y);
    }

    let seg = hermite_segment(
        station_point(p0),
        Vec2::new(tangents[span].x, tangents[span].y),
        station_point(p1),
        Vec2::new(tangents[span + 1].x, tangents[span + 1].y),
    );
    // x(t) runs from p0.x to p1.x; find t with x(t) == s
    let (mut lo, mut hi) = (0.0, 1.0);
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if seg.eval(mid).x < s {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(seg.eval(0.5 * (lo + hi)).y)
}

/// Substitute the altitude profile into a planar curve.
///
/// Every serie point takes the profile height at its arc length; every control
/// point takes the profile height at its station.
pub fn recombine_altitude(
    catmull: &[Point3D],
    stations: &[f64],
    serie: &[Point3D],
    altitude_points: &[Point2D],
    altitude_tangents: &[Point2D],
) -> Result<RecombinedCurve, GeometryError> {
    if stations.len() != catmull.len() {
        return Err(GeometryError::LengthMismatch {
            expected: catmull.len(),
            got: stations.len(),
        });
    }
    let arcs = arc_lengths(serie);
    let height = |s: f64| altitude_at(altitude_points, altitude_tangents, s);

    let serie_points = serie
        .iter()
        .zip(&arcs)
        .map(|(p, &s)| height(s).map(|z| Point3D::new(p.x, p.y, z)))
        .collect::<Result<Vec<_>, _>>()?;
    let catmull_points = catmull
        .iter()
        .zip(stations)
        .map(|(c, &s)| height(s).map(|z| Point3D::new(c.x, c.y, z)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RecombinedCurve {
        catmull_points,
        serie_points,
    })
}
