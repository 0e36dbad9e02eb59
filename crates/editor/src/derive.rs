//! Curve and lane derivation shared by the transactions.
//!
//! Everything here is pure: inputs are borrowed model values, outputs are new
//! values. Lane boundary lines are always rebuilt wholesale from control points
//! so their serie stays aligned 1:1 with the reference line.

use glam::DVec2;
use shared::{
    BoundarySide, ContactPoint, CurveGeometry, Lane, LaneConnector, LaneLine, LaneSide, LineSide,
    Point2D, Point3D, Road, RoadCategory, Signal, SubSignal,
};

use crate::config::{EditorSettings, SamplingSettings};
use crate::geometry::{
    catmull_stations, compute_normals_and_tangents, decouple_altitude, extend_altitude,
    fit_altitude_tangents, fit_tangents, follow_altitude, offset_by_normal, offset_by_normal_each,
    pin_end_normals, planar_distance, recombine_altitude, resolve_catmull_indices, sample_hermite,
    signed_offsets, stretch_altitude, DecoupledAltitude, GeometryError, PointOffset, SamplePolicy,
    EPSILON,
};

// ============================================================================
// Curves
// ============================================================================

/// Full pipeline for one curve: tangents (fitted unless given), Hermite
/// sampling, altitude decoupling from the control heights, recombination, frames.
pub fn build_curve(
    catmull: &[Point3D],
    tangents: Option<&[Point3D]>,
    policy: SamplePolicy,
) -> Result<CurveGeometry, GeometryError> {
    let tangents = resolve_tangents(catmull, tangents)?;
    let planar = sample_hermite(catmull, &tangents, policy)?;
    let stations = catmull_stations(catmull, &tangents, &planar)?;
    let altitude = decouple_altitude(catmull, &stations)?;
    assemble(catmull, tangents, &planar, &stations, altitude)
}

/// New planar shape for a curve that already has an altitude profile.
///
/// The previous profile is stretched over the new length and every control
/// point takes its height from it, so moving control points never changes the
/// road's slopes. Heights are edited through the altitude curve.
pub fn replan_curve(
    previous: &CurveGeometry,
    catmull: &[Point3D],
    tangents: Option<&[Point3D]>,
    policy: SamplePolicy,
) -> Result<CurveGeometry, GeometryError> {
    let tangents = resolve_tangents(catmull, tangents)?;
    let planar = sample_hermite(catmull, &tangents, policy)?;
    let stations = catmull_stations(catmull, &tangents, &planar)?;
    let altitude = match (profile_of(previous), stations.last()) {
        (Some(profile), Some(&length)) => stretch_altitude(&profile, length)?,
        _ => decouple_altitude(catmull, &stations)?,
    };
    assemble(catmull, tangents, &planar, &stations, altitude)
}

/// Curve that gained one control point at its end.
///
/// The previous profile keeps its shape up to the former last control point;
/// the new span climbs to the new point's height.
pub fn extend_curve(
    previous: &CurveGeometry,
    catmull: &[Point3D],
    policy: SamplePolicy,
) -> Result<CurveGeometry, GeometryError> {
    let tangents = fit_tangents(catmull)?;
    let planar = sample_hermite(catmull, &tangents, policy)?;
    let stations = catmull_stations(catmull, &tangents, &planar)?;
    let n = catmull.len();
    let altitude = match profile_of(previous) {
        Some(profile) if n >= 3 => {
            extend_altitude(&profile, stations[n - 2], stations[n - 1], catmull[n - 1].z)?
        }
        _ => decouple_altitude(catmull, &stations)?,
    };
    assemble(catmull, tangents, &planar, &stations, altitude)
}

/// Keep the planar shape, substitute a new altitude profile.
pub fn rebuild_with_altitude(
    geometry: &CurveGeometry,
    points: &[Point2D],
    tangents: Option<&[Point2D]>,
) -> Result<CurveGeometry, GeometryError> {
    let fitted = fit_altitude_tangents(points)?;
    let tangents = match tangents {
        Some(t) => t.to_vec(),
        None => fitted,
    };
    let stations = catmull_stations(
        &geometry.catmull_points,
        &geometry.catmull_tangents,
        &geometry.serie_points,
    )?;
    assemble(
        &geometry.catmull_points,
        geometry.catmull_tangents.clone(),
        &geometry.serie_points,
        &stations,
        DecoupledAltitude {
            points: points.to_vec(),
            tangents,
        },
    )
}

fn resolve_tangents(
    catmull: &[Point3D],
    tangents: Option<&[Point3D]>,
) -> Result<Vec<Point3D>, GeometryError> {
    match tangents {
        Some(t) => Ok(t.to_vec()),
        None => fit_tangents(catmull),
    }
}

/// Stored altitude profile of a curve, if it has a usable one.
fn profile_of(geometry: &CurveGeometry) -> Option<DecoupledAltitude> {
    let points = &geometry.altitude_catmull_points;
    (points.len() >= 2 && geometry.altitude_catmull_tangents.len() == points.len()).then(|| {
        DecoupledAltitude {
            points: points.clone(),
            tangents: geometry.altitude_catmull_tangents.clone(),
        }
    })
}

fn assemble(
    catmull: &[Point3D],
    tangents: Vec<Point3D>,
    planar: &[Point3D],
    stations: &[f64],
    altitude: DecoupledAltitude,
) -> Result<CurveGeometry, GeometryError> {
    let recombined = recombine_altitude(
        catmull,
        stations,
        planar,
        &altitude.points,
        &altitude.tangents,
    )?;
    let frames = compute_normals_and_tangents(&recombined.serie_points)?;

    Ok(CurveGeometry {
        catmull_points: recombined.catmull_points,
        catmull_tangents: tangents,
        serie_points: recombined.serie_points,
        serie_normals: frames.normals,
        serie_tangents: frames.tangents,
        altitude_catmull_points: altitude.points,
        altitude_catmull_tangents: altitude.tangents,
    })
}

/// Sampling of lines that must index 1:1 against a reference of `resolution` samples.
pub fn line_policy(
    category: RoadCategory,
    resolution: usize,
    sampling: &SamplingSettings,
) -> SamplePolicy {
    match category {
        RoadCategory::Connector => SamplePolicy::ControlRefine {
            count: resolution,
            subdivisions: sampling.refine_subdivisions,
        },
        RoadCategory::Straight | RoadCategory::Spline => SamplePolicy::AlignedNum(resolution),
    }
}

/// Sampling of a new reference line of `category`.
pub fn reference_policy(category: RoadCategory, sampling: &SamplingSettings) -> SamplePolicy {
    line_policy(category, sampling.points_for(category), sampling)
}

/// Sampling of the lines of an existing road.
pub fn lane_policy(road: &Road, sampling: &SamplingSettings) -> SamplePolicy {
    line_policy(road.category, road.reference_line.resolution(), sampling)
}

/// Pin a derived line's end normals to the reference line's end normals.
pub fn pin_to_reference(geometry: &mut CurveGeometry, reference: &CurveGeometry) {
    if let (Some(first), Some(last)) = (reference.first_normal(), reference.last_normal()) {
        pin_end_normals(&mut geometry.serie_normals, first, last, false);
    }
}

/// Build a lane boundary through `catmull`, aligned with `reference`.
///
/// The boundary's altitude follows the reference profile between its control
/// points, offset by its own control heights.
pub fn derive_line(
    reference: &CurveGeometry,
    catmull: &[Point3D],
    tangents: Option<&[Point3D]>,
    policy: SamplePolicy,
) -> Result<CurveGeometry, GeometryError> {
    let tangents = resolve_tangents(catmull, tangents)?;
    let planar = sample_hermite(catmull, &tangents, policy)?;
    let stations = catmull_stations(catmull, &tangents, &planar)?;
    let altitude = match profile_of(reference) {
        Some(profile) => follow_altitude(&profile, catmull, &stations)?,
        None => decouple_altitude(catmull, &stations)?,
    };
    let mut geometry = assemble(catmull, tangents, &planar, &stations, altitude)?;
    pin_to_reference(&mut geometry, reference);
    Ok(geometry)
}

/// Copy of `source` moved by `distance` along the normals.
///
/// When `source` has as many control points as the reference, the reference
/// normals at the reference's own control indices are used, so shifting by `d`
/// and then by `-d` lands back on the same control points.
pub fn shift_line(
    reference: &CurveGeometry,
    source: &CurveGeometry,
    distance: f64,
    policy: SamplePolicy,
) -> Result<CurveGeometry, GeometryError> {
    let catmull = if source.catmull_points.len() == reference.catmull_points.len() {
        let indices = resolve_catmull_indices(&reference.serie_points, &reference.catmull_points)?;
        offset_by_normal(&source.catmull_points, &reference.serie_normals, &indices, distance)?
    } else {
        let indices = resolve_catmull_indices(&source.serie_points, &source.catmull_points)?;
        offset_by_normal(&source.catmull_points, &source.serie_normals, &indices, distance)?
    };
    derive_line(reference, &catmull, Some(&source.catmull_tangents), policy)
}

/// Shift both boundaries of a lane.
pub fn shift_lane(
    reference: &CurveGeometry,
    lane: &Lane,
    distance: f64,
    policy: SamplePolicy,
) -> Result<Lane, GeometryError> {
    let mut lane = lane.clone();
    lane.inner_line.geometry = shift_line(reference, &lane.inner_line.geometry, distance, policy)?;
    lane.outer_line.geometry = shift_line(reference, &lane.outer_line.geometry, distance, policy)?;
    lane.refresh_connectors();
    Ok(lane)
}

/// Mean planar distance between a lane's boundaries: over control points when
/// both boundaries have the same count, otherwise over serie points.
pub fn lane_width(lane: &Lane) -> f64 {
    let inner = &lane.inner_line.geometry;
    let outer = &lane.outer_line.geometry;
    let (a, b) = if inner.catmull_points.len() == outer.catmull_points.len()
        && !inner.catmull_points.is_empty()
    {
        (&inner.catmull_points, &outer.catmull_points)
    } else {
        (&inner.serie_points, &outer.serie_points)
    };
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    a.iter()
        .zip(b.iter())
        .map(|(p, q)| planar_distance(*p, *q))
        .sum::<f64>()
        / n as f64
}

/// Make lane `k`'s inner boundary geometry equal lane `k-1`'s outer boundary
/// (the reference line for `k == 0`), keeping each line's attributes.
pub fn reattach_inner_lines(reference: &CurveGeometry, lanes: &mut [Lane]) {
    for k in 0..lanes.len() {
        let inner = if k == 0 {
            reference.clone()
        } else {
            lanes[k - 1].outer_line.geometry.clone()
        };
        lanes[k].inner_line.geometry = inner;
        lanes[k].refresh_connectors();
    }
}

// ============================================================================
// Lanes
// ============================================================================

pub fn new_lane_line(line_side: LineSide, geometry: CurveGeometry) -> LaneLine {
    LaneLine {
        line_side,
        geometry,
        boundary: Default::default(),
        options: Default::default(),
    }
}

pub fn build_lane(
    road_id: &str,
    side: LaneSide,
    index: u32,
    inner: CurveGeometry,
    outer: CurveGeometry,
) -> Lane {
    let mut lane = Lane {
        id: shared::lane_id(road_id, side, index),
        side,
        inner_line: new_lane_line(LineSide::Inner, inner),
        outer_line: new_lane_line(LineSide::Outer, outer),
        start_connector: LaneConnector::default(),
        end_connector: LaneConnector::default(),
        width_editable: true,
        predecessors: Vec::new(),
        successors: Vec::new(),
    };
    lane.refresh_connectors();
    lane
}

/// New road with one left and one right lane of the default width.
pub fn initial_road(
    id: &str,
    category: RoadCategory,
    catmull: &[Point3D],
    tangents: Option<&[Point3D]>,
    settings: &EditorSettings,
) -> Result<Road, GeometryError> {
    let policy = reference_policy(category, &settings.sampling);
    let reference = build_curve(catmull, tangents, policy)?;
    let width = settings.lanes.default_width;

    let left_outer = shift_line(&reference, &reference, width * LaneSide::Left.sign(), policy)?;
    let right_outer = shift_line(&reference, &reference, width * LaneSide::Right.sign(), policy)?;
    let left = build_lane(id, LaneSide::Left, 1, reference.clone(), left_outer);
    let right = build_lane(id, LaneSide::Right, 1, reference.clone(), right_outer);

    Ok(Road {
        id: id.to_string(),
        category,
        reference_line: reference,
        left_lanes: vec![left],
        right_lanes: vec![right],
        general_left_lane_index: 1,
        general_right_lane_index: 1,
        predecessors: Vec::new(),
        successors: Vec::new(),
        transparency: 1.0,
        connection: None,
    })
}

// ============================================================================
// Reference line changes
// ============================================================================

/// Per-reference-control-point offsets of `line` from `reference`.
pub fn line_offsets(
    reference: &CurveGeometry,
    line: &CurveGeometry,
) -> Result<Vec<PointOffset>, GeometryError> {
    let indices = resolve_catmull_indices(&reference.serie_points, &reference.catmull_points)?;
    if line.catmull_points.len() == reference.catmull_points.len() {
        return signed_offsets(
            &reference.catmull_points,
            &reference.serie_normals,
            &indices,
            &line.catmull_points,
        );
    }
    if line.serie_points.len() != reference.serie_points.len() {
        return Err(GeometryError::LengthMismatch {
            expected: reference.serie_points.len(),
            got: line.serie_points.len(),
        });
    }
    let at = |serie: &[Point3D]| indices.iter().map(|&i| serie[i]).collect::<Vec<_>>();
    signed_offsets(
        &at(&reference.serie_points),
        &reference.serie_normals,
        &indices,
        &at(&line.serie_points),
    )
}

/// Fit `offsets` to `count` control points: unchanged, last one repeated when a
/// single point was appended, otherwise linearly resampled.
pub fn resample_offsets(offsets: &[PointOffset], count: usize) -> Vec<PointOffset> {
    let n = offsets.len();
    if n == count {
        return offsets.to_vec();
    }
    let Some(last) = offsets.last().copied() else {
        return vec![PointOffset::default(); count];
    };
    if count == n + 1 {
        let mut out = offsets.to_vec();
        out.push(last);
        return out;
    }
    if n == 1 || count < 2 {
        return vec![offsets[0]; count];
    }
    (0..count)
        .map(|j| {
            let t = j as f64 * (n - 1) as f64 / (count - 1) as f64;
            let i = (t.floor() as usize).min(n - 2);
            let frac = t - i as f64;
            let (a, b) = (offsets[i], offsets[i + 1]);
            PointOffset {
                lateral: a.lateral + (b.lateral - a.lateral) * frac,
                vertical: a.vertical + (b.vertical - a.vertical) * frac,
            }
        })
        .collect()
}

/// Place control points at `offsets` from the reference control points.
pub fn apply_offsets(
    reference: &CurveGeometry,
    offsets: &[PointOffset],
) -> Result<Vec<Point3D>, GeometryError> {
    let indices = resolve_catmull_indices(&reference.serie_points, &reference.catmull_points)?;
    let lateral: Vec<f64> = offsets.iter().map(|o| o.lateral).collect();
    let mut points = offset_by_normal_each(
        &reference.catmull_points,
        &reference.serie_normals,
        &indices,
        &lateral,
    )?;
    for (p, o) in points.iter_mut().zip(offsets) {
        p.z += o.vertical;
    }
    Ok(points)
}

/// Road with `new_reference` and every lane line re-derived at its previous
/// per-point offset from the old reference line.
pub fn rederive_lanes(
    road: &Road,
    new_reference: CurveGeometry,
    sampling: &SamplingSettings,
) -> Result<Road, GeometryError> {
    let old_reference = &road.reference_line;
    let policy = line_policy(road.category, new_reference.resolution(), sampling);
    let count = new_reference.catmull_points.len();

    let mut out = road.clone();
    for side in LaneSide::all() {
        let mut lanes = Vec::with_capacity(road.lanes(*side).len());
        for lane in road.lanes(*side) {
            let mut lane = lane.clone();
            for line_side in [LineSide::Inner, LineSide::Outer] {
                let line = lane.line_mut(line_side);
                let offsets = line_offsets(old_reference, &line.geometry)?;
                let catmull = apply_offsets(&new_reference, &resample_offsets(&offsets, count))?;
                line.geometry = derive_line(
                    &new_reference,
                    &catmull,
                    Some(&new_reference.catmull_tangents),
                    policy,
                )?;
            }
            lane.refresh_connectors();
            lanes.push(lane);
        }
        out.set_lanes(*side, lanes);
    }
    out.reference_line = new_reference;
    Ok(out)
}

// ============================================================================
// Road ends, connectors and junction edges
// ============================================================================

/// Position of a road end and the unit planar direction continuing past it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndFrame {
    pub position: Point3D,
    pub outward: DVec2,
}

pub fn road_end_frame(road: &Road, contact: ContactPoint) -> Result<EndFrame, GeometryError> {
    let reference = &road.reference_line;
    let (position, tangent, sign) = match contact {
        ContactPoint::Start => (
            reference.first_serie_point(),
            reference.serie_tangents.first(),
            -1.0,
        ),
        ContactPoint::End => (
            reference.last_serie_point(),
            reference.serie_tangents.last(),
            1.0,
        ),
    };
    let (Some(position), Some(tangent)) = (position, tangent) else {
        return Err(GeometryError::TooFewPoints {
            needed: 2,
            got: reference.resolution(),
        });
    };
    let outward = DVec2::new(tangent.x, tangent.y)
        .try_normalize()
        .ok_or(GeometryError::ZeroTangent { index: 0 })?;
    Ok(EndFrame {
        position,
        outward: outward * sign,
    })
}

/// Geometry of a road's outermost boundary on one side (reference line if the side has no lanes).
pub fn boundary_geometry(road: &Road, boundary: BoundarySide) -> &CurveGeometry {
    let lanes = match boundary {
        BoundarySide::Leftmost => &road.left_lanes,
        BoundarySide::Rightmost => &road.right_lanes,
    };
    lanes
        .last()
        .map(|lane| &lane.outer_line.geometry)
        .unwrap_or(&road.reference_line)
}

pub fn boundary_end_point(road: &Road, boundary: BoundarySide, contact: ContactPoint) -> Option<Point3D> {
    let geometry = boundary_geometry(road, boundary);
    match contact {
        ContactPoint::Start => geometry.first_serie_point(),
        ContactPoint::End => geometry.last_serie_point(),
    }
}

/// Two-point Hermite span leaving `start` along `start_dir` and arriving at
/// `end` along `end_dir`, tangent magnitudes equal to the chord.
pub fn hermite_bridge(
    start: Point3D,
    start_dir: DVec2,
    end: Point3D,
    end_dir: DVec2,
    count: usize,
    sampling: &SamplingSettings,
) -> Result<CurveGeometry, GeometryError> {
    let chord = planar_distance(start, end);
    if chord < EPSILON {
        return Err(GeometryError::DegenerateSegment { index: 0 });
    }
    let tangents = [
        Point3D::planar(start_dir.x * chord, start_dir.y * chord),
        Point3D::planar(end_dir.x * chord, end_dir.y * chord),
    ];
    build_curve(
        &[start, end],
        Some(&tangents),
        SamplePolicy::ControlRefine {
            count,
            subdivisions: sampling.refine_subdivisions,
        },
    )
}

// ============================================================================
// Signals
// ============================================================================

/// Sub-signal markers on a regular grid over the signal rectangle.
///
/// The rectangle stands vertically: its width runs along the heading
/// direction, its height along +z; row 0 is the top row.
pub fn layout_sub_signals(signal: &Signal) -> Vec<SubSignal> {
    let (rows, columns) = signal.signal_type.grid();
    let (sin, cos) = signal.heading.sin_cos();
    let mut out = Vec::with_capacity(rows * columns);
    for row in 0..rows {
        for column in 0..columns {
            let u = (column as f64 + 0.5) / columns as f64 - 0.5;
            let v = 0.5 - (row as f64 + 0.5) / rows as f64;
            out.push(SubSignal {
                id: format!("{}_{}_{}", signal.id, row, column),
                row,
                column,
                position: Point3D::new(
                    signal.center.x + cos * signal.width * u,
                    signal.center.y + sin * signal.width * u,
                    signal.center.z + signal.height * v,
                ),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use shared::SignalType;

    fn settings() -> EditorSettings {
        EditorSettings::default()
    }

    fn assert_close(a: Point3D, b: Point3D, tol: f64) {
        assert!(
            (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol && (a.z - b.z).abs() < tol,
            "{:?} != {:?}",
            a,
            b
        );
    }

    #[test]
    fn test_build_curve_invariants() {
        let catmull = fixtures::s_curve_points();
        let g = build_curve(&catmull, None, SamplePolicy::AlignedNum(120)).unwrap();
        assert_eq!(g.serie_points.len(), 120);
        assert_eq!(g.serie_normals.len(), 120);
        assert_eq!(g.serie_tangents.len(), 120);
        assert_eq!(g.serie_points[0], g.catmull_points[0]);
        assert_eq!(g.serie_points[119], *g.catmull_points.last().unwrap());
        assert_eq!(g.altitude_catmull_points.len(), catmull.len());
        for n in &g.serie_normals {
            assert!(((n.x * n.x + n.y * n.y).sqrt() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_build_curve_rejects_coincident_points() {
        let catmull = vec![Point3D::planar(0.0, 0.0), Point3D::planar(0.0, 0.0)];
        assert!(matches!(
            build_curve(&catmull, None, SamplePolicy::AlignedNum(10)),
            Err(GeometryError::DegenerateSegment { index: 0 })
        ));
    }

    #[test]
    fn test_rebuild_with_altitude_keeps_planar_shape() {
        let g = build_curve(
            &[Point3D::planar(0.0, 0.0), Point3D::planar(100.0, 0.0)],
            None,
            SamplePolicy::AlignedNum(40),
        )
        .unwrap();
        let profile = vec![Point2D::new(0.0, 0.0), Point2D::new(100.0, 8.0)];
        let r = rebuild_with_altitude(&g, &profile, None).unwrap();
        assert!((r.catmull_points[1].z - 8.0).abs() < 1e-6);
        for (a, b) in r.serie_points.iter().zip(&g.serie_points) {
            assert_eq!((a.x, a.y), (b.x, b.y));
        }
        assert!(r.serie_tangents[20].z > 0.0);
        assert_eq!(r.altitude_catmull_points, profile);
    }

    fn humped_line() -> CurveGeometry {
        let g = build_curve(
            &[Point3D::planar(0.0, 0.0), Point3D::planar(100.0, 0.0)],
            None,
            SamplePolicy::AlignedNum(41),
        )
        .unwrap();
        let profile = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(50.0, 10.0),
            Point2D::new(100.0, 0.0),
        ];
        rebuild_with_altitude(&g, &profile, None).unwrap()
    }

    #[test]
    fn test_close_control_points_build() {
        let catmull = vec![
            Point3D::planar(0.0, 0.0),
            Point3D::planar(2.0, 0.0),
            Point3D::planar(1000.0, 0.0),
        ];
        let g = build_curve(&catmull, None, SamplePolicy::AlignedNum(120)).unwrap();
        let xs: Vec<f64> = g.altitude_catmull_points.iter().map(|p| p.x).collect();
        assert!(xs.windows(2).all(|w| w[0] < w[1]), "{:?}", xs);
    }

    #[test]
    fn test_derived_line_follows_reference_profile() {
        let reference = humped_line();
        assert!((reference.serie_points[20].z - 10.0).abs() < 1e-3);
        let line = shift_line(&reference, &reference, 3.5, SamplePolicy::AlignedNum(41)).unwrap();
        assert!((line.serie_points[20].z - 10.0).abs() < 1e-3);
        assert!((line.serie_points[20].y - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_replan_keeps_altitude_profile() {
        let previous = humped_line();
        let catmull = vec![Point3D::planar(0.0, 0.0), Point3D::planar(100.0, 2.0)];
        let g = replan_curve(&previous, &catmull, None, SamplePolicy::AlignedNum(41)).unwrap();
        assert_eq!(g.altitude_catmull_points.len(), 3);
        assert!((g.serie_points[20].z - 10.0).abs() < 1e-2);
        assert_eq!(g.catmull_points[1], Point3D::planar(100.0, 2.0));

        // control heights come from the profile, not from the given points
        let raised = vec![
            Point3D::planar(0.0, 0.0),
            Point3D::planar(50.0, 0.0),
            Point3D::planar(100.0, 2.0),
        ];
        let g = replan_curve(&previous, &raised, None, SamplePolicy::AlignedNum(41)).unwrap();
        assert!((g.catmull_points[1].z - 10.0).abs() < 0.1);
    }

    #[test]
    fn test_derived_line_keeps_own_control_heights() {
        let reference = humped_line();
        let catmull = vec![Point3D::new(0.0, 3.5, 0.0), Point3D::new(100.0, 3.5, 1.0)];
        let line = derive_line(&reference, &catmull, None, SamplePolicy::AlignedNum(41)).unwrap();
        assert!((line.catmull_points[1].z - 1.0).abs() < 1e-9);
        assert!((line.serie_points[20].z - 10.5).abs() < 1e-2);
    }

    #[test]
    fn test_extend_keeps_profile_before_new_point() {
        let previous = humped_line();
        let catmull = vec![
            Point3D::planar(0.0, 0.0),
            Point3D::planar(100.0, 0.0),
            Point3D::planar(120.0, 0.0),
        ];
        let g = extend_curve(&previous, &catmull, SamplePolicy::AlignedNum(41)).unwrap();
        assert_eq!(g.altitude_catmull_points.len(), 4);
        let peak = g
            .serie_points
            .iter()
            .map(|p| p.z)
            .fold(f64::MIN, f64::max);
        assert!((peak - 10.0).abs() < 0.5, "peak {}", peak);
        assert_eq!(g.catmull_points[2].z, 0.0);
    }

    #[test]
    fn test_shift_line_and_back() {
        let reference = build_curve(&fixtures::s_curve_points(), None, SamplePolicy::AlignedNum(60)).unwrap();
        let policy = SamplePolicy::AlignedNum(60);
        let out = shift_line(&reference, &reference, 3.5, policy).unwrap();
        assert_eq!(out.resolution(), 60);
        let back = shift_line(&reference, &out, -3.5, policy).unwrap();
        for (a, b) in back.catmull_points.iter().zip(&reference.catmull_points) {
            assert_close(*a, *b, 1e-9);
        }
    }

    #[test]
    fn test_initial_road_lanes() {
        let road = initial_road(
            "R1",
            RoadCategory::Spline,
            &fixtures::s_curve_points(),
            None,
            &settings(),
        )
        .unwrap();
        assert_eq!(road.left_lanes.len(), 1);
        assert_eq!(road.right_lanes.len(), 1);
        assert_eq!(road.left_lanes[0].id, "R1_0_1");
        assert_eq!(road.right_lanes[0].id, "R1_0_-1");
        assert_eq!(road.reference_line.resolution(), 120);
        for lane in road.left_lanes.iter().chain(&road.right_lanes) {
            assert!((lane_width(lane) - 3.5).abs() < 1e-6);
            assert_eq!(lane.outer_line.geometry.resolution(), 120);
            assert_eq!(lane.inner_line.geometry, road.reference_line);
        }
        // left lane lies on the left of the reference line
        let left = road.left_lanes[0].outer_line.geometry.catmull_points[0];
        let right = road.right_lanes[0].outer_line.geometry.catmull_points[0];
        let r = road.reference_line.catmull_points[0];
        let n = road.reference_line.serie_normals[0];
        assert!((left.x - r.x) * n.x + (left.y - r.y) * n.y > 0.0);
        assert!((right.x - r.x) * n.x + (right.y - r.y) * n.y < 0.0);
    }

    #[test]
    fn test_resample_offsets() {
        let o = |l: f64| PointOffset {
            lateral: l,
            vertical: 0.0,
        };
        let offsets = vec![o(1.0), o(3.0)];
        assert_eq!(resample_offsets(&offsets, 2), offsets);
        assert_eq!(resample_offsets(&offsets, 3), vec![o(1.0), o(3.0), o(3.0)]);
        let five = resample_offsets(&offsets, 5);
        assert_eq!(five.len(), 5);
        assert!((five[2].lateral - 2.0).abs() < 1e-12);
        assert_eq!(resample_offsets(&[], 2), vec![PointOffset::default(); 2]);
    }

    #[test]
    fn test_rederive_lanes_follows_reference() {
        let road = initial_road(
            "R1",
            RoadCategory::Straight,
            &[Point3D::planar(0.0, 0.0), Point3D::planar(50.0, 0.0)],
            None,
            &settings(),
        )
        .unwrap();
        let moved = build_curve(
            &[Point3D::new(0.0, 10.0, 2.0), Point3D::new(50.0, 10.0, 2.0)],
            None,
            SamplePolicy::AlignedNum(40),
        )
        .unwrap();
        let out = rederive_lanes(&road, moved, &settings().sampling).unwrap();
        let left_outer = &out.left_lanes[0].outer_line.geometry;
        assert_close(left_outer.catmull_points[0], Point3D::new(0.0, 13.5, 2.0), 1e-9);
        assert_eq!(out.left_lanes[0].inner_line.geometry.catmull_points, out.reference_line.catmull_points);
        let right_outer = &out.right_lanes[0].outer_line.geometry;
        assert_close(right_outer.catmull_points[1], Point3D::new(50.0, 6.5, 2.0), 1e-9);
        assert_eq!(out.left_lanes[0].end_connector.end, left_outer.serie_points[39]);
    }

    #[test]
    fn test_road_end_frames() {
        let road = fixtures::straight_road("R1", 30.0);
        let end = road_end_frame(&road, ContactPoint::End).unwrap();
        assert_close(end.position, Point3D::planar(30.0, 0.0), 1e-12);
        assert!((end.outward - DVec2::X).length() < 1e-9);
        let start = road_end_frame(&road, ContactPoint::Start).unwrap();
        assert!((start.outward + DVec2::X).length() < 1e-9);

        let corner = boundary_end_point(&road, BoundarySide::Leftmost, ContactPoint::End).unwrap();
        assert_close(corner, Point3D::planar(30.0, 3.5), 1e-9);
    }

    #[test]
    fn test_hermite_bridge() {
        let g = hermite_bridge(
            Point3D::planar(0.0, 0.0),
            DVec2::X,
            Point3D::new(10.0, 10.0, 1.0),
            DVec2::Y,
            60,
            &settings().sampling,
        )
        .unwrap();
        assert_eq!(g.resolution(), 60);
        assert_eq!(g.serie_points[59], Point3D::new(10.0, 10.0, 1.0));
        assert!(g.serie_tangents[0].x > 0.9);
        assert!(g.serie_tangents[59].y > 0.9);
        assert!(hermite_bridge(
            Point3D::planar(1.0, 1.0),
            DVec2::X,
            Point3D::planar(1.0, 1.0),
            DVec2::X,
            10,
            &settings().sampling
        )
        .is_err());
    }

    #[test]
    fn test_layout_sub_signals() {
        let signal = Signal {
            id: "S1".to_string(),
            signal_type: SignalType::TrafficLightVertical,
            center: Point3D::new(0.0, 0.0, 5.0),
            heading: 0.0,
            width: 0.4,
            height: 1.2,
            sub_signals: vec![],
        };
        let subs = layout_sub_signals(&signal);
        assert_eq!(subs.len(), 3);
        assert_eq!(subs[0].id, "S1_0_0");
        assert!((subs[0].position.z - 5.4).abs() < 1e-12);
        assert!((subs[2].position.z - 4.6).abs() < 1e-12);
        assert!(subs.iter().all(|s| s.position.x.abs() < 1e-12));

        let panel = Signal {
            signal_type: SignalType::ArrowPanel,
            heading: std::f64::consts::FRAC_PI_2,
            width: 4.0,
            ..signal
        };
        let subs = layout_sub_signals(&panel);
        assert_eq!(subs.len(), 4);
        assert!((subs[0].position.y + 1.5).abs() < 1e-12);
        assert!((subs[3].position.y - 1.5).abs() < 1e-12);
    }
}
