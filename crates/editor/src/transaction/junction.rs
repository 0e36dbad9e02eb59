//! Junctions: creation from road ends, removal, and edge edits.
//!
//! Junction ends are kept in counter-clockwise order around their centroid.
//! Edge `i` joins end `i` to end `i + 1` (wrapping), running from the corner of
//! end `i` that faces end `i + 1` to the corner of end `i + 1` that faces back.

use std::f64::consts::PI;
use std::rc::Rc;

use glam::DVec2;
use serde::{Deserialize, Serialize};
use shared::{
    BoundarySide, ContactPoint, CurveGeometry, EdgeAnchor, Junction, JunctionConnection,
    JunctionEdge, JunctionId, ObjectId, Point2D, Point3D, Road, RoadEnd,
};

use crate::config::{EditorSettings, SamplingSettings};
use crate::derive::{
    boundary_end_point, build_curve, hermite_bridge, rebuild_with_altitude, road_end_frame,
    EndFrame,
};
use crate::geometry::{GeometryError, SamplePolicy};
use crate::store::EntityStore;
use crate::transaction::{lookup_junction, lookup_road, new_object_id, Edit, EditError, KeyInfo};

// ============================================================================
// Corner geometry
// ============================================================================

/// Boundary on the left of the direction leading away from the junction.
fn left_corner(contact: ContactPoint) -> BoundarySide {
    match contact {
        ContactPoint::End => BoundarySide::Rightmost,
        ContactPoint::Start => BoundarySide::Leftmost,
    }
}

/// Boundary on the right of the direction leading away from the junction.
fn right_corner(contact: ContactPoint) -> BoundarySide {
    match contact {
        ContactPoint::End => BoundarySide::Leftmost,
        ContactPoint::Start => BoundarySide::Rightmost,
    }
}

fn anchor_point(road: &Road, anchor: &EdgeAnchor) -> Result<Point3D, EditError> {
    boundary_end_point(road, anchor.boundary, anchor.road_end.contact).ok_or_else(|| {
        GeometryError::TooFewPoints {
            needed: 2,
            got: 0,
        }
        .into()
    })
}

fn end_road<'a>(info: &'a KeyInfo, end: &RoadEnd) -> Result<&'a Rc<Road>, EditError> {
    info.require_road(&end.road_id)
}

/// Ends sorted counter-clockwise around their centroid, with their frames.
fn order_ends(info: &KeyInfo, ends: &[RoadEnd]) -> Result<Vec<(RoadEnd, EndFrame)>, EditError> {
    let mut framed = ends
        .iter()
        .map(|end| -> Result<(RoadEnd, EndFrame), EditError> {
            let frame = road_end_frame(end_road(info, end)?, end.contact)?;
            Ok((end.clone(), frame))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let centroid = framed
        .iter()
        .fold(DVec2::ZERO, |acc, (_, f)| acc + DVec2::new(f.position.x, f.position.y))
        / framed.len() as f64;
    let angle = |f: &EndFrame| {
        let v = DVec2::new(f.position.x, f.position.y) - centroid;
        if v.length_squared() > 0.0 {
            v.y.atan2(v.x)
        } else {
            // end sitting on the centroid: order by where it points
            (-f.outward).y.atan2((-f.outward).x) + 2.0 * PI
        }
    };
    framed.sort_by(|(_, a), (_, b)| angle(a).total_cmp(&angle(b)));
    Ok(framed)
}

/// Edges of a junction over its (sorted) ends.
fn build_edges(
    junction_id: &str,
    ordered: &[(RoadEnd, EndFrame)],
    info: &KeyInfo,
    sampling: &SamplingSettings,
) -> Result<Vec<JunctionEdge>, EditError> {
    let n = ordered.len();
    let mut edges = Vec::with_capacity(n);
    for i in 0..n {
        let (a, frame_a) = &ordered[i];
        let (b, frame_b) = &ordered[(i + 1) % n];
        let start_anchor = EdgeAnchor {
            road_end: a.clone(),
            boundary: left_corner(a.contact),
        };
        let end_anchor = EdgeAnchor {
            road_end: b.clone(),
            boundary: right_corner(b.contact),
        };
        let start = anchor_point(end_road(info, a)?, &start_anchor)?;
        let end = anchor_point(end_road(info, b)?, &end_anchor)?;
        let geometry = hermite_bridge(
            start,
            frame_a.outward,
            end,
            -frame_b.outward,
            sampling.connector_points,
            sampling,
        )?;
        edges.push(JunctionEdge {
            id: format!("{}_edge_{}", junction_id, i),
            geometry,
            start_anchor,
            end_anchor,
        });
    }
    Ok(edges)
}

/// Every ordered pair of distinct ends.
fn candidate_connections(ends: &[RoadEnd]) -> Vec<JunctionConnection> {
    let mut out = Vec::with_capacity(ends.len() * ends.len().saturating_sub(1));
    for from in ends {
        for to in ends {
            if from != to {
                out.push(JunctionConnection {
                    from: from.clone(),
                    to: to.clone(),
                    connector_road_id: None,
                });
            }
        }
    }
    out
}

fn anchor_z(info: &KeyInfo, anchor: &EdgeAnchor) -> Result<f64, EditError> {
    Ok(anchor_point(end_road(info, &anchor.road_end)?, anchor)?.z)
}

fn with_anchor_roads(
    mut info: KeyInfo,
    store: &EntityStore,
    edge: &JunctionEdge,
) -> Result<KeyInfo, EditError> {
    for anchor in [&edge.start_anchor, &edge.end_anchor] {
        let id = &anchor.road_end.road_id;
        info = info.with_road(id.clone(), Some(lookup_road(store, id)?));
    }
    Ok(info)
}

fn find_edge<'a>(junction: &'a Junction, edge_id: &str) -> Result<(usize, &'a JunctionEdge), EditError> {
    junction
        .edge_index(edge_id)
        .map(|i| (i, &junction.edges[i]))
        .ok_or_else(|| EditError::EdgeNotFound(edge_id.to_string()))
}

fn replace_edge(junction: &Junction, index: usize, geometry: CurveGeometry) -> KeyInfo {
    let mut updated = junction.clone();
    updated.edges[index].geometry = geometry;
    KeyInfo::new().with_junction(updated.id.clone(), Some(Rc::new(updated)))
}

// ============================================================================
// CreateJunction
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateJunction {
    #[serde(default = "new_object_id")]
    pub junction_id: JunctionId,
    pub ends: Vec<RoadEnd>,
}

impl Edit for CreateJunction {
    fn label(&self) -> &'static str {
        "CreateJunction"
    }

    fn resolve_necessary_info(&self, store: &EntityStore) -> Result<KeyInfo, EditError> {
        if store.junction(&self.junction_id).is_some() {
            return Err(EditError::JunctionExists(self.junction_id.clone()));
        }
        let mut info = KeyInfo::new().with_junction(self.junction_id.clone(), None);
        for end in &self.ends {
            info = info.with_road(end.road_id.clone(), Some(lookup_road(store, &end.road_id)?));
        }
        Ok(info)
    }

    fn generate_new_key_info(
        &self,
        old: &KeyInfo,
        settings: &EditorSettings,
    ) -> Result<KeyInfo, EditError> {
        if self.ends.len() < 2 {
            return Err(EditError::InvalidInput(format!(
                "a junction needs at least 2 road ends, got {}",
                self.ends.len()
            )));
        }
        for (i, end) in self.ends.iter().enumerate() {
            if self.ends[..i].contains(end) {
                return Err(EditError::InvalidInput(format!(
                    "road end {}:{:?} listed twice",
                    end.road_id, end.contact
                )));
            }
        }

        let ordered = order_ends(old, &self.ends)?;
        let edges = build_edges(&self.junction_id, &ordered, old, &settings.sampling)?;
        let ends: Vec<RoadEnd> = ordered.into_iter().map(|(end, _)| end).collect();
        let junction = Junction {
            id: self.junction_id.clone(),
            connections: candidate_connections(&ends),
            ends,
            edges,
        };
        Ok(KeyInfo::new().with_junction(self.junction_id.clone(), Some(Rc::new(junction))))
    }

    fn target_id(&self) -> ObjectId {
        self.junction_id.clone()
    }
}

// ============================================================================
// RemoveJunction
// ============================================================================

/// Remove a junction. Connector roads built for it stay, detached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveJunction {
    pub junction_id: JunctionId,
}

impl Edit for RemoveJunction {
    fn label(&self) -> &'static str {
        "RemoveJunction"
    }

    fn resolve_necessary_info(&self, store: &EntityStore) -> Result<KeyInfo, EditError> {
        let mut info = KeyInfo::new().with_junction(
            self.junction_id.clone(),
            Some(lookup_junction(store, &self.junction_id)?),
        );
        for road in store.roads() {
            let attached = road
                .connection
                .as_ref()
                .and_then(|c| c.junction_id.as_deref())
                == Some(self.junction_id.as_str());
            if attached {
                info = info.with_road(road.id.clone(), Some(road.clone()));
            }
        }
        Ok(info)
    }

    fn generate_new_key_info(
        &self,
        old: &KeyInfo,
        _settings: &EditorSettings,
    ) -> Result<KeyInfo, EditError> {
        let mut new = KeyInfo::new().with_junction(self.junction_id.clone(), None);
        for (id, road) in &old.roads {
            let Some(road) = road else { continue };
            let mut road = (**road).clone();
            if let Some(connection) = road.connection.as_mut() {
                connection.junction_id = None;
            }
            new = new.with_road(id.clone(), Some(Rc::new(road)));
        }
        Ok(new)
    }

    fn target_id(&self) -> ObjectId {
        self.junction_id.clone()
    }
}

// ============================================================================
// Edge edits
// ============================================================================

/// Replace one edge curve. With `clamp_altitude`, its end heights snap to
/// the anchored road boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditJunctionEdge {
    pub junction_id: JunctionId,
    pub edge_id: ObjectId,
    pub catmull_points: Vec<Point3D>,
    #[serde(default)]
    pub catmull_tangents: Option<Vec<Point3D>>,
    #[serde(default)]
    pub clamp_altitude: bool,
}

impl Edit for EditJunctionEdge {
    fn label(&self) -> &'static str {
        "EditJunctionEdge"
    }

    fn resolve_necessary_info(&self, store: &EntityStore) -> Result<KeyInfo, EditError> {
        let junction = lookup_junction(store, &self.junction_id)?;
        let (_, edge) = find_edge(&junction, &self.edge_id)?;
        let info = if self.clamp_altitude {
            with_anchor_roads(KeyInfo::new(), store, edge)?
        } else {
            KeyInfo::new()
        };
        Ok(info.with_junction(self.junction_id.clone(), Some(junction)))
    }

    fn generate_new_key_info(
        &self,
        old: &KeyInfo,
        settings: &EditorSettings,
    ) -> Result<KeyInfo, EditError> {
        let junction = old.require_junction(&self.junction_id)?;
        let (index, edge) = find_edge(junction, &self.edge_id)?;

        let mut points = self.catmull_points.clone();
        if self.clamp_altitude {
            let start_z = anchor_z(old, &edge.start_anchor)?;
            let end_z = anchor_z(old, &edge.end_anchor)?;
            if let Some(first) = points.first_mut() {
                first.z = start_z;
            }
            if let Some(last) = points.last_mut() {
                last.z = end_z;
            }
        }
        let count = match edge.geometry.resolution() {
            n if n >= 2 => n,
            _ => settings.sampling.connector_points,
        };
        let geometry = build_curve(
            &points,
            self.catmull_tangents.as_deref(),
            SamplePolicy::ControlRefine {
                count,
                subdivisions: settings.sampling.refine_subdivisions,
            },
        )?;
        Ok(replace_edge(junction, index, geometry))
    }

    fn target_id(&self) -> ObjectId {
        self.junction_id.clone()
    }
}

/// Replace one edge's altitude profile, optionally clamping its first and
/// last heights to the anchored road boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditJunctionEdgeAltitude {
    pub junction_id: JunctionId,
    pub edge_id: ObjectId,
    pub altitude_points: Vec<Point2D>,
    #[serde(default)]
    pub altitude_tangents: Option<Vec<Point2D>>,
    #[serde(default)]
    pub clamp_altitude: bool,
}

impl Edit for EditJunctionEdgeAltitude {
    fn label(&self) -> &'static str {
        "EditJunctionEdgeAltitude"
    }

    fn resolve_necessary_info(&self, store: &EntityStore) -> Result<KeyInfo, EditError> {
        let junction = lookup_junction(store, &self.junction_id)?;
        let (_, edge) = find_edge(&junction, &self.edge_id)?;
        let info = if self.clamp_altitude {
            with_anchor_roads(KeyInfo::new(), store, edge)?
        } else {
            KeyInfo::new()
        };
        Ok(info.with_junction(self.junction_id.clone(), Some(junction)))
    }

    fn generate_new_key_info(
        &self,
        old: &KeyInfo,
        _settings: &EditorSettings,
    ) -> Result<KeyInfo, EditError> {
        let junction = old.require_junction(&self.junction_id)?;
        let (index, edge) = find_edge(junction, &self.edge_id)?;

        let mut points = self.altitude_points.clone();
        if self.clamp_altitude {
            let start_z = anchor_z(old, &edge.start_anchor)?;
            let end_z = anchor_z(old, &edge.end_anchor)?;
            if let Some(first) = points.first_mut() {
                first.y = start_z;
            }
            if let Some(last) = points.last_mut() {
                last.y = end_z;
            }
        }
        let geometry =
            rebuild_with_altitude(&edge.geometry, &points, self.altitude_tangents.as_deref())?;
        Ok(replace_edge(junction, index, geometry))
    }

    fn target_id(&self) -> ObjectId {
        self.junction_id.clone()
    }
}
