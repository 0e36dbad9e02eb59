//! Road geometry validation.
//!
//! `RoadValidator` checks that a road's lane geometry is well formed:
//! aligned sample counts, finite values, no zero-length serie steps,
//! unit normals, and lanes that have not collapsed to zero width.

use shared::{CurveGeometry, Road};

use crate::geometry::planar_distance;

/// Validator for `Road` lane geometry.
pub struct RoadValidator<'a> {
    road: &'a Road,
    epsilon: f64,
}

impl<'a> RoadValidator<'a> {
    /// Create a new validator for the given road.
    pub fn new(road: &'a Road, epsilon: f64) -> Self {
        Self { road, epsilon }
    }

    /// Serie resolution N of the reference line.
    pub fn resolution(&self) -> usize {
        self.road.reference_line.resolution()
    }

    fn lines(&self) -> impl Iterator<Item = &'a CurveGeometry> {
        let road = self.road;
        std::iter::once(&road.reference_line).chain(
            road.left_lanes
                .iter()
                .chain(&road.right_lanes)
                .flat_map(|lane| [&lane.inner_line.geometry, &lane.outer_line.geometry]),
        )
    }

    /// Every line has N serie points, normals and tangents.
    pub fn is_resolution_consistent(&self) -> bool {
        let n = self.resolution();
        n >= 2
            && self.lines().all(|g| {
                g.serie_points.len() == n && g.serie_normals.len() == n && g.serie_tangents.len() == n
            })
    }

    /// No NaN or infinite coordinates anywhere in the serie data.
    pub fn are_points_finite(&self) -> bool {
        self.lines().all(|g| {
            g.serie_points
                .iter()
                .chain(&g.serie_normals)
                .chain(&g.serie_tangents)
                .all(|p| p.is_finite())
        })
    }

    /// Consecutive serie points are distinct in the plane.
    pub fn has_no_zero_steps(&self) -> bool {
        self.lines().all(|g| {
            g.serie_points
                .windows(2)
                .all(|w| planar_distance(w[0], w[1]) > self.epsilon)
        })
    }

    /// All normals have unit length (within epsilon).
    pub fn are_normals_normalized(&self, epsilon: f64) -> bool {
        self.lines().all(|g| {
            g.serie_normals.iter().all(|n| {
                let len = (n.x * n.x + n.y * n.y + n.z * n.z).sqrt();
                (len - 1.0).abs() <= epsilon
            })
        })
    }

    /// No lane's boundaries touch at any sample.
    pub fn are_lane_widths_positive(&self) -> bool {
        self.road
            .left_lanes
            .iter()
            .chain(&self.road.right_lanes)
            .all(|lane| {
                lane.inner_line
                    .geometry
                    .serie_points
                    .iter()
                    .zip(&lane.outer_line.geometry.serie_points)
                    .all(|(a, b)| planar_distance(*a, *b) > self.epsilon)
            })
    }

    pub fn is_valid(&self) -> bool {
        self.validate_all().is_empty()
    }

    /// Run all standard checks and return a list of failures.
    pub fn validate_all(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.is_resolution_consistent() {
            errors.push(format!(
                "Road {}: inconsistent serie resolution (expected {})",
                self.road.id,
                self.resolution()
            ));
        }
        if !self.are_points_finite() {
            errors.push(format!("Road {}: non-finite serie data", self.road.id));
        }
        if !self.has_no_zero_steps() {
            errors.push(format!("Road {}: zero-length serie step", self.road.id));
        }
        if !self.are_normals_normalized(1e-6_f64.max(self.epsilon)) {
            errors.push(format!("Road {}: normals not normalized", self.road.id));
        }
        if !self.are_lane_widths_positive() {
            errors.push(format!("Road {}: collapsed lane width", self.road.id));
        }
        errors
    }
}
