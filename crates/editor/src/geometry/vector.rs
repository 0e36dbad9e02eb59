// Conversions between model points and the glam / kurbo types the kernel computes with.

use glam::DVec3;
use kurbo::{Point, Vec2};
use shared::{Point2D, Point3D};

pub(crate) fn to_dvec3(p: Point3D) -> DVec3 {
    DVec3::new(p.x, p.y, p.z)
}

pub(crate) fn from_dvec3(v: DVec3) -> Point3D {
    Point3D::new(v.x, v.y, v.z)
}

/// Planar projection as a kurbo point
pub(crate) fn to_point(p: Point3D) -> Point {
    Point::new(p.x, p.y)
}

pub(crate) fn to_vec2(p: Point3D) -> Vec2 {
    Vec2::new(p.x, p.y)
}

pub(crate) fn station_point(p: Point2D) -> Point {
    Point::new(p.x, p.y)
}

/// Distance between two points ignoring height
pub fn planar_distance(a: Point3D, b: Point3D) -> f64 {
    (to_point(b) - to_point(a)).hypot()
}

/// Length of a vector ignoring its z component
pub fn planar_length(v: Point3D) -> f64 {
    to_vec2(v).hypot()
}
