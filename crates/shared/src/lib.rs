use serde::{Deserialize, Serialize};

mod curve;
mod junction;
mod map;
mod road;
mod signal;

pub use curve::*;
pub use junction::*;
pub use map::*;
pub use road::*;
pub use signal::*;

/// Уникальный идентификатор объекта карты
pub type ObjectId = String;

/// Идентификатор дороги (persistence id)
pub type RoadId = String;

/// Идентификатор полосы: `${roadId}_0_${signedIndex}`
pub type LaneId = String;

/// Идентификатор перекрёстка
pub type JunctionId = String;

/// Идентификатор сигнала
pub type SignalId = String;

/// 2D-точка (плоскость или кривая высоты: x = длина дуги, y = высота)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 3D-точка; z: высота, xy: плоскость карты
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Точка на плоскости (z = 0)
    pub fn planar(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}
