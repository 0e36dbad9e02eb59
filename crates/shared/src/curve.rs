use serde::{Deserialize, Serialize};

use crate::{Point2D, Point3D};

/// Геометрия кривой: разреженные catmull-точки, плотная серия и
/// отдельная (развязанная) кривая высоты.
///
/// Одна и та же форма используется опорной линией дороги, границами полос
/// и рёбрами перекрёстков.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CurveGeometry {
    /// Управляющие точки, заданные пользователем
    pub catmull_points: Vec<Point3D>,
    /// По одной касательной на управляющую точку
    pub catmull_tangents: Vec<Point3D>,
    /// Плотная ломаная фиксированной длины N
    pub serie_points: Vec<Point3D>,
    /// Единичные нормали в горизонтальной плоскости (по одной на точку серии)
    pub serie_normals: Vec<Point3D>,
    /// Единичные касательные (по одной на точку серии)
    pub serie_tangents: Vec<Point3D>,
    /// Кривая высоты: x = длина дуги от начала, y = высота
    #[serde(default)]
    pub altitude_catmull_points: Vec<Point2D>,
    #[serde(default)]
    pub altitude_catmull_tangents: Vec<Point2D>,
}

impl CurveGeometry {
    /// Количество точек серии (разрешение N)
    pub fn resolution(&self) -> usize {
        self.serie_points.len()
    }

    pub fn first_serie_point(&self) -> Option<Point3D> {
        self.serie_points.first().copied()
    }

    pub fn last_serie_point(&self) -> Option<Point3D> {
        self.serie_points.last().copied()
    }

    pub fn first_normal(&self) -> Option<Point3D> {
        self.serie_normals.first().copied()
    }

    pub fn last_normal(&self) -> Option<Point3D> {
        self.serie_normals.last().copied()
    }
}

/// Сторона границы внутри полосы
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineSide {
    Inner,
    Outer,
}

/// Тип разметки границы
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryType {
    #[default]
    Solid,
    Dashed,
    DoubleSolid,
    SolidDashed,
    DashedSolid,
    Curb,
    None,
}

/// Пара атрибутов границы: тип разметки и признак виртуальной линии
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineBoundary {
    pub boundary_type: BoundaryType,
    #[serde(default)]
    pub is_virtual: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    #[default]
    Standard,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineColor {
    #[default]
    White,
    Yellow,
}

/// Опции отображения линии
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineOptions {
    pub style: LineStyle,
    pub color: LineColor,
}

/// Граница полосы (внутренняя или внешняя)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneLine {
    pub line_side: LineSide,
    pub geometry: CurveGeometry,
    #[serde(default)]
    pub boundary: LineBoundary,
    #[serde(default)]
    pub options: LineOptions,
}

/// Односегментный коннектор между внутренней и внешней границей
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LaneConnector {
    pub start: Point3D,
    pub end: Point3D,
}

impl LaneConnector {
    /// Коннектор начала: первые точки серий внутренней и внешней границ
    pub fn at_start(inner: &CurveGeometry, outer: &CurveGeometry) -> Self {
        Self {
            start: inner.first_serie_point().unwrap_or_default(),
            end: outer.first_serie_point().unwrap_or_default(),
        }
    }

    /// Коннектор конца: последние точки серий
    pub fn at_end(inner: &CurveGeometry, outer: &CurveGeometry) -> Self {
        Self {
            start: inner.last_serie_point().unwrap_or_default(),
            end: outer.last_serie_point().unwrap_or_default(),
        }
    }
}
