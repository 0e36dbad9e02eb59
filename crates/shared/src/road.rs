use serde::{Deserialize, Serialize};

use crate::{CurveGeometry, JunctionId, LaneConnector, LaneId, LaneLine, LineSide, RoadId};

/// Сторона полосы относительно направления опорной линии
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneSide {
    Left,
    Right,
}

impl LaneSide {
    /// Знак смещения вдоль левой нормали: +1 для левых полос, -1 для правых
    pub fn sign(&self) -> f64 {
        match self {
            LaneSide::Left => 1.0,
            LaneSide::Right => -1.0,
        }
    }

    pub fn opposite(&self) -> LaneSide {
        match self {
            LaneSide::Left => LaneSide::Right,
            LaneSide::Right => LaneSide::Left,
        }
    }

    pub fn all() -> &'static [LaneSide] {
        &[LaneSide::Left, LaneSide::Right]
    }
}

/// Категория дороги
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadCategory {
    Straight,
    Spline,
    Connector,
}

impl RoadCategory {
    /// Имя категории в названиях событий (`Invoke<Op><Category>RoadEvent`)
    pub fn event_name(&self) -> &'static str {
        match self {
            RoadCategory::Straight => "Straight",
            RoadCategory::Spline => "Spline",
            RoadCategory::Connector => "Connector",
        }
    }

    pub fn all() -> &'static [RoadCategory] {
        &[RoadCategory::Straight, RoadCategory::Spline, RoadCategory::Connector]
    }
}

/// Конец дороги, к которому что-то примыкает
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactPoint {
    Start,
    End,
}

/// Ссылка на конкретный конец дороги
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoadEnd {
    pub road_id: RoadId,
    pub contact: ContactPoint,
}

impl RoadEnd {
    pub fn new(road_id: impl Into<RoadId>, contact: ContactPoint) -> Self {
        Self {
            road_id: road_id.into(),
            contact,
        }
    }
}

/// Слабая ссылка на полосу (разрешается через хранилище, не владеет)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneRef {
    pub lane_id: LaneId,
    pub road_id: RoadId,
    pub road_category: RoadCategory,
}

/// Слабая ссылка на дорогу
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadRef {
    pub road_id: RoadId,
    pub road_category: RoadCategory,
    pub contact: ContactPoint,
}

/// Полоса: внутренняя и внешняя границы плюс два коннектора
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub id: LaneId,
    pub side: LaneSide,
    pub inner_line: LaneLine,
    pub outer_line: LaneLine,
    pub start_connector: LaneConnector,
    pub end_connector: LaneConnector,
    #[serde(default = "default_true")]
    pub width_editable: bool,
    #[serde(default)]
    pub predecessors: Vec<LaneRef>,
    #[serde(default)]
    pub successors: Vec<LaneRef>,
}

fn default_true() -> bool {
    true
}

fn default_transparency() -> f64 {
    1.0
}

impl Lane {
    pub fn line(&self, line_side: LineSide) -> &LaneLine {
        match line_side {
            LineSide::Inner => &self.inner_line,
            LineSide::Outer => &self.outer_line,
        }
    }

    pub fn line_mut(&mut self, line_side: LineSide) -> &mut LaneLine {
        match line_side {
            LineSide::Inner => &mut self.inner_line,
            LineSide::Outer => &mut self.outer_line,
        }
    }

    /// Пересчитать оба коннектора по текущим границам
    pub fn refresh_connectors(&mut self) {
        self.start_connector =
            LaneConnector::at_start(&self.inner_line.geometry, &self.outer_line.geometry);
        self.end_connector =
            LaneConnector::at_end(&self.inner_line.geometry, &self.outer_line.geometry);
    }
}

/// Связь дороги-коннектора с соединяемыми концами
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadConnection {
    pub from: RoadEnd,
    pub to: RoadEnd,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub junction_id: Option<JunctionId>,
}

/// Дорога: опорная линия и упорядоченные списки полос по сторонам
/// (индекс 0: ближайшая к опорной линии)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Road {
    pub id: RoadId,
    pub category: RoadCategory,
    pub reference_line: CurveGeometry,
    pub left_lanes: Vec<Lane>,
    pub right_lanes: Vec<Lane>,
    /// Монотонный счётчик для новых id левых полос
    pub general_left_lane_index: u32,
    /// Монотонный счётчик для новых id правых полос
    pub general_right_lane_index: u32,
    #[serde(default)]
    pub predecessors: Vec<RoadRef>,
    #[serde(default)]
    pub successors: Vec<RoadRef>,
    /// Прозрачность при отображении (0..=1)
    #[serde(default = "default_transparency")]
    pub transparency: f64,
    /// Только для коннекторов
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<RoadConnection>,
}

impl Road {
    pub fn lanes(&self, side: LaneSide) -> &[Lane] {
        match side {
            LaneSide::Left => &self.left_lanes,
            LaneSide::Right => &self.right_lanes,
        }
    }

    pub fn lanes_mut(&mut self, side: LaneSide) -> &mut Vec<Lane> {
        match side {
            LaneSide::Left => &mut self.left_lanes,
            LaneSide::Right => &mut self.right_lanes,
        }
    }

    pub fn set_lanes(&mut self, side: LaneSide, lanes: Vec<Lane>) {
        *self.lanes_mut(side) = lanes;
    }

    /// Найти полосу по id: (сторона, индекс, полоса)
    pub fn find_lane(&self, lane_id: &str) -> Option<(LaneSide, usize, &Lane)> {
        LaneSide::all().iter().find_map(|side| {
            self.lanes(*side)
                .iter()
                .enumerate()
                .find(|(_, lane)| lane.id == lane_id)
                .map(|(index, lane)| (*side, index, lane))
        })
    }

    pub fn lane_count(&self) -> usize {
        self.left_lanes.len() + self.right_lanes.len()
    }

    pub fn general_lane_index(&self, side: LaneSide) -> u32 {
        match side {
            LaneSide::Left => self.general_left_lane_index,
            LaneSide::Right => self.general_right_lane_index,
        }
    }

    /// Увеличить счётчик стороны и вернуть новое значение
    pub fn bump_general_lane_index(&mut self, side: LaneSide) -> u32 {
        let counter = match side {
            LaneSide::Left => &mut self.general_left_lane_index,
            LaneSide::Right => &mut self.general_right_lane_index,
        };
        *counter += 1;
        *counter
    }

    /// Совпадают ли дороги во всём, кроме списков полос
    pub fn same_except_lanes(&self, other: &Road) -> bool {
        self.id == other.id
            && self.category == other.category
            && self.reference_line == other.reference_line
            && self.general_left_lane_index == other.general_left_lane_index
            && self.general_right_lane_index == other.general_right_lane_index
            && self.predecessors == other.predecessors
            && self.successors == other.successors
            && self.transparency == other.transparency
            && self.connection == other.connection
    }
}

/// Собрать id полосы: `${roadId}_0_${signedIndex}`, знак кодирует сторону
pub fn lane_id(road_id: &str, side: LaneSide, index: u32) -> LaneId {
    match side {
        LaneSide::Left => format!("{}_0_{}", road_id, index),
        LaneSide::Right => format!("{}_0_-{}", road_id, index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::roundtrip;
    use crate::{LineBoundary, LineOptions};

    fn line(line_side: LineSide) -> LaneLine {
        LaneLine {
            line_side,
            geometry: CurveGeometry::default(),
            boundary: LineBoundary::default(),
            options: LineOptions::default(),
        }
    }

    fn lane(id: &str, side: LaneSide) -> Lane {
        Lane {
            id: id.to_string(),
            side,
            inner_line: line(LineSide::Inner),
            outer_line: line(LineSide::Outer),
            start_connector: LaneConnector::default(),
            end_connector: LaneConnector::default(),
            width_editable: true,
            predecessors: vec![],
            successors: vec![],
        }
    }

    fn road() -> Road {
        Road {
            id: "R1".to_string(),
            category: RoadCategory::Spline,
            reference_line: CurveGeometry::default(),
            left_lanes: vec![lane("R1_0_1", LaneSide::Left)],
            right_lanes: vec![lane("R1_0_-1", LaneSide::Right)],
            general_left_lane_index: 1,
            general_right_lane_index: 1,
            predecessors: vec![],
            successors: vec![],
            transparency: 1.0,
            connection: None,
        }
    }

    #[test]
    fn test_lane_id_format() {
        assert_eq!(lane_id("R1", LaneSide::Left, 2), "R1_0_2");
        assert_eq!(lane_id("R1", LaneSide::Right, 3), "R1_0_-3");
    }

    #[test]
    fn test_find_lane() {
        let r = road();
        let (side, index, found) = r.find_lane("R1_0_-1").unwrap();
        assert_eq!(side, LaneSide::Right);
        assert_eq!(index, 0);
        assert_eq!(found.id, "R1_0_-1");
        assert!(r.find_lane("R1_0_9").is_none());
    }

    #[test]
    fn test_bump_general_lane_index() {
        let mut r = road();
        assert_eq!(r.bump_general_lane_index(LaneSide::Left), 2);
        assert_eq!(r.general_lane_index(LaneSide::Left), 2);
        assert_eq!(r.general_lane_index(LaneSide::Right), 1);
    }

    #[test]
    fn test_same_except_lanes() {
        let a = road();
        let mut b = road();
        b.left_lanes.clear();
        assert!(a.same_except_lanes(&b));
        b.transparency = 0.5;
        assert!(!a.same_except_lanes(&b));
    }

    #[test]
    fn test_road_serde_defaults() {
        let r = road();
        roundtrip(&r);
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains(r#""category":"spline""#));
        assert!(!json.contains("connection"));
    }

    #[test]
    fn test_side_sign() {
        assert_eq!(LaneSide::Left.sign(), 1.0);
        assert_eq!(LaneSide::Right.sign(), -1.0);
        assert_eq!(LaneSide::Left.opposite(), LaneSide::Right);
    }
}
