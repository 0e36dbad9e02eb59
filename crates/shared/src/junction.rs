use serde::{Deserialize, Serialize};

use crate::{CurveGeometry, JunctionId, ObjectId, RoadEnd, RoadId};

/// Какая крайняя граница дороги (относительно направления выезда из перекрёстка)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundarySide {
    Leftmost,
    Rightmost,
}

/// Точка крепления ребра перекрёстка к концу дороги
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeAnchor {
    pub road_end: RoadEnd,
    pub boundary: BoundarySide,
}

/// Ребро перекрёстка: производная кривая между соседними концами дорог
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JunctionEdge {
    pub id: ObjectId,
    pub geometry: CurveGeometry,
    pub start_anchor: EdgeAnchor,
    pub end_anchor: EdgeAnchor,
}

/// Кандидат на соединение двух концов дорог внутри перекрёстка
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JunctionConnection {
    pub from: RoadEnd,
    pub to: RoadEnd,
    /// Дорога-коннектор, если соединение уже построено
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_road_id: Option<RoadId>,
}

/// Перекрёсток
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Junction {
    pub id: JunctionId,
    /// Концы дорог, входящих в перекрёсток (в порядке обхода против часовой)
    pub ends: Vec<RoadEnd>,
    pub edges: Vec<JunctionEdge>,
    #[serde(default)]
    pub connections: Vec<JunctionConnection>,
}

impl Junction {
    pub fn edge(&self, edge_id: &str) -> Option<&JunctionEdge> {
        self.edges.iter().find(|e| e.id == edge_id)
    }

    pub fn edge_index(&self, edge_id: &str) -> Option<usize> {
        self.edges.iter().position(|e| e.id == edge_id)
    }

    /// Затрагивает ли перекрёсток дорогу
    pub fn involves_road(&self, road_id: &str) -> bool {
        self.ends.iter().any(|end| end.road_id == road_id)
    }

    pub fn road_ids(&self) -> Vec<RoadId> {
        let mut ids: Vec<RoadId> = self.ends.iter().map(|e| e.road_id.clone()).collect();
        ids.dedup();
        ids
    }

    pub fn connection_mut(&mut self, from: &RoadEnd, to: &RoadEnd) -> Option<&mut JunctionConnection> {
        self.connections
            .iter_mut()
            .find(|c| c.from == *from && c.to == *to)
    }

    /// Убрать из перекрёстка всё, что ссылается на дорогу: её концы, рёбра с
    /// якорем на ней, соединения с её концами и ссылки на неё как на коннектор
    pub fn detach_road(&mut self, road_id: &str) {
        self.ends.retain(|end| end.road_id != road_id);
        self.edges.retain(|edge| {
            edge.start_anchor.road_end.road_id != road_id
                && edge.end_anchor.road_end.road_id != road_id
        });
        self.connections
            .retain(|c| c.from.road_id != road_id && c.to.road_id != road_id);
        for connection in &mut self.connections {
            if connection.connector_road_id.as_deref() == Some(road_id) {
                connection.connector_road_id = None;
            }
        }
    }

    /// Есть ли в перекрёстке хоть одна ссылка на дорогу
    pub fn references_road(&self, road_id: &str) -> bool {
        self.involves_road(road_id)
            || self.edges.iter().any(|edge| {
                edge.start_anchor.road_end.road_id == road_id
                    || edge.end_anchor.road_end.road_id == road_id
            })
            || self
                .connections
                .iter()
                .any(|c| c.connector_road_id.as_deref() == Some(road_id))
    }
}
