use serde::{Deserialize, Serialize};

use crate::{ObjectId, Point3D, SignalId};

/// Тип сигнала определяет сетку под-сигналов (строки × столбцы)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    TrafficLightVertical,
    TrafficLightHorizontal,
    Pedestrian,
    ArrowPanel,
    StopSign,
    SpeedLimit,
}

impl SignalType {
    /// Размер сетки под-сигналов: (строки, столбцы)
    pub fn grid(&self) -> (usize, usize) {
        match self {
            SignalType::TrafficLightVertical => (3, 1),
            SignalType::TrafficLightHorizontal => (1, 3),
            SignalType::Pedestrian => (2, 1),
            SignalType::ArrowPanel => (1, 4),
            SignalType::StopSign => (1, 1),
            SignalType::SpeedLimit => (1, 1),
        }
    }
}

/// Маркер под-сигнала (одна секция светофора и т.п.)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubSignal {
    pub id: ObjectId,
    pub row: usize,
    pub column: usize,
    pub position: Point3D,
}

/// Свободно стоящий сигнал: ориентированный прямоугольник в вертикальной плоскости
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub signal_type: SignalType,
    pub center: Point3D,
    /// Курс в радианах (против часовой от +X)
    pub heading: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub sub_signals: Vec<SubSignal>,
}
