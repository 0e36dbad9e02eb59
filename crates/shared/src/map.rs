use serde::{Deserialize, Serialize};

use crate::{Junction, Road, Signal};

fn default_version() -> u32 {
    1
}

/// Описание карты целиком, формат обмена с хранилищем и файлами
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDescription {
    /// Версия формата
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub roads: Vec<Road>,
    #[serde(default)]
    pub junctions: Vec<Junction>,
    #[serde(default)]
    pub signals: Vec<Signal>,
}

impl Default for MapDescription {
    fn default() -> Self {
        Self {
            version: 1,
            roads: Vec::new(),
            junctions: Vec::new(),
            signals: Vec::new(),
        }
    }
}

impl MapDescription {
    pub fn is_empty(&self) -> bool {
        self.roads.is_empty() && self.junctions.is_empty() && self.signals.is_empty()
    }
}
