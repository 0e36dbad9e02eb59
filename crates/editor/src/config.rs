//! Editor settings

use std::path::Path;

use serde::{Deserialize, Serialize};
use shared::RoadCategory;

/// Serie resolution and connector refinement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingSettings {
    /// Serie point count of straight roads
    pub straight_points: usize,
    /// Serie point count of spline roads
    pub spline_points: usize,
    /// Serie point count of connector roads and junction edges
    pub connector_points: usize,
    /// Sub-spans per control span for ControlRefine sampling
    pub refine_subdivisions: usize,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            straight_points: 40,
            spline_points: 120,
            connector_points: 60,
            refine_subdivisions: 4,
        }
    }
}

impl SamplingSettings {
    /// Serie resolution N for a road category
    pub fn points_for(&self, category: RoadCategory) -> usize {
        match category {
            RoadCategory::Straight => self.straight_points,
            RoadCategory::Spline => self.spline_points,
            RoadCategory::Connector => self.connector_points,
        }
    }
}

/// Lane defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneSettings {
    /// Width of newly created lanes, meters
    pub default_width: f64,
    /// Narrowest width an edit may produce, meters
    pub min_width: f64,
    /// Length appended by an extend without an explicit point, meters
    pub extend_length: f64,
}

impl Default for LaneSettings {
    fn default() -> Self {
        Self {
            default_width: 3.5,
            min_width: 0.1,
            extend_length: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySettings {
    /// Maximum number of undo steps kept
    pub max_depth: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValiditySettings {
    /// Tolerance used by the road validator
    pub epsilon: f64,
}

impl Default for ValiditySettings {
    fn default() -> Self {
        Self { epsilon: 1e-6 }
    }
}

/// Persistence backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceSettings {
    /// Backend base URL; persistence is off when unset
    #[serde(default)]
    pub base_url: Option<String>,
    /// Prefix of every request namespace
    pub namespace: String,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            namespace: "hdmap".to_string(),
        }
    }
}

/// All editor settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EditorSettings {
    #[serde(default)]
    pub sampling: SamplingSettings,
    #[serde(default)]
    pub lanes: LaneSettings,
    #[serde(default)]
    pub history: HistorySettings,
    #[serde(default)]
    pub validity: ValiditySettings,
    #[serde(default)]
    pub persistence: PersistenceSettings,
}

impl EditorSettings {
    /// Load settings from the user config dir, or return default if not found
    pub fn load() -> Self {
        if let Some(dirs) = directories::ProjectDirs::from("com", "hdmap", "hdmap-editor") {
            let config_path = dirs.config_dir().join("settings.json");
            if config_path.exists() {
                match Self::load_from(&config_path) {
                    Ok(settings) => return settings,
                    Err(e) => tracing::warn!("Ignoring settings file: {e}"),
                }
            }
        }
        Self::default()
    }

    /// Load settings from an explicit file
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        serde_json::from_str(&json).map_err(|e| format!("Failed to parse {}: {e}", path.display()))
    }

    /// Write settings as pretty JSON, creating missing parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create {}: {e}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {e}"))?;
        std::fs::write(path, json).map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
        tracing::info!("Saved settings to {}", path.display());
        Ok(())
    }
}
