use std::time::Duration;

use dronedash_shared::geo::DEFAULT_AVERAGE_SPEED_KMH;
use dronedash_shared::models::{GeoPoint, WORLD_VIEW_CENTER};
use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};

/// What `undo()` does with a deleted terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UndoStrategy {
    /// Splice the old record back into the local list only. The backend keeps it deleted.
    LocalOnly,
    /// Re-create the terminal on the backend and show the server's record once that succeeds.
    RecreateOnBackend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardConfig {
    /// Prefix for relative endpoint templates. Empty means same origin.
    pub api_base_url: String,
    pub terminals_path: String,
    pub warehouses_path: String,
    /// Must contain `{id}`.
    pub telemetry_path: String,
    /// Must contain `{name}`.
    pub assignments_path: String,
    pub undo_window_secs: u64,
    pub undo_capacity: usize,
    pub undo_strategy: UndoStrategy,
    pub average_speed_kmh: f64,
    pub focus_zoom: u8,
    pub tracking_zoom: u8,
    pub default_center: GeoPoint,
    pub default_zoom: u8,
    pub error_notification_secs: u64,
    pub notification_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            api_base_url: String::new(),
            terminals_path: "/terminals".to_string(),
            warehouses_path: "/warehouses".to_string(),
            telemetry_path: "/package_telemetry/{id}".to_string(),
            assignments_path: "/drone_assignments_by_warehouse/{name}".to_string(),
            undo_window_secs: 10,
            undo_capacity: 5,
            undo_strategy: UndoStrategy::RecreateOnBackend,
            average_speed_kmh: DEFAULT_AVERAGE_SPEED_KMH,
            focus_zoom: 15,
            tracking_zoom: 9,
            default_center: WORLD_VIEW_CENTER,
            default_zoom: 2,
            error_notification_secs: 5,
            notification_secs: 3,
        }
    }
}

impl DashboardConfig {
    /// Parse a JSON config document; missing keys take their defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: DashboardConfig = serde_json::from_str(raw)
            .map_err(|e| DashboardError::Validation(format!("Invalid dashboard config: {}", e)))?;
        config.validate().map_err(DashboardError::Validation)?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.average_speed_kmh.is_finite() && self.average_speed_kmh > 0.0) {
            return Err(format!(
                "averageSpeedKmh must be a positive number, got {}",
                self.average_speed_kmh
            ));
        }
        if self.undo_capacity == 0 {
            return Err("undoCapacity must be at least 1".to_string());
        }
        if self.undo_window_secs == 0 {
            return Err("undoWindowSecs must be at least 1".to_string());
        }
        if !self.telemetry_path.contains("{id}") {
            return Err("telemetryPath must contain {id}".to_string());
        }
        if !self.assignments_path.contains("{name}") {
            return Err("assignmentsPath must contain {name}".to_string());
        }
        Ok(())
    }

    pub fn undo_window(&self) -> Duration {
        Duration::from_secs(self.undo_window_secs)
    }

    fn resolve(&self, template: &str) -> String {
        if template.starts_with("http://") || template.starts_with("https://") {
            template.to_string()
        } else {
            format!("{}{}", self.api_base_url.trim_end_matches('/'), template)
        }
    }

    pub fn terminals_url(&self) -> String {
        self.resolve(&self.terminals_path)
    }

    pub fn terminal_url(&self, id: i64) -> String {
        format!("{}/{}", self.terminals_url().trim_end_matches('/'), id)
    }

    pub fn warehouses_url(&self) -> String {
        self.resolve(&self.warehouses_path)
    }

    pub fn warehouse_url(&self, id: i64) -> String {
        format!("{}/{}", self.warehouses_url().trim_end_matches('/'), id)
    }

    pub fn telemetry_url(&self, package_id: &str) -> String {
        self.resolve(&self.telemetry_path)
            .replace("{id}", &urlencoding::encode(package_id))
    }

    pub fn assignments_url(&self, warehouse_name: &str) -> String {
        self.resolve(&self.assignments_path)
            .replace("{name}", &urlencoding::encode(warehouse_name))
    }
}
