//! Engine and harness configuration.

use serde::{Deserialize, Serialize};

/// Where the asset loader finds each asset kind, relative to `asset_root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    #[serde(rename = "assetRoot")]
    pub asset_root: String,
    #[serde(rename = "conditionPath", default = "default_condition_path")]
    pub condition_path: String,
    #[serde(rename = "sensorPath", default = "default_sensor_path")]
    pub sensor_path: String,
    #[serde(rename = "taskPath", default = "default_task_path")]
    pub task_path: String,
    #[serde(rename = "taskGraphPath", default = "default_task_graph_path")]
    pub task_graph_path: String,
    #[serde(rename = "methodPath", default = "default_method_path")]
    pub method_path: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            asset_root: "assets".to_string(),
            condition_path: default_condition_path(),
            sensor_path: default_sensor_path(),
            task_path: default_task_path(),
            task_graph_path: default_task_graph_path(),
            method_path: default_method_path(),
        }
    }
}

fn default_condition_path() -> String {
    "conditions".to_string()
}

fn default_sensor_path() -> String {
    "sensors".to_string()
}

fn default_task_path() -> String {
    "tasks".to_string()
}

fn default_task_graph_path() -> String {
    "taskgraph.json".to_string()
}

fn default_method_path() -> String {
    "methods".to_string()
}

/// Cadence of the external tick harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickConfig {
    /// Wall-clock duration of one tick.
    #[serde(rename = "tickDurationMs", default = "default_tick_duration_ms")]
    pub tick_duration_ms: u64,
    /// Safety bound on harness iterations; `None` runs until the plan is empty.
    #[serde(rename = "maxTicks", default)]
    pub max_ticks: Option<u64>,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_duration_ms: default_tick_duration_ms(),
            max_ticks: None,
        }
    }
}

fn default_tick_duration_ms() -> u64 {
    1_000
}
