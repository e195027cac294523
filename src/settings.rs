//! Route settings — which backend/model handles the tag-generation task —
//! plus the shared backend configuration record the route override mutates.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Temporary backend/model override for one generation task. All fields
/// optional, empty meaning "leave the current value alone". Read fresh per
/// call, never persisted by the pipeline itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteSettings {
    /// Routing parameter passed through to the rich generation call.
    #[serde(default)]
    pub api: String,
    /// Replacement chat source applied to the shared backend settings.
    #[serde(default)]
    pub chat_source: String,
    /// Key under which `model` is written into the shared model table.
    #[serde(default)]
    pub model_setting_key: String,
    #[serde(default)]
    pub model: String,
}

impl RouteSettings {
    pub fn is_empty(&self) -> bool {
        self.api.is_empty()
            && self.chat_source.is_empty()
            && self.model_setting_key.is_empty()
            && self.model.is_empty()
    }
}

/// The settings-store record: per-task route overrides keyed by task name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskRoutes {
    #[serde(default)]
    pub tag_generation: RouteSettings,
}

pub fn load_routes(path: &Path) -> TaskRoutes {
    load_json_config(path, "routes")
}

pub fn save_routes(path: &Path, routes: &TaskRoutes) -> Result<(), String> {
    save_json_config(path, routes, "routes")
}

/// Shared, process-wide backend configuration. The generation adapter applies
/// a route override to this record before a rich call and restores the prior
/// values afterwards; overlapping invocations racing on it is an acknowledged
/// limitation, not handled here.
#[derive(Debug, Clone, Default)]
pub struct BackendSettings {
    pub chat_source: String,
    pub models: HashMap<String, String>,
}

// ── Generic JSON config I/O ────────────────────────────

/// Load any serde config type, falling back to `T::default()` when the file
/// is missing or unparsable.
pub fn load_json_config<T: DeserializeOwned + Default>(path: &Path, label: &str) -> T {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<T>(&content) {
            Ok(config) => {
                debug!("loaded {} config from {}", label, path.display());
                config
            }
            Err(e) => {
                warn!(
                    "failed to parse {} config {}: {} (using defaults)",
                    label,
                    path.display(),
                    e
                );
                T::default()
            }
        },
        Err(_) => {
            debug!(
                "no {} config file at {} (using defaults)",
                label,
                path.display()
            );
            T::default()
        }
    }
}

pub fn save_json_config<T: Serialize>(path: &Path, config: &T, label: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize {} config: {}", label, e))?;
    std::fs::write(path, json).map_err(|e| format!("Failed to write config file: {}", e))?;
    debug!("saved {} config to {}", label, path.display());
    Ok(())
}
