//! Persisted key/value settings
//!
//! Settings are a flat JSON object. Keys are namespaced by string
//! (`grain_enabled_sdr`, `cas_enabled_app_<id>_external`, ...); see [`keys`].

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Key/value store the orchestrator reads toggles from and writes them to
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&mut self, key: &str, value: Value);

    /// Flush pending writes
    fn commit(&mut self) -> Result<()>;

    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    fn get_f64(&self, key: &str, default: f64) -> f64 {
        self.get(key).and_then(|v| v.as_f64()).unwrap_or(default)
    }

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set and immediately commit, logging instead of failing
    fn persist(&mut self, key: &str, value: Value) {
        self.set(key, value);
        if let Err(e) = self.commit() {
            warn!(key = %key, error = ?e, "Failed to commit setting");
        }
    }
}

/// Settings backed by a pretty-printed JSON file
#[derive(Debug)]
pub struct JsonSettings {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonSettings {
    /// Load from `path`. A missing file starts empty; a corrupt one is
    /// reported and replaced on the next commit.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {:?}", path))?;
            match serde_json::from_str::<Map<String, Value>>(&contents) {
                Ok(values) => values,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Settings file is not a JSON object, starting fresh");
                    Map::new()
                }
            }
        } else {
            info!(path = %path.display(), "No settings file yet");
            Map::new()
        };

        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonSettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn commit(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(&self.values)
            .context("Failed to serialize settings to JSON")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write settings to {:?}", self.path))?;
        Ok(())
    }
}

/// Setting key names
pub mod keys {
    use crate::profile::{MonitorClass, ProfileClass};

    pub const ENABLED: &str = "enabled";
    pub const BRIGHTNESS_ENABLED: &str = "brightness_enabled";
    pub const WATCH_EXTERNAL_MONITOR: &str = "watch_external_monitor";
    pub const EXTERNAL_SHARPEN_ONLY: &str = "external_sharpen_only";
    pub const HAS_SEEN_WELCOME: &str = "has_seen_welcome";

    pub fn grain(class: ProfileClass) -> String {
        format!("grain_enabled_{}", class.key_suffix())
    }

    pub fn lgg(class: ProfileClass) -> String {
        format!("lgg_enabled_{}", class.key_suffix())
    }

    pub fn cas_enabled(monitor: MonitorClass) -> String {
        format!("cas_enabled_{}", monitor.key_suffix())
    }

    pub fn cas_strength(monitor: MonitorClass) -> String {
        format!("cas_strength_{}", monitor.key_suffix())
    }

    pub fn app_override(appid: u32, monitor: MonitorClass) -> String {
        format!("cas_override_app_{appid}_{}", monitor.key_suffix())
    }

    pub fn app_cas_enabled(appid: u32, monitor: MonitorClass) -> String {
        format!("cas_enabled_app_{appid}_{}", monitor.key_suffix())
    }

    pub fn app_cas_strength(appid: u32, monitor: MonitorClass) -> String {
        format!("cas_strength_app_{appid}_{}", monitor.key_suffix())
    }
}
