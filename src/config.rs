use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct AssetsConfig {
    #[serde(default = "AssetsConfig::default_root")]
    pub root: PathBuf,
    #[serde(default = "AssetsConfig::default_objects")]
    pub objects: String,
    #[serde(default = "AssetsConfig::default_rooms")]
    pub rooms: String,
    #[serde(default = "AssetsConfig::default_ui")]
    pub ui: String,
    #[serde(default = "AssetsConfig::default_main")]
    pub main: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhysicsConfig {
    #[serde(default)]
    pub gravity: [f32; 2],
    #[serde(default)]
    pub linear_damping: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "CameraConfig::default_zoom_min")]
    pub zoom_min: f32,
    #[serde(default = "CameraConfig::default_zoom_max")]
    pub zoom_max: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "RuntimeConfig::default_fixed_delta")]
    pub fixed_delta: f32,
    #[serde(default)]
    pub max_ticks: Option<u64>,
    #[serde(default)]
    pub render_hitboxes: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default = "EngineConfig::default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfigOverrides {
    pub assets_root: Option<PathBuf>,
    pub main: Option<String>,
    pub ticks: Option<u64>,
    pub delta: Option<f32>,
    pub hitboxes: Option<bool>,
}

impl AssetsConfig {
    fn default_root() -> PathBuf {
        PathBuf::from("assets")
    }

    fn default_objects() -> String {
        "objects".to_string()
    }

    fn default_rooms() -> String {
        "rooms".to_string()
    }

    fn default_ui() -> String {
        "ui".to_string()
    }

    fn default_main() -> Option<String> {
        Some("main.lua".to_string())
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.root.join(&self.objects)
    }

    pub fn rooms_dir(&self) -> PathBuf {
        self.root.join(&self.rooms)
    }

    pub fn ui_dir(&self) -> PathBuf {
        self.root.join(&self.ui)
    }

    pub fn main_script(&self) -> Option<PathBuf> {
        self.main.as_ref().map(|main| self.root.join(main))
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            root: Self::default_root(),
            objects: Self::default_objects(),
            rooms: Self::default_rooms(),
            ui: Self::default_ui(),
            main: Self::default_main(),
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self { gravity: [0.0, 0.0], linear_damping: 0.0 }
    }
}

impl CameraConfig {
    const fn default_zoom_min() -> f32 {
        0.25
    }

    const fn default_zoom_max() -> f32 {
        5.0
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { zoom_min: Self::default_zoom_min(), zoom_max: Self::default_zoom_max() }
    }
}

impl RuntimeConfig {
    const fn default_fixed_delta() -> f32 {
        1.0 / 60.0
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { fixed_delta: Self::default_fixed_delta(), max_ticks: None, render_hitboxes: false }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            assets: AssetsConfig::default(),
            physics: PhysicsConfig::default(),
            camera: CameraConfig::default(),
            runtime: RuntimeConfig::default(),
            log_level: Self::default_log_level(),
        }
    }
}

impl EngineConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(tag = "config", "Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &EngineConfigOverrides) {
        if let Some(root) = &overrides.assets_root {
            self.assets.root = root.clone();
        }
        if let Some(main) = &overrides.main {
            self.assets.main = Some(main.clone());
        }
        if let Some(ticks) = overrides.ticks {
            self.runtime.max_ticks = Some(ticks);
        }
        if let Some(delta) = overrides.delta {
            self.runtime.fixed_delta = delta;
        }
        if let Some(hitboxes) = overrides.hitboxes {
            self.runtime.render_hitboxes = hitboxes;
        }
    }
}

impl EngineConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.assets_root.is_none()
            && self.main.is_none()
            && self.ticks.is_none()
            && self.delta.is_none()
            && self.hitboxes.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.assets_root.is_some() {
            fields.push("assets");
        }
        if self.main.is_some() {
            fields.push("main");
        }
        if self.ticks.is_some() {
            fields.push("ticks");
        }
        if self.delta.is_some() {
            fields.push("delta");
        }
        if self.hitboxes.is_some() {
            fields.push("hitboxes");
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_config_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "assets": {{ "root": "game" }}, "runtime": {{ "max_ticks": 30 }} }}"#).expect("write");
        let cfg = EngineConfig::load(file.path()).expect("load config");
        assert_eq!(cfg.assets.root, PathBuf::from("game"));
        assert_eq!(cfg.assets.objects_dir(), PathBuf::from("game").join("objects"));
        assert_eq!(cfg.runtime.max_ticks, Some(30));
        assert!((cfg.runtime.fixed_delta - 1.0 / 60.0).abs() < 1e-6);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn missing_file_falls_back() {
        let cfg = EngineConfig::load_or_default("definitely/not/here.json");
        assert_eq!(cfg.assets.root, PathBuf::from("assets"));
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn overrides_replace_fields() {
        let mut cfg = EngineConfig::default();
        let overrides = EngineConfigOverrides { ticks: Some(5), hitboxes: Some(true), ..Default::default() };
        cfg.apply_overrides(&overrides);
        assert_eq!(cfg.runtime.max_ticks, Some(5));
        assert!(cfg.runtime.render_hitboxes);
        assert_eq!(overrides.applied_fields(), vec!["ticks", "hitboxes"]);
    }
}
