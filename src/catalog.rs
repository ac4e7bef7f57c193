use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::AssetsConfig;
use crate::error::EngineError;

#[derive(Debug, Clone)]
enum ScriptOrigin {
    File(PathBuf),
    Inline(Arc<str>),
}

/// A discoverable script: its dotted catalog name, the stem used as the entity's display name,
/// and where its code lives.
#[derive(Debug, Clone)]
pub struct ScriptSource {
    name: String,
    stem: String,
    origin: ScriptOrigin,
}

impl ScriptSource {
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let name = name.into();
        let stem = stem_of(&name);
        Self { name, stem, origin: ScriptOrigin::File(path.into()) }
    }

    pub fn inline(name: impl Into<String>, code: &str) -> Self {
        let name = name.into();
        let stem = stem_of(&name);
        Self { name, stem, origin: ScriptOrigin::Inline(Arc::from(code)) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn chunk_name(&self) -> String {
        match &self.origin {
            ScriptOrigin::File(path) => format!("@{}", path.display()),
            ScriptOrigin::Inline(_) => format!("={}", self.name),
        }
    }

    pub fn read(&self) -> Result<String, EngineError> {
        match &self.origin {
            ScriptOrigin::File(path) => fs::read_to_string(path).map_err(|err| EngineError::Io {
                context: format!("failed to read script {}", path.display()),
                message: err.to_string(),
            }),
            ScriptOrigin::Inline(code) => Ok(code.to_string()),
        }
    }
}

fn stem_of(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntrypointData {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub orientation: Option<f32>,
}

/// Static room metadata stored next to the room script as `<name>.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomData {
    #[serde(default)]
    pub tilemap: Option<String>,
    #[serde(default)]
    pub spritesheets: Vec<String>,
    #[serde(default)]
    pub entrypoints: BTreeMap<String, EntrypointData>,
}

impl RoomData {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse room metadata")
    }
}

/// Name to script lookup for one kind of implementable.
#[derive(Debug)]
pub struct ScriptCatalog {
    kind: &'static str,
    entries: BTreeMap<String, ScriptSource>,
}

impl ScriptCatalog {
    pub fn new(kind: &'static str) -> Self {
        Self { kind, entries: BTreeMap::new() }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Registers every `.lua` file under `dir`. Nested directories become dotted prefixes, so
    /// `npcs/guard.lua` is reachable as `npcs.guard`. A missing directory is created empty.
    pub fn scan(&mut self, dir: &Path) -> Result<usize> {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create script directory {}", dir.display()))?;
            tracing::debug!(tag = "catalog", kind = self.kind, dir = %dir.display(), "created missing script directory");
            return Ok(0);
        }
        let mut found = Vec::new();
        collect_scripts(dir, dir, &mut found)?;
        let count = found.len();
        for (name, path) in found {
            if let Some(previous) = self.entries.insert(name.clone(), ScriptSource::file(name.clone(), path)) {
                tracing::warn!(tag = "catalog", kind = self.kind, name = %previous.name(), "script registered twice");
            }
        }
        tracing::info!(tag = "catalog", kind = self.kind, count, dir = %dir.display(), "scanned scripts");
        Ok(count)
    }

    pub fn register_source(&mut self, name: impl Into<String>, code: &str) {
        let name = name.into();
        self.entries.insert(name.clone(), ScriptSource::inline(name, code));
    }

    pub fn get(&self, name: &str) -> Result<&ScriptSource, EngineError> {
        self.entries.get(name).ok_or_else(|| EngineError::MissingScript { kind: self.kind, name: name.to_string() })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn collect_scripts(root: &Path, dir: &Path, out: &mut Vec<(String, PathBuf)>) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read script directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .collect();
    entries.sort();
    for path in entries {
        if path.is_dir() {
            collect_scripts(root, &path, out)?;
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("lua") {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(&path).with_extension("");
        let name = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join(".");
        out.push((name, path));
    }
    Ok(())
}

/// Room scripts plus their optional metadata.
#[derive(Debug)]
pub struct RoomCatalog {
    scripts: ScriptCatalog,
    data: BTreeMap<String, RoomData>,
}

impl RoomCatalog {
    pub fn new() -> Self {
        Self { scripts: ScriptCatalog::new("room"), data: BTreeMap::new() }
    }

    pub fn scan(&mut self, dir: &Path) -> Result<usize> {
        let count = self.scripts.scan(dir)?;
        let names: Vec<String> = self.scripts.names().map(str::to_string).collect();
        for name in names {
            let path = dir.join(name.replace('.', "/")).with_extension("json");
            if !path.is_file() {
                continue;
            }
            let loaded = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read room metadata {}", path.display()))
                .and_then(|text| RoomData::from_json(&text));
            match loaded {
                Ok(data) => {
                    self.data.insert(name, data);
                }
                Err(err) => {
                    tracing::warn!(tag = "catalog", room = %name, "{err:?}. Using empty room metadata.");
                }
            }
        }
        Ok(count)
    }

    pub fn register_source(&mut self, name: impl Into<String>, code: &str, data: Option<RoomData>) {
        let name = name.into();
        self.scripts.register_source(name.clone(), code);
        match data {
            Some(data) => {
                self.data.insert(name, data);
            }
            None => {
                self.data.remove(&name);
            }
        }
    }

    pub fn scripts(&self) -> &ScriptCatalog {
        &self.scripts
    }

    pub fn data(&self, name: &str) -> RoomData {
        self.data.get(name).cloned().unwrap_or_default()
    }
}

impl Default for RoomCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct Catalogs {
    pub objects: ScriptCatalog,
    pub rooms: RoomCatalog,
    pub ui: ScriptCatalog,
}

impl Catalogs {
    pub fn new() -> Self {
        Self { objects: ScriptCatalog::new("world object"), rooms: RoomCatalog::new(), ui: ScriptCatalog::new("ui component") }
    }

    pub fn scan(&mut self, assets: &AssetsConfig) -> Result<()> {
        self.objects.scan(&assets.objects_dir())?;
        self.rooms.scan(&assets.rooms_dir())?;
        self.ui.scan(&assets.ui_dir())?;
        Ok(())
    }
}

impl Default for Catalogs {
    fn default() -> Self {
        Self::new()
    }
}
