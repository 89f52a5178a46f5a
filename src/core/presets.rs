use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{CoreError, CoreResult};

pub const PRESETS_FILENAME: &str = "presets.json";
pub const DEFAULT_PRESET: &str = "default";

/// Preset name to ignore patterns.
pub type PresetMap = BTreeMap<String, Vec<String>>;

/// JSON-file backed preset store. A missing file is seeded with a
/// `default` preset built from the configured ignore patterns.
#[derive(Debug, Clone)]
pub struct PresetStore {
    path: PathBuf,
    default_patterns: Vec<String>,
}

impl PresetStore {
    pub fn new(data_dir: &Path, default_patterns: impl IntoIterator<Item = String>) -> Self {
        let mut default_patterns: Vec<String> = default_patterns.into_iter().collect();
        default_patterns.sort();
        Self {
            path: data_dir.join(PRESETS_FILENAME),
            default_patterns,
        }
    }

    pub fn load(&self) -> CoreResult<PresetMap> {
        if !self.path.exists() {
            let mut seeded = PresetMap::new();
            seeded.insert(DEFAULT_PRESET.to_string(), self.default_patterns.clone());
            self.save(&seeded)?;
            tracing::info!("Seeded preset store at {:?}", self.path);
            return Ok(seeded);
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| CoreError::io(e, &self.path))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// The preset map as a JSON string, the shape the bridge returns.
    pub fn load_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(&self.load()?)?)
    }

    pub fn get(&self, name: &str) -> CoreResult<Vec<String>> {
        self.load()?
            .remove(name)
            .ok_or_else(|| CoreError::NotFound(format!("preset '{}'", name)))
    }

    /// Creates or replaces a preset. Patterns are trimmed and blanks dropped.
    pub fn update(&self, name: &str, patterns: &[String]) -> CoreResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::InvalidName("preset name is required".to_string()));
        }
        let cleaned: Vec<String> = patterns
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        let mut presets = self.load()?;
        presets.insert(name.to_string(), cleaned);
        self.save(&presets)?;
        tracing::info!("Saved preset '{}'", name);
        Ok(())
    }

    pub fn delete(&self, name: &str) -> CoreResult<()> {
        let mut presets = self.load()?;
        if presets.remove(name).is_none() {
            return Err(CoreError::NotFound(format!("preset '{}'", name)));
        }
        self.save(&presets)?;
        tracing::info!("Deleted preset '{}'", name);
        Ok(())
    }

    fn save(&self, presets: &PresetMap) -> CoreResult<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| CoreError::io(e, dir))?;
        }
        let json = serde_json::to_string_pretty(presets)?;
        fs::write(&self.path, json).map_err(|e| CoreError::io(e, &self.path))
    }
}
