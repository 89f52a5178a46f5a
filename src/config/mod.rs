pub mod settings;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Directory below the user's home that holds artifacts and presets.
pub const APP_DIR_NAME: &str = "parser-ai";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Patterns applied to every traversal and parse, on top of the active preset.
    pub ignore_patterns: HashSet<String>,
    /// Where artifacts and presets live; `None` means `~/parser-ai`.
    pub data_directory: Option<PathBuf>,
    /// Preset whose patterns are added during parse.
    pub active_preset: Option<String>,
    /// Artifacts larger than this are not loaded into the editor.
    pub max_editor_content_mb: u64,
    /// Non-terminal progress updates smaller than this are dropped.
    pub progress_min_step: f32,
    /// Maximum number of parse jobs tracked at once.
    pub parse_queue_capacity: usize,
    /// Default number of artifacts listed; `None` lists all.
    pub recent_files_limit: Option<usize>,
    /// Skip dot-files and dot-directories during traversal.
    pub skip_hidden: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        settings::load_config(None)
    }

    /// Resolves the data directory, falling back to `~/parser-ai`.
    pub fn resolve_data_directory(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_directory {
            return Ok(dir.clone());
        }
        dirs::home_dir()
            .map(|home| home.join(APP_DIR_NAME))
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))
    }

    pub fn max_editor_content_bytes(&self) -> u64 {
        self.max_editor_content_mb * 1024 * 1024
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let ignore_patterns = [
            "node_modules",
            "target",
            "dist",
            "build",
            ".git",
            ".idea",
            ".vscode",
            "__pycache__",
            "venv",
            "*.log",
            "*.tmp",
            "*.lock",
            "package-lock.json",
            ".DS_Store",
            "Thumbs.db",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        Self {
            ignore_patterns,
            data_directory: None,
            active_preset: None,
            max_editor_content_mb: 30,
            progress_min_step: 0.5,
            parse_queue_capacity: 64,
            recent_files_limit: None,
            skip_hidden: true,
        }
    }
}
