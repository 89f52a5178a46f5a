//! Client for saved artifacts and presets.
//!
//! Every call is terminal: transport failures are logged, reported with an
//! error toast and turned into a safe default; a missing artifact sends the
//! UI back to the file list; user input is validated before the backend is
//! called.

use std::sync::Arc;

use super::bridge::{Backend, BridgeError};
use super::events::UserEvent;
use super::proxy::EventProxy;
use crate::config::AppConfig;
use crate::core::{FileDetail, FileMetadata, FileSummary, PresetMap, TreeNode};
use crate::utils::format::format_file_size;
use crate::utils::validation::{validate_artifact_name, validate_preset_name, ValidationError};

pub struct ArtifactClient<B: Backend, P: EventProxy> {
    backend: Arc<B>,
    proxy: P,
    max_editor_bytes: u64,
}

impl<B: Backend, P: EventProxy> ArtifactClient<B, P> {
    pub fn new(backend: Arc<B>, proxy: P, config: &AppConfig) -> Self {
        Self {
            backend,
            proxy,
            max_editor_bytes: config.max_editor_content_bytes(),
        }
    }

    fn report(&self, action: &str, err: BridgeError) {
        match err {
            BridgeError::NotFound(what) => {
                tracing::warn!("{} failed, artifact not found: {}", action, what);
                self.proxy.send_event(UserEvent::error("File not found"));
                self.proxy.send_event(UserEvent::NavigateToFileList);
            }
            other => {
                tracing::error!("{} failed: {}", action, other);
                self.proxy
                    .send_event(UserEvent::error(format!("{action} failed: {other}")));
            }
        }
    }

    /// Saved artifacts, newest first.
    pub async fn list(&self, limit: Option<usize>) -> Vec<FileSummary> {
        match self.backend.get_files(limit).await {
            Ok(files) => files,
            Err(e) => {
                self.report("Loading files", e);
                Vec::new()
            }
        }
    }

    pub async fn detail(&self, id: &str) -> Option<FileDetail> {
        match self.backend.get_file_detail(id).await {
            Ok(detail) => Some(detail),
            Err(e) => {
                self.report("Loading file", e);
                None
            }
        }
    }

    pub async fn metadata(&self, id: &str) -> Option<FileMetadata> {
        match self.backend.get_file_metadata(id).await {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                self.report("Loading metadata", e);
                None
            }
        }
    }

    pub async fn tree(&self, id: &str) -> Vec<TreeNode> {
        match self.backend.get_file_tree(id).await {
            Ok(tree) => tree,
            Err(e) => {
                self.report("Loading file tree", e);
                Vec::new()
            }
        }
    }

    /// Loads content for editing. Artifacts above the editor limit are
    /// refused before their content is fetched.
    pub async fn open_content(&self, id: &str) -> Option<String> {
        let metadata = self.metadata(id).await?;
        if metadata.content_size > self.max_editor_bytes {
            tracing::info!(
                "Refusing to open {} in editor: {} bytes exceeds limit",
                id,
                metadata.content_size
            );
            self.proxy.send_event(UserEvent::error(format!(
                "File is too large to edit ({}, limit {})",
                format_file_size(metadata.content_size),
                format_file_size(self.max_editor_bytes)
            )));
            return None;
        }

        match self.backend.get_file_content(id).await {
            Ok(content) => Some(content),
            Err(e) => {
                self.report("Loading content", e);
                None
            }
        }
    }

    pub async fn save_content(&self, id: &str, content: &str) -> bool {
        match self.backend.update_file(id, content).await {
            Ok(()) => {
                self.proxy.send_event(UserEvent::success("File saved"));
                true
            }
            Err(e) => {
                self.report("Saving file", e);
                false
            }
        }
    }

    /// Renames an artifact. Invalid names are returned without calling the
    /// backend; otherwise the outcome is reported through toasts.
    pub async fn rename(&self, id: &str, new_name: &str) -> Result<bool, ValidationError> {
        let new_name = new_name.trim();
        validate_artifact_name(new_name)?;
        match self.backend.rename_file(id, new_name).await {
            Ok(()) => {
                self.proxy
                    .send_event(UserEvent::success(format!("Renamed to {new_name}")));
                self.proxy.send_event(UserEvent::FilesChanged);
                Ok(true)
            }
            Err(e) => {
                self.report("Renaming file", e);
                Ok(false)
            }
        }
    }

    pub async fn delete(&self, id: &str) -> bool {
        match self.backend.delete_file(id).await {
            Ok(()) => {
                self.proxy.send_event(UserEvent::success("File deleted"));
                self.proxy.send_event(UserEvent::FilesChanged);
                true
            }
            Err(e) => {
                self.report("Deleting file", e);
                false
            }
        }
    }

    /// Presets decoded from the backend's JSON; empty on any failure.
    pub async fn presets(&self) -> PresetMap {
        let json = match self.backend.get_presets().await {
            Ok(json) => json,
            Err(e) => {
                self.report("Loading presets", e);
                return PresetMap::new();
            }
        };
        serde_json::from_str(&json).unwrap_or_else(|e| {
            tracing::error!("Backend returned malformed presets: {}", e);
            PresetMap::new()
        })
    }

    /// Saves a preset from a comma-separated pattern list.
    pub async fn save_preset(&self, name: &str, patterns: &str) -> Result<bool, ValidationError> {
        validate_preset_name(name)?;
        let patterns = parse_pattern_list(patterns);
        match self.backend.update_preset(name.trim(), &patterns).await {
            Ok(()) => {
                self.proxy
                    .send_event(UserEvent::success(format!("Preset {} saved", name.trim())));
                Ok(true)
            }
            Err(e) => {
                self.report("Saving preset", e);
                Ok(false)
            }
        }
    }

    pub async fn delete_preset(&self, name: &str) -> bool {
        match self.backend.delete_preset(name).await {
            Ok(()) => {
                self.proxy
                    .send_event(UserEvent::success(format!("Preset {name} deleted")));
                true
            }
            Err(e) => {
                self.report("Deleting preset", e);
                false
            }
        }
    }
}

/// Splits `"a, b ,,c"` into `["a", "b", "c"]`.
pub fn parse_pattern_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pattern_list_trims_and_drops_blanks() {
        assert_eq!(
            parse_pattern_list(" node_modules, *.log ,, dist"),
            vec!["node_modules", "*.log", "dist"]
        );
        assert!(parse_pattern_list(" , ").is_empty());
    }
}
