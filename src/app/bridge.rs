//! The call contract between the application layer and the traversal and
//! persistence backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::core::{CoreError, FileDetail, FileMetadata, FileSummary, ParseProgress, TreeNode};

/// A failed backend call, in a shape that survives serialization across a
/// process boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message")]
pub enum BridgeError {
    /// The call itself failed: backend unreachable, I/O error, panic.
    #[error("Backend call failed: {0}")]
    Transport(String),
    /// The requested artifact, preset or path does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The backend rejected the arguments.
    #[error("Invalid request: {0}")]
    Invalid(String),
}

impl From<CoreError> for BridgeError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(what) => BridgeError::NotFound(what),
            CoreError::InvalidName(msg)
            | CoreError::AlreadyExists(msg)
            | CoreError::Unsupported(msg) => BridgeError::Invalid(msg),
            other => BridgeError::Transport(other.to_string()),
        }
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Remote-procedure interface of the traversal and persistence backend.
///
/// Artifacts are addressed by their directory name (`dir_name`).
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Full subtree for each existing root path.
    async fn get_preview_tree(&self, paths: &[String]) -> BridgeResult<Vec<TreeNode>>;

    /// Immediate children of a directory; nested directories are unexpanded.
    async fn expand_folder(&self, path: &str) -> BridgeResult<Vec<TreeNode>>;

    /// Immediate children of `path` inside an artifact's stored tree.
    async fn expand_parsed_folder(&self, dir_name: &str, path: &str)
        -> BridgeResult<Vec<TreeNode>>;

    /// The complete stored tree of an artifact.
    async fn get_file_tree(&self, dir_name: &str) -> BridgeResult<Vec<TreeNode>>;

    /// The stored roots of an artifact, one level deep.
    async fn get_parsed_preview_tree(&self, dir_name: &str) -> BridgeResult<Vec<TreeNode>>;

    /// Starts a parse job and returns its id once accepted. Completion is
    /// reported on [`Backend::subscribe_progress`].
    async fn parse(&self, paths: &[String], remote_url: Option<&str>) -> BridgeResult<String>;

    async fn get_files(&self, limit: Option<usize>) -> BridgeResult<Vec<FileSummary>>;

    async fn get_file_detail(&self, dir_name: &str) -> BridgeResult<FileDetail>;

    async fn get_file_metadata(&self, dir_name: &str) -> BridgeResult<FileMetadata>;

    async fn get_file_content(&self, dir_name: &str) -> BridgeResult<String>;

    async fn update_file(&self, dir_name: &str, content: &str) -> BridgeResult<()>;

    async fn delete_file(&self, dir_name: &str) -> BridgeResult<()>;

    async fn rename_file(&self, dir_name: &str, new_name: &str) -> BridgeResult<()>;

    /// Preset name to ignore patterns, JSON-encoded.
    async fn get_presets(&self) -> BridgeResult<String>;

    async fn update_preset(&self, name: &str, ignore_patterns: &[String]) -> BridgeResult<()>;

    async fn delete_preset(&self, name: &str) -> BridgeResult<()>;

    /// Subscribes to `parse-progress` events.
    fn subscribe_progress(&self) -> broadcast::Receiver<ParseProgress>;
}
