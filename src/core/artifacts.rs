//! Persistence of parse artifacts.
//!
//! Every artifact is a directory below `parsed-files/` holding the
//! aggregated `content.txt`, its `metadata.json` and the `tree.json`
//! snapshot of what was parsed.

use std::fs;
use std::io::{BufReader, Write};
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::error::{CoreError, CoreResult};
use super::tree::{shallow_children, to_shallow, TreeNode};
use crate::utils::validation::validate_artifact_name;

pub const PARSED_FILES_DIR: &str = "parsed-files";
pub const CONTENT_FILENAME: &str = "content.txt";
pub const METADATA_FILENAME: &str = "metadata.json";
pub const TREE_FILENAME: &str = "tree.json";

const ID_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const MAX_REMOTE_PREFIX_CHARS: usize = 80;

/// Persisted description of one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub id: String,
    pub name: String,
    pub path: String,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
    pub files_count: usize,
    pub total_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
}

/// Lightweight list entry; never loads the content itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSummary {
    pub id: String,
    pub name: String,
    pub directory_path: String,
    pub file_size: u64,
    pub files_count: usize,
    pub total_size: u64,
    pub created_at: DateTime<Local>,
    pub last_modified: DateTime<Local>,
}

/// Metadata enriched with the content size and the stored tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    #[serde(flatten)]
    pub metadata: ArtifactMetadata,
    pub content_size: u64,
    pub file_tree: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDetail {
    pub id: String,
    pub name: String,
    pub content: String,
    pub metadata: FileMetadata,
}

/// A claimed artifact directory that has not been committed yet.
#[derive(Debug)]
pub struct PendingArtifact {
    pub id: String,
    pub dir: PathBuf,
    pub remote_url: Option<String>,
    pub created_at: DateTime<Local>,
}

impl PendingArtifact {
    pub fn content_path(&self) -> PathBuf {
        self.dir.join(CONTENT_FILENAME)
    }
}

/// Artifact directory store rooted at `<data_dir>/parsed-files`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: data_dir.join(PARSED_FILES_DIR),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves an id to its directory, rejecting anything that is not a
    /// single plain path component.
    fn artifact_dir(&self, id: &str) -> CoreResult<PathBuf> {
        let mut components = Path::new(id).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !id.contains(['/', '\\']) => {
                Ok(self.root.join(id))
            }
            _ => Err(CoreError::InvalidName(format!("invalid artifact id '{}'", id))),
        }
    }

    fn existing_dir(&self, id: &str) -> CoreResult<PathBuf> {
        let dir = self.artifact_dir(id)?;
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(CoreError::NotFound(id.to_string()))
        }
    }

    /// Claims a fresh artifact directory. The id is a timestamp, prefixed
    /// with the sanitized remote URL when one is given and suffixed `_N`
    /// when the name is already taken.
    pub fn create(&self, remote_url: Option<&str>) -> CoreResult<PendingArtifact> {
        fs::create_dir_all(&self.root).map_err(|e| CoreError::io(e, &self.root))?;

        let created_at = Local::now();
        let timestamp = created_at.format(ID_TIMESTAMP_FORMAT).to_string();
        let remote_url = remote_url.map(str::trim).filter(|u| !u.is_empty());
        let base = match remote_url {
            Some(url) => format!("{}_{}", sanitize_repo_url(url), timestamp),
            None => timestamp,
        };

        let mut attempt = 0usize;
        loop {
            let id = if attempt == 0 {
                base.clone()
            } else {
                format!("{}_{}", base, attempt)
            };
            let dir = self.root.join(&id);
            match fs::create_dir(&dir) {
                Ok(()) => {
                    tracing::info!("Created artifact directory {:?}", dir);
                    return Ok(PendingArtifact {
                        id,
                        dir,
                        remote_url: remote_url.map(str::to_string),
                        created_at,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(CoreError::io(e, dir)),
            }
        }
    }

    /// Writes metadata and tree for a pending artifact whose content file
    /// has already been written.
    pub fn commit(
        &self,
        pending: PendingArtifact,
        files_count: usize,
        total_size: u64,
        tree: &[TreeNode],
    ) -> CoreResult<ArtifactMetadata> {
        let metadata = ArtifactMetadata {
            id: pending.id.clone(),
            name: pending.id.clone(),
            path: pending.dir.to_string_lossy().to_string(),
            created_at: pending.created_at,
            updated_at: Local::now(),
            files_count,
            total_size,
            remote_url: pending.remote_url,
        };
        write_json(&pending.dir.join(TREE_FILENAME), &tree)?;
        write_json(&pending.dir.join(METADATA_FILENAME), &metadata)?;
        Ok(metadata)
    }

    /// Removes a partially written artifact after a failed parse.
    pub fn discard(&self, id: &str) {
        let Ok(dir) = self.artifact_dir(id) else { return };
        if dir.exists() {
            if let Err(e) = fs::remove_dir_all(&dir) {
                tracing::warn!("Failed to clean up artifact {:?}: {}", dir, e);
            }
        }
    }

    /// Lists artifacts newest first, truncated to `limit`. Entries whose
    /// metadata cannot be read are skipped.
    pub fn list(&self, limit: Option<usize>) -> CoreResult<Vec<FileSummary>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut items = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(|e| CoreError::io(e, &self.root))? {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            match summarize(&path) {
                Ok(item) => items.push(item),
                Err(e) => tracing::warn!("Skipping unreadable artifact {:?}: {}", path, e),
            }
        }

        items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        if let Some(limit) = limit {
            items.truncate(limit);
        }
        Ok(items)
    }

    pub fn metadata(&self, id: &str) -> CoreResult<ArtifactMetadata> {
        let dir = self.existing_dir(id)?;
        read_json(&dir.join(METADATA_FILENAME))
    }

    pub fn content_size(&self, id: &str) -> CoreResult<u64> {
        let path = self.existing_dir(id)?.join(CONTENT_FILENAME);
        fs::metadata(&path)
            .map(|m| m.len())
            .map_err(|e| CoreError::io(e, path))
    }

    pub fn file_metadata(&self, id: &str) -> CoreResult<FileMetadata> {
        Ok(FileMetadata {
            metadata: self.metadata(id)?,
            content_size: self.content_size(id)?,
            file_tree: self.tree(id)?,
        })
    }

    pub fn content(&self, id: &str) -> CoreResult<String> {
        let path = self.existing_dir(id)?.join(CONTENT_FILENAME);
        fs::read_to_string(&path).map_err(|e| CoreError::io(e, path))
    }

    pub fn detail(&self, id: &str) -> CoreResult<FileDetail> {
        let metadata = self.file_metadata(id)?;
        Ok(FileDetail {
            id: id.to_string(),
            name: metadata.metadata.name.clone(),
            content: self.content(id)?,
            metadata,
        })
    }

    /// Replaces the content atomically and bumps `updated_at`.
    pub fn update_content(&self, id: &str, content: &str) -> CoreResult<ArtifactMetadata> {
        let dir = self.existing_dir(id)?;
        write_atomic(&dir.join(CONTENT_FILENAME), content.as_bytes())?;

        let metadata_path = dir.join(METADATA_FILENAME);
        let mut metadata: ArtifactMetadata = read_json(&metadata_path)?;
        metadata.updated_at = Local::now();
        write_json(&metadata_path, &metadata)?;
        tracing::info!("Updated content of artifact '{}'", id);
        Ok(metadata)
    }

    /// Renames the artifact directory and rewrites its metadata to match.
    pub fn rename(&self, id: &str, new_name: &str) -> CoreResult<ArtifactMetadata> {
        validate_artifact_name(new_name).map_err(|e| CoreError::InvalidName(e.message))?;
        let old_dir = self.existing_dir(id)?;
        let new_dir = self.artifact_dir(new_name)?;

        if new_name != id {
            if new_dir.exists() {
                return Err(CoreError::AlreadyExists(new_name.to_string()));
            }
            fs::rename(&old_dir, &new_dir).map_err(|e| CoreError::io(e, &old_dir))?;
        }

        let metadata_path = new_dir.join(METADATA_FILENAME);
        let mut metadata: ArtifactMetadata = read_json(&metadata_path)?;
        metadata.id = new_name.to_string();
        metadata.name = new_name.to_string();
        metadata.path = new_dir.to_string_lossy().to_string();
        write_json(&metadata_path, &metadata)?;
        tracing::info!("Renamed artifact '{}' to '{}'", id, new_name);
        Ok(metadata)
    }

    pub fn delete(&self, id: &str) -> CoreResult<()> {
        let dir = self.existing_dir(id)?;
        fs::remove_dir_all(&dir).map_err(|e| CoreError::io(e, &dir))?;
        tracing::info!("Deleted artifact '{}'", id);
        Ok(())
    }

    /// The full tree stored with the artifact.
    pub fn tree(&self, id: &str) -> CoreResult<Vec<TreeNode>> {
        let dir = self.existing_dir(id)?;
        read_json(&dir.join(TREE_FILENAME))
    }

    /// The stored roots, one level deep.
    pub fn preview_tree(&self, id: &str) -> CoreResult<Vec<TreeNode>> {
        Ok(self.tree(id)?.iter().map(to_shallow).collect())
    }

    /// Children of `path` inside the stored tree, one level deep.
    pub fn expand(&self, id: &str, path: &str) -> CoreResult<Vec<TreeNode>> {
        let tree = self.tree(id)?;
        shallow_children(&tree, path)
            .ok_or_else(|| CoreError::NotFound(format!("{} in artifact {}", path, id)))
    }
}

fn summarize(dir: &Path) -> CoreResult<FileSummary> {
    let metadata: ArtifactMetadata = read_json(&dir.join(METADATA_FILENAME))?;
    let content_path = dir.join(CONTENT_FILENAME);
    let file_size = fs::metadata(&content_path)
        .map_err(|e| CoreError::io(e, &content_path))?
        .len();
    let last_modified = fs::metadata(dir)
        .and_then(|m| m.modified())
        .map(DateTime::<Local>::from)
        .unwrap_or(metadata.updated_at);
    let id = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| metadata.id.clone());

    Ok(FileSummary {
        id,
        name: metadata.name,
        directory_path: dir.to_string_lossy().to_string(),
        file_size,
        files_count: metadata.files_count,
        total_size: metadata.total_size,
        created_at: metadata.created_at,
        last_modified,
    })
}

/// Turns a repository URL into a directory-safe prefix of at most 80 chars.
pub fn sanitize_repo_url(input: &str) -> String {
    input
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_REMOTE_PREFIX_CHARS)
        .collect()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> CoreResult<T> {
    let file = fs::File::open(path).map_err(|e| CoreError::io(e, path))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> CoreResult<()> {
    let json = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &json)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> CoreResult<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| CoreError::io(e, dir))?;
    tmp.write_all(bytes).map_err(|e| CoreError::io(e, tmp.path()))?;
    tmp.persist(path).map_err(|e| CoreError::io(e.error, path))?;
    Ok(())
}
