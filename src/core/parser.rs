//! The parse engine: concatenates the text files below a set of paths into
//! a single artifact, reporting progress as it goes.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::artifacts::{ArtifactMetadata, ArtifactStore, PendingArtifact};
use super::error::{CoreError, CoreResult};
use super::traversal::FsTraversal;
use crate::utils::file_detection::is_text_file;

/// Progress event emitted while a parse job runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseProgress {
    pub parse_id: String,
    /// Percentage in `0.0..=100.0`.
    pub parse_progress: f32,
    pub files_amount: usize,
    pub result_file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ParseProgress {
    pub fn started(parse_id: &str, files_amount: usize) -> Self {
        Self {
            parse_id: parse_id.to_string(),
            parse_progress: 0.0,
            files_amount,
            result_file_path: None,
            error: None,
        }
    }

    pub fn failed(parse_id: &str, files_amount: usize, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::started(parse_id, files_amount)
        }
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.parse_progress >= 100.0
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_terminal(&self) -> bool {
        self.is_complete() || self.is_failed()
    }
}

/// Separator line written before each file's content.
pub fn file_header(path: &Path) -> String {
    format!("===== {} =====\n", path.display())
}

pub struct ParseEngine {
    traversal: FsTraversal,
}

impl ParseEngine {
    pub fn new(traversal: FsTraversal) -> Self {
        Self { traversal }
    }

    /// Runs a parse job for `paths` under an already-claimed artifact.
    ///
    /// `on_progress` receives a start event, one event per written file and a
    /// final 100% event carrying the content path. On failure the artifact
    /// directory is removed and a terminal event with `error` is sent.
    pub fn run<F>(
        &self,
        store: &ArtifactStore,
        pending: PendingArtifact,
        paths: &[String],
        on_progress: F,
    ) -> CoreResult<ArtifactMetadata>
    where
        F: Fn(ParseProgress),
    {
        let parse_id = pending.id.clone();
        let roots: Vec<PathBuf> = paths.iter().map(PathBuf::from).collect();

        let candidates = self.traversal.collect_files(&roots);
        let text_files: Vec<PathBuf> = candidates
            .into_par_iter()
            .filter(|path| is_text_file(path))
            .collect();
        let files_amount = text_files.len();
        tracing::info!("Parse {} started: {} text files", parse_id, files_amount);
        on_progress(ParseProgress::started(&parse_id, files_amount));

        let content_path = pending.content_path();
        let written = write_content(&content_path, &text_files, |done| {
            let percent = (done as f32 / files_amount as f32) * 100.0;
            on_progress(ParseProgress {
                parse_progress: percent.min(99.0),
                ..ParseProgress::started(&parse_id, files_amount)
            });
        });

        let result = written.and_then(|(files_count, total_size)| {
            let tree = self.traversal.build_tree(&roots);
            store.commit(pending, files_count, total_size, &tree)
        });

        match result {
            Ok(metadata) => {
                tracing::info!(
                    "Parse {} finished: {} files, {} bytes",
                    parse_id,
                    metadata.files_count,
                    metadata.total_size
                );
                on_progress(ParseProgress {
                    parse_progress: 100.0,
                    result_file_path: Some(content_path.to_string_lossy().to_string()),
                    ..ParseProgress::started(&parse_id, files_amount)
                });
                Ok(metadata)
            }
            Err(e) => {
                tracing::error!("Parse {} failed: {}", parse_id, e);
                store.discard(&parse_id);
                on_progress(ParseProgress::failed(&parse_id, files_amount, e.to_string()));
                Err(e)
            }
        }
    }
}

/// Writes every readable file to `content_path`. Returns the number of files
/// written and their total size in bytes. Files that cannot be read as UTF-8
/// text are skipped with a warning.
fn write_content<P>(
    content_path: &Path,
    files: &[PathBuf],
    mut on_file: P,
) -> CoreResult<(usize, u64)>
where
    P: FnMut(usize),
{
    let file = File::create(content_path).map_err(|e| CoreError::io(e, content_path))?;
    let mut writer = BufWriter::new(file);
    let mut files_count = 0usize;
    let mut total_size = 0u64;

    for (index, path) in files.iter().enumerate() {
        match fs::read_to_string(path) {
            Ok(content) => {
                writer
                    .write_all(file_header(path).as_bytes())
                    .and_then(|_| writer.write_all(content.as_bytes()))
                    .and_then(|_| writer.write_all(b"\n"))
                    .map_err(|e| CoreError::io(e, content_path))?;
                files_count += 1;
                total_size += content.len() as u64;
            }
            Err(e) => tracing::warn!("Skipping unreadable file {:?}: {}", path, e),
        }
        on_file(index + 1);
    }

    writer.flush().map_err(|e| CoreError::io(e, content_path))?;
    Ok((files_count, total_size))
}
