//! In-process [`Backend`] over the `core` engine.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::bridge::{Backend, BridgeError, BridgeResult};
use crate::config::AppConfig;
use crate::core::{
    ArtifactStore, CoreError, CoreResult, FileDetail, FileMetadata, FileSummary, FsTraversal,
    ParseEngine, ParseProgress, PresetStore, TreeNode,
};

const PROGRESS_CHANNEL_CAPACITY: usize = 256;

pub struct LocalBackend {
    data_dir: PathBuf,
    traversal: FsTraversal,
    store: ArtifactStore,
    presets: PresetStore,
    active_preset: RwLock<Option<String>>,
    recent_files_limit: Option<usize>,
    progress_tx: broadcast::Sender<ParseProgress>,
}

impl LocalBackend {
    /// Creates a backend rooted at the configured data directory.
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let data_dir = config.resolve_data_directory()?;
        Ok(Self::with_data_dir(config, data_dir))
    }

    pub fn with_data_dir(config: &AppConfig, data_dir: PathBuf) -> Self {
        let (progress_tx, _) = broadcast::channel(PROGRESS_CHANNEL_CAPACITY);
        tracing::info!("Using data directory {:?}", data_dir);
        Self {
            traversal: FsTraversal::new(config.ignore_patterns.clone(), config.skip_hidden),
            store: ArtifactStore::new(&data_dir),
            presets: PresetStore::new(&data_dir, config.ignore_patterns.iter().cloned()),
            active_preset: RwLock::new(config.active_preset.clone()),
            recent_files_limit: config.recent_files_limit,
            data_dir,
            progress_tx,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Receiver for progress of every parse started after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ParseProgress> {
        self.progress_tx.subscribe()
    }

    /// Selects the preset whose patterns are added to traversal and parse.
    pub fn set_active_preset(&self, name: Option<String>) {
        let mut guard = self
            .active_preset
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = name;
    }

    pub fn active_preset(&self) -> Option<String> {
        self.active_preset
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Configured patterns plus those of the active preset. An active preset
    /// that no longer exists is logged and ignored.
    fn effective_traversal(&self) -> FsTraversal {
        let Some(name) = self.active_preset() else {
            return self.traversal.clone();
        };
        match self.presets.get(&name) {
            Ok(patterns) => self.traversal.with_extra_patterns(patterns),
            Err(e) => {
                tracing::warn!("Active preset '{}' unavailable: {}", name, e);
                self.traversal.clone()
            }
        }
    }

    /// Runs blocking filesystem work off the async runtime.
    async fn blocking<T, F>(&self, f: F) -> BridgeResult<T>
    where
        F: FnOnce() -> CoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(CoreError::from)?
            .map_err(BridgeError::from)
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn get_preview_tree(&self, paths: &[String]) -> BridgeResult<Vec<TreeNode>> {
        let traversal = self.effective_traversal();
        let roots: Vec<PathBuf> = paths.iter().map(PathBuf::from).collect();
        self.blocking(move || Ok(traversal.build_tree(&roots))).await
    }

    async fn expand_folder(&self, path: &str) -> BridgeResult<Vec<TreeNode>> {
        let traversal = self.effective_traversal();
        let dir = PathBuf::from(path);
        self.blocking(move || traversal.list_children(&dir)).await
    }

    async fn expand_parsed_folder(
        &self,
        dir_name: &str,
        path: &str,
    ) -> BridgeResult<Vec<TreeNode>> {
        let store = self.store.clone();
        let (dir_name, path) = (dir_name.to_string(), path.to_string());
        self.blocking(move || store.expand(&dir_name, &path)).await
    }

    async fn get_file_tree(&self, dir_name: &str) -> BridgeResult<Vec<TreeNode>> {
        let store = self.store.clone();
        let dir_name = dir_name.to_string();
        self.blocking(move || store.tree(&dir_name)).await
    }

    async fn get_parsed_preview_tree(&self, dir_name: &str) -> BridgeResult<Vec<TreeNode>> {
        let store = self.store.clone();
        let dir_name = dir_name.to_string();
        self.blocking(move || store.preview_tree(&dir_name)).await
    }

    async fn parse(&self, paths: &[String], remote_url: Option<&str>) -> BridgeResult<String> {
        let remote_url = remote_url.map(str::trim).filter(|u| !u.is_empty());
        if paths.is_empty() {
            return Err(match remote_url {
                Some(_) => CoreError::Unsupported(
                    "fetching remote repositories is not available; parse a local checkout"
                        .to_string(),
                ),
                None => CoreError::InvalidName("no paths to parse".to_string()),
            }
            .into());
        }

        let store = self.store.clone();
        let label = remote_url.map(str::to_string);
        let pending = self
            .blocking(move || store.create(label.as_deref()))
            .await?;
        let parse_id = pending.id.clone();

        let engine = ParseEngine::new(self.effective_traversal());
        let store = self.store.clone();
        let paths = paths.to_vec();
        let tx = self.progress_tx.clone();
        tokio::task::spawn_blocking(move || {
            let result = engine.run(&store, pending, &paths, |progress| {
                // No subscribers is fine; progress is advisory.
                let _ = tx.send(progress);
            });
            if let Err(e) = result {
                tracing::debug!("Parse job ended with error: {}", e);
            }
        });

        tracing::info!("Accepted parse job {}", parse_id);
        Ok(parse_id)
    }

    async fn get_files(&self, limit: Option<usize>) -> BridgeResult<Vec<FileSummary>> {
        let store = self.store.clone();
        let limit = limit.or(self.recent_files_limit);
        self.blocking(move || store.list(limit)).await
    }

    async fn get_file_detail(&self, dir_name: &str) -> BridgeResult<FileDetail> {
        let store = self.store.clone();
        let dir_name = dir_name.to_string();
        self.blocking(move || store.detail(&dir_name)).await
    }

    async fn get_file_metadata(&self, dir_name: &str) -> BridgeResult<FileMetadata> {
        let store = self.store.clone();
        let dir_name = dir_name.to_string();
        self.blocking(move || store.file_metadata(&dir_name)).await
    }

    async fn get_file_content(&self, dir_name: &str) -> BridgeResult<String> {
        let store = self.store.clone();
        let dir_name = dir_name.to_string();
        self.blocking(move || store.content(&dir_name)).await
    }

    async fn update_file(&self, dir_name: &str, content: &str) -> BridgeResult<()> {
        let store = self.store.clone();
        let (dir_name, content) = (dir_name.to_string(), content.to_string());
        self.blocking(move || store.update_content(&dir_name, &content).map(|_| ()))
            .await
    }

    async fn delete_file(&self, dir_name: &str) -> BridgeResult<()> {
        let store = self.store.clone();
        let dir_name = dir_name.to_string();
        self.blocking(move || store.delete(&dir_name)).await
    }

    async fn rename_file(&self, dir_name: &str, new_name: &str) -> BridgeResult<()> {
        let store = self.store.clone();
        let (dir_name, new_name) = (dir_name.to_string(), new_name.to_string());
        self.blocking(move || store.rename(&dir_name, &new_name).map(|_| ()))
            .await
    }

    async fn get_presets(&self) -> BridgeResult<String> {
        let presets = self.presets.clone();
        self.blocking(move || presets.load_json()).await
    }

    async fn update_preset(&self, name: &str, ignore_patterns: &[String]) -> BridgeResult<()> {
        let presets = self.presets.clone();
        let (name, patterns) = (name.to_string(), ignore_patterns.to_vec());
        self.blocking(move || presets.update(&name, &patterns)).await
    }

    async fn delete_preset(&self, name: &str) -> BridgeResult<()> {
        let presets = self.presets.clone();
        let name = name.to_string();
        self.blocking(move || presets.delete(&name)).await
    }

    fn subscribe_progress(&self) -> broadcast::Receiver<ParseProgress> {
        self.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_helpers::create_fixture;
    use tempfile::TempDir;

    fn backend(patterns: &[&str]) -> (TempDir, LocalBackend) {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            ignore_patterns: patterns.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        let backend = LocalBackend::with_data_dir(&config, dir.path().join("data"));
        (dir, backend)
    }

    async fn wait_for_terminal(rx: &mut broadcast::Receiver<ParseProgress>) -> ParseProgress {
        loop {
            let progress = rx.recv().await.unwrap();
            if progress.is_terminal() {
                return progress;
            }
        }
    }

    #[tokio::test]
    async fn test_parse_runs_in_background_and_reports_completion() {
        let (dir, backend) = backend(&[]);
        create_fixture(dir.path(), &["proj/a.txt", "proj/b.txt"]);
        let mut rx = backend.subscribe();

        let root = dir.path().join("proj").to_string_lossy().to_string();
        let parse_id = backend.parse(&[root], None).await.unwrap();

        let done = wait_for_terminal(&mut rx).await;
        assert_eq!(done.parse_id, parse_id);
        assert!(done.is_complete());
        assert_eq!(done.files_amount, 2);

        let files = backend.get_files(None).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, parse_id);
        assert_eq!(files[0].files_count, 2);
    }

    #[tokio::test]
    async fn test_remote_url_labels_local_parse() {
        let (dir, backend) = backend(&[]);
        create_fixture(dir.path(), &["checkout/main.rs"]);
        let mut rx = backend.subscribe();

        let root = dir.path().join("checkout").to_string_lossy().to_string();
        let parse_id = backend
            .parse(&[root], Some("https://github.com/user/repo"))
            .await
            .unwrap();
        assert!(parse_id.starts_with("github_com_user_repo_"));
        wait_for_terminal(&mut rx).await;

        let meta = backend.get_file_metadata(&parse_id).await.unwrap();
        assert_eq!(meta.metadata.remote_url.as_deref(), Some("https://github.com/user/repo"));
    }

    #[tokio::test]
    async fn test_remote_only_parse_is_rejected() {
        let (_dir, backend) = backend(&[]);
        let err = backend
            .parse(&[], Some("https://github.com/user/repo"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Invalid(_)));
        assert!(matches!(backend.parse(&[], None).await, Err(BridgeError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_active_preset_patterns_apply_to_preview() {
        let (dir, backend) = backend(&[]);
        create_fixture(dir.path(), &["proj/keep.rs", "proj/drop.md"]);
        backend
            .update_preset("no-docs", &["*.md".to_string()])
            .await
            .unwrap();
        let root = dir.path().join("proj").to_string_lossy().to_string();

        let before = backend.get_preview_tree(&[root.clone()]).await.unwrap();
        assert_eq!(before[0].children().len(), 2);

        backend.set_active_preset(Some("no-docs".to_string()));
        let after = backend.get_preview_tree(&[root]).await.unwrap();
        assert_eq!(after[0].children().len(), 1);
        assert_eq!(after[0].children()[0].name, "keep.rs");
    }

    #[tokio::test]
    async fn test_unknown_artifact_is_not_found() {
        let (_dir, backend) = backend(&[]);
        assert!(matches!(
            backend.get_file_content("missing").await,
            Err(BridgeError::NotFound(_))
        ));
        assert!(matches!(
            backend.get_file_content("../escape").await,
            Err(BridgeError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_presets_are_seeded_and_json_encoded() {
        let (_dir, backend) = backend(&["target"]);
        let json = backend.get_presets().await.unwrap();
        let map: crate::core::PresetMap = serde_json::from_str(&json).unwrap();
        assert_eq!(map["default"], vec!["target"]);
    }
}
