//! Adapts backend tree calls into normalized selection forests and keeps the
//! per-session selection state.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::bridge::{Backend, BridgeResult};
use super::events::UserEvent;
use super::proxy::EventProxy;
use crate::core::ordering::sort_level;
use crate::core::tree::{find_node, find_node_mut};
use crate::core::{
    annotate_aggregates, build_tree, collect_selected_paths, set_selected_all,
    set_selected_recursive, sort_tree_recursive, Aggregates, RelativePath, TreeNode,
};
use crate::utils::validation::validate_repo_url;

/// Wraps a [`Backend`] and turns its raw node lists into display-ready forests.
///
/// Failures are logged and produce empty results so the caller can always
/// render something.
pub struct PreviewTreeAdapter<B: Backend> {
    backend: Arc<B>,
    pending_expands: Mutex<HashSet<String>>,
}

impl<B: Backend> PreviewTreeAdapter<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            pending_expands: Mutex::new(HashSet::new()),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Fetches the full preview forest for `paths`, default-selected, sorted
    /// and annotated with aggregates.
    pub async fn fetch_preview_tree(&self, paths: &[String]) -> Vec<TreeNode> {
        if paths.is_empty() {
            return Vec::new();
        }
        match self.backend.get_preview_tree(paths).await {
            Ok(forest) => normalize_forest(forest),
            Err(e) => {
                tracing::error!("Failed to fetch preview tree for {:?}: {}", paths, e);
                Vec::new()
            }
        }
    }

    /// Fetches the children of a lazily loaded directory.
    pub async fn expand_node(&self, path: &str) -> Vec<TreeNode> {
        self.fetch_children(path).await.unwrap_or_default()
    }

    /// Like [`Self::expand_node`], but returns `None` while another expand
    /// of the same path is still in flight and keeps a failed fetch apart
    /// from an empty directory.
    pub async fn try_expand(&self, path: &str) -> Option<BridgeResult<Vec<TreeNode>>> {
        let _pending = PendingExpand::acquire(&self.pending_expands, path.to_string())?;
        Some(self.fetch_children(path).await)
    }

    async fn fetch_children(&self, path: &str) -> BridgeResult<Vec<TreeNode>> {
        self.backend
            .expand_folder(path)
            .await
            .map(normalize_children)
            .inspect_err(|e| tracing::error!("Failed to expand folder {}: {}", path, e))
    }

    /// Children of `path` inside a saved artifact's stored tree.
    pub async fn expand_parsed_node(&self, dir_name: &str, path: &str) -> Vec<TreeNode> {
        self.fetch_parsed_children(dir_name, path)
            .await
            .unwrap_or_default()
    }

    pub async fn try_expand_parsed(
        &self,
        dir_name: &str,
        path: &str,
    ) -> Option<BridgeResult<Vec<TreeNode>>> {
        let key = format!("{dir_name}\u{0}{path}");
        let _pending = PendingExpand::acquire(&self.pending_expands, key)?;
        Some(self.fetch_parsed_children(dir_name, path).await)
    }

    async fn fetch_parsed_children(
        &self,
        dir_name: &str,
        path: &str,
    ) -> BridgeResult<Vec<TreeNode>> {
        self.backend
            .expand_parsed_folder(dir_name, path)
            .await
            .map(normalize_children)
            .inspect_err(|e| tracing::error!("Failed to expand {} in {}: {}", path, dir_name, e))
    }

    /// Stored roots of a saved artifact, normalized like a fresh preview.
    pub async fn fetch_saved_tree(&self, dir_name: &str) -> Vec<TreeNode> {
        match self.backend.get_parsed_preview_tree(dir_name).await {
            Ok(forest) => normalize_forest(forest),
            Err(e) => {
                tracing::error!("Failed to load stored tree of {}: {}", dir_name, e);
                Vec::new()
            }
        }
    }
}

/// Marks a key as having an expand in flight until dropped.
struct PendingExpand<'a> {
    set: &'a Mutex<HashSet<String>>,
    key: String,
}

impl<'a> PendingExpand<'a> {
    fn acquire(set: &'a Mutex<HashSet<String>>, key: String) -> Option<Self> {
        let mut guard = set.lock().unwrap_or_else(PoisonError::into_inner);
        if !guard.insert(key.clone()) {
            tracing::debug!("Expand of {} already pending", key);
            return None;
        }
        Some(Self { set, key })
    }
}

impl Drop for PendingExpand<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

fn reset_expanded(nodes: &mut [TreeNode]) {
    for node in nodes.iter_mut() {
        node.is_expanded = false;
        if let Some(children) = node.children.as_mut() {
            reset_expanded(children);
        }
    }
}

fn normalize_forest(mut forest: Vec<TreeNode>) -> Vec<TreeNode> {
    set_selected_all(&mut forest, true);
    reset_expanded(&mut forest);
    let mut forest = sort_tree_recursive(forest);
    annotate_aggregates(&mut forest);
    forest
}

fn normalize_children(mut children: Vec<TreeNode>) -> Vec<TreeNode> {
    set_selected_all(&mut children, true);
    reset_expanded(&mut children);
    sort_tree_recursive(children)
}

/// Interactions a tree view performs on its selection forest.
#[async_trait]
pub trait TreeActions {
    /// Opens or closes a directory, loading its children on first open.
    /// Returns `false` when nothing changed.
    async fn expand(&mut self, path: &str) -> bool;

    /// Flips a node's checkbox and cascades the new value to its subtree.
    fn toggle_selection(&mut self, path: &str) -> bool;

    /// Concrete paths to hand to a parse.
    fn collect_selected(&self) -> Vec<String>;
}

/// Where a session's forest came from, which decides how it expands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeSource {
    /// Local paths, expanded through the filesystem.
    Local,
    /// The stored tree of a saved artifact.
    Saved(String),
}

/// Result of a successful [`SelectionSession::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub parse_id: String,
    pub path_count: usize,
}

/// One user's selection forest, from pick to parse.
pub struct SelectionSession<B: Backend> {
    adapter: Arc<PreviewTreeAdapter<B>>,
    source: TreeSource,
    forest: Vec<TreeNode>,
}

impl<B: Backend> SelectionSession<B> {
    pub fn from_forest(adapter: Arc<PreviewTreeAdapter<B>>, forest: Vec<TreeNode>) -> Self {
        Self {
            adapter,
            source: TreeSource::Local,
            forest,
        }
    }

    /// Previews local paths through the backend.
    pub async fn open_paths(adapter: Arc<PreviewTreeAdapter<B>>, paths: &[String]) -> Self {
        let forest = adapter.fetch_preview_tree(paths).await;
        Self::from_forest(adapter, forest)
    }

    /// Builds the forest locally from a directory picker's file list.
    pub fn from_picked<R: RelativePath>(adapter: Arc<PreviewTreeAdapter<B>>, files: &[R]) -> Self {
        Self::from_forest(adapter, normalize_forest(build_tree(files)))
    }

    /// Opens the stored tree of a saved artifact.
    pub async fn open_saved(adapter: Arc<PreviewTreeAdapter<B>>, dir_name: &str) -> Self {
        let forest = adapter.fetch_saved_tree(dir_name).await;
        Self {
            adapter,
            source: TreeSource::Saved(dir_name.to_string()),
            forest,
        }
    }

    pub fn forest(&self) -> &[TreeNode] {
        &self.forest
    }

    pub fn source(&self) -> &TreeSource {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        self.forest.is_empty()
    }

    /// Totals over the current forest.
    pub fn aggregates(&mut self) -> Aggregates {
        annotate_aggregates(&mut self.forest)
    }

    /// Hands the selected paths to the backend parse. Outcomes are reported
    /// as toasts; `None` means nothing was submitted.
    pub async fn submit<P: EventProxy>(
        &self,
        remote_url: Option<&str>,
        proxy: &P,
    ) -> Option<Submission> {
        let remote_url = match remote_url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => match validate_repo_url(url) {
                Ok(url) => Some(url),
                Err(e) => {
                    proxy.send_event(UserEvent::error(e.message));
                    return None;
                }
            },
            None => None,
        };

        let paths = self.collect_selected();
        if paths.is_empty() {
            proxy.send_event(UserEvent::error("Select at least one file to parse"));
            return None;
        }

        match self
            .adapter
            .backend()
            .parse(&paths, remote_url.as_deref())
            .await
        {
            Ok(parse_id) => {
                proxy.send_event(UserEvent::info(format!(
                    "Parsing {} selected paths",
                    paths.len()
                )));
                Some(Submission {
                    parse_id,
                    path_count: paths.len(),
                })
            }
            Err(e) => {
                tracing::error!("Failed to start parse: {}", e);
                proxy.send_event(UserEvent::error(format!("Failed to start parse: {e}")));
                None
            }
        }
    }
}

#[async_trait]
impl<B: Backend> TreeActions for SelectionSession<B> {
    async fn expand(&mut self, path: &str) -> bool {
        let parent_selected = match find_node_mut(&mut self.forest, path) {
            Some(node) if node.is_directory() => {
                if node.children.is_some() {
                    node.is_expanded = !node.is_expanded;
                    return true;
                }
                node.selected
            }
            _ => return false,
        };

        let fetched = match &self.source {
            TreeSource::Local => self.adapter.try_expand(path).await,
            TreeSource::Saved(dir_name) => self.adapter.try_expand_parsed(dir_name, path).await,
        };
        // A pending or failed fetch leaves the node collapsed so it can be retried.
        let Some(Ok(mut children)) = fetched else {
            return false;
        };

        for child in children.iter_mut() {
            set_selected_recursive(child, parent_selected);
        }
        sort_level(&mut children);

        let Some(node) = find_node_mut(&mut self.forest, path) else {
            return false;
        };
        node.children = Some(children);
        node.is_expanded = true;
        annotate_aggregates(&mut self.forest);
        true
    }

    fn toggle_selection(&mut self, path: &str) -> bool {
        match find_node_mut(&mut self.forest, path) {
            Some(node) => {
                let value = !node.selected;
                set_selected_recursive(node, value);
                true
            }
            None => false,
        }
    }

    fn collect_selected(&self) -> Vec<String> {
        collect_selected_paths(&self.forest)
    }
}

impl<B: Backend> SelectionSession<B> {
    pub fn is_selected(&self, path: &str) -> Option<bool> {
        find_node(&self.forest, path).map(|n| n.selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::bridge::BridgeError;
    use crate::core::{FileDetail, FileMetadata, FileSummary, ParseProgress};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::{broadcast, mpsc};
    use tracing_test::traced_test;

    /// Scripted backend serving a fixed tree.
    #[derive(Default)]
    struct MockBackend {
        fail: bool,
        expand_delay: Option<Duration>,
        expand_calls: AtomicUsize,
        parsed: Mutex<Vec<Vec<String>>>,
    }

    fn raw_forest() -> Vec<TreeNode> {
        vec![TreeNode::directory(
            "proj",
            "/proj",
            vec![
                TreeNode::file("b.txt", "/proj/b.txt", Some(20)),
                TreeNode::unexpanded_directory("lib", "/proj/lib"),
                TreeNode::file("A.txt", "/proj/A.txt", Some(10)),
            ],
        )]
    }

    fn unavailable<T>() -> BridgeResult<T> {
        Err(BridgeError::Transport("mock".into()))
    }

    #[async_trait]
    impl Backend for MockBackend {
        async fn get_preview_tree(&self, _paths: &[String]) -> BridgeResult<Vec<TreeNode>> {
            if self.fail {
                return Err(BridgeError::Transport("backend unreachable".into()));
            }
            Ok(raw_forest())
        }

        async fn expand_folder(&self, path: &str) -> BridgeResult<Vec<TreeNode>> {
            self.expand_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.expand_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(BridgeError::Transport("backend unreachable".into()));
            }
            Ok(vec![
                TreeNode::file("z.rs", format!("{path}/z.rs"), Some(5)),
                TreeNode::unexpanded_directory("inner", format!("{path}/inner")),
            ])
        }

        async fn expand_parsed_folder(&self, _d: &str, path: &str) -> BridgeResult<Vec<TreeNode>> {
            self.expand_folder(path).await
        }

        async fn get_file_tree(&self, _d: &str) -> BridgeResult<Vec<TreeNode>> {
            Ok(raw_forest())
        }

        async fn get_parsed_preview_tree(&self, _d: &str) -> BridgeResult<Vec<TreeNode>> {
            Ok(raw_forest())
        }

        async fn parse(&self, paths: &[String], _remote: Option<&str>) -> BridgeResult<String> {
            self.parsed.lock().unwrap().push(paths.to_vec());
            Ok("job-1".into())
        }

        async fn get_files(&self, _limit: Option<usize>) -> BridgeResult<Vec<FileSummary>> {
            unavailable()
        }

        async fn get_file_detail(&self, _d: &str) -> BridgeResult<FileDetail> {
            unavailable()
        }

        async fn get_file_metadata(&self, _d: &str) -> BridgeResult<FileMetadata> {
            unavailable()
        }

        async fn get_file_content(&self, _d: &str) -> BridgeResult<String> {
            unavailable()
        }

        async fn update_file(&self, _d: &str, _c: &str) -> BridgeResult<()> {
            unavailable()
        }

        async fn delete_file(&self, _d: &str) -> BridgeResult<()> {
            unavailable()
        }

        async fn rename_file(&self, _d: &str, _n: &str) -> BridgeResult<()> {
            unavailable()
        }

        async fn get_presets(&self) -> BridgeResult<String> {
            unavailable()
        }

        async fn update_preset(&self, _n: &str, _p: &[String]) -> BridgeResult<()> {
            unavailable()
        }

        async fn delete_preset(&self, _n: &str) -> BridgeResult<()> {
            unavailable()
        }

        fn subscribe_progress(&self) -> broadcast::Receiver<ParseProgress> {
            broadcast::channel(1).1
        }
    }

    fn adapter(backend: MockBackend) -> Arc<PreviewTreeAdapter<MockBackend>> {
        Arc::new(PreviewTreeAdapter::new(Arc::new(backend)))
    }

    #[tokio::test]
    async fn test_fetch_normalizes_selection_order_and_aggregates() {
        let adapter = adapter(MockBackend::default());
        let forest = adapter.fetch_preview_tree(&["/proj".to_string()]).await;

        let names: Vec<&str> = forest[0].children().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["lib", "A.txt", "b.txt"]);
        assert!(forest[0].selected);
        assert!(forest[0].children().iter().all(|c| c.selected && !c.is_expanded));
        assert_eq!(forest[0].total_size, Some(30));
        assert_eq!(forest[0].files_count, Some(2));
    }

    #[tokio::test]
    async fn test_empty_input_skips_backend() {
        let adapter = adapter(MockBackend {
            fail: true,
            ..Default::default()
        });
        assert!(adapter.fetch_preview_tree(&[]).await.is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_transport_failure_is_logged_and_empty() {
        let adapter = adapter(MockBackend {
            fail: true,
            ..Default::default()
        });
        assert!(adapter.fetch_preview_tree(&["/proj".to_string()]).await.is_empty());
        assert!(adapter.expand_node("/proj/lib").await.is_empty());
        assert!(logs_contain("Failed to fetch preview tree"));
        assert!(logs_contain("backend unreachable"));
    }

    #[tokio::test]
    async fn test_concurrent_expand_of_same_path_runs_once() {
        let adapter = adapter(MockBackend {
            expand_delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });

        let (first, second) = tokio::join!(
            adapter.try_expand("/proj/lib"),
            adapter.try_expand("/proj/lib")
        );
        assert_eq!(first.is_some() as u8 + second.is_some() as u8, 1);
        assert_eq!(adapter.backend().expand_calls.load(Ordering::SeqCst), 1);

        // The guard is released once the expand finishes.
        assert!(matches!(adapter.try_expand("/proj/lib").await, Some(Ok(_))));
    }

    #[tokio::test]
    async fn test_failed_expand_keeps_folder_collapsed_and_selected() {
        let adapter = adapter(MockBackend {
            fail: true,
            ..Default::default()
        });
        let mut lib = TreeNode::unexpanded_directory("lib", "/proj/lib");
        lib.selected = true;
        let mut session = SelectionSession::from_forest(adapter.clone(), vec![lib]);
        assert_eq!(session.collect_selected(), vec!["/proj/lib"]);

        assert!(!session.expand("/proj/lib").await);
        let lib = find_node(session.forest(), "/proj/lib").unwrap();
        assert!(lib.is_unexpanded());
        assert!(!lib.is_expanded);
        assert_eq!(session.collect_selected(), vec!["/proj/lib"]);

        // A later expand fetches again instead of toggling.
        assert!(!session.expand("/proj/lib").await);
        assert_eq!(adapter.backend().expand_calls.load(Ordering::SeqCst), 2);
        assert!(matches!(adapter.try_expand("/proj/lib").await, Some(Err(_))));
    }

    #[tokio::test]
    async fn test_session_expand_inherits_parent_selection() {
        let adapter = adapter(MockBackend::default());
        let mut session = SelectionSession::open_paths(adapter, &["/proj".to_string()]).await;

        assert!(session.toggle_selection("/proj/lib"));
        assert!(session.expand("/proj/lib").await);

        let lib = find_node(session.forest(), "/proj/lib").unwrap();
        assert!(lib.is_expanded);
        assert_eq!(lib.children().len(), 2);
        assert_eq!(lib.children()[0].name, "inner");
        assert!(lib.children().iter().all(|c| !c.selected));
        assert_eq!(lib.total_size, Some(5));

        // Second expand only toggles visibility.
        assert!(session.expand("/proj/lib").await);
        assert!(!find_node(session.forest(), "/proj/lib").unwrap().is_expanded);
        assert!(!session.expand("/proj/A.txt").await);
    }

    #[tokio::test]
    async fn test_collect_after_toggle_uses_leaf_policy() {
        let adapter = adapter(MockBackend::default());
        let mut session = SelectionSession::open_paths(adapter, &["/proj".to_string()]).await;

        assert_eq!(
            session.collect_selected(),
            vec!["/proj/lib", "/proj/A.txt", "/proj/b.txt"]
        );
        session.toggle_selection("/proj/b.txt");
        assert_eq!(session.collect_selected(), vec!["/proj/lib", "/proj/A.txt"]);
        session.toggle_selection("/proj");
        assert!(session.collect_selected().is_empty());
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_selection_and_bad_url() {
        let adapter = adapter(MockBackend::default());
        let mut session = SelectionSession::open_paths(adapter.clone(), &["/proj".to_string()]).await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert!(session.submit(Some("http://github.com/a/b"), &tx).await.is_none());
        assert!(matches!(rx.recv().await, Some(UserEvent::Toast { .. })));

        session.toggle_selection("/proj");
        assert!(session.submit(None, &tx).await.is_none());
        assert_eq!(
            rx.recv().await,
            Some(UserEvent::error("Select at least one file to parse"))
        );

        session.toggle_selection("/proj/A.txt");
        let submitted = session.submit(None, &tx).await.unwrap();
        assert_eq!(submitted.path_count, 1);
        assert_eq!(adapter.backend().parsed.lock().unwrap()[0], vec!["/proj/A.txt"]);
    }

    #[tokio::test]
    async fn test_saved_session_expands_through_stored_tree() {
        let adapter = adapter(MockBackend::default());
        let mut session = SelectionSession::open_saved(adapter, "2025-01-01_10-00-00").await;
        assert_eq!(session.source(), &TreeSource::Saved("2025-01-01_10-00-00".into()));
        assert!(session.expand("/proj/lib").await);
        assert!(session.is_selected("/proj/lib/z.rs").unwrap());
    }

    #[test]
    fn test_picked_files_build_a_selected_forest() {
        let adapter = adapter(MockBackend::default());
        let mut session = SelectionSession::from_picked(adapter, &["src/b.rs", "README.md", "src/a.rs"]);
        let names: Vec<&str> = session.forest().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["src", "README.md"]);
        assert_eq!(session.aggregates().files_count, 3);
        assert_eq!(session.collect_selected(), vec!["src/a.rs", "src/b.rs", "README.md"]);
    }
}
