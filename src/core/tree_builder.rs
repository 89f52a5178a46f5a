//! Builds a nested selection tree from flat, slash-delimited relative paths.
//!
//! This is the directory-picker path: no I/O happens here, the forest is
//! derived purely from the relative paths of the picked files. Children keep
//! first-seen input order; pair with [`crate::core::sort_tree_recursive`] for
//! a display order.

use super::tree::TreeNode;

/// A file-like record that exposes a `/`-separated relative path.
pub trait RelativePath {
    fn relative_path(&self) -> &str;

    /// Size of the file in bytes, when the picker knows it.
    fn size(&self) -> Option<u64> {
        None
    }
}

impl RelativePath for &str {
    fn relative_path(&self) -> &str {
        self
    }
}

impl RelativePath for String {
    fn relative_path(&self) -> &str {
        self.as_str()
    }
}

/// A file handed over by a directory picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedFile {
    pub relative_path: String,
    pub size: Option<u64>,
}

impl PickedFile {
    pub fn new(relative_path: impl Into<String>, size: Option<u64>) -> Self {
        Self {
            relative_path: relative_path.into(),
            size,
        }
    }
}

impl RelativePath for PickedFile {
    fn relative_path(&self) -> &str {
        &self.relative_path
    }

    fn size(&self) -> Option<u64> {
        self.size
    }
}

/// Converts a flat list of files into a forest of directories and files.
///
/// Never fails: empty paths are skipped, duplicate files keep the first node,
/// and a path that would have to descend through an existing file is dropped.
pub fn build_tree<R: RelativePath>(files: &[R]) -> Vec<TreeNode> {
    let mut root: Vec<TreeNode> = Vec::new();
    for file in files {
        insert_path(&mut root, file.relative_path(), file.size());
    }
    root
}

fn insert_path(root: &mut Vec<TreeNode>, full_path: &str, size: Option<u64>) {
    let segment_count = full_path.split('/').count();
    let mut level = root;
    let mut offset = 0;

    for (index, segment) in full_path.split('/').enumerate() {
        let end = offset + segment.len();
        let prefix = &full_path[..end];
        offset = end + 1;

        if segment.is_empty() {
            continue;
        }
        let is_last = index == segment_count - 1;

        let position = match level.iter().position(|node| node.name == segment) {
            Some(position) => position,
            None => {
                let node = if is_last {
                    TreeNode::file(segment, full_path, size)
                } else {
                    TreeNode::directory(segment, prefix, Vec::new())
                };
                level.push(node);
                level.len() - 1
            }
        };

        if is_last {
            return;
        }

        match level[position].children.as_mut() {
            Some(children) => level = children,
            None => {
                tracing::debug!(
                    "Skipping '{}': '{}' is a file, not a directory",
                    full_path,
                    prefix
                );
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tree::NodeKind;

    fn names(nodes: &[TreeNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn test_builds_nested_directories_in_first_seen_order() {
        let forest = build_tree(&["a/b/x.txt", "a/b/y.txt", "a/c.txt"]);

        assert_eq!(names(&forest), vec!["a"]);
        let a = &forest[0];
        assert_eq!(a.kind, NodeKind::Directory);
        assert_eq!(names(a.children()), vec!["b", "c.txt"]);

        let b = &a.children()[0];
        assert_eq!(b.path, "a/b");
        assert_eq!(names(b.children()), vec!["x.txt", "y.txt"]);
        assert_eq!(b.children()[1].path, "a/b/y.txt");
        assert_eq!(a.children()[1].kind, NodeKind::File);
    }

    #[test]
    fn test_empty_input_yields_empty_forest() {
        let files: Vec<String> = Vec::new();
        assert!(build_tree(&files).is_empty());
        assert!(build_tree(&[""]).is_empty());
    }

    #[test]
    fn test_single_segment_becomes_root_file() {
        let forest = build_tree(&["README.md"]);
        assert_eq!(forest.len(), 1);
        assert!(forest[0].is_file());
        assert!(forest[0].children.is_none());
        assert_eq!(forest[0].path, "README.md");
    }

    #[test]
    fn test_duplicate_file_is_kept_once() {
        let forest = build_tree(&["a/x.txt", "a/x.txt"]);
        assert_eq!(forest[0].children().len(), 1);
    }

    #[test]
    fn test_empty_segments_do_not_create_phantom_nodes() {
        let forest = build_tree(&["a//b.txt", "/c.txt"]);
        assert_eq!(names(&forest), vec!["a", "c.txt"]);
        assert_eq!(names(forest[0].children()), vec!["b.txt"]);
        assert_eq!(forest[0].children()[0].path, "a//b.txt");
        assert_eq!(forest[1].path, "/c.txt");
    }

    #[test]
    fn test_trailing_slash_creates_directories_only() {
        let forest = build_tree(&["a/b/"]);
        assert_eq!(forest[0].children()[0].kind, NodeKind::Directory);
        assert!(forest[0].children()[0].children().is_empty());
    }

    #[test]
    fn test_name_matching_is_case_sensitive() {
        let forest = build_tree(&["Src/a.rs", "src/a.rs"]);
        assert_eq!(names(&forest), vec!["Src", "src"]);
    }

    #[test]
    fn test_path_through_existing_file_is_skipped() {
        let forest = build_tree(&["a", "a/b.txt"]);
        assert_eq!(forest.len(), 1);
        assert!(forest[0].is_file());
    }

    #[test]
    fn test_picked_file_size_is_copied() {
        let forest = build_tree(&[PickedFile::new("dir/file.bin", Some(42))]);
        assert_eq!(forest[0].children()[0].size, Some(42));
    }
}
