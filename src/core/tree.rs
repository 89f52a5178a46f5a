//! The selection tree data model.
//!
//! A forest is a plain `Vec<TreeNode>` with unique ownership per subtree. All
//! mutation goes through `&mut` borrows; nothing in a tree is shared.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Whether a node is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    File,
    Directory,
}

impl NodeKind {
    pub fn is_directory(self) -> bool {
        matches!(self, NodeKind::Directory)
    }

    pub fn is_file(self) -> bool {
        matches!(self, NodeKind::File)
    }
}

/// One filesystem entry in a selection tree.
///
/// The serialized shape matches what the backend emits:
/// `{ type, name, path, size?, lastModified?, children? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub selected: bool,
    /// `None` means "not yet expanded"; `Some(vec![])` is an empty directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Local>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_count: Option<usize>,
    #[serde(skip)]
    pub is_expanded: bool,
}

impl TreeNode {
    /// Creates a file node.
    pub fn file(name: impl Into<String>, path: impl Into<String>, size: Option<u64>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::File,
            selected: false,
            children: None,
            size,
            last_modified: None,
            total_size: None,
            files_count: None,
            is_expanded: false,
        }
    }

    /// Creates a directory node with a loaded (possibly empty) child list.
    pub fn directory(
        name: impl Into<String>,
        path: impl Into<String>,
        children: Vec<TreeNode>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::Directory,
            selected: false,
            children: Some(children),
            size: None,
            last_modified: None,
            total_size: None,
            files_count: None,
            is_expanded: false,
        }
    }

    /// Creates a directory node whose children have not been fetched yet.
    pub fn unexpanded_directory(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            children: None,
            ..Self::directory(name, path, Vec::new())
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind.is_directory()
    }

    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// A directory whose children have not been loaded.
    pub fn is_unexpanded(&self) -> bool {
        self.is_directory() && self.children.is_none()
    }

    /// Children as a slice; empty for files and unexpanded directories.
    pub fn children(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }
}

/// Aggregate size and file count of a forest or subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregates {
    pub total_size: u64,
    pub files_count: usize,
}

/// Finds the node with the given path anywhere in the forest.
pub fn find_node<'a>(forest: &'a [TreeNode], path: &str) -> Option<&'a TreeNode> {
    for node in forest {
        if node.path == path {
            return Some(node);
        }
        if let Some(found) = find_node(node.children(), path) {
            return Some(found);
        }
    }
    None
}

/// Mutable variant of [`find_node`].
pub fn find_node_mut<'a>(forest: &'a mut [TreeNode], path: &str) -> Option<&'a mut TreeNode> {
    for node in forest.iter_mut() {
        if node.path == path {
            return Some(node);
        }
        if let Some(children) = node.children.as_mut() {
            if let Some(found) = find_node_mut(children, path) {
                return Some(found);
            }
        }
    }
    None
}

/// Returns the children of the directory at `path`, stripped to one level:
/// nested directories come back unexpanded.
pub fn shallow_children(forest: &[TreeNode], path: &str) -> Option<Vec<TreeNode>> {
    let node = find_node(forest, path)?;
    if !node.is_directory() {
        return None;
    }
    Some(node.children().iter().map(to_shallow).collect())
}

/// Copies a node without its descendants.
pub fn to_shallow(node: &TreeNode) -> TreeNode {
    TreeNode {
        children: None,
        is_expanded: false,
        ..node.clone()
    }
}

/// Counts every node in the forest.
pub fn count_nodes(forest: &[TreeNode]) -> usize {
    forest
        .iter()
        .map(|node| 1 + count_nodes(node.children()))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<TreeNode> {
        vec![TreeNode::directory(
            "a",
            "a",
            vec![
                TreeNode::directory("b", "a/b", vec![TreeNode::file("x.txt", "a/b/x.txt", None)]),
                TreeNode::file("c.txt", "a/c.txt", Some(3)),
            ],
        )]
    }

    #[test]
    fn test_find_node_locates_nested_entries() {
        let forest = sample();
        assert_eq!(find_node(&forest, "a/b/x.txt").unwrap().name, "x.txt");
        assert!(find_node(&forest, "a/missing").is_none());
    }

    #[test]
    fn test_shallow_children_strips_grandchildren() {
        let forest = sample();
        let children = shallow_children(&forest, "a").unwrap();
        assert_eq!(children.len(), 2);
        assert!(children[0].is_unexpanded());
        assert!(shallow_children(&forest, "a/c.txt").is_none());
    }

    #[test]
    fn test_wire_shape_uses_type_tag_and_camel_case() {
        let json = r#"{"name":"d","path":"/d","type":"Directory","children":[
            {"name":"f","path":"/d/f","type":"File","size":4,"lastModified":"2025-01-01T10:00:00+00:00"}
        ]}"#;
        let node: TreeNode = serde_json::from_str(json).unwrap();
        assert!(node.is_directory());
        assert!(!node.selected);
        let child = &node.children()[0];
        assert_eq!(child.size, Some(4));
        assert!(child.last_modified.is_some());
        assert!(child.children.is_none());

        let back = serde_json::to_value(&node).unwrap();
        assert_eq!(back["type"], "Directory");
        assert!(back.get("isExpanded").is_none());
        assert_eq!(count_nodes(std::slice::from_ref(&node)), 2);
    }
}
