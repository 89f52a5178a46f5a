//! Deterministic display ordering for selection forests.

use std::cmp::Ordering;

use super::tree::TreeNode;

/// Returns the forest ordered directories first, then by case-insensitive
/// name, at every level. The sort is stable, so names that compare equal
/// keep their incoming order.
pub fn sort_tree_recursive(mut forest: Vec<TreeNode>) -> Vec<TreeNode> {
    sort_level(&mut forest);
    forest
}

/// In-place form of [`sort_tree_recursive`].
pub fn sort_level(nodes: &mut [TreeNode]) {
    nodes.sort_by(compare_nodes);
    for node in nodes.iter_mut() {
        if let Some(children) = node.children.as_mut() {
            sort_level(children);
        }
    }
}

/// Directories first, then case-insensitive name.
pub(crate) fn compare_nodes(a: &TreeNode, b: &TreeNode) -> Ordering {
    match (a.is_directory(), b.is_directory()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    }
}
