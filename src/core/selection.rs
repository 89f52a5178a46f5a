//! Selection propagation and collection over a selection forest.

use super::tree::TreeNode;

/// Sets `selected` on the node and, for directories, on every descendant.
pub fn set_selected_recursive(node: &mut TreeNode, value: bool) {
    node.selected = value;
    if let Some(children) = node.children.as_mut() {
        for child in children.iter_mut() {
            set_selected_recursive(child, value);
        }
    }
}

/// Applies [`set_selected_recursive`] to every root of the forest.
pub fn set_selected_all(forest: &mut [TreeNode], value: bool) {
    for node in forest.iter_mut() {
        set_selected_recursive(node, value);
    }
}

/// Collects the concrete paths to hand to the parse operation.
///
/// Only selected files contribute; directories are descended regardless of
/// their own flag, so a partially unchecked directory yields exactly the
/// checked files. A selected directory that was never expanded contributes
/// its own path, since its files are unknown here and the parser recurses
/// into directories.
pub fn collect_selected_paths(forest: &[TreeNode]) -> Vec<String> {
    let mut paths = Vec::new();
    collect_into(forest, &mut paths);
    paths
}

fn collect_into(nodes: &[TreeNode], paths: &mut Vec<String>) {
    for node in nodes {
        if node.is_file() {
            if node.selected {
                paths.push(node.path.clone());
            }
        } else if node.is_unexpanded() {
            if node.selected {
                paths.push(node.path.clone());
            }
        } else {
            collect_into(node.children(), paths);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tree::find_node_mut;
    use crate::core::tree_builder::build_tree;

    #[test]
    fn test_set_selected_cascades_to_all_descendants() {
        let mut forest = build_tree(&["a/b/x.txt", "a/y.txt"]);
        set_selected_recursive(&mut forest[0], true);

        assert!(forest[0].selected);
        assert!(forest[0].children()[0].selected);
        assert!(forest[0].children()[0].children()[0].selected);
        assert!(forest[0].children()[1].selected);
    }

    #[test]
    fn test_set_selected_twice_is_idempotent() {
        let mut once = build_tree(&["a/b/x.txt", "a/y.txt", "z.txt"]);
        set_selected_all(&mut once, true);
        let mut twice = once.clone();
        set_selected_all(&mut twice, true);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_collect_after_select_all_returns_every_file() {
        let mut forest = build_tree(&["a/b/x.txt", "a/b/y.txt", "a/c.txt", "d.txt"]);
        set_selected_all(&mut forest, true);

        assert_eq!(
            collect_selected_paths(&forest),
            vec!["a/b/x.txt", "a/b/y.txt", "a/c.txt", "d.txt"]
        );
    }

    #[test]
    fn test_unchecked_file_is_excluded_even_under_selected_directory() {
        let mut forest = build_tree(&["a/x.txt", "a/y.txt"]);
        set_selected_all(&mut forest, true);
        set_selected_recursive(find_node_mut(&mut forest, "a/x.txt").unwrap(), false);

        assert!(forest[0].selected);
        assert_eq!(collect_selected_paths(&forest), vec!["a/y.txt"]);
    }

    #[test]
    fn test_selected_unexpanded_directory_contributes_its_path() {
        let mut forest = vec![
            TreeNode::unexpanded_directory("lazy", "/p/lazy"),
            TreeNode::unexpanded_directory("skipped", "/p/skipped"),
        ];
        forest[0].selected = true;

        assert_eq!(collect_selected_paths(&forest), vec!["/p/lazy"]);
    }

    #[test]
    fn test_empty_directory_contributes_nothing() {
        let mut forest = vec![TreeNode::directory("empty", "/empty", Vec::new())];
        set_selected_all(&mut forest, true);
        assert!(collect_selected_paths(&forest).is_empty());
    }
}
