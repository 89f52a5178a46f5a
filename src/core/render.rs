//! Generates an ASCII representation of a selection forest.

use super::tree::TreeNode;
use crate::utils::format::format_file_size;

/// A utility struct for rendering a forest as an indented tree.
///
/// This struct is stateless and provides methods as associated functions.
pub struct TreeRenderer;

impl TreeRenderer {
    /// Renders the forest in its current order, one line per node.
    ///
    /// Each line carries a checkbox for the node's `selected` flag; directories
    /// show their aggregates when they have been annotated.
    pub fn render(forest: &[TreeNode]) -> String {
        let mut result = String::new();
        Self::render_level(forest, &mut result, "");
        result
    }

    fn render_level(nodes: &[TreeNode], result: &mut String, prefix: &str) {
        for (i, node) in nodes.iter().enumerate() {
            let is_last = i == nodes.len() - 1;
            let connector = if is_last { "└── " } else { "├── " };
            let checkbox = if node.selected { "[x] " } else { "[ ] " };

            result.push_str(&format!("{prefix}{connector}{checkbox}{}", node.name));
            if node.is_directory() {
                result.push('/');
                if let (Some(size), Some(count)) = (node.total_size, node.files_count) {
                    result.push_str(&format!(" ({count} files, {})", format_file_size(size)));
                }
                if node.is_unexpanded() {
                    result.push_str(" …");
                }
            } else if let Some(size) = node.size {
                result.push_str(&format!(" ({})", format_file_size(size)));
            }
            result.push('\n');

            if !node.children().is_empty() {
                let new_prefix = if is_last {
                    format!("{prefix}    ")
                } else {
                    format!("{prefix}│   ")
                };
                Self::render_level(node.children(), result, &new_prefix);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_draws_connectors_and_checkboxes() {
        let mut dir = TreeNode::directory(
            "src",
            "src",
            vec![
                TreeNode::file("lib.rs", "src/lib.rs", Some(10)),
                TreeNode::file("main.rs", "src/main.rs", None),
            ],
        );
        dir.selected = true;
        dir.children.as_mut().unwrap()[0].selected = true;
        let forest = vec![dir, TreeNode::unexpanded_directory("docs", "docs")];

        let out = TreeRenderer::render(&forest);
        let expected = "\
├── [x] src/
│   ├── [x] lib.rs (10 B)
│   └── [ ] main.rs
└── [ ] docs/ …
";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_render_empty_forest_is_empty() {
        assert!(TreeRenderer::render(&[]).is_empty());
    }
}
