use super::tree::{Aggregates, TreeNode};

/// Computes bottom-up size and file-count aggregates, storing them on every
/// directory, and returns the totals for the whole forest.
///
/// Files count as one and contribute `size` (0 when unknown). Directories
/// whose children were never loaded aggregate to zero.
pub fn annotate_aggregates(forest: &mut [TreeNode]) -> Aggregates {
    let mut totals = Aggregates::default();
    for node in forest.iter_mut() {
        let sub = annotate_node(node);
        totals.total_size += sub.total_size;
        totals.files_count += sub.files_count;
    }
    totals
}

fn annotate_node(node: &mut TreeNode) -> Aggregates {
    if node.is_file() {
        return Aggregates {
            total_size: node.size.unwrap_or(0),
            files_count: 1,
        };
    }

    let sub = match node.children.as_mut() {
        Some(children) => annotate_aggregates(children),
        None => Aggregates::default(),
    };
    node.total_size = Some(sub.total_size);
    node.files_count = Some(sub.files_count);
    sub
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregates_sum_only_own_descendants() {
        // root/{a.txt=10, mid/{b.txt=20, deep/{c.txt=30}}}
        let mut forest = vec![TreeNode::directory(
            "root",
            "root",
            vec![
                TreeNode::file("a.txt", "root/a.txt", Some(10)),
                TreeNode::directory(
                    "mid",
                    "root/mid",
                    vec![
                        TreeNode::file("b.txt", "root/mid/b.txt", Some(20)),
                        TreeNode::directory(
                            "deep",
                            "root/mid/deep",
                            vec![TreeNode::file("c.txt", "root/mid/deep/c.txt", Some(30))],
                        ),
                    ],
                ),
            ],
        )];

        let totals = annotate_aggregates(&mut forest);
        assert_eq!(totals, Aggregates { total_size: 60, files_count: 3 });

        let root = &forest[0];
        assert_eq!(root.total_size, Some(60));
        assert_eq!(root.files_count, Some(3));
        let mid = &root.children()[1];
        assert_eq!(mid.total_size, Some(50));
        assert_eq!(mid.files_count, Some(2));
        let deep = &mid.children()[1];
        assert_eq!(deep.total_size, Some(30));
        assert_eq!(deep.files_count, Some(1));
    }

    #[test]
    fn test_missing_sizes_default_to_zero_and_reannotation_is_fresh() {
        let mut forest = vec![TreeNode::directory(
            "d",
            "d",
            vec![TreeNode::file("f", "d/f", None)],
        )];
        assert_eq!(annotate_aggregates(&mut forest).total_size, 0);

        forest[0]
            .children
            .as_mut()
            .unwrap()
            .push(TreeNode::file("g", "d/g", Some(7)));
        let totals = annotate_aggregates(&mut forest);
        assert_eq!(totals, Aggregates { total_size: 7, files_count: 2 });
        assert_eq!(forest[0].files_count, Some(2));
    }

    #[test]
    fn test_unexpanded_directory_aggregates_to_zero() {
        let mut forest = vec![TreeNode::unexpanded_directory("lazy", "lazy")];
        assert_eq!(annotate_aggregates(&mut forest), Aggregates::default());
        assert_eq!(forest[0].files_count, Some(0));
    }
}
