use std::collections::HashSet;
use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// Builds a `.gitignore`-style matcher from a set of preset patterns.
///
/// Blank lines and `#` comments are skipped. A pattern that fails to parse is
/// logged and dropped so one bad preset entry does not disable the others.
pub fn build_ignore_matcher(root: &Path, patterns: &HashSet<String>) -> Gitignore {
    let mut builder = GitignoreBuilder::new(root);

    let mut sorted: Vec<&String> = patterns.iter().collect();
    sorted.sort();
    for pattern in sorted {
        let trimmed = pattern.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Err(e) = builder.add_line(None, trimmed) {
            tracing::warn!("Skipping invalid ignore pattern '{}': {}", trimmed, e);
        }
    }

    builder.build().unwrap_or_else(|e| {
        tracing::error!("Failed to build ignore matcher from patterns: {}", e);
        Gitignore::empty()
    })
}

/// Returns `true` when the path or any of its parents is ignored.
pub fn is_ignored(matcher: &Gitignore, path: &Path, is_dir: bool) -> bool {
    if matcher.is_empty() {
        return false;
    }
    // `matched_path_or_any_parents` panics for paths outside the matcher root.
    if path.starts_with(matcher.path()) {
        matcher
            .matched_path_or_any_parents(path, is_dir)
            .is_ignore()
    } else {
        match path.file_name() {
            Some(name) => matcher.matched(Path::new(name), is_dir).is_ignore(),
            None => false,
        }
    }
}
