//! Filesystem traversal producing selection trees and parse inputs.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use ignore::gitignore::Gitignore;
use walkdir::WalkDir;

use super::error::{CoreError, CoreResult};
use super::ignore::{build_ignore_matcher, is_ignored};
use super::ordering::{compare_nodes, sort_level};
use super::tree::TreeNode;
use crate::utils::file_detection::is_text_file;

/// Walks local paths under a fixed ignore policy.
#[derive(Debug, Clone)]
pub struct FsTraversal {
    ignore_patterns: HashSet<String>,
    skip_hidden: bool,
}

impl FsTraversal {
    pub fn new(ignore_patterns: HashSet<String>, skip_hidden: bool) -> Self {
        Self {
            ignore_patterns,
            skip_hidden,
        }
    }

    /// Returns a traversal using the union of the current patterns and `extra`.
    pub fn with_extra_patterns<I>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut ignore_patterns = self.ignore_patterns.clone();
        ignore_patterns.extend(extra);
        Self {
            ignore_patterns,
            skip_hidden: self.skip_hidden,
        }
    }

    pub fn ignore_patterns(&self) -> &HashSet<String> {
        &self.ignore_patterns
    }

    fn matcher_for(&self, root: &Path) -> Gitignore {
        // Anchored one level up so the root's own name can match a pattern.
        let base = root.parent().unwrap_or(root);
        build_ignore_matcher(base, &self.ignore_patterns)
    }

    /// Missing paths, symlinks, hidden entries and ignored entries are skipped.
    fn is_valid_path(&self, path: &Path, matcher: &Gitignore) -> bool {
        let Ok(meta) = fs::symlink_metadata(path) else {
            return false;
        };
        if meta.file_type().is_symlink() {
            return false;
        }
        if self.skip_hidden && is_hidden(path) {
            return false;
        }
        !is_ignored(matcher, path, meta.is_dir())
    }

    /// Builds the full subtree for every valid root, in input order.
    /// Nonexistent roots are skipped.
    pub fn build_tree(&self, roots: &[PathBuf]) -> Vec<TreeNode> {
        let mut forest = Vec::new();
        for root in roots {
            let matcher = self.matcher_for(root);
            if !self.is_valid_path(root, &matcher) {
                tracing::debug!("Skipping preview root {:?}", root);
                continue;
            }
            match self.build_node(root, &matcher) {
                Some(node) => forest.push(node),
                None => tracing::warn!("Failed to read {:?}", root),
            }
        }
        forest
    }

    /// Walks `root` depth-first, keeping the chain of open directories on a
    /// stack. A directory is closed once the walk leaves its depth.
    fn build_node(&self, root: &Path, matcher: &Gitignore) -> Option<TreeNode> {
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || self.is_valid_path(e.path(), matcher));

        let mut open: Vec<TreeNode> = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {:?}: {}", root, e);
                    continue;
                }
            };
            while open.len() > entry.depth() {
                close_directory(&mut open);
            }
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry {:?}: {}", entry.path(), e);
                    continue;
                }
            };

            let name = display_name(entry.path());
            let path_str = entry.path().to_string_lossy().to_string();
            if meta.is_dir() {
                let mut node = TreeNode::directory(name, path_str, Vec::new());
                node.last_modified = modified_time(&meta);
                open.push(node);
                continue;
            }

            let mut node = TreeNode::file(name, path_str, Some(file_size(entry.path(), &meta)));
            node.last_modified = modified_time(&meta);
            match open.last_mut().and_then(|dir| dir.children.as_mut()) {
                Some(children) => children.push(node),
                None => return Some(node),
            }
        }

        while open.len() > 1 {
            close_directory(&mut open);
        }
        let mut root_node = open.pop()?;
        finish_directory(&mut root_node);
        Some(root_node)
    }

    /// Lists the immediate children of `dir`. Directories come back
    /// unexpanded and carry their recursive size.
    pub fn list_children(&self, dir: &Path) -> CoreResult<Vec<TreeNode>> {
        let meta = fs::metadata(dir).map_err(|e| CoreError::io(e, dir))?;
        if !meta.is_dir() {
            return Err(CoreError::InvalidName(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let matcher = self.matcher_for(dir);
        let mut children = Vec::new();
        for child in read_dir_sorted(dir)? {
            if !self.is_valid_path(&child, &matcher) {
                continue;
            }
            let Ok(child_meta) = fs::metadata(&child) else {
                continue;
            };
            let name = display_name(&child);
            let path_str = child.to_string_lossy().to_string();
            let mut node = if child_meta.is_dir() {
                let mut node = TreeNode::unexpanded_directory(name, path_str);
                node.size = Some(self.directory_size(&child, &matcher));
                node
            } else {
                TreeNode::file(name, path_str, Some(file_size(&child, &child_meta)))
            };
            node.last_modified = modified_time(&child_meta);
            children.push(node);
        }
        sort_level(&mut children);
        Ok(children)
    }

    fn directory_size(&self, dir: &Path, matcher: &Gitignore) -> u64 {
        WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || self.is_valid_path(e.path(), matcher))
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.metadata().ok().map(|m| file_size(e.path(), &m)))
            .sum()
    }

    /// Expands the given paths into the ordered, de-duplicated list of files
    /// a parse would read. Directories are walked recursively.
    pub fn collect_files(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for root in paths {
            let matcher = self.matcher_for(root);
            if !self.is_valid_path(root, &matcher) {
                tracing::debug!("Skipping parse input {:?}", root);
                continue;
            }
            let walker = WalkDir::new(root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || self.is_valid_path(e.path(), &matcher));

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!("Skipping unreadable entry under {:?}: {}", root, e);
                        continue;
                    }
                };
                if entry.file_type().is_file() && seen.insert(entry.path().to_path_buf()) {
                    files.push(entry.into_path());
                }
            }
        }
        files
    }
}

/// Pops the innermost open directory into its parent.
fn close_directory(open: &mut Vec<TreeNode>) {
    let Some(mut dir) = open.pop() else {
        return;
    };
    finish_directory(&mut dir);
    if let Some(children) = open.last_mut().and_then(|parent| parent.children.as_mut()) {
        children.push(dir);
    }
}

/// Orders a closed directory's children and sums their sizes.
fn finish_directory(dir: &mut TreeNode) {
    if let Some(children) = dir.children.as_mut() {
        children.sort_by(compare_nodes);
        dir.size = Some(children.iter().filter_map(|c| c.size).sum());
    }
}

/// Binary files contribute nothing to the artifact, so they count as empty.
fn file_size(path: &Path, meta: &fs::Metadata) -> u64 {
    if is_text_file(path) {
        meta.len()
    } else {
        0
    }
}

fn read_dir_sorted(dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| CoreError::io(e, dir))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .collect();
    entries.sort();
    Ok(entries)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

fn modified_time(meta: &fs::Metadata) -> Option<DateTime<Local>> {
    meta.modified().ok().map(DateTime::<Local>::from)
}
