use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

static LOGGING_INIT: Once = Once::new();

/// Initializes the tracing subscriber for tests.
///
/// This function is wrapped in a `Once` block to ensure that the global
/// subscriber is set exactly one time, even when tests are run in parallel.
pub fn setup_test_logging() {
    LOGGING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok(); // Ignore the error if it's already set by another crate.
    });
}

/// Creates a directory structure below `root` from relative paths.
/// Paths ending with '/' create directories; others create files holding
/// their own relative path as content.
pub fn create_fixture(root: &Path, paths: &[&str]) -> Vec<PathBuf> {
    let mut created = Vec::new();
    for p in paths {
        let full = root.join(p.trim_end_matches('/'));
        if p.ends_with('/') {
            fs::create_dir_all(&full).expect("Failed to create fixture dir");
        } else {
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).expect("Failed to create fixture parent");
            }
            fs::write(&full, p).expect("Failed to write fixture file");
        }
        created.push(full);
    }
    created
}
