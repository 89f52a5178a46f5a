use content_inspector::inspect;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "rst", "adoc",
    "rs", "py", "js", "ts", "jsx", "tsx", "java", "c", "cpp", "cc", "h", "hpp",
    "go", "rb", "php", "swift", "kt", "kts", "scala", "hs", "ml", "fs",
    "html", "htm", "xml", "css", "scss", "sass", "less", "svg", "vue", "svelte",
    "json", "jsonl", "yaml", "yml", "toml", "ini", "cfg", "conf", "properties",
    "sql", "sh", "bash", "zsh", "fish", "ps1", "bat", "cmd",
    "lua", "dart", "ex", "exs", "erl", "zig", "nix", "proto", "graphql",
    "csv", "tsv", "log", "diff", "patch", "lock", "mjs", "cjs", "d.ts",
];

const BINARY_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "ico", "webp", "tiff", "tif", "heic", "avif",
    "exe", "dll", "so", "dylib", "app", "deb", "rpm", "msi",
    "zip", "tar", "gz", "bz2", "7z", "rar", "jar", "war",
    "mp3", "mp4", "avi", "mkv", "mov", "webm", "wav", "flac",
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
    "bin", "dat", "db", "sqlite", "sqlite3", "rlib", "rmeta", "o", "obj", "a", "lib",
    "class", "pyc", "pyo", "wasm", "woff", "woff2", "ttf", "otf",
];

/// Bytes inspected when the extension is not conclusive.
const SNIFF_LEN: usize = 8192;

/// Determines if a file is likely to be a text file.
///
/// Known extensions decide immediately; anything else is sniffed with
/// `content_inspector`. Unreadable paths count as not text.
pub fn is_text_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }

    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        let ext_lower = extension.to_lowercase();
        if TEXT_EXTENSIONS.contains(&ext_lower.as_str()) {
            return true;
        }
        if BINARY_EXTENSIONS.contains(&ext_lower.as_str()) {
            return false;
        }
    }

    match check_file_content(path) {
        Ok(is_text) => is_text,
        Err(e) => {
            tracing::debug!("Content check failed for {}: {}", path.display(), e);
            false
        }
    }
}

/// Checks file content to determine if it's text or binary. UTF-16 with a
/// byte-order mark and single-byte encodings without NUL bytes count as text.
fn check_file_content(path: &Path) -> std::io::Result<bool> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut buffer = vec![0u8; SNIFF_LEN];
    let bytes_read = reader.read(&mut buffer)?;

    if bytes_read == 0 {
        return Ok(true);
    }
    Ok(!inspect(&buffer[..bytes_read]).is_binary())
}
