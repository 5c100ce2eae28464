//! Loading markdown files from disk and sorting out link destinations.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::resolver::fragment;

const MARKDOWN_EXTENSIONS: [&str; 3] = ["md", "markdown", "txt"];

const EXTERNAL_PREFIXES: [&str; 5] = ["http://", "https://", "mailto:", "tel:", "ftp://"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("Failed to load file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LoadError {
    fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => LoadError::PermissionDenied(path.to_path_buf()),
            _ => LoadError::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub content: String,
    /// Some bytes were not valid UTF-8 and were replaced with U+FFFD.
    pub had_invalid_utf8: bool,
    pub line_count: usize,
}

/// Read a markdown file. Invalid UTF-8 is replaced rather than rejected.
pub fn load_document(path: &Path) -> Result<LoadedDocument, LoadError> {
    let bytes = fs::read(path).map_err(|e| LoadError::from_io(path, e))?;
    let had_invalid_utf8 = std::str::from_utf8(&bytes).is_err();
    if had_invalid_utf8 {
        log::warn!("{} contains invalid UTF-8", path.display());
    }
    let content = String::from_utf8_lossy(&bytes).into_owned();

    log::info!("loaded {} ({} bytes)", path.display(), bytes.len());
    Ok(LoadedDocument {
        path: path.to_path_buf(),
        line_count: content.lines().count(),
        content,
        had_invalid_utf8,
    })
}

pub fn is_markdown_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            MARKDOWN_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Resolve a link to another markdown file against the directory of the
/// document it appears in.
pub fn resolve_local_link(current: &Path, link_path: &str) -> Result<PathBuf, LoadError> {
    let target = match current.parent() {
        Some(dir) => dir.join(link_path),
        None => PathBuf::from(link_path),
    };
    target.canonicalize().map_err(|e| LoadError::from_io(&target, e))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget<'a> {
    /// `#id` inside the current document.
    Fragment(&'a str),
    /// Another markdown file, relative to the current one, with an optional fragment.
    LocalFile {
        path: &'a str,
        fragment: Option<&'a str>,
    },
    External,
}

pub fn classify_link(destination: &str) -> LinkTarget<'_> {
    if let Some(target) = fragment(destination) {
        return LinkTarget::Fragment(target);
    }
    if destination.starts_with('#') || EXTERNAL_PREFIXES.iter().any(|p| destination.starts_with(p)) {
        return LinkTarget::External;
    }

    let (path, fragment) = match destination.split_once('#') {
        Some((path, frag)) => (path, Some(frag).filter(|f| !f.is_empty())),
        None => (destination, None),
    };
    if is_markdown_path(Path::new(path)) {
        LinkTarget::LocalFile { path, fragment }
    } else {
        LinkTarget::External
    }
}
