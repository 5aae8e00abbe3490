//! File API for agent-driven writes
//!
//! Provides path confinement and file write within the project root.

use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Maximum path length
pub const MAX_PATH_LENGTH: usize = 4096;

/// File API error types
#[derive(Debug)]
pub enum FileApiError {
    PathEscape,
    PathTooLong,
    EmptyPath,
    IoError(std::io::Error),
}

impl std::fmt::Display for FileApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileApiError::PathEscape => write!(f, "Path escapes project root"),
            FileApiError::PathTooLong => write!(f, "Path exceeds maximum length"),
            FileApiError::EmptyPath => write!(f, "Path does not name a file"),
            FileApiError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for FileApiError {}

impl From<std::io::Error> for FileApiError {
    fn from(e: std::io::Error) -> Self {
        FileApiError::IoError(e)
    }
}

/// Validate and resolve `relative_path` within `root`.
///
/// Absolute paths and `..` segments that climb above the root are rejected.
/// The nearest existing entry is canonicalized as well, so a symlinked
/// directory cannot lead outside the root either. A dangling symlink is
/// rejected, since writing through it would create its target.
pub fn resolve_safe_path(root: &Path, relative_path: &str) -> Result<PathBuf, FileApiError> {
    if relative_path.len() > MAX_PATH_LENGTH {
        return Err(FileApiError::PathTooLong);
    }

    let requested = Path::new(relative_path);
    if requested.has_root()
        || requested
            .components()
            .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
    {
        warn!("Absolute path rejected: {}", relative_path);
        return Err(FileApiError::PathEscape);
    }

    // Normalize the relative path (handle . and ..)
    let mut components = Vec::new();
    for component in relative_path.split(['/', '\\']) {
        match component {
            "" | "." => continue,
            ".." => {
                if components.pop().is_none() {
                    warn!("Path escape attempt: {}", relative_path);
                    return Err(FileApiError::PathEscape);
                }
            }
            c => components.push(c),
        }
    }
    if components.is_empty() {
        return Err(FileApiError::EmptyPath);
    }

    let root_canonical = root.canonicalize()?;
    let mut full_path = root_canonical.clone();
    for component in components {
        full_path.push(component);
    }

    // 找到最近的已存在条目（不跟随符号链接），校验其真实路径仍在根目录下
    let mut existing = full_path.as_path();
    while fs::symlink_metadata(existing).is_err() {
        match existing.parent() {
            Some(parent) => existing = parent,
            None => break,
        }
    }
    let existing_canonical = match existing.canonicalize() {
        Ok(path) => path,
        Err(e) => {
            let dangling = fs::symlink_metadata(existing)
                .map(|m| m.file_type().is_symlink())
                .unwrap_or(false);
            if dangling {
                warn!("Dangling symlink rejected: {:?}", existing);
                return Err(FileApiError::PathEscape);
            }
            return Err(e.into());
        }
    };
    if !existing_canonical.starts_with(&root_canonical) {
        warn!(
            "Path escape attempt: {:?} not under {:?}",
            existing_canonical, root_canonical
        );
        return Err(FileApiError::PathEscape);
    }

    Ok(full_path)
}

/// Strip one pair of wrapping backticks, if the content both starts and ends with one
pub fn strip_backtick_fence(content: &str) -> &str {
    if content.starts_with('`') && content.ends_with('`') {
        if content.len() == 1 {
            ""
        } else {
            &content[1..content.len() - 1]
        }
    } else {
        content
    }
}

/// Write `content` to `relative_path`, creating parent directories, and
/// return the file content as read back from disk
pub fn write_file(root: &Path, relative_path: &str, content: &str) -> Result<String, FileApiError> {
    let file_path = resolve_safe_path(root, relative_path)?;

    debug!("Writing file: {:?}", file_path);

    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;

    let bytes = fs::read(&file_path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
