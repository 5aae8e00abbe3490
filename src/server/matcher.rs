//! Path matcher for include/ignore pattern sets
//!
//! Resolves the configured glob patterns against the project root to a flat
//! list of relative file paths (always `/`-separated).

use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

const GLOB_META: &[char] = &['*', '?', '[', '{'];

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Compiled ignore list.
///
/// An entry excludes a path when it matches the path itself or one of its
/// ancestor directories, so a bare directory name prunes the whole subtree.
pub struct IgnoreSet {
    set: GlobSet,
}

impl IgnoreSet {
    pub fn new(patterns: &[String]) -> Result<Self, MatchError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let normalized = normalize_pattern(pattern).trim_end_matches('/');
            if normalized.is_empty() {
                continue;
            }
            let glob = GlobBuilder::new(normalized)
                .literal_separator(true)
                .build()
                .map_err(|e| invalid(pattern, e))?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| MatchError::InvalidPattern {
            pattern: patterns.join(", "),
            reason: e.to_string(),
        })?;
        Ok(Self { set })
    }

    pub fn is_ignored(&self, relative: &str) -> bool {
        if self.set.is_empty() {
            return false;
        }
        relative
            .match_indices('/')
            .map(|(idx, _)| &relative[..idx])
            .chain(std::iter::once(relative))
            .any(|prefix| self.set.is_match(prefix))
    }
}

/// One compiled include pattern and the part of the tree it has to walk
struct IncludePattern {
    matcher: GlobMatcher,
    base: PathBuf,
    max_depth: Option<usize>,
    allow_hidden: bool,
}

impl IncludePattern {
    fn new(pattern: &str) -> Result<Self, MatchError> {
        let normalized = normalize_pattern(pattern);
        if normalized.split('/').any(|s| s == "..") {
            return Err(MatchError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "'..' segments are not allowed".to_string(),
            });
        }
        let matcher = GlobBuilder::new(normalized)
            .literal_separator(true)
            .build()
            .map_err(|e| invalid(pattern, e))?
            .compile_matcher();

        let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
        // 字面量前缀目录：最后一段之前、不含通配符的部分
        let literal_len = segments
            .iter()
            .take(segments.len().saturating_sub(1))
            .take_while(|s| !s.contains(GLOB_META))
            .count();
        let base: PathBuf = segments[..literal_len].iter().collect();
        let max_depth = if normalized.contains("**") {
            None
        } else {
            Some(segments.len() - literal_len)
        };
        let allow_hidden = normalized.starts_with('.') || normalized.contains("/.");

        Ok(Self {
            matcher,
            base,
            max_depth,
            allow_hidden,
        })
    }
}

/// Resolve include patterns against `root`.
///
/// Each include pattern is walked independently with the ignore list applied
/// during the walk. Results are concatenated in pattern order; a file matched
/// by two patterns appears twice.
pub fn resolve(
    root: &Path,
    include_patterns: &[String],
    ignore_patterns: &[String],
) -> Result<Vec<String>, MatchError> {
    let root_canonical = root.canonicalize()?;
    let ignore = IgnoreSet::new(ignore_patterns)?;

    let mut matched = Vec::new();
    for pattern in include_patterns {
        let include = IncludePattern::new(pattern)?;
        let files = match_pattern(&root_canonical, &include, &ignore);
        debug!("Matched {} files for pattern {}", files.len(), pattern);
        matched.extend(files);
    }

    if matched.is_empty() {
        warn!("No files matched the include patterns");
    }

    Ok(matched)
}

fn match_pattern(root: &Path, include: &IncludePattern, ignore: &IgnoreSet) -> Vec<String> {
    let start = root.join(&include.base);
    if !start.is_dir() {
        return Vec::new();
    }
    // root 已规范化；基础目录途经符号链接时真实路径会不同，此时不遍历
    match start.canonicalize() {
        Ok(real) if real == start => {}
        _ => {
            warn!("Skipping include base behind a symlink: {:?}", start);
            return Vec::new();
        }
    }

    let mut walker = WalkDir::new(&start).follow_links(false).sort_by_file_name();
    if let Some(depth) = include.max_depth {
        walker = walker.max_depth(depth);
    }

    let mut files = Vec::new();
    let entries = walker.into_iter().filter_entry(|entry| {
        if entry.depth() == 0 {
            return true;
        }
        if !include.allow_hidden && is_hidden(entry) {
            return false;
        }
        match relative_path(root, entry.path()) {
            Some(rel) => !ignore.is_ignored(&rel),
            None => false,
        }
    });

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !is_regular_file(root, &entry) {
            continue;
        }
        if let Some(rel) = relative_path(root, entry.path()) {
            if include.matcher.is_match(&rel) {
                files.push(rel);
            }
        }
    }

    files
}

/// Regular files, plus symlinks that point at a file inside the root
fn is_regular_file(root: &Path, entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    if file_type.is_file() {
        return true;
    }
    if !file_type.is_symlink() {
        return false;
    }
    match entry.path().canonicalize() {
        Ok(target) if target.starts_with(root) => target.is_file(),
        Ok(_) => {
            warn!("Skipping symlink escaping root: {:?}", entry.path());
            false
        }
        Err(_) => false,
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

fn normalize_pattern(pattern: &str) -> &str {
    let mut p = pattern.trim();
    while let Some(rest) = p.strip_prefix("./") {
        p = rest;
    }
    p
}

fn invalid(pattern: &str, e: globset::Error) -> MatchError {
    MatchError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;

    fn patterns(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, rel).unwrap();
    }

    #[test]
    fn test_resolve_basic_glob() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(root, "src/a.js");
        touch(root, "src/lib/b.js");
        touch(root, "src/lib/c.ts");
        touch(root, "other/d.js");

        let files = resolve(root, &patterns(&["src/**/*.js"]), &[]).unwrap();
        assert_eq!(files, vec!["src/a.js".to_string(), "src/lib/b.js".to_string()]);
    }

    #[test]
    fn test_ignore_is_set_difference() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        for rel in ["src/a.js", "src/b.js", "src/ui/button.js", "src/ui/deep/x.js"] {
            touch(root, rel);
        }

        let all: HashSet<String> = resolve(root, &patterns(&["src/**/*.js"]), &[])
            .unwrap()
            .into_iter()
            .collect();
        let kept: HashSet<String> =
            resolve(root, &patterns(&["src/**/*.js"]), &patterns(&["src/ui", "src/b.js"]))
                .unwrap()
                .into_iter()
                .collect();

        let ignored: HashSet<String> = ["src/ui/button.js", "src/ui/deep/x.js", "src/b.js"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let expected: HashSet<String> = all.difference(&ignored).cloned().collect();
        assert_eq!(kept, expected);
    }

    #[test]
    fn test_ignore_glob_pattern() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(root, "src/a.js");
        touch(root, "src/a.test.js");

        let files =
            resolve(root, &patterns(&["src/*.js"]), &patterns(&["**/*.test.js"])).unwrap();
        assert_eq!(files, vec!["src/a.js".to_string()]);
    }

    #[test]
    fn test_overlapping_patterns_keep_duplicates_in_order() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(root, "src/a.js");
        touch(root, "src/b.ts");

        let files = resolve(root, &patterns(&["src/**/*.ts", "src/*"]), &[]).unwrap();
        assert_eq!(
            files,
            vec![
                "src/b.ts".to_string(),
                "src/a.js".to_string(),
                "src/b.ts".to_string()
            ]
        );
    }

    #[test]
    fn test_directories_are_never_returned() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src/empty.js")).unwrap();
        touch(root, "src/full.js");

        let files = resolve(root, &patterns(&["src/*.js"]), &[]).unwrap();
        assert_eq!(files, vec!["src/full.js".to_string()]);
    }

    #[test]
    fn test_star_does_not_cross_directories() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(root, "src/a.js");
        touch(root, "src/nested/b.js");

        let files = resolve(root, &patterns(&["src/*.js"]), &[]).unwrap();
        assert_eq!(files, vec!["src/a.js".to_string()]);
    }

    #[test]
    fn test_hidden_files_need_explicit_dot() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(root, "src/.env.js");
        touch(root, "src/app.js");

        let implicit = resolve(root, &patterns(&["src/*.js"]), &[]).unwrap();
        assert_eq!(implicit, vec!["src/app.js".to_string()]);

        let explicit = resolve(root, &patterns(&["src/.*.js"]), &[]).unwrap();
        assert_eq!(explicit, vec!["src/.env.js".to_string()]);
    }

    #[test]
    fn test_no_matches_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let files = resolve(temp.path(), &patterns(&["src/**/*.js"]), &[]).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_invalid_pattern() {
        let temp = TempDir::new().unwrap();
        let result = resolve(temp.path(), &patterns(&["src/[.js"]), &[]);
        assert!(matches!(result, Err(MatchError::InvalidPattern { .. })));
    }

    #[test]
    fn test_parent_segments_are_rejected() {
        let parent = TempDir::new().unwrap();
        let root = parent.path().join("project");
        fs::create_dir_all(&root).unwrap();
        touch(parent.path(), "secret/key.txt");

        let result = resolve(&root, &patterns(&["../secret/*.txt"]), &[]);
        assert!(matches!(result, Err(MatchError::InvalidPattern { .. })));
        let result = resolve(&root, &patterns(&["src/../../secret/*.txt"]), &[]);
        assert!(matches!(result, Err(MatchError::InvalidPattern { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_base_directory_is_not_walked() {
        let temp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let root = temp.path();
        touch(outside.path(), "lib/x.js");
        touch(root, "src/a.js");
        std::os::unix::fs::symlink(outside.path().join("lib"), root.join("src/linked")).unwrap();
        std::os::unix::fs::symlink(outside.path(), root.join("vendor")).unwrap();

        let files = resolve(
            root,
            &patterns(&["src/linked/*.js", "vendor/lib/*.js", "src/**/*.js"]),
            &[],
        )
        .unwrap();
        assert_eq!(files, vec!["src/a.js".to_string()]);
    }

    #[test]
    fn test_ignore_set_matches_ancestors() {
        let ignore = IgnoreSet::new(&patterns(&["node_modules", "./dist/"])).unwrap();
        assert!(ignore.is_ignored("node_modules"));
        assert!(ignore.is_ignored("node_modules/pkg/index.js"));
        assert!(ignore.is_ignored("dist/app.js"));
        assert!(!ignore.is_ignored("src/node_modules.js"));
        assert!(!ignore.is_ignored("src/app.js"));
    }
}
