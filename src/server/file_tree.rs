//! Directory snapshot built from the matched file list
//!
//! Every snapshot is rebuilt from disk; nothing here patches an older tree.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::server::matcher::{self, MatchError};

/// A node of the snapshot sent to the peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    File { name: String, content: String },
    Directory { name: String, children: Vec<TreeNode> },
}

impl TreeNode {
    pub fn name(&self) -> &str {
        match self {
            TreeNode::File { name, .. } | TreeNode::Directory { name, .. } => name,
        }
    }
}

#[derive(Error, Debug)]
pub enum TreeError {
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Match `include_patterns` under `root` and assemble the result into a tree
pub fn build(
    root: &Path,
    include_patterns: &[String],
    ignore_patterns: &[String],
) -> Result<Vec<TreeNode>, TreeError> {
    let files = matcher::resolve(root, include_patterns, ignore_patterns)?;
    assemble(root, &files)
}

/// Assemble relative file paths into a tree, reading each leaf's content.
///
/// Siblings keep the order in which they were first seen. A path that was
/// already inserted is not read a second time.
pub fn assemble(root: &Path, files: &[String]) -> Result<Vec<TreeNode>, TreeError> {
    let mut top = Level::default();

    'files: for file in files {
        let segments: Vec<&str> = file.split('/').filter(|s| !s.is_empty()).collect();
        let Some((leaf, dirs)) = segments.split_last() else {
            continue;
        };

        let mut level = &mut top;
        for dir in dirs {
            match level.dir_mut(dir) {
                Some(next) => level = next,
                // 同名文件已占据该位置
                None => continue 'files,
            }
        }
        if level.contains(leaf) {
            continue;
        }

        let path = root.join(file);
        let bytes = fs::read(&path).map_err(|source| TreeError::Read {
            path: file.clone(),
            source,
        })?;
        level.push(Entry::File {
            name: leaf.to_string(),
            content: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    let nodes = top.into_nodes();
    debug!("Built tree with {} top-level nodes from {} paths", nodes.len(), files.len());
    Ok(nodes)
}

/// One directory level under construction: ordered entries plus a name index
#[derive(Default)]
struct Level {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

enum Entry {
    File { name: String, content: String },
    Directory { name: String, level: Level },
}

impl Level {
    fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    fn push(&mut self, entry: Entry) -> usize {
        let name = match &entry {
            Entry::File { name, .. } | Entry::Directory { name, .. } => name.clone(),
        };
        let idx = self.entries.len();
        self.entries.push(entry);
        self.index.insert(name, idx);
        idx
    }

    /// Child directory `name`, created if absent. `None` when a file holds the name.
    fn dir_mut(&mut self, name: &str) -> Option<&mut Level> {
        let existing = self.index.get(name).copied();
        let idx = match existing {
            Some(idx) => idx,
            None => self.push(Entry::Directory {
                name: name.to_string(),
                level: Level::default(),
            }),
        };
        match &mut self.entries[idx] {
            Entry::Directory { level, .. } => Some(level),
            Entry::File { .. } => None,
        }
    }

    fn into_nodes(self) -> Vec<TreeNode> {
        self.entries
            .into_iter()
            .map(|entry| match entry {
                Entry::File { name, content } => TreeNode::File { name, content },
                Entry::Directory { name, level } => TreeNode::Directory {
                    name,
                    children: level.into_nodes(),
                },
            })
            .collect()
    }
}

/// Flatten a tree back into `(path, content)` pairs, depth first
pub fn flatten(nodes: &[TreeNode]) -> Vec<(String, String)> {
    fn walk(nodes: &[TreeNode], prefix: &str, out: &mut Vec<(String, String)>) {
        for node in nodes {
            let path = if prefix.is_empty() {
                node.name().to_string()
            } else {
                format!("{}/{}", prefix, node.name())
            };
            match node {
                TreeNode::File { content, .. } => out.push((path, content.clone())),
                TreeNode::Directory { children, .. } => walk(children, &path, out),
            }
        }
    }

    let mut out = Vec::new();
    walk(nodes, "", &mut out);
    out
}
