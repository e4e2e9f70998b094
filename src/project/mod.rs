//! Project file boundary consumed by the tool dispatcher.
//!
//! The engine never walks the filesystem directly; it goes through
//! [`ProjectStore`], which a host can back with anything that exposes
//! read/write/tree semantics. [`FsProjectStore`] is the local default.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SitewrightError};

/// Directories excluded from tree listings.
const NOISE_DIRS: &[&str] = &["node_modules", ".git", "dist", ".astro"];

/// Kind of a tree node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

/// One node in a recursive project tree listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub name: String,
    pub path: PathBuf,
    pub relative_path: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

/// File/project service boundary.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Read a file as UTF-8 text.
    async fn read_text(&self, path: &Path) -> Result<String>;

    /// Write text to a file, creating parent directories as needed.
    async fn write_text(&self, path: &Path, text: &str) -> Result<()>;

    /// Recursively list the tree under `root`, noise directories excluded,
    /// entries sorted directories-first then alphabetically.
    async fn list_tree(&self, root: &Path) -> Result<Vec<TreeNode>>;
}

/// Local-filesystem implementation.
#[derive(Debug, Clone, Default)]
pub struct FsProjectStore;

impl FsProjectStore {
    pub fn new() -> Self {
        Self
    }

    fn walk(root: &Path, dir: &Path) -> Result<Vec<TreeNode>> {
        let mut nodes = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                if NOISE_DIRS.contains(&name.as_str()) {
                    continue;
                }
                let children = Self::walk(root, &path)?;
                nodes.push(TreeNode {
                    relative_path: relative_to(root, &path),
                    name,
                    path,
                    kind: NodeKind::Directory,
                    children,
                });
            } else if file_type.is_file() {
                nodes.push(TreeNode {
                    relative_path: relative_to(root, &path),
                    name,
                    path,
                    kind: NodeKind::File,
                    children: Vec::new(),
                });
            }
        }

        nodes.sort_by(|a, b| {
            (a.kind != NodeKind::Directory)
                .cmp(&(b.kind != NodeKind::Directory))
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(nodes)
    }
}

fn relative_to(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[async_trait]
impl ProjectStore for FsProjectStore {
    async fn read_text(&self, path: &Path) -> Result<String> {
        Ok(tokio::fs::read_to_string(path).await?)
    }

    async fn write_text(&self, path: &Path, text: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, text).await?;
        Ok(())
    }

    async fn list_tree(&self, root: &Path) -> Result<Vec<TreeNode>> {
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || Self::walk(&root, &root))
            .await
            .map_err(|e| SitewrightError::InvalidState(format!("tree walk task failed: {e}")))?
    }
}
