//! Safe execution of tool calls against a project root.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::args::ToolRequest;
use super::{frontmatter, merge};
use crate::error::{Result, SitewrightError};
use crate::project::{NodeKind, ProjectStore, TreeNode};
use crate::types::{ToolCall, ToolResult};

/// File holding the site's structured configuration, relative to the root.
pub const SITE_CONFIG_FILE: &str = "site.config.json";

/// Executes tool calls, converting every failure into an error [`ToolResult`]
/// so the turn loop never has to abort on a tool fault.
pub struct ToolDispatcher {
    store: Arc<dyn ProjectStore>,
    root: PathBuf,
}

impl ToolDispatcher {
    pub fn new(store: Arc<dyn ProjectStore>, root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            root: root.into(),
        }
    }

    /// Execute one tool call. Never raises: every failure (validation, I/O,
    /// boundary violation) becomes an error result fed back to the model.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        debug!(tool = %call.name, call_id = %call.id, "executing tool");
        match self.run(call).await {
            Ok(content) => ToolResult::ok(&call.id, content),
            Err(e) => {
                debug!(tool = %call.name, error = %e, "tool failed");
                ToolResult::error(&call.id, e.to_string())
            }
        }
    }

    async fn run(&self, call: &ToolCall) -> Result<String> {
        let request = ToolRequest::parse(&call.name, &call.arguments)?;

        // Boundary check before any filesystem access.
        let resolved = match request.file_path() {
            Some(rel) => Some(self.resolve(&call.name, rel)?),
            None => None,
        };

        match request {
            ToolRequest::ReadFile { .. } => {
                self.store.read_text(&resolved.expect("path resolved")).await
            }
            ToolRequest::WriteFile { content, file_path } => {
                let path = resolved.expect("path resolved");
                self.store.write_text(&path, &content).await?;
                Ok(format!("Wrote {} bytes to {file_path}", content.len()))
            }
            ToolRequest::ListFiles => {
                let tree = self.store.list_tree(&self.root).await?;
                Ok(flatten_tree(&tree))
            }
            ToolRequest::ReadSiteConfig => self.store.read_text(&self.site_config_path()).await,
            ToolRequest::UpdateSiteConfig { config } => {
                let path = self.site_config_path();
                let mut current = match self.store.read_text(&path).await {
                    Ok(raw) => serde_json::from_str(&raw)?,
                    Err(_) => Value::Object(serde_json::Map::new()),
                };
                merge::deep_merge(&mut current, &Value::Object(config));
                let rendered = serde_json::to_string_pretty(&current)?;
                self.store.write_text(&path, &rendered).await?;
                Ok(format!("Updated {SITE_CONFIG_FILE}"))
            }
            ToolRequest::CreatePage {
                file_path,
                frontmatter,
                body,
            } => {
                let path = resolved.expect("path resolved");
                let page = frontmatter::render_page(&frontmatter, &body);
                self.store.write_text(&path, &page).await?;
                Ok(format!("Created {file_path}"))
            }
            ToolRequest::UpdateFrontmatter { file_path, updates } => {
                let path = resolved.expect("path resolved");
                let content = self.store.read_text(&path).await?;
                let updated = frontmatter::apply_updates(&content, &updates)
                    .map_err(|msg| SitewrightError::tool(&call.name, msg))?;
                self.store.write_text(&path, &updated).await?;
                Ok(format!("Updated frontmatter of {file_path}"))
            }
        }
    }

    fn site_config_path(&self) -> PathBuf {
        self.root.join(SITE_CONFIG_FILE)
    }

    /// Resolve a path argument against the project root, lexically.
    ///
    /// The check touches no filesystem state: components are normalized and
    /// the result must stay within the root, otherwise the call is denied.
    fn resolve(&self, tool: &str, candidate: &str) -> Result<PathBuf> {
        resolve_within(&self.root, candidate)
            .ok_or_else(|| SitewrightError::tool(tool, format!("access denied: {candidate}")))
    }
}

fn resolve_within(root: &Path, candidate: &str) -> Option<PathBuf> {
    let joined = root.join(candidate);
    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                if !resolved.pop() {
                    return None;
                }
            }
            Component::CurDir => {}
            other => resolved.push(other),
        }
    }
    resolved.starts_with(root).then_some(resolved)
}

/// Flatten a tree into the listing fed to the model: depth-first,
/// directories prefixed to distinguish them from files.
pub(crate) fn flatten_tree(nodes: &[TreeNode]) -> String {
    let mut lines = Vec::new();
    flatten_into(nodes, &mut lines);
    lines.join("\n")
}

fn flatten_into(nodes: &[TreeNode], lines: &mut Vec<String>) {
    for node in nodes {
        match node.kind {
            NodeKind::Directory => {
                lines.push(format!("[dir] {}", node.relative_path));
                flatten_into(&node.children, lines);
            }
            NodeKind::File => lines.push(node.relative_path.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::FsProjectStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments,
        }
    }

    fn dispatcher(root: &Path) -> ToolDispatcher {
        ToolDispatcher::new(Arc::new(FsProjectStore::new()), root)
    }

    #[test]
    fn resolve_within_allows_nested_paths() {
        let root = Path::new("/proj");
        assert_eq!(
            resolve_within(root, "src/pages/index.md"),
            Some(PathBuf::from("/proj/src/pages/index.md"))
        );
    }

    #[test]
    fn resolve_within_denies_parent_escapes() {
        let root = Path::new("/proj");
        assert_eq!(resolve_within(root, "../../etc/passwd"), None);
        assert_eq!(resolve_within(root, "a/../../etc/passwd"), None);
        assert_eq!(resolve_within(root, "/etc/passwd"), None);
    }

    #[test]
    fn resolve_within_normalizes_dot_components() {
        let root = Path::new("/proj");
        assert_eq!(
            resolve_within(root, "./a/./b.md"),
            Some(PathBuf::from("/proj/a/b.md"))
        );
        assert_eq!(
            resolve_within(root, "a/../b.md"),
            Some(PathBuf::from("/proj/b.md"))
        );
    }

    #[tokio::test]
    async fn traversal_attempt_yields_error_result_without_fs_access() {
        let dir = TempDir::new().unwrap();
        let result = dispatcher(dir.path())
            .execute(&call("read_file", json!({"file_path": "../../etc/passwd"})))
            .await;

        assert!(result.is_error);
        assert!(result.content.contains("access denied"));
    }

    #[tokio::test]
    async fn write_then_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(dir.path());

        let written = d
            .execute(&call(
                "write_file",
                json!({"file_path": "notes/today.md", "content": "# Notes"}),
            ))
            .await;
        assert!(!written.is_error, "{}", written.content);

        let read = d
            .execute(&call("read_file", json!({"file_path": "notes/today.md"})))
            .await;
        assert_eq!(read.content, "# Notes");
    }

    #[tokio::test]
    async fn read_missing_file_is_error_result_not_panic() {
        let dir = TempDir::new().unwrap();
        let result = dispatcher(dir.path())
            .execute(&call("read_file", json!({"file_path": "nope.md"})))
            .await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn malformed_arguments_become_error_result() {
        let dir = TempDir::new().unwrap();
        let result = dispatcher(dir.path())
            .execute(&call("write_file", json!({"file_path": "a.md"})))
            .await;
        assert!(result.is_error);
        assert!(result.content.contains("Invalid argument"));
    }

    #[tokio::test]
    async fn create_page_renders_frontmatter_block() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(dir.path());

        let result = d
            .execute(&call(
                "create_page",
                json!({
                    "file_path": "src/pages/about.md",
                    "frontmatter": {"title": "About", "draft": false},
                    "body": "Hello."
                }),
            ))
            .await;
        assert!(!result.is_error, "{}", result.content);

        let page = std::fs::read_to_string(dir.path().join("src/pages/about.md")).unwrap();
        assert_eq!(page, "---\ndraft: false\ntitle: \"About\"\n---\n\nHello.\n");
    }

    #[tokio::test]
    async fn update_site_config_merges_into_existing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SITE_CONFIG_FILE),
            r#"{"site": {"title": "Old", "lang": "en"}}"#,
        )
        .unwrap();

        let d = dispatcher(dir.path());
        let result = d
            .execute(&call(
                "update_site_config",
                json!({"config": {"site": {"title": "New"}}}),
            ))
            .await;
        assert!(!result.is_error, "{}", result.content);

        let raw = std::fs::read_to_string(dir.path().join(SITE_CONFIG_FILE)).unwrap();
        let parsed: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, json!({"site": {"title": "New", "lang": "en"}}));
    }

    #[tokio::test]
    async fn update_site_config_starts_from_empty_when_missing() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(dir.path());

        let result = d
            .execute(&call("update_site_config", json!({"config": {"theme": "dark"}})))
            .await;
        assert!(!result.is_error);

        let raw = std::fs::read_to_string(dir.path().join(SITE_CONFIG_FILE)).unwrap();
        let parsed: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, json!({"theme": "dark"}));
    }

    #[tokio::test]
    async fn update_frontmatter_without_block_is_error_result() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("plain.md"), "no block here\n").unwrap();

        let result = dispatcher(dir.path())
            .execute(&call(
                "update_frontmatter",
                json!({"file_path": "plain.md", "updates": {"title": "X"}}),
            ))
            .await;
        assert!(result.is_error);
        assert!(result.content.contains("no frontmatter block"));
    }

    #[tokio::test]
    async fn list_files_prefixes_directories() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src/pages")).unwrap();
        std::fs::write(dir.path().join("src/pages/index.md"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), "").unwrap();

        let result = dispatcher(dir.path())
            .execute(&call("list_files", json!({})))
            .await;

        assert_eq!(
            result.content,
            "[dir] src\n[dir] src/pages\nsrc/pages/index.md\nREADME.md"
        );
    }
}
