//! Typed tool arguments, validated at the dispatch boundary.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::catalog::ToolName;
use crate::error::{Result, SitewrightError};

/// A tool call's arguments, parsed into one shape per tool name.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    ReadFile {
        file_path: String,
    },
    WriteFile {
        file_path: String,
        content: String,
    },
    ListFiles,
    ReadSiteConfig,
    UpdateSiteConfig {
        config: Map<String, Value>,
    },
    CreatePage {
        file_path: String,
        frontmatter: Map<String, Value>,
        body: String,
    },
    UpdateFrontmatter {
        file_path: String,
        updates: Map<String, Value>,
    },
}

#[derive(Deserialize)]
struct PathArgs {
    file_path: String,
}

#[derive(Deserialize)]
struct WriteArgs {
    file_path: String,
    content: String,
}

#[derive(Deserialize)]
struct ConfigArgs {
    config: Map<String, Value>,
}

#[derive(Deserialize)]
struct PageArgs {
    file_path: String,
    frontmatter: Map<String, Value>,
    #[serde(default)]
    body: String,
}

#[derive(Deserialize)]
struct FrontmatterArgs {
    file_path: String,
    updates: Map<String, Value>,
}

impl ToolRequest {
    /// Parse `(name, arguments)` into a typed request.
    ///
    /// Unknown names and malformed argument shapes come back as
    /// [`SitewrightError::InvalidArgument`] so the dispatcher can turn them
    /// into error tool results.
    pub fn parse(name: &str, arguments: &Value) -> Result<Self> {
        let tool: ToolName = name
            .parse()
            .map_err(|_| SitewrightError::InvalidArgument(format!("unknown tool '{name}'")))?;

        let invalid = |e: serde_json::Error| {
            SitewrightError::InvalidArgument(format!("invalid arguments for {tool}: {e}"))
        };

        Ok(match tool {
            ToolName::ReadFile => {
                let args: PathArgs = from_value(arguments).map_err(invalid)?;
                Self::ReadFile {
                    file_path: args.file_path,
                }
            }
            ToolName::WriteFile => {
                let args: WriteArgs = from_value(arguments).map_err(invalid)?;
                Self::WriteFile {
                    file_path: args.file_path,
                    content: args.content,
                }
            }
            ToolName::ListFiles => Self::ListFiles,
            ToolName::ReadSiteConfig => Self::ReadSiteConfig,
            ToolName::UpdateSiteConfig => {
                let args: ConfigArgs = from_value(arguments).map_err(invalid)?;
                Self::UpdateSiteConfig {
                    config: args.config,
                }
            }
            ToolName::CreatePage => {
                let args: PageArgs = from_value(arguments).map_err(invalid)?;
                Self::CreatePage {
                    file_path: args.file_path,
                    frontmatter: args.frontmatter,
                    body: args.body,
                }
            }
            ToolName::UpdateFrontmatter => {
                let args: FrontmatterArgs = from_value(arguments).map_err(invalid)?;
                Self::UpdateFrontmatter {
                    file_path: args.file_path,
                    updates: args.updates,
                }
            }
        })
    }

    /// The path-shaped argument of this request, if it has one.
    pub fn file_path(&self) -> Option<&str> {
        match self {
            Self::ReadFile { file_path }
            | Self::WriteFile { file_path, .. }
            | Self::CreatePage { file_path, .. }
            | Self::UpdateFrontmatter { file_path, .. } => Some(file_path),
            _ => None,
        }
    }
}

fn from_value<T: serde::de::DeserializeOwned>(
    value: &Value,
) -> std::result::Result<T, serde_json::Error> {
    T::deserialize(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_read_file_arguments() {
        let req = ToolRequest::parse("read_file", &json!({"file_path": "src/index.md"})).unwrap();
        assert_eq!(
            req,
            ToolRequest::ReadFile {
                file_path: "src/index.md".into()
            }
        );
    }

    #[test]
    fn rejects_unknown_tool_name() {
        let err = ToolRequest::parse("delete_everything", &json!({})).unwrap_err();
        assert!(matches!(err, SitewrightError::InvalidArgument(_)));
    }

    #[test]
    fn rejects_missing_required_field() {
        let err = ToolRequest::parse("write_file", &json!({"file_path": "a.md"})).unwrap_err();
        assert!(err.to_string().contains("write_file"));
    }

    #[test]
    fn rejects_wrong_field_type() {
        assert!(ToolRequest::parse("update_site_config", &json!({"config": "nope"})).is_err());
    }

    #[test]
    fn create_page_body_defaults_to_empty() {
        let req = ToolRequest::parse(
            "create_page",
            &json!({"file_path": "pages/about.md", "frontmatter": {"title": "About"}}),
        )
        .unwrap();
        match req {
            ToolRequest::CreatePage { body, .. } => assert!(body.is_empty()),
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn argless_tools_ignore_extra_arguments() {
        assert_eq!(
            ToolRequest::parse("list_files", &json!({"stray": 1})).unwrap(),
            ToolRequest::ListFiles
        );
    }
}
