//! Per-send project context and persona selection.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One of the two independent agent configurations, each with its own tool
/// catalog, prompt, and cancellation slot.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Persona {
    /// Scoped to the currently-open content file.
    Content,
    /// Project-wide: site configuration, pages, structure.
    Site,
}

/// The file currently open in the editor, if any.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpenFile {
    pub path: String,
    pub content: String,
}

/// Context for one `send()` invocation. Immutable for its duration.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    /// Project root — the security boundary for every tool call.
    pub root: PathBuf,
    pub site_name: String,
    pub site_description: Option<String>,
    pub open_file: Option<OpenFile>,
    pub persona: Persona,
}

impl ProjectContext {
    pub fn new(root: impl Into<PathBuf>, site_name: impl Into<String>, persona: Persona) -> Self {
        Self {
            root: root.into(),
            site_name: site_name.into(),
            site_description: None,
            open_file: None,
            persona,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.site_description = Some(description.into());
        self
    }

    pub fn with_open_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.open_file = Some(OpenFile {
            path: path.into(),
            content: content.into(),
        });
        self
    }
}
