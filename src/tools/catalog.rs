//! The fixed tool catalog and its persona scoping.

use serde::{Deserialize, Serialize};

use crate::types::Persona;

/// Names of the callable tools.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolName {
    ReadFile,
    WriteFile,
    ListFiles,
    ReadSiteConfig,
    UpdateSiteConfig,
    CreatePage,
    UpdateFrontmatter,
}

/// Tool definition sent to the provider API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Builder for JSON-Schema tool parameter objects.
struct ParameterBuilder {
    properties: serde_json::Map<String, serde_json::Value>,
    required: Vec<String>,
}

impl ParameterBuilder {
    fn object() -> Self {
        Self {
            properties: serde_json::Map::new(),
            required: Vec::new(),
        }
    }

    fn string(mut self, name: &str, description: &str, required: bool) -> Self {
        self.properties.insert(
            name.to_string(),
            serde_json::json!({ "type": "string", "description": description }),
        );
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    fn map(mut self, name: &str, description: &str, required: bool) -> Self {
        self.properties.insert(
            name.to_string(),
            serde_json::json!({ "type": "object", "description": description }),
        );
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    fn build(self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }
}

fn definition(name: ToolName) -> ToolDefinition {
    let (description, parameters) = match name {
        ToolName::ReadFile => (
            "Read a file from the project as UTF-8 text",
            ParameterBuilder::object()
                .string("file_path", "Path to the file, relative to the project root", true)
                .build(),
        ),
        ToolName::WriteFile => (
            "Write content to a project file, creating parent directories if needed",
            ParameterBuilder::object()
                .string("file_path", "Path to the file, relative to the project root", true)
                .string("content", "Full content to write", true)
                .build(),
        ),
        ToolName::ListFiles => (
            "List every file and directory in the project tree",
            ParameterBuilder::object().build(),
        ),
        ToolName::ReadSiteConfig => (
            "Read the site configuration (site.config.json)",
            ParameterBuilder::object().build(),
        ),
        ToolName::UpdateSiteConfig => (
            "Merge a partial configuration object into the site configuration. \
             Nested objects merge key-by-key; arrays and scalars are replaced.",
            ParameterBuilder::object()
                .map("config", "Partial configuration to merge", true)
                .build(),
        ),
        ToolName::CreatePage => (
            "Create a new content page with a frontmatter block and body",
            ParameterBuilder::object()
                .string("file_path", "Path for the new page, relative to the project root", true)
                .map("frontmatter", "Frontmatter fields for the page header", true)
                .string("body", "Markdown body of the page", true)
                .build(),
        ),
        ToolName::UpdateFrontmatter => (
            "Update fields in a file's leading frontmatter block without touching the body",
            ParameterBuilder::object()
                .string("file_path", "Path to the file, relative to the project root", true)
                .map("updates", "Frontmatter fields to set", true)
                .build(),
        ),
    };

    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
    }
}

/// Tools offered to the "content" persona.
const CONTENT_TOOLS: &[ToolName] = &[
    ToolName::ReadFile,
    ToolName::WriteFile,
    ToolName::UpdateFrontmatter,
];

/// Tools offered to the "site" persona (the full catalog).
const SITE_TOOLS: &[ToolName] = &[
    ToolName::ReadFile,
    ToolName::WriteFile,
    ToolName::ListFiles,
    ToolName::ReadSiteConfig,
    ToolName::UpdateSiteConfig,
    ToolName::CreatePage,
    ToolName::UpdateFrontmatter,
];

/// The tool catalog offered to a persona.
pub fn catalog_for(persona: Persona) -> Vec<ToolDefinition> {
    let names = match persona {
        Persona::Content => CONTENT_TOOLS,
        Persona::Site => SITE_TOOLS,
    };
    names.iter().copied().map(definition).collect()
}
