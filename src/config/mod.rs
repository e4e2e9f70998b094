//! Engine settings: which provider to talk to, with what key and model.
//!
//! Settings are persisted per installation by the host application; the
//! engine only consumes them through [`SettingsStore`]. Absence is a normal
//! "unconfigured" result, not an error.

use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SitewrightError};

/// Which provider a conversation is pinned to.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
}

/// Persisted engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    pub provider: ProviderKind,
    pub api_key: String,
    pub model: String,
}

/// Boundary to the persisted per-installation configuration store.
pub trait SettingsStore: Send + Sync {
    /// Load the current settings. `Ok(None)` means unconfigured.
    fn load(&self) -> Result<Option<EngineSettings>>;
}

/// In-memory store, used by hosts that manage settings themselves and in tests.
pub struct MemorySettingsStore {
    settings: RwLock<Option<EngineSettings>>,
}

impl MemorySettingsStore {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings: RwLock::new(Some(settings)),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            settings: RwLock::new(None),
        }
    }

    pub fn set(&self, settings: EngineSettings) {
        *self.settings.write().unwrap() = Some(settings);
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Option<EngineSettings>> {
        Ok(self.settings.read().unwrap().clone())
    }
}

/// Environment-backed store (`SITEWRIGHT_PROVIDER`, `SITEWRIGHT_API_KEY`,
/// `SITEWRIGHT_MODEL`), loading `.env` if present.
pub struct EnvSettingsStore;

impl EnvSettingsStore {
    pub fn new() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self
    }
}

impl Default for EnvSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for EnvSettingsStore {
    fn load(&self) -> Result<Option<EngineSettings>> {
        let (Ok(provider), Ok(api_key)) = (
            std::env::var("SITEWRIGHT_PROVIDER"),
            std::env::var("SITEWRIGHT_API_KEY"),
        ) else {
            return Ok(None);
        };

        let provider: ProviderKind = provider.parse().map_err(|_| {
            SitewrightError::Configuration(format!("unknown provider '{provider}'"))
        })?;
        let model = std::env::var("SITEWRIGHT_MODEL").unwrap_or_else(|_| default_model(provider));

        Ok(Some(EngineSettings {
            provider,
            api_key,
            model,
        }))
    }
}

fn default_model(provider: ProviderKind) -> String {
    match provider {
        ProviderKind::Anthropic => "claude-sonnet-4-20250514".to_string(),
        ProviderKind::OpenAi => "gpt-4o".to_string(),
    }
}

/// TOML file-backed store under the platform config directory
/// (or an explicit path).
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    /// Store at an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default platform location
    /// (e.g. `~/.config/sitewright/settings.toml` on Linux).
    pub fn new_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "sitewright").ok_or_else(|| {
            SitewrightError::Configuration("cannot resolve a config directory".into())
        })?;
        Ok(Self {
            path: dirs.config_dir().join("settings.toml"),
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<Option<EngineSettings>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let settings: EngineSettings = toml::from_str(&raw)
            .map_err(|e| SitewrightError::Configuration(format!("{}: {e}", self.path.display())))?;
        Ok(Some(settings))
    }
}
