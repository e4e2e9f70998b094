//! Sitewright — agent streaming and tool-execution engine.
//!
//! Drives a multi-round conversation with a language-model provider, executes
//! model-requested tools against a project root, and streams incremental
//! output to a caller with mid-generation cancellation.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use sitewright::config::MemorySettingsStore;
//! use sitewright::engine::{ChannelSink, Engine};
//! use sitewright::project::FsProjectStore;
//! use sitewright::types::{Message, Persona, ProjectContext};
//!
//! # async fn example() -> sitewright::error::Result<()> {
//! let (sink, _events) = ChannelSink::new();
//! let engine = Engine::new(
//!     Arc::new(MemorySettingsStore::unconfigured()),
//!     Arc::new(FsProjectStore::new()),
//!     Arc::new(sink),
//! );
//! let context = ProjectContext::new("/projects/blog", "My Blog", Persona::Site);
//! let reply = engine.send(vec![Message::user("Add an about page")], context).await?;
//! println!("{}", reply.content);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod project;
pub mod prompt;
pub mod provider;
pub mod tools;
pub mod types;
