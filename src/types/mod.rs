//! Core types for Sitewright.

pub mod context;
pub mod message;
pub mod stream;

pub use context::*;
pub use message::*;
pub use stream::*;
