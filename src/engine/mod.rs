//! The turn-loop engine: send/cancel, events, cancellation slots.

pub mod cancel;
pub mod events;
pub mod runner;

pub use cancel::CancellationRegistry;
pub use events::{ChannelSink, EngineEvent, EventPayload, EventSink};
pub use runner::Engine;
