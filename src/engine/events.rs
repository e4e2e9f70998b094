//! Progress events delivered to the UI boundary.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::types::{Persona, ToolCall, ToolResult};

/// An event on the UI boundary, keyed by (message id, persona).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineEvent {
    pub message_id: Uuid,
    pub persona: Persona,
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// Event kinds on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum EventPayload {
    Chunk { content: String },
    ToolCall { tool_call: ToolCall },
    ToolResult { tool_result: ToolResult },
    Done,
    Error { error: String },
}

/// Boundary sink for engine events.
pub trait EventSink: Send + Sync {
    /// Deliver one event. Failures are the emitter's problem, not the loop's.
    fn deliver(&self, event: EngineEvent) -> Result<(), String>;
}

/// Sink backed by an unbounded tokio channel.
pub struct ChannelSink {
    tx: tokio::sync::mpsc::UnboundedSender<EngineEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn deliver(&self, event: EngineEvent) -> Result<(), String> {
        self.tx.send(event).map_err(|e| e.to_string())
    }
}

/// Best-effort emitter for one generation: swallows sink failures so an
/// unreachable UI never turns into a generation failure.
pub(crate) struct EventEmitter<'a> {
    sink: &'a dyn EventSink,
    message_id: Uuid,
    persona: Persona,
}

impl<'a> EventEmitter<'a> {
    pub fn new(sink: &'a dyn EventSink, message_id: Uuid, persona: Persona) -> Self {
        Self {
            sink,
            message_id,
            persona,
        }
    }

    pub fn emit(&self, payload: EventPayload) {
        let event = EngineEvent {
            message_id: self.message_id,
            persona: self.persona,
            payload,
        };
        if let Err(e) = self.sink.deliver(event) {
            debug!(error = %e, "event sink unreachable, dropping event");
        }
    }

    pub fn chunk(&self, content: impl Into<String>) {
        self.emit(EventPayload::Chunk {
            content: content.into(),
        });
    }
}
