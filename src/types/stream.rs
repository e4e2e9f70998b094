//! Internal streaming event channel shared by all provider adapters.

use serde::{Deserialize, Serialize};

use super::message::ToolCall;

/// A delta emitted during a streaming round.
///
/// Both provider adapters translate their native wire shapes into this one
/// type, so the turn loop never depends on either provider's style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamDelta {
    /// The incremental text chunk (empty for non-text events).
    pub text: String,
    /// Event type.
    pub event_type: StreamEventType,
    /// A fully materialized tool call (only on `ToolCallDelta` events).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
    /// Finish reason (only on the final delta).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

impl StreamDelta {
    /// Incremental text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            event_type: StreamEventType::TextDelta,
            tool_call: None,
            finish_reason: None,
        }
    }

    /// A materialized tool call.
    pub fn tool_call(call: ToolCall) -> Self {
        Self {
            text: String::new(),
            event_type: StreamEventType::ToolCallDelta,
            tool_call: Some(call),
            finish_reason: None,
        }
    }

    /// End of round.
    pub fn done(finish_reason: FinishReason) -> Self {
        Self {
            text: String::new(),
            event_type: StreamEventType::Done,
            tool_call: None,
            finish_reason: Some(finish_reason),
        }
    }
}

/// Type of stream event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventType {
    /// Incremental text content.
    TextDelta,
    /// A tool call has been fully accumulated.
    ToolCallDelta,
    /// Round finished.
    Done,
}

/// Why a round finished.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    /// The round ended with pending tool calls.
    ToolUse,
}
