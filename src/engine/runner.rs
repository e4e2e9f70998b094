//! The turn-loop controller.
//!
//! `send` drives generate → tool-execute → regenerate rounds until a round
//! yields no tool calls, streaming progress through the event sink. The loop
//! is sequential per message: no parallel tool execution inside a batch, no
//! parallel rounds, so every tool result is attributable to its call id in a
//! stable order.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tracing::debug;
use uuid::Uuid;

use crate::config::{EngineSettings, SettingsStore};
use crate::error::{Result, SitewrightError};
use crate::project::ProjectStore;
use crate::prompt;
use crate::provider::{self, ModelProvider, ProviderRequest};
use crate::tools::{catalog_for, ToolDispatcher};
use crate::types::{Message, Persona, ProjectContext, Role, StreamEventType, ToolCall};

use super::cancel::{CancellationRegistry, SlotHandle};
use super::events::{EventEmitter, EventPayload, EventSink};

/// Rounds per send before the loop is treated as runaway.
const MAX_ROUNDS: usize = 12;

/// Creates the provider adapter for the resolved settings. Overridable so
/// hosts and tests can substitute their own transport.
pub type ProviderFactory =
    Box<dyn Fn(&EngineSettings) -> Result<Box<dyn ModelProvider>> + Send + Sync>;

/// The agent engine: one instance owns the cancellation slots for both
/// personas.
pub struct Engine {
    settings: Arc<dyn SettingsStore>,
    store: Arc<dyn ProjectStore>,
    sink: Arc<dyn EventSink>,
    registry: CancellationRegistry,
    provider_factory: ProviderFactory,
}

impl Engine {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        store: Arc<dyn ProjectStore>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            settings,
            store,
            sink,
            registry: CancellationRegistry::new(),
            provider_factory: Box::new(provider::create_provider),
        }
    }

    /// Replace the provider factory (used by hosts with custom transports
    /// and by tests).
    pub fn with_provider_factory(mut self, factory: ProviderFactory) -> Self {
        self.provider_factory = factory;
        self
    }

    /// Cancel the persona's active generation, if any. Fire-and-forget.
    pub fn cancel(&self, persona: Persona) {
        self.registry.cancel(persona);
    }

    /// Drive one assistant turn to completion.
    ///
    /// Fails fast with a configuration error before any network call when no
    /// provider is configured. Progress is delivered through the event sink;
    /// the returned message carries the full accumulated answer. A conversation
    /// is pinned to the provider resolved here for its whole duration.
    pub async fn send(&self, transcript: Vec<Message>, context: ProjectContext) -> Result<Message> {
        let settings = self
            .settings
            .load()?
            .ok_or_else(|| SitewrightError::Configuration("no model provider configured".into()))?;
        let provider = (self.provider_factory)(&settings)?;

        let message_id = Uuid::new_v4();
        let emitter = EventEmitter::new(self.sink.as_ref(), message_id, context.persona);
        let slot = self.registry.install(context.persona);

        debug!(
            persona = %context.persona,
            provider = provider.provider_name(),
            %message_id,
            "send start"
        );

        let outcome = self
            .run_loop(
                provider.as_ref(),
                &settings,
                transcript,
                &context,
                &emitter,
                &slot,
                message_id,
            )
            .await;
        self.registry.finish(context.persona, &slot);

        match outcome {
            Ok(message) => Ok(message),
            Err(e) => {
                // Text already streamed stays with the chunks the sink saw;
                // the error event lets the host attach it to the same turn.
                emitter.emit(EventPayload::Error {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_loop(
        &self,
        provider: &dyn ModelProvider,
        settings: &EngineSettings,
        transcript: Vec<Message>,
        context: &ProjectContext,
        emitter: &EventEmitter<'_>,
        slot: &SlotHandle,
        message_id: Uuid,
    ) -> Result<Message> {
        let system = prompt::build_system_prompt(context, self.store.as_ref()).await;
        let tools = catalog_for(context.persona);
        let dispatcher = ToolDispatcher::new(self.store.clone(), &context.root);

        let mut working = transcript;
        let mut answer = String::new();

        for round in 1..=MAX_ROUNDS {
            if slot.token.is_cancelled() {
                emitter.emit(EventPayload::Done);
                return Ok(finished_message(message_id, answer));
            }

            let request = ProviderRequest {
                model: settings.model.clone(),
                system: system.clone(),
                messages: working.clone(),
                tools: tools.clone(),
            };
            let mut stream = provider.stream_round(&request, slot.token.clone()).await?;

            let mut round_text = String::new();
            let mut calls: Vec<ToolCall> = Vec::new();
            while let Some(delta) = stream.next().await {
                let delta = delta?;
                match delta.event_type {
                    StreamEventType::TextDelta => {
                        if !delta.text.is_empty() {
                            emitter.chunk(delta.text.clone());
                            answer.push_str(&delta.text);
                            round_text.push_str(&delta.text);
                        }
                    }
                    StreamEventType::ToolCallDelta => {
                        if let Some(call) = delta.tool_call {
                            calls.push(call);
                        }
                    }
                    StreamEventType::Done => break,
                }
            }
            drop(stream);

            debug!(
                round,
                tool_calls = calls.len(),
                text_len = round_text.len(),
                "round complete"
            );

            // A cancelled transport ends the stream without a Done delta;
            // cancellation always terminates as done, never error.
            if slot.token.is_cancelled() {
                emitter.emit(EventPayload::Done);
                return Ok(finished_message(message_id, answer));
            }

            if calls.is_empty() {
                emitter.emit(EventPayload::Done);
                return Ok(finished_message(message_id, answer));
            }

            // Keep multi-round output reading as one document.
            if !answer.is_empty() {
                emitter.chunk("\n\n");
                answer.push_str("\n\n");
            }

            working.push(Message::assistant_with_calls(round_text, calls.clone()));

            // Strictly in the order received; each call is paired with its
            // result before the next provider request.
            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                emitter.emit(EventPayload::ToolCall {
                    tool_call: call.clone(),
                });
                let result = dispatcher.execute(call).await;
                emitter.emit(EventPayload::ToolResult {
                    tool_result: result.clone(),
                });
                results.push(result);
            }
            working.push(Message::tool_results(results));
        }

        Err(SitewrightError::InvalidState(format!(
            "tool loop exceeded {MAX_ROUNDS} rounds"
        )))
    }
}

fn finished_message(id: Uuid, content: String) -> Message {
    Message {
        id,
        role: Role::Assistant,
        content,
        tool_calls: Vec::new(),
        tool_results: Vec::new(),
        timestamp: Utc::now(),
    }
}
