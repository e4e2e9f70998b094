//! Shared test support: a scripted provider and engine wiring helpers.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use sitewright::config::{EngineSettings, MemorySettingsStore, ProviderKind};
use sitewright::engine::{ChannelSink, Engine, EngineEvent};
use sitewright::error::SitewrightError;
use sitewright::project::FsProjectStore;
use sitewright::provider::{DeltaStream, ModelProvider, ProviderRequest};
use sitewright::types::{FinishReason, StreamDelta, ToolCall};

/// One scripted provider round.
pub enum ScriptedRound {
    /// Emit the deltas, then end the stream.
    Deltas(Vec<StreamDelta>),
    /// Emit the deltas, then pend until cancelled.
    HangAfter(Vec<StreamDelta>),
    /// Emit the deltas, then fail with an API error.
    FailAfter(Vec<StreamDelta>, String),
}

/// Test provider that captures requests and plays back queued rounds.
#[derive(Default)]
pub struct MockProvider {
    rounds: Mutex<VecDeque<ScriptedRound>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl MockProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a tool-free round streaming the given chunks.
    pub fn queue_text(&self, chunks: &[&str]) {
        let mut deltas: Vec<StreamDelta> = chunks.iter().map(|c| StreamDelta::text(*c)).collect();
        deltas.push(StreamDelta::done(FinishReason::Stop));
        self.rounds
            .lock()
            .unwrap()
            .push_back(ScriptedRound::Deltas(deltas));
    }

    /// Queue a tool-use-terminated round: chunks, then the calls.
    pub fn queue_tool_round(&self, chunks: &[&str], calls: Vec<ToolCall>) {
        let mut deltas: Vec<StreamDelta> = chunks.iter().map(|c| StreamDelta::text(*c)).collect();
        deltas.extend(calls.into_iter().map(StreamDelta::tool_call));
        deltas.push(StreamDelta::done(FinishReason::ToolUse));
        self.rounds
            .lock()
            .unwrap()
            .push_back(ScriptedRound::Deltas(deltas));
    }

    /// Queue a round that streams chunks and then hangs until cancelled.
    pub fn queue_hang_after(&self, chunks: &[&str]) {
        let deltas = chunks.iter().map(|c| StreamDelta::text(*c)).collect();
        self.rounds
            .lock()
            .unwrap()
            .push_back(ScriptedRound::HangAfter(deltas));
    }

    /// Queue a round that streams chunks and then fails.
    pub fn queue_fail_after(&self, chunks: &[&str], error: &str) {
        let deltas = chunks.iter().map(|c| StreamDelta::text(*c)).collect();
        self.rounds
            .lock()
            .unwrap()
            .push_back(ScriptedRound::FailAfter(deltas, error.to_string()));
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn stream_round(
        &self,
        request: &ProviderRequest,
        cancel: CancellationToken,
    ) -> sitewright::error::Result<DeltaStream> {
        self.requests.lock().unwrap().push(request.clone());
        let round = self
            .rounds
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ScriptedRound::Deltas(vec![StreamDelta::done(FinishReason::Stop)]));

        match round {
            ScriptedRound::Deltas(deltas) => {
                Ok(Box::pin(futures::stream::iter(deltas.into_iter().map(Ok))))
            }
            ScriptedRound::HangAfter(deltas) => Ok(Box::pin(async_stream::stream! {
                for delta in deltas {
                    yield Ok(delta);
                }
                cancel.cancelled().await;
            })),
            ScriptedRound::FailAfter(deltas, error) => Ok(Box::pin(async_stream::stream! {
                for delta in deltas {
                    yield Ok(delta);
                }
                yield Err(SitewrightError::api(500, error));
            })),
        }
    }
}

/// Delegating wrapper so one mock can outlive the factory boxing.
struct SharedProvider(Arc<MockProvider>);

#[async_trait]
impl ModelProvider for SharedProvider {
    fn provider_name(&self) -> &str {
        self.0.provider_name()
    }

    async fn stream_round(
        &self,
        request: &ProviderRequest,
        cancel: CancellationToken,
    ) -> sitewright::error::Result<DeltaStream> {
        self.0.stream_round(request, cancel).await
    }
}

pub fn test_settings() -> EngineSettings {
    EngineSettings {
        provider: ProviderKind::Anthropic,
        api_key: "test-key".into(),
        model: "test-model".into(),
    }
}

/// Engine wired to a mock provider, a temp project root, and a channel sink.
pub fn test_engine(
    provider: &Arc<MockProvider>,
) -> (
    Arc<Engine>,
    tokio::sync::mpsc::UnboundedReceiver<EngineEvent>,
    tempfile::TempDir,
) {
    let dir = tempfile::tempdir().unwrap();
    let (sink, rx) = ChannelSink::new();
    let mock = Arc::clone(provider);
    let engine = Engine::new(
        Arc::new(MemorySettingsStore::new(test_settings())),
        Arc::new(FsProjectStore::new()),
        Arc::new(sink),
    )
    .with_provider_factory(Box::new(move |_| {
        Ok(Box::new(SharedProvider(Arc::clone(&mock))))
    }));
    (Arc::new(engine), rx, dir)
}

/// Drain every event currently buffered in the receiver.
pub fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall {
        id: id.into(),
        name: name.into(),
        arguments,
    }
}
