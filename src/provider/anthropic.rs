//! Anthropic Messages API adapter.
//!
//! Text streams as whole deltas; tool-use blocks accumulate their
//! `input_json_delta` fragments and materialize one tool call per block at
//! `content_block_stop`. The round is tool-use-terminated when the provider
//! reports a `tool_use` stop reason.

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::SitewrightError;
use crate::types::{FinishReason, Message, Role, StreamDelta, ToolCall};

use super::http::{anthropic_headers, parse_sse_data, shared_client, status_to_error};
use super::{DeltaStream, ModelProvider, ProviderRequest};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

pub struct AnthropicProvider {
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
        }
    }

    fn build_request_body(&self, request: &ProviderRequest) -> serde_json::Value {
        let mut messages = Vec::new();

        for msg in &request.messages {
            match msg.role {
                Role::User => {
                    if msg.tool_results.is_empty() {
                        messages.push(serde_json::json!({
                            "role": "user",
                            "content": msg.content,
                        }));
                    } else {
                        let blocks: Vec<serde_json::Value> = msg
                            .tool_results
                            .iter()
                            .map(|tr| {
                                serde_json::json!({
                                    "type": "tool_result",
                                    "tool_use_id": tr.tool_call_id,
                                    "content": tr.content,
                                    "is_error": tr.is_error,
                                })
                            })
                            .collect();
                        messages.push(serde_json::json!({
                            "role": "user",
                            "content": blocks,
                        }));
                    }
                }
                Role::Assistant => {
                    if msg.tool_calls.is_empty() {
                        if !msg.content.is_empty() {
                            messages.push(serde_json::json!({
                                "role": "assistant",
                                "content": msg.content,
                            }));
                        }
                        continue;
                    }
                    let mut content: Vec<serde_json::Value> = Vec::new();
                    if !msg.content.is_empty() {
                        content.push(serde_json::json!({"type": "text", "text": msg.content}));
                    }
                    for tc in &msg.tool_calls {
                        content.push(serde_json::json!({
                            "type": "tool_use",
                            "id": tc.id,
                            "name": tc.name,
                            "input": tc.arguments,
                        }));
                    }
                    messages.push(serde_json::json!({
                        "role": "assistant",
                        "content": content,
                    }));
                }
            }
        }

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "max_tokens": MAX_TOKENS,
            "stream": true,
        });

        let obj = body.as_object_mut().expect("body is an object");
        if !request.system.is_empty() {
            obj.insert("system".into(), request.system.clone().into());
        }
        if !request.tools.is_empty() {
            let tool_defs: Vec<serde_json::Value> = request
                .tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.parameters,
                    })
                })
                .collect();
            obj.insert("tools".into(), tool_defs.into());
        }

        body
    }
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn stream_round(
        &self,
        request: &ProviderRequest,
        cancel: CancellationToken,
    ) -> crate::error::Result<DeltaStream> {
        let body = self.build_request_body(request);
        let url = format!("{}/messages", self.base_url);

        debug!(model = %request.model, "Anthropic stream_round");

        let resp = shared_client()
            .post(&url)
            .headers(anthropic_headers(&self.api_key, API_VERSION))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let byte_stream = resp.bytes_stream();

        let stream = async_stream::stream! {
            let mut buffer = String::new();
            let mut current_block_type: Option<String> = None;
            let mut current_tool_id: Option<String> = None;
            let mut current_tool_name: Option<String> = None;
            let mut current_tool_input = String::new();
            let mut saw_tool_use = false;
            futures::pin_mut!(byte_stream);

            loop {
                let chunk_result = tokio::select! {
                    () = cancel.cancelled() => break,
                    chunk = byte_stream.next() => match chunk {
                        Some(c) => c,
                        None => break,
                    },
                };

                let chunk = match chunk_result {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(SitewrightError::Network(e));
                        break;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    let Some(data) = parse_sse_data(&line) else { continue };
                    let Ok(event) = serde_json::from_str::<serde_json::Value>(data) else { continue };

                    let event_type = event.get("type").and_then(|t| t.as_str()).unwrap_or("");
                    match event_type {
                        "content_block_start" => {
                            if let Some(block) = event.get("content_block") {
                                let btype = block.get("type").and_then(|t| t.as_str()).unwrap_or("");
                                current_block_type = Some(btype.to_string());
                                if btype == "tool_use" {
                                    current_tool_id = block.get("id").and_then(|v| v.as_str()).map(String::from);
                                    current_tool_name = block.get("name").and_then(|v| v.as_str()).map(String::from);
                                    current_tool_input.clear();
                                }
                            }
                        }
                        "content_block_delta" => {
                            if let Some(delta) = event.get("delta") {
                                let delta_type = delta.get("type").and_then(|t| t.as_str()).unwrap_or("");
                                match delta_type {
                                    "text_delta" => {
                                        if let Some(text) = delta.get("text").and_then(|t| t.as_str()) {
                                            yield Ok(StreamDelta::text(text));
                                        }
                                    }
                                    "input_json_delta" => {
                                        if let Some(json) = delta.get("partial_json").and_then(|t| t.as_str()) {
                                            current_tool_input.push_str(json);
                                        }
                                    }
                                    _ => {}
                                }
                            }
                        }
                        "content_block_stop" => {
                            if current_block_type.as_deref() == Some("tool_use") {
                                if let (Some(id), Some(name)) = (current_tool_id.take(), current_tool_name.take()) {
                                    let arguments = if current_tool_input.is_empty() {
                                        serde_json::json!({})
                                    } else {
                                        serde_json::from_str(&current_tool_input)
                                            .unwrap_or(serde_json::Value::String(current_tool_input.clone()))
                                    };
                                    yield Ok(StreamDelta::tool_call(ToolCall { id, name, arguments }));
                                    saw_tool_use = true;
                                    current_tool_input.clear();
                                }
                            }
                            current_block_type = None;
                        }
                        "message_delta" => {
                            let stop = event.get("delta")
                                .and_then(|d| d.get("stop_reason"))
                                .and_then(|s| s.as_str());
                            let finish = match stop {
                                Some("end_turn") => Some(FinishReason::Stop),
                                Some("max_tokens") => Some(FinishReason::Length),
                                Some("tool_use") => Some(FinishReason::ToolUse),
                                _ => None,
                            };
                            if let Some(finish) = finish {
                                yield Ok(StreamDelta::done(if saw_tool_use {
                                    FinishReason::ToolUse
                                } else {
                                    finish
                                }));
                                return;
                            }
                        }
                        "message_stop" => {
                            yield Ok(StreamDelta::done(if saw_tool_use {
                                FinishReason::ToolUse
                            } else {
                                FinishReason::Stop
                            }));
                            return;
                        }
                        _ => {}
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
