//! OpenAI Chat Completions API adapter.
//!
//! Tool-call fragments arrive tagged by positional index and accumulate
//! across chunks — keyed strictly by index, never by id, since the id may
//! only appear in a later chunk. At stream end each fragment's argument text
//! is parsed to materialize a tool call, and the round counts as
//! tool-use-terminated whenever any fragments exist, regardless of the
//! reported finish reason.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::SitewrightError;
use crate::types::{FinishReason, Message, Role, StreamDelta, ToolCall};

use super::http::{bearer_headers, parse_sse_data, shared_client, status_to_error};
use super::{DeltaStream, ModelProvider, ProviderRequest};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
        }
    }

    fn build_request_body(&self, request: &ProviderRequest) -> serde_json::Value {
        let mut messages = Vec::new();
        if !request.system.is_empty() {
            messages.push(serde_json::json!({
                "role": "system",
                "content": request.system,
            }));
        }
        for msg in &request.messages {
            append_openai_messages(&mut messages, msg);
        }

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "stream": true,
        });

        if !request.tools.is_empty() {
            let tool_defs: Vec<serde_json::Value> = request
                .tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body.as_object_mut()
                .expect("body is an object")
                .insert("tools".into(), tool_defs.into());
        }

        body
    }
}

fn append_openai_messages(messages: &mut Vec<serde_json::Value>, msg: &Message) {
    match msg.role {
        Role::User => {
            if msg.tool_results.is_empty() {
                messages.push(serde_json::json!({
                    "role": "user",
                    "content": msg.content,
                }));
            } else {
                // One wire message per tool result.
                for tr in &msg.tool_results {
                    messages.push(serde_json::json!({
                        "role": "tool",
                        "tool_call_id": tr.tool_call_id,
                        "content": tr.content,
                    }));
                }
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
                return;
            }
            let tool_calls: Vec<serde_json::Value> = msg
                .tool_calls
                .iter()
                .map(|tc| {
                    serde_json::json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": tc.arguments.to_string(),
                        }
                    })
                })
                .collect();
            messages.push(serde_json::json!({
                "role": "assistant",
                "content": if msg.content.is_empty() {
                    serde_json::Value::Null
                } else {
                    serde_json::Value::String(msg.content.clone())
                },
                "tool_calls": tool_calls,
            }));
        }
    }
}

/// A tool call being assembled from chunked fragments.
#[derive(Debug, Default)]
struct ToolCallFragment {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallFragment {
    fn merge(&mut self, delta: &OpenAiToolCallDelta) {
        if let Some(ref id) = delta.id {
            if !id.is_empty() {
                self.id = id.clone();
            }
        }
        if let Some(ref function) = delta.function {
            if let Some(ref name) = function.name {
                if !name.is_empty() {
                    self.name = name.clone();
                }
            }
            if let Some(ref arguments) = function.arguments {
                self.arguments.push_str(arguments);
            }
        }
    }

    fn materialize(self) -> ToolCall {
        let arguments = if self.arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(&self.arguments)
                .unwrap_or(serde_json::Value::String(self.arguments))
        };
        ToolCall {
            id: self.id,
            name: self.name,
            arguments,
        }
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn stream_round(
        &self,
        request: &ProviderRequest,
        cancel: CancellationToken,
    ) -> crate::error::Result<DeltaStream> {
        let body = self.build_request_body(request);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %request.model, "OpenAI stream_round");

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
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
            let mut fragments: BTreeMap<u32, ToolCallFragment> = BTreeMap::new();
            let mut finish: Option<FinishReason> = None;
            let mut cancelled = false;
            futures::pin_mut!(byte_stream);

            loop {
                let chunk_result = tokio::select! {
                    () = cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    chunk = byte_stream.next() => match chunk {
                        Some(c) => c,
                        None => break,
                    },
                };

                let chunk = match chunk_result {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(SitewrightError::Network(e));
                        return;
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
                    let Ok(chunk) = serde_json::from_str::<OpenAiStreamChunk>(data) else { continue };

                    let Some(choice) = chunk.choices.into_iter().next() else { continue };

                    if let Some(content) = choice.delta.content {
                        if !content.is_empty() {
                            yield Ok(StreamDelta::text(content));
                        }
                    }

                    // Accumulation keys strictly by index: the id may be
                    // absent until a later chunk.
                    for tc_delta in choice.delta.tool_calls.unwrap_or_default() {
                        fragments.entry(tc_delta.index).or_default().merge(&tc_delta);
                    }

                    if let Some(reason) = choice.finish_reason.as_deref() {
                        finish = parse_finish_reason(reason);
                    }
                }
            }

            if cancelled {
                return;
            }

            // The provider's own completion signal is not authoritative for
            // tool use: any accumulated fragment terminates the round as
            // tool use.
            let has_tool_calls = !fragments.is_empty();
            for (_, fragment) in fragments {
                yield Ok(StreamDelta::tool_call(fragment.materialize()));
            }
            yield Ok(StreamDelta::done(if has_tool_calls {
                FinishReason::ToolUse
            } else {
                finish.unwrap_or(FinishReason::Stop)
            }));
        };

        Ok(Box::pin(stream))
    }
}

fn parse_finish_reason(s: &str) -> Option<FinishReason> {
    match s {
        "stop" => Some(FinishReason::Stop),
        "length" => Some(FinishReason::Length),
        "tool_calls" => Some(FinishReason::ToolUse),
        _ => None,
    }
}

// OpenAI stream chunk types (internal)

#[derive(Deserialize)]
struct OpenAiStreamChunk {
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiStreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCallDelta>>,
}

#[derive(Deserialize)]
struct OpenAiToolCallDelta {
    index: u32,
    id: Option<String>,
    function: Option<OpenAiFunctionDelta>,
}

#[derive(Deserialize)]
struct OpenAiFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolResult;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new("test-key".to_string(), None)
    }

    fn request(messages: Vec<Message>) -> ProviderRequest {
        ProviderRequest {
            model: "gpt-4o".into(),
            system: "be helpful".into(),
            messages,
            tools: Vec::new(),
        }
    }

    #[test]
    fn system_prompt_becomes_first_message() {
        let body = provider().build_request_body(&request(vec![Message::user("hi")]));
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be helpful");
        assert_eq!(body["messages"][1]["role"], "user");
    }

    #[test]
    fn tool_results_become_one_tool_message_each() {
        let results = Message::tool_results(vec![
            ToolResult::ok("call_1", "first"),
            ToolResult::ok("call_2", "second"),
        ]);
        let body = provider().build_request_body(&request(vec![results]));

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[1]["role"], "tool");
        assert_eq!(messages[1]["tool_call_id"], "call_1");
        assert_eq!(messages[2]["tool_call_id"], "call_2");
    }

    #[test]
    fn assistant_tool_calls_serialize_arguments_as_text() {
        let assistant = Message::assistant_with_calls(
            "",
            vec![ToolCall {
                id: "call_1".into(),
                name: "list_files".into(),
                arguments: serde_json::json!({}),
            }],
        );
        let body = provider().build_request_body(&request(vec![assistant]));

        let msg = &body["messages"][1];
        assert_eq!(msg["content"], serde_json::Value::Null);
        assert_eq!(msg["tool_calls"][0]["function"]["arguments"], "{}");
    }

    #[test]
    fn fragment_merges_late_id_and_concatenates_arguments() {
        let mut fragment = ToolCallFragment::default();
        fragment.merge(&OpenAiToolCallDelta {
            index: 0,
            id: Some(String::new()),
            function: Some(OpenAiFunctionDelta {
                name: Some("read_file".into()),
                arguments: Some("{\"file_".into()),
            }),
        });
        fragment.merge(&OpenAiToolCallDelta {
            index: 0,
            id: None,
            function: Some(OpenAiFunctionDelta {
                name: None,
                arguments: Some("path\": \"a.md\"}".into()),
            }),
        });
        fragment.merge(&OpenAiToolCallDelta {
            index: 0,
            id: Some("call_late".into()),
            function: None,
        });

        let call = fragment.materialize();
        assert_eq!(call.id, "call_late");
        assert_eq!(call.name, "read_file");
        assert_eq!(call.arguments, serde_json::json!({"file_path": "a.md"}));
    }

    #[test]
    fn fragment_with_empty_arguments_materializes_empty_object() {
        let mut fragment = ToolCallFragment::default();
        fragment.merge(&OpenAiToolCallDelta {
            index: 0,
            id: Some("call_1".into()),
            function: Some(OpenAiFunctionDelta {
                name: Some("list_files".into()),
                arguments: None,
            }),
        });
        assert_eq!(fragment.materialize().arguments, serde_json::json!({}));
    }
}
