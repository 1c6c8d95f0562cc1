use std::collections::BTreeMap;

use async_trait::async_trait;
use futures_util::StreamExt;

use crate::errors::{SentinelError, SentinelResult};
use crate::llm::provider::LlmProvider;
use crate::llm::sse_parser;
use crate::llm::types::{
    ChatMessage, FunctionCall, LlmRequest, LlmResponse, StreamChunkKind, ToolCall, WireToolCall,
};

/// Content strings longer than this are elided from debug request logs.
const LOG_CONTENT_LIMIT: usize = 2_000;

pub struct OpenAiCompatibleProvider {
    id: String,
    api_base: String,
    api_key: String,
    stream: bool,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(id: String, api_base: String, api_key: String, stream: bool) -> Self {
        Self {
            id,
            api_base,
            api_key,
            stream,
            client: reqwest::Client::new(),
        }
    }

    fn build_body(&self, request: &LlmRequest) -> SentinelResult<serde_json::Value> {
        let messages: Vec<ChatMessage> = request.messages.iter().map(ChatMessage::from).collect();
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "stream": self.stream,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        if !request.tools.is_empty() {
            body["tools"] = serde_json::to_value(&request.tools)?;
            body["tool_choice"] = serde_json::json!("auto");
        }
        if self.stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }
        Ok(body)
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.id
    }

    async fn chat(&self, request: LlmRequest) -> SentinelResult<LlmResponse> {
        let body = self.build_body(&request)?;

        tracing::debug!(
            provider = %self.id,
            model = %request.model,
            stream = self.stream,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending LLM request"
        );
        tracing::trace!(body = %sanitized_for_log(&body), "request body (long content elided)");

        let response = self
            .client
            .post(&self.api_base)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(SentinelError::LlmProvider(format!("{}: {}", status, err_body)));
        }

        if self.stream {
            self.handle_stream(response).await
        } else {
            self.handle_json(response).await
        }
    }
}

impl OpenAiCompatibleProvider {
    /// Handle an SSE streaming response, accumulating the full answer.
    async fn handle_stream(&self, response: reqwest::Response) -> SentinelResult<LlmResponse> {
        let mut byte_stream = response.bytes_stream();
        let mut line_buf = String::new();

        let mut resp_content = String::new();
        let mut reasoning_len = 0usize;
        let mut output_tokens = 0u32;
        // Tool call accumulator: delta index → (id, name, accumulated_arguments)
        let mut tc_builders: BTreeMap<usize, (String, String, String)> = BTreeMap::new();

        'stream: while let Some(result) = byte_stream.next().await {
            let bytes = result?;
            let text = String::from_utf8_lossy(&bytes);

            for ch in text.chars() {
                if ch != '\n' {
                    line_buf.push(ch);
                    continue;
                }
                let line = line_buf.trim().to_string();
                line_buf.clear();
                if line.is_empty() {
                    continue;
                }

                match sse_parser::parse_sse_line(&line) {
                    Ok(Some(chunk)) => match chunk.kind {
                        StreamChunkKind::Reasoning => reasoning_len += chunk.content.len(),
                        StreamChunkKind::Content => resp_content.push_str(&chunk.content),
                        StreamChunkKind::ToolCall => {
                            merge_tool_call_deltas(&chunk.content, &mut tc_builders)
                        }
                        StreamChunkKind::Usage => {
                            output_tokens = chunk.content.parse().unwrap_or(output_tokens)
                        }
                        StreamChunkKind::Done => break 'stream,
                    },
                    Ok(None) => {}
                    Err(e) => tracing::debug!("SSE parse skipped: {e}"),
                }
            }
        }

        let tool_calls = build_tool_calls(tc_builders);

        tracing::info!(
            content_len = resp_content.len(),
            reasoning_len,
            tool_calls = tool_calls.len(),
            tools = ?tool_calls.iter().map(|tc| tc.name.as_str()).collect::<Vec<_>>(),
            "LLM stream complete"
        );

        Ok(LlmResponse {
            content: resp_content,
            tool_calls,
            output_tokens,
            success: true,
        })
    }

    /// Handle a non-streaming JSON response.
    async fn handle_json(&self, response: reqwest::Response) -> SentinelResult<LlmResponse> {
        let json: serde_json::Value = response.json().await?;
        let parsed = parse_completion(&json)?;

        tracing::info!(
            content_len = parsed.content.len(),
            tool_calls = parsed.tool_calls.len(),
            output_tokens = parsed.output_tokens,
            "LLM JSON response received"
        );
        Ok(parsed)
    }
}

/// Decode a chat-completions JSON body.
fn parse_completion(json: &serde_json::Value) -> SentinelResult<LlmResponse> {
    if let Some(err) = json.get("error") {
        let msg = err["message"].as_str().unwrap_or("unknown provider error");
        return Err(SentinelError::LlmProvider(msg.to_string()));
    }

    let message = &json["choices"][0]["message"];
    let content = message["content"].as_str().unwrap_or("").to_string();

    let tool_calls: Vec<ToolCall> = message["tool_calls"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .map(|tc| {
                    WireToolCall {
                        id: tc["id"].as_str().unwrap_or("").to_string(),
                        call_type: tc["type"].as_str().unwrap_or("function").to_string(),
                        function: FunctionCall {
                            name: tc["function"]["name"].as_str().unwrap_or("").to_string(),
                            arguments: tc["function"]["arguments"]
                                .as_str()
                                .unwrap_or("{}")
                                .to_string(),
                        },
                    }
                    .into_tool_call()
                })
                .filter(|tc| !tc.name.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let output_tokens = json["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32;

    Ok(LlmResponse {
        content,
        tool_calls,
        output_tokens,
        success: true,
    })
}

fn sanitized_for_log(body: &serde_json::Value) -> String {
    let mut log_body = body.clone();
    if let Some(msgs) = log_body.get_mut("messages").and_then(|m| m.as_array_mut()) {
        for msg in msgs {
            if let Some(content) = msg.get_mut("content") {
                if content.as_str().map_or(false, |s| s.len() > LOG_CONTENT_LIMIT) {
                    *content = serde_json::Value::String("<omitted_long_content>".to_string());
                }
            }
        }
    }
    serde_json::to_string(&log_body).unwrap_or_default()
}

/// Merge streaming tool-call delta fragments into the accumulator map (keyed by delta index).
fn merge_tool_call_deltas(
    chunk_content: &str,
    builders: &mut BTreeMap<usize, (String, String, String)>,
) {
    let Ok(deltas) = serde_json::from_str::<Vec<serde_json::Value>>(chunk_content) else {
        return;
    };
    for delta in deltas {
        let idx = delta["index"].as_u64().unwrap_or(0) as usize;
        let entry = builders.entry(idx).or_default();

        if let Some(id) = delta["id"].as_str() {
            if !id.is_empty() {
                entry.0 = id.to_string();
            }
        }
        if let Some(name) = delta["function"]["name"].as_str() {
            entry.1.push_str(name);
        }
        if let Some(args) = delta["function"]["arguments"].as_str() {
            entry.2.push_str(args);
        }
    }
}

/// Convert accumulated tool-call builders into typed `ToolCall` structs.
fn build_tool_calls(builders: BTreeMap<usize, (String, String, String)>) -> Vec<ToolCall> {
    builders
        .into_values()
        .filter(|(_, name, _)| !name.is_empty())
        .map(|(id, name, arguments)| {
            WireToolCall {
                id,
                call_type: "function".to_string(),
                function: FunctionCall {
                    name,
                    arguments: if arguments.is_empty() {
                        "{}".to_string()
                    } else {
                        arguments
                    },
                },
            }
            .into_tool_call()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streamed_fragments_merge_by_index() {
        let mut builders = BTreeMap::new();
        merge_tool_call_deltas(
            r#"[{"index":0,"id":"c1","function":{"name":"click","arguments":"{\"elem"}}]"#,
            &mut builders,
        );
        merge_tool_call_deltas(
            r#"[{"index":0,"function":{"arguments":"entPath\":\"A/B\"}"}}]"#,
            &mut builders,
        );
        merge_tool_call_deltas(
            r#"[{"index":1,"id":"c2","function":{"name":"query_ui"}}]"#,
            &mut builders,
        );

        let calls = build_tool_calls(builders);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "c1");
        assert_eq!(calls[0].arguments["elementPath"], "A/B");
        assert_eq!(calls[1].name, "query_ui");
        assert!(calls[1].arguments.is_empty());
    }

    #[test]
    fn completion_with_tool_calls_and_usage() {
        let json = serde_json::json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "scroll", "arguments": "{\"elementPath\":\"List\",\"delta\":120}"}
                    }]
                }
            }],
            "usage": {"completion_tokens": 17}
        });
        let resp = parse_completion(&json).unwrap();
        assert_eq!(resp.content, "");
        assert_eq!(resp.output_tokens, 17);
        assert_eq!(resp.tool_calls[0].arguments["delta"], 120);
    }

    #[test]
    fn error_body_is_surfaced() {
        let json = serde_json::json!({"error": {"message": "model overloaded"}});
        let err = parse_completion(&json).unwrap_err();
        assert!(err.to_string().contains("model overloaded"));
    }
}
