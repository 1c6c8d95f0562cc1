use crate::errors::{SentinelError, SentinelResult};
use crate::llm::types::{StreamChunk, StreamChunkKind};

/// Parses a raw SSE line (OpenAI-compatible format) into a StreamChunk.
/// Returns None if the line is a keep-alive or non-data line.
pub fn parse_sse_line(line: &str) -> SentinelResult<Option<StreamChunk>> {
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }

    let data = if let Some(d) = line.strip_prefix("data:") {
        d.trim()
    } else {
        return Ok(None);
    };

    if data == "[DONE]" {
        return Ok(Some(StreamChunk {
            kind: StreamChunkKind::Done,
            content: String::new(),
        }));
    }

    let json: serde_json::Value =
        serde_json::from_str(data).map_err(|e| SentinelError::SseParsing(e.to_string()))?;

    // Some servers send usage in a trailing chunk with empty choices.
    if let Some(tokens) = json["usage"]["completion_tokens"].as_u64() {
        if json["choices"].as_array().map_or(true, |c| c.is_empty()) {
            return Ok(Some(StreamChunk {
                kind: StreamChunkKind::Usage,
                content: tokens.to_string(),
            }));
        }
    }

    if let Some(first) = json["choices"].as_array().and_then(|c| c.first()) {
        let delta = &first["delta"];

        if let Some(reasoning) = delta["reasoning_content"].as_str() {
            if !reasoning.is_empty() {
                return Ok(Some(StreamChunk {
                    kind: StreamChunkKind::Reasoning,
                    content: reasoning.to_string(),
                }));
            }
        }

        if let Some(tool_calls) = delta["tool_calls"].as_array() {
            if !tool_calls.is_empty() {
                return Ok(Some(StreamChunk {
                    kind: StreamChunkKind::ToolCall,
                    content: serde_json::to_string(tool_calls)
                        .map_err(|e| SentinelError::SseParsing(e.to_string()))?,
                }));
            }
        }

        if let Some(content) = delta["content"].as_str() {
            if !content.is_empty() {
                return Ok(Some(StreamChunk {
                    kind: StreamChunkKind::Content,
                    content: content.to_string(),
                }));
            }
        }

        if first["finish_reason"].as_str().is_some() {
            return Ok(Some(StreamChunk {
                kind: StreamChunkKind::Done,
                content: String::new(),
            }));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keepalive_and_comments_are_skipped() {
        assert!(parse_sse_line("").unwrap().is_none());
        assert!(parse_sse_line(": ping").unwrap().is_none());
        assert!(parse_sse_line("event: message").unwrap().is_none());
    }

    #[test]
    fn done_marker() {
        let chunk = parse_sse_line("data: [DONE]").unwrap().unwrap();
        assert!(matches!(chunk.kind, StreamChunkKind::Done));
    }

    #[test]
    fn content_delta() {
        let chunk = parse_sse_line(r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#)
            .unwrap()
            .unwrap();
        assert!(matches!(chunk.kind, StreamChunkKind::Content));
        assert_eq!(chunk.content, "Hi");
    }

    #[test]
    fn tool_call_delta_is_forwarded_as_json() {
        let line = r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"id":"c1","function":{"name":"click","arguments":""}}]}}]}"#;
        let chunk = parse_sse_line(line).unwrap().unwrap();
        assert!(matches!(chunk.kind, StreamChunkKind::ToolCall));
        assert!(chunk.content.contains("\"click\""));
    }

    #[test]
    fn trailing_usage_chunk() {
        let chunk = parse_sse_line(r#"data: {"choices":[],"usage":{"completion_tokens":42}}"#)
            .unwrap()
            .unwrap();
        assert!(matches!(chunk.kind, StreamChunkKind::Usage));
        assert_eq!(chunk.content, "42");
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_sse_line("data: {oops").is_err());
    }
}
