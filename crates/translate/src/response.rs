//! Stateless converter for full (non-streaming) upstream responses.

use serde_json::{Value, json};
use std::time::{SystemTime, UNIX_EPOCH};

/// Map an Anthropic `stop_reason` to an OpenAI `finish_reason`.
///
/// `end_turn` and `tool_use` have fixed mappings; any other value passes
/// through unchanged so new upstream reasons are not masked.
#[must_use]
pub fn map_stop_reason(stop_reason: Option<&str>) -> &str {
    match stop_reason {
        Some("end_turn") | None => "stop",
        Some("tool_use") => "tool_calls",
        Some(other) => other,
    }
}

/// Convert a complete Anthropic Messages response into an OpenAI chat
/// completion object, echoing the client's original model string.
#[must_use]
pub fn convert_complete(res: &Value, original_model: &str) -> Value {
    let mut text_parts: Vec<&str> = Vec::new();
    let mut tool_calls: Vec<Value> = Vec::new();

    if let Some(blocks) = res.get("content").and_then(Value::as_array) {
        for block in blocks {
            match block.get("type").and_then(Value::as_str).unwrap_or("") {
                "text" => {
                    if let Some(text) = block.get("text").and_then(Value::as_str) {
                        text_parts.push(text);
                    }
                }
                "tool_use" => {
                    let id = block.get("id").and_then(Value::as_str).unwrap_or("");
                    let name = block.get("name").and_then(Value::as_str).unwrap_or("");
                    let input = block.get("input").cloned().unwrap_or_else(|| json!({}));
                    let arguments = input.to_string();
                    tool_calls.push(json!({
                        "id": id,
                        "type": "function",
                        "function": {"name": name, "arguments": arguments},
                    }));
                }
                _ => {}
            }
        }
    }

    let id = res.get("id").and_then(Value::as_str).map_or_else(
        || "chatcmpl-unknown".to_string(),
        |id| format!("chatcmpl-{}", id.strip_prefix("msg_").unwrap_or(id)),
    );

    let finish_reason = map_stop_reason(res.get("stop_reason").and_then(Value::as_str));

    let mut message = json!({"role": "assistant"});
    if !text_parts.is_empty() {
        message["content"] = Value::String(text_parts.concat());
    }
    if !tool_calls.is_empty() {
        message["tool_calls"] = Value::Array(tool_calls);
    }

    let input_tokens = res
        .pointer("/usage/input_tokens")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let output_tokens = res
        .pointer("/usage/output_tokens")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let cached_tokens = res
        .pointer("/usage/cache_read_input_tokens")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    json!({
        "id": id,
        "object": "chat.completion",
        "created": SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0),
        "model": original_model,
        "choices": [{
            "index": 0,
            "message": message,
            "finish_reason": finish_reason,
        }],
        "usage": {
            "prompt_tokens": input_tokens,
            "completion_tokens": output_tokens,
            "total_tokens": input_tokens + output_tokens,
            "prompt_tokens_details": {"cached_tokens": cached_tokens},
            "completion_tokens_details": {"reasoning_tokens": 0},
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "id": "msg_abc123",
            "type": "message",
            "role": "assistant",
            "model": "claude-sonnet-4-5",
            "content": [{"type": "text", "text": "Hello there!"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5, "cache_read_input_tokens": 2}
        })
    }

    #[test]
    fn test_basic() {
        let out = convert_complete(&sample(), "client-alias");
        assert_eq!(out["object"], "chat.completion");
        assert_eq!(out["choices"][0]["message"]["content"], "Hello there!");
        assert_eq!(out["choices"][0]["message"]["role"], "assistant");
        assert_eq!(out["choices"][0]["finish_reason"], "stop");
    }

    #[test]
    fn test_original_model_echoed() {
        let out = convert_complete(&sample(), "client-alias");
        assert_eq!(out["model"], "client-alias");
    }

    #[test]
    fn test_id_strips_msg_prefix() {
        let out = convert_complete(&sample(), "m");
        assert_eq!(out["id"], "chatcmpl-abc123");
    }

    #[test]
    fn test_usage_mapping() {
        let out = convert_complete(&sample(), "m");
        assert_eq!(out["usage"]["prompt_tokens"], 10);
        assert_eq!(out["usage"]["completion_tokens"], 5);
        assert_eq!(out["usage"]["total_tokens"], 15);
        assert_eq!(out["usage"]["prompt_tokens_details"]["cached_tokens"], 2);
        assert_eq!(
            out["usage"]["completion_tokens_details"]["reasoning_tokens"],
            0
        );
    }

    #[test]
    fn test_empty_content_omitted() {
        let res = json!({
            "id": "msg_t",
            "content": [
                {"type": "tool_use", "id": "tu_1", "name": "f", "input": {"a": 1}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 1, "output_tokens": 1}
        });
        let out = convert_complete(&res, "m");
        let message = &out["choices"][0]["message"];
        assert!(message.get("content").is_none());
        assert_eq!(out["choices"][0]["finish_reason"], "tool_calls");
        let tc = message["tool_calls"].as_array().unwrap();
        assert_eq!(tc.len(), 1);
        assert_eq!(tc[0]["id"], "tu_1");
        let args: Value = serde_json::from_str(tc[0]["function"]["arguments"].as_str().unwrap()).unwrap();
        assert_eq!(args["a"], 1);
    }

    #[test]
    fn test_tool_use_null_input_becomes_empty_object() {
        let res = json!({
            "id": "msg_t",
            "content": [{"type": "tool_use", "id": "tu_1", "name": "f"}],
            "stop_reason": "tool_use",
        });
        let out = convert_complete(&res, "m");
        let args = out["choices"][0]["message"]["tool_calls"][0]["function"]["arguments"]
            .as_str()
            .unwrap();
        assert_eq!(args, "{}");
    }

    #[test]
    fn test_thinking_blocks_not_surfaced() {
        let res = json!({
            "id": "msg_t",
            "content": [
                {"type": "thinking", "thinking": "secret", "signature": "sig"},
                {"type": "text", "text": "public"}
            ],
            "stop_reason": "end_turn",
        });
        let out = convert_complete(&res, "m");
        assert_eq!(out["choices"][0]["message"]["content"], "public");
        assert!(!out.to_string().contains("secret"));
    }

    #[test]
    fn test_text_blocks_concatenated() {
        let res = json!({
            "id": "msg_t",
            "content": [
                {"type": "text", "text": "one "},
                {"type": "text", "text": "two"}
            ],
        });
        let out = convert_complete(&res, "m");
        assert_eq!(out["choices"][0]["message"]["content"], "one two");
    }

    #[test]
    fn test_map_stop_reason() {
        assert_eq!(map_stop_reason(Some("end_turn")), "stop");
        assert_eq!(map_stop_reason(Some("tool_use")), "tool_calls");
        assert_eq!(map_stop_reason(Some("max_tokens")), "max_tokens");
        assert_eq!(map_stop_reason(Some("stop_sequence")), "stop_sequence");
        assert_eq!(map_stop_reason(None), "stop");
    }
}
