//! BYOK key-check detection and the canned bypass reply.
//!
//! When an IDE verifies a configured key it sends a minimal throwaway
//! completion request and only checks that a well-formed response comes
//! back. Answering locally keeps key verification from consuming upstream
//! quota and from failing while the user is still logging in.

use axum::{
    Json,
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

/// Longest message text still considered a probe.
const PROBE_TEXT_LIMIT: usize = 64;

/// Fixed reply text for the canned bypass.
const PROBE_REPLY: &str = "Hello! The gateway connection is working.";

/// Whether a request body looks like the IDE's key-validation handshake:
/// a single short user message, no tools, and either a one-token
/// `max_tokens` or the well-known "Test prompt" text.
#[must_use]
pub fn is_byok_probe(body: &Value) -> bool {
    if body
        .get("tools")
        .and_then(Value::as_array)
        .is_some_and(|t| !t.is_empty())
    {
        return false;
    }
    let Some(messages) = body.get("messages").and_then(Value::as_array) else {
        return false;
    };
    if messages.len() != 1 {
        return false;
    }
    let message = &messages[0];
    if message.get("role").and_then(Value::as_str) != Some("user") {
        return false;
    }
    let text = message_text(message);
    if text.len() > PROBE_TEXT_LIMIT {
        return false;
    }
    let tiny_budget = body
        .get("max_tokens")
        .and_then(Value::as_u64)
        .is_some_and(|v| v <= 1);
    tiny_budget || text.trim_start().starts_with("Test prompt")
}

/// The canned bypass reply, streamed or not to match the request.
#[must_use]
pub fn canned_response(stream: bool, model: &str) -> Response {
    if !stream {
        return Json(json!({
            "id": "chatcmpl-keycheck",
            "object": "chat.completion",
            "created": 0,
            "model": model,
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": PROBE_REPLY},
                "finish_reason": "stop",
            }],
            "usage": {"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0},
        }))
        .into_response();
    }

    let chunk = |delta: Value, finish: Value| {
        json!({
            "id": "chatcmpl-keycheck",
            "object": "chat.completion.chunk",
            "created": 0,
            "model": model,
            "choices": [{"index": 0, "delta": delta, "finish_reason": finish}],
        })
    };
    let body = format!(
        "data: {}\n\ndata: {}\n\ndata: {}\n\ndata: [DONE]\n\n",
        chunk(json!({"role": "assistant", "content": ""}), Value::Null),
        chunk(json!({"content": PROBE_REPLY}), Value::Null),
        chunk(json!({}), json!("stop")),
    );
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(body))
        .expect("valid response")
}

/// Concatenated text of a message's content (string or block list).
fn message_text(message: &Value) -> String {
    match message.get("content") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detects_test_prompt() {
        let body = json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "Test prompt using gpt-4o"}],
        });
        assert!(is_byok_probe(&body));
    }

    #[test]
    fn test_detects_one_token_budget() {
        let body = json!({
            "model": "claude-sonnet-4-5",
            "max_tokens": 1,
            "messages": [{"role": "user", "content": "hi"}],
        });
        assert!(is_byok_probe(&body));
    }

    #[test]
    fn test_rejects_real_conversations() {
        let multi = json!({
            "messages": [
                {"role": "user", "content": "Test prompt"},
                {"role": "assistant", "content": "hello"},
            ],
        });
        assert!(!is_byok_probe(&multi));

        let long = json!({
            "messages": [{"role": "user", "content": "x".repeat(200)}],
        });
        assert!(!is_byok_probe(&long));

        let with_tools = json!({
            "max_tokens": 1,
            "messages": [{"role": "user", "content": "hi"}],
            "tools": [{"type": "function", "function": {"name": "f"}}],
        });
        assert!(!is_byok_probe(&with_tools));

        let plain = json!({
            "messages": [{"role": "user", "content": "What is Rust?"}],
        });
        assert!(!is_byok_probe(&plain));
    }

    #[test]
    fn test_block_content_counts_as_text() {
        let body = json!({
            "messages": [{
                "role": "user",
                "content": [{"type": "text", "text": "Test prompt"}],
            }],
        });
        assert!(is_byok_probe(&body));
    }

    #[test]
    fn test_canned_stream_shape() {
        let resp = canned_response(true, "gpt-4o");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "text/event-stream"
        );
    }

    #[test]
    fn test_canned_json_shape() {
        let resp = canned_response(false, "gpt-4o");
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
