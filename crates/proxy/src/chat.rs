//! The request pipeline behind `/v1/chat/completions` and `/v1/messages`.
//!
//! Order per request: inbound auth gate, variant resolution (with the
//! selective gateway and the key-check bypass), body rewrite, token
//! acquisition, upstream body construction, thinking-cache injection
//! (with silent downgrade), dispatch, response translation or
//! passthrough, and post-stream caching.

use crate::{AppState, context, error::error_response, probe, variant};
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bridge_cache::content_key;
use bridge_translate::{StreamConverter, convert_complete};
use bridge_types::BridgeError;
use bytes::Bytes;
use futures_util::StreamExt as _;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;

/// Anthropic Messages API endpoint.
const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

/// Required API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Beta features always enabled; `oauth-2025-04-20` is required for OAuth
/// bearer tokens.
const ANTHROPIC_BETA: &str =
    "oauth-2025-04-20,fine-grained-tool-streaming-2025-05-14,prompt-caching-2024-07-31";

/// Added to the beta list only while thinking is enabled.
const THINKING_BETA: &str = "interleaved-thinking-2025-05-14";

/// User-Agent matching the first-party CLI.
const USER_AGENT: &str = "claude-cli/2.1.44 (external, sdk-cli)";

/// System line the upstream expects from first-party clients.
pub const PERSONA: &str = "You are Claude Code, Anthropic's official CLI for Claude.";

/// Response headers never forwarded from upstream.
const HOP_HEADERS: &[&str] = &["content-encoding", "content-length", "transfer-encoding"];

/// Handles `POST /v1/chat/completions`.
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    handle(state, headers, body, true).await
}

/// Handles `POST /v1/messages`.
pub async fn messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    handle(state, headers, body, false).await
}

async fn handle(
    state: Arc<AppState>,
    headers: HeaderMap,
    mut body: Value,
    openai_route: bool,
) -> Response {
    context::log_request(&body);

    // 1. Inbound auth gate, only when a key is configured.
    if let Some(expected) = state.config.api_key.as_deref()
        && bearer_token(&headers) != Some(expected)
    {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "authentication_error",
            "invalid_api_key",
            "invalid or missing API key",
        );
    }

    let stream = body.get("stream").and_then(Value::as_bool).unwrap_or(false);
    let model = body
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    // 2. Key-check bypass, then the selective gateway.
    if probe::is_byok_probe(&body) {
        tracing::debug!("answering key-check probe locally");
        return probe::canned_response(stream, &model);
    }
    if !variant::is_claude_family(&model) {
        return error_response(
            StatusCode::NOT_FOUND,
            "invalid_request_error",
            "model_not_supported_by_proxy",
            &format!("model '{model}' is not served by this gateway"),
        );
    }
    let variant = variant::resolve(&model);

    // Format detection must happen before the rewrite consumes the
    // embedded system-role messages.
    let had_system_roles = body
        .get("messages")
        .and_then(Value::as_array)
        .is_some_and(|ms| {
            ms.iter()
                .any(|m| m.get("role").and_then(Value::as_str) == Some("system"))
        });
    let wants_openai = openai_route || had_system_roles;

    // 3. Rewrite: persona, system normalisation, variant max_tokens.
    rewrite_body(&mut body, &variant);

    // 4. Acquire the bearer token.
    let token = match state.auth.access_token().await {
        Ok(Some(token)) => token,
        Ok(None) => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "not_authenticated",
                "no OAuth credential stored; open the gateway page and log in",
            );
        }
        Err(e) => {
            tracing::warn!("token refresh failed: {e}");
            return error_response(
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "not_authenticated",
                &format!("could not obtain an access token: {e}"),
            );
        }
    };

    // 5. Whitelisted upstream body, with thinking config when enabled.
    let original_temperature = body.get("temperature").cloned();
    let mut upstream = build_upstream_body(&body, &variant);
    let mut thinking_enabled = variant.thinking.is_some();

    // 6. Thinking-cache injection; silently downgrade when history cannot
    // satisfy the upstream's signed-block requirement.
    if thinking_enabled
        && let Some(messages) = upstream.get_mut("messages").and_then(Value::as_array_mut)
    {
        let report = state.cache.inject(messages).await;
        tracing::debug!(
            injected = report.injected,
            missing = report.missing,
            "thinking cache injection"
        );
        if !report.can_use_thinking {
            apply_downgrade(&mut upstream, original_temperature);
            thinking_enabled = false;
            tracing::info!(
                missing = report.missing,
                "thinking disabled for this request: cached blocks missing"
            );
        }
    }

    // 7. Dispatch.
    let resp = match dispatch(&state, &token, &upstream, thinking_enabled, stream).await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::error!("upstream dispatch failed: {e}");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "upstream_dispatch_failed",
                &e.to_string(),
            );
        }
    };

    // 8. Response handling.
    let status = resp.status();
    if !status.is_success() {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return error_response(
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "oauth_token_rejected",
                "authentication failed: the OAuth token may be expired, log in again",
            );
        }
        let text = resp.text().await.unwrap_or_default();
        return (
            StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
            text,
        )
            .into_response();
    }

    if stream {
        return if wants_openai {
            translated_stream(state, resp, variant.original_model)
        } else {
            passthrough_stream(resp)
        };
    }

    if wants_openai {
        match resp.json::<Value>().await {
            Ok(json) => Json(convert_complete(&json, &variant.original_model)).into_response(),
            Err(e) => error_response(
                StatusCode::BAD_GATEWAY,
                "server_error",
                "upstream_error",
                &format!("invalid upstream response: {e}"),
            ),
        }
    } else {
        passthrough_json(resp).await
    }
}

/// Step 3: lift embedded system-role messages into the `system` array,
/// prepend the persona line when absent, and pin max_tokens to the
/// variant. `system` always leaves here as `[{type:"text",text}]` blocks.
fn rewrite_body(body: &mut Value, variant: &variant::ModelVariant) {
    let mut system_blocks = system_as_blocks(body.get("system"));

    let has_persona = system_blocks
        .first()
        .and_then(|b| b.get("text"))
        .and_then(Value::as_str)
        .is_some_and(|t| t.trim_start().starts_with(PERSONA));

    if !has_persona {
        let mut lifted: Vec<Value> = Vec::new();
        if let Some(messages) = body.get_mut("messages").and_then(Value::as_array_mut) {
            messages.retain(|m| {
                if m.get("role").and_then(Value::as_str) == Some("system") {
                    let text = content_as_text(m.get("content"));
                    if !text.is_empty() {
                        lifted.push(json!({"type": "text", "text": text}));
                    }
                    false
                } else {
                    true
                }
            });
        }
        let mut rebuilt = vec![json!({"type": "text", "text": PERSONA})];
        rebuilt.append(&mut lifted);
        rebuilt.append(&mut system_blocks);
        system_blocks = rebuilt;
    }

    body["system"] = Value::Array(system_blocks);
    body["max_tokens"] = json!(variant.max_tokens);
}

/// Step 5: copy only the whitelisted fields, apply the upstream model
/// name, and attach the thinking config (which forces temperature 1, an
/// upstream requirement).
fn build_upstream_body(body: &Value, variant: &variant::ModelVariant) -> Value {
    let mut out = json!({
        "model": variant.upstream_model,
        "messages": body.get("messages").cloned().unwrap_or_else(|| json!([])),
        "max_tokens": body
            .get("max_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(4096),
    });

    if let Some(system) = body.get("system") {
        out["system"] = system.clone();
    }
    if let Some(stream) = body.get("stream") {
        out["stream"] = stream.clone();
    }
    if let Some(stop) = body.get("stop_sequences").or_else(|| body.get("stop")) {
        out["stop_sequences"] = stop.clone();
    }
    for field in ["temperature", "top_p", "top_k", "metadata", "tools", "tool_choice"] {
        if let Some(v) = body.get(field) {
            out[field] = v.clone();
        }
    }

    if let Some(budget) = variant.thinking {
        out["thinking"] = json!({"type": "enabled", "budget_tokens": budget});
        out["temperature"] = json!(1);
    }

    out
}

/// Step 6 fallback: strip the thinking parameter and restore the client's
/// own temperature. The header side is handled by `dispatch` via the
/// `thinking_enabled` flag.
fn apply_downgrade(upstream: &mut Value, original_temperature: Option<Value>) {
    if let Some(obj) = upstream.as_object_mut() {
        obj.remove("thinking");
        match original_temperature {
            Some(t) => {
                obj.insert("temperature".to_string(), t);
            }
            None => {
                obj.remove("temperature");
            }
        }
    }
}

/// Step 7: POST to the upstream messages endpoint with the required
/// headers. No proxy-imposed timeout; the client's cancellation is
/// propagated by dropping the response.
async fn dispatch(
    state: &AppState,
    token: &str,
    upstream: &Value,
    thinking_enabled: bool,
    stream: bool,
) -> Result<reqwest::Response, BridgeError> {
    let beta = if thinking_enabled {
        format!("{ANTHROPIC_BETA},{THINKING_BETA}")
    } else {
        ANTHROPIC_BETA.to_string()
    };
    let mut builder = state
        .http
        .post(MESSAGES_URL)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .header("anthropic-version", ANTHROPIC_VERSION)
        .header("anthropic-beta", beta)
        .header("anthropic-dangerous-direct-browser-access", "true")
        .header("x-app", "cli")
        .header("user-agent", USER_AGENT);
    if stream {
        builder = builder.header("accept", "text/event-stream");
    }
    builder.json(upstream).send().await.map_err(BridgeError::from)
}

/// Translated streaming path: pipe upstream SSE through a per-request
/// [`StreamConverter`], then cache a captured thinking block once the
/// stream has closed cleanly. A client disconnect abandons the upstream
/// read and skips the cache write.
fn translated_stream(
    state: Arc<AppState>,
    resp: reqwest::Response,
    original_model: String,
) -> Response {
    let upstream_headers = resp.headers().clone();
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Bytes, std::io::Error>>(16);
    let cache = state.cache.clone();

    tokio::spawn(async move {
        let mut converter = StreamConverter::new(&original_model);
        let mut upstream = resp.bytes_stream();
        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => {
                    for frame in converter.feed(&bytes) {
                        if tx.send(Ok(Bytes::from(frame))).await.is_err() {
                            tracing::debug!("client disconnected mid-stream");
                            return;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("upstream stream error: {e}");
                    break;
                }
            }
        }
        // Partial output is never cached.
        if converter.finished()
            && let Some(block) = converter.captured_thinking().cloned()
            && let Some(key) = content_key(&converter.canonical_content())
        {
            tracing::debug!(%key, "caching captured thinking block");
            cache.put(key, block.to_block());
        }
    });

    let mut builder = Response::builder().status(StatusCode::OK);
    for (name, value) in &upstream_headers {
        if HOP_HEADERS.contains(&name.as_str())
            || matches!(name.as_str(), "content-type" | "cache-control")
        {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_bytes());
    }
    let body = Body::from_stream(ReceiverStream::new(rx));
    builder
        .header("content-type", "text/event-stream")
        .header("cache-control", "no-cache")
        .body(body)
        .expect("valid response")
}

/// Raw streaming passthrough for first-party-format clients.
fn passthrough_stream(resp: reqwest::Response) -> Response {
    let mut builder = Response::builder().status(resp.status().as_u16());
    for (name, value) in resp.headers() {
        if HOP_HEADERS.contains(&name.as_str()) {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_bytes());
    }
    let stream = resp.bytes_stream().map(|r| r.map_err(std::io::Error::other));
    builder
        .body(Body::from_stream(stream))
        .expect("valid response")
}

/// Non-streaming passthrough with hop-by-hop headers stripped.
async fn passthrough_json(resp: reqwest::Response) -> Response {
    let status = resp.status().as_u16();
    let headers = resp.headers().clone();
    let bytes = resp.bytes().await.unwrap_or_default();
    let mut builder = Response::builder().status(status);
    for (name, value) in &headers {
        if HOP_HEADERS.contains(&name.as_str()) {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_bytes());
    }
    builder.body(Body::from(bytes)).expect("valid response")
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Flatten message content (string or text blocks) into one string.
fn content_as_text(content: Option<&Value>) -> String {
    match content {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

/// Normalise a `system` field (string, block list, or absent) to text blocks.
fn system_as_blocks(system: Option<&Value>) -> Vec<Value> {
    match system {
        Some(Value::String(s)) if !s.is_empty() => {
            vec![json!({"type": "text", "text": s})]
        }
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter_map(|b| match b {
                Value::String(s) => Some(json!({"type": "text", "text": s})),
                other => other
                    .get("text")
                    .and_then(Value::as_str)
                    .map(|t| json!({"type": "text", "text": t})),
            })
            .collect(),
        _ => Vec::new(),
    }
}
