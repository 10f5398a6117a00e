//! Request-context extraction for observability.
//!
//! A pure summary of the inbound body: embedded file references, @-style
//! mentions, a crude token estimate, and message/tool counts. The output
//! is logged and never influences the request.

use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

static FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9_][A-Za-z0-9_.\-/]*\.[A-Za-z][A-Za-z0-9]{0,7}").unwrap()
});

static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([A-Za-z][A-Za-z0-9_\-]{1,63})").unwrap());

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+(\.\d+)+$").unwrap());

/// Summary of an inbound request body.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub file_references: Vec<String>,
    pub mentions: Vec<String>,
    /// bytes/4 heuristic; never used for control decisions.
    pub estimated_tokens: usize,
    pub tool_count: usize,
    pub message_count: usize,
}

/// Extract the context summary from a request body.
#[must_use]
pub fn extract(body: &Value) -> RequestContext {
    let mut text = String::new();
    collect_text(body.get("system"), &mut text);
    let messages = body.get("messages").and_then(Value::as_array);
    if let Some(messages) = messages {
        for message in messages {
            collect_text(message.get("content"), &mut text);
        }
    }

    let mut seen = HashSet::new();
    let mut file_references = Vec::new();
    for m in FILE_RE.find_iter(&text) {
        let candidate = m.as_str();
        if is_noise(candidate, &text, m.start()) {
            continue;
        }
        if seen.insert(candidate.to_string()) {
            file_references.push(candidate.to_string());
        }
    }

    let mut seen_mentions = HashSet::new();
    let mut mentions = Vec::new();
    for cap in MENTION_RE.captures_iter(&text) {
        let name = cap[1].to_string();
        if seen_mentions.insert(name.clone()) {
            mentions.push(name);
        }
    }

    RequestContext {
        file_references,
        mentions,
        estimated_tokens: text.len() / 4,
        tool_count: body
            .get("tools")
            .and_then(Value::as_array)
            .map_or(0, Vec::len),
        message_count: messages.map_or(0, Vec::len),
    }
}

/// Log the request summary at debug level.
pub fn log_request(body: &Value) {
    let ctx = extract(body);
    tracing::debug!(
        files = ctx.file_references.len(),
        mentions = ctx.mentions.len(),
        estimated_tokens = ctx.estimated_tokens,
        tools = ctx.tool_count,
        messages = ctx.message_count,
        "request context"
    );
}

/// Filter common false positives: URLs, package paths, bare versions.
fn is_noise(candidate: &str, text: &str, start: usize) -> bool {
    if VERSION_RE.is_match(candidate) {
        return true;
    }
    if candidate.contains("node_modules") || candidate.contains(".git") {
        return true;
    }
    // Matches rooted in a dot-directory start one past the dot.
    if text[..start].ends_with('.') {
        return true;
    }
    // Inside a URL when preceded by "://" shortly before the match.
    let prefix = &text[start.saturating_sub(12)..start];
    if prefix.contains("://") || prefix.ends_with("www.") {
        return true;
    }
    false
}

fn collect_text(value: Option<&Value>, out: &mut String) {
    match value {
        Some(Value::String(s)) => {
            out.push_str(s);
            out.push('\n');
        }
        Some(Value::Array(items)) => {
            for item in items {
                if let Some(text) = item.get("text").and_then(Value::as_str) {
                    out.push_str(text);
                    out.push('\n');
                }
            }
        }
        _ => {}
    }
}
