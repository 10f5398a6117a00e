//! Content-derived cache keys.
//!
//! A key is a pure function of the non-thinking content of an assistant
//! message, so a message hashes the same before and after a client strips
//! its thinking blocks. The length suffix reduces collisions on short
//! inputs.

use bridge_types::ContentBlock;
use serde_json::{Map, Value};

/// Derive the cache key for an assistant message's content.
///
/// Returns `None` when the content has no keyable material (empty string,
/// empty block list, or only thinking blocks).
#[must_use]
pub fn content_key(content: &Value) -> Option<String> {
    let projected = project(content)?;
    let normalized = normalize(&projected);
    if normalized.is_empty() {
        return None;
    }
    let hash = hash32(&normalized);
    Some(format!(
        "v2:{}:{}",
        hash.unsigned_abs(),
        normalized.chars().count()
    ))
}

/// Project content to its keyable text, skipping thinking blocks.
///
/// Blocks that do not parse as a known [`ContentBlock`] kind are skipped,
/// so new upstream block types leave existing keys untouched.
fn project(content: &Value) -> Option<String> {
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(blocks) => {
            let mut parts: Vec<String> = Vec::new();
            for block in blocks {
                let Ok(parsed) = serde_json::from_value::<ContentBlock>(block.clone()) else {
                    continue;
                };
                match parsed {
                    b if b.is_thinking() => {}
                    ContentBlock::Text { text } => parts.push(text),
                    ContentBlock::ToolUse { name, input, .. } => {
                        parts.push(format!("tool:{name}:{}", stable_json(&input)));
                    }
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                    } => {
                        parts.push(format!("result:{tool_use_id}:{}", value_as_text(&content)));
                    }
                    _ => {}
                }
            }
            Some(parts.join("|"))
        }
        _ => None,
    }
}

/// Collapse whitespace runs to single spaces and trim.
fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Serialise a value with recursively sorted object keys.
///
/// Key order must not depend on producer insertion order, or the same
/// tool input would hash differently between turns.
fn stable_json(value: &Value) -> String {
    sort_value(value).to_string()
}

fn sort_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), sort_value(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_value).collect()),
        other => other.clone(),
    }
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => stable_json(other),
    }
}

/// Deterministic signed 32-bit rolling hash (31-multiplier).
fn hash32(s: &str) -> i32 {
    let mut hash: i32 = 0;
    for c in s.chars() {
        hash = hash.wrapping_mul(31).wrapping_add(c as i32);
    }
    hash
}
