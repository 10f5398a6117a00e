//! Two-tier cache for signed thinking blocks.
//!
//! The upstream requires that, when extended thinking is enabled, every
//! prior assistant message carries its original signed thinking block
//! verbatim. Clients routinely strip those blocks from history; this cache
//! re-attaches them, keyed by the message's non-thinking content.
//!
//! Tiers: a bounded in-process map (oldest-timestamp eviction) and an
//! optional remote key-value tier with per-entry TTL. The remote tier is
//! written fire-and-forget; its absence or failure degrades the gateway to
//! local-only operation and never fails a request.

pub mod key;

pub use key::content_key;

use bridge_types::{KvStore, now_ms};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Soft cap on local-tier entries.
pub const LOCAL_CAP: usize = 100;

/// Remote key namespace.
const REMOTE_PREFIX: &str = "thinking:";

/// Result of a cache injection pass over a message history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectReport {
    /// Messages that received a cached thinking block.
    pub injected: usize,
    /// Assistant messages left without any thinking block.
    pub missing: usize,
    /// True iff every assistant message now carries a thinking block.
    pub can_use_thinking: bool,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    block: Value,
    timestamp: u64,
}

/// The thinking-block cache.
pub struct ThinkingCache {
    local: Mutex<HashMap<String, CacheEntry>>,
    remote: Option<Arc<dyn KvStore>>,
    ttl_secs: u64,
    cap: usize,
}

impl ThinkingCache {
    /// Create a cache with an optional persistent tier and entry TTL.
    #[must_use]
    pub fn new(remote: Option<Arc<dyn KvStore>>, ttl: Duration) -> Self {
        Self {
            local: Mutex::new(HashMap::new()),
            remote,
            ttl_secs: ttl.as_secs(),
            cap: LOCAL_CAP,
        }
    }

    /// Whether a persistent tier is configured.
    #[must_use]
    pub fn has_persistent_tier(&self) -> bool {
        self.remote.is_some()
    }

    /// Number of entries currently in the local tier.
    #[must_use]
    pub fn local_len(&self) -> usize {
        self.local.lock().unwrap().len()
    }

    /// Look up a thinking block: local tier first, then the persistent
    /// tier (back-filling local on a remote hit).
    pub async fn get(&self, key: &str) -> Option<Value> {
        if let Some(entry) = self.local.lock().unwrap().get(key) {
            return Some(entry.block.clone());
        }
        let remote = self.remote.as_ref()?;
        match remote.get(&format!("{REMOTE_PREFIX}{key}")).await {
            Ok(Some(text)) => {
                let parsed: Value = serde_json::from_str(&text).ok()?;
                let block = parsed.get("thinking_block")?.clone();
                self.put_local(key, block.clone());
                Some(block)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("thinking cache remote read failed: {e}");
                None
            }
        }
    }

    /// Insert into the local tier, evicting the oldest entry over the cap.
    pub fn put_local(&self, key: &str, block: Value) {
        let mut local = self.local.lock().unwrap();
        local.insert(
            key.to_string(),
            CacheEntry {
                block,
                timestamp: now_ms(),
            },
        );
        while local.len() > self.cap {
            let oldest = local
                .iter()
                .min_by_key(|(_, e)| e.timestamp)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    local.remove(&k);
                }
                None => break,
            }
        }
    }

    /// Store a captured thinking block in both tiers.
    ///
    /// The persistent write runs in a detached task; failures are logged
    /// and never propagate to the caller.
    pub fn put(self: &Arc<Self>, key: String, block: Value) {
        self.put_local(&key, block.clone());
        let Some(remote) = self.remote.clone() else {
            return;
        };
        let ttl = self.ttl_secs;
        tokio::spawn(async move {
            let entry = json!({"thinking_block": block, "timestamp": now_ms()});
            let text = entry.to_string();
            if let Err(e) = remote
                .set_ex(&format!("{REMOTE_PREFIX}{key}"), &text, ttl)
                .await
            {
                tracing::warn!("thinking cache remote write failed: {e}");
            }
        });
    }

    /// Re-attach cached thinking blocks to a message history.
    ///
    /// For each assistant message that does not already contain a thinking
    /// block, look up its content key and prepend the cached block on a
    /// hit. This is the only path that adds thinking blocks to historical
    /// messages.
    pub async fn inject(&self, messages: &mut [Value]) -> InjectReport {
        let mut injected = 0;
        let mut missing = 0;
        for message in messages.iter_mut() {
            if message.get("role").and_then(Value::as_str) != Some("assistant") {
                continue;
            }
            let Some(content) = message.get("content") else {
                missing += 1;
                continue;
            };
            if has_thinking_block(content) {
                continue;
            }
            let Some(key) = content_key(content) else {
                missing += 1;
                continue;
            };
            match self.get(&key).await {
                Some(block) => {
                    prepend_block(message, block);
                    injected += 1;
                }
                None => missing += 1,
            }
        }
        InjectReport {
            injected,
            missing,
            can_use_thinking: missing == 0,
        }
    }
}

/// Whether a content value already carries a thinking block.
fn has_thinking_block(content: &Value) -> bool {
    content
        .as_array()
        .is_some_and(|blocks| {
            blocks.iter().any(|b| {
                matches!(
                    b.get("type").and_then(Value::as_str),
                    Some("thinking" | "redacted_thinking")
                )
            })
        })
}

/// Prepend a thinking block to an assistant message's content, promoting
/// string content to a block list first.
fn prepend_block(message: &mut Value, block: Value) {
    let content = message
        .get_mut("content")
        .expect("caller checked content presence");
    match content {
        Value::String(text) => {
            let text = std::mem::take(text);
            *content = json!([block, {"type": "text", "text": text}]);
        }
        Value::Array(blocks) => {
            blocks.insert(0, block);
        }
        _ => {}
    }
}
