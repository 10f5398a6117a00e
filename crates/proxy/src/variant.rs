//! Client-facing model alias resolution.
//!
//! IDE clients send their own model names (Cursor-style aliases, dated
//! upstream ids, "-thinking" variants). The resolver maps each to an
//! upstream model plus a token budget and thinking configuration, and
//! always preserves the original string for echoing back in responses.

/// Default max_tokens for models resolved through the variant table or
/// the thinking heuristic.
pub const VARIANT_MAX_TOKENS: u32 = 64_000;

/// Default max_tokens for passthrough model names.
pub const PASSTHROUGH_MAX_TOKENS: u32 = 8_192;

/// Reasoning budget applied when a thinking variant does not name one.
pub const DEFAULT_THINKING_BUDGET: u32 = 16_000;

const SONNET: &str = "claude-sonnet-4-5";
const OPUS: &str = "claude-opus-4-5";
const HAIKU: &str = "claude-haiku-4-5";

/// A resolved model variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelVariant {
    /// Model id sent upstream.
    pub upstream_model: String,
    /// max_tokens applied to the upstream request.
    pub max_tokens: u32,
    /// Thinking budget, when extended thinking is enabled.
    pub thinking: Option<u32>,
    /// The unmodified client string, echoed in every response.
    pub original_model: String,
}

/// Alias table consulted before the heuristics. Lookup is case-insensitive.
const VARIANTS: &[(&str, &str, u32, Option<u32>)] = &[
    ("claude-sonnet-4-5", SONNET, VARIANT_MAX_TOKENS, None),
    (
        "claude-sonnet-4-5-thinking",
        SONNET,
        VARIANT_MAX_TOKENS,
        Some(DEFAULT_THINKING_BUDGET),
    ),
    ("claude-opus-4-5", OPUS, VARIANT_MAX_TOKENS, None),
    (
        "claude-opus-4-5-thinking",
        OPUS,
        VARIANT_MAX_TOKENS,
        Some(DEFAULT_THINKING_BUDGET),
    ),
    ("claude-haiku-4-5", HAIKU, VARIANT_MAX_TOKENS, None),
    ("claude-4.5-sonnet", SONNET, VARIANT_MAX_TOKENS, None),
    ("claude-4.5-opus", OPUS, VARIANT_MAX_TOKENS, None),
    ("claude-4.5-haiku", HAIKU, VARIANT_MAX_TOKENS, None),
];

/// Resolve a client model string.
///
/// Order: exact table match, "thinking" heuristic, `claude-` passthrough,
/// generic passthrough. The original string is returned untouched in
/// [`ModelVariant::original_model`] regardless of the path taken.
#[must_use]
pub fn resolve(model: &str) -> ModelVariant {
    let normalized = model.trim().to_lowercase();

    for (alias, upstream, max_tokens, thinking) in VARIANTS {
        if normalized == *alias {
            return ModelVariant {
                upstream_model: (*upstream).to_string(),
                max_tokens: *max_tokens,
                thinking: *thinking,
                original_model: model.to_string(),
            };
        }
    }

    if normalized.contains("thinking") {
        let upstream = if normalized.contains("opus") {
            OPUS
        } else if normalized.contains("haiku") {
            HAIKU
        } else {
            SONNET
        };
        return ModelVariant {
            upstream_model: upstream.to_string(),
            max_tokens: VARIANT_MAX_TOKENS,
            thinking: Some(DEFAULT_THINKING_BUDGET),
            original_model: model.to_string(),
        };
    }

    // Dated upstream ids and anything else pass through unchanged.
    ModelVariant {
        upstream_model: normalized.clone(),
        max_tokens: PASSTHROUGH_MAX_TOKENS,
        thinking: None,
        original_model: model.to_string(),
    }
}

/// Whether the name looks like a Claude-family model.
///
/// Substring matching is deliberate: exotic names containing "sonnet" are
/// accepted. Non-family models are refused with 404 so the client falls
/// back to its own default provider.
#[must_use]
pub fn is_claude_family(model: &str) -> bool {
    let m = model.trim().to_lowercase();
    ["claude", "sonnet", "opus", "haiku"]
        .iter()
        .any(|needle| m.contains(needle))
}
