//! Content block representations shared by the cache and translators.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A single block inside an Anthropic message's content array.
///
/// Unknown block types are not represented here; callers deserializing
/// loose JSON should skip elements that fail to parse rather than erroring,
/// so new upstream block kinds pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
        signature: String,
    },
    RedactedThinking {
        data: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: Value,
    },
}

impl ContentBlock {
    /// Whether this block is a thinking or redacted-thinking block.
    #[must_use]
    pub fn is_thinking(&self) -> bool {
        matches!(self, Self::Thinking { .. } | Self::RedactedThinking { .. })
    }
}

/// A signed reasoning artefact captured from an upstream event stream.
///
/// The signature is cryptographically opaque: it is stored and replayed
/// verbatim, never modified or re-ordered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThinkingBlock {
    pub thinking: String,
    pub signature: String,
}

impl ThinkingBlock {
    /// Render as an Anthropic `thinking` content block.
    #[must_use]
    pub fn to_block(&self) -> Value {
        json!({
            "type": "thinking",
            "thinking": self.thinking,
            "signature": self.signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_block_roundtrip() {
        let v = json!({"type": "text", "text": "hello"});
        let b: ContentBlock = serde_json::from_value(v.clone()).unwrap();
        assert_eq!(b, ContentBlock::Text { text: "hello".into() });
        assert_eq!(serde_json::to_value(&b).unwrap(), v);
    }

    #[test]
    fn test_thinking_detection() {
        let t: ContentBlock =
            serde_json::from_value(json!({"type": "thinking", "thinking": "…", "signature": "s"}))
                .unwrap();
        let r: ContentBlock =
            serde_json::from_value(json!({"type": "redacted_thinking", "data": "x"})).unwrap();
        let x: ContentBlock = serde_json::from_value(json!({"type": "text", "text": "t"})).unwrap();
        assert!(t.is_thinking());
        assert!(r.is_thinking());
        assert!(!x.is_thinking());
    }

    #[test]
    fn test_unknown_block_type_fails_parse() {
        // Callers rely on this to skip unknown kinds instead of erroring.
        let v = json!({"type": "server_tool_use", "id": "x"});
        assert!(serde_json::from_value::<ContentBlock>(v).is_err());
    }

    #[test]
    fn test_thinking_block_render() {
        let tb = ThinkingBlock {
            thinking: "chain".into(),
            signature: "sig".into(),
        };
        let v = tb.to_block();
        assert_eq!(v["type"], "thinking");
        assert_eq!(v["thinking"], "chain");
        assert_eq!(v["signature"], "sig");
    }
}
