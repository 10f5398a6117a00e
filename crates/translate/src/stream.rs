//! Stateful Anthropic event-stream to OpenAI chunk-stream converter.
//!
//! Upstream bytes arrive in arbitrary sizes; SSE frame boundaries do not
//! align with TCP packet boundaries. The converter buffers the trailing
//! partial line between feeds and only parses fully terminated lines, so
//! its output is identical for any byte-split of the same stream.

use crate::response::map_stop_reason;
use bridge_types::ThinkingBlock;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Accumulation state for one streamed tool call.
#[derive(Debug, Clone)]
struct ToolCallTracker {
    id: String,
    name: String,
    arguments: String,
    /// Position within the OpenAI `tool_calls` array.
    openai_index: usize,
}

/// Aggregated usage counters across the stream.
#[derive(Debug, Default, Clone, Copy)]
struct UsageTotals {
    input_tokens: u64,
    output_tokens: u64,
    cache_read_input_tokens: u64,
    cache_creation_input_tokens: u64,
}

/// Per-response converter state. Owned exclusively by one request handler;
/// never shared between connections.
pub struct StreamConverter {
    original_model: String,
    chunk_id: String,
    created: u64,
    line_buffer: Vec<u8>,
    tool_calls: HashMap<u64, ToolCallTracker>,
    next_tool_index: usize,
    usage: UsageTotals,
    stop_reason: Option<String>,
    in_thinking: bool,
    thinking: ThinkingBlock,
    captured_thinking: Option<ThinkingBlock>,
    text: String,
    done: bool,
}

impl StreamConverter {
    /// Create a converter that echoes `original_model` in every chunk.
    ///
    /// The client's own context-window accounting keys on the model string
    /// it sent, so the upstream's resolved name is never surfaced.
    #[must_use]
    pub fn new(original_model: &str) -> Self {
        Self {
            original_model: original_model.to_string(),
            chunk_id: "chatcmpl-unknown".to_string(),
            created: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            line_buffer: Vec::new(),
            tool_calls: HashMap::new(),
            next_tool_index: 0,
            usage: UsageTotals::default(),
            stop_reason: None,
            in_thinking: false,
            thinking: ThinkingBlock::default(),
            captured_thinking: None,
            text: String::new(),
            done: false,
        }
    }

    /// Feed a chunk of upstream bytes, returning zero or more SSE frames
    /// (`data: <json>\n\n`, terminally `data: [DONE]\n\n`) to forward.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        self.line_buffer.extend_from_slice(bytes);
        while let Some(pos) = self.line_buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.line_buffer.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            let line = text.trim_end_matches(['\n', '\r']);
            self.process_line(line, &mut out);
        }
        out
    }

    /// Whether the upstream signalled a clean end of message.
    #[must_use]
    pub fn finished(&self) -> bool {
        self.done
    }

    /// The thinking block captured from this stream, if any.
    #[must_use]
    pub fn captured_thinking(&self) -> Option<&ThinkingBlock> {
        self.captured_thinking.as_ref()
    }

    /// All plain text emitted so far, concatenated.
    #[must_use]
    pub fn accumulated_text(&self) -> &str {
        &self.text
    }

    /// The canonical non-thinking content of the streamed response: one
    /// text block (when text was produced) followed by completed tool_use
    /// blocks. This is what the thinking cache keys on.
    #[must_use]
    pub fn canonical_content(&self) -> Value {
        let mut blocks: Vec<Value> = Vec::new();
        if !self.text.is_empty() {
            blocks.push(json!({"type": "text", "text": self.text}));
        }
        let mut trackers: Vec<&ToolCallTracker> = self.tool_calls.values().collect();
        trackers.sort_by_key(|t| t.openai_index);
        for tracker in trackers {
            let input: Value =
                serde_json::from_str(&tracker.arguments).unwrap_or_else(|_| json!({}));
            blocks.push(json!({
                "type": "tool_use",
                "id": tracker.id,
                "name": tracker.name,
                "input": input,
            }));
        }
        Value::Array(blocks)
    }

    fn process_line(&mut self, line: &str, out: &mut Vec<String>) {
        if self.done {
            return;
        }
        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        let data = data.trim();
        if data.is_empty() || data == "[DONE]" {
            return;
        }
        match serde_json::from_str::<Value>(data) {
            Ok(event) => self.handle_event(&event, out),
            Err(_) => tracing::debug!("ignoring unparseable stream line"),
        }
    }

    fn handle_event(&mut self, event: &Value, out: &mut Vec<String>) {
        let kind = event.get("type").and_then(Value::as_str).unwrap_or("");
        match kind {
            "message_start" => self.on_message_start(event, out),
            "content_block_start" => self.on_block_start(event, out),
            "content_block_delta" => self.on_block_delta(event, out),
            "content_block_stop" => self.on_block_stop(event),
            "message_delta" => self.on_message_delta(event, out),
            "message_stop" => self.on_message_stop(out),
            // ping and any future event kinds pass silently.
            _ => {}
        }
    }

    fn on_message_start(&mut self, event: &Value, out: &mut Vec<String>) {
        let message = event.get("message").unwrap_or(&Value::Null);
        if let Some(id) = message.get("id").and_then(Value::as_str) {
            let short = id.strip_prefix("msg_").unwrap_or(id);
            self.chunk_id = format!("chatcmpl-{short}");
        }
        self.accumulate_usage(message.get("usage"));
        self.emit(out, json!({"role": "assistant", "content": ""}), None);
    }

    fn on_block_start(&mut self, event: &Value, out: &mut Vec<String>) {
        let index = event.get("index").and_then(Value::as_u64).unwrap_or(0);
        let block = event.get("content_block").unwrap_or(&Value::Null);
        match block.get("type").and_then(Value::as_str).unwrap_or("") {
            "tool_use" => {
                let id = block.get("id").and_then(Value::as_str).unwrap_or("");
                let name = block.get("name").and_then(Value::as_str).unwrap_or("");
                let openai_index = self.next_tool_index;
                self.next_tool_index += 1;
                self.tool_calls.insert(
                    index,
                    ToolCallTracker {
                        id: id.to_string(),
                        name: name.to_string(),
                        arguments: String::new(),
                        openai_index,
                    },
                );
                self.emit(
                    out,
                    json!({"tool_calls": [{
                        "index": openai_index,
                        "id": id,
                        "type": "function",
                        "function": {"name": name, "arguments": ""},
                    }]}),
                    None,
                );
            }
            "thinking" | "redacted_thinking" => {
                self.in_thinking = true;
                self.thinking = ThinkingBlock {
                    thinking: block
                        .get("thinking")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string(),
                    signature: block
                        .get("signature")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string(),
                };
            }
            // text blocks produce output only as deltas arrive
            _ => {}
        }
    }

    fn on_block_delta(&mut self, event: &Value, out: &mut Vec<String>) {
        let index = event.get("index").and_then(Value::as_u64).unwrap_or(0);
        let delta = event.get("delta").unwrap_or(&Value::Null);
        match delta.get("type").and_then(Value::as_str).unwrap_or("") {
            "text_delta" => {
                if let Some(text) = delta.get("text").and_then(Value::as_str) {
                    self.text.push_str(text);
                    self.emit(out, json!({"content": text}), None);
                }
            }
            "thinking_delta" => {
                if let Some(part) = delta.get("thinking").and_then(Value::as_str) {
                    self.thinking.thinking.push_str(part);
                }
            }
            "signature_delta" => {
                if let Some(part) = delta.get("signature").and_then(Value::as_str) {
                    self.thinking.signature.push_str(part);
                }
            }
            "input_json_delta" => {
                if let Some(partial) = delta.get("partial_json").and_then(Value::as_str) {
                    self.on_tool_arguments(index, partial, out);
                }
            }
            _ => {}
        }
    }

    /// Upstream sometimes sends cumulative `partial_json` (each fragment a
    /// prefix-extending superset of the last) and sometimes pure deltas.
    /// A fragment that begins with the accumulated arguments is cumulative
    /// and only its suffix is emitted; anything else is a delta, appended
    /// and emitted verbatim.
    fn on_tool_arguments(&mut self, index: u64, partial: &str, out: &mut Vec<String>) {
        let Some(tracker) = self.tool_calls.get_mut(&index) else {
            return;
        };
        let new_part = if partial.starts_with(tracker.arguments.as_str()) {
            let suffix = partial[tracker.arguments.len()..].to_string();
            tracker.arguments = partial.to_string();
            suffix
        } else {
            tracker.arguments.push_str(partial);
            partial.to_string()
        };
        if new_part.is_empty() {
            return;
        }
        let openai_index = tracker.openai_index;
        self.emit(
            out,
            json!({"tool_calls": [{
                "index": openai_index,
                "function": {"arguments": new_part},
            }]}),
            None,
        );
    }

    fn on_block_stop(&mut self, event: &Value) {
        if !self.in_thinking {
            return;
        }
        // A final signature may ride on the stop event.
        if let Some(signature) = event
            .get("content_block")
            .and_then(|b| b.get("signature"))
            .and_then(Value::as_str)
            && self.thinking.signature.is_empty()
        {
            self.thinking.signature = signature.to_string();
        }
        self.in_thinking = false;
        if !self.thinking.thinking.is_empty() {
            self.captured_thinking = Some(std::mem::take(&mut self.thinking));
        } else {
            self.thinking = ThinkingBlock::default();
        }
    }

    fn on_message_delta(&mut self, event: &Value, out: &mut Vec<String>) {
        self.accumulate_usage(event.get("usage"));
        if let Some(stop) = event
            .get("delta")
            .and_then(|d| d.get("stop_reason"))
            .and_then(Value::as_str)
        {
            self.stop_reason = Some(stop.to_string());
            self.emit(out, json!({}), Some(map_stop_reason(Some(stop))));
        }
    }

    fn on_message_stop(&mut self, out: &mut Vec<String>) {
        if self.usage.input_tokens + self.usage.output_tokens > 0 {
            let mut chunk = self.base_chunk();
            chunk["usage"] = json!({
                "prompt_tokens": self.usage.input_tokens,
                "completion_tokens": self.usage.output_tokens,
                "total_tokens": self.usage.input_tokens + self.usage.output_tokens,
                "prompt_tokens_details": {
                    "cached_tokens": self.usage.cache_read_input_tokens,
                },
                "completion_tokens_details": {
                    "reasoning_tokens": 0,
                },
            });
            out.push(frame(&chunk));
        }
        out.push("data: [DONE]\n\n".to_string());
        self.done = true;
    }

    fn accumulate_usage(&mut self, usage: Option<&Value>) {
        let Some(usage) = usage else { return };
        let fields: [(&str, &mut u64); 4] = [
            ("input_tokens", &mut self.usage.input_tokens),
            ("output_tokens", &mut self.usage.output_tokens),
            (
                "cache_read_input_tokens",
                &mut self.usage.cache_read_input_tokens,
            ),
            (
                "cache_creation_input_tokens",
                &mut self.usage.cache_creation_input_tokens,
            ),
        ];
        for (name, slot) in fields {
            if let Some(v) = usage.get(name).and_then(Value::as_u64) {
                *slot = v;
            }
        }
    }

    fn base_chunk(&self) -> Value {
        json!({
            "id": self.chunk_id,
            "object": "chat.completion.chunk",
            "created": self.created,
            "model": self.original_model,
            "choices": [{"index": 0, "delta": {}, "finish_reason": Value::Null}],
        })
    }

    fn emit(&self, out: &mut Vec<String>, delta: Value, finish_reason: Option<&str>) {
        let mut chunk = self.base_chunk();
        chunk["choices"][0]["delta"] = delta;
        if let Some(reason) = finish_reason {
            chunk["choices"][0]["finish_reason"] = json!(reason);
        }
        out.push(frame(&chunk));
    }
}

fn frame(chunk: &Value) -> String {
    format!("data: {chunk}\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The upstream stream from the text-only end-to-end scenario.
    fn text_stream() -> String {
        [
            r#"data: {"type":"message_start","message":{"id":"msg_AAA","model":"claude-sonnet-4-5","usage":{"input_tokens":10,"cache_read_input_tokens":4}}}"#,
            r#"data: {"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hel"}}"#,
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"lo"}}"#,
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"!"}}"#,
            r#"data: {"type":"content_block_stop","index":0}"#,
            r#"data: {"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":3}}"#,
            r#"data: {"type":"message_stop"}"#,
            "",
        ]
        .join("\n")
    }

    fn parse_frames(frames: &[String]) -> Vec<Value> {
        frames
            .iter()
            .filter(|f| !f.contains("[DONE]"))
            .map(|f| {
                serde_json::from_str(f.strip_prefix("data: ").unwrap().trim_end()).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_text_only_scenario() {
        let mut conv = StreamConverter::new("claude-4-sonnet-high");
        let frames = conv.feed(text_stream().as_bytes());
        assert!(conv.finished());

        let last = frames.last().unwrap();
        assert_eq!(last, "data: [DONE]\n\n");

        let chunks = parse_frames(&frames);
        // opening + 3 text + finish + usage
        assert_eq!(chunks.len(), 6);

        let opening = &chunks[0];
        assert_eq!(opening["id"], "chatcmpl-AAA");
        assert_eq!(opening["model"], "claude-4-sonnet-high");
        assert_eq!(opening["choices"][0]["delta"]["role"], "assistant");
        assert_eq!(opening["choices"][0]["delta"]["content"], "");

        let texts: Vec<&str> = chunks[1..4]
            .iter()
            .map(|c| c["choices"][0]["delta"]["content"].as_str().unwrap())
            .collect();
        assert_eq!(texts, vec!["Hel", "lo", "!"]);

        let finish = &chunks[4];
        assert_eq!(finish["choices"][0]["finish_reason"], "stop");
        assert_eq!(finish["choices"][0]["delta"], json!({}));

        let usage = &chunks[5]["usage"];
        assert_eq!(usage["prompt_tokens"], 10);
        assert_eq!(usage["completion_tokens"], 3);
        assert_eq!(usage["total_tokens"], 13);
        assert_eq!(usage["prompt_tokens_details"]["cached_tokens"], 4);
        assert_eq!(usage["completion_tokens_details"]["reasoning_tokens"], 0);
        assert_eq!(chunks[5]["choices"][0]["finish_reason"], Value::Null);
    }

    #[test]
    fn test_chunk_boundary_independence() {
        let stream = text_stream();
        let mut whole = StreamConverter::new("m");
        let expected: String = whole.feed(stream.as_bytes()).concat();

        // Byte-at-a-time.
        let mut conv = StreamConverter::new("m");
        let mut output = String::new();
        for byte in stream.as_bytes() {
            output.push_str(&conv.feed(std::slice::from_ref(byte)).concat());
        }
        assert_eq!(output, expected);

        // A few arbitrary split points.
        for split in [1, 7, 40, 100, stream.len() - 2] {
            let mut conv = StreamConverter::new("m");
            let mut output = String::new();
            output.push_str(&conv.feed(&stream.as_bytes()[..split]).concat());
            output.push_str(&conv.feed(&stream.as_bytes()[split..]).concat());
            assert_eq!(output, expected, "split at {split}");
        }
    }

    #[test]
    fn test_model_echo_on_every_chunk() {
        let mut conv = StreamConverter::new("cursor-alias");
        let frames = conv.feed(text_stream().as_bytes());
        for chunk in parse_frames(&frames) {
            assert_eq!(chunk["model"], "cursor-alias");
        }
    }

    #[test]
    fn test_done_exactly_once_and_last() {
        let mut conv = StreamConverter::new("m");
        let mut frames = conv.feed(text_stream().as_bytes());
        // Trailing garbage after message_stop must not re-open the stream.
        frames.extend(conv.feed(b"data: {\"type\":\"message_stop\"}\n"));
        let done_count = frames.iter().filter(|f| f.contains("[DONE]")).count();
        assert_eq!(done_count, 1);
        assert!(frames.last().unwrap().contains("[DONE]"));
    }

    #[test]
    fn test_usage_chunk_precedes_done() {
        let mut conv = StreamConverter::new("m");
        let frames = conv.feed(text_stream().as_bytes());
        let usage_pos = frames.iter().position(|f| f.contains("usage")).unwrap();
        let done_pos = frames.iter().position(|f| f.contains("[DONE]")).unwrap();
        assert!(usage_pos < done_pos);
    }

    #[test]
    fn test_cumulative_partial_json_scenario() {
        let mut conv = StreamConverter::new("m");
        let stream = [
            r#"data: {"type":"message_start","message":{"id":"msg_T","usage":{"input_tokens":1}}}"#,
            r#"data: {"type":"content_block_start","index":0,"content_block":{"type":"tool_use","id":"tu_1","name":"search"}}"#,
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{\"q\""}}"#,
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{\"q\":\"fo"}}"#,
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{\"q\":\"foo\"}"}}"#,
            "",
        ]
        .join("\n");
        let frames = conv.feed(stream.as_bytes());
        let chunks = parse_frames(&frames);

        let args: Vec<String> = chunks
            .iter()
            .filter_map(|c| {
                c["choices"][0]["delta"]["tool_calls"][0]["function"]["arguments"]
                    .as_str()
                    .map(str::to_string)
            })
            .collect();
        assert_eq!(args, vec!["", "{\"q\"", ":\"fo", "o\"}"]);

        // Start chunk carries identity.
        let start = &chunks[1]["choices"][0]["delta"]["tool_calls"][0];
        assert_eq!(start["id"], "tu_1");
        assert_eq!(start["type"], "function");
        assert_eq!(start["function"]["name"], "search");
    }

    #[test]
    fn test_pure_delta_arguments_concatenate() {
        let mut conv = StreamConverter::new("m");
        let stream = [
            r#"data: {"type":"content_block_start","index":0,"content_block":{"type":"tool_use","id":"tu_1","name":"f"}}"#,
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{\"a\":"}}"#,
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"1}"}}"#,
            "",
        ]
        .join("\n");
        let frames = conv.feed(stream.as_bytes());
        let chunks = parse_frames(&frames);
        let emitted: String = chunks
            .iter()
            .filter_map(|c| {
                c["choices"][0]["delta"]["tool_calls"][0]["function"]["arguments"].as_str()
            })
            .collect();
        assert_eq!(emitted, "{\"a\":1}");
        assert_eq!(conv.tool_calls[&0].arguments, "{\"a\":1}");
    }

    #[test]
    fn test_truncated_stream_emits_no_done() {
        let mut conv = StreamConverter::new("m");
        let stream = [
            r#"data: {"type":"message_start","message":{"id":"msg_T"}}"#,
            r#"data: {"type":"content_block_start","index":0,"content_block":{"type":"tool_use","id":"tu_1","name":"f"}}"#,
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{\"a\""}}"#,
            "",
        ]
        .join("\n");
        let frames = conv.feed(stream.as_bytes());
        assert!(!conv.finished());
        assert!(!frames.iter().any(|f| f.contains("[DONE]")));
        assert!(!frames.iter().any(|f| f.contains("tool_calls\":null")));
        // No finish_reason was forged.
        for chunk in parse_frames(&frames) {
            assert_eq!(chunk["choices"][0]["finish_reason"], Value::Null);
        }
    }

    #[test]
    fn test_thinking_blocks_invisible_and_captured() {
        let mut conv = StreamConverter::new("m");
        let stream = [
            r#"data: {"type":"message_start","message":{"id":"msg_TH","usage":{"input_tokens":5}}}"#,
            r#"data: {"type":"content_block_start","index":0,"content_block":{"type":"thinking","thinking":"","signature":""}}"#,
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"thinking_delta","thinking":"step one"}}"#,
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"signature_delta","signature":"c2ln"}}"#,
            r#"data: {"type":"content_block_stop","index":0}"#,
            r#"data: {"type":"content_block_start","index":1,"content_block":{"type":"text","text":""}}"#,
            r#"data: {"type":"content_block_delta","index":1,"delta":{"type":"text_delta","text":"Answer"}}"#,
            r#"data: {"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":2}}"#,
            r#"data: {"type":"message_stop"}"#,
            "",
        ]
        .join("\n");
        let frames = conv.feed(stream.as_bytes());

        for frame in &frames {
            assert!(!frame.contains("step one"), "thinking leaked to client");
            assert!(!frame.contains("c2ln"), "signature leaked to client");
        }

        let captured = conv.captured_thinking().unwrap();
        assert_eq!(captured.thinking, "step one");
        assert_eq!(captured.signature, "c2ln");
        assert_eq!(conv.accumulated_text(), "Answer");
    }

    #[test]
    fn test_canonical_content_shape() {
        let mut conv = StreamConverter::new("m");
        let stream = [
            r#"data: {"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Check"}}"#,
            r#"data: {"type":"content_block_start","index":1,"content_block":{"type":"tool_use","id":"tu_9","name":"lookup"}}"#,
            r#"data: {"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{\"k\":\"v\"}"}}"#,
            "",
        ]
        .join("\n");
        let _ = conv.feed(stream.as_bytes());
        let content = conv.canonical_content();
        let blocks = content.as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], json!({"type": "text", "text": "Check"}));
        assert_eq!(blocks[1]["type"], "tool_use");
        assert_eq!(blocks[1]["input"], json!({"k": "v"}));
    }

    #[test]
    fn test_tool_use_finish_reason_mapping() {
        let mut conv = StreamConverter::new("m");
        let stream = [
            r#"data: {"type":"message_delta","delta":{"stop_reason":"tool_use"}}"#,
            "",
        ]
        .join("\n");
        let frames = conv.feed(stream.as_bytes());
        let chunks = parse_frames(&frames);
        assert_eq!(chunks[0]["choices"][0]["finish_reason"], "tool_calls");
    }

    #[test]
    fn test_unmapped_stop_reason_passes_through() {
        let mut conv = StreamConverter::new("m");
        let frames = conv.feed(
            b"data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"max_tokens\"}}\n",
        );
        let chunks = parse_frames(&frames);
        assert_eq!(chunks[0]["choices"][0]["finish_reason"], "max_tokens");
    }

    #[test]
    fn test_unknown_events_ignored() {
        let mut conv = StreamConverter::new("m");
        let frames = conv.feed(
            b"data: {\"type\":\"ping\"}\ndata: {\"type\":\"brand_new_event\",\"x\":1}\nevent: message_start\n: comment\n\n",
        );
        assert!(frames.is_empty());
    }

    #[test]
    fn test_no_usage_no_usage_chunk() {
        let mut conv = StreamConverter::new("m");
        let frames = conv.feed(b"data: {\"type\":\"message_stop\"}\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], "data: [DONE]\n\n");
    }

    #[test]
    fn test_multibyte_text_survives_byte_splits() {
        let stream = format!(
            "{}\n{}\n",
            r#"data: {"type":"content_block_start","index":0,"content_block":{"type":"text"}}"#,
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"héllo — ☃"}}"#,
        );
        let mut whole = StreamConverter::new("m");
        let expected = whole.feed(stream.as_bytes()).concat();
        let mut split = StreamConverter::new("m");
        let mut output = String::new();
        for byte in stream.as_bytes() {
            output.push_str(&split.feed(std::slice::from_ref(byte)).concat());
        }
        assert_eq!(output, expected);
        assert!(expected.contains("héllo"));
    }
}
