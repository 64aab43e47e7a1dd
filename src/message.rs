//! Wire-level Agent Message and Content Block types.
//!
//! Every line the Agent CLI writes to stdout (once parsed as JSON) is one of
//! the variants of [`Message`], discriminated by the top-level `type` field.
//! Content blocks inside assistant/user messages are tagged the same way.
//!
//! This module is stateless: it only defines the shapes and a handful of
//! accessor methods. Framing (reading lines, writing lines) lives in
//! `transport`; request/response correlation lives in `control`.

use serde::{Deserialize, Serialize};

/// Every message emitted by the Agent CLI on its stdout stream, discriminated
/// by the JSON `type` field.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Echo of a user turn (tool results fed back to the model, or a verbatim
    /// echo of what the SDK sent).
    User(UserMessage),
    /// The model's response for one turn.
    Assistant(AssistantMessage),
    /// Session lifecycle / bookkeeping message, further tagged by `subtype`.
    System(SystemMessage),
    /// Terminal message for a query; no further Agent Messages follow for
    /// that turn once this has been observed.
    Result(ResultMessage),
    /// Incremental delta, only emitted when the caller opted into
    /// `--include-partial-messages`.
    StreamEvent(StreamEventMessage),
    /// Any `type` this codec doesn't recognise. Logged and dropped by the
    /// session runtime rather than aborting the stream.
    #[serde(other)]
    Unknown,
}

impl Message {
    /// The session id this message belongs to, if it carries one.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Message::User(m) => m.session_id.as_deref(),
            Message::Assistant(m) => m.session_id.as_deref(),
            Message::System(m) => Some(&m.session_id),
            Message::Result(m) => Some(m.session_id()),
            Message::StreamEvent(m) => Some(&m.session_id),
            Message::Unknown => None,
        }
    }

    /// `Some(&ResultMessage)` if this is the terminal result message.
    pub fn as_result(&self) -> Option<&ResultMessage> {
        match self {
            Message::Result(r) => Some(r),
            _ => None,
        }
    }

    /// Whether this message terminates the current turn's stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Message::Result(_))
    }
}

// --- User messages ---------------------------------------------------------

/// `type = "user"` — typically a tool-result payload echoed back, or the
/// SDK's own outbound user turn as observed on replay/resume.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserMessage {
    pub message: UserContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_tool_use_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserContent {
    pub role: String,
    pub content: UserContentValue,
}

/// User content is either a plain string (the common case when the SDK sends
/// a turn) or a list of content blocks (tool results fed back to the model).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum UserContentValue {
    Text(String),
    Blocks(Vec<UserContentBlock>),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserContentBlock {
    Text {
        text: String,
    },
    ToolResult {
        tool_use_id: String,
        content: ToolResultContent,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

// --- Assistant messages -----------------------------------------------------

/// `type = "assistant"` — the model's response for one turn.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantMessage {
    pub message: AssistantContent,
    /// Set when this turn belongs to a sub-agent spawned by the `Task` tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_tool_use_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantContent {
    pub content: Vec<ContentBlock>,
    pub model: String,
}

/// A single unit of content within an assistant or tool-result message.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: ToolResultContent,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

// --- System messages ---------------------------------------------------------

/// `type = "system"` — further distinguished by `subtype`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemMessage {
    pub session_id: String,
    #[serde(flatten)]
    pub payload: SystemPayload,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum SystemPayload {
    /// First message on a session: model, tool list, MCP server statuses.
    Init(SystemInit),
    /// Auto/manual context compaction boundary.
    CompactBoundary(CompactBoundary),
    /// Anything this codec doesn't recognise yet.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemInit {
    pub model: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub mcp_servers: Vec<McpServerStatus>,
    #[serde(default)]
    pub permission_mode: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub agents: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct McpServerStatus {
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompactBoundary {
    pub pre_tokens: u64,
    pub post_tokens: u64,
}

// --- Result messages -----------------------------------------------------

/// `type = "result"` — the terminal message in every query stream.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum ResultMessage {
    Success(ResultPayload),
    Error(ResultPayload),
    Partial(ResultPayload),
}

impl ResultMessage {
    pub fn payload(&self) -> &ResultPayload {
        match self {
            ResultMessage::Success(p) | ResultMessage::Error(p) | ResultMessage::Partial(p) => p,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.payload().session_id
    }

    /// Whether this result represents an agent-level error outcome. This is
    /// distinct from a transport/protocol failure: the protocol was healthy,
    /// the run itself ended in error.
    pub fn is_error(&self) -> bool {
        !matches!(self, ResultMessage::Success(_))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResultPayload {
    pub session_id: String,
    pub duration_ms: u64,
    pub duration_api_ms: u64,
    pub num_turns: u32,
    pub total_cost_usd: f64,
    pub usage: ResultUsage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResultUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Total context tokens used so far, including cached reads.
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_creation_input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u64>,
}

// --- Stream events -----------------------------------------------------

/// `type = "stream_event"` — a partial delta, only sent when
/// `--include-partial-messages` is set. The SDK doesn't interpret the
/// delta's inner shape; it forwards it to the caller verbatim.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamEventMessage {
    pub uuid: String,
    pub session_id: String,
    pub event: serde_json::Value,
}

// --- Outbound user turn -----------------------------------------------------

/// The SDK→CLI `"user"` frame used to send a prompt in interactive mode.
/// Distinct from [`UserMessage`] (CLI→SDK echo) because the SDK only ever
/// needs to construct, not parse, its own outbound turn.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundUserFrame {
    #[serde(rename = "type")]
    pub frame_type: &'static str,
    pub message: OutboundUserContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_tool_use_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundUserContent {
    pub role: &'static str,
    pub content: String,
}

impl OutboundUserFrame {
    pub fn new(content: impl Into<String>, session_id: Option<String>) -> Self {
        OutboundUserFrame {
            frame_type: "user",
            message: OutboundUserContent {
                role: "user",
                content: content.into(),
            },
            parent_tool_use_id: None,
            session_id,
        }
    }
}

/// Parse one non-blank inbound line into a [`Message`].
///
/// Blank lines must be filtered out by the caller before reaching this
/// function.
pub fn decode_line(line: &str) -> crate::error::Result<Message> {
    serde_json::from_str(line).map_err(|_| crate::error::Error::malformed_frame(line))
}

/// Serialize an outbound value to a single NDJSON line (no trailing newline;
/// the transport is responsible for framing).
pub fn encode_line<T: Serialize>(value: &T) -> crate::error::Result<String> {
    Ok(serde_json::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_system_init() {
        let line = r#"{"type":"system","subtype":"init","session_id":"s1","model":"m","tools":[]}"#;
        let msg = decode_line(line).unwrap();
        match msg {
            Message::System(sys) => {
                assert_eq!(sys.session_id, "s1");
                match sys.payload {
                    SystemPayload::Init(init) => assert_eq!(init.model, "m"),
                    other => panic!("expected init, got {other:?}"),
                }
            }
            other => panic!("expected system message, got {other:?}"),
        }
    }

    #[test]
    fn decodes_assistant_text() {
        let line = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"Hi!"}],"model":"m"},"session_id":"s1"}"#;
        let msg = decode_line(line).unwrap();
        let Message::Assistant(a) = msg else {
            panic!("expected assistant message");
        };
        assert_eq!(a.message.content.len(), 1);
        match &a.message.content[0] {
            ContentBlock::Text { text } => assert_eq!(text, "Hi!"),
            other => panic!("expected text block, got {other:?}"),
        }
    }

    #[test]
    fn decodes_result_success() {
        let line = r#"{"type":"result","subtype":"success","session_id":"s1","duration_ms":100,"duration_api_ms":80,"num_turns":1,"total_cost_usd":0.001,"usage":{"input_tokens":1,"output_tokens":2}}"#;
        let msg = decode_line(line).unwrap();
        let Message::Result(r) = msg else {
            panic!("expected result message");
        };
        assert!(!r.is_error());
        assert_eq!(r.session_id(), "s1");
        assert!(msg.is_terminal());
    }

    #[test]
    fn unknown_type_decodes_to_unknown_variant() {
        let line = r#"{"type":"something_new","foo":"bar"}"#;
        let msg = decode_line(line).unwrap();
        assert!(matches!(msg, Message::Unknown));
    }

    #[test]
    fn unknown_system_subtype_decodes_to_unknown_payload() {
        let line = r#"{"type":"system","subtype":"future_thing","session_id":"s1"}"#;
        let msg = decode_line(line).unwrap();
        let Message::System(sys) = msg else {
            panic!("expected system message");
        };
        assert!(matches!(sys.payload, SystemPayload::Unknown));
    }

    #[test]
    fn malformed_json_is_malformed_frame() {
        let err = decode_line("{not json}").unwrap_err();
        assert!(matches!(err, crate::error::Error::MalformedFrame { .. }));
    }

    #[test]
    fn round_trips_outbound_user_frame() {
        let frame = OutboundUserFrame::new("hello", Some("s1".to_string()));
        let encoded = encode_line(&frame).unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["type"], "user");
        assert_eq!(value["message"]["content"], "hello");
        assert_eq!(value["session_id"], "s1");
    }
}
