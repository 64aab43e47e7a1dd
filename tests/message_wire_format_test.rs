//! Wire-format tests against the public `Message` type, covering the
//! sample JSON shapes from the Agent CLI's own protocol documentation.

use open_agent_protocol::{ContentBlock, Message};

#[test]
fn decodes_assistant_message_without_session_id() {
    let line = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hi"}],"model":"claude-sonnet"}}"#;
    let message: Message = serde_json::from_str(line).unwrap();
    match message {
        Message::Assistant(assistant) => {
            assert_eq!(assistant.message.model, "claude-sonnet");
            assert!(assistant.session_id.is_none());
            match &assistant.message.content[0] {
                ContentBlock::Text { text } => assert_eq!(text, "hi"),
                other => panic!("unexpected block: {other:?}"),
            }
        }
        other => panic!("expected assistant message, got {other:?}"),
    }
}

#[test]
fn decodes_user_message_with_optional_session_id() {
    let line = r#"{"type":"user","message":{"role":"user","content":"hello"},"session_id":"sess-1"}"#;
    let message: Message = serde_json::from_str(line).unwrap();
    assert_eq!(message.session_id(), Some("sess-1"));
}

#[test]
fn result_message_reports_terminal_and_session_id() {
    let line = r#"{"type":"result","subtype":"success","session_id":"sess-1","duration_ms":100,"duration_api_ms":80,"num_turns":1,"total_cost_usd":0.01,"usage":{"input_tokens":10,"output_tokens":5}}"#;
    let message: Message = serde_json::from_str(line).unwrap();
    assert!(message.is_terminal());
    let result = message.as_result().unwrap();
    assert!(!result.is_error());
    assert_eq!(result.session_id(), "sess-1");
}

#[test]
fn result_error_subtype_is_error() {
    let line = r#"{"type":"result","subtype":"error","session_id":"sess-1","duration_ms":100,"duration_api_ms":80,"num_turns":1,"total_cost_usd":0.0,"usage":{"input_tokens":0,"output_tokens":0}}"#;
    let message: Message = serde_json::from_str(line).unwrap();
    assert!(message.as_result().unwrap().is_error());
}

#[test]
fn unrecognised_type_decodes_to_unknown_without_erroring() {
    let line = r#"{"type":"some_future_message_kind","payload":{}}"#;
    let message: Message = serde_json::from_str(line).unwrap();
    assert!(matches!(message, Message::Unknown));
    assert_eq!(message.session_id(), None);
}

#[test]
fn tool_result_content_block_round_trips() {
    let block = ContentBlock::ToolResult {
        tool_use_id: "tu-1".to_string(),
        content: open_agent_protocol::ToolResultContent::Text("42".to_string()),
        is_error: Some(false),
    };
    let json = serde_json::to_string(&block).unwrap();
    let decoded: ContentBlock = serde_json::from_str(&json).unwrap();
    match decoded {
        ContentBlock::ToolResult { tool_use_id, is_error, .. } => {
            assert_eq!(tool_use_id, "tu-1");
            assert_eq!(is_error, Some(false));
        }
        other => panic!("unexpected block: {other:?}"),
    }
}
