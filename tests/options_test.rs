//! Integration tests for `AgentOptions` building and CLI argument rendering.

use open_agent_protocol::{
    AgentOptions, ArgumentRenderer, DefaultArgumentRenderer, PermissionMode,
};
use std::str::FromStr;

#[test]
fn permission_mode_round_trips_all_five_spellings() {
    for spelling in ["default", "acceptEdits", "plan", "bypassPermissions", "dontAsk"] {
        let mode = PermissionMode::from_str(spelling).unwrap();
        assert_eq!(mode.to_string(), spelling);
    }
}

#[test]
fn unrecognised_permission_mode_is_rejected() {
    assert!(PermissionMode::from_str("yolo").is_err());
}

#[test]
fn build_rejects_fork_session_without_resume() {
    let err = AgentOptions::builder().fork_session(true).build().unwrap_err();
    assert!(err.to_string().contains("fork_session"));
}

#[test]
fn build_accepts_fork_session_with_resume() {
    let options = AgentOptions::builder()
        .resume("sess-1")
        .fork_session(true)
        .build()
        .unwrap();
    assert_eq!(options.resume.as_deref(), Some("sess-1"));
    assert!(options.fork_session);
}

#[test]
fn one_shot_render_includes_print_flag_and_prompt() {
    let options = AgentOptions::builder().model("claude-sonnet").build().unwrap();
    let args = DefaultArgumentRenderer.render(&options, Some("hello"), false);
    assert!(args.windows(2).any(|w| w == ["--print", "hello"]));
    assert!(args.windows(2).any(|w| w == ["--model", "claude-sonnet"]));
    assert!(!args.contains(&"--input-format".to_string()));
}

#[test]
fn interactive_render_uses_input_format_stream_json() {
    let options = AgentOptions::builder().build().unwrap();
    let args = DefaultArgumentRenderer.render(&options, None, true);
    assert!(args.windows(2).any(|w| w == ["--input-format", "stream-json"]));
}

#[test]
fn needs_interactive_mode_true_once_a_tool_is_registered() {
    let tool = open_agent_protocol::tool("noop", "does nothing")
        .handler(|_| async { Ok("{}".to_string()) })
        .build();
    let options = AgentOptions::builder().tool(tool).build().unwrap();
    assert!(options.needs_interactive_mode());
}

#[test]
fn needs_interactive_mode_false_for_plain_query_options() {
    let options = AgentOptions::builder().model("claude-sonnet").build().unwrap();
    assert!(!options.needs_interactive_mode());
}
