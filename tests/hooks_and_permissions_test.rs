//! Integration tests covering hook dispatch and permission wire shapes
//! through the crate's public API.

use open_agent_protocol::{
    HookDispatcher, HookEvent, HookOutput, HookRegistration, PermissionResult, SyncHookOutput,
};
use std::sync::Arc;

#[tokio::test]
async fn registered_hook_receives_tool_input_and_can_block() {
    let registration = HookRegistration {
        event: HookEvent::PreToolUse,
        matcher: Some("Bash".to_string()),
        callback: Arc::new(|input: open_agent_protocol::HookInput| async move {
            if input.tool_name.as_deref() == Some("Bash") {
                Ok(HookOutput::Sync(SyncHookOutput::block("not allowed")))
            } else {
                Ok(HookOutput::Sync(SyncHookOutput::allow()))
            }
        }),
    };

    let dispatcher = HookDispatcher::new(vec![registration]);
    let callback_id = dispatcher
        .descriptor()
        .by_event
        .get("PreToolUse")
        .unwrap()[0]
        .callback_ids[0]
        .clone();

    let input = serde_json::json!({
        "hook_event_name": "PreToolUse",
        "tool_name": "Bash",
        "tool_input": {"command": "rm -rf /"},
    });
    let output = dispatcher.dispatch(&callback_id, input, None).await.unwrap();
    assert_eq!(output["decision"], "block");
    assert_eq!(output["stopReason"], "not allowed");
}

#[test]
fn allow_result_omits_empty_optional_fields() {
    let wire = PermissionResult::allow().to_wire();
    assert_eq!(wire["behavior"], "allow");
    assert!(wire.get("updated_input").is_none());
}

#[test]
fn deny_result_carries_message_and_interrupt_flag() {
    let wire = PermissionResult::deny("blocked by policy", true).to_wire();
    assert_eq!(wire["behavior"], "deny");
    assert_eq!(wire["message"], "blocked by policy");
    assert_eq!(wire["interrupt"], true);
}
