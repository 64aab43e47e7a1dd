//! Hook registration and dispatch.
//!
//! Callers register hooks per [`HookEvent`] with a matcher regex; each
//! registered callback is assigned a stable ID at session construction.
//! That id/matcher map becomes the `initialize` request's hook registration
//! descriptor, and is also how inbound `hook_callback` requests are routed
//! back to the right closure.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};

/// The event a hook can be registered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum HookEvent {
    PreToolUse,
    PostToolUse,
    PostToolUseFailure,
    UserPromptSubmit,
    Stop,
    SubagentStart,
    SubagentStop,
    PreCompact,
    PermissionRequest,
    SessionStart,
    SessionEnd,
    Notification,
    Setup,
    TeammateIdle,
    TaskCompleted,
    #[serde(other)]
    Unknown,
}

/// A single hook invocation's input, shaped per event. Field presence
/// matches what the CLI actually sends for that event; unused fields stay
/// `None` for events that don't carry them.
#[derive(Debug, Clone, Deserialize)]
pub struct HookInput {
    pub hook_event_name: String,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: Option<Value>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(flatten)]
    pub extra: Value,
}

/// What a hook callback returns. Only the `Sync` variant is ever produced
/// today: `Async` is modeled so the wire shape is reserved, matching the
/// "not required to be implemented" note — it is accepted on decode but the
/// dispatcher never constructs one itself.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncHookOutput {
    #[serde(default, rename = "continue", skip_serializing_if = "Option::is_none")]
    pub continue_: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
    #[serde(default, rename = "stopReason", skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    #[serde(default, rename = "systemMessage", skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    #[serde(default, rename = "suppressOutput", skip_serializing_if = "Option::is_none")]
    pub suppress_output: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, rename = "hookSpecificOutput", skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<Value>,
}

impl SyncHookOutput {
    /// The permissive default: allow the tool/prompt to proceed.
    pub fn allow() -> Self {
        SyncHookOutput::default()
    }

    /// Block with a reason, matching the block-decision wire shape.
    pub fn block(stop_reason: impl Into<String>) -> Self {
        SyncHookOutput {
            continue_: Some(false),
            decision: Some("block".to_string()),
            stop_reason: Some(stop_reason.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HookOutput {
    Sync(SyncHookOutput),
    Async {
        #[serde(rename = "asyncTimeout_ms")]
        async_timeout_ms: u64,
    },
}

impl HookOutput {
    fn to_wire(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// User-supplied hook logic.
#[async_trait]
pub trait HookCallback: Send + Sync {
    async fn call(&self, input: HookInput) -> Result<HookOutput>;
}

#[async_trait]
impl<F, Fut> HookCallback for F
where
    F: Fn(HookInput) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<HookOutput>> + Send,
{
    async fn call(&self, input: HookInput) -> Result<HookOutput> {
        (self)(input).await
    }
}

/// One `{matcher, callback}` pair as registered against an event.
pub struct HookRegistration {
    pub event: HookEvent,
    pub matcher: Option<String>,
    pub callback: Arc<dyn HookCallback>,
}

/// The descriptor sent as part of the outbound `initialize` request:
/// `event -> [{matcher, callback_ids}]`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HookRegistrationDescriptor {
    #[serde(flatten)]
    pub by_event: HashMap<String, Vec<HookMatcherEntry>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HookMatcherEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matcher: Option<String>,
    pub callback_ids: Vec<String>,
}

/// Builds the stable callback-id map and dispatches inbound `hook_callback`
/// requests to the right registration.
pub struct HookDispatcher {
    callbacks: HashMap<String, Arc<dyn HookCallback>>,
    descriptor: HookRegistrationDescriptor,
}

impl HookDispatcher {
    /// Assign a stable id to each registration and build the descriptor
    /// that will ride inside the `initialize` request.
    pub fn new(registrations: Vec<HookRegistration>) -> Self {
        let mut by_event: HashMap<String, Vec<HookMatcherEntry>> = HashMap::new();
        // Index of the entry within `by_event[event_name]` for a given
        // matcher, so registrations sharing a matcher land in one entry's
        // `callback_ids` instead of one entry per callback.
        let mut entry_index: HashMap<(String, Option<String>), usize> = HashMap::new();
        let mut callbacks = HashMap::new();

        for reg in registrations {
            let id = Uuid::new_v4().to_string();
            let event_name = serde_json::to_value(reg.event)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| "Unknown".to_string());

            let key = (event_name.clone(), reg.matcher.clone());
            let entries = by_event.entry(event_name).or_default();
            match entry_index.get(&key) {
                Some(&idx) => entries[idx].callback_ids.push(id.clone()),
                None => {
                    entry_index.insert(key, entries.len());
                    entries.push(HookMatcherEntry {
                        matcher: reg.matcher,
                        callback_ids: vec![id.clone()],
                    });
                }
            }
            callbacks.insert(id, reg.callback);
        }

        HookDispatcher {
            callbacks,
            descriptor: HookRegistrationDescriptor { by_event },
        }
    }

    pub fn descriptor(&self) -> &HookRegistrationDescriptor {
        &self.descriptor
    }

    /// Invoke the callback registered under `callback_id`. A handler error
    /// is surfaced, not swallowed — `control::ControlChannel` converts it
    /// into an error `control_response` per the dispatcher's failure policy.
    pub async fn dispatch(
        &self,
        callback_id: &str,
        input: Value,
        tool_use_id: Option<String>,
    ) -> Result<Value> {
        let callback = self
            .callbacks
            .get(callback_id)
            .ok_or_else(|| Error::protocol_violation(format!("unknown hook callback_id {callback_id}")))?;

        let mut hook_input: HookInput = serde_json::from_value(input)
            .map_err(|e| Error::malformed_frame(format!("hook_callback input: {e}")))?;
        if hook_input.tool_name.is_none() {
            if let Some(id) = tool_use_id {
                hook_input.extra["tool_use_id"] = Value::String(id);
            }
        }

        let output = callback.call(hook_input).await?;
        Ok(output.to_wire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysBlock;

    #[async_trait]
    impl HookCallback for AlwaysBlock {
        async fn call(&self, _input: HookInput) -> Result<HookOutput> {
            Ok(HookOutput::Sync(SyncHookOutput::block("no")))
        }
    }

    #[tokio::test]
    async fn dispatch_routes_to_registered_callback() {
        let registrations = vec![HookRegistration {
            event: HookEvent::PreToolUse,
            matcher: Some("Write".to_string()),
            callback: Arc::new(AlwaysBlock),
        }];
        let dispatcher = HookDispatcher::new(registrations);
        let ids: Vec<String> = dispatcher
            .descriptor
            .by_event
            .get("PreToolUse")
            .unwrap()
            .iter()
            .flat_map(|e| e.callback_ids.clone())
            .collect();
        assert_eq!(ids.len(), 1);

        let input = serde_json::json!({
            "hook_event_name": "PreToolUse",
            "tool_name": "Write",
            "tool_input": {"file_path": "/tmp/x.js"},
        });
        let result = dispatcher.dispatch(&ids[0], input, None).await.unwrap();
        assert_eq!(result["decision"], "block");
        assert_eq!(result["continue"], false);
    }

    #[tokio::test]
    async fn dispatch_unknown_callback_id_errors() {
        let dispatcher = HookDispatcher::new(vec![]);
        let err = dispatcher
            .dispatch("missing", serde_json::json!({"hook_event_name": "Stop"}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProtocolViolation { .. }));
    }
}
