//! Registering a `PreToolUse` hook that blocks a dangerous tool call.

use std::sync::Arc;

use open_agent_protocol::{
    query, AgentOptions, HookEvent, HookOutput, HookRegistration, Message, SyncHookOutput,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let guard = HookRegistration {
        event: HookEvent::PreToolUse,
        matcher: Some("Bash".to_string()),
        callback: Arc::new(|input: open_agent_protocol::HookInput| async move {
            if input.tool_input.as_ref().map(|v| v.to_string()).unwrap_or_default().contains("rm -rf") {
                Ok(HookOutput::Sync(SyncHookOutput::block("destructive command blocked")))
            } else {
                Ok(HookOutput::Sync(SyncHookOutput::allow()))
            }
        }),
    };

    let options = AgentOptions::builder()
        .system_prompt("You can run shell commands.")
        .hook(guard)
        .build()?;

    let mut stream = query("Clean up the temp directory.", &options).await?;
    while let Some(message) = stream.next().await {
        if let Message::Result(_) = message? {
            println!("turn complete");
        }
    }

    Ok(())
}
