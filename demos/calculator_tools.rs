//! Registering in-process tools that the agent can call mid-turn.

use open_agent_protocol::{query, tool, AgentOptions, Message};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let add = tool("add", "Add two numbers")
        .schema(json!({
            "type": "object",
            "properties": {
                "a": {"type": "number"},
                "b": {"type": "number"},
            },
            "required": ["a", "b"],
        }))
        .handler(|input| async move {
            let a = input["a"].as_f64().unwrap_or(0.0);
            let b = input["b"].as_f64().unwrap_or(0.0);
            Ok(json!({ "result": a + b }).to_string())
        })
        .build();

    let options = AgentOptions::builder()
        .system_prompt("Use the add tool for arithmetic instead of doing it yourself.")
        .tool(add)
        .build()?;

    let mut stream = query("What's 17 plus 25?", &options).await?;
    while let Some(message) = stream.next().await {
        if let Message::Result(result) = message? {
            println!("done: {:?}", result.payload().stop_reason);
        }
    }

    Ok(())
}
