//! Minimal one-shot query against the Agent CLI.
//!
//! Run with `cargo run --example simple_query` after putting a `claude` (or
//! `claude-agent`/`agent`) binary on `PATH`.

use open_agent_protocol::{query, AgentOptions, ContentBlock, Message};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let options = AgentOptions::builder()
        .system_prompt("You are a terse, helpful assistant.")
        .build()?;

    let mut stream = query("What's the capital of France?", &options).await?;

    while let Some(message) = stream.next().await {
        match message? {
            Message::Assistant(assistant) => {
                for block in assistant.message.content {
                    if let ContentBlock::Text { text } = block {
                        print!("{text}");
                    }
                }
            }
            Message::Result(result) => {
                println!("\n-- turn finished: {} turns --", result.payload().num_turns);
            }
            _ => {}
        }
    }

    Ok(())
}
