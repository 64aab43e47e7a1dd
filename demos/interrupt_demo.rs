//! Starting a session, letting it run for a moment, then interrupting it.

use std::time::Duration;

use open_agent_protocol::{AgentOptions, Session};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let options = AgentOptions::builder()
        .system_prompt("You are a helpful assistant.")
        .build()?;

    let session = Session::new(&options)?;
    session.start().await?;
    session.send("Write a very long story.", None).await?;

    tokio::time::sleep(Duration::from_secs(2)).await;
    session.interrupt().await?;

    session.close().await?;
    println!("killed on close: {}", session.was_killed());

    Ok(())
}
