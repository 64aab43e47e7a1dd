//! # open-agent-protocol
//!
//! A Rust client library for driving an external Agent CLI as a subprocess,
//! speaking its newline-delimited JSON control protocol over stdio.
//!
//! ## Key Features
//!
//! - **Two interaction modes**: a one-shot [`query`] function and a
//!   stateful, multi-turn [`Session`].
//! - **Control channel**: request/response correlation for interrupts,
//!   permission-mode/model changes, file rewinds, and more, multiplexed
//!   over the same stdio stream as the message traffic.
//! - **Lifecycle hooks**: intercept tool use, prompt submission, session
//!   start/end, and other lifecycle events before the agent acts on them.
//! - **In-process tools**: register Rust functions as callable tools,
//!   served to the agent over an in-process JSON-RPC tool server.
//! - **Permission gating**: approve, deny, or rewrite tool calls before
//!   they execute.
//! - **Retry logic**: exponential backoff with jitter for subprocess spawn
//!   and MCP server reconnects.
//!
//! ## Two Interaction Modes
//!
//! ### 1. One-shot query (`query()`)
//!
//! ```rust,no_run
//! use open_agent_protocol::{query, AgentOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = AgentOptions::builder()
//!         .system_prompt("You are a helpful assistant")
//!         .model("claude-sonnet")
//!         .build()?;
//!
//!     let mut stream = query("What's the capital of France?", &options).await?;
//!     while let Some(message) = stream.next().await {
//!         let message = message?;
//!         println!("{message:?}");
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ### 2. Stateful session (`Session`)
//!
//! ```rust,no_run
//! use open_agent_protocol::{AgentOptions, Message, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = AgentOptions::builder()
//!         .system_prompt("You are a helpful assistant")
//!         .model("claude-sonnet")
//!         .build()?;
//!
//!     let session = Session::new(&options)?;
//!     session.start().await?;
//!     session.send("What's 2+2?", None).await?;
//!     while let Some(message) = session.receive().await {
//!         if matches!(message?, Message::Result(_)) {
//!             break;
//!         }
//!     }
//!     session.close().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **message**: wire-level message types and the NDJSON codec.
//! - **transport**: subprocess lifecycle and byte-oriented stdio framing.
//! - **control**: request/response correlation and inbound dispatch for
//!   the control protocol.
//! - **hooks**: lifecycle event registration and dispatch.
//! - **permissions**: tool-use gating.
//! - **mcp**: in-process JSON-RPC tool server.
//! - **tools**: tool definition and schema generation.
//! - **options**: agent configuration and CLI argument rendering.
//! - **retry**: exponential backoff with jitter.
//! - **session**: the public `query()`/`Session` surface.
//! - **error**: the crate's error taxonomy.

mod control;
mod error;
mod hooks;
mod mcp;
mod message;
mod options;
mod permissions;
mod session;
mod tools;
mod transport;

/// Retry utilities with exponential backoff and jitter, for callers that
/// want to wrap their own fallible operations (e.g. a custom
/// [`transport::ExecutableResolver`]) in the same policy the crate uses
/// internally for subprocess spawn and MCP reconnect.
pub mod retry;

pub use error::{Error, Result};

pub use message::{
    AssistantMessage, CompactBoundary, ContentBlock, Message, McpServerStatus, ResultMessage,
    ResultPayload, ResultUsage, StreamEventMessage, SystemInit, SystemMessage, SystemPayload,
    ToolResultContent, UserContentBlock, UserMessage,
};

pub use session::{query, MessageStream, RewindResult, Session, SessionState};

pub use options::{
    AgentOptions, AgentOptionsBuilder, ArgumentRenderer, DefaultArgumentRenderer, PermissionMode,
};

pub use hooks::{
    HookCallback, HookDispatcher, HookEvent, HookInput, HookOutput, HookRegistration,
    HookRegistrationDescriptor, SyncHookOutput,
};

pub use permissions::{CanUseToolHandler, PermissionRequest, PermissionResult};

pub use mcp::{McpMessageHandler, McpServer, McpServerRegistry};

pub use tools::{tool, SchemaGenerator, Tool, ToolBuilder, ToolRegistry};

pub use transport::{
    DefaultExecutableResolver, DefaultProcessLauncher, ExecutableResolver, ProcessLauncher,
    SubprocessTransport, Transport,
};

/// Convenience re-exports for typical usage: `use open_agent_protocol::prelude::*;`.
pub mod prelude {
    pub use crate::{
        query, tool, AgentOptions, AgentOptionsBuilder, CanUseToolHandler, ContentBlock, Error,
        HookEvent, HookInput, HookOutput, Message, PermissionMode, PermissionRequest,
        PermissionResult, Result, Session, Tool, ToolBuilder,
    };
}
