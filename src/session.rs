//! Session Runtime: the public surface of the crate.
//!
//! [`query`] is the one-shot entry point; [`Session`] is the stateful
//! handle for interactive multi-turn use.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::control::{
    ControlChannel, ControlHandlers, ControlRequest, ControlResponse, IncomingControlRequestFrame,
};
use crate::error::{Error, Result};
use crate::hooks::HookDispatcher;
use crate::mcp::{McpServer, McpServerRegistry};
use crate::message::{decode_line, Message, OutboundUserFrame};
use crate::options::{AgentOptions, ArgumentRenderer, DefaultArgumentRenderer};
use crate::tools::ToolRegistry;
use crate::transport::{SubprocessTransport, Transport};

/// Name of the in-process tool server registered for `options.tools`, used
/// to address it over `mcp_message`.
const IN_PROCESS_TOOL_SERVER_NAME: &str = "sdk-tools";

/// Session lifecycle state, mirroring the transitions table: `NotStarted`
/// -> `Connecting` -> `Initializing` -> `Ready` <-> `Interrupting` ->
/// `Closing` -> `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Connecting,
    Initializing,
    Ready,
    Interrupting,
    Closing,
    Closed,
}

/// One query's or session's message stream, terminating at the next
/// terminal `Result` message.
pub struct MessageStream {
    rx: mpsc::Receiver<Result<Message>>,
}

impl MessageStream {
    pub async fn next(&mut self) -> Option<Result<Message>> {
        self.rx.recv().await
    }
}

fn build_control_channel(
    transport: Arc<dyn Transport>,
    options: &AgentOptions,
) -> (Arc<ControlChannel<dyn Transport>>, crate::hooks::HookRegistrationDescriptor) {
    let dispatcher = HookDispatcher::new(
        options
            .hooks
            .iter()
            .map(|r| crate::hooks::HookRegistration {
                event: r.event,
                matcher: r.matcher.clone(),
                callback: r.callback.clone(),
            })
            .collect(),
    );
    let descriptor = dispatcher.descriptor().clone();
    let tool_server = McpServer::new(
        IN_PROCESS_TOOL_SERVER_NAME,
        env!("CARGO_PKG_VERSION"),
        ToolRegistry::new(options.tools.clone()),
    );
    let handlers = ControlHandlers {
        can_use_tool: options.can_use_tool.clone(),
        hooks: Some(Arc::new(dispatcher)),
        mcp: Some(Arc::new(McpServerRegistry::new(vec![tool_server]))),
    };
    (Arc::new(ControlChannel::new(transport, handlers)), descriptor)
}

fn build_transport(options: &AgentOptions, args: Vec<String>) -> Arc<dyn Transport> {
    let mut transport = SubprocessTransport::new(args);
    if let Some(path) = &options.executable_path {
        transport = transport.with_executable_path(path.clone());
    }
    if let Some(cwd) = &options.cwd {
        transport = transport.with_cwd(cwd.clone());
    }
    Arc::new(transport)
}

/// Demultiplex one inbound line: control traffic goes to the control
/// channel, everything else is an Agent Message forwarded to the consumer.
async fn route_inbound_line(
    line: &str,
    control: &Arc<ControlChannel<dyn Transport>>,
    message_tx: &mpsc::Sender<Result<Message>>,
) {
    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(_) => {
            let _ = message_tx.send(Err(Error::malformed_frame(line))).await;
            return;
        }
    };

    match value.get("type").and_then(|t| t.as_str()) {
        Some("control_response") => {
            if let Some(response_value) = value.get("response") {
                match serde_json::from_value::<ControlResponse>(response_value.clone()) {
                    Ok(response) => control.handle_response(response).await,
                    Err(_) => log::warn!("malformed control_response: {line}"),
                }
            }
        }
        Some("control_request") => match serde_json::from_str::<IncomingControlRequestFrame>(line) {
            Ok(frame) => control.handle_incoming(frame).await,
            Err(e) => log::warn!("malformed control_request: {e}"),
        },
        _ => match decode_line(line) {
            Ok(message) => {
                let _ = message_tx.send(Ok(message)).await;
            }
            Err(e) => log::warn!("dropping unparseable frame: {e}"),
        },
    }
}

/// Send the outbound `initialize` control request and await its
/// acknowledgement. Shared by `Session::start` and interactive `query()`
/// runs, since both need the CLI to know about any registered hooks before
/// it can dispatch `hook_callback`/`can_use_tool` against them.
async fn send_initialize(
    control: &ControlChannel<dyn Transport>,
    hooks: crate::hooks::HookRegistrationDescriptor,
) -> Result<()> {
    control
        .request(
            ControlRequest::Initialize {
                hooks,
                mcp_servers: None,
                permission_mode: None,
            },
            None,
        )
        .await
        .map(|_| ())
}

/// Spawn the task that demultiplexes inbound lines until the transport's
/// line stream ends. Used by both `Session` (runs for the session's whole
/// lifetime) and `query` (runs until the terminal `Result`).
fn spawn_reader(
    mut lines_rx: mpsc::Receiver<Result<String>>,
    control: Arc<ControlChannel<dyn Transport>>,
    message_tx: mpsc::Sender<Result<Message>>,
    stop_after_result: bool,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(line) = lines_rx.recv().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    let _ = message_tx.send(Err(e)).await;
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            route_inbound_line(&line, &control, &message_tx).await;
            if stop_after_result {
                let is_result = serde_json::from_str::<serde_json::Value>(&line)
                    .ok()
                    .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(str::to_string))
                    .as_deref()
                    == Some("result");
                if is_result {
                    break;
                }
            }
        }
    })
}

/// Interactive, stateful handle over a running Agent CLI subprocess.
pub struct Session {
    transport: Arc<dyn Transport>,
    control: Arc<ControlChannel<dyn Transport>>,
    hook_descriptor: crate::hooks::HookRegistrationDescriptor,
    state: Mutex<SessionState>,
    was_killed: Arc<AtomicBool>,
    reader_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
    message_rx: Mutex<Option<mpsc::Receiver<Result<Message>>>>,
    message_channel_capacity: usize,
}

impl Session {
    /// Build a session from options without connecting yet.
    pub fn new(options: &AgentOptions) -> Result<Self> {
        Self::with_renderer(options, &DefaultArgumentRenderer)
    }

    pub fn with_renderer(options: &AgentOptions, renderer: &dyn ArgumentRenderer) -> Result<Self> {
        let args = renderer.render(options, None, true);
        let transport = build_transport(options, args);
        let (control, hook_descriptor) = build_control_channel(transport.clone(), options);

        Ok(Session {
            transport,
            control,
            hook_descriptor,
            state: Mutex::new(SessionState::NotStarted),
            was_killed: Arc::new(AtomicBool::new(false)),
            reader_handle: Mutex::new(None),
            message_rx: Mutex::new(None),
            message_channel_capacity: options.message_channel_capacity.max(1),
        })
    }

    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    /// `NotStarted -> Connecting -> Initializing -> Ready`.
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if *state != SessionState::NotStarted {
                return Err(Error::invalid_state("session already started"));
            }
            *state = SessionState::Connecting;
        }

        if let Err(e) = self.transport.connect().await {
            *self.state.lock().await = SessionState::Closed;
            return Err(e);
        }
        let lines_rx = self.transport.lines().await?;

        *self.state.lock().await = SessionState::Initializing;

        let (message_tx, message_rx) = mpsc::channel(self.message_channel_capacity);
        *self.message_rx.lock().await = Some(message_rx);
        let reader = spawn_reader(lines_rx, self.control.clone(), message_tx, false);
        *self.reader_handle.lock().await = Some(reader);

        let response = send_initialize(&self.control, self.hook_descriptor.clone()).await;

        match response {
            Ok(_) => {
                *self.state.lock().await = SessionState::Ready;
                Ok(())
            }
            Err(e) => {
                *self.state.lock().await = SessionState::Closed;
                Err(e)
            }
        }
    }

    /// Send one user turn. `Ready` only.
    pub async fn send(&self, content: impl Into<String>, session_id: Option<String>) -> Result<()> {
        if *self.state.lock().await != SessionState::Ready {
            return Err(Error::invalid_state("session is not Ready"));
        }
        let frame = OutboundUserFrame::new(content, session_id);
        let line = crate::message::encode_line(&frame)?;
        self.transport.write_line(&line).await
    }

    /// Receive the next Agent Message for the current turn, or `None` once
    /// the underlying transport's line stream has ended. Callers typically
    /// loop this until they observe `Message::Result`, then call it again
    /// for the next turn after another [`Session::send`].
    pub async fn receive(&self) -> Option<Result<Message>> {
        let mut guard = self.message_rx.lock().await;
        match guard.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Send `interrupt` and await its acknowledgement.
    pub async fn interrupt(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if *state != SessionState::Ready {
                return Err(Error::invalid_state("session is not Ready"));
            }
            *state = SessionState::Interrupting;
        }
        let result = self.control.request(ControlRequest::Interrupt, None).await;
        *self.state.lock().await = SessionState::Ready;
        result.map(|_| ())
    }

    pub async fn set_model(&self, model: impl Into<String>) -> Result<()> {
        self.control
            .request(ControlRequest::SetModel { model: model.into() }, None)
            .await
            .map(|_| ())
    }

    pub async fn set_permission_mode(&self, mode: crate::options::PermissionMode) -> Result<()> {
        self.control
            .request(
                ControlRequest::SetPermissionMode {
                    mode: mode.to_string(),
                },
                None,
            )
            .await
            .map(|_| ())
    }

    pub async fn set_max_thinking_tokens(&self, tokens: u32) -> Result<()> {
        self.control
            .request(
                ControlRequest::SetMaxThinkingTokens {
                    max_thinking_tokens: tokens,
                },
                None,
            )
            .await
            .map(|_| ())
    }

    pub async fn rewind_files(&self, user_message_id: impl Into<String>) -> Result<RewindResult> {
        let value = self
            .control
            .request(
                ControlRequest::RewindFiles {
                    user_message_id: user_message_id.into(),
                },
                None,
            )
            .await?;
        Ok(RewindResult {
            files_changed: value.get("files_changed").and_then(|v| v.as_u64()),
            insertions: value.get("insertions").and_then(|v| v.as_u64()),
            deletions: value.get("deletions").and_then(|v| v.as_u64()),
        })
    }

    /// Close the session. Idempotent.
    pub async fn close(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if *state == SessionState::Closed || *state == SessionState::Closing {
                return Ok(());
            }
            *state = SessionState::Closing;
        }

        let _ = self.transport.end_input().await;

        if let Ok(killed) = self.transport.close().await {
            self.was_killed.store(killed, Ordering::SeqCst);
        }

        if let Some(handle) = self.reader_handle.lock().await.take() {
            handle.abort();
        }

        *self.state.lock().await = SessionState::Closed;
        Ok(())
    }

    pub fn was_killed(&self) -> bool {
        self.was_killed.load(Ordering::SeqCst)
    }
}

pub struct RewindResult {
    pub files_changed: Option<u64>,
    pub insertions: Option<u64>,
    pub deletions: Option<u64>,
}

/// One-shot query: sends `prompt`, returns a stream of Agent Messages that
/// terminates at the next `Result` message.
///
/// If no in-process tool server, hooks, or permission handler are
/// registered, the prompt is passed as a CLI argument in `--print` mode and
/// the outbound stream closes immediately after spawn; otherwise this
/// transparently uses interactive mode for the duration of the exchange.
pub async fn query(prompt: &str, options: &AgentOptions) -> Result<MessageStream> {
    let renderer = DefaultArgumentRenderer;
    let interactive = options.needs_interactive_mode();
    let args = renderer.render(options, Some(prompt), interactive);

    let transport = build_transport(options, args);
    transport.connect().await?;
    if !interactive {
        transport.end_input().await?;
    }
    let lines_rx = transport.lines().await?;

    let (control, hook_descriptor) = build_control_channel(transport.clone(), options);
    let (tx, rx) = mpsc::channel(options.message_channel_capacity.max(1));
    spawn_reader(lines_rx, control.clone(), tx, true);

    if interactive {
        send_initialize(&control, hook_descriptor).await?;
        let frame = OutboundUserFrame::new(prompt, None);
        let line = crate::message::encode_line(&frame)?;
        transport.write_line(&line).await?;
        transport.end_input().await?;
    }

    Ok(MessageStream { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_before_ready_is_invalid_state() {
        let options = AgentOptions::default();
        let session = Session::new(&options).unwrap();
        let err = session.send("hi", None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn close_before_start_is_idempotent() {
        let options = AgentOptions::default();
        let session = Session::new(&options).unwrap();
        session.close().await.unwrap();
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn interrupt_before_ready_is_invalid_state() {
        let options = AgentOptions::default();
        let session = Session::new(&options).unwrap();
        let err = session.interrupt().await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }
}
