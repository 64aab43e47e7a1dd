//! Control Channel: multiplexes the SDK→CLI request/response protocol and
//! the CLI→SDK request/response protocol over the single transport stream.
//!
//! See [`messages`] for the frame shapes and [`pending`] for how outbound
//! requests are correlated to their responses.

pub mod messages;
pub mod pending;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::mcp::McpMessageHandler;
use crate::message::encode_line;
use crate::permissions::CanUseToolHandler;
use crate::hooks::HookDispatcher;
use crate::transport::Transport;

pub use messages::{
    ControlRequest, ControlRequestFrame, ControlResponse, ControlResponseBody,
    ControlResponseFrame, IncomingControlRequest, IncomingControlRequestFrame,
};
use pending::PendingRequests;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Handlers the Control Channel dispatches inbound requests to. Optional:
/// an unset `can_use_tool` handler defaults to allow-all (matching the
/// permissive default used when a caller hasn't opted into gating tool use).
#[derive(Default)]
pub struct ControlHandlers {
    pub can_use_tool: Option<Arc<dyn CanUseToolHandler>>,
    pub hooks: Option<Arc<HookDispatcher>>,
    pub mcp: Option<Arc<dyn McpMessageHandler>>,
}

/// Owns outbound request correlation and inbound request dispatch.
///
/// `request_id`s are `format!("{prefix:08x}-{n}")`: `prefix` is a random
/// `u32` minted once per channel, `n` an `AtomicU64` counter. This gives
/// global-enough uniqueness without pulling a UUID onto the hot path; UUIDs
/// are reserved for hook callback ids, which are minted far less often.
pub struct ControlChannel<T: Transport + ?Sized> {
    transport: Arc<T>,
    pending: PendingRequests,
    handlers: ControlHandlers,
    id_prefix: u32,
    id_counter: AtomicU64,
}

impl<T: Transport + ?Sized> ControlChannel<T> {
    pub fn new(transport: Arc<T>, handlers: ControlHandlers) -> Self {
        ControlChannel {
            transport,
            pending: PendingRequests::new(),
            handlers,
            id_prefix: rand::thread_rng().gen(),
            id_counter: AtomicU64::new(0),
        }
    }

    fn next_request_id(&self) -> String {
        let n = self.id_counter.fetch_add(1, Ordering::Relaxed);
        format!("{:08x}-{n}", self.id_prefix)
    }

    /// Send an outbound control request and await its response, bounded by
    /// `deadline` (defaults to 30s).
    pub async fn request(
        &self,
        request: ControlRequest,
        deadline: Option<Duration>,
    ) -> Result<Value> {
        let id = self.next_request_id();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id.clone(), tx).await;

        let frame = ControlRequestFrame::new(id.clone(), request);
        let line = encode_line(&frame)?;
        if let Err(e) = self.transport.write_line(&line).await {
            self.pending.cancel(&id).await;
            return Err(e);
        }

        let timeout = deadline.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => response
                .into_value()
                .map_err(Error::handler_failure),
            Ok(Err(_)) => Err(Error::protocol_violation(format!(
                "pending request {id} dropped without a response"
            ))),
            Err(_) => {
                self.pending.cancel(&id).await;
                Err(Error::control_timeout(id))
            }
        }
    }

    /// Route an inbound `control_response` frame to the waiting caller.
    /// Unknown `request_id`s are logged and dropped, not treated as a fatal
    /// protocol error.
    pub async fn handle_response(&self, response: ControlResponse) {
        let id = response.request_id.clone();
        if !self.pending.complete(&id, response).await {
            log::warn!("control_response for unknown request_id {id}; dropping");
        }
    }

    /// Route an inbound `control_request` to the appropriate handler and
    /// write back exactly one `control_response`.
    pub async fn handle_incoming(&self, frame: IncomingControlRequestFrame) {
        let request_id = frame.request_id.clone();
        let body = match frame.request {
            IncomingControlRequest::CanUseTool {
                tool_name,
                input,
                permission_suggestions,
                blocked_path,
            } => {
                self.dispatch_can_use_tool(tool_name, input, permission_suggestions, blocked_path)
                    .await
            }
            IncomingControlRequest::HookCallback {
                callback_id,
                input,
                tool_use_id,
            } => self.dispatch_hook_callback(callback_id, input, tool_use_id).await,
            IncomingControlRequest::McpMessage {
                server_name,
                message,
            } => self.dispatch_mcp_message(server_name, message).await,
            IncomingControlRequest::Unknown => {
                ControlResponseBody::Error {
                    error: "unknown control_request subtype".to_string(),
                }
            }
        };

        let response = ControlResponse {
            request_id: request_id.clone(),
            body,
        };
        let envelope = ControlResponseFrame {
            frame_type: "control_response".to_string(),
            response,
        };
        match encode_line(&envelope) {
            Ok(line) => {
                if let Err(e) = self.transport.write_line(&line).await {
                    log::error!("failed to send control_response for {request_id}: {e}");
                }
            }
            Err(e) => log::error!("failed to encode control_response for {request_id}: {e}"),
        }
    }

    async fn dispatch_can_use_tool(
        &self,
        tool_name: String,
        input: Value,
        permission_suggestions: Option<Value>,
        blocked_path: Option<String>,
    ) -> ControlResponseBody {
        use crate::permissions::PermissionRequest;

        let request = PermissionRequest {
            tool_name,
            input,
            permission_suggestions,
            blocked_path,
        };

        let result = match &self.handlers.can_use_tool {
            Some(handler) => handler.can_use_tool(request).await,
            None => Ok(crate::permissions::PermissionResult::allow()),
        };

        let value = match result {
            Ok(decision) => decision.to_wire(),
            Err(e) => crate::permissions::PermissionResult::deny(e.to_string(), false).to_wire(),
        };
        ControlResponseBody::Success {
            response: Some(value),
        }
    }

    async fn dispatch_hook_callback(
        &self,
        callback_id: String,
        input: Value,
        tool_use_id: Option<String>,
    ) -> ControlResponseBody {
        let Some(dispatcher) = &self.handlers.hooks else {
            return ControlResponseBody::Error {
                error: format!("no hook dispatcher registered for callback {callback_id}"),
            };
        };
        match dispatcher.dispatch(&callback_id, input, tool_use_id).await {
            Ok(value) => ControlResponseBody::Success {
                response: Some(value),
            },
            Err(e) => ControlResponseBody::Error {
                error: e.to_string(),
            },
        }
    }

    async fn dispatch_mcp_message(&self, server_name: String, message: Value) -> ControlResponseBody {
        let Some(handler) = &self.handlers.mcp else {
            return ControlResponseBody::Error {
                error: format!("no MCP handler registered for server {server_name}"),
            };
        };
        match handler.handle(&server_name, message).await {
            Ok(value) => ControlResponseBody::Success {
                response: Some(value),
            },
            Err(e) => ControlResponseBody::Error {
                error: e.to_string(),
            },
        }
    }

    /// Number of outbound requests still awaiting a response.
    pub async fn pending_count(&self) -> usize {
        self.pending.len().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::mpsc;

    struct MockTransport {
        sent: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn connect(&self) -> Result<()> {
            Ok(())
        }
        async fn write_line(&self, line: &str) -> Result<()> {
            self.sent.lock().unwrap().push(line.to_string());
            Ok(())
        }
        async fn lines(&self) -> Result<mpsc::Receiver<Result<String>>> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }
        async fn end_input(&self) -> Result<()> {
            Ok(())
        }
        async fn close(&self) -> Result<bool> {
            Ok(false)
        }
        fn is_ready(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn request_times_out_when_unanswered() {
        let transport = Arc::new(MockTransport {
            sent: StdMutex::new(Vec::new()),
        });
        let channel = ControlChannel::new(transport, ControlHandlers::default());
        let result = channel
            .request(ControlRequest::Interrupt, Some(Duration::from_millis(20)))
            .await;
        assert!(matches!(result, Err(Error::ControlTimeout { .. })));
    }

    #[tokio::test]
    async fn handle_response_completes_pending_request() {
        let transport = Arc::new(MockTransport {
            sent: StdMutex::new(Vec::new()),
        });
        let channel = Arc::new(ControlChannel::new(transport, ControlHandlers::default()));
        let channel_for_responder = channel.clone();

        let responder = tokio::spawn(async move {
            // Give request() a moment to register itself as pending.
            tokio::time::sleep(Duration::from_millis(10)).await;
            let sent = channel_for_responder.transport.sent.lock().unwrap().clone();
            let frame: Value = serde_json::from_str(&sent[0]).unwrap();
            let id = frame["request_id"].as_str().unwrap().to_string();
            channel_for_responder
                .handle_response(ControlResponse::success(id, serde_json::json!({"ok": true})))
                .await;
        });

        let result = channel.request(ControlRequest::Interrupt, None).await.unwrap();
        assert_eq!(result["ok"], true);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn unknown_incoming_subtype_yields_error_response() {
        let transport = Arc::new(MockTransport {
            sent: StdMutex::new(Vec::new()),
        });
        let channel = ControlChannel::new(transport, ControlHandlers::default());
        channel
            .handle_incoming(IncomingControlRequestFrame {
                request_id: "r1".to_string(),
                request: IncomingControlRequest::Unknown,
            })
            .await;
        let sent = channel.transport.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("\"error\""));
    }

    #[tokio::test]
    async fn can_use_tool_defaults_to_allow() {
        let transport = Arc::new(MockTransport {
            sent: StdMutex::new(Vec::new()),
        });
        let channel = ControlChannel::new(transport, ControlHandlers::default());
        channel
            .handle_incoming(IncomingControlRequestFrame {
                request_id: "r1".to_string(),
                request: IncomingControlRequest::CanUseTool {
                    tool_name: "Bash".to_string(),
                    input: serde_json::json!({}),
                    permission_suggestions: None,
                    blocked_path: None,
                },
            })
            .await;
        let sent = channel.transport.sent.lock().unwrap().clone();
        let value: Value = serde_json::from_str(&sent[0]).unwrap();
        assert_eq!(value["response"]["response"]["behavior"], "allow");
    }
}
