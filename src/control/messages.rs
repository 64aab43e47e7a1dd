//! Control-frame payload types: the closed vocabulary of outbound request
//! subtypes the SDK can send, the inbound request subtypes the CLI can send,
//! and the response envelope shared by both directions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hooks::HookRegistrationDescriptor;

/// SDK→CLI request, tagged by `subtype`. The vocabulary is closed per the
/// protocol: adding a new outbound capability means adding a variant here,
/// not threading a string through call sites.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum ControlRequest {
    Initialize {
        hooks: HookRegistrationDescriptor,
        #[serde(skip_serializing_if = "Option::is_none")]
        mcp_servers: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        permission_mode: Option<String>,
    },
    Interrupt,
    SetPermissionMode {
        mode: String,
    },
    SetModel {
        model: String,
    },
    SetMaxThinkingTokens {
        max_thinking_tokens: u32,
    },
    SupportedCommands,
    SupportedModels,
    McpServerStatus,
    AccountInfo,
    ReconnectMcpServer {
        server_name: String,
    },
    ToggleMcpServer {
        server_name: String,
        enabled: bool,
    },
    SetMcpServers {
        servers: Value,
    },
    RewindFiles {
        user_message_id: String,
    },
}

impl ControlRequest {
    /// Stable name used for logging and error messages; matches `subtype`.
    pub fn subtype(&self) -> &'static str {
        match self {
            ControlRequest::Initialize { .. } => "initialize",
            ControlRequest::Interrupt => "interrupt",
            ControlRequest::SetPermissionMode { .. } => "set_permission_mode",
            ControlRequest::SetModel { .. } => "set_model",
            ControlRequest::SetMaxThinkingTokens { .. } => "set_max_thinking_tokens",
            ControlRequest::SupportedCommands => "supported_commands",
            ControlRequest::SupportedModels => "supported_models",
            ControlRequest::McpServerStatus => "mcp_server_status",
            ControlRequest::AccountInfo => "account_info",
            ControlRequest::ReconnectMcpServer { .. } => "reconnect_mcp_server",
            ControlRequest::ToggleMcpServer { .. } => "toggle_mcp_server",
            ControlRequest::SetMcpServers { .. } => "set_mcp_servers",
            ControlRequest::RewindFiles { .. } => "rewind_files",
        }
    }
}

/// The outbound envelope: `{"type":"control_request","request_id":...,"request":{...}}`.
#[derive(Debug, Clone, Serialize)]
pub struct ControlRequestFrame {
    #[serde(rename = "type")]
    pub frame_type: &'static str,
    pub request_id: String,
    pub request: ControlRequest,
}

impl ControlRequestFrame {
    pub fn new(request_id: String, request: ControlRequest) -> Self {
        ControlRequestFrame {
            frame_type: "control_request",
            request_id,
            request,
        }
    }
}

/// CLI→SDK request, tagged by `subtype`. These arrive nested inside a
/// `control_request` envelope the same way outbound ones are sent, but with
/// a different closed subtype vocabulary.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum IncomingControlRequest {
    CanUseTool {
        tool_name: String,
        input: Value,
        #[serde(default)]
        permission_suggestions: Option<Value>,
        #[serde(default)]
        blocked_path: Option<String>,
    },
    HookCallback {
        callback_id: String,
        input: Value,
        #[serde(default)]
        tool_use_id: Option<String>,
    },
    McpMessage {
        server_name: String,
        message: Value,
    },
    /// Any subtype this codec doesn't know about; dispatch replies with an
    /// error per the "unknown subtypes respond with an error" contract.
    #[serde(other)]
    Unknown,
}

/// Envelope around an inbound control request:
/// `{"type":"control_request","request_id":...,"request":{...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingControlRequestFrame {
    pub request_id: String,
    pub request: IncomingControlRequest,
}

/// Response payload, success or error, shared by both directions.
///
/// Wire shape: `{"type":"control_response","response":{"request_id":...,"subtype":"success"|"error","response"?:<any>,"error"?:<string>}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum ControlResponseBody {
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<Value>,
    },
    Error {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub request_id: String,
    #[serde(flatten)]
    pub body: ControlResponseBody,
}

impl ControlResponse {
    pub fn success(request_id: impl Into<String>, response: Value) -> Self {
        ControlResponse {
            request_id: request_id.into(),
            body: ControlResponseBody::Success {
                response: Some(response),
            },
        }
    }

    pub fn error(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        ControlResponse {
            request_id: request_id.into(),
            body: ControlResponseBody::Error {
                error: error.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.body, ControlResponseBody::Success { .. })
    }

    pub fn into_value(self) -> Result<Value, String> {
        match self.body {
            ControlResponseBody::Success { response } => Ok(response.unwrap_or(Value::Null)),
            ControlResponseBody::Error { error } => Err(error),
        }
    }
}

/// Envelope: `{"type":"control_response","response":{...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponseFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    pub response: ControlResponse,
}
