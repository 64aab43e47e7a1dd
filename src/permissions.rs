//! Permission dispatch: the `can_use_tool` inbound request and the single
//! user-registered capability that decides it.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Everything the CLI sends along with a `can_use_tool` query.
#[derive(Debug, Clone)]
pub struct PermissionRequest {
    pub tool_name: String,
    pub input: Value,
    pub permission_suggestions: Option<Value>,
    pub blocked_path: Option<String>,
}

/// The caller's decision for a single `can_use_tool` query.
#[derive(Debug, Clone)]
pub enum PermissionResult {
    Allow {
        updated_input: Option<Value>,
        updated_permissions: Option<Value>,
    },
    Deny {
        message: String,
        interrupt: bool,
    },
}

impl PermissionResult {
    pub fn allow() -> Self {
        PermissionResult::Allow {
            updated_input: None,
            updated_permissions: None,
        }
    }

    pub fn deny(message: impl Into<String>, interrupt: bool) -> Self {
        PermissionResult::Deny {
            message: message.into(),
            interrupt,
        }
    }

    /// Render to the wire shape the Control Channel writes back as the
    /// `control_response`'s `response` field.
    pub fn to_wire(&self) -> Value {
        match self {
            PermissionResult::Allow {
                updated_input,
                updated_permissions,
            } => {
                let mut value = serde_json::json!({ "behavior": "allow" });
                if let Some(input) = updated_input {
                    value["updated_input"] = input.clone();
                }
                if let Some(permissions) = updated_permissions {
                    value["updated_permissions"] = permissions.clone();
                }
                value
            }
            PermissionResult::Deny { message, interrupt } => serde_json::json!({
                "behavior": "deny",
                "message": message,
                "interrupt": interrupt,
            }),
        }
    }
}

/// Single-capability permission callback. Unlike hooks (a list per event),
/// there is exactly one of these per session.
#[async_trait]
pub trait CanUseToolHandler: Send + Sync {
    async fn can_use_tool(&self, request: PermissionRequest) -> Result<PermissionResult>;
}

#[async_trait]
impl<F, Fut> CanUseToolHandler for F
where
    F: Fn(PermissionRequest) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<PermissionResult>> + Send,
{
    async fn can_use_tool(&self, request: PermissionRequest) -> Result<PermissionResult> {
        (self)(request).await
    }
}
