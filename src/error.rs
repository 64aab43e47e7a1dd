//! # Error Types
//!
//! Comprehensive error handling for the protocol runtime: every failure
//! mode is a distinct, stable variant rather than an opaque string.
//!
//! ## Design Philosophy
//!
//! - **Explicit Error Handling**: every fallible operation returns `Result<T>`.
//! - **No Silent Failures**: handler failures are converted to protocol
//!   responses (deny/error), never swallowed — see `hooks` and `permissions`.
//! - **Rich Context**: each variant carries what's needed to act on it.
//! - **Easy Conversion**: `#[from]` for the two error sources that cross a
//!   library boundary (`serde_json`, `std::io`).

use thiserror::Error;

/// Type alias for `Result<T, Error>` used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type covering every failure mode of the protocol runtime.
///
/// ## Error Categories
///
/// - **ExecutableNotFound / SpawnFailed**: the Agent CLI could not be started.
/// - **PeerExited**: the child exited with a nonzero status.
/// - **MalformedFrame / ProtocolViolation**: the wire protocol was violated.
/// - **ControlTimeout**: an outbound control request went unanswered.
/// - **HandlerFailure**: a user hook/permission/tool handler raised.
/// - **Cancelled**: the operation or session was cancelled.
/// - **NotWritable / InvalidState**: API misuse against the session state machine.
/// - **Json**: serialization failed outside of frame parsing.
/// - **Other**: catch-all.
#[derive(Error, Debug)]
pub enum Error {
    /// The Agent CLI executable could not be located.
    #[error("executable not found: {0}")]
    ExecutableNotFound(String),

    /// The child process could not be started.
    #[error("failed to spawn agent process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    /// The child process exited with a nonzero status before a clean shutdown.
    #[error("agent process exited with code {code:?}")]
    PeerExited {
        /// Exit code reported by the OS, if any (`None` if killed by signal).
        code: Option<i32>,
    },

    /// An inbound line failed to parse as JSON or failed structural validation.
    #[error("malformed frame: {raw_line}")]
    MalformedFrame {
        /// The raw line that failed to parse.
        raw_line: String,
    },

    /// Well-formed JSON that violates the protocol contract, e.g. a
    /// `control_response` with an unknown `request_id`, or a duplicate response.
    #[error("protocol violation: {detail}")]
    ProtocolViolation {
        /// Description of the violation.
        detail: String,
    },

    /// An outbound control request did not receive a response within its deadline.
    #[error("control request {request_id} timed out")]
    ControlTimeout {
        /// ID of the request that timed out.
        request_id: String,
    },

    /// A user-supplied hook/permission/tool handler raised an error.
    ///
    /// Never propagates past the dispatcher: hook failures become an error
    /// control response, permission failures become a deny.
    #[error("handler failed: {cause}")]
    HandlerFailure {
        /// Description of the handler failure.
        cause: String,
    },

    /// The operation was cancelled by the caller or by session shutdown.
    #[error("operation cancelled")]
    Cancelled,

    /// The transport is not writable, e.g. `send` after `end_input`/`close`.
    #[error("not writable: {0}")]
    NotWritable(String),

    /// The session is not in a state that permits this operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// JSON serialization or deserialization failed outside of frame parsing
    /// (e.g. encoding an outbound control request payload).
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Miscellaneous error that doesn't fit another category.
    #[error("error: {0}")]
    Other(String),
}

impl Error {
    /// Construct an [`Error::ExecutableNotFound`].
    pub fn executable_not_found(msg: impl Into<String>) -> Self {
        Error::ExecutableNotFound(msg.into())
    }

    /// Construct an [`Error::PeerExited`].
    pub fn peer_exited(code: Option<i32>) -> Self {
        Error::PeerExited { code }
    }

    /// Construct an [`Error::MalformedFrame`].
    pub fn malformed_frame(raw_line: impl Into<String>) -> Self {
        Error::MalformedFrame {
            raw_line: raw_line.into(),
        }
    }

    /// Construct an [`Error::ProtocolViolation`].
    pub fn protocol_violation(detail: impl Into<String>) -> Self {
        Error::ProtocolViolation {
            detail: detail.into(),
        }
    }

    /// Construct an [`Error::ControlTimeout`].
    pub fn control_timeout(request_id: impl Into<String>) -> Self {
        Error::ControlTimeout {
            request_id: request_id.into(),
        }
    }

    /// Construct an [`Error::HandlerFailure`].
    pub fn handler_failure(cause: impl Into<String>) -> Self {
        Error::HandlerFailure {
            cause: cause.into(),
        }
    }

    /// Construct an [`Error::NotWritable`].
    pub fn not_writable(msg: impl Into<String>) -> Self {
        Error::NotWritable(msg.into())
    }

    /// Construct an [`Error::InvalidState`].
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }

    /// Construct an [`Error::Other`].
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Whether this error represents a cancellation, which callers often
    /// want to treat differently from a hard failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executable_not_found_message() {
        let err = Error::executable_not_found("claude");
        assert_eq!(err.to_string(), "executable not found: claude");
    }

    #[test]
    fn control_timeout_carries_id() {
        let err = Error::control_timeout("req-1");
        assert!(matches!(err, Error::ControlTimeout { ref request_id } if request_id == "req-1"));
    }

    #[test]
    fn peer_exited_formats_code() {
        let err = Error::peer_exited(Some(1));
        assert_eq!(err.to_string(), "agent process exited with code Some(1)");
    }

    #[test]
    fn is_cancelled_only_for_cancelled_variant() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::other("x").is_cancelled());
    }

    #[test]
    fn json_error_converts() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn io_error_converts_to_spawn_failed() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::SpawnFailed(_)));
    }
}
