// Core types for the DevTools protocol exchange

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Method used for every injection
pub const EVALUATE_METHOD: &str = "Runtime.evaluate";

/// Request id; each session carries exactly one request
pub const EVALUATE_REQUEST_ID: u64 = 1;

/// One inspectable window as listed by `GET /json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowDescriptor {
    /// Window title
    pub title: String,

    /// Socket URL for this window. Absent while another debugger is attached.
    #[serde(rename = "webSocketDebuggerUrl", default, skip_serializing_if = "Option::is_none")]
    pub websocket_debugger_url: Option<String>,

    /// Remaining protocol fields (`id`, `type`, `url`, ...), kept opaque
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl WindowDescriptor {
    pub fn new(title: impl Into<String>, websocket_debugger_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            websocket_debugger_url: Some(websocket_debugger_url.into()),
            extra: serde_json::Map::new(),
        }
    }
}

/// Outcome of evaluating the script in one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationResult {
    /// Script ran without throwing
    Success,
    /// Window skipped, unreachable, or the script threw
    Failed,
    /// No usable response came back
    Unknown,
}

impl EvaluationResult {
    pub fn is_success(self) -> bool {
        self == EvaluationResult::Success
    }
}

impl std::fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationResult::Success => write!(f, "success"),
            EvaluationResult::Failed => write!(f, "failed"),
            EvaluationResult::Unknown => write!(f, "unknown"),
        }
    }
}

/// `Runtime.evaluate` command as sent over the socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluateCommand {
    pub id: u64,
    pub method: String,
    pub params: EvaluateParams,
}

/// Parameters of `Runtime.evaluate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateParams {
    /// Script source, forwarded verbatim
    pub expression: String,
    pub object_group: String,
    pub user_gesture: bool,
}

impl EvaluateCommand {
    pub fn new(expression: impl Into<String>, object_group: impl Into<String>) -> Self {
        Self {
            id: EVALUATE_REQUEST_ID,
            method: EVALUATE_METHOD.to_string(),
            params: EvaluateParams {
                expression: expression.into(),
                object_group: object_group.into(),
                user_gesture: true,
            },
        }
    }

    /// Serialize to the JSON text sent on the socket
    pub fn to_payload(&self) -> DevtoolsResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Result type for devtools operations
pub type DevtoolsResult<T> = Result<T, DevtoolsError>;

/// Error types for devtools operations
#[derive(Debug)]
pub enum DevtoolsError {
    /// Script to inject does not exist
    ScriptNotFound(PathBuf),

    /// The introspection endpoint answered with something that is not a window list
    Protocol(String),

    /// HTTP client could not be built
    Client(String),

    /// Serialization error
    Serialization(serde_json::Error),

    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for DevtoolsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DevtoolsError::ScriptNotFound(path) => {
                write!(f, "Script \"{}\" is not a file", path.display())
            }
            DevtoolsError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            DevtoolsError::Client(msg) => write!(f, "HTTP client error: {}", msg),
            DevtoolsError::Serialization(err) => write!(f, "Serialization error: {}", err),
            DevtoolsError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for DevtoolsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DevtoolsError::Serialization(err) => Some(err),
            DevtoolsError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DevtoolsError {
    fn from(err: std::io::Error) -> Self {
        DevtoolsError::Io(err)
    }
}

impl From<serde_json::Error> for DevtoolsError {
    fn from(err: serde_json::Error) -> Self {
        DevtoolsError::Serialization(err)
    }
}
