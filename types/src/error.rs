//! Error taxonomy shared by every passvote crate.

use thiserror::Error;

/// User-facing message for any connection-level failure.
pub const UNREACHABLE_MESSAGE: &str =
    "Unable to connect to the server. Please make sure the backend is running.";

/// Errors surfaced to whoever initiated an operation.
///
/// The `Display` form of every variant is the human-readable message shown to
/// the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Connection refused, DNS failure, timeout.
    #[error("Unable to connect to the server. Please make sure the backend is running.")]
    Transport { detail: String },

    /// Non-2xx response carrying a service-provided message.
    #[error("{message}")]
    Service { status: u16, message: String },

    /// The user or the platform aborted the credential ceremony.
    #[error("Passkey ceremony was cancelled. Please try again when ready.")]
    CeremonyCancelled,

    /// A well-formed response that is missing required data.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Local input rejected before any network call.
    #[error("{0}")]
    Validation(String),

    /// The platform authenticator rejected the ceremony for another reason.
    #[error("{0}")]
    Platform(String),

    /// The session token was missing or rejected (HTTP 401).
    #[error("Your session has expired. Please sign in again.")]
    Unauthorized,
}

/// How prominently an error should be presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Expected user-driven outcome, e.g. a cancelled ceremony.
    Notice,
    Error,
}

impl ClientError {
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport {
            detail: detail.into(),
        }
    }

    pub fn service(status: u16, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::CeremonyCancelled | Self::Validation(_) => Severity::Notice,
            _ => Severity::Error,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// HTTP status of a service error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => Some(*status),
            Self::Unauthorized => Some(401),
            _ => None,
        }
    }
}

/// Extract the human-readable message from an error response body.
///
/// Falls back to `Request failed with status <code>` when the body carries no
/// usable message (see [`response_message`]).
pub fn extract_error_message(status: u16, content_type: Option<&str>, body: &str) -> String {
    response_message(content_type, body)
        .unwrap_or_else(|| format!("Request failed with status {status}"))
}

/// The message carried by an error response body, if any.
///
/// JSON bodies yield their `error` or `message` string field. Other bodies
/// are themselves tried as JSON, then used verbatim when non-empty.
pub fn response_message(content_type: Option<&str>, body: &str) -> Option<String> {
    let is_json = content_type.is_some_and(|ct| ct.contains("application/json"));
    if is_json {
        let value = serde_json::from_str::<serde_json::Value>(body).ok()?;
        return message_field(&value);
    }

    if body.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => message_field(&value).or_else(|| Some(body.to_string())),
        Err(_) => Some(body.to_string()),
    }
}

fn message_field(value: &serde_json::Value) -> Option<String> {
    ["error", "message"].iter().find_map(|key| {
        value
            .get(*key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}
