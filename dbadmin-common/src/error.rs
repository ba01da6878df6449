//! Error taxonomy for API calls made by the panels

use serde::Deserialize;

/// Failure of a fetch or mutation.
///
/// Cloneable so a single in-flight request can hand the same outcome to
/// every caller waiting on it. An empty result is never an error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("{0} must be confirmed before it is sent")]
    ConfirmationRequired(String),

    #[error("{0} is already in progress")]
    MutationPending(String),
}

/// Error body some backend handlers attach to non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiError {
    /// Build a server error from a status code and raw response body
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message.or(b.error))
            .unwrap_or_else(|| body.trim().to_string());

        ApiError::Server { status, message }
    }

    /// Short message suitable for a notification
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            ApiError::Server { status, message } => match status {
                401 => "Your session has expired. Please log in again.".to_string(),
                403 => "You don't have permission to perform this action.".to_string(),
                404 => "The requested resource was not found.".to_string(),
                409 => format!("Operation conflict: {}", message),
                429 => "Too many requests. Please wait a moment and try again.".to_string(),
                500..=599 if message.is_empty() => {
                    "An unexpected server error occurred.".to_string()
                }
                _ if message.is_empty() => format!("Request failed with status {}", status),
                _ => message.clone(),
            },
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}
