//! Error type shared by the transport, API and driver layers.
//!
//! State operations never fail; only I/O and turn gating produce errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Non-success HTTP response.
    #[error("{message} (status {status})")]
    Http {
        status: u16,
        message: String,
        /// Response body, decoded as JSON when possible.
        data: serde_json::Value,
    },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("socket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("not connected")]
    NotConnected,

    #[error("it's not your turn")]
    NotYourTurn,

    #[error("credential storage: {0}")]
    Storage(#[from] std::io::Error),
}

impl ClientError {
    /// HTTP status for `Http` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the backend rejected the credential.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_display() {
        let err = ClientError::Http {
            status: 403,
            message: "Room is full".to_string(),
            data: serde_json::json!({"message": "Room is full"}),
        };
        assert_eq!(err.to_string(), "Room is full (status 403)");
        assert_eq!(err.status(), Some(403));
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_non_http_has_no_status() {
        assert_eq!(ClientError::NotConnected.status(), None);
        assert_eq!(ClientError::NotYourTurn.status(), None);
    }
}
