// Client-side error taxonomy for calls against the LMS backend
use thiserror::Error;

use crate::session::SessionError;

/// Failure of a call against the LMS backend
#[derive(Debug, Error)]
pub enum ClientError {
    /// Request never reached a server (connect refused, DNS, timeout)
    #[error("could not reach the server: {0}")]
    Network(String),

    /// 401, or no access token in the session
    #[error("authentication required: {0}")]
    Auth(String),

    /// Expected 404 on enrollment lookup
    #[error("not enrolled in this course")]
    NotEnrolled,

    /// Any other non-success response, including validation failures
    #[error("server responded with {status}: {message}")]
    Server { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("unexpected response from server: {0}")]
    Decode(String),

    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ClientError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| default_message(status).to_string());

        match status {
            401 => ClientError::Auth(message),
            _ => ClientError::Server { status, message },
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        ClientError::Auth(message.into())
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        ClientError::Server {
            status,
            message: message.into(),
        }
    }

    /// Whether simply repeating the request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) => true,
            ClientError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn requires_login(&self) -> bool {
        matches!(self, ClientError::Auth(_))
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::Auth(_) => Some(401),
            ClientError::NotEnrolled => Some(404),
            ClientError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Stable code for JSON output
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::Network(_) => "NETWORK_ERROR",
            ClientError::Auth(_) => "UNAUTHORIZED",
            ClientError::NotEnrolled => "NOT_ENROLLED",
            ClientError::Server { status, .. } if *status >= 500 => "SERVER_ERROR",
            ClientError::Server { .. } => "REQUEST_REJECTED",
            ClientError::Decode(_) => "INVALID_RESPONSE",
            ClientError::InvalidBaseUrl(_) => "INVALID_CONFIG",
            ClientError::Session(_) => "SESSION_ERROR",
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::from_status(status.as_u16(), None)
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

fn default_message(status: u16) -> &'static str {
    match status {
        400 => "Bad request",
        401 => "Session expired, please log in again",
        403 => "Forbidden",
        404 => "Not found",
        409 => "Conflict",
        422 => "Validation failed",
        429 => "Too many requests",
        500..=599 => "Internal server error",
        _ => "Request failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_auth() {
        let err = ClientError::from_status(401, None);
        assert!(err.requires_login());
        assert_eq!(err.error_code(), "UNAUTHORIZED");
        assert!(!err.is_retryable());
    }

    #[test]
    fn server_message_is_kept() {
        let err = ClientError::from_status(422, Some("Lesson not found".into()));
        match &err {
            ClientError::Server { status, message } => {
                assert_eq!(*status, 422);
                assert_eq!(message, "Lesson not found");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(err.error_code(), "REQUEST_REJECTED");
    }

    #[test]
    fn empty_message_falls_back_to_status_text() {
        let err = ClientError::from_status(503, Some(String::new()));
        assert_eq!(err.to_string(), "server responded with 503: Internal server error");
        assert!(err.is_retryable());
    }

    #[test]
    fn network_errors_are_retryable() {
        assert!(ClientError::Network("connection refused".into()).is_retryable());
        assert!(!ClientError::NotEnrolled.is_retryable());
    }
}
