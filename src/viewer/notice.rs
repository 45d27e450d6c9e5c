use serde::Serialize;
use std::fmt;

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// The same action can simply be tried again
    Retryable,
    /// The session is missing or expired
    LoginRequired,
    /// The server refused; shown as-is
    Message,
}

/// Banner shown to the learner after a failed call. Failures never leave
/// the viewer in a half-updated state; they end up here instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Message,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == NoticeKind::Retryable
    }
}

impl From<&ClientError> for Notice {
    fn from(err: &ClientError) -> Self {
        let kind = if err.requires_login() {
            NoticeKind::LoginRequired
        } else if err.is_retryable() {
            NoticeKind::Retryable
        } else {
            NoticeKind::Message
        };

        let message = match err {
            ClientError::Server { message, .. } => message.clone(),
            ClientError::Auth(_) => "Please log in again".to_string(),
            other => other.to_string(),
        };

        Self { kind, message }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            NoticeKind::Retryable => write!(f, "{} (try again)", self.message),
            NoticeKind::LoginRequired => write!(f, "{} (run `lms auth login`)", self.message),
            NoticeKind::Message => f.write_str(&self.message),
        }
    }
}
