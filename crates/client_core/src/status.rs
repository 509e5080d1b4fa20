use std::fmt;

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Error,
}

/// One-line, transient feedback shown after a user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Error,
            text: text.into(),
        }
    }

    pub fn from_result<T>(result: &Result<T, ClientError>, success: impl Into<String>) -> Self {
        match result {
            Ok(_) => Self::info(success),
            Err(err) => Self::from(err),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == StatusLevel::Error
    }
}

impl From<&ClientError> for StatusMessage {
    fn from(err: &ClientError) -> Self {
        match err {
            // The server's own wording is what the judge needs to see.
            ClientError::Rejected(message) | ClientError::Validation(message) => {
                Self::error(message.clone())
            }
            ClientError::Network(_) => Self::error(format!("Could not reach the server ({err})")),
            other => Self::error(other.to_string()),
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            StatusLevel::Info => write!(f, "{}", self.text),
            StatusLevel::Error => write!(f, "error: {}", self.text),
        }
    }
}
