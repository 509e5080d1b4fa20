use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Validation(String),
    #[error("invalid JSON: {0}")]
    MalformedInput(#[source] serde_json::Error),
    #[error("unexpected response body: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("realtime channel failed: {0}")]
    Realtime(String),
    #[error("invalid configuration: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("invalid server url: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(value: url::ParseError) -> Self {
        ClientError::InvalidUrl(value.to_string())
    }
}
