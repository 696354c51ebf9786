//! Vision client error types.

use thiserror::Error;

pub type VisionResult<T> = Result<T, VisionError>;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("{0} is not configured")]
    MissingCredential(&'static str),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{service} request failed: {message}")]
    Request { service: &'static str, message: String },

    #[error("{service} request timed out")]
    Timeout { service: &'static str },

    #[error("{service} returned {status}: {body}")]
    UpstreamStatus {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to parse {service} response: {message}")]
    InvalidResponse { service: &'static str, message: String },
}

impl VisionError {
    /// Map a transport error, dropping the request URL (it may carry an API key).
    pub fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout { service };
        }
        Self::Request {
            service,
            message: err.without_url().to_string(),
        }
    }

    pub fn invalid_response(service: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service,
            message: message.into(),
        }
    }

    /// Whether this error means the service cannot be used at all until
    /// configuration changes.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::MissingCredential(_) | Self::Config(_))
    }
}
