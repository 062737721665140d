//! Error types for thinker-ai

use thiserror::Error;

/// Result type alias using thinker-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when calling a completion provider
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed (connect, TLS, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider answered with a status other than 200
    #[error("Provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Response parsed but lacked the expected fields
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Response carried no text
    #[error("Provider returned empty content")]
    EmptyContent,
}

impl Error {
    /// Create a status error, keeping only the head of a long body
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        let body: String = body.into();
        let body = if body.chars().count() > 200 {
            let head: String = body.chars().take(200).collect();
            format!("{}...", head)
        } else {
            body
        };
        Self::Status { status, body }
    }

    /// Check if this error came from the network layer rather than the payload
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_))
    }

    /// Check if this error means the caller's credentials were refused
    pub fn is_auth(&self) -> bool {
        match self {
            Error::InvalidApiKey => true,
            Error::Status { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_body_is_truncated() {
        let e = Error::status(500, "x".repeat(500));
        match e {
            Error::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), 203);
                assert!(body.ends_with("..."));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_status_short_body_kept() {
        let e = Error::status(429, "slow down");
        assert_eq!(e.to_string(), "Provider returned status 429: slow down");
    }

    #[test]
    fn test_is_auth() {
        assert!(Error::InvalidApiKey.is_auth());
        assert!(Error::status(401, "").is_auth());
        assert!(Error::status(403, "").is_auth());
        assert!(!Error::status(500, "").is_auth());
        assert!(!Error::EmptyContent.is_auth());
    }

    #[test]
    fn test_is_transport() {
        assert!(!Error::EmptyContent.is_transport());
        assert!(!Error::UnexpectedResponse("no choices".into()).is_transport());
    }
}
