//! Unified error type for the claude-bridge workspace.

use thiserror::Error;

/// Enumerates all error kinds that can occur across bridge crates.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No usable credential, or the refresh path is unavailable.
    #[error("authentication error: {0}")]
    Auth(String),

    /// The upstream rejected the bearer token.
    #[error("upstream rejected credentials: {0}")]
    AuthRejected(String),

    /// The requested model is not served by this gateway.
    #[error("unsupported model: {0}")]
    UnsupportedModel(String),

    /// Request or response format translation failure.
    #[error("translation error: {0}")]
    Translation(String),

    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(String),

    /// JSON serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Credential or cache storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration loading or validation error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The upstream returned a non-success status.
    #[error("upstream error: status={status}, body={body}")]
    Upstream { status: u16, body: String },
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for BridgeError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_auth() {
        let err = BridgeError::Auth("no credential stored".to_string());
        assert_eq!(err.to_string(), "authentication error: no credential stored");
    }

    #[test]
    fn test_error_display_upstream() {
        let err = BridgeError::Upstream {
            status: 429,
            body: "rate limited".to_string(),
        };
        let s = err.to_string();
        assert!(s.contains("429"));
        assert!(s.contains("rate limited"));
    }

    #[test]
    fn test_error_display_unsupported_model() {
        let err = BridgeError::UnsupportedModel("gpt-4o".to_string());
        assert!(err.to_string().contains("gpt-4o"));
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid {{{").unwrap_err();
        let err: BridgeError = json_err.into();
        assert!(matches!(err, BridgeError::Serialization(_)));
    }
}
