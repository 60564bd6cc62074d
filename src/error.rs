use std::net::SocketAddr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    // Startup errors
    #[error("Secret '{name}' is unavailable: {reason}")]
    SecretUnavailable { name: String, reason: String },

    #[error("Secret store error: {0}")]
    SecretStore(String),

    #[error("Failed to initialize client for provider '{provider}': {reason}")]
    ClientInit { provider: String, reason: String },

    // Request errors
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Upload exceeds the size limit: {0}")]
    PayloadTooLarge(String),

    // Provider errors
    #[error("Provider '{provider}' API error: {message}")]
    ProviderApi {
        provider: String,
        message: String,
        status: Option<u16>,
    },

    #[error("Provider '{provider}' returned an unusable response: {reason}")]
    ProviderResponse { provider: String, reason: String },

    #[error("Provider '{provider}' did not answer within {seconds} seconds")]
    ProviderTimeout { provider: String, seconds: u64 },

    // Server errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Failed to bind HTTP listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Generic wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RelayError {
    /// Errors raised by a single provider call. The dispatcher contains these
    /// and reports the provider as null instead of failing the aggregate.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            Self::ProviderApi { .. }
                | Self::ProviderResponse { .. }
                | Self::ProviderTimeout { .. }
                | Self::Http(_)
        )
    }

    /// Errors that must stop the process before it accepts traffic.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Self::SecretUnavailable { .. } | Self::SecretStore(_) | Self::ClientInit { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_failures_are_classified() {
        let err = RelayError::ProviderTimeout {
            provider: "gemini".to_string(),
            seconds: 5,
        };
        assert!(err.is_provider_failure());
        assert!(!err.is_startup_fatal());

        let err = RelayError::InvalidRequest("Missing prompt or media file".to_string());
        assert!(!err.is_provider_failure());
        assert_eq!(err.to_string(), "Missing prompt or media file");
    }

    #[test]
    fn test_startup_errors_are_fatal() {
        let err = RelayError::SecretUnavailable {
            name: "openai-api-key".to_string(),
            reason: "empty payload".to_string(),
        };
        assert!(err.is_startup_fatal());
        assert!(err.to_string().contains("openai-api-key"));
    }

    #[test]
    fn test_oversized_upload_is_neither_fatal_nor_contained() {
        let err = RelayError::PayloadTooLarge("length limit exceeded".to_string());
        assert!(!err.is_provider_failure());
        assert!(!err.is_startup_fatal());
    }
}
