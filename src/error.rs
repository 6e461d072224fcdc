//! Error types for the adapters
//!
//! Every failure an adapter can produce is an [`AdapterError`]. At the dispatch
//! boundary each error is reduced to an [`ErrorKind`] plus a message, which is
//! what the calling agent sees.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Main error type for the adapters
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Authorization errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Provider (API or local application) errors
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// MCP protocol errors
    #[error("{0}")]
    Mcp(#[from] McpError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport errors (connect, timeout, body decode)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Authorization errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("OAuth client secrets file not found: {path}")]
    KeysFileNotFound { path: String },

    #[error("Invalid OAuth client secrets format: expected 'installed' or 'web' credentials")]
    InvalidKeysFormat,

    /// No usable session and no interactive consent path
    #[error("Authorization expired: {message}. Run the `auth` subcommand to re-authorize")]
    Expired { message: String },

    /// Provider refused the presented access token mid-call
    #[error("Authorization rejected by provider: {message}. Run the `auth` subcommand to re-authorize")]
    Rejected { message: String },

    #[error("Credential file {path} is corrupt: {message}. Run the `auth` subcommand to re-authorize")]
    CredentialFileCorrupt { path: String, message: String },

    #[error("OAuth callback error: {message}")]
    CallbackError { message: String },

    #[error("No authorization code provided")]
    NoAuthCode,

    #[error("Timed out after {secs} seconds waiting for browser consent")]
    ConsentTimedOut { secs: u64 },

    #[error("Token exchange failed: {message}")]
    TokenExchangeFailed { message: String },
}

/// Provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Rate limited by provider: {message}")]
    RateLimited {
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Provider unavailable: {message}")]
    Unavailable { message: String },

    /// The provider refused the request itself (4xx other than auth, 404, 429)
    #[error("Provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The provider answered with data that does not have the expected shape
    #[error("Unexpected provider response: {message}")]
    UnexpectedResponse { message: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found: {path}")]
    DirNotFound { path: String },

    #[error("Failed to create config directory: {path}")]
    DirCreationFailed { path: String },

    #[error("Invalid value for {var}: {value}")]
    InvalidEnvVar { var: String, value: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Malformed request: {message}")]
    MalformedRequest { message: String },

    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },
}

/// Error classes reported to the calling agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    MalformedRequestError,
    UnknownToolError,
    InvalidArgumentsError,
    AuthExpiredError,
    AuthRejectedError,
    CredentialFileCorruptError,
    NotFoundError,
    RateLimitedError,
    ProviderUnavailableError,
    ProviderRejectedError,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedRequestError => "MalformedRequestError",
            ErrorKind::UnknownToolError => "UnknownToolError",
            ErrorKind::InvalidArgumentsError => "InvalidArgumentsError",
            ErrorKind::AuthExpiredError => "AuthExpiredError",
            ErrorKind::AuthRejectedError => "AuthRejectedError",
            ErrorKind::CredentialFileCorruptError => "CredentialFileCorruptError",
            ErrorKind::NotFoundError => "NotFoundError",
            ErrorKind::RateLimitedError => "RateLimitedError",
            ErrorKind::ProviderUnavailableError => "ProviderUnavailableError",
            ErrorKind::ProviderRejectedError => "ProviderRejectedError",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AdapterError {
    /// Classify this error for the protocol boundary
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdapterError::Auth(e) => match e {
                AuthError::Rejected { .. } => ErrorKind::AuthRejectedError,
                AuthError::CredentialFileCorrupt { .. } => ErrorKind::CredentialFileCorruptError,
                _ => ErrorKind::AuthExpiredError,
            },
            AdapterError::Provider(e) => match e {
                ProviderError::NotFound { .. } => ErrorKind::NotFoundError,
                ProviderError::RateLimited { .. } => ErrorKind::RateLimitedError,
                ProviderError::Unavailable { .. } => ErrorKind::ProviderUnavailableError,
                ProviderError::Rejected { .. } => ErrorKind::ProviderRejectedError,
                ProviderError::UnexpectedResponse { .. } => ErrorKind::ProviderUnavailableError,
            },
            AdapterError::Mcp(e) => match e {
                McpError::MalformedRequest { .. } => ErrorKind::MalformedRequestError,
                McpError::UnknownTool { .. } => ErrorKind::UnknownToolError,
                McpError::InvalidArguments { .. } => ErrorKind::InvalidArgumentsError,
            },
            AdapterError::Http(_) => ErrorKind::ProviderUnavailableError,
            AdapterError::Config(_) | AdapterError::Io(_) | AdapterError::Json(_) => {
                ErrorKind::InternalError
            }
        }
    }

    /// Provider retry hint, when one was given
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            AdapterError::Provider(ProviderError::RateLimited {
                retry_after_secs, ..
            }) => *retry_after_secs,
            _ => None,
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        AdapterError::Provider(ProviderError::NotFound {
            resource: resource.into(),
        })
    }

    pub fn invalid_arguments(tool: impl Into<String>, message: impl Into<String>) -> Self {
        AdapterError::Mcp(McpError::InvalidArguments {
            tool: tool.into(),
            message: message.into(),
        })
    }

    pub fn auth_expired(message: impl Into<String>) -> Self {
        AdapterError::Auth(AuthError::Expired {
            message: message.into(),
        })
    }

    pub fn unexpected_response(message: impl Into<String>) -> Self {
        AdapterError::Provider(ProviderError::UnexpectedResponse {
            message: message.into(),
        })
    }
}

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::KeysFileNotFound {
            path: "/path/to/credentials.json".to_string(),
        };
        assert!(err.to_string().contains("/path/to/credentials.json"));
    }

    #[test]
    fn test_error_conversion() {
        let err: AdapterError = AuthError::NoAuthCode.into();
        assert!(matches!(err, AdapterError::Auth(_)));
        assert_eq!(err.kind(), ErrorKind::AuthExpiredError);
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            AdapterError::not_found("message abc").kind(),
            ErrorKind::NotFoundError
        );
        assert_eq!(
            AdapterError::Auth(AuthError::Rejected {
                message: "revoked".into()
            })
            .kind(),
            ErrorKind::AuthRejectedError
        );
        assert_eq!(
            AdapterError::invalid_arguments("gmail_get", "missing message_id").kind(),
            ErrorKind::InvalidArgumentsError
        );
        assert_eq!(
            AdapterError::Mcp(McpError::UnknownTool { name: "x".into() }).kind(),
            ErrorKind::UnknownToolError
        );
    }

    #[test]
    fn test_retry_hint_only_for_rate_limits() {
        let limited = AdapterError::Provider(ProviderError::RateLimited {
            message: "quota".into(),
            retry_after_secs: Some(30),
        });
        assert_eq!(limited.kind(), ErrorKind::RateLimitedError);
        assert_eq!(limited.retry_after_secs(), Some(30));
        assert_eq!(AdapterError::not_found("x").retry_after_secs(), None);
    }

    #[test]
    fn test_kind_names_match_taxonomy() {
        assert_eq!(ErrorKind::NotFoundError.to_string(), "NotFoundError");
        assert_eq!(
            serde_json::to_value(ErrorKind::RateLimitedError).unwrap(),
            serde_json::json!("RateLimitedError")
        );
    }
}
