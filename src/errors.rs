/*!
 * Error types for the subgate gateway.
 *
 * `ProviderError` is the only error type an adapter may return: whatever the
 * upstream transport fails with is folded into one of its variants before it
 * leaves the adapter. `AppError` adds the failures that happen around the
 * adapters (provider resolution, bad input, configuration).
 */

use thiserror::Error;

/// Errors that can occur when talking to an upstream subtitle provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The request was malformed for this provider (e.g. a bad download URL shape)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing, invalid or expired credentials, or a failed session login
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The upstream rejected the call with HTTP 429
    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        /// Message reported by the upstream
        message: String,
        /// Reset time reported by the upstream, if any
        reset_time: Option<String>,
    },

    /// The upstream answered, but with a failure
    #[error("Upstream error ({status_code}): {message}")]
    Upstream {
        /// HTTP status code of the upstream response
        status_code: u16,
        /// Message from the upstream body when available
        message: String,
    },

    /// The upstream could not be reached
    #[error("Connection error: {0}")]
    Connectivity(String),
}

impl ProviderError {
    /// Build an upstream error from a status code and message
    pub fn upstream(status_code: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            status_code,
            message: message.into(),
        }
    }

    /// HTTP status code the gateway answers with for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 422,
            Self::Authentication(_) => 401,
            Self::RateLimited { .. } => 429,
            Self::Upstream { .. } => 500,
            Self::Connectivity(_) => 503,
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a provider adapter
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// The requested provider name is not one of the supported providers
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// The inbound request could not be understood
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// HTTP status code the gateway answers with for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Provider(e) => e.status_code(),
            Self::UnknownProvider(_) | Self::BadRequest(_) => 400,
            Self::Config(_) => 500,
        }
    }
}
