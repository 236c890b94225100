//! Error types for slugbot.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Message error: {0}")]
    Message(#[from] MessageError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failure reported by the messaging platform.
///
/// `NotFound` is the sentinel for "the referenced remote message does not
/// exist" (HTTP 404 / Unknown Message); everything else is `Other`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("unknown message")]
    NotFound,

    #[error("{0}")]
    Other(String),
}

impl RemoteError {
    pub fn other(reason: impl Into<String>) -> Self {
        Self::Other(reason.into())
    }
}

/// Errors from the remote message lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// A precondition failed; no remote call was made.
    #[error("{op} failed validation: {reason}")]
    Validation { op: &'static str, reason: String },

    /// The platform call itself failed.
    #[error("{op} request failed: {source}")]
    Remote {
        op: &'static str,
        #[source]
        source: RemoteError,
    },
}

impl MessageError {
    pub(crate) fn validation(op: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            op,
            reason: reason.into(),
        }
    }

    /// Whether the failure happened before any remote call.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// The underlying remote error, if the platform call failed.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Remote { source, .. } => Some(source),
            Self::Validation { .. } => None,
        }
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
