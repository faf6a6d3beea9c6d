//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

// Re-export library error type
pub use mailcal_orchestrator_provider::ProviderError;

/// Core layer error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Provider tag outside the synonym table
    #[error("Unknown provider type: {0}")]
    UnknownProviderType(String),

    /// Routing found no usable account
    #[error("No account available for this operation")]
    NoAccountAvailable,

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The account configuration could not be read
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A fault inside the orchestrator itself
    #[error("Internal error: {0}")]
    Internal(String),

    /// Provider error (converting from library)
    #[error("{0}")]
    Provider(#[from] ProviderError),
}

/// Coarse classification used by callers and agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The account or the target message/event/contact does not exist.
    NotFound,
    /// The account needs to be re-authenticated.
    Unauthenticated,
    /// The backend cannot perform this operation.
    Unsupported,
    /// Network, timeout, rate limit or feed fetch failure; may succeed later.
    TransientFetchFailure,
    /// Any other failure reported by a backend, or an internal fault.
    RemoteOperationFailure,
    /// Bad input: batch shape, enum value, provider tag, or nothing to route to.
    ValidationFailure,
}

impl ErrorKind {
    /// 预期内的错误使用 `warn` 级别日志
    #[must_use]
    pub fn is_expected(self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::Unauthenticated | Self::Unsupported | Self::ValidationFailure
        )
    }
}

impl CoreError {
    /// Classify the error.
    ///
    /// **Please update this method simultaneously when new variants are added.**
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AccountNotFound(_) => ErrorKind::NotFound,
            Self::UnknownProviderType(_)
            | Self::NoAccountAvailable
            | Self::ValidationError(_)
            | Self::ConfigurationError(_) => ErrorKind::ValidationFailure,
            Self::Internal(_) => ErrorKind::RemoteOperationFailure,
            Self::Provider(e) => match e {
                ProviderError::NotFound { .. } => ErrorKind::NotFound,
                ProviderError::Unauthenticated { .. } => ErrorKind::Unauthenticated,
                ProviderError::Unsupported { .. } => ErrorKind::Unsupported,
                ProviderError::FetchFailed { .. }
                | ProviderError::NetworkError { .. }
                | ProviderError::Timeout { .. }
                | ProviderError::RateLimited { .. } => ErrorKind::TransientFetchFailure,
                ProviderError::InvalidParameter { .. } => ErrorKind::ValidationFailure,
                ProviderError::PermissionDenied { .. }
                | ProviderError::ParseError { .. }
                | ProviderError::RemoteError { .. } => ErrorKind::RemoteOperationFailure,
            },
        }
    }

    /// Whether it is expected behavior (user input, resource does not exist, etc.) is used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::ConfigurationError(_)) && self.kind().is_expected()
    }
}

/// Serialisable per-account / per-item error record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&CoreError> for ErrorInfo {
    fn from(e: &CoreError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<CoreError> for ErrorInfo {
    fn from(e: CoreError) -> Self {
        Self::from(&e)
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;
