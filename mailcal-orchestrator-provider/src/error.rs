use serde::{Deserialize, Serialize};

/// Unified error type for all capability provider operations.
///
/// Each variant includes a `provider` field identifying which backend produced the error,
/// plus variant-specific context. All variants are serializable for structured error reporting.
///
/// # Retryable Errors
///
/// The following variants represent transient failures that may succeed on retry:
/// - [`NetworkError`](Self::NetworkError) — network connectivity issues
/// - [`Timeout`](Self::Timeout) — request timed out
/// - [`RateLimited`](Self::RateLimited) — API rate limit exceeded
///
/// The built-in HTTP client retries these with exponential backoff for idempotent requests.
/// [`FetchFailed`](Self::FetchFailed) is transient too, but feed providers recover
/// from it through their stale cache instead of retrying.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum ProviderError {
    /// A network-level error occurred (DNS resolution failure, connection refused, etc.).
    NetworkError {
        /// Provider that produced the error.
        provider: String,
        /// Error details.
        detail: String,
    },

    /// The HTTP request timed out.
    Timeout {
        /// Provider that produced the error.
        provider: String,
        /// Error details.
        detail: String,
    },

    /// The API rate limit has been exceeded (HTTP 429 or equivalent).
    RateLimited {
        /// Provider that produced the error.
        provider: String,
        /// Suggested wait time in seconds before retrying, if provided by the API.
        retry_after: Option<u64>,
        /// Original error message from the provider API, if available.
        raw_message: Option<String>,
    },

    /// No valid credential is available for the account.
    ///
    /// Signals "re-authenticate", not "retry".
    Unauthenticated {
        /// Provider that produced the error.
        provider: String,
        /// Account the credential was requested for.
        account_id: String,
        /// Original error message from the provider API, if available.
        raw_message: Option<String>,
    },

    /// The operation is not possible on this backend (e.g. a write on a read-only feed).
    Unsupported {
        /// Provider that produced the error.
        provider: String,
        /// Name of the rejected operation.
        operation: String,
    },

    /// The requested message, event or contact was not found.
    NotFound {
        /// Provider that produced the error.
        provider: String,
        /// Kind of resource (`message`, `event`, `contact`).
        resource: String,
        /// Identifier that was looked up.
        id: String,
        /// Original error message from the provider API, if available.
        raw_message: Option<String>,
    },

    /// A feed document or calendar file could not be fetched.
    FetchFailed {
        /// Provider that produced the error.
        provider: String,
        /// Where the fetch was attempted (URL or path).
        source: String,
        /// Error details.
        detail: String,
    },

    /// The authenticated user lacks permission for the requested operation.
    PermissionDenied {
        /// Provider that produced the error.
        provider: String,
        /// Original error message from the provider API, if available.
        raw_message: Option<String>,
    },

    /// A request parameter is invalid.
    InvalidParameter {
        /// Provider that produced the error.
        provider: String,
        /// Name of the invalid parameter.
        param: String,
        /// Description of what's wrong.
        detail: String,
    },

    /// Failed to parse the provider's response or document.
    ParseError {
        /// Provider that produced the error.
        provider: String,
        /// Details about the parse failure.
        detail: String,
    },

    /// Any other failure reported by the remote backend.
    RemoteError {
        /// Provider that produced the error.
        provider: String,
        /// HTTP status, if the failure came from an HTTP response.
        status: Option<u16>,
        /// Backend error code, if available.
        raw_code: Option<String>,
        /// Backend error message.
        raw_message: String,
    },
}

impl ProviderError {
    /// 是否为预期行为（用户输入、资源不存在等），用于日志分级。
    ///
    /// 返回 `true` 时应使用 `warn` 级别，`false` 时使用 `error` 级别。
    /// **新增变体时请同步更新此方法。**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated { .. }
                | Self::Unsupported { .. }
                | Self::NotFound { .. }
                | Self::PermissionDenied { .. }
                | Self::InvalidParameter { .. }
        )
    }

    /// Whether the failure is transient (network, timeout, rate limit, feed fetch).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. }
                | Self::Timeout { .. }
                | Self::RateLimited { .. }
                | Self::FetchFailed { .. }
        )
    }

    /// Shortcut for the "not possible on this backend" error.
    pub fn unsupported(provider: &str, operation: &str) -> Self {
        Self::Unsupported {
            provider: provider.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Shortcut for the "no credential" error.
    pub fn unauthenticated(provider: &str, account_id: &str) -> Self {
        Self::Unauthenticated {
            provider: provider.to_string(),
            account_id: account_id.to_string(),
            raw_message: None,
        }
    }

    /// Shortcut for a missing message/event/contact.
    pub fn not_found(provider: &str, resource: &str, id: &str) -> Self {
        Self::NotFound {
            provider: provider.to_string(),
            resource: resource.to_string(),
            id: id.to_string(),
            raw_message: None,
        }
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkError { provider, detail } => {
                write!(f, "[{provider}] Network error: {detail}")
            }
            Self::Timeout { provider, detail } => {
                write!(f, "[{provider}] Request timeout: {detail}")
            }
            Self::RateLimited {
                provider,
                retry_after,
                ..
            } => {
                if let Some(secs) = retry_after {
                    write!(f, "[{provider}] Rate limited (retry after {secs}s)")
                } else {
                    write!(f, "[{provider}] Rate limited")
                }
            }
            Self::Unauthenticated {
                provider,
                account_id,
                raw_message,
            } => {
                if let Some(msg) = raw_message {
                    write!(
                        f,
                        "[{provider}] Authentication required for account '{account_id}': {msg}"
                    )
                } else {
                    write!(
                        f,
                        "[{provider}] Authentication required for account '{account_id}'"
                    )
                }
            }
            Self::Unsupported {
                provider,
                operation,
            } => {
                write!(f, "[{provider}] Operation '{operation}' is not supported")
            }
            Self::NotFound {
                provider,
                resource,
                id,
                raw_message,
            } => {
                if let Some(msg) = raw_message {
                    write!(f, "[{provider}] {resource} '{id}' not found: {msg}")
                } else {
                    write!(f, "[{provider}] {resource} '{id}' not found")
                }
            }
            Self::FetchFailed {
                provider,
                source,
                detail,
            } => {
                write!(f, "[{provider}] Failed to fetch '{source}': {detail}")
            }
            Self::PermissionDenied {
                provider,
                raw_message,
            } => {
                if let Some(msg) = raw_message {
                    write!(f, "[{provider}] Permission denied: {msg}")
                } else {
                    write!(f, "[{provider}] Permission denied")
                }
            }
            Self::InvalidParameter {
                provider,
                param,
                detail,
            } => {
                write!(f, "[{provider}] Invalid parameter '{param}': {detail}")
            }
            Self::ParseError { provider, detail } => {
                write!(f, "[{provider}] Parse error: {detail}")
            }
            Self::RemoteError {
                provider,
                status,
                raw_message,
                ..
            } => {
                if let Some(status) = status {
                    write!(f, "[{provider}] HTTP {status}: {raw_message}")
                } else {
                    write!(f, "[{provider}] {raw_message}")
                }
            }
        }
    }
}

impl std::error::Error for ProviderError {}

/// Convenience type alias for `Result<T, ProviderError>`.
pub type Result<T> = std::result::Result<T, ProviderError>;
