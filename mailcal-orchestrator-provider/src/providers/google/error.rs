//! Google API error mapping

use crate::error::ProviderError;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};

use super::GoogleProvider;

/// Google error mapping. `code` carries the gRPC-style status (`NOT_FOUND`),
/// or the first legacy `errors[].reason` when the status alone is ambiguous.
/// Reference: <https://cloud.google.com/apis/design/errors>
impl ProviderErrorMapper for GoogleProvider {
    fn provider_name(&self) -> &'static str {
        "google"
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError {
        match raw.code.as_deref() {
            Some("UNAUTHENTICATED" | "authError") => ProviderError::Unauthenticated {
                provider: self.provider_name().to_string(),
                account_id: context.account_id.unwrap_or_default(),
                raw_message: Some(raw.message),
            },

            // 403 的配额类错误，不是权限问题
            Some(
                "RESOURCE_EXHAUSTED"
                | "rateLimitExceeded"
                | "userRateLimitExceeded"
                | "quotaExceeded",
            ) => ProviderError::RateLimited {
                provider: self.provider_name().to_string(),
                retry_after: None,
                raw_message: Some(raw.message),
            },

            Some("PERMISSION_DENIED" | "insufficientPermissions" | "forbidden") => {
                ProviderError::PermissionDenied {
                    provider: self.provider_name().to_string(),
                    raw_message: Some(raw.message),
                }
            }

            Some("NOT_FOUND" | "notFound" | "deleted") => ProviderError::NotFound {
                provider: self.provider_name().to_string(),
                resource: context.resource.unwrap_or("item").to_string(),
                id: context
                    .resource_id
                    .unwrap_or_else(|| "<unknown>".to_string()),
                raw_message: Some(raw.message),
            },

            Some("INVALID_ARGUMENT" | "FAILED_PRECONDITION" | "invalid" | "badRequest") => {
                ProviderError::InvalidParameter {
                    provider: self.provider_name().to_string(),
                    param: "request".to_string(),
                    detail: raw.message,
                }
            }

            // Other error fallback
            _ => self.map_status(raw, context),
        }
    }
}
