//! Microsoft Graph error mapping

use crate::error::ProviderError;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};

use super::OutlookProvider;

/// Graph error code mapping
/// Reference: <https://learn.microsoft.com/en-us/graph/errors>
impl ProviderErrorMapper for OutlookProvider {
    fn provider_name(&self) -> &'static str {
        "outlook"
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError {
        match raw.code.as_deref() {
            // Token expired, revoked or issued for another audience
            Some("InvalidAuthenticationToken" | "AuthenticationError") => {
                ProviderError::Unauthenticated {
                    provider: self.provider_name().to_string(),
                    account_id: context.account_id.unwrap_or_default(),
                    raw_message: Some(raw.message),
                }
            }

            // Mailbox exists but the app/user may not touch it
            Some("ErrorAccessDenied" | "Authorization_RequestDenied" | "accessDenied") => {
                ProviderError::PermissionDenied {
                    provider: self.provider_name().to_string(),
                    raw_message: Some(raw.message),
                }
            }

            // Item does not exist (ids are opaque, malformed ones are also "not found")
            Some(
                "ErrorItemNotFound"
                | "ResourceNotFound"
                | "itemNotFound"
                | "ErrorInvalidIdMalformed"
                | "ErrorInvalidIdNotAnItemAttachmentId",
            ) => ProviderError::NotFound {
                provider: self.provider_name().to_string(),
                resource: context.resource.unwrap_or("item").to_string(),
                id: context
                    .resource_id
                    .unwrap_or_else(|| "<unknown>".to_string()),
                raw_message: Some(raw.message),
            },

            // Invalid parameter
            Some(code @ ("ErrorInvalidRecipients" | "ErrorInvalidParameter" | "ErrorInvalidRequest")) => {
                let param = match code {
                    "ErrorInvalidRecipients" => "recipients",
                    _ => "request",
                };
                ProviderError::InvalidParameter {
                    provider: self.provider_name().to_string(),
                    param: param.to_string(),
                    detail: raw.message,
                }
            }

            // Throttling without HTTP 429 (HttpUtils already handles 429 itself)
            Some("ApplicationThrottled" | "ErrorServerBusy" | "activityLimitReached") => {
                ProviderError::RateLimited {
                    provider: self.provider_name().to_string(),
                    retry_after: None,
                    raw_message: Some(raw.message),
                }
            }

            // Mailbox is on-premises or has no Exchange Online license
            Some("MailboxNotEnabledForRESTAPI" | "ErrorMailboxNotEnabledForRESTAPI") => {
                ProviderError::unsupported(self.provider_name(), "mailbox")
            }

            // Other error fallback
            _ => self.map_status(raw, context),
        }
    }
}
