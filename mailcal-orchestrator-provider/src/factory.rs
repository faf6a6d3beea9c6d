//! Provider factory functions and metadata.

use std::sync::Arc;

use crate::providers::{GoogleProvider, IcsProvider, JsonCalendarProvider, OutlookProvider};
use crate::traits::{CapabilityProvider, TokenProvider};
use crate::types::{ProviderMetadata, ProviderType};

/// Creates a [`CapabilityProvider`] for the given backend.
///
/// Providers are not bound to an account: every call receives the target
/// [`Account`](crate::Account), so one instance per [`ProviderType`] can serve
/// all accounts of that type. Hosted backends obtain bearer tokens from
/// `tokens`; feed backends ignore it.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use mailcal_orchestrator_provider::{
///     create_provider, CapabilityProvider, ProviderType, TokenProvider,
/// };
///
/// # fn example(tokens: Arc<dyn TokenProvider>) {
/// let ty = ProviderType::from_tag("m365").unwrap();
/// let provider = create_provider(ty, tokens);
/// assert!(provider.capabilities().writable);
/// # }
/// ```
pub fn create_provider(
    provider_type: ProviderType,
    tokens: Arc<dyn TokenProvider>,
) -> Arc<dyn CapabilityProvider> {
    match provider_type {
        ProviderType::Outlook => Arc::new(OutlookProvider::new(tokens)),
        ProviderType::Google => Arc::new(GoogleProvider::new(tokens)),
        ProviderType::Ics => Arc::new(IcsProvider::new()),
        ProviderType::JsonCalendar => Arc::new(JsonCalendarProvider::new()),
    }
}

/// Returns metadata for every supported backend, in [`ProviderType::ALL`] order.
///
/// Useful for listing available providers together with the per-account
/// config keys each one reads.
pub fn get_all_provider_metadata() -> Vec<ProviderMetadata> {
    ProviderType::ALL
        .iter()
        .map(|ty| match ty {
            ProviderType::Outlook => OutlookProvider::metadata(),
            ProviderType::Google => GoogleProvider::metadata(),
            ProviderType::Ics => IcsProvider::metadata(),
            ProviderType::JsonCalendar => JsonCalendarProvider::metadata(),
        })
        .collect()
}
