//! Provider-type tag → shared provider instance

use std::collections::HashMap;
use std::sync::Arc;

use mailcal_orchestrator_provider::{
    Account, CapabilityProvider, ProviderType, TokenProvider, create_provider,
};

use crate::error::{CoreError, CoreResult};

/// Maps account tags onto one shared [`CapabilityProvider`] per backend.
pub struct ProviderResolver {
    providers: HashMap<ProviderType, Arc<dyn CapabilityProvider>>,
}

impl ProviderResolver {
    /// One instance of every backend, hosted ones reading tokens from `tokens`.
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        let providers = ProviderType::ALL
            .into_iter()
            .map(|ty| (ty, create_provider(ty, Arc::clone(&tokens))))
            .collect();
        Self { providers }
    }

    /// Resolver with no backends; tags resolve only after [`with_provider`](Self::with_provider).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Install or replace the instance serving `ty`.
    #[must_use]
    pub fn with_provider(mut self, ty: ProviderType, provider: Arc<dyn CapabilityProvider>) -> Self {
        self.providers.insert(ty, provider);
        self
    }

    /// Resolve a free-form tag.
    pub fn resolve(&self, tag: &str) -> CoreResult<Arc<dyn CapabilityProvider>> {
        ProviderType::from_tag(tag)
            .and_then(|ty| self.providers.get(&ty).cloned())
            .ok_or_else(|| CoreError::UnknownProviderType(tag.trim().to_string()))
    }

    /// Resolve the provider serving `account`.
    pub fn resolve_account(&self, account: &Account) -> CoreResult<Arc<dyn CapabilityProvider>> {
        self.resolve(&account.provider).inspect_err(|_| {
            log::warn!(
                "Account '{}' has unknown provider type '{}'",
                account.id,
                account.provider
            );
        })
    }

    /// Backends this resolver can hand out.
    pub fn provider_types(&self) -> Vec<ProviderType> {
        ProviderType::ALL
            .into_iter()
            .filter(|ty| self.providers.contains_key(ty))
            .collect()
    }
}
