//! Account and provider overview service

use std::collections::BTreeMap;
use std::sync::Arc;

use mailcal_orchestrator_provider::{Account, ProviderMetadata, get_all_provider_metadata};

use crate::error::CoreResult;
use crate::services::ServiceContext;
use crate::types::{AccountInfo, AccountStatusSummary};

/// Read-only view over the account registry
pub struct AccountService {
    ctx: Arc<ServiceContext>,
}

impl AccountService {
    /// Create an account service instance
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    fn info(&self, account: &Account) -> AccountInfo {
        let capabilities = self
            .ctx
            .resolver
            .resolve(&account.provider)
            .ok()
            .map(|p| p.capabilities());
        AccountInfo::new(account, capabilities)
    }

    /// List all accounts, highest priority first, then by display name
    pub fn list_accounts(&self) -> Vec<AccountInfo> {
        let snapshot = self.ctx.registry.snapshot();
        let mut accounts: Vec<&Arc<Account>> = snapshot.all().iter().collect();
        accounts.sort_by(|a, b| {
            b.priority.cmp(&a.priority).then_with(|| {
                a.display_name()
                    .to_lowercase()
                    .cmp(&b.display_name().to_lowercase())
            })
        });
        accounts.into_iter().map(|a| self.info(a)).collect()
    }

    /// Get account based on ID
    pub fn get_account(&self, account_id: &str) -> CoreResult<AccountInfo> {
        let account = self.ctx.registry.require(account_id)?;
        Ok(self.info(&account))
    }

    /// Registry summary
    pub fn account_status(&self) -> AccountStatusSummary {
        let snapshot = self.ctx.registry.snapshot();
        let mut by_provider = BTreeMap::new();
        let mut unresolved = Vec::new();

        for account in snapshot.all() {
            match self.ctx.resolver.resolve(&account.provider) {
                Ok(provider) => {
                    *by_provider
                        .entry(provider.provider_type().as_str().to_string())
                        .or_insert(0) += 1;
                }
                Err(_) => unresolved.push(account.id.clone()),
            }
        }

        let enabled = snapshot.enabled().count();
        AccountStatusSummary {
            total: snapshot.len(),
            enabled,
            disabled: snapshot.len() - enabled,
            by_provider,
            unresolved,
            generation: snapshot.generation(),
            loaded_at: snapshot.loaded_at(),
        }
    }

    /// Metadata of every supported backend
    pub fn list_providers(&self) -> Vec<ProviderMetadata> {
        get_all_provider_metadata()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::test_utils::{MockProvider, create_test_context, test_account};
    use mailcal_orchestrator_provider::{ProviderCapabilities, ProviderType};

    fn service() -> AccountService {
        let hosted = Arc::new(MockProvider::hosted(ProviderType::Google));
        let feed = Arc::new(MockProvider::new(
            ProviderType::Ics,
            ProviderCapabilities::CALENDAR_FEED,
        ));
        let ctx = create_test_context(
            vec![
                test_account("zeta", "gmail", &["z.com"]),
                test_account("alpha", "gmail", &["a.com"]).with_enabled(false),
                test_account("feed", "webcal", &[]).with_priority(5),
                test_account("odd", "pager", &[]),
            ],
            &[(ProviderType::Google, hosted), (ProviderType::Ics, feed)],
        );
        AccountService::new(ctx)
    }

    #[test]
    fn list_orders_by_priority_then_name() {
        let ids: Vec<_> = service()
            .list_accounts()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["feed", "alpha", "odd", "zeta"]);
    }

    #[test]
    fn info_carries_capabilities_when_resolvable() {
        let svc = service();
        let feed = svc.get_account("FEED").unwrap();
        assert_eq!(feed.provider_type, Some(ProviderType::Ics));
        assert_eq!(feed.capabilities, Some(ProviderCapabilities::CALENDAR_FEED));

        let odd = svc.get_account("odd").unwrap();
        assert!(odd.provider_type.is_none());
        assert!(odd.capabilities.is_none());

        assert!(matches!(
            svc.get_account("missing"),
            Err(CoreError::AccountNotFound(_))
        ));
    }

    #[test]
    fn status_counts_accounts() {
        let status = service().account_status();
        assert_eq!(status.total, 4);
        assert_eq!(status.enabled, 3);
        assert_eq!(status.disabled, 1);
        assert_eq!(status.by_provider.get("google"), Some(&2));
        assert_eq!(status.by_provider.get("ics"), Some(&1));
        assert_eq!(status.unresolved, vec!["odd".to_string()]);
        assert!(status.generation >= 1);
    }

    #[test]
    fn providers_are_listed() {
        let providers = service().list_providers();
        assert_eq!(providers.len(), ProviderType::ALL.len());
    }
}
