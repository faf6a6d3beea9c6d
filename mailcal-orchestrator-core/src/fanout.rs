//! Multi-account read queries
//!
//! One logical read is dispatched to every target account at once. A failing or
//! slow account turns into a [`FanoutWarning`]; the others still contribute
//! their items.

use std::cmp::Ordering;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use mailcal_orchestrator_provider::{Account, Capability, CapabilityProvider, ProviderError};
use serde::Serialize;

use crate::error::{CoreError, CoreResult, ErrorInfo};
use crate::registry::AccountRegistry;
use crate::resolver::ProviderResolver;

/// Which accounts a read targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountSelector {
    /// Every enabled account whose backend serves the capability.
    All,
    /// Exactly this account, enabled or not.
    One(String),
}

impl AccountSelector {
    /// `None`, blank and `"all"` select every account.
    pub fn from_option(account_id: Option<&str>) -> Self {
        match account_id.map(str::trim) {
            None | Some("") => Self::All,
            Some(id) if id.eq_ignore_ascii_case("all") => Self::All,
            Some(id) => Self::One(id.to_string()),
        }
    }
}

/// One account that contributed no items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FanoutWarning {
    pub account_id: String,
    pub error: ErrorInfo,
}

impl FanoutWarning {
    pub fn new(account_id: &str, error: &CoreError) -> Self {
        Self {
            account_id: account_id.to_string(),
            error: ErrorInfo::from(error),
        }
    }
}

/// Items from every account that answered, plus a warning per account that didn't.
#[derive(Debug, Clone, Serialize)]
pub struct FanoutResult<T> {
    pub items: Vec<T>,
    pub warnings: Vec<FanoutWarning>,
}

impl<T> FanoutResult<T> {
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.items.sort_by(compare);
    }

    pub fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    /// Whether at least one account failed.
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }
}

impl<T> Default for FanoutResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Runs one read against many accounts concurrently.
pub struct FanoutExecutor {
    registry: Arc<AccountRegistry>,
    resolver: Arc<ProviderResolver>,
    timeout: Duration,
}

impl FanoutExecutor {
    #[must_use]
    pub fn new(
        registry: Arc<AccountRegistry>,
        resolver: Arc<ProviderResolver>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            resolver,
            timeout,
        }
    }

    /// Run `op` against every account `selector` targets.
    ///
    /// Only selecting fails the call (an unknown account, or an explicitly named
    /// account whose provider type cannot be resolved). Once dispatched, every
    /// per-account error or timeout is reported as a warning.
    pub async fn execute<T, F, Fut>(
        &self,
        selector: &AccountSelector,
        capability: Capability,
        op: F,
    ) -> CoreResult<FanoutResult<T>>
    where
        F: Fn(Arc<dyn CapabilityProvider>, Arc<Account>) -> Fut,
        Fut: Future<Output = Result<Vec<T>, ProviderError>>,
    {
        let mut result = FanoutResult::default();
        let mut targets = Vec::new();

        match selector {
            AccountSelector::All => {
                let snapshot = self.registry.snapshot();
                for account in snapshot.enabled() {
                    match self.resolver.resolve_account(account) {
                        Ok(provider) if provider.capabilities().supports(capability) => {
                            targets.push((Arc::clone(account), provider));
                        }
                        Ok(_) => {
                            log::debug!("Skipping account '{}': no {capability} support", account.id);
                        }
                        Err(e) => result.warnings.push(FanoutWarning::new(&account.id, &e)),
                    }
                }
            }
            AccountSelector::One(id) => {
                let account = self.registry.require(id)?;
                let provider = self.resolver.resolve_account(&account)?;
                targets.push((account, provider));
            }
        }

        if targets.is_empty() {
            log::debug!("No account serves {capability}, nothing to query");
            return Ok(result);
        }

        let timeout = self.timeout;
        let futures = targets.into_iter().map(|(account, provider)| {
            let fut = op(provider, Arc::clone(&account));
            async move { (account, tokio::time::timeout(timeout, fut).await) }
        });

        for (account, outcome) in join_all(futures).await {
            let error = match outcome {
                Ok(Ok(items)) => {
                    result.items.extend(items);
                    continue;
                }
                Ok(Err(e)) => CoreError::Provider(e),
                Err(_) => CoreError::Provider(ProviderError::Timeout {
                    provider: account.provider.clone(),
                    detail: format!("account did not answer within {}s", timeout.as_secs_f32()),
                }),
            };

            if error.is_expected() {
                log::warn!("[fanout] account '{}' skipped: {error}", account.id);
            } else {
                log::error!("[fanout] account '{}' failed: {error}", account.id);
            }
            result.warnings.push(FanoutWarning::new(&account.id, &error));
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils::{MockProvider, test_account, test_message};
    use mailcal_orchestrator_provider::{MessageQuery, ProviderCapabilities, ProviderType};

    fn executor(
        accounts: Vec<Account>,
        mock: &Arc<MockProvider>,
        timeout: Duration,
    ) -> FanoutExecutor {
        let resolver = ProviderResolver::empty()
            .with_provider(ProviderType::Outlook, mock.clone() as Arc<dyn CapabilityProvider>);
        FanoutExecutor::new(
            Arc::new(AccountRegistry::with_accounts(accounts)),
            Arc::new(resolver),
            timeout,
        )
    }

    async fn list_all(
        exec: &FanoutExecutor,
        selector: &AccountSelector,
    ) -> CoreResult<FanoutResult<mailcal_orchestrator_provider::Message>> {
        let query = MessageQuery::default();
        exec.execute(selector, Capability::Mail, |provider, account| {
            let query = query.clone();
            async move { provider.list_messages(&account, &query).await }
        })
        .await
    }

    #[test]
    fn selector_from_option() {
        assert_eq!(AccountSelector::from_option(None), AccountSelector::All);
        assert_eq!(AccountSelector::from_option(Some("  ")), AccountSelector::All);
        assert_eq!(AccountSelector::from_option(Some("ALL")), AccountSelector::All);
        assert_eq!(
            AccountSelector::from_option(Some(" work ")),
            AccountSelector::One("work".into())
        );
    }

    #[tokio::test]
    async fn partial_failure_keeps_other_accounts() {
        let mock = Arc::new(MockProvider::hosted(ProviderType::Outlook));
        let accounts: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|id| test_account(id, "outlook", &[]))
            .collect();
        for id in ["a", "b", "c", "d"] {
            mock.add_message(test_message(id, &format!("{id}-1"), 1));
        }
        mock.fail_account("b", ProviderError::unauthenticated("outlook", "b"));
        mock.fail_account(
            "d",
            ProviderError::RemoteError {
                provider: "outlook".into(),
                status: Some(503),
                raw_code: None,
                raw_message: "unavailable".into(),
            },
        );

        let exec = executor(accounts, &mock, Duration::from_secs(5));
        let result = list_all(&exec, &AccountSelector::All).await.unwrap();

        assert_eq!(result.items.len(), 2);
        assert_eq!(result.warnings.len(), 2);
        let failed: Vec<_> = result.warnings.iter().map(|w| w.account_id.as_str()).collect();
        assert_eq!(failed, vec!["b", "d"]);
        assert_eq!(result.warnings[0].error.kind, ErrorKind::Unauthenticated);
        assert!(result.is_partial());
    }

    #[tokio::test]
    async fn single_failing_account_yields_one_warning() {
        let mock = Arc::new(MockProvider::hosted(ProviderType::Outlook));
        mock.fail_account("w", ProviderError::unauthenticated("outlook", "w"));
        let exec = executor(
            vec![test_account("w", "outlook", &[])],
            &mock,
            Duration::from_secs(5),
        );

        let result = list_all(&exec, &AccountSelector::All).await.unwrap();

        assert!(result.items.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].account_id, "w");
    }

    #[tokio::test]
    async fn disabled_and_unsupported_accounts_are_skipped() {
        let mock = Arc::new(MockProvider::hosted(ProviderType::Outlook));
        let feed = Arc::new(MockProvider::new(
            ProviderType::Ics,
            ProviderCapabilities::CALENDAR_FEED,
        ));
        mock.add_message(test_message("on", "m1", 1));
        mock.add_message(test_message("off", "m2", 2));

        let resolver = ProviderResolver::empty()
            .with_provider(ProviderType::Outlook, mock.clone() as Arc<dyn CapabilityProvider>)
            .with_provider(ProviderType::Ics, feed.clone() as Arc<dyn CapabilityProvider>);
        let exec = FanoutExecutor::new(
            Arc::new(AccountRegistry::with_accounts(vec![
                test_account("on", "outlook", &[]),
                test_account("off", "outlook", &[]).with_enabled(false),
                test_account("feed", "ics", &[]),
                test_account("odd", "carrier-pigeon", &[]),
            ])),
            Arc::new(resolver),
            Duration::from_secs(5),
        );

        let result = list_all(&exec, &AccountSelector::All).await.unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].id, "m1");
        assert_eq!(feed.calls(), 0);
        // 无法解析的 provider 类型作为告警返回
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].account_id, "odd");
        assert_eq!(result.warnings[0].error.kind, ErrorKind::ValidationFailure);
    }

    #[tokio::test]
    async fn explicit_account_is_queried_even_when_disabled() {
        let mock = Arc::new(MockProvider::hosted(ProviderType::Outlook));
        mock.add_message(test_message("off", "m2", 2));
        let exec = executor(
            vec![test_account("off", "outlook", &[]).with_enabled(false)],
            &mock,
            Duration::from_secs(5),
        );

        let result = list_all(&exec, &AccountSelector::One("OFF".into()))
            .await
            .unwrap();
        assert_eq!(result.items.len(), 1);
    }

    #[tokio::test]
    async fn unknown_explicit_account_fails_before_dispatch() {
        let mock = Arc::new(MockProvider::hosted(ProviderType::Outlook));
        let exec = executor(vec![], &mock, Duration::from_secs(5));

        let err = list_all(&exec, &AccountSelector::One("ghost".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AccountNotFound(_)));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_account_times_out_into_warning() {
        let mock = Arc::new(MockProvider::hosted(ProviderType::Outlook));
        mock.add_message(test_message("fast", "m1", 1));
        mock.add_message(test_message("slow", "m2", 2));
        mock.delay_account("slow", Duration::from_secs(60));

        let exec = executor(
            vec![
                test_account("fast", "outlook", &[]),
                test_account("slow", "outlook", &[]),
            ],
            &mock,
            Duration::from_secs(5),
        );

        let result = list_all(&exec, &AccountSelector::All).await.unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].account_id, "slow");
        assert_eq!(result.warnings[0].error.kind, ErrorKind::TransientFetchFailure);
    }

    #[tokio::test]
    async fn empty_registry_is_an_empty_result() {
        let mock = Arc::new(MockProvider::hosted(ProviderType::Outlook));
        let exec = executor(vec![], &mock, Duration::from_secs(5));
        let result = list_all(&exec, &AccountSelector::All).await.unwrap();
        assert!(result.items.is_empty());
        assert!(result.warnings.is_empty());
    }
}
