//! 业务逻辑服务层

mod account_service;
mod calendar_service;
mod contact_service;
mod mail_service;

pub use account_service::AccountService;
pub use calendar_service::CalendarService;
pub use contact_service::ContactService;
pub use mail_service::MailService;

use std::sync::Arc;

use mailcal_orchestrator_provider::{Account, Capability, CapabilityProvider, ProviderError};

use crate::batch::BatchExecutor;
use crate::config::OrchestratorConfig;
use crate::error::{CoreError, CoreResult};
use crate::fanout::FanoutExecutor;
use crate::registry::AccountRegistry;
use crate::resolver::ProviderResolver;
use crate::router::SmartRouter;

/// 单账户、单条目的读取上限
pub const MAX_PAGE_LIMIT: u32 = 100;

/// 服务上下文 - 持有所有依赖
///
/// 平台层创建注册表和 resolver，并负责把配置源接到注册表上。
pub struct ServiceContext {
    /// 账户注册表
    pub registry: Arc<AccountRegistry>,
    /// Provider 解析器
    pub resolver: Arc<ProviderResolver>,
    pub config: OrchestratorConfig,
    pub fanout: FanoutExecutor,
    pub router: SmartRouter,
    pub batch: BatchExecutor,
}

impl ServiceContext {
    /// 创建服务上下文
    #[must_use]
    pub fn new(
        registry: Arc<AccountRegistry>,
        resolver: Arc<ProviderResolver>,
        config: OrchestratorConfig,
    ) -> Self {
        let config = config.validated();
        Self {
            fanout: FanoutExecutor::new(
                Arc::clone(&registry),
                Arc::clone(&resolver),
                config.fanout_timeout,
            ),
            router: SmartRouter::new(Arc::clone(&registry)),
            batch: BatchExecutor::new(
                Arc::clone(&registry),
                Arc::clone(&resolver),
                config.batch_max_items,
                config.batch_concurrency,
            ),
            registry,
            resolver,
            config,
        }
    }

    /// 获取账户及其 Provider 实例
    pub fn get_provider(
        &self,
        account_id: &str,
    ) -> CoreResult<(Arc<Account>, Arc<dyn CapabilityProvider>)> {
        let account = self.registry.require(account_id)?;
        let provider = self.resolver.resolve_account(&account)?;
        Ok((account, provider))
    }

    /// 为写操作选择账户：显式指定的账户优先，否则按目标地址的域名路由
    ///
    /// 自动选择时只考虑对 `capability` 可写的账户，订阅源不会被选中。
    pub fn route_write(
        &self,
        explicit_account_id: Option<&str>,
        target_address: Option<&str>,
        capability: Capability,
    ) -> CoreResult<(Arc<Account>, Arc<dyn CapabilityProvider>)> {
        let account = self
            .router
            .route_with(explicit_account_id, target_address, |account| {
                self.resolver
                    .resolve(&account.provider)
                    .is_ok_and(|p| p.capabilities().supports_writes(capability))
            })?;
        let provider = self.resolver.resolve_account(&account)?;
        Ok((account, provider))
    }

    /// 处理 Provider 错误，凭证失效时提示重新认证
    pub fn handle_provider_error(&self, account_id: &str, err: ProviderError) -> CoreError {
        match &err {
            ProviderError::Unauthenticated { .. } => {
                log::warn!("Account {account_id} needs re-authentication: {err}");
            }
            e if e.is_expected() => log::warn!("Account {account_id}: {err}"),
            _ => log::error!("Account {account_id}: {err}"),
        }
        CoreError::Provider(err)
    }
}

/// 非空白文本，否则返回 `ValidationError`
pub(crate) fn require_text<'a>(value: &'a str, field: &str) -> CoreResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::ValidationError(format!("{field} must not be empty")));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockProvider, create_test_context, test_account};
    use mailcal_orchestrator_provider::{ProviderCapabilities, ProviderType};

    #[test]
    fn write_routing_skips_read_only_feeds() {
        let hosted = Arc::new(MockProvider::hosted(ProviderType::Outlook));
        let feed = Arc::new(MockProvider::new(
            ProviderType::Ics,
            ProviderCapabilities::CALENDAR_FEED,
        ));
        let ctx = create_test_context(
            vec![
                test_account("holidays", "ics", &["acme.com"]),
                test_account("work", "outlook", &["acme.com"]),
            ],
            &[(ProviderType::Outlook, hosted), (ProviderType::Ics, feed)],
        );

        let (account, _) = ctx
            .route_write(None, Some("team@acme.com"), Capability::Calendar)
            .unwrap();
        assert_eq!(account.id, "work");

        // 显式指定时不过滤
        let (account, provider) = ctx
            .route_write(Some("holidays"), None, Capability::Calendar)
            .unwrap();
        assert_eq!(account.id, "holidays");
        assert!(!provider.capabilities().writable);
    }

    #[test]
    fn get_provider_reports_unknown_account() {
        let ctx = create_test_context(vec![], &[]);
        assert!(matches!(
            ctx.get_provider("nobody"),
            Err(CoreError::AccountNotFound(_))
        ));
    }

    #[test]
    fn require_text_trims() {
        assert_eq!(require_text("  hi ", "text").unwrap(), "hi");
        assert!(require_text(" ", "text").is_err());
    }
}
