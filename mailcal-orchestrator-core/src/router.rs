//! Default-account selection for writes

use std::sync::Arc;

use mailcal_orchestrator_provider::{Account, EmailAddress};

use crate::error::{CoreError, CoreResult};
use crate::registry::AccountRegistry;

/// Picks the account a write goes through when the caller names none.
///
/// Order of preference:
/// 1. the explicitly named account;
/// 2. accounts listing the target address's domain (first enabled, else first);
/// 3. the first enabled account;
///
/// and [`CoreError::NoAccountAvailable`] when nothing is left.
///
/// Multiple domain matches are resolved by registry order only; `priority`
/// is not consulted.
pub struct SmartRouter {
    registry: Arc<AccountRegistry>,
}

impl SmartRouter {
    #[must_use]
    pub fn new(registry: Arc<AccountRegistry>) -> Self {
        Self { registry }
    }

    /// Route without restricting candidates.
    pub fn route(
        &self,
        explicit_account_id: Option<&str>,
        target_address: Option<&str>,
    ) -> CoreResult<Arc<Account>> {
        self.route_with(explicit_account_id, target_address, |_| true)
    }

    /// Route considering only accounts `filter` accepts.
    ///
    /// The filter does not apply to an explicitly named account.
    pub fn route_with<F>(
        &self,
        explicit_account_id: Option<&str>,
        target_address: Option<&str>,
        filter: F,
    ) -> CoreResult<Arc<Account>>
    where
        F: Fn(&Account) -> bool,
    {
        if let Some(id) = explicit_account_id.map(str::trim).filter(|id| !id.is_empty()) {
            return self.registry.require(id);
        }

        let snapshot = self.registry.snapshot();

        if let Some(domain) = target_address.and_then(|addr| EmailAddress::parse(addr).domain()) {
            let candidates: Vec<&Arc<Account>> = snapshot
                .all()
                .iter()
                .filter(|a| a.has_domain(&domain) && filter(a))
                .collect();

            let chosen = candidates
                .iter()
                .find(|a| a.enabled)
                .or_else(|| candidates.first());
            if let Some(account) = chosen {
                log::debug!("Routed '{domain}' to account '{}'", account.id);
                return Ok(Arc::clone(account));
            }
            log::debug!("No account owns domain '{domain}', falling back to first enabled");
        }

        snapshot
            .enabled()
            .find(|a| filter(a))
            .cloned()
            .ok_or(CoreError::NoAccountAvailable)
    }
}
