//! Account configuration source abstract Trait

use async_trait::async_trait;
use mailcal_orchestrator_provider::Account;
use tokio::sync::{RwLock, watch};

use crate::error::CoreResult;

/// Configuration Source Trait
///
/// Supplies the account list and signals when it has changed. The registry
/// reloads on every new generation published on [`subscribe`](Self::subscribe).
/// Provides a default memory implementation of `InMemoryConfigurationSource`.
#[async_trait]
pub trait ConfigurationSource: Send + Sync {
    /// Load the complete account list
    async fn load_accounts(&self) -> CoreResult<Vec<Account>>;

    /// Change notifications (monotonic generation counter)
    fn subscribe(&self) -> watch::Receiver<u64>;
}

/// In-memory configuration source
///
/// Every [`replace`](Self::replace) publishes a new generation.
pub struct InMemoryConfigurationSource {
    accounts: RwLock<Vec<Account>>,
    generation: watch::Sender<u64>,
}

impl InMemoryConfigurationSource {
    #[must_use]
    pub fn new(accounts: Vec<Account>) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            accounts: RwLock::new(accounts),
            generation,
        }
    }

    /// Swap the account list and notify subscribers
    pub async fn replace(&self, accounts: Vec<Account>) {
        *self.accounts.write().await = accounts;
        self.generation.send_modify(|g| *g += 1);
    }
}

impl Default for InMemoryConfigurationSource {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl ConfigurationSource for InMemoryConfigurationSource {
    async fn load_accounts(&self) -> CoreResult<Vec<Account>> {
        Ok(self.accounts.read().await.clone())
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }
}
