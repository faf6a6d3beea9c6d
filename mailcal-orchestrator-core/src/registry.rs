//! Account registry
//!
//! Readers load an immutable [`AccountSnapshot`]; a reload builds a fresh
//! snapshot and publishes it with one atomic pointer swap. A reader therefore
//! sees either the old or the new account set, never a mix.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use mailcal_orchestrator_provider::Account;
use tokio::task::JoinHandle;

use crate::error::{CoreError, CoreResult};
use crate::traits::ConfigurationSource;

/// One published account set.
#[derive(Debug)]
pub struct AccountSnapshot {
    accounts: Vec<Arc<Account>>,
    /// 小写 ID → 下标
    index: HashMap<String, usize>,
    generation: u64,
    loaded_at: DateTime<Utc>,
}

impl AccountSnapshot {
    /// Build a snapshot in config order. Later duplicates of an id are dropped.
    pub fn new(accounts: Vec<Account>, generation: u64) -> Self {
        let mut index = HashMap::with_capacity(accounts.len());
        let mut kept = Vec::with_capacity(accounts.len());

        for account in accounts {
            let key = account.id.trim().to_lowercase();
            if key.is_empty() {
                log::warn!("Ignoring account with empty id (name: '{}')", account.name);
                continue;
            }
            if index.contains_key(&key) {
                log::warn!("Duplicate account id '{}', keeping the first occurrence", account.id);
                continue;
            }
            index.insert(key, kept.len());
            kept.push(Arc::new(account));
        }

        Self {
            accounts: kept,
            index,
            generation,
            loaded_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }

    /// All accounts in config order.
    pub fn all(&self) -> &[Arc<Account>] {
        &self.accounts
    }

    /// Case-insensitive lookup.
    pub fn get(&self, id: &str) -> Option<&Arc<Account>> {
        self.index
            .get(&id.trim().to_lowercase())
            .and_then(|&i| self.accounts.get(i))
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Arc<Account>> {
        self.accounts.iter().filter(|a| a.enabled)
    }

    /// Accounts whose raw provider tag matches, ignoring case.
    pub fn by_provider(&self, tag: &str) -> Vec<Arc<Account>> {
        let tag = tag.trim();
        self.accounts
            .iter()
            .filter(|a| a.provider.trim().eq_ignore_ascii_case(tag))
            .cloned()
            .collect()
    }

    /// Accounts that list `domain`, ignoring case.
    pub fn by_domain(&self, domain: &str) -> Vec<Arc<Account>> {
        self.accounts
            .iter()
            .filter(|a| a.has_domain(domain))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Reload counter, 0 for the initial empty snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// Hot-swappable account registry.
pub struct AccountRegistry {
    current: ArcSwap<AccountSnapshot>,
    generation: AtomicU64,
}

impl AccountRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(AccountSnapshot::empty()),
            generation: AtomicU64::new(0),
        }
    }

    /// Registry pre-loaded with `accounts`
    #[must_use]
    pub fn with_accounts(accounts: Vec<Account>) -> Self {
        let registry = Self::new();
        registry.reload(accounts);
        registry
    }

    /// Current snapshot, for multi-step reads that must agree with each other.
    pub fn snapshot(&self) -> Arc<AccountSnapshot> {
        self.current.load_full()
    }

    pub fn get_all(&self) -> Vec<Arc<Account>> {
        self.current.load().all().to_vec()
    }

    pub fn get_by_id(&self, id: &str) -> Option<Arc<Account>> {
        self.current.load().get(id).cloned()
    }

    /// Like [`get_by_id`](Self::get_by_id), failing with `AccountNotFound`.
    pub fn require(&self, id: &str) -> CoreResult<Arc<Account>> {
        self.get_by_id(id)
            .ok_or_else(|| CoreError::AccountNotFound(id.trim().to_string()))
    }

    pub fn get_enabled(&self) -> Vec<Arc<Account>> {
        self.current.load().enabled().cloned().collect()
    }

    pub fn get_by_provider(&self, tag: &str) -> Vec<Arc<Account>> {
        self.current.load().by_provider(tag)
    }

    pub fn get_by_domain(&self, domain: &str) -> Vec<Arc<Account>> {
        self.current.load().by_domain(domain)
    }

    /// Build and publish a new snapshot.
    pub fn reload(&self, accounts: Vec<Account>) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let snapshot = AccountSnapshot::new(accounts, generation);

        if snapshot.is_empty() {
            log::warn!("Account configuration is empty, no account will be served");
        }
        let enabled = snapshot.enabled().count();
        log::info!(
            "Loaded {} account(s): {} enabled, {} disabled",
            snapshot.len(),
            enabled,
            snapshot.len() - enabled
        );

        self.current.store(Arc::new(snapshot));
    }

    /// Load from `source` once. On failure the published snapshot stays in place.
    pub async fn refresh(&self, source: &dyn ConfigurationSource) -> CoreResult<()> {
        match source.load_accounts().await {
            Ok(accounts) => {
                self.reload(accounts);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to load account configuration, keeping previous accounts: {e}");
                Err(e)
            }
        }
    }

    /// Load now and again on every change notification from `source`.
    ///
    /// The task ends when the source drops its notification sender.
    pub fn watch(self: &Arc<Self>, source: Arc<dyn ConfigurationSource>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        // 先订阅再加载，避免错过加载期间的变更
        let mut changes = source.subscribe();
        tokio::spawn(async move {
            let _ = registry.refresh(source.as_ref()).await;
            while changes.changed().await.is_ok() {
                let _ = registry.refresh(source.as_ref()).await;
            }
            log::debug!("Configuration source closed, account watch stopped");
        })
    }
}

impl Default for AccountRegistry {
    fn default() -> Self {
        Self::new()
    }
}
