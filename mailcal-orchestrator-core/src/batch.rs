//! Batch mutations with per-item isolation

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use mailcal_orchestrator_provider::{Account, CapabilityProvider, ProviderError};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::{CoreError, CoreResult, ErrorInfo};
use crate::registry::AccountRegistry;
use crate::resolver::ProviderResolver;

/// One target of a batch operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub account_id: String,
    pub item_id: String,
}

impl BatchItem {
    pub fn new(account_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            item_id: item_id.into(),
        }
    }
}

/// Outcome of one batch item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub item_id: String,
    pub account_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

/// Per-item ledger, in input order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
}

type Target = (Arc<Account>, Arc<dyn CapabilityProvider>);

/// Runs one mutation per item with bounded concurrency.
///
/// The concurrency bound is shared by every batch this executor runs.
pub struct BatchExecutor {
    registry: Arc<AccountRegistry>,
    resolver: Arc<ProviderResolver>,
    max_items: usize,
    permits: Arc<Semaphore>,
}

impl BatchExecutor {
    #[must_use]
    pub fn new(
        registry: Arc<AccountRegistry>,
        resolver: Arc<ProviderResolver>,
        max_items: usize,
        concurrency: usize,
    ) -> Self {
        Self {
            registry,
            resolver,
            max_items,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Reject batches that are empty, too large, or contain blank ids.
    pub fn validate(&self, items: &[BatchItem]) -> CoreResult<()> {
        if items.is_empty() {
            return Err(CoreError::ValidationError("batch is empty".to_string()));
        }
        if items.len() > self.max_items {
            return Err(CoreError::ValidationError(format!(
                "batch has {} items, the limit is {}",
                items.len(),
                self.max_items
            )));
        }
        if let Some(pos) = items
            .iter()
            .position(|i| i.account_id.trim().is_empty() || i.item_id.trim().is_empty())
        {
            return Err(CoreError::ValidationError(format!(
                "batch item {pos} has a blank accountId or itemId"
            )));
        }
        Ok(())
    }

    /// Run `op` once per item.
    ///
    /// Validation failures reject the whole batch before any provider call.
    /// After that every item gets its own result; nothing aborts the rest.
    pub async fn execute<F, Fut>(&self, items: &[BatchItem], op: F) -> CoreResult<BatchResult>
    where
        F: Fn(Arc<dyn CapabilityProvider>, Arc<Account>, String) -> Fut,
        Fut: Future<Output = Result<(), ProviderError>>,
    {
        self.validate(items)?;

        // 每个账户只解析一次
        let snapshot = self.registry.snapshot();
        let mut targets: HashMap<String, Result<Target, ErrorInfo>> = HashMap::new();
        for item in items {
            let key = item.account_id.trim().to_lowercase();
            if targets.contains_key(&key) {
                continue;
            }
            let resolved = snapshot
                .get(&item.account_id)
                .cloned()
                .ok_or_else(|| CoreError::AccountNotFound(item.account_id.trim().to_string()))
                .and_then(|account| {
                    let provider = self.resolver.resolve_account(&account)?;
                    Ok((account, provider))
                })
                .map_err(|e| ErrorInfo::from(&e));
            targets.insert(key, resolved);
        }

        let futures = items.iter().map(|item| {
            let target = targets
                .get(&item.account_id.trim().to_lowercase())
                .cloned();
            let permits = Arc::clone(&self.permits);
            let call = match target {
                Some(Ok((account, provider))) => {
                    Ok(op(provider, account, item.item_id.trim().to_string()))
                }
                Some(Err(info)) => Err(info),
                None => Err(ErrorInfo::from(CoreError::AccountNotFound(
                    item.account_id.clone(),
                ))),
            };
            async move {
                let call = call?;
                let _permit = permits.acquire().await.map_err(|e| {
                    ErrorInfo::from(CoreError::Internal(format!("batch permit unavailable: {e}")))
                })?;
                call.await
                    .map_err(|e| ErrorInfo::from(CoreError::Provider(e)))
            }
        });

        let outcomes = join_all(futures).await;

        let mut results = Vec::with_capacity(items.len());
        let mut succeeded = 0;
        for (item, outcome) in items.iter().zip(outcomes) {
            match outcome {
                Ok(()) => {
                    succeeded += 1;
                    results.push(BatchItemResult {
                        item_id: item.item_id.clone(),
                        account_id: item.account_id.clone(),
                        success: true,
                        error: None,
                    });
                }
                Err(info) => {
                    log::warn!(
                        "[batch] item '{}' on account '{}' failed: {}",
                        item.item_id,
                        item.account_id,
                        info.message
                    );
                    results.push(BatchItemResult {
                        item_id: item.item_id.clone(),
                        account_id: item.account_id.clone(),
                        success: false,
                        error: Some(info),
                    });
                }
            }
        }

        let failed = items.len() - succeeded;
        log::info!(
            "Batch finished: {succeeded} succeeded, {failed} failed of {}",
            items.len()
        );

        Ok(BatchResult {
            requested: items.len(),
            succeeded,
            failed,
            results,
        })
    }
}
