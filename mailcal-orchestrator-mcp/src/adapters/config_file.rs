//! Account file configuration source
//!
//! Reads `{ "accounts": [...] }` from a JSON file and publishes a new
//! generation whenever the file changes. Changes come from a filesystem
//! watcher on the file's directory; a slow (mtime, size) poll backs it up
//! on filesystems without change notifications.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use mailcal_orchestrator_core::error::{CoreError, CoreResult};
use mailcal_orchestrator_core::traits::ConfigurationSource;
use mailcal_orchestrator_provider::Account;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const MAX_ACCOUNT_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB

#[derive(Debug, Deserialize)]
struct AccountFile {
    #[serde(default)]
    accounts: Vec<Account>,
}

/// What the poller compares between ticks. `None` while the file is missing.
type Fingerprint = Option<(SystemTime, u64)>;

/// Configuration source backed by a JSON account file.
///
/// A missing file is an empty account list, so the server can start before
/// the first account is configured.
pub struct JsonFileConfigurationSource {
    path: PathBuf,
    generation: watch::Sender<u64>,
}

impl JsonFileConfigurationSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            path: path.into(),
            generation,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn publish(&self) {
        self.generation.send_modify(|g| *g += 1);
    }

    /// Watch the account file's directory and publish a generation on every
    /// change to the file. Editors replace files by rename, so the directory
    /// is watched rather than the file.
    ///
    /// The returned watcher stops when dropped.
    pub fn watch_file(self: &Arc<Self>) -> notify::Result<RecommendedWatcher> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Some(source) = weak.upgrade() else {
                return;
            };
            match res {
                Ok(event) if is_account_file_event(&event, &source.path) => {
                    tracing::info!("Account file changed: {}", source.path.display());
                    source.publish();
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Account file watcher error: {e}"),
            }
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        tracing::debug!("Watching {} for account file changes", dir.display());
        Ok(watcher)
    }

    async fn fingerprint(&self) -> Fingerprint {
        let metadata = tokio::fs::metadata(&self.path).await.ok()?;
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        Some((modified, metadata.len()))
    }

    /// Spawn the fallback poller. It stops once the source itself is dropped.
    pub fn spawn_poller(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut last = match weak.upgrade() {
                Some(source) => source.fingerprint().await,
                None => return,
            };
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(source) = weak.upgrade() else {
                    break;
                };
                let current = source.fingerprint().await;
                if current != last {
                    tracing::info!("Account file changed: {}", source.path.display());
                    last = current;
                    source.publish();
                }
            }
            tracing::debug!("Account file poller stopped");
        })
    }
}

/// 只关心目标文件的创建、修改、删除（含重命名）
fn is_account_file_event(event: &Event, path: &Path) -> bool {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return false;
    }
    let Some(name) = path.file_name() else {
        return false;
    };
    event.paths.iter().any(|p| p.file_name() == Some(name))
}

#[async_trait]
impl ConfigurationSource for JsonFileConfigurationSource {
    async fn load_accounts(&self) -> CoreResult<Vec<Account>> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    "Account file {} does not exist, serving no accounts",
                    self.path.display()
                );
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(CoreError::ConfigurationError(format!(
                    "Failed to read account file metadata: {e}"
                )));
            }
        };

        if metadata.len() > MAX_ACCOUNT_FILE_SIZE {
            return Err(CoreError::ConfigurationError(format!(
                "Account file too large: {} bytes (max: {} bytes)",
                metadata.len(),
                MAX_ACCOUNT_FILE_SIZE
            )));
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CoreError::ConfigurationError(format!("Failed to read account file: {e}")))?;

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let file: AccountFile = serde_json::from_str(&content)
            .map_err(|e| CoreError::ConfigurationError(format!("Invalid account file: {e}")))?;
        tracing::debug!(
            "Read {} account(s) from {}",
            file.accounts.len(),
            self.path.display()
        );
        Ok(file.accounts)
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }
}
