//! Environment-driven server settings

use std::path::PathBuf;
use std::time::Duration;

use mailcal_orchestrator_core::OrchestratorConfig;

const ACCOUNTS_FILE_ENV: &str = "MAILCAL_ACCOUNTS_FILE";
const POLL_SECS_ENV: &str = "MAILCAL_CONFIG_POLL_SECS";
const FANOUT_TIMEOUT_ENV: &str = "MAILCAL_FANOUT_TIMEOUT_SECS";
const BATCH_MAX_ITEMS_ENV: &str = "MAILCAL_BATCH_MAX_ITEMS";
const BATCH_CONCURRENCY_ENV: &str = "MAILCAL_BATCH_CONCURRENCY";

const APP_DIR: &str = "mailcal-orchestrator";
const ACCOUNTS_FILE_NAME: &str = "accounts.json";
const DEFAULT_POLL_SECS: u64 = 5;

/// Server settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Account file to serve and watch.
    pub accounts_file: PathBuf,
    /// How often the fallback poller checks the account file's mtime.
    pub poll_interval: Duration,
    pub orchestrator: OrchestratorConfig,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Invalid values fall back to defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let accounts_file = lookup(ACCOUNTS_FILE_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map_or_else(default_accounts_file, PathBuf::from);

        let defaults = OrchestratorConfig::default();
        let fanout_secs = parse_positive(&lookup, FANOUT_TIMEOUT_ENV)
            .unwrap_or(defaults.fanout_timeout.as_secs());
        let batch_max_items = parse_positive(&lookup, BATCH_MAX_ITEMS_ENV)
            .and_then(|v| usize::try_from(v).ok())
            .unwrap_or(defaults.batch_max_items);
        let batch_concurrency = parse_positive(&lookup, BATCH_CONCURRENCY_ENV)
            .and_then(|v| usize::try_from(v).ok())
            .unwrap_or(defaults.batch_concurrency);

        Self {
            accounts_file,
            poll_interval: Duration::from_secs(
                parse_positive(&lookup, POLL_SECS_ENV).unwrap_or(DEFAULT_POLL_SECS),
            ),
            orchestrator: OrchestratorConfig::default()
                .with_fanout_timeout(Duration::from_secs(fanout_secs))
                .with_batch_max_items(batch_max_items)
                .with_batch_concurrency(batch_concurrency),
        }
    }
}

/// `<config dir>/mailcal-orchestrator/accounts.json`
fn default_accounts_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(ACCOUNTS_FILE_NAME)
}

fn parse_positive(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(v) if v > 0 => Some(v),
        _ => {
            tracing::warn!("Ignoring invalid {key}={raw:?}, using the default");
            None
        }
    }
}
