//! JSON calendar `CapabilityProvider` trait 实现

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ProviderError, Result};
use crate::feed_cache::{CACHE_TTL_KEY, ttl_from_config};
use crate::providers::common::{events_in_window, require_config, require_id};
use crate::traits::CapabilityProvider;
use crate::types::{
    Account, CalendarEvent, EventQuery, ProviderCapabilities, ProviderConfigKey, ProviderMetadata,
    ProviderType,
};

use super::types::JsonCalendarDocument;
use super::{CONFIG_PATH, DEFAULT_TTL, JsonCalendarProvider, MAX_FILE_SIZE};

const PROVIDER: &str = "json_calendar";

impl JsonCalendarProvider {
    /// 读取并解析整个文件
    async fn read_events(&self, account: &Account, path: &str) -> Result<Vec<CalendarEvent>> {
        let fetch_failed = |detail: String| ProviderError::FetchFailed {
            provider: PROVIDER.to_string(),
            source: path.to_string(),
            detail,
        };

        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| fetch_failed(e.to_string()))?
            .len();
        if size > MAX_FILE_SIZE {
            return Err(fetch_failed(format!(
                "file is {size} bytes, limit is {MAX_FILE_SIZE}"
            )));
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| fetch_failed(e.to_string()))?;

        let document: JsonCalendarDocument =
            serde_json::from_str(&content).map_err(|e| ProviderError::ParseError {
                provider: PROVIDER.to_string(),
                detail: format!("{path}: {e}"),
            })?;

        let events: Vec<CalendarEvent> = document
            .into_events()
            .into_iter()
            .map(|e| e.into_event(&account.id, path))
            .collect();
        log::info!(
            "[{PROVIDER}] Loaded {} event(s) from '{path}' for account '{}'",
            events.len(),
            account.id
        );
        Ok(events)
    }

    async fn cached_events(&self, account: &Account) -> Result<Arc<Vec<CalendarEvent>>> {
        let path = require_config(account, CONFIG_PATH, PROVIDER)?;
        let ttl = ttl_from_config(&account.config, DEFAULT_TTL);
        let cached = self
            .cache
            .get_or_fetch(&account.id, ttl, || self.read_events(account, path))
            .await?;
        Ok(cached.payload)
    }
}

#[async_trait]
impl CapabilityProvider for JsonCalendarProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::JsonCalendar
    }

    fn metadata() -> ProviderMetadata {
        ProviderMetadata {
            id: ProviderType::JsonCalendar,
            name: "JSON Calendar File".to_string(),
            description: "Read-only event list from a local JSON file".to_string(),
            aliases: ProviderType::JsonCalendar
                .aliases()
                .into_iter()
                .map(str::to_string)
                .collect(),
            capabilities: ProviderCapabilities::CALENDAR_FEED,
            config_keys: vec![
                ProviderConfigKey {
                    key: CONFIG_PATH.to_string(),
                    required: true,
                    description: "Path of the JSON file".to_string(),
                },
                ProviderConfigKey {
                    key: CACHE_TTL_KEY.to_string(),
                    required: false,
                    description: format!(
                        "Seconds a read file is reused; defaults to {}",
                        DEFAULT_TTL.as_secs()
                    ),
                },
            ],
        }
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::CALENDAR_FEED
    }

    async fn list_events(&self, account: &Account, query: &EventQuery) -> Result<Vec<CalendarEvent>> {
        let events = self.cached_events(account).await?;
        Ok(events_in_window(&events, query))
    }

    async fn get_event(&self, account: &Account, event_id: &str) -> Result<CalendarEvent> {
        let event_id = require_id(event_id, "event_id", PROVIDER)?;
        let events = self.cached_events(account).await?;
        events
            .iter()
            .find(|e| e.id == event_id)
            .cloned()
            .ok_or_else(|| ProviderError::not_found(PROVIDER, "event", event_id))
    }
}
