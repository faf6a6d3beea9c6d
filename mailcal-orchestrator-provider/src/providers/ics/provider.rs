//! ICS `CapabilityProvider` trait 实现

use async_trait::async_trait;

use crate::error::{ProviderError, Result};
use crate::feed_cache::{CACHE_TTL_KEY, ttl_from_config};
use crate::http_client::{HttpUtils, is_success};
use crate::providers::common::{events_in_window, require_config, require_id};
use crate::traits::CapabilityProvider;
use crate::types::{
    Account, CalendarEvent, EventQuery, ProviderCapabilities, ProviderConfigKey, ProviderMetadata,
    ProviderType,
};

use super::parser::parse_calendar;
use super::{CONFIG_URL, DEFAULT_TTL, IcsProvider, MAX_RETRIES};

const PROVIDER: &str = "ics";

impl IcsProvider {
    /// 下载并解析整个订阅源
    async fn fetch_events(&self, account: &Account, url: &str) -> Result<Vec<CalendarEvent>> {
        let fetch_url = Self::fetch_url(url);
        let fetch_failed = |detail: String| ProviderError::FetchFailed {
            provider: PROVIDER.to_string(),
            source: fetch_url.clone(),
            detail,
        };

        let request = self
            .client
            .get(&fetch_url)
            .header("Accept", "text/calendar, */*;q=0.5");
        let (status, body) =
            HttpUtils::execute_request_with_retry(request, PROVIDER, "GET", &fetch_url, MAX_RETRIES)
                .await
                .map_err(|e| fetch_failed(e.to_string()))?;

        if !is_success(status) {
            return Err(fetch_failed(format!("HTTP {status}")));
        }

        let parsed = parse_calendar(&body, &account.id, &fetch_url).map_err(|detail| {
            ProviderError::ParseError {
                provider: PROVIDER.to_string(),
                detail,
            }
        })?;
        if parsed.skipped > 0 {
            log::warn!(
                "[{PROVIDER}] Skipped {} event(s) without a usable DTSTART in feed for account '{}'",
                parsed.skipped,
                account.id
            );
        }
        log::info!(
            "[{PROVIDER}] Loaded {} event(s) for account '{}'",
            parsed.events.len(),
            account.id
        );
        Ok(parsed.events)
    }

    async fn cached_events(&self, account: &Account) -> Result<std::sync::Arc<Vec<CalendarEvent>>> {
        let url = require_config(account, CONFIG_URL, PROVIDER)?;
        let ttl = ttl_from_config(&account.config, DEFAULT_TTL);
        let cached = self
            .cache
            .get_or_fetch(&account.id, ttl, || self.fetch_events(account, url))
            .await?;
        Ok(cached.payload)
    }
}

#[async_trait]
impl CapabilityProvider for IcsProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Ics
    }

    fn metadata() -> ProviderMetadata {
        ProviderMetadata {
            id: ProviderType::Ics,
            name: "ICS Feed".to_string(),
            description: "Read-only iCalendar subscription fetched over HTTP(S)".to_string(),
            aliases: ProviderType::Ics
                .aliases()
                .into_iter()
                .map(str::to_string)
                .collect(),
            capabilities: ProviderCapabilities::CALENDAR_FEED,
            config_keys: vec![
                ProviderConfigKey {
                    key: CONFIG_URL.to_string(),
                    required: true,
                    description: "Feed address (https:// or webcal://)".to_string(),
                },
                ProviderConfigKey {
                    key: CACHE_TTL_KEY.to_string(),
                    required: false,
                    description: format!(
                        "Seconds a fetched feed is reused; defaults to {}",
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
