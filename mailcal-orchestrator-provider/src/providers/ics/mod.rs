//! ICS subscription feed Provider（只读日历）

mod parser;
mod provider;

use std::time::Duration;

use reqwest::Client;

use crate::feed_cache::FeedCache;
use crate::providers::common::create_http_client;
use crate::types::CalendarEvent;

/// 账户配置：订阅地址（`https://` 或 `webcal://`）
pub(crate) const CONFIG_URL: &str = "url";

/// 默认缓存时间，订阅源通常变化缓慢
pub(crate) const DEFAULT_TTL: Duration = Duration::from_secs(900);

/// 瞬时错误最大重试次数
pub(crate) const MAX_RETRIES: u32 = 2;

/// ICS feed Provider
pub struct IcsProvider {
    pub(crate) client: Client,
    pub(crate) cache: FeedCache<Vec<CalendarEvent>>,
}

impl IcsProvider {
    pub fn new() -> Self {
        Self {
            client: create_http_client(),
            cache: FeedCache::new("ics"),
        }
    }

    /// `webcal://` 只是 `https://` 的别名
    pub(crate) fn fetch_url(url: &str) -> String {
        let url = url.trim();
        match url.get(..9) {
            Some(scheme) if scheme.eq_ignore_ascii_case("webcal://") => {
                format!("https://{}", &url[9..])
            }
            _ => url.to_string(),
        }
    }
}

impl Default for IcsProvider {
    fn default() -> Self {
        Self::new()
    }
}
