//! 本地 JSON 日历文件 Provider（只读日历）
//!
//! 文件可以是 `{"events": [...]}`，也可以直接是事件数组。

mod provider;
mod types;

use std::time::Duration;

use crate::feed_cache::FeedCache;
use crate::types::CalendarEvent;

/// 账户配置：文件路径
pub(crate) const CONFIG_PATH: &str = "path";

/// 默认缓存时间，本地文件经常被其他工具重写
pub(crate) const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// 文件大小上限
pub(crate) const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// JSON calendar file Provider
pub struct JsonCalendarProvider {
    pub(crate) cache: FeedCache<Vec<CalendarEvent>>,
}

impl JsonCalendarProvider {
    pub fn new() -> Self {
        Self {
            cache: FeedCache::new("json_calendar"),
        }
    }
}

impl Default for JsonCalendarProvider {
    fn default() -> Self {
        Self::new()
    }
}
