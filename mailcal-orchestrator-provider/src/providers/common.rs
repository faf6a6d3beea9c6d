//! Provider 公共工具函数

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use uuid::Uuid;

use crate::error::{ProviderError, Result};
use crate::traits::TokenProvider;
use crate::types::{Account, CalendarEvent, EventQuery};
use crate::utils::log_sanitizer::mask_secret;

// ============ HTTP Client ============

/// 默认连接超时（秒）
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// 默认请求超时（秒）
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// 创建带超时配置的 HTTP Client
///
/// 构建失败时（TLS 后端初始化失败等）退回默认 Client。
pub fn create_http_client() -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
        .user_agent(concat!("mailcal-orchestrator/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("Failed to build configured HTTP client, using defaults: {e}");
            Client::new()
        })
}

// ============ 凭证 ============

/// 获取账户的 Bearer Token，没有可用 Token 时返回 `Unauthenticated`
pub async fn require_token(
    tokens: &dyn TokenProvider,
    provider: &str,
    account: &Account,
    scopes: &[&str],
) -> Result<String> {
    match tokens.bearer_token(&account.id, scopes).await {
        Some(token) if !token.trim().is_empty() => {
            log::debug!(
                "[{provider}] Using token {} for account '{}'",
                mask_secret(&token),
                account.id
            );
            Ok(token)
        }
        _ => {
            log::warn!("[{provider}] No usable token for account '{}'", account.id);
            Err(ProviderError::unauthenticated(provider, &account.id))
        }
    }
}

// ============ 账户配置 ============

/// 读取必填的账户配置项
pub fn require_config<'a>(account: &'a Account, key: &str, provider: &str) -> Result<&'a str> {
    account
        .config_value(key)
        .ok_or_else(|| ProviderError::InvalidParameter {
            provider: provider.to_string(),
            param: key.to_string(),
            detail: format!("account '{}' has no '{key}' configured", account.id),
        })
}

// ============ 参数校验 ============

/// 拒绝空白 ID，避免拼出 `/messages/` 之类的集合路径
pub fn require_id<'a>(id: &'a str, param: &str, provider: &str) -> Result<&'a str> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::InvalidParameter {
            provider: provider.to_string(),
            param: param.to_string(),
            detail: "must not be empty".to_string(),
        });
    }
    Ok(trimmed)
}

/// 转义后放入 URL 路径
pub fn path_segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

/// 去掉 HTML 标签并压缩空白，用于生成摘要
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============ 订阅源 ============

/// 没有 UID 的订阅源事件使用确定性 ID（UUID v5：来源 + 标题 + 开始时间），刷新前后保持不变
pub fn stable_event_id(source: &str, title: &str, start: &DateTime<Utc>) -> String {
    let name = format!("{source}\n{title}\n{}", start.to_rfc3339());
    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()).to_string()
}

/// 从订阅源的完整事件列表中选出与时间窗口重叠的事件，按开始时间排序并截断
pub fn events_in_window(events: &[CalendarEvent], query: &EventQuery) -> Vec<CalendarEvent> {
    let mut selected: Vec<CalendarEvent> = events
        .iter()
        .filter(|e| query.overlaps(e))
        .cloned()
        .collect();
    selected.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
    selected.truncate(query.limit as usize);
    selected
}
