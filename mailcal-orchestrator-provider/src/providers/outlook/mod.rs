//! Microsoft 365 / Outlook Provider (Microsoft Graph v1.0)

mod error;
mod http;
mod provider;
mod types;

use std::sync::Arc;

use reqwest::Client;

use crate::providers::common::{create_http_client, path_segment};
use crate::traits::TokenProvider;
use crate::types::Account;

pub(crate) const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

pub(crate) const MAIL_SCOPES: &[&str] = &["Mail.ReadWrite"];
pub(crate) const SEND_SCOPES: &[&str] = &["Mail.Send"];
pub(crate) const CALENDAR_SCOPES: &[&str] = &["Calendars.ReadWrite"];
pub(crate) const CONTACT_SCOPES: &[&str] = &["Contacts.ReadWrite"];

/// Graph 单页最大条数
pub(crate) const MAX_PAGE_SIZE: u32 = 100;

/// 瞬时错误最大重试次数
pub(crate) const MAX_RETRIES: u32 = 2;

/// 账户配置：Graph 用户 ID 或 UPN，默认 `me`
pub(crate) const CONFIG_USER: &str = "user";

/// Microsoft 365 / Outlook Provider
pub struct OutlookProvider {
    pub(crate) client: Client,
    pub(crate) tokens: Arc<dyn TokenProvider>,
}

impl OutlookProvider {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            client: create_http_client(),
            tokens,
        }
    }

    /// `/me` 或 `/users/{user}`
    pub(crate) fn user_root(account: &Account) -> String {
        match account.config_value(CONFIG_USER) {
            None => "/me".to_string(),
            Some(user) if user.eq_ignore_ascii_case("me") => "/me".to_string(),
            Some(user) => format!("/users/{}", path_segment(user)),
        }
    }

    /// 邮件文件夹的常用别名映射到 Graph well-known 名称，其他值按文件夹 ID 处理
    pub(crate) fn folder_id(folder: &str) -> String {
        match folder.trim().to_ascii_lowercase().as_str() {
            "" | "inbox" => "inbox".to_string(),
            "sent" | "sentitems" | "sent-items" => "sentitems".to_string(),
            "drafts" => "drafts".to_string(),
            "trash" | "deleted" | "deleteditems" | "deleted-items" => "deleteditems".to_string(),
            "archive" => "archive".to_string(),
            "junk" | "spam" | "junkemail" => "junkemail".to_string(),
            _ => folder.trim().to_string(),
        }
    }
}
