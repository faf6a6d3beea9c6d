//! Google Workspace Provider (Gmail v1 / Calendar v3 / People v1)

mod error;
mod http;
mod mime;
mod provider;
mod types;

use std::sync::Arc;

use reqwest::Client;

use crate::providers::common::{create_http_client, path_segment};
use crate::traits::TokenProvider;
use crate::types::Account;

pub(crate) const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
pub(crate) const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3/calendars";
pub(crate) const PEOPLE_API_BASE: &str = "https://people.googleapis.com/v1";

pub(crate) const MAIL_SCOPES: &[&str] = &["https://www.googleapis.com/auth/gmail.modify"];
pub(crate) const SEND_SCOPES: &[&str] = &["https://www.googleapis.com/auth/gmail.send"];
pub(crate) const CALENDAR_SCOPES: &[&str] = &["https://www.googleapis.com/auth/calendar"];
pub(crate) const CONTACT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/contacts"];

/// 单页最大条数
pub(crate) const MAX_PAGE_SIZE: u32 = 100;

/// 瞬时错误最大重试次数
pub(crate) const MAX_RETRIES: u32 = 2;

/// 获取邮件详情的并发上限（Gmail 列表接口只返回 ID）
pub(crate) const MESSAGE_FETCH_CONCURRENCY: usize = 10;

/// People API 返回的字段
pub(crate) const PERSON_FIELDS: &str = "names,emailAddresses,phoneNumbers,organizations";

/// 账户配置：日历 ID，默认 `primary`
pub(crate) const CONFIG_CALENDAR_ID: &str = "calendarId";

/// Google Workspace Provider
pub struct GoogleProvider {
    pub(crate) client: Client,
    pub(crate) tokens: Arc<dyn TokenProvider>,
}

impl GoogleProvider {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            client: create_http_client(),
            tokens,
        }
    }

    pub(crate) fn calendar_root(account: &Account) -> String {
        let calendar = account
            .config_value(CONFIG_CALENDAR_ID)
            .unwrap_or("primary");
        format!("{CALENDAR_API_BASE}/{}", path_segment(calendar))
    }

    /// People 资源名形如 `people/c123`，也接受裸 ID
    pub(crate) fn person_resource(contact_id: &str) -> String {
        let id = contact_id.trim();
        let id = id.strip_prefix("people/").unwrap_or(id);
        format!("people/{}", path_segment(id))
    }

    /// 常用文件夹名映射到 Gmail 系统标签，其他值按标签 ID 处理
    pub(crate) fn label_id(folder: &str) -> String {
        match folder.trim().to_ascii_lowercase().as_str() {
            "" | "inbox" => "INBOX".to_string(),
            "sent" | "sentitems" => "SENT".to_string(),
            "drafts" | "draft" => "DRAFT".to_string(),
            "trash" | "deleted" | "deleteditems" => "TRASH".to_string(),
            "spam" | "junk" | "junkemail" => "SPAM".to_string(),
            "starred" => "STARRED".to_string(),
            "important" => "IMPORTANT".to_string(),
            _ => folder.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_root_uses_configured_id() {
        let account = Account::new("home", "gmail");
        assert_eq!(
            GoogleProvider::calendar_root(&account),
            format!("{CALENDAR_API_BASE}/primary")
        );
        let account = account.with_config(CONFIG_CALENDAR_ID, "team@group.calendar.google.com");
        assert!(GoogleProvider::calendar_root(&account).ends_with("/team%40group.calendar.google.com"));
    }

    #[test]
    fn person_resource_accepts_both_forms() {
        assert_eq!(GoogleProvider::person_resource("people/c42"), "people/c42");
        assert_eq!(GoogleProvider::person_resource("c42"), "people/c42");
    }

    #[test]
    fn label_aliases() {
        assert_eq!(GoogleProvider::label_id("Sent"), "SENT");
        assert_eq!(GoogleProvider::label_id("junk"), "SPAM");
        assert_eq!(GoogleProvider::label_id("Label_12"), "Label_12");
    }
}
