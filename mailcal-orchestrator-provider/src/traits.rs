use async_trait::async_trait;

use crate::error::{ProviderError, Result};
use crate::types::{
    Account, CalendarEvent, Contact, ContactQuery, CreateContactRequest, CreateEventRequest,
    EventQuery, EventResponse, Message, MessageQuery, OutgoingMessage, ProviderCapabilities,
    ProviderMetadata, ProviderType, UpdateContactRequest, UpdateEventRequest,
};

/// 原始 API 错误（内部使用）
#[derive(Debug, Clone)]
pub(crate) struct RawApiError {
    /// HTTP 状态码
    pub status: Option<u16>,
    /// 错误码（各 Provider 格式不同）
    pub code: Option<String>,
    /// 原始错误消息
    pub message: String,
}

impl RawApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// 错误上下文信息（内部使用）
/// 用于在映射错误时提供额外信息
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorContext {
    /// 账户 ID（用于 `Unauthenticated`）
    pub account_id: Option<String>,
    /// 资源类型（`message` / `event` / `contact`）
    pub resource: Option<&'static str>,
    /// 资源 ID（用于 `NotFound`）
    pub resource_id: Option<String>,
}

impl ErrorContext {
    pub fn account(account_id: &str) -> Self {
        Self {
            account_id: Some(account_id.to_string()),
            ..Self::default()
        }
    }

    pub fn resource(account_id: &str, resource: &'static str, resource_id: &str) -> Self {
        Self {
            account_id: Some(account_id.to_string()),
            resource: Some(resource),
            resource_id: Some(resource_id.to_string()),
        }
    }
}

/// Provider 错误映射 Trait（内部使用）
/// 各 Provider 实现此 trait 以将原始 API 错误映射到统一错误类型
pub(crate) trait ProviderErrorMapper {
    /// 返回 Provider 标识符
    fn provider_name(&self) -> &'static str;

    /// 将原始 API 错误映射到统一错误类型
    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError;

    /// 按 HTTP 状态码的通用映射，各 Provider 在无法识别错误码时回退到这里
    fn map_status(&self, raw: RawApiError, context: ErrorContext) -> ProviderError {
        let provider = self.provider_name().to_string();
        match raw.status {
            Some(401) => ProviderError::Unauthenticated {
                provider,
                account_id: context.account_id.unwrap_or_default(),
                raw_message: Some(raw.message),
            },
            Some(403) => ProviderError::PermissionDenied {
                provider,
                raw_message: Some(raw.message),
            },
            Some(404 | 410) => ProviderError::NotFound {
                provider,
                resource: context.resource.unwrap_or("resource").to_string(),
                id: context
                    .resource_id
                    .unwrap_or_else(|| "<unknown>".to_string()),
                raw_message: Some(raw.message),
            },
            Some(400 | 422) => ProviderError::InvalidParameter {
                provider,
                param: raw.code.unwrap_or_else(|| "request".to_string()),
                detail: raw.message,
            },
            _ => self.remote_error(raw),
        }
    }

    /// 快捷方法：解析错误
    fn parse_error(&self, detail: impl ToString) -> ProviderError {
        ProviderError::ParseError {
            provider: self.provider_name().to_string(),
            detail: detail.to_string(),
        }
    }

    /// 快捷方法：未知远端错误（fallback）
    fn remote_error(&self, raw: RawApiError) -> ProviderError {
        ProviderError::RemoteError {
            provider: self.provider_name().to_string(),
            status: raw.status,
            raw_code: raw.code,
            raw_message: raw.message,
        }
    }
}

/// Supplies OAuth bearer tokens for hosted accounts.
///
/// Token acquisition and refresh happen outside this crate. An implementation
/// returns `None` when it holds no valid token covering `scopes`, which hosted
/// providers report as [`ProviderError::Unauthenticated`].
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self, account_id: &str, scopes: &[&str]) -> Option<String>;
}

/// 邮件/日历/联系人提供商 Trait
///
/// 每个方法都显式接收目标账户，Provider 实例本身不绑定账户，可在多个账户间共享。
///
/// 邮件、联系人以及日历写操作的默认实现返回 [`ProviderError::Unsupported`]，
/// 只读的订阅源 Provider 只需实现日历读取。
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    /// 提供商类型
    fn provider_type(&self) -> ProviderType;

    /// 获取 Provider 元数据（类型级别）
    fn metadata() -> ProviderMetadata
    where
        Self: Sized;

    /// 该 Provider 支持的能力
    fn capabilities(&self) -> ProviderCapabilities;

    /// 构造 `Unsupported` 错误
    fn unsupported(&self, operation: &str) -> ProviderError {
        ProviderError::unsupported(self.provider_type().as_str(), operation)
    }

    // ============ 邮件 ============

    /// 列出邮件（按文件夹 / 未读过滤）
    async fn list_messages(&self, account: &Account, query: &MessageQuery) -> Result<Vec<Message>> {
        let _ = (account, query);
        Err(self.unsupported("list_messages"))
    }

    /// 全文搜索邮件
    async fn search_messages(&self, account: &Account, text: &str, limit: u32) -> Result<Vec<Message>> {
        let _ = (account, text, limit);
        Err(self.unsupported("search_messages"))
    }

    /// 获取单封邮件（含正文）
    async fn get_message(&self, account: &Account, message_id: &str) -> Result<Message> {
        let _ = (account, message_id);
        Err(self.unsupported("get_message"))
    }

    /// 发送邮件
    async fn send_message(&self, account: &Account, message: &OutgoingMessage) -> Result<()> {
        let _ = (account, message);
        Err(self.unsupported("send_message"))
    }

    /// 删除邮件
    async fn delete_message(&self, account: &Account, message_id: &str) -> Result<()> {
        let _ = (account, message_id);
        Err(self.unsupported("delete_message"))
    }

    /// 标记已读 / 未读
    async fn mark_message(&self, account: &Account, message_id: &str, read: bool) -> Result<()> {
        let _ = (account, message_id, read);
        Err(self.unsupported("mark_message"))
    }

    /// 移动邮件到指定文件夹
    async fn move_message(&self, account: &Account, message_id: &str, folder: &str) -> Result<()> {
        let _ = (account, message_id, folder);
        Err(self.unsupported("move_message"))
    }

    // ============ 日历 ============

    /// 列出时间窗口内的事件
    async fn list_events(&self, account: &Account, query: &EventQuery) -> Result<Vec<CalendarEvent>>;

    /// 获取单个事件
    async fn get_event(&self, account: &Account, event_id: &str) -> Result<CalendarEvent>;

    /// 创建事件
    async fn create_event(&self, account: &Account, req: &CreateEventRequest) -> Result<CalendarEvent> {
        let _ = (account, req);
        Err(self.unsupported("create_event"))
    }

    /// 更新事件
    async fn update_event(
        &self,
        account: &Account,
        event_id: &str,
        req: &UpdateEventRequest,
    ) -> Result<CalendarEvent> {
        let _ = (account, event_id, req);
        Err(self.unsupported("update_event"))
    }

    /// 删除事件
    async fn delete_event(&self, account: &Account, event_id: &str) -> Result<()> {
        let _ = (account, event_id);
        Err(self.unsupported("delete_event"))
    }

    /// 回复会议邀请
    async fn respond_to_event(
        &self,
        account: &Account,
        event_id: &str,
        response: EventResponse,
        comment: Option<&str>,
    ) -> Result<()> {
        let _ = (account, event_id, response, comment);
        Err(self.unsupported("respond_to_event"))
    }

    // ============ 联系人 ============

    /// 列出联系人
    async fn list_contacts(&self, account: &Account, query: &ContactQuery) -> Result<Vec<Contact>> {
        let _ = (account, query);
        Err(self.unsupported("list_contacts"))
    }

    /// 搜索联系人
    async fn search_contacts(&self, account: &Account, text: &str, limit: u32) -> Result<Vec<Contact>> {
        let _ = (account, text, limit);
        Err(self.unsupported("search_contacts"))
    }

    /// 获取单个联系人
    async fn get_contact(&self, account: &Account, contact_id: &str) -> Result<Contact> {
        let _ = (account, contact_id);
        Err(self.unsupported("get_contact"))
    }

    /// 创建联系人
    async fn create_contact(&self, account: &Account, req: &CreateContactRequest) -> Result<Contact> {
        let _ = (account, req);
        Err(self.unsupported("create_contact"))
    }

    /// 更新联系人
    async fn update_contact(
        &self,
        account: &Account,
        contact_id: &str,
        req: &UpdateContactRequest,
    ) -> Result<Contact> {
        let _ = (account, contact_id, req);
        Err(self.unsupported("update_contact"))
    }

    /// 删除联系人
    async fn delete_contact(&self, account: &Account, contact_id: &str) -> Result<()> {
        let _ = (account, contact_id);
        Err(self.unsupported("delete_contact"))
    }
}
