//! 账户相关类型定义

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use mailcal_orchestrator_provider::{Account, ProviderCapabilities, ProviderType};

/// 账户信息（对外展示，不含 provider 配置）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    /// 账户 ID
    pub id: String,
    /// 显示名称
    pub name: String,
    /// 配置中的原始 provider 标签
    pub provider: String,
    /// 解析后的 provider 类型，标签无法识别时为 None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<ProviderType>,
    pub domains: Vec<String>,
    pub enabled: bool,
    pub priority: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<ProviderCapabilities>,
}

impl AccountInfo {
    pub fn new(account: &Account, capabilities: Option<ProviderCapabilities>) -> Self {
        Self {
            id: account.id.clone(),
            name: account.display_name().to_string(),
            provider: account.provider.clone(),
            provider_type: ProviderType::from_tag(&account.provider),
            domains: account.domains.clone(),
            enabled: account.enabled,
            priority: account.priority,
            capabilities,
        }
    }
}

/// 账户注册表概况
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatusSummary {
    pub total: usize,
    pub enabled: usize,
    pub disabled: usize,
    /// 规范 provider 标签 → 账户数
    pub by_provider: BTreeMap<String, usize>,
    /// provider 标签无法识别的账户 ID
    pub unresolved: Vec<String>,
    /// 配置重载次数
    pub generation: u64,
    pub loaded_at: DateTime<Utc>,
}
