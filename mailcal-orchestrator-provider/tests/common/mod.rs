//! 共享测试工具和辅助函数

#![allow(dead_code)]

use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use mailcal_orchestrator_provider::{
    Account, CalendarEvent, CapabilityProvider, CreateEventRequest, ProviderType, TokenProvider,
    create_provider,
};

/// 跳过测试的宏（当环境变量缺失时）
#[macro_export]
macro_rules! skip_if_no_credentials {
    ($($var:expr),+) => {
        $(
            if std::env::var($var).is_err() {
                eprintln!("跳过测试: 缺少环境变量 {}", $var);
                return;
            }
        )+
    };
}

/// 断言 `Result` 为 `Ok`，并解包返回内部值（失败则直接让测试失败）。
#[macro_export]
macro_rules! require_ok {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got {res:?}");
        let Ok(val) = res else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let res = $expr;
        assert!(
            res.is_ok(),
            "{}: {res:?}",
            format_args!($($msg)+)
        );
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

/// 直接使用环境变量中的 access token
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn bearer_token(&self, _account_id: &str, _scopes: &[&str]) -> Option<String> {
        Some(self.0.clone())
    }
}

/// 生成唯一的测试事件标题
pub fn generate_test_title() -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("_test-{}", &uuid.to_string()[..8])
}

/// 明天上午的半小时事件
pub fn test_event_request() -> CreateEventRequest {
    let start = Utc::now() + Duration::days(1);
    CreateEventRequest {
        title: generate_test_title(),
        start,
        end: start + Duration::minutes(30),
        all_day: false,
        description: Some("integration-test".to_string()),
        location: None,
        attendees: Vec::new(),
    }
}

/// 测试上下文 - 封装 Provider 和测试账户
pub struct TestContext {
    pub provider: Arc<dyn CapabilityProvider>,
    pub account: Account,
}

impl TestContext {
    fn hosted(provider_type: ProviderType, token_var: &str) -> Option<Self> {
        let token = env::var(token_var).ok()?;
        let provider = create_provider(provider_type, Arc::new(StaticToken(token)));
        let account = Account::new("integration", provider_type.as_str());
        Some(Self { provider, account })
    }

    /// 创建 Outlook 测试上下文
    pub fn outlook() -> Option<Self> {
        Self::hosted(ProviderType::Outlook, "OUTLOOK_ACCESS_TOKEN")
    }

    /// 创建 Google 测试上下文
    pub fn google() -> Option<Self> {
        Self::hosted(ProviderType::Google, "GOOGLE_ACCESS_TOKEN")
    }

    /// 创建测试事件并返回
    pub async fn create_test_event(&self) -> Option<CalendarEvent> {
        self.provider
            .create_event(&self.account, &test_event_request())
            .await
            .ok()
    }

    /// 清理测试事件
    pub async fn cleanup_event(&self, event_id: &str) {
        let _ = self.provider.delete_event(&self.account, event_id).await;
    }
}
