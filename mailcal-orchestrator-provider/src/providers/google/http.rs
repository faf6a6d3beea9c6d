//! Google HTTP 请求方法

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ProviderError, Result};
use crate::http_client::{HttpUtils, is_success};
use crate::providers::common::require_token;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};
use crate::types::Account;

use super::types::GoogleErrorResponse;
use super::{GoogleProvider, MAX_RETRIES};

/// 这些 reason 出现在 403 上，但语义是限流
const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded", "quotaExceeded"];

/// 从错误响应中选出用于映射的错误码
fn error_code(resp: &GoogleErrorResponse) -> Option<String> {
    let reason = resp
        .error
        .errors
        .iter()
        .find_map(|e| e.reason.clone());
    match reason {
        Some(r) if RATE_LIMIT_REASONS.contains(&r.as_str()) => Some(r),
        reason => resp.error.status.clone().or(reason),
    }
}

impl GoogleProvider {
    /// 发送请求，返回响应文本（`url` 为完整地址，三个 API 的根地址不同）
    #[allow(clippy::too_many_arguments)]
    async fn execute<B: Serialize + ?Sized>(
        &self,
        account: &Account,
        scopes: &[&str],
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&B>,
        context: ErrorContext,
    ) -> Result<String> {
        let token =
            require_token(self.tokens.as_ref(), self.provider_name(), account, scopes).await?;

        let mut builder = self.client.request(method.clone(), url).bearer_auth(token);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let (status, text) = HttpUtils::execute_request_with_retry(
            builder,
            self.provider_name(),
            method.as_str(),
            url,
            MAX_RETRIES,
        )
        .await?;

        if !is_success(status) {
            return Err(self.error_from_response(status, &text, context));
        }
        Ok(text)
    }

    fn error_from_response(&self, status: u16, text: &str, context: ErrorContext) -> ProviderError {
        let raw = match serde_json::from_str::<GoogleErrorResponse>(text) {
            Ok(resp) => RawApiError {
                status: Some(status),
                code: error_code(&resp),
                message: resp.error.message,
            },
            Err(_) => RawApiError::new(status, text.to_string()),
        };
        log::error!(
            "[{}] API error (HTTP {status}): {}",
            self.provider_name(),
            raw.message
        );
        self.map_error(raw, context)
    }

    /// 执行 GET 请求
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        account: &Account,
        scopes: &[&str],
        url: &str,
        query: &[(&str, String)],
        context: ErrorContext,
    ) -> Result<T> {
        let text = self
            .execute::<()>(account, scopes, Method::GET, url, query, None, context)
            .await?;
        HttpUtils::parse_json(&text, self.provider_name())
    }

    /// 执行带请求体的请求并解析响应
    pub(crate) async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        account: &Account,
        scopes: &[&str],
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: &B,
        context: ErrorContext,
    ) -> Result<T> {
        let text = self
            .execute(account, scopes, method, url, query, Some(body), context)
            .await?;
        HttpUtils::parse_json(&text, self.provider_name())
    }

    /// 执行请求并丢弃响应体（trash / modify / delete）
    pub(crate) async fn send_action<B: Serialize + ?Sized>(
        &self,
        account: &Account,
        scopes: &[&str],
        method: Method,
        url: &str,
        body: Option<&B>,
        context: ErrorContext,
    ) -> Result<()> {
        self.execute(account, scopes, method, url, &[], body, context)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_reason_wins_over_status() {
        let resp: GoogleErrorResponse = serde_json::from_str(
            r#"{"error":{"code":403,"message":"Rate Limit Exceeded","status":"PERMISSION_DENIED",
                "errors":[{"reason":"rateLimitExceeded"}]}}"#,
        )
        .unwrap();
        assert_eq!(error_code(&resp).as_deref(), Some("rateLimitExceeded"));
    }

    #[test]
    fn status_preferred_otherwise() {
        let resp: GoogleErrorResponse = serde_json::from_str(
            r#"{"error":{"code":404,"message":"Not Found","status":"NOT_FOUND",
                "errors":[{"reason":"notFound"}]}}"#,
        )
        .unwrap();
        assert_eq!(error_code(&resp).as_deref(), Some("NOT_FOUND"));

        let resp: GoogleErrorResponse = serde_json::from_str(
            r#"{"error":{"code":410,"message":"Resource has been deleted","errors":[{"reason":"deleted"}]}}"#,
        )
        .unwrap();
        assert_eq!(error_code(&resp).as_deref(), Some("deleted"));
    }
}
