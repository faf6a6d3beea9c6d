//! Graph HTTP 请求方法

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ProviderError, Result};
use crate::http_client::{HttpUtils, is_success};
use crate::providers::common::require_token;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};
use crate::types::Account;

use super::types::GraphErrorResponse;
use super::{GRAPH_API_BASE, MAX_RETRIES, OutlookProvider};

/// 时间统一按 UTC 返回，正文按纯文本返回
const PREFER_HEADER: &str = "outlook.timezone=\"UTC\", outlook.body-content-type=\"text\"";

impl OutlookProvider {
    /// 发送请求，返回响应文本
    #[allow(clippy::too_many_arguments)]
    async fn execute<B: Serialize + ?Sized>(
        &self,
        account: &Account,
        scopes: &[&str],
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
        context: ErrorContext,
    ) -> Result<String> {
        let token =
            require_token(self.tokens.as_ref(), self.provider_name(), account, scopes).await?;
        let url = format!("{GRAPH_API_BASE}{}{path}", Self::user_root(account));

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(token)
            .header("Prefer", PREFER_HEADER);
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
            &url,
            MAX_RETRIES,
        )
        .await?;

        if !is_success(status) {
            return Err(self.error_from_response(status, &text, context));
        }
        Ok(text)
    }

    fn error_from_response(&self, status: u16, text: &str, context: ErrorContext) -> ProviderError {
        let raw = match serde_json::from_str::<GraphErrorResponse>(text) {
            Ok(resp) => RawApiError::with_code(status, resp.error.code, resp.error.message),
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
        path: &str,
        query: &[(&str, String)],
        context: ErrorContext,
    ) -> Result<T> {
        let text = self
            .execute::<()>(account, scopes, Method::GET, path, query, None, context)
            .await?;
        HttpUtils::parse_json(&text, self.provider_name())
    }

    /// 执行 POST 请求并解析响应
    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        account: &Account,
        scopes: &[&str],
        path: &str,
        body: &B,
        context: ErrorContext,
    ) -> Result<T> {
        let text = self
            .execute(account, scopes, Method::POST, path, &[], Some(body), context)
            .await?;
        HttpUtils::parse_json(&text, self.provider_name())
    }

    /// 执行 POST 请求（响应无内容，如 sendMail / accept）
    pub(crate) async fn post_action<B: Serialize + ?Sized>(
        &self,
        account: &Account,
        scopes: &[&str],
        path: &str,
        body: &B,
        context: ErrorContext,
    ) -> Result<()> {
        self.execute(account, scopes, Method::POST, path, &[], Some(body), context)
            .await
            .map(|_| ())
    }

    /// 执行 PATCH 请求并解析响应
    pub(crate) async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        account: &Account,
        scopes: &[&str],
        path: &str,
        body: &B,
        context: ErrorContext,
    ) -> Result<T> {
        let text = self
            .execute(account, scopes, Method::PATCH, path, &[], Some(body), context)
            .await?;
        HttpUtils::parse_json(&text, self.provider_name())
    }

    /// 执行 DELETE 请求
    pub(crate) async fn delete(
        &self,
        account: &Account,
        scopes: &[&str],
        path: &str,
        context: ErrorContext,
    ) -> Result<()> {
        self.execute::<()>(account, scopes, Method::DELETE, path, &[], None, context)
            .await
            .map(|_| ())
    }
}
