//! 邮件服务

use std::sync::Arc;

use mailcal_orchestrator_provider::{Capability, Message, MessageQuery, OutgoingMessage};

use crate::batch::{BatchItem, BatchResult};
use crate::error::{CoreError, CoreResult};
use crate::fanout::{AccountSelector, FanoutResult};
use crate::services::{MAX_PAGE_LIMIT, ServiceContext, require_text};
use crate::types::SendReceipt;

/// 邮件服务
pub struct MailService {
    ctx: Arc<ServiceContext>,
}

impl MailService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// 列出邮件，`account_id` 为空或 `"all"` 时查询所有账户，按接收时间倒序
    pub async fn list_messages(
        &self,
        account_id: Option<&str>,
        query: &MessageQuery,
    ) -> CoreResult<FanoutResult<Message>> {
        let query = query.validated(MAX_PAGE_LIMIT);
        let mut result = self
            .ctx
            .fanout
            .execute(
                &AccountSelector::from_option(account_id),
                Capability::Mail,
                |provider, account| {
                    let query = query.clone();
                    async move { provider.list_messages(&account, &query).await }
                },
            )
            .await?;
        sort_newest_first(&mut result);
        result.truncate(query.limit as usize);
        Ok(result)
    }

    /// 全文搜索邮件
    pub async fn search_messages(
        &self,
        account_id: Option<&str>,
        text: &str,
        limit: u32,
    ) -> CoreResult<FanoutResult<Message>> {
        let text = require_text(text, "search text")?.to_string();
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);
        let mut result = self
            .ctx
            .fanout
            .execute(
                &AccountSelector::from_option(account_id),
                Capability::Mail,
                |provider, account| {
                    let text = text.clone();
                    async move { provider.search_messages(&account, &text, limit).await }
                },
            )
            .await?;
        sort_newest_first(&mut result);
        result.truncate(limit as usize);
        Ok(result)
    }

    /// 获取单封邮件
    pub async fn get_message(&self, account_id: &str, message_id: &str) -> CoreResult<Message> {
        let message_id = require_text(message_id, "message id")?;
        let (account, provider) = self.ctx.get_provider(account_id)?;
        match provider.get_message(&account, message_id).await {
            Ok(message) => Ok(message),
            Err(e) => Err(self.ctx.handle_provider_error(&account.id, e)),
        }
    }

    /// 发送邮件，未指定账户时按第一个收件人的域名选择账户
    pub async fn send_message(
        &self,
        account_id: Option<&str>,
        message: &OutgoingMessage,
    ) -> CoreResult<SendReceipt> {
        let Some(recipient) = message.primary_recipient() else {
            return Err(CoreError::ValidationError(
                "message needs at least one recipient".to_string(),
            ));
        };
        let (account, provider) =
            self.ctx
                .route_write(account_id, Some(recipient), Capability::Mail)?;

        log::info!("Sending message via account '{}'", account.id);
        match provider.send_message(&account, message).await {
            Ok(()) => Ok(SendReceipt {
                account_id: account.id.clone(),
                provider: account.provider.clone(),
            }),
            Err(e) => Err(self.ctx.handle_provider_error(&account.id, e)),
        }
    }

    /// 标记已读 / 未读
    pub async fn mark_message(&self, account_id: &str, message_id: &str, read: bool) -> CoreResult<()> {
        let message_id = require_text(message_id, "message id")?;
        let (account, provider) = self.ctx.get_provider(account_id)?;
        match provider.mark_message(&account, message_id, read).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.ctx.handle_provider_error(&account.id, e)),
        }
    }

    /// 移动邮件
    pub async fn move_message(&self, account_id: &str, message_id: &str, folder: &str) -> CoreResult<()> {
        let message_id = require_text(message_id, "message id")?;
        let folder = require_text(folder, "folder")?;
        let (account, provider) = self.ctx.get_provider(account_id)?;
        match provider.move_message(&account, message_id, folder).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.ctx.handle_provider_error(&account.id, e)),
        }
    }

    /// 删除邮件
    pub async fn delete_message(&self, account_id: &str, message_id: &str) -> CoreResult<()> {
        let message_id = require_text(message_id, "message id")?;
        let (account, provider) = self.ctx.get_provider(account_id)?;
        match provider.delete_message(&account, message_id).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.ctx.handle_provider_error(&account.id, e)),
        }
    }

    /// 批量删除邮件
    pub async fn batch_delete_messages(&self, items: &[BatchItem]) -> CoreResult<BatchResult> {
        self.ctx
            .batch
            .execute(items, |provider, account, id| async move {
                provider.delete_message(&account, &id).await
            })
            .await
    }

    /// 批量标记已读 / 未读
    pub async fn batch_mark_messages(&self, items: &[BatchItem], read: bool) -> CoreResult<BatchResult> {
        self.ctx
            .batch
            .execute(items, |provider, account, id| async move {
                provider.mark_message(&account, &id, read).await
            })
            .await
    }

    /// 批量移动邮件
    pub async fn batch_move_messages(&self, items: &[BatchItem], folder: &str) -> CoreResult<BatchResult> {
        let folder = require_text(folder, "folder")?;
        self.ctx
            .batch
            .execute(items, |provider, account, id| async move {
                provider.move_message(&account, &id, folder).await
            })
            .await
    }
}

fn sort_newest_first(result: &mut FanoutResult<Message>) {
    // 无时间的邮件排在最后
    result.sort_by(|a, b| b.received_at.cmp(&a.received_at).then_with(|| a.id.cmp(&b.id)));
}
