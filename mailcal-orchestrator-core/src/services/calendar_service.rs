//! 日历服务

use std::sync::Arc;

use mailcal_orchestrator_provider::{
    CalendarEvent, Capability, CreateEventRequest, EventQuery, EventResponse, UpdateEventRequest,
};

use crate::batch::{BatchItem, BatchResult};
use crate::error::{CoreError, CoreResult};
use crate::fanout::{AccountSelector, FanoutResult};
use crate::services::{MAX_PAGE_LIMIT, ServiceContext, require_text};

/// 日历服务
pub struct CalendarService {
    ctx: Arc<ServiceContext>,
}

impl CalendarService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// 列出时间窗口内的事件，按开始时间升序
    pub async fn list_events(
        &self,
        account_id: Option<&str>,
        query: &EventQuery,
    ) -> CoreResult<FanoutResult<CalendarEvent>> {
        let query = query.validated(MAX_PAGE_LIMIT);
        let mut result = self
            .ctx
            .fanout
            .execute(
                &AccountSelector::from_option(account_id),
                Capability::Calendar,
                |provider, account| {
                    let query = query.clone();
                    async move { provider.list_events(&account, &query).await }
                },
            )
            .await?;
        result.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| a.account_id.cmp(&b.account_id))
                .then_with(|| a.id.cmp(&b.id))
        });
        result.truncate(query.limit as usize);
        Ok(result)
    }

    /// 获取单个事件
    pub async fn get_event(&self, account_id: &str, event_id: &str) -> CoreResult<CalendarEvent> {
        let event_id = require_text(event_id, "event id")?;
        let (account, provider) = self.ctx.get_provider(account_id)?;
        match provider.get_event(&account, event_id).await {
            Ok(event) => Ok(event),
            Err(e) => Err(self.ctx.handle_provider_error(&account.id, e)),
        }
    }

    /// 创建事件，未指定账户时按第一个参与者的域名选择账户
    pub async fn create_event(
        &self,
        account_id: Option<&str>,
        request: &CreateEventRequest,
    ) -> CoreResult<CalendarEvent> {
        require_text(&request.title, "title")?;
        if request.end < request.start {
            return Err(CoreError::ValidationError(
                "event end must not be before its start".to_string(),
            ));
        }

        let (account, provider) = self.ctx.route_write(
            account_id,
            request.primary_attendee(),
            Capability::Calendar,
        )?;

        log::info!("Creating event '{}' on account '{}'", request.title, account.id);
        match provider.create_event(&account, request).await {
            Ok(event) => Ok(event),
            Err(e) => Err(self.ctx.handle_provider_error(&account.id, e)),
        }
    }

    /// 更新事件
    pub async fn update_event(
        &self,
        account_id: &str,
        event_id: &str,
        request: &UpdateEventRequest,
    ) -> CoreResult<CalendarEvent> {
        let event_id = require_text(event_id, "event id")?;
        if let (Some(start), Some(end)) = (request.start, request.end)
            && end < start
        {
            return Err(CoreError::ValidationError(
                "event end must not be before its start".to_string(),
            ));
        }
        if request.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(CoreError::ValidationError("title must not be empty".to_string()));
        }

        let (account, provider) = self.ctx.get_provider(account_id)?;
        match provider.update_event(&account, event_id, request).await {
            Ok(event) => Ok(event),
            Err(e) => Err(self.ctx.handle_provider_error(&account.id, e)),
        }
    }

    /// 删除事件
    pub async fn delete_event(&self, account_id: &str, event_id: &str) -> CoreResult<()> {
        let event_id = require_text(event_id, "event id")?;
        let (account, provider) = self.ctx.get_provider(account_id)?;
        match provider.delete_event(&account, event_id).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.ctx.handle_provider_error(&account.id, e)),
        }
    }

    /// 回复会议邀请
    pub async fn respond_to_event(
        &self,
        account_id: &str,
        event_id: &str,
        response: EventResponse,
        comment: Option<&str>,
    ) -> CoreResult<()> {
        let event_id = require_text(event_id, "event id")?;
        let comment = comment.map(str::trim).filter(|c| !c.is_empty());
        let (account, provider) = self.ctx.get_provider(account_id)?;
        match provider
            .respond_to_event(&account, event_id, response, comment)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => Err(self.ctx.handle_provider_error(&account.id, e)),
        }
    }

    /// 批量删除事件
    pub async fn batch_delete_events(&self, items: &[BatchItem]) -> CoreResult<BatchResult> {
        self.ctx
            .batch
            .execute(items, |provider, account, id| async move {
                provider.delete_event(&account, &id).await
            })
            .await
    }
}
