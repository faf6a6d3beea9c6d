//! 联系人服务

use std::sync::Arc;

use mailcal_orchestrator_provider::{
    Capability, Contact, ContactQuery, CreateContactRequest, UpdateContactRequest,
};

use crate::batch::{BatchItem, BatchResult};
use crate::error::CoreResult;
use crate::fanout::{AccountSelector, FanoutResult};
use crate::services::{MAX_PAGE_LIMIT, ServiceContext, require_text};

/// 联系人服务
pub struct ContactService {
    ctx: Arc<ServiceContext>,
}

impl ContactService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// 列出联系人，按显示名排序（忽略大小写）
    pub async fn list_contacts(
        &self,
        account_id: Option<&str>,
        query: &ContactQuery,
    ) -> CoreResult<FanoutResult<Contact>> {
        let query = query.validated(MAX_PAGE_LIMIT);
        let mut result = self
            .ctx
            .fanout
            .execute(
                &AccountSelector::from_option(account_id),
                Capability::Contacts,
                |provider, account| async move { provider.list_contacts(&account, &query).await },
            )
            .await?;
        sort_by_name(&mut result);
        result.truncate(query.limit as usize);
        Ok(result)
    }

    /// 按姓名 / 邮箱搜索联系人
    pub async fn search_contacts(
        &self,
        account_id: Option<&str>,
        text: &str,
        limit: u32,
    ) -> CoreResult<FanoutResult<Contact>> {
        let text = require_text(text, "search text")?;
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);
        let mut result = self
            .ctx
            .fanout
            .execute(
                &AccountSelector::from_option(account_id),
                Capability::Contacts,
                |provider, account| async move {
                    provider.search_contacts(&account, text, limit).await
                },
            )
            .await?;
        sort_by_name(&mut result);
        result.truncate(limit as usize);
        Ok(result)
    }

    /// 获取单个联系人
    pub async fn get_contact(&self, account_id: &str, contact_id: &str) -> CoreResult<Contact> {
        let contact_id = require_text(contact_id, "contact id")?;
        let (account, provider) = self.ctx.get_provider(account_id)?;
        match provider.get_contact(&account, contact_id).await {
            Ok(contact) => Ok(contact),
            Err(e) => Err(self.ctx.handle_provider_error(&account.id, e)),
        }
    }

    /// 创建联系人，未指定账户时按联系人第一个邮箱的域名选择账户
    pub async fn create_contact(
        &self,
        account_id: Option<&str>,
        request: &CreateContactRequest,
    ) -> CoreResult<Contact> {
        require_text(&request.display_name, "display name")?;
        let (account, provider) =
            self.ctx
                .route_write(account_id, request.primary_email(), Capability::Contacts)?;

        match provider.create_contact(&account, request).await {
            Ok(contact) => Ok(contact),
            Err(e) => Err(self.ctx.handle_provider_error(&account.id, e)),
        }
    }

    /// 更新联系人
    pub async fn update_contact(
        &self,
        account_id: &str,
        contact_id: &str,
        request: &UpdateContactRequest,
    ) -> CoreResult<Contact> {
        let contact_id = require_text(contact_id, "contact id")?;
        if let Some(name) = &request.display_name {
            require_text(name, "display name")?;
        }
        let (account, provider) = self.ctx.get_provider(account_id)?;
        match provider.update_contact(&account, contact_id, request).await {
            Ok(contact) => Ok(contact),
            Err(e) => Err(self.ctx.handle_provider_error(&account.id, e)),
        }
    }

    /// 删除联系人
    pub async fn delete_contact(&self, account_id: &str, contact_id: &str) -> CoreResult<()> {
        let contact_id = require_text(contact_id, "contact id")?;
        let (account, provider) = self.ctx.get_provider(account_id)?;
        match provider.delete_contact(&account, contact_id).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.ctx.handle_provider_error(&account.id, e)),
        }
    }

    /// 批量删除联系人
    pub async fn batch_delete_contacts(&self, items: &[BatchItem]) -> CoreResult<BatchResult> {
        self.ctx
            .batch
            .execute(items, |provider, account, id| async move {
                provider.delete_contact(&account, &id).await
            })
            .await
    }
}

fn sort_by_name(result: &mut FanoutResult<Contact>) {
    result.sort_by(|a, b| {
        a.display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase())
            .then_with(|| a.account_id.cmp(&b.account_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, ErrorKind};
    use crate::test_utils::{MockProvider, create_test_context, test_account, test_contact};
    use mailcal_orchestrator_provider::{ProviderCapabilities, ProviderType};

    fn fixture() -> (ContactService, Arc<MockProvider>, Arc<MockProvider>) {
        let outlook = Arc::new(MockProvider::hosted(ProviderType::Outlook));
        let google = Arc::new(MockProvider::hosted(ProviderType::Google));
        let feed = Arc::new(MockProvider::new(
            ProviderType::JsonCalendar,
            ProviderCapabilities::CALENDAR_FEED,
        ));
        let ctx = create_test_context(
            vec![
                test_account("work", "outlook", &["acme.com"]),
                test_account("home", "google", &["gmail.com"]),
                test_account("export", "json", &[]),
            ],
            &[
                (ProviderType::Outlook, outlook.clone()),
                (ProviderType::Google, google.clone()),
                (ProviderType::JsonCalendar, feed),
            ],
        );
        (ContactService::new(ctx), outlook, google)
    }

    #[tokio::test]
    async fn list_sorts_case_insensitively() {
        let (service, outlook, google) = fixture();
        outlook.add_contact(test_contact("work", "c1", "bob Stone"));
        google.add_contact(test_contact("home", "c2", "Alice Wong"));
        outlook.add_contact(test_contact("work", "c3", "Carol Diaz"));

        let result = service
            .list_contacts(None, &ContactQuery::default())
            .await
            .unwrap();
        let names: Vec<_> = result.items.iter().map(|c| c.display_name.as_str()).collect();
        assert_eq!(names, vec!["Alice Wong", "bob Stone", "Carol Diaz"]);
    }

    #[tokio::test]
    async fn search_fans_out() {
        let (service, outlook, google) = fixture();
        outlook.add_contact(test_contact("work", "c1", "Dana Lee"));
        google.add_contact(test_contact("home", "c2", "Dana Ross"));
        google.add_contact(test_contact("home", "c3", "Eve Moss"));

        let result = service.search_contacts(Some("all"), "dana", 10).await.unwrap();
        assert_eq!(result.items.len(), 2);

        let result = service.search_contacts(Some("home"), "dana", 10).await.unwrap();
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].id, "c2");
    }

    #[tokio::test]
    async fn create_routes_by_email_domain() {
        let (service, _outlook, google) = fixture();
        let contact = service
            .create_contact(
                None,
                &CreateContactRequest {
                    display_name: "Frank".into(),
                    given_name: None,
                    family_name: None,
                    emails: vec!["frank@gmail.com".into()],
                    phones: Vec::new(),
                    company: None,
                    job_title: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(contact.account_id, "home");
        assert_eq!(google.writes().len(), 1);
    }

    #[tokio::test]
    async fn update_rejects_blank_name() {
        let (service, outlook, _) = fixture();
        let request = UpdateContactRequest {
            display_name: Some(" ".into()),
            ..UpdateContactRequest::default()
        };
        assert!(matches!(
            service.update_contact("work", "c1", &request).await,
            Err(CoreError::ValidationError(_))
        ));
        assert_eq!(outlook.calls(), 0);
    }

    #[tokio::test]
    async fn delete_on_feed_is_unsupported() {
        let (service, _, _) = fixture();
        let err = service.delete_contact("export", "c1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);

        let result = service
            .batch_delete_contacts(&[BatchItem::new("export", "c1"), BatchItem::new("work", "c2")])
            .await
            .unwrap();
        assert_eq!(result.succeeded, 1);
        assert_eq!(
            result.results[0].error.as_ref().map(|e| e.kind),
            Some(ErrorKind::Unsupported)
        );
    }
}
