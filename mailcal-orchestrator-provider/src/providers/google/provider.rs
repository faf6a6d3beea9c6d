//! Google `CapabilityProvider` trait 实现

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Method;

use crate::error::{ProviderError, Result};
use crate::providers::common::{path_segment, require_id};
use crate::traits::{CapabilityProvider, ErrorContext, ProviderErrorMapper};
use crate::types::{
    Account, CalendarEvent, Contact, ContactQuery, CreateContactRequest, CreateEventRequest,
    EventQuery, EventResponse, Message, MessageQuery, OutgoingMessage, ProviderCapabilities,
    ProviderConfigKey, ProviderMetadata, ProviderType, UpdateContactRequest, UpdateEventRequest,
};

use super::mime::build_raw_message;
use super::types::{
    GmailMessage, GmailMessageList, GmailMessageRef, GmailModifyBody, GmailRawMessage,
    GoogleAttendee, GoogleEvent, GoogleEventAttendees, GoogleEventBody, GoogleEventList,
    GoogleEventTime, Person, PersonConnections, PersonName, PersonOrganization,
    PersonSearchResponse, PersonValue, encode_base64url,
};
use super::{
    CALENDAR_SCOPES, CONFIG_CALENDAR_ID, CONTACT_SCOPES, GMAIL_API_BASE, GoogleProvider,
    MAIL_SCOPES, MAX_PAGE_SIZE, MESSAGE_FETCH_CONCURRENCY, PEOPLE_API_BASE, PERSON_FIELDS,
    SEND_SCOPES,
};

/// People `searchContacts` 单页上限
const MAX_CONTACT_SEARCH_SIZE: u32 = 30;

/// 列表场景只取这些头部
const METADATA_HEADERS: &[&str] = &["From", "To", "Cc", "Subject"];

/// 把显示名拆成 given / family（按第一个空格）
fn split_name(display_name: &str) -> PersonName {
    let display_name = display_name.trim();
    let (given, family) = match display_name.split_once(' ') {
        Some((given, family)) => (given.to_string(), Some(family.trim().to_string())),
        None => (display_name.to_string(), None),
    };
    PersonName {
        display_name: None,
        given_name: Some(given),
        family_name: family.filter(|f| !f.is_empty()),
    }
}

fn organization(company: Option<&String>, title: Option<&String>) -> Vec<PersonOrganization> {
    if company.is_none() && title.is_none() {
        return Vec::new();
    }
    vec![PersonOrganization {
        name: company.cloned(),
        title: title.cloned(),
    }]
}

impl GoogleProvider {
    fn message_url(message_id: &str) -> String {
        format!("{GMAIL_API_BASE}/messages/{}", path_segment(message_id))
    }

    fn event_url(account: &Account, event_id: &str) -> String {
        format!(
            "{}/events/{}",
            Self::calendar_root(account),
            path_segment(event_id)
        )
    }

    async fn fetch_message(&self, account: &Account, id: &str, format: &str) -> Result<Message> {
        let mut params = vec![("format", format.to_string())];
        if format == "metadata" {
            params.extend(METADATA_HEADERS.iter().map(|h| ("metadataHeaders", (*h).to_string())));
        }
        let message: GmailMessage = self
            .get(
                account,
                MAIL_SCOPES,
                &Self::message_url(id),
                &params,
                ErrorContext::resource(&account.id, "message", id),
            )
            .await?;
        Ok(message.into_message(&account.id))
    }

    /// Gmail 列表只返回 ID，逐个拉取元数据（有界并发，保持顺序）
    async fn hydrate(&self, account: &Account, list: GmailMessageList) -> Result<Vec<Message>> {
        let results: Vec<Result<Message>> = futures::stream::iter(list.messages)
            .map(|m| async move { self.fetch_message(account, &m.id, "metadata").await })
            .buffered(MESSAGE_FETCH_CONCURRENCY)
            .collect()
            .await;

        let mut messages = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(message) => messages.push(message),
                // 列表和拉取之间被删除
                Err(ProviderError::NotFound { id, .. }) => {
                    log::debug!("[{}] Message '{id}' vanished while listing", self.provider_name());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(messages)
    }

    async fn modify_labels(
        &self,
        account: &Account,
        message_id: &str,
        body: &GmailModifyBody,
    ) -> Result<()> {
        self.send_action(
            account,
            MAIL_SCOPES,
            Method::POST,
            &format!("{}/modify", Self::message_url(message_id)),
            Some(body),
            ErrorContext::resource(&account.id, "message", message_id),
        )
        .await
    }

    fn event_or_parse_error(&self, account: &Account, event: GoogleEvent) -> Result<CalendarEvent> {
        let id = event.id.clone();
        event
            .into_event(&account.id)
            .ok_or_else(|| self.parse_error(format!("event '{id}' has no usable start time")))
    }

    async fn get_person(&self, account: &Account, contact_id: &str) -> Result<Person> {
        let resource = Self::person_resource(contact_id);
        self.get(
            account,
            CONTACT_SCOPES,
            &format!("{PEOPLE_API_BASE}/{resource}"),
            &[("personFields", PERSON_FIELDS.to_string())],
            ErrorContext::resource(&account.id, "contact", contact_id),
        )
        .await
    }
}

#[async_trait]
impl CapabilityProvider for GoogleProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Google
    }

    fn metadata() -> ProviderMetadata {
        ProviderMetadata {
            id: ProviderType::Google,
            name: "Google Workspace".to_string(),
            description: "Gmail, Google Calendar and Google Contacts".to_string(),
            aliases: ProviderType::Google
                .aliases()
                .into_iter()
                .map(str::to_string)
                .collect(),
            capabilities: ProviderCapabilities::HOSTED,
            config_keys: vec![ProviderConfigKey {
                key: CONFIG_CALENDAR_ID.to_string(),
                required: false,
                description: "Calendar to read and write; defaults to primary".to_string(),
            }],
        }
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::HOSTED
    }

    // ============ 邮件 ============

    async fn list_messages(&self, account: &Account, query: &MessageQuery) -> Result<Vec<Message>> {
        let query = query.validated(MAX_PAGE_SIZE);
        let mut params = vec![
            ("maxResults", query.limit.to_string()),
            (
                "labelIds",
                Self::label_id(query.folder.as_deref().unwrap_or("inbox")),
            ),
        ];
        if query.unread_only {
            params.push(("q", "is:unread".to_string()));
        }

        let list: GmailMessageList = self
            .get(
                account,
                MAIL_SCOPES,
                &format!("{GMAIL_API_BASE}/messages"),
                &params,
                ErrorContext::account(&account.id),
            )
            .await?;
        self.hydrate(account, list).await
    }

    async fn search_messages(&self, account: &Account, text: &str, limit: u32) -> Result<Vec<Message>> {
        let text = require_id(text, "query", self.provider_name())?;
        let params = [
            ("q", text.to_string()),
            ("maxResults", limit.clamp(1, MAX_PAGE_SIZE).to_string()),
        ];
        let list: GmailMessageList = self
            .get(
                account,
                MAIL_SCOPES,
                &format!("{GMAIL_API_BASE}/messages"),
                &params,
                ErrorContext::account(&account.id),
            )
            .await?;
        self.hydrate(account, list).await
    }

    async fn get_message(&self, account: &Account, message_id: &str) -> Result<Message> {
        let id = require_id(message_id, "message_id", self.provider_name())?;
        self.fetch_message(account, id, "full").await
    }

    async fn send_message(&self, account: &Account, message: &OutgoingMessage) -> Result<()> {
        let body = GmailRawMessage {
            raw: encode_base64url(build_raw_message(message).as_bytes()),
        };
        let sent: GmailMessageRef = self
            .send_json(
                account,
                SEND_SCOPES,
                Method::POST,
                &format!("{GMAIL_API_BASE}/messages/send"),
                &[],
                &body,
                ErrorContext::account(&account.id),
            )
            .await?;
        log::info!(
            "[google] Sent message '{}' from account '{}'",
            sent.id,
            account.id
        );
        Ok(())
    }

    /// 移入垃圾箱，与 Outlook 的删除语义一致
    async fn delete_message(&self, account: &Account, message_id: &str) -> Result<()> {
        let id = require_id(message_id, "message_id", self.provider_name())?;
        self.send_action::<()>(
            account,
            MAIL_SCOPES,
            Method::POST,
            &format!("{}/trash", Self::message_url(id)),
            None,
            ErrorContext::resource(&account.id, "message", id),
        )
        .await
    }

    async fn mark_message(&self, account: &Account, message_id: &str, read: bool) -> Result<()> {
        let id = require_id(message_id, "message_id", self.provider_name())?;
        let unread = vec!["UNREAD".to_string()];
        let body = if read {
            GmailModifyBody {
                add_label_ids: Vec::new(),
                remove_label_ids: unread,
            }
        } else {
            GmailModifyBody {
                add_label_ids: unread,
                remove_label_ids: Vec::new(),
            }
        };
        self.modify_labels(account, id, &body).await
    }

    async fn move_message(&self, account: &Account, message_id: &str, folder: &str) -> Result<()> {
        let id = require_id(message_id, "message_id", self.provider_name())?;
        let folder = require_id(folder, "folder", self.provider_name())?;

        if folder.eq_ignore_ascii_case("archive") {
            let body = GmailModifyBody {
                add_label_ids: Vec::new(),
                remove_label_ids: vec!["INBOX".to_string()],
            };
            return self.modify_labels(account, id, &body).await;
        }

        let label = Self::label_id(folder);
        if label == "TRASH" {
            return self.delete_message(account, id).await;
        }
        let remove = if label == "INBOX" {
            Vec::new()
        } else {
            vec!["INBOX".to_string()]
        };
        let body = GmailModifyBody {
            add_label_ids: vec![label],
            remove_label_ids: remove,
        };
        self.modify_labels(account, id, &body).await
    }

    // ============ 日历 ============

    async fn list_events(&self, account: &Account, query: &EventQuery) -> Result<Vec<CalendarEvent>> {
        let query = query.validated(MAX_PAGE_SIZE);
        let params = [
            ("timeMin", query.start.to_rfc3339()),
            ("timeMax", query.end.to_rfc3339()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
            ("maxResults", query.limit.to_string()),
        ];
        let list: GoogleEventList = self
            .get(
                account,
                CALENDAR_SCOPES,
                &format!("{}/events", Self::calendar_root(account)),
                &params,
                ErrorContext::account(&account.id),
            )
            .await?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|e| e.into_event(&account.id))
            .collect())
    }

    async fn get_event(&self, account: &Account, event_id: &str) -> Result<CalendarEvent> {
        let id = require_id(event_id, "event_id", self.provider_name())?;
        let event: GoogleEvent = self
            .get(
                account,
                CALENDAR_SCOPES,
                &Self::event_url(account, id),
                &[],
                ErrorContext::resource(&account.id, "event", id),
            )
            .await?;
        self.event_or_parse_error(account, event)
    }

    async fn create_event(&self, account: &Account, req: &CreateEventRequest) -> Result<CalendarEvent> {
        let body = GoogleEventBody {
            summary: Some(req.title.clone()),
            description: req.description.clone(),
            location: req.location.clone(),
            start: Some(GoogleEventTime::from_utc(&req.start, req.all_day)),
            end: Some(GoogleEventTime::from_utc(&req.end, req.all_day)),
            attendees: Some(
                req.attendees
                    .iter()
                    .filter(|a| !a.trim().is_empty())
                    .map(|a| GoogleAttendee::invite(a))
                    .collect(),
            ),
        };
        let event: GoogleEvent = self
            .send_json(
                account,
                CALENDAR_SCOPES,
                Method::POST,
                &format!("{}/events", Self::calendar_root(account)),
                &[("sendUpdates", "all".to_string())],
                &body,
                ErrorContext::account(&account.id),
            )
            .await?;
        self.event_or_parse_error(account, event)
    }

    async fn update_event(
        &self,
        account: &Account,
        event_id: &str,
        req: &UpdateEventRequest,
    ) -> Result<CalendarEvent> {
        let id = require_id(event_id, "event_id", self.provider_name())?;
        let body = GoogleEventBody {
            summary: req.title.clone(),
            description: req.description.clone(),
            location: req.location.clone(),
            start: req.start.as_ref().map(|dt| GoogleEventTime::from_utc(dt, false)),
            end: req.end.as_ref().map(|dt| GoogleEventTime::from_utc(dt, false)),
            attendees: req
                .attendees
                .as_ref()
                .map(|list| list.iter().map(|a| GoogleAttendee::invite(a)).collect()),
        };
        let event: GoogleEvent = self
            .send_json(
                account,
                CALENDAR_SCOPES,
                Method::PATCH,
                &Self::event_url(account, id),
                &[("sendUpdates", "all".to_string())],
                &body,
                ErrorContext::resource(&account.id, "event", id),
            )
            .await?;
        self.event_or_parse_error(account, event)
    }

    async fn delete_event(&self, account: &Account, event_id: &str) -> Result<()> {
        let id = require_id(event_id, "event_id", self.provider_name())?;
        self.send_action::<()>(
            account,
            CALENDAR_SCOPES,
            Method::DELETE,
            &format!("{}?sendUpdates=all", Self::event_url(account, id)),
            None,
            ErrorContext::resource(&account.id, "event", id),
        )
        .await
    }

    /// Calendar API 没有专门的回复接口，需要修改自己的参与人状态
    async fn respond_to_event(
        &self,
        account: &Account,
        event_id: &str,
        response: EventResponse,
        comment: Option<&str>,
    ) -> Result<()> {
        let id = require_id(event_id, "event_id", self.provider_name())?;
        let url = Self::event_url(account, id);
        let context = ErrorContext::resource(&account.id, "event", id);

        let current: GoogleEventAttendees = self
            .get(
                account,
                CALENDAR_SCOPES,
                &url,
                &[("fields", "attendees".to_string())],
                context.clone(),
            )
            .await?;

        let mut attendees = current.attendees;
        let Some(me) = attendees.iter_mut().find(|a| a.is_self) else {
            return Err(ProviderError::InvalidParameter {
                provider: self.provider_name().to_string(),
                param: "event_id".to_string(),
                detail: format!("account '{}' is not an attendee of event '{id}'", account.id),
            });
        };
        me.response_status = Some(
            match response {
                EventResponse::Accept => "accepted",
                EventResponse::Decline => "declined",
                EventResponse::Tentative => "tentative",
            }
            .to_string(),
        );
        if let Some(comment) = comment {
            me.comment = Some(comment.to_string());
        }

        let body = GoogleEventBody {
            attendees: Some(attendees),
            ..GoogleEventBody::default()
        };
        let _: GoogleEvent = self
            .send_json(
                account,
                CALENDAR_SCOPES,
                Method::PATCH,
                &url,
                &[("sendUpdates", "all".to_string())],
                &body,
                context,
            )
            .await?;
        Ok(())
    }

    // ============ 联系人 ============

    async fn list_contacts(&self, account: &Account, query: &ContactQuery) -> Result<Vec<Contact>> {
        let query = query.validated(MAX_PAGE_SIZE);
        let params = [
            ("personFields", PERSON_FIELDS.to_string()),
            ("pageSize", query.limit.to_string()),
            ("sortOrder", "FIRST_NAME_ASCENDING".to_string()),
        ];
        let list: PersonConnections = self
            .get(
                account,
                CONTACT_SCOPES,
                &format!("{PEOPLE_API_BASE}/people/me/connections"),
                &params,
                ErrorContext::account(&account.id),
            )
            .await?;
        Ok(list
            .connections
            .into_iter()
            .map(|p| p.into_contact(&account.id))
            .collect())
    }

    async fn search_contacts(&self, account: &Account, text: &str, limit: u32) -> Result<Vec<Contact>> {
        let text = require_id(text, "query", self.provider_name())?;
        let params = [
            ("query", text.to_string()),
            ("readMask", PERSON_FIELDS.to_string()),
            ("pageSize", limit.clamp(1, MAX_CONTACT_SEARCH_SIZE).to_string()),
        ];
        let resp: PersonSearchResponse = self
            .get(
                account,
                CONTACT_SCOPES,
                &format!("{PEOPLE_API_BASE}/people:searchContacts"),
                &params,
                ErrorContext::account(&account.id),
            )
            .await?;
        Ok(resp
            .results
            .into_iter()
            .map(|r| r.person.into_contact(&account.id))
            .collect())
    }

    async fn get_contact(&self, account: &Account, contact_id: &str) -> Result<Contact> {
        let id = require_id(contact_id, "contact_id", self.provider_name())?;
        Ok(self.get_person(account, id).await?.into_contact(&account.id))
    }

    async fn create_contact(&self, account: &Account, req: &CreateContactRequest) -> Result<Contact> {
        let name = if req.given_name.is_some() || req.family_name.is_some() {
            PersonName {
                display_name: None,
                given_name: req.given_name.clone(),
                family_name: req.family_name.clone(),
            }
        } else {
            split_name(&req.display_name)
        };
        let body = Person {
            names: vec![name],
            email_addresses: req.emails.iter().map(|e| PersonValue::of(e)).collect(),
            phone_numbers: req.phones.iter().map(|p| PersonValue::of(p)).collect(),
            organizations: organization(req.company.as_ref(), req.job_title.as_ref()),
            ..Person::default()
        };
        let person: Person = self
            .send_json(
                account,
                CONTACT_SCOPES,
                Method::POST,
                &format!("{PEOPLE_API_BASE}/people:createContact"),
                &[("personFields", PERSON_FIELDS.to_string())],
                &body,
                ErrorContext::account(&account.id),
            )
            .await?;
        Ok(person.into_contact(&account.id))
    }

    async fn update_contact(
        &self,
        account: &Account,
        contact_id: &str,
        req: &UpdateContactRequest,
    ) -> Result<Contact> {
        let id = require_id(contact_id, "contact_id", self.provider_name())?;
        // updateContact 需要最新 etag
        let mut person = self.get_person(account, id).await?;

        let mut fields = Vec::new();
        if let Some(name) = &req.display_name {
            person.names = vec![split_name(name)];
            fields.push("names");
        }
        if let Some(emails) = &req.emails {
            person.email_addresses = emails.iter().map(|e| PersonValue::of(e)).collect();
            fields.push("emailAddresses");
        }
        if let Some(phones) = &req.phones {
            person.phone_numbers = phones.iter().map(|p| PersonValue::of(p)).collect();
            fields.push("phoneNumbers");
        }
        if req.company.is_some() || req.job_title.is_some() {
            let current = person.organizations.first().cloned().unwrap_or_default();
            person.organizations = organization(
                req.company.as_ref().or(current.name.as_ref()),
                req.job_title.as_ref().or(current.title.as_ref()),
            );
            fields.push("organizations");
        }

        if fields.is_empty() {
            return Ok(person.into_contact(&account.id));
        }

        let resource = Self::person_resource(id);
        let updated: Person = self
            .send_json(
                account,
                CONTACT_SCOPES,
                Method::PATCH,
                &format!("{PEOPLE_API_BASE}/{resource}:updateContact"),
                &[
                    ("updatePersonFields", fields.join(",")),
                    ("personFields", PERSON_FIELDS.to_string()),
                ],
                &person,
                ErrorContext::resource(&account.id, "contact", id),
            )
            .await?;
        Ok(updated.into_contact(&account.id))
    }

    async fn delete_contact(&self, account: &Account, contact_id: &str) -> Result<()> {
        let id = require_id(contact_id, "contact_id", self.provider_name())?;
        let resource = Self::person_resource(id);
        self.send_action::<()>(
            account,
            CONTACT_SCOPES,
            Method::DELETE,
            &format!("{PEOPLE_API_BASE}/{resource}:deleteContact"),
            None,
            ErrorContext::resource(&account.id, "contact", id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::TokenProvider;
    use std::sync::Arc;

    struct NoTokens;

    #[async_trait]
    impl TokenProvider for NoTokens {
        async fn bearer_token(&self, _account_id: &str, _scopes: &[&str]) -> Option<String> {
            None
        }
    }

    #[test]
    fn split_name_on_first_space() {
        let name = split_name("Ada King Lovelace");
        assert_eq!(name.given_name.as_deref(), Some("Ada"));
        assert_eq!(name.family_name.as_deref(), Some("King Lovelace"));

        let single = split_name("Cher");
        assert_eq!(single.given_name.as_deref(), Some("Cher"));
        assert!(single.family_name.is_none());
    }

    #[test]
    fn organization_omitted_when_empty() {
        assert!(organization(None, None).is_empty());
        let company = "Acme".to_string();
        assert_eq!(organization(Some(&company), None).len(), 1);
    }

    #[tokio::test]
    async fn writes_require_a_token() {
        let provider = GoogleProvider::new(Arc::new(NoTokens));
        let account = Account::new("home", "gmail");
        let msg = OutgoingMessage {
            to: vec!["bob@x.com".into()],
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: "s".into(),
            body: "b".into(),
            html: false,
        };
        let err = provider.send_message(&account, &msg).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unauthenticated { .. }));
    }
}
