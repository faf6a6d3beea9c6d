//! Outlook `CapabilityProvider` trait 实现

use async_trait::async_trait;

use crate::error::Result;
use crate::providers::common::{path_segment, require_id};
use crate::traits::{CapabilityProvider, ErrorContext, ProviderErrorMapper};
use crate::types::{
    Account, CalendarEvent, Contact, ContactQuery, CreateContactRequest, CreateEventRequest,
    EventQuery, EventResponse, Message, MessageQuery, OutgoingMessage, ProviderCapabilities,
    ProviderConfigKey, ProviderMetadata, ProviderType, UpdateContactRequest, UpdateEventRequest,
};
use crate::utils::datetime::to_graph_datetime;

use super::types::{
    GraphAttendee, GraphContact, GraphContactBody, GraphDateTimeZone, GraphEmailAddress,
    GraphEvent, GraphEventBody, GraphEventReplyBody, GraphItemBody, GraphList, GraphLocation,
    GraphMessage, GraphOutgoingMessage, GraphRecipient, GraphSendMailBody,
};
use super::{
    CALENDAR_SCOPES, CONFIG_USER, CONTACT_SCOPES, MAIL_SCOPES, MAX_PAGE_SIZE, OutlookProvider,
    SEND_SCOPES,
};

const MESSAGE_LIST_FIELDS: &str = "id,conversationId,subject,from,toRecipients,ccRecipients,receivedDateTime,bodyPreview,isRead,parentFolderId,hasAttachments";

fn utc(dt: &chrono::DateTime<chrono::Utc>) -> GraphDateTimeZone {
    GraphDateTimeZone {
        date_time: to_graph_datetime(dt),
        time_zone: Some("UTC".to_string()),
    }
}

/// OData 字符串字面量中的单引号需要成对转义
fn odata_literal(text: &str) -> String {
    text.trim().replace('\'', "''")
}

impl OutlookProvider {
    fn events_from(&self, account: &Account, list: GraphList<GraphEvent>) -> Vec<CalendarEvent> {
        list.value
            .into_iter()
            .filter_map(|e| {
                let id = e.id.clone();
                let event = e.into_event(&account.id);
                if event.is_none() {
                    log::warn!("[{}] Skipping event '{id}' with unparseable time", self.provider_name());
                }
                event
            })
            .collect()
    }

    fn event_or_parse_error(&self, account: &Account, event: GraphEvent) -> Result<CalendarEvent> {
        let id = event.id.clone();
        event
            .into_event(&account.id)
            .ok_or_else(|| self.parse_error(format!("event '{id}' has an unparseable start time")))
    }
}

#[async_trait]
impl CapabilityProvider for OutlookProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Outlook
    }

    fn metadata() -> ProviderMetadata {
        ProviderMetadata {
            id: ProviderType::Outlook,
            name: "Microsoft 365 / Outlook".to_string(),
            description: "Mail, calendar and contacts through Microsoft Graph".to_string(),
            aliases: ProviderType::Outlook
                .aliases()
                .into_iter()
                .map(str::to_string)
                .collect(),
            capabilities: ProviderCapabilities::HOSTED,
            config_keys: vec![ProviderConfigKey {
                key: CONFIG_USER.to_string(),
                required: false,
                description: "Graph user id or UPN; defaults to the signed-in user (me)"
                    .to_string(),
            }],
        }
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::HOSTED
    }

    // ============ 邮件 ============

    async fn list_messages(&self, account: &Account, query: &MessageQuery) -> Result<Vec<Message>> {
        let query = query.validated(MAX_PAGE_SIZE);
        let folder = Self::folder_id(query.folder.as_deref().unwrap_or("inbox"));

        let mut params = vec![
            ("$top", query.limit.to_string()),
            ("$orderby", "receivedDateTime desc".to_string()),
            ("$select", MESSAGE_LIST_FIELDS.to_string()),
        ];
        if query.unread_only {
            params.push(("$filter", "isRead eq false".to_string()));
        }

        let list: GraphList<GraphMessage> = self
            .get(
                account,
                MAIL_SCOPES,
                &format!("/mailFolders/{}/messages", path_segment(&folder)),
                &params,
                ErrorContext::account(&account.id),
            )
            .await?;

        Ok(list
            .value
            .into_iter()
            .map(|m| m.into_message(&account.id))
            .collect())
    }

    async fn search_messages(&self, account: &Account, text: &str, limit: u32) -> Result<Vec<Message>> {
        let text = require_id(text, "query", self.provider_name())?;
        // $search 不能和 $orderby 同时使用，结果按相关度返回
        let params = [
            ("$search", format!("\"{}\"", text.replace('"', ""))),
            ("$top", limit.clamp(1, MAX_PAGE_SIZE).to_string()),
            ("$select", MESSAGE_LIST_FIELDS.to_string()),
        ];

        let list: GraphList<GraphMessage> = self
            .get(
                account,
                MAIL_SCOPES,
                "/messages",
                &params,
                ErrorContext::account(&account.id),
            )
            .await?;

        Ok(list
            .value
            .into_iter()
            .map(|m| m.into_message(&account.id))
            .collect())
    }

    async fn get_message(&self, account: &Account, message_id: &str) -> Result<Message> {
        let id = require_id(message_id, "message_id", self.provider_name())?;
        let message: GraphMessage = self
            .get(
                account,
                MAIL_SCOPES,
                &format!("/messages/{}", path_segment(id)),
                &[],
                ErrorContext::resource(&account.id, "message", id),
            )
            .await?;
        Ok(message.into_message(&account.id))
    }

    async fn send_message(&self, account: &Account, message: &OutgoingMessage) -> Result<()> {
        let body = GraphSendMailBody {
            message: GraphOutgoingMessage {
                subject: message.subject.clone(),
                body: if message.html {
                    GraphItemBody::html(&message.body)
                } else {
                    GraphItemBody::text(&message.body)
                },
                to_recipients: message.to.iter().map(|a| GraphRecipient::to(a)).collect(),
                cc_recipients: message.cc.iter().map(|a| GraphRecipient::to(a)).collect(),
                bcc_recipients: message.bcc.iter().map(|a| GraphRecipient::to(a)).collect(),
            },
            save_to_sent_items: true,
        };

        self.post_action(
            account,
            SEND_SCOPES,
            "/sendMail",
            &body,
            ErrorContext::account(&account.id),
        )
        .await?;
        log::info!("[outlook] Sent message from account '{}'", account.id);
        Ok(())
    }

    async fn delete_message(&self, account: &Account, message_id: &str) -> Result<()> {
        let id = require_id(message_id, "message_id", self.provider_name())?;
        self.delete(
            account,
            MAIL_SCOPES,
            &format!("/messages/{}", path_segment(id)),
            ErrorContext::resource(&account.id, "message", id),
        )
        .await
    }

    async fn mark_message(&self, account: &Account, message_id: &str, read: bool) -> Result<()> {
        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct MarkBody {
            is_read: bool,
        }

        let id = require_id(message_id, "message_id", self.provider_name())?;
        let _: GraphMessage = self
            .patch(
                account,
                MAIL_SCOPES,
                &format!("/messages/{}", path_segment(id)),
                &MarkBody { is_read: read },
                ErrorContext::resource(&account.id, "message", id),
            )
            .await?;
        Ok(())
    }

    async fn move_message(&self, account: &Account, message_id: &str, folder: &str) -> Result<()> {
        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct MoveBody {
            destination_id: String,
        }

        let id = require_id(message_id, "message_id", self.provider_name())?;
        let folder = require_id(folder, "folder", self.provider_name())?;
        let _: GraphMessage = self
            .post(
                account,
                MAIL_SCOPES,
                &format!("/messages/{}/move", path_segment(id)),
                &MoveBody {
                    destination_id: Self::folder_id(folder),
                },
                ErrorContext::resource(&account.id, "message", id),
            )
            .await?;
        Ok(())
    }

    // ============ 日历 ============

    async fn list_events(&self, account: &Account, query: &EventQuery) -> Result<Vec<CalendarEvent>> {
        let query = query.validated(MAX_PAGE_SIZE);
        let params = [
            ("startDateTime", query.start.to_rfc3339()),
            ("endDateTime", query.end.to_rfc3339()),
            ("$top", query.limit.to_string()),
            ("$orderby", "start/dateTime".to_string()),
        ];

        let list: GraphList<GraphEvent> = self
            .get(
                account,
                CALENDAR_SCOPES,
                "/calendarView",
                &params,
                ErrorContext::account(&account.id),
            )
            .await?;

        Ok(self.events_from(account, list))
    }

    async fn get_event(&self, account: &Account, event_id: &str) -> Result<CalendarEvent> {
        let id = require_id(event_id, "event_id", self.provider_name())?;
        let event: GraphEvent = self
            .get(
                account,
                CALENDAR_SCOPES,
                &format!("/events/{}", path_segment(id)),
                &[],
                ErrorContext::resource(&account.id, "event", id),
            )
            .await?;
        self.event_or_parse_error(account, event)
    }

    async fn create_event(&self, account: &Account, req: &CreateEventRequest) -> Result<CalendarEvent> {
        let body = GraphEventBody {
            subject: Some(req.title.clone()),
            body: req.description.as_deref().map(GraphItemBody::text),
            start: Some(utc(&req.start)),
            end: Some(utc(&req.end)),
            is_all_day: Some(req.all_day),
            location: req.location.clone().map(|name| GraphLocation {
                display_name: Some(name),
            }),
            attendees: Some(
                req.attendees
                    .iter()
                    .filter(|a| !a.trim().is_empty())
                    .map(|a| GraphAttendee::required(a))
                    .collect(),
            ),
        };

        let event: GraphEvent = self
            .post(
                account,
                CALENDAR_SCOPES,
                "/events",
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
        let body = GraphEventBody {
            subject: req.title.clone(),
            body: req.description.as_deref().map(GraphItemBody::text),
            start: req.start.as_ref().map(utc),
            end: req.end.as_ref().map(utc),
            is_all_day: None,
            location: req.location.clone().map(|name| GraphLocation {
                display_name: Some(name),
            }),
            attendees: req
                .attendees
                .as_ref()
                .map(|list| list.iter().map(|a| GraphAttendee::required(a)).collect()),
        };

        let event: GraphEvent = self
            .patch(
                account,
                CALENDAR_SCOPES,
                &format!("/events/{}", path_segment(id)),
                &body,
                ErrorContext::resource(&account.id, "event", id),
            )
            .await?;
        self.event_or_parse_error(account, event)
    }

    async fn delete_event(&self, account: &Account, event_id: &str) -> Result<()> {
        let id = require_id(event_id, "event_id", self.provider_name())?;
        self.delete(
            account,
            CALENDAR_SCOPES,
            &format!("/events/{}", path_segment(id)),
            ErrorContext::resource(&account.id, "event", id),
        )
        .await
    }

    async fn respond_to_event(
        &self,
        account: &Account,
        event_id: &str,
        response: EventResponse,
        comment: Option<&str>,
    ) -> Result<()> {
        let id = require_id(event_id, "event_id", self.provider_name())?;
        let action = match response {
            EventResponse::Accept => "accept",
            EventResponse::Decline => "decline",
            EventResponse::Tentative => "tentativelyAccept",
        };
        let body = GraphEventReplyBody {
            comment: comment.map(str::to_string),
            send_response: true,
        };
        self.post_action(
            account,
            CALENDAR_SCOPES,
            &format!("/events/{}/{action}", path_segment(id)),
            &body,
            ErrorContext::resource(&account.id, "event", id),
        )
        .await
    }

    // ============ 联系人 ============

    async fn list_contacts(&self, account: &Account, query: &ContactQuery) -> Result<Vec<Contact>> {
        let query = query.validated(MAX_PAGE_SIZE);
        let params = [
            ("$top", query.limit.to_string()),
            ("$orderby", "displayName".to_string()),
        ];
        let list: GraphList<GraphContact> = self
            .get(
                account,
                CONTACT_SCOPES,
                "/contacts",
                &params,
                ErrorContext::account(&account.id),
            )
            .await?;
        Ok(list
            .value
            .into_iter()
            .map(|c| c.into_contact(&account.id))
            .collect())
    }

    async fn search_contacts(&self, account: &Account, text: &str, limit: u32) -> Result<Vec<Contact>> {
        let text = odata_literal(require_id(text, "query", self.provider_name())?);
        // contacts 不支持 $search，使用前缀匹配
        let filter = format!(
            "startswith(displayName,'{text}') or startswith(givenName,'{text}') or startswith(surname,'{text}') or emailAddresses/any(a:startswith(a/address,'{text}'))"
        );
        let params = [
            ("$filter", filter),
            ("$top", limit.clamp(1, MAX_PAGE_SIZE).to_string()),
        ];
        let list: GraphList<GraphContact> = self
            .get(
                account,
                CONTACT_SCOPES,
                "/contacts",
                &params,
                ErrorContext::account(&account.id),
            )
            .await?;
        Ok(list
            .value
            .into_iter()
            .map(|c| c.into_contact(&account.id))
            .collect())
    }

    async fn get_contact(&self, account: &Account, contact_id: &str) -> Result<Contact> {
        let id = require_id(contact_id, "contact_id", self.provider_name())?;
        let contact: GraphContact = self
            .get(
                account,
                CONTACT_SCOPES,
                &format!("/contacts/{}", path_segment(id)),
                &[],
                ErrorContext::resource(&account.id, "contact", id),
            )
            .await?;
        Ok(contact.into_contact(&account.id))
    }

    async fn create_contact(&self, account: &Account, req: &CreateContactRequest) -> Result<Contact> {
        let body = GraphContactBody {
            display_name: Some(req.display_name.clone()),
            given_name: req.given_name.clone(),
            surname: req.family_name.clone(),
            email_addresses: Some(
                req.emails
                    .iter()
                    .map(|e| GraphEmailAddress::address(e))
                    .collect(),
            ),
            business_phones: Some(req.phones.clone()),
            company_name: req.company.clone(),
            job_title: req.job_title.clone(),
        };
        let contact: GraphContact = self
            .post(
                account,
                CONTACT_SCOPES,
                "/contacts",
                &body,
                ErrorContext::account(&account.id),
            )
            .await?;
        Ok(contact.into_contact(&account.id))
    }

    async fn update_contact(
        &self,
        account: &Account,
        contact_id: &str,
        req: &UpdateContactRequest,
    ) -> Result<Contact> {
        let id = require_id(contact_id, "contact_id", self.provider_name())?;
        let body = GraphContactBody {
            display_name: req.display_name.clone(),
            given_name: None,
            surname: None,
            email_addresses: req
                .emails
                .as_ref()
                .map(|list| list.iter().map(|e| GraphEmailAddress::address(e)).collect()),
            business_phones: req.phones.clone(),
            company_name: req.company.clone(),
            job_title: req.job_title.clone(),
        };
        let contact: GraphContact = self
            .patch(
                account,
                CONTACT_SCOPES,
                &format!("/contacts/{}", path_segment(id)),
                &body,
                ErrorContext::resource(&account.id, "contact", id),
            )
            .await?;
        Ok(contact.into_contact(&account.id))
    }

    async fn delete_contact(&self, account: &Account, contact_id: &str) -> Result<()> {
        let id = require_id(contact_id, "contact_id", self.provider_name())?;
        self.delete(
            account,
            CONTACT_SCOPES,
            &format!("/contacts/{}", path_segment(id)),
            ErrorContext::resource(&account.id, "contact", id),
        )
        .await
    }
}
