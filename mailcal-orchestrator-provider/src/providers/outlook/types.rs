//! Microsoft Graph API 类型定义

use serde::{Deserialize, Serialize};

use crate::types::{
    Attendee, AttendeeResponse, CalendarEvent, Contact, EmailAddress, EventStatus, Message,
};
use crate::utils::datetime::parse_flexible;

/// Graph 集合响应
#[derive(Debug, Deserialize)]
pub struct GraphList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// Graph 错误响应
#[derive(Debug, Deserialize)]
pub struct GraphErrorResponse {
    pub error: GraphErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct GraphErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GraphEmailAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl GraphEmailAddress {
    pub fn address(address: &str) -> Self {
        Self {
            name: None,
            address: Some(address.trim().to_string()),
        }
    }

    fn into_email(self) -> Option<EmailAddress> {
        let address = self.address.filter(|a| !a.is_empty())?;
        Some(EmailAddress::with_name(self.name, address))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRecipient {
    pub email_address: GraphEmailAddress,
}

impl GraphRecipient {
    pub fn to(address: &str) -> Self {
        Self {
            email_address: GraphEmailAddress::address(address),
        }
    }
}

fn recipients(list: Vec<GraphRecipient>) -> Vec<EmailAddress> {
    list.into_iter()
        .filter_map(|r| r.email_address.into_email())
        .collect()
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphItemBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl GraphItemBody {
    pub fn text(content: &str) -> Self {
        Self {
            content_type: Some("Text".to_string()),
            content: Some(content.to_string()),
        }
    }

    pub fn html(content: &str) -> Self {
        Self {
            content_type: Some("HTML".to_string()),
            content: Some(content.to_string()),
        }
    }
}

// ============ 邮件 ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMessage {
    pub id: String,
    pub conversation_id: Option<String>,
    pub subject: Option<String>,
    pub from: Option<GraphRecipient>,
    #[serde(default)]
    pub to_recipients: Vec<GraphRecipient>,
    #[serde(default)]
    pub cc_recipients: Vec<GraphRecipient>,
    pub received_date_time: Option<String>,
    pub body_preview: Option<String>,
    pub body: Option<GraphItemBody>,
    #[serde(default)]
    pub is_read: bool,
    pub parent_folder_id: Option<String>,
    #[serde(default)]
    pub has_attachments: bool,
}

impl GraphMessage {
    pub fn into_message(self, account_id: &str) -> Message {
        Message {
            id: self.id,
            account_id: account_id.to_string(),
            thread_id: self.conversation_id,
            subject: self.subject.unwrap_or_default(),
            from: self.from.and_then(|r| r.email_address.into_email()),
            to: recipients(self.to_recipients),
            cc: recipients(self.cc_recipients),
            received_at: self.received_date_time.as_deref().and_then(parse_flexible),
            snippet: self.body_preview.filter(|s| !s.is_empty()),
            body: self.body.and_then(|b| b.content),
            is_read: self.is_read,
            folder: self.parent_folder_id,
            has_attachments: self.has_attachments,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphOutgoingMessage {
    pub subject: String,
    pub body: GraphItemBody,
    pub to_recipients: Vec<GraphRecipient>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cc_recipients: Vec<GraphRecipient>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bcc_recipients: Vec<GraphRecipient>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSendMailBody {
    pub message: GraphOutgoingMessage,
    pub save_to_sent_items: bool,
}

// ============ 日历 ============

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDateTimeZone {
    pub date_time: String,
    pub time_zone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLocation {
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GraphResponseStatus {
    pub response: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphAttendee {
    pub email_address: GraphEmailAddress,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub attendee_type: Option<String>,
    #[serde(skip_serializing)]
    pub status: Option<GraphResponseStatus>,
}

impl GraphAttendee {
    pub fn required(address: &str) -> Self {
        Self {
            email_address: GraphEmailAddress::address(address),
            attendee_type: Some("required".to_string()),
            status: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEvent {
    pub id: String,
    pub subject: Option<String>,
    pub body_preview: Option<String>,
    pub location: Option<GraphLocation>,
    pub start: GraphDateTimeZone,
    pub end: GraphDateTimeZone,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default)]
    pub is_cancelled: bool,
    pub show_as: Option<String>,
    pub organizer: Option<GraphRecipient>,
    #[serde(default)]
    pub attendees: Vec<GraphAttendee>,
    pub web_link: Option<String>,
}

fn attendee_response(status: Option<GraphResponseStatus>) -> AttendeeResponse {
    match status
        .and_then(|s| s.response)
        .unwrap_or_default()
        .as_str()
    {
        "organizer" => AttendeeResponse::Organizer,
        "accepted" => AttendeeResponse::Accepted,
        "tentativelyAccepted" => AttendeeResponse::Tentative,
        "declined" => AttendeeResponse::Declined,
        _ => AttendeeResponse::None,
    }
}

impl GraphEvent {
    /// 时间无法解析时返回 `None`
    pub fn into_event(self, account_id: &str) -> Option<CalendarEvent> {
        let start = parse_flexible(&self.start.date_time)?;
        let end = parse_flexible(&self.end.date_time).unwrap_or(start);
        let status = if self.is_cancelled {
            EventStatus::Cancelled
        } else if self.show_as.as_deref() == Some("tentative") {
            EventStatus::Tentative
        } else {
            EventStatus::Confirmed
        };
        Some(CalendarEvent {
            id: self.id,
            account_id: account_id.to_string(),
            title: self.subject.unwrap_or_default(),
            description: self.body_preview.filter(|s| !s.is_empty()),
            location: self
                .location
                .and_then(|l| l.display_name)
                .filter(|s| !s.is_empty()),
            start,
            end,
            all_day: self.is_all_day,
            organizer: self.organizer.and_then(|o| o.email_address.into_email()),
            attendees: self
                .attendees
                .into_iter()
                .filter_map(|a| {
                    let optional = a.attendee_type.as_deref() == Some("optional");
                    let response = attendee_response(a.status);
                    a.email_address.into_email().map(|email| Attendee {
                        email,
                        response,
                        optional,
                    })
                })
                .collect(),
            status,
            web_link: self.web_link,
            read_only: false,
        })
    }
}

/// 创建 / 更新事件请求体，`None` 字段不发送
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEventBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<GraphItemBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<GraphDateTimeZone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<GraphDateTimeZone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_all_day: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GraphLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<GraphAttendee>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEventReplyBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub send_response: bool,
}

// ============ 联系人 ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphContact {
    pub id: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<GraphEmailAddress>,
    #[serde(default)]
    pub business_phones: Vec<String>,
    #[serde(default)]
    pub home_phones: Vec<String>,
    pub mobile_phone: Option<String>,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
}

impl GraphContact {
    pub fn into_contact(self, account_id: &str) -> Contact {
        let emails: Vec<String> = self
            .email_addresses
            .into_iter()
            .filter_map(|e| e.address)
            .filter(|a| !a.is_empty())
            .collect();
        let phones = self
            .mobile_phone
            .into_iter()
            .chain(self.business_phones)
            .chain(self.home_phones)
            .filter(|p| !p.is_empty())
            .collect();
        let display_name = self
            .display_name
            .filter(|n| !n.is_empty())
            .or_else(|| emails.first().cloned())
            .unwrap_or_default();
        Contact {
            id: self.id,
            account_id: account_id.to_string(),
            display_name,
            emails,
            phones,
            company: self.company_name.filter(|s| !s.is_empty()),
            job_title: self.job_title.filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphContactBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_addresses: Option<Vec<GraphEmailAddress>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_phones: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
}
