//! Google API 类型定义（Gmail v1 / Calendar v3 / People v1）

use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

use crate::providers::common::strip_html;
use crate::types::{
    Attendee, AttendeeResponse, CalendarEvent, Contact, EmailAddress, EventStatus, Message,
};
use crate::utils::datetime::{parse_date, parse_flexible, parse_unix_timestamp};

/// Google API 错误响应
#[derive(Debug, Deserialize)]
pub struct GoogleErrorResponse {
    pub error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct GoogleErrorBody {
    pub message: String,
    /// gRPC 风格状态，如 `NOT_FOUND`
    pub status: Option<String>,
    #[serde(default)]
    pub errors: Vec<GoogleErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct GoogleErrorDetail {
    pub reason: Option<String>,
}

// ============ Gmail ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessageList {
    #[serde(default)]
    pub messages: Vec<GmailMessageRef>,
}

#[derive(Debug, Deserialize)]
pub struct GmailMessageRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct GmailHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct GmailBody {
    pub data: Option<String>,
    #[serde(rename = "attachmentId")]
    pub attachment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailPart {
    pub mime_type: Option<String>,
    pub filename: Option<String>,
    #[serde(default)]
    pub headers: Vec<GmailHeader>,
    pub body: Option<GmailBody>,
    #[serde(default)]
    pub parts: Vec<GmailPart>,
}

impl GmailPart {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    fn has_attachment(&self) -> bool {
        let own = self.filename.as_deref().is_some_and(|f| !f.is_empty())
            && self
                .body
                .as_ref()
                .is_some_and(|b| b.attachment_id.is_some());
        own || self.parts.iter().any(GmailPart::has_attachment)
    }

    /// 深度优先查找第一个指定 MIME 类型的正文
    fn find_body(&self, mime: &str) -> Option<String> {
        if self.mime_type.as_deref() == Some(mime) {
            if let Some(text) = self
                .body
                .as_ref()
                .and_then(|b| b.data.as_deref())
                .and_then(decode_base64url)
            {
                return Some(text);
            }
        }
        self.parts.iter().find_map(|p| p.find_body(mime))
    }
}

/// Gmail 使用 URL-safe base64，是否带填充不固定
pub fn decode_base64url(data: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(data.trim_end_matches('='))
        .or_else(|_| URL_SAFE.decode(data))
        .ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn encode_base64url(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    pub thread_id: Option<String>,
    #[serde(default)]
    pub label_ids: Vec<String>,
    pub snippet: Option<String>,
    /// 毫秒时间戳字符串
    pub internal_date: Option<String>,
    pub payload: Option<GmailPart>,
}

fn address_list(raw: Option<&str>) -> Vec<EmailAddress> {
    raw.map(|value| {
        split_addresses(value)
            .into_iter()
            .map(|a| EmailAddress::parse(&a))
            .filter(|a| !a.address.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// 按逗号切分地址列表，忽略引号内的逗号
fn split_addresses(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in value.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            ',' if !quoted => {
                out.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    out.push(current);
    out.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl GmailMessage {
    pub fn into_message(self, account_id: &str) -> Message {
        let payload = self.payload;
        let header = |name: &str| payload.as_ref().and_then(|p| p.header(name));

        let body = payload.as_ref().and_then(|p| {
            p.find_body("text/plain")
                .or_else(|| p.find_body("text/html").map(|html| strip_html(&html)))
        });
        let folder = ["INBOX", "SENT", "DRAFT", "SPAM", "TRASH"]
            .iter()
            .find(|l| self.label_ids.iter().any(|id| id == *l))
            .map(|l| l.to_ascii_lowercase());

        Message {
            id: self.id,
            account_id: account_id.to_string(),
            thread_id: self.thread_id,
            subject: header("Subject").unwrap_or_default().to_string(),
            from: header("From").map(EmailAddress::parse),
            to: address_list(header("To")),
            cc: address_list(header("Cc")),
            received_at: self
                .internal_date
                .as_deref()
                .and_then(|d| d.parse::<i64>().ok())
                .and_then(parse_unix_timestamp),
            snippet: self.snippet.filter(|s| !s.is_empty()),
            body,
            is_read: !self.label_ids.iter().any(|l| l == "UNREAD"),
            folder,
            has_attachments: payload.as_ref().is_some_and(GmailPart::has_attachment),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GmailRawMessage {
    pub raw: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailModifyBody {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add_label_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove_label_ids: Vec<String>,
}

// ============ Calendar ============

#[derive(Debug, Deserialize)]
pub struct GoogleEventList {
    #[serde(default)]
    pub items: Vec<GoogleEvent>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl GoogleEventTime {
    pub fn from_utc(dt: &chrono::DateTime<chrono::Utc>, all_day: bool) -> Self {
        if all_day {
            Self {
                date_time: None,
                date: Some(dt.format("%Y-%m-%d").to_string()),
            }
        } else {
            Self {
                date_time: Some(dt.to_rfc3339()),
                date: None,
            }
        }
    }

    fn parse(&self) -> Option<(chrono::DateTime<chrono::Utc>, bool)> {
        if let Some(dt) = self.date_time.as_deref().and_then(parse_flexible) {
            return Some((dt, false));
        }
        self.date.as_deref().and_then(parse_date).map(|d| (d, true))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAttendee {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(default, rename = "self", skip_serializing_if = "std::ops::Not::not")]
    pub is_self: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub organizer: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl GoogleAttendee {
    pub fn invite(email: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            display_name: None,
            response_status: None,
            optional: false,
            is_self: false,
            organizer: false,
            comment: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleOrganizer {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEvent {
    pub id: String,
    pub status: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub start: GoogleEventTime,
    #[serde(default)]
    pub end: GoogleEventTime,
    pub organizer: Option<GoogleOrganizer>,
    #[serde(default)]
    pub attendees: Vec<GoogleAttendee>,
    pub html_link: Option<String>,
}

fn response_status(status: Option<&str>, organizer: bool) -> AttendeeResponse {
    if organizer {
        return AttendeeResponse::Organizer;
    }
    match status {
        Some("accepted") => AttendeeResponse::Accepted,
        Some("tentative") => AttendeeResponse::Tentative,
        Some("declined") => AttendeeResponse::Declined,
        _ => AttendeeResponse::None,
    }
}

impl GoogleEvent {
    /// 时间无法解析时返回 `None`
    pub fn into_event(self, account_id: &str) -> Option<CalendarEvent> {
        let (start, all_day) = self.start.parse()?;
        let end = self.end.parse().map_or(start, |(end, _)| end);
        let status = match self.status.as_deref() {
            Some("cancelled") => EventStatus::Cancelled,
            Some("tentative") => EventStatus::Tentative,
            _ => EventStatus::Confirmed,
        };
        Some(CalendarEvent {
            id: self.id,
            account_id: account_id.to_string(),
            title: self.summary.unwrap_or_default(),
            description: self.description.filter(|s| !s.is_empty()),
            location: self.location.filter(|s| !s.is_empty()),
            start,
            end,
            all_day,
            organizer: self.organizer.and_then(|o| {
                o.email
                    .map(|email| EmailAddress::with_name(o.display_name, email))
            }),
            attendees: self
                .attendees
                .into_iter()
                .map(|a| Attendee {
                    response: response_status(a.response_status.as_deref(), a.organizer),
                    optional: a.optional,
                    email: EmailAddress::with_name(a.display_name, a.email),
                })
                .collect(),
            status,
            web_link: self.html_link,
            read_only: false,
        })
    }
}

/// 创建 / 更新事件请求体，`None` 字段不发送
#[derive(Debug, Default, Serialize)]
pub struct GoogleEventBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<GoogleEventTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<GoogleEventTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<GoogleAttendee>>,
}

/// 仅用于回复邀请时读取参与人
#[derive(Debug, Deserialize)]
pub struct GoogleEventAttendees {
    #[serde(default)]
    pub attendees: Vec<GoogleAttendee>,
}

// ============ People ============

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonName {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PersonValue {
    #[serde(default)]
    pub value: String,
}

impl PersonValue {
    pub fn of(value: &str) -> Self {
        Self {
            value: value.trim().to_string(),
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonOrganization {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<PersonName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub email_addresses: Vec<PersonValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phone_numbers: Vec<PersonValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub organizations: Vec<PersonOrganization>,
}

impl Person {
    pub fn into_contact(self, account_id: &str) -> Contact {
        let emails: Vec<String> = self
            .email_addresses
            .into_iter()
            .map(|e| e.value)
            .filter(|v| !v.is_empty())
            .collect();
        let name = self.names.into_iter().next().unwrap_or_default();
        let display_name = name
            .display_name
            .filter(|n| !n.is_empty())
            .or_else(|| {
                let joined = [name.given_name, name.family_name]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" ");
                (!joined.is_empty()).then_some(joined)
            })
            .or_else(|| emails.first().cloned())
            .unwrap_or_default();
        let org = self.organizations.into_iter().next().unwrap_or_default();
        Contact {
            id: self.resource_name.unwrap_or_default(),
            account_id: account_id.to_string(),
            display_name,
            emails,
            phones: self
                .phone_numbers
                .into_iter()
                .map(|p| p.value)
                .filter(|v| !v.is_empty())
                .collect(),
            company: org.name.filter(|s| !s.is_empty()),
            job_title: org.title.filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PersonConnections {
    #[serde(default)]
    pub connections: Vec<Person>,
}

#[derive(Debug, Deserialize)]
pub struct PersonSearchResponse {
    #[serde(default)]
    pub results: Vec<PersonSearchResult>,
}

#[derive(Debug, Deserialize)]
pub struct PersonSearchResult {
    pub person: Person,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gmail_message_full_payload() {
        let body = encode_base64url("Hello Bob,\nsee you.".as_bytes());
        let raw = format!(
            r#"{{
                "id": "18c1",
                "threadId": "18c0",
                "labelIds": ["INBOX", "IMPORTANT"],
                "snippet": "Hello Bob",
                "internalDate": "1714554000000",
                "payload": {{
                    "mimeType": "multipart/mixed",
                    "headers": [
                        {{"name": "Subject", "value": "Lunch"}},
                        {{"name": "From", "value": "\"Ada, L.\" <ada@acme.com>"}},
                        {{"name": "To", "value": "bob@x.com, \"Carol, C\" <carol@x.com>"}}
                    ],
                    "parts": [
                        {{"mimeType": "text/plain", "body": {{"data": "{body}"}}}},
                        {{"mimeType": "application/pdf", "filename": "menu.pdf",
                          "body": {{"attachmentId": "att-1"}}}}
                    ]
                }}
            }}"#
        );
        let msg: GmailMessage = serde_json::from_str(&raw).unwrap();
        let msg = msg.into_message("home");
        assert_eq!(msg.subject, "Lunch");
        assert_eq!(msg.from.unwrap().name.as_deref(), Some("Ada, L."));
        assert_eq!(msg.to.len(), 2);
        assert_eq!(msg.to[1].address, "carol@x.com");
        assert_eq!(msg.body.as_deref(), Some("Hello Bob,\nsee you."));
        assert!(msg.is_read);
        assert!(msg.has_attachments);
        assert_eq!(msg.folder.as_deref(), Some("inbox"));
        assert!(msg.received_at.is_some());
    }

    #[test]
    fn unread_label_marks_unread() {
        let msg: GmailMessage =
            serde_json::from_str(r#"{"id":"1","labelIds":["UNREAD","INBOX"]}"#).unwrap();
        assert!(!msg.into_message("home").is_read);
    }

    #[test]
    fn base64url_padding_tolerated() {
        assert_eq!(decode_base64url("aGk=").as_deref(), Some("hi"));
        assert_eq!(decode_base64url("aGk").as_deref(), Some("hi"));
    }

    #[test]
    fn all_day_event_uses_date() {
        let raw = r#"{
            "id": "e1",
            "summary": "Holiday",
            "start": {"date": "2024-12-25"},
            "end": {"date": "2024-12-26"},
            "attendees": [{"email": "me@gmail.com", "self": true, "responseStatus": "tentative"}]
        }"#;
        let event: GoogleEvent = serde_json::from_str(raw).unwrap();
        let event = event.into_event("home").unwrap();
        assert!(event.all_day);
        assert_eq!(event.end - event.start, chrono::Duration::days(1));
        assert_eq!(event.attendees[0].response, AttendeeResponse::Tentative);
    }

    #[test]
    fn event_time_serialization() {
        let dt = parse_flexible("2024-05-01T09:00:00Z").unwrap();
        let timed = serde_json::to_value(GoogleEventTime::from_utc(&dt, false)).unwrap();
        assert_eq!(timed["dateTime"], "2024-05-01T09:00:00+00:00");
        let day = serde_json::to_value(GoogleEventTime::from_utc(&dt, true)).unwrap();
        assert_eq!(day, serde_json::json!({"date": "2024-05-01"}));
    }

    #[test]
    fn person_display_name_fallbacks() {
        let raw = r#"{
            "resourceName": "people/c42",
            "names": [{"givenName": "Grace", "familyName": "Hopper"}],
            "emailAddresses": [{"value": "grace@navy.mil"}],
            "organizations": [{"name": "USN", "title": "Rear Admiral"}]
        }"#;
        let person: Person = serde_json::from_str(raw).unwrap();
        let contact = person.into_contact("home");
        assert_eq!(contact.id, "people/c42");
        assert_eq!(contact.display_name, "Grace Hopper");
        assert_eq!(contact.company.as_deref(), Some("USN"));
    }
}
