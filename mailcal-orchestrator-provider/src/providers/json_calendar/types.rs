//! JSON 日历文件格式

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::providers::common::stable_event_id;
use crate::types::{Attendee, AttendeeResponse, CalendarEvent, EmailAddress, EventStatus};
use crate::utils::datetime;

/// 文件顶层：包装对象或裸数组
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum JsonCalendarDocument {
    Wrapped { events: Vec<JsonEvent> },
    Bare(Vec<JsonEvent>),
}

impl JsonCalendarDocument {
    pub fn into_events(self) -> Vec<JsonEvent> {
        match self {
            Self::Wrapped { events } | Self::Bare(events) => events,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonEvent {
    #[serde(default, alias = "uid")]
    pub id: Option<String>,
    #[serde(default, alias = "summary", alias = "subject")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(with = "datetime::flexible")]
    pub start: DateTime<Utc>,
    #[serde(default, with = "datetime::flexible_option")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default, alias = "all_day")]
    pub all_day: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub organizer: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default, alias = "webLink")]
    pub url: Option<String>,
}

impl JsonEvent {
    pub fn into_event(self, account_id: &str, source: &str) -> CalendarEvent {
        let end = self.end.unwrap_or_else(|| {
            if self.all_day {
                self.start + Duration::days(1)
            } else {
                self.start
            }
        });
        let id = match self.id.map(|id| id.trim().to_string()) {
            Some(id) if !id.is_empty() => id,
            _ => stable_event_id(source, &self.title, &self.start),
        };
        let status = match self
            .status
            .as_deref()
            .map(|s| s.trim().to_ascii_lowercase())
            .as_deref()
        {
            Some("cancelled" | "canceled") => EventStatus::Cancelled,
            Some("tentative") => EventStatus::Tentative,
            _ => EventStatus::Confirmed,
        };

        CalendarEvent {
            id,
            account_id: account_id.to_string(),
            title: self.title,
            description: self.description.filter(|s| !s.trim().is_empty()),
            location: self.location.filter(|s| !s.trim().is_empty()),
            start: self.start,
            end: end.max(self.start),
            all_day: self.all_day,
            organizer: self
                .organizer
                .filter(|o| !o.trim().is_empty())
                .map(|o| EmailAddress::parse(&o)),
            attendees: self
                .attendees
                .iter()
                .filter(|a| !a.trim().is_empty())
                .map(|a| Attendee {
                    email: EmailAddress::parse(a),
                    response: AttendeeResponse::None,
                    optional: false,
                })
                .collect(),
            status,
            web_link: self.url,
            read_only: true,
        }
    }
}
