use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ============ Accounts ============

fn default_enabled() -> bool {
    true
}

/// A registered mail/calendar account.
///
/// Accounts are immutable values. The configuration layer creates, replaces and
/// removes them; providers only read them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Unique identifier, compared case-insensitively.
    pub id: String,
    /// Human-readable display name.
    #[serde(default, alias = "displayName")]
    pub name: String,
    /// Provider-type tag as written in the configuration (e.g. `"m365"`, `"gmail"`).
    pub provider: String,
    /// Mail domains owned by this account, used for default-account routing.
    #[serde(default)]
    pub domains: Vec<String>,
    /// Disabled accounts are skipped by "all accounts" queries and routing fallbacks.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Display ordering tie-break. Higher sorts first.
    #[serde(default)]
    pub priority: i32,
    /// Opaque provider-specific settings.
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

impl Account {
    /// Create an enabled account with no domains and an empty config bag.
    pub fn new(id: impl Into<String>, provider: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            provider: provider.into(),
            domains: Vec::new(),
            enabled: true,
            priority: 0,
            config: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domains = domains.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Display name, falling back to the id when the name is blank.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Non-blank config value for `key`.
    pub fn config_value(&self, key: &str) -> Option<&str> {
        self.config
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Whether `domain` is in this account's routing list (case-insensitive).
    pub fn has_domain(&self, domain: &str) -> bool {
        self.domains
            .iter()
            .any(|d| d.trim().eq_ignore_ascii_case(domain.trim()))
    }
}

// ============ Provider Types ============

/// The closed set of backends this library can talk to.
///
/// Accounts carry a free-form tag; [`ProviderType::from_tag`] maps the
/// accepted spellings onto a variant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// Microsoft 365 / Outlook via Microsoft Graph.
    Outlook,
    /// Google Workspace via Gmail, Calendar and People APIs.
    Google,
    /// iCalendar subscription feed fetched over HTTP(S).
    Ics,
    /// JSON event list read from the local filesystem.
    JsonCalendar,
}

/// Accepted tag spellings, after normalization.
const PROVIDER_TAGS: &[(&str, ProviderType)] = &[
    ("outlook", ProviderType::Outlook),
    ("microsoft", ProviderType::Outlook),
    ("microsoft365", ProviderType::Outlook),
    ("microsoft-365", ProviderType::Outlook),
    ("m365", ProviderType::Outlook),
    ("office365", ProviderType::Outlook),
    ("office-365", ProviderType::Outlook),
    ("o365", ProviderType::Outlook),
    ("graph", ProviderType::Outlook),
    ("exchange-online", ProviderType::Outlook),
    ("google", ProviderType::Google),
    ("gmail", ProviderType::Google),
    ("gsuite", ProviderType::Google),
    ("g-suite", ProviderType::Google),
    ("google-workspace", ProviderType::Google),
    ("workspace", ProviderType::Google),
    ("ics", ProviderType::Ics),
    ("ical", ProviderType::Ics),
    ("icalendar", ProviderType::Ics),
    ("webcal", ProviderType::Ics),
    ("ics-feed", ProviderType::Ics),
    ("json", ProviderType::JsonCalendar),
    ("json-calendar", ProviderType::JsonCalendar),
    ("json-file", ProviderType::JsonCalendar),
    ("calendar-file", ProviderType::JsonCalendar),
    ("file", ProviderType::JsonCalendar),
];

impl ProviderType {
    /// Every backend, in a stable order.
    pub const ALL: [ProviderType; 4] = [
        ProviderType::Outlook,
        ProviderType::Google,
        ProviderType::Ics,
        ProviderType::JsonCalendar,
    ];

    /// Map a configuration tag onto a backend.
    ///
    /// Matching ignores case, surrounding whitespace, and treats `_` and spaces as `-`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let normalized: String = tag
            .trim()
            .chars()
            .map(|c| match c {
                '_' | ' ' => '-',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        PROVIDER_TAGS
            .iter()
            .find(|(alias, _)| *alias == normalized)
            .map(|(_, ty)| *ty)
    }

    /// Every accepted tag for this backend.
    pub fn aliases(self) -> Vec<&'static str> {
        PROVIDER_TAGS
            .iter()
            .filter(|(_, ty)| *ty == self)
            .map(|(alias, _)| *alias)
            .collect()
    }

    /// Canonical tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Outlook => "outlook",
            Self::Google => "google",
            Self::Ics => "ics",
            Self::JsonCalendar => "json_calendar",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A family of operations a provider may serve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Mail,
    Calendar,
    Contacts,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mail => f.write_str("mail"),
            Self::Calendar => f.write_str("calendar"),
            Self::Contacts => f.write_str("contacts"),
        }
    }
}

/// What a provider can do.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderCapabilities {
    pub mail: bool,
    pub calendar: bool,
    pub contacts: bool,
    /// Whether any write operation is possible at all.
    pub writable: bool,
}

impl ProviderCapabilities {
    /// Read-write mail, calendar and contacts.
    pub const HOSTED: Self = Self {
        mail: true,
        calendar: true,
        contacts: true,
        writable: true,
    };

    /// Read-only calendar.
    pub const CALENDAR_FEED: Self = Self {
        mail: false,
        calendar: true,
        contacts: false,
        writable: false,
    };

    /// Whether reads for `capability` are served.
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Mail => self.mail,
            Capability::Calendar => self.calendar,
            Capability::Contacts => self.contacts,
        }
    }

    /// Whether writes for `capability` are served.
    pub fn supports_writes(&self, capability: Capability) -> bool {
        self.writable && self.supports(capability)
    }
}

/// A configuration key understood by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigKey {
    pub key: String,
    pub required: bool,
    pub description: String,
}

/// Static description of a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetadata {
    pub id: ProviderType,
    pub name: String,
    pub description: String,
    pub aliases: Vec<String>,
    pub capabilities: ProviderCapabilities,
    pub config_keys: Vec<ProviderConfigKey>,
}

// ============ Mail ============

/// A mailbox address with an optional display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub address: String,
}

impl EmailAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: address.into(),
        }
    }

    pub fn with_name(name: Option<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.filter(|n| !n.trim().is_empty()),
            address: address.into(),
        }
    }

    /// Parse `user@x.com` or `Display Name <user@x.com>`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let (Some(open), true) = (raw.rfind('<'), raw.ends_with('>')) {
            let address = raw[open + 1..raw.len() - 1].trim().to_string();
            let name = raw[..open].trim().trim_matches('"').trim().to_string();
            return Self::with_name(Some(name), address);
        }
        Self::new(raw.trim_start_matches("mailto:"))
    }

    /// Lower-cased domain part, if the address has one.
    pub fn domain(&self) -> Option<String> {
        let (_, domain) = self.address.rsplit_once('@')?;
        let domain = domain.trim().trim_end_matches('>').to_ascii_lowercase();
        if domain.is_empty() {
            None
        } else {
            Some(domain)
        }
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.address),
            None => f.write_str(&self.address),
        }
    }
}

/// A mail message as seen through any provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<EmailAddress>,
    #[serde(default)]
    pub to: Vec<EmailAddress>,
    #[serde(default)]
    pub cc: Vec<EmailAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Only populated by single-message fetches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default)]
    pub has_attachments: bool,
}

/// Filters for message listing.
///
/// # Default
///
/// Inbox-agnostic, all messages, `limit = 25`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageQuery {
    /// Folder / label to list (`inbox`, `sent`, a provider folder id...). `None` = inbox.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    /// Only unread messages.
    #[serde(default)]
    pub unread_only: bool,
    /// Maximum number of messages per account.
    pub limit: u32,
}

impl Default for MessageQuery {
    fn default() -> Self {
        Self {
            folder: None,
            unread_only: false,
            limit: 25,
        }
    }
}

impl MessageQuery {
    /// Clamp `limit` to `1..=max_limit`.
    #[must_use]
    pub fn validated(&self, max_limit: u32) -> Self {
        Self {
            limit: self.limit.clamp(1, max_limit),
            ..self.clone()
        }
    }
}

/// A message to send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
    /// Treat `body` as HTML instead of plain text.
    #[serde(default)]
    pub html: bool,
}

impl OutgoingMessage {
    /// The address used for default-account routing.
    pub fn primary_recipient(&self) -> Option<&str> {
        self.to
            .iter()
            .chain(self.cc.iter())
            .map(String::as_str)
            .find(|addr| !addr.trim().is_empty())
    }
}

// ============ Calendar ============

/// An attendee's reply state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttendeeResponse {
    #[default]
    None,
    Organizer,
    Accepted,
    Tentative,
    Declined,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attendee {
    pub email: EmailAddress,
    #[serde(default)]
    pub response: AttendeeResponse,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Confirmed,
    Tentative,
    Cancelled,
}

/// A calendar event as seen through any provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub account_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer: Option<EmailAddress>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_link: Option<String>,
    /// Set for events served by read-only feeds.
    #[serde(default)]
    pub read_only: bool,
}

/// Time window for event listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Maximum number of events per account.
    pub limit: u32,
}

impl EventQuery {
    /// Events from now until `days` ahead.
    pub fn upcoming(days: i64, limit: u32) -> Self {
        let start = Utc::now();
        Self {
            start,
            end: start + Duration::days(days),
            limit,
        }
    }

    /// Whether `event` overlaps this window.
    pub fn overlaps(&self, event: &CalendarEvent) -> bool {
        event.start < self.end && event.end > self.start
    }

    /// Clamp `limit` to `1..=max_limit` and make sure `end >= start`.
    #[must_use]
    pub fn validated(&self, max_limit: u32) -> Self {
        Self {
            start: self.start,
            end: self.end.max(self.start),
            limit: self.limit.clamp(1, max_limit),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
}

impl CreateEventRequest {
    /// The address used for default-account routing.
    pub fn primary_attendee(&self) -> Option<&str> {
        self.attendees
            .iter()
            .map(String::as_str)
            .find(|addr| !addr.trim().is_empty())
    }
}

/// Partial event update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<String>>,
}

/// Reply to a meeting invitation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventResponse {
    Accept,
    Decline,
    Tentative,
}

impl FromStr for EventResponse {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept" | "accepted" | "yes" => Ok(Self::Accept),
            "decline" | "declined" | "no" => Ok(Self::Decline),
            "tentative" | "tentativelyaccept" | "maybe" => Ok(Self::Tentative),
            other => Err(format!(
                "invalid response '{other}', expected accept, decline or tentative"
            )),
        }
    }
}

impl fmt::Display for EventResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accept => f.write_str("accept"),
            Self::Decline => f.write_str("decline"),
            Self::Tentative => f.write_str("tentative"),
        }
    }
}

// ============ Contacts ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub account_id: String,
    pub display_name: String,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub phones: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
}

/// Contact listing limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactQuery {
    pub limit: u32,
}

impl Default for ContactQuery {
    fn default() -> Self {
        Self { limit: 50 }
    }
}

impl ContactQuery {
    #[must_use]
    pub fn validated(&self, max_limit: u32) -> Self {
        Self {
            limit: self.limit.clamp(1, max_limit),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactRequest {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub phones: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
}

impl CreateContactRequest {
    /// The address used for default-account routing.
    pub fn primary_email(&self) -> Option<&str> {
        self.emails
            .iter()
            .map(String::as_str)
            .find(|addr| !addr.trim().is_empty())
    }
}

/// Partial contact update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emails: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phones: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
}
