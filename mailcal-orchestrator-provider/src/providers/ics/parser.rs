//! Minimal iCalendar (RFC 5545) reader.
//!
//! Only `VEVENT` components are read. Recurrence rules are not expanded: each
//! `VEVENT` becomes exactly one event. Times with a `TZID` are read as UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::providers::common::stable_event_id;
use crate::types::{Attendee, AttendeeResponse, CalendarEvent, EmailAddress, EventStatus};

/// A content line split into name, parameters and value.
#[derive(Debug)]
struct Property<'a> {
    name: String,
    params: Vec<(String, String)>,
    value: &'a str,
}

impl Property<'_> {
    fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Join folded lines (continuations start with a space or tab).
fn unfold(document: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in document.lines() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        match (raw.strip_prefix([' ', '\t']), lines.last_mut()) {
            (Some(rest), Some(last)) => last.push_str(rest),
            _ => lines.push(raw.to_string()),
        }
    }
    lines
}

/// Split `NAME;P1=a;P2="b;c":value`. Colons inside quoted parameter values do not end the name part.
fn parse_property(line: &str) -> Option<Property<'_>> {
    let mut quoted = false;
    let mut split_at = None;
    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ':' if !quoted => {
                split_at = Some(i);
                break;
            }
            _ => {}
        }
    }
    let split_at = split_at?;
    let (head, value) = (&line[..split_at], &line[split_at + 1..]);

    let mut parts = head.split(';');
    let name = parts.next()?.trim().to_ascii_uppercase();
    let params = parts
        .filter_map(|p| {
            let (k, v) = p.split_once('=')?;
            Some((k.trim().to_ascii_uppercase(), v.trim_matches('"').to_string()))
        })
        .collect();

    Some(Property {
        name,
        params,
        value,
    })
}

/// TEXT value unescaping.
fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n' | 'N') => out.push('\n'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Returns the instant and whether it was a DATE (all-day) value.
fn parse_ics_datetime(prop: &Property<'_>) -> Option<(DateTime<Utc>, bool)> {
    let value = prop.value.trim();
    let is_date = prop.param("VALUE").is_some_and(|v| v.eq_ignore_ascii_case("DATE"))
        || (value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()));

    if is_date {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;
        return Some((date.and_hms_opt(0, 0, 0)?.and_utc(), true));
    }

    let naive = value.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(naive, "%Y%m%dT%H%M%S")
        .ok()
        .map(|dt| (dt.and_utc(), false))
}

/// `P1W`, `P1DT2H`, `PT30M`, `-PT15M`.
fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (negative, value) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let body = value.strip_prefix('P')?;

    let mut total = Duration::zero();
    let mut number = String::new();
    let mut in_time = false;
    for c in body.chars() {
        match c {
            'T' => in_time = true,
            d if d.is_ascii_digit() => number.push(d),
            unit => {
                let n: i64 = number.parse().ok()?;
                number.clear();
                total += match (unit, in_time) {
                    ('W', false) => Duration::weeks(n),
                    ('D', false) => Duration::days(n),
                    ('H', true) => Duration::hours(n),
                    ('M', true) => Duration::minutes(n),
                    ('S', true) => Duration::seconds(n),
                    _ => return None,
                };
            }
        }
    }
    if !number.is_empty() {
        return None;
    }
    Some(if negative { -total } else { total })
}

fn parse_address(prop: &Property<'_>) -> Option<EmailAddress> {
    let address = prop.value.trim();
    let address = address
        .strip_prefix("mailto:")
        .or_else(|| address.strip_prefix("MAILTO:"))
        .unwrap_or(address)
        .trim();
    if address.is_empty() {
        return None;
    }
    Some(EmailAddress::with_name(
        prop.param("CN").map(str::to_string),
        address,
    ))
}

fn partstat(prop: &Property<'_>) -> AttendeeResponse {
    match prop
        .param("PARTSTAT")
        .map(str::to_ascii_uppercase)
        .as_deref()
    {
        Some("ACCEPTED") => AttendeeResponse::Accepted,
        Some("DECLINED") => AttendeeResponse::Declined,
        Some("TENTATIVE") => AttendeeResponse::Tentative,
        _ => AttendeeResponse::None,
    }
}

#[derive(Default)]
struct VEventBuilder {
    uid: Option<String>,
    recurrence_id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<(DateTime<Utc>, bool)>,
    end: Option<DateTime<Utc>>,
    duration: Option<Duration>,
    status: EventStatus,
    organizer: Option<EmailAddress>,
    attendees: Vec<Attendee>,
    url: Option<String>,
}

impl VEventBuilder {
    fn apply(&mut self, prop: &Property<'_>) {
        match prop.name.as_str() {
            "UID" => self.uid = Some(prop.value.trim().to_string()),
            "RECURRENCE-ID" => self.recurrence_id = Some(prop.value.trim().to_string()),
            "SUMMARY" => self.summary = Some(unescape(prop.value)),
            "DESCRIPTION" => self.description = Some(unescape(prop.value)),
            "LOCATION" => self.location = Some(unescape(prop.value)),
            "DTSTART" => self.start = parse_ics_datetime(prop),
            "DTEND" => self.end = parse_ics_datetime(prop).map(|(dt, _)| dt),
            "DURATION" => self.duration = parse_duration(prop.value),
            "STATUS" => {
                self.status = match prop.value.trim().to_ascii_uppercase().as_str() {
                    "CANCELLED" => EventStatus::Cancelled,
                    "TENTATIVE" => EventStatus::Tentative,
                    _ => EventStatus::Confirmed,
                };
            }
            "ORGANIZER" => self.organizer = parse_address(prop),
            "ATTENDEE" => {
                if let Some(email) = parse_address(prop) {
                    self.attendees.push(Attendee {
                        email,
                        response: partstat(prop),
                        optional: prop
                            .param("ROLE")
                            .is_some_and(|r| r.eq_ignore_ascii_case("OPT-PARTICIPANT")),
                    });
                }
            }
            "URL" => self.url = Some(prop.value.trim().to_string()),
            _ => {}
        }
    }

    fn build(self, account_id: &str, source: &str) -> Option<CalendarEvent> {
        let (start, all_day) = self.start?;
        let end = self
            .end
            .or_else(|| self.duration.map(|d| start + d))
            .unwrap_or_else(|| {
                if all_day {
                    start + Duration::days(1)
                } else {
                    start
                }
            });
        let title = self.summary.unwrap_or_default();

        let id = match (self.uid.filter(|u| !u.is_empty()), self.recurrence_id) {
            (Some(uid), Some(rid)) => format!("{uid}/{rid}"),
            (Some(uid), None) => uid,
            (None, _) => stable_event_id(source, &title, &start),
        };

        Some(CalendarEvent {
            id,
            account_id: account_id.to_string(),
            title,
            description: self.description.filter(|s| !s.is_empty()),
            location: self.location.filter(|s| !s.is_empty()),
            start,
            end: end.max(start),
            all_day,
            organizer: self.organizer,
            attendees: self.attendees,
            status: self.status,
            web_link: self.url,
            read_only: true,
        })
    }
}

/// Outcome of parsing one document.
#[derive(Debug)]
pub struct ParsedCalendar {
    pub events: Vec<CalendarEvent>,
    /// `VEVENT`s dropped for lacking a usable `DTSTART`.
    pub skipped: usize,
}

/// Parse an iCalendar document. Fails only when the text is not a `VCALENDAR` at all.
pub fn parse_calendar(document: &str, account_id: &str, source: &str) -> Result<ParsedCalendar, String> {
    let lines = unfold(document);
    if !lines
        .iter()
        .any(|l| l.trim().eq_ignore_ascii_case("BEGIN:VCALENDAR"))
    {
        return Err("document has no BEGIN:VCALENDAR".to_string());
    }

    let mut events = Vec::new();
    let mut skipped = 0;
    let mut current: Option<VEventBuilder> = None;
    // 嵌套组件（VALARM 等）内的属性不属于事件本身
    let mut nested_depth = 0_usize;

    for line in &lines {
        let Some(prop) = parse_property(line) else {
            continue;
        };
        let value = prop.value.trim().to_ascii_uppercase();
        match (prop.name.as_str(), value.as_str()) {
            ("BEGIN", "VEVENT") if current.is_none() => current = Some(VEventBuilder::default()),
            ("BEGIN", _) if current.is_some() => nested_depth += 1,
            ("END", "VEVENT") if nested_depth == 0 => {
                if let Some(builder) = current.take() {
                    match builder.build(account_id, source) {
                        Some(event) => events.push(event),
                        None => skipped += 1,
                    }
                }
            }
            ("END", _) if current.is_some() && nested_depth > 0 => nested_depth -= 1,
            _ => {
                if let (Some(builder), 0) = (current.as_mut(), nested_depth) {
                    builder.apply(&prop);
                }
            }
        }
    }

    Ok(ParsedCalendar { events, skipped })
}
