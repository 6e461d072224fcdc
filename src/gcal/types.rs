//! Google Calendar API type definitions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Calendar list entry
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    pub id: String,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub primary: bool,

    #[serde(default)]
    pub access_role: String,
}

/// Calendar list response
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CalendarList {
    #[serde(default)]
    pub items: Vec<CalendarListEntry>,
}

/// Start or end of an event. Timed events use `date_time`, all-day events
/// use `date`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventTime {
    /// Build from user input: a bare `YYYY-MM-DD` is an all-day date,
    /// anything else a date-time in `time_zone`
    pub fn from_input(value: &str, time_zone: &str) -> Self {
        if chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
            Self {
                date: Some(value.to_string()),
                ..Default::default()
            }
        } else {
            Self {
                date_time: Some(value.to_string()),
                time_zone: Some(time_zone.to_string()),
                ..Default::default()
            }
        }
    }

    /// The date-time, or the date for all-day events
    pub fn display(&self) -> String {
        self.date_time
            .clone()
            .or_else(|| self.date.clone())
            .unwrap_or_default()
    }
}

/// Event attendee. Fields other than the email are carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Attendee {
    #[serde(default)]
    pub email: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Attendee {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            extra: Map::new(),
        }
    }
}

/// A calendar event.
///
/// Fields the tools do not touch land in `extra`, so a read-modify-write
/// update sends them back unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventTime>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    pub fn attendee_emails(&self) -> Vec<String> {
        self.attendees.iter().map(|a| a.email.clone()).collect()
    }

    /// Add attendees not already present (emails compared case-insensitively)
    pub fn merge_attendees(&mut self, emails: &[String]) {
        for email in emails {
            let present = self
                .attendees
                .iter()
                .any(|a| a.email.eq_ignore_ascii_case(email));
            if !present {
                self.attendees.push(Attendee::new(email.clone()));
            }
        }
    }

    fn extra_value(&self, key: &str) -> Value {
        self.extra.get(key).cloned().unwrap_or(Value::Null)
    }
}

/// Events list response
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EventList {
    #[serde(default)]
    pub items: Vec<Event>,
}

/// Event listing parameters
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub time_min: String,
    pub time_max: Option<String>,
    pub max_results: u32,
    pub query: Option<String>,
}

/// Free/busy query body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeBusyRequest {
    pub time_min: String,
    pub time_max: String,
    pub items: Vec<FreeBusyItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FreeBusyItem {
    pub id: String,
}

/// Free/busy query response
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FreeBusyResponse {
    #[serde(default)]
    pub calendars: BTreeMap<String, FreeBusyCalendar>,
}

/// Busy periods of one calendar
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FreeBusyCalendar {
    #[serde(default)]
    pub busy: Vec<TimePeriod>,

    #[serde(default)]
    pub errors: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TimePeriod {
    pub start: String,
    pub end: String,
}

// ==================== Tool Results ====================

/// Calendar as shown to the agent
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSummary {
    pub id: String,
    pub summary: String,
    pub primary: bool,
    pub access_role: String,
}

impl From<CalendarListEntry> for CalendarSummary {
    fn from(entry: CalendarListEntry) -> Self {
        Self {
            id: entry.id,
            summary: entry.summary,
            primary: entry.primary,
            access_role: entry.access_role,
        }
    }
}

/// One event in a listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: String,
    pub summary: String,
    pub start: String,
    pub end: String,
    pub location: String,
    pub description: String,
    pub attendees: Vec<String>,
    pub html_link: String,
}

impl From<Event> for EventSummary {
    fn from(event: Event) -> Self {
        Self {
            start: event.start.as_ref().map(EventTime::display).unwrap_or_default(),
            end: event.end.as_ref().map(EventTime::display).unwrap_or_default(),
            attendees: event.attendee_emails(),
            summary: event.summary.unwrap_or_else(|| "(No title)".to_string()),
            location: event.location.unwrap_or_default(),
            description: event.description.unwrap_or_default(),
            html_link: event.html_link.unwrap_or_default(),
            id: event.id,
        }
    }
}

/// Full event details
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    pub id: String,
    pub summary: String,
    pub start: EventTime,
    pub end: EventTime,
    pub location: String,
    pub description: String,
    pub attendees: Vec<Attendee>,
    pub organizer: Value,
    pub status: String,
    pub html_link: String,
    pub conference_data: Value,
    pub recurrence: Value,
}

impl From<Event> for EventDetail {
    fn from(event: Event) -> Self {
        Self {
            organizer: event.extra_value("organizer"),
            status: event
                .extra
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            conference_data: event.extra_value("conferenceData"),
            recurrence: event.extra_value("recurrence"),
            id: event.id,
            summary: event.summary.unwrap_or_default(),
            start: event.start.unwrap_or_default(),
            end: event.end.unwrap_or_default(),
            location: event.location.unwrap_or_default(),
            description: event.description.unwrap_or_default(),
            attendees: event.attendees,
            html_link: event.html_link.unwrap_or_default(),
        }
    }
}

/// Event after a create, quick-add or update
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWritten {
    pub id: String,
    pub summary: String,
    pub html_link: String,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<String>>,
}

impl EventWritten {
    pub fn new(event: Event, with_attendees: bool) -> Self {
        Self {
            attendees: with_attendees.then(|| event.attendee_emails()),
            id: event.id,
            summary: event.summary.unwrap_or_default(),
            html_link: event.html_link.unwrap_or_default(),
            start: event.start.unwrap_or_default(),
            end: event.end.unwrap_or_default(),
        }
    }
}

/// Deletion acknowledgement
#[derive(Debug, Clone, Serialize)]
pub struct EventDeleted {
    pub deleted: bool,
    pub event_id: String,
}
