//! Google Calendar tools

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AdapterError, McpError, Result};
use crate::gcal::client::CalendarApi;
use crate::gcal::types::*;
use crate::mcp::registry::{page_size, parse_args, FieldType, ToolDescriptor, ToolRegistry};
use crate::mcp::ToolHandler;

const PRIMARY_CALENDAR: &str = "primary";
const DEFAULT_MAX_EVENTS: i64 = 10;
const MAX_EVENTS_LIMIT: i64 = 2500;

/// The Calendar tool set
pub struct CalendarTools {
    api: Arc<dyn CalendarApi>,
    default_timezone: String,
    registry: ToolRegistry,
}

impl CalendarTools {
    pub fn new(api: Arc<dyn CalendarApi>, default_timezone: impl Into<String>) -> Self {
        Self {
            api,
            default_timezone: default_timezone.into(),
            registry: registry(),
        }
    }

    async fn handle_list_calendars(&self) -> Result<Value> {
        let calendars: Vec<CalendarSummary> = self
            .api
            .list_calendars()
            .await?
            .into_iter()
            .map(CalendarSummary::from)
            .collect();
        Ok(serde_json::to_value(calendars)?)
    }

    async fn handle_list_events(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            calendar_id: Option<String>,
            time_min: Option<String>,
            time_max: Option<String>,
            max_results: Option<i64>,
            query: Option<String>,
        }

        let args: Args = parse_args(tool, args)?;
        let query = EventQuery {
            time_min: args
                .time_min
                .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
            time_max: args.time_max,
            max_results: page_size(
                tool,
                "max_results",
                args.max_results,
                DEFAULT_MAX_EVENTS,
                MAX_EVENTS_LIMIT,
            )?,
            query: args.query,
        };
        let calendar_id = args.calendar_id.as_deref().unwrap_or(PRIMARY_CALENDAR);

        let events: Vec<EventSummary> = self
            .api
            .list_events(calendar_id, &query)
            .await?
            .into_iter()
            .map(EventSummary::from)
            .collect();
        Ok(serde_json::to_value(events)?)
    }

    async fn handle_get_event(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            event_id: String,
            calendar_id: Option<String>,
        }

        let args: Args = parse_args(tool, args)?;
        let calendar_id = args.calendar_id.as_deref().unwrap_or(PRIMARY_CALENDAR);
        let event = self.api.get_event(calendar_id, &args.event_id).await?;
        Ok(serde_json::to_value(EventDetail::from(event))?)
    }

    async fn handle_create_event(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            summary: String,
            start_time: String,
            end_time: String,
            calendar_id: Option<String>,
            description: Option<String>,
            location: Option<String>,
            attendees: Option<Vec<String>>,
            timezone: Option<String>,
        }

        let args: Args = parse_args(tool, args)?;
        let timezone = args.timezone.as_deref().unwrap_or(&self.default_timezone);

        let event = Event {
            summary: Some(args.summary),
            start: Some(EventTime::from_input(&args.start_time, timezone)),
            end: Some(EventTime::from_input(&args.end_time, timezone)),
            description: args.description.filter(|d| !d.is_empty()),
            location: args.location.filter(|l| !l.is_empty()),
            attendees: args
                .attendees
                .unwrap_or_default()
                .into_iter()
                .map(Attendee::new)
                .collect(),
            ..Default::default()
        };

        let calendar_id = args.calendar_id.as_deref().unwrap_or(PRIMARY_CALENDAR);
        let created = self.api.insert_event(calendar_id, &event).await?;
        tracing::info!(event_id = %created.id, "Event created");
        Ok(serde_json::to_value(EventWritten::new(created, false))?)
    }

    async fn handle_update_event(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            event_id: String,
            calendar_id: Option<String>,
            summary: Option<String>,
            start_time: Option<String>,
            end_time: Option<String>,
            description: Option<String>,
            location: Option<String>,
            timezone: Option<String>,
            attendees: Option<Vec<String>>,
            add_attendees: Option<Vec<String>>,
        }

        let args: Args = parse_args(tool, args)?;
        let calendar_id = args.calendar_id.as_deref().unwrap_or(PRIMARY_CALENDAR);
        let timezone = args.timezone.as_deref().unwrap_or(&self.default_timezone);

        let mut event = self.api.get_event(calendar_id, &args.event_id).await?;

        if let Some(summary) = args.summary {
            event.summary = Some(summary);
        }
        if let Some(description) = args.description {
            event.description = Some(description);
        }
        if let Some(location) = args.location {
            event.location = Some(location);
        }
        if let Some(start) = &args.start_time {
            event.start = Some(EventTime::from_input(start, timezone));
        }
        if let Some(end) = &args.end_time {
            event.end = Some(EventTime::from_input(end, timezone));
        }
        if let Some(attendees) = args.attendees {
            event.attendees = attendees.into_iter().map(Attendee::new).collect();
        }
        if let Some(add) = &args.add_attendees {
            event.merge_attendees(add);
        }

        let updated = self
            .api
            .update_event(calendar_id, &args.event_id, &event)
            .await?;
        Ok(serde_json::to_value(EventWritten::new(updated, true))?)
    }

    async fn handle_delete_event(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            event_id: String,
            calendar_id: Option<String>,
        }

        let args: Args = parse_args(tool, args)?;
        let calendar_id = args.calendar_id.as_deref().unwrap_or(PRIMARY_CALENDAR);
        self.api.delete_event(calendar_id, &args.event_id).await?;
        Ok(serde_json::to_value(EventDeleted {
            deleted: true,
            event_id: args.event_id,
        })?)
    }

    async fn handle_quick_add(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            text: String,
            calendar_id: Option<String>,
        }

        let args: Args = parse_args(tool, args)?;
        let calendar_id = args.calendar_id.as_deref().unwrap_or(PRIMARY_CALENDAR);
        let created = self.api.quick_add(calendar_id, &args.text).await?;
        Ok(serde_json::to_value(EventWritten::new(created, false))?)
    }

    async fn handle_freebusy(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            time_min: String,
            time_max: String,
            calendar_ids: Option<Vec<String>>,
        }

        let args: Args = parse_args(tool, args)?;
        let calendar_ids = args
            .calendar_ids
            .filter(|ids| !ids.is_empty())
            .unwrap_or_else(|| vec![PRIMARY_CALENDAR.to_string()]);

        let request = FreeBusyRequest {
            time_min: args.time_min,
            time_max: args.time_max,
            items: calendar_ids
                .into_iter()
                .map(|id| FreeBusyItem { id })
                .collect(),
        };
        let response = self.api.freebusy(&request).await?;
        Ok(serde_json::to_value(response.calendars)?)
    }
}

#[async_trait]
impl ToolHandler for CalendarTools {
    fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    async fn call(&self, tool: &str, args: Value) -> Result<Value> {
        match tool {
            "gcal_list_calendars" => self.handle_list_calendars().await,
            "gcal_list_events" => self.handle_list_events(tool, args).await,
            "gcal_get_event" => self.handle_get_event(tool, args).await,
            "gcal_create_event" => self.handle_create_event(tool, args).await,
            "gcal_update_event" => self.handle_update_event(tool, args).await,
            "gcal_delete_event" => self.handle_delete_event(tool, args).await,
            "gcal_quick_add" => self.handle_quick_add(tool, args).await,
            "gcal_freebusy" => self.handle_freebusy(tool, args).await,
            other => Err(AdapterError::Mcp(McpError::UnknownTool {
                name: other.to_string(),
            })),
        }
    }
}

const RFC3339_HINT: &str =
    "RFC 3339 time with offset (e.g., '2024-01-15T00:00:00-08:00' or '2024-01-15T00:00:00Z')";

fn registry() -> ToolRegistry {
    use FieldType::*;

    ToolRegistry::new(vec![
        ToolDescriptor::new(
            "gcal_list_calendars",
            "List all calendars the user has access to.",
        ),
        ToolDescriptor::new("gcal_list_events", "List upcoming events from a calendar.")
            .optional("calendar_id", String, "Calendar ID (default: 'primary')")
            .optional("time_min", String, "Start of the window, RFC 3339. Default: now.")
            .optional("time_max", String, RFC3339_HINT)
            .optional("max_results", Integer, "Maximum events to return (default: 10)")
            .optional("query", String, "Free text search query"),
        ToolDescriptor::new("gcal_get_event", "Get details of a specific calendar event.")
            .required("event_id", String, "The event ID")
            .optional("calendar_id", String, "Calendar ID (default: 'primary')"),
        ToolDescriptor::new("gcal_create_event", "Create a new calendar event.")
            .required("summary", String, "Event title")
            .required(
                "start_time",
                String,
                "Start time in ISO format (e.g., '2024-01-15T10:00:00'), or a date for all-day events",
            )
            .required("end_time", String, "End time in ISO format, or a date for all-day events")
            .optional("calendar_id", String, "Calendar ID (default: 'primary')")
            .optional("description", String, "Event description")
            .optional("location", String, "Event location")
            .optional("attendees", StringArray, "List of attendee email addresses")
            .optional("timezone", String, "IANA time zone (default: configured zone)"),
        ToolDescriptor::new(
            "gcal_update_event",
            "Update an existing calendar event. Only the given fields change.",
        )
        .required("event_id", String, "The event ID")
        .optional("calendar_id", String, "Calendar ID (default: 'primary')")
        .optional("summary", String, "New event title")
        .optional("start_time", String, "New start time in ISO format")
        .optional("end_time", String, "New end time in ISO format")
        .optional("description", String, "New description")
        .optional("location", String, "New location")
        .optional("timezone", String, "IANA time zone for new start/end times")
        .optional("attendees", StringArray, "Replace all attendees with these emails")
        .optional("add_attendees", StringArray, "Add these attendees, keeping existing ones"),
        ToolDescriptor::new("gcal_delete_event", "Delete a calendar event.")
            .required("event_id", String, "The event ID")
            .optional("calendar_id", String, "Calendar ID (default: 'primary')"),
        ToolDescriptor::new(
            "gcal_quick_add",
            "Create an event from natural language (e.g., 'Lunch with John tomorrow at noon').",
        )
        .required("text", String, "Natural language event description")
        .optional("calendar_id", String, "Calendar ID (default: 'primary')"),
        ToolDescriptor::new("gcal_freebusy", "Get free/busy information for calendars.")
            .required("time_min", String, RFC3339_HINT)
            .required("time_max", String, RFC3339_HINT)
            .optional("calendar_ids", StringArray, "Calendar IDs to check (default: ['primary'])"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Calendar double holding one event and recording what was written
    #[derive(Default)]
    struct FakeCalendar {
        stored: Mutex<Option<Event>>,
        written: Mutex<Vec<Event>>,
        queries: Mutex<Vec<(String, EventQuery)>>,
    }

    #[async_trait]
    impl CalendarApi for FakeCalendar {
        async fn list_calendars(&self) -> Result<Vec<CalendarListEntry>> {
            Ok(vec![])
        }

        async fn list_events(&self, calendar_id: &str, query: &EventQuery) -> Result<Vec<Event>> {
            self.queries
                .lock()
                .unwrap()
                .push((calendar_id.to_string(), query.clone()));
            Ok(vec![])
        }

        async fn get_event(&self, _calendar_id: &str, event_id: &str) -> Result<Event> {
            self.stored
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| AdapterError::not_found(format!("event {}", event_id)))
        }

        async fn insert_event(&self, _calendar_id: &str, event: &Event) -> Result<Event> {
            self.written.lock().unwrap().push(event.clone());
            Ok(Event {
                id: "new".into(),
                ..event.clone()
            })
        }

        async fn update_event(&self, _calendar_id: &str, _event_id: &str, event: &Event) -> Result<Event> {
            self.written.lock().unwrap().push(event.clone());
            Ok(event.clone())
        }

        async fn delete_event(&self, _calendar_id: &str, _event_id: &str) -> Result<()> {
            Ok(())
        }

        async fn quick_add(&self, _calendar_id: &str, text: &str) -> Result<Event> {
            Ok(Event {
                id: "q".into(),
                summary: Some(text.to_string()),
                ..Default::default()
            })
        }

        async fn freebusy(&self, _request: &FreeBusyRequest) -> Result<FreeBusyResponse> {
            Ok(FreeBusyResponse::default())
        }
    }

    fn stored_event() -> Event {
        serde_json::from_value(serde_json::json!({
            "id": "e1",
            "summary": "Planning",
            "attendees": [{"email": "Ann@x.com", "responseStatus": "accepted"}],
            "reminders": {"useDefault": true}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_update_merges_attendees_and_keeps_unknown_fields() {
        let fake = Arc::new(FakeCalendar::default());
        *fake.stored.lock().unwrap() = Some(stored_event());
        let tools = CalendarTools::new(fake.clone(), "UTC");

        let result = tools
            .call(
                "gcal_update_event",
                serde_json::json!({"event_id": "e1", "add_attendees": ["ann@x.com", "bob@x.com"]}),
            )
            .await
            .unwrap();

        assert_eq!(result["attendees"], serde_json::json!(["Ann@x.com", "bob@x.com"]));
        let written = fake.written.lock().unwrap();
        let sent = serde_json::to_value(&written[0]).unwrap();
        assert_eq!(sent["reminders"]["useDefault"], true);
        assert_eq!(sent["attendees"][0]["responseStatus"], "accepted");
        assert_eq!(sent["summary"], "Planning");
    }

    #[tokio::test]
    async fn test_create_uses_default_timezone() {
        let fake = Arc::new(FakeCalendar::default());
        let tools = CalendarTools::new(fake.clone(), "Europe/Paris");

        tools
            .call(
                "gcal_create_event",
                serde_json::json!({
                    "summary": "Dentist",
                    "start_time": "2024-03-01T09:00:00",
                    "end_time": "2024-03-01T10:00:00"
                }),
            )
            .await
            .unwrap();

        let written = fake.written.lock().unwrap();
        let start = written[0].start.clone().unwrap();
        assert_eq!(start.time_zone.as_deref(), Some("Europe/Paris"));
    }

    #[tokio::test]
    async fn test_list_events_defaults() {
        let fake = Arc::new(FakeCalendar::default());
        let tools = CalendarTools::new(fake.clone(), "UTC");

        tools
            .call("gcal_list_events", serde_json::json!({}))
            .await
            .unwrap();

        let queries = fake.queries.lock().unwrap();
        let (calendar_id, query) = &queries[0];
        assert_eq!(calendar_id, "primary");
        assert_eq!(query.max_results, 10);
        assert!(query.time_min.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_update_missing_event_is_not_found() {
        let tools = CalendarTools::new(Arc::new(FakeCalendar::default()), "UTC");
        let err = tools
            .call("gcal_update_event", serde_json::json!({"event_id": "gone"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFoundError);
    }
}
