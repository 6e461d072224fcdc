//! Google Calendar API client

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;

use crate::config::google::CALENDAR_API_BASE_URL;
use crate::error::Result;
use crate::gcal::types::*;
use crate::http::ApiClient;

/// Calendar operations used by the tools
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn list_calendars(&self) -> Result<Vec<CalendarListEntry>>;

    /// Expanded single events ordered by start time
    async fn list_events(&self, calendar_id: &str, query: &EventQuery) -> Result<Vec<Event>>;

    async fn get_event(&self, calendar_id: &str, event_id: &str) -> Result<Event>;

    async fn insert_event(&self, calendar_id: &str, event: &Event) -> Result<Event>;

    /// Full replacement (PUT) of an event
    async fn update_event(&self, calendar_id: &str, event_id: &str, event: &Event) -> Result<Event>;

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<()>;

    async fn quick_add(&self, calendar_id: &str, text: &str) -> Result<Event>;

    async fn freebusy(&self, request: &FreeBusyRequest) -> Result<FreeBusyResponse>;
}

/// Calendar API client
pub struct CalendarClient {
    api: Arc<ApiClient>,
    base_url: String,
}

impl CalendarClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            base_url: CALENDAR_API_BASE_URL.to_string(),
        }
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!(
            "{}/{}",
            self.events_url(calendar_id),
            urlencoding::encode(event_id)
        )
    }
}

#[async_trait]
impl CalendarApi for CalendarClient {
    async fn list_calendars(&self) -> Result<Vec<CalendarListEntry>> {
        let url = format!("{}/users/me/calendarList", self.base_url);
        let list: CalendarList = self.api.get_json(&url, &[], "calendar list").await?;
        Ok(list.items)
    }

    async fn list_events(&self, calendar_id: &str, query: &EventQuery) -> Result<Vec<Event>> {
        let mut params = vec![
            ("timeMin", query.time_min.clone()),
            ("maxResults", query.max_results.to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        if let Some(time_max) = &query.time_max {
            params.push(("timeMax", time_max.clone()));
        }
        if let Some(q) = query.query.as_ref().filter(|q| !q.is_empty()) {
            params.push(("q", q.clone()));
        }

        let list: EventList = self
            .api
            .get_json(
                &self.events_url(calendar_id),
                &params,
                &format!("calendar {}", calendar_id),
            )
            .await?;
        Ok(list.items)
    }

    async fn get_event(&self, calendar_id: &str, event_id: &str) -> Result<Event> {
        self.api
            .get_json(
                &self.event_url(calendar_id, event_id),
                &[],
                &format!("event {}", event_id),
            )
            .await
    }

    async fn insert_event(&self, calendar_id: &str, event: &Event) -> Result<Event> {
        self.api
            .send_json(
                Method::POST,
                &self.events_url(calendar_id),
                &[],
                event,
                &format!("calendar {}", calendar_id),
            )
            .await
    }

    async fn update_event(&self, calendar_id: &str, event_id: &str, event: &Event) -> Result<Event> {
        self.api
            .send_json(
                Method::PUT,
                &self.event_url(calendar_id, event_id),
                &[],
                event,
                &format!("event {}", event_id),
            )
            .await
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<()> {
        self.api
            .delete(
                &self.event_url(calendar_id, event_id),
                &format!("event {}", event_id),
            )
            .await
    }

    async fn quick_add(&self, calendar_id: &str, text: &str) -> Result<Event> {
        let url = format!("{}/quickAdd", self.events_url(calendar_id));
        self.api
            .post_empty(
                &url,
                &[("text", text.to_string())],
                &format!("calendar {}", calendar_id),
            )
            .await
    }

    async fn freebusy(&self, request: &FreeBusyRequest) -> Result<FreeBusyResponse> {
        let url = format!("{}/freeBusy", self.base_url);
        self.api
            .send_json(Method::POST, &url, &[], request, "freebusy")
            .await
    }
}
