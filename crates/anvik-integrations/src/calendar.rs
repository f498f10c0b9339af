//! Google Calendar adapter.

use std::sync::Arc;

use anvik_core::datetime::{format_for_reply, parse_event_datetime, parse_timezone};
use anvik_models::ChatId;
use anvik_persistence::UserStore;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde_json::{json, Map, Value};
use tracing::{error, info};

use crate::error::{json_or_error, IntegrationError, Result};
use crate::google::GoogleOAuth;

/// Calendar v3 API root.
pub const CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Events listed when no limit is given.
pub const DEFAULT_EVENT_LIMIT: u32 = 5;

/// The two Calendar v3 calls the adapter needs.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Inserts into the primary calendar; returns the created event.
    async fn insert_event(&self, access_token: &str, event: &Value) -> Result<Value>;

    /// Upcoming single events from `time_min`, ordered by start time.
    async fn list_events(
        &self,
        access_token: &str,
        time_min: DateTime<Utc>,
        max_results: u32,
    ) -> Result<Vec<Value>>;
}

/// [`CalendarApi`] over HTTPS.
pub struct HttpCalendarApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCalendarApi {
    pub fn new() -> Self {
        Self::with_base_url(CALENDAR_API_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for HttpCalendarApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CalendarApi for HttpCalendarApi {
    async fn insert_event(&self, access_token: &str, event: &Value) -> Result<Value> {
        let url = format!("{}/calendars/primary/events", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await?;
        json_or_error("Google Calendar", response).await
    }

    async fn list_events(
        &self,
        access_token: &str,
        time_min: DateTime<Utc>,
        max_results: u32,
    ) -> Result<Vec<Value>> {
        let url = format!("{}/calendars/primary/events", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", time_min.to_rfc3339()),
                ("maxResults", max_results.to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await?;
        let json = json_or_error("Google Calendar", response).await?;
        Ok(json["items"].as_array().cloned().unwrap_or_default())
    }
}

/// A resolved event ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPlan {
    pub title: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub all_day: bool,
    pub body: Value,
}

/// Resolves event details into a Calendar v3 body.
///
/// A missing, unparseable or non-increasing end becomes start + 1 hour.
/// Birthdays become all-day events spanning one date.
pub fn plan_event(details: &Map<String, Value>, tz: Tz, now: DateTime<Utc>) -> Result<EventPlan> {
    let text = |key: &str| {
        details
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let title = text("title").unwrap_or("Untitled Event").to_string();
    let start_raw = text("start")
        .or_else(|| text("date"))
        .ok_or_else(|| IntegrationError::InvalidInput("missing start".to_string()))?;
    let start = parse_event_datetime(start_raw, tz, now)
        .ok_or_else(|| IntegrationError::InvalidInput(format!("unrecognised start '{}'", start_raw)))?
        .at;

    let end = text("end")
        .and_then(|raw| parse_event_datetime(raw, tz, now))
        .map(|p| p.at)
        .filter(|end| *end > start)
        .unwrap_or_else(|| start + Duration::hours(1));

    let all_day = title.to_lowercase().contains("birthday");

    let mut body = json!({ "summary": title });
    if let Some(description) = text("description") {
        body["description"] = json!(description);
    }
    if all_day {
        let day = start.date_naive();
        let next = day.succ_opt().unwrap_or(day);
        body["start"] = json!({ "date": day.format("%Y-%m-%d").to_string() });
        body["end"] = json!({ "date": next.format("%Y-%m-%d").to_string() });
        body["recurrence"] = json!(["RRULE:FREQ=YEARLY"]);
    } else {
        body["start"] = json!({ "dateTime": start.to_rfc3339(), "timeZone": tz.name() });
        body["end"] = json!({ "dateTime": end.to_rfc3339(), "timeZone": tz.name() });
    }

    Ok(EventPlan {
        title,
        start,
        end,
        all_day,
        body,
    })
}

fn event_time(value: &Value) -> &str {
    value["dateTime"]
        .as_str()
        .or_else(|| value["date"].as_str())
        .unwrap_or("?")
}

/// Numbered list of events for a chat reply.
pub fn format_events(events: &[Value]) -> String {
    if events.is_empty() {
        return "📭 No upcoming events found.".to_string();
    }
    let mut out = String::from("📅 *Your Upcoming Events:*\n\n");
    for (i, event) in events.iter().enumerate() {
        let summary = event["summary"].as_str().unwrap_or("Untitled Event");
        out.push_str(&format!(
            "{}. 🕒 *{}*\n   📆 {} → {}\n\n",
            i + 1,
            summary,
            event_time(&event["start"]),
            event_time(&event["end"]),
        ));
    }
    out.trim_end().to_string()
}

/// Creates and lists events for a chat.
pub struct CalendarAdapter {
    users: Arc<UserStore>,
    oauth: Arc<GoogleOAuth>,
    api: Arc<dyn CalendarApi>,
}

impl CalendarAdapter {
    pub fn new(users: Arc<UserStore>, oauth: Arc<GoogleOAuth>, api: Arc<dyn CalendarApi>) -> Self {
        Self { users, oauth, api }
    }

    /// Reply asking the user to link Google.
    pub fn connect_instruction(&self, chat_id: &ChatId) -> String {
        match self.oauth.auth_url(chat_id) {
            Ok(url) => format!("🔗 Please connect Google Calendar first: {}", url),
            Err(_) => "⚠️ Google Calendar is not configured on this server.".to_string(),
        }
    }

    async fn token_for(&self, chat_id: &ChatId) -> Result<(String, Tz)> {
        let user = self
            .users
            .get(chat_id)
            .await
            .ok_or(IntegrationError::NotConnected("Google"))?;
        let token = self.oauth.access_token(&user).await?;
        Ok((token, parse_timezone(&user.prefs.timezone)))
    }

    /// Inserts an event described by `details`.
    pub async fn create_event(&self, details: &Map<String, Value>, chat_id: &ChatId) -> String {
        let (token, tz) = match self.token_for(chat_id).await {
            Ok(v) => v,
            Err(IntegrationError::NotConnected(_)) => return self.connect_instruction(chat_id),
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "Google token lookup failed");
                return format!("❌ Failed to create event: {}", e);
            }
        };

        let plan = match plan_event(details, tz, Utc::now()) {
            Ok(plan) => plan,
            Err(_) => {
                return "⚠️ Please tell me when the event starts, e.g. `25 Dec 2025 5 PM`."
                    .to_string()
            }
        };

        match self.api.insert_event(&token, &plan.body).await {
            Ok(created) => {
                info!(chat_id = %chat_id, title = %plan.title, "Calendar event created");
                let when = if plan.all_day {
                    plan.start.format("%d %b %Y").to_string()
                } else {
                    format_for_reply(&plan.start)
                };
                let mut reply = format!("📅 Event *{}* added to your Google Calendar for {}.", plan.title, when);
                if let Some(link) = created["htmlLink"].as_str() {
                    reply.push_str(&format!("\n{}", link));
                }
                reply
            }
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "Calendar insert failed");
                format!("❌ Failed to create event: {}", e)
            }
        }
    }

    /// Lists the next `limit` events.
    pub async fn list_events(&self, chat_id: &ChatId, limit: u32) -> String {
        let (token, _) = match self.token_for(chat_id).await {
            Ok(v) => v,
            Err(IntegrationError::NotConnected(_)) => return self.connect_instruction(chat_id),
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "Google token lookup failed");
                return format!("❌ Failed to fetch events: {}", e);
            }
        };

        match self.api.list_events(&token, Utc::now(), limit).await {
            Ok(events) => format_events(&events),
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "Calendar list failed");
                format!("❌ Failed to fetch events: {}", e)
            }
        }
    }
}
