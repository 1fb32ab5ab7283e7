//! Google Calendar API client.
//!
//! Two calls are supported: a free/busy query across several calendars and
//! event insertion on the primary calendar. Credentials are not held by the
//! client; callers attach a [`TokenSet`] per call with
//! [`GoogleCalendarClient::authorized`].

use calgate_protocol::{Attendee, CalendarItem, EventDraft};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

use super::config::GoogleConfig;
use super::tokens::TokenSet;

/// Calendar the service writes events to.
const PRIMARY_CALENDAR: &str = "primary";

/// Email reminder lead time in minutes (one day).
const EMAIL_REMINDER_MINUTES: u32 = 24 * 60;
/// Popup reminder lead time in minutes.
const POPUP_REMINDER_MINUTES: u32 = 10;

/// Google Calendar API client.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    api_base: String,
}

impl GoogleCalendarClient {
    /// Creates a new Google Calendar client.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| {
                ProviderError::configuration("failed to create HTTP client").with_source(e)
            })?;

        Ok(Self {
            http_client,
            api_base: config.api_base.clone(),
        })
    }

    /// Attaches a token set, returning a handle that can make API calls.
    pub fn authorized<'a>(&'a self, tokens: &'a TokenSet) -> AuthorizedCalendar<'a> {
        AuthorizedCalendar {
            client: self,
            access_token: &tokens.access_token,
        }
    }
}

/// A calendar client with a bearer token attached.
pub struct AuthorizedCalendar<'a> {
    client: &'a GoogleCalendarClient,
    access_token: &'a str,
}

impl AuthorizedCalendar<'_> {
    /// Queries free/busy information for `items` between the given bounds.
    ///
    /// Returns the response's `calendars` object unchanged: calendar id to
    /// `{ "busy": [...], "errors": [...] }`.
    #[tracing::instrument(skip(self, items), fields(calendars = items.len()))]
    pub async fn free_busy(
        &self,
        time_min: &str,
        time_max: &str,
        items: &[CalendarItem],
    ) -> ProviderResult<Value> {
        let url = format!("{}/freeBusy", self.client.api_base);
        let request = FreeBusyRequest {
            time_min,
            time_max,
            items,
        };

        let response: FreeBusyResponse = self.post_json(&url, &[], &request).await?;
        response.calendars.ok_or_else(|| {
            ProviderError::invalid_response("free/busy response has no calendars")
                .with_provider("calendar")
        })
    }

    /// Inserts `event` into the primary calendar and notifies attendees.
    ///
    /// Returns the created event as Google represents it.
    #[tracing::instrument(skip_all, fields(summary = %event.summary))]
    pub async fn insert_event(&self, event: &EventResource) -> ProviderResult<Value> {
        let url = format!(
            "{}/calendars/{}/events",
            self.client.api_base,
            urlencoding::encode(PRIMARY_CALENDAR)
        );

        let created: Value = self
            .post_json(&url, &[("sendUpdates", "all")], event)
            .await?;

        let link = created.get("htmlLink").and_then(Value::as_str).unwrap_or("");
        info!(html_link = %link, "event created");
        Ok(created)
    }

    async fn post_json<B, R>(&self, url: &str, query: &[(&str, &str)], body: &B) -> ProviderResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!(url = %url, "calling calendar API");

        let response = self
            .client
            .http_client
            .post(url)
            .bearer_auth(self.access_token)
            .query(query)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(e).with_provider("calendar"))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            ProviderError::network("failed to read response")
                .with_source(e)
                .with_provider("calendar")
        })?;

        if !status.is_success() {
            return Err(ProviderError::from_status(status, &text).with_provider("calendar"));
        }

        serde_json::from_str(&text).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
                .with_provider("calendar")
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FreeBusyRequest<'a> {
    time_min: &'a str,
    time_max: &'a str,
    items: &'a [CalendarItem],
}

#[derive(Debug, serde::Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: Option<Value>,
}

/// Event body sent to `events.insert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResource {
    /// Event title.
    pub summary: String,
    /// Description, omitted when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Start time.
    pub start: EventDateTime,
    /// End time.
    pub end: EventDateTime,
    /// Invitees.
    pub attendees: Vec<Attendee>,
    /// Reminder policy.
    pub reminders: Reminders,
}

/// A timestamp paired with the timezone Google should display it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    /// RFC 3339 timestamp with offset.
    pub date_time: String,
    /// IANA timezone name.
    pub time_zone: String,
}

/// Reminder settings for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    /// Whether the calendar's default reminders apply.
    pub use_default: bool,
    /// Explicit reminders.
    pub overrides: Vec<ReminderOverride>,
}

impl Reminders {
    /// Email a day before, popup ten minutes before, no calendar defaults.
    pub fn standard() -> Self {
        Self {
            use_default: false,
            overrides: vec![
                ReminderOverride {
                    method: "email".to_string(),
                    minutes: EMAIL_REMINDER_MINUTES,
                },
                ReminderOverride {
                    method: "popup".to_string(),
                    minutes: POPUP_REMINDER_MINUTES,
                },
            ],
        }
    }
}

/// A single reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderOverride {
    /// `email` or `popup`.
    pub method: String,
    /// Minutes before the event start.
    pub minutes: u32,
}

impl EventResource {
    /// Builds the provider body for a validated draft.
    pub fn from_draft(draft: &EventDraft, time_zone: &str) -> Self {
        let at = |date_time: &str| EventDateTime {
            date_time: date_time.to_string(),
            time_zone: time_zone.to_string(),
        };

        Self {
            summary: draft.summary.clone(),
            description: draft.description.clone(),
            start: at(&draft.start),
            end: at(&draft.end),
            attendees: draft.attendees.clone(),
            reminders: Reminders::standard(),
        }
    }
}
