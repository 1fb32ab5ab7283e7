//! Value objects accepted and produced by the calendar operations.

use calgate_core::parse_timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ValidationError, ValidationResult};

/// One calendar to include in a free/busy query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarItem {
    /// Calendar identifier, usually an email address.
    pub id: String,
}

impl CalendarItem {
    /// Creates a calendar item.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A free/busy query over one or more calendars.
///
/// Time bounds are kept as the caller sent them; absent bounds are filled in
/// by the operation at call time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeBusyQuery {
    /// Calendars to query. Never empty.
    pub items: Vec<CalendarItem>,
    /// Lower bound (RFC 3339), if supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_min: Option<String>,
    /// Upper bound (RFC 3339), if supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_max: Option<String>,
}

impl FreeBusyQuery {
    /// Validates a JSON request body into a query.
    ///
    /// `items` must be a non-empty array of `{ "id": string }` objects.
    /// `timeMin` / `timeMax` are optional; `null` and `""` count as absent.
    pub fn from_value(body: &Value) -> ValidationResult<Self> {
        let empty = Map::new();
        let body = body.as_object().unwrap_or(&empty);

        let items = body
            .get("items")
            .and_then(Value::as_array)
            .filter(|items| !items.is_empty())
            .ok_or(ValidationError::InvalidItems)?
            .iter()
            .map(|item| {
                item.get("id")
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .map(CalendarItem::new)
                    .ok_or(ValidationError::InvalidItems)
            })
            .collect::<ValidationResult<Vec<_>>>()?;

        Ok(Self {
            items,
            time_min: optional_timestamp(body, "timeMin")?,
            time_max: optional_timestamp(body, "timeMax")?,
        })
    }
}

/// An attendee to invite to a new event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    /// Attendee email address.
    pub email: String,
    /// Display name shown in the invitation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Whether attendance is optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
    /// Any other attendee fields (`comment`, `responseStatus`, ...),
    /// forwarded to the provider untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Attendee {
    /// Creates an attendee with only an email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: None,
            optional: None,
            extra: Map::new(),
        }
    }
}

/// A validated request to create an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Event title.
    pub summary: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Start, RFC 3339 with offset, forwarded as sent.
    pub start: String,
    /// End, RFC 3339 with offset, forwarded as sent.
    pub end: String,
    /// People to invite.
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

impl EventDraft {
    /// Validates a JSON request body into a draft.
    pub fn from_value(body: &Value) -> ValidationResult<Self> {
        let empty = Map::new();
        let body = body.as_object().unwrap_or(&empty);

        let (Some(summary), Some(start), Some(end)) = (
            required_string(body, "summary"),
            required_string(body, "start"),
            required_string(body, "end"),
        ) else {
            return Err(ValidationError::MissingEventFields);
        };

        for (field, value) in [("start", start), ("end", end)] {
            parse_timestamp(value)
                .map_err(|_| ValidationError::invalid_timestamp(field, value))?;
        }

        let description = match body.get("description") {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(_) => return Err(ValidationError::InvalidField { field: "description" }),
        };

        let attendees = match body.get("attendees") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(list)) => list
                .iter()
                .map(|entry| {
                    serde_json::from_value::<Attendee>(entry.clone())
                        .map_err(|_| ValidationError::InvalidAttendees)
                })
                .collect::<ValidationResult<Vec<_>>>()?,
            Some(_) => return Err(ValidationError::InvalidAttendees),
        };

        Ok(Self {
            summary: summary.to_string(),
            description,
            start: start.to_string(),
            end: end.to_string(),
            attendees,
        })
    }
}

fn required_string<'a>(body: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
}

fn optional_timestamp(
    body: &Map<String, Value>,
    field: &'static str,
) -> ValidationResult<Option<String>> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) if value.is_empty() => Ok(None),
        Some(Value::String(value)) => parse_timestamp(value)
            .map(|_| Some(value.clone()))
            .map_err(|_| ValidationError::invalid_timestamp(field, value.as_str())),
        Some(other) => Err(ValidationError::invalid_timestamp(field, other.to_string())),
    }
}

/// The result of an operation, independent of any transport.
///
/// Bindings render it: HTTP status plus `Location` for redirects, a plain
/// text body, or a JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    /// Send the caller elsewhere (302).
    Redirect { location: String },
    /// Plain text body with a status code.
    Text { status: u16, body: String },
    /// JSON body with a status code.
    Json { status: u16, body: Value },
}

impl Outcome {
    /// A redirect to `location`.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            location: location.into(),
        }
    }

    /// A text body with the given status.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::Text {
            status,
            body: body.into(),
        }
    }

    /// A JSON body with the given status.
    pub fn json(status: u16, body: Value) -> Self {
        Self::Json { status, body }
    }

    /// Returns the status code a transport should send.
    pub fn status(&self) -> u16 {
        match self {
            Self::Redirect { .. } => 302,
            Self::Text { status, .. } | Self::Json { status, .. } => *status,
        }
    }

    /// Returns true for 2xx and redirect outcomes.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status())
    }
}
