//! Route-style HTTP binding.
//!
//! | Method | Path                    | Operation               |
//! |--------|-------------------------|-------------------------|
//! | GET    | `/`                     | welcome text            |
//! | GET    | `/auth/google`          | begin authorization     |
//! | GET    | `/auth/google/callback` | complete authorization  |
//! | POST   | `/calendar/freebusy`    | free/busy query         |
//! | POST   | `/calendar/events`      | event creation          |

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use calgate_protocol::Outcome;
use serde::Deserialize;
use serde_json::Value;

use crate::service::{AppState, WELCOME_MESSAGE};

/// Builds the route-style router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/auth/google", get(begin_authorization))
        .route("/auth/google/callback", get(complete_authorization))
        .route("/calendar/freebusy", post(free_busy))
        .route("/calendar/events", post(create_event))
        .with_state(state)
}

/// Renders an [`Outcome`] as an HTTP response.
pub fn render(outcome: Outcome) -> Response {
    match outcome {
        Outcome::Redirect { location } => {
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
        Outcome::Text { status, body } => (status_code(status), body).into_response(),
        Outcome::Json { status, body } => {
            (status_code(status), axum::Json(body)).into_response()
        }
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Parses a request body as JSON. Empty or malformed bodies become `null`
/// and fail validation later instead of being rejected here.
pub(crate) fn lenient_json(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
}

async fn welcome() -> &'static str {
    WELCOME_MESSAGE
}

async fn begin_authorization(State(state): State<AppState>) -> Response {
    render(state.begin_authorization())
}

async fn complete_authorization(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    render(state.complete_authorization(params.code.as_deref()).await)
}

async fn free_busy(State(state): State<AppState>, body: Bytes) -> Response {
    render(state.free_busy(&lenient_json(&body)).await)
}

async fn create_event(State(state): State<AppState>, body: Bytes) -> Response {
    render(state.create_event(&lenient_json(&body)).await)
}

/// Fallback for unmatched paths.
pub(crate) async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Body::from("Not found")).into_response()
}
