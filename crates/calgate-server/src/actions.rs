//! Action-style binding.
//!
//! Every action is reachable at `/service/{action}`, either as `GET` with
//! query parameters or as `POST` with a JSON object of parameters. Query
//! values that look like JSON arrays or objects (`items=[{"id":"a"}]`) are
//! decoded so structured parameters work over `GET` too.

use std::collections::HashMap;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::get;
use calgate_protocol::{Action, Outcome};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Operation, ServiceError};
use crate::http::{lenient_json, render};
use crate::service::AppState;

/// Liveness answer for `say`.
pub const SAY_RESPONSE: &str = "hello";

/// Dispatches parsed actions onto the shared operations.
#[derive(Debug, Clone)]
pub struct ActionHandler {
    state: AppState,
}

impl ActionHandler {
    /// Creates a handler over the shared state.
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Runs `action` and returns its outcome.
    #[tracing::instrument(skip_all, fields(action = action.name()))]
    pub async fn handle(&self, action: &Action) -> Outcome {
        debug!(requires_auth = action.requires_auth(), "dispatching action");
        match action {
            Action::Say => Outcome::text(200, SAY_RESPONSE),
            Action::AuthGoogle => self.state.begin_authorization(),
            Action::AuthGoogleCallback { code } => {
                self.state.complete_authorization(code.as_deref()).await
            }
            Action::CheckFreeBusy { params } => self.state.free_busy(params).await,
            Action::CreateEvent { params } => self.state.create_event(params).await,
        }
    }

    /// Parses `name` with `params` and runs it. Unknown names answer 404.
    pub async fn dispatch(&self, name: &str, params: Value) -> Outcome {
        match Action::parse(name, params) {
            Ok(action) => self.handle(&action).await,
            Err(e) => {
                let err = ServiceError::from(e);
                err.log(Operation::Dispatch);
                err.to_outcome()
            }
        }
    }
}

/// Builds the action router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/service/{action}", get(invoke_get).post(invoke_post))
        .with_state(ActionHandler::new(state))
}

/// Turns query parameters into a parameter object.
fn query_params(query: HashMap<String, String>) -> Value {
    let params: Map<String, Value> = query
        .into_iter()
        .map(|(key, raw)| {
            let value = if raw.starts_with('[') || raw.starts_with('{') {
                serde_json::from_str(&raw).unwrap_or(Value::String(raw))
            } else {
                Value::String(raw)
            };
            (key, value)
        })
        .collect();
    Value::Object(params)
}

async fn invoke_get(
    State(handler): State<ActionHandler>,
    Path(action): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    render(handler.dispatch(&action, query_params(query)).await)
}

async fn invoke_post(
    State(handler): State<ActionHandler>,
    Path(action): Path<String>,
    body: Bytes,
) -> Response {
    render(handler.dispatch(&action, lenient_json(&body)).await)
}
