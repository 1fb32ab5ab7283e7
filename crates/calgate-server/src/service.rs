//! The operations layer shared by both transport bindings.
//!
//! [`AppState`] owns the credential store and both Google clients. Every
//! operation returns an [`Outcome`]; transports only decide how to render it.
//!
//! # Authentication gate
//!
//! Calendar operations first ask [`AuthFlow::authorize`] for the stored token
//! set. No stored set means 401 before the request body is even looked at.
//! An expired set that carries a refresh token is refreshed once before the
//! provider call. The refreshed set is stored only once that call succeeds,
//! so a failed operation never changes the stored credentials.

use std::sync::Arc;

use calgate_core::TimeWindow;
use calgate_protocol::{EventDraft, FreeBusyQuery, Outcome, ValidationError};
use calgate_providers::ProviderResult;
use calgate_providers::google::{
    CredentialStore, EventResource, GoogleCalendarClient, GoogleConfig, OAuthClient, TokenSet,
};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Operation, ServiceError, ServiceResult};

/// Landing page text.
pub const WELCOME_MESSAGE: &str =
    "Welcome to the Google Calendar API service! Visit /auth/google to authenticate.";

/// Body returned after a successful code exchange.
pub const AUTH_SUCCESS_MESSAGE: &str =
    "Authentication successful! You can now use the API endpoints.";

/// OAuth flow plus the credential store it fills.
#[derive(Debug, Clone)]
pub struct AuthFlow {
    oauth: Arc<OAuthClient>,
    store: Arc<dyn CredentialStore>,
}

impl AuthFlow {
    /// Creates the flow over an existing store.
    pub fn new(oauth: OAuthClient, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            oauth: Arc::new(oauth),
            store,
        }
    }

    /// Returns the consent URL.
    pub fn authorization_url(&self) -> String {
        self.oauth.authorization_url()
    }

    /// Exchanges `code` and stores the resulting token set.
    ///
    /// The previous set, if any, is replaced. On failure it is left alone.
    pub async fn complete_authorization(&self, code: Option<&str>) -> ServiceResult<()> {
        let code = code
            .filter(|c| !c.is_empty())
            .ok_or(ValidationError::MissingCode)?;

        let tokens = self
            .oauth
            .exchange_code(code)
            .await
            .map_err(|e| ServiceError::provider(Operation::CompleteAuthorization, e))?;

        self.store.replace(tokens);
        info!("stored new token set");
        Ok(())
    }

    /// The authentication gate: returns the stored token set, if any.
    pub fn authorize(&self) -> ServiceResult<TokenSet> {
        self.store.current().ok_or(ServiceError::Unauthenticated)
    }

    /// Returns usable credentials for a provider call, refreshing `stored`
    /// when it is expired and refreshable. Nothing is stored here.
    async fn ensure_fresh(&self, stored: &TokenSet, operation: Operation) -> ServiceResult<TokenSet> {
        if !stored.is_expired() || !stored.can_refresh() {
            return Ok(stored.clone());
        }

        debug!(operation = %operation, "access token expired, refreshing");
        self.oauth
            .refresh(stored)
            .await
            .map_err(|e| ServiceError::provider(operation, e))
    }

    /// Stores `used` after a successful provider call if it was refreshed
    /// from `stored` and `stored` is still current.
    fn commit_refresh(&self, stored: &TokenSet, used: TokenSet) {
        if used.access_token == stored.access_token {
            return;
        }
        if self.store.replace_if_current(&stored.access_token, used) {
            info!("stored refreshed token set");
        } else {
            debug!("token set changed during refresh, keeping the newer one");
        }
    }

    /// Returns the store backing this flow.
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }
}

/// Calendar operations behind the authentication gate.
#[derive(Debug, Clone)]
pub struct CalendarOps {
    auth: AuthFlow,
    client: GoogleCalendarClient,
    time_zone: String,
}

impl CalendarOps {
    /// Creates the calendar operations.
    pub fn new(auth: AuthFlow, client: GoogleCalendarClient, time_zone: impl Into<String>) -> Self {
        Self {
            auth,
            client,
            time_zone: time_zone.into(),
        }
    }

    /// Queries busy intervals. Returns the `calendars` object unchanged.
    ///
    /// Missing bounds default to the coming week.
    pub async fn free_busy(&self, body: &Value) -> ServiceResult<Value> {
        let stored = self.auth.authorize()?;
        let query = FreeBusyQuery::from_value(body)?;
        let tokens = self.auth.ensure_fresh(&stored, Operation::FreeBusy).await?;

        let window = TimeWindow::upcoming_week(Utc::now());
        let time_min = query.time_min.unwrap_or_else(|| window.start_timestamp());
        let time_max = query.time_max.unwrap_or_else(|| window.end_timestamp());

        let calendars = self
            .client
            .authorized(&tokens)
            .free_busy(&time_min, &time_max, &query.items)
            .await
            .map_err(|e| ServiceError::provider(Operation::FreeBusy, e))?;

        self.auth.commit_refresh(&stored, tokens);
        Ok(calendars)
    }

    /// Creates an event on the primary calendar, notifying attendees.
    pub async fn create_event(&self, body: &Value) -> ServiceResult<Value> {
        let stored = self.auth.authorize()?;
        let draft = EventDraft::from_value(body)?;
        let tokens = self.auth.ensure_fresh(&stored, Operation::CreateEvent).await?;

        let event = EventResource::from_draft(&draft, &self.time_zone);
        let created = self
            .client
            .authorized(&tokens)
            .insert_event(&event)
            .await
            .map_err(|e| ServiceError::provider(Operation::CreateEvent, e))?;

        self.auth.commit_refresh(&stored, tokens);
        Ok(created)
    }
}

/// State shared by both transport bindings.
#[derive(Debug, Clone)]
pub struct AppState {
    /// OAuth flow and credential store.
    pub auth: AuthFlow,
    /// Calendar operations.
    pub calendar: CalendarOps,
}

impl AppState {
    /// Builds the clients from `config` over `store`.
    pub fn new(config: &GoogleConfig, store: Arc<dyn CredentialStore>) -> ProviderResult<Self> {
        let auth = AuthFlow::new(OAuthClient::new(config)?, store);
        let calendar = CalendarOps::new(
            auth.clone(),
            GoogleCalendarClient::new(config)?,
            config.time_zone.clone(),
        );
        Ok(Self { auth, calendar })
    }

    /// Redirects to the consent page.
    pub fn begin_authorization(&self) -> Outcome {
        Outcome::redirect(self.auth.authorization_url())
    }

    /// Finishes the OAuth flow with the callback `code`.
    pub async fn complete_authorization(&self, code: Option<&str>) -> Outcome {
        match self.auth.complete_authorization(code).await {
            Ok(()) => Outcome::text(200, AUTH_SUCCESS_MESSAGE),
            Err(e) => failure(Operation::CompleteAuthorization, e),
        }
    }

    /// Free/busy query; 200 with the calendars object.
    pub async fn free_busy(&self, body: &Value) -> Outcome {
        match self.calendar.free_busy(body).await {
            Ok(calendars) => Outcome::json(200, calendars),
            Err(e) => failure(Operation::FreeBusy, e),
        }
    }

    /// Event creation; 201 with the created event.
    pub async fn create_event(&self, body: &Value) -> Outcome {
        match self.calendar.create_event(body).await {
            Ok(event) => Outcome::json(201, event),
            Err(e) => failure(Operation::CreateEvent, e),
        }
    }
}

fn failure(operation: Operation, err: ServiceError) -> Outcome {
    err.log(operation);
    err.to_outcome()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::UNAUTHENTICATED_MESSAGE;
    use calgate_providers::google::{MemoryCredentialStore, OAuthCredentials};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn test_config(server: &MockServer) -> GoogleConfig {
        GoogleConfig::new(
            OAuthCredentials::new("client-id.apps.googleusercontent.com", "client-secret"),
            "http://localhost:3000/auth/google/callback",
        )
        .with_auth_url(format!("{}/o/oauth2/v2/auth", server.uri()))
        .with_token_url(format!("{}/token", server.uri()))
        .with_api_base(server.uri())
    }

    pub(crate) fn state_with(server: &MockServer, tokens: Option<TokenSet>) -> AppState {
        let store: Arc<dyn CredentialStore> = match tokens {
            Some(tokens) => Arc::new(MemoryCredentialStore::with_tokens(tokens)),
            None => Arc::new(MemoryCredentialStore::new()),
        };
        AppState::new(&test_config(server), store).unwrap()
    }

    fn valid_tokens() -> TokenSet {
        TokenSet::new("access-1", Some("refresh-1".into()), Some(3600))
    }

    fn expired_tokens() -> TokenSet {
        TokenSet::new("stale", Some("refresh-1".into()), Some(0))
    }

    fn freebusy_body() -> Value {
        json!({
            "items": [{ "id": "a@example.com" }],
            "timeMin": "2024-01-01T00:00:00Z",
            "timeMax": "2024-01-02T00:00:00Z"
        })
    }

    fn event_body() -> Value {
        json!({
            "summary": "Sync",
            "start": "2024-01-01T10:00:00-08:00",
            "end": "2024-01-01T11:00:00-08:00",
            "attendees": [{ "email": "x@y.com" }]
        })
    }

    #[tokio::test]
    async fn begin_authorization_redirects_to_consent() {
        let server = MockServer::start().await;
        let state = state_with(&server, None);

        let Outcome::Redirect { location } = state.begin_authorization() else {
            panic!("expected redirect");
        };
        assert!(location.starts_with(&format!("{}/o/oauth2/v2/auth?", server.uri())));
        assert!(location.contains("access_type=offline"));
        assert!(location.contains("response_type=code"));
        assert!(location.contains("calendar.readonly"));
    }

    #[tokio::test]
    async fn callback_without_code_is_rejected() {
        let server = MockServer::start().await;
        let state = state_with(&server, None);

        for code in [None, Some("")] {
            assert_eq!(
                state.complete_authorization(code).await,
                Outcome::text(400, "Authorization code not found.")
            );
        }
        assert!(state.auth.store().current().is_none());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn callback_stores_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("code=4%2Fabc"))
            .and(body_string_contains("grant_type=authorization_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh",
                "refresh_token": "r",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let state = state_with(&server, None);
        let outcome = state.complete_authorization(Some("4/abc")).await;

        assert_eq!(outcome, Outcome::text(200, AUTH_SUCCESS_MESSAGE));
        let stored = state.auth.store().current().unwrap();
        assert_eq!(stored.access_token, "fresh");
        assert_eq!(stored.refresh_token.as_deref(), Some("r"));
        assert!(state.auth.authorize().is_ok());
    }

    #[tokio::test]
    async fn second_login_replaces_first() {
        let server = MockServer::start().await;
        for (code, token) in [("first-code", "first"), ("second-code", "second")] {
            Mock::given(method("POST"))
                .and(path("/token"))
                .and(body_string_contains(format!("code={}", code)))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "access_token": token,
                    "expires_in": 3599
                })))
                .mount(&server)
                .await;
        }
        Mock::given(method("POST"))
            .and(path("/freeBusy"))
            .and(header("authorization", "Bearer second"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "calendars": {} })))
            .expect(1)
            .mount(&server)
            .await;

        let state = state_with(&server, None);
        assert!(state.complete_authorization(Some("first-code")).await.is_success());
        assert!(state.complete_authorization(Some("second-code")).await.is_success());

        assert_eq!(state.auth.store().current().unwrap().access_token, "second");
        assert!(state.free_busy(&freebusy_body()).await.is_success());
    }

    #[tokio::test]
    async fn failed_exchange_keeps_previous_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Bad Request"
            })))
            .mount(&server)
            .await;

        let state = state_with(&server, Some(valid_tokens()));
        let outcome = state.complete_authorization(Some("used-code")).await;

        assert_eq!(outcome, Outcome::text(500, "Error retrieving access token."));
        assert_eq!(state.auth.store().current().unwrap().access_token, "access-1");
    }

    #[tokio::test]
    async fn calendar_operations_require_tokens() {
        let server = MockServer::start().await;
        let state = state_with(&server, None);

        // Invalid bodies still get 401: the gate runs first.
        for body in [freebusy_body(), json!({})] {
            assert_eq!(
                state.free_busy(&body).await,
                Outcome::text(401, UNAUTHENTICATED_MESSAGE)
            );
        }
        for body in [event_body(), json!({})] {
            assert_eq!(
                state.create_event(&body).await,
                Outcome::text(401, UNAUTHENTICATED_MESSAGE)
            );
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn free_busy_rejects_bad_items_without_calling_google() {
        let server = MockServer::start().await;
        let state = state_with(&server, Some(valid_tokens()));

        for body in [json!({}), json!({ "items": [] }), json!({ "items": "a" }), json!(null)] {
            assert_eq!(
                state.free_busy(&body).await,
                Outcome::text(400, "Invalid request body. \"items\" array is required.")
            );
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn free_busy_returns_calendars() {
        let server = MockServer::start().await;
        let calendars = json!({
            "a@example.com": {
                "busy": [{ "start": "2024-01-01T10:00:00Z", "end": "2024-01-01T11:00:00Z" }]
            }
        });
        Mock::given(method("POST"))
            .and(path("/freeBusy"))
            .and(header("authorization", "Bearer access-1"))
            .and(body_partial_json(freebusy_body()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "calendar#freeBusy",
                "calendars": calendars
            })))
            .expect(1)
            .mount(&server)
            .await;

        let state = state_with(&server, Some(valid_tokens()));
        assert_eq!(
            state.free_busy(&freebusy_body()).await,
            Outcome::json(200, calendars)
        );
    }

    #[tokio::test]
    async fn free_busy_defaults_to_upcoming_week() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/freeBusy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "calendars": {} })))
            .mount(&server)
            .await;

        let state = state_with(&server, Some(valid_tokens()));
        let body = json!({ "items": [{ "id": "primary" }] });
        assert!(state.free_busy(&body).await.is_success());

        let requests = server.received_requests().await.unwrap();
        let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let min = calgate_core::parse_timestamp(sent["timeMin"].as_str().unwrap()).unwrap();
        let max = calgate_core::parse_timestamp(sent["timeMax"].as_str().unwrap()).unwrap();
        assert!((Utc::now() - min.with_timezone(&Utc)).num_seconds().abs() < 60);
        assert_eq!((max - min).num_days(), 7);
    }

    #[tokio::test]
    async fn free_busy_provider_failure_is_generic() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/freeBusy"))
            .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
            .mount(&server)
            .await;

        let tokens = valid_tokens();
        let state = state_with(&server, Some(tokens.clone()));
        assert_eq!(
            state.free_busy(&freebusy_body()).await,
            Outcome::text(500, "Failed to query free/busy status.")
        );
        assert_eq!(state.auth.store().current(), Some(tokens));
    }

    #[tokio::test]
    async fn create_event_rejects_missing_fields() {
        let server = MockServer::start().await;
        let state = state_with(&server, Some(valid_tokens()));

        let body = json!({ "summary": "Sync", "start": "2024-01-01T10:00:00Z" });
        assert_eq!(
            state.create_event(&body).await,
            Outcome::text(400, "Missing required event fields: summary, start, end.")
        );
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_event_returns_201() {
        let server = MockServer::start().await;
        let created = json!({
            "id": "evt1",
            "status": "confirmed",
            "htmlLink": "https://calendar.google.com/event?eid=evt1"
        });
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .and(query_param("sendUpdates", "all"))
            .and(body_partial_json(json!({
                "summary": "Sync",
                "start": { "dateTime": "2024-01-01T10:00:00-08:00", "timeZone": "America/Los_Angeles" },
                "attendees": [{ "email": "x@y.com" }],
                "reminders": { "useDefault": false }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(created.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let state = state_with(&server, Some(valid_tokens()));
        assert_eq!(state.create_event(&event_body()).await, Outcome::json(201, created));
    }

    #[tokio::test]
    async fn create_event_sends_one_insert_with_reminders() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .and(body_partial_json(json!({
                "summary": "Team Meeting",
                "start": { "dateTime": "2024-09-10T10:00:00-07:00" },
                "end": { "dateTime": "2024-09-10T11:00:00-07:00" },
                "attendees": [],
                "reminders": {
                    "useDefault": false,
                    "overrides": [
                        { "method": "email", "minutes": 1440 },
                        { "method": "popup", "minutes": 10 }
                    ]
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "evt2" })))
            .expect(1)
            .mount(&server)
            .await;

        let state = state_with(&server, Some(valid_tokens()));
        let body = json!({
            "summary": "Team Meeting",
            "start": "2024-09-10T10:00:00-07:00",
            "end": "2024-09-10T11:00:00-07:00"
        });
        assert_eq!(state.create_event(&body).await.status(), 201);
    }

    #[tokio::test]
    async fn create_event_provider_failure_is_generic() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
            .mount(&server)
            .await;

        let state = state_with(&server, Some(valid_tokens()));
        assert_eq!(
            state.create_event(&event_body()).await,
            Outcome::text(500, "Failed to create event.")
        );
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_before_the_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "renewed",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/freeBusy"))
            .and(header("authorization", "Bearer renewed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "calendars": {} })))
            .expect(1)
            .mount(&server)
            .await;

        let state = state_with(&server, Some(expired_tokens()));
        assert_eq!(state.free_busy(&freebusy_body()).await, Outcome::json(200, json!({})));

        let stored = state.auth.store().current().unwrap();
        assert_eq!(stored.access_token, "renewed");
        assert_eq!(stored.refresh_token.as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn failed_refresh_leaves_store_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant"
            })))
            .mount(&server)
            .await;

        let state = state_with(&server, Some(expired_tokens()));
        assert_eq!(
            state.create_event(&event_body()).await,
            Outcome::text(500, "Failed to create event.")
        );
        assert_eq!(state.auth.store().current().unwrap().access_token, "stale");
    }

    #[tokio::test]
    async fn refresh_is_discarded_when_the_call_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "renewed",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/freeBusy"))
            .and(header("authorization", "Bearer renewed"))
            .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = expired_tokens();
        let state = state_with(&server, Some(tokens.clone()));
        assert_eq!(
            state.free_busy(&freebusy_body()).await,
            Outcome::text(500, "Failed to query free/busy status.")
        );
        assert_eq!(state.auth.store().current(), Some(tokens));
    }

    #[tokio::test]
    async fn expired_token_without_refresh_is_used_as_is() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/freeBusy"))
            .and(header("authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "calendars": {} })))
            .expect(1)
            .mount(&server)
            .await;

        let state = state_with(&server, Some(TokenSet::new("stale", None, Some(0))));
        assert!(state.free_busy(&freebusy_body()).await.is_success());
    }
}
