//! Google provider configuration.

use std::fmt;
use std::time::Duration;

use url::Url;

/// Google OAuth consent endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// Google OAuth token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Base URL for Google Calendar API v3.
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// OAuth 2.0 client credentials registered in the Google Cloud Console.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID.
    pub client_id: String,
    /// The OAuth 2.0 client secret.
    pub client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Validates that both halves of the credentials are present.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.trim().is_empty() {
            return Err("client_id is required");
        }
        if self.client_secret.trim().is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }

    /// Returns true if the client ID has the usual Google suffix.
    ///
    /// Other IDs still work against test servers, so this is only a hint.
    pub fn looks_like_google_client(&self) -> bool {
        self.client_id.ends_with(".apps.googleusercontent.com")
    }
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Configuration for the Google OAuth flow and Calendar API calls.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// OAuth credentials for API access.
    pub credentials: OAuthCredentials,

    /// Where Google sends the user back after consent.
    pub redirect_uri: String,

    /// OAuth scopes to request.
    pub scopes: Vec<String>,

    /// Timezone attached to created event start/end times.
    pub time_zone: String,

    /// Request timeout for every outbound call.
    pub timeout: Duration,

    /// User agent string for API requests.
    pub user_agent: String,

    /// Consent endpoint.
    pub auth_url: String,

    /// Token endpoint.
    pub token_url: String,

    /// Calendar API base URL, without a trailing slash.
    pub api_base: String,
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Scopes needed to read free/busy data and insert events.
    pub const DEFAULT_SCOPES: [&'static str; 2] = [
        "https://www.googleapis.com/auth/calendar.readonly",
        "https://www.googleapis.com/auth/calendar.events",
    ];

    /// Default timezone for created events.
    pub const DEFAULT_TIME_ZONE: &'static str = "America/Los_Angeles";

    /// Creates a new Google configuration with the given credentials.
    pub fn new(credentials: OAuthCredentials, redirect_uri: impl Into<String>) -> Self {
        Self {
            credentials,
            redirect_uri: redirect_uri.into(),
            scopes: Self::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            time_zone: Self::DEFAULT_TIME_ZONE.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("calgate/{}", env!("CARGO_PKG_VERSION")),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            api_base: CALENDAR_API_BASE.to_string(),
        }
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the event timezone.
    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the consent endpoint.
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Overrides the token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Overrides the Calendar API base URL.
    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.credentials
            .validate()
            .map_err(|e| format!("invalid credentials: {}", e))?;

        let redirect = Url::parse(&self.redirect_uri)
            .map_err(|e| format!("invalid redirect URI '{}': {}", self.redirect_uri, e))?;
        if !matches!(redirect.scheme(), "http" | "https") {
            return Err(format!(
                "redirect URI must use http or https, got '{}'",
                redirect.scheme()
            ));
        }

        if self.scopes.iter().all(|scope| scope.trim().is_empty()) {
            return Err("at least one OAuth scope is required".to_string());
        }

        if self.time_zone.trim().is_empty() {
            return Err("event timezone must not be empty".to_string());
        }

        Ok(())
    }
}
