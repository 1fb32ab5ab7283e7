//! Error types for calendar provider operations.
//!
//! Anything that goes wrong between this service and Google (token endpoint
//! or Calendar API) is a [`ProviderError`]. Callers surface all of them the
//! same way; the code is kept for logs and tests.

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Credentials or authorization code were rejected.
    AuthenticationFailed,
    /// The token lacks permission for the resource.
    AuthorizationFailed,
    /// Connection failed, timed out, or the body could not be read.
    NetworkError,
    /// Too many requests.
    RateLimited,
    /// The provider answered with an unexpected status.
    ServerError,
    /// The response body did not have the expected shape.
    InvalidResponse,
    /// Calendar or resource does not exist.
    NotFound,
    /// The provider refused the request as malformed.
    BadRequest,
    /// Local configuration prevents the call (e.g. HTTP client setup).
    ConfigurationError,
}

impl ProviderErrorCode {
    /// Returns true if re-running the consent flow may fix the error.
    pub fn is_credential_problem(&self) -> bool {
        matches!(self, Self::AuthenticationFailed | Self::AuthorizationFailed)
    }

    /// Returns a stable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while interacting with the calendar provider.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// Which endpoint produced the error (e.g. "token", "calendar").
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    /// Creates an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthorizationFailed, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Classifies a non-success HTTP status from the provider.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let code = match status {
            StatusCode::UNAUTHORIZED => ProviderErrorCode::AuthenticationFailed,
            StatusCode::FORBIDDEN => ProviderErrorCode::AuthorizationFailed,
            StatusCode::NOT_FOUND => ProviderErrorCode::NotFound,
            StatusCode::TOO_MANY_REQUESTS => ProviderErrorCode::RateLimited,
            StatusCode::BAD_REQUEST => ProviderErrorCode::BadRequest,
            _ => ProviderErrorCode::ServerError,
        };
        Self::new(code, format!("API error ({}): {}", status, body.trim()))
    }

    /// Wraps a transport failure from the HTTP client.
    pub fn from_transport(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timeout".to_string()
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            format!("request failed: {}", err)
        };
        Self::network(message).with_source(err)
    }

    /// Sets the endpoint name for this error.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the endpoint name, if set.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
