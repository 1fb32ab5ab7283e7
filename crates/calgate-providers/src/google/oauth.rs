//! OAuth 2.0 authorization-code flow for Google APIs.
//!
//! # Flow Overview
//!
//! 1. Build the consent URL ([`OAuthClient::authorization_url`]) and send the
//!    user's browser there
//! 2. User grants access; Google redirects to the configured redirect URI
//!    with a one-time `code`
//! 3. Exchange the code for a [`TokenSet`] ([`OAuthClient::exchange_code`])
//! 4. Later, trade the refresh token for a new access token
//!    ([`OAuthClient::refresh`])
//!
//! Offline access is always requested so Google hands out a refresh token.

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

use super::config::{GoogleConfig, OAuthCredentials};
use super::tokens::{TokenSet, expiry_from};

/// Parameters of a consent request, derived from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Registered client ID.
    pub client_id: String,
    /// Where Google sends the user back.
    pub redirect_uri: String,
    /// Scopes to request.
    pub scopes: Vec<String>,
    /// Ask for a refresh token (`access_type=offline`).
    pub offline: bool,
}

impl AuthorizationRequest {
    /// Builds the consent URL under `auth_url`.
    pub fn to_url(&self, auth_url: &str) -> String {
        let scope = self.scopes.join(" ");
        let mut url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}",
            auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&scope),
        );
        if self.offline {
            url.push_str("&access_type=offline");
        }
        url
    }
}

/// OAuth client for Google's consent and token endpoints.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    redirect_uri: String,
    scopes: Vec<String>,
    auth_url: String,
    token_url: String,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client from the provider configuration.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| {
                ProviderError::configuration("failed to create HTTP client").with_source(e)
            })?;

        Ok(Self {
            credentials: config.credentials.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scopes.clone(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            http_client,
        })
    }

    /// Returns the consent request this client issues.
    pub fn authorization_request(&self) -> AuthorizationRequest {
        AuthorizationRequest {
            client_id: self.credentials.client_id.clone(),
            redirect_uri: self.redirect_uri.clone(),
            scopes: self.scopes.clone(),
            offline: true,
        }
    }

    /// Returns the consent URL the user must visit.
    pub fn authorization_url(&self) -> String {
        self.authorization_request().to_url(&self.auth_url)
    }

    /// Exchanges an authorization code for a token set.
    ///
    /// One round trip; nothing is retried.
    #[tracing::instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str) -> ProviderResult<TokenSet> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let response = self.post_token_form(&params).await?;
        info!(
            has_refresh_token = response.refresh_token.is_some(),
            expires_in = ?response.expires_in,
            "exchanged authorization code for tokens"
        );

        Ok(
            TokenSet::new(
                response.access_token,
                response.refresh_token,
                response.expires_in,
            )
            .with_scope(response.scope)
            .with_token_type(response.token_type),
        )
    }

    /// Refreshes an access token using the set's refresh token.
    #[tracing::instrument(skip_all)]
    pub async fn refresh(&self, tokens: &TokenSet) -> ProviderResult<TokenSet> {
        let refresh_token = tokens.refresh_token.as_deref().ok_or_else(|| {
            ProviderError::authentication("no refresh token - re-authentication required")
        })?;

        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self.post_token_form(&params).await?;
        info!("successfully refreshed access token");

        Ok(tokens.refreshed(
            response.access_token,
            response.refresh_token,
            response.expires_in,
        ))
    }

    /// Posts a form to the token endpoint and parses the reply.
    async fn post_token_form(&self, params: &[(&str, &str)]) -> ProviderResult<TokenResponse> {
        debug!(token_url = %self.token_url, "calling token endpoint");

        let response = self
            .http_client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(e).with_provider("token"))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::network("failed to read token response")
                .with_source(e)
                .with_provider("token")
        })?;

        if !status.is_success() {
            let detail = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| e.describe())
                .unwrap_or(body);
            return Err(ProviderError::authentication(format!(
                "token request failed ({}): {}",
                status, detail
            ))
            .with_provider("token"));
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {}", e))
                .with_provider("token")
        })?;

        if let Some(secs) = parsed.expires_in {
            if secs < 0 || expiry_from(Utc::now(), secs).is_none() {
                return Err(ProviderError::invalid_response(format!(
                    "invalid token lifetime: expires_in={}",
                    secs
                ))
                .with_provider("token"));
            }
        }
        Ok(parsed)
    }
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Error body from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenErrorResponse {
    fn describe(self) -> String {
        match self.error_description {
            Some(description) => format!("{} ({})", self.error, description),
            None => self.error,
        }
    }
}
