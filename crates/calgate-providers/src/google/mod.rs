//! Google Calendar integration.
//!
//! # Features
//!
//! - OAuth 2.0 authorization-code flow with offline access
//! - Single-slot in-memory credential store
//! - Explicit token refresh
//! - Free/busy queries across several calendars
//! - Event insertion on the primary calendar with attendee notifications
//!
//! # Example
//!
//! ```ignore
//! use calgate_providers::google::{
//!     CredentialStore, GoogleCalendarClient, GoogleConfig, MemoryCredentialStore, OAuthClient,
//!     OAuthCredentials,
//! };
//!
//! let config = GoogleConfig::new(
//!     OAuthCredentials::new("id.apps.googleusercontent.com", "secret"),
//!     "http://localhost:3000/auth/google/callback",
//! );
//! let oauth = OAuthClient::new(&config)?;
//! println!("visit {}", oauth.authorization_url());
//!
//! let store = MemoryCredentialStore::new();
//! store.replace(oauth.exchange_code(&code).await?);
//!
//! let calendar = GoogleCalendarClient::new(&config)?;
//! let tokens = store.current().unwrap();
//! let busy = calendar.authorized(&tokens).free_busy(&min, &max, &items).await?;
//! ```

mod client;
mod config;
mod oauth;
mod tokens;

pub use client::{
    AuthorizedCalendar, EventDateTime, EventResource, GoogleCalendarClient, ReminderOverride,
    Reminders,
};
pub use config::{
    CALENDAR_API_BASE, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, GoogleConfig, OAuthCredentials,
};
pub use oauth::{AuthorizationRequest, OAuthClient};
pub use tokens::{CredentialStore, MemoryCredentialStore, TokenSet};
