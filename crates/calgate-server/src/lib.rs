//! HTTP service for the Google OAuth flow, free/busy queries and event
//! creation.
//!
//! Two transport bindings sit on one operations layer ([`AppState`]):
//! - route-style HTTP endpoints (`/auth/google`, `/calendar/freebusy`, ...)
//! - named actions under `/service/{action}`
//!
//! Both share a single in-memory credential store, so signing in through one
//! authorizes the other.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use calgate_providers::google::{GoogleConfig, MemoryCredentialStore, OAuthCredentials};
//! use calgate_server::{AppState, app};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GoogleConfig::new(
//!         OAuthCredentials::new("id.apps.googleusercontent.com", "secret"),
//!         "http://localhost:3000/auth/google/callback",
//!     );
//!     let state = AppState::new(&config, Arc::new(MemoryCredentialStore::new()))?;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app(state)).await?;
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod secret;
pub mod service;
pub mod signals;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use actions::ActionHandler;
pub use config::{ConfigError, ServerConfig};
pub use error::{Operation, ServerError, ServerResult, ServiceError, ServiceResult};
pub use service::{AppState, AuthFlow, CalendarOps};
pub use signals::shutdown_signal;

/// Builds the full application: both bindings plus request tracing.
pub fn app(state: AppState) -> Router {
    http::router(state.clone())
        .merge(actions::router(state))
        .fallback(http::not_found)
        .layer(TraceLayer::new_for_http())
}
