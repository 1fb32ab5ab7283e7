//! Calendar provider plumbing.
//!
//! - [`google`] - OAuth 2.0 authorization-code flow, the credential store and
//!   the Calendar API v3 client
//! - [`ProviderError`] - errors raised while talking to the provider
//!
//! ```text
//!  consent URL ◄── OAuthClient ──► token endpoint
//!                       │
//!                       ▼ TokenSet
//!               CredentialStore (one slot)
//!                       │
//!                       ▼ bearer token
//!             GoogleCalendarClient ──► freeBusy / events.insert
//! ```

pub mod error;
pub mod google;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
