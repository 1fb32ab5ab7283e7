//! Request and result types shared by the calgate transport bindings.
//!
//! Callers hand the service loosely-typed JSON. This crate turns it into
//! validated values ([`FreeBusyQuery`], [`EventDraft`]) and defines the
//! transport-neutral [`Outcome`] that every operation produces.
//!
//! # Example
//!
//! ```rust
//! use calgate_protocol::FreeBusyQuery;
//! use serde_json::json;
//!
//! let query = FreeBusyQuery::from_value(&json!({
//!     "items": [{ "id": "a@example.com" }]
//! }))
//! .unwrap();
//! assert_eq!(query.items[0].id, "a@example.com");
//! assert!(query.time_min.is_none());
//! ```

mod action;
mod error;
mod types;

pub use action::Action;
pub use error::{ValidationError, ValidationResult};
pub use types::{Attendee, CalendarItem, EventDraft, FreeBusyQuery, Outcome};
