//! Input validation errors.

use thiserror::Error;

/// Result type for validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// A request that was rejected before any provider call.
///
/// The display text is what callers see in the 400/404 response body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The OAuth callback arrived without a `code` parameter.
    #[error("Authorization code not found.")]
    MissingCode,

    /// `items` is absent, not an array, empty, or holds entries without an `id`.
    #[error("Invalid request body. \"items\" array is required.")]
    InvalidItems,

    /// One of `summary`, `start`, `end` is missing or empty.
    #[error("Missing required event fields: summary, start, end.")]
    MissingEventFields,

    /// A timestamp field is present but is not RFC 3339.
    #[error("Invalid timestamp for {field}: {value}")]
    InvalidTimestamp { field: &'static str, value: String },

    /// An optional field has the wrong JSON type.
    #[error("Invalid value for field: {field}")]
    InvalidField { field: &'static str },

    /// `attendees` is not an array of objects with an `email` string.
    #[error("Invalid attendees: each attendee needs an \"email\" string.")]
    InvalidAttendees,

    /// The action binding received a name it does not know.
    #[error("Unknown action: {0}")]
    UnknownAction(String),
}

impl ValidationError {
    /// Creates an invalid timestamp error.
    pub fn invalid_timestamp(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            field,
            value: value.into(),
        }
    }

    /// Returns true if the error means "no such operation" rather than bad input.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownAction(_))
    }
}
