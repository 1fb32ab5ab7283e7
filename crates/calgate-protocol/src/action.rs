//! Named actions for the action-style binding.
//!
//! Each action is invoked by name with a flat object of parameters, for
//! example `checkFreeBusy` with `{ "items": [...], "timeMin": "..." }`.

use serde_json::Value;

use crate::error::{ValidationError, ValidationResult};

/// An action invocation.
///
/// Payload validation for the calendar actions happens in the operations
/// layer, after the authentication gate, so the raw parameters are kept.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Liveness check, answers `hello`.
    Say,
    /// Start the OAuth consent flow.
    AuthGoogle,
    /// Finish the OAuth flow with the code Google handed back.
    AuthGoogleCallback { code: Option<String> },
    /// Free/busy query over the given calendars.
    CheckFreeBusy { params: Value },
    /// Create an event on the primary calendar.
    CreateEvent { params: Value },
}

impl Action {
    /// Parses an action name and its parameters.
    pub fn parse(name: &str, params: Value) -> ValidationResult<Self> {
        match name {
            "say" => Ok(Self::Say),
            "authGoogle" => Ok(Self::AuthGoogle),
            "authGoogleCallback" => {
                let code = params
                    .get("code")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Ok(Self::AuthGoogleCallback { code })
            }
            "checkFreeBusy" => Ok(Self::CheckFreeBusy { params }),
            "createEvent" => Ok(Self::CreateEvent { params }),
            other => Err(ValidationError::UnknownAction(other.to_string())),
        }
    }

    /// Returns the wire name of this action.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Say => "say",
            Self::AuthGoogle => "authGoogle",
            Self::AuthGoogleCallback { .. } => "authGoogleCallback",
            Self::CheckFreeBusy { .. } => "checkFreeBusy",
            Self::CreateEvent { .. } => "createEvent",
        }
    }

    /// Returns true if the action needs a stored token set.
    pub fn requires_auth(&self) -> bool {
        matches!(self, Self::CheckFreeBusy { .. } | Self::CreateEvent { .. })
    }
}
