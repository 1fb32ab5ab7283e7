//! Server error types.
//!
//! [`ServiceError`] is what a single request can fail with; each variant maps
//! to one status code. [`ServerError`] covers process startup and shutdown.

use std::fmt;
use std::io;

use calgate_core::TracingError;
use calgate_protocol::{Outcome, ValidationError};
use calgate_providers::ProviderError;
use thiserror::Error;
use tracing::{error, warn};

use crate::config::ConfigError;

/// Remediation text returned with every 401.
pub const UNAUTHENTICATED_MESSAGE: &str =
    "Unauthorized. Please authenticate by visiting /auth/google";

/// Result type for request-level operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type for server lifecycle operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// The operations a request can run, used for logging and error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Exchanging the callback code for tokens.
    CompleteAuthorization,
    /// Free/busy query.
    FreeBusy,
    /// Event insertion.
    CreateEvent,
    /// Action-binding dispatch before an operation is chosen.
    Dispatch,
}

impl Operation {
    /// Returns a stable name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompleteAuthorization => "complete_authorization",
            Self::FreeBusy => "free_busy",
            Self::CreateEvent => "create_event",
            Self::Dispatch => "dispatch",
        }
    }

    /// Generic message shown to callers when the provider fails.
    fn failure_message(&self) -> &'static str {
        match self {
            Self::CompleteAuthorization => "Error retrieving access token.",
            Self::FreeBusy => "Failed to query free/busy status.",
            Self::CreateEvent => "Failed to create event.",
            Self::Dispatch => "Internal server error.",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request failed.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or malformed caller input (400, or 404 for unknown actions).
    #[error("{0}")]
    InvalidInput(#[from] ValidationError),

    /// No token set is stored (401).
    #[error("{}", UNAUTHENTICATED_MESSAGE)]
    Unauthenticated,

    /// The provider call failed (500). The caller only sees a generic message.
    #[error("{}", .operation.failure_message())]
    Provider {
        operation: Operation,
        #[source]
        source: ProviderError,
    },
}

impl ServiceError {
    /// Creates a provider error for `operation`.
    pub fn provider(operation: Operation, source: ProviderError) -> Self {
        Self::Provider { operation, source }
    }

    /// Returns the HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidInput(e) if e.is_not_found() => 404,
            Self::InvalidInput(_) => 400,
            Self::Unauthenticated => 401,
            Self::Provider { .. } => 500,
        }
    }

    /// Logs the error against the operation that produced it.
    pub fn log(&self, operation: Operation) {
        match self {
            Self::InvalidInput(e) => {
                warn!(operation = %operation, error = %e, "rejected invalid request");
            }
            Self::Unauthenticated => {
                warn!(operation = %operation, "rejected request without stored credentials");
            }
            Self::Provider { source, .. } => {
                error!(
                    operation = %operation,
                    code = %source.code(),
                    error = %source,
                    reauth_may_help = source.code().is_credential_problem(),
                    "provider call failed"
                );
            }
        }
    }

    /// Renders the error as a plain-text outcome.
    pub fn to_outcome(&self) -> Outcome {
        Outcome::text(self.status(), self.to_string())
    }
}

/// Errors that stop the server process.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (bind, accept).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tracing could not be initialized.
    #[error("Tracing error: {0}")]
    Tracing(#[from] TracingError),

    /// Provider clients could not be built.
    #[error("Provider setup error: {0}")]
    Provider(#[from] ProviderError),
}
