//! Error taxonomy shared by every layer of the framework.
//!
//! - [`Error::Usage`] and [`Error::Config`] are programmer mistakes and are
//!   returned immediately from the offending call.
//! - [`ApplicationError`] is the recoverable family the error handler maps to
//!   specific HTTP statuses.
//! - Anything else reaching the error handler is unexpected and becomes a 500.

use crate::http::StatusCode;
use std::backtrace::Backtrace;
use std::sync::Arc;
use thiserror::Error;

/// A boxed error type for wrapping arbitrary failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// The framework API was misused (double send, update outside response middleware...).
    #[error("usage error: {0}")]
    Usage(String),

    /// Invalid registration or configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A container key was registered twice.
    #[error("duplicate declaration of {0} found")]
    DuplicateKey(String),

    /// A container key was fetched without being registered.
    #[error("could not find {0}")]
    ComponentNotFound(String),

    /// The inbound event could not be classified or routed.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// A recognised application error.
    #[error(transparent)]
    Application(#[from] ApplicationError),

    /// Any other error, with the backtrace captured where it was wrapped.
    #[error("{source}")]
    Unexpected {
        source: BoxError,
        trace: Arc<Backtrace>,
    },

    /// A value that is not an error at all, e.g. the `"Unauthorized"` string an
    /// authorizer hands to the host.
    #[error("unknown error object: {0}")]
    Opaque(serde_json::Value),
}

impl Error {
    /// Wrap any error as unexpected.
    pub fn unexpected(err: impl Into<BoxError>) -> Self {
        Error::Unexpected {
            source: err.into(),
            trace: Arc::new(Backtrace::capture()),
        }
    }

    /// Backtrace of an unexpected error. It is only populated when
    /// `RUST_BACKTRACE` or `RUST_LIB_BACKTRACE` enables capturing.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            Error::Unexpected { trace, .. } => Some(trace),
            _ => None,
        }
    }

    /// Wrap a non-error value.
    pub fn opaque(value: impl Into<serde_json::Value>) -> Self {
        Error::Opaque(value.into())
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Error::Usage(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// The application error carried by this error, if any.
    pub fn as_application(&self) -> Option<&ApplicationError> {
        match self {
            Error::Application(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::unexpected(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::unexpected(err)
    }
}

/// Kind of an [`ApplicationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationErrorKind {
    BadRequest,
    NotFound,
    Forbidden,
    UnprocessableEntity,
    Generic,
}

impl ApplicationErrorKind {
    /// Status the default error handler answers with.
    pub fn status(&self) -> StatusCode {
        match self {
            ApplicationErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ApplicationErrorKind::NotFound => StatusCode::NOT_FOUND,
            ApplicationErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ApplicationErrorKind::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
            ApplicationErrorKind::Generic => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Recoverable error raised by handlers and middleware.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ApplicationError {
    pub kind: ApplicationErrorKind,
    pub message: String,
}

impl ApplicationError {
    pub fn new(kind: ApplicationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Generic application error, mapped to 500.
    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ApplicationErrorKind::Generic, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApplicationErrorKind::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApplicationErrorKind::NotFound, message)
    }

    pub fn forbidden() -> Self {
        Self::new(ApplicationErrorKind::Forbidden, "Access is forbidden")
    }

    pub fn unprocessable_entity() -> Self {
        Self::new(ApplicationErrorKind::UnprocessableEntity, "Unprocessable Entity")
    }
}

impl Default for ApplicationError {
    fn default() -> Self {
        Self::generic("Application error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_status_mapping() {
        assert_eq!(ApplicationErrorKind::BadRequest.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApplicationErrorKind::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApplicationErrorKind::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApplicationErrorKind::UnprocessableEntity.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApplicationErrorKind::Generic.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_application_error_display_is_message() {
        let err: Error = ApplicationError::bad_request("id must be numeric").into();
        assert_eq!(err.to_string(), "id must be numeric");
        assert!(err.as_application().is_some());
    }

    #[test]
    fn test_opaque_error() {
        let err = Error::opaque("Unauthorized");
        assert_eq!(err.to_string(), "unknown error object: \"Unauthorized\"");
        assert!(err.as_application().is_none());
    }

    #[test]
    fn test_unexpected_error_keeps_message_and_backtrace() {
        let err = Error::unexpected("disk full");
        assert_eq!(err.to_string(), "disk full");
        assert!(err.backtrace().is_some());
        assert!(Error::usage("x").backtrace().is_none());
    }
}
