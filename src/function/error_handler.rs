//! Error handlers turn an error into the response that is sent.

use crate::error::{ApplicationErrorKind, Error};
use crate::http::{Request, Response};
use async_trait::async_trait;
use serde_json::Value;
use std::error::Error as StdError;
use std::sync::Arc;
use tracing::error;

/// Converts the error carried by `res` (see [`Response::error`]) into a sent
/// response.
///
/// An error handler must send `res`. Returning an error, or returning without
/// sending, delivers a raw error to the host.
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    async fn handle(&self, req: &Request, res: &mut Response) -> Result<(), Error>;
}

type BodyMapper = Arc<dyn Fn(&Error) -> Option<Value> + Send + Sync>;

/// Default error handler.
///
/// Logs the error, then answers 400 / 404 / 403 / 422 for the matching
/// application errors and 500 for anything else. [`with_body`] keeps this
/// status mapping while choosing the body.
///
/// [`with_body`]: SimpleErrorHandler::with_body
#[derive(Clone, Default)]
pub struct SimpleErrorHandler {
    body: Option<BodyMapper>,
}

impl SimpleErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `body` to build the response body from the error.
    pub fn with_body<F>(body: F) -> Self
    where
        F: Fn(&Error) -> Option<Value> + Send + Sync + 'static,
    {
        Self {
            body: Some(Arc::new(body)),
        }
    }

    /// Status the default strategy answers `err` with.
    pub fn status_for(err: &Error) -> crate::http::StatusCode {
        err.as_application()
            .map(|app| app.kind)
            .unwrap_or(ApplicationErrorKind::Generic)
            .status()
    }
}

fn log_error(err: &Error) {
    match err {
        Error::Application(app) => error!("[ERROR] {}", app.message),
        Error::Opaque(value) => error!(value = %value, "[ERROR] Unknown error object"),
        other => {
            let mut chain = Vec::new();
            let mut source = other.source();
            while let Some(cause) = source {
                chain.push(cause.to_string());
                source = cause.source();
            }
            let backtrace = other.backtrace().map(ToString::to_string);
            error!(
                error = %other,
                debug = ?other,
                causes = ?chain,
                backtrace = backtrace.as_deref().unwrap_or("unavailable"),
                "[ERROR] Unexpected error"
            );
        }
    }
}

#[async_trait]
impl ErrorHandler for SimpleErrorHandler {
    async fn handle(&self, _req: &Request, res: &mut Response) -> Result<(), Error> {
        let (status, body) = match res.error() {
            Some(err) => {
                log_error(err);
                let body = self.body.as_ref().and_then(|body| body(err));
                (Self::status_for(err), body)
            }
            None => {
                error!("[ERROR] error handler invoked without an error");
                (crate::http::StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };
        res.send_status(status, body)
    }
}

impl std::fmt::Debug for SimpleErrorHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleErrorHandler")
            .field("custom_body", &self.body.is_some())
            .finish()
    }
}

struct ErrorHandlerFn<F>(F);

#[async_trait]
impl<F> ErrorHandler for ErrorHandlerFn<F>
where
    F: Fn(&Request, &mut Response) -> Result<(), Error> + Send + Sync,
{
    async fn handle(&self, req: &Request, res: &mut Response) -> Result<(), Error> {
        (self.0)(req, res)
    }
}

/// Error handler from a synchronous closure.
pub fn error_handler_fn<F>(f: F) -> Arc<dyn ErrorHandler>
where
    F: Fn(&Request, &mut Response) -> Result<(), Error> + Send + Sync + 'static,
{
    Arc::new(ErrorHandlerFn(f))
}
