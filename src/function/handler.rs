//! Handler traits and the handler kinds a route can be bound to.

use crate::error::Error;
use crate::http::{Context, Event, Request, Response};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// A request/response handler.
///
/// The handler must finish the request through `res`: send it (`ok`,
/// `send`, ...) or forward an error with `handle_error`. Returning an error
/// hands it to the error handler.
///
/// ```rust,no_run
/// use funcpress::prelude::*;
///
/// struct GetUser;
///
/// #[async_trait]
/// impl Handler for GetUser {
///     async fn handle(&self, req: &mut Request, res: &mut Response) -> Result<(), Error> {
///         let id = req
///             .event
///             .path_parameter("id")
///             .ok_or_else(|| ApplicationError::bad_request("missing id"))?;
///         res.ok(serde_json::json!({ "id": id }))
///     }
/// }
/// ```
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, req: &mut Request, res: &mut Response) -> Result<(), Error>;
}

/// Outcome of a raw or authorizer handler.
#[derive(Debug)]
pub enum RawReply {
    /// A result value for the host.
    Respond(Value),
    /// An error (or opaque value) delivered to the host as is.
    Fail(Error),
}

/// A handler working on the raw event and context.
#[async_trait]
pub trait RawHandler: Send + Sync {
    async fn handle(&self, event: &Event, context: &Context) -> Result<RawReply, Error>;
}

/// How a route invokes its handler.
#[derive(Clone)]
pub enum HandlerKind {
    /// Request/response handler.
    Plain(Arc<dyn Handler>),
    /// Raw handler. A `Respond` value is folded into the response and goes
    /// through response middleware.
    Raw(Arc<dyn RawHandler>),
    /// Authorizer. A `Respond` value (the policy document) is delivered as is.
    Authorizer(Arc<dyn RawHandler>),
}

impl HandlerKind {
    pub fn plain(handler: impl Handler + 'static) -> Self {
        HandlerKind::Plain(Arc::new(handler))
    }

    pub fn raw(handler: impl RawHandler + 'static) -> Self {
        HandlerKind::Raw(Arc::new(handler))
    }

    pub fn authorizer(handler: impl RawHandler + 'static) -> Self {
        HandlerKind::Authorizer(Arc::new(handler))
    }

    pub fn name(&self) -> &'static str {
        match self {
            HandlerKind::Plain(_) => "plain",
            HandlerKind::Raw(_) => "raw",
            HandlerKind::Authorizer(_) => "authorizer",
        }
    }
}

impl std::fmt::Debug for HandlerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HandlerKind::{}", self.name())
    }
}

struct HandlerFn<F>(F);

#[async_trait]
impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut Request, &mut Response) -> Result<(), Error> + Send + Sync,
{
    async fn handle(&self, req: &mut Request, res: &mut Response) -> Result<(), Error> {
        (self.0)(req, res)
    }
}

struct RawFn<F>(F);

#[async_trait]
impl<F> RawHandler for RawFn<F>
where
    F: Fn(&Event, &Context) -> Result<RawReply, Error> + Send + Sync,
{
    async fn handle(&self, event: &Event, context: &Context) -> Result<RawReply, Error> {
        (self.0)(event, context)
    }
}

/// Plain handler from a synchronous closure.
pub fn handler_fn<F>(f: F) -> HandlerKind
where
    F: Fn(&mut Request, &mut Response) -> Result<(), Error> + Send + Sync + 'static,
{
    HandlerKind::plain(HandlerFn(f))
}

/// Raw handler from a synchronous closure.
pub fn raw_fn<F>(f: F) -> HandlerKind
where
    F: Fn(&Event, &Context) -> Result<RawReply, Error> + Send + Sync + 'static,
{
    HandlerKind::raw(RawFn(f))
}

/// Authorizer from a synchronous closure.
pub fn authorizer_fn<F>(f: F) -> HandlerKind
where
    F: Fn(&Event, &Context) -> Result<RawReply, Error> + Send + Sync + 'static,
{
    HandlerKind::authorizer(RawFn(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_raw_fn_replies() {
        let kind = raw_fn(|event, _ctx| {
            Ok(RawReply::Respond(json!({ "statusCode": 202, "body": event.path() })))
        });
        let HandlerKind::Raw(handler) = kind else {
            panic!("expected a raw handler");
        };
        let reply = handler
            .handle(&Event::http("GET", "/jobs"), &Context::default())
            .await
            .unwrap();
        assert!(matches!(reply, RawReply::Respond(v) if v["body"] == "/jobs"));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(handler_fn(|_, res| res.no_content()).name(), "plain");
        assert_eq!(
            authorizer_fn(|_, _| Ok(RawReply::Fail(Error::opaque("Unauthorized")))).name(),
            "authorizer"
        );
    }
}
