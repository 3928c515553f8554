//! Executes one route: request middleware, handler, response middleware,
//! error handler and finally middleware.

use super::lifecycle::{StartContainer, StopContainer};
use crate::container::{ComponentRegistration, Container};
use crate::error::Error;
use crate::function::{ErrorHandler, HandlerKind, RawReply};
use crate::http::{Context, Event, Headers, Request, Response};
use crate::middleware::{Flow, Middleware, Role};
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Everything a route pipeline is built from.
pub(crate) struct PipelineConfig {
    /// Label used in logs, e.g. `users:http./users.GET`.
    pub route: String,
    pub kind: HandlerKind,
    /// Middleware of every role, in registration order.
    pub middleware: Vec<Middleware>,
    pub error_handler: Arc<dyn ErrorHandler>,
    pub headers: Headers,
    pub components: Vec<ComponentRegistration>,
    pub environment: Arc<Value>,
    pub slow_threshold: Duration,
}

/// What is handed back to the host.
enum Delivery {
    /// The serialised response.
    Plain,
    /// A value passed through untouched.
    Raw(Value),
    /// An error passed through untouched.
    Failure(Error),
}

/// Final state of an invocation before finally middleware run.
struct Outcome {
    /// The delivered response, or the last response state for raw deliveries.
    response: Response,
    delivery: Delivery,
}

impl Outcome {
    fn plain(response: Response) -> Self {
        Self {
            response,
            delivery: Delivery::Plain,
        }
    }

    fn raw(response: Response, value: Value) -> Self {
        Self {
            response,
            delivery: Delivery::Raw(value),
        }
    }

    fn failure(response: Response, error: Error) -> Self {
        Self {
            response,
            delivery: Delivery::Failure(error),
        }
    }

    fn error(&self) -> Option<&Error> {
        match &self.delivery {
            Delivery::Failure(error) => Some(error),
            _ => self.response.error(),
        }
    }

    fn deliver(self) -> Result<Value, Error> {
        match self.delivery {
            Delivery::Plain => self.response.to_value(),
            Delivery::Raw(value) => Ok(value),
            Delivery::Failure(error) => Err(error),
        }
    }
}

/// A fully wired route.
///
/// Request middleware run in registration order, response and finally
/// middleware in reverse registration order. The container is populated by
/// the first request middleware and stopped by the last finally middleware.
pub(crate) struct Pipeline {
    route: String,
    kind: HandlerKind,
    request: Vec<Middleware>,
    response: Vec<Middleware>,
    finally: Vec<Middleware>,
    error_handler: Arc<dyn ErrorHandler>,
    headers: Headers,
    slow_threshold: Duration,
}

impl Pipeline {
    pub(crate) fn new(config: PipelineConfig) -> Self {
        let mut request = vec![Middleware::request(StartContainer::new(
            config.environment,
            config.components,
        ))];
        let mut response = Vec::new();
        let mut finally = vec![Middleware::finally(StopContainer)];

        for middleware in config.middleware {
            match middleware.role() {
                Role::Request => request.push(middleware),
                Role::Response => response.push(middleware),
                Role::Finally => finally.push(middleware),
            }
        }
        response.reverse();
        finally.reverse();

        Self {
            route: config.route,
            kind: config.kind,
            request,
            response,
            finally,
            error_handler: config.error_handler,
            headers: config.headers,
            slow_threshold: config.slow_threshold,
        }
    }

    pub(crate) fn route(&self) -> &str {
        &self.route
    }

    /// Run one invocation to completion.
    pub(crate) async fn run(&self, event: Event, context: Context) -> Result<Value, Error> {
        let started = Instant::now();
        let mut req = Request::new(event, context, Arc::new(Container::new()));
        let mut res = Response::new(req.method().map(str::to_string), self.headers.clone());

        let dispatched = AssertUnwindSafe(self.dispatch(&mut req, &mut res))
            .catch_unwind()
            .await;
        let outcome = match dispatched {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(route = %self.route, panic = %message, "route panicked");
                Outcome::failure(
                    res.clone(),
                    Error::unexpected(format!("route {} panicked: {}", self.route, message)),
                )
            }
        };
        self.run_finally(&req, &outcome).await;

        let elapsed = started.elapsed();
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        if elapsed >= self.slow_threshold {
            warn!(route = %self.route, elapsed_ms, "slow invocation");
        } else {
            debug!(route = %self.route, elapsed_ms, "invocation finished");
        }

        outcome.deliver()
    }

    async fn dispatch(&self, req: &mut Request, res: &mut Response) -> Outcome {
        let flow = match self.run_request_chain(req, res).await {
            Ok(flow) => flow,
            Err(err) => return self.handle_error(req, res, Arc::new(err)).await,
        };
        if let Some(err) = res.take_forwarded() {
            return self.handle_error(req, res, err).await;
        }
        if flow == Flow::Stop {
            return self.short_circuit(res);
        }

        match &self.kind {
            HandlerKind::Plain(handler) => {
                let result = handler.handle(req, res).await;
                if let Some(err) = res.take_forwarded() {
                    if let Err(returned) = result {
                        warn!(route = %self.route, error = %returned, "handler failed after forwarding an error");
                    }
                    return self.handle_error(req, res, err).await;
                }
                if res.is_sent() {
                    if let Err(err) = result {
                        warn!(route = %self.route, error = %err, "handler failed after sending, keeping the sent response");
                    }
                    return self.respond(req, res.snapshot()).await;
                }
                let err = match result {
                    Err(err) => err,
                    Ok(()) => Error::usage("the handler completed without sending a response"),
                };
                self.handle_error(req, res, Arc::new(err)).await
            }
            HandlerKind::Raw(handler) => match handler.handle(&req.event, &req.context).await {
                Ok(RawReply::Respond(value)) => match res.merge_raw(&value) {
                    Ok(merged) => self.respond(req, merged).await,
                    Err(err) => self.handle_error(req, res, Arc::new(err)).await,
                },
                Ok(RawReply::Fail(err)) => Outcome::failure(res.clone(), err),
                Err(err) => self.handle_error(req, res, Arc::new(err)).await,
            },
            HandlerKind::Authorizer(handler) => {
                match handler.handle(&req.event, &req.context).await {
                    Ok(RawReply::Respond(value)) => Outcome::raw(res.clone(), value),
                    Ok(RawReply::Fail(err)) => Outcome::failure(res.clone(), err),
                    Err(err) => self.handle_error(req, res, Arc::new(err)).await,
                }
            }
        }
    }

    /// A request middleware stopped the chain. The handler and response
    /// middleware are skipped.
    fn short_circuit(&self, res: &mut Response) -> Outcome {
        if res.is_sent() {
            debug!(route = %self.route, "request middleware answered the request");
            return Outcome::plain(res.snapshot());
        }
        warn!(route = %self.route, "request middleware stopped the chain without sending, answering 204");
        match res.send(None) {
            Ok(()) => Outcome::plain(res.snapshot()),
            Err(err) => Outcome::failure(res.clone(), err),
        }
    }

    async fn run_request_chain(
        &self,
        req: &mut Request,
        res: &mut Response,
    ) -> Result<Flow, Error> {
        for (index, middleware) in self.request.iter().enumerate() {
            let flow = match middleware {
                Middleware::Request(m) => m.process(req, res).await?,
                Middleware::ContainerRequest(m) => m.process(req.container()).await?,
                _ => Flow::Proceed,
            };
            if flow == Flow::Stop {
                debug!(route = %self.route, index, "request middleware stopped the chain");
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Proceed)
    }

    /// Run response middleware over a sent response.
    async fn respond(&self, req: &Request, mut sent: Response) -> Outcome {
        for middleware in &self.response {
            let result = match middleware {
                Middleware::Response(m) => m.process(req, &mut sent).await,
                Middleware::ContainerResponse(m) => m.process(req.container(), &mut sent).await,
                _ => Ok(Flow::Proceed),
            };
            match result {
                Ok(Flow::Proceed) => {}
                Ok(Flow::Stop) => {
                    debug!(route = %self.route, "response middleware stopped the chain");
                    break;
                }
                Err(err) => return self.handle_error(req, &sent, Arc::new(err)).await,
            }
        }
        Outcome::plain(sent)
    }

    /// Hand `err` to the error handler. Its response skips response middleware.
    async fn handle_error(&self, req: &Request, res: &Response, err: Arc<Error>) -> Outcome {
        let mut err_res = res.error_response(err);
        match self.error_handler.handle(req, &mut err_res).await {
            Ok(()) if err_res.is_sent() => Outcome::plain(err_res.snapshot()),
            Ok(()) => {
                error!(route = %self.route, "the error handler completed without sending a response");
                Outcome::failure(
                    err_res,
                    Error::usage("the error handler completed without sending a response"),
                )
            }
            Err(handler_err) => {
                error!(route = %self.route, error = %handler_err, "the error handler failed");
                Outcome::failure(err_res, handler_err)
            }
        }
    }

    /// Finally middleware never stop early: failures and stops are logged and
    /// the next one runs.
    async fn run_finally(&self, req: &Request, outcome: &Outcome) {
        for middleware in &self.finally {
            let result = match middleware {
                Middleware::Finally(m) => m.process(req, &outcome.response).await,
                Middleware::ContainerFinally(m) => {
                    m.process(req.container(), outcome.error(), &outcome.response)
                        .await
                }
                _ => Ok(Flow::Proceed),
            };
            match result {
                Ok(Flow::Proceed) => {}
                Ok(Flow::Stop) => {
                    debug!(route = %self.route, "finally middleware cannot stop the chain, proceeding")
                }
                Err(err) => error!(
                    route = %self.route,
                    error = %err,
                    "finally middleware failed, proceeding with the remaining finally middleware"
                ),
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("route", &self.route)
            .field("kind", &self.kind)
            .field("request", &self.request.len())
            .field("response", &self.response.len())
            .field("finally", &self.finally.len())
            .finish()
    }
}
