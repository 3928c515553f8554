//! Middleware roles.
//!
//! Middleware come in three roles that run at different points of an
//! invocation:
//!
//! - **Request** middleware run before the handler, in registration order.
//! - **Response** middleware run on the sent response, in reverse
//!   registration order. They are the only place `Response::update` is allowed.
//! - **Finally** middleware always run last, in reverse registration order,
//!   whatever happened before them. Their failures are logged and ignored.
//!
//! Each role also has a container-aware form that receives the request's
//! [`Container`] instead of the request.
//!
//! Every middleware returns a [`Flow`]: `Proceed` continues with the next
//! middleware, `Stop` skips the rest of its chain. An `Err` hands the error to
//! the error handler (request and response middleware only).

mod json;
mod logging;
mod path_params;

pub use json::json;
pub use logging::logging;
pub use path_params::path_params;

use crate::container::Container;
use crate::error::Error;
use crate::http::{Request, Response};
use async_trait::async_trait;
use std::sync::Arc;

/// Whether a chain continues after a middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Proceed,
    Stop,
}

impl From<bool> for Flow {
    fn from(proceed: bool) -> Self {
        if proceed {
            Flow::Proceed
        } else {
            Flow::Stop
        }
    }
}

#[async_trait]
pub trait RequestMiddleware: Send + Sync {
    async fn process(&self, req: &mut Request, res: &mut Response) -> Result<Flow, Error>;
}

#[async_trait]
pub trait ResponseMiddleware: Send + Sync {
    async fn process(&self, req: &Request, res: &mut Response) -> Result<Flow, Error>;
}

/// Runs after everything else. `res` is the response that is delivered, or
/// the last response state when a raw error is delivered instead.
#[async_trait]
pub trait FinallyMiddleware: Send + Sync {
    async fn process(&self, req: &Request, res: &Response) -> Result<Flow, Error>;
}

#[async_trait]
pub trait ContainerRequestMiddleware: Send + Sync {
    async fn process(&self, container: &Container) -> Result<Flow, Error>;
}

#[async_trait]
pub trait ContainerResponseMiddleware: Send + Sync {
    async fn process(&self, container: &Container, res: &mut Response) -> Result<Flow, Error>;
}

/// `error` is the error that was handled or is about to be delivered raw.
#[async_trait]
pub trait ContainerFinallyMiddleware: Send + Sync {
    async fn process(
        &self,
        container: &Container,
        error: Option<&Error>,
        res: &Response,
    ) -> Result<Flow, Error>;
}

/// The role a middleware plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Request,
    Response,
    Finally,
}

/// A registered middleware, tagged with its role.
#[derive(Clone)]
pub enum Middleware {
    Request(Arc<dyn RequestMiddleware>),
    Response(Arc<dyn ResponseMiddleware>),
    Finally(Arc<dyn FinallyMiddleware>),
    ContainerRequest(Arc<dyn ContainerRequestMiddleware>),
    ContainerResponse(Arc<dyn ContainerResponseMiddleware>),
    ContainerFinally(Arc<dyn ContainerFinallyMiddleware>),
}

impl Middleware {
    pub fn request(middleware: impl RequestMiddleware + 'static) -> Self {
        Middleware::Request(Arc::new(middleware))
    }

    pub fn response(middleware: impl ResponseMiddleware + 'static) -> Self {
        Middleware::Response(Arc::new(middleware))
    }

    pub fn finally(middleware: impl FinallyMiddleware + 'static) -> Self {
        Middleware::Finally(Arc::new(middleware))
    }

    pub fn container_request(middleware: impl ContainerRequestMiddleware + 'static) -> Self {
        Middleware::ContainerRequest(Arc::new(middleware))
    }

    pub fn container_response(middleware: impl ContainerResponseMiddleware + 'static) -> Self {
        Middleware::ContainerResponse(Arc::new(middleware))
    }

    pub fn container_finally(middleware: impl ContainerFinallyMiddleware + 'static) -> Self {
        Middleware::ContainerFinally(Arc::new(middleware))
    }

    pub fn role(&self) -> Role {
        match self {
            Middleware::Request(_) | Middleware::ContainerRequest(_) => Role::Request,
            Middleware::Response(_) | Middleware::ContainerResponse(_) => Role::Response,
            Middleware::Finally(_) | Middleware::ContainerFinally(_) => Role::Finally,
        }
    }

    pub fn is_container_aware(&self) -> bool {
        matches!(
            self,
            Middleware::ContainerRequest(_)
                | Middleware::ContainerResponse(_)
                | Middleware::ContainerFinally(_)
        )
    }
}

impl std::fmt::Debug for Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Middleware")
            .field("role", &self.role())
            .field("container", &self.is_container_aware())
            .finish()
    }
}

struct RequestFn<F>(F);

#[async_trait]
impl<F> RequestMiddleware for RequestFn<F>
where
    F: Fn(&mut Request, &mut Response) -> Result<Flow, Error> + Send + Sync,
{
    async fn process(&self, req: &mut Request, res: &mut Response) -> Result<Flow, Error> {
        (self.0)(req, res)
    }
}

struct ResponseFn<F>(F);

#[async_trait]
impl<F> ResponseMiddleware for ResponseFn<F>
where
    F: Fn(&Request, &mut Response) -> Result<Flow, Error> + Send + Sync,
{
    async fn process(&self, req: &Request, res: &mut Response) -> Result<Flow, Error> {
        (self.0)(req, res)
    }
}

struct FinallyFn<F>(F);

#[async_trait]
impl<F> FinallyMiddleware for FinallyFn<F>
where
    F: Fn(&Request, &Response) -> Result<Flow, Error> + Send + Sync,
{
    async fn process(&self, req: &Request, res: &Response) -> Result<Flow, Error> {
        (self.0)(req, res)
    }
}

/// Request middleware from a synchronous closure.
pub fn request_fn<F>(f: F) -> Middleware
where
    F: Fn(&mut Request, &mut Response) -> Result<Flow, Error> + Send + Sync + 'static,
{
    Middleware::request(RequestFn(f))
}

/// Response middleware from a synchronous closure.
pub fn response_fn<F>(f: F) -> Middleware
where
    F: Fn(&Request, &mut Response) -> Result<Flow, Error> + Send + Sync + 'static,
{
    Middleware::response(ResponseFn(f))
}

/// Finally middleware from a synchronous closure.
pub fn finally_fn<F>(f: F) -> Middleware
where
    F: Fn(&Request, &Response) -> Result<Flow, Error> + Send + Sync + 'static,
{
    Middleware::finally(FinallyFn(f))
}
