//! # funcpress - middleware pipelines for serverless functions
//!
//! funcpress wraps small handler functions in a request lifecycle: request
//! middleware, the handler, response middleware, a central error handler and
//! finally middleware, with a request-scoped dependency container and
//! event routing by source, path and method.
//!
//! ## Architecture
//!
//! ```text
//!   event ──▶ RoutingHandler ── source.path.method ──▶ Pipeline
//!                                                        │
//!     ┌──────────────────────────────────────────────────┘
//!     ▼
//!   request middleware (FIFO) ──▶ handler ──▶ response middleware (LIFO)
//!            │                       │                 │
//!            └───────── error ───────┴───── error ─────┴──▶ error handler
//!                                                        │
//!   finally middleware (LIFO, always) ◀──────────────────┘
//!            │
//!            ▼
//!   { statusCode, headers, body }
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use funcpress::prelude::*;
//! use serde_json::json;
//!
//! #[handler]
//! async fn get_user(req: &mut Request, res: &mut Response) -> Result<(), Error> {
//!     let id = req.event.path_parameter("id").unwrap_or_default().to_string();
//!     res.ok(json!({ "id": id }))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let mut app = Application::new(AppConfig::default());
//!     app.with_headers([("Content-Type", "application/json")])?
//!         .with_middleware(middleware::json());
//!     app.on("users")?
//!         .get("/users/{id}", HandlerKind::plain(GetUser))?;
//!
//!     let exports = app.export()?;
//!     let event = Event::http("GET", "/users/{id}").with_path_parameter("id", "42");
//!     let result = exports.invoke("users", event, Context::default()).await?;
//!     println!("{}", result);
//!     Ok(())
//! }
//! ```
//!
//! ## Components
//!
//! Components registered on the application, a handler or a route are started
//! lazily on first fetch and stopped after the finally middleware of every
//! invocation. The environment, the raw event and the raw context are always
//! available under [`container::ENVIRONMENT_KEY`], [`container::EVENT_KEY`] and
//! [`container::CONTEXT_KEY`].

pub mod app;
pub mod container;
pub mod error;
pub mod function;
pub mod http;
pub mod middleware;
pub mod routing;
pub mod runtime;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::app::{Application, HandlerConfig, Route};
    pub use crate::container::{Component, ComponentCatalog, ComponentSource, Container};
    pub use crate::error::{ApplicationError, Error};
    pub use crate::function::{
        authorizer_fn, create_authorizer_response, error_handler_fn, handler_fn, raw_fn,
        AuthorizerOptions, ErrorHandler, Exports, Handler, HandlerKind, RawHandler, RawReply,
        SimpleErrorHandler,
    };
    pub use crate::http::{Context, Event, Request, Response, StatusCode};
    pub use crate::middleware::{self, finally_fn, request_fn, response_fn, Flow, Middleware};
    pub use crate::routing::{RoutingHandler, Source};
    pub use crate::runtime::{AppConfig, ConfigLoader, LoggingConfig};
    pub use async_trait::async_trait;
    pub use funcpress_macro::handler;
}

// Re-export for convenience
pub use app::Application;
pub use error::{ApplicationError, Error};
pub use function::Exports;
pub use funcpress_macro::handler;
pub use routing::RoutingHandler;
pub use runtime::AppConfig;
