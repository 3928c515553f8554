//! Handlers, error handlers and the exported handler registry.

pub mod authorizer;
pub mod error_handler;
pub mod handler;
pub mod registry;

pub use authorizer::{create_authorizer_response, AuthorizerOptions, Effect};
pub use error_handler::{error_handler_fn, ErrorHandler, SimpleErrorHandler};
pub use handler::{authorizer_fn, handler_fn, raw_fn, Handler, HandlerKind, RawHandler, RawReply};
pub use registry::Exports;
