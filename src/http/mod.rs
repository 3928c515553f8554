//! Request-side and response-side types handed to handlers and middleware.

mod event;
mod request;
mod response;

pub use event::{Context, Event};
pub use request::Request;
pub use response::{Headers, IntoHeaders, PlainResponse, Response, StatusCode};
