//! Event classification and route selection.

mod handler;
mod route;

pub use handler::RoutingHandler;
pub use route::{RouteKey, Source, ANY};
