//! Application and handler registration.

mod application;
mod handler;
mod settings;

pub use application::Application;
pub use handler::{HandlerConfig, Route};
