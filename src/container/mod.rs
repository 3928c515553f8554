//! Request-scoped dependency container with lazily started components.

mod catalog;
mod component;
mod container;

pub use catalog::{ComponentCatalog, ComponentRegistration, ComponentSource};
pub use component::{AsAny, Component};
pub use container::Container;

/// Key under which the application environment is injected.
pub const ENVIRONMENT_KEY: &str = "environment";
/// Key under which the raw event is injected.
pub const EVENT_KEY: &str = "serverless/event";
/// Key under which the raw context is injected.
pub const CONTEXT_KEY: &str = "serverless/context";
