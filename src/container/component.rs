//! Component lifecycle trait.

use super::Container;
use crate::error::Error;
use crate::http::{Context, Event};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

/// Upcast to `Any` so fetched components can be downcast to their concrete type.
pub trait AsAny: Any + Send + Sync {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A dependency managed by the [`Container`].
///
/// Both lifecycle hooks are optional:
///
/// 1. **Start** (`start`): called once, on the first fetch. Returning a
///    component replaces this one for every later fetch and for teardown.
/// 2. **Stop** (`stop`): called once when the container is torn down at the
///    end of the request.
///
/// ```rust,no_run
/// use funcpress::prelude::*;
/// use std::sync::Arc;
///
/// struct Database {
///     url: String,
/// }
///
/// #[async_trait]
/// impl Component for Database {
///     async fn start(&self, container: &Container) -> Result<Option<Arc<dyn Component>>, Error> {
///         let env = container.fetch_as::<serde_json::Value>("environment").await?;
///         tracing::info!(url = %self.url, stage = ?env.get("stage"), "connecting");
///         Ok(None)
///     }
///
///     async fn stop(&self) -> Result<(), Error> {
///         tracing::info!(url = %self.url, "disconnecting");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Component: AsAny {
    async fn start(&self, container: &Container) -> Result<Option<Arc<dyn Component>>, Error> {
        let _ = container;
        Ok(None)
    }

    async fn stop(&self) -> Result<(), Error> {
        Ok(())
    }
}

// Plain values injected into every container.
impl Component for serde_json::Value {}
impl Component for Event {}
impl Component for Context {}

impl std::fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Component")
    }
}
