//! The exported entry point of a named handler.

use super::route::RouteKey;
use crate::error::Error;
use crate::http::{Context, Event, PlainResponse, StatusCode};
use crate::runtime::pipeline::{panic_message, Pipeline};
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, Dispatch};

/// Dispatches events to the routes registered on one handler name.
///
/// Cloning is cheap; clones share the routes.
#[derive(Clone)]
pub struct RoutingHandler {
    name: String,
    routes: Arc<HashMap<RouteKey, Pipeline>>,
    dispatch: Option<Dispatch>,
}

impl RoutingHandler {
    pub(crate) fn new(
        name: impl Into<String>,
        routes: HashMap<RouteKey, Pipeline>,
        dispatch: Option<Dispatch>,
    ) -> Self {
        Self {
            name: name.into(),
            routes: Arc::new(routes),
            dispatch,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered route keys, sorted.
    pub fn routes(&self) -> Vec<RouteKey> {
        let mut keys: Vec<RouteKey> = self.routes.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Handle one event.
    ///
    /// Events matching no route are answered with a bare 404. Errors raised
    /// while selecting a route, error handler failures, raw handler failures
    /// and panics come back as `Err`.
    pub async fn invoke(&self, event: Event, context: Context) -> Result<Value, Error> {
        match &self.dispatch {
            Some(dispatch) => {
                self.route(event, context)
                    .with_subscriber(dispatch.clone())
                    .await
            }
            None => self.route(event, context).await,
        }
    }

    /// Handle one event and report the outcome through `callback`, which is
    /// invoked exactly once.
    pub async fn call<F>(&self, event: Event, context: Context, callback: F)
    where
        F: FnOnce(Option<Error>, Option<Value>),
    {
        match self.invoke(event, context).await {
            Ok(value) => callback(None, Some(value)),
            Err(err) => callback(Some(err), None),
        }
    }

    fn find(&self, key: &RouteKey) -> Option<&Pipeline> {
        key.fallbacks().iter().find_map(|k| self.routes.get(k))
    }

    async fn route(&self, event: Event, context: Context) -> Result<Value, Error> {
        let key = RouteKey::from_event(&event).map_err(|err| {
            error!(handler = %self.name, error = %err, "unexpected error while selecting route");
            err
        })?;

        let Some(pipeline) = self.find(&key) else {
            error!(handler = %self.name, "failed to find route matching {}", key);
            return Ok(serde_json::to_value(PlainResponse::status(StatusCode::NOT_FOUND))?);
        };
        debug!(handler = %self.name, event = %key, route = %pipeline.route(), "routing event");

        // Pipelines catch handler and middleware panics themselves; a panic
        // raised by a finally middleware still lands here.
        match AssertUnwindSafe(pipeline.run(event, context))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(handler = %self.name, route = %pipeline.route(), panic = %message, "route panicked");
                Err(Error::unexpected(format!(
                    "route {} panicked: {}",
                    pipeline.route(),
                    message
                )))
            }
        }
    }
}

impl std::fmt::Debug for RoutingHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingHandler")
            .field("name", &self.name)
            .field("routes", &self.routes())
            .finish()
    }
}
