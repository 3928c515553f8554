//! Request wrapper handed to handlers and middleware.

use super::event::{Context, Event};
use crate::container::{Component, Container};
use crate::error::Error;
use std::sync::Arc;

/// An inbound invocation: the raw event, its context and the request's container.
#[derive(Clone)]
pub struct Request {
    /// Raw event. Request middleware may rewrite it (e.g. decode the body).
    pub event: Event,
    /// Invocation context.
    pub context: Context,
    container: Arc<Container>,
}

impl Request {
    pub fn new(event: Event, context: Context, container: Arc<Container>) -> Self {
        Self {
            event,
            context,
            container,
        }
    }

    /// Container scoped to this request.
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Fetch a started component and downcast it.
    pub async fn component<T: Component>(&self, key: &str) -> Result<Arc<T>, Error> {
        self.container.fetch_as::<T>(key).await
    }

    /// HTTP method of the event, if it is an HTTP event.
    pub fn method(&self) -> Option<&str> {
        self.event.http_method()
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("event", &self.event)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
