//! Middleware that populate and tear down each request's container.

use crate::container::{ComponentRegistration, CONTEXT_KEY, ENVIRONMENT_KEY, EVENT_KEY};
use crate::error::Error;
use crate::http::{Request, Response};
use crate::middleware::{FinallyMiddleware, Flow, RequestMiddleware};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

/// First request middleware of every route.
pub(crate) struct StartContainer {
    environment: Arc<Value>,
    components: Vec<ComponentRegistration>,
}

impl StartContainer {
    pub(crate) fn new(environment: Arc<Value>, components: Vec<ComponentRegistration>) -> Self {
        Self {
            environment,
            components,
        }
    }
}

#[async_trait]
impl RequestMiddleware for StartContainer {
    async fn process(&self, req: &mut Request, _res: &mut Response) -> Result<Flow, Error> {
        let container = req.container();
        container
            .register(ENVIRONMENT_KEY, self.environment.clone())
            .await?;
        container
            .register(EVENT_KEY, Arc::new(req.event.clone()))
            .await?;
        container
            .register(CONTEXT_KEY, Arc::new(req.context.clone()))
            .await?;
        for registration in &self.components {
            container
                .register(registration.name.clone(), registration.source.instantiate())
                .await?;
        }
        trace!(components = self.components.len(), "container ready");
        Ok(Flow::Proceed)
    }
}

/// Last finally middleware of every route.
pub(crate) struct StopContainer;

#[async_trait]
impl FinallyMiddleware for StopContainer {
    async fn process(&self, req: &Request, _res: &Response) -> Result<Flow, Error> {
        req.container().stop().await?;
        Ok(Flow::Proceed)
    }
}
