//! Application configuration and export.

use super::handler::HandlerConfig;
use super::settings::{Resolved, Settings};
use crate::container::{ComponentCatalog, ComponentSource, CONTEXT_KEY, ENVIRONMENT_KEY, EVENT_KEY};
use crate::error::Error;
use crate::function::{ErrorHandler, Exports, SimpleErrorHandler};
use crate::http::IntoHeaders;
use crate::middleware::Middleware;
use crate::routing::RoutingHandler;
use crate::runtime::pipeline::{Pipeline, PipelineConfig};
use crate::runtime::AppConfig;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, Dispatch};

/// Keys every request container registers itself.
const RESERVED_KEYS: [&str; 3] = [ENVIRONMENT_KEY, EVENT_KEY, CONTEXT_KEY];

/// Accumulates application-wide and per-handler configuration, then
/// [`export`](Application::export)s one [`RoutingHandler`] per handler name.
///
/// ```ignore
/// let mut app = Application::new(AppConfig::default());
/// app.with_headers([("Content-Type", "application/json")])?
///     .with_middleware(middleware::json());
/// app.on("users")?
///     .get("/users/{id}", handler_fn(|req, res| res.ok(json!({"id": req.event.path_parameter("id")}))))?;
/// let exports = app.export()?;
/// ```
pub struct Application {
    config: AppConfig,
    settings: Settings,
    handlers: Vec<HandlerConfig>,
    dispatch: Option<Dispatch>,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            settings: Settings::default(),
            handlers: Vec::new(),
            dispatch: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn with_headers(&mut self, headers: impl IntoHeaders) -> Result<&mut Self, Error> {
        self.settings.headers(headers, false)?;
        Ok(self)
    }

    pub fn with_override_headers(&mut self, headers: impl IntoHeaders) -> Result<&mut Self, Error> {
        self.settings.headers(headers, true)?;
        Ok(self)
    }

    pub fn with_error_handler(&mut self, handler: Arc<dyn ErrorHandler>) -> &mut Self {
        self.settings.error_handler(handler);
        self
    }

    pub fn with_middleware(&mut self, middleware: impl IntoIterator<Item = Middleware>) -> &mut Self {
        self.settings.middleware(middleware, false);
        self
    }

    /// Replace previously registered application middleware of every role.
    pub fn with_override_middleware(
        &mut self,
        middleware: impl IntoIterator<Item = Middleware>,
    ) -> &mut Self {
        self.settings.middleware(middleware, true);
        self
    }

    pub fn with_component(&mut self, name: impl Into<String>, source: ComponentSource) -> &mut Self {
        self.settings.component(name, source);
        self
    }

    pub fn with_component_catalog(
        &mut self,
        namespace: &str,
        catalog: &ComponentCatalog,
        recursive: bool,
    ) -> &mut Self {
        self.settings.catalog(namespace, catalog, recursive);
        self
    }

    /// Run every exported invocation under `dispatch` instead of the global
    /// subscriber.
    pub fn with_logger(&mut self, dispatch: impl Into<Dispatch>) -> &mut Self {
        self.dispatch = Some(dispatch.into());
        self
    }

    /// Start configuring the handler exported as `name`.
    pub fn on(&mut self, name: impl Into<String>) -> Result<&mut HandlerConfig, Error> {
        let name = name.into();
        if self.handlers.iter().any(|h| h.name() == name) {
            return Err(Error::config(format!(
                "handler '{}' is already registered",
                name
            )));
        }
        self.handlers.push(HandlerConfig::new(name));
        let index = self.handlers.len() - 1;
        Ok(&mut self.handlers[index])
    }

    /// Registered handler names, in registration order.
    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(HandlerConfig::name).collect()
    }

    /// Build the route pipelines of every handler.
    pub fn export(self) -> Result<Exports, Error> {
        let environment = Arc::new(self.config.environment);
        let slow_threshold = self.config.logging.slow_threshold();
        let default_error_handler: Arc<dyn ErrorHandler> = Arc::new(SimpleErrorHandler::new());
        let mut exports = Exports::new();

        for handler in self.handlers {
            let name = handler.name().to_string();
            let mut routes = HashMap::with_capacity(handler.routes.len());
            for (key, route) in handler.routes {
                let label = format!("{}:{}", name, key);
                let resolved = Resolved::new([&self.settings, &handler.settings, &route.settings]);

                let components = resolved.components();
                if let Some(reserved) = components
                    .iter()
                    .find(|c| RESERVED_KEYS.contains(&c.name.as_str()))
                {
                    return Err(Error::config(format!(
                        "component name '{}' is reserved, used by {}",
                        reserved.name, label
                    )));
                }
                let mut names = HashSet::new();
                if let Some(duplicate) = components.iter().find(|c| !names.insert(c.name.as_str())) {
                    return Err(Error::config(format!(
                        "component '{}' is registered more than once for {}",
                        duplicate.name, label
                    )));
                }

                let middleware = resolved.middleware();
                debug!(
                    route = %label,
                    middleware = middleware.len(),
                    components = components.len(),
                    "building route"
                );
                let pipeline = Pipeline::new(PipelineConfig {
                    route: label,
                    headers: resolved.headers(),
                    error_handler: resolved
                        .error_handler()
                        .unwrap_or_else(|| default_error_handler.clone()),
                    middleware,
                    components,
                    environment: environment.clone(),
                    slow_threshold,
                    kind: route.into_kind(),
                });
                routes.insert(key, pipeline);
            }
            info!(handler = %name, routes = routes.len(), "exported handler");
            exports.insert(RoutingHandler::new(name, routes, self.dispatch.clone()))?;
        }
        Ok(exports)
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("handlers", &self.handlers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Route;
    use crate::function::handler_fn;
    use crate::routing::RouteKey;

    #[test]
    fn test_duplicate_handler_name() {
        let mut app = Application::new(AppConfig::default());
        app.on("users").unwrap();
        let err = app.on("users").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(app.handler_names(), vec!["users"]);
    }

    #[test]
    fn test_export_builds_every_route() {
        let mut app = Application::new(AppConfig::default());
        app.on("users")
            .unwrap()
            .get("/users", handler_fn(|_, res| res.ok(None)))
            .unwrap()
            .use_handler(handler_fn(|_, res| res.not_found(None)))
            .unwrap();
        app.on("empty").unwrap();

        let exports = app.export().unwrap();
        assert_eq!(exports.names(), vec!["empty", "users"]);
        let users = exports.get("users").unwrap();
        assert_eq!(
            users.routes(),
            vec![RouteKey::http("GET", "/users"), RouteKey::any()]
        );
    }

    #[test]
    fn test_duplicate_component_across_scopes() {
        let mut app = Application::new(AppConfig::default());
        app.with_component("db", ComponentSource::shared(serde_json::json!(1)));
        app.on("users")
            .unwrap()
            .with_component("db", ComponentSource::shared(serde_json::json!(2)))
            .use_handler(handler_fn(|_, res| res.ok(None)))
            .unwrap();
        assert!(matches!(app.export(), Err(Error::Config(_))));
    }

    #[test]
    fn test_reserved_component_names_are_rejected() {
        for key in RESERVED_KEYS {
            let mut app = Application::new(AppConfig::default());
            app.on("users")
                .unwrap()
                .use_handler(
                    Route::new(handler_fn(|_, res| res.ok(None)))
                        .with_component(key, ComponentSource::shared(serde_json::json!(1))),
                )
                .unwrap();
            let err = app.export().unwrap_err();
            assert!(matches!(err, Error::Config(ref msg) if msg.contains(key)));
        }
    }
}
