//! Per-handler and per-route registration.

use super::settings::Settings;
use crate::container::{ComponentCatalog, ComponentSource};
use crate::error::Error;
use crate::function::{ErrorHandler, HandlerKind};
use crate::http::IntoHeaders;
use crate::middleware::Middleware;
use crate::routing::{RouteKey, Source};
use std::sync::Arc;

/// A handler bound to one route, with settings that apply to that route
/// only.
///
/// A bare [`HandlerKind`] converts into a route that picks up source
/// defaults on registration: cron and authorizer routes, and authorizer
/// handlers wherever they are registered, drop all inherited middleware.
/// Routes built with [`Route::new`] are registered exactly as configured.
#[derive(Clone)]
pub struct Route {
    kind: HandlerKind,
    pub(crate) settings: Settings,
    source_defaults: bool,
}

impl Route {
    pub fn new(kind: HandlerKind) -> Self {
        Self {
            kind,
            settings: Settings::default(),
            source_defaults: false,
        }
    }

    /// A route whose inherited middleware are dropped.
    pub fn isolated(kind: HandlerKind) -> Self {
        let mut route = Self::new(kind);
        route.settings.isolate_middleware();
        route
    }

    pub fn kind(&self) -> &HandlerKind {
        &self.kind
    }

    pub fn with_headers(mut self, headers: impl IntoHeaders) -> Result<Self, Error> {
        self.settings.headers(headers, false)?;
        Ok(self)
    }

    pub fn with_override_headers(mut self, headers: impl IntoHeaders) -> Result<Self, Error> {
        self.settings.headers(headers, true)?;
        Ok(self)
    }

    pub fn with_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.settings.error_handler(handler);
        self
    }

    pub fn with_middleware(mut self, middleware: impl IntoIterator<Item = Middleware>) -> Self {
        self.settings.middleware(middleware, false);
        self
    }

    /// Replace every inherited middleware, of every role.
    pub fn with_override_middleware(mut self, middleware: impl IntoIterator<Item = Middleware>) -> Self {
        self.settings.middleware(middleware, true);
        self
    }

    pub fn with_component(mut self, name: impl Into<String>, source: ComponentSource) -> Self {
        self.settings.component(name, source);
        self
    }

    pub fn with_component_catalog(
        mut self,
        namespace: &str,
        catalog: &ComponentCatalog,
        recursive: bool,
    ) -> Self {
        self.settings.catalog(namespace, catalog, recursive);
        self
    }

    fn apply_source_defaults(mut self, source: Source) -> Self {
        let isolate = matches!(source, Source::Cron | Source::Authorizer)
            || matches!(self.kind, HandlerKind::Authorizer(_));
        if self.source_defaults && isolate {
            self.settings.isolate_middleware();
        }
        self
    }

    pub(crate) fn into_kind(self) -> HandlerKind {
        self.kind
    }
}

impl From<HandlerKind> for Route {
    fn from(kind: HandlerKind) -> Self {
        Self {
            source_defaults: true,
            ..Self::new(kind)
        }
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route").field("kind", &self.kind).finish()
    }
}

/// Configuration of one named handler, obtained from
/// [`Application::on`](super::Application::on).
pub struct HandlerConfig {
    name: String,
    pub(crate) settings: Settings,
    pub(crate) routes: Vec<(RouteKey, Route)>,
}

impl HandlerConfig {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: Settings::default(),
            routes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_headers(&mut self, headers: impl IntoHeaders) -> Result<&mut Self, Error> {
        self.settings.headers(headers, false)?;
        Ok(self)
    }

    /// Replace the application headers for this handler.
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

    /// Replace every application middleware for this handler, of every role.
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

    /// Default route, used when no more specific route matches.
    pub fn use_handler(&mut self, route: impl Into<Route>) -> Result<&mut Self, Error> {
        self.use_for(Source::Any, route)
    }

    /// Route for every event of `source`.
    pub fn use_for(&mut self, source: Source, route: impl Into<Route>) -> Result<&mut Self, Error> {
        self.route(RouteKey::source(source), route.into())
    }

    pub fn cron(&mut self, route: impl Into<Route>) -> Result<&mut Self, Error> {
        self.use_for(Source::Cron, route)
    }

    pub fn authorizer(&mut self, route: impl Into<Route>) -> Result<&mut Self, Error> {
        self.use_for(Source::Authorizer, route)
    }

    pub fn get(&mut self, path: &str, route: impl Into<Route>) -> Result<&mut Self, Error> {
        self.route(RouteKey::http("GET", path), route.into())
    }

    pub fn post(&mut self, path: &str, route: impl Into<Route>) -> Result<&mut Self, Error> {
        self.route(RouteKey::http("POST", path), route.into())
    }

    pub fn put(&mut self, path: &str, route: impl Into<Route>) -> Result<&mut Self, Error> {
        self.route(RouteKey::http("PUT", path), route.into())
    }

    pub fn patch(&mut self, path: &str, route: impl Into<Route>) -> Result<&mut Self, Error> {
        self.route(RouteKey::http("PATCH", path), route.into())
    }

    pub fn delete(&mut self, path: &str, route: impl Into<Route>) -> Result<&mut Self, Error> {
        self.route(RouteKey::http("DELETE", path), route.into())
    }

    fn route(&mut self, key: RouteKey, route: Route) -> Result<&mut Self, Error> {
        if self.routes.iter().any(|(existing, _)| *existing == key) {
            return Err(Error::config(format!(
                "route {} is already registered on handler '{}'",
                key, self.name
            )));
        }
        let route = route.apply_source_defaults(key.source);
        self.routes.push((key, route));
        Ok(self)
    }
}

impl std::fmt::Debug for HandlerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let routes: Vec<String> = self.routes.iter().map(|(key, _)| key.to_string()).collect();
        f.debug_struct("HandlerConfig")
            .field("name", &self.name)
            .field("routes", &routes)
            .finish()
    }
}
