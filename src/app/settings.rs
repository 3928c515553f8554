//! Scoped configuration entries.
//!
//! Each scope (application, handler, route) keeps an ordered list of
//! entries. Resolving a setting concatenates the scopes from least to most
//! specific; an overwriting entry discards everything of its kind seen before
//! it.

use crate::container::{ComponentCatalog, ComponentRegistration, ComponentSource};
use crate::error::Error;
use crate::function::ErrorHandler;
use crate::http::{Headers, IntoHeaders};
use crate::middleware::Middleware;
use std::sync::Arc;

#[derive(Clone)]
enum Setting {
    Headers(Headers),
    ErrorHandler(Arc<dyn ErrorHandler>),
    Middleware(Vec<Middleware>),
    Component(ComponentRegistration),
}

#[derive(Clone)]
struct Entry {
    overwrite: bool,
    setting: Setting,
}

/// Entries of one scope, in registration order.
#[derive(Clone, Default)]
pub(crate) struct Settings {
    entries: Vec<Entry>,
}

impl Settings {
    fn push(&mut self, overwrite: bool, setting: Setting) {
        self.entries.push(Entry { overwrite, setting });
    }

    pub(crate) fn headers(&mut self, headers: impl IntoHeaders, overwrite: bool) -> Result<(), Error> {
        let headers = headers.into_headers()?;
        self.push(overwrite, Setting::Headers(headers));
        Ok(())
    }

    /// Error handlers always overwrite.
    pub(crate) fn error_handler(&mut self, handler: Arc<dyn ErrorHandler>) {
        self.push(true, Setting::ErrorHandler(handler));
    }

    /// An overwriting entry clears middleware of every role, not only the
    /// roles it contains.
    pub(crate) fn middleware(&mut self, middleware: impl IntoIterator<Item = Middleware>, overwrite: bool) {
        self.push(overwrite, Setting::Middleware(middleware.into_iter().collect()));
    }

    /// Drop middleware inherited from less specific scopes while keeping the
    /// entries already recorded here.
    pub(crate) fn isolate_middleware(&mut self) {
        self.entries.insert(
            0,
            Entry {
                overwrite: true,
                setting: Setting::Middleware(Vec::new()),
            },
        );
    }

    pub(crate) fn component(&mut self, name: impl Into<String>, source: ComponentSource) {
        self.push(false, Setting::Component(ComponentRegistration::new(name, source)));
    }

    pub(crate) fn catalog(&mut self, namespace: &str, catalog: &ComponentCatalog, recursive: bool) {
        for registration in catalog.registrations(namespace, recursive) {
            self.push(false, Setting::Component(registration));
        }
    }
}

/// Settings of several scopes resolved together, least specific first.
pub(crate) struct Resolved<'a> {
    scopes: Vec<&'a Settings>,
}

impl<'a> Resolved<'a> {
    pub(crate) fn new(scopes: impl IntoIterator<Item = &'a Settings>) -> Self {
        Self {
            scopes: scopes.into_iter().collect(),
        }
    }

    fn find<T>(&self, pick: impl Fn(&'a Setting) -> Option<T>) -> Vec<T> {
        let mut matching = Vec::new();
        for entry in self.scopes.iter().flat_map(|scope| scope.entries.iter()) {
            if let Some(value) = pick(&entry.setting) {
                if entry.overwrite {
                    matching.clear();
                }
                matching.push(value);
            }
        }
        matching
    }

    /// Headers merged in order; later keys win.
    pub(crate) fn headers(&self) -> Headers {
        self.find(|setting| match setting {
            Setting::Headers(headers) => Some(headers),
            _ => None,
        })
        .into_iter()
        .fold(Headers::new(), |mut merged, headers| {
            merged.extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));
            merged
        })
    }

    pub(crate) fn error_handler(&self) -> Option<Arc<dyn ErrorHandler>> {
        self.find(|setting| match setting {
            Setting::ErrorHandler(handler) => Some(handler.clone()),
            _ => None,
        })
        .pop()
    }

    pub(crate) fn middleware(&self) -> Vec<Middleware> {
        self.find(|setting| match setting {
            Setting::Middleware(middleware) => Some(middleware.iter().cloned()),
            _ => None,
        })
        .into_iter()
        .flatten()
        .collect()
    }

    pub(crate) fn components(&self) -> Vec<ComponentRegistration> {
        self.find(|setting| match setting {
            Setting::Component(registration) => Some(registration.clone()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::SimpleErrorHandler;
    use crate::middleware::{finally_fn, request_fn, response_fn, Flow, Role};
    use serde_json::json;

    fn request() -> Middleware {
        request_fn(|_, _| Ok(Flow::Proceed))
    }

    fn response() -> Middleware {
        response_fn(|_, _| Ok(Flow::Proceed))
    }

    fn finally() -> Middleware {
        finally_fn(|_, _| Ok(Flow::Proceed))
    }

    #[test]
    fn test_headers_merge_across_scopes() {
        let mut global = Settings::default();
        global.headers([("A", "1"), ("B", "1")], false).unwrap();
        let mut handler = Settings::default();
        handler.headers([("B", "2")], false).unwrap();

        let headers = Resolved::new([&global, &handler]).headers();
        assert_eq!(headers.get("A").map(String::as_str), Some("1"));
        assert_eq!(headers.get("B").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_override_headers_replace_outer_scopes() {
        let mut global = Settings::default();
        global.headers([("A", "1")], false).unwrap();
        let mut handler = Settings::default();
        handler.headers([("B", "2")], true).unwrap();

        let headers = Resolved::new([&global, &handler]).headers();
        assert!(!headers.contains_key("A"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_invalid_headers_are_rejected() {
        let mut global = Settings::default();
        let err = global.headers(json!({"A": 1}), false).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_last_error_handler_wins() {
        let first: Arc<dyn ErrorHandler> = Arc::new(SimpleErrorHandler::new());
        let second: Arc<dyn ErrorHandler> = Arc::new(SimpleErrorHandler::new());
        let mut global = Settings::default();
        global.error_handler(first);
        let mut handler = Settings::default();
        handler.error_handler(second.clone());

        let resolved = Resolved::new([&global, &handler]).error_handler().unwrap();
        assert!(Arc::ptr_eq(&resolved, &second));
        assert!(Resolved::new([&Settings::default()]).error_handler().is_none());
    }

    #[test]
    fn test_middleware_concatenate_in_scope_order() {
        let mut global = Settings::default();
        global.middleware([request(), response()], false);
        let mut handler = Settings::default();
        handler.middleware([finally()], false);

        let roles: Vec<Role> = Resolved::new([&global, &handler])
            .middleware()
            .iter()
            .map(Middleware::role)
            .collect();
        assert_eq!(roles, vec![Role::Request, Role::Response, Role::Finally]);
    }

    #[test]
    fn test_middleware_override_clears_every_role() {
        let mut global = Settings::default();
        global.middleware([request(), response(), finally()], false);
        let mut handler = Settings::default();
        handler.middleware([response()], true);

        let roles: Vec<Role> = Resolved::new([&global, &handler])
            .middleware()
            .iter()
            .map(Middleware::role)
            .collect();
        assert_eq!(roles, vec![Role::Response]);
    }

    #[test]
    fn test_components_accumulate() {
        let mut global = Settings::default();
        global.component("a", ComponentSource::shared(json!(1)));
        let mut route = Settings::default();
        route.catalog(
            "lib",
            &ComponentCatalog::new().with_shared("b", json!(2)),
            false,
        );

        let names: Vec<String> = Resolved::new([&global, &route])
            .components()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["a", "lib/b"]);
    }
}
