//! Exported handlers, keyed by handler name.

use crate::error::Error;
use crate::http::{Context, Event};
use crate::routing::RoutingHandler;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::error;

/// The result of exporting an application: one [`RoutingHandler`] per
/// registered handler name.
#[derive(Debug, Clone, Default)]
pub struct Exports {
    handlers: BTreeMap<String, RoutingHandler>,
}

impl Exports {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, handler: RoutingHandler) -> Result<(), Error> {
        let name = handler.name().to_string();
        if self.handlers.contains_key(&name) {
            return Err(Error::config(format!(
                "handler '{}' is already exported",
                name
            )));
        }
        self.handlers.insert(name, handler);
        Ok(())
    }

    /// Look up an exported handler.
    pub fn get(&self, name: &str) -> Option<&RoutingHandler> {
        self.handlers.get(name)
    }

    /// Exported handler names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RoutingHandler)> {
        self.handlers.iter().map(|(name, h)| (name.as_str(), h))
    }

    /// Invoke the handler exported as `name`.
    pub async fn invoke(&self, name: &str, event: Event, context: Context) -> Result<Value, Error> {
        let Some(handler) = self.handlers.get(name) else {
            error!(handler = %name, "handler is not exported");
            return Err(Error::usage(format!("handler '{}' is not exported", name)));
        };
        handler.invoke(event, context).await
    }
}

impl IntoIterator for Exports {
    type Item = (String, RoutingHandler);
    type IntoIter = std::collections::btree_map::IntoIter<String, RoutingHandler>;

    fn into_iter(self) -> Self::IntoIter {
        self.handlers.into_iter()
    }
}
