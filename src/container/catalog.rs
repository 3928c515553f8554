//! Component registrations and namespaced catalogs of them.

use super::component::Component;
use std::fmt;
use std::sync::Arc;

type Factory = Arc<dyn Fn() -> Arc<dyn Component> + Send + Sync>;

/// Where a container gets its component from on each request.
#[derive(Clone)]
pub enum ComponentSource {
    /// The same instance is registered in every request's container.
    Shared(Arc<dyn Component>),
    /// A fresh instance is built for every request's container.
    Factory(Factory),
}

impl ComponentSource {
    pub fn shared<C: Component>(component: C) -> Self {
        ComponentSource::Shared(Arc::new(component))
    }

    pub fn factory<C, F>(factory: F) -> Self
    where
        C: Component,
        F: Fn() -> C + Send + Sync + 'static,
    {
        ComponentSource::Factory(Arc::new(move || Arc::new(factory()) as Arc<dyn Component>))
    }

    pub(crate) fn instantiate(&self) -> Arc<dyn Component> {
        match self {
            ComponentSource::Shared(component) => component.clone(),
            ComponentSource::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for ComponentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentSource::Shared(_) => f.write_str("Shared"),
            ComponentSource::Factory(_) => f.write_str("Factory"),
        }
    }
}

/// A named component registration.
#[derive(Debug, Clone)]
pub struct ComponentRegistration {
    pub name: String,
    pub source: ComponentSource,
}

impl ComponentRegistration {
    pub fn new(name: impl Into<String>, source: ComponentSource) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

/// An explicit tree of components, registered under a namespace.
///
/// Entries are named `namespace/name`. Nested catalogs contribute
/// `namespace/sub/name` entries when registered recursively and are skipped
/// otherwise.
#[derive(Debug, Clone, Default)]
pub struct ComponentCatalog {
    entries: Vec<(String, ComponentSource)>,
    nested: Vec<(String, ComponentCatalog)>,
}

impl ComponentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, source: ComponentSource) -> Self {
        self.entries.push((name.into(), source));
        self
    }

    pub fn with_shared<C: Component>(self, name: impl Into<String>, component: C) -> Self {
        self.with(name, ComponentSource::shared(component))
    }

    pub fn with_factory<C, F>(self, name: impl Into<String>, factory: F) -> Self
    where
        C: Component,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.with(name, ComponentSource::factory(factory))
    }

    /// Add a sub-catalog, the equivalent of a sub-folder.
    pub fn nested(mut self, folder: impl Into<String>, catalog: ComponentCatalog) -> Self {
        self.nested.push((folder.into(), catalog));
        self
    }

    /// Flatten into registrations under `namespace`.
    pub fn registrations(&self, namespace: &str, recursive: bool) -> Vec<ComponentRegistration> {
        let mut registrations: Vec<ComponentRegistration> = self
            .entries
            .iter()
            .map(|(name, source)| {
                ComponentRegistration::new(format!("{}/{}", namespace, name), source.clone())
            })
            .collect();

        if recursive {
            for (folder, catalog) in &self.nested {
                registrations
                    .extend(catalog.registrations(&format!("{}/{}", namespace, folder), true));
            }
        }
        registrations
    }
}
