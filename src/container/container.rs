//! Keyed component registry with lazy start and single teardown.

use super::component::Component;
use crate::error::Error;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, error, trace};

tokio::task_local! {
    /// Keys whose `start` is running on the current task.
    static STARTING: Vec<String>;
}

struct Entry {
    component: Arc<dyn Component>,
    /// Set once `start` succeeds; concurrent fetchers wait on the same start.
    instance: Arc<OnceCell<Arc<dyn Component>>>,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Entry>,
    /// Keys in the order they were first fetched.
    fetched: Vec<String>,
}

/// Container managing the lifecycle of the components registered with it.
///
/// ```rust,no_run
/// # use funcpress::prelude::*;
/// # use std::sync::Arc;
/// # async fn demo() -> Result<(), Error> {
/// let container = Container::new();
/// container
///     .register("config/stage", Arc::new(serde_json::json!("dev")))
///     .await?;
///
/// let stage = container.fetch_as::<serde_json::Value>("config/stage").await?;
/// assert_eq!(*stage, "dev");
///
/// container.stop().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Container {
    state: RwLock<State>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an unstarted component under `key`.
    pub async fn register(
        &self,
        key: impl Into<String>,
        component: Arc<dyn Component>,
    ) -> Result<Arc<dyn Component>, Error> {
        let key = key.into();
        let mut state = self.state.write().await;

        if state.entries.contains_key(&key) {
            return Err(Error::DuplicateKey(key));
        }

        trace!(component = %key, "registering component");
        state.entries.insert(
            key,
            Entry {
                component: component.clone(),
                instance: Arc::new(OnceCell::new()),
            },
        );
        Ok(component)
    }

    /// Fetch a started component, starting it on first use.
    ///
    /// Fetches that arrive while `start` is pending wait for it and receive
    /// the same instance.
    pub async fn fetch(&self, key: &str) -> Result<Arc<dyn Component>, Error> {
        let (component, instance) = {
            let state = self.state.read().await;
            let entry = state.entries.get(key).ok_or_else(|| {
                error!(component = %key, "could not find component");
                Error::ComponentNotFound(key.to_string())
            })?;
            (entry.component.clone(), entry.instance.clone())
        };

        if let Some(started) = instance.get() {
            return Ok(started.clone());
        }

        let mut starting = STARTING.try_with(Clone::clone).unwrap_or_default();
        if starting.iter().any(|k| k == key) {
            return Err(Error::usage(format!(
                "component {} was fetched while it was starting, check for circular dependencies",
                key
            )));
        }
        starting.push(key.to_string());

        // No lock is held while starting so start can fetch other components.
        let started = instance
            .get_or_try_init(|| {
                STARTING.scope(starting, async {
                    trace!(component = %key, "starting component");
                    let replacement = component.start(self).await.map_err(|err| {
                        error!(component = %key, error = %err, "failed to start component");
                        err
                    })?;
                    self.state.write().await.fetched.push(key.to_string());
                    Ok::<_, Error>(replacement.unwrap_or_else(|| component.clone()))
                })
            })
            .await?;
        Ok(started.clone())
    }

    /// Fetch a component and downcast it to its concrete type.
    pub async fn fetch_as<T: Component>(&self, key: &str) -> Result<Arc<T>, Error> {
        self.fetch(key).await?.into_any().downcast::<T>().map_err(|_| {
            Error::usage(format!(
                "component {} is not a {}",
                key,
                std::any::type_name::<T>()
            ))
        })
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.state.read().await.entries.contains_key(key)
    }

    /// Registered keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut keys: Vec<String> = state.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Stop every started component and clear the container.
    ///
    /// All stops run to completion even when some fail; the first failure is
    /// returned after the container has been cleared.
    pub async fn stop(&self) -> Result<(), Error> {
        let started: Vec<(String, Arc<dyn Component>)> = {
            let state = self.state.read().await;
            state
                .fetched
                .iter()
                .filter_map(|key| {
                    let instance = state.entries.get(key)?.instance.get()?;
                    Some((key.clone(), instance.clone()))
                })
                .collect()
        };

        let results = join_all(started.iter().map(|(key, instance)| async move {
            (key, instance.stop().await)
        }))
        .await;

        let mut first_failure = None;
        for (key, result) in results {
            if let Err(err) = result {
                error!(component = %key, error = %err, "failed to stop component");
                first_failure.get_or_insert(err);
            }
        }

        let mut state = self.state.write().await;
        state.entries.clear();
        state.fetched.clear();
        debug!(stopped = started.len(), "flushed container");

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
