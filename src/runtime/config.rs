//! Application configuration and the stage config loader.

use super::logging::LoggingConfig;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Default prefix of environment variable overrides.
pub const ENV_OVERRIDE_PREFIX: &str = "FUNCPRESS_";

/// Configuration an application is built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Injected into every request's container under `environment`.
    pub environment: Value,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a loaded config document as the environment. A `logging` section,
    /// when present, configures logging.
    pub fn from_environment(environment: Value) -> Result<Self, Error> {
        let logging = match environment.get("logging") {
            Some(section) => serde_json::from_value(section.clone())
                .map_err(|err| Error::config(format!("invalid logging section: {}", err)))?,
            None => LoggingConfig::default(),
        };
        Ok(Self {
            environment,
            logging,
        })
    }

    pub fn with_environment(mut self, environment: Value) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }
}

/// Loads `config.<stage>.yml` documents from a directory.
///
/// Keys from an optional `config.<stage>.secret.yml` override the main file,
/// and environment variables named `<PREFIX><STAGE>_<KEY>` override both,
/// landing in the `env` object as `KEY`.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    directory: PathBuf,
    prefix: String,
    vars: Option<Vec<(String, String)>>,
}

impl ConfigLoader {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            prefix: ENV_OVERRIDE_PREFIX.to_string(),
            vars: None,
        }
    }

    /// Use another environment variable prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Read overrides from `vars` instead of the process environment.
    pub fn with_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// The merged config document of `stage`.
    pub fn load_value(&self, stage: &str) -> Result<Value, Error> {
        let main = self.directory.join(format!("config.{}.yml", stage));
        if !main.is_file() {
            return Err(Error::config(format!(
                "config file {} does not exist",
                main.display()
            )));
        }
        let mut config = read_yaml(&main)?;

        let secret = self.directory.join(format!("config.{}.secret.yml", stage));
        if secret.is_file() {
            trace!(file = %secret.display(), "merging secret config");
            merge(&mut config, read_yaml(&secret)?);
        }

        let overrides = self.env_overrides(stage);
        if !overrides.is_empty() {
            debug!(count = overrides.len(), "applying environment overrides");
            let mut env = Map::new();
            for (key, value) in overrides {
                env.insert(key, Value::String(value));
            }
            let mut overlay = Map::new();
            overlay.insert("env".to_string(), Value::Object(env));
            merge(&mut config, Value::Object(overlay));
        }
        Ok(config)
    }

    /// The [`AppConfig`] of `stage`.
    pub fn load(&self, stage: &str) -> Result<AppConfig, Error> {
        AppConfig::from_environment(self.load_value(stage)?)
    }

    fn env_overrides(&self, stage: &str) -> Vec<(String, String)> {
        let prefix = format!("{}{}_", self.prefix, stage.to_uppercase());
        let vars = match &self.vars {
            Some(vars) => vars.clone(),
            None => std::env::vars().collect(),
        };
        let mut overrides: Vec<(String, String)> = vars
            .into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(&prefix)
                    .filter(|stripped| !stripped.is_empty())
                    .map(|stripped| (stripped.to_string(), value))
            })
            .collect();
        overrides.sort();
        overrides
    }
}

fn read_yaml(path: &Path) -> Result<Value, Error> {
    let text = std::fs::read_to_string(path)?;
    let value: Value = serde_yaml::from_str(&text)
        .map_err(|err| Error::config(format!("invalid YAML in {}: {}", path.display(), err)))?;
    Ok(if value.is_null() {
        Value::Object(Map::new())
    } else {
        value
    })
}

/// Deep-merge `overlay` into `base`. Objects merge key by key, anything else
/// is replaced.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
