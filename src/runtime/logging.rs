//! Logging configuration.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::Dispatch;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the default level.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL_DEFAULT";

/// Log levels and invocation timing thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level for every target without an entry in `levels`.
    pub default_level: String,
    /// Per-target levels, e.g. `funcpress::container = "trace"`.
    pub levels: BTreeMap<String, String>,
    /// Invocations taking at least this long are logged as slow.
    pub slow_threshold_ms: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            levels: BTreeMap::new(),
            slow_threshold_ms: 100,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default level.
    pub fn default_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = level.into();
        self
    }

    /// Set the level of one target.
    pub fn level(mut self, target: impl Into<String>, level: impl Into<String>) -> Self {
        self.levels.insert(target.into(), level.into());
        self
    }

    /// Set the slow invocation threshold.
    pub fn slow_threshold_ms(mut self, millis: u64) -> Self {
        self.slow_threshold_ms = millis;
        self
    }

    pub fn slow_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_threshold_ms)
    }

    /// Filter built from the configured levels. `LOG_LEVEL_DEFAULT` replaces
    /// the default level when set.
    pub fn env_filter(&self) -> Result<EnvFilter, Error> {
        let default_level = std::env::var(LOG_LEVEL_ENV)
            .ok()
            .filter(|level| !level.trim().is_empty())
            .unwrap_or_else(|| self.default_level.clone());

        let mut filter = EnvFilter::try_new(default_level.trim()).map_err(|err| {
            // A bad LOG_LEVEL_DEFAULT surfaces here too.
            Error::config(format!("invalid default log level {}: {}", default_level, err))
        })?;

        for (target, level) in &self.levels {
            let directive = format!("{}={}", target, level)
                .parse::<Directive>()
                .map_err(|err| {
                    Error::config(format!("invalid log level for {}: {}", target, err))
                })?;
            filter = filter.add_directive(directive);
        }
        Ok(filter)
    }

    /// A dispatcher formatting events into `writer`.
    pub fn dispatch<W>(&self, writer: W) -> Result<Dispatch, Error>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter()?)
            .with_writer(writer)
            .finish();
        Ok(Dispatch::new(subscriber))
    }

    /// Install a global subscriber writing to stdout.
    pub fn init(&self) -> Result<(), Error> {
        tracing_subscriber::fmt()
            .with_env_filter(self.env_filter()?)
            .try_init()
            .map_err(|err| Error::config(format!("failed to install the log subscriber: {}", err)))
    }
}
