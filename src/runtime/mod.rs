//! Invocation runtime: route pipelines, configuration and logging setup.

mod config;
mod lifecycle;
mod logging;
pub(crate) mod pipeline;

pub use config::{AppConfig, ConfigLoader, ENV_OVERRIDE_PREFIX};
pub use logging::{LoggingConfig, LOG_LEVEL_ENV};
