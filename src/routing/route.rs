//! Route keys.
//!
//! Every inbound event is classified into a [`Source`] and reduced to a
//! [`RouteKey`] of `source.path.method`. Non-HTTP events always use the
//! wildcard `any` for path and method.

use crate::error::Error;
use crate::http::Event;
use serde::{Deserialize, Serialize};

/// Wildcard path or method.
pub const ANY: &str = "any";

/// Where an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Http,
    Cron,
    #[serde(rename = "auth")]
    Authorizer,
    Unknown,
    /// Matches events of every source.
    Any,
}

impl Source {
    /// Classify an event: an HTTP method marks HTTP events, a scheduled-event
    /// detail type marks cron events and a `TOKEN` type marks authorizer
    /// events.
    pub fn classify(event: &Event) -> Source {
        if event.http_method().is_some() {
            Source::Http
        } else if event.detail_type() == Some("Scheduled Event") {
            Source::Cron
        } else if event.token_type() == Some("TOKEN") {
            Source::Authorizer
        } else {
            Source::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Http => "http",
            Source::Cron => "cron",
            Source::Authorizer => "auth",
            Source::Unknown => "unknown",
            Source::Any => ANY,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite `source.path.method` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    pub source: Source,
    /// Lower-cased path, or `any`.
    pub path: String,
    /// Upper-cased method, or `any`.
    pub method: String,
}

impl RouteKey {
    /// An HTTP route. Path and method are normalised.
    pub fn http(method: impl AsRef<str>, path: impl AsRef<str>) -> Self {
        Self {
            source: Source::Http,
            path: path.as_ref().to_lowercase(),
            method: method.as_ref().to_uppercase(),
        }
    }

    /// Every event of `source`.
    pub fn source(source: Source) -> Self {
        Self {
            source,
            path: ANY.to_string(),
            method: ANY.to_string(),
        }
    }

    /// Every event.
    pub fn any() -> Self {
        Self::source(Source::Any)
    }

    /// The key of an inbound event.
    pub fn from_event(event: &Event) -> Result<Self, Error> {
        match Source::classify(event) {
            Source::Http => {
                let method = event.http_method().unwrap_or_default();
                let path = event.resource().ok_or_else(|| {
                    Error::InvalidEvent(format!("{} event without a resource or path", method))
                })?;
                Ok(Self::http(method, path))
            }
            source => Ok(Self::source(source)),
        }
    }

    /// Keys to try, most specific first: exact, any method, any path and
    /// method, any source.
    pub fn fallbacks(&self) -> [RouteKey; 4] {
        [
            self.clone(),
            RouteKey {
                source: self.source,
                path: self.path.clone(),
                method: ANY.to_string(),
            },
            RouteKey::source(self.source),
            RouteKey::any(),
        ]
    }
}

impl std::fmt::Display for RouteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.source, self.path, self.method)
    }
}
