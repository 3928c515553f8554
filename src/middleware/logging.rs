//! Request and completion logging.

use super::{FinallyMiddleware, Flow, Middleware, RequestMiddleware};
use crate::error::Error;
use crate::http::{Event, Request, Response};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{error, info};

const MAX_BODY_CHARS: usize = 500;
const MASK: &str = "******";

fn user(event: &Event) -> String {
    match event.authorizer_id() {
        Some(Value::String(id)) => id.clone(),
        Some(id) => id.to_string(),
        None => "anonymous".to_string(),
    }
}

fn path(event: &Event) -> String {
    format!(
        "{} {}",
        event.http_method().unwrap_or("-"),
        event.path().unwrap_or("-")
    )
}

fn query(event: &Event) -> Option<String> {
    event
        .query_parameters()
        .map(|params| Value::Object(params.clone()).to_string())
}

fn masked_headers<'a>(headers: impl Iterator<Item = (&'a String, String)>) -> String {
    let masked: Map<String, Value> = headers
        .map(|(key, value)| {
            let value = if key.eq_ignore_ascii_case("authorization") {
                MASK.to_string()
            } else {
                value
            };
            (key.clone(), Value::String(value))
        })
        .collect();
    Value::Object(masked).to_string()
}

fn truncated_body(body: Option<&Value>) -> Option<String> {
    let body = match body? {
        // String bodies are logged as the JSON they contain when they contain any.
        Value::String(raw) => serde_json::from_str::<Value>(raw)
            .map(|parsed| parsed.to_string())
            .unwrap_or_else(|_| raw.clone()),
        other => other.to_string(),
    };
    if body.chars().count() > MAX_BODY_CHARS {
        let mut short: String = body.chars().take(MAX_BODY_CHARS).collect();
        short.push_str("...");
        Some(short)
    } else {
        Some(body)
    }
}

struct LogStart;

#[async_trait]
impl RequestMiddleware for LogStart {
    async fn process(&self, req: &mut Request, _res: &mut Response) -> Result<Flow, Error> {
        let event = &req.event;
        let headers = event.headers().map(|headers| {
            masked_headers(headers.iter().map(|(k, v)| {
                (k, v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            }))
        });
        info!(
            user = %user(event),
            path = %path(event),
            query = ?query(event),
            headers = ?headers,
            body = ?truncated_body(event.body()),
            "START request"
        );
        Ok(Flow::Proceed)
    }
}

struct LogCompletion;

#[async_trait]
impl FinallyMiddleware for LogCompletion {
    async fn process(&self, req: &Request, res: &Response) -> Result<Flow, Error> {
        let event = &req.event;
        let headers = masked_headers(res.headers().iter().map(|(k, v)| (k, v.clone())));
        let body = truncated_body(res.body());

        match res.error() {
            Some(err) => error!(
                error = %err,
                status = %res.status(),
                user = %user(event),
                path = %path(event),
                headers = %headers,
                body = ?body,
                "ERROR processing request"
            ),
            None => info!(
                status = %res.status(),
                user = %user(event),
                path = %path(event),
                headers = %headers,
                body = ?body,
                "COMPLETED request"
            ),
        }
        Ok(Flow::Proceed)
    }
}

/// Log the start of every request and its completion or failure.
///
/// `Authorization` headers are masked and bodies are cut to 500 characters.
pub fn logging() -> Vec<Middleware> {
    vec![Middleware::request(LogStart), Middleware::finally(LogCompletion)]
}
