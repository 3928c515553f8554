//! Response object handed to handlers, middleware and error handlers.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const CREATED: StatusCode = StatusCode(201);
    pub const NO_CONTENT: StatusCode = StatusCode(204);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const UNAUTHORIZED: StatusCode = StatusCode(401);
    pub const FORBIDDEN: StatusCode = StatusCode(403);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const UNPROCESSABLE_ENTITY: StatusCode = StatusCode(422);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    /// Check if the status code indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    /// Check if the status code indicates a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.0)
    }

    /// Check if the status code indicates a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.0)
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::OK
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

impl From<StatusCode> for u16 {
    fn from(code: StatusCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Response headers.
pub type Headers = HashMap<String, String>;

/// Conversion into a validated header map.
pub trait IntoHeaders {
    fn into_headers(self) -> Result<Headers, Error>;
}

impl IntoHeaders for Headers {
    fn into_headers(self) -> Result<Headers, Error> {
        Ok(self)
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> IntoHeaders for [(K, V); N] {
    fn into_headers(self) -> Result<Headers, Error> {
        Ok(self
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect())
    }
}

/// JSON headers must be an object of string values.
impl IntoHeaders for Value {
    fn into_headers(self) -> Result<Headers, Error> {
        let Value::Object(map) = self else {
            return Err(Error::config("headers must be an object"));
        };
        map.into_iter()
            .map(|(key, value)| match value {
                Value::String(value) => Ok((key, value)),
                other => Err(Error::config(format!(
                    "headers must be a string to string map, '{}' is {}",
                    key, other
                ))),
            })
            .collect()
    }
}

/// Serialised form handed to the hosting runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlainResponse {
    pub status_code: StatusCode,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl PlainResponse {
    pub fn status(status: impl Into<StatusCode>) -> Self {
        Self {
            status_code: status.into(),
            headers: Headers::new(),
            body: None,
        }
    }
}

#[derive(Debug, Clone)]
enum SendState {
    Pending,
    Sent,
    Forwarded(Arc<Error>),
}

/// Per-request response.
///
/// A response is sent exactly once, either by a handler or by the error
/// handler. What flows through response and finally middleware is a frozen
/// snapshot taken at send time; only response middleware may `update` it.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Option<Value>,
    error: Option<Arc<Error>>,
    method: Option<String>,
    state: SendState,
    in_response_middleware: bool,
}

impl Response {
    /// Create a response for a request made with the given HTTP method.
    pub fn new(method: Option<String>, headers: Headers) -> Self {
        Self {
            status: StatusCode::OK,
            headers,
            body: None,
            error: None,
            method,
            state: SendState::Pending,
            in_response_middleware: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Error being handled, set on responses given to error handlers.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_deref()
    }

    pub fn is_sent(&self) -> bool {
        matches!(self.state, SendState::Sent)
    }

    /// Merge headers into the response.
    pub fn add_headers(&mut self, headers: impl IntoHeaders) -> Result<&mut Self, Error> {
        self.headers.extend(headers.into_headers()?);
        Ok(self)
    }

    /// Send with an inferred status: 204 without a body, 201 with a body on a
    /// POST request, 200 otherwise.
    pub fn send(&mut self, body: impl Into<Option<Value>>) -> Result<(), Error> {
        let body = body.into();
        let status = self.infer_status(body.as_ref());
        self.send_status(status, body)
    }

    /// Send with an explicit status.
    pub fn send_status(
        &mut self,
        status: impl Into<StatusCode>,
        body: impl Into<Option<Value>>,
    ) -> Result<(), Error> {
        if !matches!(self.state, SendState::Pending) {
            return Err(Error::usage(
                "the response has already been sent, a response must not be sent twice",
            ));
        }
        self.status = status.into();
        self.body = body.into();
        self.state = SendState::Sent;
        Ok(())
    }

    pub fn ok(&mut self, body: impl Into<Option<Value>>) -> Result<(), Error> {
        self.send_status(StatusCode::OK, body)
    }

    pub fn created(&mut self, body: impl Into<Option<Value>>) -> Result<(), Error> {
        self.send_status(StatusCode::CREATED, body)
    }

    pub fn no_content(&mut self) -> Result<(), Error> {
        self.send_status(StatusCode::NO_CONTENT, None)
    }

    pub fn bad_request(&mut self, body: impl Into<Option<Value>>) -> Result<(), Error> {
        self.send_status(StatusCode::BAD_REQUEST, body)
    }

    pub fn unauthorized(&mut self, body: impl Into<Option<Value>>) -> Result<(), Error> {
        self.send_status(StatusCode::UNAUTHORIZED, body)
    }

    pub fn forbidden(&mut self, body: impl Into<Option<Value>>) -> Result<(), Error> {
        self.send_status(StatusCode::FORBIDDEN, body)
    }

    pub fn not_found(&mut self, body: impl Into<Option<Value>>) -> Result<(), Error> {
        self.send_status(StatusCode::NOT_FOUND, body)
    }

    pub fn unprocessable_entity(&mut self, body: impl Into<Option<Value>>) -> Result<(), Error> {
        self.send_status(StatusCode::UNPROCESSABLE_ENTITY, body)
    }

    pub fn internal_server_error(&mut self, body: impl Into<Option<Value>>) -> Result<(), Error> {
        self.send_status(StatusCode::INTERNAL_SERVER_ERROR, body)
    }

    /// Replace the body of a sent response. Only allowed in response middleware.
    pub fn update(&mut self, body: impl Into<Option<Value>>) -> Result<(), Error> {
        self.ensure_updatable()?;
        self.body = body.into();
        Ok(())
    }

    /// Replace status and body of a sent response. Only allowed in response middleware.
    pub fn update_status(
        &mut self,
        status: impl Into<StatusCode>,
        body: impl Into<Option<Value>>,
    ) -> Result<(), Error> {
        self.ensure_updatable()?;
        self.status = status.into();
        self.body = body.into();
        Ok(())
    }

    /// Forward an error to the error handler instead of sending. Response
    /// middleware is bypassed for the resulting response.
    pub fn handle_error(&mut self, error: impl Into<Error>) -> Result<(), Error> {
        if !matches!(self.state, SendState::Pending) {
            return Err(Error::usage(
                "the response has already been sent, errors can no longer be forwarded",
            ));
        }
        self.state = SendState::Forwarded(Arc::new(error.into()));
        Ok(())
    }

    /// Plain `{statusCode, headers, body}` form.
    pub fn to_plain(&self) -> PlainResponse {
        PlainResponse {
            status_code: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }

    pub fn to_value(&self) -> Result<Value, Error> {
        Ok(serde_json::to_value(self.to_plain())?)
    }

    /// Error forwarded with `handle_error`, if any.
    pub(crate) fn take_forwarded(&mut self) -> Option<Arc<Error>> {
        match std::mem::replace(&mut self.state, SendState::Pending) {
            SendState::Forwarded(error) => Some(error),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Frozen copy that flows through response and finally middleware.
    pub(crate) fn snapshot(&self) -> Response {
        let mut snapshot = self.clone();
        snapshot.state = SendState::Sent;
        snapshot.in_response_middleware = true;
        snapshot
    }

    /// Unsent copy carrying the error, handed to the error handler.
    pub(crate) fn error_response(&self, error: Arc<Error>) -> Response {
        Response {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
            error: Some(error),
            method: self.method.clone(),
            state: SendState::Pending,
            in_response_middleware: false,
        }
    }

    /// Fold a raw handler result into a snapshot. Missing fields keep the
    /// current values.
    pub(crate) fn merge_raw(&self, raw: &Value) -> Result<Response, Error> {
        let mut response = self.snapshot();
        if let Some(status) = raw.get("statusCode").and_then(Value::as_u64) {
            let status = u16::try_from(status)
                .map_err(|_| Error::usage(format!("invalid status code {}", status)))?;
            response.status = StatusCode(status);
        }
        if let Some(headers) = raw.get("headers").filter(|h| !h.is_null()) {
            response.headers = headers.clone().into_headers()?;
        }
        if let Some(body) = raw.get("body").filter(|b| !b.is_null()) {
            response.body = Some(body.clone());
        }
        Ok(response)
    }

    fn ensure_updatable(&self) -> Result<(), Error> {
        if !self.in_response_middleware {
            return Err(Error::usage(
                "update can only be used inside response middleware, not inside a handler",
            ));
        }
        Ok(())
    }

    fn infer_status(&self, body: Option<&Value>) -> StatusCode {
        match body {
            None | Some(Value::Null) => StatusCode::NO_CONTENT,
            Some(_) if self
                .method
                .as_deref()
                .is_some_and(|m| m.eq_ignore_ascii_case("POST")) =>
            {
                StatusCode::CREATED
            }
            Some(_) => StatusCode::OK,
        }
    }
}
