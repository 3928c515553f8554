//! Inbound serverless event and invocation context.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Raw event handed over by the hosting runtime.
///
/// Events are arbitrary JSON documents whose shape depends on their source,
/// so this is a thin wrapper with accessors for the fields the framework
/// routes and logs on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(Value);

impl Event {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// An API gateway style HTTP event.
    pub fn http(method: impl Into<String>, resource: impl Into<String>) -> Self {
        let method: String = method.into();
        let resource: String = resource.into();
        Self(json!({
            "httpMethod": method,
            "resource": resource.clone(),
            "path": resource,
        }))
    }

    /// A scheduled (cron) event.
    pub fn scheduled() -> Self {
        Self(json!({ "detail-type": "Scheduled Event" }))
    }

    /// A token authorizer event.
    pub fn token(authorization_token: impl Into<String>, method_arn: impl Into<String>) -> Self {
        let authorization_token: String = authorization_token.into();
        let method_arn: String = method_arn.into();
        Self(json!({
            "type": "TOKEN",
            "authorizationToken": authorization_token,
            "methodArn": method_arn,
        }))
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Value>) -> Self {
        self.set("body", body.into());
        self
    }

    /// Add a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_nested("headers", key.into(), Value::String(value.into()));
        self
    }

    /// Add a path parameter.
    pub fn with_path_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_nested("pathParameters", key.into(), Value::String(value.into()));
        self
    }

    /// Add a query string parameter.
    pub fn with_query_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_nested("queryStringParameters", key.into(), Value::String(value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set a top level field. Non-object events are replaced by an object.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        if !self.0.is_object() {
            self.0 = Value::Object(Map::new());
        }
        if let Value::Object(map) = &mut self.0 {
            map.insert(key.into(), value);
        }
    }

    pub fn http_method(&self) -> Option<&str> {
        self.str_field("httpMethod")
    }

    /// The route template of an HTTP event, falling back to the concrete path.
    pub fn resource(&self) -> Option<&str> {
        self.str_field("resource").or_else(|| self.path())
    }

    pub fn path(&self) -> Option<&str> {
        self.str_field("path")
    }

    pub fn detail_type(&self) -> Option<&str> {
        self.str_field("detail-type")
    }

    pub fn token_type(&self) -> Option<&str> {
        self.str_field("type")
    }

    pub fn authorization_token(&self) -> Option<&str> {
        self.str_field("authorizationToken")
    }

    pub fn method_arn(&self) -> Option<&str> {
        self.str_field("methodArn")
    }

    pub fn body(&self) -> Option<&Value> {
        self.0.get("body").filter(|b| !b.is_null())
    }

    pub fn set_body(&mut self, body: Value) {
        self.set("body", body);
    }

    pub fn headers(&self) -> Option<&Map<String, Value>> {
        self.0.get("headers").and_then(Value::as_object)
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers()?.get(key)?.as_str()
    }

    pub fn path_parameters(&self) -> Option<&Map<String, Value>> {
        self.0.get("pathParameters").and_then(Value::as_object)
    }

    pub fn path_parameters_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.0.get_mut("pathParameters").and_then(Value::as_object_mut)
    }

    pub fn path_parameter(&self, key: &str) -> Option<&str> {
        self.path_parameters()?.get(key)?.as_str()
    }

    pub fn query_parameters(&self) -> Option<&Map<String, Value>> {
        self.0
            .get("queryStringParameters")
            .and_then(Value::as_object)
    }

    /// Id placed on the request context by an upstream authorizer.
    pub fn authorizer_id(&self) -> Option<&Value> {
        self.0.pointer("/requestContext/authorizer/id")
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    fn insert_nested(&mut self, key: &str, name: String, value: Value) {
        if !self.0.is_object() {
            self.0 = Value::Object(Map::new());
        }
        let slot = &mut self.0[key];
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        slot[name.as_str()] = value;
    }
}

impl From<Value> for Event {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Invocation context supplied by the hosting runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Context {
    /// Deployed function name.
    pub function_name: String,
    /// Request ID for tracing.
    pub request_id: String,
    /// Environment variables exposed by the runtime.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl Context {
    pub fn new(function_name: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            request_id: request_id.into(),
            env: HashMap::new(),
        }
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn get_env(&self, key: &str) -> Option<&String> {
        self.env.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_event_accessors() {
        let event = Event::http("get", "/Users/{id}")
            .with_header("Authorization", "Bearer x")
            .with_path_parameter("id", "a%20b")
            .with_body("{}");

        assert_eq!(event.http_method(), Some("get"));
        assert_eq!(event.resource(), Some("/Users/{id}"));
        assert_eq!(event.header("Authorization"), Some("Bearer x"));
        assert_eq!(event.path_parameter("id"), Some("a%20b"));
        assert_eq!(event.body(), Some(&Value::String("{}".into())));
    }

    #[test]
    fn test_resource_falls_back_to_path() {
        let event = Event::new(json!({ "httpMethod": "GET", "path": "/a" }));
        assert_eq!(event.resource(), Some("/a"));
    }

    #[test]
    fn test_null_body_is_absent() {
        let event = Event::new(json!({ "body": null }));
        assert!(event.body().is_none());
    }

    #[test]
    fn test_authorizer_id() {
        let event = Event::new(json!({ "requestContext": { "authorizer": { "id": "u-1" } } }));
        assert_eq!(event.authorizer_id(), Some(&json!("u-1")));
    }

    #[test]
    fn test_context_env() {
        let ctx = Context::new("users", "req-1").with_env("STAGE", "dev");
        assert_eq!(ctx.get_env("STAGE"), Some(&"dev".to_string()));
        assert_eq!(ctx.function_name, "users");
    }
}
