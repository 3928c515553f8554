//! JSON body decoding and encoding.

use super::{Flow, Middleware, RequestMiddleware, ResponseMiddleware};
use crate::error::Error;
use crate::http::{Request, Response};
use async_trait::async_trait;
use serde_json::Value;
use tracing::trace;

struct DecodeBody;

#[async_trait]
impl RequestMiddleware for DecodeBody {
    async fn process(&self, req: &mut Request, _res: &mut Response) -> Result<Flow, Error> {
        if let Some(Value::String(raw)) = req.event.body() {
            let decoded: Value = serde_json::from_str(raw)?;
            trace!("decoded JSON request body");
            req.event.set_body(decoded);
        }
        Ok(Flow::Proceed)
    }
}

struct EncodeBody;

#[async_trait]
impl ResponseMiddleware for EncodeBody {
    async fn process(&self, _req: &Request, res: &mut Response) -> Result<Flow, Error> {
        if let Some(body) = res.body() {
            let encoded = serde_json::to_string(body)?;
            res.update(Value::String(encoded))?;
        }
        Ok(Flow::Proceed)
    }
}

/// Decode string request bodies as JSON and encode response bodies to JSON
/// strings.
pub fn json() -> Vec<Middleware> {
    vec![Middleware::request(DecodeBody), Middleware::response(EncodeBody)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;
    use crate::http::{Context, Event, Headers};
    use serde_json::json;
    use std::sync::Arc;

    fn request(event: Event) -> Request {
        Request::new(event, Context::default(), Arc::new(Container::new()))
    }

    #[tokio::test]
    async fn test_decodes_string_body() {
        let mut req = request(Event::http("POST", "/a").with_body(r#"{"name":"x"}"#));
        let mut res = Response::new(Some("POST".into()), Headers::new());

        let flow = DecodeBody.process(&mut req, &mut res).await.unwrap();
        assert_eq!(flow, Flow::Proceed);
        assert_eq!(req.event.body(), Some(&json!({"name": "x"})));
    }

    #[tokio::test]
    async fn test_invalid_body_is_an_error() {
        let mut req = request(Event::http("POST", "/a").with_body("{nope"));
        let mut res = Response::new(Some("POST".into()), Headers::new());
        assert!(DecodeBody.process(&mut req, &mut res).await.is_err());
    }

    #[tokio::test]
    async fn test_encodes_sent_body() {
        let req = request(Event::http("GET", "/a"));
        let mut res = Response::new(Some("GET".into()), Headers::new());
        res.ok(json!({"id": 1})).unwrap();
        let mut sent = res.snapshot();

        EncodeBody.process(&req, &mut sent).await.unwrap();
        assert_eq!(sent.body(), Some(&json!(r#"{"id":1}"#)));
    }
}
