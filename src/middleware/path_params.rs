//! Percent-decoding of path parameters.

use super::{Flow, Middleware, RequestMiddleware};
use crate::error::{ApplicationError, Error};
use crate::http::{Request, Response};
use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use serde_json::Value;

struct DecodePathParams;

#[async_trait]
impl RequestMiddleware for DecodePathParams {
    async fn process(&self, req: &mut Request, _res: &mut Response) -> Result<Flow, Error> {
        let Some(params) = req.event.path_parameters_mut() else {
            return Ok(Flow::Proceed);
        };
        for (name, value) in params.iter_mut() {
            if let Value::String(raw) = value {
                let decoded = percent_decode_str(raw).decode_utf8().map_err(|_| {
                    ApplicationError::bad_request(format!(
                        "path parameter {} is not valid UTF-8 once decoded",
                        name
                    ))
                })?
                .into_owned();
                *raw = decoded;
            }
        }
        Ok(Flow::Proceed)
    }
}

/// Percent-decode every path parameter in place.
pub fn path_params() -> Middleware {
    Middleware::request(DecodePathParams)
}
