//! Policy document builder for token authorizers.

use super::handler::RawReply;
use crate::error::Error;
use crate::http::Event;
use serde::Serialize;
use serde_json::{json, Value};

const POLICY_VERSION: &str = "2012-10-17";
const INVOKE_ACTION: &str = "execute-api:Invoke";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthorizerOptions {
    /// Grant access to every endpoint of the API stage instead of the invoked
    /// method only, so the authorizer result can be cached across endpoints.
    pub allow_full_api_access: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// Reply for an authorizer.
///
/// Without a user the reply is the opaque `"Unauthorized"` failure, which the
/// host answers with 401. Otherwise a policy allowing or denying the user is
/// built; a denial is answered with 403.
pub fn create_authorizer_response(
    authorized: bool,
    user_id: Option<&str>,
    event: &Event,
    options: AuthorizerOptions,
) -> RawReply {
    let Some(user_id) = user_id.filter(|id| !id.is_empty()) else {
        return RawReply::Fail(Error::opaque("Unauthorized"));
    };
    let effect = if authorized { Effect::Allow } else { Effect::Deny };
    RawReply::Respond(build_policy(event, user_id, effect, options))
}

fn build_policy(event: &Event, user_id: &str, effect: Effect, options: AuthorizerOptions) -> Value {
    let method_arn = event.method_arn().unwrap_or_default();
    let resource = if options.allow_full_api_access {
        let base: Vec<&str> = method_arn.split('/').take(2).collect();
        format!("{}/*/*", base.join("/"))
    } else {
        method_arn.to_string()
    };

    json!({
        "principalId": "user",
        "policyDocument": {
            "Version": POLICY_VERSION,
            "Statement": [{
                "Action": INVOKE_ACTION,
                "Effect": effect,
                "Resource": resource,
            }],
        },
        "context": { "id": user_id },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARN: &str = "arn:aws:execute-api:eu-west-1:123:api-id/dev/GET/users/1";

    fn policy(reply: RawReply) -> Value {
        match reply {
            RawReply::Respond(value) => value,
            RawReply::Fail(err) => panic!("expected a policy, got {}", err),
        }
    }

    #[test]
    fn test_missing_user_is_unauthorized() {
        let event = Event::token("token", ARN);
        let reply = create_authorizer_response(true, None, &event, AuthorizerOptions::default());
        match reply {
            RawReply::Fail(Error::Opaque(value)) => assert_eq!(value, "Unauthorized"),
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[test]
    fn test_allow_policy_for_method() {
        let event = Event::token("token", ARN);
        let value = policy(create_authorizer_response(
            true,
            Some("u-1"),
            &event,
            AuthorizerOptions::default(),
        ));
        assert_eq!(value["principalId"], "user");
        assert_eq!(value["policyDocument"]["Version"], POLICY_VERSION);
        let statement = &value["policyDocument"]["Statement"][0];
        assert_eq!(statement["Action"], INVOKE_ACTION);
        assert_eq!(statement["Effect"], "Allow");
        assert_eq!(statement["Resource"], ARN);
        assert_eq!(value["context"]["id"], "u-1");
    }

    #[test]
    fn test_deny_with_full_api_access() {
        let event = Event::token("token", ARN);
        let value = policy(create_authorizer_response(
            false,
            Some("u-1"),
            &event,
            AuthorizerOptions {
                allow_full_api_access: true,
            },
        ));
        let statement = &value["policyDocument"]["Statement"][0];
        assert_eq!(statement["Effect"], "Deny");
        assert_eq!(
            statement["Resource"],
            "arn:aws:execute-api:eu-west-1:123:api-id/dev/*/*"
        );
    }
}
