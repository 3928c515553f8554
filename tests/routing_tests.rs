//! Integration tests for event routing and per-source defaults.

use funcpress::prelude::*;
use funcpress::routing::RouteKey;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

fn labelled(label: &'static str) -> HandlerKind {
    handler_fn(move |_, res| res.ok(json!(label)))
}

fn exports() -> Exports {
    let mut app = Application::new(AppConfig::default());
    app.on("api")
        .unwrap()
        .get("/a", labelled("get a"))
        .unwrap()
        .use_for(Source::Http, labelled("any http"))
        .unwrap();
    app.export().unwrap()
}

async fn body(exports: &Exports, event: Event) -> Value {
    exports
        .invoke("api", event, Context::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_exact_route_wins() {
    let exports = exports();
    let value = body(&exports, Event::http("GET", "/a")).await;
    assert_eq!(value["body"], "get a");
}

#[tokio::test]
async fn test_path_and_method_are_case_insensitive() {
    let exports = exports();
    let value = body(&exports, Event::http("get", "/A")).await;
    assert_eq!(value["body"], "get a");
}

#[tokio::test]
async fn test_other_method_falls_back_to_source_route() {
    let exports = exports();
    let value = body(&exports, Event::http("POST", "/a")).await;
    assert_eq!(value["body"], "any http");
    let value = body(&exports, Event::http("GET", "/b")).await;
    assert_eq!(value["body"], "any http");
}

#[tokio::test]
async fn test_unmatched_source_answers_404_without_error_handler() {
    let calls = Arc::new(Mutex::new(0));
    let seen = calls.clone();

    let mut app = Application::new(AppConfig::default());
    app.with_error_handler(error_handler_fn(move |_, res| {
        *seen.lock().unwrap() += 1;
        res.internal_server_error(None)
    }));
    app.on("api")
        .unwrap()
        .get("/a", labelled("get a"))
        .unwrap();
    let exports = app.export().unwrap();

    let value = body(&exports, Event::scheduled()).await;
    assert_eq!(value, json!({ "statusCode": 404 }));
    let value = body(&exports, Event::new(json!({ "Records": [] }))).await;
    assert_eq!(value, json!({ "statusCode": 404 }));
    assert_eq!(*calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_path_specific_route_with_any_method() {
    let mut app = Application::new(AppConfig::default());
    app.on("api")
        .unwrap()
        .get("/a", labelled("get a"))
        .unwrap()
        .use_handler(labelled("fallback"))
        .unwrap();
    let exports = app.export().unwrap();

    let value = body(&exports, Event::scheduled()).await;
    assert_eq!(value["body"], "fallback");
    assert_eq!(
        exports.get("api").unwrap().routes(),
        vec![RouteKey::http("GET", "/a"), RouteKey::any()]
    );
}

#[tokio::test]
async fn test_http_event_without_path_is_an_error() {
    let exports = exports();
    let err = exports
        .invoke("api", Event::new(json!({ "httpMethod": "GET" })), Context::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidEvent(_)));
}

#[tokio::test]
async fn test_callback_receives_routing_errors() {
    let exports = exports();
    let outcome = Arc::new(Mutex::new(None));
    let seen = outcome.clone();
    exports
        .get("api")
        .unwrap()
        .call(
            Event::new(json!({ "httpMethod": "GET" })),
            Context::default(),
            move |err, value| {
                *seen.lock().unwrap() = Some((err.is_some(), value.is_some()));
            },
        )
        .await;
    assert_eq!(*outcome.lock().unwrap(), Some((true, false)));
}

#[tokio::test]
async fn test_unknown_handler_name() {
    let exports = exports();
    let err = exports
        .invoke("missing", Event::scheduled(), Context::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Usage(_)));
}

#[tokio::test]
async fn test_cron_route_skips_application_middleware() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let app_log = log.clone();

    let mut app = Application::new(AppConfig::default());
    app.with_middleware([request_fn(move |_, _| {
        app_log.lock().unwrap().push("app middleware");
        Ok(Flow::Proceed)
    })]);
    app.on("jobs")
        .unwrap()
        .cron(handler_fn(|_, res| res.no_content()))
        .unwrap()
        .get("/jobs", handler_fn(|_, res| res.ok(json!([]))))
        .unwrap();
    let exports = app.export().unwrap();

    let value = exports
        .invoke("jobs", Event::scheduled(), Context::default())
        .await
        .unwrap();
    assert_eq!(value["statusCode"], 204);
    assert!(log.lock().unwrap().is_empty());

    exports
        .invoke("jobs", Event::http("GET", "/jobs"), Context::default())
        .await
        .unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["app middleware"]);
}

#[tokio::test]
async fn test_authorizer_denies_without_user() {
    let mut app = Application::new(AppConfig::default());
    app.on("auth")
        .unwrap()
        .authorizer(authorizer_fn(|event, _| {
            let user = event
                .authorization_token()
                .and_then(|token| token.strip_prefix("Bearer "));
            Ok(create_authorizer_response(
                user.is_some(),
                user,
                event,
                AuthorizerOptions::default(),
            ))
        }))
        .unwrap();
    let exports = app.export().unwrap();

    let err = exports
        .invoke("auth", Event::token("garbage", "arn:aws:execute-api:eu-west-1:1:api/dev/GET/users"), Context::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Opaque(Value::String(ref s)) if s == "Unauthorized"));

    let policy = exports
        .invoke(
            "auth",
            Event::token("Bearer user-1", "arn:aws:execute-api:eu-west-1:1:api/dev/GET/users"),
            Context::default(),
        )
        .await
        .unwrap();
    assert_eq!(policy["principalId"], "user");
    assert_eq!(policy["context"]["id"], "user-1");
    let statement = &policy["policyDocument"]["Statement"][0];
    assert_eq!(statement["Effect"], "Allow");
    assert_eq!(
        statement["Resource"],
        "arn:aws:execute-api:eu-west-1:1:api/dev/GET/users"
    );
}

struct ReadsDb;

#[async_trait]
impl Handler for ReadsDb {
    async fn handle(&self, req: &mut Request, res: &mut Response) -> Result<(), Error> {
        let db = req.component::<Value>("db").await?;
        res.ok(json!({ "db": (*db).clone() }))
    }
}

#[tokio::test]
async fn test_cron_route_keeps_its_own_components_and_headers() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let app_log = log.clone();

    let mut app = Application::new(AppConfig::default());
    app.with_middleware([request_fn(move |_, _| {
        app_log.lock().unwrap().push("app middleware");
        Ok(Flow::Proceed)
    })]);
    app.on("tick")
        .unwrap()
        .cron(
            Route::from(HandlerKind::plain(ReadsDb))
                .with_headers([("X-Job", "tick")])
                .unwrap()
                .with_component("db", ComponentSource::shared(json!(1))),
        )
        .unwrap();
    let exports = app.export().unwrap();

    let value = exports
        .invoke("tick", Event::scheduled(), Context::default())
        .await
        .unwrap();
    assert_eq!(value["statusCode"], 200);
    assert_eq!(value["body"], json!({ "db": 1 }));
    assert_eq!(value["headers"]["X-Job"], "tick");
    assert!(log.lock().unwrap().is_empty());
}
