//! Integration tests for application configuration: overrides, built-in
//! middleware, logging and the `#[handler]` macro.

use funcpress::prelude::*;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::{Arc, Mutex};

#[handler]
async fn get_user(req: &mut Request, res: &mut Response) -> Result<(), Error> {
    let id = req
        .event
        .path_parameter("id")
        .ok_or_else(|| ApplicationError::bad_request("missing id"))?
        .to_string();
    res.ok(json!({ "id": id }))
}

#[handler(kind = "raw", name = "Echo")]
async fn echo_event(event: &Event, context: &Context) -> Result<RawReply, Error> {
    Ok(RawReply::Respond(json!({
        "statusCode": 200,
        "body": { "function": context.function_name, "path": event.path() },
    })))
}

#[tokio::test]
async fn test_macro_generated_handlers() {
    let mut app = Application::new(AppConfig::default());
    app.with_middleware([middleware::path_params()]);
    app.on("users")
        .unwrap()
        .get("/users/{id}", HandlerKind::plain(GetUser))
        .unwrap()
        .use_handler(HandlerKind::raw(Echo))
        .unwrap();
    let exports = app.export().unwrap();

    let event = Event::http("GET", "/users/{id}").with_path_parameter("id", "a%20b");
    let value = exports
        .invoke("users", event, Context::default())
        .await
        .unwrap();
    assert_eq!(value["body"], json!({ "id": "a b" }));

    let value = exports
        .invoke("users", Event::http("GET", "/health"), Context::new("users-fn", "r-1"))
        .await
        .unwrap();
    assert_eq!(
        value["body"],
        json!({ "function": "users-fn", "path": "/health" })
    );
}

#[tokio::test]
async fn test_json_middleware_round_trip() {
    let mut app = Application::new(AppConfig::default());
    app.with_middleware(middleware::json());
    app.on("items")
        .unwrap()
        .post(
            "/items",
            handler_fn(|req, res| {
                let name = req.event.body().and_then(|b| b.get("name")).cloned();
                res.send(json!({ "created": name }))
            }),
        )
        .unwrap();
    let exports = app.export().unwrap();

    let event = Event::http("POST", "/items").with_body(r#"{"name":"lamp"}"#);
    let value = exports
        .invoke("items", event, Context::default())
        .await
        .unwrap();
    assert_eq!(value["statusCode"], 201);
    assert_eq!(value["body"], json!(r#"{"created":"lamp"}"#));
}

#[tokio::test]
async fn test_invalid_json_body_is_an_unexpected_error() {
    let mut app = Application::new(AppConfig::default());
    app.with_middleware(middleware::json());
    app.on("items")
        .unwrap()
        .use_handler(handler_fn(|_, res| res.ok(json!("unreachable"))))
        .unwrap();
    let exports = app.export().unwrap();

    let event = Event::http("POST", "/items").with_body("{not json");
    let value = exports
        .invoke("items", event, Context::default())
        .await
        .unwrap();
    assert_eq!(value["statusCode"], 500);
}

#[tokio::test]
async fn test_middleware_override_clears_every_role() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (req_log, res_log, fin_log, own_log) = (log.clone(), log.clone(), log.clone(), log.clone());

    let mut app = Application::new(AppConfig::default());
    app.with_middleware([
        request_fn(move |_, _| {
            req_log.lock().unwrap().push("app request");
            Ok(Flow::Proceed)
        }),
        response_fn(move |_, _| {
            res_log.lock().unwrap().push("app response");
            Ok(Flow::Proceed)
        }),
        finally_fn(move |_, _| {
            fin_log.lock().unwrap().push("app finally");
            Ok(Flow::Proceed)
        }),
    ]);
    // Overriding with a single request middleware also drops the
    // application's response and finally middleware.
    app.on("fn")
        .unwrap()
        .with_override_middleware([request_fn(move |_, _| {
            own_log.lock().unwrap().push("handler request");
            Ok(Flow::Proceed)
        })])
        .use_handler(handler_fn(|_, res| res.ok(json!(1))))
        .unwrap();
    let exports = app.export().unwrap();

    exports
        .invoke("fn", Event::http("GET", "/"), Context::default())
        .await
        .unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["handler request"]);
}

#[tokio::test]
async fn test_error_handler_scopes_last_one_wins() {
    let mut app = Application::new(AppConfig::default());
    app.with_error_handler(error_handler_fn(|_, res| res.send_status(StatusCode(500), json!("app"))));
    app.on("fn")
        .unwrap()
        .with_error_handler(error_handler_fn(|_, res| {
            res.send_status(StatusCode(503), json!("handler"))
        }))
        .get(
            "/route",
            Route::new(handler_fn(|_, _| Err(Error::unexpected("x")))).with_error_handler(
                error_handler_fn(|_, res| res.send_status(StatusCode(502), json!("route"))),
            ),
        )
        .unwrap()
        .use_handler(handler_fn(|_, _| Err(Error::unexpected("x"))))
        .unwrap();
    app.on("other")
        .unwrap()
        .use_handler(handler_fn(|_, _| Err(Error::unexpected("x"))))
        .unwrap();
    let exports = app.export().unwrap();

    let route = exports
        .invoke("fn", Event::http("GET", "/route"), Context::default())
        .await
        .unwrap();
    assert_eq!(route, json!({ "statusCode": 502, "body": "route" }));
    let handler = exports
        .invoke("fn", Event::http("GET", "/"), Context::default())
        .await
        .unwrap();
    assert_eq!(handler, json!({ "statusCode": 503, "body": "handler" }));
    let app_level = exports
        .invoke("other", Event::http("GET", "/"), Context::default())
        .await
        .unwrap();
    assert_eq!(app_level, json!({ "statusCode": 500, "body": "app" }));
}

#[tokio::test]
async fn test_custom_error_body() {
    let mut app = Application::new(AppConfig::default());
    app.with_error_handler(Arc::new(SimpleErrorHandler::with_body(|err: &Error| {
        err.as_application()
            .map(|app_err| json!({ "message": app_err.message }))
    })));
    app.on("fn")
        .unwrap()
        .use_handler(handler_fn(|_, _| Err(ApplicationError::not_found("no user 7").into())))
        .unwrap();
    let exports = app.export().unwrap();

    let value = exports
        .invoke("fn", Event::http("GET", "/users/7"), Context::default())
        .await
        .unwrap();
    assert_eq!(
        value,
        json!({ "statusCode": 404, "body": { "message": "no user 7" } })
    );
}

#[tokio::test]
async fn test_invalid_headers_are_rejected_at_registration() {
    let mut app = Application::new(AppConfig::default());
    let err = app.with_headers(json!({ "X-Retries": 3 })).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    let err = app.with_headers(json!(["not", "a", "map"])).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[derive(Clone, Default)]
struct Buffer(Arc<Mutex<Vec<u8>>>);

impl Buffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Buffer {
    type Writer = Buffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test]
async fn test_invocations_log_through_the_application_logger() {
    let buffer = Buffer::default();
    let logging = LoggingConfig::new().default_level("info");
    let dispatch = logging.dispatch(buffer.clone()).unwrap();

    let mut app = Application::new(AppConfig::new().with_logging(logging));
    app.with_logger(dispatch);
    app.on("fn")
        .unwrap()
        .use_handler(handler_fn(|_, res| {
            tracing::info!("inside the handler");
            res.ok(None)
        }))
        .unwrap();
    let exports = app.export().unwrap();

    exports
        .invoke("fn", Event::http("GET", "/"), Context::default())
        .await
        .unwrap();
    exports
        .invoke("fn", Event::scheduled(), Context::default())
        .await
        .unwrap();

    let output = buffer.contents();
    assert!(output.contains("inside the handler"));
    assert!(output.contains("failed to find route matching"));
}

#[test]
fn test_config_loader_feeds_the_application() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.dev.yml"),
        "env:\n  TABLE: users\nlogging:\n  slow_threshold_ms: 250\n",
    )
    .unwrap();

    let config = ConfigLoader::new(dir.path())
        .with_vars(Vec::<(String, String)>::new())
        .load("dev")
        .unwrap();
    assert_eq!(config.environment["env"]["TABLE"], Value::from("users"));
    assert_eq!(config.logging.slow_threshold_ms, 250);

    let app = Application::new(config);
    assert_eq!(app.config().logging.slow_threshold().as_millis(), 250);
}
