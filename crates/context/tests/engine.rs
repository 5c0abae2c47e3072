use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use http::{Request, StatusCode};
use micro_context::content_type::{MIME_HTML, MIME_JSON, MIME_XML};
use micro_context::middleware::{logger, recovery};
use micro_context::router::{get, post};
use micro_context::{Context, Engine, ErrorType, Negotiate, RemoteAddr};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct User {
    name: String,
    age: u8,
}

fn empty(method: &str, uri: &str) -> Request<Bytes> {
    Request::builder().method(method).uri(uri).body(Bytes::new()).unwrap()
}

fn user(ctx: &mut Context) {
    let id = ctx.param("id").unwrap_or_default().to_owned();
    ctx.string(StatusCode::OK, format_args!("user {id}"));
}

fn create_user(ctx: &mut Context) {
    let Ok(user) = ctx.bind::<User>() else {
        return;
    };
    ctx.json(StatusCode::CREATED, &user);
}

fn show(ctx: &mut Context) {
    let user = User { name: "micro".into(), age: 3 };
    ctx.negotiate(StatusCode::OK, Negotiate { offered: &[MIME_JSON, MIME_XML], html_name: None, data: &user });
}

fn engine() -> Engine {
    Engine::builder()
        .with_middleware(logger())
        .with_middleware(recovery())
        .route("/users/{id}", get(user))
        .route("/users", post(create_user))
        .route("/show", get(show))
        .route("/old", get(|ctx: &mut Context| ctx.redirect(StatusCode::MOVED_PERMANENTLY, "/new")))
        .route("/panic", get(|ctx: &mut Context| {
            ctx.must_get("never set");
        }))
        .route(
            "/ip",
            get(|ctx: &mut Context| {
                let ip = ctx.client_ip().unwrap_or("unknown").to_owned();
                ctx.string(StatusCode::OK, format_args!("{ip}"));
            }),
        )
        .build()
        .unwrap()
}

#[test]
fn path_params_reach_the_handler() {
    let response = engine().handle(empty("GET", "/users/42"));

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), "user 42");
    assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
}

#[test]
fn bind_json_body() {
    let request = Request::post("/users")
        .header(CONTENT_TYPE, "application/json; charset=utf-8")
        .body(Bytes::from_static(br#"{"name":"micro","age":3}"#))
        .unwrap();
    let response = engine().handle(request);

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.body(), "{\"name\":\"micro\",\"age\":3}\n");
}

#[test]
fn bind_failure_is_a_bad_request() {
    let request = Request::post("/users").header(CONTENT_TYPE, MIME_JSON).body(Bytes::from_static(b"{")).unwrap();
    let response = engine().handle(request);

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.body().is_empty());
}

#[test]
fn bind_form_body() {
    let request = Request::post("/users")
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Bytes::from_static(b"name=micro&age=3"))
        .unwrap();
    let response = engine().handle(request);

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.body(), "{\"name\":\"micro\",\"age\":3}\n");
}

#[test]
fn negotiated_formats() {
    let engine = engine();

    let request = Request::get("/show").header(ACCEPT, "application/xml").body(Bytes::new()).unwrap();
    let response = engine.handle(request);
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), "<User><name>micro</name><age>3</age></User>");

    let response = engine.handle(empty("GET", "/show"));
    assert_eq!(response.headers()[CONTENT_TYPE], "application/json; charset=utf-8");

    let request = Request::get("/show").header(ACCEPT, MIME_HTML).body(Bytes::new()).unwrap();
    let response = engine.handle(request);
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
}

#[test]
fn redirect_flushes_location() {
    let response = engine().handle(empty("GET", "/old"));

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()[LOCATION], "/new");
}

#[test]
fn panics_are_recovered() {
    let engine = engine();

    let response = engine.handle(empty("GET", "/panic"));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = engine.handle(empty("GET", "/users/7"));
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn not_found_runs_the_middleware() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let trace = Arc::clone(&seen);

    let engine = Engine::builder()
        .with_middleware(move |ctx: &mut Context| {
            trace.lock().unwrap().push(ctx.uri().path().to_owned());
            ctx.next();
        })
        .route("/", get(|_ctx: &mut Context| {}))
        .build()
        .unwrap();

    let response = engine.handle(empty("GET", "/nowhere"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.body(), "404 page not found");

    let response = engine.handle(empty("POST", "/"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(*seen.lock().unwrap(), ["/nowhere", "/"]);
}

#[test]
fn client_ip_precedence() {
    let engine = engine();

    let request = Request::get("/ip")
        .header("x-real-ip", " 10.10.10.10 ")
        .header("x-forwarded-for", "20.20.20.20, 30.30.30.30")
        .extension(RemoteAddr("40.40.40.40:42123".into()))
        .body(Bytes::new())
        .unwrap();
    assert_eq!(engine.handle(request).body(), "10.10.10.10");

    let request = Request::get("/ip")
        .header("x-forwarded-for", "20.20.20.20, 30.30.30.30")
        .extension(RemoteAddr("40.40.40.40:42123".into()))
        .body(Bytes::new())
        .unwrap();
    assert_eq!(engine.handle(request).body(), "20.20.20.20");

    let request = Request::get("/ip").extension(RemoteAddr("40.40.40.40:42123".into())).body(Bytes::new()).unwrap();
    assert_eq!(engine.handle(request).body(), "40.40.40.40:42123");
}

#[test]
fn requests_never_see_each_other() {
    let engine = Engine::builder()
        .route(
            "/write",
            get(|ctx: &mut Context| {
                ctx.set("secret", 42_u32);
                ctx.error_typed("left behind", ErrorType::Internal, ());
                ctx.set_accepted(&[MIME_XML]);
            }),
        )
        .route(
            "/read",
            get(|ctx: &mut Context| {
                let leaked = ctx.get("secret").is_some() || !ctx.errors().is_empty() || ctx.accepted().is_some();
                ctx.string(StatusCode::OK, format_args!("{leaked}"));
            }),
        )
        .build()
        .unwrap();

    engine.handle(empty("GET", "/write"));
    let response = engine.handle(empty("GET", "/read"));

    assert_eq!(engine.pool().idle(), 1);
    assert_eq!(response.body(), "false");
}

#[test]
fn engine_is_shared_between_threads() {
    let engine = Arc::new(engine());

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                let response = engine.handle(empty("GET", &format!("/users/{i}")));
                String::from_utf8_lossy(response.body()).into_owned()
            })
        })
        .collect();

    let mut bodies: Vec<_> = workers.into_iter().map(|worker| worker.join().unwrap()).collect();
    bodies.sort();
    assert_eq!(bodies, ["user 0", "user 1", "user 2", "user 3"]);
}
