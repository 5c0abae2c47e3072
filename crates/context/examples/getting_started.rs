use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{Request, Response, StatusCode};
use micro_context::content_type::{MIME_HTML, MIME_JSON, MIME_XML};
use micro_context::middleware::{logger, recovery};
use micro_context::render::HtmlTemplates;
use micro_context::router::{get, post};
use micro_context::{Context, Engine, Negotiate, RemoteAddr};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::io;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Deserialize, Serialize, Debug)]
pub struct User {
    name: String,
    zip: String,
}

/// Replaces `{{name}}` placeholders with the data's top level string fields
struct Placeholders;

impl HtmlTemplates for Placeholders {
    fn execute(&self, name: &str, data: &serde_json::Value, out: &mut dyn io::Write) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut page = match name {
            "user.html" => String::from("<h1>{{name}}</h1><p>zip: {{zip}}</p>"),
            other => return Err(format!("template {other} is not defined").into()),
        };
        if let Some(fields) = data.as_object() {
            for (key, value) in fields {
                page = page.replace(&format!("{{{{{key}}}}}"), value.as_str().unwrap_or_default());
            }
        }
        out.write_all(page.as_bytes())?;
        Ok(())
    }
}

fn auth(ctx: &mut Context) {
    match ctx.header("x-token").map(str::to_owned) {
        Some(token) => ctx.set("token", token),
        None => ctx.fail(StatusCode::UNAUTHORIZED, "missing x-token header"),
    }
}

fn show_user(ctx: &mut Context) {
    let user = User { name: ctx.param("name").unwrap_or_default().to_owned(), zip: "00000".into() };
    ctx.negotiate(
        StatusCode::OK,
        Negotiate { offered: &[MIME_JSON, MIME_XML, MIME_HTML], html_name: Some("user.html"), data: &user },
    );
}

fn create_user(ctx: &mut Context) {
    if let Ok(user) = ctx.bind::<User>() {
        info!(?user, token = %ctx.must_get_as::<String>("token"), "user created");
        ctx.json(StatusCode::CREATED, &user);
    }
}

fn print(response: &Response<Bytes>) {
    println!("{} {:?}\n{}\n", response.status(), response.headers(), String::from_utf8_lossy(response.body()));
}

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let engine = Engine::builder()
        .with_middleware(logger())
        .with_middleware(recovery())
        .route("/users/{name}", get(show_user))
        .route("/users", post(auth).then(create_user))
        .html_templates(Placeholders)
        .build()
        .unwrap();

    for accept in [MIME_JSON, MIME_XML, MIME_HTML, "image/png"] {
        let request = Request::get("/users/micro")
            .header(ACCEPT, accept)
            .extension(RemoteAddr("127.0.0.1:50000".into()))
            .body(Bytes::new())
            .unwrap();
        print(&engine.handle(request));
    }

    let request = Request::post("/users")
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("x-token", "secret")
        .body(Bytes::from_static(b"name=hello&zip=world"))
        .unwrap();
    print(&engine.handle(request));

    let request = Request::post("/users").body(Bytes::from_static(br#"{"name":"hello","zip":"world"}"#)).unwrap();
    print(&engine.handle(request));

    print(&engine.handle(Request::get("/nowhere").body(Bytes::new()).unwrap()));
}
