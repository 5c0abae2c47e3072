//! The per-request execution context of the micro web framework.
//!
//! A [`Context`] carries one request through an ordered chain of [`Handler`]s. Handlers
//! share data through a scratch store, report problems to an error log, negotiate the
//! response format with the client, bind the request body into typed values and render
//! the response. The [`Engine`] resolves routes, hands out pooled contexts and drives the
//! chain.
//!
//! ```
//! use micro_context::router::get;
//! use micro_context::{Context, Engine, H};
//! use bytes::Bytes;
//! use http::{Request, StatusCode};
//! use serde_json::json;
//!
//! fn auth(ctx: &mut Context) {
//!     match ctx.header("x-user").map(str::to_owned) {
//!         Some(user) => ctx.set("user", user),
//!         None => ctx.fail(StatusCode::UNAUTHORIZED, "missing x-user header"),
//!     }
//! }
//!
//! fn profile(ctx: &mut Context) {
//!     let user = ctx.must_get_as::<String>("user").clone();
//!     let mut body = H::new();
//!     body.insert("user".into(), json!(user));
//!     ctx.json(StatusCode::OK, &body);
//! }
//!
//! let engine = Engine::builder().route("/profile", get(auth).then(profile)).build().unwrap();
//!
//! let request = Request::get("/profile").header("x-user", "alice").body(Bytes::new()).unwrap();
//! let response = engine.handle(request);
//! assert_eq!(response.status(), StatusCode::OK);
//! assert_eq!(response.body(), "{\"user\":\"alice\"}\n");
//!
//! let response = engine.handle(Request::get("/profile").body(Bytes::new()).unwrap());
//! assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
//! ```

mod context;
mod engine;
mod error;
mod handler;
mod params;
mod pool;
mod writer;

pub mod binding;
pub mod content_type;
pub mod middleware;
pub mod negotiate;
pub mod render;
pub mod router;

pub use context::AnyValue;
pub use context::Context;
pub use context::RemoteAddr;
pub use engine::Engine;
pub use engine::EngineBuilder;
pub use error::{BindError, EngineBuildError, ErrorEntry, ErrorFilter, ErrorLog, ErrorType, RenderError};
pub use handler::{Handler, HandlerChain, MAX_HANDLERS, handler_fn};
pub use negotiate::Negotiate;
pub use params::Params;
pub use pool::{ContextPool, DEFAULT_MAX_IDLE, PooledContext};
pub use router::Router;
pub use writer::{ResponseRecorder, ResponseTransport, ResponseWriter};

/// Shorthand for building ad hoc JSON objects
pub type H = serde_json::Map<String, serde_json::Value>;
