//! The request driver: route resolution, context checkout and chain walking.
//!
//! ```
//! use micro_context::router::get;
//! use micro_context::{Context, Engine};
//! use bytes::Bytes;
//! use http::{Request, StatusCode};
//!
//! fn hello(ctx: &mut Context) {
//!     let name = ctx.param("name").unwrap_or("world").to_owned();
//!     ctx.string(StatusCode::OK, format_args!("hello {name}"));
//! }
//!
//! let engine = Engine::builder().route("/hello/{name}", get(hello)).build().unwrap();
//!
//! let response = engine.handle(Request::get("/hello/micro").body(Bytes::new()).unwrap());
//! assert_eq!(response.status(), StatusCode::OK);
//! assert_eq!(response.body(), "hello micro");
//! ```

use crate::error::EngineBuildError;
use crate::handler::{Handler, HandlerChain};
use crate::params::Params;
use crate::pool::{ContextPool, DEFAULT_MAX_IDLE};
use crate::render::HtmlTemplates;
use crate::router::{Router, RouterBuilder, RouterItemBuilder, checked_chain};
use crate::writer::ResponseRecorder;
use crate::Context;
use arc_swap::ArcSwap;
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use std::sync::Arc;
use tracing::debug;

type Templates = Option<Arc<dyn HtmlTemplates>>;

pub struct EngineBuilder {
    router: RouterBuilder,
    not_found: Vec<Arc<dyn Handler>>,
    templates: Templates,
    max_idle_contexts: usize,
}

impl std::fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("router", &self.router)
            .field("not_found", &self.not_found.len())
            .field("templates", &self.templates.is_some())
            .field("max_idle_contexts", &self.max_idle_contexts)
            .finish()
    }
}

impl EngineBuilder {
    fn new() -> Self {
        Self { router: Router::builder(), not_found: vec![], templates: None, max_idle_contexts: DEFAULT_MAX_IDLE }
    }

    /// Adds a handler in front of every route and of the not found chain
    pub fn with_middleware<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.router = self.router.with_middleware(handler);
        self
    }

    pub fn route(mut self, route: impl Into<String>, item_builder: RouterItemBuilder) -> Self {
        self.router = self.router.route(route, item_builder);
        self
    }

    /// Appends a handler to the chain run when no route matches.
    ///
    /// The chain starts with the status set to `404 Not Found`; without any handler a plain
    /// text `404 page not found` body is written.
    pub fn not_found<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.not_found.push(Arc::new(handler));
        self
    }

    pub fn html_templates<T: HtmlTemplates + 'static>(mut self, templates: T) -> Self {
        self.templates = Some(Arc::new(templates));
        self
    }

    /// Upper bound of the contexts kept around between requests
    pub fn max_idle_contexts(mut self, max_idle_contexts: usize) -> Self {
        self.max_idle_contexts = max_idle_contexts;
        self
    }

    pub fn build(self) -> Result<Engine, EngineBuildError> {
        let router = self.router.build()?;

        let mut not_found = self.not_found;
        if not_found.is_empty() {
            not_found.push(Arc::new(default_not_found));
        }
        let not_found = checked_chain("not found", router.middleware(), &not_found)?;

        Ok(Engine {
            router,
            not_found,
            templates: ArcSwap::from_pointee(self.templates),
            pool: ContextPool::new(self.max_idle_contexts),
        })
    }
}

pub struct Engine {
    router: Router,
    not_found: HandlerChain,
    templates: ArcSwap<Templates>,
    pool: ContextPool,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("router", &self.router)
            .field("not_found", &self.not_found)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Replaces the template set, requests already running keep the previous one
    pub fn set_html_templates<T: HtmlTemplates + 'static>(&self, templates: T) {
        self.templates.store(Arc::new(Some(Arc::new(templates))));
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }

    /// Runs `request` through its handler chain and returns the response it produced
    pub fn handle(&self, request: Request<Bytes>) -> Response<Bytes> {
        let route = self.router.at(request.method(), request.uri().path()).map(|route| route.into_parts());

        let recorder = ResponseRecorder::new();
        let mut ctx = self.pool.checkout(request, Box::new(recorder.clone()));
        ctx.set_html_templates(Option::clone(&self.templates.load()));

        match route {
            Some((handlers, params)) => ctx.set_route(handlers, params),
            None => {
                debug!(method = %ctx.method(), path = ctx.uri().path(), "no route, running the not found chain");
                ctx.set_route(self.not_found.clone(), Params::new());
                ctx.status(StatusCode::NOT_FOUND);
            }
        }

        ctx.next();
        ctx.writer_mut().write_header_now();
        drop(ctx);

        recorder.take_response()
    }
}

fn default_not_found(ctx: &mut Context) {
    ctx.string(StatusCode::NOT_FOUND, format_args!("404 page not found"));
}
