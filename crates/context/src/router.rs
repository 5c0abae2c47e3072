//! Route registration and lookup.
//!
//! The router only resolves `(method, path)` to a [`HandlerChain`] and its [`Params`];
//! path matching itself is delegated to `matchit`.

use crate::error::EngineBuildError;
use crate::handler::{Handler, HandlerChain, MAX_HANDLERS};
use crate::params::Params;
use http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

type InnerRouter<T> = matchit::Router<T>;

/// Main router structure that resolves requests to handler chains
pub struct Router {
    inner_router: InnerRouter<Vec<RouterItem>>,
    middleware: HandlerChain,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").field("middleware", &self.middleware).finish_non_exhaustive()
    }
}

/// A route for one method: the full chain, global middleware first
#[derive(Debug)]
pub struct RouterItem {
    method: Method,
    handlers: HandlerChain,
}

/// Result of matching a route
#[derive(Debug)]
pub struct RouteResult<'router> {
    handlers: &'router HandlerChain,
    params: Params,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Resolves a request, `None` when no route matches the path and method
    pub fn at(&self, method: &Method, path: &str) -> Option<RouteResult<'_>> {
        let matched = match self.inner_router.at(path) {
            Ok(matched) => matched,
            Err(e) => {
                debug!(path, cause = %e, "no route matched");
                return None;
            }
        };

        let item = matched.value.iter().find(|item| item.method == method)?;
        Some(RouteResult { handlers: &item.handlers, params: matched.params.into() })
    }

    /// The global middleware every chain starts with
    pub fn middleware(&self) -> &HandlerChain {
        &self.middleware
    }
}

impl RouterItem {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn handlers(&self) -> &HandlerChain {
        &self.handlers
    }
}

impl<'router> RouteResult<'router> {
    pub fn handlers(&self) -> &'router HandlerChain {
        self.handlers
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn into_parts(self) -> (HandlerChain, Params) {
        (self.handlers.clone(), self.params)
    }
}

pub struct RouterBuilder {
    data: HashMap<String, Vec<RouterItemBuilder>>,
    middleware: Vec<Arc<dyn Handler>>,
}

impl std::fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("routes", &self.data.keys().collect::<Vec<_>>())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

impl RouterBuilder {
    fn new() -> Self {
        Self { data: HashMap::new(), middleware: vec![] }
    }

    pub fn route(mut self, route: impl Into<String>, item_builder: RouterItemBuilder) -> Self {
        let vec = self.data.entry(route.into()).or_default();
        vec.push(item_builder);
        self
    }

    /// Adds a handler in front of every route, in registration order
    pub fn with_middleware<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.middleware.push(Arc::new(handler));
        self
    }

    /// Builds the router from the accumulated routes and middleware.
    ///
    /// Fails when a path is rejected by the matcher or when a route's chain, middleware
    /// included, holds more than [`MAX_HANDLERS`] handlers.
    pub fn build(self) -> Result<Router, EngineBuildError> {
        let middleware = checked_chain("*", &HandlerChain::default(), &self.middleware)?;
        let mut inner_router = InnerRouter::new();

        for (path, items) in self.data {
            let router_items = items
                .into_iter()
                .map(|item_builder| {
                    Ok(RouterItem {
                        method: item_builder.method,
                        handlers: checked_chain(&path, &middleware, &item_builder.handlers)?,
                    })
                })
                .collect::<Result<Vec<_>, EngineBuildError>>()?;

            inner_router
                .insert(path.clone(), router_items)
                .map_err(|source| EngineBuildError::InvalidRoute { path, source })?;
        }

        Ok(Router { inner_router, middleware })
    }
}

/// Appends `handlers` to `head`, refusing chains longer than [`MAX_HANDLERS`]
pub(crate) fn checked_chain(
    path: &str,
    head: &HandlerChain,
    handlers: &[Arc<dyn Handler>],
) -> Result<HandlerChain, EngineBuildError> {
    let len = head.len() + handlers.len();
    if len > MAX_HANDLERS {
        return Err(EngineBuildError::ChainTooLong { path: path.to_owned(), len });
    }
    Ok(head.combine(handlers))
}

macro_rules! method_router_item {
    ($method:ident, $method_const:ident) => {
        pub fn $method<H: Handler + 'static>(handler: H) -> RouterItemBuilder {
            RouterItemBuilder { method: Method::$method_const, handlers: vec![Arc::new(handler)] }
        }
    };
}

method_router_item!(get, GET);
method_router_item!(post, POST);
method_router_item!(put, PUT);
method_router_item!(delete, DELETE);
method_router_item!(head, HEAD);
method_router_item!(options, OPTIONS);
method_router_item!(connect, CONNECT);
method_router_item!(patch, PATCH);
method_router_item!(trace, TRACE);

pub struct RouterItemBuilder {
    method: Method,
    handlers: Vec<Arc<dyn Handler>>,
}

impl std::fmt::Debug for RouterItemBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterItemBuilder").field("method", &self.method).field("handlers", &self.handlers.len()).finish()
    }
}

impl RouterItemBuilder {
    /// Appends a handler to this route's chain
    pub fn then<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }
}
