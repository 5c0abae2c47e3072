//! The per-request execution context.
//!
//! A [`Context`] carries one request through its resolved [`HandlerChain`]. Handlers use
//! it to continue or stop the chain, share values, record errors, decode the request body
//! and render the response.
//!
//! Contexts are pooled by the engine and reused for many requests, see
//! [`ContextPool`](crate::ContextPool); [`Context::reset`] is what makes a used
//! context fit for the next request.

use crate::binding::{self, Binding};
use crate::content_type::{self, MIME_HTML, MIME_JSON, MIME_XML, MIME_XML2};
use crate::error::{BindError, ErrorEntry, ErrorLog, ErrorType, RenderError};
use crate::handler::HandlerChain;
use crate::negotiate::{self, Negotiate};
use crate::params::Params;
use crate::render::{Data, HtmlTemplate, HtmlTemplates, Json, Render, Text, Xml};
use crate::writer::{ResponseTransport, ResponseWriter};
use bytes::Bytes;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderValue, Method, Request, StatusCode, Uri};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

const X_REAL_IP: &str = "x-real-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Value type of the per-request scratch store
pub type AnyValue = dyn Any + Send + Sync;

/// Transport level address of the peer, put into the request extensions by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAddr(pub String);

/// Position of a context in its handler chain.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ChainState {
    /// no handler has run yet
    Idle,
    /// the handler at this index is the last one that was started
    Running(usize),
    /// terminal, no further handler runs for this request
    Aborted,
}

pub struct Context {
    request: Request<Bytes>,
    writer: ResponseWriter,
    params: Params,
    keys: HashMap<String, Box<AnyValue>>,
    errors: ErrorLog,
    accepted: Option<Vec<String>>,
    handlers: HandlerChain,
    pub(crate) state: ChainState,
    templates: Option<Arc<dyn HtmlTemplates>>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", self.request.method())
            .field("uri", self.request.uri())
            .field("params", &self.params)
            .field("keys", &self.keys.keys().collect::<Vec<_>>())
            .field("errors", &self.errors)
            .field("accepted", &self.accepted)
            .field("handlers", &self.handlers)
            .field("state", &self.state)
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Creates an idle context; it must be [`reset`](Self::reset) before serving a request
    pub fn new() -> Self {
        Self {
            request: Request::default(),
            writer: ResponseWriter::new(),
            params: Params::new(),
            keys: HashMap::new(),
            errors: ErrorLog::new(),
            accepted: None,
            handlers: HandlerChain::empty(),
            state: ChainState::Idle,
            templates: None,
        }
    }

    /// Prepares the context for a new request.
    ///
    /// Clears the chain position, the scratch store, the error log, the accepted types
    /// override, the path parameters and the handler chain, and rebinds the response writer
    /// to `transport`. The route and the template set are installed afterwards with
    /// [`set_route`](Self::set_route) and [`set_html_templates`](Self::set_html_templates).
    pub fn reset(&mut self, request: Request<Bytes>, transport: Box<dyn ResponseTransport>) {
        self.request = request;
        self.writer.reset(transport);
        self.params.clear();
        self.keys.clear();
        self.errors.clear();
        self.accepted = None;
        self.handlers = HandlerChain::empty();
        self.state = ChainState::Idle;
    }

    /// Drops everything the finished request left behind while the context sits idle.
    ///
    /// The request, the scratch values, the error log, the route and the template set are
    /// released and the writer lets go of its transport.
    pub(crate) fn recycle(&mut self) {
        self.request = Request::default();
        self.writer.unbind();
        self.params.clear();
        self.keys.clear();
        self.errors.clear();
        self.accepted = None;
        self.handlers = HandlerChain::empty();
        self.state = ChainState::Idle;
        self.templates = None;
    }

    /// Installs the handler chain and path parameters resolved by the router
    pub fn set_route(&mut self, handlers: HandlerChain, params: Params) {
        self.handlers = handlers;
        self.params = params;
    }

    pub fn set_html_templates(&mut self, templates: Option<Arc<dyn HtmlTemplates>>) {
        self.templates = templates;
    }

    /// Runs the remaining handlers of the chain.
    ///
    /// A handler calling `next` gets control back after everything behind it has run. A
    /// handler that returns without calling it does not stop the chain: the `next` call
    /// that started it moves on to the following handler. Only [`abort`](Self::abort)
    /// stops the chain.
    pub fn next(&mut self) {
        loop {
            let index = match self.state {
                ChainState::Idle => 0,
                ChainState::Running(index) => index + 1,
                ChainState::Aborted => return,
            };
            self.state = ChainState::Running(index);

            match self.handlers.get(index) {
                Some(handler) => handler.handle(self),
                None => return,
            }
        }
    }

    /// Stops the chain, handlers that haven't started yet will not run
    pub fn abort(&mut self) {
        debug!(uri = %self.request.uri(), "handler chain aborted");
        self.state = ChainState::Aborted;
    }

    /// Sets the response status and aborts; the head is flushed later by whoever writes
    pub fn abort_with_status(&mut self, code: StatusCode) {
        self.writer.set_status(code);
        self.abort();
    }

    /// Records `err` as an external error, sets the response status and aborts
    pub fn fail(&mut self, code: StatusCode, err: impl fmt::Display) {
        self.error(err, ());
        self.abort_with_status(code);
    }

    /// Same as [`fail`](Self::fail)
    #[inline]
    pub fn abort_with_error(&mut self, code: StatusCode, err: impl fmt::Display) {
        self.fail(code, err);
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.state == ChainState::Aborted
    }

    /// Appends an [`ErrorType::External`] entry, the chain keeps running
    pub fn error(&mut self, err: impl fmt::Display, meta: impl Into<serde_json::Value>) {
        self.error_typed(err, ErrorType::External, meta);
    }

    pub fn error_typed(&mut self, err: impl fmt::Display, error_type: ErrorType, meta: impl Into<serde_json::Value>) {
        self.errors.push(ErrorEntry::new(err, error_type, meta));
    }

    /// Description of the most recent error, if any
    pub fn last_error(&self) -> Option<&str> {
        self.errors.last().map(ErrorEntry::err)
    }

    pub fn errors(&self) -> &ErrorLog {
        &self.errors
    }

    /// Stores `value` under `key`, replacing any previous value
    pub fn set<V: Any + Send + Sync>(&mut self, key: impl Into<String>, value: V) {
        self.keys.insert(key.into(), Box::new(value));
    }

    pub fn get(&self, key: &str) -> Option<&AnyValue> {
        self.keys.get(key).map(Box::as_ref)
    }

    /// Returns the value under `key` if it exists and is a `T`
    pub fn get_as<T: Any>(&self, key: &str) -> Option<&T> {
        self.get(key).and_then(|value| value.downcast_ref::<T>())
    }

    /// # Panics
    ///
    /// Panics if `key` does not exist.
    pub fn must_get(&self, key: &str) -> &AnyValue {
        match self.get(key) {
            Some(value) => value,
            None => panic!("key \"{key}\" does not exist"),
        }
    }

    /// # Panics
    ///
    /// Panics if `key` does not exist or holds another type than `T`.
    pub fn must_get_as<T: Any>(&self, key: &str) -> &T {
        match self.must_get(key).downcast_ref::<T>() {
            Some(value) => value,
            None => panic!("key \"{key}\" does not hold a {}", std::any::type_name::<T>()),
        }
    }

    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request<Bytes> {
        &mut self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// Returns the request header `name` when it is valid visible ASCII
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.headers().get(name).and_then(|value| value.to_str().ok())
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.by_name(name)
    }

    /// Returns the first value of the URL query parameter `key`
    pub fn query(&self, key: &str) -> Option<String> {
        let query = self.request.uri().query()?;
        serde_urlencoded::from_str::<Vec<(String, String)>>(query)
            .ok()?
            .into_iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    /// The request `Content-Type` without its parameters
    pub fn content_type(&self) -> Option<String> {
        self.header(CONTENT_TYPE.as_str()).map(content_type::essence)
    }

    /// Best guess of the client address.
    ///
    /// `X-Real-IP` wins over the first `X-Forwarded-For` entry, which wins over the
    /// transport address.
    pub fn client_ip(&self) -> Option<&str> {
        let real_ip = self.header(X_REAL_IP).map(str::trim).filter(|ip| !ip.is_empty());
        if real_ip.is_some() {
            return real_ip;
        }

        let forwarded = self
            .header(X_FORWARDED_FOR)
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if forwarded.is_some() {
            return forwarded;
        }

        self.request.extensions().get::<RemoteAddr>().map(|addr| addr.0.as_str())
    }

    /// Decodes the request with the binding chosen from its method and `Content-Type`.
    ///
    /// On failure the error is recorded and the chain aborted with `400 Bad Request`.
    pub fn bind<T: DeserializeOwned>(&mut self) -> Result<T, BindError> {
        let content_type = self.content_type();
        let binding = binding::default_binding(self.request.method(), content_type.as_deref());
        self.bind_with(binding)
    }

    /// Like [`bind`](Self::bind) but with an explicit binding, ignoring `Content-Type`
    pub fn bind_with<T: DeserializeOwned, B: Binding>(&mut self, binding: B) -> Result<T, BindError> {
        match binding.bind(&self.request) {
            Ok(value) => Ok(value),
            Err(e) => {
                debug!(binding = binding.name(), cause = %e, "bind request error");
                self.fail(StatusCode::BAD_REQUEST, &e);
                Err(e)
            }
        }
    }

    /// Picks the offer to respond with, see [`negotiate`](crate::negotiate) for the rules.
    ///
    /// An override installed by [`set_accepted`](Self::set_accepted) takes the place of
    /// the request's `Accept` header.
    pub fn negotiate_format<'o>(&self, offered: &[&'o str]) -> Option<&'o str> {
        match &self.accepted {
            Some(accepted) => negotiate::negotiate(accepted.as_slice(), offered),
            None => {
                let accepted = self.header(http::header::ACCEPT.as_str()).map(negotiate::parse_accept).unwrap_or_default();
                negotiate::negotiate(accepted.as_slice(), offered)
            }
        }
    }

    /// Overrides the request's `Accept` header for the rest of this request
    pub fn set_accepted(&mut self, types: &[&str]) {
        self.accepted = Some(types.iter().map(|t| (*t).to_owned()).collect());
    }

    pub fn accepted(&self) -> Option<&[String]> {
        self.accepted.as_deref()
    }

    /// Renders `data` in the negotiated format, aborts with `406 Not Acceptable` when none
    /// of the offers is accepted
    pub fn negotiate<T: Serialize + ?Sized>(&mut self, code: StatusCode, negotiate: Negotiate<'_, T>) {
        match self.negotiate_format(negotiate.offered) {
            Some(MIME_JSON) => self.json(code, negotiate.data),
            Some(MIME_XML | MIME_XML2) => self.xml(code, negotiate.data),
            Some(MIME_HTML) => match negotiate.html_name {
                Some(name) => self.html(code, name, negotiate.data),
                None => self.render_failed(RenderError::template("", "no html template name was given")),
            },
            _ => self.fail(StatusCode::NOT_ACCEPTABLE, "the accepted formats are not offered by the server"),
        }
    }

    pub fn writer(&self) -> &ResponseWriter {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut ResponseWriter {
        &mut self.writer
    }

    /// Sets the response status without writing anything
    pub fn status(&mut self, code: StatusCode) {
        self.writer.set_status(code);
    }

    /// Writes `code`, the renderer's `Content-Type` and its body.
    ///
    /// A renderer failure is recorded as an [`ErrorType::Internal`] error and turns the
    /// response into `500 Internal Server Error`.
    pub fn render<R: Render>(&mut self, code: StatusCode, render: R) {
        let content_type = match HeaderValue::from_str(&render.content_type()) {
            Ok(content_type) => content_type,
            Err(_) => return self.render_failed(RenderError::invalid_header(render.content_type())),
        };

        let body = match render.render() {
            Ok(body) => body,
            Err(e) => return self.render_failed(e),
        };

        self.writer.set_header(CONTENT_TYPE, content_type);
        self.writer.set_status(code);
        if let Err(e) = self.writer.write(&body) {
            error!(cause = %e, "write response body error");
            self.error_typed(RenderError::from(e), ErrorType::Internal, ());
        }
    }

    /// Serializes `obj` as JSON
    pub fn json<T: Serialize + ?Sized>(&mut self, code: StatusCode, obj: &T) {
        self.render(code, Json(obj));
    }

    /// Serializes `obj` as XML
    pub fn xml<T: Serialize + ?Sized>(&mut self, code: StatusCode, obj: &T) {
        self.render(code, Xml(obj));
    }

    /// Executes the template `name` of the installed template set against `obj`
    pub fn html<T: Serialize + ?Sized>(&mut self, code: StatusCode, name: &str, obj: &T) {
        let Some(templates) = self.templates.clone() else {
            return self.render_failed(RenderError::MissingTemplates);
        };
        let data = match serde_json::to_value(obj) {
            Ok(data) => data,
            Err(e) => return self.render_failed(e.into()),
        };
        self.render(code, HtmlTemplate::new(templates.as_ref(), name, data));
    }

    /// Writes formatted text as `text/plain`, e.g. `ctx.string(code, format_args!("{id}"))`
    pub fn string(&mut self, code: StatusCode, args: fmt::Arguments<'_>) {
        self.render(code, Text::plain(args));
    }

    /// Writes formatted text as `text/html`
    pub fn html_string(&mut self, code: StatusCode, args: fmt::Arguments<'_>) {
        self.render(code, Text::html(args));
    }

    /// Writes `data` verbatim with the given `Content-Type`
    pub fn data(&mut self, code: StatusCode, content_type: &str, data: impl Into<Bytes>) {
        self.render(code, Data::new(content_type, data));
    }

    /// Redirects to `location` and flushes the head.
    ///
    /// # Panics
    ///
    /// Panics if `code` is not in `300..308`, nothing is written in that case.
    pub fn redirect(&mut self, code: StatusCode, location: &str) {
        assert!((300..308).contains(&code.as_u16()), "cannot redirect with status code {}", code.as_u16());

        match HeaderValue::from_str(location) {
            Ok(location) => {
                self.writer.set_header(LOCATION, location);
                self.writer.set_status(code);
                self.writer.write_header_now();
            }
            Err(_) => self.render_failed(RenderError::invalid_header(location)),
        }
    }

    fn render_failed(&mut self, err: RenderError) {
        error!(cause = %err, uri = %self.request.uri(), "render response error");
        self.error_typed(&err, ErrorType::Internal, ());
        self.abort_with_status(StatusCode::INTERNAL_SERVER_ERROR);
    }
}
