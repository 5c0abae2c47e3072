//! Request body decoders.
//!
//! A [`Binding`] decodes the buffered request into any `serde` deserializable type.
//! [`default_binding`] picks one from the request method and `Content-Type`:
//!
//! | request                                        | binding  |
//! |------------------------------------------------|----------|
//! | `application/json`                             | [`JSON`] |
//! | `application/xml`, `text/xml`                  | [`XML`]  |
//! | any other `GET`                                | [`QUERY`]|
//! | `application/x-www-form-urlencoded`            | [`FORM`] |
//! | missing or anything else                       | [`JSON`] |

use crate::content_type::{MIME_JSON, MIME_POST_FORM, MIME_XML, MIME_XML2};
use crate::error::BindError;
use bytes::Bytes;
use http::{Method, Request};
use serde::de::DeserializeOwned;

pub trait Binding {
    fn name(&self) -> &'static str;

    fn bind<T: DeserializeOwned>(&self, req: &Request<Bytes>) -> Result<T, BindError>;
}

/// Decodes the body as JSON
#[derive(Debug, Copy, Clone, Default)]
pub struct JsonBinding;

/// Decodes the body as XML, ignoring the name of the root element
#[derive(Debug, Copy, Clone, Default)]
pub struct XmlBinding;

/// Decodes an `application/x-www-form-urlencoded` body
#[derive(Debug, Copy, Clone, Default)]
pub struct FormBinding;

/// Decodes the URL query string, the body is ignored
#[derive(Debug, Copy, Clone, Default)]
pub struct QueryBinding;

pub const JSON: JsonBinding = JsonBinding;
pub const XML: XmlBinding = XmlBinding;
pub const FORM: FormBinding = FormBinding;
pub const QUERY: QueryBinding = QueryBinding;

impl Binding for JsonBinding {
    fn name(&self) -> &'static str {
        "json"
    }

    fn bind<T: DeserializeOwned>(&self, req: &Request<Bytes>) -> Result<T, BindError> {
        Ok(serde_json::from_slice(req.body())?)
    }
}

impl Binding for XmlBinding {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn bind<T: DeserializeOwned>(&self, req: &Request<Bytes>) -> Result<T, BindError> {
        let body = std::str::from_utf8(req.body()).map_err(BindError::xml)?;
        quick_xml::de::from_str(body).map_err(BindError::xml)
    }
}

impl Binding for FormBinding {
    fn name(&self) -> &'static str {
        "form"
    }

    fn bind<T: DeserializeOwned>(&self, req: &Request<Bytes>) -> Result<T, BindError> {
        Ok(serde_urlencoded::from_bytes(req.body())?)
    }
}

impl Binding for QueryBinding {
    fn name(&self) -> &'static str {
        "query"
    }

    fn bind<T: DeserializeOwned>(&self, req: &Request<Bytes>) -> Result<T, BindError> {
        let query = req.uri().query().unwrap_or_default();
        serde_qs::from_str(query).map_err(BindError::query)
    }
}

/// The binding chosen by [`default_binding`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DefaultBinding {
    Json,
    Xml,
    Form,
    Query,
}

impl Binding for DefaultBinding {
    fn name(&self) -> &'static str {
        match self {
            DefaultBinding::Json => JSON.name(),
            DefaultBinding::Xml => XML.name(),
            DefaultBinding::Form => FORM.name(),
            DefaultBinding::Query => QUERY.name(),
        }
    }

    fn bind<T: DeserializeOwned>(&self, req: &Request<Bytes>) -> Result<T, BindError> {
        match self {
            DefaultBinding::Json => JSON.bind(req),
            DefaultBinding::Xml => XML.bind(req),
            DefaultBinding::Form => FORM.bind(req),
            DefaultBinding::Query => QUERY.bind(req),
        }
    }
}

/// Picks a binding from the request method and its `Content-Type` essence
pub fn default_binding(method: &Method, content_type: Option<&str>) -> DefaultBinding {
    match content_type {
        Some(MIME_JSON) => DefaultBinding::Json,
        Some(MIME_XML | MIME_XML2) => DefaultBinding::Xml,
        _ if method == Method::GET => DefaultBinding::Query,
        Some(MIME_POST_FORM) => DefaultBinding::Form,
        _ => DefaultBinding::Json,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct FooBar {
        foo: String,
        bar: String,
    }

    fn request(uri: &str, body: &'static str) -> Request<Bytes> {
        Request::builder().method(Method::POST).uri(uri).body(Bytes::from_static(body.as_bytes())).unwrap()
    }

    fn foo_bar() -> FooBar {
        FooBar { foo: "bar".into(), bar: "foo".into() }
    }

    #[test]
    fn selection() {
        assert_eq!(default_binding(&Method::GET, None), DefaultBinding::Query);
        assert_eq!(default_binding(&Method::GET, Some(MIME_POST_FORM)), DefaultBinding::Query);
        assert_eq!(default_binding(&Method::GET, Some(MIME_JSON)), DefaultBinding::Json);
        assert_eq!(default_binding(&Method::GET, Some(MIME_XML2)), DefaultBinding::Xml);
        assert_eq!(default_binding(&Method::POST, Some(MIME_JSON)), DefaultBinding::Json);
        assert_eq!(default_binding(&Method::PUT, Some(MIME_XML)), DefaultBinding::Xml);
        assert_eq!(default_binding(&Method::POST, Some(MIME_XML2)), DefaultBinding::Xml);
        assert_eq!(default_binding(&Method::POST, Some(MIME_POST_FORM)), DefaultBinding::Form);
        assert_eq!(default_binding(&Method::POST, Some("text/csv")), DefaultBinding::Json);
        assert_eq!(default_binding(&Method::POST, None), DefaultBinding::Json);
    }

    #[test]
    fn json() {
        let req = request("/", r#"{"foo":"bar", "bar":"foo"}"#);
        assert_eq!(JSON.bind::<FooBar>(&req).unwrap(), foo_bar());
    }

    #[test]
    fn empty_json_body_is_an_error() {
        let req = request("/", "");
        assert!(matches!(JSON.bind::<FooBar>(&req), Err(BindError::Json { .. })));
    }

    #[test]
    fn xml() {
        let req = request("/", "<obj><foo>bar</foo><bar>foo</bar></obj>");
        assert_eq!(XML.bind::<FooBar>(&req).unwrap(), foo_bar());

        let req = request("/", "");
        assert!(matches!(XML.bind::<FooBar>(&req), Err(BindError::Xml { .. })));
    }

    #[test]
    fn form() {
        let req = request("/", "foo=bar&bar=foo");
        assert_eq!(FORM.bind::<FooBar>(&req).unwrap(), foo_bar());
    }

    #[test]
    fn query() {
        let req = request("/search?foo=bar&bar=foo", "ignored");
        assert_eq!(QUERY.bind::<FooBar>(&req).unwrap(), foo_bar());

        let req = request("/search", "");
        assert!(matches!(QUERY.bind::<FooBar>(&req), Err(BindError::Query { .. })));
    }
}
