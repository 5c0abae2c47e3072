//! Response renderers.
//!
//! A renderer turns a value into a complete response body of one media type. The
//! [`Context`](crate::Context) serializes first and only then touches the response, so a
//! value that fails to serialize leaves the status and headers free for the `500` that
//! reports it.

mod data;
mod html;
mod json;
mod text;
mod xml;

pub use data::Data;
pub use html::{HtmlTemplate, HtmlTemplates};
#[cfg(test)]
pub(crate) use html::MockHtmlTemplates;
pub use json::Json;
pub use text::Text;
pub use xml::Xml;

use crate::error::RenderError;
use bytes::Bytes;
use std::borrow::Cow;

pub trait Render {
    /// Value of the `Content-Type` response header
    fn content_type(&self) -> Cow<'_, str>;

    /// Produces the whole response body
    fn render(self) -> Result<Bytes, RenderError>;
}
