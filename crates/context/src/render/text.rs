use crate::content_type::{HTML_CONTENT_TYPE, PLAIN_CONTENT_TYPE};
use crate::error::RenderError;
use crate::render::Render;
use bytes::Bytes;
use std::borrow::Cow;
use std::fmt;

/// Renders preformatted text, either as `text/plain` or as raw `text/html`.
#[derive(Debug)]
pub struct Text<'a> {
    content_type: &'static str,
    args: fmt::Arguments<'a>,
}

impl<'a> Text<'a> {
    pub fn plain(args: fmt::Arguments<'a>) -> Self {
        Self { content_type: PLAIN_CONTENT_TYPE, args }
    }

    pub fn html(args: fmt::Arguments<'a>) -> Self {
        Self { content_type: HTML_CONTENT_TYPE, args }
    }
}

impl Render for Text<'_> {
    fn content_type(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.content_type)
    }

    fn render(self) -> Result<Bytes, RenderError> {
        Ok(match self.args.as_str() {
            Some(literal) => Bytes::from_static(literal.as_bytes()),
            None => Bytes::from(self.args.to_string()),
        })
    }
}
