use crate::error::RenderError;
use crate::render::Render;
use bytes::Bytes;
use std::borrow::Cow;

/// Raw bytes sent with a caller supplied media type, written verbatim.
#[derive(Debug)]
pub struct Data<'a> {
    content_type: &'a str,
    data: Bytes,
}

impl<'a> Data<'a> {
    pub fn new(content_type: &'a str, data: impl Into<Bytes>) -> Self {
        Self { content_type, data: data.into() }
    }
}

impl Render for Data<'_> {
    fn content_type(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.content_type)
    }

    fn render(self) -> Result<Bytes, RenderError> {
        Ok(self.data)
    }
}
