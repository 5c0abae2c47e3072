use crate::content_type::JSON_CONTENT_TYPE;
use crate::error::RenderError;
use crate::render::Render;
use bytes::Bytes;
use serde::Serialize;
use std::borrow::Cow;

/// Renders `T` as a JSON object followed by a newline.
#[derive(Debug)]
pub struct Json<'a, T: ?Sized>(pub &'a T);

impl<T: Serialize + ?Sized> Render for Json<'_, T> {
    fn content_type(&self) -> Cow<'_, str> {
        Cow::Borrowed(JSON_CONTENT_TYPE)
    }

    fn render(self) -> Result<Bytes, RenderError> {
        let mut body = serde_json::to_vec(self.0)?;
        body.push(b'\n');
        Ok(body.into())
    }
}
