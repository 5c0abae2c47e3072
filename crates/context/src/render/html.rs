use crate::content_type::HTML_CONTENT_TYPE;
use crate::error::RenderError;
use crate::render::Render;
use bytes::Bytes;
use std::borrow::Cow;
use std::error::Error;
use std::io;

/// A preloaded set of named HTML templates.
///
/// Loading and compiling templates is up to the implementation, the context only asks it
/// to execute one template by name against a data value.
#[cfg_attr(test, mockall::automock)]
pub trait HtmlTemplates: Send + Sync {
    fn execute(
        &self,
        name: &str,
        data: &serde_json::Value,
        out: &mut dyn io::Write,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Executes a named template from an [`HtmlTemplates`] set.
pub struct HtmlTemplate<'a> {
    templates: &'a dyn HtmlTemplates,
    name: &'a str,
    data: serde_json::Value,
}

impl std::fmt::Debug for HtmlTemplate<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlTemplate").field("name", &self.name).field("data", &self.data).finish_non_exhaustive()
    }
}

impl<'a> HtmlTemplate<'a> {
    pub fn new(templates: &'a dyn HtmlTemplates, name: &'a str, data: serde_json::Value) -> Self {
        Self { templates, name, data }
    }
}

impl Render for HtmlTemplate<'_> {
    fn content_type(&self) -> Cow<'_, str> {
        Cow::Borrowed(HTML_CONTENT_TYPE)
    }

    fn render(self) -> Result<Bytes, RenderError> {
        let mut out = Vec::with_capacity(512);
        self.templates
            .execute(self.name, &self.data, &mut out)
            .map_err(|e| RenderError::template(self.name, e))?;
        Ok(out.into())
    }
}
