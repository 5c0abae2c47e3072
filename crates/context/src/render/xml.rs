use crate::content_type::XML_CONTENT_TYPE;
use crate::error::RenderError;
use crate::render::Render;
use bytes::Bytes;
use serde::Serialize;
use std::borrow::Cow;

/// Root element used for values that carry no name of their own, such as maps.
pub const DEFAULT_XML_ROOT: &str = "map";

/// Renders `T` as XML.
///
/// Structs are wrapped in an element named after the struct and maps in
/// [`DEFAULT_XML_ROOT`]; map keys and field names become child elements. Values with
/// no single root element, such as sequences or bare scalars, fail to render.
#[derive(Debug)]
pub struct Xml<'a, T: ?Sized>(pub &'a T);

impl<T: Serialize + ?Sized> Render for Xml<'_, T> {
    fn content_type(&self) -> Cow<'_, str> {
        Cow::Borrowed(XML_CONTENT_TYPE)
    }

    fn render(self) -> Result<Bytes, RenderError> {
        let xml = match quick_xml::se::to_string(self.0) {
            Ok(xml) => xml,
            Err(err) if is_map(self.0) => {
                quick_xml::se::to_string_with_root(DEFAULT_XML_ROOT, self.0).map_err(|_| RenderError::xml(err))?
            }
            Err(err) => return Err(RenderError::xml(err)),
        };
        Ok(xml.into())
    }
}

fn is_map<T: Serialize + ?Sized>(value: &T) -> bool {
    matches!(serde_json::to_value(value), Ok(serde_json::Value::Object(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Person {
        name: String,
        age: u32,
    }

    #[test]
    fn map_uses_default_root() {
        let body = Xml(&json!({"foo": "bar"})).render().unwrap();
        assert_eq!(body, "<map><foo>bar</foo></map>");
    }

    #[test]
    fn struct_uses_its_name() {
        let person = Person { name: "micro".into(), age: 3 };
        let body = Xml(&person).render().unwrap();
        assert_eq!(body, "<Person><name>micro</name><age>3</age></Person>");
    }

    #[test]
    fn sequence_has_no_root() {
        let err = Xml(&vec![1, 2]).render().unwrap_err();
        assert!(matches!(err, RenderError::Xml { .. }));
    }

    #[test]
    fn scalar_has_no_root() {
        assert!(Xml(&json!("bare")).render().is_err());
    }
}
