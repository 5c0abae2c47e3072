//! Media type constants and `Content-Type` helpers.

use mime::Mime;

pub const MIME_JSON: &str = "application/json";
pub const MIME_XML: &str = "application/xml";
pub const MIME_XML2: &str = "text/xml";
pub const MIME_HTML: &str = "text/html";
pub const MIME_PLAIN: &str = "text/plain";
pub const MIME_POST_FORM: &str = "application/x-www-form-urlencoded";

pub(crate) const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub(crate) const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";
pub(crate) const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
pub(crate) const PLAIN_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Strips the parameters (`; charset=...`) off a media type.
///
/// Values that `mime` can't parse fall back to everything before the first `;`.
pub fn essence(content_type: &str) -> String {
    match content_type.parse::<Mime>() {
        Ok(mime) => mime.essence_str().to_owned(),
        Err(_) => content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase(),
    }
}
