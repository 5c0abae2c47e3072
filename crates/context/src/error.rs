//! Error types of the context crate.
//!
//! Two tiers live here:
//! - [`ErrorLog`] / [`ErrorEntry`]: the append-only log of request-level problems that
//!   handlers report through [`Context::error`](crate::Context::error) and friends.
//! - [`BindError`], [`RenderError`], [`EngineBuildError`]: the `Result` errors of the
//!   binding, rendering and engine building operations.
//!
//! Contract violations (a missing scratch key in `must_get`, an invalid redirect code)
//! are not represented here, they panic.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Classification of an [`ErrorEntry`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    /// caused by the caller's input or by a downstream dependency
    External,
    /// caused by this service's own logic
    Internal,
}

/// Query over the error log, see [`ErrorLog::by_type`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorFilter {
    /// matches every entry
    Any,
    Only(ErrorType),
}

impl ErrorFilter {
    #[inline]
    pub fn matches(self, error_type: ErrorType) -> bool {
        match self {
            ErrorFilter::Any => true,
            ErrorFilter::Only(expected) => expected == error_type,
        }
    }
}

impl From<ErrorType> for ErrorFilter {
    fn from(error_type: ErrorType) -> Self {
        ErrorFilter::Only(error_type)
    }
}

/// A single problem reported while handling a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEntry {
    err: String,
    meta: serde_json::Value,
    #[serde(rename = "type")]
    error_type: ErrorType,
}

impl ErrorEntry {
    pub fn new(err: impl fmt::Display, error_type: ErrorType, meta: impl Into<serde_json::Value>) -> Self {
        Self { err: err.to_string(), meta: meta.into(), error_type }
    }

    /// Returns the description of the underlying error
    pub fn err(&self) -> &str {
        &self.err
    }

    pub fn meta(&self) -> &serde_json::Value {
        &self.meta
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.err)?;
        if !self.meta.is_null() {
            write!(f, " (meta: {})", self.meta)?;
        }
        Ok(())
    }
}

/// Append-only, ordered log of [`ErrorEntry`]s.
///
/// Entries are only ever removed by [`ErrorLog::clear`], which the context calls while
/// being reset for the next request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ErrorLog {
    entries: Vec<ErrorEntry>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ErrorEntry) {
        self.entries.push(entry);
    }

    /// Returns the most recently appended entry
    pub fn last(&self) -> Option<&ErrorEntry> {
        self.entries.last()
    }

    /// Returns the entries matching `filter`, keeping their original order
    pub fn by_type(&self, filter: impl Into<ErrorFilter>) -> Vec<&ErrorEntry> {
        let filter = filter.into();
        self.entries.iter().filter(|entry| filter.matches(entry.error_type)).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ErrorEntry> {
        self.entries.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

impl std::ops::Index<usize> for ErrorLog {
    type Output = ErrorEntry;

    fn index(&self, index: usize) -> &Self::Output {
        &self.entries[index]
    }
}

impl<'a> IntoIterator for &'a ErrorLog {
    type Item = &'a ErrorEntry;
    type IntoIter = std::slice::Iter<'a, ErrorEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for ErrorLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            writeln!(f, "Error #{:02}: {}", i + 1, entry)?;
        }
        Ok(())
    }
}

/// Failure to decode a request body into the caller's type.
#[derive(Error, Debug)]
pub enum BindError {
    #[error("invalid json body: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("invalid xml body: {reason}")]
    Xml { reason: String },

    #[error("invalid form body: {source}")]
    Form {
        #[from]
        source: serde_urlencoded::de::Error,
    },

    #[error("invalid query string: {reason}")]
    Query { reason: String },
}

impl BindError {
    pub fn xml<S: ToString>(str: S) -> Self {
        Self::Xml { reason: str.to_string() }
    }

    pub fn query<S: ToString>(str: S) -> Self {
        Self::Query { reason: str.to_string() }
    }
}

/// Failure to produce a response body.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("json serialization error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("xml serialization error: {reason}")]
    Xml { reason: String },

    #[error("template '{name}' error: {reason}")]
    Template { name: String, reason: String },

    #[error("no html template set has been installed")]
    MissingTemplates,

    #[error("invalid header value '{value}'")]
    InvalidHeader { value: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl RenderError {
    pub fn xml<S: ToString>(str: S) -> Self {
        Self::Xml { reason: str.to_string() }
    }

    pub fn template<N: ToString, S: ToString>(name: N, str: S) -> Self {
        Self::Template { name: name.to_string(), reason: str.to_string() }
    }

    pub fn invalid_header<S: ToString>(value: S) -> Self {
        Self::InvalidHeader { value: value.to_string() }
    }
}

#[derive(Error, Debug)]
pub enum EngineBuildError {
    #[error("invalid route '{path}': {source}")]
    InvalidRoute {
        path: String,
        #[source]
        source: matchit::InsertError,
    },
    #[error("handler chain of '{path}' has {len} handlers, the limit is {max}", max = crate::MAX_HANDLERS)]
    ChainTooLong { path: String, len: usize },
}
