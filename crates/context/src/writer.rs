//! Response writing.
//!
//! [`ResponseTransport`] is the seam towards the underlying HTTP transport: it receives the
//! status line and headers exactly once, followed by any number of body chunks.
//! [`ResponseWriter`] sits in front of it and buffers the status and headers until the
//! first flush, so handlers may change them freely while nothing has been written.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tracing::warn;

/// The underlying writer a [`ResponseWriter`] flushes into.
pub trait ResponseTransport: Send {
    /// Called once per response, before any body chunk.
    fn write_head(&mut self, status: StatusCode, headers: &HeaderMap);

    fn write_body(&mut self, data: &[u8]) -> io::Result<()>;
}

/// Response wrapper tracking whether the head was flushed, the final status and the
/// number of body bytes written.
pub struct ResponseWriter {
    transport: Option<Box<dyn ResponseTransport>>,
    headers: HeaderMap,
    status: StatusCode,
    size: usize,
    flushed: bool,
}

impl std::fmt::Debug for ResponseWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseWriter")
            .field("bound", &self.transport.is_some())
            .field("status", &self.status)
            .field("size", &self.size)
            .field("flushed", &self.flushed)
            .finish_non_exhaustive()
    }
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter {
    /// Creates a writer bound to no transport, flushes go nowhere until [`reset`](Self::reset)
    pub fn new() -> Self {
        Self { transport: None, headers: HeaderMap::new(), status: StatusCode::OK, size: 0, flushed: false }
    }

    /// Rebinds the writer to `transport` and forgets everything about the previous response
    pub fn reset(&mut self, transport: Box<dyn ResponseTransport>) {
        self.transport = Some(transport);
        self.headers.clear();
        self.status = StatusCode::OK;
        self.size = 0;
        self.flushed = false;
    }

    /// Drops the transport of a finished response, the writer is unbound until the next reset
    pub(crate) fn unbind(&mut self) {
        self.transport = None;
        self.headers.clear();
    }

    /// Returns true while a transport receives the flushes
    pub fn is_bound(&self) -> bool {
        self.transport.is_some()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Headers still pending; changes made after the flush never reach the transport
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub(crate) fn set_header(&mut self, name: http::header::HeaderName, value: HeaderValue) {
        if self.flushed {
            warn!(header = %name, "headers were already written, ignoring header");
            return;
        }
        self.headers.insert(name, value);
    }

    pub fn set_status(&mut self, status: StatusCode) {
        if self.flushed {
            if status != self.status {
                warn!(current = %self.status, ignored = %status, "headers were already written, ignoring status");
            }
            return;
        }
        self.status = status;
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Number of body bytes written so far
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns true once the status and headers went out to the transport
    pub fn written(&self) -> bool {
        self.flushed
    }

    /// Flushes the status and headers, only the first call has an effect
    pub fn write_header_now(&mut self) {
        if self.flushed {
            return;
        }
        self.flushed = true;
        match self.transport.as_mut() {
            Some(transport) => transport.write_head(self.status, &self.headers),
            None => warn!(status = %self.status, "response writer is not bound to a transport"),
        }
    }

    /// Writes a body chunk, flushing the head first if needed
    pub fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.write_header_now();
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "response writer is not bound"))?;
        transport.write_body(data)?;
        self.size += data.len();
        Ok(data.len())
    }
}

impl io::Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        ResponseWriter::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.write_header_now();
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Recorded {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
    head_writes: usize,
}

/// A buffering [`ResponseTransport`].
///
/// Clones share the same buffer: hand one clone to a [`ResponseWriter`] and inspect the
/// other one afterwards.
#[derive(Debug, Clone, Default)]
pub struct ResponseRecorder {
    inner: Arc<Mutex<Recorded>>,
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The flushed status, or `200 OK` when nothing was flushed
    pub fn status(&self) -> StatusCode {
        self.inner.lock().status.unwrap_or(StatusCode::OK)
    }

    /// Returns true once a head has been written
    pub fn flushed(&self) -> bool {
        self.inner.lock().status.is_some()
    }

    /// How many times the transport received a head
    pub fn head_writes(&self) -> usize {
        self.inner.lock().head_writes
    }

    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<String> {
        self.inner.lock().headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_owned)
    }

    pub fn body(&self) -> Bytes {
        Bytes::copy_from_slice(&self.inner.lock().body)
    }

    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().body).into_owned()
    }

    /// Drains the recorded response
    pub fn take_response(&self) -> Response<Bytes> {
        let mut recorded = self.inner.lock();
        let mut response = Response::new(recorded.body.split().freeze());
        *response.status_mut() = recorded.status.take().unwrap_or(StatusCode::OK);
        *response.headers_mut() = std::mem::take(&mut recorded.headers);
        response
    }
}

impl ResponseTransport for ResponseRecorder {
    fn write_head(&mut self, status: StatusCode, headers: &HeaderMap) {
        let mut recorded = self.inner.lock();
        recorded.head_writes += 1;
        recorded.status = Some(status);
        recorded.headers = headers.clone();
    }

    fn write_body(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.lock().body.extend_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{CONTENT_TYPE, LOCATION};

    fn bound_writer() -> (ResponseWriter, ResponseRecorder) {
        let recorder = ResponseRecorder::new();
        let mut writer = ResponseWriter::new();
        writer.reset(Box::new(recorder.clone()));
        (writer, recorder)
    }

    #[test]
    fn defaults_after_reset() {
        let (mut writer, _) = bound_writer();
        writer.set_status(StatusCode::NOT_FOUND);
        writer.headers_mut().insert(LOCATION, HeaderValue::from_static("/a"));
        writer.write(b"abc").unwrap();

        writer.reset(Box::new(ResponseRecorder::new()));

        assert_eq!(writer.status(), StatusCode::OK);
        assert_eq!(writer.size(), 0);
        assert!(!writer.written());
        assert!(writer.headers().is_empty());
    }

    #[test]
    fn only_first_flush_counts() {
        let (mut writer, recorder) = bound_writer();
        writer.set_status(StatusCode::CREATED);
        writer.set_status(StatusCode::ACCEPTED);
        writer.write_header_now();

        writer.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        writer.set_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        writer.write_header_now();

        assert_eq!(recorder.status(), StatusCode::ACCEPTED);
        assert_eq!(recorder.head_writes(), 1);
        assert_eq!(recorder.header(CONTENT_TYPE), None);
        assert_eq!(writer.status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn write_flushes_and_counts() {
        let (mut writer, recorder) = bound_writer();
        assert!(!recorder.flushed());

        writer.write(b"foo,").unwrap();
        writer.write(b"bar").unwrap();

        assert!(recorder.flushed());
        assert_eq!(writer.size(), 7);
        assert_eq!(recorder.body_string(), "foo,bar");
    }

    #[test]
    fn unbound_writer_refuses_body() {
        let mut writer = ResponseWriter::new();
        let err = writer.write(b"lost").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn take_response_drains() {
        let (mut writer, recorder) = bound_writer();
        writer.set_status(StatusCode::FOUND);
        writer.set_header(LOCATION, HeaderValue::from_static("/path"));
        writer.write_header_now();

        let response = recorder.take_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[LOCATION], "/path");
        assert!(response.body().is_empty());
    }
}
