//! Incoming HTTP request type.

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

use crate::cancel::CancelSignal;
use crate::error::Error;

/// An incoming HTTP request with its body fully collected.
///
/// Handlers receive it by value. Middleware reads headers and observes the
/// [`CancelSignal`] but never mutates the request.
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    cancel: CancelSignal,
}

impl Request {
    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes, cancel: CancelSignal) -> Self {
        Self { method: parts.method, uri: parts.uri, headers: parts.headers, body, cancel }
    }

    /// Builds a request in-process, without a server. Useful for tests and
    /// for driving handlers directly.
    pub fn builder() -> RequestBuilder {
        RequestBuilder { inner: http::Request::builder(), body: Bytes::new(), cancel: CancelSignal::never() }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Values that are not valid UTF-8 read
    /// as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| std::str::from_utf8(v.as_bytes()).ok())
    }

    /// The signal fired when the client goes away or the server deadline hits.
    pub fn cancel_signal(&self) -> &CancelSignal { &self.cancel }

    pub fn is_cancelled(&self) -> bool { self.cancel.is_cancelled() }
}

// ── RequestBuilder ────────────────────────────────────────────────────────────

/// Fluent builder for [`Request`]. Obtain via [`Request::builder()`].
///
/// Defaults to `GET /` with no headers, an empty body and a signal that
/// never fires.
pub struct RequestBuilder {
    inner: http::request::Builder,
    body: Bytes,
    cancel: CancelSignal,
}

impl RequestBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.inner = self.inner.method(method);
        self
    }

    pub fn uri(mut self, uri: &str) -> Self {
        self.inner = self.inner.uri(uri);
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.inner = self.inner.header(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn cancel_signal(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fails if any method, uri or header given to the builder was invalid.
    pub fn build(self) -> Result<Request, Error> {
        let (parts, ()) = self.inner.body(())?.into_parts();
        Ok(Request::from_parts(parts, self.body, self.cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::{self, CancelReason};

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::builder()
            .header("Delay-Before", "300ms")
            .build()
            .expect("valid request");
        assert_eq!(req.header("delay-before"), Some("300ms"));
        assert_eq!(req.header("DELAY-BEFORE"), Some("300ms"));
        assert_eq!(req.header("delay-after"), None);
    }

    #[test]
    fn utf8_header_values_are_readable() {
        let req = Request::builder()
            .header("delay-before", "15µs")
            .build()
            .expect("valid request");
        assert_eq!(req.header("delay-before"), Some("15µs"));
    }

    #[test]
    fn invalid_header_name_reads_as_absent() {
        let req = Request::builder().build().expect("valid request");
        assert_eq!(req.header("not a header"), None);
    }

    #[test]
    fn invalid_parts_fail_to_build() {
        assert!(Request::builder().header("bad name", "x").build().is_err());
    }

    #[test]
    fn defaults() {
        let req = Request::builder().body("hi").build().expect("valid request");
        assert_eq!(*req.method(), Method::GET);
        assert_eq!(req.path(), "/");
        assert_eq!(req.body(), b"hi");
        assert!(!req.is_cancelled());
    }

    #[test]
    fn carries_cancel_signal() {
        let (canceller, signal) = cancel::channel();
        let req = Request::builder().cancel_signal(signal).build().expect("valid request");
        canceller.cancel(CancelReason::ClientDisconnected);
        assert_eq!(req.cancel_signal().reason(), Some(CancelReason::ClientDisconnected));
    }
}
