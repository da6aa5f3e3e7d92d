use bytes::Bytes;

/// Request handler surface exposed by the host WFS engine.
///
/// The host owns the actual request/response objects; the filter only
/// manipulates them through this trait. Implementations are expected to
/// treat parameter names case-insensitively (the filter always queries
/// upper-case names) and header names per HTTP semantics.
pub trait RequestHandler {
    /// Value of a request parameter, or `None` if absent.
    fn parameter(&self, name: &str) -> Option<String>;

    /// Overwrite a request parameter before the engine processes it.
    fn set_parameter(&mut self, name: &str, value: &str);

    /// Set (or replace) a pending response header.
    fn set_response_header(&mut self, name: &str, value: &str);

    /// Whether response headers have already been committed to the transport.
    /// Once committed they are immutable for the rest of the response.
    fn headers_sent(&self) -> bool;

    /// Drop all pending response headers and the pending body.
    fn clear(&mut self);

    /// Drop the pending body only, leaving headers in place.
    fn clear_body(&mut self);

    /// Append bytes to the pending response body.
    fn append_body(&mut self, data: &[u8]);

    /// Snapshot of the pending (not yet flushed) response body.
    fn body(&self) -> Bytes;
}
