use std::io::Read;

use crate::app::error::Result;

/// A response whose body is consumed incrementally. Dropping the body
/// releases the underlying connection.
pub struct TransportResponse {
    pub status: i32,
    pub body: Box<dyn Read + Send>,
}

/// The network seam. The core never talks to a socket directly; it posts
/// a JSON body and reads bytes back, which keeps every streaming and
/// cancellation path testable against scripted fakes.
pub trait Transport: Send + Sync {
    fn post(&self, url: &str, body: &str) -> Result<TransportResponse>;
}

/// HTTP transport backed by minreq's lazy response, so the body arrives
/// as a byte stream instead of one buffered blob.
pub struct HttpTransport {
    timeout_secs: u64,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self { timeout_secs: 60 }
    }

    pub fn with_timeout(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn post(&self, url: &str, body: &str) -> Result<TransportResponse> {
        let response = minreq::post(url)
            .with_header("Content-Type", "application/json")
            .with_timeout(self.timeout_secs)
            .with_body(body)
            .send_lazy()?;

        let status = response.status_code;
        Ok(TransportResponse {
            status,
            body: Box::new(response),
        })
    }
}
