//! HTTP transport for ranged GET requests.
//!
//! The resumer talks to the network only through [`RangeTransport`], so the
//! resume logic can be exercised against scripted responses in tests.

use std::io::Read;

use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, RANGE};

use crate::config::FetchConfig;
use crate::error::{FetchError, FetchResult};

/// A single GET, optionally resuming from a byte offset.
#[derive(Debug, Clone, Copy)]
pub struct RangeRequest<'a> {
    pub url: &'a str,
    /// Bytes already on disk. A non-zero offset sends `Range: bytes=<offset>-`.
    pub offset: u64,
    /// Bearer token for the `Authorization` header.
    pub token: Option<&'a str>,
}

impl RangeRequest<'_> {
    /// The `Range` header value, if this request resumes.
    pub fn range_header(&self) -> Option<String> {
        (self.offset > 0).then(|| format!("bytes={}-", self.offset))
    }
}

/// Status, declared length and streaming body of a response.
pub struct RemoteResponse {
    pub status: u16,
    /// Status line text, e.g. `401 Unauthorized`.
    pub reason: String,
    /// Declared `Content-Length` of this response body.
    pub content_length: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

impl std::fmt::Debug for RemoteResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteResponse")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Issues ranged GET requests.
pub trait RangeTransport {
    /// Send the request and return the response headers with an unread body.
    ///
    /// Non-success statuses are returned as responses, not errors; only
    /// connection-level failures are `Err`.
    fn get(&self, request: &RangeRequest<'_>) -> FetchResult<RemoteResponse>;
}

impl<T: RangeTransport + ?Sized> RangeTransport for &T {
    fn get(&self, request: &RangeRequest<'_>) -> FetchResult<RemoteResponse> {
        (**self).get(request)
    }
}

/// Blocking `reqwest` transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout_secs: u64,
}

impl HttpTransport {
    /// Build a transport from the fetch configuration.
    pub fn new(config: &FetchConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Http(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout_secs: config.timeout.as_secs(),
        })
    }
}

impl RangeTransport for HttpTransport {
    fn get(&self, request: &RangeRequest<'_>) -> FetchResult<RemoteResponse> {
        let mut builder = self.client.get(request.url);
        if let Some(token) = request.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(range) = request.range_header() {
            let value = HeaderValue::from_str(&range)
                .map_err(|e| FetchError::Http(format!("invalid range header: {}", e)))?;
            builder = builder.header(RANGE, value);
        }

        let response = builder.send().map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: request.url.to_string(),
                    timeout_secs: self.timeout_secs,
                }
            } else {
                FetchError::DownloadFailed {
                    url: request.url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        Ok(RemoteResponse {
            status: status.as_u16(),
            reason: status.to_string(),
            content_length: response.content_length(),
            body: Box::new(response),
        })
    }
}
