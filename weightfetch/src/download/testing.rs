//! In-memory artifact host and progress recorder for unit tests.

use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::sync::Mutex;

use super::http::{RangeRequest, RangeTransport, RemoteResponse};
use super::progress::TransferProgress;
use crate::error::FetchResult;

/// Deterministic non-repeating-looking payload of `len` bytes.
pub(crate) fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// How the fake host answers requests for one URL.
#[derive(Debug, Clone)]
pub(crate) enum Behavior {
    /// Honor `Range` like a real server.
    Normal,
    /// Always answer with this status, reason and body.
    Status(u16, &'static str, Vec<u8>),
    /// Always send the whole file with 200, even for ranged requests.
    IgnoreRange,
    /// Reset the connection after this many body bytes, once.
    DropOnceAfter(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedRequest {
    pub url: String,
    pub offset: u64,
    pub token: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct FakeHost {
    artifacts: HashMap<String, Vec<u8>>,
    behaviors: Mutex<HashMap<String, Behavior>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeHost {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_artifact(self, url: &str, data: Vec<u8>) -> Self {
        self.with_behavior(url, data, Behavior::Normal)
    }

    pub(crate) fn with_behavior(mut self, url: &str, data: Vec<u8>, behavior: Behavior) -> Self {
        self.artifacts.insert(url.to_string(), data);
        self.behaviors
            .get_mut()
            .unwrap()
            .insert(url.to_string(), behavior);
        self
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn take_behavior(&self, url: &str) -> Behavior {
        let mut behaviors = self.behaviors.lock().unwrap();
        let behavior = behaviors.get(url).cloned().unwrap_or(Behavior::Normal);
        if let Behavior::DropOnceAfter(_) = behavior {
            behaviors.insert(url.to_string(), Behavior::Normal);
        }
        behavior
    }
}

fn response(status: u16, reason: &str, body: Vec<u8>) -> RemoteResponse {
    RemoteResponse {
        status,
        reason: reason.to_string(),
        content_length: Some(body.len() as u64),
        body: Box::new(Cursor::new(body)),
    }
}

impl RangeTransport for FakeHost {
    fn get(&self, request: &RangeRequest<'_>) -> FetchResult<RemoteResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            url: request.url.to_string(),
            offset: request.offset,
            token: request.token.map(str::to_string),
        });

        let Some(data) = self.artifacts.get(request.url) else {
            return Ok(response(404, "404 Not Found", b"Entry not found".to_vec()));
        };

        let offset = request.offset as usize;
        match self.take_behavior(request.url) {
            Behavior::Status(status, reason, body) => Ok(response(status, reason, body)),
            Behavior::IgnoreRange => Ok(response(200, "200 OK", data.clone())),
            Behavior::Normal if offset >= data.len() && offset > 0 => Ok(response(
                416,
                "416 Range Not Satisfiable",
                b"Requested Range Not Satisfiable".to_vec(),
            )),
            Behavior::Normal if offset > 0 => {
                Ok(response(206, "206 Partial Content", data[offset..].to_vec()))
            }
            Behavior::Normal => Ok(response(200, "200 OK", data.clone())),
            Behavior::DropOnceAfter(limit) => {
                let tail = data[offset.min(data.len())..].to_vec();
                let (status, reason) = if offset > 0 {
                    (206, "206 Partial Content")
                } else {
                    (200, "200 OK")
                };
                Ok(RemoteResponse {
                    status,
                    reason: reason.to_string(),
                    content_length: Some(tail.len() as u64),
                    body: Box::new(DroppingBody {
                        inner: Cursor::new(tail),
                        remaining: limit,
                    }),
                })
            }
        }
    }
}

/// Body that fails with a connection reset after `remaining` bytes.
struct DroppingBody {
    inner: Cursor<Vec<u8>>,
    remaining: usize,
}

impl Read for DroppingBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ));
        }
        let max = buf.len().min(self.remaining);
        let n = self.inner.read(&mut buf[..max])?;
        self.remaining -= n;
        Ok(n)
    }
}

/// Records every progress callback.
#[derive(Debug, Default)]
pub(crate) struct RecordingProgress {
    begun: Mutex<Vec<(String, u64, u64)>>,
    positions: Mutex<Vec<u64>>,
    finished: Mutex<usize>,
}

impl RecordingProgress {
    pub(crate) fn begun(&self) -> Vec<(String, u64, u64)> {
        self.begun.lock().unwrap().clone()
    }

    pub(crate) fn last_position(&self) -> Option<u64> {
        self.positions.lock().unwrap().last().copied()
    }

    pub(crate) fn finished(&self) -> usize {
        *self.finished.lock().unwrap()
    }
}

impl TransferProgress for RecordingProgress {
    fn begin(&self, label: &str, position: u64, total: u64) {
        self.begun
            .lock()
            .unwrap()
            .push((label.to_string(), position, total));
    }

    fn advance(&self, position: u64) {
        self.positions.lock().unwrap().push(position);
    }

    fn finish(&self) {
        *self.finished.lock().unwrap() += 1;
    }
}
