//! Resumable single-file downloads.
//!
//! A transfer looks at how many bytes of the destination are already on disk,
//! asks the server for the rest with a `Range` header, and appends what comes
//! back. A `416 Range Not Satisfiable` answer means the file is already
//! complete. Failures never delete partial data, so the next run picks up
//! where this one stopped.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use super::http::{RangeRequest, RangeTransport, RemoteResponse};
use super::outcome::{TransferReport, TransferStatus};
use super::progress::{InterruptFlag, TransferProgress};
use crate::config::FetchConfig;
use crate::error::FetchError;

/// Buffer size for reading/writing during downloads (64KB).
pub const BUFFER_SIZE: usize = 64 * 1024;

/// How much of a too-small response body is quoted in the failure message.
const ERROR_SNIPPET_BYTES: u64 = 512;

const STATUS_OK: u16 = 200;
const STATUS_PARTIAL_CONTENT: u16 = 206;
const STATUS_RANGE_NOT_SATISFIABLE: u16 = 416;

/// Where writing starts for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WritePlan {
    /// Create or truncate the destination.
    Fresh,
    /// Append to the partial file.
    Append { from: u64 },
}

enum StreamEnd {
    Finished,
    Interrupted,
}

/// Downloads one artifact, resuming partial files.
#[derive(Debug)]
pub struct TransferResumer<T> {
    transport: T,
    config: FetchConfig,
    interrupt: InterruptFlag,
}

impl<T: RangeTransport> TransferResumer<T> {
    /// Create a resumer over the given transport.
    pub fn new(transport: T, config: FetchConfig) -> Self {
        Self {
            transport,
            config,
            interrupt: InterruptFlag::new(),
        }
    }

    /// Observe an externally owned interrupt flag.
    pub fn with_interrupt(mut self, interrupt: InterruptFlag) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// The fetch configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// The interrupt flag checked between chunks.
    pub fn interrupt(&self) -> &InterruptFlag {
        &self.interrupt
    }

    /// Ensure `dest` holds the complete artifact at `url`.
    ///
    /// Never returns an error: every failure is folded into the report so a
    /// batch can carry on with the next file.
    pub fn fetch(
        &self,
        url: &str,
        dest: &Path,
        token: Option<&str>,
        progress: &dyn TransferProgress,
    ) -> TransferReport {
        let label = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| url.to_string());

        if self.interrupt.is_requested() {
            return TransferReport::new(TransferStatus::Interrupted, 0);
        }

        if let Some(parent) = dest.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                let err = FetchError::CreateDirFailed {
                    path: parent.to_path_buf(),
                    source: e,
                };
                tracing::warn!(file = %label, error = %err, "Cannot prepare destination");
                return TransferReport::failed(err.to_string(), 0);
            }
        }

        let existing_size = dest.metadata().map(|m| m.len()).unwrap_or(0);

        let request = RangeRequest {
            url,
            offset: existing_size,
            token,
        };
        let mut response = match self.transport.get(&request) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(file = %label, error = %e, "Request failed");
                return TransferReport::failed(e.to_string(), 0);
            }
        };

        let plan = match classify(existing_size, &response) {
            Ok(Some(plan)) => plan,
            Ok(None) => {
                tracing::info!(file = %label, size = existing_size, "Complete file found, skipping");
                return TransferReport::new(TransferStatus::AlreadyComplete, 0);
            }
            Err(reason) => {
                tracing::warn!(file = %label, status = response.status, "Download refused: {}", reason);
                return TransferReport::failed(reason, 0);
            }
        };

        let start = match plan {
            WritePlan::Fresh => 0,
            WritePlan::Append { from } => from,
        };
        let declared = response.content_length.unwrap_or(0);
        let total = start + declared;

        if total < self.config.min_artifact_bytes {
            let snippet = read_snippet(&mut response);
            tracing::warn!(file = %label, total, "Response too small to be a weight file");
            return TransferReport::failed(
                format!(
                    "unexpected {}-byte response ({}): {}",
                    total, response.reason, snippet
                ),
                0,
            );
        }

        match plan {
            WritePlan::Append { from } => {
                tracing::info!(file = %label, from, total, "Partial file found, resuming")
            }
            WritePlan::Fresh if existing_size > 0 => tracing::warn!(
                file = %label,
                existing_size,
                "Server ignored range request, restarting download"
            ),
            WritePlan::Fresh => tracing::info!(file = %label, total, "Downloading"),
        }

        let _guard = self.interrupt.transfer_guard();
        progress.begin(&label, start, total);
        let (result, written) = self.stream(url, dest, plan, &mut response, progress);
        progress.finish();

        match result {
            Ok(StreamEnd::Interrupted) => {
                tracing::info!(file = %label, written, "Transfer interrupted, partial file kept");
                TransferReport::new(TransferStatus::Interrupted, written)
            }
            Ok(StreamEnd::Finished) if response.content_length.is_some() && written < declared => {
                tracing::warn!(file = %label, written, declared, "Connection closed early");
                TransferReport::failed(
                    format!(
                        "connection closed after {} of {} bytes; run again to resume",
                        written, declared
                    ),
                    written,
                )
            }
            Ok(StreamEnd::Finished) => {
                tracing::info!(file = %label, written, "Transfer complete");
                let status = match plan {
                    WritePlan::Fresh => TransferStatus::Downloaded,
                    WritePlan::Append { from } => TransferStatus::Resumed { from },
                };
                TransferReport::new(status, written)
            }
            Err(err) => {
                tracing::warn!(file = %label, written, error = %err, "Transfer failed, partial file kept");
                TransferReport::failed(err.to_string(), written)
            }
        }
    }

    /// Copy the response body into the destination, one buffer at a time.
    ///
    /// Returns how the stream ended alongside the bytes written, which are
    /// on disk even when the result is an error.
    fn stream(
        &self,
        url: &str,
        dest: &Path,
        plan: WritePlan,
        response: &mut RemoteResponse,
        progress: &dyn TransferProgress,
    ) -> (Result<StreamEnd, FetchError>, u64) {
        let mut written = 0u64;
        let file = match open_destination(dest, plan) {
            Ok(file) => file,
            Err(err) => return (Err(err), written),
        };
        let start = match plan {
            WritePlan::Fresh => 0,
            WritePlan::Append { from } => from,
        };

        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let write_err = |e| FetchError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        };

        let end = loop {
            if self.interrupt.is_requested() {
                break Ok(StreamEnd::Interrupted);
            }

            let bytes_read = match response.body.read(&mut buffer) {
                Ok(0) => break Ok(StreamEnd::Finished),
                Ok(n) => n,
                Err(e) => {
                    break Err(FetchError::DownloadFailed {
                        url: url.to_string(),
                        reason: format!("connection lost after {} bytes: {}", written, e),
                    })
                }
            };

            if let Err(e) = writer.write_all(&buffer[..bytes_read]) {
                break Err(write_err(e));
            }

            written += bytes_read as u64;
            progress.advance(start + written);
        };

        // Flush whatever was received so the next run can resume from it
        if let Err(e) = writer.flush() {
            return (Err(write_err(e)), written);
        }
        (end, written)
    }
}

/// Decide how to write a response, `Ok(None)` meaning already complete.
fn classify(existing_size: u64, response: &RemoteResponse) -> Result<Option<WritePlan>, String> {
    match response.status {
        STATUS_RANGE_NOT_SATISFIABLE if existing_size > 0 => Ok(None),
        STATUS_PARTIAL_CONTENT if existing_size > 0 => Ok(Some(WritePlan::Append {
            from: existing_size,
        })),
        STATUS_OK | STATUS_PARTIAL_CONTENT => Ok(Some(WritePlan::Fresh)),
        _ => Err(format!("server responded {}", response.reason)),
    }
}

fn open_destination(dest: &Path, plan: WritePlan) -> Result<File, FetchError> {
    let opened = match plan {
        WritePlan::Append { .. } => OpenOptions::new().append(true).open(dest),
        WritePlan::Fresh => File::create(dest),
    };
    opened.map_err(|e| FetchError::WriteFailed {
        path: dest.to_path_buf(),
        source: e,
    })
}

/// First bytes of a (presumably textual) error body, for the failure message.
fn read_snippet(response: &mut RemoteResponse) -> String {
    let mut bytes = Vec::new();
    if (&mut response.body)
        .take(ERROR_SNIPPET_BYTES)
        .read_to_end(&mut bytes)
        .is_err()
    {
        return String::new();
    }
    String::from_utf8_lossy(&bytes).trim().to_string()
}
