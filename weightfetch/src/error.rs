//! Error types for weight downloads and configuration synthesis.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for weightfetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while fetching weights or writing `models.yaml`.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Failed to read a file or directory.
    #[error("failed to read {}: {source}", .path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file or directory.
    #[error("failed to write {}: {source}", .path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// The remote host refused or broke the transfer.
    #[error("failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Network timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// HTTP client could not be constructed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The existing configuration document could not be parsed.
    #[error("failed to parse {}: {reason}", .path.display())]
    ConfigParse { path: PathBuf, reason: String },

    /// The configuration document could not be serialized.
    #[error("failed to serialize {}: {reason}", .path.display())]
    ConfigSerialize { path: PathBuf, reason: String },

    /// Identifier is not in the asset catalog.
    #[error("unknown asset: {0}")]
    UnknownAsset(String),

    /// Two catalog descriptors share an identifier.
    #[error("duplicate asset identifier in catalog: {0}")]
    DuplicateAsset(String),

    /// Credential store operation failed.
    #[error("credential store error ({}): {source}", .path.display())]
    Credential { path: PathBuf, source: io::Error },

    /// Root initialization needs the application's source tree.
    #[error(
        "cannot initialize {}: no '{}' directory found; run from the top level of the application source tree",
        .root.display(),
        .source_dir.display()
    )]
    MissingSourceTree { root: PathBuf, source_dir: PathBuf },

    /// The global log subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    Logging(String),

    /// User interrupted the operation.
    #[error("interrupted")]
    Interrupted,
}

impl FetchError {
    /// Whether this error was caused by a user interrupt.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}
