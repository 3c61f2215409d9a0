//! Resumable weight downloads.
//!
//! # Architecture
//!
//! ```text
//! BatchDownloader ──► TransferResumer ──► RangeTransport (HttpTransport)
//!        │                   │
//!        ▼                   ▼
//!   BatchSummary       TransferReport ──► TransferProgress
//! ```
//!
//! - [`TransferResumer`] fetches one file, appending to whatever is already
//!   on disk.
//! - [`BatchDownloader`] walks a catalog selection in declaration order and
//!   manages the cached access token.
//! - [`fetch_support_models`] pulls the fixed-URL face restoration weights
//!   through the same resumer.

mod batch;
mod http;
mod outcome;
mod progress;
mod resumer;
mod support;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{BatchContext, BatchDownloader, LEGACY_CHECKPOINT_FILE};
pub use http::{HttpTransport, RangeRequest, RangeTransport, RemoteResponse};
pub use outcome::{BatchSummary, DownloadOutcome, TransferReport, TransferStatus};
pub use progress::{InterruptFlag, NoProgress, TransferGuard, TransferProgress};
pub use resumer::{TransferResumer, BUFFER_SIZE};
pub use support::{fetch_support_models, SupportModel, SUPPORT_MODELS};
