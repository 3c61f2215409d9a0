//! weightfetch - Model weight installer for Stable Diffusion roots
//!
//! This library downloads multi-gigabyte weight checkpoints with resumable
//! transfers and records the installed models in `configs/models.yaml`.
//!
//! # Overview
//!
//! - [`catalog`] lists the downloadable assets.
//! - [`download`] fetches them, resuming partial files.
//! - [`models_config`] merges successful downloads into the configuration
//!   document and replaces it atomically.
//! - [`layout`] resolves the install root and derives every path from it.

pub mod catalog;
pub mod config;
pub mod credentials;
pub mod download;
pub mod error;
pub mod interaction;
pub mod layout;
pub mod logging;
pub mod models_config;

pub use error::{FetchError, FetchResult};

/// Library version, sent in the user agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
