//! Configuration for the weight downloader.

use std::time::Duration;

/// Default artifact host.
pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

/// Environment variable that overrides the artifact host.
pub const ENDPOINT_ENV: &str = "HF_ENDPOINT";

/// Default timeout for HTTP requests in seconds.
///
/// Checkpoints are several gigabytes, so this bounds each request, not the
/// whole transfer.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60 * 60;

/// Responses whose total artifact size is below this are error pages, not
/// weights.
pub const DEFAULT_MIN_ARTIFACT_BYTES: u64 = 2000;

/// Configuration for weight downloads.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Base URL of the artifact host, without trailing slash.
    pub endpoint: String,

    /// HTTP request timeout.
    pub timeout: Duration,

    /// Minimum plausible artifact size in bytes.
    pub min_artifact_bytes: u64,

    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            min_artifact_bytes: DEFAULT_MIN_ARTIFACT_BYTES,
            user_agent: format!("weightfetch/{}", crate::VERSION),
        }
    }
}

impl FetchConfig {
    /// Create the default configuration, honoring `HF_ENDPOINT` if set.
    pub fn from_env() -> Self {
        match std::env::var(ENDPOINT_ENV) {
            Ok(endpoint) if !endpoint.trim().is_empty() => Self::default().with_endpoint(endpoint),
            _ => Self::default(),
        }
    }

    /// Set the artifact host.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the minimum plausible artifact size.
    pub fn with_min_artifact_bytes(mut self, bytes: u64) -> Self {
        self.min_artifact_bytes = bytes;
        self
    }

    /// Build the download URL for a file in a model repository.
    pub fn resolve_url(&self, repo_id: &str, filename: &str) -> String {
        format!("{}/{}/resolve/main/{}", self.endpoint, repo_id, filename)
    }
}
