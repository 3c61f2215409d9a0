//! Per-invocation setup shared by the installer: root, logging, fetch config.

use std::path::{Path, PathBuf};

use weightfetch::config::FetchConfig;
use weightfetch::layout::{InstallLayout, RootResolver};
use weightfetch::logging::{self, WorkerGuard};

use crate::error::CliError;

/// Resolved install root plus the logging guard for this run.
pub struct CliRunner {
    layout: InstallLayout,
    config: FetchConfig,
    init_file: Option<PathBuf>,
    _log_guard: Option<WorkerGuard>,
}

impl CliRunner {
    /// Resolve the root (`--root`, `INVOKEAI_ROOT`, `~/.invokeai`, `.`) and
    /// start file logging under it.
    pub fn new(cli_root: Option<&Path>) -> Result<Self, CliError> {
        Self::with_resolver(&RootResolver::from_env(), cli_root, FetchConfig::from_env())
    }

    /// Setup with explicit root resolution inputs.
    pub fn with_resolver(
        resolver: &RootResolver,
        cli_root: Option<&Path>,
        config: FetchConfig,
    ) -> Result<Self, CliError> {
        let root = resolver.resolve(cli_root)?;
        let layout = InstallLayout::new(root);

        // File logging is best effort; the install can proceed without it
        let log_guard = match logging::init(&layout.log_dir()) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Warning: file logging disabled: {}", e);
                None
            }
        };

        Ok(Self {
            layout,
            config,
            init_file: resolver.init_file().map(Path::to_path_buf),
            _log_guard: log_guard,
        })
    }

    /// Record the run parameters in the log file.
    pub fn log_startup(&self, mode: &str) {
        tracing::info!(
            version = weightfetch::VERSION,
            root = %self.layout.root().display(),
            endpoint = %self.config.endpoint,
            mode,
            "weightfetch starting"
        );
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// `~/.invokeai`, written when a fresh root is initialized.
    pub fn init_file(&self) -> Option<&Path> {
        self.init_file.as_deref()
    }
}
