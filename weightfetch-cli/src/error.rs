//! CLI error type and exit codes.

use std::fmt;

use weightfetch::FetchError;

/// Exit code for a Ctrl-C interrupt (128 + SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;

/// Errors surfaced to `main`.
#[derive(Debug)]
pub enum CliError {
    /// Library failure.
    Fetch(FetchError),
    /// Bad or missing configuration.
    Config(String),
    /// A terminal prompt failed.
    Prompt(String),
    /// Some selected assets could not be downloaded.
    PartialDownload { failed: usize, requested: usize },
    /// The user pressed Ctrl-C.
    Interrupted,
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Interrupted => EXIT_INTERRUPTED,
            CliError::Fetch(e) if e.is_interrupt() => EXIT_INTERRUPTED,
            CliError::PartialDownload { .. } => 2,
            _ => 1,
        }
    }

    /// Whether this error was caused by Ctrl-C.
    pub fn is_interrupt(&self) -> bool {
        self.exit_code() == EXIT_INTERRUPTED
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Fetch(e) => write!(f, "{}", e),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Prompt(msg) => write!(f, "Prompt failed: {}", msg),
            CliError::PartialDownload { failed, requested } => write!(
                f,
                "{} of {} weight files could not be downloaded",
                failed, requested
            ),
            CliError::Interrupted => write!(f, "Interrupted"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Fetch(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FetchError> for CliError {
    fn from(e: FetchError) -> Self {
        if e.is_interrupt() {
            CliError::Interrupted
        } else {
            CliError::Fetch(e)
        }
    }
}

impl From<dialoguer::Error> for CliError {
    fn from(e: dialoguer::Error) -> Self {
        let message = e.to_string();
        match e {
            dialoguer::Error::IO(io) if io.kind() == std::io::ErrorKind::Interrupted => {
                CliError::Interrupted
            }
            _ => CliError::Prompt(message),
        }
    }
}
