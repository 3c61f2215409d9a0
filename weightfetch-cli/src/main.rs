//! weightfetch - download Stable Diffusion weights and register them in
//! `models.yaml`.
//!
//! Interrupted downloads resume where they stopped on the next run.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use console::Term;
use weightfetch::catalog::AssetCatalog;
use weightfetch::credentials::{CredentialStore, HfTokenFile, MemoryCredentialStore};
use weightfetch::download::{HttpTransport, InterruptFlag, TransferResumer};

mod error;
mod installer;
mod output;
mod progress;
mod prompts;
mod runner;

use error::{CliError, EXIT_INTERRUPTED};
use installer::{CommandContext, InstallOptions, Installer};
use output::ConsoleOutput;
use progress::BarProgress;
use prompts::ConsoleInteraction;
use runner::CliRunner;

/// Download Stable Diffusion weight files and support models
///
/// Examples:
///   weightfetch                   # Interactive install
///   weightfetch --yes             # Recommended models, no questions
///   weightfetch --no-interactive  # Support models only
#[derive(Debug, Parser)]
#[command(name = "weightfetch", version = weightfetch::VERSION)]
struct Cli {
    /// Offer to download weight files (default)
    #[arg(long, overrides_with = "no_interactive")]
    interactive: bool,

    /// Only fetch support models, never prompt
    #[arg(long = "no-interactive", overrides_with = "interactive")]
    no_interactive: bool,

    /// Accept the recommended models and every confirmation
    #[arg(short = 'y', long)]
    yes: bool,

    /// Path of models.yaml, relative to the root unless absolute
    #[arg(short = 'c', long = "config-file", alias = "config_file", value_name = "PATH")]
    config_file: Option<PathBuf>,

    /// Install root (overrides INVOKEAI_ROOT and ~/.invokeai)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,
}

impl Cli {
    fn options(&self) -> InstallOptions {
        InstallOptions {
            interactive: !self.no_interactive,
            yes: self.yes,
            config_file: self.config_file.clone(),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        if e.is_interrupt() {
            println!("\nGoodbye! Come back soon.");
        } else {
            eprintln!("A problem occurred during download. The error was: {}", e);
        }
        process::exit(e.exit_code());
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let runner = CliRunner::new(cli.root.as_deref())?;
    let mode = if cli.no_interactive {
        "support-only"
    } else if cli.yes {
        "unattended"
    } else {
        "interactive"
    };
    runner.log_startup(mode);

    let interrupt = InterruptFlag::new();
    let handler_flag = interrupt.clone();
    ctrlc::set_handler(move || {
        // A transfer stops at its next chunk and keeps the partial file, and
        // a models.yaml write finishes first. Anywhere else, or on a second
        // Ctrl-C, leave right away.
        if handler_flag.request() || !handler_flag.in_transfer() {
            Term::stdout().show_cursor().ok();
            println!("\nGoodbye! Come back soon.");
            process::exit(EXIT_INTERRUPTED);
        }
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let transport = HttpTransport::new(runner.config())?;
    let resumer = TransferResumer::new(transport, runner.config().clone()).with_interrupt(interrupt);
    let catalog = AssetCatalog::builtin();

    let token_file = HfTokenFile::locate();
    let memory = MemoryCredentialStore::new();
    let credentials: &dyn CredentialStore = match &token_file {
        Some(file) => file,
        None => {
            tracing::warn!("No home directory; the access token will not be cached");
            &memory
        }
    };

    let output = ConsoleOutput::new();
    let interaction = ConsoleInteraction::new();
    let progress = BarProgress::new();
    let ctx = CommandContext {
        output: &output,
        interaction: &interaction,
        credentials,
        progress: &progress,
    };

    let options = cli.options();
    let source_dir = std::env::current_dir()
        .map_err(|e| CliError::Config(format!("Cannot read current directory: {}", e)))?;

    let result = Installer::new(runner.layout(), &catalog, &resumer, &options)
        .with_bootstrap(source_dir, runner.init_file().map(PathBuf::from))
        .run(&ctx);

    match &result {
        Ok(()) => tracing::info!("Install finished"),
        Err(e) => tracing::error!(error = %e, "Install failed"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_interactive() {
        let cli = Cli::try_parse_from(["weightfetch"]).unwrap();
        let options = cli.options();
        assert!(options.interactive);
        assert!(!options.yes);
        assert_eq!(options.config_file, None);
    }

    #[test]
    fn test_no_interactive_overrides_interactive() {
        let cli = Cli::try_parse_from(["weightfetch", "--interactive", "--no-interactive"]).unwrap();
        assert!(!cli.options().interactive);

        let cli = Cli::try_parse_from(["weightfetch", "--no-interactive", "--interactive"]).unwrap();
        assert!(cli.options().interactive);
    }

    #[test]
    fn test_yes_and_config_file() {
        let cli = Cli::try_parse_from([
            "weightfetch",
            "-y",
            "--config_file",
            "configs/custom.yaml",
            "--root",
            "/opt/invokeai",
        ])
        .unwrap();
        let options = cli.options();
        assert!(options.yes);
        assert_eq!(options.config_file, Some(PathBuf::from("configs/custom.yaml")));
        assert_eq!(cli.root, Some(PathBuf::from("/opt/invokeai")));
    }
}
