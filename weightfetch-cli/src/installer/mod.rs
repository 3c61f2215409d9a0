//! The install flow.
//!
//! ```text
//! introduction ─► initialize root ─► choose weights ─► authenticate
//!      ─► batch download (retry) ─► models.yaml ─► support models ─► postscript
//! ```
//!
//! Every step talks to the user through [`CommandContext`], so the whole flow
//! runs in tests against scripted answers and an in-memory transport.

mod selection;
mod text;

pub use selection::{choose, print_review, Choice};

use std::path::PathBuf;

use weightfetch::catalog::AssetCatalog;
use weightfetch::credentials::CredentialStore;
use weightfetch::download::{
    fetch_support_models, BatchContext, BatchDownloader, BatchSummary, RangeTransport,
    TransferProgress, TransferResumer, SUPPORT_MODELS,
};
use weightfetch::interaction::{AutoConfirm, Confirmation};
use weightfetch::layout::InstallLayout;
use weightfetch::models_config::ConfigSynthesizer;

use crate::error::CliError;
use crate::output::Output;
use crate::prompts::{Interaction, PromptConfirmation};

/// Collaborators the installer depends on.
pub struct CommandContext<'a> {
    pub output: &'a dyn Output,
    pub interaction: &'a dyn Interaction,
    pub credentials: &'a dyn CredentialStore,
    pub progress: &'a dyn TransferProgress,
}

/// Command-line choices that shape the flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Offer weight downloads; otherwise only support models are fetched.
    pub interactive: bool,
    /// Take the recommended set and accept every confirmation.
    pub yes: bool,
    /// Configuration document path, relative to the root unless absolute.
    pub config_file: Option<PathBuf>,
}

/// How the weights step ended.
#[derive(Debug)]
enum WeightsOutcome {
    Installed,
    Skipped,
    Quit,
    /// Some files failed; the flow continues and reports this at the end.
    Incomplete(CliError),
}

/// Runs the install flow against one root.
pub struct Installer<'a, T> {
    layout: &'a InstallLayout,
    catalog: &'a AssetCatalog,
    resumer: &'a TransferResumer<T>,
    options: &'a InstallOptions,
    source_dir: PathBuf,
    init_file: Option<PathBuf>,
}

impl<'a, T: RangeTransport> Installer<'a, T> {
    pub fn new(
        layout: &'a InstallLayout,
        catalog: &'a AssetCatalog,
        resumer: &'a TransferResumer<T>,
        options: &'a InstallOptions,
    ) -> Self {
        Self {
            layout,
            catalog,
            resumer,
            options,
            source_dir: PathBuf::from("."),
            init_file: None,
        }
    }

    /// Where a fresh root copies `configs/` and `scripts/` from, and the init
    /// file to write.
    pub fn with_bootstrap(mut self, source_dir: PathBuf, init_file: Option<PathBuf>) -> Self {
        self.source_dir = source_dir;
        self.init_file = init_file;
        self
    }

    /// Run every step.
    pub fn run(&self, ctx: &CommandContext<'_>) -> Result<(), CliError> {
        text::introduction(ctx.output);
        self.ensure_initialized(ctx)?;

        let mut pending = None;
        if self.options.interactive {
            ctx.output.header("Downloading diffusion weights");
            match self.install_weights(ctx)? {
                WeightsOutcome::Quit => {
                    tracing::info!("User quit during weight selection");
                    return Ok(());
                }
                WeightsOutcome::Incomplete(err) => pending = Some(err),
                WeightsOutcome::Installed | WeightsOutcome::Skipped => {}
            }
        }

        ctx.output.newline();
        ctx.output.header("Downloading support models");
        self.install_support_models(ctx)?;

        if let Some(err) = pending {
            return Err(err);
        }
        text::postscript(ctx.output);
        Ok(())
    }

    fn ensure_initialized(&self, ctx: &CommandContext<'_>) -> Result<(), CliError> {
        if !self.layout.needs_initialization() {
            return Ok(());
        }
        text::initializing_root(ctx.output, self.layout.root(), self.init_file.as_deref());
        self.layout
            .initialize(&self.source_dir, self.init_file.as_deref())?;
        tracing::info!(root = %self.layout.root().display(), "Initialized root directory");
        Ok(())
    }

    fn install_weights(&self, ctx: &CommandContext<'_>) -> Result<WeightsOutcome, CliError> {
        if self.options.yes {
            if let Some(token) = ctx.credentials.get() {
                return self.install_unattended(&token, ctx);
            }
            ctx.output.warn(
                "Cannot download models because no Hugging Face access token could be found. \
                 Please re-run without --yes",
            );
        }

        let selection = match choose(self.catalog, ctx)? {
            Choice::Selected(ids) => ids,
            Choice::Skip => return Ok(WeightsOutcome::Skipped),
            Choice::Quit => return Ok(WeightsOutcome::Quit),
        };
        if selection.is_empty() {
            ctx.output.println("No weight files selected.");
            return Ok(WeightsOutcome::Skipped);
        }

        text::license(ctx.output);
        ctx.interaction
            .pause("Press <enter> when you are ready to continue")?;

        loop {
            let token = self.authenticate(ctx)?;
            ctx.output.header("Downloading weights");
            let summary = self.download(&selection, &token, ctx)?;
            self.report(&summary, ctx.output);

            if summary.is_complete() {
                self.synthesize(&summary, ctx)?;
                return Ok(WeightsOutcome::Installed);
            }

            text::download_failed(ctx.output);
            if ctx.interaction.confirm("Try again?", true)? {
                continue;
            }
            self.synthesize(&summary, ctx)?;
            return Ok(WeightsOutcome::Incomplete(partial(&summary)));
        }
    }

    fn install_unattended(
        &self,
        token: &str,
        ctx: &CommandContext<'_>,
    ) -> Result<WeightsOutcome, CliError> {
        let selection = self.catalog.recommended_ids();
        print_review(self.catalog, &selection, ctx.output);

        let summary = self.download(&selection, token, ctx)?;
        self.report(&summary, ctx.output);
        self.synthesize(&summary, ctx)?;

        if summary.is_complete() {
            Ok(WeightsOutcome::Installed)
        } else {
            text::download_failed(ctx.output);
            Ok(WeightsOutcome::Incomplete(partial(&summary)))
        }
    }

    /// Cached token, or one typed by the user.
    fn authenticate(&self, ctx: &CommandContext<'_>) -> Result<String, CliError> {
        ctx.output.print("(Fetching Hugging Face token from cache...");
        if let Some(token) = ctx.credentials.get() {
            ctx.output.println("found)");
            return Ok(token);
        }
        ctx.output.println("not found)");
        text::token_instructions(ctx.output);

        loop {
            let token = ctx.interaction.secret("Hugging Face access token")?;
            let token = token.trim();
            if !token.is_empty() {
                return Ok(token.to_string());
            }
            ctx.output.warn("The token cannot be empty.");
        }
    }

    fn download(
        &self,
        selection: &[String],
        token: &str,
        ctx: &CommandContext<'_>,
    ) -> Result<BatchSummary, CliError> {
        let auto = AutoConfirm(true);
        let prompt = PromptConfirmation::new(ctx.interaction);
        let confirm: &dyn Confirmation = if self.options.yes { &auto } else { &prompt };

        let batch_ctx = BatchContext {
            credentials: ctx.credentials,
            confirm,
            progress: ctx.progress,
        };
        let summary = BatchDownloader::new(self.resumer, self.catalog, self.layout).download(
            selection,
            Some(token),
            &batch_ctx,
        )?;
        Ok(summary)
    }

    fn report(&self, summary: &BatchSummary, out: &dyn Output) {
        for outcome in &summary.outcomes {
            if outcome.success {
                out.println(&format!("* {}: {}", outcome.id, outcome.message));
            } else {
                out.warn(&format!("{}: {}", outcome.id, outcome.message));
            }
        }
        if summary.is_complete() {
            out.println(&format!(
                "Successfully installed {}",
                summary.succeeded().join(", ")
            ));
        }
    }

    /// Register whatever downloaded successfully in `models.yaml`.
    fn synthesize(&self, summary: &BatchSummary, ctx: &CommandContext<'_>) -> Result<(), CliError> {
        let succeeded = summary.succeeded();
        if succeeded.is_empty() {
            return Ok(());
        }

        let path = self.layout.config_file(self.options.config_file.as_deref());
        let interrupt = self.resumer.interrupt();
        let guard = interrupt.transfer_guard();
        let report = ConfigSynthesizer::new(self.catalog).write(&path, &succeeded);
        drop(guard);
        let report = report?;
        if let Some(backup) = &report.backup {
            ctx.output.println(&format!(
                "{} exists. Previous version saved as {}",
                path.display(),
                backup.display()
            ));
        }
        ctx.output.println(&format!(
            "Successfully created new configuration file {}",
            report.path.display()
        ));

        // Ctrl-C during the write was deferred until the document was in place
        if interrupt.is_requested() {
            return Err(CliError::Interrupted);
        }
        Ok(())
    }

    fn install_support_models(&self, ctx: &CommandContext<'_>) -> Result<(), CliError> {
        let summary =
            fetch_support_models(self.resumer, self.layout, SUPPORT_MODELS, ctx.progress)?;
        for outcome in &summary.outcomes {
            if outcome.success {
                ctx.output
                    .println(&format!("* {}: {}", outcome.id, outcome.message));
            } else {
                ctx.output.warn(&format!(
                    "Error installing {}: {}",
                    outcome.id, outcome.message
                ));
            }
        }
        Ok(())
    }
}

fn partial(summary: &BatchSummary) -> CliError {
    CliError::PartialDownload {
        failed: summary.failure_count(),
        requested: summary.requested(),
    }
}
