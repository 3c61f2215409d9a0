//! Sequential download of a catalog selection.

use std::fs;

use super::http::RangeTransport;
use super::outcome::{BatchSummary, DownloadOutcome, TransferStatus};
use super::progress::TransferProgress;
use super::resumer::TransferResumer;
use crate::catalog::{AssetCatalog, LEGACY_CHECKPOINT_ASSET};
use crate::credentials::CredentialStore;
use crate::error::{FetchError, FetchResult};
use crate::interaction::Confirmation;
use crate::layout::InstallLayout;

/// File name older installs used for the v1.4 checkpoint.
pub const LEGACY_CHECKPOINT_FILE: &str = "model.ckpt";

/// Collaborators a batch talks to besides the network.
#[derive(Clone, Copy)]
pub struct BatchContext<'a> {
    pub credentials: &'a dyn CredentialStore,
    pub confirm: &'a dyn Confirmation,
    pub progress: &'a dyn TransferProgress,
}

/// Downloads selected catalog assets one after another.
///
/// Every asset is attempted even if an earlier one failed; the summary
/// records each outcome in catalog order.
pub struct BatchDownloader<'a, T> {
    resumer: &'a TransferResumer<T>,
    catalog: &'a AssetCatalog,
    layout: &'a InstallLayout,
}

impl<'a, T: RangeTransport> BatchDownloader<'a, T> {
    pub fn new(
        resumer: &'a TransferResumer<T>,
        catalog: &'a AssetCatalog,
        layout: &'a InstallLayout,
    ) -> Self {
        Self {
            resumer,
            catalog,
            layout,
        }
    }

    /// Offer to rename a legacy `model.ckpt` to the v1.4 checkpoint name.
    ///
    /// Returns whether a rename happened. Does nothing when the canonical
    /// file already exists.
    pub fn migrate_legacy_checkpoint(&self, confirm: &dyn Confirmation) -> FetchResult<bool> {
        let Some(asset) = self.catalog.get(LEGACY_CHECKPOINT_ASSET) else {
            return Ok(false);
        };

        let legacy = self.layout.weights_path(LEGACY_CHECKPOINT_FILE);
        let canonical = self.layout.weights_path(asset.filename);
        if !legacy.is_file() || canonical.exists() {
            return Ok(false);
        }

        let prompt = format!(
            "You seem to have the Stable Diffusion v1.4 \"{}\" already installed. Ok to rename it to \"{}\" for future reference?",
            LEGACY_CHECKPOINT_FILE, asset.filename
        );
        if !confirm.confirm(&prompt, true)? {
            tracing::info!(path = %legacy.display(), "Legacy checkpoint left in place");
            return Ok(false);
        }

        fs::rename(&legacy, &canonical).map_err(|e| FetchError::WriteFailed {
            path: canonical.clone(),
            source: e,
        })?;
        tracing::info!(
            from = LEGACY_CHECKPOINT_FILE,
            to = asset.filename,
            "Renamed legacy checkpoint"
        );
        Ok(true)
    }

    /// Download every selected asset.
    ///
    /// A partial failure deletes the cached credential so the next attempt
    /// asks for a fresh one; a complete success caches `token`. Returns
    /// [`FetchError::Interrupted`] if the user interrupts a transfer.
    pub fn download<S: AsRef<str>>(
        &self,
        selection: &[S],
        token: Option<&str>,
        ctx: &BatchContext<'_>,
    ) -> FetchResult<BatchSummary> {
        self.migrate_legacy_checkpoint(ctx.confirm)?;

        let (assets, unknown) = self.catalog.order_selection(selection);
        let mut summary = BatchSummary::new();

        for asset in assets {
            let url = self
                .resumer
                .config()
                .resolve_url(asset.repo_id, asset.filename);
            let dest = self.layout.weights_path(asset.filename);

            tracing::debug!(id = asset.id, url = %url, "Fetching asset");
            let report = self.resumer.fetch(&url, &dest, token, ctx.progress);
            if report.status == TransferStatus::Interrupted {
                return Err(FetchError::Interrupted);
            }

            let outcome = DownloadOutcome::from_report(asset.id, dest, &report);
            if outcome.success {
                tracing::info!(id = asset.id, "{}", outcome.message);
            } else {
                tracing::warn!(id = asset.id, "{}", outcome.message);
            }
            summary.record(outcome);
        }

        for id in unknown {
            let message = FetchError::UnknownAsset(id.clone()).to_string();
            tracing::warn!(id = %id, "Skipping asset not in catalog");
            summary.record(DownloadOutcome::rejected(id, message));
        }

        self.settle_credentials(&summary, token, ctx.credentials);
        Ok(summary)
    }

    fn settle_credentials(
        &self,
        summary: &BatchSummary,
        token: Option<&str>,
        credentials: &dyn CredentialStore,
    ) {
        let result = if summary.has_failures() {
            tracing::warn!(
                failed = summary.failure_count(),
                requested = summary.requested(),
                "Batch incomplete, discarding cached token"
            );
            credentials.delete()
        } else if let Some(token) = token {
            credentials.save(token)
        } else {
            Ok(())
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, "Could not update cached token");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::credentials::MemoryCredentialStore;
    use crate::download::progress::NoProgress;
    use crate::download::testing::{pattern, Behavior, FakeHost};
    use crate::interaction::AutoConfirm;
    use tempfile::TempDir;

    const SD15: &str = "stable-diffusion-1.5";
    const SD14: &str = "stable-diffusion-1.4";
    const VAE: &str = "ft-mse-improved-autoencoder-840000";

    fn config() -> FetchConfig {
        FetchConfig::default().with_endpoint("https://hf.test")
    }

    fn url_for(catalog: &AssetCatalog, id: &str) -> String {
        let asset = catalog.get(id).unwrap();
        config().resolve_url(asset.repo_id, asset.filename)
    }

    fn run(
        host: &FakeHost,
        layout: &InstallLayout,
        selection: &[&str],
        store: &MemoryCredentialStore,
        confirm: AutoConfirm,
    ) -> FetchResult<BatchSummary> {
        let catalog = AssetCatalog::builtin();
        let resumer = TransferResumer::new(host, config());
        let batch = BatchDownloader::new(&resumer, &catalog, layout);
        let ctx = BatchContext {
            credentials: store,
            confirm: &confirm,
            progress: &NoProgress,
        };
        batch.download(selection, Some("hf_token"), &ctx)
    }

    #[test]
    fn test_full_success_in_catalog_order() {
        let catalog = AssetCatalog::builtin();
        let host = FakeHost::new()
            .with_artifact(&url_for(&catalog, SD15), pattern(5_000))
            .with_artifact(&url_for(&catalog, VAE), pattern(3_000));
        let temp = TempDir::new().unwrap();
        let layout = InstallLayout::new(temp.path());
        let store = MemoryCredentialStore::new();

        let summary = run(&host, &layout, &[VAE, SD15], &store, AutoConfirm(true)).unwrap();

        assert!(summary.is_complete());
        assert_eq!(summary.succeeded(), vec![SD15.to_string(), VAE.to_string()]);
        assert_eq!(host.requests()[0].url, url_for(&catalog, SD15));
        assert!(layout.weights_path("v1-5-pruned-emaonly.ckpt").exists());
        assert_eq!(store.get(), Some("hf_token".to_string()));
    }

    #[test]
    fn test_partial_failure_keeps_going_and_deletes_token() {
        let catalog = AssetCatalog::builtin();
        let host = FakeHost::new()
            .with_behavior(
                &url_for(&catalog, SD15),
                pattern(5_000),
                Behavior::Status(403, "403 Forbidden", b"Access denied".to_vec()),
            )
            .with_artifact(&url_for(&catalog, VAE), pattern(3_000));
        let temp = TempDir::new().unwrap();
        let layout = InstallLayout::new(temp.path());
        let store = MemoryCredentialStore::with_token("stale");

        let summary = run(&host, &layout, &[SD15, VAE], &store, AutoConfirm(true)).unwrap();

        assert_eq!(summary.requested(), 2);
        assert_eq!(summary.succeeded(), vec![VAE.to_string()]);
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_unknown_identifier_is_failed_outcome() {
        let catalog = AssetCatalog::builtin();
        let host = FakeHost::new().with_artifact(&url_for(&catalog, SD15), pattern(5_000));
        let temp = TempDir::new().unwrap();
        let layout = InstallLayout::new(temp.path());
        let store = MemoryCredentialStore::new();

        let summary = run(&host, &layout, &[SD15, "sdxl"], &store, AutoConfirm(true)).unwrap();

        assert_eq!(summary.requested(), 2);
        assert_eq!(summary.succeeded(), vec![SD15.to_string()]);
        let failed: Vec<_> = summary.failures().collect();
        assert_eq!(failed[0].id, "sdxl");
        assert!(failed[0].message.contains("unknown asset"));
        assert_eq!(host.requests().len(), 1);
    }

    #[test]
    fn test_legacy_checkpoint_renamed_then_skipped() {
        let catalog = AssetCatalog::builtin();
        let data = pattern(8_000);
        let host = FakeHost::new().with_artifact(&url_for(&catalog, SD14), data.clone());
        let temp = TempDir::new().unwrap();
        let layout = InstallLayout::new(temp.path());
        fs::create_dir_all(layout.weights_dir()).unwrap();
        fs::write(layout.weights_path(LEGACY_CHECKPOINT_FILE), &data).unwrap();
        let store = MemoryCredentialStore::new();

        let summary = run(&host, &layout, &[SD14], &store, AutoConfirm(true)).unwrap();

        assert!(summary.is_complete());
        assert_eq!(summary.bytes_transferred(), 0);
        assert!(!layout.weights_path(LEGACY_CHECKPOINT_FILE).exists());
        assert_eq!(fs::read(layout.weights_path("sd-v1-4.ckpt")).unwrap(), data);
    }

    #[test]
    fn test_legacy_checkpoint_declined() {
        let temp = TempDir::new().unwrap();
        let layout = InstallLayout::new(temp.path());
        fs::create_dir_all(layout.weights_dir()).unwrap();
        fs::write(layout.weights_path(LEGACY_CHECKPOINT_FILE), b"old").unwrap();
        let catalog = AssetCatalog::builtin();
        let host = FakeHost::new();
        let resumer = TransferResumer::new(&host, config());
        let batch = BatchDownloader::new(&resumer, &catalog, &layout);

        assert!(!batch.migrate_legacy_checkpoint(&AutoConfirm(false)).unwrap());
        assert!(layout.weights_path(LEGACY_CHECKPOINT_FILE).exists());
    }

    #[test]
    fn test_legacy_checkpoint_ignored_when_canonical_exists() {
        let temp = TempDir::new().unwrap();
        let layout = InstallLayout::new(temp.path());
        fs::create_dir_all(layout.weights_dir()).unwrap();
        fs::write(layout.weights_path(LEGACY_CHECKPOINT_FILE), b"old").unwrap();
        fs::write(layout.weights_path("sd-v1-4.ckpt"), b"new").unwrap();
        let catalog = AssetCatalog::builtin();
        let host = FakeHost::new();
        let resumer = TransferResumer::new(&host, config());
        let batch = BatchDownloader::new(&resumer, &catalog, &layout);

        assert!(!batch.migrate_legacy_checkpoint(&AutoConfirm(true)).unwrap());
        assert_eq!(fs::read(layout.weights_path("sd-v1-4.ckpt")).unwrap(), b"new");
    }

    /// Confirmation whose prompt is cut short by Ctrl-C.
    struct InterruptedPrompt;

    impl Confirmation for InterruptedPrompt {
        fn confirm(&self, _prompt: &str, _default: bool) -> FetchResult<bool> {
            Err(FetchError::Interrupted)
        }
    }

    #[test]
    fn test_interrupt_at_rename_prompt_leaves_checkpoint() {
        let catalog = AssetCatalog::builtin();
        let host = FakeHost::new().with_artifact(&url_for(&catalog, SD14), pattern(8_000));
        let temp = TempDir::new().unwrap();
        let layout = InstallLayout::new(temp.path());
        fs::create_dir_all(layout.weights_dir()).unwrap();
        fs::write(layout.weights_path(LEGACY_CHECKPOINT_FILE), b"old").unwrap();
        let store = MemoryCredentialStore::with_token("kept");
        let resumer = TransferResumer::new(&host, config());
        let batch = BatchDownloader::new(&resumer, &catalog, &layout);
        let ctx = BatchContext {
            credentials: &store,
            confirm: &InterruptedPrompt,
            progress: &NoProgress,
        };

        let err = batch.download(&[SD14], Some("hf_token"), &ctx).unwrap_err();

        assert!(err.is_interrupt());
        assert_eq!(fs::read(layout.weights_path(LEGACY_CHECKPOINT_FILE)).unwrap(), b"old");
        assert!(!layout.weights_path("sd-v1-4.ckpt").exists());
        assert!(host.requests().is_empty());
        assert_eq!(store.get(), Some("kept".to_string()));
    }

    #[test]
    fn test_interrupt_stops_batch() {
        let catalog = AssetCatalog::builtin();
        let host = FakeHost::new()
            .with_artifact(&url_for(&catalog, SD15), pattern(5_000))
            .with_artifact(&url_for(&catalog, VAE), pattern(3_000));
        let temp = TempDir::new().unwrap();
        let layout = InstallLayout::new(temp.path());
        let store = MemoryCredentialStore::with_token("kept");
        let resumer = TransferResumer::new(&host, config());
        resumer.interrupt().request();
        let batch = BatchDownloader::new(&resumer, &catalog, &layout);
        let ctx = BatchContext {
            credentials: &store,
            confirm: &AutoConfirm(true),
            progress: &NoProgress,
        };

        let err = batch.download(&[SD15, VAE], None, &ctx).unwrap_err();

        assert!(err.is_interrupt());
        assert!(host.requests().is_empty());
        assert_eq!(store.get(), Some("kept".to_string()));
    }
}
