//! Face-restoration weights fetched from fixed release URLs.

use super::http::RangeTransport;
use super::outcome::{BatchSummary, DownloadOutcome, TransferStatus};
use super::progress::TransferProgress;
use super::resumer::TransferResumer;
use crate::error::{FetchError, FetchResult};
use crate::layout::InstallLayout;

/// A support file published outside the artifact host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportModel {
    /// Short name for logs and the summary.
    pub name: &'static str,
    pub url: &'static str,
    /// Destination relative to the models directory.
    pub relative_path: &'static str,
}

/// Support files for the GFPGAN and CodeFormer face restorers.
pub const SUPPORT_MODELS: &[SupportModel] = &[
    SupportModel {
        name: "GFPGANv1.4",
        url: "https://github.com/TencentARC/GFPGAN/releases/download/v1.3.0/GFPGANv1.4.pth",
        relative_path: "gfpgan/GFPGANv1.4.pth",
    },
    SupportModel {
        name: "detection_Resnet50_Final",
        url: "https://github.com/xinntao/facexlib/releases/download/v0.1.0/detection_Resnet50_Final.pth",
        relative_path: "gfpgan/weights/detection_Resnet50_Final.pth",
    },
    SupportModel {
        name: "parsing_parsenet",
        url: "https://github.com/xinntao/facexlib/releases/download/v0.2.2/parsing_parsenet.pth",
        relative_path: "gfpgan/weights/parsing_parsenet.pth",
    },
    SupportModel {
        name: "codeformer",
        url: "https://github.com/sczhou/CodeFormer/releases/download/v0.1.0/codeformer.pth",
        relative_path: "codeformer/codeformer.pth",
    },
];

/// Fetch each support model, resuming partial files.
///
/// A complete file costs one request answered with 416. Failures are
/// recorded and do not stop the remaining downloads.
pub fn fetch_support_models<T: RangeTransport>(
    resumer: &TransferResumer<T>,
    layout: &InstallLayout,
    models: &[SupportModel],
    progress: &dyn TransferProgress,
) -> FetchResult<BatchSummary> {
    let mut summary = BatchSummary::new();

    for model in models {
        let dest = layout.models_path(model.relative_path);
        tracing::info!(name = model.name, url = model.url, "Fetching support model");
        let report = resumer.fetch(model.url, &dest, None, progress);
        if report.status == TransferStatus::Interrupted {
            return Err(FetchError::Interrupted);
        }
        if !report.is_success() {
            tracing::warn!(name = model.name, "{}", report.message());
        }
        summary.record(DownloadOutcome::from_report(model.name, dest, &report));
    }

    Ok(summary)
}
