//! Choosing which weight files to download.

use weightfetch::catalog::AssetCatalog;

use super::text;
use super::CommandContext;
use crate::error::CliError;
use crate::output::Output;

/// What the user decided to do about weight files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// Download these catalog identifiers.
    Selected(Vec<String>),
    /// Skip weight downloads and continue with support models.
    Skip,
    /// Leave the installer.
    Quit,
}

const MENU: &[&str] = &[
    "Download the recommended models",
    "Customize the list",
    "Skip this step",
];

/// Ask recommended / customize / skip, then walk the customization loop.
pub fn choose(catalog: &AssetCatalog, ctx: &CommandContext<'_>) -> Result<Choice, CliError> {
    text::download_options(ctx.output);

    match ctx.interaction.select("What would you like to do?", MENU, 0)? {
        0 => Ok(Choice::Selected(catalog.recommended_ids())),
        1 => loop {
            if let Some(ids) = review(catalog, ctx)? {
                return Ok(Choice::Selected(ids));
            }
            if ctx.interaction.confirm("Quit?", false)? {
                return Ok(Choice::Quit);
            }
        },
        _ => Ok(Choice::Skip),
    }
}

/// Per-asset questions followed by a review; `None` if the user gives up.
fn review(
    catalog: &AssetCatalog,
    ctx: &CommandContext<'_>,
) -> Result<Option<Vec<String>>, CliError> {
    loop {
        let ids = customize(catalog, ctx)?;
        print_review(catalog, &ids, ctx.output);

        if ctx.interaction.confirm("Ok to download?", true)? {
            return Ok(Some(ids));
        }
        if !ctx.interaction.confirm("Change your selection?", true)? {
            return Ok(None);
        }
    }
}

fn customize(catalog: &AssetCatalog, ctx: &CommandContext<'_>) -> Result<Vec<String>, CliError> {
    text::customize_intro(ctx.output);

    let mut ids = Vec::new();
    for (i, asset) in catalog.iter().enumerate() {
        let recommended = if asset.recommended {
            " (recommended)"
        } else {
            ""
        };
        ctx.output.println(&format!("[{}] {}:", i + 1, asset.id));
        ctx.output
            .indented(&format!("{}{}", asset.description, recommended));
        if ctx.interaction.confirm("Download?", asset.recommended)? {
            ids.push(asset.id.to_string());
        }
    }
    Ok(ids)
}

/// List the selection in download order, starring the model that will
/// become the default.
pub fn print_review(catalog: &AssetCatalog, ids: &[String], out: &dyn Output) {
    let (assets, _) = catalog.order_selection(ids);
    let default = assets.iter().find(|a| !a.is_paired()).map(|a| a.id);

    if assets.is_empty() {
        out.println("No weight files selected.");
        return;
    }

    out.println("The following weight files will be downloaded:");
    for (i, asset) in assets.iter().enumerate() {
        let marker = if Some(asset.id) == default { "*" } else { "" };
        out.indented(&format!("[{}] {}{}", i + 1, asset.id, marker));
    }
    if default.is_some() {
        out.println("*default");
    }
}
