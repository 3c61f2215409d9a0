//! Merge downloaded assets into `models.yaml`.
//!
//! Owned stanza fields (`description`, `weights`, `config`, `width`, `height`,
//! `vae`, `default`) are rewritten on every run, so a hand-edited `width: 768`
//! goes back to the catalog value. Everything else in the document is kept in
//! place.
//!
//! Default selection is first-wins: the first primary model written in this
//! run, in catalog order, becomes the default. It does not consider which
//! model the user prefers.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tempfile::NamedTempFile;

use super::document::{is_marked_default, ConfigurationDocument, DEFAULT_KEY};
use crate::catalog::{AssetCatalog, AssetDescriptor};
use crate::error::{FetchError, FetchResult};
use crate::layout::InstallLayout;

/// What a merge changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Stanzas written in this run, in catalog order.
    pub written: Vec<String>,
    /// The stanza carrying `default: true` afterwards, if any.
    pub default_entry: Option<String>,
    /// Paired VAE path attached to the written stanzas.
    pub vae: Option<String>,
    /// Successful identifiers missing from the catalog, ignored.
    pub ignored: Vec<String>,
}

/// Result of writing the document to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisReport {
    pub path: PathBuf,
    /// Copy of the previous document, if there was one.
    pub backup: Option<PathBuf>,
    pub summary: MergeSummary,
}

/// Builds `models.yaml` stanzas from catalog descriptors.
#[derive(Debug, Clone, Copy)]
pub struct ConfigSynthesizer<'a> {
    catalog: &'a AssetCatalog,
}

impl<'a> ConfigSynthesizer<'a> {
    pub fn new(catalog: &'a AssetCatalog) -> Self {
        Self { catalog }
    }

    /// Merge the successfully downloaded identifiers into `document`.
    pub fn merge<S: AsRef<str>>(
        &self,
        document: &mut ConfigurationDocument,
        successful: &[S],
    ) -> MergeSummary {
        let (assets, ignored) = self.catalog.order_selection(successful);
        for id in &ignored {
            tracing::warn!(id = %id, "Ignoring download not in catalog");
        }

        let vae = assets
            .iter()
            .find(|a| a.is_paired())
            .map(|a| InstallLayout::weights_entry(a.filename));

        let mut written = Vec::new();
        for asset in assets.iter().filter(|a| !a.is_paired()) {
            let key = Value::String(asset.id.to_string());
            let stanza = build_stanza(document.entries().get(asset.id), asset, vae.as_deref());
            document.entries_mut().insert(key, stanza);
            written.push(asset.id.to_string());
        }

        let default_entry = match written.first() {
            Some(first) => Some(first.clone()),
            None => fallback_default(document.entries()),
        };
        apply_default(document.entries_mut(), default_entry.as_deref());

        MergeSummary {
            written,
            default_entry,
            vae,
            ignored,
        }
    }

    /// Merge into the document at `path` and replace it atomically.
    ///
    /// The new text goes to a temporary file next to `path`; the previous
    /// document is copied to `<name>.orig`; then the temporary file is
    /// renamed over `path`. On any error the previous document is left as
    /// it was.
    pub fn write<S: AsRef<str>>(&self, path: &Path, successful: &[S]) -> FetchResult<SynthesisReport> {
        let mut document = ConfigurationDocument::load(path)?;
        let summary = self.merge(&mut document, successful);
        let text = document.render(path)?;

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| FetchError::CreateDirFailed {
            path: parent.clone(),
            source: e,
        })?;

        let write_err = |e| FetchError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        };
        let mut temp = NamedTempFile::new_in(&parent).map_err(write_err)?;
        temp.write_all(text.as_bytes()).map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;

        let backup = if path.exists() {
            let backup = backup_path(path);
            fs::copy(path, &backup).map_err(|e| FetchError::WriteFailed {
                path: backup.clone(),
                source: e,
            })?;
            tracing::info!(backup = %backup.display(), "Saved previous configuration");
            Some(backup)
        } else {
            None
        };

        temp.persist(path).map_err(|e| write_err(e.error))?;
        tracing::info!(
            path = %path.display(),
            written = summary.written.len(),
            default = summary.default_entry.as_deref().unwrap_or("none"),
            "Wrote model configuration"
        );

        Ok(SynthesisReport {
            path: path.to_path_buf(),
            backup,
            summary,
        })
    }
}

/// `<path>.orig`, next to the document.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".orig");
    path.with_file_name(name)
}

/// Existing stanza with owned fields rewritten and `default` dropped.
fn build_stanza(existing: Option<&Value>, asset: &AssetDescriptor, vae: Option<&str>) -> Value {
    let mut stanza = Mapping::new();
    if let Some(Value::Mapping(fields)) = existing {
        for (k, v) in fields {
            if k.as_str() != Some(DEFAULT_KEY) {
                stanza.insert(k.clone(), v.clone());
            }
        }
    }

    set(&mut stanza, "description", Value::String(asset.description.to_string()));
    set(
        &mut stanza,
        "weights",
        Value::String(InstallLayout::weights_entry(asset.filename)),
    );
    if let Some(template) = asset.config_template() {
        set(
            &mut stanza,
            "config",
            Value::String(InstallLayout::config_entry(template)),
        );
    }
    set(&mut stanza, "width", Value::Number(asset.width.into()));
    set(&mut stanza, "height", Value::Number(asset.height.into()));
    if let Some(vae) = vae {
        set(&mut stanza, "vae", Value::String(vae.to_string()));
    }

    Value::Mapping(stanza)
}

fn set(stanza: &mut Mapping, key: &str, value: Value) {
    stanza.insert(Value::String(key.to_string()), value);
}

/// Default to keep when no primary was written: the first marked stanza, else
/// the first stanza.
///
/// Only mapping values under string keys count as stanzas. A document with
/// none of them gets no default.
fn fallback_default(entries: &Mapping) -> Option<String> {
    let stanzas = || {
        entries
            .iter()
            .filter(|(_, v)| v.is_mapping())
            .filter_map(|(k, v)| Some((k.as_str()?, v)))
    };
    stanzas()
        .find(|(_, v)| is_marked_default(v))
        .or_else(|| stanzas().next())
        .map(|(k, _)| k.to_string())
}

/// Leave `default: true` on `chosen` only.
fn apply_default(entries: &mut Mapping, chosen: Option<&str>) {
    for (key, value) in entries.iter_mut() {
        let Value::Mapping(fields) = value else {
            continue;
        };
        let is_chosen = chosen.is_some() && key.as_str() == chosen;

        if is_chosen {
            if fields.get(DEFAULT_KEY).and_then(Value::as_bool) != Some(true) {
                let mut rebuilt: Mapping = fields
                    .iter()
                    .filter(|(k, _)| k.as_str() != Some(DEFAULT_KEY))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                set(&mut rebuilt, DEFAULT_KEY, Value::Bool(true));
                *fields = rebuilt;
            }
        } else if fields.contains_key(DEFAULT_KEY) {
            *fields = fields
                .iter()
                .filter(|(k, _)| k.as_str() != Some(DEFAULT_KEY))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
        }
    }
}
