//! In-memory form of `models.yaml`.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{FetchError, FetchResult};

/// Comment block written at the top of every synthesized document.
pub const PREAMBLE: &str = "\
# This file describes the alternative machine learning models
# available to the image generation application.
#
# To add a new model, follow the examples below. Each
# model requires a model config file, a weights file,
# and the width and height of the images it
# was trained on.
";

/// Key of the default-model marker inside a stanza.
pub const DEFAULT_KEY: &str = "default";

/// Typed view of one stanza.
///
/// Stanzas are stored as raw YAML so keys this tool does not own survive a
/// rewrite; this struct only reads them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationEntry {
    pub description: Option<String>,
    pub weights: Option<String>,
    pub config: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Path of the paired VAE checkpoint.
    pub vae: Option<String>,
    pub default: Option<bool>,
}

impl ConfigurationEntry {
    /// Whether this stanza carries `default: true`.
    pub fn is_default(&self) -> bool {
        self.default == Some(true)
    }
}

/// Ordered mapping from model name to stanza.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigurationDocument {
    entries: Mapping,
}

impl ConfigurationDocument {
    /// Empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse document text. `path` is only used in error messages.
    ///
    /// Empty and comment-only text yields an empty document.
    pub fn parse(text: &str, path: &Path) -> FetchResult<Self> {
        let has_content = text.lines().any(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#') && line != "---"
        });
        if !has_content {
            return Ok(Self::new());
        }

        let value: Value = serde_yaml::from_str(text).map_err(|e| FetchError::ConfigParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        match value {
            Value::Null => Ok(Self::new()),
            Value::Mapping(entries) => Ok(Self { entries }),
            _ => Err(FetchError::ConfigParse {
                path: path.to_path_buf(),
                reason: "top level is not a mapping of model names".to_string(),
            }),
        }
    }

    /// Load a document from disk; a missing file is an empty document.
    pub fn load(path: &Path) -> FetchResult<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(FetchError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Serialize with the [`PREAMBLE`]. `path` is only used in error messages.
    pub fn render(&self, path: &Path) -> FetchResult<String> {
        let mut out = String::from(PREAMBLE);
        if !self.entries.is_empty() {
            let body =
                serde_yaml::to_string(&self.entries).map_err(|e| FetchError::ConfigSerialize {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            out.push_str(&body);
        }
        Ok(out)
    }

    /// Number of stanzas.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stanza names in document order.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().map(key_name).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Typed view of a stanza, if it exists and is a mapping.
    pub fn entry(&self, name: &str) -> Option<ConfigurationEntry> {
        self.entries
            .get(name)
            .filter(|v| v.is_mapping())
            .and_then(|v| serde_yaml::from_value(v.clone()).ok())
    }

    /// Raw YAML of a stanza.
    pub fn raw_entry(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Names of stanzas marked `default: true`, in document order.
    pub fn default_entries(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, v)| is_marked_default(v))
            .map(|(k, _)| key_name(k))
            .collect()
    }

    pub(crate) fn entries(&self) -> &Mapping {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Mapping {
        &mut self.entries
    }
}

/// Whether a raw stanza carries `default: true`.
pub(crate) fn is_marked_default(stanza: &Value) -> bool {
    stanza.get(DEFAULT_KEY).and_then(Value::as_bool) == Some(true)
}

fn key_name(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
# hand-written
stable-diffusion-1.5:
  description: SD 1.5
  weights: models/ldm/stable-diffusion-v1/v1-5-pruned-emaonly.ckpt
  config: configs/stable-diffusion/v1-inference.yaml
  width: 768
  height: 512
  default: true
my-model:
  weights: /data/custom.ckpt
  notes: keep me
";

    #[test]
    fn test_parse_preserves_order_and_fields() {
        let doc = ConfigurationDocument::parse(SAMPLE, Path::new("models.yaml")).unwrap();
        assert_eq!(doc.names(), vec!["stable-diffusion-1.5", "my-model"]);

        let entry = doc.entry("stable-diffusion-1.5").unwrap();
        assert_eq!(entry.width, Some(768));
        assert!(entry.is_default());
        assert_eq!(doc.default_entries(), vec!["stable-diffusion-1.5"]);

        let custom = doc.raw_entry("my-model").unwrap();
        assert_eq!(custom.get("notes").and_then(Value::as_str), Some("keep me"));
    }

    #[test]
    fn test_comment_only_is_empty() {
        let doc = ConfigurationDocument::parse("# nothing here\n", Path::new("m.yaml")).unwrap();
        assert!(doc.is_empty());
        let doc = ConfigurationDocument::parse("", Path::new("m.yaml")).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_non_mapping_is_error() {
        let err = ConfigurationDocument::parse("- a\n- b\n", Path::new("m.yaml")).unwrap_err();
        assert!(matches!(err, FetchError::ConfigParse { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let doc = ConfigurationDocument::load(&temp.path().join("absent.yaml")).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_render_starts_with_preamble() {
        let doc = ConfigurationDocument::parse(SAMPLE, Path::new("m.yaml")).unwrap();
        let text = doc.render(Path::new("m.yaml")).unwrap();
        assert!(text.starts_with(PREAMBLE));
        assert!(!text.contains("# hand-written"));

        let reparsed = ConfigurationDocument::parse(&text, Path::new("m.yaml")).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn test_render_empty_document() {
        let text = ConfigurationDocument::new().render(Path::new("m.yaml")).unwrap();
        assert_eq!(text, PREAMBLE);
    }
}
