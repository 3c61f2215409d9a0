//! The `models.yaml` document that tells the image generator which weights
//! are installed and which one loads by default.

mod document;
mod synthesizer;

pub use document::{ConfigurationDocument, ConfigurationEntry, DEFAULT_KEY, PREAMBLE};
pub use synthesizer::{backup_path, ConfigSynthesizer, MergeSummary, SynthesisReport};
