//! Static registry of downloadable weight files.
//!
//! The catalog maps a human-readable identifier (e.g. `stable-diffusion-1.5`)
//! to where the weights live on the artifact host and how they are registered
//! in `models.yaml`. It is built once at startup and never mutated; iteration
//! always follows declaration order, which also decides the default model.

use std::collections::HashSet;

use crate::error::{FetchError, FetchResult};

/// How a downloaded file is registered in the configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetRole {
    /// A model with its own stanza, loaded with the given inference config.
    Primary {
        /// File name under `configs/stable-diffusion/`.
        config_template: &'static str,
    },
    /// A shared secondary file (the VAE) attached to every primary stanza
    /// written in the same run. Never gets a stanza of its own.
    Paired,
}

/// A downloadable weight file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    /// Unique catalog key, also the stanza name in `models.yaml`.
    pub id: &'static str,
    pub description: &'static str,
    /// Repository on the artifact host, `owner/name`.
    pub repo_id: &'static str,
    /// File name inside the repository and on disk.
    pub filename: &'static str,
    pub role: AssetRole,
    pub width: u32,
    pub height: u32,
    /// Selected in unattended mode and pre-selected when customizing.
    pub recommended: bool,
}

impl AssetDescriptor {
    /// Whether this is a shared secondary file.
    pub fn is_paired(&self) -> bool {
        matches!(self.role, AssetRole::Paired)
    }

    /// The inference config template, if this is a primary model.
    pub fn config_template(&self) -> Option<&'static str> {
        match self.role {
            AssetRole::Primary { config_template } => Some(config_template),
            AssetRole::Paired => None,
        }
    }
}

const BUILTIN_ASSETS: &[AssetDescriptor] = &[
    AssetDescriptor {
        id: "stable-diffusion-1.5",
        description: "The newest Stable Diffusion version 1.5 weight file (4.27 GB)",
        repo_id: "runwayml/stable-diffusion-v1-5",
        filename: "v1-5-pruned-emaonly.ckpt",
        role: AssetRole::Primary {
            config_template: "v1-inference.yaml",
        },
        width: 512,
        height: 512,
        recommended: true,
    },
    AssetDescriptor {
        id: "inpainting-1.5",
        description: "RunwayML SD 1.5 model optimized for inpainting (4.27 GB)",
        repo_id: "runwayml/stable-diffusion-inpainting",
        filename: "sd-v1-5-inpainting.ckpt",
        role: AssetRole::Primary {
            config_template: "v1-inpainting-inference.yaml",
        },
        width: 512,
        height: 512,
        recommended: true,
    },
    AssetDescriptor {
        id: "stable-diffusion-1.4",
        description: "The original Stable Diffusion version 1.4 weight file (4.27 GB)",
        repo_id: "CompVis/stable-diffusion-v-1-4-original",
        filename: "sd-v1-4.ckpt",
        role: AssetRole::Primary {
            config_template: "v1-inference.yaml",
        },
        width: 512,
        height: 512,
        recommended: false,
    },
    AssetDescriptor {
        id: "waifu-diffusion-1.3",
        description: "Stable Diffusion 1.4 fine tuned on anime-styled images (4.27 GB)",
        repo_id: "hakurei/waifu-diffusion-v1-3",
        filename: "model-epoch09-float32.ckpt",
        role: AssetRole::Primary {
            config_template: "v1-inference.yaml",
        },
        width: 512,
        height: 512,
        recommended: false,
    },
    AssetDescriptor {
        id: "ft-mse-improved-autoencoder-840000",
        description: "StabilityAI improved autoencoder fine-tuned for human faces (recommended; 335 MB)",
        repo_id: "stabilityai/sd-vae-ft-mse-original",
        filename: "vae-ft-mse-840000-ema-pruned.ckpt",
        role: AssetRole::Paired,
        width: 512,
        height: 512,
        recommended: true,
    },
];

/// Identifier whose file older installs stored as `model.ckpt`.
pub const LEGACY_CHECKPOINT_ASSET: &str = "stable-diffusion-1.4";

/// Immutable lookup table of downloadable assets.
#[derive(Debug, Clone)]
pub struct AssetCatalog {
    assets: Vec<AssetDescriptor>,
}

impl AssetCatalog {
    /// The built-in catalog of Stable Diffusion weights.
    pub fn builtin() -> Self {
        Self {
            assets: BUILTIN_ASSETS.to_vec(),
        }
    }

    /// Build a catalog from an explicit descriptor list.
    ///
    /// Declaration order is preserved. Duplicate identifiers are rejected.
    pub fn from_descriptors(assets: Vec<AssetDescriptor>) -> FetchResult<Self> {
        let mut seen = HashSet::new();
        for asset in &assets {
            if !seen.insert(asset.id) {
                return Err(FetchError::DuplicateAsset(asset.id.to_string()));
            }
        }
        Ok(Self { assets })
    }

    /// All assets in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &AssetDescriptor> {
        self.assets.iter()
    }

    /// Look up an asset by identifier.
    pub fn get(&self, id: &str) -> Option<&AssetDescriptor> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Look up an asset, failing on unknown identifiers.
    pub fn require(&self, id: &str) -> FetchResult<&AssetDescriptor> {
        self.get(id)
            .ok_or_else(|| FetchError::UnknownAsset(id.to_string()))
    }

    /// Recommended assets in declaration order.
    pub fn recommended(&self) -> impl Iterator<Item = &AssetDescriptor> {
        self.assets.iter().filter(|a| a.recommended)
    }

    /// Identifiers of the recommended assets, in declaration order.
    pub fn recommended_ids(&self) -> Vec<String> {
        self.recommended().map(|a| a.id.to_string()).collect()
    }

    /// Reorder a selection into declaration order, dropping duplicates.
    ///
    /// Identifiers not in the catalog are returned separately, in the order
    /// they were given.
    pub fn order_selection<S: AsRef<str>>(
        &self,
        selection: &[S],
    ) -> (Vec<&AssetDescriptor>, Vec<String>) {
        let wanted: HashSet<&str> = selection.iter().map(|s| s.as_ref()).collect();
        let known: Vec<&AssetDescriptor> =
            self.assets.iter().filter(|a| wanted.contains(a.id)).collect();

        let mut unknown: Vec<String> = Vec::new();
        for id in selection.iter().map(|s| s.as_ref()) {
            if self.get(id).is_none() && !unknown.iter().any(|u| u == id) {
                unknown.push(id.to_string());
            }
        }

        (known, unknown)
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl Default for AssetCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_declaration_order() {
        let catalog = AssetCatalog::builtin();
        let ids: Vec<_> = catalog.iter().map(|a| a.id).collect();
        assert_eq!(
            ids,
            vec![
                "stable-diffusion-1.5",
                "inpainting-1.5",
                "stable-diffusion-1.4",
                "waifu-diffusion-1.3",
                "ft-mse-improved-autoencoder-840000",
            ]
        );
    }

    #[test]
    fn test_recommended_subset() {
        let catalog = AssetCatalog::builtin();
        assert_eq!(
            catalog.recommended_ids(),
            vec![
                "stable-diffusion-1.5",
                "inpainting-1.5",
                "ft-mse-improved-autoencoder-840000",
            ]
        );
    }

    #[test]
    fn test_paired_asset_has_no_template() {
        let catalog = AssetCatalog::builtin();
        let vae = catalog.get("ft-mse-improved-autoencoder-840000").unwrap();
        assert!(vae.is_paired());
        assert_eq!(vae.config_template(), None);

        let sd = catalog.get("stable-diffusion-1.5").unwrap();
        assert!(!sd.is_paired());
        assert_eq!(sd.config_template(), Some("v1-inference.yaml"));
    }

    #[test]
    fn test_require_unknown() {
        let catalog = AssetCatalog::builtin();
        assert!(matches!(
            catalog.require("stable-diffusion-9"),
            Err(FetchError::UnknownAsset(_))
        ));
    }

    #[test]
    fn test_legacy_asset_is_cataloged() {
        let catalog = AssetCatalog::builtin();
        assert_eq!(
            catalog.get(LEGACY_CHECKPOINT_ASSET).unwrap().filename,
            "sd-v1-4.ckpt"
        );
    }

    #[test]
    fn test_order_selection_follows_catalog() {
        let catalog = AssetCatalog::builtin();
        let (known, unknown) = catalog.order_selection(&[
            "ft-mse-improved-autoencoder-840000",
            "bogus",
            "stable-diffusion-1.5",
            "stable-diffusion-1.5",
        ]);

        let ids: Vec<_> = known.iter().map(|a| a.id).collect();
        assert_eq!(
            ids,
            vec!["stable-diffusion-1.5", "ft-mse-improved-autoencoder-840000"]
        );
        assert_eq!(unknown, vec!["bogus".to_string()]);
    }

    #[test]
    fn test_from_descriptors_rejects_duplicates() {
        let a = BUILTIN_ASSETS[0].clone();
        let result = AssetCatalog::from_descriptors(vec![a.clone(), a]);
        assert!(matches!(result, Err(FetchError::DuplicateAsset(_))));
    }
}
