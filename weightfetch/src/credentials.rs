//! Access-token storage for the artifact host.
//!
//! The batch downloader only needs get/save/delete over an opaque token:
//! it saves the token after a fully successful batch and deletes it after a
//! partial failure, so the next attempt forces the user to re-authenticate.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{FetchError, FetchResult};

/// Get/save/delete over a single cached access token.
pub trait CredentialStore {
    /// The cached token, if any.
    fn get(&self) -> Option<String>;

    /// Cache a token, replacing any previous one.
    fn save(&self, token: &str) -> FetchResult<()>;

    /// Forget the cached token. Deleting a missing token is not an error.
    fn delete(&self) -> FetchResult<()>;
}

/// Token file shared with the Hugging Face tooling.
///
/// Location: `HF_TOKEN_PATH`, else `$HF_HOME/token`, else
/// `~/.cache/huggingface/token`.
#[derive(Debug, Clone)]
pub struct HfTokenFile {
    path: PathBuf,
}

impl HfTokenFile {
    /// Token file at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Token file at the standard location, if one can be determined.
    pub fn locate() -> Option<Self> {
        if let Ok(path) = std::env::var("HF_TOKEN_PATH") {
            if !path.is_empty() {
                return Some(Self::new(path));
            }
        }
        if let Ok(home) = std::env::var("HF_HOME") {
            if !home.is_empty() {
                return Some(Self::new(Path::new(&home).join("token")));
            }
        }
        dirs::home_dir().map(|home| Self::new(home.join(".cache").join("huggingface").join("token")))
    }

    /// Path of the token file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for HfTokenFile {
    fn get(&self) -> Option<String> {
        fs::read_to_string(&self.path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn save(&self, token: &str) -> FetchResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| FetchError::Credential {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        fs::write(&self.path, token.trim()).map_err(|e| FetchError::Credential {
            path: self.path.clone(),
            source: e,
        })
    }

    fn delete(&self) -> FetchResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FetchError::Credential {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}

/// Process-local store, used when no token file location is known.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<String> {
        self.token.lock().ok().and_then(|t| t.clone())
    }

    fn save(&self, token: &str) -> FetchResult<()> {
        if let Ok(mut guard) = self.token.lock() {
            *guard = Some(token.to_string());
        }
        Ok(())
    }

    fn delete(&self) -> FetchResult<()> {
        if let Ok(mut guard) = self.token.lock() {
            *guard = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_token_file_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = HfTokenFile::new(temp.path().join("hf").join("token"));

        assert_eq!(store.get(), None);
        store.save("hf_abc123\n").unwrap();
        assert_eq!(store.get(), Some("hf_abc123".to_string()));

        store.delete().unwrap();
        assert_eq!(store.get(), None);
        // Deleting twice is fine
        store.delete().unwrap();
    }

    #[test]
    fn test_blank_token_file_is_absent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("token");
        fs::write(&path, "  \n").unwrap();
        assert_eq!(HfTokenFile::new(path).get(), None);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryCredentialStore::with_token("t");
        assert_eq!(store.get(), Some("t".to_string()));
        store.delete().unwrap();
        assert_eq!(store.get(), None);
        store.save("u").unwrap();
        assert_eq!(store.get(), Some("u".to_string()));
    }
}
