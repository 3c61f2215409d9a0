//! Install root resolution and directory layout.
//!
//! Every path the installer touches is derived from an [`InstallLayout`],
//! which is resolved once at startup and passed explicitly to each component.
//!
//! ```text
//! <root>/
//! ├── configs/
//! │   ├── models.yaml                 (synthesized)
//! │   └── stable-diffusion/*.yaml     (inference templates)
//! ├── models/
//! │   ├── ldm/stable-diffusion-v1/    (weight checkpoints)
//! │   ├── gfpgan/ codeformer/         (support models)
//! ├── outputs/
//! ├── scripts/
//! └── logs/
//! ```

use std::fs;
use std::path::{Component, Path, PathBuf};

use regex::Regex;

use crate::error::{FetchError, FetchResult};

/// Directory holding all downloaded models, relative to the root.
pub const MODELS_DIR: &str = "models";

/// Directory holding weight checkpoints, relative to [`MODELS_DIR`].
pub const WEIGHTS_SUBDIR: &str = "ldm/stable-diffusion-v1";

/// Directory holding inference config templates, relative to the root.
pub const SD_CONFIGS_DIR: &str = "configs/stable-diffusion";

/// Default location of the synthesized configuration document.
pub const DEFAULT_CONFIG_FILE: &str = "configs/models.yaml";

/// Template whose presence marks an initialized root.
pub const SENTINEL_TEMPLATE: &str = "v1-inference.yaml";

/// Environment variable naming the install root.
pub const ROOT_ENV: &str = "INVOKEAI_ROOT";

/// Init file in the user's home directory that records `--root`.
pub const INIT_FILE_NAME: &str = ".invokeai";

/// Directories created under a fresh root.
const ROOT_SUBDIRS: &[&str] = &["models", "configs", "outputs", "scripts"];

/// Directories copied from the application source tree into a fresh root.
const COPIED_SUBDIRS: &[&str] = &["configs", "scripts"];

/// Resolved install root and the paths derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    /// Create a layout for the given root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The install root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for weight checkpoints.
    pub fn weights_dir(&self) -> PathBuf {
        self.root.join(MODELS_DIR).join(WEIGHTS_SUBDIR)
    }

    /// Destination of a weight checkpoint on disk.
    pub fn weights_path(&self, filename: &str) -> PathBuf {
        self.weights_dir().join(filename)
    }

    /// A file under the models directory, e.g. `gfpgan/weights/x.pth`.
    pub fn models_path(&self, relative: &str) -> PathBuf {
        self.root.join(MODELS_DIR).join(relative)
    }

    /// Path of a checkpoint as recorded in `models.yaml` (root-relative).
    pub fn weights_entry(filename: &str) -> String {
        format!("{}/{}/{}", MODELS_DIR, WEIGHTS_SUBDIR, filename)
    }

    /// Path of an inference template as recorded in `models.yaml`.
    pub fn config_entry(template: &str) -> String {
        format!("{}/{}", SD_CONFIGS_DIR, template)
    }

    /// Resolve the configuration document path.
    ///
    /// Relative paths are taken from the root; the result is lexically
    /// normalized.
    pub fn config_file(&self, override_path: Option<&Path>) -> PathBuf {
        let relative = override_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        normalize(&self.root.join(relative))
    }

    /// Directory for the installer's own log file.
    pub fn log_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Whether the root lacks the inference templates and must be initialized.
    pub fn needs_initialization(&self) -> bool {
        !self
            .root
            .join(SD_CONFIGS_DIR)
            .join(SENTINEL_TEMPLATE)
            .exists()
    }

    /// Scaffold a fresh root.
    ///
    /// Creates the standard subdirectories, copies `configs/` and `scripts/`
    /// from `source_dir` (the application source tree), and writes the init
    /// file if it does not exist yet.
    pub fn initialize(&self, source_dir: &Path, init_file: Option<&Path>) -> FetchResult<()> {
        let source_configs = source_dir.join("configs");
        if !source_configs.is_dir() {
            return Err(FetchError::MissingSourceTree {
                root: self.root.clone(),
                source_dir: source_configs,
            });
        }

        for name in ROOT_SUBDIRS {
            let dir = self.root.join(name);
            fs::create_dir_all(&dir)
                .map_err(|e| FetchError::CreateDirFailed { path: dir, source: e })?;
        }

        for name in COPIED_SUBDIRS {
            let src = source_dir.join(name);
            let dest = self.root.join(name);
            if !src.is_dir() || same_file(&src, &dest) {
                continue;
            }
            tracing::info!(from = %src.display(), to = %dest.display(), "Copying {}", name);
            copy_dir_recursive(&src, &dest)?;
        }

        if let Some(init_file) = init_file {
            if !init_file.exists() {
                write_init_file(init_file, &self.root)?;
            }
        }

        Ok(())
    }
}

/// Resolves the install root from CLI, environment and init file.
///
/// Precedence: explicit argument, `INVOKEAI_ROOT`, the last `--root` line in
/// the init file, then the current directory.
#[derive(Debug, Clone, Default)]
pub struct RootResolver {
    env_root: Option<String>,
    init_file: Option<PathBuf>,
}

impl RootResolver {
    /// Resolver reading the real environment and `~/.invokeai`.
    pub fn from_env() -> Self {
        Self {
            env_root: std::env::var(ROOT_ENV).ok().filter(|s| !s.is_empty()),
            init_file: default_init_file(),
        }
    }

    /// Resolver with explicit inputs.
    pub fn new(env_root: Option<String>, init_file: Option<PathBuf>) -> Self {
        Self {
            env_root,
            init_file,
        }
    }

    /// The init file consulted by this resolver.
    pub fn init_file(&self) -> Option<&Path> {
        self.init_file.as_deref()
    }

    /// Resolve the root directory, expanding a leading `~`.
    pub fn resolve(&self, cli_root: Option<&Path>) -> FetchResult<PathBuf> {
        if let Some(root) = cli_root {
            return Ok(expand_tilde(root));
        }
        if let Some(root) = &self.env_root {
            return Ok(expand_tilde(Path::new(root)));
        }
        match &self.init_file {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path).map_err(|e| FetchError::ReadFailed {
                    path: path.clone(),
                    source: e,
                })?;
                let root = parse_init_root(&contents).unwrap_or_else(|| ".".to_string());
                Ok(expand_tilde(Path::new(&root)))
            }
            _ => Ok(PathBuf::from(".")),
        }
    }
}

/// `~/.invokeai`, if a home directory is known.
pub fn default_init_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(INIT_FILE_NAME))
}

/// Extract the root from init file contents. The last `--root` wins.
fn parse_init_root(contents: &str) -> Option<String> {
    let re = Regex::new(r#"--root\s*=?\s*"?([^"]+)"?"#).ok()?;
    contents
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .filter_map(|line| re.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .last()
        .map(|root| if root.is_empty() { ".".to_string() } else { root })
}

fn write_init_file(path: &Path, root: &Path) -> FetchResult<()> {
    let contents = format!(
        "# Initialization file for the image generation application.\n\
         # --root points at the folder holding models, configs and outputs.\n\
         # Change it only if you move that folder.\n\
         --root=\"{}\"\n\
         \n\
         # Other startup options may follow, one per line, e.g.\n\
         # --web --host=0.0.0.0\n\
         # --steps=20\n",
        root.display()
    );
    tracing::info!(path = %path.display(), "Writing init file");
    fs::write(path, contents).map_err(|e| FetchError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Lexically normalize a path, resolving `.` and `..` without touching disk.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}

/// Recursively copy a directory, overwriting existing files.
fn copy_dir_recursive(source: &Path, dest: &Path) -> FetchResult<()> {
    fs::create_dir_all(dest).map_err(|e| FetchError::CreateDirFailed {
        path: dest.to_path_buf(),
        source: e,
    })?;

    for entry in fs::read_dir(source).map_err(|e| FetchError::ReadFailed {
        path: source.to_path_buf(),
        source: e,
    })? {
        let entry = entry.map_err(|e| FetchError::ReadFailed {
            path: source.to_path_buf(),
            source: e,
        })?;

        let source_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if source_path.is_dir() {
            copy_dir_recursive(&source_path, &dest_path)?;
        } else {
            fs::copy(&source_path, &dest_path).map_err(|e| FetchError::WriteFailed {
                path: dest_path,
                source: e,
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_weights_paths() {
        let layout = InstallLayout::new("/opt/invokeai");
        assert_eq!(
            layout.weights_path("sd-v1-4.ckpt"),
            PathBuf::from("/opt/invokeai/models/ldm/stable-diffusion-v1/sd-v1-4.ckpt")
        );
        assert_eq!(
            InstallLayout::weights_entry("sd-v1-4.ckpt"),
            "models/ldm/stable-diffusion-v1/sd-v1-4.ckpt"
        );
        assert_eq!(
            InstallLayout::config_entry("v1-inference.yaml"),
            "configs/stable-diffusion/v1-inference.yaml"
        );
    }

    #[test]
    fn test_config_file_default_and_override() {
        let layout = InstallLayout::new("/opt/invokeai");
        assert_eq!(
            layout.config_file(None),
            PathBuf::from("/opt/invokeai/configs/models.yaml")
        );
        assert_eq!(
            layout.config_file(Some(Path::new("./configs/../configs/alt.yaml"))),
            PathBuf::from("/opt/invokeai/configs/alt.yaml")
        );
        assert_eq!(
            layout.config_file(Some(Path::new("/etc/models.yaml"))),
            PathBuf::from("/etc/models.yaml")
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("./a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize(Path::new(".")), PathBuf::from("."));
        assert_eq!(normalize(Path::new("../x")), PathBuf::from("../x"));
    }

    #[test]
    fn test_parse_init_root() {
        let contents = "# comment --root=\"/nope\"\n--root=\"/first\"\n--web\n--root /second\n";
        assert_eq!(parse_init_root(contents), Some("/second".to_string()));
        assert_eq!(parse_init_root("--web\n"), None);
    }

    #[test]
    fn test_resolver_precedence() {
        let temp = TempDir::new().unwrap();
        let init = temp.path().join(".invokeai");
        fs::write(&init, "--root=\"/from/init\"\n").unwrap();

        let resolver = RootResolver::new(Some("/from/env".to_string()), Some(init.clone()));
        assert_eq!(
            resolver.resolve(Some(Path::new("/from/cli"))).unwrap(),
            PathBuf::from("/from/cli")
        );
        assert_eq!(resolver.resolve(None).unwrap(), PathBuf::from("/from/env"));

        let resolver = RootResolver::new(None, Some(init));
        assert_eq!(resolver.resolve(None).unwrap(), PathBuf::from("/from/init"));

        let resolver = RootResolver::new(None, Some(temp.path().join("missing")));
        assert_eq!(resolver.resolve(None).unwrap(), PathBuf::from("."));
    }

    #[test]
    fn test_initialize_scaffolds_root() {
        let source = TempDir::new().unwrap();
        fs::create_dir_all(source.path().join("configs/stable-diffusion")).unwrap();
        fs::write(
            source.path().join("configs/stable-diffusion/v1-inference.yaml"),
            "model: {}\n",
        )
        .unwrap();
        fs::create_dir_all(source.path().join("scripts")).unwrap();
        fs::write(source.path().join("scripts/run.py"), "print()\n").unwrap();

        let target = TempDir::new().unwrap();
        let root = target.path().join("root");
        let init = target.path().join(".invokeai");
        let layout = InstallLayout::new(&root);

        assert!(layout.needs_initialization());
        layout.initialize(source.path(), Some(&init)).unwrap();

        assert!(!layout.needs_initialization());
        assert!(root.join("outputs").is_dir());
        assert!(root.join("models").is_dir());
        assert!(root.join("scripts/run.py").exists());

        let written = fs::read_to_string(&init).unwrap();
        assert_eq!(
            parse_init_root(&written),
            Some(root.display().to_string())
        );
    }

    #[test]
    fn test_initialize_keeps_existing_init_file() {
        let source = TempDir::new().unwrap();
        fs::create_dir_all(source.path().join("configs")).unwrap();
        let target = TempDir::new().unwrap();
        let init = target.path().join(".invokeai");
        fs::write(&init, "--root=\"/elsewhere\"\n").unwrap();

        InstallLayout::new(target.path().join("root"))
            .initialize(source.path(), Some(&init))
            .unwrap();

        assert_eq!(
            fs::read_to_string(&init).unwrap(),
            "--root=\"/elsewhere\"\n"
        );
    }

    #[test]
    fn test_initialize_requires_source_tree() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let result = InstallLayout::new(target.path()).initialize(source.path(), None);
        assert!(matches!(result, Err(FetchError::MissingSourceTree { .. })));
    }
}
