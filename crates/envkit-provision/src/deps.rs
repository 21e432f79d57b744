//! Dependency-source selection: declarative environment files (base / dev
//! variant) and pinned lock files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ProvisionError;

pub const BASE_ENV_FILE: &str = "environment.yml";
pub const DEV_ENV_FILE: &str = "environment-dev.yml";

/// Which declarative file to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    #[default]
    Prod,
    Dev,
}

impl Variant {
    pub fn file_name(self) -> &'static str {
        match self {
            Variant::Prod => BASE_ENV_FILE,
            Variant::Dev => DEV_ENV_FILE,
        }
    }

    /// Wording used in progress output.
    pub fn label(self) -> &'static str {
        match self {
            Variant::Prod => "base",
            Variant::Dev => "development",
        }
    }
}

/// Where the environment's packages come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencySource {
    /// Fully pinned explicit lock file
    Lock(PathBuf),
    /// Human-edited environment file
    File(PathBuf),
}

impl DependencySource {
    pub fn path(&self) -> &Path {
        match self {
            DependencySource::Lock(p) | DependencySource::File(p) => p,
        }
    }

    pub fn is_lock(&self) -> bool {
        matches!(self, DependencySource::Lock(_))
    }
}

impl fmt::Display for DependencySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencySource::Lock(p) => write!(f, "lock file {}", p.display()),
            DependencySource::File(p) => write!(f, "environment file {}", p.display()),
        }
    }
}

/// `environment.yml` contents. Only parsed for validation and reporting;
/// the environment manager reads the file itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentFile {
    pub name: Option<String>,
    pub channels: Vec<String>,
    pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dependency {
    Spec(String),
    Pip { pip: Vec<String> },
}

impl EnvironmentFile {
    pub fn load(path: &Path) -> Result<Self, ProvisionError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| ProvisionError::InvalidDependencyFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Number of package specs, counting pip entries individually.
    pub fn package_count(&self) -> usize {
        self.dependencies
            .iter()
            .map(|d| match d {
                Dependency::Spec(_) => 1,
                Dependency::Pip { pip } => pip.len(),
            })
            .sum()
    }
}

/// Directories searched for dependency files, in order.
fn search_dirs(root: &Path) -> [PathBuf; 2] {
    [root.to_path_buf(), root.join("setup")]
}

fn find_in(root: &Path, file_name: &str) -> Option<PathBuf> {
    search_dirs(root)
        .into_iter()
        .map(|d| d.join(file_name))
        .find(|p| p.is_file())
}

pub fn find_env_file(root: &Path, variant: Variant) -> Result<PathBuf, ProvisionError> {
    find_in(root, variant.file_name())
        .ok_or_else(|| ProvisionError::MissingDependencyFile(variant.file_name().to_string()))
}

/// Platform tag in the environment manager's naming (`linux-64`, `osx-arm64`, ...).
pub fn current_platform() -> String {
    let os = match std::env::consts::OS {
        "macos" => "osx",
        "windows" => "win",
        other => other,
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => "64",
        "x86" => "32",
        "aarch64" if os == "linux" => "aarch64",
        "aarch64" => "arm64",
        other => other,
    };
    format!("{os}-{arch}")
}

pub fn lock_file_name(platform: &str) -> String {
    format!("conda-{platform}.lock")
}

pub fn find_lock_file(root: &Path, platform: &str) -> Option<PathBuf> {
    find_in(root, &lock_file_name(platform))
}

/// Pick the dependency source: the lock file when requested and present,
/// else the variant's environment file (which must exist).
pub fn select_source(
    root: &Path,
    variant: Variant,
    use_lock: bool,
    platform: &str,
) -> Result<(PathBuf, DependencySource), ProvisionError> {
    let env_file = find_env_file(root, variant)?;
    if use_lock {
        if let Some(lock) = find_lock_file(root, platform) {
            return Ok((env_file, DependencySource::Lock(lock)));
        }
        tracing::warn!(
            lock = %lock_file_name(platform),
            "--use-lock requested but no lock file found; using environment file"
        );
    }
    Ok((env_file.clone(), DependencySource::File(env_file)))
}
