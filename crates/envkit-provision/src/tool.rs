//! Concrete tool-resolution strategies and the two standard chains:
//!
//! - environment manager: on PATH → known install prefixes → module system →
//!   `pip install --user` → private virtualenv
//! - lock tool: on PATH → install through the environment manager →
//!   `pip install --user` → private virtualenv

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::runner::CommandSpec;
use crate::strategy::{FallbackChain, ResolveContext, ResolveStrategy, ToolSpec};

/// Module names probed, in order, when loading the environment manager.
pub const MANAGER_MODULES: &[&str] = &["miniconda", "anaconda", "miniforge", "conda"];

/// Installation roots under `$HOME` probed for the environment manager.
const HOME_PREFIXES: &[&str] = &["miniconda3", "anaconda3", "miniforge3", "mambaforge"];

/// System-wide installation roots.
const SYSTEM_PREFIXES: &[&str] = &["/opt/conda"];

/// Makes the `module` shell function usable from a non-interactive bash.
const MODULE_INIT: &str =
    r#"if [ -n "$MODULESHOME" ] && [ -f "$MODULESHOME/init/bash" ]; then . "$MODULESHOME/init/bash"; fi;"#;

impl ToolSpec {
    /// Spec for the environment manager (`conda`, `mamba`, ...).
    pub fn env_manager(binary: &str, home: Option<&Path>) -> Self {
        let mut known_prefixes: Vec<PathBuf> = home
            .map(|h| HOME_PREFIXES.iter().map(|p| h.join(p)).collect())
            .unwrap_or_default();
        known_prefixes.extend(SYSTEM_PREFIXES.iter().map(PathBuf::from));
        Self {
            binary: binary.to_string(),
            package: binary.to_string(),
            module_candidates: MANAGER_MODULES.iter().map(|s| s.to_string()).collect(),
            known_prefixes,
        }
    }

    /// Spec for the companion lock utility.
    pub fn lock_tool(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
            package: binary.to_string(),
            module_candidates: Vec::new(),
            known_prefixes: Vec::new(),
        }
    }
}

pub fn env_manager_chain() -> FallbackChain {
    FallbackChain::new()
        .with(OnPath)
        .with(KnownPrefixes)
        .with(ModuleLoad)
        .with(UserInstall)
        .with(VirtualenvInstall)
}

pub fn lock_tool_chain() -> FallbackChain {
    FallbackChain::new()
        .with(OnPath)
        .with(ManagerInstall)
        .with(UserInstall)
        .with(VirtualenvInstall)
}

/// The binary is already on the search path.
pub struct OnPath;

impl ResolveStrategy for OnPath {
    fn name(&self) -> &'static str {
        "on-path"
    }

    fn attempt(&self, ctx: &ResolveContext<'_>) -> Result<PathBuf> {
        match ctx.runner.lookup(&ctx.tool.binary) {
            Some(p) => Ok(p),
            None => bail!("{} not found on PATH", ctx.tool.binary),
        }
    }
}

/// An installation exists in a conventional location but is not on PATH.
pub struct KnownPrefixes;

impl ResolveStrategy for KnownPrefixes {
    fn name(&self) -> &'static str {
        "known-prefix"
    }

    fn attempt(&self, ctx: &ResolveContext<'_>) -> Result<PathBuf> {
        for prefix in &ctx.tool.known_prefixes {
            let candidate = prefix.join("bin").join(&ctx.tool.binary);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        bail!("no installation under {} known prefixes", ctx.tool.known_prefixes.len())
    }
}

/// Load the tool through an environment-module system (`module avail` / `module load`).
///
/// Applies only when the module system is present and `module avail` lists a
/// candidate; `module load` is never issued for an unlisted module.
pub struct ModuleLoad;

impl ResolveStrategy for ModuleLoad {
    fn name(&self) -> &'static str {
        "module-load"
    }

    fn attempt(&self, ctx: &ResolveContext<'_>) -> Result<PathBuf> {
        if ctx.module_home.is_none() && ctx.runner.lookup("module").is_none() {
            bail!("no environment-module system");
        }
        if !is_safe_token(&ctx.tool.binary) {
            bail!("refusing to pass '{}' to the shell", ctx.tool.binary);
        }
        for candidate in &ctx.tool.module_candidates {
            let avail = ctx
                .runner
                .run(&CommandSpec::shell(format!(
                    "{MODULE_INIT} module avail {candidate} 2>&1"
                )))
                .context("module avail")?;
            let Some(module) = find_module(&avail.stdout, candidate) else {
                continue;
            };
            let load = ctx
                .runner
                .run(&CommandSpec::shell(format!(
                    "{MODULE_INIT} module load {module} >/dev/null 2>&1 && command -v {}",
                    ctx.tool.binary
                )))
                .context("module load")?;
            if load.success() {
                if let Some(path) = load.stdout.lines().map(str::trim).rfind(|l| !l.is_empty()) {
                    return Ok(PathBuf::from(path));
                }
            }
            tracing::debug!(module = %module, "module loaded but did not provide the binary");
        }
        bail!(
            "no module among [{}] provides {}",
            ctx.tool.module_candidates.join(", "),
            ctx.tool.binary
        )
    }
}

/// First module in `module avail` output whose name starts with `candidate`,
/// with Lmod markers such as `(D)` / `(default)` stripped.
fn find_module(output: &str, candidate: &str) -> Option<String> {
    output
        .split_whitespace()
        .map(|tok| tok.trim_end_matches("(default)").trim_end_matches("(D)"))
        .find(|tok| tok.starts_with(candidate) && is_safe_token(tok))
        .map(str::to_string)
}

fn is_safe_token(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/' | '+'))
}

/// Install through the already-resolved environment manager into its base
/// environment (`conda install --name base -c conda-forge`), never into
/// whichever environment happens to be active.
pub struct ManagerInstall;

impl ResolveStrategy for ManagerInstall {
    fn name(&self) -> &'static str {
        "manager-install"
    }

    fn attempt(&self, ctx: &ResolveContext<'_>) -> Result<PathBuf> {
        let Some(manager) = ctx.manager else {
            bail!("no environment manager available");
        };
        let cmd = CommandSpec::new(manager).args([
            "install",
            "--yes",
            "--name",
            "base",
            "-c",
            "conda-forge",
            ctx.tool.package.as_str(),
        ]);
        let out = ctx.runner.run(&cmd).context("spawn environment manager")?;
        if !out.success() {
            bail!("`{}` failed: {}", cmd, out.stderr.trim());
        }
        if let Some(p) = ctx.runner.lookup(&ctx.tool.binary) {
            return Ok(p);
        }
        if let Some(sibling) = manager.parent().map(|d| d.join(&ctx.tool.binary)) {
            if sibling.is_file() {
                return Ok(sibling);
            }
        }
        bail!("installed {} but {} is still not reachable", ctx.tool.package, ctx.tool.binary)
    }
}

/// `pip install --user <package>`; the binary lands in `$HOME/.local/bin`.
pub struct UserInstall;

impl ResolveStrategy for UserInstall {
    fn name(&self) -> &'static str {
        "pip-user"
    }

    fn attempt(&self, ctx: &ResolveContext<'_>) -> Result<PathBuf> {
        let Some(pip) = ["pip", "pip3"].iter().find_map(|p| ctx.runner.lookup(p)) else {
            bail!("pip not found on PATH");
        };
        let cmd = CommandSpec::new(&pip).args(["install", "--user", ctx.tool.package.as_str()]);
        let out = ctx.runner.run(&cmd).context("spawn pip")?;
        if !out.success() {
            bail!("`{}` failed: {}", cmd, out.stderr.trim());
        }
        if let Some(home) = ctx.home {
            let user_bin = home.join(".local").join("bin").join(&ctx.tool.binary);
            if user_bin.is_file() {
                return Ok(user_bin);
            }
        }
        if let Some(p) = ctx.runner.lookup(&ctx.tool.binary) {
            return Ok(p);
        }
        bail!("pip --user succeeded but {} is not reachable", ctx.tool.binary)
    }
}

/// Create a private virtualenv under the cache dir and install the tool into it.
pub struct VirtualenvInstall;

impl VirtualenvInstall {
    pub fn venv_dir(cache_dir: &Path, binary: &str) -> PathBuf {
        cache_dir.join("tools").join(format!("{binary}-venv"))
    }
}

impl ResolveStrategy for VirtualenvInstall {
    fn name(&self) -> &'static str {
        "virtualenv"
    }

    fn attempt(&self, ctx: &ResolveContext<'_>) -> Result<PathBuf> {
        let venv = Self::venv_dir(ctx.cache_dir, &ctx.tool.binary);
        if let Some(existing) = venv_binary(&venv, &ctx.tool.binary) {
            return Ok(existing);
        }

        let Some(python) = ["python3", "python"].iter().find_map(|p| ctx.runner.lookup(p)) else {
            bail!("python3 or python not found on PATH");
        };
        if let Some(parent) = venv.parent() {
            std::fs::create_dir_all(parent).context("create tool cache dir")?;
        }
        let create = CommandSpec::new(&python).arg("-m").arg("venv").arg(&venv);
        let out = ctx.runner.run(&create).context("spawn python")?;
        if !out.success() {
            bail!("venv failed: {}", out.stderr.trim());
        }

        let pip_bin = venv.join("bin").join("pip");
        let pip_scripts = venv.join("Scripts").join("pip.exe");
        let install = if pip_bin.exists() {
            CommandSpec::new(&pip_bin).arg("install")
        } else if pip_scripts.exists() {
            CommandSpec::new(&pip_scripts).arg("install")
        } else {
            CommandSpec::new(venv.join("bin").join("python")).args(["-m", "pip", "install"])
        };
        let install = install.arg(&ctx.tool.package);
        let out = ctx.runner.run(&install).context("spawn venv pip")?;
        if !out.success() {
            bail!("pip install in venv failed: {}", out.stderr.trim());
        }

        match venv_binary(&venv, &ctx.tool.binary) {
            Some(p) => Ok(p),
            None => bail!("{} missing from {} after install", ctx.tool.binary, venv.display()),
        }
    }
}

fn venv_binary(venv: &Path, binary: &str) -> Option<PathBuf> {
    [
        venv.join("bin").join(binary),
        venv.join("Scripts").join(format!("{binary}.exe")),
    ]
    .into_iter()
    .find(|p| p.is_file())
}
