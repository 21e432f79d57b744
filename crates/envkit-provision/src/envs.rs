//! Environment queries: where the named environment lives, whether it
//! exists right now, and whether it is the one active in the calling shell.

use std::path::{Path, PathBuf};

use crate::runner::{CommandRunner, CommandSpec};

/// The environment the provisioner will create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvTarget {
    pub name: String,
    pub prefix: PathBuf,
    /// A directory exists at `prefix` (checked at resolve time, never cached)
    pub exists: bool,
}

/// Inputs for locating the prefix, highest priority first.
#[derive(Debug, Default, Clone)]
pub struct TargetHints<'a> {
    /// `--prefix`
    pub explicit: Option<&'a Path>,
    /// `ENVKIT_ENV_PATH`
    pub env_override: Option<&'a Path>,
    /// Fallback parent for `<root>/.conda/<name>`
    pub project_root: Option<&'a Path>,
}

/// Environment prefixes listed by `<manager> info --envs`.
///
/// Lines look like `name  *  /path` or `/path`; comment lines start with `#`.
pub fn list_envs(runner: &dyn CommandRunner, manager: &Path) -> Vec<PathBuf> {
    let cmd = CommandSpec::new(manager).args(["info", "--envs"]);
    match runner.run(&cmd) {
        Ok(out) if out.success() => parse_env_list(&out.stdout),
        Ok(out) => {
            tracing::debug!(code = ?out.code, "listing environments failed");
            Vec::new()
        }
        Err(e) => {
            tracing::debug!(error = %e, "listing environments failed");
            Vec::new()
        }
    }
}

fn parse_env_list(stdout: &str) -> Vec<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| {
            l.split_whitespace()
                .map(Path::new)
                .find(|p| p.is_absolute())
                .map(Path::to_path_buf)
        })
        .collect()
}

fn manager_base(runner: &dyn CommandRunner, manager: &Path) -> Option<PathBuf> {
    let out = runner
        .run(&CommandSpec::new(manager).args(["info", "--base"]))
        .ok()?;
    if !out.success() {
        return None;
    }
    let base = out.stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    Some(PathBuf::from(base))
}

/// Locate `name`'s prefix and check whether it exists.
///
/// Order: explicit prefix, override variable, an entry of the manager's
/// environment list whose last path component is `name`,
/// `<base>/envs/<name>`, `<root>/.conda/<name>`.
pub fn resolve_target(
    runner: &dyn CommandRunner,
    manager: Option<&Path>,
    name: &str,
    hints: &TargetHints<'_>,
) -> EnvTarget {
    let prefix = hints
        .explicit
        .or(hints.env_override)
        .map(Path::to_path_buf)
        .or_else(|| {
            let manager = manager?;
            list_envs(runner, manager)
                .into_iter()
                .find(|p| p.file_name().is_some_and(|n| n == name))
                .or_else(|| manager_base(runner, manager).map(|b| b.join("envs").join(name)))
        })
        .unwrap_or_else(|| {
            hints
                .project_root
                .map(|r| r.join(".conda").join(name))
                .unwrap_or_else(|| PathBuf::from(".conda").join(name))
        });
    let exists = prefix.is_dir();
    tracing::debug!(name, prefix = %prefix.display(), exists, "environment resolved");
    EnvTarget {
        name: name.to_string(),
        prefix,
        exists,
    }
}

/// The active-environment marker points at `prefix`.
pub fn is_active(active: Option<&Path>, prefix: &Path) -> bool {
    let Some(active) = active else {
        return false;
    };
    if active.as_os_str().is_empty() {
        return false;
    }
    match (active.canonicalize(), prefix.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => normalize(active) == normalize(prefix),
    }
}

fn normalize(p: &Path) -> PathBuf {
    p.components().collect()
}
