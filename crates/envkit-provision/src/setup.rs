//! The setup state machine:
//!
//! `Start → ToolResolved → EnvResolved → ActiveCheck → [Clean] → CreateOrUpdate
//!  → LockToolEnsure → PostHooks → Done`
//!
//! Any failure before `PostHooks` is terminal. Lock regeneration, pre-commit
//! and the test run only warn.

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use envkit_core::config::ProvisionConfig;
use envkit_core::observability;
use envkit_core::project::{env_name, validate_project_slug};

use crate::clean::{self, format_size, CleanReport};
use crate::deps::{self, DependencySource, EnvironmentFile, Variant};
use crate::envs::{self, EnvTarget, TargetHints};
use crate::error::ProvisionError;
use crate::runner::{run_checked, CommandOutput, CommandRunner, CommandSpec};
use crate::strategy::{ResolveContext, ToolSpec};
use crate::tool::{env_manager_chain, lock_tool_chain};

pub const PRE_COMMIT_CONFIG: &str = ".pre-commit-config.yaml";

/// Auxiliary scripts under `setup/`, run inside the environment when present.
pub const POST_SCRIPTS: &[&str] = &["paths.sh", "manifest.sh"];

/// One run's switches. Mirrors the CLI flags.
#[derive(Debug, Clone)]
pub struct SetupOptions {
    pub project_root: PathBuf,
    pub variant: Variant,
    pub no_tests: bool,
    pub skip_conda: bool,
    pub skip_pre_commit: bool,
    pub skip_lock: bool,
    pub clean_install: bool,
    pub force: bool,
    pub use_lock: bool,
    pub skip_checks: bool,
    pub run_setup: bool,
    pub verbose: bool,
    /// Explicit environment prefix
    pub prefix: Option<PathBuf>,
    /// Project slug; the environment is named `<slug>` or `<slug>-dev`
    pub slug: Option<String>,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            variant: Variant::Prod,
            no_tests: false,
            skip_conda: false,
            skip_pre_commit: false,
            skip_lock: false,
            clean_install: false,
            force: false,
            use_lock: false,
            skip_checks: false,
            run_setup: false,
            verbose: false,
            prefix: None,
            slug: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    ToolResolved,
    EnvResolved,
    ActiveCheck,
    Clean,
    CreateOrUpdate,
    LockToolEnsure,
    PostHooks,
    Done,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Start => "start",
            Phase::ToolResolved => "tool_resolved",
            Phase::EnvResolved => "env_resolved",
            Phase::ActiveCheck => "active_check",
            Phase::Clean => "clean",
            Phase::CreateOrUpdate => "create_or_update",
            Phase::LockToolEnsure => "lock_tool_ensure",
            Phase::PostHooks => "post_hooks",
            Phase::Done => "done",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvAction {
    Created,
    Updated,
}

/// What a run did.
#[derive(Debug, Clone, Default)]
pub struct SetupReport {
    /// Sourced without `--run-setup`: nothing ran
    pub skipped: bool,
    pub phases: Vec<Phase>,
    pub env_file: Option<PathBuf>,
    pub source: Option<DependencySource>,
    pub manager: Option<PathBuf>,
    pub lock_tool: Option<PathBuf>,
    pub target: Option<EnvTarget>,
    pub action: Option<EnvAction>,
    pub cleaned: Option<CleanReport>,
    pub warnings: Vec<String>,
}

type Confirm<'a> = Box<dyn Fn(&str) -> io::Result<bool> + 'a>;

pub struct Provisioner<'a> {
    runner: &'a dyn CommandRunner,
    config: ProvisionConfig,
    confirm: Confirm<'a>,
}

impl<'a> Provisioner<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: ProvisionConfig) -> Self {
        Self {
            runner,
            config,
            confirm: Box::new(prompt_yes_no),
        }
    }

    /// Replace the interactive `[y/N]` prompt used before a clean install.
    pub fn with_confirm<F>(mut self, confirm: F) -> Self
    where
        F: Fn(&str) -> io::Result<bool> + 'a,
    {
        self.confirm = Box::new(confirm);
        self
    }

    pub fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    /// Run the full state machine, writing progress lines to `out`.
    pub fn run(
        &self,
        opts: &SetupOptions,
        out: &mut dyn Write,
    ) -> Result<SetupReport, ProvisionError> {
        let mut report = SetupReport::default();

        if self.config.sourced && !opts.run_setup {
            writeln!(
                out,
                "Loaded in sourced mode; pass --run-setup to provision the environment."
            )?;
            report.skipped = true;
            return Ok(report);
        }

        let root = opts.project_root.as_path();
        enter(&mut report, Phase::Start, &root.display().to_string());

        let platform = deps::current_platform();
        let (env_file, source) = deps::select_source(root, opts.variant, opts.use_lock, &platform)?;
        writeln!(
            out,
            "Using {} environment file: {}",
            opts.variant.label(),
            env_file.display()
        )?;
        let parsed = EnvironmentFile::load(&env_file)?;
        tracing::debug!(
            name = ?parsed.name,
            packages = parsed.package_count(),
            "environment file parsed"
        );
        if let DependencySource::Lock(ref lock) = source {
            writeln!(out, "Using lock file: {}", lock.display())?;
        }
        report.env_file = Some(env_file.clone());
        report.source = Some(source.clone());

        self.preflight(opts, root, out, &mut report)?;

        let env_ctx = if opts.skip_conda {
            writeln!(out, "Skipping conda environment setup (--skip-conda)")?;
            None
        } else {
            Some(self.provision_env(opts, root, &env_file, &source, &platform, out, &mut report)?)
        };

        enter(&mut report, Phase::PostHooks, "");
        self.post_hooks(opts, root, env_ctx.as_ref(), out, &mut report)?;

        enter(&mut report, Phase::Done, "");
        writeln!(out, "Environment setup completed.")?;
        if let Some(ctx) = env_ctx {
            let prefix = ctx.prefix.display();
            let manager = &self.config.env_manager;
            writeln!(out)?;
            writeln!(out, "To run a command inside the environment:")?;
            writeln!(out, "  {manager} run -p {prefix} <command>")?;
            writeln!(out, "To activate it in your shell:")?;
            writeln!(out, "  {manager} activate {prefix}")?;
        }
        Ok(report)
    }

    fn preflight(
        &self,
        opts: &SetupOptions,
        root: &Path,
        out: &mut dyn Write,
        report: &mut SetupReport,
    ) -> Result<(), ProvisionError> {
        let needs_git = !opts.skip_pre_commit && root.join(PRE_COMMIT_CONFIG).is_file();
        if needs_git && self.runner.lookup("git").is_none() {
            if !opts.skip_checks {
                return Err(ProvisionError::MissingTool("git".into()));
            }
            warn(out, report, "git not found on PATH; continuing (--skip-checks)")?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn provision_env(
        &self,
        opts: &SetupOptions,
        root: &Path,
        env_file: &Path,
        source: &DependencySource,
        platform: &str,
        out: &mut dyn Write,
        report: &mut SetupReport,
    ) -> Result<EnvContext, ProvisionError> {
        let home = self.config.home_dir.as_deref();
        let manager_spec = ToolSpec::env_manager(&self.config.env_manager, home);
        let manager = env_manager_chain().resolve(&ResolveContext {
            runner: self.runner,
            tool: &manager_spec,
            home,
            cache_dir: &self.config.cache_dir,
            module_home: self.config.module_home.as_deref(),
            manager: None,
        })?;
        writeln!(
            out,
            "Using {} at {} ({})",
            manager_spec.binary,
            manager.path.display(),
            manager.strategy
        )?;
        report.manager = Some(manager.path.clone());
        enter(report, Phase::ToolResolved, manager.strategy);

        let name = env_name(&self.slug(opts, root)?, opts.variant == Variant::Dev);
        let mut target = envs::resolve_target(
            self.runner,
            Some(&manager.path),
            &name,
            &TargetHints {
                explicit: opts.prefix.as_deref(),
                env_override: self.config.env_path_override.as_deref(),
                project_root: Some(root),
            },
        );
        enter(
            report,
            Phase::EnvResolved,
            if target.exists { "existing" } else { "absent" },
        );

        enter(report, Phase::ActiveCheck, &target.prefix.display().to_string());
        if envs::is_active(self.config.active_prefix.as_deref(), &target.prefix) {
            if !opts.skip_checks {
                return Err(ProvisionError::EnvironmentActive(target.prefix.clone()));
            }
            warn(
                out,
                report,
                &format!(
                    "environment {} is active; continuing (--skip-checks)",
                    target.prefix.display()
                ),
            )?;
        }

        if opts.clean_install {
            enter(report, Phase::Clean, &target.prefix.display().to_string());
            if target.exists && !opts.force {
                let question = format!("Remove existing environment at {}?", target.prefix.display());
                if !(self.confirm)(&question)? {
                    return Err(ProvisionError::CleanInstallCancelled);
                }
            }
            writeln!(
                out,
                "Removing existing environment at {} (--clean-install)",
                target.prefix.display()
            )?;
            let cleaned = clean::clean_install(&target.prefix)?;
            writeln!(
                out,
                "Removed {} path(s), freed {}",
                cleaned.removed.len(),
                format_size(cleaned.freed_bytes)
            )?;
            report.cleaned = Some(cleaned);
            target.exists = false;
        }

        enter(report, Phase::CreateOrUpdate, &source.to_string());
        let prefix = target.prefix.as_path();
        let (cmd, action) = match (source, target.exists) {
            (DependencySource::Lock(lock), true) => {
                writeln!(
                    out,
                    "Updating existing conda environment at {} from lock file",
                    prefix.display()
                )?;
                let cmd = CommandSpec::new(&manager.path)
                    .args(["install", "--yes", "--prefix"])
                    .arg(prefix)
                    .arg("--file")
                    .arg(lock);
                (cmd, EnvAction::Updated)
            }
            (DependencySource::Lock(lock), false) => {
                writeln!(out, "Creating conda environment at {} from lock file", prefix.display())?;
                let cmd = CommandSpec::new(&manager.path)
                    .args(["create", "--yes", "--prefix"])
                    .arg(prefix)
                    .arg("--file")
                    .arg(lock);
                (cmd, EnvAction::Created)
            }
            (DependencySource::File(file), true) => {
                writeln!(out, "Updating existing conda environment at {}", prefix.display())?;
                let cmd = CommandSpec::new(&manager.path)
                    .args(["env", "update", "--prefix"])
                    .arg(prefix)
                    .arg("--file")
                    .arg(file);
                (cmd, EnvAction::Updated)
            }
            (DependencySource::File(file), false) => {
                writeln!(out, "Creating conda environment at {}", prefix.display())?;
                let cmd = CommandSpec::new(&manager.path)
                    .args(["env", "create", "--prefix"])
                    .arg(prefix)
                    .arg("--file")
                    .arg(file);
                (cmd, EnvAction::Created)
            }
        };
        self.run_step(&cmd, opts.verbose, out)?;
        report.action = Some(action);

        enter(report, Phase::LockToolEnsure, "");
        if opts.skip_lock {
            writeln!(out, "Skipping lock tool (--skip-lock)")?;
        } else {
            self.ensure_lock_tool(root, env_file, source, platform, &manager.path, opts, out, report)?;
        }

        report.target = Some(target.clone());
        Ok(EnvContext {
            manager: manager.path,
            prefix: target.prefix,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn ensure_lock_tool(
        &self,
        root: &Path,
        env_file: &Path,
        source: &DependencySource,
        platform: &str,
        manager: &Path,
        opts: &SetupOptions,
        out: &mut dyn Write,
        report: &mut SetupReport,
    ) -> Result<(), ProvisionError> {
        let home = self.config.home_dir.as_deref();
        let spec = ToolSpec::lock_tool(&self.config.lock_tool);
        let lock_tool = lock_tool_chain().resolve(&ResolveContext {
            runner: self.runner,
            tool: &spec,
            home,
            cache_dir: &self.config.cache_dir,
            module_home: self.config.module_home.as_deref(),
            manager: Some(manager),
        })?;
        writeln!(
            out,
            "Using {} at {} ({})",
            spec.binary,
            lock_tool.path.display(),
            lock_tool.strategy
        )?;
        report.lock_tool = Some(lock_tool.path.clone());

        if source.is_lock() {
            return Ok(());
        }
        let lock_name = deps::lock_file_name(platform);
        let cmd = CommandSpec::new(&lock_tool.path)
            .args(["lock", "--file"])
            .arg(env_file)
            .args(["--platform", platform, "--kind", "explicit"])
            .args(["--filename-template", "conda-{platform}.lock"])
            .current_dir(root);
        match self.run_step(&cmd, opts.verbose, out) {
            Ok(_) => writeln!(out, "Regenerated {lock_name}")?,
            Err(e) => warn(out, report, &format!("lock file regeneration failed: {e}"))?,
        }
        Ok(())
    }

    fn post_hooks(
        &self,
        opts: &SetupOptions,
        root: &Path,
        env: Option<&EnvContext>,
        out: &mut dyn Write,
        report: &mut SetupReport,
    ) -> Result<(), ProvisionError> {
        if !opts.skip_pre_commit && root.join(PRE_COMMIT_CONFIG).is_file() {
            writeln!(out, "Installing pre-commit hooks")?;
            let cmd = in_env(env, &["pre-commit", "install"]).current_dir(root);
            if let Err(e) = self.run_step(&cmd, opts.verbose, out) {
                warn(out, report, &format!("pre-commit install failed: {e}"))?;
            }
        }

        if !opts.no_tests && root.join("tests").is_dir() {
            writeln!(out, "Running tests")?;
            let cmd = in_env(env, &["pytest", "-q", "tests"]).current_dir(root);
            if let Err(e) = self.run_step(&cmd, opts.verbose, out) {
                warn(out, report, &format!("tests failed: {e}"))?;
            }
        }

        for script in POST_SCRIPTS {
            let path = root.join("setup").join(script);
            if !path.is_file() {
                continue;
            }
            let path_arg = path.to_string_lossy();
            let cmd = in_env(env, &["bash", &*path_arg]).current_dir(root);
            if let Err(e) = self.run_step(&cmd, opts.verbose, out) {
                warn(out, report, &format!("{script} failed: {e}"))?;
            }
        }
        Ok(())
    }

    fn slug(&self, opts: &SetupOptions, root: &Path) -> Result<String, ProvisionError> {
        if let Some(slug) = opts.slug.as_ref().or(self.config.project_slug.as_ref()) {
            validate_project_slug(slug)?;
            return Ok(slug.clone());
        }
        let dir = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        Ok(dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "env".to_string()))
    }

    fn run_step(
        &self,
        cmd: &CommandSpec,
        verbose: bool,
        out: &mut dyn Write,
    ) -> Result<CommandOutput, ProvisionError> {
        if verbose {
            writeln!(out, "+ {cmd}")?;
        }
        run_checked(self.runner, cmd)
    }
}

/// Resolved environment the post hooks run inside.
struct EnvContext {
    manager: PathBuf,
    prefix: PathBuf,
}

/// `<manager> run -p <prefix> <argv...>`, or `argv` directly without an environment.
fn in_env(env: Option<&EnvContext>, argv: &[&str]) -> CommandSpec {
    match env {
        Some(ctx) => CommandSpec::new(&ctx.manager)
            .args(["run", "-p"])
            .arg(&ctx.prefix)
            .args(argv),
        None => CommandSpec::new(argv[0]).args(&argv[1..]),
    }
}

fn enter(report: &mut SetupReport, phase: Phase, detail: &str) {
    tracing::info!(phase = %phase, detail, "setup phase");
    observability::audit_phase(phase.as_str(), detail);
    report.phases.push(phase);
}

fn warn(out: &mut dyn Write, report: &mut SetupReport, msg: &str) -> io::Result<()> {
    tracing::warn!("{msg}");
    writeln!(out, "Warning: {msg}")?;
    report.warnings.push(msg.to_string());
    Ok(())
}

fn prompt_yes_no(question: &str) -> io::Result<bool> {
    eprint!("{question} [y/N] ");
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
