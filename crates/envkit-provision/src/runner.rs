//! Subprocess seam. The provisioner never touches `std::process` directly;
//! it builds [`CommandSpec`]s and hands them to a [`CommandRunner`].

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use envkit_core::observability;

use crate::error::ProvisionError;

/// A program invocation: program, arguments, optional working directory.
///
/// Arguments keep their OS encoding; only `Display` renders them lossily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// `bash -c <script>`
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("bash").arg("-c").arg(script.into())
    }

    /// Lossy UTF-8 view of the program, for logs and audit records.
    pub fn program_display(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    pub fn args_display(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program.to_string_lossy())?;
        for a in self.args_display() {
            if a.is_empty() || a.contains(char::is_whitespace) {
                write!(f, " '{}'", a)?;
            } else {
                write!(f, " {}", a)?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// None when the process was terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Extension point for executing programs and locating binaries.
///
/// [`SystemRunner`] spawns real processes; tests substitute a scripted runner.
pub trait CommandRunner {
    /// Run to completion, capturing stdout/stderr. `Err` only when the process
    /// could not be spawned at all.
    fn run(&self, cmd: &CommandSpec) -> io::Result<CommandOutput>;

    /// Locate `binary` on the search path.
    fn lookup(&self, binary: &str) -> Option<PathBuf>;
}

/// Run and turn a non-zero exit (or spawn failure) into [`ProvisionError::CommandFailed`].
pub fn run_checked(
    runner: &dyn CommandRunner,
    cmd: &CommandSpec,
) -> Result<CommandOutput, ProvisionError> {
    match runner.run(cmd) {
        Ok(out) if out.success() => Ok(out),
        Ok(out) => Err(ProvisionError::CommandFailed {
            command: cmd.to_string(),
            code: out.code,
            stderr: out.stderr.trim().to_string(),
        }),
        Err(e) => Err(ProvisionError::CommandFailed {
            command: cmd.to_string(),
            code: None,
            stderr: e.to_string(),
        }),
    }
}

/// Spawns real processes and resolves binaries through `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &CommandSpec) -> io::Result<CommandOutput> {
        let program = cmd.program_display();
        observability::audit_command_invoked(&program, &cmd.args_display(), cmd.cwd.as_deref());
        tracing::debug!(command = %cmd, "spawn");

        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args);
        if let Some(ref dir) = cmd.cwd {
            command.current_dir(dir);
        }
        let started = Instant::now();
        let out = command.output()?;
        let elapsed = started.elapsed().as_millis() as u64;

        observability::audit_command_completed(&program, out.status.code(), elapsed);
        Ok(CommandOutput {
            code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
        })
    }

    fn lookup(&self, binary: &str) -> Option<PathBuf> {
        which::which(binary).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quotes_whitespace_args() {
        let cmd = CommandSpec::new("conda")
            .args(["run", "-p", "/envs/my env"])
            .arg("pytest");
        assert_eq!(cmd.to_string(), "conda run -p '/envs/my env' pytest");
    }

    #[test]
    fn test_shell_builder() {
        let cmd = CommandSpec::shell("module avail conda");
        assert_eq!(cmd.program, "bash");
        assert_eq!(cmd.args, vec!["-c", "module avail conda"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_paths_pass_through_unchanged() {
        use std::os::unix::ffi::OsStrExt;

        let prefix = Path::new(OsStr::from_bytes(b"/envs/caf\xe9"));
        let cmd = CommandSpec::new("conda").args(["run", "-p"]).arg(prefix);
        assert_eq!(cmd.args[2].as_bytes(), b"/envs/caf\xe9");
        assert_eq!(cmd.to_string(), "conda run -p /envs/caf\u{FFFD}");

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join(OsStr::from_bytes(b"out\xff"));
        let out = SystemRunner
            .run(&CommandSpec::new("touch").arg(&target))
            .unwrap();
        assert!(out.success());
        assert!(target.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_exit_code() {
        let out = SystemRunner
            .run(&CommandSpec::shell("echo hello; echo oops >&2; exit 3"))
            .unwrap();
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
        assert!(!out.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_checked_maps_failure() {
        let err = run_checked(&SystemRunner, &CommandSpec::shell("exit 7")).unwrap_err();
        match err {
            ProvisionError::CommandFailed { code, .. } => assert_eq!(code, Some(7)),
            other => panic!("unexpected error: {other}"),
        }
    }
}
