use std::path::PathBuf;
use thiserror::Error;

/// Terminal provisioning failures. Strategy-level failures inside a fallback
/// chain are not errors; they are recorded as attempts and the chain moves on.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Dependency file not found: {0} (looked in the project root and setup/)")]
    MissingDependencyFile(String),

    #[error("Invalid dependency file {path}: {reason}")]
    InvalidDependencyFile { path: PathBuf, reason: String },

    #[error("Required tool '{0}' not found on PATH (pass --skip-checks to continue anyway)")]
    MissingTool(String),

    #[error("Target environment {0} is currently active. Run `conda deactivate` first or pass --skip-checks")]
    EnvironmentActive(PathBuf),

    #[error("Could not make '{tool}' available; tried: {}", .attempts.join("; "))]
    ResolutionExhausted { tool: String, attempts: Vec<String> },

    #[error("Command failed ({}): {command}\n{stderr}", code_label(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Clean install cancelled")]
    CleanInstallCancelled,

    #[error(transparent)]
    InvalidProject(#[from] envkit_core::project::ProjectError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn code_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "terminated by signal".to_string(),
    }
}
