//! Project parameters: validation of the values a new project is generated
//! from, and derivation of the environment name.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// Suffix appended to the slug for the development environment.
pub const DEV_SUFFIX: &str = "-dev";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectError {
    #[error("Project slug '{0}' must start with a letter and contain only letters, numbers, and underscores")]
    InvalidSlug(String),

    #[error("Python version '{0}' must be in format X.Y or X.Y.Z")]
    InvalidPythonVersion(String),

    #[error("Invalid email format: '{0}'")]
    InvalidEmail(String),

    #[error("Directory {0} already exists")]
    TargetExists(String),
}

fn slug_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]*$").expect("valid regex"))
}

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\d+(\.\d+)?$").expect("valid regex"))
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"))
}

pub fn validate_project_slug(slug: &str) -> Result<(), ProjectError> {
    if slug_re().is_match(slug) {
        Ok(())
    } else {
        Err(ProjectError::InvalidSlug(slug.to_string()))
    }
}

pub fn validate_python_version(version: &str) -> Result<(), ProjectError> {
    if version_re().is_match(version) {
        Ok(())
    } else {
        Err(ProjectError::InvalidPythonVersion(version.to_string()))
    }
}

pub fn validate_email(email: &str) -> Result<(), ProjectError> {
    if email_re().is_match(email) {
        Ok(())
    } else {
        Err(ProjectError::InvalidEmail(email.to_string()))
    }
}

/// Parameters a project skeleton is generated from.
#[derive(Debug, Clone)]
pub struct ProjectParams {
    pub slug: String,
    pub python_version: String,
    pub author_email: String,
}

impl ProjectParams {
    /// Validate every field, then check that `<parent>/<slug>` does not exist yet.
    /// Fails on the first violation; nothing is created.
    pub fn validate(&self, parent: &Path) -> Result<(), ProjectError> {
        validate_project_slug(&self.slug)?;
        validate_python_version(&self.python_version)?;
        validate_email(&self.author_email)?;
        if parent.join(&self.slug).exists() {
            return Err(ProjectError::TargetExists(self.slug.clone()));
        }
        Ok(())
    }
}

/// `<slug>` for the production environment, `<slug>-dev` for development.
pub fn env_name(slug: &str, dev: bool) -> String {
    if dev {
        format!("{slug}{DEV_SUFFIX}")
    } else {
        slug.to_string()
    }
}
