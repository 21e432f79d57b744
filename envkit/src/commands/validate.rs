//! `envkit validate`: check project parameters without creating anything.

use anyhow::{Context, Result};
use std::path::Path;

use envkit_core::project::ProjectParams;

pub fn cmd_validate(slug: &str, python_version: &str, email: &str, parent: &Path) -> Result<()> {
    let params = ProjectParams {
        slug: slug.to_string(),
        python_version: python_version.to_string(),
        author_email: email.to_string(),
    };
    params
        .validate(parent)
        .context("Invalid project parameters")?;
    eprintln!(
        "✓ {} (python {}, {}) can be created in {}",
        params.slug,
        params.python_version,
        params.author_email,
        parent.display()
    );
    Ok(())
}
