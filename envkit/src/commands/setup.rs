//! `envkit setup` / `setup-env`: provision the project's conda environment.

use anyhow::{Context, Result};
use std::io;

use envkit_core::config::ProvisionConfig;
use envkit_provision::deps::Variant;
use envkit_provision::{Provisioner, SetupOptions, SystemRunner};

use crate::cli::SetupArgs;

impl SetupArgs {
    pub fn to_options(&self) -> Result<SetupOptions> {
        let project_root = match self.project_dir {
            Some(ref dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to read current directory")?,
        };
        Ok(SetupOptions {
            project_root,
            variant: if self.dev && !self.prod {
                Variant::Dev
            } else {
                Variant::Prod
            },
            no_tests: self.no_tests,
            skip_conda: self.skip_conda,
            skip_pre_commit: self.skip_pre_commit,
            skip_lock: self.skip_lock,
            clean_install: self.clean_install,
            force: self.force,
            use_lock: self.use_lock,
            skip_checks: self.skip_checks,
            run_setup: self.run_setup,
            verbose: self.verbose,
            prefix: self.prefix.clone(),
            slug: self.slug.clone(),
        })
    }
}

pub fn cmd_setup(args: &SetupArgs) -> Result<()> {
    let opts = args.to_options()?;
    let config = ProvisionConfig::from_env();
    let runner = SystemRunner;
    let provisioner = Provisioner::new(&runner, config);

    let stderr = io::stderr();
    let mut out = stderr.lock();
    let report = provisioner
        .run(&opts, &mut out)
        .context("Environment setup failed")?;

    if !report.warnings.is_empty() {
        tracing::warn!(count = report.warnings.len(), "setup finished with warnings");
    }
    Ok(())
}
