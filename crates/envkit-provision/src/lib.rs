//! Environment provisioning: resolve an environment-manager binary through an
//! ordered list of fallback strategies, then create or update a named
//! environment from a lock file or a declarative dependency file.
//!
//! Every subprocess goes through [`runner::CommandRunner`], so the whole state
//! machine can be driven by a scripted runner in tests.

pub mod clean;
pub mod deps;
pub mod envs;
pub mod error;
pub mod runner;
pub mod setup;
pub mod strategy;
pub mod tool;

#[cfg(test)]
pub(crate) mod testing;

pub use error::ProvisionError;
pub use runner::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use setup::{Provisioner, SetupOptions, SetupReport};
