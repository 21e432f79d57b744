//! Named command handlers. `dispatch` modules register one handler per
//! subcommand name; `lib.rs` only looks the name up.

use anyhow::{anyhow, Result};
use std::collections::BTreeMap;

use crate::cli::Commands;

pub type CommandHandler = Box<dyn Fn(&Commands) -> Result<()> + Send + Sync>;

#[derive(Default)]
pub struct CommandRegistry {
    handlers: BTreeMap<&'static str, CommandHandler>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler for subcommand `name`. A later registration replaces an earlier one.
    pub fn register<F>(&mut self, name: &'static str, f: F)
    where
        F: Fn(&Commands) -> Result<()> + Send + Sync + 'static,
    {
        if self.handlers.insert(name, Box::new(f)).is_some() {
            tracing::debug!(command = name, "handler replaced");
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    pub fn dispatch(&self, cmd: &Commands) -> Result<()> {
        let name = cmd.name();
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| anyhow!("no handler registered for `{name}`"))?;
        handler(cmd)
    }
}

/// Error for a handler reached with a variant it does not own.
pub fn unexpected(expected: &str, cmd: &Commands) -> anyhow::Error {
    anyhow!("`{expected}` handler received `{}`", cmd.name())
}
