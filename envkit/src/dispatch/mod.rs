//! Registers one handler per `Commands` variant.

use crate::cli::Commands;
use crate::command_registry::{unexpected, CommandRegistry};
use crate::commands;

pub fn register_all(reg: &mut CommandRegistry) {
    register_setup(reg);
    register_seed(reg);
    register_validate(reg);
}

fn register_setup(reg: &mut CommandRegistry) {
    reg.register("setup", |cmd| match cmd {
        Commands::Setup(args) => commands::setup::cmd_setup(args),
        other => Err(unexpected("setup", other)),
    });
}

fn register_seed(reg: &mut CommandRegistry) {
    reg.register("seed", |cmd| match cmd {
        Commands::Seed {
            seed,
            libraries,
            json,
        } => commands::seed::cmd_seed(*seed, libraries, *json),
        other => Err(unexpected("seed", other)),
    });
}

fn register_validate(reg: &mut CommandRegistry) {
    reg.register("validate", |cmd| match cmd {
        Commands::Validate {
            slug,
            python_version,
            email,
            parent,
        } => commands::validate::cmd_validate(slug, python_version, email, parent),
        other => Err(unexpected("validate", other)),
    });
}
