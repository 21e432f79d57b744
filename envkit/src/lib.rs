//! envkit CLI library, shared by the `envkit` and `setup-env` binaries.

mod cli;
mod command_registry;
mod commands;
mod dispatch;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, SetupEnvCli};
use command_registry::CommandRegistry;
use envkit_core::observability::{init_tracing, TracingMode};

fn tracing_mode(verbose: bool) -> TracingMode {
    if verbose {
        TracingMode::Verbose
    } else {
        TracingMode::Default
    }
}

/// `envkit <command>`: parse args and dispatch to the registered handler.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let verbose = matches!(cli.command, Commands::Setup(ref args) if args.verbose);
    init_tracing(tracing_mode(verbose));

    let mut registry = CommandRegistry::new();
    dispatch::register_all(&mut registry);
    registry.dispatch(&cli.command)
}

/// `setup-env [FLAGS]`: the setup command without a subcommand.
pub fn run_setup_cli() -> Result<()> {
    let cli = SetupEnvCli::parse();
    init_tracing(tracing_mode(cli.args.verbose));
    commands::setup::cmd_setup(&cli.args)
}
