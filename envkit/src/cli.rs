use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use envkit_seed::Library;

/// envkit - project environment provisioning and seed synchronization
#[derive(Parser, Debug)]
#[command(name = "envkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or update the project's conda environment
    Setup(SetupArgs),

    /// Seed every available RNG and print the resulting state
    Seed {
        /// Seed value (default: random in [0, 2^32 - 1))
        #[arg(long)]
        seed: Option<u64>,

        /// Restrict seeding to these libraries (repeatable)
        #[arg(long = "library", value_name = "LIB")]
        libraries: Vec<Library>,

        /// Print state as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Validate project parameters before generating a project
    Validate {
        /// Project slug (letters, digits, underscores; starts with a letter)
        #[arg(long)]
        slug: String,

        /// Python version, X.Y or X.Y.Z
        #[arg(long, default_value = "3.11")]
        python_version: String,

        /// Author email
        #[arg(long)]
        email: String,

        /// Directory the project would be created in
        #[arg(long, value_name = "DIR", default_value = ".")]
        parent: PathBuf,
    },
}

impl Commands {
    /// Subcommand name as typed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Setup(_) => "setup",
            Commands::Seed { .. } => "seed",
            Commands::Validate { .. } => "validate",
        }
    }
}

/// `setup-env` flags, shared by `envkit setup`.
#[derive(Parser, Debug, Clone)]
#[command(name = "setup-env")]
#[command(version, about = "Create or update the project's conda environment", long_about = None)]
pub struct SetupEnvCli {
    #[command(flatten)]
    pub args: SetupArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SetupArgs {
    /// Use the development environment file (environment-dev.yml)
    #[arg(long, overrides_with = "prod")]
    pub dev: bool,

    /// Use the base environment file (environment.yml) [default]
    #[arg(long, overrides_with = "dev")]
    pub prod: bool,

    /// Do not run the test suite after setup
    #[arg(long)]
    pub no_tests: bool,

    /// Skip creating/updating the conda environment
    #[arg(long)]
    pub skip_conda: bool,

    /// Do not install pre-commit hooks
    #[arg(long)]
    pub skip_pre_commit: bool,

    /// Do not install the lock tool or regenerate the lock file
    #[arg(long)]
    pub skip_lock: bool,

    /// Remove the existing environment before creating it
    #[arg(long)]
    pub clean_install: bool,

    /// Do not ask for confirmation
    #[arg(long)]
    pub force: bool,

    /// Create the environment from the platform lock file when present
    #[arg(long)]
    pub use_lock: bool,

    /// Downgrade precondition failures (active environment, missing tools) to warnings
    #[arg(long)]
    pub skip_checks: bool,

    /// Run setup even when loaded from a sourcing shell wrapper
    #[arg(long)]
    pub run_setup: bool,

    /// Echo every command and enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Environment prefix (default: resolved from the environment manager)
    #[arg(long, value_name = "DIR")]
    pub prefix: Option<PathBuf>,

    /// Project slug used to name the environment (default: $ENVKIT_PROJECT_SLUG, then the project directory name)
    #[arg(long)]
    pub slug: Option<String>,

    /// Project root containing the environment files (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,
}
