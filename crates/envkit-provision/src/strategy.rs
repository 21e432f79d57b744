//! Ordered fallback chains for making a tool available.
//!
//! A [`FallbackChain`] is a list of named [`ResolveStrategy`]s. Each is tried
//! at most once, in order; the first success wins. A failing strategy is
//! recorded and the chain moves on. Only exhausting every strategy is an error.

use std::path::{Path, PathBuf};

use crate::error::ProvisionError;
use crate::runner::CommandRunner;

/// What to resolve: the binary name plus what installers need to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    /// Executable name, e.g. `conda` or `conda-lock`
    pub binary: String,
    /// Package name handed to installers
    pub package: String,
    /// Module names queried with `module avail`, in order
    pub module_candidates: Vec<String>,
    /// Installation roots probed for `bin/<binary>`
    pub known_prefixes: Vec<PathBuf>,
}

/// Everything a strategy may consult.
pub struct ResolveContext<'a> {
    pub runner: &'a dyn CommandRunner,
    pub tool: &'a ToolSpec,
    pub home: Option<&'a Path>,
    /// Root for tool virtualenvs (`<cache>/tools/...`)
    pub cache_dir: &'a Path,
    /// `$MODULESHOME`, when a module system is initialised
    pub module_home: Option<&'a Path>,
    /// Already-resolved environment manager, for installing through it
    pub manager: Option<&'a Path>,
}

/// One way of making a tool available.
///
/// `attempt` returns the path of a usable binary, or an error describing why
/// this strategy does not apply. Errors never abort the chain.
pub trait ResolveStrategy {
    fn name(&self) -> &'static str;
    fn attempt(&self, ctx: &ResolveContext<'_>) -> anyhow::Result<PathBuf>;
}

/// Outcome of one strategy within a chain run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub strategy: &'static str,
    pub outcome: Result<PathBuf, String>,
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub path: PathBuf,
    pub strategy: &'static str,
    /// Every strategy tried, the successful one last
    pub attempts: Vec<Attempt>,
}

#[derive(Default)]
pub struct FallbackChain {
    strategies: Vec<Box<dyn ResolveStrategy>>,
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<S: ResolveStrategy + 'static>(mut self, strategy: S) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn resolve(&self, ctx: &ResolveContext<'_>) -> Result<Resolved, ProvisionError> {
        let mut attempts = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            match strategy.attempt(ctx) {
                Ok(path) => {
                    tracing::info!(
                        tool = %ctx.tool.binary,
                        strategy = strategy.name(),
                        path = %path.display(),
                        "tool resolved"
                    );
                    attempts.push(Attempt {
                        strategy: strategy.name(),
                        outcome: Ok(path.clone()),
                    });
                    return Ok(Resolved {
                        path,
                        strategy: strategy.name(),
                        attempts,
                    });
                }
                Err(e) => {
                    tracing::debug!(
                        tool = %ctx.tool.binary,
                        strategy = strategy.name(),
                        reason = %e,
                        "strategy failed, trying next"
                    );
                    attempts.push(Attempt {
                        strategy: strategy.name(),
                        outcome: Err(format!("{e:#}")),
                    });
                }
            }
        }
        Err(ProvisionError::ResolutionExhausted {
            tool: ctx.tool.binary.clone(),
            attempts: attempts
                .into_iter()
                .map(|a| match a.outcome {
                    Ok(p) => format!("{}: {}", a.strategy, p.display()),
                    Err(reason) => format!("{}: {}", a.strategy, reason),
                })
                .collect(),
        })
    }
}
