//! Environment variable keys and their alias chains.
//!
//! Primary keys use the `ENVKIT_*` prefix.

/// Observability and logging
pub mod observability {
    pub const ENVKIT_QUIET: &str = "ENVKIT_QUIET";
    pub const QUIET_ALIASES: &[&str] = &[];

    pub const ENVKIT_LOG_LEVEL: &str = "ENVKIT_LOG_LEVEL";
    pub const LOG_LEVEL_ALIASES: &[&str] = &[];

    pub const ENVKIT_LOG_JSON: &str = "ENVKIT_LOG_JSON";
    pub const LOG_JSON_ALIASES: &[&str] = &[];

    /// JSONL file receiving one record per subprocess launch/completion.
    pub const ENVKIT_AUDIT_LOG: &str = "ENVKIT_AUDIT_LOG";
}

/// Cache directory (tool virtualenvs live under `<cache>/tools`)
pub mod cache {
    pub const ENVKIT_CACHE_DIR: &str = "ENVKIT_CACHE_DIR";
    pub const CACHE_DIR_ALIASES: &[&str] = &[];
}

/// Environment provisioning
pub mod provision {
    /// Environment-manager binary name (conda, mamba, micromamba).
    pub const ENVKIT_ENV_MANAGER: &str = "ENVKIT_ENV_MANAGER";
    pub const ENV_MANAGER_DEFAULT: &str = "conda";

    /// Companion lock utility.
    pub const ENVKIT_LOCK_TOOL: &str = "ENVKIT_LOCK_TOOL";
    pub const LOCK_TOOL_DEFAULT: &str = "conda-lock";

    /// Project slug used to derive the environment name.
    pub const ENVKIT_PROJECT_SLUG: &str = "ENVKIT_PROJECT_SLUG";

    /// Forces the resolved environment prefix. Only set by test harnesses.
    pub const ENVKIT_ENV_PATH: &str = "ENVKIT_ENV_PATH";

    /// Set to 1 by shell wrappers that source the tool instead of executing it.
    pub const ENVKIT_SOURCED: &str = "ENVKIT_SOURCED";

    /// Marker of the currently active conda environment.
    pub const CONDA_PREFIX: &str = "CONDA_PREFIX";

    /// Present when an environment-module system (Lmod / Tcl modules) is initialised.
    pub const MODULESHOME: &str = "MODULESHOME";
}

/// Determinism switches written by the seed synchronizer
pub mod seed {
    pub const TF_DETERMINISTIC_OPS: &str = "TF_DETERMINISTIC_OPS";
    pub const TF_DISABLE_SEGMENT_REDUCTION_OP_DETERMINISM_EXCEPT_WEB_LAYER: &str =
        "TF_DISABLE_SEGMENT_REDUCTION_OP_DETERMINISM_EXCEPT_WEB_LAYER";
}
