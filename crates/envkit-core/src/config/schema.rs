//! Config structs grouped by concern, loaded from environment variables.

use super::env_keys::{cache as cache_keys, observability as obv_keys, provision as prov_keys};
use super::loader::{env_bool, env_optional, env_or};
use std::path::PathBuf;

/// Observability: quiet, log_level, log_json, audit_log
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub audit_log: Option<String>,
}

impl ObservabilityConfig {
    /// Cached for the lifetime of the process.
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            super::loader::load_dotenv();
            Self::load()
        })
    }

    fn load() -> Self {
        Self {
            quiet: env_bool(obv_keys::ENVKIT_QUIET, obv_keys::QUIET_ALIASES, false),
            log_level: env_or(obv_keys::ENVKIT_LOG_LEVEL, obv_keys::LOG_LEVEL_ALIASES, || {
                "envkit=info".to_string()
            }),
            log_json: env_bool(obv_keys::ENVKIT_LOG_JSON, obv_keys::LOG_JSON_ALIASES, false),
            audit_log: env_optional(obv_keys::ENVKIT_AUDIT_LOG, &[]),
        }
    }
}

/// Cache directory config
#[derive(Debug, Clone)]
pub struct CacheConfig;

impl CacheConfig {
    pub fn cache_dir() -> Option<String> {
        super::loader::load_dotenv();
        env_optional(cache_keys::ENVKIT_CACHE_DIR, cache_keys::CACHE_DIR_ALIASES)
    }

    /// `$ENVKIT_CACHE_DIR`, else the platform cache dir joined with `envkit`,
    /// else `./.cache/envkit`.
    pub fn resolved_cache_dir() -> PathBuf {
        Self::cache_dir()
            .map(PathBuf::from)
            .or_else(|| dirs::cache_dir().map(|d| d.join("envkit")))
            .unwrap_or_else(|| PathBuf::from(".").join(".cache").join("envkit"))
    }
}

/// Environment-provisioning settings that are not CLI flags.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    /// Environment-manager binary name (default `conda`).
    pub env_manager: String,
    /// Lock utility binary name (default `conda-lock`).
    pub lock_tool: String,
    pub project_slug: Option<String>,
    /// Test-harness override for the environment prefix.
    pub env_path_override: Option<PathBuf>,
    /// Currently active environment (`CONDA_PREFIX`).
    pub active_prefix: Option<PathBuf>,
    pub sourced: bool,
    pub module_home: Option<PathBuf>,
    pub home_dir: Option<PathBuf>,
    pub cache_dir: PathBuf,
}

impl ProvisionConfig {
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        Self {
            env_manager: env_or(prov_keys::ENVKIT_ENV_MANAGER, &[], || {
                prov_keys::ENV_MANAGER_DEFAULT.to_string()
            }),
            lock_tool: env_or(prov_keys::ENVKIT_LOCK_TOOL, &[], || {
                prov_keys::LOCK_TOOL_DEFAULT.to_string()
            }),
            project_slug: env_optional(prov_keys::ENVKIT_PROJECT_SLUG, &[]),
            env_path_override: env_optional(prov_keys::ENVKIT_ENV_PATH, &[]).map(PathBuf::from),
            active_prefix: env_optional(prov_keys::CONDA_PREFIX, &[]).map(PathBuf::from),
            sourced: env_bool(prov_keys::ENVKIT_SOURCED, &[], false),
            module_home: env_optional(prov_keys::MODULESHOME, &[]).map(PathBuf::from),
            home_dir: dirs::home_dir(),
            cache_dir: CacheConfig::resolved_cache_dir(),
        }
    }
}

impl Default for ProvisionConfig {
    /// Defaults without consulting the process environment.
    fn default() -> Self {
        Self {
            env_manager: prov_keys::ENV_MANAGER_DEFAULT.to_string(),
            lock_tool: prov_keys::LOCK_TOOL_DEFAULT.to_string(),
            project_slug: None,
            env_path_override: None,
            active_prefix: None,
            sourced: false,
            module_home: None,
            home_dir: None,
            cache_dir: PathBuf::from(".").join(".cache").join("envkit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{remove_env_var, set_env_var};
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_provision_config_reads_overrides() {
        set_env_var(prov_keys::ENVKIT_ENV_MANAGER, "mamba");
        set_env_var(prov_keys::CONDA_PREFIX, "/opt/envs/demo");
        set_env_var(prov_keys::ENVKIT_SOURCED, "1");
        set_env_var(cache_keys::ENVKIT_CACHE_DIR, "/tmp/envkit-cache");

        let cfg = ProvisionConfig::from_env();
        assert_eq!(cfg.env_manager, "mamba");
        assert_eq!(cfg.lock_tool, "conda-lock");
        assert_eq!(cfg.active_prefix, Some(PathBuf::from("/opt/envs/demo")));
        assert!(cfg.sourced);
        assert_eq!(cfg.cache_dir, PathBuf::from("/tmp/envkit-cache"));

        remove_env_var(prov_keys::ENVKIT_ENV_MANAGER);
        remove_env_var(prov_keys::CONDA_PREFIX);
        remove_env_var(prov_keys::ENVKIT_SOURCED);
        remove_env_var(cache_keys::ENVKIT_CACHE_DIR);
    }

    #[test]
    #[serial]
    fn test_observability_defaults() {
        remove_env_var(obv_keys::ENVKIT_QUIET);
        remove_env_var(obv_keys::ENVKIT_LOG_LEVEL);
        remove_env_var(obv_keys::ENVKIT_LOG_JSON);
        remove_env_var(obv_keys::ENVKIT_AUDIT_LOG);
        let cfg = ObservabilityConfig::load();
        assert!(!cfg.quiet);
        assert_eq!(cfg.log_level, "envkit=info");
        assert!(!cfg.log_json);
        assert!(cfg.audit_log.is_none());
    }
}
