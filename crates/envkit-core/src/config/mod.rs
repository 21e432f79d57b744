//! envkit configuration layer
//!
//! Every environment variable read goes through this module; business code
//! accesses structured config instead of calling `std::env::var` directly.
//!
//! - `loader`: env_or, env_optional, env_bool helpers and `.env` loading
//! - `schema`: ObservabilityConfig, CacheConfig, ProvisionConfig
//! - `env_keys`: key constants and alias chains

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_optional, env_or, load_dotenv, remove_env_var, set_env_var};
pub use schema::{CacheConfig, ObservabilityConfig, ProvisionConfig};
