//! Seed synchronization: apply one integer seed to every registered random
//! number generator and track which libraries were seeded.
//!
//! Library availability is decided when the [`SeedRegistry`] is built; a
//! library without a target is skipped, never an error.

pub mod error;
pub mod global;
pub mod library;
pub mod manager;
pub mod registry;
pub mod target;

pub use error::SeedError;
pub use global::{
    get_global_seed, get_seed_manager, set_global_seed, with_seed_manager, SeedContext,
};
pub use library::Library;
pub use manager::{SeedManager, SeedState};
pub use registry::{BuiltinTargets, SeedRegistry};
pub use target::{derive_key, PrngKey, SeedTarget, SharedRng};
