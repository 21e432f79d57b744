use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::library::Library;
use crate::registry::SeedRegistry;
use crate::target::{derive_key, PrngKey};

/// Snapshot returned by [`SeedManager::get_state`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedState {
    pub seed: u64,
    pub libraries: BTreeMap<Library, bool>,
}

/// Applies one seed to every registered generator and remembers which
/// libraries have been seeded.
#[derive(Clone)]
pub struct SeedManager {
    seed: u64,
    libraries: BTreeMap<Library, bool>,
    registry: SeedRegistry,
}

impl SeedManager {
    /// Built-in registry. Without a seed, one is drawn from `[0, 2^32 - 1)`.
    pub fn new(seed: Option<u64>) -> Self {
        Self::with_registry(seed, SeedRegistry::builtin())
    }

    pub fn with_registry(seed: Option<u64>, registry: SeedRegistry) -> Self {
        let seed = seed.unwrap_or_else(|| rand::thread_rng().gen_range(0..u64::from(u32::MAX)));
        Self {
            seed,
            libraries: Library::ALL.into_iter().map(|l| (l, false)).collect(),
            registry,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn libraries(&self) -> &BTreeMap<Library, bool> {
        &self.libraries
    }

    pub fn registry(&self) -> &SeedRegistry {
        &self.registry
    }

    /// Seed `libraries` (all when `None`). Unavailable libraries are skipped
    /// and left out of the result; every returned entry is `true`.
    pub fn seed_everything(&mut self, libraries: Option<&[Library]>) -> BTreeMap<Library, bool> {
        let requested: Vec<Library> = match libraries {
            Some(subset) => Library::ALL
                .into_iter()
                .filter(|l| subset.contains(l))
                .collect(),
            None => Library::ALL.to_vec(),
        };

        let mut results = BTreeMap::new();
        for library in requested {
            let Some(target) = self.registry.target(library) else {
                tracing::debug!(%library, "not available, skipped");
                continue;
            };
            if target.apply_seed(self.seed) {
                self.libraries.insert(library, true);
                results.insert(library, true);
            } else {
                tracing::warn!(%library, seed = self.seed, "seeding failed");
            }
        }
        tracing::info!(seed = self.seed, seeded = results.len(), "seeded libraries");
        results
    }

    pub fn get_state(&self) -> SeedState {
        SeedState {
            seed: self.seed,
            libraries: self.libraries.clone(),
        }
    }

    /// Fixed generator key for this manager's seed.
    pub fn prng_key(&self) -> PrngKey {
        derive_key(self.seed)
    }
}

impl fmt::Display for SeedManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let libs: Vec<String> = self
            .libraries
            .iter()
            .map(|(l, seeded)| format!("{}:{}", l, if *seeded { '✓' } else { '✗' }))
            .collect();
        write!(f, "<SeedManager(seed={}, libraries={{{}}})>", self.seed, libs.join(", "))
    }
}

impl fmt::Debug for SeedManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedManager")
            .field("seed", &self.seed)
            .field("libraries", &self.libraries)
            .field("registry", &self.registry)
            .finish()
    }
}
