//! Seedable generator targets.
//!
//! Each library's seeding capability is one [`SeedTarget`]. The built-in
//! targets own in-process generators; embedders register their own for
//! generators living elsewhere.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use envkit_core::config::env_keys::seed as seed_keys;
use envkit_core::config::set_env_var;

/// Something holding RNG state that a seed can be applied to.
pub trait SeedTarget: Send + Sync {
    /// Reseed. `false` means the target could not be seeded this time.
    fn apply_seed(&self, seed: u64) -> bool;
}

/// Shared handle to a generator.
pub type SharedRng = Arc<Mutex<StdRng>>;

fn lock(rng: &Mutex<StdRng>) -> MutexGuard<'_, StdRng> {
    rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn new_shared() -> SharedRng {
    Arc::new(Mutex::new(StdRng::from_entropy()))
}

/// A single generator, reseeded with `seed_from_u64`.
#[derive(Clone)]
pub struct RngTarget {
    rng: SharedRng,
}

impl RngTarget {
    pub fn new() -> Self {
        Self { rng: new_shared() }
    }

    pub fn handle(&self) -> SharedRng {
        Arc::clone(&self.rng)
    }

    /// Draw `n` values from the generator.
    pub fn sample(&self, n: usize) -> Vec<u64> {
        let mut rng = lock(&self.rng);
        (0..n).map(|_| rng.gen()).collect()
    }
}

impl Default for RngTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl SeedTarget for RngTarget {
    fn apply_seed(&self, seed: u64) -> bool {
        *lock(&self.rng) = StdRng::seed_from_u64(seed);
        true
    }
}

/// Host generator plus an optional device generator. When a device is
/// present, seeding also selects deterministic, non-benchmarked kernels.
pub struct GpuRngTarget {
    host: RngTarget,
    device: Option<RngTarget>,
    deterministic: AtomicBool,
    benchmark: AtomicBool,
}

impl GpuRngTarget {
    pub fn new(with_device: bool) -> Self {
        Self {
            host: RngTarget::new(),
            device: with_device.then(RngTarget::new),
            deterministic: AtomicBool::new(false),
            benchmark: AtomicBool::new(true),
        }
    }

    pub fn host(&self) -> &RngTarget {
        &self.host
    }

    pub fn device(&self) -> Option<&RngTarget> {
        self.device.as_ref()
    }

    pub fn deterministic(&self) -> bool {
        self.deterministic.load(Ordering::SeqCst)
    }

    pub fn benchmark(&self) -> bool {
        self.benchmark.load(Ordering::SeqCst)
    }
}

impl SeedTarget for GpuRngTarget {
    fn apply_seed(&self, seed: u64) -> bool {
        self.host.apply_seed(seed);
        if let Some(ref device) = self.device {
            device.apply_seed(seed);
            self.deterministic.store(true, Ordering::SeqCst);
            self.benchmark.store(false, Ordering::SeqCst);
        }
        true
    }
}

/// Reseeds a generator and turns on deterministic ops through the process environment.
#[derive(Clone, Default)]
pub struct EnvDeterminismTarget {
    rng: RngTarget,
}

impl EnvDeterminismTarget {
    pub const VARS: [&'static str; 2] = [
        seed_keys::TF_DETERMINISTIC_OPS,
        seed_keys::TF_DISABLE_SEGMENT_REDUCTION_OP_DETERMINISM_EXCEPT_WEB_LAYER,
    ];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn rng(&self) -> &RngTarget {
        &self.rng
    }
}

impl SeedTarget for EnvDeterminismTarget {
    fn apply_seed(&self, seed: u64) -> bool {
        self.rng.apply_seed(seed);
        for key in Self::VARS {
            set_env_var(key, "1");
        }
        true
    }
}

/// Two-word generator key, as used by counter-based PRNG APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrngKey(pub [u32; 2]);

/// Deterministic key for `seed`: high word, low word.
///
/// Callers that need a "fresh" key after seeding request it here instead of
/// from the library, so every request yields the same key for the same seed.
pub fn derive_key(seed: u64) -> PrngKey {
    PrngKey([(seed >> 32) as u32, seed as u32])
}

/// Records the fixed key for the current seed and enables 64-bit precision.
#[derive(Default)]
pub struct KeyTarget {
    key: Mutex<Option<PrngKey>>,
    enable_x64: AtomicBool,
}

impl KeyTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed key, once seeded.
    pub fn key(&self) -> Option<PrngKey> {
        *self.key.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn x64_enabled(&self) -> bool {
        self.enable_x64.load(Ordering::SeqCst)
    }
}

impl SeedTarget for KeyTarget {
    fn apply_seed(&self, seed: u64) -> bool {
        self.enable_x64.store(true, Ordering::SeqCst);
        *self.key.lock().unwrap_or_else(|p| p.into_inner()) = Some(derive_key(seed));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envkit_core::config::remove_env_var;
    use serial_test::serial;

    #[test]
    fn test_rng_target_is_deterministic() {
        let a = RngTarget::new();
        let b = RngTarget::new();
        a.apply_seed(42);
        b.apply_seed(42);
        assert_eq!(a.sample(8), b.sample(8));

        b.apply_seed(43);
        a.apply_seed(42);
        assert_ne!(a.sample(8), b.sample(8));
    }

    #[test]
    fn test_gpu_flags_only_with_device() {
        let host_only = GpuRngTarget::new(false);
        assert!(host_only.apply_seed(7));
        assert!(!host_only.deterministic());
        assert!(host_only.benchmark());

        let gpu = GpuRngTarget::new(true);
        gpu.apply_seed(7);
        assert!(gpu.deterministic());
        assert!(!gpu.benchmark());
        assert_eq!(
            gpu.host().sample(4),
            gpu.device().map(|d| d.sample(4)).unwrap()
        );
    }

    #[test]
    #[serial]
    fn test_env_determinism_sets_both_vars() {
        for key in EnvDeterminismTarget::VARS {
            remove_env_var(key);
        }
        assert!(EnvDeterminismTarget::new().apply_seed(1));
        for key in EnvDeterminismTarget::VARS {
            assert_eq!(std::env::var(key).unwrap(), "1");
            remove_env_var(key);
        }
    }

    #[test]
    fn test_key_target_and_derive_key() {
        assert_eq!(derive_key(42), PrngKey([0, 42]));
        assert_eq!(derive_key(1 << 32 | 5), PrngKey([1, 5]));

        let target = KeyTarget::new();
        assert_eq!(target.key(), None);
        target.apply_seed(42);
        assert!(target.x64_enabled());
        assert_eq!(target.key(), Some(derive_key(42)));
        assert_eq!(target.key(), target.key());
    }
}
