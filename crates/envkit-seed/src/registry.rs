use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::library::Library;
use crate::target::{
    EnvDeterminismTarget, GpuRngTarget, KeyTarget, PrngKey, RngTarget, SeedTarget, SharedRng,
};

/// Typed handles to the generators behind [`SeedRegistry::builtin`].
pub struct BuiltinTargets {
    pub python: RngTarget,
    pub numpy: RngTarget,
    pub pytorch: Arc<GpuRngTarget>,
    pub tensorflow: EnvDeterminismTarget,
    pub jax: Arc<KeyTarget>,
}

impl BuiltinTargets {
    fn new() -> Self {
        Self {
            python: RngTarget::new(),
            numpy: RngTarget::new(),
            pytorch: Arc::new(GpuRngTarget::new(false)),
            tensorflow: EnvDeterminismTarget::new(),
            jax: Arc::new(KeyTarget::new()),
        }
    }

    fn registry(&self) -> SeedRegistry {
        SeedRegistry::empty()
            .register(Library::Python, self.python.clone())
            .register(Library::Numpy, self.numpy.clone())
            .register_shared(Library::Pytorch, self.pytorch.clone())
            .register(Library::Tensorflow, self.tensorflow.clone())
            .register_shared(Library::Jax, self.jax.clone())
    }

    /// Host generator seeded for `library`; `None` for key-based libraries.
    pub fn rng(&self, library: Library) -> Option<&RngTarget> {
        match library {
            Library::Python => Some(&self.python),
            Library::Numpy => Some(&self.numpy),
            Library::Pytorch => Some(self.pytorch.host()),
            Library::Tensorflow => Some(self.tensorflow.rng()),
            Library::Jax => None,
        }
    }
}

fn builtins() -> &'static (BuiltinTargets, SeedRegistry) {
    static BUILTIN: OnceLock<(BuiltinTargets, SeedRegistry)> = OnceLock::new();
    BUILTIN.get_or_init(|| {
        let targets = BuiltinTargets::new();
        let registry = targets.registry();
        (targets, registry)
    })
}

/// Which libraries can be seeded, decided once at registration.
///
/// Every [`Library`] has an entry; `None` marks a library that is not
/// available in this process and is skipped by seeding.
#[derive(Clone)]
pub struct SeedRegistry {
    targets: BTreeMap<Library, Option<Arc<dyn SeedTarget>>>,
}

impl SeedRegistry {
    /// All libraries unavailable.
    pub fn empty() -> Self {
        Self {
            targets: Library::ALL.into_iter().map(|l| (l, None)).collect(),
        }
    }

    /// The process-wide built-in targets. Every call shares the same
    /// generators, so managers built from it seed the same state.
    pub fn builtin() -> Self {
        builtins().1.clone()
    }

    /// The generators behind [`SeedRegistry::builtin`], for sampling after seeding.
    pub fn builtin_targets() -> &'static BuiltinTargets {
        &builtins().0
    }

    /// Shared handle to the built-in generator for `library`.
    pub fn builtin_rng(library: Library) -> Option<SharedRng> {
        Self::builtin_targets().rng(library).map(RngTarget::handle)
    }

    /// Key recorded by the built-in key target, once seeded.
    pub fn builtin_key() -> Option<PrngKey> {
        Self::builtin_targets().jax.key()
    }

    pub fn register<T: SeedTarget + 'static>(self, library: Library, target: T) -> Self {
        self.register_shared(library, Arc::new(target))
    }

    pub fn register_shared(mut self, library: Library, target: Arc<dyn SeedTarget>) -> Self {
        self.targets.insert(library, Some(target));
        self
    }

    /// Mark `library` unavailable.
    pub fn without(mut self, library: Library) -> Self {
        self.targets.insert(library, None);
        self
    }

    pub fn target(&self, library: Library) -> Option<&Arc<dyn SeedTarget>> {
        self.targets.get(&library).and_then(Option::as_ref)
    }

    pub fn is_available(&self, library: Library) -> bool {
        self.target(library).is_some()
    }

    pub fn available(&self) -> Vec<Library> {
        self.targets
            .iter()
            .filter(|(_, t)| t.is_some())
            .map(|(l, _)| *l)
            .collect()
    }
}

impl Default for SeedRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for SeedRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.targets.iter().map(|(l, t)| (l, t.is_some())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::SeedManager;
    use crate::target::derive_key;
    use rand::Rng;
    use serial_test::serial;

    #[test]
    fn test_builtin_registers_every_library() {
        assert_eq!(SeedRegistry::builtin().available(), Library::ALL.to_vec());
    }

    #[test]
    fn test_builtin_is_shared() {
        let a = SeedRegistry::builtin();
        let b = SeedRegistry::builtin();
        assert!(Arc::ptr_eq(
            a.target(Library::Python).unwrap(),
            b.target(Library::Python).unwrap()
        ));
    }

    #[test]
    fn test_without_and_register() {
        let reg = SeedRegistry::empty().register(Library::Numpy, RngTarget::new());
        assert_eq!(reg.available(), vec![Library::Numpy]);
        let reg = reg.without(Library::Numpy);
        assert!(!reg.is_available(Library::Numpy));
        assert_eq!(format!("{reg:?}").matches("false").count(), 5);
    }

    #[test]
    #[serial]
    fn test_builtin_generators_replay_after_reseed() {
        let sample = |lib: Library| SeedRegistry::builtin_targets().rng(lib).unwrap().sample(8);

        SeedManager::new(Some(42)).seed_everything(None);
        let first: Vec<_> = Library::ALL
            .into_iter()
            .filter(|l| *l != Library::Jax)
            .map(sample)
            .collect();
        SeedManager::new(Some(42)).seed_everything(None);
        let second: Vec<_> = Library::ALL
            .into_iter()
            .filter(|l| *l != Library::Jax)
            .map(sample)
            .collect();
        assert_eq!(first, second);
        assert_eq!(SeedRegistry::builtin_key(), Some(derive_key(42)));

        SeedManager::new(Some(43)).seed_everything(Some(&[Library::Python]));
        assert_ne!(sample(Library::Python), first[0]);
    }

    #[test]
    #[serial]
    fn test_builtin_rng_handle_is_live() {
        SeedManager::new(Some(7)).seed_everything(Some(&[Library::Numpy]));
        let drawn: u64 = SeedRegistry::builtin_rng(Library::Numpy)
            .unwrap()
            .lock()
            .unwrap()
            .gen();
        SeedManager::new(Some(7)).seed_everything(Some(&[Library::Numpy]));
        assert_eq!(SeedRegistry::builtin_targets().numpy.sample(1), vec![drawn]);
        assert!(SeedRegistry::builtin_rng(Library::Jax).is_none());
    }
}
