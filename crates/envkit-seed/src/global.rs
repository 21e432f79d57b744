//! Current seed state.
//!
//! [`SeedContext`] is the owned form: pass it to whatever needs the current
//! manager. The free functions operate on one process-wide context for
//! callers that cannot thread a context through.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, OnceLock};

use crate::library::Library;
use crate::manager::SeedManager;
use crate::registry::SeedRegistry;

#[derive(Debug, Clone)]
pub struct SeedContext {
    manager: SeedManager,
}

impl SeedContext {
    pub fn new(manager: SeedManager) -> Self {
        Self { manager }
    }

    /// Replace the current manager with a fresh one for `seed` and seed every
    /// available library. The previous manager's state is discarded.
    pub fn set_global_seed(&mut self, seed: u64) -> BTreeMap<Library, bool> {
        let registry = self.manager.registry().clone();
        self.set_global_seed_with(seed, registry)
    }

    pub fn set_global_seed_with(
        &mut self,
        seed: u64,
        registry: SeedRegistry,
    ) -> BTreeMap<Library, bool> {
        let mut manager = SeedManager::with_registry(Some(seed), registry);
        let results = manager.seed_everything(None);
        self.manager = manager;
        results
    }

    pub fn get_global_seed(&self) -> u64 {
        self.manager.seed()
    }

    pub fn get_seed_manager(&self) -> &SeedManager {
        &self.manager
    }

    /// The current manager itself; seeding through it updates this context.
    pub fn get_seed_manager_mut(&mut self) -> &mut SeedManager {
        &mut self.manager
    }
}

impl Default for SeedContext {
    /// Unseeded manager with a random seed over the built-in registry.
    fn default() -> Self {
        Self::new(SeedManager::new(None))
    }
}

fn global() -> MutexGuard<'static, SeedContext> {
    static GLOBAL: OnceLock<Mutex<SeedContext>> = OnceLock::new();
    GLOBAL
        .get_or_init(|| Mutex::new(SeedContext::default()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-wide [`SeedContext::set_global_seed`].
pub fn set_global_seed(seed: u64) -> BTreeMap<Library, bool> {
    global().set_global_seed(seed)
}

pub fn get_global_seed() -> u64 {
    global().get_global_seed()
}

/// Snapshot of the process-wide manager. Seeding the copy does not update
/// the process-wide flags; use [`with_seed_manager`] for that.
pub fn get_seed_manager() -> SeedManager {
    global().get_seed_manager().clone()
}

/// Run `f` against the live process-wide manager while holding its lock.
pub fn with_seed_manager<R>(f: impl FnOnce(&mut SeedManager) -> R) -> R {
    f(global().get_seed_manager_mut())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::RngTarget;
    use serial_test::serial;

    #[test]
    fn test_context_replaces_manager() {
        let registry = SeedRegistry::empty().register(Library::Python, RngTarget::new());
        let mut ctx = SeedContext::new(SeedManager::with_registry(Some(1), registry));
        let results = ctx.set_global_seed(4321);

        assert_eq!(ctx.get_global_seed(), 4321);
        assert_eq!(results.keys().copied().collect::<Vec<_>>(), vec![Library::Python]);
        assert_eq!(ctx.get_seed_manager().get_state().seed, 4321);
        assert!(ctx.get_seed_manager().libraries()[&Library::Python]);
    }

    #[test]
    fn test_contexts_are_independent() {
        let mut a = SeedContext::new(SeedManager::with_registry(Some(1), SeedRegistry::empty()));
        let b = SeedContext::new(SeedManager::with_registry(Some(2), SeedRegistry::empty()));
        a.set_global_seed(10);
        assert_eq!(a.get_global_seed(), 10);
        assert_eq!(b.get_global_seed(), 2);
    }

    #[test]
    #[serial]
    fn test_process_wide_set_and_get() {
        let results = set_global_seed(4321);
        assert_eq!(get_global_seed(), 4321);
        assert_eq!(results.len(), Library::ALL.len());
        let manager = get_seed_manager();
        assert_eq!(manager.get_state().seed, 4321);
        assert!(manager.get_state().libraries.values().all(|v| *v));

        set_global_seed(7);
        assert_eq!(get_global_seed(), 7);
    }

    #[test]
    fn test_context_seeds_current_manager_in_place() {
        let registry = SeedRegistry::empty().register(Library::Numpy, RngTarget::new());
        let mut ctx = SeedContext::new(SeedManager::with_registry(Some(3), registry));
        ctx.get_seed_manager_mut().seed_everything(None);
        assert!(ctx.get_seed_manager().get_state().libraries[&Library::Numpy]);
        assert_eq!(ctx.get_global_seed(), 3);
    }

    #[test]
    #[serial]
    fn test_process_wide_manager_records_seeding() {
        with_seed_manager(|m| *m = SeedManager::new(Some(99)));
        assert!(get_seed_manager().get_state().libraries.values().all(|v| !*v));

        let seeded = with_seed_manager(|m| m.seed_everything(Some(&[Library::Python])));
        assert_eq!(seeded.keys().copied().collect::<Vec<_>>(), vec![Library::Python]);

        let state = get_seed_manager().get_state();
        assert_eq!(state.seed, 99);
        assert!(state.libraries[&Library::Python]);
        assert!(!state.libraries[&Library::Numpy]);

        with_seed_manager(|m| m.seed_everything(None));
        assert!(get_seed_manager().get_state().libraries.values().all(|v| *v));
    }
}
