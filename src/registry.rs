//! Bean registry
//!
//! Holds definitions by name, the singleton instances built from them and
//! an index from type to the names assignable to it. Uses `DashMap` for
//! concurrent access; each singleton lives in its own `OnceCell` so
//! construction is serialized per name, never across the whole registry.

use crate::config::DuplicatePolicy;
use crate::definition::BeanDefinition;
use crate::descriptor::TypeDescriptor;
use crate::params::Bean;
use crate::{BeanError, Result};
use ahash::RandomState;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use once_cell::sync::OnceCell;
use std::any::TypeId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// One bean's singleton slot; empty until first construction succeeds
type Slot = Arc<OnceCell<Bean>>;

/// Build a map with a small shard count. Default DashMap uses
/// num_cpus * 4 shards which is overkill for a few dozen beans.
#[inline]
fn new_map<K: Eq + std::hash::Hash, V>() -> DashMap<K, V, RandomState> {
    DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8)
}

/// Thread-safe store for bean definitions and singletons
pub struct BeanRegistry {
    /// name -> definition, immutable once locked
    definitions: DashMap<String, Arc<BeanDefinition>, RandomState>,
    /// name -> singleton slot
    singletons: DashMap<String, Slot, RandomState>,
    /// type -> names whose bean can be injected as that type
    assignable: DashMap<TypeId, Vec<String>, RandomState>,
    /// name -> first construction error, under the poison policy
    failures: DashMap<String, BeanError, RandomState>,
    /// name -> dependency cycle through that name, found at init
    cycles: DashMap<String, Vec<String>, RandomState>,
    duplicate_policy: DuplicatePolicy,
    locked: AtomicBool,
}

impl BeanRegistry {
    /// Create an empty registry that rejects duplicate names
    #[inline]
    pub fn new() -> Self {
        Self::with_duplicate_policy(DuplicatePolicy::Reject)
    }

    #[inline]
    pub fn with_duplicate_policy(duplicate_policy: DuplicatePolicy) -> Self {
        Self {
            definitions: new_map(),
            singletons: new_map(),
            assignable: new_map(),
            failures: new_map(),
            cycles: new_map(),
            duplicate_policy,
            locked: AtomicBool::new(false),
        }
    }

    // =========================================================================
    // Definitions
    // =========================================================================

    /// Register a definition under `name`.
    ///
    /// Fails with `DuplicateDefinition` if the name is taken (unless the
    /// registry replaces duplicates) and with `Locked` after [`lock`](Self::lock).
    pub fn register_definition(&self, name: impl Into<String>, definition: BeanDefinition) -> Result<()> {
        if self.is_locked() {
            return Err(BeanError::Locked);
        }

        let name = name.into();
        let definition = Arc::new(definition);

        match self.definitions.entry(name.clone()) {
            Entry::Occupied(mut occupied) => match self.duplicate_policy {
                DuplicatePolicy::Reject => {
                    #[cfg(feature = "logging")]
                    debug!(
                        target: "ioc_context",
                        bean = %name,
                        "Rejecting duplicate bean definition"
                    );
                    return Err(BeanError::DuplicateDefinition { name });
                }
                DuplicatePolicy::Replace => {
                    #[cfg(feature = "logging")]
                    debug!(
                        target: "ioc_context",
                        bean = %name,
                        "Replacing existing bean definition"
                    );
                    let previous = occupied.insert(Arc::clone(&definition));
                    self.unindex(&name, &previous);
                }
            },
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(&definition));
            }
        }

        self.index(&name, &definition);
        self.singletons.entry(name.clone()).or_default();

        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_context",
            bean = %name,
            kind = definition.kind(),
            produces = definition.produces().name(),
            parameters = definition.parameters().len(),
            definition_count = self.definitions.len(),
            "Registered bean definition"
        );

        Ok(())
    }

    fn index(&self, name: &str, definition: &BeanDefinition) {
        for ty in definition.provided_types() {
            let mut names = self.assignable.entry(ty.id()).or_default();
            if !names.iter().any(|existing| existing == name) {
                names.push(name.to_owned());
            }
        }
    }

    fn unindex(&self, name: &str, definition: &BeanDefinition) {
        for ty in definition.provided_types() {
            if let Some(mut names) = self.assignable.get_mut(&ty.id()) {
                names.retain(|existing| existing != name);
            }
        }
    }

    /// Check if a definition exists for `name`
    #[inline]
    pub fn has_definition(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Look up the definition for `name`
    #[inline]
    pub fn get_definition(&self, name: &str) -> Result<Arc<BeanDefinition>> {
        self.definitions
            .get(name)
            .map(|definition| Arc::clone(definition.value()))
            .ok_or_else(|| BeanError::not_found(name))
    }

    /// Every name whose bean can be injected as `ty`, sorted
    pub fn names_assignable_to(&self, ty: &TypeDescriptor) -> Vec<String> {
        let mut names = self
            .assignable
            .get(&ty.id())
            .map(|names| names.value().clone())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    /// All registered bean names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.definitions.iter().map(|r| r.key().clone()).collect();
        names.sort_unstable();
        names
    }

    /// Get number of registered definitions
    #[inline]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Freeze the definitions; later registrations fail with `Locked`
    #[inline]
    pub fn lock(&self) {
        self.locked.store(true, Ordering::Release);

        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_context",
            definition_count = self.definitions.len(),
            "Bean registry locked"
        );
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    // =========================================================================
    // Singletons
    // =========================================================================

    fn slot(&self, name: &str) -> Slot {
        if let Some(slot) = self.singletons.get(name) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.singletons.entry(name.to_owned()).or_default().value())
    }

    /// Cached instance for `name`, if one has been built
    #[inline]
    pub fn get_singleton(&self, name: &str) -> Option<Bean> {
        self.singletons
            .get(name)
            .and_then(|slot| slot.value().get().cloned())
    }

    /// Store the instance for `name`.
    ///
    /// A singleton is written at most once; a second write fails with
    /// `SingletonAlreadySet` and leaves the first instance in place.
    pub fn put_singleton(&self, name: &str, instance: Bean) -> Result<()> {
        self.slot(name)
            .set(instance)
            .map_err(|_| BeanError::SingletonAlreadySet {
                name: name.to_owned(),
            })
    }

    /// Return the instance for `name`, running `create` if there is none.
    ///
    /// Concurrent callers for the same name block until the first finishes
    /// and then share its instance. If `create` fails the slot stays empty.
    pub(crate) fn get_or_try_create<F>(&self, name: &str, create: F) -> Result<Bean>
    where
        F: FnOnce() -> Result<Bean>,
    {
        // The slot is cloned out so no map shard stays locked during construction
        let slot = self.slot(name);
        slot.get_or_try_init(create).map(Arc::clone)
    }

    /// Number of singletons built so far
    pub fn singleton_count(&self) -> usize {
        self.singletons
            .iter()
            .filter(|slot| slot.value().get().is_some())
            .count()
    }

    // =========================================================================
    // Failures
    // =========================================================================

    /// Remember the first failure for `name`
    pub(crate) fn record_failure(&self, name: &str, error: &BeanError) {
        if !self.has_definition(name) {
            return;
        }

        self.failures
            .entry(name.to_owned())
            .or_insert_with(|| error.clone());

        #[cfg(feature = "logging")]
        trace!(
            target: "ioc_context",
            bean = name,
            "Recorded permanent construction failure"
        );
    }

    /// The remembered failure for `name`, if any
    #[inline]
    pub(crate) fn failure(&self, name: &str) -> Option<BeanError> {
        self.failures.get(name).map(|error| error.value().clone())
    }

    // =========================================================================
    // Cycles
    // =========================================================================

    /// Mark `name` as sitting on the dependency cycle `path`
    pub(crate) fn record_cycle(&self, name: &str, path: Vec<String>) {
        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_context",
            bean = name,
            path = ?path,
            "Bean sits on a dependency cycle"
        );

        self.cycles.insert(name.to_owned(), path);
    }

    /// The cycle error for `name`, if it sits on a dependency cycle
    #[inline]
    pub(crate) fn cycle(&self, name: &str) -> Option<BeanError> {
        self.cycles.get(name).map(|path| BeanError::CyclicDependency {
            name: name.to_owned(),
            path: path.value().clone(),
        })
    }

    /// Number of beans sitting on a dependency cycle
    #[inline]
    pub fn cyclic_count(&self) -> usize {
        self.cycles.len()
    }
}

impl Default for BeanRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BeanRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanRegistry")
            .field("definitions", &self.len())
            .field("singletons", &self.singleton_count())
            .field("locked", &self.is_locked())
            .finish()
    }
}
