//! Dependency resolution
//!
//! The [`Resolver`] turns a bean name into an instance: it short-circuits on
//! cached singletons, guards against cycles with the per-call [`Session`],
//! picks a bean for every parameter type and recurses into it, then invokes
//! the constructor or factory operation and caches the result.
//!
//! Parameter selection, in order:
//!
//! 1. the bean named after the parameter type (`Arc<UserRepository>` looks
//!    for `userRepository`), if that bean is assignable to the type;
//! 2. otherwise the single bean assignable to the type;
//! 3. no assignable bean is `MissingDependency`, several are
//!    `AmbiguousDependency`. The resolver never guesses.

use crate::config::FailurePolicy;
use crate::definition::BeanDefinition;
use crate::descriptor::TypeDescriptor;
use crate::params::{Args, Bean};
use crate::registry::BeanRegistry;
use crate::{BeanError, Result};
use ahash::RandomState;
use std::collections::{HashMap, HashSet};

#[cfg(feature = "logging")]
use tracing::{debug, trace, warn};

// =============================================================================
// Resolution Session
// =============================================================================

/// Bookkeeping for one top-level `get()` call: the names currently under
/// construction, in the order they were entered.
#[derive(Debug, Default)]
pub struct Session {
    path: Vec<String>,
    in_progress: HashSet<String, RandomState>,
}

impl Session {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if `name` is under construction in this session
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.in_progress.contains(name)
    }

    /// Names under construction, outermost first
    #[inline]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    fn enter(&mut self, name: &str) {
        self.in_progress.insert(name.to_owned());
        self.path.push(name.to_owned());
    }

    fn exit(&mut self, name: &str) {
        self.in_progress.remove(name);
        if let Some(position) = self.path.iter().rposition(|entered| entered == name) {
            self.path.remove(position);
        }
    }

    /// The cycle closed by re-entering `name`, from its first entry back to itself
    fn cycle(&self, name: &str) -> BeanError {
        let start = self
            .path
            .iter()
            .position(|entered| entered == name)
            .unwrap_or(0);
        let mut path = self.path[start..].to_vec();
        path.push(name.to_owned());

        BeanError::CyclicDependency {
            name: name.to_owned(),
            path,
        }
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// The instantiation engine. Stateless apart from the registry it reads
/// and writes; all per-call state lives in the [`Session`].
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'r> {
    registry: &'r BeanRegistry,
    failure_policy: FailurePolicy,
}

impl<'r> Resolver<'r> {
    #[inline]
    pub fn new(registry: &'r BeanRegistry, failure_policy: FailurePolicy) -> Self {
        Self {
            registry,
            failure_policy,
        }
    }

    /// Resolve `name` to its singleton, building it and its dependencies
    /// if needed.
    pub fn resolve(&self, name: &str, session: &mut Session) -> Result<Bean> {
        if let Some(bean) = self.registry.get_singleton(name) {
            #[cfg(feature = "logging")]
            trace!(
                target: "ioc_context",
                bean = name,
                depth = session.depth(),
                "Bean resolved from singleton cache"
            );
            return Ok(bean);
        }

        if let Some(error) = self.registry.failure(name) {
            return Err(error);
        }

        // Cycles found at init fail before any slot is taken, so two threads
        // entering the same cycle from opposite ends cannot block each other
        if let Some(error) = self.registry.cycle(name) {
            return Err(error);
        }

        if session.contains(name) {
            let error = session.cycle(name);

            #[cfg(feature = "logging")]
            debug!(
                target: "ioc_context",
                bean = name,
                path = ?session.path(),
                "Cyclic dependency detected"
            );

            return Err(error);
        }

        session.enter(name);
        let result = self.create(name, session);
        session.exit(name);

        #[cfg(feature = "logging")]
        if let Err(error) = &result {
            warn!(
                target: "ioc_context",
                bean = name,
                error = %error,
                "Bean resolution failed"
            );
        }

        result
    }

    fn create(&self, name: &str, session: &mut Session) -> Result<Bean> {
        let definition = self.registry.get_definition(name)?;

        self.registry.get_or_try_create(name, || {
            // Another caller may have failed this bean while we waited on the slot
            if let Some(error) = self.registry.failure(name) {
                return Err(error);
            }

            let result = self.construct(&definition, session);

            // Recorded while the slot is still held, so waiters see it
            if let Err(error) = &result {
                if self.failure_policy == FailurePolicy::Poison {
                    self.registry.record_failure(name, error);
                }
            }
            result
        })
    }

    fn construct(&self, definition: &BeanDefinition, session: &mut Session) -> Result<Bean> {
        let name = definition.name();

        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_context",
            bean = name,
            kind = definition.kind(),
            depth = session.depth(),
            "Constructing bean"
        );

        // Pick every dependency before building any of them
        let candidates = definition
            .parameters()
            .iter()
            .map(|param| self.select_candidate(name, param))
            .collect::<Result<Vec<_>>>()?;

        let owner = match definition.owner() {
            Some(owner) => Some(self.resolve(owner, session)?),
            None => None,
        };

        let mut values = Vec::with_capacity(candidates.len());
        for (param, candidate) in definition.parameters().iter().zip(&candidates) {
            values.push(self.resolve_as(candidate, param, session)?);
        }

        match definition.invoke(owner.as_ref(), &Args::new(values)) {
            Ok(Some(instance)) => {
                #[cfg(feature = "logging")]
                debug!(
                    target: "ioc_context",
                    bean = name,
                    produces = definition.produces().name(),
                    "Bean constructed"
                );
                Ok(instance)
            }
            Ok(None) => Err(BeanError::NullFactoryResult {
                name: name.to_owned(),
            }),
            Err(source) => Err(BeanError::construction(name, source)),
        }
    }

    /// Resolve `candidate` and view it as the parameter type `param`
    fn resolve_as(&self, candidate: &str, param: &TypeDescriptor, session: &mut Session) -> Result<Bean> {
        let bean = self.resolve(candidate, session)?;
        let definition = self.registry.get_definition(candidate)?;

        definition
            .view_as(&bean, param)
            .ok_or_else(|| BeanError::TypeMismatch {
                name: candidate.to_owned(),
                requested: param.name(),
                actual: definition.produces().name(),
            })
    }

    /// Choose the bean that satisfies parameter `param` of bean `requester`
    pub fn select_candidate(&self, requester: &str, param: &TypeDescriptor) -> Result<String> {
        let mut candidates = self.registry.names_assignable_to(param);

        let conventional = param.bean_name();
        if candidates.contains(&conventional) {
            return Ok(conventional);
        }

        match candidates.len() {
            0 => Err(BeanError::MissingDependency {
                bean: requester.to_owned(),
                dependency: param.name(),
            }),
            1 => Ok(candidates.remove(0)),
            _ => Err(BeanError::AmbiguousDependency {
                bean: requester.to_owned(),
                dependency: param.name(),
                candidates,
            }),
        }
    }

    /// Names of the beans `definition` is built from: the factory owner
    /// first, then the bean selected for each parameter.
    fn dependency_names(&self, definition: &BeanDefinition) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(definition.parameters().len() + 1);
        if let Some(owner) = definition.owner() {
            names.push(owner.to_owned());
        }
        for param in definition.parameters() {
            names.push(self.select_candidate(definition.name(), param)?);
        }
        Ok(names)
    }

    /// Every registered bean that sits on a dependency cycle, with the cycle
    /// path starting and ending at that bean.
    ///
    /// A bean whose dependencies cannot be selected contributes no edges:
    /// resolving it fails on selection before any dependency is built.
    pub(crate) fn find_cycles(&self) -> Vec<(String, Vec<String>)> {
        let names = self.registry.names();

        let mut edges: HashMap<String, Vec<String>, RandomState> =
            HashMap::with_capacity_and_hasher(names.len(), RandomState::new());
        for name in &names {
            let dependencies = self
                .registry
                .get_definition(name)
                .and_then(|definition| self.dependency_names(&definition))
                .unwrap_or_default();
            edges.insert(name.clone(), dependencies);
        }

        names
            .into_iter()
            .filter_map(|name| {
                let mut path = vec![name.clone()];
                let mut visited = HashSet::with_hasher(RandomState::new());
                walk_back_to(&name, &name, &edges, &mut path, &mut visited).then_some((name, path))
            })
            .collect()
    }

    /// Check that `name` and everything it depends on can be wired, without
    /// constructing anything.
    pub(crate) fn verify(&self, name: &str, session: &mut Session, verified: &mut HashSet<String, RandomState>) -> Result<()> {
        if verified.contains(name) {
            return Ok(());
        }
        if session.contains(name) {
            return Err(session.cycle(name));
        }

        let definition = self.registry.get_definition(name)?;

        session.enter(name);
        let result = self.verify_dependencies(&definition, session, verified);
        session.exit(name);

        if result.is_ok() {
            verified.insert(name.to_owned());
        }
        result
    }

    fn verify_dependencies(
        &self,
        definition: &BeanDefinition,
        session: &mut Session,
        verified: &mut HashSet<String, RandomState>,
    ) -> Result<()> {
        for dependency in self.dependency_names(definition)? {
            self.verify(&dependency, session, verified)?;
        }

        Ok(())
    }
}

/// Depth-first search from `current` for an edge back to `start`, extending
/// `path` along the way. `path` ends with `start` when a cycle is found.
fn walk_back_to(
    start: &str,
    current: &str,
    edges: &HashMap<String, Vec<String>, RandomState>,
    path: &mut Vec<String>,
    visited: &mut HashSet<String, RandomState>,
) -> bool {
    let Some(next) = edges.get(current) else {
        return false;
    };

    for dependency in next {
        if dependency == start {
            path.push(dependency.clone());
            return true;
        }
        if visited.insert(dependency.clone()) {
            path.push(dependency.clone());
            if walk_back_to(start, dependency, edges, path, visited) {
                return true;
            }
            path.pop();
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ComponentDescriptor, FactoryDescriptor};
    use crate::params::unerase;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Engine;

    #[allow(dead_code)]
    struct Car {
        engine: Arc<Engine>,
    }

    fn register(registry: &BeanRegistry, descriptor: ComponentDescriptor) {
        let name = descriptor.name().to_owned();
        registry
            .register_definition(name, descriptor.try_into().unwrap())
            .unwrap();
    }

    #[test]
    fn test_session_tracks_path() {
        let mut session = Session::new();
        session.enter("a");
        session.enter("b");

        assert!(session.contains("a"));
        assert_eq!(session.path(), &["a".to_string(), "b".to_string()]);

        session.exit("b");
        assert!(!session.contains("b"));
        assert_eq!(session.depth(), 1);
    }

    #[test]
    fn test_session_cycle_starts_at_reentered_name() {
        let mut session = Session::new();
        session.enter("root");
        session.enter("a");
        session.enter("b");

        match session.cycle("a") {
            BeanError::CyclicDependency { name, path } => {
                assert_eq!(name, "a");
                assert_eq!(path, vec!["a", "b", "a"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_wires_dependency() {
        let registry = BeanRegistry::new();
        register(&registry, ComponentDescriptor::of::<Engine>().constructor(|_: ()| Engine).build());
        register(
            &registry,
            ComponentDescriptor::of::<Car>()
                .constructor(|engine: Arc<Engine>| Car { engine })
                .build(),
        );

        let resolver = Resolver::new(&registry, FailurePolicy::Retry);
        let car = resolver.resolve("car", &mut Session::new()).unwrap();
        let engine = resolver.resolve("engine", &mut Session::new()).unwrap();

        let car = unerase::<Car>(&car).unwrap();
        assert!(Arc::ptr_eq(&car.engine, &unerase::<Engine>(&engine).unwrap()));
    }

    #[test]
    fn test_session_cleared_after_failure() {
        let registry = BeanRegistry::new();
        register(
            &registry,
            ComponentDescriptor::of::<Car>()
                .constructor(|engine: Arc<Engine>| Car { engine })
                .build(),
        );

        let resolver = Resolver::new(&registry, FailurePolicy::Retry);
        let mut session = Session::new();
        assert!(resolver.resolve("car", &mut session).is_err());
        assert_eq!(session.depth(), 0);
        assert!(!session.contains("car"));
    }

    #[test]
    fn test_factory_owner_resolved_first() {
        static OWNER_BUILT: AtomicU32 = AtomicU32::new(0);

        struct Garage;

        let registry = BeanRegistry::new();
        register(
            &registry,
            ComponentDescriptor::of::<Garage>()
                .constructor(|_: ()| {
                    OWNER_BUILT.fetch_add(1, Ordering::SeqCst);
                    Garage
                })
                .build(),
        );
        registry
            .register_definition(
                "engine",
                FactoryDescriptor::new::<Garage, Engine>("engine")
                    .method(|_garage: Arc<Garage>, _: ()| Engine)
                    .into(),
            )
            .unwrap();

        let resolver = Resolver::new(&registry, FailurePolicy::Retry);
        resolver.resolve("engine", &mut Session::new()).unwrap();

        assert_eq!(OWNER_BUILT.load(Ordering::SeqCst), 1);
        assert!(registry.get_singleton("garage").is_some());
    }

    #[test]
    fn test_static_factory_skips_owner() {
        #[allow(dead_code)]
        struct Garage;

        let registry = BeanRegistry::new();
        registry
            .register_definition(
                "engine",
                FactoryDescriptor::new::<Garage, Engine>("engine")
                    .function(|_: ()| Engine)
                    .into(),
            )
            .unwrap();

        let resolver = Resolver::new(&registry, FailurePolicy::Retry);
        assert!(resolver.resolve("engine", &mut Session::new()).is_ok());
    }

    #[test]
    fn test_unassignable_conventional_name_is_skipped() {
        struct Garage;

        let registry = BeanRegistry::new();
        // "engine" is taken by a bean that is not an Engine
        registry
            .register_definition(
                "engine",
                FactoryDescriptor::new::<Garage, Garage>("engine")
                    .function(|_: ()| Garage)
                    .into(),
            )
            .unwrap();
        registry
            .register_definition(
                "v8",
                FactoryDescriptor::new::<Garage, Engine>("v8")
                    .function(|_: ()| Engine)
                    .into(),
            )
            .unwrap();
        register(
            &registry,
            ComponentDescriptor::of::<Car>()
                .constructor(|engine: Arc<Engine>| Car { engine })
                .build(),
        );

        let resolver = Resolver::new(&registry, FailurePolicy::Retry);
        assert_eq!(
            resolver
                .select_candidate("car", &TypeDescriptor::of::<Engine>())
                .unwrap(),
            "v8"
        );

        let car = resolver.resolve("car", &mut Session::new()).unwrap();
        let v8 = registry.get_singleton("v8").unwrap();
        assert!(Arc::ptr_eq(
            &unerase::<Car>(&car).unwrap().engine,
            &unerase::<Engine>(&v8).unwrap()
        ));
        assert!(registry.get_singleton("engine").is_none());
    }

    #[test]
    fn test_find_cycles_marks_only_beans_on_the_cycle() {
        struct Left;
        struct Right;

        #[allow(dead_code)]
        struct Tail {
            left: Arc<Left>,
        }

        let registry = BeanRegistry::new();
        register(&registry, ComponentDescriptor::of::<Left>().constructor(|_right: Arc<Right>| Left).build());
        register(&registry, ComponentDescriptor::of::<Right>().constructor(|_left: Arc<Left>| Right).build());
        register(&registry, ComponentDescriptor::of::<Tail>().constructor(|left: Arc<Left>| Tail { left }).build());
        register(&registry, ComponentDescriptor::of::<Car>().constructor(|engine: Arc<Engine>| Car { engine }).build());

        let cycles = Resolver::new(&registry, FailurePolicy::Retry).find_cycles();
        assert_eq!(
            cycles,
            vec![
                ("left".to_string(), vec!["left".to_string(), "right".to_string(), "left".to_string()]),
                ("right".to_string(), vec!["right".to_string(), "left".to_string(), "right".to_string()]),
            ]
        );
    }

    #[test]
    fn test_verify_reports_cycle_without_constructing() {
        static BUILT: AtomicU32 = AtomicU32::new(0);

        struct Left;
        struct Right;

        let registry = BeanRegistry::new();
        register(
            &registry,
            ComponentDescriptor::of::<Left>()
                .constructor(|_right: Arc<Right>| {
                    BUILT.fetch_add(1, Ordering::SeqCst);
                    Left
                })
                .build(),
        );
        register(
            &registry,
            ComponentDescriptor::of::<Right>()
                .constructor(|_left: Arc<Left>| {
                    BUILT.fetch_add(1, Ordering::SeqCst);
                    Right
                })
                .build(),
        );

        let resolver = Resolver::new(&registry, FailurePolicy::Retry);
        let mut verified = HashSet::default();
        let err = resolver
            .verify("left", &mut Session::new(), &mut verified)
            .unwrap_err();

        assert!(matches!(err, BeanError::CyclicDependency { name, .. } if name == "left"));
        assert_eq!(BUILT.load(Ordering::SeqCst), 0);
    }
}
