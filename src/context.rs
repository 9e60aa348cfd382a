//! The application context
//!
//! `Context` is the only entry point application code needs: `init()` loads
//! the descriptor set once, `get()` hands out fully wired singletons.

use crate::config::ContextConfig;
use crate::definition::BeanDefinition;
use crate::descriptor::{DescriptorSource, TypeDescriptor};
use crate::params::{Bean, unerase};
use crate::registry::BeanRegistry;
use crate::resolver::{Resolver, Session};
use crate::{BeanError, Result};
use ahash::RandomState;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[cfg(feature = "logging")]
use tracing::{debug, info, trace};

/// Inversion-of-control context.
///
/// Owns its registry; two contexts never share beans. Cloning a `Context`
/// gives another handle to the same registry, so it can be shared across
/// threads.
///
/// # Examples
///
/// ```rust
/// use ioc_context::{ComponentDescriptor, Context, Descriptors};
/// use std::sync::Arc;
///
/// struct Database {
///     url: String,
/// }
///
/// struct UserService {
///     db: Arc<Database>,
/// }
///
/// let context = Context::new(
///     Descriptors::new()
///         .component(ComponentDescriptor::of::<Database>().constructor(|_: ()| Database {
///             url: "postgres://localhost".into(),
///         }))
///         .component(
///             ComponentDescriptor::of::<UserService>()
///                 .constructor(|db: Arc<Database>| UserService { db }),
///         ),
/// );
/// context.init().unwrap();
///
/// let users = context.get::<UserService>("userService").unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct Context {
    registry: Arc<BeanRegistry>,
    /// Taken by the first `init()`
    source: Arc<Mutex<Option<Box<dyn DescriptorSource>>>>,
    initialized: Arc<AtomicBool>,
    config: ContextConfig,
}

impl Context {
    /// Create a context over `source` with the default configuration.
    #[inline]
    pub fn new(source: impl DescriptorSource + 'static) -> Self {
        Self::with_config(source, ContextConfig::default())
    }

    /// Create a context over `source` with explicit policies.
    pub fn with_config(source: impl DescriptorSource + 'static, config: ContextConfig) -> Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_context",
            duplicate_policy = ?config.duplicate_policy,
            failure_policy = ?config.failure_policy,
            "Creating new bean context"
        );

        let source: Box<dyn DescriptorSource> = Box::new(source);
        Self {
            registry: Arc::new(BeanRegistry::with_duplicate_policy(config.duplicate_policy)),
            source: Arc::new(Mutex::new(Some(source))),
            initialized: Arc::new(AtomicBool::new(false)),
            config,
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Pull the descriptor set and register every definition.
    ///
    /// Runs once. A second call fails with `AlreadyInitialized`, also after
    /// a failed first call: the source has been consumed by then.
    pub fn init(&self) -> Result<()> {
        let mut source = self
            .source
            .lock()
            .map_err(|_| BeanError::Internal("descriptor source lock poisoned".into()))?
            .take()
            .ok_or(BeanError::AlreadyInitialized)?;

        let (components, factories) = source.discover().map_err(BeanError::discovery)?.into_parts();

        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_context",
            components = components.len(),
            factories = factories.len(),
            "Registering discovered descriptors"
        );

        for descriptor in components {
            let definition = BeanDefinition::try_from(descriptor)?;
            self.registry
                .register_definition(definition.name().to_owned(), definition)?;
        }

        for descriptor in factories {
            let definition = BeanDefinition::from(descriptor);
            self.registry
                .register_definition(definition.name().to_owned(), definition)?;
        }

        for (name, path) in self.resolver().find_cycles() {
            self.registry.record_cycle(&name, path);
        }

        self.registry.lock();
        self.initialized.store(true, Ordering::Release);

        #[cfg(feature = "logging")]
        info!(
            target: "ioc_context",
            beans = self.registry.len(),
            "Bean context initialized"
        );

        Ok(())
    }

    /// Check if `init()` has completed
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    #[inline]
    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(BeanError::NotInitialized)
        }
    }

    #[inline]
    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.registry, self.config.failure_policy)
    }

    // =========================================================================
    // Resolution Methods
    // =========================================================================

    /// Resolve a bean by name.
    ///
    /// `T` may be the bean's own type or any capability it declares.
    /// Returns the same `Arc` on every call.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        let bean = self.get_bean(name)?;
        let definition = self.registry.get_definition(name)?;
        let requested = TypeDescriptor::of::<T>();

        definition
            .view_as(&bean, &requested)
            .and_then(|view| unerase::<T>(&view))
            .ok_or_else(|| BeanError::TypeMismatch {
                name: name.to_owned(),
                requested: requested.name(),
                actual: definition.produces().name(),
            })
    }

    /// Resolve a bean by name without a type.
    pub fn get_bean(&self, name: &str) -> Result<Bean> {
        self.ensure_initialized()?;

        #[cfg(feature = "logging")]
        trace!(
            target: "ioc_context",
            bean = name,
            "Resolving bean"
        );

        self.resolver().resolve(name, &mut Session::new())
    }

    /// Resolve the one bean assignable to `T`.
    ///
    /// Candidate selection follows dependency injection: a bean under `T`'s
    /// conventional name wins, otherwise exactly one candidate must exist.
    pub fn get_by_type<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.ensure_initialized()?;

        let requested = TypeDescriptor::of::<T>();
        let name = self.resolver().select_candidate(requested.name(), &requested)?;
        self.get::<T>(&name)
    }

    /// Try to resolve, returning None on any failure.
    #[inline]
    pub fn try_get<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.get::<T>(name).ok()
    }

    /// Check every definition can be wired without constructing anything.
    ///
    /// Reports the first missing, ambiguous or cyclic dependency found,
    /// walking beans in name order.
    pub fn verify(&self) -> Result<()> {
        self.ensure_initialized()?;

        let resolver = self.resolver();
        let mut verified = HashSet::with_hasher(RandomState::new());
        for name in self.registry.names() {
            resolver.verify(&name, &mut Session::new(), &mut verified)?;
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_context",
            beans = verified.len(),
            "Bean graph verified"
        );

        Ok(())
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Check if a bean definition exists for `name`
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.registry.has_definition(name)
    }

    /// All bean names, sorted
    #[inline]
    pub fn bean_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Get the number of bean definitions
    #[inline]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// The registry backing this context
    #[inline]
    pub fn registry(&self) -> &BeanRegistry {
        &self.registry
    }

    #[inline]
    pub fn config(&self) -> ContextConfig {
        self.config
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("bean_count", &self.len())
            .field("singletons", &self.registry.singleton_count())
            .field("initialized", &self.is_initialized())
            .field("config", &self.config)
            .finish()
    }
}
