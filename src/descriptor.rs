//! Component and factory descriptors
//!
//! Descriptors are the input of a [`Context`](crate::Context): a flat list
//! of "this type can be built like so" and "this operation produces a bean"
//! records. Discovering them is not this crate's business; anything that
//! implements [`DescriptorSource`] can feed a context, whether that is a
//! hand-written list, a build-time generator or `#[derive(Component)]`.
//!
//! # Example
//!
//! ```rust
//! use ioc_context::{ComponentDescriptor, Descriptors, FactoryDescriptor};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserRepository {
//!     db: Arc<Database>,
//! }
//!
//! struct AppConfig;
//!
//! let descriptors = Descriptors::new()
//!     .component(ComponentDescriptor::of::<AppConfig>().constructor(|_: ()| AppConfig))
//!     .component(
//!         ComponentDescriptor::of::<UserRepository>()
//!             .constructor(|db: Arc<Database>| UserRepository { db }),
//!     )
//!     .factory(
//!         FactoryDescriptor::new::<AppConfig, Database>("database").method(
//!             |_config: Arc<AppConfig>, _: ()| Database {
//!                 url: "postgres://localhost".into(),
//!             },
//!         ),
//!     );
//!
//! assert_eq!(descriptors.len(), 3);
//! assert_eq!(descriptors.components()[1].name(), "userRepository");
//! ```

use crate::naming::{bean_name_of, lower_camel, simple_type_name};
use crate::params::{Args, Bean, Params, Produce, Produced, erase, unerase};
use crate::{BeanError, BoxError};
use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;

// =============================================================================
// Type Descriptor
// =============================================================================

/// Runtime description of a type: its `TypeId` plus its full name.
///
/// Works for unsized types, so `TypeDescriptor::of::<dyn Trait>()` names a
/// capability. Equality and hashing only look at the `TypeId`.
#[derive(Clone, Copy)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
}

impl TypeDescriptor {
    /// Describe `T`
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without module path or generic arguments
    #[inline]
    pub fn simple_name(&self) -> &'static str {
        simple_type_name(self.name)
    }

    /// Bean name this type maps to under the naming convention
    #[inline]
    pub fn bean_name(&self) -> String {
        lower_camel(self.simple_name())
    }
}

impl PartialEq for TypeDescriptor {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDescriptor {}

impl std::hash::Hash for TypeDescriptor {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

// =============================================================================
// Invocation plumbing
// =============================================================================

/// Type-erased constructor or factory operation. The first argument is the
/// owner instance for instance factories.
pub(crate) type InvokeFn = Arc<dyn Fn(Option<&Bean>, &Args) -> Produced<Bean> + Send + Sync>;

/// Type-erased view of a produced instance as one of its capabilities
pub(crate) type CastFn = Arc<dyn Fn(&Bean) -> Option<Bean> + Send + Sync>;

#[inline]
fn invoker<F>(f: F) -> InvokeFn
where
    F: Fn(Option<&Bean>, &Args) -> Produced<Bean> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A capability (usually a trait object type) that a bean can be viewed as.
#[derive(Clone)]
pub struct Capability {
    pub(crate) ty: TypeDescriptor,
    pub(crate) cast: CastFn,
}

impl Capability {
    fn new<T, C, F>(cast: F) -> Self
    where
        T: Send + Sync + 'static,
        C: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<C> + Send + Sync + 'static,
    {
        Self {
            ty: TypeDescriptor::of::<C>(),
            cast: Arc::new(move |bean: &Bean| unerase::<T>(bean).map(|this| erase(cast(this)))),
        }
    }

    #[inline]
    pub fn type_descriptor(&self) -> TypeDescriptor {
        self.ty
    }
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Capability").field(&self.ty).finish()
    }
}

/// One way of constructing a component
#[derive(Clone)]
pub struct Constructor {
    pub(crate) params: Vec<TypeDescriptor>,
    pub(crate) invoke: InvokeFn,
}

impl Constructor {
    /// Parameter types in declaration order
    #[inline]
    pub fn params(&self) -> &[TypeDescriptor] {
        &self.params
    }
}

impl std::fmt::Debug for Constructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constructor")
            .field("params", &self.params)
            .finish()
    }
}

// =============================================================================
// Component Descriptor
// =============================================================================

/// Describes a component type: its bean name, produced type, declared
/// capabilities and every constructor it offers.
#[derive(Clone, Debug)]
pub struct ComponentDescriptor {
    pub(crate) name: String,
    pub(crate) produces: TypeDescriptor,
    pub(crate) capabilities: Vec<Capability>,
    pub(crate) constructors: Vec<Constructor>,
}

impl ComponentDescriptor {
    /// Start describing component `T`, named by the naming convention.
    #[inline]
    pub fn of<T: Send + Sync + 'static>() -> ComponentBuilder<T> {
        ComponentBuilder {
            descriptor: ComponentDescriptor {
                name: bean_name_of::<T>(),
                produces: TypeDescriptor::of::<T>(),
                capabilities: Vec::new(),
                constructors: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    /// Derived bean name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn produces(&self) -> TypeDescriptor {
        self.produces
    }

    #[inline]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    #[inline]
    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }
}

/// Typed builder for a [`ComponentDescriptor`]
pub struct ComponentBuilder<T> {
    descriptor: ComponentDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ComponentBuilder<T> {
    /// Add a constructor. Its parameter types come from the closure's
    /// argument type: `()`, `Arc<A>` or a tuple `(Arc<A>, Arc<B>, ...)`.
    ///
    /// ```rust
    /// use ioc_context::ComponentDescriptor;
    /// use std::sync::Arc;
    ///
    /// struct Config;
    /// struct Mailer { config: Arc<Config> }
    ///
    /// let descriptor = ComponentDescriptor::of::<Mailer>()
    ///     .constructor(|config: Arc<Config>| Mailer { config })
    ///     .build();
    /// assert_eq!(descriptor.constructors()[0].params().len(), 1);
    /// ```
    pub fn constructor<P, R, F>(mut self, f: F) -> Self
    where
        P: Params,
        R: Produce<T>,
        F: Fn(P) -> R + Send + Sync + 'static,
    {
        let invoke = invoker(move |_owner, args| {
            let params = P::extract(args)?;
            Ok(f(params).produce()?.map(|value| erase(Arc::new(value))))
        });

        self.descriptor.constructors.push(Constructor {
            params: P::types(),
            invoke,
        });
        self
    }

    /// Add a constructor with an explicit parameter list that reads its
    /// arguments from [`Args`] by index.
    pub fn constructor_with<R, F>(mut self, params: Vec<TypeDescriptor>, f: F) -> Self
    where
        R: Produce<T>,
        F: Fn(&Args) -> R + Send + Sync + 'static,
    {
        let invoke = invoker(move |_owner, args| {
            Ok(f(args).produce()?.map(|value| erase(Arc::new(value))))
        });

        self.descriptor
            .constructors
            .push(Constructor { params, invoke });
        self
    }

    /// Declare that the component can be injected wherever `C` is requested.
    ///
    /// ```rust
    /// use ioc_context::ComponentDescriptor;
    /// use std::sync::Arc;
    ///
    /// trait Greeter: Send + Sync {}
    /// struct English;
    /// impl Greeter for English {}
    ///
    /// let descriptor = ComponentDescriptor::of::<English>()
    ///     .constructor(|_: ()| English)
    ///     .provides::<dyn Greeter, _>(|this| this as Arc<dyn Greeter>)
    ///     .build();
    /// assert_eq!(descriptor.capabilities().len(), 1);
    /// ```
    pub fn provides<C, F>(mut self, cast: F) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<C> + Send + Sync + 'static,
    {
        self.descriptor.capabilities.push(Capability::new::<T, C, F>(cast));
        self
    }

    /// Finish the descriptor
    #[inline]
    pub fn build(self) -> ComponentDescriptor {
        self.descriptor
    }
}

impl<T> From<ComponentBuilder<T>> for ComponentDescriptor {
    #[inline]
    fn from(builder: ComponentBuilder<T>) -> Self {
        builder.descriptor
    }
}

/// A type that describes itself as a component.
///
/// Implement by hand or with `#[derive(Component)]` (feature `derive`).
pub trait Component: Send + Sync + Sized + 'static {
    fn descriptor() -> ComponentDescriptor;

    /// Bean name under the naming convention
    #[inline]
    fn bean_name() -> String {
        bean_name_of::<Self>()
    }
}

// =============================================================================
// Factory Descriptor
// =============================================================================

/// Describes a factory operation: a named operation declared on an owner
/// type whose return value becomes a bean. The bean name is the literal
/// operation name.
#[derive(Clone, Debug)]
pub struct FactoryDescriptor {
    pub(crate) name: String,
    pub(crate) owner: String,
    pub(crate) is_static: bool,
    pub(crate) produces: TypeDescriptor,
    pub(crate) capabilities: Vec<Capability>,
    pub(crate) constructor: Constructor,
}

impl FactoryDescriptor {
    /// Start describing operation `operation` on `Owner`, producing `T`.
    #[inline]
    pub fn new<Owner, T>(operation: impl Into<String>) -> FactoryBuilder<Owner, T>
    where
        Owner: Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        FactoryBuilder {
            name: operation.into(),
            owner: bean_name_of::<Owner>(),
            capabilities: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Operation name, which is also the bean name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bean name of the declaring type
    #[inline]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    #[inline]
    pub fn produces(&self) -> TypeDescriptor {
        self.produces
    }

    #[inline]
    pub fn params(&self) -> &[TypeDescriptor] {
        &self.constructor.params
    }
}

/// Typed builder for a [`FactoryDescriptor`]
pub struct FactoryBuilder<Owner, T> {
    name: String,
    owner: String,
    capabilities: Vec<Capability>,
    _marker: PhantomData<fn() -> (Arc<Owner>, T)>,
}

impl<Owner, T> FactoryBuilder<Owner, T>
where
    Owner: Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    /// Declare that the produced bean can be injected wherever `C` is requested.
    pub fn provides<C, F>(mut self, cast: F) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<C> + Send + Sync + 'static,
    {
        self.capabilities.push(Capability::new::<T, C, F>(cast));
        self
    }

    /// A static operation: the owner is never resolved.
    pub fn function<P, R, F>(self, f: F) -> FactoryDescriptor
    where
        P: Params,
        R: Produce<T>,
        F: Fn(P) -> R + Send + Sync + 'static,
    {
        let invoke = invoker(move |_owner, args| {
            let params = P::extract(args)?;
            Ok(f(params).produce()?.map(|value| erase(Arc::new(value))))
        });

        self.finish(true, P::types(), invoke)
    }

    /// An instance operation: the owner bean is resolved first and passed in.
    pub fn method<P, R, F>(self, f: F) -> FactoryDescriptor
    where
        P: Params,
        R: Produce<T>,
        F: Fn(Arc<Owner>, P) -> R + Send + Sync + 'static,
    {
        let owner_name = self.owner.clone();
        let invoke = invoker(move |owner, args| {
            let owner = owner.and_then(unerase::<Owner>).ok_or_else(|| -> BoxError {
                Box::new(BeanError::TypeMismatch {
                    name: owner_name.clone(),
                    requested: std::any::type_name::<Owner>(),
                    actual: "an unrelated type",
                })
            })?;
            let params = P::extract(args)?;
            Ok(f(owner, params).produce()?.map(|value| erase(Arc::new(value))))
        });

        self.finish(false, P::types(), invoke)
    }

    fn finish(self, is_static: bool, params: Vec<TypeDescriptor>, invoke: InvokeFn) -> FactoryDescriptor {
        FactoryDescriptor {
            name: self.name,
            owner: self.owner,
            is_static,
            produces: TypeDescriptor::of::<T>(),
            capabilities: self.capabilities,
            constructor: Constructor { params, invoke },
        }
    }
}

// =============================================================================
// Descriptor Set and Source
// =============================================================================

/// The full descriptor set handed to a context at `init()`.
#[derive(Clone, Debug, Default)]
pub struct Descriptors {
    components: Vec<ComponentDescriptor>,
    factories: Vec<FactoryDescriptor>,
}

impl Descriptors {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component descriptor
    pub fn component(mut self, descriptor: impl Into<ComponentDescriptor>) -> Self {
        self.components.push(descriptor.into());
        self
    }

    /// Add the descriptor of a [`Component`] type
    #[inline]
    pub fn component_of<T: Component>(self) -> Self {
        self.component(T::descriptor())
    }

    /// Add a factory descriptor
    pub fn factory(mut self, descriptor: FactoryDescriptor) -> Self {
        self.factories.push(descriptor);
        self
    }

    #[inline]
    pub fn components(&self) -> &[ComponentDescriptor] {
        &self.components
    }

    #[inline]
    pub fn factories(&self) -> &[FactoryDescriptor] {
        &self.factories
    }

    /// Total number of descriptors
    #[inline]
    pub fn len(&self) -> usize {
        self.components.len() + self.factories.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.factories.is_empty()
    }

    #[inline]
    pub(crate) fn into_parts(self) -> (Vec<ComponentDescriptor>, Vec<FactoryDescriptor>) {
        (self.components, self.factories)
    }
}

/// Produces the descriptor set. Called once, by `Context::init()`.
pub trait DescriptorSource: Send {
    fn discover(&mut self) -> std::result::Result<Descriptors, BoxError>;
}

// A hand-written list hands itself over on first discovery
impl DescriptorSource for Descriptors {
    fn discover(&mut self) -> std::result::Result<Descriptors, BoxError> {
        Ok(std::mem::take(self))
    }
}

impl<F> DescriptorSource for F
where
    F: FnMut() -> std::result::Result<Descriptors, BoxError> + Send,
{
    fn discover(&mut self) -> std::result::Result<Descriptors, BoxError> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> &'static str;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> &'static str {
            "hello"
        }
    }

    struct Config;

    #[allow(dead_code)]
    struct Mailer {
        config: Arc<Config>,
    }

    #[test]
    fn test_type_descriptor_names() {
        let ty = TypeDescriptor::of::<Mailer>();
        assert_eq!(ty.simple_name(), "Mailer");
        assert_eq!(ty.bean_name(), "mailer");
        assert_eq!(TypeDescriptor::of::<dyn Greeter>().bean_name(), "greeter");
        assert_ne!(ty, TypeDescriptor::of::<Config>());
    }

    #[test]
    fn test_component_collects_constructors() {
        let descriptor = ComponentDescriptor::of::<Mailer>()
            .constructor(|config: Arc<Config>| Mailer { config })
            .constructor(|_: ()| Mailer {
                config: Arc::new(Config),
            })
            .build();

        assert_eq!(descriptor.name(), "mailer");
        assert_eq!(descriptor.produces(), TypeDescriptor::of::<Mailer>());
        assert_eq!(descriptor.constructors().len(), 2);
        assert_eq!(descriptor.constructors()[0].params(), &[TypeDescriptor::of::<Config>()]);
        assert!(descriptor.constructors()[1].params().is_empty());
    }

    #[test]
    fn test_constructor_invocation_wraps_value() {
        let descriptor = ComponentDescriptor::of::<Config>()
            .constructor(|_: ()| Config)
            .build();

        let bean = (descriptor.constructors()[0].invoke)(None, &Args::new(Vec::new()))
            .unwrap()
            .unwrap();
        assert!(unerase::<Config>(&bean).is_some());
    }

    #[test]
    fn test_capability_cast() {
        let descriptor = ComponentDescriptor::of::<English>()
            .constructor(|_: ()| English)
            .provides::<dyn Greeter, _>(|this| this as Arc<dyn Greeter>)
            .build();

        let capability = &descriptor.capabilities()[0];
        assert_eq!(capability.type_descriptor(), TypeDescriptor::of::<dyn Greeter>());

        let bean = erase(Arc::new(English));
        let view = (capability.cast)(&bean).unwrap();
        assert_eq!(unerase::<dyn Greeter>(&view).unwrap().greet(), "hello");
    }

    #[test]
    fn test_factory_method_and_function() {
        let method = FactoryDescriptor::new::<Config, English>("english")
            .method(|_config: Arc<Config>, _: ()| English);
        assert_eq!(method.name(), "english");
        assert_eq!(method.owner(), "config");
        assert!(!method.is_static());

        let function = FactoryDescriptor::new::<Config, English>("plainEnglish")
            .function(|_: ()| Some(English));
        assert!(function.is_static());
        assert!(function.params().is_empty());
    }

    #[test]
    fn test_factory_method_rejects_wrong_owner() {
        let method = FactoryDescriptor::new::<Config, English>("english")
            .method(|_config: Arc<Config>, _: ()| English);

        let wrong_owner = erase(Arc::new(English));
        let result = (method.constructor.invoke)(Some(&wrong_owner), &Args::new(Vec::new()));
        assert!(result.is_err());
    }

    #[test]
    fn test_descriptors_source_drains_once() {
        let mut descriptors = Descriptors::new()
            .component(ComponentDescriptor::of::<Config>().constructor(|_: ()| Config));
        assert_eq!(descriptors.len(), 1);

        let first = descriptors.discover().unwrap();
        assert_eq!(first.len(), 1);
        assert!(descriptors.discover().unwrap().is_empty());
    }
}
