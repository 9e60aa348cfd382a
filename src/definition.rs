//! Bean definitions
//!
//! A definition is the recipe for one named bean. Components become
//! [`ClassDefinition`]s, factory operations become [`FactoryDefinition`]s.
//! Both are immutable once built.

use crate::descriptor::{Capability, ComponentDescriptor, Constructor, FactoryDescriptor, TypeDescriptor};
use crate::params::{Args, Bean, Produced};
use crate::{BeanError, Result};

/// Recipe for a component: every constructor it offers, with the richest
/// one selected up front.
#[derive(Clone, Debug)]
pub struct ClassDefinition {
    name: String,
    produces: TypeDescriptor,
    capabilities: Vec<Capability>,
    constructors: Vec<Constructor>,
    selected: usize,
}

impl ClassDefinition {
    /// Build from a component descriptor.
    ///
    /// Fails with `NoConstructor` if the component offers no constructor.
    pub fn new(descriptor: ComponentDescriptor) -> Result<Self> {
        let selected = select_constructor(&descriptor.constructors).ok_or_else(|| {
            BeanError::NoConstructor {
                name: descriptor.name.clone(),
            }
        })?;

        Ok(Self {
            name: descriptor.name,
            produces: descriptor.produces,
            capabilities: descriptor.capabilities,
            constructors: descriptor.constructors,
            selected,
        })
    }

    /// The constructor used to build this bean
    #[inline]
    pub fn constructor(&self) -> &Constructor {
        &self.constructors[self.selected]
    }

    #[inline]
    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }
}

/// Pick the constructor with the most parameters; the first declared wins a tie.
fn select_constructor(constructors: &[Constructor]) -> Option<usize> {
    constructors
        .iter()
        .enumerate()
        .rev()
        .max_by_key(|(_, constructor)| constructor.params.len())
        .map(|(index, _)| index)
}

/// Recipe for a bean produced by a factory operation.
#[derive(Clone, Debug)]
pub struct FactoryDefinition {
    name: String,
    owner: String,
    is_static: bool,
    produces: TypeDescriptor,
    capabilities: Vec<Capability>,
    operation: Constructor,
}

impl FactoryDefinition {
    pub fn new(descriptor: FactoryDescriptor) -> Self {
        Self {
            name: descriptor.name,
            owner: descriptor.owner,
            is_static: descriptor.is_static,
            produces: descriptor.produces,
            capabilities: descriptor.capabilities,
            operation: descriptor.constructor,
        }
    }

    /// Bean name of the declaring type
    #[inline]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Whether the operation runs without an owner instance
    #[inline]
    pub fn is_static(&self) -> bool {
        self.is_static
    }
}

/// How to produce one named bean
#[derive(Clone, Debug)]
pub enum BeanDefinition {
    /// Built by calling a component constructor
    Class(ClassDefinition),
    /// Built by calling a factory operation
    Factory(FactoryDefinition),
}

impl BeanDefinition {
    /// Canonical bean name
    #[inline]
    pub fn name(&self) -> &str {
        match self {
            BeanDefinition::Class(def) => &def.name,
            BeanDefinition::Factory(def) => &def.name,
        }
    }

    /// The type this definition produces
    #[inline]
    pub fn produces(&self) -> TypeDescriptor {
        match self {
            BeanDefinition::Class(def) => def.produces,
            BeanDefinition::Factory(def) => def.produces,
        }
    }

    #[inline]
    pub fn capabilities(&self) -> &[Capability] {
        match self {
            BeanDefinition::Class(def) => &def.capabilities,
            BeanDefinition::Factory(def) => &def.capabilities,
        }
    }

    /// Every type this bean can be injected as: its own type first, then
    /// its declared capabilities.
    pub fn provided_types(&self) -> impl Iterator<Item = TypeDescriptor> + '_ {
        std::iter::once(self.produces()).chain(self.capabilities().iter().map(|c| c.ty))
    }

    /// Whether the produced bean satisfies a request for `ty`
    pub fn is_assignable_to(&self, ty: &TypeDescriptor) -> bool {
        self.provided_types().any(|provided| provided == *ty)
    }

    /// Parameter types of the selected constructor or the factory operation
    #[inline]
    pub fn parameters(&self) -> &[TypeDescriptor] {
        match self {
            BeanDefinition::Class(def) => &def.constructor().params,
            BeanDefinition::Factory(def) => &def.operation.params,
        }
    }

    /// Owner bean that must be resolved before invocation, for instance
    /// factory operations only
    #[inline]
    pub fn owner(&self) -> Option<&str> {
        match self {
            BeanDefinition::Factory(def) if !def.is_static => Some(def.owner.as_str()),
            _ => None,
        }
    }

    /// Short label for logs
    #[inline]
    pub fn kind(&self) -> &'static str {
        match self {
            BeanDefinition::Class(_) => "class",
            BeanDefinition::Factory(def) if def.is_static => "static_factory",
            BeanDefinition::Factory(_) => "factory",
        }
    }

    /// Run the constructor or operation with resolved arguments
    #[inline]
    pub(crate) fn invoke(&self, owner: Option<&Bean>, args: &Args) -> Produced<Bean> {
        match self {
            BeanDefinition::Class(def) => (def.constructor().invoke)(None, args),
            BeanDefinition::Factory(def) => (def.operation.invoke)(owner, args),
        }
    }

    /// View an instance produced by this definition as `ty`.
    ///
    /// Returns `None` if `ty` is neither the produced type nor a declared
    /// capability.
    pub(crate) fn view_as(&self, instance: &Bean, ty: &TypeDescriptor) -> Option<Bean> {
        if self.produces() == *ty {
            return Some(Bean::clone(instance));
        }

        self.capabilities()
            .iter()
            .find(|capability| capability.ty == *ty)
            .and_then(|capability| (capability.cast)(instance))
    }
}

impl TryFrom<ComponentDescriptor> for BeanDefinition {
    type Error = BeanError;

    fn try_from(descriptor: ComponentDescriptor) -> Result<Self> {
        ClassDefinition::new(descriptor).map(BeanDefinition::Class)
    }
}

impl From<FactoryDescriptor> for BeanDefinition {
    fn from(descriptor: FactoryDescriptor) -> Self {
        BeanDefinition::Factory(FactoryDefinition::new(descriptor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{erase, unerase};
    use std::sync::Arc;

    trait Shape: Send + Sync {
        fn sides(&self) -> u32;
    }

    struct Square;

    impl Shape for Square {
        fn sides(&self) -> u32 {
            4
        }
    }

    #[allow(dead_code)]
    struct Palette;
    struct Canvas;

    #[allow(dead_code)]
    struct Painter {
        label: &'static str,
    }

    #[test]
    fn test_richest_constructor_selected() {
        let descriptor = ComponentDescriptor::of::<Painter>()
            .constructor(|_: ()| Painter { label: "none" })
            .constructor(|(_p, _c): (Arc<Palette>, Arc<Canvas>)| Painter { label: "both" })
            .constructor(|_p: Arc<Palette>| Painter { label: "palette" })
            .build();

        let definition = BeanDefinition::try_from(descriptor).unwrap();
        assert_eq!(definition.parameters().len(), 2);
        assert_eq!(definition.kind(), "class");
    }

    #[test]
    fn test_constructor_tie_keeps_first_declared() {
        let descriptor = ComponentDescriptor::of::<Painter>()
            .constructor(|_p: Arc<Palette>| Painter { label: "palette" })
            .constructor(|_c: Arc<Canvas>| Painter { label: "canvas" })
            .build();

        let definition = BeanDefinition::try_from(descriptor).unwrap();
        assert_eq!(definition.parameters(), &[TypeDescriptor::of::<Palette>()]);
    }

    #[test]
    fn test_component_without_constructor_rejected() {
        let descriptor = ComponentDescriptor::of::<Painter>().build();
        let err = BeanDefinition::try_from(descriptor).unwrap_err();
        assert!(matches!(err, BeanError::NoConstructor { name } if name == "painter"));
    }

    #[test]
    fn test_assignability_and_view() {
        let descriptor = ComponentDescriptor::of::<Square>()
            .constructor(|_: ()| Square)
            .provides::<dyn Shape, _>(|this| this as Arc<dyn Shape>)
            .build();
        let definition = BeanDefinition::try_from(descriptor).unwrap();

        assert!(definition.is_assignable_to(&TypeDescriptor::of::<Square>()));
        assert!(definition.is_assignable_to(&TypeDescriptor::of::<dyn Shape>()));
        assert!(!definition.is_assignable_to(&TypeDescriptor::of::<Canvas>()));

        let instance = erase(Arc::new(Square));
        let shape = definition
            .view_as(&instance, &TypeDescriptor::of::<dyn Shape>())
            .unwrap();
        assert_eq!(unerase::<dyn Shape>(&shape).unwrap().sides(), 4);
        assert!(definition.view_as(&instance, &TypeDescriptor::of::<Canvas>()).is_none());
    }

    #[test]
    fn test_factory_owner_only_for_instance_operations() {
        let method: BeanDefinition = FactoryDescriptor::new::<Palette, Canvas>("canvas")
            .method(|_palette: Arc<Palette>, _: ()| Canvas)
            .into();
        let function: BeanDefinition = FactoryDescriptor::new::<Palette, Canvas>("blankCanvas")
            .function(|_: ()| Canvas)
            .into();

        assert_eq!(method.owner(), Some("palette"));
        assert_eq!(method.kind(), "factory");
        assert_eq!(function.owner(), None);
        assert_eq!(function.kind(), "static_factory");
        assert_eq!(function.name(), "blankCanvas");
    }
}
