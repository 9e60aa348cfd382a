//! Typed arguments for constructors and factory operations
//!
//! The registry stores every bean type-erased. A value handed to a
//! constructor is always an `Arc<dyn Any>` wrapping an `Arc<P>`, where `P`
//! is the declared parameter type. That holds for trait objects too, so
//! `Arc<dyn Greeter>` parameters work the same way as concrete ones.
//!
//! # Supported Parameter Shapes
//!
//! - `()` - No dependencies
//! - `Arc<T>` - Single dependency
//! - `(Arc<A>, Arc<B>, ...)` - Multiple dependencies (tuples up to 8)

use crate::descriptor::TypeDescriptor;
use crate::{BeanError, BoxError, Result};
use std::any::Any;
use std::sync::Arc;

/// A type-erased bean instance as stored in the registry
pub type Bean = Arc<dyn Any + Send + Sync>;

/// Outcome of running a constructor or factory operation
pub type Produced<T> = std::result::Result<Option<T>, BoxError>;

/// Erase a shared value into a `Bean`
#[inline]
pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Bean {
    Arc::new(value)
}

/// Recover the `Arc<T>` previously passed to [`erase`]
#[inline]
pub(crate) fn unerase<T: ?Sized + Send + Sync + 'static>(bean: &Bean) -> Option<Arc<T>> {
    bean.downcast_ref::<Arc<T>>().cloned()
}

// =============================================================================
// Args
// =============================================================================

/// Resolved arguments for one constructor or factory invocation, in
/// declaration order.
pub struct Args {
    values: Vec<Bean>,
}

impl Args {
    #[inline]
    pub(crate) fn new(values: Vec<Bean>) -> Self {
        Self { values }
    }

    /// Number of resolved arguments
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no arguments
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the argument at `index` as its declared parameter type.
    pub fn get<P: ?Sized + Send + Sync + 'static>(&self, index: usize) -> Result<Arc<P>> {
        let value = self.values.get(index).ok_or_else(|| {
            BeanError::Internal(format!(
                "argument {index} requested but only {} supplied",
                self.values.len()
            ))
        })?;

        unerase::<P>(value).ok_or_else(|| {
            BeanError::Internal(format!(
                "argument {index} is not a {}",
                std::any::type_name::<P>()
            ))
        })
    }
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args").field("len", &self.len()).finish()
    }
}

// =============================================================================
// Params - parameter lists derived from closure argument types
// =============================================================================

/// A constructor parameter list.
///
/// Implemented for `()`, `Arc<T>` and tuples of `Arc<T>`, so the parameter
/// types of a constructor are read straight off its closure signature.
pub trait Params: Sized + 'static {
    /// Parameter types in declaration order
    fn types() -> Vec<TypeDescriptor>;

    /// Pull the typed parameters out of resolved arguments
    fn extract(args: &Args) -> Result<Self>;
}

// No dependencies
impl Params for () {
    #[inline]
    fn types() -> Vec<TypeDescriptor> {
        Vec::new()
    }

    #[inline]
    fn extract(_args: &Args) -> Result<Self> {
        Ok(())
    }
}

// Single dependency
impl<A: ?Sized + Send + Sync + 'static> Params for Arc<A> {
    #[inline]
    fn types() -> Vec<TypeDescriptor> {
        vec![TypeDescriptor::of::<A>()]
    }

    #[inline]
    fn extract(args: &Args) -> Result<Self> {
        args.get::<A>(0)
    }
}

macro_rules! impl_params_tuple {
    ($($T:ident => $idx:tt),+) => {
        impl<$($T: ?Sized + Send + Sync + 'static),+> Params for ($(Arc<$T>,)+) {
            #[inline]
            fn types() -> Vec<TypeDescriptor> {
                vec![$(TypeDescriptor::of::<$T>()),+]
            }

            #[inline]
            fn extract(args: &Args) -> Result<Self> {
                Ok(($(args.get::<$T>($idx)?,)+))
            }
        }
    };
}

impl_params_tuple!(A => 0);
impl_params_tuple!(A => 0, B => 1);
impl_params_tuple!(A => 0, B => 1, C => 2);
impl_params_tuple!(A => 0, B => 1, C => 2, D => 3);
impl_params_tuple!(A => 0, B => 1, C => 2, D => 3, E => 4);
impl_params_tuple!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);
impl_params_tuple!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6);
impl_params_tuple!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6, H => 7);

// =============================================================================
// Produce - what a constructor or factory may return
// =============================================================================

/// Return types accepted from constructors and factory operations.
///
/// - `T` - always produces an instance
/// - `Option<T>` - `None` is reported as a null factory result
/// - `Result<T, E>` / `Result<Option<T>, E>` - `Err` is reported as a
///   construction failure carrying `E` as its source
pub trait Produce<T> {
    fn produce(self) -> Produced<T>;
}

impl<T> Produce<T> for T {
    #[inline]
    fn produce(self) -> Produced<T> {
        Ok(Some(self))
    }
}

impl<T> Produce<T> for Option<T> {
    #[inline]
    fn produce(self) -> Produced<T> {
        Ok(self)
    }
}

impl<T, E: Into<BoxError>> Produce<T> for std::result::Result<T, E> {
    #[inline]
    fn produce(self) -> Produced<T> {
        self.map(Some).map_err(Into::into)
    }
}

impl<T, E: Into<BoxError>> Produce<T> for std::result::Result<Option<T>, E> {
    #[inline]
    fn produce(self) -> Produced<T> {
        self.map_err(Into::into)
    }
}
