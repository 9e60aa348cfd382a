//! # ioc-context - A Minimal Inversion-of-Control Engine
//!
//! Named, lazily constructed, singleton beans wired together by parameter
//! type.
//!
//! ## Features
//!
//! - **Descriptor driven** - Components and factory operations are described
//!   up front; `init()` turns them into bean definitions once
//! - **Lazy singletons** - A bean is built on its first `get()` and shared
//!   after that
//! - **Constructor injection** - The richest constructor is used; every
//!   parameter is resolved by type
//! - **Factories** - Static or instance operations whose return value becomes
//!   a bean under the operation's name
//! - **Capabilities** - Beans can be injected as `dyn Trait`
//! - **Cycle detection** - Cyclic graphs fail with the full path instead of
//!   overflowing the stack
//! - **Concurrent** - `DashMap` registry with per-name `OnceCell` slots: at
//!   most one construction per bean, even under contention
//! - **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use ioc_context::{ComponentDescriptor, Context, Descriptors, FactoryDescriptor};
//! use std::sync::Arc;
//!
//! struct Settings {
//!     url: &'static str,
//! }
//!
//! struct Database {
//!     url: &'static str,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let context = Context::new(
//!     Descriptors::new()
//!         .component(ComponentDescriptor::of::<Settings>().constructor(|_: ()| Settings {
//!             url: "postgres://localhost",
//!         }))
//!         .component(
//!             ComponentDescriptor::of::<UserService>()
//!                 .constructor(|db: Arc<Database>| UserService { db }),
//!         )
//!         // Instance factory: "settings" is resolved first and passed in
//!         .factory(
//!             FactoryDescriptor::new::<Settings, Database>("database")
//!                 .method(|settings: Arc<Settings>, _: ()| Database { url: settings.url }),
//!         ),
//! );
//! context.init().unwrap();
//!
//! let users = context.get::<UserService>("userService").unwrap();
//! let db = context.get::<Database>("database").unwrap();
//! assert!(Arc::ptr_eq(&users.db, &db));
//! ```
//!
//! ## Capabilities
//!
//! ```rust
//! use ioc_context::{ComponentDescriptor, Context, Descriptors};
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         "hello".into()
//!     }
//! }
//!
//! struct Door {
//!     greeter: Arc<dyn Greeter>,
//! }
//!
//! let context = Context::new(
//!     Descriptors::new()
//!         .component(
//!             ComponentDescriptor::of::<English>()
//!                 .constructor(|_: ()| English)
//!                 .provides::<dyn Greeter, _>(|this| this as Arc<dyn Greeter>),
//!         )
//!         .component(
//!             ComponentDescriptor::of::<Door>()
//!                 .constructor(|greeter: Arc<dyn Greeter>| Door { greeter }),
//!         ),
//! );
//! context.init().unwrap();
//!
//! assert_eq!(context.get::<Door>("door").unwrap().greeter.greet(), "hello");
//! ```
//!
//! ## Naming
//!
//! - Components: the simple type name with its first character lowercased
//!   (`UserService` becomes `userService`)
//! - Factory operations: the operation name as given
//!
//! When several beans satisfy a parameter, the one whose name matches the
//! parameter type's conventional name wins; otherwise resolution fails with
//! [`BeanError::AmbiguousDependency`].

mod config;
mod context;
mod definition;
mod descriptor;
mod error;
#[cfg(feature = "logging")]
pub mod logging;
pub mod naming;
mod params;
mod registry;
mod resolver;

pub use config::*;
pub use context::*;
pub use definition::*;
pub use descriptor::*;
pub use error::*;
pub use params::{Args, Bean, Params, Produce, Produced};
pub use registry::*;
pub use resolver::*;

#[cfg(feature = "derive")]
pub use ioc_context_derive::Component;

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BeanError, Component, ComponentDescriptor, Context, ContextConfig, DescriptorSource,
        Descriptors, FactoryDescriptor, Result,
    };
    pub use std::sync::Arc;
}
