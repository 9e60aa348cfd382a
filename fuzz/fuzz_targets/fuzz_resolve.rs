#![no_main]

//! Fuzz target for resolving arbitrary bean graphs
//!
//! Builds components and factories with arbitrary dependency edges (cycles,
//! missing types, duplicate names, failing constructors) and checks that
//! resolution never panics or hangs, and that a graph which passes
//! `verify()` only fails at construction time.

use arbitrary::Arbitrary;
use ioc_context::{
    Args, BeanError, ComponentDescriptor, Context, ContextConfig, Descriptors, FactoryDescriptor,
    TypeDescriptor,
};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

#[derive(Default)]
struct N0;
#[derive(Default)]
struct N1;
#[derive(Default)]
struct N2;
#[derive(Default)]
struct N3;
#[derive(Default)]
struct N4;
#[derive(Default)]
struct N5;

/// Call `$f::<Nk>(args)` for node kind `k`
macro_rules! with_node {
    ($kind:expr, $f:ident ( $($arg:expr),* )) => {
        match $kind % 6 {
            0 => $f::<N0>($($arg),*),
            1 => $f::<N1>($($arg),*),
            2 => $f::<N2>($($arg),*),
            3 => $f::<N3>($($arg),*),
            4 => $f::<N4>($($arg),*),
            _ => $f::<N5>($($arg),*),
        }
    };
}

/// Factory bean names; some collide with component names on purpose
const FACTORY_NAMES: &[&str] = &["n1", "n3", "widget", "gadget", "store"];

#[derive(Debug, Arbitrary)]
struct NodeSpec {
    kind: u8,
    deps: Vec<u8>,
    fails: bool,
}

#[derive(Debug, Arbitrary)]
struct FactorySpec {
    name: u8,
    produces: u8,
    owned: bool,
    returns_none: bool,
}

#[derive(Debug, Arbitrary)]
struct Graph {
    nodes: Vec<NodeSpec>,
    factories: Vec<FactorySpec>,
    replace_duplicates: bool,
    poison_failures: bool,
    requests: Vec<u8>,
}

fn type_of<T: 'static>() -> TypeDescriptor {
    TypeDescriptor::of::<T>()
}

fn component<T: Default + Send + Sync + 'static>(deps: Vec<TypeDescriptor>, fails: bool) -> ComponentDescriptor {
    let expected = deps.len();
    ComponentDescriptor::of::<T>()
        .constructor_with(deps, move |args: &Args| {
            assert_eq!(args.len(), expected);
            if fails { Err("constructor failed") } else { Ok(T::default()) }
        })
        .build()
}

fn factory<T: Default + Send + Sync + 'static>(name: &str, owned: bool, returns_none: bool) -> FactoryDescriptor {
    let builder = FactoryDescriptor::new::<N0, T>(name);
    if owned {
        builder.method(move |_owner: Arc<N0>, _: ()| (!returns_none).then(T::default))
    } else {
        builder.function(move |_: ()| (!returns_none).then(T::default))
    }
}

fuzz_target!(|graph: Graph| {
    let mut descriptors = Descriptors::new();

    for node in graph.nodes.iter().take(12) {
        let deps = node
            .deps
            .iter()
            .take(4)
            .map(|dep| with_node!(*dep, type_of()))
            .collect::<Vec<_>>();
        descriptors = descriptors.component(with_node!(node.kind, component(deps, node.fails)));
    }

    for spec in graph.factories.iter().take(6) {
        let name = FACTORY_NAMES[spec.name as usize % FACTORY_NAMES.len()];
        descriptors = descriptors.factory(with_node!(spec.produces, factory(name, spec.owned, spec.returns_none)));
    }

    let mut config = ContextConfig::new();
    if graph.replace_duplicates {
        config = config.replace_duplicates();
    }
    if graph.poison_failures {
        config = config.poison_failures();
    }

    let context = Context::with_config(descriptors, config);
    if context.init().is_err() {
        return;
    }

    let names = context.bean_names();
    if names.is_empty() {
        return;
    }

    let verified = context.verify();

    for request in graph.requests.iter().take(16) {
        let name = &names[*request as usize % names.len()];
        let result = context.get_bean(name);

        match (&verified, &result) {
            (Ok(()), Err(err)) => assert!(
                matches!(
                    err,
                    BeanError::ConstructionFailure { .. } | BeanError::NullFactoryResult { .. }
                ),
                "verified graph failed with {err}"
            ),
            (Ok(()), Ok(bean)) => {
                let again = context.get_bean(name).expect("cached bean");
                assert!(Arc::ptr_eq(bean, &again));
            }
            _ => {}
        }
    }
});
