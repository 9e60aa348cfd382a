//! `#[derive(Component)]` against a live context
//!
//! Run with:
//!   cargo test --features derive --test derive

#![cfg(feature = "derive")]

use ioc_context::{BeanError, Component, Context, Descriptors};
use std::sync::Arc;

trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

#[derive(Component, Default)]
#[component(provides(dyn Clock))]
struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        42
    }
}

#[derive(Component)]
struct Settings {
    retries: u32,
}

#[derive(Component)]
struct Scheduler {
    #[inject]
    clock: Arc<dyn Clock>,
    #[inject]
    settings: Arc<Settings>,
    // Non-injected field uses Default
    ticks: u64,
}

#[derive(Component)]
struct Worker {
    #[inject]
    scheduler: Arc<Scheduler>,
}

fn context() -> Context {
    let context = Context::new(
        Descriptors::new()
            .component_of::<FixedClock>()
            .component_of::<Settings>()
            .component_of::<Scheduler>()
            .component_of::<Worker>(),
    );
    context.init().unwrap();
    context
}

#[test]
fn test_descriptor_shape() {
    let descriptor = Scheduler::descriptor();
    assert_eq!(descriptor.name(), "scheduler");
    assert_eq!(descriptor.constructors().len(), 1);
    assert_eq!(descriptor.constructors()[0].params().len(), 2);

    let clock = FixedClock::descriptor();
    assert_eq!(clock.capabilities().len(), 1);
    assert!(clock.constructors()[0].params().is_empty());
    assert_eq!(FixedClock::bean_name(), "fixedClock");
}

#[test]
fn test_derived_components_wire() {
    let context = context();

    let worker = context.get::<Worker>("worker").unwrap();
    let scheduler = context.get::<Scheduler>("scheduler").unwrap();

    assert!(Arc::ptr_eq(&worker.scheduler, &scheduler));
    assert_eq!(scheduler.clock.now(), 42);
    assert_eq!(scheduler.settings.retries, 0);
    assert_eq!(scheduler.ticks, 0);
}

#[test]
fn test_capability_resolves_to_same_instance() {
    let context = context();

    let scheduler = context.get::<Scheduler>("scheduler").unwrap();
    let clock = context.get::<dyn Clock>("fixedClock").unwrap();
    assert!(Arc::ptr_eq(&scheduler.clock, &clock));
}

#[test]
fn test_missing_injected_type() {
    let context = Context::new(Descriptors::new().component_of::<Worker>());
    context.init().unwrap();

    assert!(matches!(
        context.get::<Worker>("worker"),
        Err(BeanError::MissingDependency { bean, .. }) if bean == "worker"
    ));
}
