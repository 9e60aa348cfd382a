//! Benchmarks for bean resolution

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use ioc_context::{ComponentDescriptor, Context, Descriptors, FactoryDescriptor};
use std::hint::black_box;
use std::sync::Arc;

#[allow(dead_code)]
struct Config {
    value: i32,
}

#[allow(dead_code)]
struct Repository {
    config: Arc<Config>,
}

#[allow(dead_code)]
struct Service {
    repository: Arc<Repository>,
    config: Arc<Config>,
}

#[allow(dead_code)]
struct Controller {
    service: Arc<Service>,
}

#[allow(dead_code)]
struct Pool {
    size: usize,
}

fn descriptors() -> Descriptors {
    Descriptors::new()
        .component(ComponentDescriptor::of::<Config>().constructor(|_: ()| Config { value: 42 }))
        .component(
            ComponentDescriptor::of::<Repository>().constructor(|config: Arc<Config>| Repository { config }),
        )
        .component(ComponentDescriptor::of::<Service>().constructor(
            |(repository, config): (Arc<Repository>, Arc<Config>)| Service { repository, config },
        ))
        .component(
            ComponentDescriptor::of::<Controller>().constructor(|service: Arc<Service>| Controller { service }),
        )
        .factory(
            FactoryDescriptor::new::<Config, Pool>("pool")
                .method(|config: Arc<Config>, _: ()| Pool { size: config.value as usize }),
        )
}

fn started() -> Context {
    let context = Context::new(descriptors());
    context.init().unwrap();
    context
}

fn bench_init(c: &mut Criterion) {
    let mut group = c.benchmark_group("init");

    group.bench_function("five_definitions", |b| {
        b.iter(|| black_box(started()))
    });

    group.bench_function("verify", |b| {
        let context = started();
        b.iter(|| black_box(context.verify()))
    });

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    group.throughput(Throughput::Elements(1));

    group.bench_function("cached_leaf", |b| {
        let context = started();
        let _ = context.get::<Config>("config").unwrap();
        b.iter(|| black_box(context.get::<Config>("config").unwrap()))
    });

    group.bench_function("cached_factory", |b| {
        let context = started();
        let _ = context.get::<Pool>("pool").unwrap();
        b.iter(|| black_box(context.get::<Pool>("pool").unwrap()))
    });

    group.bench_function("cold_graph_depth_4", |b| {
        b.iter_with_setup(started, |context| {
            black_box(context.get::<Controller>("controller").unwrap())
        })
    });

    group.bench_function("try_get_missing", |b| {
        let context = started();
        b.iter(|| black_box(context.try_get::<Config>("missing")))
    });

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");

    group.bench_function("concurrent_reads_4", |b| {
        let context = started();
        let _ = context.get::<Controller>("controller").unwrap();

        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let c = context.clone();
                    thread::spawn(move || {
                        for _ in 0..100 {
                            let _ = c.get::<Controller>("controller").unwrap();
                        }
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }
        })
    });

    group.bench_function("concurrent_cold_4", |b| {
        b.iter_with_setup(started, |context| {
            thread::scope(|s| {
                for _ in 0..4 {
                    s.spawn(|| black_box(context.get::<Controller>("controller").unwrap()));
                }
            })
        })
    });

    group.finish();
}

criterion_group!(benches, bench_init, bench_resolution, bench_concurrent);

criterion_main!(benches);
