use std::hint::black_box;

use criterion::*;
use raccoon_ecs::EntityManager;

mod common;
use common::*;

fn spawn_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");

    group.bench_function("spawn_1M_entities", |b| {
        b.iter(|| {
            let mut manager = EntityManager::new(factory());
            for _ in 0..ENTITIES_MED {
                let entity = manager.add_entity();
                manager.add_component_value(entity, Position { x: 0.0, y: 0.0 });
            }
            black_box(manager);
        });
    });

    group.bench_function("clone_100k_entities", |b| {
        let source = populated_store(ENTITIES_SMALL);
        b.iter(|| {
            let mut copy = EntityManager::new(factory());
            copy.override_by(&source).unwrap();
            black_box(copy);
        });
    });

    group.finish();
}

criterion_group!(benches, spawn_benchmark);
criterion_main!(benches);
