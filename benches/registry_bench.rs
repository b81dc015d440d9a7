use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use packed_ecs::{Access, Entity, PackedStorage, Query, Registry, Result, Subflow, System};

#[derive(Debug, Default, Clone, Copy)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Default, Clone, Copy)]
struct Velocity {
    x: f32,
    y: f32,
}

struct Integrate;

impl System for Integrate {
    fn run(&mut self, access: &Access<'_>, _: &Query<'_>, subflow: &Subflow) -> Result<()> {
        let velocities = access.read::<Velocity>()?;
        let velocities: &PackedStorage<Velocity> = &velocities;
        let mut positions = access.write::<Position>()?;
        let owners = positions.entities().to_vec();
        subflow.for_each_chunk(positions.as_mut_slice(), 1024, |offset, chunk| {
            for (i, pos) in chunk.iter_mut().enumerate() {
                if let Ok(vel) = velocities.get(owners[offset + i]) {
                    pos.x += vel.x;
                    pos.y += vel.y;
                }
            }
        });
        Ok(())
    }
}

/// Simulated independent work
struct Busy<const N: usize>;

impl<const N: usize> System for Busy<N> {
    fn run(&mut self, _: &Access<'_>, _: &Query<'_>, _: &Subflow) -> Result<()> {
        let mut x = 0u64;
        for i in 0..100_000u64 {
            x = x.wrapping_add(black_box(i));
        }
        black_box(x);
        Ok(())
    }
}

fn bench_storage(c: &mut Criterion) {
    let mut group = c.benchmark_group("packed_storage");

    for count in [1_000u32, 10_000] {
        group.bench_with_input(BenchmarkId::new("insert_remove", count), &count, |b, &count| {
            b.iter(|| {
                let mut storage = PackedStorage::with_capacity(count as usize);
                for i in 0..count {
                    storage.insert(Entity::from_raw(i), Position::default()).unwrap();
                }
                for i in (0..count).step_by(2) {
                    storage.remove(Entity::from_raw(i)).unwrap();
                }
                black_box(storage.len())
            })
        });
    }

    group.finish();
}

fn bench_entities(c: &mut Criterion) {
    c.bench_function("create_destroy_1k", |b| {
        let registry = Registry::new();
        registry.register_component::<Position>().unwrap();
        b.iter(|| {
            let entities: Vec<_> = (0..1_000)
                .map(|_| registry.create_entity().with::<Position>().unwrap().build())
                .collect();
            for entity in entities {
                registry.destroy_entity(entity).unwrap();
            }
        })
    });
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    let registry = Registry::new();
    registry.register_component::<Position>().unwrap();
    registry.register_component::<Velocity>().unwrap();
    for i in 0..50_000 {
        registry
            .create_entity()
            .with::<Position>()
            .unwrap()
            .with_value(Velocity { x: i as f32, y: 1.0 })
            .unwrap();
    }
    registry.register_system(Integrate).unwrap();

    group.bench_function("integrate_50k", |b| b.iter(|| registry.run().unwrap()));

    let independent = Registry::new();
    independent.register_system(Busy::<0>).unwrap();
    independent.register_system(Busy::<1>).unwrap();
    independent.register_system(Busy::<2>).unwrap();
    independent.register_system(Busy::<3>).unwrap();
    group.bench_function("independent_4", |b| b.iter(|| independent.run().unwrap()));

    let chained = Registry::new();
    chained.register_system(Busy::<0>).unwrap();
    chained.register_system(Busy::<1>).unwrap();
    chained.register_system(Busy::<2>).unwrap();
    chained.register_system(Busy::<3>).unwrap();
    chained.precede::<Busy<0>, Busy<1>>().unwrap();
    chained.precede::<Busy<1>, Busy<2>>().unwrap();
    chained.precede::<Busy<2>, Busy<3>>().unwrap();
    group.bench_function("chained_4", |b| b.iter(|| chained.run().unwrap()));

    group.finish();
}

criterion_group!(benches, bench_storage, bench_entities, bench_tick);
criterion_main!(benches);
