#![allow(dead_code, unused_imports)]

use packed_ecs::{Access, Query, Registry, Result, Subflow, System};
use std::time::Instant;

#[derive(Debug, Default, Clone)]
struct Position(f32, f32, f32);

#[derive(Debug, Default, Clone)]
struct Velocity(f32, f32, f32);

struct Movement;

impl System for Movement {
    fn run(&mut self, access: &Access<'_>, _: &Query<'_>, _: &Subflow) -> Result<()> {
        let velocities = access.read::<Velocity>()?;
        let mut positions = access.write::<Position>()?;
        for (entity, pos) in positions.iter_mut() {
            let vel = velocities.get(entity)?;
            pos.0 += vel.0;
            pos.1 += vel.1;
            pos.2 += vel.2;
        }
        Ok(())
    }
}

#[cfg(feature = "profiling")]
#[tracing::instrument(skip(registry))]
fn populate(registry: &Registry, count: usize) -> Result<()> {
    for i in 0..count {
        if i % 1_000 == 0 {
            tracing::info!("Creating entity {}/{}", i, count);
        }
        registry
            .create_entity()
            .with::<Position>()?
            .with_value(Velocity(1.0, 0.0, 0.0))?;
    }
    Ok(())
}

#[cfg(feature = "profiling")]
fn main() -> Result<()> {
    let _guard = packed_ecs::profiling::init_file_subscriber("trace.json")?;

    let registry = Registry::new();
    registry.register_component::<Position>()?;
    registry.register_component::<Velocity>()?;
    registry.register_system(Movement)?;

    populate(&registry, 10_000)?;

    println!("Profiling 100 ticks over 10k entities...");
    let start = Instant::now();
    for _ in 0..100 {
        registry.run()?;
    }
    println!("100 ticks complete in: {:?}", start.elapsed());
    Ok(())
}

#[cfg(not(feature = "profiling"))]
fn main() {
    println!("profile_tick binary requires --features profiling");
}
