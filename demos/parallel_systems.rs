//! Example: precedence-ordered systems with nested parallel work
//!
//! Run with `cargo run --example parallel_systems`, or add
//! `--features profiling` to get per-system spans on stdout.

use packed_ecs::debug::Diagnostics;
use packed_ecs::prelude::*;

// Components
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

#[derive(Debug, Clone, Copy)]
struct Health {
    current: i32,
    max: i32,
}

struct MovementSystem;

impl System for MovementSystem {
    fn name(&self) -> &'static str {
        "movement_system"
    }

    fn run(&mut self, access: &Access<'_>, _query: &Query<'_>, subflow: &Subflow) -> Result<()> {
        let velocities = access.read::<Velocity>()?;
        let velocities: &PackedStorage<Velocity> = &velocities;
        let mut positions = access.write::<Position>()?;
        let owners = positions.entities().to_vec();

        subflow.for_each_chunk(positions.as_mut_slice(), 256, |offset, chunk| {
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

/// Damages everything that left the arena; must see this tick's movement
struct BoundsSystem {
    radius: f32,
}

impl System for BoundsSystem {
    fn name(&self) -> &'static str {
        "bounds_system"
    }

    fn run(&mut self, access: &Access<'_>, query: &Query<'_>, _subflow: &Subflow) -> Result<()> {
        let positions = access.read::<Position>()?;
        let mut health = access.write::<Health>()?;

        let outside = query.entities().into_filter(|e| {
            positions
                .get(e)
                .map(|p| p.x * p.x + p.y * p.y > self.radius * self.radius)
                .unwrap_or(false)
        });
        for entity in &outside {
            if let Ok(h) = health.get_mut(entity) {
                h.current -= 1;
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct ReportSystem {
    alive: usize,
    wounded: usize,
}

impl System for ReportSystem {
    fn name(&self) -> &'static str {
        "report_system"
    }

    fn run(&mut self, access: &Access<'_>, query: &Query<'_>, _subflow: &Subflow) -> Result<()> {
        let health = access.read::<Health>()?;
        let all = query.entities();
        self.alive = all.len();
        self.wounded = all
            .filter(|e| health.get(e).map(|h| h.current < h.max).unwrap_or(false))
            .len();
        Ok(())
    }
}

fn main() -> Result<()> {
    #[cfg(feature = "profiling")]
    packed_ecs::profiling::init_stdout_subscriber()?;

    let registry = Registry::with_config(RegistryConfig::default().with_worker_threads(4))?;
    registry.register_component::<Position>()?;
    registry.register_component::<Velocity>()?;
    registry.register_component::<Health>()?;

    for i in 0..10_000 {
        let angle = i as f32 * 0.01;
        registry
            .create_entity()
            .with::<Position>()?
            .with_value(Velocity {
                x: angle.cos(),
                y: angle.sin(),
            })?
            .with_value(Health {
                current: 100,
                max: 100,
            })?;
    }

    registry.register_system(MovementSystem)?;
    registry.register_system(BoundsSystem { radius: 25.0 })?;
    registry.register_default_system::<ReportSystem>()?;
    registry.precede::<MovementSystem, BoundsSystem>()?;
    registry.precede::<BoundsSystem, ReportSystem>()?;

    RegistryInspector::print_summary(&registry);

    let mut diagnostics = Diagnostics::new();
    for _ in 0..60 {
        registry.run()?;
        if let Some(profile) = registry.last_profile() {
            diagnostics.record_profile(&profile);
        }
    }

    let report = registry.get_system::<ReportSystem>()?;
    println!("\nAlive: {}, wounded: {}", report.alive, report.wounded);
    println!(
        "Average tick: {:.3}ms ({:.0} ticks/s)",
        diagnostics.avg_frame_time(),
        diagnostics.ticks_per_second()
    );
    drop(report);

    if let Some(profile) = registry.last_profile() {
        RegistryInspector::print_profile(&profile);
    }
    Ok(())
}
