use packed_ecs::{Access, EcsError, Query, Registry, RegistryConfig, Result, Subflow, System};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Value(u64);

/// Adds `N` to every value; the chain below must apply them in order
struct Step<const N: u64>;

impl<const N: u64> System for Step<N> {
    fn run(&mut self, access: &Access<'_>, query: &Query<'_>, _: &Subflow) -> Result<()> {
        let mut values = access.write::<Value>()?;
        for entity in query.entities() {
            let value = values.get_mut(entity)?;
            value.0 = value.0 * 10 + N;
        }
        Ok(())
    }
}

fn chained(registry: &Registry) -> Result<()> {
    registry.register_system(Step::<4>)?;
    registry.register_system(Step::<2>)?;
    registry.register_system(Step::<3>)?;
    registry.register_system(Step::<1>)?;

    registry.precede::<Step<1>, Step<2>>()?;
    registry.precede::<Step<2>, Step<3>>()?;
    registry.precede::<Step<3>, Step<4>>()?;
    Ok(())
}

#[test]
fn test_chain_runs_in_declared_order() -> Result<()> {
    let registry = Registry::new();
    registry.register_component::<Value>()?;
    let entity = registry.create_entity().with::<Value>()?.build();
    chained(&registry)?;

    registry.run()?;
    assert_eq!(registry.get_component::<Value>(entity)?.0, 1234);

    let order = registry.execution_order()?;
    assert_eq!(order[0], std::any::type_name::<Step<1>>());
    assert_eq!(order[3], std::any::type_name::<Step<4>>());
    Ok(())
}

#[test]
fn test_chain_on_dedicated_pool() -> Result<()> {
    let config = RegistryConfig::from_json_str(r#"{ "worker_threads": 3, "thread_name": "ordering-test" }"#)?;
    let registry = Registry::with_config(config)?;
    registry.register_component::<Value>()?;
    let entities: Vec<_> = (0..64)
        .map(|_| registry.create_entity().with::<Value>().map(|b| b.build()))
        .collect::<Result<_>>()?;
    chained(&registry)?;

    for _ in 0..3 {
        for &entity in &entities {
            registry.get_component_mut::<Value>(entity)?.0 = 0;
        }
        registry.run()?;
        for &entity in &entities {
            assert_eq!(registry.get_component::<Value>(entity)?.0, 1234);
        }
    }
    Ok(())
}

struct ThreadProbe {
    names: Vec<String>,
}

impl System for ThreadProbe {
    fn run(&mut self, _: &Access<'_>, _: &Query<'_>, _: &Subflow) -> Result<()> {
        let name = std::thread::current().name().unwrap_or_default().to_string();
        self.names.push(name);
        Ok(())
    }
}

#[test]
fn test_dedicated_pool_thread_names() -> Result<()> {
    let config = RegistryConfig::default().with_worker_threads(2);
    let config = RegistryConfig {
        thread_name: "probe".to_string(),
        ..config
    };
    let registry = Registry::with_config(config)?;
    registry.register_system(ThreadProbe { names: Vec::new() })?;
    registry.run()?;

    let probe = registry.get_system::<ThreadProbe>()?;
    assert!(probe.names[0].starts_with("probe-"));
    Ok(())
}

struct Fanout {
    spawned: Arc<AtomicUsize>,
}

impl System for Fanout {
    fn run(&mut self, _: &Access<'_>, _: &Query<'_>, subflow: &Subflow) -> Result<()> {
        let spawned = &self.spawned;
        subflow.scope(|scope| {
            for _ in 0..16 {
                scope.spawn(|_| {
                    spawned.fetch_add(1, Ordering::SeqCst);
                });
            }
        });
        Ok(())
    }
}

struct AfterFanout {
    spawned: Arc<AtomicUsize>,
    observed: Vec<usize>,
}

impl System for AfterFanout {
    fn run(&mut self, _: &Access<'_>, _: &Query<'_>, _: &Subflow) -> Result<()> {
        self.observed.push(self.spawned.load(Ordering::SeqCst));
        Ok(())
    }
}

#[test]
fn test_nested_tasks_join_before_successor() -> Result<()> {
    let registry = Registry::new();
    let spawned = Arc::new(AtomicUsize::new(0));
    registry.register_system(Fanout {
        spawned: Arc::clone(&spawned),
    })?;
    registry.register_system(AfterFanout {
        spawned: Arc::clone(&spawned),
        observed: Vec::new(),
    })?;
    registry.precede::<Fanout, AfterFanout>()?;

    for _ in 0..10 {
        registry.run()?;
    }

    let after = registry.get_system::<AfterFanout>()?;
    assert_eq!(after.observed, (1..=10).map(|tick| tick * 16).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn test_precede_requires_both_systems() {
    let registry = Registry::new();
    registry.register_system(Step::<1>).unwrap();

    let err = registry.precede::<Step<1>, Step<2>>().unwrap_err();
    assert!(matches!(err, EcsError::UnknownSystemPair { .. }));
    let err = registry.precede::<Step<2>, Step<1>>().unwrap_err();
    assert!(matches!(err, EcsError::UnknownSystemPair { .. }));
}
