use packed_ecs::{Access, Query, Registry, Result, Subflow, System};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Default, Clone, Copy)]
struct Health(i32);

#[derive(Debug, Default, Clone, Copy)]
struct Armor(i32);

#[derive(Default)]
struct Audit {
    mismatches: usize,
}

impl System for Audit {
    fn run(&mut self, access: &Access<'_>, _: &Query<'_>, _: &Subflow) -> Result<()> {
        let health = access.read::<Health>()?;
        let armor = access.read::<Armor>()?;
        // Armor only ever goes onto entities that still have health
        self.mismatches += armor.entities().iter().filter(|&&e| !health.contains(e)).count();
        Ok(())
    }
}

#[test]
fn test_create_destroy_from_many_threads() {
    let registry = Arc::new(Registry::new());
    registry.register_component::<Health>().unwrap();
    registry.register_component::<Armor>().unwrap();
    registry.register_default_system::<Audit>().unwrap();

    let done = Arc::new(AtomicBool::new(false));

    let ticker = {
        let registry = Arc::clone(&registry);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut ticks = 0;
            while !done.load(Ordering::Acquire) {
                registry.run().unwrap();
                ticks += 1;
            }
            ticks
        })
    };

    thread::scope(|s| {
        for worker in 0..4 {
            let registry = &registry;
            s.spawn(move || {
                let mut kept = Vec::new();
                for i in 0..500 {
                    let entity = registry
                        .create_entity()
                        .with_value(Health(worker * 1000 + i))
                        .unwrap()
                        .build();
                    if i % 2 == 0 {
                        registry.destroy_entity(entity).unwrap();
                    } else {
                        kept.push(entity);
                    }
                }
                for &entity in &kept {
                    registry.add_component::<Armor>(entity).unwrap();
                }
            });
        }
    });

    done.store(true, Ordering::Release);
    let ticks = ticker.join().unwrap();
    registry.run().unwrap();
    assert!(ticks > 0);
    assert_eq!(registry.get_system::<Audit>().unwrap().mismatches, 0);

    assert_eq!(registry.entity_count(), 1000);
    assert_eq!(registry.num_components::<Health>().unwrap(), 1000);
    assert_eq!(registry.num_components::<Armor>().unwrap(), 1000);
    for entity in registry.entities() {
        assert!(registry.has_component::<Health>(entity).unwrap());
        assert!(registry.has_component::<Armor>(entity).unwrap());
    }
}

#[test]
fn test_ids_stay_unique_under_contention() {
    let registry = Registry::new();

    let ids: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = &registry;
                s.spawn(move || (0..256).map(|_| registry.create_entity().build()).collect::<Vec<_>>())
            })
            .collect();
        handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
    });

    let mut sorted = ids.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), 8 * 256);
    assert_eq!(registry.entities().into_vec(), sorted);
}
