// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Registry: entities, component storages and systems behind one handle
//!
//! Every operation takes `&self`, so a `Registry` can be shared across threads
//! and reached from inside running systems. Locks, in acquisition order:
//!
//! 1. component map (`RwLock`), only long enough to clone a storage handle
//! 2. one `RwLock` per storage
//! 3. entity table (`Mutex`)
//!
//! The system table lock is only taken to register, order or snapshot systems
//! and is never held while a system runs.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, trace, warn};

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::component::{Component, ComponentMut, ComponentRef};
use crate::config::RegistryConfig;
use crate::entity::{Entity, EntityAllocator};
use crate::error::{EcsError, Result, TypeKind};
use crate::executor::{ExecutionProfile, NodeState, SystemProfiler, SystemStats};
use crate::query::EntityManager;
use crate::schedule::SystemGraph;
use crate::storage::{downcast_cell, new_cell, SharedStorage, StorageCell};
use crate::system::{SharedSystem, System, SystemGuard};

/// Central ECS registry
pub struct Registry {
    config: RegistryConfig,
    entities: Mutex<EntityAllocator>,
    components: RwLock<AHashMap<TypeId, Arc<dyn StorageCell>>>,
    systems: RwLock<SystemGraph>,
    pool: Option<ThreadPool>,
    last_profile: Mutex<Option<ExecutionProfile>>,
    profiler: Mutex<SystemProfiler>,
}

impl Registry {
    /// Create an empty registry running ticks on the global rayon pool
    pub fn new() -> Self {
        Self::from_parts(RegistryConfig::default(), None)
    }

    /// Create an empty registry from a validated configuration.
    ///
    /// Builds a dedicated worker pool when `worker_threads` is set.
    pub fn with_config(config: RegistryConfig) -> Result<Self> {
        config.validate()?;

        let pool = match config.worker_threads {
            Some(threads) => {
                let prefix = config.thread_name.clone();
                let pool = ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(move |i| format!("{prefix}-{i}"))
                    .build()
                    .map_err(|e| EcsError::ThreadPoolError(e.to_string()))?;
                Some(pool)
            }
            None => None,
        };

        debug!(
            entity_growth = config.entity_growth,
            worker_threads = ?config.worker_threads,
            "created registry"
        );
        Ok(Self::from_parts(config, pool))
    }

    fn from_parts(config: RegistryConfig, pool: Option<ThreadPool>) -> Self {
        Self {
            entities: Mutex::new(EntityAllocator::new(config.entity_growth)),
            components: RwLock::new(AHashMap::with_capacity(32)),
            systems: RwLock::new(SystemGraph::new()),
            pool,
            last_profile: Mutex::new(None),
            profiler: Mutex::new(SystemProfiler::new()),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ========== Components ==========

    /// Create the storage for component type `T`
    pub fn register_component<T: Component>(&self) -> Result<()> {
        let mut components = self.components.write();
        let type_id = TypeId::of::<T>();
        if components.contains_key(&type_id) {
            return Err(EcsError::DuplicateType {
                kind: TypeKind::Component,
                name: std::any::type_name::<T>(),
            });
        }

        let (type_id, cell) = new_cell::<T>();
        components.insert(type_id, cell);
        debug!(component = std::any::type_name::<T>(), "registered component");
        Ok(())
    }

    /// Attach a default-constructed `T` to `entity`
    pub fn add_component<T: Component + Default>(&self, entity: Entity) -> Result<ComponentMut<T>> {
        self.insert_component(entity, T::default())
    }

    /// Attach `value` to `entity`.
    ///
    /// The returned handle keeps the storage of `T` write-locked.
    pub fn insert_component<T: Component>(&self, entity: Entity, value: T) -> Result<ComponentMut<T>> {
        let storage = self.storage::<T>()?;
        let mut guard = storage.write_arc();

        // Checked under the storage lock so a concurrent destroy either sees
        // this component or makes the check fail
        if !self.entities.lock().is_alive(entity) {
            return Err(EcsError::InvalidEntity(entity));
        }

        let index = guard.push(entity, value)?;
        Ok(ComponentMut::new(guard, entity, index))
    }

    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<ComponentRef<T>> {
        let storage = self.storage::<T>()?;
        let guard = storage.read_arc();
        let index = guard.index_of(entity).ok_or(EcsError::MissingComponent {
            entity,
            component: std::any::type_name::<T>(),
        })?;
        Ok(ComponentRef::new(guard, entity, index))
    }

    pub fn get_component_mut<T: Component>(&self, entity: Entity) -> Result<ComponentMut<T>> {
        let storage = self.storage::<T>()?;
        let guard = storage.write_arc();
        let index = guard.index_of(entity).ok_or(EcsError::MissingComponent {
            entity,
            component: std::any::type_name::<T>(),
        })?;
        Ok(ComponentMut::new(guard, entity, index))
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> Result<bool> {
        let storage = self.storage::<T>()?;
        let contains = storage.read().contains(entity);
        Ok(contains)
    }

    /// Number of entities holding a `T`
    pub fn num_components<T: Component>(&self) -> Result<usize> {
        let storage = self.storage::<T>()?;
        let len = storage.read().len();
        Ok(len)
    }

    /// Detach and return the `T` of `entity`
    pub fn remove_component<T: Component>(&self, entity: Entity) -> Result<T> {
        let storage = self.storage::<T>()?;
        let mut guard = storage.write();
        guard.remove(entity)
    }

    pub(crate) fn storage<T: Component>(&self) -> Result<SharedStorage<T>> {
        let cell = self
            .components
            .read()
            .get(&TypeId::of::<T>())
            .cloned()
            .ok_or_else(EcsError::unregistered_component::<T>)?;
        downcast_cell::<T>(cell)
    }

    // ========== Entities ==========

    /// Allocate a new entity; chain components onto the returned builder
    pub fn create_entity(&self) -> EntityBuilder<'_> {
        let entity = self.entities.lock().allocate();
        trace!(%entity, "created entity");
        EntityBuilder {
            registry: self,
            entity,
        }
    }

    /// Remove every component of `entity`, then free its id.
    ///
    /// Blocks while another thread holds a guard on a storage that contains
    /// `entity`. Calling this while the current thread holds such a guard
    /// deadlocks.
    pub fn destroy_entity(&self, entity: Entity) -> Result<()> {
        // Retired ids are neither live nor reusable, so no new component can
        // be attached and no new entity can take the slot while we clean up
        self.entities.lock().retire(entity)?;

        let cells: Vec<Arc<dyn StorageCell>> = self.components.read().values().cloned().collect();
        let removed = cells.iter().filter(|cell| cell.remove_if_present(entity)).count();

        self.entities.lock().release(entity);
        trace!(%entity, removed, "destroyed entity");
        Ok(())
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.lock().is_alive(entity)
    }

    /// Number of live entities
    pub fn entity_count(&self) -> usize {
        self.entities.lock().len()
    }

    /// Snapshot of all live entities, ascending by id
    pub fn entities(&self) -> EntityManager {
        EntityManager::from_vec(self.entities.lock().live_entities())
    }

    // ========== Systems ==========

    /// Take ownership of `system` and add it to the task graph with no edges.
    ///
    /// Fails with `DuplicateType` if the type, or another system with the same
    /// [`System::name`], is already registered.
    pub fn register_system<S: System>(&self, system: S) -> Result<()> {
        let mut graph = self.systems.write();
        let type_id = TypeId::of::<S>();
        if graph.id_of(type_id).is_some() {
            return Err(EcsError::DuplicateType {
                kind: TypeKind::System,
                name: std::any::type_name::<S>(),
            });
        }

        let name = system.name();
        if graph.nodes().iter().any(|node| node.name == name) {
            return Err(EcsError::DuplicateType {
                kind: TypeKind::System,
                name,
            });
        }

        let cell: SharedSystem<S> = Arc::new(Mutex::new(system));
        let id = graph.add_node(name, type_id, cell);
        debug!(system = name, id = id.0, "registered system");
        Ok(())
    }

    pub fn register_default_system<S: System + Default>(&self) -> Result<()> {
        self.register_system(S::default())
    }

    /// Exclusive handle to the registered instance of `S`.
    ///
    /// Blocks while `S` is running.
    pub fn get_system<S: System>(&self) -> Result<SystemGuard<S>> {
        let cell = {
            let graph = self.systems.read();
            graph
                .id_of(TypeId::of::<S>())
                .and_then(|id| graph.node(id))
                .map(|node| Arc::clone(&node.cell))
                .ok_or_else(EcsError::unregistered_system::<S>)?
        };

        let system: SharedSystem<S> = cell
            .into_any()
            .downcast::<Mutex<S>>()
            .map_err(|_| EcsError::unregistered_system::<S>())?;
        Ok(system.lock_arc())
    }

    /// Require `S0` to finish before `S1` starts on every tick
    pub fn precede<S0: System, S1: System>(&self) -> Result<()> {
        let mut graph = self.systems.write();
        let (Some(before), Some(after)) = (
            graph.id_of(TypeId::of::<S0>()),
            graph.id_of(TypeId::of::<S1>()),
        ) else {
            return Err(EcsError::UnknownSystemPair {
                before: std::any::type_name::<S0>(),
                after: std::any::type_name::<S1>(),
            });
        };

        if graph.add_edge(before, after)? {
            debug!(
                before = std::any::type_name::<S0>(),
                after = std::any::type_name::<S1>(),
                "added precedence edge"
            );
        }
        Ok(())
    }

    /// Run every registered system once, honoring precedence edges.
    ///
    /// Blocks until all systems are done. A failing system does not stop the
    /// tick; the first failure is returned afterwards.
    pub fn run(&self) -> Result<()> {
        let plan = self.systems.read().plan();

        #[cfg(feature = "profiling")]
        let _span = info_span!("registry.run", systems = plan.len()).entered();

        let outcome = plan.execute(self, self.pool.as_ref());
        debug_assert!(outcome.states.iter().all(|s| *s == NodeState::Done));
        let profile = outcome.profile;

        debug!(
            systems = plan.len(),
            failed = outcome.errors.len(),
            elapsed_us = profile.total_frame_time.as_micros() as u64,
            "tick complete"
        );
        if self.config.warn_on_access_conflicts {
            for conflict in &profile.conflicts {
                warn!(
                    first = conflict.first,
                    second = conflict.second,
                    "unordered systems accessed the same storage with a writer; declare precedence"
                );
            }
        }

        self.profiler.lock().record_profile(&profile);
        *self.last_profile.lock() = Some(profile);

        match outcome.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Drop every entity, storage, system and edge
    pub fn reset(&self) {
        let mut graph = self.systems.write();
        let mut components = self.components.write();
        let mut entities = self.entities.lock();

        graph.clear();
        components.clear();
        entities.clear();
        *self.last_profile.lock() = None;
        self.profiler.lock().clear();
        debug!("registry reset");
    }

    // ========== Inspection ==========

    /// Profile of the most recent tick
    pub fn last_profile(&self) -> Option<ExecutionProfile> {
        self.last_profile.lock().clone()
    }

    /// Timings for a system aggregated over all ticks since the last reset
    pub fn system_stats(&self, name: &str) -> Option<SystemStats> {
        self.profiler.lock().get_stats(name)
    }

    pub fn system_count(&self) -> usize {
        self.systems.read().node_count()
    }

    pub fn component_type_count(&self) -> usize {
        self.components.read().len()
    }

    /// System names in registration order
    pub fn system_names(&self) -> Vec<&'static str> {
        self.systems.read().nodes().iter().map(|node| node.name).collect()
    }

    /// Declared edges as `(before, after)` system names
    pub fn precedence_edges(&self) -> Vec<(&'static str, &'static str)> {
        self.systems.read().edge_names()
    }

    /// One valid sequential order of all systems
    pub fn execution_order(&self) -> Result<Vec<&'static str>> {
        let graph = self.systems.read();
        let order = graph.topological_sort()?;
        Ok(order
            .into_iter()
            .filter_map(|id| graph.node(id).map(|node| node.name))
            .collect())
    }

    /// `(component name, stored count)` per storage, sorted by name
    pub(crate) fn storage_sizes(&self) -> Vec<(&'static str, usize)> {
        let cells: Vec<Arc<dyn StorageCell>> = self.components.read().values().cloned().collect();
        let mut sizes: Vec<_> = cells.iter().map(|cell| (cell.component_name(), cell.len())).collect();
        sizes.sort_unstable();
        sizes
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("entities", &self.entity_count())
            .field("component_types", &self.component_type_count())
            .field("systems", &self.system_count())
            .field("dedicated_pool", &self.pool.is_some())
            .finish()
    }
}

/// Builder returned by [`Registry::create_entity`].
///
/// The entity already exists; every `with*` call attaches its component
/// immediately.
pub struct EntityBuilder<'r> {
    registry: &'r Registry,
    entity: Entity,
}

impl<'r> EntityBuilder<'r> {
    pub fn with<T: Component + Default>(self) -> Result<Self> {
        self.registry.add_component::<T>(self.entity)?;
        Ok(self)
    }

    pub fn with_value<T: Component>(self, value: T) -> Result<Self> {
        self.registry.insert_component(self.entity, value)?;
        Ok(self)
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn build(self) -> Entity {
        self.entity
    }
}
