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

//! Entity queries
//!
//! A [`Query`] materializes the set of live entities into an [`EntityManager`]
//! snapshot. Snapshots are plain vectors: they do not follow later creations or
//! destructions, and filtering never touches the registry.
//!
//! ```
//! use packed_ecs::Registry;
//!
//! #[derive(Default)]
//! struct Mass(f32);
//!
//! let registry = Registry::new();
//! registry.register_component::<Mass>().unwrap();
//! let heavy = registry.create_entity().with::<Mass>().unwrap().build();
//! registry.create_entity();
//!
//! let all = registry.entities();
//! let with_mass = all.filter(|e| registry.has_component::<Mass>(e).unwrap_or(false));
//! assert_eq!(with_mass.entities(), &[heavy]);
//! ```

use crate::entity::Entity;
use crate::registry::Registry;

/// Tick-scoped entity query handed to systems
pub struct Query<'r> {
    registry: &'r Registry,
}

impl<'r> Query<'r> {
    /// Only the registry's scheduler creates these.
    pub(crate) fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Snapshot of all live entities, ascending by id
    pub fn entities(&self) -> EntityManager {
        self.registry.entities()
    }
}

/// Ordered snapshot of entity ids with filtering helpers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityManager {
    entities: Vec<Entity>,
}

impl EntityManager {
    pub(crate) fn from_vec(entities: Vec<Entity>) -> Self {
        Self { entities }
    }

    /// Keep only entities matching `predicate`, returning a new snapshot
    pub fn filter<F>(&self, mut predicate: F) -> EntityManager
    where
        F: FnMut(Entity) -> bool,
    {
        let entities = self
            .entities
            .iter()
            .copied()
            .filter(|&entity| predicate(entity))
            .collect();
        EntityManager { entities }
    }

    /// Like [`EntityManager::filter`], reusing this snapshot's allocation
    pub fn into_filter<F>(mut self, predicate: F) -> EntityManager
    where
        F: FnMut(Entity) -> bool,
    {
        self.filter_in_place(predicate);
        self
    }

    /// Shrink this snapshot to entities matching `predicate`
    pub fn filter_in_place<F>(&mut self, mut predicate: F) -> &mut Self
    where
        F: FnMut(Entity) -> bool,
    {
        self.entities.retain(|&entity| predicate(entity));
        self
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Binary search; snapshots are kept in ascending order
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.binary_search(&entity).is_ok()
    }

    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, Entity>> {
        self.entities.iter().copied()
    }

    pub fn into_vec(self) -> Vec<Entity> {
        self.entities
    }
}

impl IntoIterator for EntityManager {
    type Item = Entity;
    type IntoIter = std::vec::IntoIter<Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}

impl<'a> IntoIterator for &'a EntityManager {
    type Item = Entity;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, Entity>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
