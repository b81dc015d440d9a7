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

//! Packed component storage
//!
//! One [`PackedStorage`] per component type. Values live in a dense `Vec<T>`
//! with a parallel `Vec<Entity>` of owners and a hash map from entity to dense
//! position. Removal swaps the last element into the hole, so the arrays never
//! have gaps but positions are not stable across removals.

use std::any::{Any, TypeId};
use std::ops::{Index, IndexMut};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::component::Component;
use crate::entity::Entity;
use crate::error::{EcsError, Result};

/// Type-erased storage interface shared by every component type
pub trait ComponentStorage: Send + Sync + 'static {
    /// Name of the stored component type
    fn component_name(&self) -> &'static str;

    /// Number of stored components
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if `entity` has a component in this storage
    fn contains(&self, entity: Entity) -> bool;

    /// Drop the component of `entity`
    fn remove_entity(&mut self, entity: Entity) -> Result<()>;

    /// Drop every component
    fn clear(&mut self);
}

/// Dense storage for components of type `T`
pub struct PackedStorage<T> {
    components: Vec<T>,
    entities: Vec<Entity>,
    index: FxHashMap<Entity, usize>,
}

impl<T: Component> PackedStorage<T> {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            entities: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut index = FxHashMap::default();
        index.reserve(capacity);
        Self {
            components: Vec::with_capacity(capacity),
            entities: Vec::with_capacity(capacity),
            index,
        }
    }

    /// Number of stored components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// True if `entity` has a `T`
    pub fn contains(&self, entity: Entity) -> bool {
        self.index.contains_key(&entity)
    }

    /// Dense position of the component owned by `entity`
    pub fn index_of(&self, entity: Entity) -> Option<usize> {
        self.index.get(&entity).copied()
    }

    /// Owner of the component at dense position `index`
    pub fn entity_at(&self, index: usize) -> Option<Entity> {
        self.entities.get(index).copied()
    }

    /// Attach a default-constructed `T` to `entity`
    pub fn add(&mut self, entity: Entity) -> Result<&mut T>
    where
        T: Default,
    {
        self.insert(entity, T::default())
    }

    /// Attach `value` to `entity`
    pub fn insert(&mut self, entity: Entity, value: T) -> Result<&mut T> {
        let index = self.push(entity, value)?;
        Ok(&mut self.components[index])
    }

    /// Append and return the new dense position
    pub(crate) fn push(&mut self, entity: Entity, value: T) -> Result<usize> {
        if self.contains(entity) {
            return Err(EcsError::DuplicateComponent {
                entity,
                component: std::any::type_name::<T>(),
            });
        }

        let index = self.components.len();
        self.components.push(value);
        self.entities.push(entity);
        self.index.insert(entity, index);
        Ok(index)
    }

    pub fn get(&self, entity: Entity) -> Result<&T> {
        let index = self.require(entity)?;
        Ok(&self.components[index])
    }

    pub fn get_mut(&mut self, entity: Entity) -> Result<&mut T> {
        let index = self.require(entity)?;
        Ok(&mut self.components[index])
    }

    /// Detach and return the component of `entity` (swap-and-pop)
    pub fn remove(&mut self, entity: Entity) -> Result<T> {
        let removed = self.require(entity)?;
        let last = self.components.len() - 1;

        if removed != last {
            // The owner of the last slot moves into the hole
            let moved = self.entities[last];
            self.index.insert(moved, removed);
        }

        self.index.remove(&entity);
        self.entities.swap_remove(removed);
        Ok(self.components.swap_remove(removed))
    }

    /// Dense components, in storage order
    pub fn as_slice(&self) -> &[T] {
        &self.components
    }

    /// Dense components, in storage order.
    ///
    /// Mutating values is fine; positions stay valid until the next add or remove.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.components
    }

    /// Owner of each dense position
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.entities.iter().copied().zip(self.components.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> + '_ {
        self.entities.iter().copied().zip(self.components.iter_mut())
    }

    /// Drop every component
    pub fn clear(&mut self) {
        self.components.clear();
        self.entities.clear();
        self.index.clear();
    }

    fn require(&self, entity: Entity) -> Result<usize> {
        self.index_of(entity).ok_or(EcsError::MissingComponent {
            entity,
            component: std::any::type_name::<T>(),
        })
    }
}

impl<T: Component> Default for PackedStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> Index<usize> for PackedStorage<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.components[index]
    }
}

impl<T: Component> IndexMut<usize> for PackedStorage<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.components[index]
    }
}

impl<T: Component> ComponentStorage for PackedStorage<T> {
    fn component_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn len(&self) -> usize {
        PackedStorage::len(self)
    }

    fn contains(&self, entity: Entity) -> bool {
        PackedStorage::contains(self, entity)
    }

    fn remove_entity(&mut self, entity: Entity) -> Result<()> {
        self.remove(entity).map(drop)
    }

    fn clear(&mut self) {
        PackedStorage::clear(self)
    }
}

/// Lock-owning storage as kept in the registry's component map
pub(crate) trait StorageCell: Send + Sync {
    fn component_name(&self) -> &'static str;

    fn len(&self) -> usize;

    /// Remove the component of `entity` if present; true if one was removed
    fn remove_if_present(&self, entity: Entity) -> bool;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<S: ComponentStorage> StorageCell for RwLock<S> {
    fn component_name(&self) -> &'static str {
        self.read().component_name()
    }

    fn len(&self) -> usize {
        self.read().len()
    }

    fn remove_if_present(&self, entity: Entity) -> bool {
        let mut storage = self.write();
        storage.contains(entity) && storage.remove_entity(entity).is_ok()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Shared handle to the storage of `T`
pub(crate) type SharedStorage<T> = Arc<RwLock<PackedStorage<T>>>;

pub(crate) fn new_cell<T: Component>() -> (TypeId, Arc<dyn StorageCell>) {
    let storage: SharedStorage<T> = Arc::new(RwLock::new(PackedStorage::new()));
    (TypeId::of::<T>(), storage as Arc<dyn StorageCell>)
}

/// Recover the typed storage from an erased cell
pub(crate) fn downcast_cell<T: Component>(cell: Arc<dyn StorageCell>) -> Result<SharedStorage<T>> {
    cell.into_any()
        .downcast::<RwLock<PackedStorage<T>>>()
        .map_err(|_| EcsError::unregistered_component::<T>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    fn e(raw: u32) -> Entity {
        Entity::from_raw(raw)
    }

    fn filled(count: u32) -> PackedStorage<Position> {
        let mut storage = PackedStorage::new();
        for i in 0..count {
            storage
                .insert(e(i), Position { x: i as f32, y: -(i as f32) })
                .unwrap();
        }
        storage
    }

    #[test]
    fn test_add_default_and_get() {
        let mut storage = PackedStorage::<Position>::new();
        let value = storage.add(e(7)).unwrap();
        assert_eq!(*value, Position::default());
        value.x = 3.0;

        assert!(storage.contains(e(7)));
        assert_eq!(storage.get(e(7)).unwrap().x, 3.0);
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_duplicate_add_leaves_storage_untouched() {
        let mut storage = filled(3);
        let err = storage.add(e(1)).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent { entity, .. } if entity == e(1)));
        assert_eq!(storage.len(), 3);
        assert_eq!(storage.get(e(1)).unwrap().x, 1.0);
    }

    #[test]
    fn test_missing_component_errors() {
        let mut storage = filled(2);
        assert!(matches!(storage.get(e(9)), Err(EcsError::MissingComponent { .. })));
        assert!(matches!(storage.get_mut(e(9)), Err(EcsError::MissingComponent { .. })));
        assert!(matches!(storage.remove(e(9)), Err(EcsError::MissingComponent { .. })));
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn test_remove_middle_keeps_others() {
        let mut storage = filled(5);
        let removed = storage.remove(e(1)).unwrap();
        assert_eq!(removed.x, 1.0);

        assert!(!storage.contains(e(1)));
        assert_eq!(storage.len(), 4);
        for i in [0, 2, 3, 4] {
            let value = storage.get(e(i)).unwrap();
            assert_eq!(*value, Position { x: i as f32, y: -(i as f32) });
        }
        // Last element moved into the hole
        assert_eq!(storage.index_of(e(4)), Some(1));
        assert_eq!(storage.entity_at(1), Some(e(4)));
    }

    #[test]
    fn test_remove_last_is_truncation() {
        let mut storage = filled(4);
        let before: Vec<_> = storage.as_slice()[..3].to_vec();
        storage.remove(e(3)).unwrap();

        assert_eq!(storage.as_slice(), before.as_slice());
        assert_eq!(storage.entities(), &[e(0), e(1), e(2)]);
    }

    #[test]
    fn test_remove_only_element() {
        let mut storage = filled(1);
        storage.remove(e(0)).unwrap();
        assert!(storage.is_empty());
        assert_eq!(storage.index_of(e(0)), None);
    }

    #[test]
    fn test_mapping_stays_consistent_after_churn() {
        let mut storage = filled(16);
        for i in (0..16).step_by(3) {
            storage.remove(e(i)).unwrap();
        }
        storage.insert(e(100), Position { x: 100.0, y: 0.0 }).unwrap();

        for (pos, (entity, value)) in storage.iter().enumerate() {
            assert_eq!(storage.index_of(entity), Some(pos));
            assert_eq!(value.x as u32, entity.to_raw());
        }
        assert_eq!(storage.len(), storage.entities().len());
    }

    #[test]
    fn test_index_access() {
        let mut storage = filled(3);
        storage[2].y = 42.0;
        assert_eq!(storage.get(e(2)).unwrap().y, 42.0);
        for (_, value) in storage.iter_mut() {
            value.x = 0.0;
        }
        assert!(storage.as_slice().iter().all(|p| p.x == 0.0));
    }

    #[test]
    fn test_erased_cell_roundtrip() {
        let (type_id, cell) = new_cell::<Position>();
        assert_eq!(type_id, TypeId::of::<Position>());
        assert_eq!(cell.len(), 0);

        let typed = downcast_cell::<Position>(Arc::clone(&cell)).unwrap();
        typed.write().add(e(1)).unwrap();
        assert_eq!(cell.len(), 1);
        assert!(cell.remove_if_present(e(1)));
        assert!(!cell.remove_if_present(e(1)));

        assert!(downcast_cell::<u32>(cell).is_err());
    }
}
