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

//! Entity identifiers and the slot allocator.

use std::fmt;

use crate::bitset::BitSet;
use crate::error::{EcsError, Result};

/// Default number of slots added whenever the table is full
pub const DEFAULT_ENTITY_GROWTH: u32 = 128;

/// Opaque entity identifier.
///
/// Ids are dense slot indices. A slot freed by destruction can be handed out
/// again by a later allocation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(u32);

impl Entity {
    /// Sentinel that never refers to a live entity
    pub const INVALID: Entity = Entity(u32::MAX);

    pub const fn from_raw(index: u32) -> Self {
        Self(index)
    }

    pub const fn to_raw(self) -> u32 {
        self.0
    }

    /// Slot index in the liveness table
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Slot table tracking which entity ids are alive.
///
/// A slot is in one of three states: free, live, or retiring. Retiring slots
/// belong to an entity whose components are still being removed; they are
/// neither live nor allocatable until [`EntityAllocator::release`] runs.
#[derive(Debug, Clone)]
pub struct EntityAllocator {
    live: BitSet,
    retiring: BitSet,
    slots: usize,
    growth: usize,
    live_count: usize,
}

impl EntityAllocator {
    /// Create an empty table that grows by `growth` slots at a time
    pub fn new(growth: u32) -> Self {
        Self {
            live: BitSet::with_capacity(growth as usize),
            retiring: BitSet::with_capacity(growth as usize),
            slots: 0,
            growth: growth.max(1) as usize,
            live_count: 0,
        }
    }

    /// Allocate the lowest free slot, growing the table when none is left
    pub fn allocate(&mut self) -> Entity {
        let index = match self.live.first_clear_in_both(&self.retiring, self.slots) {
            Some(index) => index,
            None => {
                let first_new = self.slots;
                self.slots += self.growth;
                first_new
            }
        };

        self.live.set(index);
        self.live_count += 1;
        Entity(index as u32)
    }

    /// Mark a live entity dead without making its slot reusable yet
    pub fn retire(&mut self, entity: Entity) -> Result<()> {
        if !self.is_alive(entity) {
            return Err(EcsError::InvalidEntity(entity));
        }
        self.live.unset(entity.index());
        self.retiring.set(entity.index());
        self.live_count -= 1;
        Ok(())
    }

    /// Make a retired slot available to future allocations
    pub fn release(&mut self, entity: Entity) {
        self.retiring.unset(entity.index());
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        entity.index() < self.slots && self.live.contains(entity.index())
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.live_count
    }

    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Number of slots in the table, free or not
    pub fn capacity(&self) -> usize {
        self.slots
    }

    /// Live entities in ascending id order
    pub fn live_entities(&self) -> Vec<Entity> {
        let mut entities = Vec::with_capacity(self.live_count);
        entities.extend(self.live.ones().map(|index| Entity(index as u32)));
        entities
    }

    /// Forget every entity and slot, keeping the bit tables allocated
    pub fn clear(&mut self) {
        self.live.clear();
        self.retiring.clear();
        self.slots = 0;
        self.live_count = 0;
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_ENTITY_GROWTH)
    }
}
