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

//! Component trait and single-component handles
//!
//! Components are plain data attached to entities. The registry hands out
//! [`ComponentRef`] / [`ComponentMut`] handles that keep the owning storage
//! locked for as long as they are alive.

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::access::{StorageRead, StorageWrite};
use crate::entity::Entity;

/// Marker trait for components
///
/// Components must be 'static (no borrowed data)
pub trait Component: 'static + Send + Sync {}

/// Automatically implement Component for all valid types
impl<T: 'static + Send + Sync> Component for T {}

/// Shared handle to one component.
///
/// Holds a read lock on the whole storage of `T`; drop it before mutating
/// that storage from the same thread.
pub struct ComponentRef<T: Component> {
    guard: StorageRead<T>,
    entity: Entity,
    index: usize,
}

impl<T: Component> ComponentRef<T> {
    pub(crate) fn new(guard: StorageRead<T>, entity: Entity, index: usize) -> Self {
        Self {
            guard,
            entity,
            index,
        }
    }

    /// Entity owning this component
    pub fn entity(&self) -> Entity {
        self.entity
    }
}

impl<T: Component> Deref for ComponentRef<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard[self.index]
    }
}

impl<T: Component + fmt::Debug> fmt::Debug for ComponentRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

/// Exclusive handle to one component.
///
/// Holds the write lock on the whole storage of `T`.
pub struct ComponentMut<T: Component> {
    guard: StorageWrite<T>,
    entity: Entity,
    index: usize,
}

impl<T: Component> ComponentMut<T> {
    pub(crate) fn new(guard: StorageWrite<T>, entity: Entity, index: usize) -> Self {
        Self {
            guard,
            entity,
            index,
        }
    }

    /// Entity owning this component
    pub fn entity(&self) -> Entity {
        self.entity
    }
}

impl<T: Component> Deref for ComponentMut<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard[self.index]
    }
}

impl<T: Component> DerefMut for ComponentMut<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard[self.index]
    }
}

impl<T: Component + fmt::Debug> fmt::Debug for ComponentMut<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
