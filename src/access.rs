//! Component access guard handed to systems
//!
//! An [`Access`] is created by the scheduler for a single system invocation.
//! It forwards `read`/`write` requests to the registry's storages and records
//! which component types the system touched, for conflict diagnostics.

use std::any::TypeId;

use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{Mutex, RawRwLock};

use crate::component::Component;
use crate::error::Result;
use crate::registry::Registry;
use crate::storage::PackedStorage;
use crate::system::SystemAccess;

/// Read handle to the whole storage of `T`
pub type StorageRead<T> = ArcRwLockReadGuard<RawRwLock, PackedStorage<T>>;

/// Write handle to the whole storage of `T`
pub type StorageWrite<T> = ArcRwLockWriteGuard<RawRwLock, PackedStorage<T>>;

/// Tick-scoped storage access for one system
pub struct Access<'r> {
    registry: &'r Registry,
    observed: Mutex<SystemAccess>,
}

impl<'r> Access<'r> {
    /// Only the registry's scheduler creates these.
    pub(crate) fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            observed: Mutex::new(SystemAccess::empty()),
        }
    }

    /// Request the storage of `T` for reading.
    ///
    /// Blocks while another system holds it for writing.
    pub fn read<T: Component>(&self) -> Result<StorageRead<T>> {
        let storage = self.registry.storage::<T>()?;
        self.observed.lock().record_read(TypeId::of::<T>());
        Ok(storage.read_arc())
    }

    /// Request the storage of `T` for writing.
    ///
    /// Blocks while any other guard on it is alive. Requesting a second guard
    /// on the same storage from the same thread deadlocks.
    pub fn write<T: Component>(&self) -> Result<StorageWrite<T>> {
        let storage = self.registry.storage::<T>()?;
        self.observed.lock().record_write(TypeId::of::<T>());
        Ok(storage.write_arc())
    }

    /// Component types touched so far
    pub fn observed(&self) -> SystemAccess {
        self.observed.lock().clone()
    }

    pub(crate) fn into_observed(self) -> SystemAccess {
        self.observed.into_inner()
    }
}
