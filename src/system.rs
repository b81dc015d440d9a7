//! System trait and access metadata

use std::any::{Any, TypeId};
use std::sync::Arc;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};

use crate::access::Access;
use crate::error::Result;
use crate::executor::Subflow;
use crate::query::Query;

/// Component types a system read and wrote during one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemAccess {
    pub reads: Vec<TypeId>,
    pub writes: Vec<TypeId>,
}

impl SystemAccess {
    /// Create empty access
    pub fn empty() -> Self {
        Self {
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty() && self.writes.is_empty()
    }

    pub(crate) fn record_read(&mut self, type_id: TypeId) {
        if !self.reads.contains(&type_id) {
            self.reads.push(type_id);
        }
    }

    pub(crate) fn record_write(&mut self, type_id: TypeId) {
        if !self.writes.contains(&type_id) {
            self.writes.push(type_id);
        }
    }

    /// Merge two accesses (union of all reads/writes)
    pub fn merge(&self, other: &SystemAccess) -> SystemAccess {
        let mut merged = self.clone();
        for &read in &other.reads {
            merged.record_read(read);
        }
        for &write in &other.writes {
            merged.record_write(write);
        }
        merged
    }

    /// Check if this access conflicts with another
    pub fn conflicts_with(&self, other: &SystemAccess) -> bool {
        // Conflict if:
        // - Both write to same component
        // - One writes, other reads same component

        for write in &self.writes {
            if other.writes.contains(write) || other.reads.contains(write) {
                return true;
            }
        }

        for write in &other.writes {
            if self.reads.contains(write) {
                return true;
            }
        }

        false
    }
}

/// User-defined unit of per-tick work.
///
/// The registry owns exactly one instance per concrete type and calls
/// [`System::run`] once per [`Registry::run`](crate::Registry::run).
/// Systems without a declared ordering may run concurrently; a system that
/// writes a storage another system reads must be ordered with
/// [`Registry::precede`](crate::Registry::precede).
pub trait System: Send + 'static {
    /// Get system name. Names must be unique within a registry.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Run one step of the system
    fn run(&mut self, access: &Access<'_>, query: &Query<'_>, subflow: &Subflow) -> Result<()>;
}

/// Exclusive handle to a registered system
pub type SystemGuard<S> = ArcMutexGuard<RawMutex, S>;

/// Shared handle to a system as stored in a graph node
pub(crate) type SharedSystem<S> = Arc<Mutex<S>>;

/// Lock-owning system as kept in the task graph
pub(crate) trait SystemCell: Send + Sync {
    fn run_locked(&self, access: &Access<'_>, query: &Query<'_>, subflow: &Subflow) -> Result<()>;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<S: System> SystemCell for Mutex<S> {
    fn run_locked(&self, access: &Access<'_>, query: &Query<'_>, subflow: &Subflow) -> Result<()> {
        self.lock().run(access, query, subflow)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
