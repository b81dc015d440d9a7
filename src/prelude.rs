//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use packed_ecs::prelude::*;
//! ```

pub use crate::access::{Access, StorageRead, StorageWrite};
pub use crate::component::{Component, ComponentMut, ComponentRef};
pub use crate::config::RegistryConfig;
pub use crate::debug::{Diagnostics, RegistryInspector};
pub use crate::entity::Entity;
pub use crate::error::{EcsError, Result};
pub use crate::executor::{ExecutionProfile, Subflow};
pub use crate::query::{EntityManager, Query};
pub use crate::registry::{EntityBuilder, Registry};
pub use crate::storage::PackedStorage;
pub use crate::system::System;
