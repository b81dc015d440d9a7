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

//! Packed ECS - sparse-set Entity Component System
//!
//! Components live in densely packed per-type storages; systems run once per
//! tick on a rayon pool, ordered only by the precedence edges declared with
//! [`Registry::precede`].

pub mod access;
pub mod bitset;
pub mod component;
pub mod config;
pub mod debug;
pub mod entity;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod profiling;
pub mod query;
pub mod registry;
pub mod schedule;
pub mod storage;
pub mod system;


pub use access::*;
pub use component::*;
pub use config::*;
pub use entity::*;
pub use error::*;
pub use executor::*;
pub use query::*;
pub use registry::*;
pub use schedule::*;
pub use storage::*;
pub use system::*;
