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

//! Error types
//!
//! Every variant describes API misuse detected at the call site. Nothing is
//! retried internally and a failing call never leaves a partial mutation behind.

use std::fmt;

use crate::entity::Entity;

/// Which registration table a type key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Component,
    System,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Component => write!(f, "component"),
            TypeKind::System => write!(f, "system"),
        }
    }
}

/// ECS error type
#[derive(Debug, Clone, PartialEq)]
pub enum EcsError {
    /// Component or system type registered twice
    DuplicateType { kind: TypeKind, name: &'static str },

    /// Operation referenced a type that was never registered
    UnregisteredType { kind: TypeKind, name: &'static str },

    /// Entity already has a component of this type
    DuplicateComponent {
        entity: Entity,
        component: &'static str,
    },

    /// Entity has no component of this type
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },

    /// Precedence declared between systems that are not both registered
    UnknownSystemPair {
        before: &'static str,
        after: &'static str,
    },

    /// Entity is not alive
    InvalidEntity(Entity),

    /// Precedence edge would close a cycle in the task graph
    SystemCycleDetected {
        before: &'static str,
        after: &'static str,
    },

    /// A system returned an error during a tick
    SystemFailed {
        system: &'static str,
        source: Box<EcsError>,
    },

    /// Invalid or unreadable registry configuration
    ConfigError(String),

    /// Worker pool could not be built
    ThreadPoolError(String),

    /// IO error (file operations, etc.)
    IoError(String),
}

impl EcsError {
    pub(crate) fn unregistered_component<T: 'static>() -> Self {
        EcsError::UnregisteredType {
            kind: TypeKind::Component,
            name: std::any::type_name::<T>(),
        }
    }

    pub(crate) fn unregistered_system<S: 'static>() -> Self {
        EcsError::UnregisteredType {
            kind: TypeKind::System,
            name: std::any::type_name::<S>(),
        }
    }

    /// Error returned by the system itself, unwrapping `SystemFailed`
    pub fn root_cause(&self) -> &EcsError {
        match self {
            EcsError::SystemFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::DuplicateType { kind, name } => {
                write!(f, "{kind} type already registered: {name}")
            }
            EcsError::UnregisteredType { kind, name } => {
                write!(f, "{kind} type not registered: {name}")
            }
            EcsError::DuplicateComponent { entity, component } => {
                write!(f, "{entity} already has component {component}")
            }
            EcsError::MissingComponent { entity, component } => {
                write!(f, "{entity} has no component {component}")
            }
            EcsError::UnknownSystemPair { before, after } => {
                write!(f, "Cannot order {before} before {after}: both systems must be registered")
            }
            EcsError::InvalidEntity(entity) => write!(f, "{entity} is not alive"),
            EcsError::SystemCycleDetected { before, after } => {
                write!(f, "Ordering {before} before {after} would create a cycle")
            }
            EcsError::SystemFailed { system, source } => {
                write!(f, "System {system} failed: {source}")
            }
            EcsError::ConfigError(msg) => write!(f, "Config error: {msg}"),
            EcsError::ThreadPoolError(msg) => write!(f, "Thread pool error: {msg}"),
            EcsError::IoError(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for EcsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EcsError::SystemFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EcsError {
    fn from(err: std::io::Error) -> Self {
        EcsError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for EcsError {
    fn from(err: serde_json::Error) -> Self {
        EcsError::ConfigError(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;
