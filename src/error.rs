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

use std::fmt;

/// ECS error type.
///
/// Variants fall into three families: preconditions callers violated,
/// resources that ran out, and use of a handle past its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    // --- precondition violated ---
    /// Entity is not alive (never spawned, or already despawned).
    EntityNotAlive,
    /// `add_component` called for a component already present on the entity.
    ComponentAlreadyPresent,
    /// `remove_component`/`get_component` called for a component the entity
    /// does not carry.
    ComponentNotPresent,
    /// A `ChunkHandle` is stale or was never vended by this manager.
    InvalidChunkHandle,
    /// The system dependency graph contains a cycle.
    CyclicSystemDependency,
    /// Two systems were registered under the same name.
    DuplicateSystemName,

    // --- resource exhausted ---
    /// More distinct archetypes were requested than `EcsConfig::max_archetypes`.
    ArchetypeLimitExceeded,
    /// A chunk could not be grown past its fixed capacity.
    ChunkCapacityExceeded,
    /// More distinct component types were registered than fit the mask width.
    ComponentCapacityExceeded,
    /// A chunk was freed while still borrowed.
    ChunkInUse,
    /// Entity capacity exhausted.
    EntityCapacityExhausted,

    // --- use after dispose ---
    /// Operation attempted on a `World` or collaborator that was disposed.
    Disposed,
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::EntityNotAlive => write!(f, "entity is not alive"),
            EcsError::ComponentAlreadyPresent => write!(f, "component already present on entity"),
            EcsError::ComponentNotPresent => write!(f, "component not present on entity"),
            EcsError::InvalidChunkHandle => write!(f, "invalid or stale chunk handle"),
            EcsError::CyclicSystemDependency => write!(f, "system dependency graph contains a cycle"),
            EcsError::DuplicateSystemName => write!(f, "duplicate system name"),
            EcsError::ArchetypeLimitExceeded => write!(f, "archetype limit exceeded"),
            EcsError::ChunkCapacityExceeded => write!(f, "chunk capacity exceeded"),
            EcsError::ComponentCapacityExceeded => write!(f, "component capacity exceeded"),
            EcsError::ChunkInUse => write!(f, "chunk freed while still borrowed"),
            EcsError::EntityCapacityExhausted => write!(f, "entity capacity exhausted"),
            EcsError::Disposed => write!(f, "use after dispose"),
        }
    }
}

impl std::error::Error for EcsError {}

/// Result type alias.
pub type Result<T> = std::result::Result<T, EcsError>;
