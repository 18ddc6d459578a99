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

//! Archetype ECS -- dense, cache-friendly component storage with
//! set-oriented queries, structural mutation through a precomputed
//! archetype-transition graph, and a dependency-aware wave scheduler.
//!
//! Storage is built bottom-up: [`chunk`] slabs fixed-size raw memory behind
//! generation-tagged handles, [`layout`] computes per-signature byte offsets
//! over those chunks, [`archetype`] owns the chunks for one signature, and
//! [`metadata`]/[`archetype_registry`] intern signatures into globally
//! consistent ids shared across every [`World`] built from the same
//! [`metadata::SharedArchetypeMetadata`]. [`entity`] maps entity handles to
//! their archetype location; [`world`] ties all of it into spawn/despawn/
//! component get-set-add-remove, and [`builder`] adds a fluent surface on
//! top. [`system`]/[`schedule`]/[`executor`] add a conflict-aware wave
//! scheduler.

pub mod archetype;
pub mod archetype_registry;
pub mod bitset;
pub mod builder;
pub mod chunk;
pub mod command;
pub mod component;
pub mod config;
pub mod entity;
pub mod error;
pub mod layout;
pub(crate) mod lifecycle;
pub mod metadata;
pub mod query;
pub mod registry;
pub mod utils;
pub mod world;

pub mod executor;
pub mod schedule;
pub mod system;

// Re-exports for convenience.
pub use archetype::Archetype;
pub use archetype_registry::ArchetypeRegistry;
pub use bitset::{BitSet, ComponentMask};
pub use builder::{EntityBuilder, QueryBuilder};
pub use chunk::{ChunkHandle, ChunkManager, ChunkView};
pub use command::CommandBuffer;
pub use component::{Bundle, Component};
pub use config::EcsConfig;
pub use entity::{EntityId, EntityLocation, EntityManager};
pub use error::{EcsError, Result};
pub use layout::ArchetypeLayout;
pub use metadata::{QueryDescription, SharedArchetypeMetadata};
pub use query::{Query, QueryChunk, QueryChunkMut};
pub use registry::{ComponentId, TypeRegistry};
pub use world::World;

pub use executor::{Executor, Sequential, SystemProfiler, WaveStrategy};
#[cfg(feature = "parallel")]
pub use executor::Parallel;
pub use schedule::Schedule;
pub use system::{BoxedSystem, System, SystemAccess, SystemId};

#[cfg(test)]
mod tests;
