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

//! Fluent surfaces over spawn/overwrite and query construction.
//!
//! `EntityBuilder` and `QueryBuilder` are observable conveniences over
//! `World`'s own spawn/add/remove and query methods -- neither holds any
//! state `World` doesn't already expose, so both are thin enough to build
//! fresh each call.

use crate::bitset::ComponentMask;
use crate::component::Component;
use crate::entity::EntityId;
use crate::error::Result;
use crate::metadata::QueryDescription;
use crate::query::Query;
use crate::world::World;

type BoxedInsert = Box<dyn FnOnce(&World, EntityId) -> Result<()> + Send>;

/// Accumulates components for a single entity, then spawns or overwrites
/// through a `World` in one call.
#[derive(Default)]
pub struct EntityBuilder {
    inserts: Vec<BoxedInsert>,
}

impl EntityBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `value` to be attached once this builder is applied.
    pub fn with<C: Component>(mut self, value: C) -> Self {
        let cell = std::sync::Mutex::new(Some(value));
        self.inserts.push(Box::new(move |world, entity| {
            let value = cell.lock().unwrap().take().expect("with() closure invoked once");
            world.add_component(entity, value)
        }));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty()
    }

    /// Spawn a fresh entity and attach every queued component.
    pub fn build(self, world: &World) -> Result<EntityId> {
        let entity = world.spawn()?;
        self.add_to(world, entity)?;
        Ok(entity)
    }

    /// Clear every component `entity` currently carries and replace them
    /// with exactly what this builder queued -- including the empty case,
    /// which must still clear rather than short-circuit (see
    /// `World::clear_components`).
    pub fn overwrite(self, world: &World, entity: EntityId) -> Result<EntityId> {
        world.clear_components(entity)?;
        self.add_to(world, entity)?;
        Ok(entity)
    }

    /// Attach every queued component to an already-alive `entity`. Fails
    /// with `ComponentAlreadyPresent` if `entity` already carries one of
    /// them (same precondition as a direct `World::add_component` call).
    pub fn add_to(self, world: &World, entity: EntityId) -> Result<()> {
        for insert in self.inserts {
            insert(world, entity)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for EntityBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityBuilder").field("pending", &self.inserts.len()).finish()
    }
}

/// Builds a [`QueryDescription`] fluently: `.all::<C>()` / `.none::<C>()` /
/// `.any::<C>()`, then [`QueryBuilder::build`] resolves it against a world.
#[derive(Default)]
pub struct QueryBuilder {
    all: ComponentMask,
    none: ComponentMask,
    any: ComponentMask,
    // Deferred until `build`, since registering a component requires the
    // world's type registry, which this builder doesn't hold a reference to
    // until then.
    pending: Vec<(QuerySlot, Box<dyn Fn(&World) -> Result<crate::registry::ComponentId> + Send>)>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum QuerySlot {
    All,
    None,
    Any,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push<C: Component>(mut self, slot: QuerySlot) -> Self {
        self.pending.push((slot, Box::new(|world: &World| world.type_registry().register::<C>())));
        self
    }

    /// Every matching entity must carry `C`.
    pub fn all<C: Component>(self) -> Self {
        self.push::<C>(QuerySlot::All)
    }

    /// No matching entity may carry `C`.
    pub fn none<C: Component>(self) -> Self {
        self.push::<C>(QuerySlot::None)
    }

    /// If any `.any` constraints are present, a matching entity must carry
    /// at least one of them.
    pub fn any<C: Component>(self) -> Self {
        self.push::<C>(QuerySlot::Any)
    }

    /// Resolve every queued component against `world`'s type registry and
    /// snapshot the matching archetypes into a [`Query`].
    pub fn build(self, world: &World) -> Result<Query> {
        let mut all = self.all;
        let mut none = self.none;
        let mut any = self.any;
        for (slot, resolve) in self.pending {
            let id = resolve(world)?;
            match slot {
                QuerySlot::All => all.set(id),
                QuerySlot::None => none.set(id),
                QuerySlot::Any => any.set(id),
            }
        }
        world.query(QueryDescription { all, none, any })
    }
}

impl std::fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder").field("pending_constraints", &self.pending.len()).finish()
    }
}
