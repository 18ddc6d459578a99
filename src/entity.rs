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

//! Entity identifiers and the version-tagged location table.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::error::{EcsError, Result};
use crate::lifecycle::Lifecycle;

/// A lightweight entity handle: a slot index plus the generation it was
/// minted with. `version == 0` is the invalid sentinel; no live entity ever
/// carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EntityId {
    pub id: u32,
    pub version: u32,
}

impl EntityId {
    pub const INVALID: EntityId = EntityId { id: 0, version: 0 };

    pub fn is_invalid(self) -> bool {
        self.version == 0
    }
}

/// Where a live entity's row lives, or the "unplaced" marker for an entity
/// that was spawned but has not yet been assigned into an archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityLocation {
    pub archetype_id: i32,
    pub global_index: i32,
}

impl EntityLocation {
    pub const UNPLACED: EntityLocation = EntityLocation { archetype_id: -1, global_index: -1 };
}

/// Packs `(alive: bool, generation: u32)` into one `u64` so destroy/create
/// can each be expressed as a single compare-and-swap.
fn pack(alive: bool, generation: u32) -> u64 {
    ((generation as u64) << 1) | alive as u64
}

fn unpack(state: u64) -> (bool, u32) {
    (state & 1 != 0, (state >> 1) as u32)
}

struct Slot {
    state: AtomicU64,
    location: Mutex<EntityLocation>,
}

impl Slot {
    fn new(generation: u32, alive: bool) -> Self {
        Self { state: AtomicU64::new(pack(alive, generation)), location: Mutex::new(EntityLocation::UNPLACED) }
    }
}

/// Version-tagged entity id allocator with LIFO free-list reuse.
///
/// Slots never move once created; capacity growth only ever appends, guarded
/// by the slots `RwLock`'s write half, so a reader holding a read lock never
/// observes a torn vector.
pub struct EntityManager {
    slots: RwLock<Vec<Slot>>,
    free_list: Mutex<Vec<u32>>,
    alive_count: AtomicU64,
    lifecycle: Lifecycle,
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new(0)
    }
}

impl EntityManager {
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            slots: RwLock::new(Vec::with_capacity(initial_capacity)),
            free_list: Mutex::new(Vec::new()),
            alive_count: AtomicU64::new(0),
            lifecycle: Lifecycle::default(),
        }
    }

    /// Mint a new entity, reusing a free slot (and bumping its generation)
    /// if one is available, else growing the slot table.
    pub fn create(&self) -> Result<EntityId> {
        let _guard = self.lifecycle.enter()?;
        if let Some(id) = self.free_list.lock().pop() {
            let slots = self.slots.read();
            let slot = &slots[id as usize];
            loop {
                let state = slot.state.load(Ordering::Acquire);
                let (alive, generation) = unpack(state);
                debug_assert!(!alive, "free-listed slot must not be alive");
                let new_generation = generation.wrapping_add(1).max(1);
                let new_state = pack(true, new_generation);
                if slot.state.compare_exchange(state, new_state, Ordering::AcqRel, Ordering::Acquire).is_ok() {
                    *slot.location.lock() = EntityLocation::UNPLACED;
                    self.alive_count.fetch_add(1, Ordering::Relaxed);
                    return Ok(EntityId { id, version: new_generation });
                }
            }
        }
        let mut slots = self.slots.write();
        let id = slots.len() as u32;
        slots.push(Slot::new(1, true));
        self.alive_count.fetch_add(1, Ordering::Relaxed);
        Ok(EntityId { id, version: 1 })
    }

    /// Retire `entity`. Fails with [`EcsError::EntityNotAlive`] if it does
    /// not match the slot's current generation.
    pub fn destroy(&self, entity: EntityId) -> Result<()> {
        let _guard = self.lifecycle.enter()?;
        let slots = self.slots.read();
        let slot = slots.get(entity.id as usize).ok_or(EcsError::EntityNotAlive)?;
        loop {
            let state = slot.state.load(Ordering::Acquire);
            let (alive, generation) = unpack(state);
            if !alive || generation != entity.version {
                return Err(EcsError::EntityNotAlive);
            }
            let new_state = pack(false, generation);
            if slot.state.compare_exchange(state, new_state, Ordering::AcqRel, Ordering::Acquire).is_ok() {
                drop(slots);
                self.free_list.lock().push(entity.id);
                self.alive_count.fetch_sub(1, Ordering::Relaxed);
                return Ok(());
            }
        }
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        if entity.is_invalid() {
            return false;
        }
        let slots = self.slots.read();
        match slots.get(entity.id as usize) {
            Some(slot) => {
                let (alive, generation) = unpack(slot.state.load(Ordering::Acquire));
                alive && generation == entity.version
            }
            None => false,
        }
    }

    /// Current location for a live entity.
    pub fn try_get_location(&self, entity: EntityId) -> Option<EntityLocation> {
        let slots = self.slots.read();
        let slot = slots.get(entity.id as usize)?;
        let (alive, generation) = unpack(slot.state.load(Ordering::Acquire));
        if alive && generation == entity.version {
            Some(*slot.location.lock())
        } else {
            None
        }
    }

    /// Overwrite a live entity's location. Returns `false` if the entity is
    /// not alive (caller likely raced a despawn).
    pub fn set_location(&self, entity: EntityId, location: EntityLocation) -> bool {
        let slots = self.slots.read();
        let Some(slot) = slots.get(entity.id as usize) else { return false };
        let (alive, generation) = unpack(slot.state.load(Ordering::Acquire));
        if alive && generation == entity.version {
            *slot.location.lock() = location;
            true
        } else {
            false
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.read().len()
    }

    pub fn alive_count(&self) -> usize {
        self.alive_count.load(Ordering::Relaxed) as usize
    }

    /// Every currently alive entity, in slot order. `O(capacity)` -- meant
    /// for bulk paths like `World::clear`, not per-frame use.
    pub fn alive_entities(&self) -> Vec<EntityId> {
        let slots = self.slots.read();
        slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| {
                let (alive, generation) = unpack(slot.state.load(Ordering::Acquire));
                alive.then_some(EntityId { id: id as u32, version: generation })
            })
            .collect()
    }

    /// Mark this manager disposed, draining in-flight operations first.
    pub fn shutdown(&self) {
        self.lifecycle.shutdown();
    }

    pub fn is_disposed(&self) -> bool {
        self.lifecycle.is_disposed()
    }
}
