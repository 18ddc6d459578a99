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

//! Component type identification.
//!
//! Stands in for the external "component registry" collaborator: assigns
//! every distinct component type a dense, process-wide `ComponentId` and
//! records its size/alignment. No code generation or GUID machinery is
//! built here -- that discovery layer is out of scope.

use std::any::TypeId;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{EcsError, Result};

/// Dense, process-wide identifier for a component type. Fits in 11 bits per
/// the archetype edge-cache packing; `ComponentCapacityExceeded` is returned
/// if more than 2048 distinct component types are registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(pub u16);

pub const MAX_COMPONENT_ID: usize = 1 << 11;

/// Size, alignment, and name of a registered component type.
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub size: usize,
    pub align: usize,
}

struct Inner {
    ids: FxHashMap<TypeId, ComponentId>,
    infos: Vec<TypeInfo>,
}

/// Process-wide table mapping `TypeId` to a dense `ComponentId`, with the
/// size/alignment of every registered type.
pub struct TypeRegistry {
    inner: RwLock<Inner>,
    next: AtomicUsize,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner { ids: FxHashMap::default(), infos: Vec::new() }),
            next: AtomicUsize::new(0),
        }
    }

    /// Look up or assign a `ComponentId` for `T`, recording its layout.
    pub fn register<T: 'static>(&self) -> Result<ComponentId> {
        let type_id = TypeId::of::<T>();
        if let Some(id) = self.inner.read().ids.get(&type_id).copied() {
            return Ok(id);
        }
        let mut inner = self.inner.write();
        // Re-check: another thread may have registered while we waited for the write lock.
        if let Some(id) = inner.ids.get(&type_id).copied() {
            return Ok(id);
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        if index >= MAX_COMPONENT_ID {
            return Err(EcsError::ComponentCapacityExceeded);
        }
        let id = ComponentId(index as u16);
        inner.ids.insert(type_id, id);
        inner.infos.push(TypeInfo { size: std::mem::size_of::<T>(), align: std::mem::align_of::<T>() });
        Ok(id)
    }

    /// Look up the `ComponentId` for `T` without registering it.
    pub fn id_of<T: 'static>(&self) -> Option<ComponentId> {
        self.inner.read().ids.get(&TypeId::of::<T>()).copied()
    }

    /// Fetch the recorded layout for a previously-registered id.
    pub fn type_info(&self, id: ComponentId) -> TypeInfo {
        self.inner.read().infos[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.inner.read().infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
