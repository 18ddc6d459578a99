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

//! Process-wide interning of archetype signatures, their add/remove edge
//! cache, and query-to-archetype matching. Shared across every `World` built
//! from the same registry so archetype ids and layouts agree everywhere.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::bitset::ComponentMask;
use crate::error::{EcsError, Result};
use crate::layout::ArchetypeLayout;
use crate::lifecycle::Lifecycle;
use crate::registry::{ComponentId, TypeRegistry};

/// `all`/`none`/`any` match description for a query, as defined in the data
/// model: a mask matches iff it is a superset of `all`, disjoint from
/// `none`, and (if `any` is non-empty) intersects `any`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryDescription {
    pub all: ComponentMask,
    pub none: ComponentMask,
    pub any: ComponentMask,
}

impl QueryDescription {
    pub fn matches(&self, mask: &ComponentMask) -> bool {
        mask.is_superset_of(&self.all) && !mask.intersects(&self.none) && (self.any.is_empty() || mask.intersects(&self.any))
    }
}

fn edge_key(archetype_id: u32, component: ComponentId) -> u64 {
    ((archetype_id as u64) << 11) | component.0 as u64
}

struct Inner {
    mask_to_id: AHashMap<ComponentMask, u32>,
    layouts: Vec<Arc<ArchetypeLayout>>,
    add_edges: AHashMap<u64, u32>,
    remove_edges: AHashMap<u64, u32>,
    query_ids: AHashMap<QueryDescription, u32>,
    queries: Vec<QueryDescription>,
    query_matches: Vec<Vec<u32>>,
}

/// Shared, group-wide metadata: signature interning, edge cache, and query
/// registration/matching. Every `World` sharing one of these sees the same
/// archetype ids and layouts.
pub struct SharedArchetypeMetadata {
    registry: Arc<TypeRegistry>,
    chunk_size: usize,
    max_archetypes: usize,
    inner: RwLock<Inner>,
    lifecycle: Lifecycle,
}

impl SharedArchetypeMetadata {
    pub fn new(registry: Arc<TypeRegistry>, chunk_size: usize, max_archetypes: usize) -> Self {
        Self {
            registry,
            chunk_size,
            max_archetypes,
            inner: RwLock::new(Inner {
                mask_to_id: AHashMap::default(),
                layouts: Vec::new(),
                add_edges: AHashMap::default(),
                remove_edges: AHashMap::default(),
                query_ids: AHashMap::default(),
                queries: Vec::new(),
                query_matches: Vec::new(),
            }),
            lifecycle: Lifecycle::default(),
        }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Mark this metadata disposed, draining in-flight operations first.
    /// Does not affect any `World` built against it (per §5, a world's
    /// shutdown never shuts down its shared collaborators, and the
    /// converse holds too: a shared metadata's shutdown is independent of
    /// any world still referencing it).
    pub fn shutdown(&self) {
        self.lifecycle.shutdown();
    }

    pub fn is_disposed(&self) -> bool {
        self.lifecycle.is_disposed()
    }

    /// Intern `mask`, creating a fresh archetype id (and computing its
    /// layout) if this is the first time it's been seen.
    pub fn get_or_create_archetype_id(&self, mask: ComponentMask) -> Result<u32> {
        let _guard = self.lifecycle.enter()?;
        if let Some(id) = self.inner.read().mask_to_id.get(&mask).copied() {
            return Ok(id);
        }
        let mut inner = self.inner.write();
        if let Some(id) = inner.mask_to_id.get(&mask).copied() {
            return Ok(id);
        }
        if inner.layouts.len() >= self.max_archetypes {
            return Err(EcsError::ArchetypeLimitExceeded);
        }
        let registry = self.registry.clone();
        let layout = ArchetypeLayout::compute(mask.clone(), self.chunk_size, move |id| registry.type_info(id));
        let id = inner.layouts.len() as u32;
        inner.layouts.push(Arc::new(layout));
        inner.mask_to_id.insert(mask.clone(), id);

        #[cfg(feature = "profiling")]
        tracing::debug!(archetype = id, "created archetype");

        let matching_queries: Vec<usize> =
            inner.queries.iter().enumerate().filter(|(_, d)| d.matches(&mask)).map(|(i, _)| i).collect();
        for qi in matching_queries {
            inner.query_matches[qi].push(id);
        }
        Ok(id)
    }

    /// Cached `mask ∪ {component}` transition from `archetype_id`.
    pub fn get_or_create_with_add(&self, archetype_id: u32, component: ComponentId) -> Result<u32> {
        let _guard = self.lifecycle.enter()?;
        let key = edge_key(archetype_id, component);
        if let Some(id) = self.inner.read().add_edges.get(&key).copied() {
            return Ok(id);
        }
        let mask = {
            let inner = self.inner.read();
            let mut m = inner.layouts[archetype_id as usize].mask.clone();
            m.set(component);
            m
        };
        let new_id = self.get_or_create_archetype_id(mask)?;
        self.inner.write().add_edges.insert(key, new_id);
        Ok(new_id)
    }

    /// Cached `mask \ {component}` transition from `archetype_id`.
    pub fn get_or_create_with_remove(&self, archetype_id: u32, component: ComponentId) -> Result<u32> {
        let _guard = self.lifecycle.enter()?;
        let key = edge_key(archetype_id, component);
        if let Some(id) = self.inner.read().remove_edges.get(&key).copied() {
            return Ok(id);
        }
        let mask = {
            let inner = self.inner.read();
            let mut m = inner.layouts[archetype_id as usize].mask.clone();
            m.clear(component);
            m
        };
        let new_id = self.get_or_create_archetype_id(mask)?;
        self.inner.write().remove_edges.insert(key, new_id);
        Ok(new_id)
    }

    pub fn layout(&self, archetype_id: u32) -> Arc<ArchetypeLayout> {
        self.inner.read().layouts[archetype_id as usize].clone()
    }

    pub fn archetype_count(&self) -> usize {
        self.inner.read().layouts.len()
    }

    /// Intern a query description, immediately matching it against every
    /// archetype created so far.
    pub fn get_or_create_query_id(&self, description: QueryDescription) -> Result<u32> {
        let _guard = self.lifecycle.enter()?;
        if let Some(id) = self.inner.read().query_ids.get(&description).copied() {
            return Ok(id);
        }
        let mut inner = self.inner.write();
        if let Some(id) = inner.query_ids.get(&description).copied() {
            return Ok(id);
        }
        let matches: Vec<u32> = inner
            .layouts
            .iter()
            .enumerate()
            .filter(|(_, layout)| description.matches(&layout.mask))
            .map(|(i, _)| i as u32)
            .collect();
        let id = inner.queries.len() as u32;
        inner.queries.push(description.clone());
        inner.query_matches.push(matches);
        inner.query_ids.insert(description, id);
        Ok(id)
    }

    /// Archetype ids currently matching `query_id`.
    pub fn matching_archetypes(&self, query_id: u32) -> Vec<u32> {
        self.inner.read().query_matches[query_id as usize].clone()
    }
}
