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

//! Per-world materialization of [`Archetype`] storage against shared
//! metadata, plus per-world query archetype-list caches.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::archetype::Archetype;
use crate::bitset::ComponentMask;
use crate::error::Result;
use crate::lifecycle::Lifecycle;
use crate::metadata::{QueryDescription, SharedArchetypeMetadata};
use crate::registry::ComponentId;

/// One query's locally-cached match list: the description (so a newly
/// materialized archetype can be tested against it) and the archetype ids
/// that have been found to match and already have a local instance.
struct CachedQuery {
    description: QueryDescription,
    matches: Vec<u32>,
}

struct Inner {
    archetypes: Vec<Option<Arc<Archetype>>>,
    query_cache: AHashMap<u32, CachedQuery>,
}

/// Owns the actual per-entity storage for one `World`; archetype ids and
/// layouts are borrowed from the shared metadata so every world sharing it
/// agrees on what id a given signature has.
pub struct ArchetypeRegistry {
    metadata: Arc<SharedArchetypeMetadata>,
    chunk_size: usize,
    max_meta_blocks: usize,
    inner: RwLock<Inner>,
    lifecycle: Lifecycle,
}

impl ArchetypeRegistry {
    pub fn new(metadata: Arc<SharedArchetypeMetadata>, chunk_size: usize, max_meta_blocks: usize) -> Self {
        Self {
            metadata,
            chunk_size,
            max_meta_blocks,
            inner: RwLock::new(Inner { archetypes: Vec::new(), query_cache: AHashMap::default() }),
            lifecycle: Lifecycle::default(),
        }
    }

    pub fn metadata(&self) -> &Arc<SharedArchetypeMetadata> {
        &self.metadata
    }

    /// Mark this registry disposed, draining in-flight operations first.
    pub fn shutdown(&self) {
        self.lifecycle.shutdown();
    }

    pub fn is_disposed(&self) -> bool {
        self.lifecycle.is_disposed()
    }

    fn materialize(&self, archetype_id: u32) -> Arc<Archetype> {
        {
            let inner = self.inner.read();
            if let Some(Some(arch)) = inner.archetypes.get(archetype_id as usize) {
                return arch.clone();
            }
        }
        let mut inner = self.inner.write();
        let idx = archetype_id as usize;
        if inner.archetypes.len() <= idx {
            inner.archetypes.resize(idx + 1, None);
        }
        if let Some(arch) = &inner.archetypes[idx] {
            return arch.clone();
        }
        let layout = self.metadata.layout(archetype_id);
        let arch = Arc::new(Archetype::new(archetype_id, layout, self.chunk_size, self.max_meta_blocks));
        inner.archetypes[idx] = Some(arch.clone());

        // Notify every locally-cached query whose description now matches
        // this newly materialized archetype -- the append-on-create step
        // spec.md §4.5/§9 describes ("future archetypes created in this
        // world that match will be appended via the notification
        // mechanism").
        for cached in inner.query_cache.values_mut() {
            if cached.description.matches(&arch.layout.mask) && !cached.matches.contains(&archetype_id) {
                cached.matches.push(archetype_id);
            }
        }
        arch
    }

    /// Look up an already-materialized archetype without creating one.
    fn peek(&self, archetype_id: u32) -> Option<Arc<Archetype>> {
        self.inner.read().archetypes.get(archetype_id as usize)?.clone()
    }

    /// Resolve `mask` to its archetype id and a materialized `Archetype`.
    pub fn get_or_create(&self, mask: ComponentMask) -> Result<Arc<Archetype>> {
        let _guard = self.lifecycle.enter()?;
        let id = self.metadata.get_or_create_archetype_id(mask)?;
        Ok(self.materialize(id))
    }

    pub fn get_or_create_with_add(&self, archetype_id: u32, component: ComponentId) -> Result<Arc<Archetype>> {
        let _guard = self.lifecycle.enter()?;
        let id = self.metadata.get_or_create_with_add(archetype_id, component)?;
        Ok(self.materialize(id))
    }

    pub fn get_or_create_with_remove(&self, archetype_id: u32, component: ComponentId) -> Result<Arc<Archetype>> {
        let _guard = self.lifecycle.enter()?;
        let id = self.metadata.get_or_create_with_remove(archetype_id, component)?;
        Ok(self.materialize(id))
    }

    pub fn get(&self, archetype_id: u32) -> Option<Arc<Archetype>> {
        self.inner.read().archetypes.get(archetype_id as usize).cloned().flatten()
    }

    /// Borrow a materialized archetype with a lifetime tied to `&self`
    /// rather than to a cloned `Arc`. Sound because registry slots, once
    /// populated, are never replaced or removed for the life of this
    /// registry -- the `Arc`'s pointee address is therefore stable for as
    /// long as `&self` is.
    pub fn get_ref(&self, archetype_id: u32) -> Option<&Archetype> {
        let inner = self.inner.read();
        let arc = inner.archetypes.get(archetype_id as usize)?.as_ref()?;
        Some(unsafe { &*(Arc::as_ptr(arc)) })
    }

    /// Archetypes in this world currently matching `description`. Only
    /// archetypes materialized locally are included -- a strict subset of
    /// everything the shared metadata knows matches globally. The query's
    /// description is cached so that any archetype materialized in this
    /// world afterward (via `get_or_create*`) gets appended automatically
    /// if it matches, without re-running this query.
    pub fn get_or_create_query(&self, description: QueryDescription) -> Result<Vec<Arc<Archetype>>> {
        let _guard = self.lifecycle.enter()?;
        let query_id = self.metadata.get_or_create_query_id(description.clone())?;
        let global_matches = self.metadata.matching_archetypes(query_id);
        let local_matches: Vec<u32> = global_matches.into_iter().filter(|&id| self.peek(id).is_some()).collect();
        {
            let mut inner = self.inner.write();
            inner
                .query_cache
                .entry(query_id)
                .and_modify(|cached| {
                    for &id in &local_matches {
                        if !cached.matches.contains(&id) {
                            cached.matches.push(id);
                        }
                    }
                })
                .or_insert_with(|| CachedQuery { description, matches: local_matches.clone() });
        }
        Ok(local_matches.into_iter().filter_map(|id| self.peek(id)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;

    fn registry() -> ArchetypeRegistry {
        let meta = Arc::new(SharedArchetypeMetadata::new(Arc::new(TypeRegistry::new()), 4096, 1024));
        ArchetypeRegistry::new(meta, 4096, 64)
    }

    #[test]
    fn same_mask_materializes_same_archetype() {
        let reg = registry();
        let mask = ComponentMask::new().with(ComponentId(0));
        let a = reg.get_or_create(mask.clone()).unwrap();
        let b = reg.get_or_create(mask).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn query_result_is_subset_of_global_matches() {
        let reg = registry();
        let mask = ComponentMask::new().with(ComponentId(0));
        let arch = reg.get_or_create(mask.clone()).unwrap();
        let desc = QueryDescription { all: mask, ..Default::default() };
        let result = reg.get_or_create_query(desc).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, arch.id);
    }

    #[test]
    fn get_ref_resolves_a_materialized_archetype() {
        let reg = registry();
        let mask = ComponentMask::new().with(ComponentId(0));
        let arch = reg.get_or_create(mask).unwrap();
        let arch_ref = reg.get_ref(arch.id).unwrap();
        assert_eq!(arch_ref.id, arch.id);
    }

    #[test]
    fn materializing_a_new_archetype_notifies_an_existing_cached_query() {
        let reg = registry();
        let mask = ComponentMask::new().with(ComponentId(0));
        let desc = QueryDescription { all: mask.clone(), ..Default::default() };

        // Build the query before any matching archetype exists locally.
        let result = reg.get_or_create_query(desc.clone()).unwrap();
        assert!(result.is_empty());

        // Materialize a matching archetype afterward, through the same path
        // `World::add_component`/`spawn_with` use.
        let arch = reg.get_or_create(mask).unwrap();

        // The query's cached entry is updated by the notify step inside
        // `materialize`, not by re-deriving from scratch.
        let query_id = reg.metadata.get_or_create_query_id(desc).unwrap();
        let cached = reg.inner.read().query_cache.get(&query_id).unwrap().matches.clone();
        assert_eq!(cached, vec![arch.id]);
    }

    #[test]
    fn shutdown_rejects_further_operations() {
        let reg = registry();
        reg.shutdown();
        let err = reg.get_or_create(ComponentMask::new());
        assert!(matches!(err, Err(crate::error::EcsError::Disposed)));
    }
}
