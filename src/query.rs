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

//! Query: a snapshot of the archetypes currently matching an `all`/`none`/
//! `any` [`QueryDescription`], with entity- and chunk-level iteration.
//!
//! A `Query` is a point-in-time snapshot -- archetypes created after it was
//! built are not included, matching the per-world query cache in
//! `ArchetypeRegistry`. Re-run `World::query` to pick up newly created
//! archetypes.

use std::sync::Arc;

use crate::archetype::Archetype;
use crate::chunk::ChunkView;
use crate::component::Component;
use crate::entity::EntityId;
use crate::error::Result;
use crate::registry::TypeRegistry;

/// The archetypes matching one query, materialized at the time it was built.
pub struct Query {
    archetypes: Vec<Arc<Archetype>>,
    type_registry: Arc<TypeRegistry>,
}

impl Query {
    pub(crate) fn new(archetypes: Vec<Arc<Archetype>>, type_registry: Arc<TypeRegistry>) -> Self {
        Self { archetypes, type_registry }
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    pub fn entity_count(&self) -> usize {
        self.archetypes.iter().map(|a| a.entity_count()).sum()
    }

    /// Visit every matching entity as `(entity, archetype_id, global_index)`.
    pub fn for_each_entity<F: FnMut(EntityId, u32, usize)>(&self, mut f: F) -> Result<()> {
        for arch in &self.archetypes {
            for index in 0..arch.entity_count() {
                f(arch.entity_at(index)?, arch.id, index);
            }
        }
        Ok(())
    }

    /// Visit every chunk across every matching archetype with read-only
    /// component access.
    pub fn for_each_chunk<F: FnMut(QueryChunk<'_>)>(&self, mut f: F) -> Result<()> {
        for arch in &self.archetypes {
            let (handles, entity_count) = arch.chunk_snapshot();
            let per_chunk = arch.layout.entities_per_chunk;
            for (i, &handle) in handles.iter().enumerate() {
                let rows = rows_in_chunk(i, handles.len(), per_chunk, entity_count);
                let view = arch.chunk_manager().borrow(handle)?;
                f(QueryChunk { archetype: arch, view, rows, type_registry: &self.type_registry });
            }
        }
        Ok(())
    }

    /// Visit every chunk with exclusive component access.
    pub fn for_each_chunk_mut<F: FnMut(QueryChunkMut<'_>)>(&self, mut f: F) -> Result<()> {
        for arch in &self.archetypes {
            let (handles, entity_count) = arch.chunk_snapshot();
            let per_chunk = arch.layout.entities_per_chunk;
            for (i, &handle) in handles.iter().enumerate() {
                let rows = rows_in_chunk(i, handles.len(), per_chunk, entity_count);
                let view = arch.chunk_manager().borrow_mut(handle)?;
                f(QueryChunkMut { archetype: arch, view, rows, type_registry: &self.type_registry });
            }
        }
        Ok(())
    }

    /// `(archetype, chunk handle, row count)` for every chunk currently in
    /// the snapshot -- the (system × chunk) work-item decomposition the
    /// wave scheduler's chunk-level parallelism is built from.
    fn chunk_work_items(&self) -> Vec<(&Archetype, crate::chunk::ChunkHandle, usize)> {
        let mut items = Vec::new();
        for arch in &self.archetypes {
            let (handles, entity_count) = arch.chunk_snapshot();
            let per_chunk = arch.layout.entities_per_chunk;
            for (i, &handle) in handles.iter().enumerate() {
                let rows = rows_in_chunk(i, handles.len(), per_chunk, entity_count);
                items.push((arch.as_ref(), handle, rows));
            }
        }
        items
    }

    /// Same as [`Self::for_each_chunk`], but each chunk is an independent
    /// work item dispatched across rayon's pool instead of visited in
    /// sequence. Sound because distinct chunks, even within one archetype,
    /// never alias the same bytes -- the per-row stride is fixed and each
    /// chunk owns its own backing slab.
    #[cfg(feature = "parallel")]
    pub fn par_for_each_chunk<F>(&self, f: F) -> Result<()>
    where
        F: Fn(QueryChunk<'_>) + Send + Sync,
    {
        use rayon::prelude::*;

        self.chunk_work_items().into_par_iter().try_for_each(|(arch, handle, rows)| -> Result<()> {
            let view = arch.chunk_manager().borrow(handle)?;
            f(QueryChunk { archetype: arch, view, rows, type_registry: &self.type_registry });
            Ok(())
        })
    }

    /// Mutable counterpart of [`Self::par_for_each_chunk`]. Two chunks are
    /// disjoint memory by construction, so handing out concurrent
    /// `QueryChunkMut`s across them is sound -- there is exactly one
    /// exclusive borrow in flight per chunk handle at a time.
    #[cfg(feature = "parallel")]
    pub fn par_for_each_chunk_mut<F>(&self, f: F) -> Result<()>
    where
        F: Fn(QueryChunkMut<'_>) + Send + Sync,
    {
        use rayon::prelude::*;

        self.chunk_work_items().into_par_iter().try_for_each(|(arch, handle, rows)| -> Result<()> {
            let view = arch.chunk_manager().borrow_mut(handle)?;
            f(QueryChunkMut { archetype: arch, view, rows, type_registry: &self.type_registry });
            Ok(())
        })
    }
}

fn rows_in_chunk(chunk_index: usize, chunk_count: usize, per_chunk: usize, entity_count: usize) -> usize {
    if chunk_index + 1 == chunk_count {
        entity_count - chunk_index * per_chunk
    } else {
        per_chunk
    }
}

/// One chunk's worth of entities from a matched archetype, read-only.
pub struct QueryChunk<'a> {
    archetype: &'a Archetype,
    view: ChunkView<'a>,
    rows: usize,
    type_registry: &'a TypeRegistry,
}

impl<'a> QueryChunk<'a> {
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn has<C: Component>(&self) -> bool {
        match self.type_registry.id_of::<C>() {
            Some(id) => self.archetype.layout.column(id).is_some(),
            None => false,
        }
    }

    /// The chunk's `C` column, or `None` if this archetype does not carry
    /// `C` (or `C` is zero-sized and so has no backing cells).
    pub fn get_span<C: Component>(&self) -> Option<&[C]> {
        let id = self.type_registry.id_of::<C>()?;
        let col = self.archetype.layout.column(id)?;
        if col.size == 0 {
            return None;
        }
        Some(unsafe { self.view.span::<C>(col.offset, self.rows) })
    }
}

/// One chunk's worth of entities from a matched archetype, with write access.
pub struct QueryChunkMut<'a> {
    archetype: &'a Archetype,
    view: ChunkView<'a>,
    rows: usize,
    type_registry: &'a TypeRegistry,
}

impl<'a> QueryChunkMut<'a> {
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn has<C: Component>(&self) -> bool {
        match self.type_registry.id_of::<C>() {
            Some(id) => self.archetype.layout.column(id).is_some(),
            None => false,
        }
    }

    pub fn get_span<C: Component>(&self) -> Option<&[C]> {
        let id = self.type_registry.id_of::<C>()?;
        let col = self.archetype.layout.column(id)?;
        if col.size == 0 {
            return None;
        }
        Some(unsafe { self.view.span::<C>(col.offset, self.rows) })
    }

    pub fn get_span_mut<C: Component>(&self) -> Option<&mut [C]> {
        let id = self.type_registry.id_of::<C>()?;
        let col = self.archetype.layout.column(id)?;
        if col.size == 0 {
            return None;
        }
        Some(unsafe { self.view.span_mut::<C>(col.offset, self.rows) })
    }
}

#[cfg(test)]
mod tests {
    use crate::config::EcsConfig;
    use crate::metadata::QueryDescription;
    use crate::world::World;

    #[derive(Debug, Clone, Copy)]
    struct Position {
        x: f32,
    }

    #[derive(Debug, Clone, Copy)]
    struct Velocity {
        dx: f32,
    }

    struct Tag;

    #[test]
    fn query_matches_only_entities_carrying_every_all_component() {
        let w = World::with_config(EcsConfig::new().with_chunk_size(4096));
        let e0 = w.spawn().unwrap();
        w.add_component(e0, Position { x: 1.0 }).unwrap();
        let e1 = w.spawn().unwrap();
        w.add_component(e1, Position { x: 2.0 }).unwrap();
        w.add_component(e1, Velocity { dx: 3.0 }).unwrap();
        let _e2 = w.spawn().unwrap();

        let pos_id = w.type_registry().register::<Position>().unwrap();
        let desc = QueryDescription { all: crate::bitset::ComponentMask::new().with(pos_id), ..Default::default() };
        let query = w.query(desc).unwrap();
        assert_eq!(query.entity_count(), 2);
    }

    #[test]
    fn query_excludes_entities_with_a_none_component() {
        let w = World::with_config(EcsConfig::new().with_chunk_size(4096));
        let e0 = w.spawn().unwrap();
        w.add_component(e0, Position { x: 1.0 }).unwrap();
        let e1 = w.spawn().unwrap();
        w.add_component(e1, Position { x: 2.0 }).unwrap();
        w.add_component(e1, Tag).unwrap();

        let pos_id = w.type_registry().register::<Position>().unwrap();
        let tag_id = w.type_registry().register::<Tag>().unwrap();
        let desc = QueryDescription {
            all: crate::bitset::ComponentMask::new().with(pos_id),
            none: crate::bitset::ComponentMask::new().with(tag_id),
            ..Default::default()
        };
        let query = w.query(desc).unwrap();
        assert_eq!(query.entity_count(), 1);
    }

    #[test]
    fn for_each_chunk_reads_back_component_values() {
        let w = World::with_config(EcsConfig::new().with_chunk_size(4096));
        let e0 = w.spawn().unwrap();
        w.add_component(e0, Position { x: 7.0 }).unwrap();

        let pos_id = w.type_registry().register::<Position>().unwrap();
        let desc = QueryDescription { all: crate::bitset::ComponentMask::new().with(pos_id), ..Default::default() };
        let query = w.query(desc).unwrap();

        let mut seen = 0;
        query
            .for_each_chunk(|chunk| {
                if let Some(span) = chunk.get_span::<Position>() {
                    for p in span {
                        assert_eq!(p.x, 7.0);
                        seen += 1;
                    }
                }
            })
            .unwrap();
        assert_eq!(seen, 1);
    }

    #[test]
    fn for_each_chunk_mut_writes_are_visible_afterward() {
        let w = World::with_config(EcsConfig::new().with_chunk_size(4096));
        let e0 = w.spawn().unwrap();
        w.add_component(e0, Velocity { dx: 1.0 }).unwrap();

        let vel_id = w.type_registry().register::<Velocity>().unwrap();
        let desc = QueryDescription { all: crate::bitset::ComponentMask::new().with(vel_id), ..Default::default() };
        let query = w.query(desc).unwrap();
        query
            .for_each_chunk_mut(|chunk| {
                if let Some(span) = chunk.get_span_mut::<Velocity>() {
                    for v in span {
                        v.dx *= 2.0;
                    }
                }
            })
            .unwrap();

        assert_eq!(w.get_component::<Velocity>(e0).unwrap().dx, 2.0);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn par_for_each_chunk_mut_visits_every_chunk_exactly_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let w = World::with_config(EcsConfig::new().with_chunk_size(256));
        for i in 0..32 {
            let e = w.spawn().unwrap();
            w.add_component(e, Velocity { dx: i as f32 }).unwrap();
        }

        let vel_id = w.type_registry().register::<Velocity>().unwrap();
        let desc = QueryDescription { all: crate::bitset::ComponentMask::new().with(vel_id), ..Default::default() };
        let query = w.query(desc).unwrap();
        assert!(query.for_each_chunk(|_| {}).is_ok());

        let visited = AtomicUsize::new(0);
        let touched = AtomicUsize::new(0);
        query
            .par_for_each_chunk_mut(|chunk| {
                visited.fetch_add(1, Ordering::SeqCst);
                if let Some(span) = chunk.get_span_mut::<Velocity>() {
                    for v in span {
                        v.dx *= 10.0;
                        touched.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
            .unwrap();

        assert_eq!(touched.load(Ordering::SeqCst), 32);
        assert!(visited.load(Ordering::SeqCst) >= 1);
    }
}
