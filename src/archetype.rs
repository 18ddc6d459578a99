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

//! Chunk-backed, struct-of-arrays storage for one component signature.
//!
//! Unlike a growable `Vec<u8>` per column, entities live in fixed-size
//! chunks handed out by a [`ChunkManager`]; removal is always swap-remove
//! against the last occupied slot, and trailing empty chunks are freed
//! eagerly so `entity_count` stays density-consistent with `chunk_count`.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::chunk::{ChunkHandle, ChunkManager, ChunkView};
use crate::entity::EntityId;
use crate::error::Result;
use crate::layout::ArchetypeLayout;
use crate::registry::ComponentId;

fn encode_entity(entity: EntityId) -> u64 {
    ((entity.id as u64) << 32) | entity.version as u64
}

fn decode_entity(bits: u64) -> EntityId {
    EntityId { id: (bits >> 32) as u32, version: bits as u32 }
}

struct Inner {
    chunks: Vec<ChunkHandle>,
    entity_count: usize,
}

/// One archetype's dense storage: all entities sharing a component
/// signature, laid out SoA across a list of fixed-size chunks.
pub struct Archetype {
    pub id: u32,
    pub layout: Arc<ArchetypeLayout>,
    chunk_manager: ChunkManager,
    inner: RwLock<Inner>,
}

impl Archetype {
    pub fn new(id: u32, layout: Arc<ArchetypeLayout>, chunk_size: usize, max_meta_blocks: usize) -> Self {
        // `chunk_footprint` already accounts for the case where even one
        // entity's worth of columns exceeds the nominal `chunk_size` (an
        // oversized component) -- use it so the backing chunks are always
        // big enough for the layout computed over them. `ChunkManager`
        // requires a power-of-two size, so round up.
        let backing_size = layout.chunk_footprint.max(chunk_size).next_power_of_two();
        Self {
            id,
            layout,
            chunk_manager: ChunkManager::new(backing_size, max_meta_blocks),
            inner: RwLock::new(Inner { chunks: Vec::new(), entity_count: 0 }),
        }
    }

    pub fn entity_count(&self) -> usize {
        self.inner.read().entity_count
    }

    pub fn is_empty(&self) -> bool {
        self.entity_count() == 0
    }

    pub fn chunk_count(&self) -> usize {
        self.inner.read().chunks.len()
    }

    fn per_chunk(&self) -> usize {
        self.layout.entities_per_chunk
    }

    /// Append `entity` to the end of this archetype's dense storage.
    /// Returns its `global_index`.
    pub fn allocate_entity(&self, entity: EntityId) -> Result<usize> {
        #[cfg(feature = "profiling")]
        let _span = tracing::trace_span!("archetype_allocate_entity", archetype = self.id).entered();
        let per_chunk = self.per_chunk();
        let mut inner = self.inner.write();
        let global_index = inner.entity_count;
        let chunk_index = global_index / per_chunk;
        let row = global_index % per_chunk;
        if chunk_index == inner.chunks.len() {
            inner.chunks.push(self.chunk_manager.allocate()?);
        }
        let handle = inner.chunks[chunk_index];
        {
            let view = self.chunk_manager.borrow_mut(handle)?;
            // SAFETY: the entity-id column is `per_chunk` consecutive `u64`s
            // reserved by `ArchetypeLayout` at offset 0, never shared with a
            // component column.
            let ids: &mut [u64] = unsafe { view.span_mut(self.layout.entity_id_offset, per_chunk) };
            ids[row] = encode_entity(entity);
        }
        inner.entity_count += 1;
        Ok(global_index)
    }

    /// Remove the entity at `global_index` via swap-remove against the last
    /// occupied slot. Returns the id of the entity that was moved into
    /// `global_index`, if any, so the caller can patch its `EntityLocation`.
    pub fn remove_entity(&self, global_index: usize) -> Result<Option<EntityId>> {
        #[cfg(feature = "profiling")]
        let _span = tracing::trace_span!("archetype_remove_entity", archetype = self.id).entered();
        let per_chunk = self.per_chunk();
        let mut inner = self.inner.write();
        debug_assert!(global_index < inner.entity_count);
        let last_index = inner.entity_count - 1;

        let moved = if global_index != last_index {
            let moved_id = self.read_entity_id(&inner, last_index, per_chunk)?;
            self.copy_row(&inner, last_index, global_index, per_chunk)?;
            Some(moved_id)
        } else {
            None
        };

        inner.entity_count -= 1;
        let needed_chunks = if inner.entity_count == 0 { 0 } else { (inner.entity_count - 1) / per_chunk + 1 };
        while inner.chunks.len() > needed_chunks {
            let handle = inner.chunks.pop().expect("checked len above");
            self.chunk_manager.free(handle)?;
        }
        Ok(moved)
    }

    fn read_entity_id(&self, inner: &Inner, global_index: usize, per_chunk: usize) -> Result<EntityId> {
        let chunk_index = global_index / per_chunk;
        let row = global_index % per_chunk;
        let handle = inner.chunks[chunk_index];
        let view = self.chunk_manager.borrow(handle)?;
        let ids: &[u64] = unsafe { view.span(self.layout.entity_id_offset, per_chunk) };
        Ok(decode_entity(ids[row]))
    }

    /// Copy every column's bytes (plus the entity-id cell) from `src` to
    /// `dst`, two global indices within this archetype.
    fn copy_row(&self, inner: &Inner, src: usize, dst: usize, per_chunk: usize) -> Result<()> {
        let (src_chunk, src_row) = (src / per_chunk, src % per_chunk);
        let (dst_chunk, dst_row) = (dst / per_chunk, dst % per_chunk);
        let src_handle = inner.chunks[src_chunk];
        let dst_handle = inner.chunks[dst_chunk];

        let copy_column = |offset: usize, elem_size: usize| -> Result<()> {
            if elem_size == 0 {
                return Ok(());
            }
            if src_handle == dst_handle {
                let view = self.chunk_manager.borrow_mut(src_handle)?;
                unsafe {
                    let bytes: &mut [u8] = view.span_mut(0, self.chunk_manager.chunk_size());
                    let src_off = offset + src_row * elem_size;
                    let dst_off = offset + dst_row * elem_size;
                    bytes.copy_within(src_off..src_off + elem_size, dst_off);
                }
            } else {
                let src_view = self.chunk_manager.borrow(src_handle)?;
                let dst_view = self.chunk_manager.borrow_mut(dst_handle)?;
                unsafe {
                    let src_bytes: &[u8] = src_view.span(offset + src_row * elem_size, elem_size);
                    let dst_bytes: &mut [u8] = dst_view.span_mut(offset + dst_row * elem_size, elem_size);
                    dst_bytes.copy_from_slice(src_bytes);
                }
            }
            Ok(())
        };

        // entity-id cell: fixed-width u64, per-row stride independent of
        // component sizes.
        if src_handle == dst_handle {
            let view = self.chunk_manager.borrow_mut(src_handle)?;
            unsafe {
                let ids: &mut [u64] = view.span_mut(self.layout.entity_id_offset, per_chunk);
                ids[dst_row] = ids[src_row];
            }
        } else {
            let src_view = self.chunk_manager.borrow(src_handle)?;
            let dst_view = self.chunk_manager.borrow_mut(dst_handle)?;
            unsafe {
                let src_ids: &[u64] = src_view.span(self.layout.entity_id_offset, per_chunk);
                let id = src_ids[src_row];
                let dst_ids: &mut [u64] = dst_view.span_mut(self.layout.entity_id_offset, per_chunk);
                dst_ids[dst_row] = id;
            }
        }

        for column in self.layout.columns() {
            copy_column(column.offset, column.size)?;
        }
        Ok(())
    }

    /// Borrow the chunk backing `global_index` and return it together with
    /// the byte offset of `component`'s cell within it, or `None` if this
    /// archetype does not carry that component (or it is zero-sized and so
    /// has no cell to point at). The returned [`ChunkView`] keeps the
    /// chunk-manager borrow counter held for as long as the caller keeps it
    /// alive, unlike a bare pointer whose backing borrow would have already
    /// been released.
    pub fn borrow_component(
        &self,
        component: ComponentId,
        global_index: usize,
        mutable: bool,
    ) -> Result<Option<(ChunkView<'_>, usize)>> {
        let Some(col) = self.layout.column(component) else { return Ok(None) };
        if col.size == 0 {
            return Ok(None);
        }
        let per_chunk = self.per_chunk();
        let handle = {
            let inner = self.inner.read();
            let chunk_index = global_index / per_chunk;
            inner.chunks[chunk_index]
        };
        let row = global_index % per_chunk;
        let view =
            if mutable { self.chunk_manager.borrow_mut(handle)? } else { self.chunk_manager.borrow(handle)? };
        Ok(Some((view, col.offset + row * col.size)))
    }

    pub fn entity_at(&self, global_index: usize) -> Result<EntityId> {
        let per_chunk = self.per_chunk();
        let inner = self.inner.read();
        self.read_entity_id(&inner, global_index, per_chunk)
    }

    /// Snapshot of this archetype's current chunk list, for query iteration.
    pub fn chunk_snapshot(&self) -> (Vec<ChunkHandle>, usize) {
        let inner = self.inner.read();
        (inner.chunks.clone(), inner.entity_count)
    }

    pub fn chunk_manager(&self) -> &ChunkManager {
        &self.chunk_manager
    }
}
