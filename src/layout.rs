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

//! Per-signature chunk layout: where each component's SoA region starts,
//! and how many entities fit in one chunk.

use rustc_hash::FxHashMap;

use crate::bitset::ComponentMask;
use crate::registry::{ComponentId, TypeInfo};
use crate::utils::align_to;

/// One component's region within a chunk for a given archetype.
#[derive(Debug, Clone, Copy)]
pub struct ColumnLayout {
    pub component: ComponentId,
    pub offset: usize,
    pub size: usize,
    pub align: usize,
}

/// Byte layout of one archetype's chunks: where the entity-id column and
/// each component column begin, and how many entity slots a chunk holds.
#[derive(Debug, Clone)]
pub struct ArchetypeLayout {
    pub mask: ComponentMask,
    pub entity_id_offset: usize,
    pub entities_per_chunk: usize,
    /// Total bytes one chunk must provide to back `entities_per_chunk` rows
    /// of every column. Normally `<= chunk_size`; if even one entity's
    /// worth of columns doesn't fit the nominal chunk size (an oversized
    /// component), this is the floor the backing `ChunkManager` must be
    /// constructed with instead, so `entities_per_chunk` never drops to an
    /// archetype that can store nothing.
    pub chunk_footprint: usize,
    columns: Vec<ColumnLayout>,
    index: FxHashMap<ComponentId, usize>,
}

const ENTITY_ID_SIZE: usize = std::mem::size_of::<u64>();
const ENTITY_ID_ALIGN: usize = std::mem::align_of::<u64>();

impl ArchetypeLayout {
    /// Compute a layout for `mask`, given each component's registered
    /// `TypeInfo`, so that as many entities as possible fit in `chunk_size`
    /// bytes while keeping every column's start aligned.
    pub fn compute(mask: ComponentMask, chunk_size: usize, infos: impl Fn(ComponentId) -> TypeInfo) -> Self {
        let mut ids: Vec<ComponentId> = mask.iter_ids().collect();
        ids.sort_by_key(|id| id.0);
        let infos: Vec<(ComponentId, TypeInfo)> = ids.iter().map(|&id| (id, infos(id))).collect();

        // Bisect for the largest `n` such that the entity-id region plus
        // every component's n-element region (each aligned) fits in
        // `chunk_size`. Monotonic in `n`, so binary search is valid and
        // avoids a division-heavy closed form when alignment padding
        // varies per candidate `n` (padding is actually independent of
        // `n` here, but bisection is kept for robustness against future
        // per-row padding schemes).
        let footprint = |n: usize| -> usize {
            let mut offset = align_to(n * ENTITY_ID_SIZE, ENTITY_ID_ALIGN.max(8));
            for (_, info) in &infos {
                if info.size == 0 {
                    continue;
                }
                offset = align_to(offset, info.align);
                offset += info.size * n;
            }
            offset
        };

        let mut lo = 0usize;
        let mut hi = (chunk_size / ENTITY_ID_SIZE.max(1)).max(1) + 1;
        while footprint(hi) <= chunk_size {
            hi *= 2;
            if hi > chunk_size * 8 {
                break;
            }
        }
        while lo + 1 < hi {
            let mid = lo + (hi - lo) / 2;
            if footprint(mid) <= chunk_size {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        // `lo` is the largest n whose footprint fits `chunk_size`, or 0 if
        // even a single entity's columns don't. Floor to 1 regardless --
        // `chunk_footprint` below tells the caller how large a chunk this
        // archetype actually needs, which may exceed the nominal
        // `chunk_size` for an oversized component.
        let entities_per_chunk = lo.max(1);

        let mut offset = align_to(entities_per_chunk * ENTITY_ID_SIZE, ENTITY_ID_ALIGN.max(8));
        let mut columns = Vec::with_capacity(infos.len());
        for &(id, info) in &infos {
            if info.size == 0 {
                columns.push(ColumnLayout { component: id, offset: 0, size: 0, align: 1 });
                continue;
            }
            offset = align_to(offset, info.align);
            columns.push(ColumnLayout { component: id, offset, size: info.size, align: info.align });
            offset += info.size * entities_per_chunk;
        }
        let chunk_footprint = offset.max(chunk_size);

        let index = columns.iter().enumerate().map(|(i, c)| (c.component, i)).collect();
        Self { mask, entity_id_offset: 0, entities_per_chunk, chunk_footprint, columns, index }
    }

    pub fn column(&self, component: ComponentId) -> Option<&ColumnLayout> {
        self.index.get(&component).map(|&i| &self.columns[i])
    }

    pub fn columns(&self) -> &[ColumnLayout] {
        &self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(size: usize, align: usize) -> TypeInfo {
        TypeInfo { size, align }
    }

    #[test]
    fn single_small_component_packs_many_entities() {
        let mask = ComponentMask::new().with(ComponentId(0));
        let layout = ArchetypeLayout::compute(mask, 4096, |_| info(4, 4));
        assert!(layout.entities_per_chunk > 100);
        let col = layout.column(ComponentId(0)).unwrap();
        assert_eq!(col.offset % col.align, 0);
    }

    #[test]
    fn zero_size_component_does_not_consume_bytes() {
        let mask = ComponentMask::new().with(ComponentId(0)).with(ComponentId(1));
        let layout = ArchetypeLayout::compute(mask, 4096, |id| if id.0 == 0 { info(0, 1) } else { info(8, 8) });
        let tag_col = layout.column(ComponentId(0)).unwrap();
        assert_eq!(tag_col.size, 0);
        let data_col = layout.column(ComponentId(1)).unwrap();
        assert!(data_col.size > 0);
    }

    #[test]
    fn large_components_still_fit_at_least_one_entity() {
        let mask = ComponentMask::new().with(ComponentId(0));
        let layout = ArchetypeLayout::compute(mask, 64, |_| info(4096, 8));
        assert_eq!(layout.entities_per_chunk, 1);
    }

    #[test]
    fn columns_never_overlap() {
        let mask = ComponentMask::new().with(ComponentId(0)).with(ComponentId(1)).with(ComponentId(2));
        let layout = ArchetypeLayout::compute(mask, 8192, |id| match id.0 {
            0 => info(1, 1),
            1 => info(8, 8),
            _ => info(16, 16),
        });
        let mut spans: Vec<(usize, usize)> =
            layout.columns().iter().filter(|c| c.size > 0).map(|c| (c.offset, c.offset + c.size * layout.entities_per_chunk)).collect();
        spans.sort();
        for w in spans.windows(2) {
            assert!(w[0].1 <= w[1].0, "columns overlap: {:?}", w);
        }
    }
}
