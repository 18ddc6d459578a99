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

//! Runtime configuration for a [`crate::world::World`].

/// Tunables for chunk sizing, default capacities, and id widths.
///
/// Built with a chained `with_*` builder, matching the rest of this crate's
/// builder idiom (see [`crate::schedule::Schedule::with_system`]).
#[derive(Debug, Clone)]
pub struct EcsConfig {
    /// Byte size of a single chunk. Must be a power of two.
    pub chunk_size: usize,
    /// Entity slots reserved up front by a fresh `EntityManager`.
    pub default_entity_capacity: usize,
    /// Chunks reserved up front per freshly created archetype.
    pub default_chunk_capacity: usize,
    /// Cap on the number of meta-blocks the chunk manager's sparse table may
    /// grow to before allocation fails with `ChunkCapacityExceeded`.
    pub max_meta_blocks: usize,
    /// Byte width used when an entity id is serialized to a compact form
    /// (1, 2, or 4).
    pub entity_id_byte_size: u8,
    /// Cap on the number of distinct archetypes a `SharedArchetypeMetadata`
    /// will mint before returning `ArchetypeLimitExceeded`.
    pub max_archetypes: usize,
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16 * 1024,
            default_entity_capacity: 1024,
            default_chunk_capacity: 1,
            max_meta_blocks: 4096,
            entity_id_byte_size: 4,
            max_archetypes: 1 << 20,
        }
    }
}

impl EcsConfig {
    /// Start from defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chunk byte size. Must be a power of two; panics otherwise.
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        assert!(bytes.is_power_of_two(), "chunk_size must be a power of two");
        self.chunk_size = bytes;
        self
    }

    /// Set the default entity capacity reserved on construction.
    pub fn with_default_entity_capacity(mut self, capacity: usize) -> Self {
        self.default_entity_capacity = capacity;
        self
    }

    /// Set the default chunk capacity reserved per fresh archetype.
    pub fn with_default_chunk_capacity(mut self, capacity: usize) -> Self {
        self.default_chunk_capacity = capacity;
        self
    }

    /// Set the sparse-table meta-block cap.
    pub fn with_max_meta_blocks(mut self, blocks: usize) -> Self {
        self.max_meta_blocks = blocks;
        self
    }

    /// Set the byte width used for compact entity id encoding.
    pub fn with_entity_id_byte_size(mut self, bytes: u8) -> Self {
        assert!(matches!(bytes, 1 | 2 | 4), "entity_id_byte_size must be 1, 2, or 4");
        self.entity_id_byte_size = bytes;
        self
    }

    /// Set the maximum number of distinct archetypes.
    pub fn with_max_archetypes(mut self, max: usize) -> Self {
        self.max_archetypes = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = EcsConfig::default();
        assert!(cfg.chunk_size.is_power_of_two());
        assert!(cfg.default_entity_capacity > 0);
    }

    #[test]
    fn builder_chains() {
        let cfg = EcsConfig::new()
            .with_chunk_size(4096)
            .with_default_entity_capacity(16)
            .with_max_archetypes(64);
        assert_eq!(cfg.chunk_size, 4096);
        assert_eq!(cfg.default_entity_capacity, 16);
        assert_eq!(cfg.max_archetypes, 64);
    }

    #[test]
    #[should_panic]
    fn rejects_non_power_of_two_chunk_size() {
        let _ = EcsConfig::new().with_chunk_size(100);
    }
}
