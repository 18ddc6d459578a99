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

//! Slab allocator for fixed-size, generation-tagged chunks of raw memory.
//!
//! Mirrors the 16 KiB chunk convention used throughout the archetype-ECS
//! family (legion's `ChunkBuilder::MAX_SIZE`) but adds generation tagging so
//! stale handles are rejected rather than silently reused.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::error::{EcsError, Result};
use crate::lifecycle::Lifecycle;

const INDEX_BITS: u32 = 24;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;

/// Packed `(index: u24, generation: u40)` handle. Generation `0` is never
/// vended and marks an invalid handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkHandle(u64);

impl ChunkHandle {
    const INVALID: ChunkHandle = ChunkHandle(0);

    fn pack(index: u32, generation: u64) -> Self {
        debug_assert!((index as u64) <= INDEX_MASK);
        ChunkHandle(((generation << INDEX_BITS) | index as u64) as u64)
    }

    fn index(self) -> u32 {
        (self.0 & INDEX_MASK) as u32
    }

    fn generation(self) -> u64 {
        self.0 >> INDEX_BITS
    }

    pub fn is_valid(self) -> bool {
        self.generation() != 0
    }
}

impl Default for ChunkHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

struct Slot {
    bytes: Mutex<Vec<u8>>,
    generation: AtomicU32,
    /// Negative: `-n` readers borrowed. Positive: a single writer borrowed.
    /// Zero: free to use.
    borrow: AtomicI64,
}

impl Slot {
    fn new(chunk_size: usize) -> Self {
        Self { bytes: Mutex::new(vec![0u8; chunk_size]), generation: AtomicU32::new(0), borrow: AtomicI64::new(0) }
    }
}

/// A scoped, ref-counted view into a borrowed chunk's bytes.
pub struct ChunkView<'a> {
    manager: &'a ChunkManager,
    handle: ChunkHandle,
    mutable: bool,
}

impl<'a> ChunkView<'a> {
    /// A typed, read-only span over `count` elements starting at `offset`.
    ///
    /// # Safety
    /// Caller guarantees `offset + count * size_of::<T>()` lies within the
    /// chunk and that the bytes at that range are a valid, initialized `T`
    /// array (true for any region an `ArchetypeLayout` allocated for `T`).
    pub unsafe fn span<T>(&self, offset: usize, count: usize) -> &'a [T] {
        let slot = &self.manager.slots.read()[self.handle.index() as usize];
        let slot: &'a Slot = std::mem::transmute::<&Slot, &'a Slot>(slot);
        let guard = slot.bytes.lock();
        let ptr = guard.as_ptr().add(offset) as *const T;
        std::slice::from_raw_parts(ptr, count)
    }

    /// A typed, mutable span. Caller must hold a writer view (`mutable`).
    ///
    /// # Safety
    /// Same preconditions as [`Self::span`]; additionally the caller must
    /// not alias this range with any other live span for the same chunk.
    pub unsafe fn span_mut<T>(&self, offset: usize, count: usize) -> &'a mut [T] {
        debug_assert!(self.mutable);
        let slot = &self.manager.slots.read()[self.handle.index() as usize];
        let slot: &'a Slot = std::mem::transmute::<&Slot, &'a Slot>(slot);
        let mut guard = slot.bytes.lock();
        let ptr = guard.as_mut_ptr().add(offset) as *mut T;
        std::slice::from_raw_parts_mut(ptr, count)
    }
}

impl<'a> Drop for ChunkView<'a> {
    fn drop(&mut self) {
        self.manager.release_borrow(self.handle, self.mutable);
    }
}

/// Slab allocator for fixed-size chunks, indexed by a stable sparse table so
/// handles never need relocation on growth.
pub struct ChunkManager {
    chunk_size: usize,
    slots: parking_lot::RwLock<Vec<Box<Slot>>>,
    free_list: Mutex<Vec<u32>>,
    max_meta_blocks: usize,
    lifecycle: Lifecycle,
}

impl ChunkManager {
    pub fn new(chunk_size: usize, max_meta_blocks: usize) -> Self {
        assert!(chunk_size.is_power_of_two(), "chunk_size must be a power of two");
        Self {
            chunk_size,
            slots: parking_lot::RwLock::new(Vec::new()),
            free_list: Mutex::new(Vec::new()),
            max_meta_blocks,
            lifecycle: Lifecycle::default(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Mark this manager disposed, draining in-flight operations first.
    pub fn shutdown(&self) {
        self.lifecycle.shutdown();
    }

    pub fn is_disposed(&self) -> bool {
        self.lifecycle.is_disposed()
    }

    /// Allocate a fresh, zeroed chunk and return its handle.
    pub fn allocate(&self) -> Result<ChunkHandle> {
        let _guard = self.lifecycle.enter()?;
        #[cfg(feature = "profiling")]
        let _span = tracing::trace_span!("chunk_allocate").entered();
        if let Some(index) = self.free_list.lock().pop() {
            let slots = self.slots.read();
            let slot = &slots[index as usize];
            for b in slot.bytes.lock().iter_mut() {
                *b = 0;
            }
            let generation = slot.generation.load(Ordering::Acquire) as u64;
            return Ok(ChunkHandle::pack(index, generation));
        }
        let mut slots = self.slots.write();
        let index = slots.len();
        if index / 64 >= self.max_meta_blocks {
            return Err(EcsError::ChunkCapacityExceeded);
        }
        let mut slot = Slot::new(self.chunk_size);
        *slot.generation.get_mut() = 1;
        slots.push(Box::new(slot));
        Ok(ChunkHandle::pack(index as u32, 1))
    }

    /// Borrow a chunk for shared (read-only) access.
    pub fn borrow(&self, handle: ChunkHandle) -> Result<ChunkView<'_>> {
        let _guard = self.lifecycle.enter()?;
        self.acquire_borrow(handle, false)?;
        Ok(ChunkView { manager: self, handle, mutable: false })
    }

    /// Borrow a chunk for exclusive (mutable) access.
    pub fn borrow_mut(&self, handle: ChunkHandle) -> Result<ChunkView<'_>> {
        let _guard = self.lifecycle.enter()?;
        self.acquire_borrow(handle, true)?;
        Ok(ChunkView { manager: self, handle, mutable: true })
    }

    /// Convenience equivalent to `borrow` followed by `bytes(0, size)`.
    pub fn get_bytes(&self, handle: ChunkHandle) -> Result<Vec<u8>> {
        let view = self.borrow(handle)?;
        let bytes: &[u8] = unsafe { view.span(0, self.chunk_size) };
        Ok(bytes.to_vec())
    }

    fn slot_for(&self, handle: ChunkHandle) -> Result<parking_lot::MappedRwLockReadGuard<'_, Slot>> {
        if !handle.is_valid() {
            return Err(EcsError::InvalidChunkHandle);
        }
        let slots = self.slots.read();
        let index = handle.index() as usize;
        if index >= slots.len() {
            return Err(EcsError::InvalidChunkHandle);
        }
        let guard = parking_lot::RwLockReadGuard::map(slots, |s| s[index].as_ref());
        if guard.generation.load(Ordering::Acquire) as u64 != handle.generation() {
            return Err(EcsError::InvalidChunkHandle);
        }
        Ok(guard)
    }

    fn acquire_borrow(&self, handle: ChunkHandle, mutable: bool) -> Result<()> {
        let slot = self.slot_for(handle)?;
        if mutable {
            slot.borrow
                .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
                .map_err(|_| EcsError::ChunkInUse)?;
        } else {
            let mut cur = slot.borrow.load(Ordering::Acquire);
            loop {
                if cur > 0 {
                    return Err(EcsError::ChunkInUse);
                }
                match slot.borrow.compare_exchange_weak(cur, cur - 1, Ordering::AcqRel, Ordering::Acquire) {
                    Ok(_) => break,
                    Err(actual) => cur = actual,
                }
            }
        }
        Ok(())
    }

    fn release_borrow(&self, handle: ChunkHandle, mutable: bool) {
        if let Ok(slot) = self.slot_for(handle) {
            if mutable {
                slot.borrow.store(0, Ordering::Release);
            } else {
                slot.borrow.fetch_add(1, Ordering::AcqRel);
            }
        }
    }

    /// Free a chunk, bumping its generation so outstanding handles become
    /// stale. Fails with [`EcsError::ChunkInUse`] if currently borrowed.
    pub fn free(&self, handle: ChunkHandle) -> Result<()> {
        let _guard = self.lifecycle.enter()?;
        let slots = self.slots.read();
        let index = handle.index() as usize;
        if !handle.is_valid() || index >= slots.len() {
            return Err(EcsError::InvalidChunkHandle);
        }
        let slot = &slots[index];
        if slot.generation.load(Ordering::Acquire) as u64 != handle.generation() {
            return Err(EcsError::InvalidChunkHandle);
        }
        if slot.borrow.load(Ordering::Acquire) != 0 {
            return Err(EcsError::ChunkInUse);
        }
        slot.generation.fetch_add(1, Ordering::AcqRel);
        drop(slots);
        self.free_list.lock().push(index as u32);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_then_free_then_reallocate_bumps_generation() {
        let mgr = ChunkManager::new(4096, 64);
        let h1 = mgr.allocate().unwrap();
        mgr.free(h1).unwrap();
        let h2 = mgr.allocate().unwrap();
        assert_eq!(h1.index(), h2.index());
        assert_ne!(h1.generation(), h2.generation());
    }

    #[test]
    fn stale_handle_is_rejected() {
        let mgr = ChunkManager::new(4096, 64);
        let h1 = mgr.allocate().unwrap();
        mgr.free(h1).unwrap();
        let _h2 = mgr.allocate().unwrap();
        assert!(mgr.borrow(h1).is_err());
    }

    #[test]
    fn free_while_borrowed_fails() {
        let mgr = ChunkManager::new(4096, 64);
        let h = mgr.allocate().unwrap();
        let view = mgr.borrow(h).unwrap();
        assert!(matches!(mgr.free(h), Err(EcsError::ChunkInUse)));
        drop(view);
        assert!(mgr.free(h).is_ok());
    }

    #[test]
    fn exclusive_borrow_excludes_other_writer() {
        let mgr = ChunkManager::new(4096, 64);
        let h = mgr.allocate().unwrap();
        let _w = mgr.borrow_mut(h).unwrap();
        assert!(mgr.borrow_mut(h).is_err());
    }

    #[test]
    fn allocated_chunk_is_zeroed() {
        let mgr = ChunkManager::new(64, 64);
        let h = mgr.allocate().unwrap();
        {
            let view = mgr.borrow_mut(h).unwrap();
            unsafe {
                let span: &mut [u8] = view.span_mut(0, 64);
                span[0] = 0xFF;
            }
        }
        mgr.free(h).unwrap();
        let h2 = mgr.allocate().unwrap();
        let view = mgr.borrow(h2).unwrap();
        unsafe {
            let span: &[u8] = view.span(0, 64);
            assert_eq!(span[0], 0);
        }
    }

    #[test]
    fn get_bytes_matches_borrow_then_bytes() {
        let mgr = ChunkManager::new(64, 64);
        let h = mgr.allocate().unwrap();
        let bytes = mgr.get_bytes(h).unwrap();
        assert_eq!(bytes.len(), 64);
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn read_borrow_rejected_while_writer_active() {
        let mgr = ChunkManager::new(4096, 64);
        let h = mgr.allocate().unwrap();
        let _w = mgr.borrow_mut(h).unwrap();
        assert!(mgr.borrow(h).is_err());
    }

    #[test]
    fn shutdown_rejects_further_operations() {
        let mgr = ChunkManager::new(4096, 64);
        mgr.shutdown();
        assert!(matches!(mgr.allocate(), Err(EcsError::Disposed)));
    }
}
