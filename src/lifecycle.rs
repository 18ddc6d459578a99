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

//! Shared shutdown/op-counting support for `World`, `EntityManager`,
//! `ArchetypeRegistry`, `SharedArchetypeMetadata`, and `ChunkManager`.
//!
//! Every public operation on one of those collaborators enters a
//! [`Lifecycle`] guard first; `shutdown` flips the disposed flag and then
//! spins until every already-entered guard has dropped, so no operation is
//! ever observed racing a teardown.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::{EcsError, Result};

#[derive(Default)]
pub(crate) struct Lifecycle {
    disposed: AtomicBool,
    op_count: AtomicUsize,
}

impl Lifecycle {
    /// Enter a synchronous operation. Fails with [`EcsError::Disposed`] if
    /// shutdown has begun.
    pub(crate) fn enter(&self) -> Result<OpGuard<'_>> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(EcsError::Disposed);
        }
        self.op_count.fetch_add(1, Ordering::AcqRel);
        if self.disposed.load(Ordering::Acquire) {
            self.op_count.fetch_sub(1, Ordering::AcqRel);
            return Err(EcsError::Disposed);
        }
        Ok(OpGuard { lifecycle: self })
    }

    /// Mark disposed and block until every in-flight operation has exited.
    pub(crate) fn shutdown(&self) {
        self.disposed.store(true, Ordering::Release);
        while self.op_count.load(Ordering::Acquire) != 0 {
            std::hint::spin_loop();
        }
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

pub(crate) struct OpGuard<'a> {
    lifecycle: &'a Lifecycle,
}

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        self.lifecycle.op_count.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_lifecycle_admits_operations() {
        let lc = Lifecycle::default();
        assert!(lc.enter().is_ok());
    }

    #[test]
    fn shutdown_rejects_further_entry() {
        let lc = Lifecycle::default();
        lc.shutdown();
        assert!(matches!(lc.enter(), Err(EcsError::Disposed)));
    }

    #[test]
    fn shutdown_after_guard_release_completes() {
        let lc = Lifecycle::default();
        let guard = lc.enter().unwrap();
        drop(guard);
        lc.shutdown();
        assert!(lc.is_disposed());
    }
}
