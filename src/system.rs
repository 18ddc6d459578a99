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

//! System identity and the read/write component mask two systems are
//! compared on to decide whether they may run in the same wave.

use crate::bitset::ComponentMask;
use crate::error::Result;
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(pub u32);

/// The component masks a system reads and writes, used purely for conflict
/// detection -- not for dispatching which archetypes it sees (that's what
/// its `Query`/`QueryDescription` is for).
#[derive(Debug, Clone, Default)]
pub struct SystemAccess {
    pub reads: ComponentMask,
    pub writes: ComponentMask,
}

impl SystemAccess {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn reading(mut self, mask: ComponentMask) -> Self {
        self.reads = self.reads.union(&mask);
        self
    }

    pub fn writing(mut self, mask: ComponentMask) -> Self {
        self.writes = self.writes.union(&mask);
        self
    }

    /// `(a.write ∩ b.read) ∪ (a.read ∩ b.write) ∪ (a.write ∩ b.write) ≠ ∅`
    pub fn conflicts_with(&self, other: &SystemAccess) -> bool {
        self.writes.intersects(&other.reads)
            || self.reads.intersects(&other.writes)
            || self.writes.intersects(&other.writes)
    }
}

/// One schedulable unit of work. `run` takes `&World` because every
/// mutating `World` operation is internally synchronized -- systems placed
/// in the same wave are verified by the scheduler not to conflict, so no
/// `&mut World` is ever needed.
pub trait System: Send + Sync {
    fn access(&self) -> SystemAccess;
    fn name(&self) -> &'static str;
    fn run(&mut self, world: &World) -> Result<()>;
}

pub type BoxedSystem = Box<dyn System>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ComponentId;

    #[test]
    fn test_system_access_conflicts() {
        let a = SystemAccess::empty().writing(ComponentMask::new().with(ComponentId(0)));
        let b = SystemAccess::empty().reading(ComponentMask::new().with(ComponentId(0)));
        assert!(a.conflicts_with(&b));
    }

    #[test]
    fn test_system_access_no_conflicts() {
        let a = SystemAccess::empty().reading(ComponentMask::new().with(ComponentId(0)));
        let b = SystemAccess::empty().reading(ComponentMask::new().with(ComponentId(0)));
        assert!(!a.conflicts_with(&b));
    }

    #[test]
    fn disjoint_writes_do_not_conflict() {
        let a = SystemAccess::empty().writing(ComponentMask::new().with(ComponentId(0)));
        let b = SystemAccess::empty().writing(ComponentMask::new().with(ComponentId(1)));
        assert!(!a.conflicts_with(&b));
    }
}
