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

//! Builds a wave schedule from named `after` dependencies plus read/write
//! conflicts: explicit edges give a partial order, conflicts split would-be
//! concurrent systems into separate waves.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::error::{EcsError, Result};
use crate::system::{BoxedSystem, System, SystemAccess, SystemId};

#[derive(Debug, Clone)]
struct SystemNode {
    id: SystemId,
    name: String,
    access: SystemAccess,
    after: Vec<String>,
}

/// Resolves named `after` constraints into `SystemId` edges and computes
/// the wave assignment described in the scheduler's dependency model.
struct SystemGraph {
    nodes: Vec<SystemNode>,
    /// `edges[i]` = systems that must run before `i`.
    edges: FxHashMap<SystemId, Vec<SystemId>>,
}

impl SystemGraph {
    fn build(systems: &[BoxedSystem], after_by_index: &[Vec<String>]) -> Result<Self> {
        let mut name_to_id: FxHashMap<String, SystemId> = FxHashMap::default();
        let mut nodes = Vec::with_capacity(systems.len());

        for (i, system) in systems.iter().enumerate() {
            let id = SystemId(i as u32);
            let name = system.name().to_string();
            if name_to_id.insert(name.clone(), id).is_some() {
                return Err(EcsError::DuplicateSystemName);
            }
            nodes.push(SystemNode { id, name, access: system.access(), after: after_by_index[i].clone() });
        }

        let mut edges: FxHashMap<SystemId, Vec<SystemId>> = FxHashMap::default();
        for node in &nodes {
            edges.entry(node.id).or_default();
        }
        for node in &nodes {
            for dep_name in &node.after {
                // Per the scheduler's dependency model, a `after` target
                // outside the current build is silently ignored rather
                // than rejected -- it simply contributes no ordering edge.
                if let Some(&dep_id) = name_to_id.get(dep_name) {
                    edges.get_mut(&dep_id).unwrap().push(node.id);
                }
            }
        }

        Ok(Self { nodes, edges })
    }

    fn node(&self, id: SystemId) -> &SystemNode {
        &self.nodes[id.0 as usize]
    }

    /// Kahn's algorithm over the explicit `after` edges. Errors with
    /// [`EcsError::CyclicSystemDependency`] if not every node is reachable.
    fn topological_sort(&self) -> Result<Vec<SystemId>> {
        let mut in_degree: FxHashMap<SystemId, usize> = self.nodes.iter().map(|n| (n.id, 0)).collect();
        for targets in self.edges.values() {
            for &t in targets {
                *in_degree.get_mut(&t).unwrap() += 1;
            }
        }

        let mut queue: VecDeque<SystemId> =
            self.nodes.iter().filter(|n| in_degree[&n.id] == 0).map(|n| n.id).collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(id) = queue.pop_front() {
            order.push(id);
            if let Some(targets) = self.edges.get(&id) {
                for &t in targets {
                    let degree = in_degree.get_mut(&t).unwrap();
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(t);
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            return Err(EcsError::CyclicSystemDependency);
        }
        Ok(order)
    }

    /// Direct predecessors of `id` (systems with `id` in their `after` list
    /// point the other way, so this scans edges rather than `after` to stay
    /// symmetric with `edges`).
    fn predecessors(&self, id: SystemId) -> Vec<SystemId> {
        self.edges.iter().filter(|(_, targets)| targets.contains(&id)).map(|(&from, _)| from).collect()
    }

    /// Assign each system the lowest wave at least one past every
    /// predecessor's wave, bumped further until it no longer conflicts with
    /// anything already placed in that wave.
    fn compute_waves(&self, order: &[SystemId]) -> Vec<Vec<SystemId>> {
        let mut wave_of: FxHashMap<SystemId, usize> = FxHashMap::default();
        let mut waves: Vec<Vec<SystemId>> = Vec::new();

        for &id in order {
            let min_wave = self.predecessors(id).iter().map(|p| wave_of[p] + 1).max().unwrap_or(0);
            let mut wave = min_wave;
            loop {
                if wave >= waves.len() {
                    waves.push(Vec::new());
                }
                let access = &self.node(id).access;
                let conflicts =
                    waves[wave].iter().any(|&other| access.conflicts_with(&self.node(other).access));
                if !conflicts {
                    break;
                }
                wave += 1;
            }
            waves[wave].push(id);
            wave_of.insert(id, wave);
        }

        waves
    }
}

/// Complete execution schedule: systems grouped into waves that may run
/// concurrently, with all cross-wave ordering already resolved.
pub struct Schedule {
    pub(crate) systems: Vec<BoxedSystem>,
    after: Vec<Vec<String>>,
    /// `(system index, name it must precede)`, resolved into a reciprocal
    /// `after` edge at `rebuild` time.
    pending_before: Vec<(usize, String)>,
    pub(crate) waves: Vec<Vec<SystemId>>,
    built: bool,
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedule {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            after: Vec::new(),
            pending_before: Vec::new(),
            waves: Vec::new(),
            built: false,
        }
    }

    /// Build a schedule directly from a vector of systems with no ordering
    /// constraints beyond conflict detection.
    pub fn from_systems(systems: Vec<BoxedSystem>) -> Result<Self> {
        let after = vec![Vec::new(); systems.len()];
        let mut schedule =
            Self { systems, after, pending_before: Vec::new(), waves: Vec::new(), built: false };
        schedule.rebuild()?;
        Ok(schedule)
    }

    pub fn with_system(mut self, system: BoxedSystem) -> Self {
        self.add_system(system);
        self
    }

    pub fn add_system(&mut self, system: BoxedSystem) {
        self.systems.push(system);
        self.after.push(Vec::new());
        self.invalidate();
    }

    /// Declare that `system` must run after the system named `after`.
    pub fn add_system_after(&mut self, system: BoxedSystem, after: &str) {
        self.systems.push(system);
        self.after.push(vec![after.to_string()]);
        self.invalidate();
    }

    /// Declare that `system` must run before the system named `before`.
    /// Implemented by finding `before`'s slot once built and adding a
    /// reciprocal `after` edge -- recorded eagerly here as a pending
    /// constraint resolved at `rebuild` time.
    pub fn add_system_before(&mut self, system: BoxedSystem, before: &str) {
        self.systems.push(system);
        self.after.push(Vec::new());
        self.pending_before.push((self.systems.len() - 1, before.to_string()));
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.built = false;
        self.waves.clear();
    }

    pub fn get_system_mut(&mut self, name: &str) -> Option<&mut (dyn System + 'static)> {
        self.systems.iter_mut().find(|sys| sys.name() == name).map(|sys| sys.as_mut())
    }

    pub fn build(mut self) -> Result<Self> {
        self.rebuild()?;
        Ok(self)
    }

    pub(crate) fn ensure_built(&mut self) -> Result<()> {
        if !self.built {
            self.rebuild()?;
        }
        Ok(())
    }

    fn rebuild(&mut self) -> Result<()> {
        let mut after = self.after.clone();
        for (idx, name) in &self.pending_before {
            // Same silently-ignored treatment as an unresolved `after`
            // target: a `before` constraint naming a system outside the
            // current build contributes no ordering edge.
            if let Some(before_idx) = self.systems.iter().position(|s| s.name() == name) {
                after[before_idx].push(self.systems[*idx].name().to_string());
            }
        }

        let graph = SystemGraph::build(&self.systems, &after)?;
        let order = graph.topological_sort()?;
        self.waves = graph.compute_waves(&order);
        self.built = true;
        Ok(())
    }

    pub fn wave_count(&self) -> usize {
        self.waves.len()
    }

    pub fn wave_system_count(&self, wave_idx: usize) -> usize {
        self.waves.get(wave_idx).map_or(0, |w| w.len())
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    pub(crate) fn system_mut_by_id(&mut self, id: SystemId) -> Option<&mut BoxedSystem> {
        self.systems.get_mut(id.0 as usize)
    }

    pub(crate) fn wave_plan(&self) -> Vec<&[SystemId]> {
        self.waves.iter().map(|wave| wave.as_slice()).collect()
    }

    pub fn get_accesses(&self) -> Vec<SystemAccess> {
        self.systems.iter().map(|s| s.access()).collect()
    }

    pub fn print_execution_plan(&self) {
        println!("Schedule: {} systems, {} waves", self.systems.len(), self.waves.len());
        for (i, wave) in self.waves.iter().enumerate() {
            let names: Vec<&str> =
                wave.iter().map(|id| self.systems[id.0 as usize].name()).collect();
            println!("  wave {i}: {names:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitset::ComponentMask;
    use crate::registry::ComponentId;
    use crate::world::World;

    struct MockSystem {
        name: &'static str,
        access: SystemAccess,
    }

    impl System for MockSystem {
        fn run(&mut self, _world: &World) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &'static str {
            self.name
        }
        fn access(&self) -> SystemAccess {
            self.access.clone()
        }
    }

    fn mock(name: &'static str) -> Box<MockSystem> {
        Box::new(MockSystem { name, access: SystemAccess::empty() })
    }

    #[test]
    fn test_lazy_rebuild() {
        let mut schedule = Schedule::new();
        schedule.add_system(mock("a"));
        assert!(!schedule.built, "schedule should be dirty after add_system");

        schedule.ensure_built().expect("failed to build");
        assert!(schedule.built);

        schedule.add_system(mock("b"));
        assert!(!schedule.built, "schedule should be invalidated after adding a system");
    }

    #[test]
    fn independent_systems_share_one_wave() {
        let schedule = Schedule::from_systems(vec![mock("a"), mock("b")]).unwrap();
        assert_eq!(schedule.wave_count(), 1);
        assert_eq!(schedule.wave_system_count(0), 2);
    }

    #[test]
    fn conflicting_systems_land_in_separate_waves() {
        let pos = ComponentMask::new().with(ComponentId(0));
        let a = Box::new(MockSystem { name: "writer", access: SystemAccess::empty().writing(pos.clone()) });
        let b = Box::new(MockSystem { name: "reader", access: SystemAccess::empty().reading(pos) });
        let schedule = Schedule::from_systems(vec![a, b]).unwrap();
        assert_eq!(schedule.wave_count(), 2);
    }

    #[test]
    fn explicit_after_edge_orders_waves() {
        let mut schedule = Schedule::new();
        schedule.add_system(mock("first"));
        schedule.add_system_after(mock("second"), "first");
        schedule.ensure_built().unwrap();
        assert_eq!(schedule.wave_count(), 2);
        assert_eq!(schedule.waves[0], vec![SystemId(0)]);
        assert_eq!(schedule.waves[1], vec![SystemId(1)]);
    }

    #[test]
    fn before_constraint_is_equivalent_to_a_reciprocal_after_edge() {
        let mut schedule = Schedule::new();
        schedule.add_system(mock("later"));
        schedule.add_system_before(mock("earlier"), "later");
        schedule.ensure_built().unwrap();
        let earlier_wave = schedule.waves.iter().position(|w| w.contains(&SystemId(1))).unwrap();
        let later_wave = schedule.waves.iter().position(|w| w.contains(&SystemId(0))).unwrap();
        assert!(earlier_wave < later_wave);
    }

    #[test]
    fn cyclic_after_edges_are_rejected() {
        let mut schedule = Schedule::new();
        schedule.add_system_after(mock("a"), "b");
        schedule.add_system_after(mock("b"), "a");
        assert!(matches!(schedule.ensure_built(), Err(EcsError::CyclicSystemDependency)));
    }

    #[test]
    fn unknown_after_target_is_silently_ignored() {
        let mut schedule = Schedule::new();
        schedule.add_system_after(mock("a"), "ghost");
        schedule.ensure_built().expect("an after-edge naming a system outside the build is not an error");
        assert_eq!(schedule.wave_count(), 1);
    }

    #[test]
    fn duplicate_system_names_are_rejected() {
        let mut schedule = Schedule::new();
        schedule.add_system(mock("dup"));
        schedule.add_system(mock("dup"));
        assert!(matches!(schedule.ensure_built(), Err(EcsError::DuplicateSystemName)));
    }
}
