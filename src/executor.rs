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

//! Executes a built [`Schedule`] wave by wave, timing every system along the
//! way. Waves run in order; within a wave, a pluggable [`WaveStrategy`]
//! decides whether systems run one after another or concurrently -- the
//! scheduler has already proven no two systems sharing a wave conflict, so
//! either choice is sound.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::schedule::Schedule;
use crate::system::{BoxedSystem, SystemId};
use crate::world::World;

/// Min/max/average wall-clock time spent inside one system's `run`, plus how
/// many times it has been called.
#[derive(Debug, Clone)]
pub struct SystemStats {
    pub min: Duration,
    pub max: Duration,
    pub avg: Duration,
    pub call_count: u64,
}

/// Per-system execution timings, accumulated across however many frames the
/// caller chooses to run.
#[derive(Default)]
pub struct SystemProfiler {
    timings: HashMap<SystemId, Vec<Duration>>,
}

impl SystemProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_execution(&mut self, id: SystemId, duration: Duration) {
        self.timings.entry(id).or_default().push(duration);
    }

    pub fn get_stats(&self, id: SystemId) -> Option<SystemStats> {
        let timings = self.timings.get(&id)?;
        if timings.is_empty() {
            return None;
        }
        let min = *timings.iter().min().unwrap();
        let max = *timings.iter().max().unwrap();
        let avg = timings.iter().sum::<Duration>() / timings.len() as u32;
        Some(SystemStats { min, max, avg, call_count: timings.len() as u64 })
    }

    pub fn clear(&mut self) {
        self.timings.clear();
    }
}

/// A wave's worth of systems and how to run them. Both strategies are
/// sound for any wave the scheduler produced -- they differ only in
/// throughput, never in correctness.
pub trait WaveStrategy: Send + Sync {
    fn run_wave(
        &self,
        systems: &mut [BoxedSystem],
        wave: &[SystemId],
        world: &World,
        profiler: &mut SystemProfiler,
    ) -> Result<()>;
}

/// Runs every system in a wave one after another, in the order the scheduler
/// placed them. The default strategy -- always correct, easiest to debug.
pub struct Sequential;

impl WaveStrategy for Sequential {
    fn run_wave(
        &self,
        systems: &mut [BoxedSystem],
        wave: &[SystemId],
        world: &World,
        profiler: &mut SystemProfiler,
    ) -> Result<()> {
        for &id in wave {
            let start = Instant::now();
            systems[id.0 as usize].run(world)?;
            profiler.record_execution(id, start.elapsed());
        }
        Ok(())
    }
}

/// Runs every system in a wave concurrently on rayon's global pool. Sound
/// because the scheduler only ever places non-conflicting systems in the
/// same wave: borrowing each system's slot in the `systems` slice through a
/// single `iter_mut` pass keeps every handed-out `&mut BoxedSystem` disjoint,
/// so no unsafe aliasing is needed to cross the thread boundary.
#[cfg(feature = "parallel")]
pub struct Parallel;

#[cfg(feature = "parallel")]
impl WaveStrategy for Parallel {
    fn run_wave(
        &self,
        systems: &mut [BoxedSystem],
        wave: &[SystemId],
        world: &World,
        profiler: &mut SystemProfiler,
    ) -> Result<()> {
        use parking_lot::Mutex;
        use rayon::prelude::*;

        let mut refs: Vec<(SystemId, &mut BoxedSystem)> = systems
            .iter_mut()
            .enumerate()
            .filter_map(|(i, sys)| {
                let id = SystemId(i as u32);
                wave.contains(&id).then_some((id, sys))
            })
            .collect();

        let recorded = Mutex::new(Vec::with_capacity(refs.len()));
        refs.par_iter_mut().try_for_each(|(id, sys)| -> Result<()> {
            let start = Instant::now();
            sys.run(world)?;
            recorded.lock().push((*id, start.elapsed()));
            Ok(())
        })?;

        for (id, elapsed) in recorded.into_inner() {
            profiler.record_execution(id, elapsed);
        }
        Ok(())
    }
}

/// Runs a built [`Schedule`] to completion, wave by wave, under a pluggable
/// [`WaveStrategy`]. Every `World` structural/component method is already
/// internally synchronized, so the barrier between waves is nothing more
/// than "this wave's strategy returned" -- there is no separate command
/// buffer to flush, since systems mutate `world` directly through `&World`.
pub struct Executor {
    schedule: Schedule,
    strategy: Box<dyn WaveStrategy>,
    profiler: SystemProfiler,
}

impl Executor {
    pub fn new(schedule: Schedule) -> Self {
        Self { schedule, strategy: Box::new(Sequential), profiler: SystemProfiler::new() }
    }

    pub fn with_strategy(mut self, strategy: impl WaveStrategy + 'static) -> Self {
        self.strategy = Box::new(strategy);
        self
    }

    pub fn profiler(&self) -> &SystemProfiler {
        &self.profiler
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Run every wave once, in order, against `world`.
    pub fn execute_frame(&mut self, world: &World) -> Result<()> {
        self.schedule.ensure_built()?;
        let waves: Vec<Vec<SystemId>> = self.schedule.wave_plan().into_iter().map(|w| w.to_vec()).collect();
        for wave in &waves {
            self.strategy.run_wave(&mut self.schedule.systems, wave, world, &mut self.profiler)?;
        }
        Ok(())
    }
}

/// Summary of a built schedule's shape, handy for logging or a debug overlay.
#[derive(Debug, Clone)]
pub struct ScheduleDebugInfo {
    pub wave_count: usize,
    pub total_systems: usize,
    pub systems_per_wave: Vec<usize>,
}

impl ScheduleDebugInfo {
    pub fn from_schedule(schedule: &Schedule) -> Self {
        let wave_count = schedule.wave_count();
        let systems_per_wave = (0..wave_count).map(|i| schedule.wave_system_count(i)).collect();
        Self { wave_count, total_systems: schedule.system_count(), systems_per_wave }
    }

    pub fn print_debug(&self) {
        println!("Schedule debug info:");
        println!("  total systems: {}", self.total_systems);
        println!("  waves: {}", self.wave_count);
        for (i, &count) in self.systems_per_wave.iter().enumerate() {
            println!("    wave {i}: {count} systems");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitset::ComponentMask;
    use crate::config::EcsConfig;
    use crate::registry::ComponentId;
    use crate::schedule::Schedule;
    use crate::system::{System, SystemAccess};

    struct CountingSystem {
        name: &'static str,
        access: SystemAccess,
        runs: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }

    impl System for CountingSystem {
        fn access(&self) -> SystemAccess {
            self.access.clone()
        }
        fn name(&self) -> &'static str {
            self.name
        }
        fn run(&mut self, _world: &World) -> Result<()> {
            self.runs.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn execute_frame_runs_every_system_once() {
        let world = World::with_config(EcsConfig::new().with_chunk_size(4096));
        let runs = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let schedule = Schedule::new()
            .with_system(Box::new(CountingSystem { name: "a", access: SystemAccess::empty(), runs: runs.clone() }))
            .with_system(Box::new(CountingSystem { name: "b", access: SystemAccess::empty(), runs: runs.clone() }));

        let mut executor = Executor::new(schedule);
        executor.execute_frame(&world).unwrap();
        assert_eq!(runs.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn profiler_records_one_sample_per_system_per_frame() {
        let world = World::with_config(EcsConfig::new().with_chunk_size(4096));
        let runs = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let schedule =
            Schedule::new().with_system(Box::new(CountingSystem { name: "a", access: SystemAccess::empty(), runs }));

        let mut executor = Executor::new(schedule);
        executor.execute_frame(&world).unwrap();
        executor.execute_frame(&world).unwrap();
        assert_eq!(executor.profiler().get_stats(SystemId(0)).unwrap().call_count, 2);
    }

    #[test]
    fn conflicting_systems_still_run_in_separate_waves() {
        let world = World::with_config(EcsConfig::new().with_chunk_size(4096));
        let pos = ComponentMask::new().with(ComponentId(0));
        let runs = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let writer = Box::new(CountingSystem {
            name: "writer",
            access: SystemAccess::empty().writing(pos.clone()),
            runs: runs.clone(),
        });
        let reader =
            Box::new(CountingSystem { name: "reader", access: SystemAccess::empty().reading(pos), runs: runs.clone() });
        let schedule = Schedule::new().with_system(writer).with_system(reader);

        let mut executor = Executor::new(schedule);
        executor.execute_frame(&world).unwrap();
        assert_eq!(runs.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(executor.schedule().wave_count(), 2);
    }

    #[test]
    fn schedule_debug_info_reports_wave_shape() {
        let schedule = Schedule::from_systems(vec![
            Box::new(CountingSystem {
                name: "a",
                access: SystemAccess::empty(),
                runs: std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0)),
            }),
            Box::new(CountingSystem {
                name: "b",
                access: SystemAccess::empty(),
                runs: std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0)),
            }),
        ])
        .unwrap();
        let info = ScheduleDebugInfo::from_schedule(&schedule);
        assert_eq!(info.total_systems, 2);
        assert_eq!(info.wave_count, 1);
        assert_eq!(info.systems_per_wave, vec![2]);
    }
}
