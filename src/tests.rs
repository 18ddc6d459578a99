//! Crate-level scenarios that exercise several modules together. Most
//! invariants already have focused unit tests next to the code they cover;
//! these check the public surface the way a caller actually wires it up.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::builder::{EntityBuilder, QueryBuilder};
use crate::command::CommandBuffer;
use crate::config::EcsConfig;
use crate::error::EcsError;
use crate::executor::Executor;
use crate::metadata::SharedArchetypeMetadata;
use crate::registry::TypeRegistry;
use crate::schedule::Schedule;
use crate::system::{System, SystemAccess};
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Velocity {
    dx: f32,
    dy: f32,
}

struct Dead;

fn world() -> World {
    World::with_config(EcsConfig::new().with_chunk_size(4096))
}

#[test]
fn entity_builder_spawns_and_overwrite_clears_then_replaces() {
    let w = world();
    let e = EntityBuilder::new().with(Position { x: 1.0, y: 2.0 }).with(Velocity { dx: 1.0, dy: 0.0 }).build(&w).unwrap();
    assert!(w.has_component::<Position>(e));
    assert!(w.has_component::<Velocity>(e));

    // Overwriting with an empty builder must still clear, not short-circuit.
    EntityBuilder::new().overwrite(&w, e).unwrap();
    assert!(!w.has_component::<Position>(e));
    assert!(!w.has_component::<Velocity>(e));
    assert!(w.is_alive(e));

    EntityBuilder::new().with(Dead).overwrite(&w, e).unwrap();
    assert!(w.has_component::<Dead>(e));
}

#[test]
fn query_builder_matches_with_all_none_constraints() {
    let w = world();
    let moving = EntityBuilder::new().with(Position { x: 0.0, y: 0.0 }).with(Velocity { dx: 1.0, dy: 1.0 }).build(&w).unwrap();
    let still = EntityBuilder::new().with(Position { x: 0.0, y: 0.0 }).build(&w).unwrap();
    let dead = EntityBuilder::new().with(Position { x: 0.0, y: 0.0 }).with(Dead).build(&w).unwrap();

    let query = QueryBuilder::new().all::<Position>().none::<Dead>().build(&w).unwrap();
    let mut seen = Vec::new();
    query.for_each_entity(|e, _, _| seen.push(e)).unwrap();
    seen.sort_by_key(|e| e.id);
    let mut expected = vec![moving, still];
    expected.sort_by_key(|e| e.id);
    assert_eq!(seen, expected);
    assert!(!seen.contains(&dead));
}

#[test]
fn command_buffer_applies_queued_mutations_against_the_world() {
    let w = world();
    let mut buffer = CommandBuffer::new();
    let e = w.spawn().unwrap();
    buffer.add_component(e, Position { x: 5.0, y: 5.0 });
    buffer.despawn(e);
    assert!(!buffer.is_empty());

    buffer.apply(&w).unwrap();
    assert!(!w.is_alive(e));
}

struct MoveSystem {
    moved: Arc<AtomicUsize>,
}

impl System for MoveSystem {
    fn run(&mut self, world: &World) -> crate::error::Result<()> {
        let query = QueryBuilder::new().all::<Position>().all::<Velocity>().build(world)?;
        query.for_each_entity(|entity, _, _| {
            if let (Ok(pos), Ok(vel)) = (world.get_component::<Position>(entity), world.get_component::<Velocity>(entity)) {
                let updated = Position { x: pos.x + vel.dx, y: pos.y + vel.dy };
                drop(pos);
                drop(vel);
                world.set_component(entity, updated).unwrap();
            }
        })?;
        self.moved.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "move_system"
    }

    fn access(&self) -> SystemAccess {
        SystemAccess::empty()
    }
}

#[test]
fn scheduled_system_mutates_components_through_a_query() {
    let w = world();
    let e = w.spawn_with((Position { x: 0.0, y: 0.0 }, Velocity { dx: 2.0, dy: 3.0 })).unwrap();

    let moved = Arc::new(AtomicUsize::new(0));
    let schedule = Schedule::new().with_system(Box::new(MoveSystem { moved: moved.clone() }));
    let mut executor = Executor::new(schedule);
    executor.execute_frame(&w).unwrap();

    assert_eq!(moved.load(Ordering::SeqCst), 1);
    let pos = w.get_component::<Position>(e).unwrap();
    assert_eq!(*pos, Position { x: 2.0, y: 3.0 });
}

#[test]
fn two_worlds_over_shared_metadata_see_the_same_archetype_ids() {
    let type_registry = Arc::new(TypeRegistry::new());
    let metadata = Arc::new(SharedArchetypeMetadata::new(type_registry, 4096, 1024));
    let config = EcsConfig::new().with_chunk_size(4096);
    let w1 = World::new(metadata.clone(), config.clone());
    let w2 = World::new(metadata, config);

    let _e1 = w1.spawn_with((Position { x: 1.0, y: 1.0 },)).unwrap();
    let _e2 = w2.spawn_with((Position { x: 2.0, y: 2.0 },)).unwrap();

    // Archetype ids are interned in shared metadata, so a query built from
    // either world resolves correctly once both have registered it.
    let q1 = QueryBuilder::new().all::<Position>().build(&w1).unwrap();
    assert_eq!(q1.entity_count(), 1);
}

#[test]
fn operations_on_a_disposed_world_return_disposed_error() {
    let w = world();
    let e = w.spawn().unwrap();
    w.shutdown();
    assert_eq!(w.spawn(), Err(EcsError::Disposed));
    assert_eq!(w.add_component(e, Position { x: 0.0, y: 0.0 }), Err(EcsError::Disposed));
}

#[test]
fn despawning_one_entity_keeps_the_swapped_entitys_components_reachable() {
    let w = world();
    let e0 = w.spawn_with((Position { x: 1.0, y: 1.0 },)).unwrap();
    let e1 = w.spawn_with((Position { x: 2.0, y: 2.0 },)).unwrap();
    let e2 = w.spawn_with((Position { x: 3.0, y: 3.0 },)).unwrap();

    w.despawn(e0).unwrap();

    assert_eq!(w.get_component::<Position>(e1).unwrap().x, 2.0);
    assert_eq!(w.get_component::<Position>(e2).unwrap().x, 3.0);
}
