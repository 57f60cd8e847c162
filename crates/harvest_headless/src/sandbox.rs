//! Tick-driven sandbox world.
//!
//! Entities walk toward their adjacency target at a fixed speed. Each tick
//! produces the movement and animation events the harvest system listens
//! for; zombie nodes are removed once the tick's events are handled.

use std::collections::BTreeMap;

use tracing::trace;

use harvest_core::components::{EntityFlags, EntityId, FactionId};
use harvest_core::events::EventKind;
use harvest_core::math::{Fixed, Vec2Fixed};
use harvest_core::resources::ResourceTypeId;
use harvest_core::world::{
    EntityView, MovementOrders, Navigation, ResourceAccess, SpatialQuery, StorageAccess,
};

/// Distance within which two entities count as adjacent.
pub const ADJACENCY_RANGE: i32 = 2;

#[derive(Debug, Clone, Copy, Default)]
struct Stock {
    capacity: i32,
    current: i32,
    desired: i32,
}

#[derive(Debug, Clone, Copy)]
struct Motion {
    target: EntityId,
    started: bool,
}

#[derive(Debug, Clone, Default)]
struct Body {
    flags: EntityFlags,
    position: Vec2Fixed,
    faction: FactionId,
    resource: Option<(ResourceTypeId, i32)>,
    storage: BTreeMap<ResourceTypeId, Stock>,
    motion: Option<Motion>,
    anim_ticks: u32,
}

/// In-memory world advanced one tick at a time.
#[derive(Debug, Clone)]
pub struct SandboxWorld {
    bodies: BTreeMap<EntityId, Body>,
    next_id: EntityId,
    move_speed: Fixed,
    anim_cycle_ticks: u32,
}

impl SandboxWorld {
    /// Create an empty world.
    #[must_use]
    pub fn new(move_speed: i32, anim_cycle_ticks: u32) -> Self {
        Self {
            bodies: BTreeMap::new(),
            next_id: 1,
            move_speed: Fixed::from_num(move_speed.max(1)),
            anim_cycle_ticks: anim_cycle_ticks.max(1),
        }
    }

    fn spawn(&mut self, body: Body) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        self.bodies.insert(id, body);
        id
    }

    /// Spawn a harvester.
    pub fn spawn_harvester(&mut self, position: Vec2Fixed, faction: FactionId) -> EntityId {
        self.spawn(Body {
            flags: EntityFlags::HARVESTER,
            position,
            faction,
            ..Body::default()
        })
    }

    /// Spawn a resource node.
    pub fn spawn_resource(
        &mut self,
        position: Vec2Fixed,
        kind: ResourceTypeId,
        amount: i32,
    ) -> EntityId {
        self.spawn(Body {
            flags: EntityFlags::RESOURCE,
            position,
            resource: Some((kind, amount)),
            ..Body::default()
        })
    }

    /// Spawn an empty storage site.
    pub fn spawn_storage(&mut self, position: Vec2Fixed, faction: FactionId) -> EntityId {
        self.spawn(Body {
            flags: EntityFlags::STORAGE_SITE,
            position,
            faction,
            ..Body::default()
        })
    }

    /// Configure one resource type of a storage site.
    pub fn set_stock(
        &mut self,
        storage: EntityId,
        kind: ResourceTypeId,
        capacity: i32,
        current: i32,
        desired: i32,
    ) {
        if let Some(body) = self.bodies.get_mut(&storage) {
            body.storage.insert(
                kind,
                Stock {
                    capacity,
                    current,
                    desired,
                },
            );
        }
    }

    /// Check whether any entity is still walking.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.bodies.values().any(|b| b.motion.is_some())
    }

    /// Advance movement and animation by one tick.
    ///
    /// `harvesting` lists the harvesters currently extracting; their
    /// animation counters advance and every full cycle yields an
    /// `AnimCycleFinished`. Everyone else's counter resets.
    pub fn tick(&mut self, harvesting: &[EntityId]) -> Vec<(EntityId, EventKind)> {
        let mut events = Vec::new();

        let moving: Vec<(EntityId, Motion)> = self
            .bodies
            .iter()
            .filter_map(|(&id, b)| b.motion.map(|m| (id, m)))
            .collect();
        for (id, motion) in moving {
            if !motion.started {
                events.push((id, EventKind::MotionStart));
            }
            if self.advance(id, motion) {
                events.push((id, EventKind::MotionEnd));
            }
        }

        let cycle = self.anim_cycle_ticks;
        for (id, body) in &mut self.bodies {
            if harvesting.contains(id) {
                body.anim_ticks += 1;
                if body.anim_ticks >= cycle {
                    body.anim_ticks = 0;
                    events.push((*id, EventKind::AnimCycleFinished));
                }
            } else {
                body.anim_ticks = 0;
            }
        }

        events
    }

    /// Step one walker; returns `true` when it stopped.
    fn advance(&mut self, id: EntityId, motion: Motion) -> bool {
        let target = self.bodies.get(&motion.target).map(|b| b.position);
        let speed = self.move_speed;
        let Some(body) = self.bodies.get_mut(&id) else {
            return false;
        };

        let arrived = match target {
            None => true,
            Some(target) => {
                let range = Fixed::from_num(ADJACENCY_RANGE);
                if !body.position.within(target, range) {
                    body.position = body.position.step_toward(target, speed);
                }
                body.position.within(target, range)
            }
        };

        if arrived {
            trace!(entity = id, target = motion.target, "Movement finished");
            body.motion = None;
        } else {
            body.motion = Some(Motion {
                started: true,
                ..motion
            });
        }
        arrived
    }

    /// Remove every zombie, returning their ids.
    pub fn reap_zombies(&mut self) -> Vec<EntityId> {
        let zombies: Vec<EntityId> = self
            .bodies
            .iter()
            .filter(|(_, b)| b.flags.contains(EntityFlags::ZOMBIE))
            .map(|(&id, _)| id)
            .collect();
        for id in &zombies {
            self.bodies.remove(id);
        }
        zombies
    }

    /// Units left in a resource node (0 if gone).
    #[must_use]
    pub fn resource_amount(&self, resource: EntityId) -> i32 {
        self.amount(resource)
    }

    fn stock(&self, storage: EntityId, kind: ResourceTypeId) -> Stock {
        self.bodies
            .get(&storage)
            .and_then(|b| b.storage.get(&kind))
            .copied()
            .unwrap_or_default()
    }
}

impl EntityView for SandboxWorld {
    fn flags(&self, entity: EntityId) -> Option<EntityFlags> {
        self.bodies.get(&entity).map(|b| b.flags)
    }

    fn position(&self, entity: EntityId) -> Option<Vec2Fixed> {
        self.bodies.get(&entity).map(|b| b.position)
    }

    fn faction(&self, entity: EntityId) -> Option<FactionId> {
        self.bodies.get(&entity).map(|b| b.faction)
    }
}

impl SpatialQuery for SandboxWorld {
    fn nearest_matching(
        &self,
        position: Vec2Fixed,
        predicate: &dyn Fn(EntityId) -> bool,
        radius: Option<Fixed>,
    ) -> Option<EntityId> {
        self.bodies
            .iter()
            .filter(|(_, b)| radius.map_or(true, |r| position.within(b.position, r)))
            .filter(|&(&id, _)| predicate(id))
            .map(|(&id, b)| (position.distance_squared(b.position), id))
            .min()
            .map(|(_, id)| id)
    }
}

impl Navigation for SandboxWorld {
    fn is_stationary(&self, entity: EntityId) -> bool {
        self.bodies.get(&entity).map_or(true, |b| b.motion.is_none())
    }

    fn is_adjacent(&self, a: EntityId, b: EntityId) -> bool {
        match (self.bodies.get(&a), self.bodies.get(&b)) {
            (Some(ba), Some(bb)) => ba
                .position
                .within(bb.position, Fixed::from_num(ADJACENCY_RANGE)),
            _ => false,
        }
    }
}

impl ResourceAccess for SandboxWorld {
    fn resource_type(&self, resource: EntityId) -> Option<ResourceTypeId> {
        self.bodies
            .get(&resource)
            .and_then(|b| b.resource)
            .map(|(kind, _)| kind)
    }

    fn amount(&self, resource: EntityId) -> i32 {
        self.bodies
            .get(&resource)
            .and_then(|b| b.resource)
            .map_or(0, |(_, amount)| amount)
    }

    fn set_amount(&mut self, resource: EntityId, amount: i32) {
        if let Some((_, left)) = self
            .bodies
            .get_mut(&resource)
            .and_then(|b| b.resource.as_mut())
        {
            *left = amount;
        }
    }

    fn mark_zombie(&mut self, resource: EntityId) {
        if let Some(body) = self.bodies.get_mut(&resource) {
            body.flags.insert(EntityFlags::ZOMBIE);
        }
    }
}

impl StorageAccess for SandboxWorld {
    fn capacity(&self, storage: EntityId, resource: ResourceTypeId) -> i32 {
        self.stock(storage, resource).capacity
    }

    fn current(&self, storage: EntityId, resource: ResourceTypeId) -> i32 {
        self.stock(storage, resource).current
    }

    fn set_current(&mut self, storage: EntityId, resource: ResourceTypeId, amount: i32) {
        if let Some(body) = self.bodies.get_mut(&storage) {
            body.storage.entry(resource).or_default().current = amount;
        }
    }

    fn desired(&self, storage: EntityId, resource: ResourceTypeId) -> i32 {
        self.stock(storage, resource).desired
    }
}

impl MovementOrders for SandboxWorld {
    fn move_adjacent(&mut self, entity: EntityId, target: EntityId) {
        if let Some(body) = self.bodies.get_mut(&entity) {
            body.motion = Some(Motion {
                target,
                started: false,
            });
        }
    }
}
