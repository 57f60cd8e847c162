//! Scripted in-memory world.
//!
//! Movement is not simulated: a move request is recorded and the entity
//! counts as moving until the test calls [`FakeWorld::complete_move`], which
//! places it right next to its target.

use std::collections::BTreeMap;

use harvest_core::components::{EntityFlags, EntityId, FactionId};
use harvest_core::math::{Fixed, Vec2Fixed};
use harvest_core::resources::ResourceTypeId;
use harvest_core::world::{
    EntityView, MovementOrders, Navigation, ResourceAccess, SpatialQuery, StorageAccess,
};

/// Distance within which two entities count as adjacent.
pub const ADJACENCY_RANGE: i32 = 2;

/// Per-type stock of a storage site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageSlot {
    /// Capacity.
    pub capacity: i32,
    /// Current stock.
    pub current: i32,
    /// Desired stock.
    pub desired: i32,
}

/// One entity of the fake world.
#[derive(Debug, Clone, Default)]
pub struct EntityRecord {
    /// Capability flags.
    pub flags: EntityFlags,
    /// Position.
    pub position: Vec2Fixed,
    /// Owner.
    pub faction: FactionId,
    /// Type and remaining amount, for resource nodes.
    pub resource: Option<(ResourceTypeId, i32)>,
    /// Stock per type, for storage sites.
    pub storage: BTreeMap<ResourceTypeId, StorageSlot>,
    /// Movement in progress.
    pub moving: bool,
    /// Entity the current move heads for.
    pub move_target: Option<EntityId>,
    /// Nothing can get adjacent to this entity.
    pub unreachable: bool,
}

/// In-memory world implementing every collaborator trait.
#[derive(Debug, Clone, Default)]
pub struct FakeWorld {
    entities: BTreeMap<EntityId, EntityRecord>,
    next_id: EntityId,
    moves: Vec<(EntityId, EntityId)>,
}

impl FakeWorld {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    fn spawn(&mut self, record: EntityRecord) -> EntityId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.entities.insert(id, record);
        id
    }

    /// Spawn a harvester.
    pub fn spawn_harvester(&mut self, position: Vec2Fixed, faction: FactionId) -> EntityId {
        self.spawn(EntityRecord {
            flags: EntityFlags::HARVESTER,
            position,
            faction,
            ..EntityRecord::default()
        })
    }

    /// Spawn a resource node.
    pub fn spawn_resource(
        &mut self,
        position: Vec2Fixed,
        kind: ResourceTypeId,
        amount: i32,
    ) -> EntityId {
        self.spawn(EntityRecord {
            flags: EntityFlags::RESOURCE,
            position,
            resource: Some((kind, amount)),
            ..EntityRecord::default()
        })
    }

    /// Spawn an empty storage site.
    pub fn spawn_storage(&mut self, position: Vec2Fixed, faction: FactionId) -> EntityId {
        self.spawn(EntityRecord {
            flags: EntityFlags::STORAGE_SITE,
            position,
            faction,
            ..EntityRecord::default()
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
        if let Some(record) = self.entities.get_mut(&storage) {
            record.storage.insert(
                kind,
                StorageSlot {
                    capacity,
                    current,
                    desired,
                },
            );
        }
    }

    /// Record of an entity.
    #[must_use]
    pub fn record(&self, entity: EntityId) -> Option<&EntityRecord> {
        self.entities.get(&entity)
    }

    /// Mutable record of an entity.
    pub fn record_mut(&mut self, entity: EntityId) -> Option<&mut EntityRecord> {
        self.entities.get_mut(&entity)
    }

    /// Check whether an entity exists (zombies included).
    #[must_use]
    pub fn exists(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Remove an entity outright.
    pub fn despawn(&mut self, entity: EntityId) -> Option<EntityRecord> {
        self.entities.remove(&entity)
    }

    /// Remove every zombie, returning their ids.
    pub fn reap_zombies(&mut self) -> Vec<EntityId> {
        let zombies: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(_, r)| r.flags.contains(EntityFlags::ZOMBIE))
            .map(|(&id, _)| id)
            .collect();
        for id in &zombies {
            self.entities.remove(id);
        }
        zombies
    }

    /// Make an entity impossible (or possible again) to get adjacent to.
    pub fn set_unreachable(&mut self, entity: EntityId, unreachable: bool) {
        if let Some(record) = self.entities.get_mut(&entity) {
            record.unreachable = unreachable;
        }
    }

    /// Start or stop an entity's movement without a target.
    pub fn set_moving(&mut self, entity: EntityId, moving: bool) {
        if let Some(record) = self.entities.get_mut(&entity) {
            record.moving = moving;
            if !moving {
                record.move_target = None;
            }
        }
    }

    /// Place an entity.
    pub fn set_position(&mut self, entity: EntityId, position: Vec2Fixed) {
        if let Some(record) = self.entities.get_mut(&entity) {
            record.position = position;
        }
    }

    /// Every move request so far, oldest first.
    #[must_use]
    pub fn moves(&self) -> &[(EntityId, EntityId)] {
        &self.moves
    }

    /// Current move target of an entity.
    #[must_use]
    pub fn move_target(&self, entity: EntityId) -> Option<EntityId> {
        self.entities.get(&entity).and_then(|r| r.move_target)
    }

    /// Finish an entity's move.
    ///
    /// The entity stops next to its target, or where it stands if the
    /// target is gone or unreachable. Returns whether it got adjacent.
    pub fn complete_move(&mut self, entity: EntityId) -> bool {
        let Some(target) = self.move_target(entity) else {
            self.set_moving(entity, false);
            return false;
        };
        let destination = self
            .entities
            .get(&target)
            .filter(|r| !r.unreachable)
            .map(|r| r.position + Vec2Fixed::from_ints(1, 0));

        if let Some(destination) = destination {
            self.set_position(entity, destination);
        }
        self.set_moving(entity, false);
        destination.is_some()
    }

    /// Remaining amount of a resource node (0 if gone).
    #[must_use]
    pub fn resource_amount(&self, resource: EntityId) -> i32 {
        self.amount(resource)
    }

    /// Stock of a storage site.
    #[must_use]
    pub fn stock(&self, storage: EntityId, kind: ResourceTypeId) -> i32 {
        self.current(storage, kind)
    }

    fn slot(&self, storage: EntityId, kind: ResourceTypeId) -> StorageSlot {
        self.entities
            .get(&storage)
            .and_then(|r| r.storage.get(&kind))
            .copied()
            .unwrap_or_default()
    }
}

impl EntityView for FakeWorld {
    fn flags(&self, entity: EntityId) -> Option<EntityFlags> {
        self.entities.get(&entity).map(|r| r.flags)
    }

    fn position(&self, entity: EntityId) -> Option<Vec2Fixed> {
        self.entities.get(&entity).map(|r| r.position)
    }

    fn faction(&self, entity: EntityId) -> Option<FactionId> {
        self.entities.get(&entity).map(|r| r.faction)
    }
}

impl SpatialQuery for FakeWorld {
    fn nearest_matching(
        &self,
        position: Vec2Fixed,
        predicate: &dyn Fn(EntityId) -> bool,
        radius: Option<Fixed>,
    ) -> Option<EntityId> {
        let mut best: Option<(Fixed, EntityId)> = None;
        for (&id, record) in &self.entities {
            if radius.is_some_and(|r| !position.within(record.position, r)) {
                continue;
            }
            if !predicate(id) {
                continue;
            }
            let d = position.distance_squared(record.position);
            if best.map_or(true, |(bd, _)| d < bd) {
                best = Some((d, id));
            }
        }
        best.map(|(_, id)| id)
    }
}

impl Navigation for FakeWorld {
    fn is_stationary(&self, entity: EntityId) -> bool {
        self.entities.get(&entity).map_or(true, |r| !r.moving)
    }

    fn is_adjacent(&self, a: EntityId, b: EntityId) -> bool {
        match (self.entities.get(&a), self.entities.get(&b)) {
            (Some(ra), Some(rb)) => {
                !rb.unreachable
                    && ra
                        .position
                        .within(rb.position, Fixed::from_num(ADJACENCY_RANGE))
            }
            _ => false,
        }
    }
}

impl ResourceAccess for FakeWorld {
    fn resource_type(&self, resource: EntityId) -> Option<ResourceTypeId> {
        self.entities
            .get(&resource)
            .and_then(|r| r.resource)
            .map(|(kind, _)| kind)
    }

    fn amount(&self, resource: EntityId) -> i32 {
        self.entities
            .get(&resource)
            .and_then(|r| r.resource)
            .map_or(0, |(_, amount)| amount)
    }

    fn set_amount(&mut self, resource: EntityId, amount: i32) {
        if let Some((_, left)) = self
            .entities
            .get_mut(&resource)
            .and_then(|r| r.resource.as_mut())
        {
            *left = amount;
        }
    }

    fn mark_zombie(&mut self, resource: EntityId) {
        if let Some(record) = self.entities.get_mut(&resource) {
            record.flags.insert(EntityFlags::ZOMBIE);
        }
    }
}

impl StorageAccess for FakeWorld {
    fn capacity(&self, storage: EntityId, resource: ResourceTypeId) -> i32 {
        self.slot(storage, resource).capacity
    }

    fn current(&self, storage: EntityId, resource: ResourceTypeId) -> i32 {
        self.slot(storage, resource).current
    }

    fn set_current(&mut self, storage: EntityId, resource: ResourceTypeId, amount: i32) {
        if let Some(record) = self.entities.get_mut(&storage) {
            record.storage.entry(resource).or_default().current = amount;
        }
    }

    fn desired(&self, storage: EntityId, resource: ResourceTypeId) -> i32 {
        self.slot(storage, resource).desired
    }
}

impl MovementOrders for FakeWorld {
    fn move_adjacent(&mut self, entity: EntityId, target: EntityId) {
        self.moves.push((entity, target));
        if let Some(record) = self.entities.get_mut(&entity) {
            record.moving = true;
            record.move_target = Some(target);
        }
    }
}
