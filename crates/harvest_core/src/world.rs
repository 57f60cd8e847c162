//! Contracts of the collaborators the harvester module depends on.
//!
//! The module never reaches for global registries. Everything it needs from
//! the rest of the simulation comes through these traits, so tests and the
//! headless runner can plug in their own worlds.

use crate::components::{EntityFlags, EntityId, FactionId};
use crate::events::{Continuation, HarvestEvent};
use crate::math::{Fixed, Vec2Fixed};
use crate::resources::ResourceTypeId;

/// Read access to entity existence, flags and placement.
pub trait EntityView {
    /// Capability flags, or `None` if the entity does not exist.
    fn flags(&self, entity: EntityId) -> Option<EntityFlags>;

    /// World position, or `None` if the entity does not exist.
    fn position(&self, entity: EntityId) -> Option<Vec2Fixed>;

    /// Owning faction, or `None` if the entity does not exist.
    fn faction(&self, entity: EntityId) -> Option<FactionId>;

    /// Check for an existing, non-zombie entity with `capability`.
    fn is_live(&self, entity: EntityId, capability: EntityFlags) -> bool {
        self.flags(entity).is_some_and(|f| f.is_live(capability))
    }
}

/// Nearest-entity search over world positions.
pub trait SpatialQuery {
    /// Nearest entity to `position` accepted by `predicate`, optionally
    /// limited to `radius`. Ties must be broken deterministically.
    fn nearest_matching(
        &self,
        position: Vec2Fixed,
        predicate: &dyn Fn(EntityId) -> bool,
        radius: Option<Fixed>,
    ) -> Option<EntityId>;
}

/// Movement state queries.
pub trait Navigation {
    /// Check whether the entity is standing still.
    fn is_stationary(&self, entity: EntityId) -> bool;

    /// Check whether `a` is navigationally adjacent to `b`.
    fn is_adjacent(&self, a: EntityId, b: EntityId) -> bool;
}

/// Accessors of resource node entities.
pub trait ResourceAccess {
    /// Resource type of a node.
    fn resource_type(&self, resource: EntityId) -> Option<ResourceTypeId>;

    /// Units left in a node.
    fn amount(&self, resource: EntityId) -> i32;

    /// Overwrite the units left in a node.
    fn set_amount(&mut self, resource: EntityId, amount: i32);

    /// Mark a node as logically dead; it stays queryable until reaped.
    fn mark_zombie(&mut self, resource: EntityId);
}

/// Accessors of storage site entities.
pub trait StorageAccess {
    /// Capacity for a resource type.
    fn capacity(&self, storage: EntityId, resource: ResourceTypeId) -> i32;

    /// Stock currently held.
    fn current(&self, storage: EntityId, resource: ResourceTypeId) -> i32;

    /// Overwrite the stock held.
    fn set_current(&mut self, storage: EntityId, resource: ResourceTypeId, amount: i32);

    /// Stock level the site wants to maintain.
    fn desired(&self, storage: EntityId, resource: ResourceTypeId) -> i32;
}

/// Everything a harvester transition reads or writes in the world.
pub trait HarvestWorld: EntityView + SpatialQuery + Navigation + ResourceAccess + StorageAccess {}

impl<T> HarvestWorld for T where
    T: EntityView + SpatialQuery + Navigation + ResourceAccess + StorageAccess
{
}

/// Issues movement requests.
pub trait MovementOrders {
    /// Move `entity` until it is adjacent to `target`.
    fn move_adjacent(&mut self, entity: EntityId, target: EntityId);
}

/// Publish/subscribe bus the module registers its continuations with.
pub trait EventBus {
    /// Register `continuation` for `entity`.
    fn subscribe(&mut self, entity: EntityId, continuation: Continuation);

    /// Cancel `continuation` for `entity`.
    fn unsubscribe(&mut self, entity: EntityId, continuation: Continuation);

    /// Publish a notification.
    fn publish(&mut self, event: HarvestEvent);
}
