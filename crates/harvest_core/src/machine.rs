//! Harvester state machine transitions.
//!
//! [`transition`] advances one harvester by one trigger: a command issued by
//! a player or AI, or a continuation fired by the event bus. World
//! quantities (node amounts, storage stock) are written immediately so later
//! reads in the same step observe them. Bus registrations, movement
//! requests and notifications are returned as [`Effect`]s for the runner to
//! execute.
//!
//! # Central property
//!
//! A destroyed or unreachable target never leaves a harvester waiting
//! forever: every branch either retargets (issuing a new movement and a new
//! arrival continuation) or falls back to [`HarvestState::NotHarvesting`].

use tracing::debug;

use crate::components::{EntityFlags, EntityId};
use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result};
use crate::events::{Continuation, Effect, HarvestEvent};
use crate::math::Vec2Fixed;
use crate::resources::{CarryLedger, ResourceTypeId};
use crate::state::{HarvestState, HarvesterState, QueuedCommand, TransportStrategy};
use crate::world::{HarvestWorld, StorageAccess};

/// Something that advances a harvester's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Gather from a resource node.
    Gather(EntityId),
    /// Drop the current load off at a storage site.
    DropOff(EntityId),
    /// Shuttle resources into a storage site.
    Transport(EntityId),
    /// Abandon the current task.
    Stop,
    /// A registered continuation fired.
    Fired(Continuation),
}

/// Advance one harvester by one trigger.
///
/// On error the state record and the world are left untouched and no
/// effects are produced.
pub fn transition<W: HarvestWorld + ?Sized>(
    harvester: EntityId,
    hs: &mut HarvesterState,
    trigger: Trigger,
    world: &mut W,
    config: &HarvestConfig,
) -> Result<Vec<Effect>> {
    let mut step = Step {
        uid: harvester,
        hs,
        world,
        config,
        effects: Vec::new(),
    };

    match trigger {
        Trigger::Gather(resource) => step.gather(resource)?,
        Trigger::DropOff(storage) => step.drop_off(storage)?,
        Trigger::Transport(storage) => step.transport(storage)?,
        Trigger::Stop => step.stop(),
        Trigger::Fired(continuation) => step.fire(continuation),
    }

    Ok(step.effects)
}

/// Outcome of handing a load to a storage site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Load left on the harvester.
    pub carry: i32,
    /// New stock of the site.
    pub stored: i32,
    /// Amount the site accepted.
    pub accepted: i32,
    /// Free space the site had before the exchange.
    pub room: i32,
}

/// Exchange a load with a storage site.
///
/// The whole load is absorbed if it fits; otherwise the site fills up to
/// its capacity and the rest stays on the harvester.
#[must_use]
pub fn deliver(carry: i32, capacity: i32, stored: i32) -> Delivery {
    let room = (capacity - stored).max(0);
    if room >= carry {
        Delivery {
            carry: 0,
            stored: stored + carry,
            accepted: carry,
            room,
        }
    } else {
        Delivery {
            carry: carry - room,
            stored: stored + room,
            accepted: room,
            room,
        }
    }
}

/// Outcome of one harvest animation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatherTick {
    /// New carried amount.
    pub carry: i32,
    /// Units left in the node.
    pub remaining: i32,
}

/// Apply one gather cycle.
///
/// `delta = min(speed, remaining)`, the carry is capped at `max_carry`, and
/// the node loses exactly what the harvester gained.
#[must_use]
pub fn gather_tick(speed: i32, carry: i32, max_carry: i32, remaining: i32) -> GatherTick {
    let delta = speed.min(remaining).max(0);
    let new_carry = (carry + delta).min(max_carry).max(carry);
    GatherTick {
        carry: new_carry,
        remaining: (remaining - (new_carry - carry)).max(0),
    }
}

/// Amount taken from a transport source.
///
/// `Nearest` may take the whole stock, `Excess` only what lies above the
/// site's desired level. Never negative.
#[must_use]
pub fn pickup_amount(strategy: TransportStrategy, room: i32, stored: i32, desired: i32) -> i32 {
    let available = match strategy {
        TransportStrategy::Nearest => stored,
        TransportStrategy::Excess => stored - desired,
    };
    room.min(available).max(0)
}

/// Highest-priority resource type the storage site still wants more of.
pub fn transport_resource<S: StorageAccess + ?Sized>(
    ledger: &CarryLedger,
    sites: &S,
    storage: EntityId,
) -> Option<ResourceTypeId> {
    ledger
        .priority()
        .find(|&resource| sites.desired(storage, resource) > sites.current(storage, resource))
}

struct Step<'a, W: HarvestWorld + ?Sized> {
    uid: EntityId,
    hs: &'a mut HarvesterState,
    world: &'a mut W,
    config: &'a HarvestConfig,
    effects: Vec<Effect>,
}

impl<W: HarvestWorld + ?Sized> Step<'_, W> {
    // ------------------------------------------------------------------
    // Bookkeeping
    // ------------------------------------------------------------------

    fn notify(&mut self, event: HarvestEvent) {
        self.effects.push(Effect::Notify(event));
    }

    fn subscribe(&mut self, continuation: Continuation) {
        if self.hs.pending.insert(continuation) {
            self.effects.push(Effect::Subscribe(self.uid, continuation));
        }
    }

    fn unsubscribe(&mut self, continuation: Continuation) {
        if self.hs.pending.remove(&continuation) {
            self.effects.push(Effect::Unsubscribe(self.uid, continuation));
        }
    }

    fn cancel_all(&mut self) {
        if self.hs.is_pending(Continuation::HarvestCycleFinished) {
            self.end_harvest();
        }
        let pending: Vec<_> = self.hs.pending.iter().copied().collect();
        for continuation in pending {
            self.unsubscribe(continuation);
        }
    }

    /// Replace every registration with a trip toward `target`.
    fn travel(&mut self, target: EntityId, arrival: Continuation) {
        self.cancel_all();
        self.subscribe(arrival);
        self.subscribe(Continuation::TravelPreempted);
        self.effects.push(Effect::MoveAdjacent {
            entity: self.uid,
            target,
        });
    }

    fn go_idle(&mut self) {
        self.cancel_all();
        self.hs.reset();
    }

    fn gather_speed(&self, resource: ResourceTypeId) -> i32 {
        self.hs
            .ledger
            .gather_speed(resource)
            .unwrap_or(self.config.default_gather_speed)
    }

    fn max_carry(&self, resource: ResourceTypeId) -> i32 {
        self.hs
            .ledger
            .max_carry(resource)
            .unwrap_or(self.config.default_max_carry)
    }

    fn position(&self) -> Vec2Fixed {
        self.world.position(self.uid).unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Searches
    // ------------------------------------------------------------------

    /// Nearest live node of `resource` within the reacquisition radius.
    fn nearest_resource(
        &self,
        from: Vec2Fixed,
        resource: ResourceTypeId,
        exclude: Option<EntityId>,
    ) -> Option<EntityId> {
        let world: &W = &*self.world;
        let radius = self.config.reacquire_radius_fixed();
        world.nearest_matching(
            from,
            &|e| {
                Some(e) != exclude
                    && world.is_live(e, EntityFlags::RESOURCE)
                    && world.resource_type(e) == Some(resource)
            },
            Some(radius),
        )
    }

    /// Nearest friendly site with room for `resource`.
    fn nearest_drop_off(
        &self,
        resource: ResourceTypeId,
        exclude: Option<EntityId>,
    ) -> Option<EntityId> {
        let world: &W = &*self.world;
        let faction = world.faction(self.uid);
        world.nearest_matching(
            self.position(),
            &|e| {
                if Some(e) == exclude || !world.is_live(e, EntityFlags::STORAGE_SITE) {
                    return false;
                }
                if world.faction(e) != faction {
                    return false;
                }
                let capacity = world.capacity(e, resource);
                capacity > 0 && world.current(e, resource) < capacity
            },
            None,
        )
    }

    /// Nearest site (to the destination) to pick `resource` up from.
    ///
    /// Under `Excess` only overstocked sites qualify at first; if there are
    /// none the search falls back to `Nearest`.
    fn transport_source(&self, dest: EntityId, resource: ResourceTypeId) -> Option<EntityId> {
        let world: &W = &*self.world;
        let origin = world.position(dest).unwrap_or_default();
        let faction = world.faction(dest);

        let search = |strategy: TransportStrategy| {
            world.nearest_matching(
                origin,
                &|e| {
                    if e == dest || !world.is_live(e, EntityFlags::STORAGE_SITE) {
                        return false;
                    }
                    if world.faction(e) != faction || world.capacity(e, resource) == 0 {
                        return false;
                    }
                    let stored = world.current(e, resource);
                    match strategy {
                        TransportStrategy::Nearest => stored > 0,
                        TransportStrategy::Excess => {
                            stored > 0 && stored > world.desired(e, resource)
                        }
                    }
                },
                None,
            )
        };

        match self.hs.strategy {
            TransportStrategy::Nearest => search(TransportStrategy::Nearest),
            TransportStrategy::Excess => search(TransportStrategy::Excess)
                .or_else(|| search(TransportStrategy::Nearest)),
        }
    }

    /// The remembered resource target, or the nearest node of the same type
    /// around where it was last seen.
    fn target_resource(&self) -> Option<EntityId> {
        if let Some(target) = self.hs.resource_target {
            if self.world.is_live(target, EntityFlags::RESOURCE) {
                return Some(target);
            }
        }
        let resource = self.hs.active_resource?;
        self.nearest_resource(self.hs.last_resource_position, resource, None)
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    fn gather(&mut self, resource: EntityId) -> Result<()> {
        if !self
            .world
            .flags(resource)
            .is_some_and(|f| f.contains(EntityFlags::RESOURCE))
        {
            return Err(HarvestError::NotAResource(resource));
        }
        let kind = self
            .world
            .resource_type(resource)
            .ok_or(HarvestError::NotAResource(resource))?;

        if let Some(carried) = self.hs.ledger.carried_resource() {
            if carried != kind {
                let site = self
                    .nearest_drop_off(carried, None)
                    .ok_or(HarvestError::NoDropOffSite {
                        harvester: self.uid,
                    })?;
                debug!(
                    harvester = self.uid,
                    resource, site, "Carrying another type, dropping off before gathering"
                );
                self.begin_drop_off(site);
                self.hs.queued = QueuedCommand::Gather(resource);
                return Ok(());
            }
        }

        self.seek_resource(resource, kind);
        Ok(())
    }

    fn drop_off(&mut self, storage: EntityId) -> Result<()> {
        if !self
            .world
            .flags(storage)
            .is_some_and(|f| f.contains(EntityFlags::STORAGE_SITE))
        {
            return Err(HarvestError::NotAStorageSite(storage));
        }
        if self.hs.ledger.total_carry() == 0 {
            return Ok(());
        }
        self.begin_drop_off(storage);
        Ok(())
    }

    fn transport(&mut self, storage: EntityId) -> Result<()> {
        if !self
            .world
            .flags(storage)
            .is_some_and(|f| f.contains(EntityFlags::STORAGE_SITE))
        {
            return Err(HarvestError::NotAStorageSite(storage));
        }

        if let Some(carried) = self.hs.ledger.carried_resource() {
            let site = self
                .nearest_drop_off(carried, None)
                .ok_or(HarvestError::NoDropOffSite {
                    harvester: self.uid,
                })?;
            debug!(
                harvester = self.uid,
                storage, site, "Carrying a load, dropping off before transport"
            );
            self.begin_drop_off(site);
            self.hs.queued = QueuedCommand::Transport(storage);
            return Ok(());
        }

        let resource = transport_resource(&self.hs.ledger, &*self.world, storage)
            .ok_or(HarvestError::NoTransportResource { storage })?;
        let source = self
            .transport_source(storage, resource)
            .ok_or(HarvestError::NoTransportSource { storage, resource })?;

        self.travel(source, Continuation::ArriveAtTransportSource);
        self.hs.state = HarvestState::TransportGetting;
        self.hs.transport_dest = Some(storage);
        self.hs.transport_source = Some(source);
        self.hs.active_resource = Some(resource);
        self.hs.resource_target = None;
        self.hs.storage_target = None;
        self.hs.queued = QueuedCommand::None;
        self.hs.drop_off_only = false;

        debug!(harvester = self.uid, storage, source, %resource, "Transport started");
        self.notify(HarvestEvent::TransportTargetAcquired {
            harvester: self.uid,
            storage,
        });
        Ok(())
    }

    fn stop(&mut self) {
        self.go_idle();
    }

    // ------------------------------------------------------------------
    // Shared transitions
    // ------------------------------------------------------------------

    fn seek_resource(&mut self, resource: EntityId, kind: ResourceTypeId) {
        self.travel(resource, Continuation::ArriveAtResource);
        self.hs.state = HarvestState::SeekResource;
        self.hs.resource_target = Some(resource);
        self.hs.last_resource_position = self.world.position(resource).unwrap_or_default();
        self.hs.active_resource = Some(kind);
        self.hs.storage_target = None;
        self.hs.transport_source = None;
        self.hs.transport_dest = None;
        self.hs.queued = QueuedCommand::None;
        self.hs.drop_off_only = false;

        debug!(harvester = self.uid, resource, %kind, "Seeking resource");
        self.notify(HarvestEvent::HarvestTargetAcquired {
            harvester: self.uid,
            resource,
        });
    }

    /// A pure drop-off: no gathering resumes afterwards.
    fn begin_drop_off(&mut self, storage: EntityId) {
        self.hs.drop_off_only = true;
        self.seek_storage(storage);
    }

    fn seek_storage(&mut self, storage: EntityId) {
        self.travel(storage, Continuation::ArriveAtStorage);
        self.hs.state = HarvestState::SeekStorage;
        self.hs.storage_target = Some(storage);
        self.hs.transport_source = None;
        self.hs.transport_dest = None;

        debug!(harvester = self.uid, storage, "Seeking storage");
        self.notify(HarvestEvent::StorageTargetAcquired {
            harvester: self.uid,
            storage,
        });
    }

    /// Head for the nearest site accepting the load, or idle.
    fn try_drop_off(&mut self, exclude: Option<EntityId>) {
        let Some(carried) = self.hs.ledger.carried_resource() else {
            self.go_idle();
            return;
        };
        match self.nearest_drop_off(carried, exclude) {
            Some(site) => self.seek_storage(site),
            None => {
                debug!(harvester = self.uid, %carried, "No storage site accepts the load");
                self.go_idle();
            }
        }
    }

    fn try_gather_nearest(&mut self, resource: ResourceTypeId, exclude: Option<EntityId>) {
        let origin = self.position();
        match self.nearest_resource(origin, resource, exclude) {
            Some(next) => {
                if let Err(e) = self.gather(next) {
                    debug!(harvester = self.uid, error = %e, "Retarget failed");
                    self.go_idle();
                }
            }
            None => self.try_drop_off(None),
        }
    }

    fn end_harvest(&mut self) {
        self.unsubscribe(Continuation::HarvestCycleFinished);
        self.unsubscribe(Continuation::HarvestInterrupted);
        self.notify(HarvestEvent::HarvestEnd {
            harvester: self.uid,
        });
    }

    /// The harvested node is gone: find another of the same type.
    fn retarget(&mut self) {
        let resource = self.hs.active_resource;
        self.end_harvest();
        self.hs.resource_target = None;

        match resource {
            Some(resource) => self.try_gather_nearest(resource, None),
            None => self.try_drop_off(None),
        }
    }

    /// The load is fully delivered: resume gathering, or run the queued
    /// command, or idle.
    fn after_drop_off(&mut self) {
        if self.hs.ledger.total_carry() > 0 {
            self.try_drop_off(None);
            return;
        }

        let resume = if self.hs.drop_off_only {
            None
        } else {
            self.target_resource()
        };

        if let Some(resource) = resume {
            if self.gather(resource).is_ok() {
                return;
            }
        }

        let queued = std::mem::take(&mut self.hs.queued);
        self.go_idle();

        let result = match queued {
            QueuedCommand::None => Ok(()),
            QueuedCommand::Gather(target) if self.world.flags(target).is_some() => {
                self.gather(target)
            }
            QueuedCommand::Transport(target) if self.world.flags(target).is_some() => {
                self.transport(target)
            }
            _ => {
                debug!(harvester = self.uid, ?queued, "Queued target no longer exists");
                Ok(())
            }
        };
        if let Err(e) = result {
            debug!(harvester = self.uid, error = %e, "Queued command failed");
        }
    }

    // ------------------------------------------------------------------
    // Continuations
    // ------------------------------------------------------------------

    fn fire(&mut self, continuation: Continuation) {
        if !self.hs.is_pending(continuation) {
            return;
        }
        match continuation {
            Continuation::ArriveAtResource => self.on_arrive_at_resource(),
            Continuation::ArriveAtStorage => self.on_arrive_at_storage(),
            Continuation::ArriveAtTransportSource => self.on_arrive_at_transport_source(),
            Continuation::ArriveAtTransportDest => self.on_arrive_at_transport_dest(),
            Continuation::TravelPreempted => self.on_travel_preempted(),
            Continuation::HarvestInterrupted => self.on_harvest_interrupted(),
            Continuation::HarvestCycleFinished => self.on_harvest_cycle_finished(),
        }
    }

    /// A trip ended; returns `false` if the harvester is still moving.
    fn finish_trip(&mut self, arrival: Continuation) -> bool {
        if !self.world.is_stationary(self.uid) {
            return false;
        }
        self.unsubscribe(arrival);
        self.unsubscribe(Continuation::TravelPreempted);
        true
    }

    fn reached(&self, target: EntityId, capability: EntityFlags) -> bool {
        self.world.is_live(target, capability) && self.world.is_adjacent(self.uid, target)
    }

    fn on_arrive_at_resource(&mut self) {
        if !self.finish_trip(Continuation::ArriveAtResource) {
            return;
        }
        let (Some(target), Some(kind)) = (self.hs.resource_target, self.hs.active_resource) else {
            self.go_idle();
            return;
        };

        if !self.reached(target, EntityFlags::RESOURCE) {
            debug!(harvester = self.uid, target, "Could not reach resource");
            self.try_gather_nearest(kind, Some(target));
            return;
        }

        if let Some(position) = self.world.position(target) {
            self.hs.last_resource_position = position;
        }

        if self.hs.ledger.current_carry(kind) >= self.max_carry(kind) {
            self.try_drop_off(None);
            return;
        }

        self.hs.state = HarvestState::Harvesting;
        self.subscribe(Continuation::HarvestInterrupted);
        self.subscribe(Continuation::HarvestCycleFinished);
        debug!(harvester = self.uid, target, "Harvest begins");
        self.notify(HarvestEvent::HarvestBegin {
            harvester: self.uid,
        });
    }

    fn on_harvest_cycle_finished(&mut self) {
        let target = match self.hs.resource_target {
            Some(target) if self.world.is_live(target, EntityFlags::RESOURCE) => target,
            _ => {
                self.retarget();
                return;
            }
        };
        let Some(kind) = self.world.resource_type(target) else {
            self.retarget();
            return;
        };

        let max_carry = self.max_carry(kind);
        let tick = gather_tick(
            self.gather_speed(kind),
            self.hs.ledger.current_carry(kind),
            max_carry,
            self.world.amount(target),
        );
        self.world.set_amount(target, tick.remaining);
        self.hs.ledger.set_current_carry(kind, tick.carry);

        if tick.remaining == 0 {
            debug!(harvester = self.uid, resource = target, "Resource exhausted");
            self.notify(HarvestEvent::ResourceExhausted { resource: target });
            self.world.mark_zombie(target);

            if tick.carry < max_carry {
                self.retarget();
                return;
            }
        }

        if tick.carry >= max_carry {
            self.end_harvest();
            self.try_drop_off(None);
        }
    }

    fn on_harvest_interrupted(&mut self) {
        debug!(harvester = self.uid, "Harvest interrupted by movement");
        self.end_harvest();
        self.go_idle();
    }

    fn on_travel_preempted(&mut self) {
        debug!(harvester = self.uid, state = ?self.hs.state, "Trip pre-empted by a new move order");
        self.go_idle();
    }

    fn on_arrive_at_storage(&mut self) {
        if !self.finish_trip(Continuation::ArriveAtStorage) {
            return;
        }
        let Some(site) = self.hs.storage_target else {
            self.go_idle();
            return;
        };

        if !self.reached(site, EntityFlags::STORAGE_SITE) {
            debug!(harvester = self.uid, site, "Could not reach storage site");
            self.try_drop_off(Some(site));
            return;
        }

        let Some(kind) = self.hs.ledger.carried_resource() else {
            self.after_drop_off();
            return;
        };

        let delivery = self.exchange(site, kind);
        if delivery.carry == 0 {
            self.after_drop_off();
        } else {
            self.try_drop_off(Some(site));
        }
    }

    /// Hand the carried `kind` to `site`, publishing a drop-off whenever the
    /// site had room.
    fn exchange(&mut self, site: EntityId, kind: ResourceTypeId) -> Delivery {
        let delivery = deliver(
            self.hs.ledger.current_carry(kind),
            self.world.capacity(site, kind),
            self.world.current(site, kind),
        );
        self.hs.ledger.set_current_carry(kind, delivery.carry);
        self.world.set_current(site, kind, delivery.stored);

        if delivery.room > 0 {
            self.notify(HarvestEvent::ResourceDroppedOff {
                harvester: self.uid,
                storage: site,
                resource: kind,
                amount: delivery.accepted,
            });
        }
        delivery
    }

    fn on_arrive_at_transport_source(&mut self) {
        if !self.finish_trip(Continuation::ArriveAtTransportSource) {
            return;
        }
        let (Some(source), Some(dest), Some(kind)) = (
            self.hs.transport_source,
            self.hs.transport_dest,
            self.hs.active_resource,
        ) else {
            self.go_idle();
            return;
        };

        if !self.reached(source, EntityFlags::STORAGE_SITE) {
            debug!(harvester = self.uid, source, "Could not reach transport source");
            self.go_idle();
            if self.world.is_live(dest, EntityFlags::STORAGE_SITE) {
                if let Err(e) = self.transport(dest) {
                    debug!(harvester = self.uid, error = %e, "Transport retry failed");
                }
            }
            return;
        }

        let max_carry = self.max_carry(kind);
        let carried = self.hs.ledger.current_carry(kind);
        let stored = self.world.current(source, kind);
        let take = pickup_amount(
            self.hs.strategy,
            max_carry - carried,
            stored,
            self.world.desired(source, kind),
        );
        let carry = carried + take;
        self.hs.ledger.set_current_carry(kind, carry);
        self.world.set_current(source, kind, stored - take);

        if take > 0 {
            self.notify(HarvestEvent::ResourcePickedUp {
                harvester: self.uid,
                storage: source,
                resource: kind,
                amount: take,
            });
        }

        if !self.world.is_live(dest, EntityFlags::STORAGE_SITE) {
            self.go_idle();
            return;
        }

        let dest_wants_more =
            self.world.desired(dest, kind) > self.world.current(dest, kind) + carry;
        if carry < max_carry && dest_wants_more {
            if let Some(next) = self
                .transport_source(dest, kind)
                .filter(|&next| next != source)
            {
                debug!(harvester = self.uid, next, "Chaining to another transport source");
                self.travel(next, Continuation::ArriveAtTransportSource);
                self.hs.transport_source = Some(next);
                return;
            }
        }

        if carry <= 0 {
            debug!(harvester = self.uid, source, "Nothing to pick up");
            self.go_idle();
            return;
        }

        self.travel(dest, Continuation::ArriveAtTransportDest);
        self.hs.state = HarvestState::TransportPutting;
        self.hs.transport_source = None;
        self.notify(HarvestEvent::TransportTargetAcquired {
            harvester: self.uid,
            storage: dest,
        });
    }

    fn on_arrive_at_transport_dest(&mut self) {
        if !self.finish_trip(Continuation::ArriveAtTransportDest) {
            return;
        }
        let Some(dest) = self.hs.transport_dest else {
            self.go_idle();
            return;
        };

        if !self.reached(dest, EntityFlags::STORAGE_SITE) {
            debug!(harvester = self.uid, dest, "Could not reach transport destination");
            self.go_idle();
            return;
        }

        if let Some(kind) = self.hs.ledger.carried_resource() {
            self.exchange(dest, kind);
        }

        self.go_idle();
        if let Err(e) = self.transport(dest) {
            debug!(harvester = self.uid, dest, error = %e, "Transport cycle ends");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deliver_absorbs_whole_load() {
        let d = deliver(4, 10, 5);
        assert_eq!(
            d,
            Delivery {
                carry: 0,
                stored: 9,
                accepted: 4,
                room: 5
            }
        );
    }

    #[test]
    fn test_deliver_saturates_site() {
        // Carry 7 into a site with room for 3.
        let d = deliver(7, 5, 2);
        assert_eq!(d.carry, 4);
        assert_eq!(d.stored, 5);
        assert_eq!(d.accepted, 3);
        assert_eq!(d.room, 3);
    }

    #[test]
    fn test_deliver_to_overfull_site_keeps_stock() {
        let d = deliver(6, 5, 8);
        assert_eq!(d.carry, 6);
        assert_eq!(d.stored, 8);
        assert_eq!(d.room, 0);
    }

    #[test]
    fn test_gather_tick_sequence() {
        // speed 3, max 10, node holds 7
        let t1 = gather_tick(3, 0, 10, 7);
        assert_eq!(t1, GatherTick { carry: 3, remaining: 4 });
        let t2 = gather_tick(3, t1.carry, 10, t1.remaining);
        assert_eq!(t2, GatherTick { carry: 6, remaining: 1 });
        let t3 = gather_tick(3, t2.carry, 10, t2.remaining);
        assert_eq!(t3, GatherTick { carry: 7, remaining: 0 });
    }

    #[test]
    fn test_gather_tick_caps_at_max_carry() {
        let t = gather_tick(5, 8, 10, 100);
        assert_eq!(t, GatherTick { carry: 10, remaining: 98 });
    }

    #[test]
    fn test_gather_tick_never_returns_carry() {
        let t = gather_tick(5, 12, 10, 100);
        assert_eq!(t, GatherTick { carry: 12, remaining: 100 });
    }

    #[test]
    fn test_pickup_amount_by_strategy() {
        assert_eq!(pickup_amount(TransportStrategy::Nearest, 10, 15, 20), 10);
        assert_eq!(pickup_amount(TransportStrategy::Nearest, 10, 4, 20), 4);
        assert_eq!(pickup_amount(TransportStrategy::Excess, 10, 15, 12), 3);
        assert_eq!(pickup_amount(TransportStrategy::Excess, 10, 5, 12), 0);
        assert_eq!(pickup_amount(TransportStrategy::Nearest, 0, 15, 0), 0);
    }

    struct Sites(Vec<(EntityId, ResourceTypeId, i32, i32)>);

    impl StorageAccess for Sites {
        fn capacity(&self, _: EntityId, _: ResourceTypeId) -> i32 {
            100
        }

        fn current(&self, storage: EntityId, resource: ResourceTypeId) -> i32 {
            self.0
                .iter()
                .find(|(s, r, _, _)| *s == storage && *r == resource)
                .map_or(0, |e| e.2)
        }

        fn set_current(&mut self, _: EntityId, _: ResourceTypeId, _: i32) {}

        fn desired(&self, storage: EntityId, resource: ResourceTypeId) -> i32 {
            self.0
                .iter()
                .find(|(s, r, _, _)| *s == storage && *r == resource)
                .map_or(0, |e| e.3)
        }
    }

    #[test]
    fn test_transport_resource_follows_priority() {
        let stone = ResourceTypeId::new(0);
        let wood = ResourceTypeId::new(1);
        let mut ledger = CarryLedger::new();
        ledger.set_max_carry(stone, 10);
        ledger.set_max_carry(wood, 10);

        // (site, type, stored, desired)
        let sites = Sites(vec![(1, stone, 0, 20), (1, wood, 0, 5)]);
        assert_eq!(transport_resource(&ledger, &sites, 1), Some(stone));

        let satisfied = Sites(vec![(1, stone, 20, 20), (1, wood, 0, 5)]);
        assert_eq!(transport_resource(&ledger, &satisfied, 1), Some(wood));

        assert!(ledger.increase_priority(wood));
        assert_eq!(transport_resource(&ledger, &sites, 1), Some(wood));

        let none = Sites(vec![(1, stone, 20, 20), (1, wood, 9, 5)]);
        assert_eq!(transport_resource(&ledger, &none, 1), None);
    }
}
