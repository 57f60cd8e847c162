//! Event-by-event driver for the harvest system.
//!
//! Bundles a [`HarvestSystem`], a [`FakeWorld`] and a [`RecordingBus`] and
//! plays the movement and animation collaborators by hand: `arrive` finishes
//! a move, `anim_cycle` completes a harvest animation, `foreign_move`
//! simulates a move order from outside the harvester module.

use std::collections::BTreeSet;

use harvest_core::components::{EntityId, FactionId};
use harvest_core::config::HarvestConfig;
use harvest_core::error::Result;
use harvest_core::events::{Continuation, EventKind, HarvestEvent};
use harvest_core::math::Vec2Fixed;
use harvest_core::resources::ResourceTypeId;
use harvest_core::state::{HarvestState, HarvesterState};
use harvest_core::system::HarvestSystem;

use crate::bus::RecordingBus;
use crate::world::FakeWorld;

/// System, world and bus wired together.
#[derive(Debug, Clone, Default)]
pub struct Harness {
    /// The system under test.
    pub system: HarvestSystem,
    /// The fake world.
    pub world: FakeWorld,
    /// The recording bus.
    pub bus: RecordingBus,
}

impl Harness {
    /// Create a harness with an empty world.
    #[must_use]
    pub fn new(config: HarvestConfig) -> Self {
        Self {
            system: HarvestSystem::new(config),
            world: FakeWorld::new(),
            bus: RecordingBus::new(),
        }
    }

    /// Spawn and register a harvester, optionally applying a profile.
    ///
    /// # Panics
    ///
    /// Panics if registration or the profile fails.
    pub fn add_harvester(
        &mut self,
        position: Vec2Fixed,
        faction: FactionId,
        profile: Option<&str>,
    ) -> EntityId {
        let uid = self.world.spawn_harvester(position, faction);
        self.system
            .add_entity(uid, &self.world)
            .expect("fresh harvester registers");
        if let Some(profile) = profile {
            self.system
                .table_mut()
                .apply_profile(uid, profile)
                .expect("profile applies");
        }
        uid
    }

    /// Issue a gather order.
    pub fn gather(&mut self, uid: EntityId, resource: EntityId) -> Result<()> {
        self.system
            .gather(uid, resource, &mut self.world, &mut self.bus)
    }

    /// Issue a drop-off order.
    pub fn drop_off(&mut self, uid: EntityId, storage: EntityId) -> Result<()> {
        self.system
            .drop_off(uid, storage, &mut self.world, &mut self.bus)
    }

    /// Issue a transport order.
    pub fn transport(&mut self, uid: EntityId, storage: EntityId) -> Result<()> {
        self.system
            .transport(uid, storage, &mut self.world, &mut self.bus)
    }

    /// Issue a stop order.
    pub fn stop(&mut self, uid: EntityId) -> Result<()> {
        self.system.stop(uid, &mut self.world, &mut self.bus)
    }

    /// Remove a harvester from the system and the world.
    pub fn remove(&mut self, uid: EntityId) -> Result<()> {
        self.system
            .remove_entity(uid, &mut self.world, &mut self.bus)?;
        self.world.despawn(uid);
        Ok(())
    }

    /// Deliver an event to the system.
    pub fn deliver(&mut self, uid: EntityId, kind: EventKind) {
        self.system
            .handle_event(uid, kind, &mut self.world, &mut self.bus);
    }

    /// Finish the harvester's current move and report the motion end.
    pub fn arrive(&mut self, uid: EntityId) {
        self.world.complete_move(uid);
        self.deliver(uid, EventKind::MotionEnd);
    }

    /// Complete one harvest animation cycle.
    pub fn anim_cycle(&mut self, uid: EntityId) {
        self.deliver(uid, EventKind::AnimCycleFinished);
    }

    /// Simulate a move order issued by someone else.
    pub fn foreign_move(&mut self, uid: EntityId) {
        self.world.set_moving(uid, true);
        self.deliver(uid, EventKind::MoveIssued);
        self.deliver(uid, EventKind::MotionStart);
    }

    /// Advance the harvester until it goes idle, at most `max_steps` events.
    ///
    /// Returns the number of events delivered.
    pub fn run_until_idle(&mut self, uid: EntityId, max_steps: usize) -> usize {
        for step in 0..max_steps {
            match self.state(uid).state {
                HarvestState::NotHarvesting => return step,
                HarvestState::Harvesting => self.anim_cycle(uid),
                _ => self.arrive(uid),
            }
        }
        max_steps
    }

    /// State record of a harvester.
    ///
    /// # Panics
    ///
    /// Panics if the harvester is not registered.
    #[must_use]
    pub fn state(&self, uid: EntityId) -> &HarvesterState {
        self.system
            .table()
            .state(uid)
            .expect("harvester is registered")
    }

    /// Amount of a type carried by a harvester.
    #[must_use]
    pub fn carry(&self, uid: EntityId, kind: ResourceTypeId) -> i32 {
        self.state(uid).ledger.current_carry(kind)
    }

    /// Every notification published so far.
    #[must_use]
    pub fn events(&self) -> &[HarvestEvent] {
        self.bus.events()
    }

    /// Check the structural invariants of one harvester.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated invariant.
    pub fn check_invariants(&self, uid: EntityId) -> std::result::Result<(), String> {
        let hs = self.state(uid);

        if hs.is_idle() == hs.has_targets() {
            return Err(format!(
                "idle={} but targets={} in {hs:?}",
                hs.is_idle(),
                hs.has_targets()
            ));
        }

        let arrivals = hs.pending().filter(|c| c.is_arrival()).count();
        if arrivals > 1 {
            return Err(format!("{arrivals} arrival continuations pending: {hs:?}"));
        }

        let registered = self.bus.subscriptions(uid);
        let pending: BTreeSet<Continuation> = hs.pending().collect();
        if registered != pending {
            return Err(format!(
                "bus registrations {registered:?} differ from pending {pending:?}"
            ));
        }

        if hs.is_idle() && !hs.pending.is_empty() {
            return Err(format!("idle harvester still listening: {hs:?}"));
        }

        if hs.state == HarvestState::Harvesting
            && !hs.is_pending(Continuation::HarvestCycleFinished)
        {
            return Err("harvesting without a cycle continuation".to_string());
        }

        for slot in hs.ledger.slots() {
            let max = slot.max_carry.unwrap_or(0);
            if slot.current_carry < 0 {
                return Err(format!("negative carry in {slot:?}"));
            }
            if slot.current_carry > max && slot.current_carry > 0 && max > 0 {
                return Err(format!("carry above capacity in {slot:?}"));
            }
        }
        if hs.ledger.total_carry() > hs.ledger.total_max_carry().max(0)
            && hs.ledger.total_carry() > 0
        {
            return Err(format!("total carry above total capacity: {hs:?}"));
        }

        Ok(())
    }
}
